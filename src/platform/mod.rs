//! Platform facts that drive argument packing.
//!
//! The layout of a native argument frame depends on four facts about the target: the processor
//! family, the operating system (which decides a handful of ABI quirks such as the size of C
//! `long` and `long double`), the address width and the byte order. This module captures those
//! facts in [`Platform`] and derives the native size and alignment of every primitive from them
//! in [`PrimitiveLayout`].
//!
//! [`Platform::native`] describes the process the crate was compiled for and is computed once.
//! Any other platform can be described with [`Platform::new`], which allows buffers for a
//! foreign layout to be produced and tested on any host.
//!
//! # Examples
//!
//! ```rust
//! use callpack::platform::{ByteOrder, Cpu, Os, Platform};
//!
//! let platform = Platform::new(Cpu::Ppc64, Os::Linux);
//! assert_eq!(platform.address_size(), 64);
//! assert_eq!(platform.byte_order(), ByteOrder::BigEndian);
//! assert_eq!(platform.layout().slot_size, 8);
//! ```

mod layout;

use std::sync::OnceLock;

use strum::{Display, EnumIter};

pub use layout::{PrimitiveLayout, TypeLayout};

/// Processor families known to the argument encoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Cpu {
    /// 32-bit x86
    I386,
    /// 64-bit x86
    X86_64,
    /// 32-bit ARM
    Arm,
    /// 64-bit ARM
    Aarch64,
    /// 32-bit PowerPC
    Ppc,
    /// 64-bit big-endian PowerPC
    Ppc64,
    /// 64-bit little-endian PowerPC
    Ppc64le,
    /// IBM z/Architecture
    S390x,
    /// 32-bit SPARC
    Sparc,
    /// 64-bit SPARC
    Sparcv9,
    /// 32-bit big-endian MIPS
    Mips,
    /// 64-bit big-endian MIPS
    Mips64,
    /// 64-bit little-endian MIPS
    Mips64el,
    /// 64-bit RISC-V
    Riscv64,
    /// 64-bit LoongArch
    Loongarch64,
    /// Anything else; treated as a generic 64-bit little-endian target
    Unknown,
}

impl Cpu {
    /// The processor family this crate was compiled for.
    #[must_use]
    pub fn native() -> Self {
        if cfg!(target_arch = "x86") {
            Cpu::I386
        } else if cfg!(target_arch = "x86_64") {
            Cpu::X86_64
        } else if cfg!(target_arch = "arm") {
            Cpu::Arm
        } else if cfg!(target_arch = "aarch64") {
            Cpu::Aarch64
        } else if cfg!(target_arch = "powerpc") {
            Cpu::Ppc
        } else if cfg!(target_arch = "powerpc64") {
            if cfg!(target_endian = "little") {
                Cpu::Ppc64le
            } else {
                Cpu::Ppc64
            }
        } else if cfg!(target_arch = "s390x") {
            Cpu::S390x
        } else if cfg!(target_arch = "sparc") {
            Cpu::Sparc
        } else if cfg!(target_arch = "sparc64") {
            Cpu::Sparcv9
        } else if cfg!(target_arch = "mips") {
            Cpu::Mips
        } else if cfg!(target_arch = "mips64") {
            if cfg!(target_endian = "little") {
                Cpu::Mips64el
            } else {
                Cpu::Mips64
            }
        } else if cfg!(target_arch = "riscv64") {
            Cpu::Riscv64
        } else if cfg!(target_arch = "loongarch64") {
            Cpu::Loongarch64
        } else {
            Cpu::Unknown
        }
    }

    /// Native address width in bits (32 or 64).
    #[must_use]
    pub fn address_size(self) -> usize {
        match self {
            Cpu::I386 | Cpu::Arm | Cpu::Ppc | Cpu::Sparc | Cpu::Mips => 32,
            _ => 64,
        }
    }

    /// Byte order the family runs in by default.
    #[must_use]
    pub fn byte_order(self) -> ByteOrder {
        match self {
            Cpu::Ppc | Cpu::Ppc64 | Cpu::S390x | Cpu::Sparc | Cpu::Sparcv9 | Cpu::Mips
            | Cpu::Mips64 => ByteOrder::BigEndian,
            _ => ByteOrder::LittleEndian,
        }
    }
}

/// Operating system families with ABI differences relevant to argument packing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Os {
    /// Linux and other System V style systems
    Linux,
    /// macOS / iOS
    Darwin,
    /// Microsoft Windows
    Windows,
    /// FreeBSD
    FreeBsd,
    /// OpenBSD
    OpenBsd,
    /// Anything else; System V rules are assumed
    Other,
}

impl Os {
    /// The operating system this crate was compiled for.
    #[must_use]
    pub fn native() -> Self {
        if cfg!(target_os = "linux") || cfg!(target_os = "android") {
            Os::Linux
        } else if cfg!(target_vendor = "apple") {
            Os::Darwin
        } else if cfg!(target_os = "windows") {
            Os::Windows
        } else if cfg!(target_os = "freebsd") {
            Os::FreeBsd
        } else if cfg!(target_os = "openbsd") {
            Os::OpenBsd
        } else {
            Os::Other
        }
    }
}

/// Byte order of multi-byte values in the argument buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ByteOrder {
    /// Least-significant byte first
    LittleEndian,
    /// Most-significant byte first
    BigEndian,
}

impl ByteOrder {
    /// Byte order of the running process.
    #[must_use]
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::BigEndian
        } else {
            ByteOrder::LittleEndian
        }
    }
}

/// The immutable set of facts about a target that argument packing depends on.
///
/// # Thread Safety
///
/// `Platform` is `Copy` and contains no interior mutability; the native instance is computed
/// once and shared by reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    cpu: Cpu,
    os: Os,
    address_size: usize,
    byte_order: ByteOrder,
}

impl Platform {
    /// Describes a platform using the family defaults for address width and byte order.
    #[must_use]
    pub fn new(cpu: Cpu, os: Os) -> Self {
        Platform {
            cpu,
            os,
            address_size: cpu.address_size(),
            byte_order: cpu.byte_order(),
        }
    }

    /// Overrides the byte order, e.g. for bi-endian families running in the other mode.
    #[must_use]
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Overrides the address width in bits (32 or 64), e.g. for ILP32 ABIs.
    ///
    /// # Panics
    ///
    /// Panics if `bits` is neither 32 nor 64.
    #[must_use]
    pub fn with_address_size(mut self, bits: usize) -> Self {
        assert!(bits == 32 || bits == 64, "address size must be 32 or 64 bits");
        self.address_size = bits;
        self
    }

    /// The platform of the running process, computed on first use.
    pub fn native() -> &'static Platform {
        static NATIVE: OnceLock<Platform> = OnceLock::new();
        NATIVE.get_or_init(|| {
            let address_size = if cfg!(target_pointer_width = "32") {
                32
            } else {
                64
            };
            Platform {
                cpu: Cpu::native(),
                os: Os::native(),
                address_size,
                byte_order: ByteOrder::native(),
            }
        })
    }

    /// Processor family
    #[must_use]
    pub fn cpu(&self) -> Cpu {
        self.cpu
    }

    /// Operating system family
    #[must_use]
    pub fn os(&self) -> Os {
        self.os
    }

    /// Address width in bits
    #[must_use]
    pub fn address_size(&self) -> usize {
        self.address_size
    }

    /// Byte order
    #[must_use]
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Width of C `long` in bits.
    #[must_use]
    pub fn long_size(&self) -> usize {
        if self.os == Os::Windows {
            32
        } else {
            self.address_size
        }
    }

    /// Native size and alignment of every primitive on this platform.
    #[must_use]
    pub fn layout(&self) -> PrimitiveLayout {
        PrimitiveLayout::for_platform(self)
    }
}
