//! Benchmarks for argument packing.
//!
//! Measures the hot path of filling one invocation buffer:
//! - Primitive puts with each packing strategy
//! - By-reference puts, which also allocate the object buffer
//! - `long double` conversion inline and out of line

extern crate callpack;

use callpack::{
    invoke::{Encoder, ParameterFlags},
    platform::{Cpu, Os, Platform},
    types::{CallFlags, NativeType},
    CallContext, Config, InvocationBuffer, Type,
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

const PRIMITIVES: [NativeType; 6] = [
    NativeType::SInt8,
    NativeType::SInt32,
    NativeType::SInt64,
    NativeType::Float,
    NativeType::Double,
    NativeType::Pointer,
];

fn context(platform: Platform, raw: bool, kinds: &[NativeType]) -> CallContext {
    CallContext::builder()
        .platform(platform)
        .flags(if raw {
            CallFlags::RAW_PACKING
        } else {
            CallFlags::empty()
        })
        .parameters(kinds.iter().map(|kind| Type::primitive(*kind, &platform)))
        .build()
}

fn fill_primitives(buffer: &mut InvocationBuffer<'_>) {
    buffer.put_byte(black_box(1)).unwrap();
    buffer.put_int(black_box(2)).unwrap();
    buffer.put_long(black_box(3)).unwrap();
    buffer.put_float(black_box(4.0)).unwrap();
    buffer.put_double(black_box(5.0)).unwrap();
    buffer.put_address(black_box(0x1000)).unwrap();
}

fn bench_primitives(c: &mut Criterion, name: &str, platform: Platform, raw: bool) {
    let context = context(platform, raw, &PRIMITIVES);
    let encoder = Encoder::select(&platform, raw);

    c.bench_function(name, |b| {
        b.iter(|| {
            let mut buffer = InvocationBuffer::with_encoder(&context, encoder, Config::default());
            fill_primitives(&mut buffer);
            black_box(buffer.into_parts())
        });
    });
}

/// Six primitives in fixed 8-byte slots.
fn bench_default_primitives(c: &mut Criterion) {
    bench_primitives(
        c,
        "default_primitives",
        Platform::new(Cpu::X86_64, Os::Linux),
        false,
    );
}

/// Six primitives on the x86-64 native stack.
fn bench_raw_primitives(c: &mut Criterion) {
    bench_primitives(
        c,
        "raw_primitives",
        Platform::new(Cpu::X86_64, Os::Linux),
        true,
    );
}

/// Six primitives on the i386 stack.
fn bench_i386_primitives(c: &mut Criterion) {
    bench_primitives(
        c,
        "i386_primitives",
        Platform::new(Cpu::I386, Os::Linux),
        true,
    );
}

/// Same signature with every put validated.
fn bench_validated_primitives(c: &mut Criterion) {
    let platform = Platform::new(Cpu::X86_64, Os::Linux);
    let context = context(platform, false, &PRIMITIVES);
    let encoder = Encoder::select(&platform, false);

    c.bench_function("validated_primitives", |b| {
        b.iter(|| {
            let mut buffer = InvocationBuffer::with_encoder(&context, encoder, Config::strict());
            fill_primitives(&mut buffer);
            black_box(buffer.into_parts())
        });
    });
}

/// Three arrays passed by address.
fn bench_arrays(c: &mut Criterion) {
    let platform = Platform::new(Cpu::X86_64, Os::Linux);
    let context = context(platform, false, &[NativeType::Pointer; 3]);
    let encoder = Encoder::select(&platform, false);
    let mut bytes = [0i8; 64];
    let mut ints = [0i32; 16];
    let mut doubles = [0f64; 8];

    c.bench_function("arrays", |b| {
        b.iter(|| {
            let mut buffer = InvocationBuffer::with_encoder(&context, encoder, Config::default());
            buffer
                .put_array(&mut bytes[..], 0, 64, ParameterFlags::IN)
                .unwrap();
            buffer
                .put_array(&mut ints[..], 0, 16, ParameterFlags::OUT)
                .unwrap();
            buffer
                .put_array(&mut doubles[..], 0, 8, ParameterFlags::IN | ParameterFlags::OUT)
                .unwrap();
            let (frame, objects) = buffer.into_parts();
            black_box((frame, objects.map(|o| o.len())))
        });
    });
}

/// `long double` written inline (raw) and boxed (default).
fn bench_long_double(c: &mut Criterion) {
    let platform = Platform::new(Cpu::X86_64, Os::Linux);

    for (name, raw) in [("long_double_inline", true), ("long_double_boxed", false)] {
        let context = context(platform, raw, &[NativeType::LongDouble]);
        let encoder = Encoder::select(&platform, raw);

        c.bench_function(name, |b| {
            b.iter(|| {
                let mut buffer =
                    InvocationBuffer::with_encoder(&context, encoder, Config::default());
                buffer.put_long_double(black_box(3.25)).unwrap();
                black_box(buffer.into_parts())
            });
        });
    }
}

criterion_group!(
    benches,
    bench_default_primitives,
    bench_raw_primitives,
    bench_i386_primitives,
    bench_validated_primitives,
    bench_arrays,
    bench_long_double,
);
criterion_main!(benches);
