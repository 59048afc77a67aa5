//! Small shared helpers.

mod math;

pub use math::align_up;
