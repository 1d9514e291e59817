mod conditioning;
mod frames;

pub use conditioning::{compose_conditioning, DEFAULT_FILL};
pub use frames::composite_frames;
