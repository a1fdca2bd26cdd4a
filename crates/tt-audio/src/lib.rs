//! Audio output backends for tinytune.

mod cpal_backend;
mod sink;
mod traits;

pub use cpal_backend::CpalOutput;
pub use sink::{to_f32, RingSink};
pub use traits::{AudioError, AudioOutput};
