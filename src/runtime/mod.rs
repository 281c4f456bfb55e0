// ABOUTME: Container runtime access: capability traits, local detection, bollard backend.
// ABOUTME: Everything above this module works against the traits, never bollard directly.

mod bollard;
mod detection;
mod error;
pub mod traits;
mod types;

pub use bollard::BollardRuntime;
pub use detection::{DetectionError, detect_local};
pub use error::{RuntimeError, RuntimeErrorKind};
pub use traits::*;
pub use types::{DetectedRuntime, RuntimeType};
