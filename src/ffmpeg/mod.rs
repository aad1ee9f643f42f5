pub mod args;
pub mod progress;
pub mod wrapper;

pub use args::Invocation;
pub use progress::Progress;
pub use wrapper::{EngineError, FFMpegWrapper};
