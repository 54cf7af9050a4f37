pub mod backend;
pub mod mic;
pub mod probe;

pub use backend::{BackendError, RecorderBackend, RecorderBackendFactory};
pub use mic::MicBackend;
pub use probe::RecordedFile;
