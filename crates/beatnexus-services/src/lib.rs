//! BeatNexus Services Layer
//!
//! Orchestration of the submission pipeline: probe, validate, optionally
//! compress, upload, create the submission record and trigger matchmaking.
//! Re-exports the processing, storage and backend seams so the CLI depends
//! on a single facade.

pub mod error;
pub mod events;
pub mod pipeline;
mod progress;
pub mod session;

pub use beatnexus_api_client::{ApiClient, MatchmakingOutcome, SubmissionBackend, SubmissionCreateResult};
pub use beatnexus_processing::{
    DurationProber, FFmpegCompressor, FFmpegService, MediaProbe, ProgressCallback,
    VideoCompressor, VideoFileValidator,
};
pub use beatnexus_storage::{create_storage, LocalStorage, Storage, StorageError, SupabaseStorage};
pub use error::SubmissionError;
pub use events::{EventCallback, FlowEvent};
pub use pipeline::{Preparation, SubmissionService, SubmissionServiceConfig};
pub use session::{SessionState, SubmissionSession};
