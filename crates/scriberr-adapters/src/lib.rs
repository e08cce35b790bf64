//! Concrete transcription and diarization adapters.
//!
//! Every local adapter (all but [`openai_cloud`]) launches a subprocess
//! through `scriberr_worker`; `openai_cloud` speaks HTTPS directly.

pub mod canary;
pub mod common;
pub mod openai_cloud;
pub mod parakeet;
pub mod pyannote;
pub mod sortformer;
pub mod voxtral;
pub mod whisper;

pub use canary::CanaryAdapter;
pub use openai_cloud::OpenAiCloudAdapter;
pub use parakeet::ParakeetAdapter;
pub use pyannote::PyannoteAdapter;
pub use sortformer::SortformerAdapter;
pub use voxtral::VoxtralAdapter;
pub use whisper::WhisperAdapter;
