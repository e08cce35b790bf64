//! The audio preprocessor: probing, format conversion, and file I/O shared
//! by every adapter in `scriberr-adapters`.

pub mod file_io;
pub mod preprocess;
pub mod probe;
pub mod resampling;

pub use preprocess::{auto_convert_if_requested, build_audio_input, ensure_pcm16_mono_16k};
pub use probe::{probe as probe_audio, ProbedAudio};
