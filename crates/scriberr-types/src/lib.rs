//! Canonical data model for the Scriberr core engine.
//!
//! Every type here is the language-independent shape the job processor,
//! registry, adapters, and fusion pipeline pass between each other. None of
//! it is tied to a storage backend; persistence is the
//! [`repository::JobRepository`] contract.

pub mod error;
pub mod job;
pub mod repository;
pub mod transcript;

pub use error::ScriberrError;
pub use job::{
    AudioInput, ExecutionRecord, ExecutionStatus, Job, JobId, JobStatus, Parameters,
    SpeakerMapping, TrackFile, TrackTiming,
};
pub use repository::{JobRepository, JobWithAssociations};
pub use transcript::{DiarizationResult, DiarizationSegment, Segment, TranscriptResult, WordSegment};
