//! The core engine: Job Processor, Multi-Track Orchestrator, Progress &
//! Event Bus, webhook delivery, worker pool, and ambient configuration.

pub mod config;
pub mod event_bus;
pub mod orchestrator;
pub mod pipeline;
pub mod pool;
pub mod processor;
pub mod repository;
pub mod webhook;

pub use config::EngineConfig;
pub use event_bus::{EventBus, JobEvent};
pub use orchestrator::Orchestrator;
pub use pool::WorkerPool;
pub use processor::JobProcessor;
pub use repository::InMemoryJobRepository;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize structured logging, matching the teacher's
/// `aiwisper-worker::main` setup (`tracing_subscriber::registry()` +
/// `EnvFilter` + `fmt::layer()`), for binaries that embed this engine.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
