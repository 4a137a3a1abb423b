//! Storage backends behind the repository traits.

mod hosted;
mod memory;

use thiserror::Error;

pub use hosted::{map_status, HostedBackend};
pub use memory::{sample_jobs, InMemoryBackend};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{0} must be set for the hosted backend")]
    MissingSetting(&'static str),
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),
}
