//! Query error types

use contracts::ContractError;
use ingestion::IngestionError;
use thiserror::Error;

/// Query errors
///
/// Per-frame problems never surface here: malformed frames are skipped and
/// counted by the load stage.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Sources could not be opened
    #[error("cannot open sources: {0}")]
    Ingestion(#[from] IngestionError),

    /// The sink refused a result
    #[error("sink {sink} failed: {source}")]
    Sink {
        sink: String,
        #[source]
        source: ContractError,
    },

    /// A pipeline stage panicked or was aborted
    #[error("{stage} stage failed: {message}")]
    Stage {
        stage: &'static str,
        message: String,
    },
}

impl QueryError {
    pub fn sink(sink: impl Into<String>, source: ContractError) -> Self {
        Self::Sink {
            sink: sink.into(),
            source,
        }
    }

    pub fn stage(stage: &'static str, message: impl ToString) -> Self {
        Self::Stage {
            stage,
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
