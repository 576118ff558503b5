//! Statistics error types

use std::path::PathBuf;

use contracts::{TagId, Time};
use thiserror::Error;

/// Statistics errors
#[derive(Debug, Error)]
pub enum StatisticsError {
    /// Time merge of windows that are not in order
    #[error("cannot merge {tag}: older window ends at {older_last}, newer starts at {newer_first}")]
    OutOfOrder {
        tag: TagId,
        older_last: Time,
        newer_first: Time,
    },

    /// Space merge of two different tags
    #[error("cannot merge statistics of {left} with {right}")]
    TagMismatch { left: TagId, right: TagId },

    #[error("statistics cache {path:?}: {source}")]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("statistics cache {path:?} could not be encoded: {source}")]
    CacheEncode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },
}

pub type Result<T> = std::result::Result<T, StatisticsError>;
