use crate::diagnostics::Category;
use thiserror::Error;

/// Every failure the reader can produce, tagged with the diagnostic
/// category that detected it (spec §4.6 / §7).
#[derive(Debug, Error)]
pub enum CfbError {
    #[error("not a compound file (offset {offset:?}): {message}")]
    NotCfb { offset: Option<u64>, message: String },

    #[error("unsupported major version (offset {offset:?}): {message}")]
    InvalidVersion { offset: Option<u64>, message: String },

    #[error("invalid byte order mark (offset {offset:?}): {message}")]
    InvalidByteOrder { offset: Option<u64>, message: String },

    #[error("header is corrupt (offset {offset:?}): {message}")]
    HeaderCorrupt { offset: Option<u64>, message: String },

    #[error("malformed FAT (offset {offset:?}): {message}")]
    MalformedFat { offset: Option<u64>, message: String },

    #[error("malformed sector chain (offset {offset:?}): {message}")]
    MalformedChain { offset: Option<u64>, message: String },

    #[error("cycle detected in a sector chain (offset {offset:?}): {message}")]
    CycleDetected { offset: Option<u64>, message: String },

    #[error("cycle detected in the directory tree (offset {offset:?}): {message}")]
    DirectoryCycle { offset: Option<u64>, message: String },

    #[error("stream handle is closed")]
    StreamClosed,

    #[error("position out of range: {message}")]
    OutOfRange { message: String },

    #[error("entry not found: {path}")]
    NotFound { path: String },

    #[error("{category:?} promoted to error (offset {offset:?}): {message}")]
    Promoted {
        category: Category,
        offset: Option<u64>,
        message: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] binrw::Error),
}

pub type CfbResult<T> = Result<T, CfbError>;
