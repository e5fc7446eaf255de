use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::fs::atomic::FileState;

#[derive(Debug, Error)]
pub enum AtomicIoError {
    #[error("invalid target path: {path:?}")]
    InvalidPath { path: PathBuf },

    #[error("invalid temp file prefix: {prefix:?}")]
    InvalidPrefix { prefix: String },

    #[error("random source unavailable")]
    EntropySource(#[source] rand::Error),

    #[error("no unique temp file for {target:?} after {attempts} attempts")]
    ExhaustedRetries { target: PathBuf, attempts: u32 },

    #[error("I/O error")]
    Io(#[from] io::Error),

    /// rename 失败；`cleanup` 为随后删除临时文件时的错误（若有）。
    #[error("failed to rename {from:?} to {to:?}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
        cleanup: Option<io::Error>,
    },

    #[error("file already committed")]
    AlreadyCommitted,

    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("cannot {operation} in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: FileState,
    },
}

pub type Result<T> = std::result::Result<T, AtomicIoError>;

impl From<AtomicIoError> for io::Error {
    fn from(err: AtomicIoError) -> Self {
        match err {
            AtomicIoError::Io(inner) => inner,
            other => {
                let kind = match &other {
                    AtomicIoError::InvalidPath { .. } | AtomicIoError::InvalidPrefix { .. } => {
                        io::ErrorKind::InvalidInput
                    }
                    AtomicIoError::ExhaustedRetries { .. } => io::ErrorKind::AlreadyExists,
                    AtomicIoError::ShortWrite { .. } => io::ErrorKind::WriteZero,
                    AtomicIoError::Rename { source, .. } => source.kind(),
                    _ => io::ErrorKind::Other,
                };
                io::Error::new(kind, other)
            }
        }
    }
}
