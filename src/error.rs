use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::naming::DecodeError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("unmanaged filename: {0}")]
    Filename(#[from] DecodeError),
    #[error("time formatting failed: {0}")]
    Format(#[from] time::error::Format),
    #[error("time component out of range: {0}")]
    ComponentRange(#[from] time::error::ComponentRange),
    #[error("cleanup of {} failed: {source}", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unknown log level {0:?}")]
    UnknownLevel(String),
    #[error("dispatcher is not running")]
    DispatcherStopped,
    #[error("lock poisoned: {0}")]
    Poisoned(&'static str),
}

impl From<Error> for io::Error {
    fn from(value: Error) -> Self {
        match value {
            Error::Io(err) => err,
            Error::Cleanup { source, .. } => source,
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
