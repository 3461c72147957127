use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown speed profile `{0}` (expected 1-4 or slow/normal/fast/very-fast)")]
    UnknownProfile(String),
    #[error("grid {width}x{height} is too small for a snake of length {length}")]
    GridTooSmall { width: i32, height: i32, length: usize },
    #[error("grid {width}x{height} is too large (at most {max} cells a side)")]
    GridTooLarge { width: i32, height: i32, max: i32 },
    #[error("could not access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed data in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
