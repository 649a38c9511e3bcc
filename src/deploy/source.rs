//! Byte-stream sources for bundle archives.

use crate::error::Result;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// Opens a fresh byte stream with the bundle archive on every call.
pub trait StreamSource: Send + Sync {
    /// Opens the stream.
    fn open(&self) -> Result<Box<dyn Read>>;

    /// Describes the source for diagnostics.
    fn describe(&self) -> String;
}

/// A stream source reading a file.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Creates a new instance for the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StreamSource for FileSource {
    fn open(&self) -> Result<Box<dyn Read>> {
        Ok(Box::new(File::open(&self.path)?))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
