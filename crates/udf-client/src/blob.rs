//! Reading UDF source files with a hard size cap.
//!
//! # Rust Learning Note
//!
//! The file is read through `AsyncReadExt::take(cap + 1)`: the reader can
//! never hand back more than one byte past the cap, so a file that grows
//! between the metadata check and the read is still detected and rejected
//! instead of being silently truncated.
//!
//! The `File` is an owned value dropped at the end of `read`, so the handle
//! is closed on every return path, early `?` exits included.

use std::io;
use std::path::Path;

use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::trace;
use udf_common::{Error, Result};

/// Default maximum size of a UDF module, in bytes.
pub const DEFAULT_MAX_MODULE_SIZE: u64 = 1_048_576;

/// Reads a local UDF source file fully into memory.
#[derive(Debug, Clone, Copy)]
pub struct ModuleBlobReader {
    max_size: u64,
}

impl Default for ModuleBlobReader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MODULE_SIZE)
    }
}

impl ModuleBlobReader {
    pub fn new(max_size: u64) -> Self {
        Self { max_size }
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Reads `path` into memory.
    ///
    /// Fails with `FileNotFound` when the path is missing, is not a regular
    /// file, or cannot be read, and with `ModuleTooLarge` when the content
    /// exceeds the cap. Content is returned byte for byte.
    pub async fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>> {
        let path = path.as_ref();

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| Error::file_not_found(path, e))?;

        if !metadata.is_file() {
            return Err(Error::file_not_found(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }

        self.check_size(path, metadata.len())?;

        let file = File::open(path)
            .await
            .map_err(|e| Error::file_not_found(path, e))?;

        let mut content = Vec::with_capacity(metadata.len() as usize);
        file.take(self.max_size.saturating_add(1))
            .read_to_end(&mut content)
            .await
            .map_err(|e| Error::file_not_found(path, e))?;

        self.check_size(path, content.len() as u64)?;

        trace!(path = %path.display(), bytes = content.len(), "Read UDF source file");
        Ok(content)
    }

    /// Fails with `ModuleTooLarge` if `size` exceeds the cap.
    pub fn check_size(&self, path: impl AsRef<Path>, size: u64) -> Result<()> {
        if size > self.max_size {
            return Err(Error::module_too_large(path.as_ref(), size, self.max_size));
        }
        Ok(())
    }
}
