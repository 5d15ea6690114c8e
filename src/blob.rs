//! Storage for received files.

use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

/// Errors from storing a received file.
#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Failed to store file in {dir}: {source}")]
    StoreFailed {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Destination for decrypted file contents.
pub trait BlobSink: Send {
    /// Stores `bytes` and returns where they went.
    fn store(&mut self, bytes: &[u8]) -> Result<PathBuf, BlobError>;
}

/// Writes each received file into a directory under a unique name.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    counter: u64,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            counter: 0,
        }
    }

    /// A sink writing into the system temp directory.
    pub fn temp() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    fn next_name(&mut self) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        self.counter += 1;
        format!("msgU_{}_{}", nanos, self.counter)
    }
}

impl BlobSink for DirectorySink {
    fn store(&mut self, bytes: &[u8]) -> Result<PathBuf, BlobError> {
        let wrap = |dir: &PathBuf, source| BlobError::StoreFailed {
            dir: dir.clone(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(|e| wrap(&self.dir, e))?;
        let name = self.next_name();
        let path = self.dir.join(name);
        fs::write(&path, bytes).map_err(|e| wrap(&self.dir, e))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_store_writes_unique_files() {
        let dir = tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path());

        let a = sink.store(b"first").unwrap();
        let b = sink.store(b"second").unwrap();

        assert_ne!(a, b);
        assert!(a.starts_with(dir.path()));
        assert_eq!(fs::read(&a).unwrap(), b"first");
        assert_eq!(fs::read(&b).unwrap(), b"second");
    }

    #[test]
    fn test_store_creates_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("downloads").join("messageu");
        let mut sink = DirectorySink::new(&nested);

        let path = sink.store(&[]).unwrap();
        assert!(path.starts_with(&nested));
        assert!(fs::read(&path).unwrap().is_empty());
    }

    #[test]
    fn test_store_into_file_fails() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"x").unwrap();

        let mut sink = DirectorySink::new(&blocker);
        assert!(sink.store(b"data").is_err());
    }
}
