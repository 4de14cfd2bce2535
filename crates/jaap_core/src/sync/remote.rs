//! Remote file-store SPI.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// File entry as reported by the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
}

/// Stable error envelope returned by remote adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl RemoteError {
    pub fn new(code: impl Into<String>, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }

    /// Transport or auth failure; the remote could not be reached.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new("remote_unavailable", message, true)
    }
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for RemoteError {}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Minimal file store: list by name, create, overwrite, fetch.
///
/// Adapters own auth and transport; calls may block.
pub trait RemoteStore: Send + Sync {
    /// Files whose name equals `name`.
    fn list(&self, name: &str) -> RemoteResult<Vec<RemoteFile>>;

    /// Creates a file and returns its id.
    fn create(&self, name: &str, bytes: &[u8]) -> RemoteResult<String>;

    /// Overwrites the contents of file `id`.
    fn update(&self, id: &str, bytes: &[u8]) -> RemoteResult<()>;

    fn get(&self, id: &str) -> RemoteResult<Vec<u8>>;
}

impl<R: RemoteStore + ?Sized> RemoteStore for &R {
    fn list(&self, name: &str) -> RemoteResult<Vec<RemoteFile>> {
        (**self).list(name)
    }

    fn create(&self, name: &str, bytes: &[u8]) -> RemoteResult<String> {
        (**self).create(name, bytes)
    }

    fn update(&self, id: &str, bytes: &[u8]) -> RemoteResult<()> {
        (**self).update(id, bytes)
    }

    fn get(&self, id: &str) -> RemoteResult<Vec<u8>> {
        (**self).get(id)
    }
}
