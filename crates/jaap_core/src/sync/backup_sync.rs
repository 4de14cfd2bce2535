//! Upload/download of backups through a `RemoteStore`.

use crate::backup::{self, BackupDocument, BackupError};
use crate::model::profile::ProfileId;
use crate::sync::remote::{RemoteError, RemoteResult, RemoteStore};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};

/// Remote backup failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Another backup or restore request is still running.
    Busy,
    /// No remote backup exists for the profile.
    NotFound(String),
    Remote(RemoteError),
    Backup(BackupError),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Busy => write!(f, "a backup request is already in progress"),
            Self::NotFound(name) => write!(f, "no remote backup named {name}"),
            Self::Remote(err) => write!(f, "remote unavailable: {err}"),
            Self::Backup(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Remote(err) => Some(err),
            Self::Backup(err) => Some(err),
            Self::Busy | Self::NotFound(_) => None,
        }
    }
}

impl From<RemoteError> for SyncError {
    fn from(value: RemoteError) -> Self {
        Self::Remote(value)
    }
}

impl From<BackupError> for SyncError {
    fn from(value: BackupError) -> Self {
        Self::Backup(value)
    }
}

/// Where an upload landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub file_id: String,
    /// `false` when an existing backup was overwritten.
    pub created: bool,
}

/// Remote file name for one profile's backup.
pub fn backup_file_name(profile: &ProfileId) -> String {
    format!("jaap-backup-{profile}.json")
}

/// Serialized access to a remote store.
pub struct BackupSync<R: RemoteStore> {
    remote: R,
    in_flight: AtomicBool,
}

struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<R: RemoteStore> BackupSync<R> {
    pub fn new(remote: R) -> Self {
        Self {
            remote,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Id of the first remote file named `name`.
    pub fn find_remote(&self, name: &str) -> RemoteResult<Option<String>> {
        Ok(self.remote.list(name)?.into_iter().next().map(|file| file.id))
    }

    /// Overwrites `file_id` when given, else creates `name`. Returns the id.
    pub fn put_remote(&self, file_id: Option<&str>, name: &str, bytes: &[u8]) -> RemoteResult<String> {
        match file_id {
            Some(id) => {
                self.remote.update(id, bytes)?;
                Ok(id.to_string())
            }
            None => self.remote.create(name, bytes),
        }
    }

    pub fn get_remote(&self, file_id: &str) -> RemoteResult<Vec<u8>> {
        self.remote.get(file_id)
    }

    /// Stores `bytes` as the remote backup of `profile`.
    pub fn upload(&self, profile: &ProfileId, bytes: &[u8]) -> Result<UploadReport, SyncError> {
        let _guard = self.begin("upload")?;
        let name = backup_file_name(profile);
        let result = self.find_remote(&name).and_then(|existing| {
            let created = existing.is_none();
            self.put_remote(existing.as_deref(), &name, bytes)
                .map(|file_id| UploadReport { file_id, created })
        });
        match result {
            Ok(report) => {
                info!(
                    "event=backup_upload module=sync status=ok profile={} created={} bytes={}",
                    profile,
                    report.created,
                    bytes.len()
                );
                Ok(report)
            }
            Err(err) => {
                warn!(
                    "event=backup_upload module=sync status=error profile={} error_code={}",
                    profile, err.code
                );
                Err(err.into())
            }
        }
    }

    /// Fetches and validates the remote backup of `profile`.
    ///
    /// Nothing is restored here; the caller applies the document.
    pub fn download(&self, profile: &ProfileId) -> Result<BackupDocument, SyncError> {
        let _guard = self.begin("download")?;
        let name = backup_file_name(profile);
        let bytes = self
            .find_remote(&name)
            .and_then(|existing| match existing {
                Some(id) => self.get_remote(&id).map(Some),
                None => Ok(None),
            })
            .map_err(|err| {
                warn!(
                    "event=backup_download module=sync status=error profile={} error_code={}",
                    profile, err.code
                );
                SyncError::Remote(err)
            })?
            .ok_or_else(|| SyncError::NotFound(name.clone()))?;

        let document = backup::validate(&bytes)?;
        info!(
            "event=backup_download module=sync status=ok profile={} bytes={}",
            profile,
            bytes.len()
        );
        Ok(document)
    }

    fn begin(&self, operation: &str) -> Result<InFlight<'_>, SyncError> {
        InFlight::acquire(&self.in_flight).ok_or_else(|| {
            warn!("event=backup_{operation} module=sync status=busy");
            SyncError::Busy
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{backup_file_name, InFlight};
    use crate::model::profile::ProfileId;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn file_name_embeds_profile_id() {
        let id = ProfileId::parse("om").unwrap();
        assert_eq!(backup_file_name(&id), "jaap-backup-om.json");
    }

    #[test]
    fn in_flight_guard_is_exclusive_and_released_on_drop() {
        let flag = AtomicBool::new(false);
        let guard = InFlight::acquire(&flag).unwrap();
        assert!(InFlight::acquire(&flag).is_none());
        drop(guard);
        assert!(InFlight::acquire(&flag).is_some());
    }
}
