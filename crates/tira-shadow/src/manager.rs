//! Shadow-file lifecycle over a borrowed session table.
//!
//! [`ShadowFileManager`] owns nothing but the shadow-placement policy; the
//! record storage belongs to `SessionState` and is only borrowed per call.
//! Shadow files on disk are owned, in the deletion-responsibility sense, by
//! the session that created them: [`ShadowFileManager::teardown_all`] is
//! their single release point.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use tira_session::{Descriptor, FileRecord, RecordHandle, SessionState};

use crate::naming;
use crate::{Result, ShadowError};

/// Shadow naming, copy-once registration, descriptor bookkeeping and
/// teardown cleanup.
#[derive(Debug, Default)]
pub struct ShadowFileManager {
    /// Directory shadows are placed in; `None` means alongside the
    /// original file (the interop default).
    shadow_dir: Option<PathBuf>,
}

impl ShadowFileManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shadow_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            shadow_dir: Some(dir.into()),
        }
    }

    pub fn shadow_dir(&self) -> Option<&Path> {
        self.shadow_dir.as_deref()
    }

    /// Compute the shadow path for `original_path` under this manager's
    /// placement policy.
    pub fn shadow_path_for(&self, original_path: &Path) -> Result<PathBuf> {
        let file_name = original_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ShadowError::InvalidPath {
                path: original_path.to_path_buf(),
            })?;
        let shadow_name = naming::derive_shadow_name(file_name)?;
        let directory = match &self.shadow_dir {
            Some(dir) => dir.as_path(),
            None => original_path.parent().unwrap_or(Path::new(".")),
        };
        naming::derive_shadow_path(directory, &shadow_name)
    }

    /// Record an open of `original_path` through `shadow_path`.
    ///
    /// First open of a path inserts a fresh `Valid` record; a repeat open
    /// of an already-tracked path attaches the descriptor to the existing
    /// record instead (copy-once-per-session semantics live at the call
    /// site, keyed off [`SessionState::find_valid_handle`]).
    pub fn register_open(
        &self,
        state: &mut SessionState,
        original_path: &Path,
        shadow_path: &Path,
        descriptor: Descriptor,
    ) -> Result<RecordHandle> {
        if let Some(handle) = state.find_valid_handle(original_path) {
            let record = state
                .get_mut(handle)
                .expect("valid handle came from this table");
            record.attach(descriptor)?;
            debug!(
                original = %original_path.display(),
                descriptor,
                open_count = record.open_count(),
                "attached descriptor to existing shadow"
            );
            return Ok(handle);
        }

        let mut record = FileRecord::new(original_path, shadow_path);
        record.attach(descriptor)?;
        let handle = state.insert(record)?;
        debug!(
            original = %original_path.display(),
            shadow = %shadow_path.display(),
            descriptor,
            "registered new shadow mapping"
        );
        Ok(handle)
    }

    /// Bookkeeping for a closed descriptor.
    ///
    /// The shadow file stays on disk even when the descriptor set becomes
    /// empty; deletion happens only at teardown or explicitly.
    pub fn close(&self, state: &mut SessionState, descriptor: Descriptor) {
        match state.find_by_descriptor(descriptor) {
            Some(record) => {
                record.detach(descriptor);
                debug!(
                    original = %record.original_path().display(),
                    descriptor,
                    open_count = record.open_count(),
                    "descriptor closed"
                );
            }
            None => {
                debug!(descriptor, "close on untracked descriptor");
            }
        }
    }

    /// Delete a record's shadow file.
    ///
    /// On success the record advances to `Deleted`. On failure the record
    /// stays `Valid` so a retry can be attempted, and the underlying error
    /// code is surfaced.
    pub fn remove_shadow(&self, record: &mut FileRecord) -> Result<()> {
        if let Err(e) = fs::remove_file(record.shadow_path()) {
            warn!(
                shadow = %record.shadow_path().display(),
                errno = e.raw_os_error(),
                "failed to delete shadow file"
            );
            return Err(ShadowError::DeleteFailed {
                path: record.shadow_path().to_path_buf(),
                source: e,
            });
        }
        record.mark_deleted();
        debug!(shadow = %record.shadow_path().display(), "shadow file deleted");
        Ok(())
    }

    /// Delete every still-present shadow, in insertion order.
    ///
    /// Fail-fast: stops at the first deletion failure and returns it
    /// without attempting the remaining records. Records already `Deleted`
    /// are skipped.
    pub fn teardown_all(&self, state: &mut SessionState) -> Result<()> {
        for record in state.iter_mut() {
            if !record.is_valid() {
                continue;
            }
            self.remove_shadow(record)?;
        }
        Ok(())
    }
}
