//! Public incognito session surface.
//!
//! [`IncognitoSession`] threads the session state through every call
//! instead of living in process-wide mutable statics, and guards it with a
//! single coarse mutex: the bounded, rarely-contended table does not
//! warrant finer locking. One instance corresponds to one process-level
//! incognito session.

use std::fs::File;
use std::io;
use std::os::unix::io::FromRawFd;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use nix::fcntl::OFlag;
use nix::sys::stat::Mode;

use tracing::{debug, error};

use tira_config::{log_session_info, log_session_warn};
use tira_session::{Descriptor, SessionState};

use crate::copy;
use crate::manager::ShadowFileManager;
use crate::{Result, ShadowError};

/// Result of routing one open through the session.
#[derive(Debug)]
pub struct OpenOutcome {
    /// The opened file. For tracked opens this is the shadow copy; the
    /// caller owns it and closing it closes the OS descriptor.
    pub file: File,
    /// Descriptor identifier for [`IncognitoSession::close`] bookkeeping.
    pub descriptor: Descriptor,
    /// Shadow path serving this open, when redirected.
    pub shadow_path: Option<PathBuf>,
    /// Whether the open was redirected and registered.
    pub tracked: bool,
}

struct Active {
    state: SessionState,
    manager: ShadowFileManager,
}

/// One process-level incognito session.
///
/// `init` starts it, `open`/`close`/`lookup` operate on it, `stop` purges
/// every shadow file and releases the table. Re-initializing while active
/// is a logged no-op, per the session contract.
pub struct IncognitoSession {
    inner: Mutex<Option<Active>>,
    shadow_dir: Option<PathBuf>,
}

impl IncognitoSession {
    /// Session placing shadows alongside their originals (interop default).
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
            shadow_dir: None,
        }
    }

    /// Session placing shadows in a dedicated directory.
    pub fn with_shadow_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: Mutex::new(None),
            shadow_dir: Some(dir.into()),
        }
    }

    /// Session configured from `tira-config` (shadow directory; pair with
    /// `config.session.capacity` for [`IncognitoSession::init`]).
    pub fn from_config(config: &tira_config::Config) -> Self {
        Self {
            inner: Mutex::new(None),
            shadow_dir: config.session.shadow_dir.clone(),
        }
    }

    /// Start the session with storage for up to `capacity` tracked files.
    ///
    /// Idempotent: if a session is already active this logs a warning and
    /// returns success without reallocating or losing existing records.
    pub fn init(&self, capacity: usize) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.is_some() {
            log_session_warn!(
                "Incognito session already active; restart the process to start a new one"
            );
            return Ok(());
        }

        let state = SessionState::new(capacity)?;
        let manager = match &self.shadow_dir {
            Some(dir) => ShadowFileManager::with_shadow_dir(dir.clone()),
            None => ShadowFileManager::new(),
        };
        *inner = Some(Active { state, manager });
        log_session_info!("Incognito session started", capacity = capacity);
        Ok(())
    }

    /// Whether a session is currently active.
    pub fn is_active(&self) -> bool {
        self.inner.lock().unwrap().is_some()
    }

    /// Number of files currently tracked (0 when inactive).
    pub fn tracked_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap()
            .as_ref()
            .map_or(0, |a| a.state.record_count())
    }

    /// End the session: delete every still-present shadow and release the
    /// table. Best-effort surface; a deletion failure is logged and the
    /// session still ends (the failing shadow is orphaned, not retried).
    pub fn stop(&self) {
        let mut inner = self.inner.lock().unwrap();
        let Some(mut active) = inner.take() else {
            return;
        };
        if let Err(e) = active.manager.teardown_all(&mut active.state) {
            error!(component = "SESSION", error = %e, "Shadow cleanup incomplete at session stop");
        }
        log_session_info!("Incognito session stopped");
    }

    /// Route one file open through the session.
    ///
    /// Append-mode opens are redirected to the shadow copy: the original
    /// is copied once per session, repeat opens share the existing shadow,
    /// and the returned descriptor is registered for bookkeeping. All
    /// other opens pass through untracked. Shadowing failures are local to
    /// this one file; the session stays usable.
    pub fn open(&self, path: &Path, flags: OFlag, mode: Mode) -> Result<OpenOutcome> {
        let mut inner = self.inner.lock().unwrap();
        let active = inner.as_mut().ok_or(ShadowError::NotActive)?;

        if !flags.contains(OFlag::O_APPEND) {
            let file = open_raw(path, flags, mode)?;
            return Ok(OpenOutcome {
                descriptor: raw_descriptor(&file),
                file,
                shadow_path: None,
                tracked: false,
            });
        }

        let shadow_path = active.manager.shadow_path_for(path)?;

        if active.state.find_valid_handle(path).is_none() {
            // First open of this path: make sure the table has room before
            // spending the copy, so a full table leaves no stray shadow.
            if active.state.record_count() == active.state.capacity() {
                return Err(tira_session::SessionError::CapacityExceeded {
                    capacity: active.state.capacity(),
                }
                .into());
            }
            if path.exists() {
                let bytes = copy::copy_file(path, &shadow_path)?;
                debug!(
                    component = "SHADOW",
                    original = %path.display(),
                    shadow = %shadow_path.display(),
                    bytes,
                    "shadow copy created"
                );
            } else if flags.contains(OFlag::O_CREAT) {
                copy::create_empty_shadow(&shadow_path)?;
                debug!(
                    component = "SHADOW",
                    shadow = %shadow_path.display(),
                    "empty shadow created for new file"
                );
            } else {
                return Err(ShadowError::OpenFailed {
                    path: path.to_path_buf(),
                    source: io::Error::from_raw_os_error(libc::ENOENT),
                });
            }
        }

        let file = open_raw(&shadow_path, flags, mode)?;
        let descriptor = raw_descriptor(&file);
        active
            .manager
            .register_open(&mut active.state, path, &shadow_path, descriptor)?;

        Ok(OpenOutcome {
            file,
            descriptor,
            shadow_path: Some(shadow_path),
            tracked: true,
        })
    }

    /// Bookkeeping for a closed descriptor. Never deletes the shadow file;
    /// closing the OS descriptor itself is the caller's job (it owns the
    /// `File`).
    pub fn close(&self, descriptor: Descriptor) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(active) = inner.as_mut() {
            active.manager.close(&mut active.state, descriptor);
        }
    }

    /// Is `path` currently shadowed? Returns the shadow path if so.
    pub fn lookup(&self, path: &Path) -> Option<PathBuf> {
        let inner = self.inner.lock().unwrap();
        let active = inner.as_ref()?;
        let handle = active.state.find_valid_handle(path)?;
        active
            .state
            .get(handle)
            .map(|r| r.shadow_path().to_path_buf())
    }
}

impl Default for IncognitoSession {
    fn default() -> Self {
        Self::new()
    }
}

fn open_raw(path: &Path, flags: OFlag, mode: Mode) -> Result<File> {
    let fd = nix::fcntl::open(path, flags, mode).map_err(|e| ShadowError::OpenFailed {
        path: path.to_path_buf(),
        source: io::Error::from(e),
    })?;
    // Safety: fd was just returned by open() and is owned by nobody else.
    Ok(unsafe { File::from_raw_fd(fd) })
}

fn raw_descriptor(file: &File) -> Descriptor {
    use std::os::unix::io::AsRawFd;
    file.as_raw_fd()
}
