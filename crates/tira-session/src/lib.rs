//! # tira-session
//!
//! Per-session tracking table for Tiramisu incognito I/O.
//!
//! One [`SessionState`] lives for the duration of a single incognito
//! session. It owns a bounded, append-only table of [`FileRecord`]s, each
//! mapping a caller-visible path to its private shadow copy plus the set of
//! descriptors currently using that shadow. The table is never compacted:
//! records removed from service are marked [`FileStatus::Deleted`] in place
//! and their slot index stays stable for the rest of the session.
//!
//! This crate does no I/O. Creating shadow files, copying bytes and
//! deleting shadows at teardown is the job of `tira-shadow`.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Maximum byte length of any tracked path (protocol constant).
pub const MAX_PATH_BYTES: usize = 4096;

/// Maximum number of files tracked per session (protocol constant).
pub const MAX_TRACKED_FILES: usize = 128;

/// Maximum open descriptors sharing one shadow file (protocol constant).
pub const MAX_DESCRIPTORS_PER_FILE: usize = 32;

/// Chunk size used when copying originals into shadows (protocol constant).
pub const COPY_CHUNK_SIZE: usize = 16384;

/// Opaque handle representing one open instance of a shadowed file.
///
/// On Unix this is the raw file descriptor the caller obtained from its
/// open; the table never dereferences it.
pub type Descriptor = i32;

/// Errors from the tracking table.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The session's record table is full. Fatal for shadowing the one
    /// file in question; the session itself continues.
    #[error("session table full ({capacity} records)")]
    CapacityExceeded { capacity: usize },

    /// The record already carries `MAX_DESCRIPTORS_PER_FILE` descriptors.
    #[error("descriptor limit ({limit}) reached for {path}")]
    DescriptorLimit { path: PathBuf, limit: usize },

    /// The table could not be allocated. A zero capacity yields an
    /// unusable session and is reported through this kind as well.
    #[error("cannot allocate session table for capacity {capacity}")]
    OutOfMemory { capacity: usize },
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Lifecycle state of one tracked file.
///
/// `Valid --(shadow removed)--> Deleted`; there is no transition out of
/// `Deleted`. A failed removal leaves the record `Valid` so the removal
/// can be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Valid,
    Deleted,
}

/// One entry per original file tracked in the session.
#[derive(Debug)]
pub struct FileRecord {
    original_path: PathBuf,
    shadow_path: PathBuf,
    status: FileStatus,
    descriptors: Vec<Descriptor>,
}

impl FileRecord {
    /// Create a `Valid` record with no attached descriptors.
    pub fn new(original_path: impl Into<PathBuf>, shadow_path: impl Into<PathBuf>) -> Self {
        Self {
            original_path: original_path.into(),
            shadow_path: shadow_path.into(),
            status: FileStatus::Valid,
            descriptors: Vec::with_capacity(4),
        }
    }

    pub fn original_path(&self) -> &Path {
        &self.original_path
    }

    pub fn shadow_path(&self) -> &Path {
        &self.shadow_path
    }

    pub fn status(&self) -> FileStatus {
        self.status
    }

    pub fn is_valid(&self) -> bool {
        self.status == FileStatus::Valid
    }

    /// Mark the shadow as removed. Terminal.
    pub fn mark_deleted(&mut self) {
        self.status = FileStatus::Deleted;
    }

    /// Attach a descriptor to this record.
    ///
    /// Attaching the same descriptor twice is rejected as a bookkeeping
    /// bug on the caller's side.
    pub fn attach(&mut self, descriptor: Descriptor) -> Result<()> {
        if self.descriptors.len() >= MAX_DESCRIPTORS_PER_FILE {
            return Err(SessionError::DescriptorLimit {
                path: self.original_path.clone(),
                limit: MAX_DESCRIPTORS_PER_FILE,
            });
        }
        debug_assert!(!self.descriptors.contains(&descriptor));
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Detach a descriptor. Returns `false` if it was not attached.
    pub fn detach(&mut self, descriptor: Descriptor) -> bool {
        match self.descriptors.iter().position(|&d| d == descriptor) {
            Some(idx) => {
                self.descriptors.swap_remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    pub fn open_count(&self) -> usize {
        self.descriptors.len()
    }
}

/// Stable handle to a slot in the session table.
///
/// Handles are plain indices into the append-only table, so they stay
/// valid until the session is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHandle(usize);

impl RecordHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Bounded ordered table of [`FileRecord`]s for one incognito session.
///
/// Capacity is fixed at construction and the backing storage is allocated
/// up front; `insert` never grows it. Lookups are linear, which is fine at
/// the bounded table sizes this layer works with.
#[derive(Debug)]
pub struct SessionState {
    records: Vec<FileRecord>,
    capacity: usize,
}

impl SessionState {
    /// Allocate storage for up to `capacity` records.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(SessionError::OutOfMemory { capacity });
        }
        Ok(Self {
            records: Vec::with_capacity(capacity),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Linear lookup by original path.
    pub fn find(&self, original_path: &Path) -> Option<&FileRecord> {
        self.records
            .iter()
            .find(|r| r.original_path == original_path)
    }

    /// Linear lookup by original path, mutable.
    pub fn find_mut(&mut self, original_path: &Path) -> Option<&mut FileRecord> {
        self.records
            .iter_mut()
            .find(|r| r.original_path == original_path)
    }

    /// Handle of the record tracking `original_path`, if any.
    pub fn find_handle(&self, original_path: &Path) -> Option<RecordHandle> {
        self.records
            .iter()
            .position(|r| r.original_path == original_path)
            .map(RecordHandle)
    }

    /// Handle of the `Valid` record for `original_path`, if any.
    ///
    /// `Deleted` records are invisible here: a path whose shadow was
    /// removed counts as untracked for redirection purposes.
    pub fn find_valid_handle(&self, original_path: &Path) -> Option<RecordHandle> {
        self.records
            .iter()
            .position(|r| r.is_valid() && r.original_path == original_path)
            .map(RecordHandle)
    }

    /// Record currently holding `descriptor`, if any.
    pub fn find_by_descriptor(&mut self, descriptor: Descriptor) -> Option<&mut FileRecord> {
        self.records
            .iter_mut()
            .find(|r| r.descriptors.contains(&descriptor))
    }

    /// Append a record, returning a stable handle to its slot.
    ///
    /// Fails with `CapacityExceeded` once the table is full; the table is
    /// left unchanged in that case.
    pub fn insert(&mut self, record: FileRecord) -> Result<RecordHandle> {
        if self.records.len() == self.capacity {
            return Err(SessionError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        debug_assert!(self.find_valid_handle(&record.original_path).is_none());
        debug!(
            original = %record.original_path.display(),
            shadow = %record.shadow_path.display(),
            slot = self.records.len(),
            "tracking shadow file"
        );
        self.records.push(record);
        Ok(RecordHandle(self.records.len() - 1))
    }

    pub fn get(&self, handle: RecordHandle) -> Option<&FileRecord> {
        self.records.get(handle.0)
    }

    pub fn get_mut(&mut self, handle: RecordHandle) -> Option<&mut FileRecord> {
        self.records.get_mut(handle.0)
    }

    /// Records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.iter()
    }

    /// Records in insertion order, mutable.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut FileRecord> {
        self.records.iter_mut()
    }
}
