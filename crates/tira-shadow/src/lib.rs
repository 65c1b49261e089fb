//! # tira-shadow
//!
//! Shadow file redirection for Tiramisu incognito I/O.
//!
//! While an incognito session is active, file opens that qualify for
//! redirection (append-mode opens, per policy) are serviced from a private
//! *shadow copy* of the original file. The original is copied once per
//! session, all writes land in the shadow, and every shadow is deleted when
//! the session ends. The original file is never touched.
//!
//! Layering:
//! - [`naming`] derives the deterministic shadow filename and path
//!   (`INCOGNITO_TIRAMISU_` + original filename, same directory unless a
//!   shadow directory is configured).
//! - [`copy`] streams the original into the shadow in 16 KiB chunks.
//! - [`manager::ShadowFileManager`] ties naming, copy, descriptor
//!   bookkeeping and teardown cleanup together over a borrowed
//!   `tira_session::SessionState`.
//! - [`session::IncognitoSession`] is the public, coarse-locked surface:
//!   `init` / `stop` / `open` / `close` / `lookup`.
//!
//! This crate provides the mapping primitives only. How callers intercept
//! opens and when they choose to redirect is outside its scope.

pub mod copy;
pub mod manager;
pub mod naming;
pub mod session;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use manager::ShadowFileManager;
pub use session::{IncognitoSession, OpenOutcome};

/// Errors that can occur while shadowing a file.
///
/// Naming and copy failures are local to one file: the session keeps
/// running and other files keep being shadowed. Only teardown treats a
/// failure as terminal for the cleanup pass (fail-fast).
#[derive(Error, Debug)]
pub enum ShadowError {
    /// The derived shadow name or path would exceed `MAX_PATH_BYTES`.
    /// Non-retryable for this path; the file cannot be shadowed.
    #[error("shadow path for {path} would exceed {limit} bytes")]
    BufferTooSmall { path: PathBuf, limit: usize },

    /// The path has no filename component or is not valid UTF-8.
    #[error("path cannot be shadowed: {path}")]
    InvalidPath { path: PathBuf },

    /// Opening the original or creating the shadow failed.
    #[error("cannot open {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The original could not be stat'd for its size.
    #[error("cannot stat {path}: {source}")]
    StatFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A chunk write to the shadow wrote fewer bytes than requested.
    /// The copy is abandoned and the partial shadow is left behind.
    #[error("short write to {path}: wrote {written} of {requested} bytes")]
    WriteShortfall {
        path: PathBuf,
        requested: usize,
        written: usize,
    },

    /// Deleting a shadow file failed. The record stays `Valid` so the
    /// deletion can be retried.
    #[error("cannot delete shadow {path}: {source}")]
    DeleteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No incognito session is active.
    #[error("no incognito session is active")]
    NotActive,

    /// Tracking-table error (capacity, descriptor limit).
    #[error(transparent)]
    Session(#[from] tira_session::SessionError),

    /// Other I/O error during the copy stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ShadowError {
    /// Underlying OS error code, when one exists.
    pub fn os_error(&self) -> Option<i32> {
        match self {
            ShadowError::OpenFailed { source, .. }
            | ShadowError::StatFailed { source, .. }
            | ShadowError::DeleteFailed { source, .. }
            | ShadowError::Io(source) => source.raw_os_error(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShadowError>;
