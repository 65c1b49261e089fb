//! Full-file copy into a shadow.
//!
//! Streams the original into the shadow in `COPY_CHUNK_SIZE` chunks,
//! watching each write for a shortfall. The copy is abandoned at the first
//! fault; a partially-written shadow file is left behind for the caller to
//! keep or delete. Both files are closed on every exit path.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use tracing::instrument;

use tira_session::COPY_CHUNK_SIZE;

use crate::{Result, ShadowError};

/// Fixed permissive mode bits for newly created shadow files.
pub const SHADOW_FILE_MODE: u32 = 0o666;

/// Copy the full content of `original_path` into `shadow_path`.
///
/// Opens the original read-only, creates (or truncates) the shadow
/// read/write with [`SHADOW_FILE_MODE`], stats the original for its size
/// and streams that many bytes across. Returns the number of bytes copied.
#[instrument(level = "debug")]
pub fn copy_file(original_path: &Path, shadow_path: &Path) -> Result<u64> {
    let mut src = File::open(original_path).map_err(|e| ShadowError::OpenFailed {
        path: original_path.to_path_buf(),
        source: e,
    })?;
    let mut dst = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .mode(SHADOW_FILE_MODE)
        .open(shadow_path)
        .map_err(|e| ShadowError::OpenFailed {
            path: shadow_path.to_path_buf(),
            source: e,
        })?;

    let size = src
        .metadata()
        .map_err(|e| ShadowError::StatFailed {
            path: original_path.to_path_buf(),
            source: e,
        })?
        .len();

    let mut buf = vec![0u8; COPY_CHUNK_SIZE];
    let mut copied: u64 = 0;
    while copied < size {
        let want = usize::min(COPY_CHUNK_SIZE, (size - copied) as usize);
        let n = src.read(&mut buf[..want])?;
        if n == 0 {
            // Source shrank under us; the shadow holds what was readable.
            break;
        }
        let written = dst.write(&buf[..n])?;
        if written != n {
            return Err(ShadowError::WriteShortfall {
                path: shadow_path.to_path_buf(),
                requested: n,
                written,
            });
        }
        copied += n as u64;
    }

    Ok(copied)
}

/// Create an empty shadow with [`SHADOW_FILE_MODE`], without a source copy.
///
/// Used when the original does not exist yet but the caller's open carries
/// a create flag.
pub fn create_empty_shadow(shadow_path: &Path) -> Result<()> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(SHADOW_FILE_MODE)
        .open(shadow_path)
        .map_err(|e| ShadowError::OpenFailed {
            path: shadow_path.to_path_buf(),
            source: e,
        })?;
    Ok(())
}
