//! Deterministic shadow naming.
//!
//! The on-disk convention is fixed for interop with other tooling that
//! inspects incognito sessions: a shadow file is the original filename
//! prefixed with [`SHADOW_PREFIX`], placed in the same directory as the
//! original unless the session directs shadows elsewhere.

use std::path::{Path, PathBuf};

use tira_session::MAX_PATH_BYTES;

use crate::{Result, ShadowError};

/// Session-scoped prefix prepended to the original filename.
/// Persisted-state layout constant; must be reproduced bit-exact.
pub const SHADOW_PREFIX: &str = "INCOGNITO_TIRAMISU_";

/// Derive the shadow filename for an original filename.
///
/// Fails with [`ShadowError::BufferTooSmall`] when the prefixed name
/// (counting the NUL terminator the wire convention reserves) would exceed
/// `MAX_PATH_BYTES`. That failure is non-retryable for this path.
pub fn derive_shadow_name(original_filename: &str) -> Result<String> {
    if SHADOW_PREFIX.len() + original_filename.len() + 1 >= MAX_PATH_BYTES {
        return Err(ShadowError::BufferTooSmall {
            path: PathBuf::from(original_filename),
            limit: MAX_PATH_BYTES,
        });
    }
    let mut name = String::with_capacity(SHADOW_PREFIX.len() + original_filename.len());
    name.push_str(SHADOW_PREFIX);
    name.push_str(original_filename);
    Ok(name)
}

/// Join directory and shadow filename with a single separator.
///
/// Fails with [`ShadowError::BufferTooSmall`] when the full path (plus NUL)
/// would exceed `MAX_PATH_BYTES`.
pub fn derive_shadow_path(directory: &Path, shadow_filename: &str) -> Result<PathBuf> {
    let joined = directory.join(shadow_filename);
    if joined.as_os_str().len() + 1 >= MAX_PATH_BYTES {
        return Err(ShadowError::BufferTooSmall {
            path: joined,
            limit: MAX_PATH_BYTES,
        });
    }
    Ok(joined)
}
