//! Integration tests for the incognito session surface.
//!
//! These drive the full redirect pipeline against a real file system:
//! init, append-mode opens redirected into shadow copies, descriptor
//! bookkeeping, lookup, and teardown purging every shadow while leaving
//! the originals untouched.

use std::fs;
use std::io::Write;
use std::path::Path;

use nix::fcntl::OFlag;
use nix::sys::stat::Mode;

use tira_config::testing::TestEnvironment;
use tira_session::SessionError;
use tira_shadow::{IncognitoSession, ShadowError};

fn append_flags() -> OFlag {
    OFlag::O_WRONLY | OFlag::O_APPEND
}

fn mode_rw() -> Mode {
    Mode::from_bits_truncate(0o644)
}

#[test]
fn end_to_end_session_lifecycle() {
    let env = TestEnvironment::new().unwrap();
    let a = env.create_file("a.txt", b"alpha").unwrap();
    let b = env.create_file("b.txt", b"bravo").unwrap();

    let session = IncognitoSession::new();
    session.init(4).unwrap();

    let out_a = session.open(&a, append_flags(), mode_rw()).unwrap();
    let out_b = session.open(&b, append_flags(), mode_rw()).unwrap();
    assert!(out_a.tracked && out_b.tracked);

    let shadow_a = out_a.shadow_path.clone().unwrap();
    let shadow_b = out_b.shadow_path.clone().unwrap();
    assert_eq!(
        shadow_a.file_name().unwrap(),
        "INCOGNITO_TIRAMISU_a.txt",
        "shadow naming convention is bit-exact"
    );
    assert_eq!(fs::read(&shadow_a).unwrap(), b"alpha");

    session.close(out_a.descriptor);
    session.close(out_b.descriptor);
    drop(out_a);
    drop(out_b);

    session.stop();
    assert!(!shadow_a.exists());
    assert!(!shadow_b.exists());
    assert_eq!(fs::read(&a).unwrap(), b"alpha");
    assert_eq!(fs::read(&b).unwrap(), b"bravo");
    assert!(!session.is_active());
    assert_eq!(session.tracked_count(), 0);
}

#[test]
fn session_restart_after_stop_succeeds() {
    let env = TestEnvironment::new().unwrap();
    let a = env.create_file("a.txt", b"alpha").unwrap();

    let session = IncognitoSession::new();
    session.init(2).unwrap();
    session.open(&a, append_flags(), mode_rw()).unwrap();
    session.stop();

    // Idempotent restart: a fresh table, no leftover records.
    session.init(2).unwrap();
    assert_eq!(session.tracked_count(), 0);
    assert!(session.lookup(&a).is_none());
    session.stop();
}

#[test]
fn writes_land_in_shadow_not_original() {
    let env = TestEnvironment::new().unwrap();
    let a = env.create_file("log.txt", b"line1\n").unwrap();

    let session = IncognitoSession::new();
    session.init(4).unwrap();

    let mut out = session.open(&a, append_flags(), mode_rw()).unwrap();
    out.file.write_all(b"line2\n").unwrap();
    out.file.flush().unwrap();

    let shadow = out.shadow_path.clone().unwrap();
    assert_eq!(fs::read(&shadow).unwrap(), b"line1\nline2\n");
    assert_eq!(fs::read(&a).unwrap(), b"line1\n");

    session.close(out.descriptor);
    session.stop();
    assert_eq!(fs::read(&a).unwrap(), b"line1\n");
}

#[test]
fn repeat_open_shares_one_shadow_with_two_descriptors() {
    let env = TestEnvironment::new().unwrap();
    let a = env.create_file("a.txt", b"alpha").unwrap();

    let session = IncognitoSession::new();
    session.init(4).unwrap();

    let first = session.open(&a, append_flags(), mode_rw()).unwrap();
    let second = session.open(&a, append_flags(), mode_rw()).unwrap();

    // Copy-once: exactly one record, one shadow, two live descriptors.
    assert_eq!(session.tracked_count(), 1);
    assert_eq!(first.shadow_path, second.shadow_path);
    assert_ne!(first.descriptor, second.descriptor);

    session.close(first.descriptor);
    // Still tracked while the other descriptor is open, and after both
    // close: deletion happens only at teardown.
    session.close(second.descriptor);
    assert!(session.lookup(&a).is_some());

    session.stop();
    assert!(session.lookup(&a).is_none());
}

#[test]
fn copy_happens_once_per_session() {
    let env = TestEnvironment::new().unwrap();
    let a = env.create_file("a.txt", b"alpha").unwrap();

    let session = IncognitoSession::new();
    session.init(4).unwrap();

    let mut first = session.open(&a, append_flags(), mode_rw()).unwrap();
    first.file.write_all(b"-more").unwrap();
    first.file.flush().unwrap();
    session.close(first.descriptor);
    drop(first);

    // A second open must not re-copy and clobber the session's writes.
    let second = session.open(&a, append_flags(), mode_rw()).unwrap();
    let shadow = second.shadow_path.clone().unwrap();
    assert_eq!(fs::read(&shadow).unwrap(), b"alpha-more");

    session.close(second.descriptor);
    session.stop();
}

#[test]
fn open_beyond_capacity_fails_and_session_continues() {
    let env = TestEnvironment::new().unwrap();
    let a = env.create_file("a.txt", b"alpha").unwrap();
    let b = env.create_file("b.txt", b"bravo").unwrap();

    let session = IncognitoSession::new();
    session.init(1).unwrap();

    let out_a = session.open(&a, append_flags(), mode_rw()).unwrap();
    let err = session.open(&b, append_flags(), mode_rw()).unwrap_err();
    assert!(matches!(
        err,
        ShadowError::Session(SessionError::CapacityExceeded { capacity: 1 })
    ));
    // The full table left no stray shadow for b.
    assert!(!env.work_dir.join("INCOGNITO_TIRAMISU_b.txt").exists());

    // The session keeps serving the tracked file.
    assert!(session.lookup(&a).is_some());
    session.close(out_a.descriptor);
    session.stop();
}

#[test]
fn lookup_reports_only_shadowed_paths() {
    let env = TestEnvironment::new().unwrap();
    let a = env.create_file("a.txt", b"alpha").unwrap();
    let b = env.create_file("b.txt", b"bravo").unwrap();

    let session = IncognitoSession::new();
    session.init(4).unwrap();

    let out = session.open(&a, append_flags(), mode_rw()).unwrap();
    assert_eq!(session.lookup(&a), out.shadow_path);
    assert!(session.lookup(&b).is_none());
    assert!(session.lookup(Path::new("/does/not/exist")).is_none());

    session.close(out.descriptor);
    session.stop();
}

#[test]
fn shadows_can_be_directed_into_dedicated_directory() {
    let env = TestEnvironment::new().unwrap();
    let a = env.create_file("a.txt", b"alpha").unwrap();

    let session = IncognitoSession::from_config(&env.config());
    session.init(4).unwrap();

    let out = session.open(&a, append_flags(), mode_rw()).unwrap();
    let shadow = out.shadow_path.clone().unwrap();
    assert_eq!(shadow.parent().unwrap(), env.shadow_dir);
    assert!(shadow.exists());

    session.close(out.descriptor);
    session.stop();
    assert!(!shadow.exists());
}

#[test]
fn externally_deleted_shadow_does_not_wedge_stop() {
    let env = TestEnvironment::new().unwrap();
    let a = env.create_file("a.txt", b"alpha").unwrap();

    let session = IncognitoSession::new();
    session.init(4).unwrap();
    let out = session.open(&a, append_flags(), mode_rw()).unwrap();
    let shadow = out.shadow_path.clone().unwrap();
    session.close(out.descriptor);
    drop(out);

    // Someone else removed the shadow behind our back.
    fs::remove_file(&shadow).unwrap();

    // stop() surfaces the failure in the log but the session still ends.
    session.stop();
    assert!(!session.is_active());
    assert_eq!(fs::read(&a).unwrap(), b"alpha");
}
