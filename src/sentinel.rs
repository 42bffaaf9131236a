//! Own-write sentinel (spec §4.7, glossary "Sentinel file"): an empty file
//! dropped in the system temp directory immediately before any
//! `put_text`/`set_cut_files` call the core makes on the caller's behalf,
//! so the auto-send listener can tell its own writes apart from a genuine
//! user-initiated clipboard change.

use std::fs;
use std::path::PathBuf;

const SENTINEL_FILE_NAME: &str = ".clipshare-desktop-own-write";

fn sentinel_path() -> PathBuf {
    std::env::temp_dir().join(SENTINEL_FILE_NAME)
}

/// Drops the sentinel. Called right before the core writes to the
/// clipboard on the peer's behalf.
pub fn mark_self_write() {
    let _ = fs::write(sentinel_path(), b"");
}

/// Consumes the sentinel if present, returning whether it was there. The
/// auto-send loop calls this once per change event (spec §4.7 step 1).
pub fn check_and_delete_own_write_sentinel() -> bool {
    let path = sentinel_path();
    if path.exists() {
        let _ = fs::remove_file(&path);
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static SENTINEL_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn mark_then_check_consumes_exactly_once() {
        let _guard = SENTINEL_TEST_LOCK.lock().unwrap();
        let _ = fs::remove_file(sentinel_path());
        assert!(!check_and_delete_own_write_sentinel());
        mark_self_write();
        assert!(check_and_delete_own_write_sentinel());
        assert!(!check_and_delete_own_write_sentinel());
    }
}
