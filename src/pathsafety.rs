//! Filename and path safety (spec §4.4), grounded in the original's
//! `proto/methods.c` `_is_valid_fname` / `_check_and_rename`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Configuration;
use crate::error::{ClipShareError, Result};
use crate::fsadapter;
use crate::wire::MAX_FILE_NAME_LENGTH;

/// Validates a wire-format name: UTF-8 (guaranteed by `&str`), non-empty,
/// at most 2048 bytes, and free of any byte below 0x20 (spec §4.4, §8).
pub fn validate_wire_name(raw: &[u8]) -> Result<String> {
    if raw.is_empty() || raw.len() > MAX_FILE_NAME_LENGTH {
        return Err(ClipShareError::DataError(format!(
            "file name length {} out of range [1, {}]",
            raw.len(),
            MAX_FILE_NAME_LENGTH
        )));
    }
    if raw.iter().any(|&b| b < 0x20) {
        return Err(ClipShareError::DataError(
            "file name contains a control byte".into(),
        ));
    }
    String::from_utf8(raw.to_vec())
        .map_err(|_| ClipShareError::DataError("file name is not valid UTF-8".into()))
}

/// Rejects the `/../` sub-path forbidden by spec §4.4/§8. Checked against
/// the wire-form (always `/`-separated) name before any host separator
/// conversion, and again against the fully assembled destination.
fn assert_no_dotdot(wire_form: &str) -> Result<()> {
    let padded = format!("/{wire_form}/");
    if padded.contains("/../") || wire_form == ".." {
        return Err(ClipShareError::DataError(
            "path contains a '/../' traversal segment".into(),
        ));
    }
    Ok(())
}

/// Converts a validated wire name into a path relative to the scratch
/// directory, applying spec §4.3.5's per-version rules:
/// - v1: any embedded path separator is rejected (basename only).
/// - v2/v3: `/` is the wire separator; strip a trailing `/`, reject a
///   doubled separator, and convert to the host separator.
pub fn to_scratch_relative_path(wire_name: &str, version: u16) -> Result<PathBuf> {
    assert_no_dotdot(wire_name)?;
    let trimmed = wire_name.strip_suffix('/').unwrap_or(wire_name);
    if trimmed.is_empty() {
        return Err(ClipShareError::DataError("empty file name".into()));
    }
    if version == 1 {
        if trimmed.contains('/') {
            return Err(ClipShareError::DataError(
                "v1 does not allow path separators in file names".into(),
            ));
        }
        return Ok(PathBuf::from(trimmed));
    }
    if trimmed.contains("//") {
        return Err(ClipShareError::DataError(
            "doubled path separator in file name".into(),
        ));
    }
    let mut path = PathBuf::new();
    for part in trimmed.split('/') {
        if part.is_empty() {
            return Err(ClipShareError::DataError(
                "empty path component in file name".into(),
            ));
        }
        path.push(part);
    }
    Ok(path)
}

/// Asserts the fully assembled destination never resolves through a
/// `/../` segment (spec §8: "assert on output, not only input").
pub fn assert_destination_is_safe(scratch_dir: &Path, relative: &Path) -> Result<PathBuf> {
    let dest = scratch_dir.join(relative);
    let as_forward_slash = dest.to_string_lossy().replace('\\', "/");
    if as_forward_slash.contains("/../") {
        return Err(ClipShareError::DataError(
            "assembled destination contains a '/../' segment".into(),
        ));
    }
    Ok(dest)
}

/// De-duplicating rename of a scratch-dir entry into its final home under
/// `dest_base` (normally the current working directory), grounded in the
/// original's `_check_and_rename`:
/// - the literal configured config filename is shifted to `1_<name>`
///   unless a non-default working directory is in use (spec §4.4);
/// - otherwise, an existing destination is never overwritten: the name is
///   prefixed `<n>_` for increasing `n` starting at 1, up to 999999.
pub fn check_and_rename(
    scratch_path: &Path,
    file_name: &str,
    dest_base: &Path,
    cfg: &Configuration,
) -> Result<PathBuf> {
    let mut candidate = if cfg.is_own_config_filename(file_name) {
        dest_base.join(format!("1_{file_name}"))
    } else {
        dest_base.join(file_name)
    };

    let mut n: u32 = 1;
    while candidate.exists() {
        if n > 999_999 {
            return Err(ClipShareError::LocalError(format!(
                "could not find a free destination name for '{file_name}'"
            )));
        }
        candidate = dest_base.join(format!("{n}_{file_name}"));
        n += 1;
    }

    fsadapter::rename(scratch_path, &candidate)
        .map_err(|e| ClipShareError::LocalError(format!("rename failed: {e}")))?;
    fs::canonicalize(&candidate).map_err(|e| ClipShareError::LocalError(format!("{e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn rejects_control_bytes_and_bad_lengths() {
        assert!(validate_wire_name(b"").is_err());
        assert!(validate_wire_name(&vec![b'a'; 2049]).is_err());
        assert!(validate_wire_name(b"bad\x01name").is_err());
        assert!(validate_wire_name(b"good.txt").is_ok());
    }

    #[test]
    fn v1_rejects_any_separator() {
        assert!(to_scratch_relative_path("dir/file.txt", 1).is_err());
        assert!(to_scratch_relative_path("file.txt", 1).is_ok());
    }

    #[test]
    fn v3_builds_nested_relative_path() {
        let p = to_scratch_relative_path("dir/sub/file.txt", 3).unwrap();
        assert_eq!(p, PathBuf::from("dir/sub/file.txt"));
    }

    #[test]
    fn rejects_dotdot_traversal() {
        assert!(to_scratch_relative_path("a/../b", 3).is_err());
        assert!(to_scratch_relative_path("..", 3).is_err());
    }

    #[test]
    fn rejects_doubled_separator() {
        assert!(to_scratch_relative_path("a//b", 3).is_err());
    }

    #[test]
    fn destination_never_contains_dotdot() {
        let base = Path::new("/tmp/scratch");
        let rel = PathBuf::from("a/b.txt");
        let dest = assert_destination_is_safe(base, &rel).unwrap();
        assert!(!dest.to_string_lossy().contains("/../"));
    }

    #[test]
    fn check_and_rename_dedupes_on_collision() {
        let dir = tempdir().unwrap();
        let dest_base = dir.path();
        let cfg = Configuration::default();

        let src1 = dest_base.join("src1");
        fs::write(&src1, b"one").unwrap();
        let dest1 = check_and_rename(&src1, "report.txt", dest_base, &cfg).unwrap();
        assert_eq!(dest1.file_name().unwrap(), "report.txt");

        let src2 = dest_base.join("src2");
        fs::write(&src2, b"two").unwrap();
        let dest2 = check_and_rename(&src2, "report.txt", dest_base, &cfg).unwrap();
        assert_eq!(dest2.file_name().unwrap(), "1_report.txt");
    }

    #[test]
    fn check_and_rename_shifts_own_config_filename() {
        let dir = tempdir().unwrap();
        let dest_base = dir.path();
        let cfg = Configuration::default();
        let src = dest_base.join("src");
        fs::write(&src, b"cfg").unwrap();
        let dest = check_and_rename(
            &src,
            crate::config::DEFAULT_CONFIG_FILE_NAME,
            dest_base,
            &cfg,
        )
        .unwrap();
        assert_eq!(
            dest.file_name().unwrap().to_str().unwrap(),
            format!("1_{}", crate::config::DEFAULT_CONFIG_FILE_NAME)
        );
    }
}
