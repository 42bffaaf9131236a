//! GET_FILE / GET_FILES and SEND_FILE / SEND_FILES (spec §4.3.5, §4.3.6).

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

use crate::context::Context;
use crate::error::{ClipShareError, Result};
use crate::fsadapter;
use crate::pathsafety;
use crate::socket::Socket;
use crate::status::StatusCode;
use crate::wire::{ProtoVersion, DIR_SIZE_SENTINEL, FILE_CHUNK_SIZE};

use super::MethodArgs;

/// Recursion depth the clipboard's directory walker is expected to cap
/// itself at (spec §4.3.6); enforced inside the clipboard adapter, not
/// here, since the adapter is the component that actually recurses.
const MAX_DIR_RECURSION_DEPTH: u32 = 256;

fn fresh_scratch_dir() -> Result<PathBuf> {
    let mut rng = rand::thread_rng();
    loop {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let salt: u64 = rng.gen();
        let name = format!("{:x}", nanos ^ salt as u128);
        let candidate = PathBuf::from(format!("./{name}"));
        if !candidate.exists() {
            fsadapter::mkdirs(&candidate)
                .map_err(|e| ClipShareError::LocalError(format!("mkdir scratch: {e}")))?;
            return Ok(candidate);
        }
    }
}

fn receive_one_entry(sock: &mut Socket, scratch_dir: &Path, version: u16, max_file_size: i64) -> Result<()> {
    let name_len = sock.read_size()?;
    if name_len <= 0 || name_len as usize > crate::wire::MAX_FILE_NAME_LENGTH {
        return Err(ClipShareError::DataError(format!(
            "file name length {name_len} out of range"
        )));
    }
    let mut name_buf = vec![0u8; name_len as usize];
    sock.read_exact(&mut name_buf)?;
    let wire_name = pathsafety::validate_wire_name(&name_buf)?;
    let relative = pathsafety::to_scratch_relative_path(&wire_name, version)?;
    let dest = pathsafety::assert_destination_is_safe(scratch_dir, &relative)?;
    if dest.exists() {
        return Err(ClipShareError::DataError(format!(
            "destination '{}' already exists",
            dest.display()
        )));
    }
    if let Some(parent) = dest.parent() {
        fsadapter::mkdirs(parent).map_err(|e| ClipShareError::LocalError(format!("{e}")))?;
    }

    let file_size = sock.read_size()?;
    if file_size == DIR_SIZE_SENTINEL && version == 3 {
        fsadapter::mkdirs(&dest).map_err(|e| ClipShareError::LocalError(format!("{e}")))?;
        return Ok(());
    }
    if file_size < 0 || file_size > max_file_size {
        return Err(ClipShareError::DataError(format!(
            "file size {file_size} out of range"
        )));
    }

    let mut file = fsadapter::create_file(&dest).map_err(|e| ClipShareError::LocalError(format!("{e}")))?;
    let mut remaining = file_size as u64;
    let mut chunk = [0u8; FILE_CHUNK_SIZE];
    while remaining > 0 {
        let take = remaining.min(FILE_CHUNK_SIZE as u64) as usize;
        if let Err(e) = sock.read_exact(&mut chunk[..take]) {
            let _ = fsadapter::remove_file(&dest);
            return Err(e);
        }
        if let Err(e) = file.write_all(&chunk[..take]) {
            let _ = fsadapter::remove_file(&dest);
            return Err(ClipShareError::LocalError(format!("write: {e}")));
        }
        remaining -= take as u64;
    }
    Ok(())
}

/// Moves every top-level scratch-dir entry into `dest_base`, returning the
/// absolute paths of what landed (spec §4.3.5's post-receive rename pass).
fn relocate_scratch_contents(scratch_dir: &Path, dest_base: &Path, cfg: &crate::config::Configuration) -> Result<Vec<PathBuf>> {
    let mut moved = Vec::new();
    for entry in fsadapter::list_dir(scratch_dir).map_err(|e| ClipShareError::LocalError(format!("{e}")))? {
        let name = entry
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClipShareError::LocalError("non-UTF-8 scratch entry name".into()))?
            .to_string();
        let dest = pathsafety::check_and_rename(&entry, &name, dest_base, cfg)?;
        moved.push(dest);
    }
    let _ = fsadapter::remove_directory(scratch_dir);
    Ok(moved)
}

pub fn get_file(
    sock: &mut Socket,
    _args: MethodArgs,
    ctx: &Context,
    version: ProtoVersion,
) -> Result<()> {
    let count = sock.read_size()?;
    if count <= 0 || count >= (1i64 << 32) {
        ctx.reporter.report(StatusCode::NoData, &[]);
        return Err(ClipShareError::NoData);
    }
    if count > ctx.config.max_file_count as i64 {
        let err = ClipShareError::DataError(format!(
            "file count {count} exceeds max_file_count {}",
            ctx.config.max_file_count
        ));
        ctx.reporter.report(err.status_code(), &[]);
        return Err(err);
    }

    let scratch_dir = fresh_scratch_dir()?;
    let outcome = (|| -> Result<()> {
        for _ in 0..count {
            receive_one_entry(sock, &scratch_dir, version.0, ctx.config.max_file_size)?;
        }
        Ok(())
    })();

    sock.close_no_wait();

    if let Err(e) = outcome {
        let _ = fsadapter::remove_directory(&scratch_dir);
        ctx.reporter.report(e.status_code(), &[]);
        return Err(e);
    }

    let cwd = fsadapter::getcwd().map_err(|e| ClipShareError::LocalError(format!("{e}")))?;
    let moved = relocate_scratch_contents(&scratch_dir, &cwd, ctx.config)?;

    ctx.reporter.report(StatusCode::Ok, &[]);
    crate::sentinel::mark_self_write();
    ctx.clipboard
        .set_cut_files(moved)
        .map_err(|e| ClipShareError::LocalError(e.to_string()))?;
    Ok(())
}

fn common_prefix_len(paths: &[PathBuf]) -> usize {
    if paths.len() <= 1 {
        return paths
            .first()
            .and_then(|p| p.parent())
            .map(|p| p.to_string_lossy().len() + 1)
            .unwrap_or(0);
    }
    let first = paths[0].to_string_lossy().into_owned();
    let mut prefix_len = first.len();
    for p in &paths[1..] {
        let s = p.to_string_lossy();
        let mut shared = 0;
        for (a, b) in first.bytes().zip(s.bytes()) {
            if a != b {
                break;
            }
            shared += 1;
        }
        prefix_len = prefix_len.min(shared);
    }
    // Trim back to the last path separator so the prefix is directory-aligned.
    while prefix_len > 0 && !matches!(first.as_bytes().get(prefix_len - 1), Some(b'/') | Some(b'\\')) {
        prefix_len -= 1;
    }
    prefix_len
}

fn to_wire_relative_name(path: &Path, prefix_len: usize) -> String {
    let full = path.to_string_lossy();
    let rel = &full[prefix_len.min(full.len())..];
    rel.replace('\\', "/")
}

fn send_one_entry(sock: &mut Socket, path: &Path, relative_name: &str, is_dir: bool, max_file_size: i64) -> Result<()> {
    if is_dir {
        let marker = format!("{relative_name}/");
        sock.write_size(marker.len() as i64)?;
        sock.write_exact(marker.as_bytes())?;
        sock.write_size(DIR_SIZE_SENTINEL)?;
        return Ok(());
    }

    let meta = fsadapter::stat(path).map_err(|e| ClipShareError::LocalError(format!("{e}")))?;
    let size = meta.len() as i64;
    if size < 0 || size > max_file_size {
        return Err(ClipShareError::DataError(format!(
            "file '{}' size {size} out of range",
            path.display()
        )));
    }
    sock.write_size(relative_name.len() as i64)?;
    sock.write_exact(relative_name.as_bytes())?;
    sock.write_size(size)?;

    let mut file = fsadapter::open_file(path).map_err(|e| ClipShareError::LocalError(format!("{e}")))?;
    let mut remaining = size as u64;
    let mut chunk = [0u8; FILE_CHUNK_SIZE];
    use std::io::Read;
    while remaining > 0 {
        let take = remaining.min(FILE_CHUNK_SIZE as u64) as usize;
        file.read_exact(&mut chunk[..take])
            .map_err(|e| ClipShareError::LocalError(format!("read: {e}")))?;
        sock.write_exact(&chunk[..take])?;
        remaining -= take as u64;
    }
    Ok(())
}

pub fn send_file(
    sock: &mut Socket,
    args: MethodArgs,
    ctx: &Context,
    version: ProtoVersion,
) -> Result<()> {
    let _ = MAX_DIR_RECURSION_DEPTH;

    if version.0 == 1 {
        let files = ctx
            .clipboard
            .get_copied_files()
            .map_err(|e| ClipShareError::LocalError(e.to_string()))?;
        let Some(first) = files.first() else {
            if args.is_auto_send() {
                tracing::debug!("auto-send found no clipboard files to send");
            }
            ctx.reporter.report(StatusCode::NoData, &[]);
            return Err(ClipShareError::NoData);
        };
        let name = first
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClipShareError::DataError("non-UTF-8 file name".into()))?
            .to_string();
        send_one_entry(sock, first, &name, false, ctx.config.max_file_size)?;
        ctx.reporter.report(StatusCode::Ok, &[]);
        return Ok(());
    }

    if version.0 == 2 {
        let files = ctx
            .clipboard
            .get_copied_files()
            .map_err(|e| ClipShareError::LocalError(e.to_string()))?;
        if files.is_empty() {
            if args.is_auto_send() {
                tracing::debug!("auto-send found no clipboard files to send");
            }
            ctx.reporter.report(StatusCode::NoData, &[]);
            return Err(ClipShareError::NoData);
        }
        let prefix_len = common_prefix_len(&files);
        sock.write_size(files.len() as i64)?;
        for path in &files {
            let name = to_wire_relative_name(path, prefix_len);
            send_one_entry(sock, path, &name, false, ctx.config.max_file_size)?;
        }
        ctx.reporter.report(StatusCode::Ok, &[]);
        return Ok(());
    }

    let bundle = ctx
        .clipboard
        .get_copied_dirs_files(true)
        .map_err(|e| ClipShareError::LocalError(e.to_string()))?;
    if bundle.paths.is_empty() {
        if args.is_auto_send() {
            tracing::debug!("auto-send found no clipboard files to send");
        }
        ctx.reporter.report(StatusCode::NoData, &[]);
        return Err(ClipShareError::NoData);
    }
    sock.write_size(bundle.paths.len() as i64)?;
    for path in &bundle.paths {
        let name = to_wire_relative_name(path, bundle.common_path_prefix_len);
        let is_dir = fsadapter::is_directory(path);
        send_one_entry(sock, path, &name, is_dir, ctx.config.max_file_size)?;
    }
    ctx.reporter.report(StatusCode::Ok, &[]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_prefix_is_directory_aligned() {
        let paths = vec![
            PathBuf::from("/tmp/a/one.txt"),
            PathBuf::from("/tmp/a/sub/two.txt"),
        ];
        let len = common_prefix_len(&paths);
        assert_eq!(&paths[0].to_string_lossy()[..len], "/tmp/a/");
    }

    #[test]
    fn wire_relative_name_strips_prefix_and_normalizes_separator() {
        let path = PathBuf::from("/tmp/a/sub/two.txt");
        let name = to_wire_relative_name(&path, "/tmp/a/".len());
        assert_eq!(name, "sub/two.txt");
    }
}
