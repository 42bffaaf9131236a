//! GET_IMAGE / GET_COPIED_IMAGE (spec §4.3.3).

use std::io::Write as _;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::context::Context;
use crate::error::{ClipShareError, Result};
use crate::fsadapter;
use crate::socket::Socket;
use crate::status::StatusCode;
use crate::wire::{ProtoVersion, FILE_CHUNK_SIZE};

use super::MethodArgs;

/// `<hex-ms>.png`, derived from the current wall clock (spec §4.3.3).
fn timestamped_png_name() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("{millis:x}.png")
}

/// Receives one image body -- same size-checked streaming as GET_FILE's
/// single-file path, but the destination name is derived locally rather
/// than read off the wire. Shared with [`crate::methods::screenshot`].
pub(crate) fn receive_image_body(sock: &mut Socket, ctx: &Context) -> Result<()> {
    let size = sock.read_size()?;
    if size <= 0 {
        ctx.reporter.report(StatusCode::NoData, &[]);
        return Err(ClipShareError::NoData);
    }
    if size > ctx.config.max_file_size {
        let err = ClipShareError::DataError(format!("image size {size} exceeds max_file_size"));
        ctx.reporter.report(err.status_code(), &[]);
        return Err(err);
    }

    let name = timestamped_png_name();
    let dest = std::path::PathBuf::from(&name);
    let mut file = fsadapter::create_file(&dest).map_err(|e| ClipShareError::LocalError(format!("{e}")))?;
    let mut remaining = size as u64;
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
    drop(file);

    let abs = fsadapter::getcwd()
        .map(|cwd| cwd.join(&dest))
        .unwrap_or(dest);
    ctx.reporter.report(StatusCode::Ok, abs.to_string_lossy().as_bytes());
    crate::sentinel::mark_self_write();
    ctx.clipboard
        .set_cut_files(vec![abs])
        .map_err(|e| ClipShareError::LocalError(e.to_string()))?;
    Ok(())
}

pub fn get_image(
    sock: &mut Socket,
    _args: MethodArgs,
    ctx: &Context,
    _version: ProtoVersion,
) -> Result<()> {
    receive_image_body(sock, ctx)
}

pub fn get_copied_image(
    sock: &mut Socket,
    _args: MethodArgs,
    ctx: &Context,
    _version: ProtoVersion,
) -> Result<()> {
    receive_image_body(sock, ctx)
}
