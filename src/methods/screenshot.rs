//! GET_SCREENSHOT (spec §4.3.4, v3 only).

use crate::context::Context;
use crate::error::{ClipShareError, Result};
use crate::socket::Socket;
use crate::status::StatusCode;
use crate::wire::{MethodStatus, ProtoVersion};

use super::image::receive_image_body;
use super::MethodArgs;

pub fn get_screenshot(
    sock: &mut Socket,
    args: MethodArgs,
    ctx: &Context,
    version: ProtoVersion,
) -> Result<()> {
    let display_index = args.display_index().unwrap_or(0);
    sock.write_size(display_index as i64)?;

    let mut status_buf = [0u8; 1];
    sock.read_exact(&mut status_buf)?;
    match MethodStatus::from_byte(status_buf[0]) {
        Some(MethodStatus::Ok) => {}
        _ => {
            ctx.reporter.report(StatusCode::NoData, &[]);
            return Err(ClipShareError::NoData);
        }
    }

    let _ = version;
    receive_image_body(sock, ctx)
}
