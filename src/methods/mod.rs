//! Method implementations (spec §4.3): the wire-level exchange for each
//! method code, dispatched by [`crate::dispatch`] after the negotiator
//! (spec §4.2) has agreed on a protocol version and sent the method byte.

pub mod file;
pub mod image;
pub mod info;
pub mod screenshot;
pub mod text;

use crate::context::Context;
use crate::error::Result;
use crate::socket::Socket;
use crate::wire::ProtoVersion;

/// Method Args (spec §3): either a display index (GET_SCREENSHOT) or an
/// auto-send flag (SEND_TEXT/SEND_FILE from the clipboard listener loop,
/// spec §4.7), or nothing for methods that need neither.
#[derive(Debug, Clone, Copy)]
pub enum MethodArgs {
    None,
    Display(u16),
    AutoSend(bool),
}

impl MethodArgs {
    pub fn display_index(&self) -> Option<u16> {
        match self {
            MethodArgs::Display(idx) => Some(*idx),
            _ => None,
        }
    }

    pub fn is_auto_send(&self) -> bool {
        matches!(self, MethodArgs::AutoSend(true))
    }
}

/// Signature every method implementation conforms to, stored in the
/// per-version dispatch table (spec §4.2).
pub type MethodHandler =
    fn(&mut Socket, MethodArgs, &Context, ProtoVersion) -> Result<()>;
