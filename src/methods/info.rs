//! INFO (spec §4.3.7): currently no payload beyond the method dispatch
//! itself and an OK status report.

use crate::context::Context;
use crate::error::Result;
use crate::socket::Socket;
use crate::status::StatusCode;
use crate::wire::ProtoVersion;

use super::MethodArgs;

pub fn info(
    _sock: &mut Socket,
    _args: MethodArgs,
    ctx: &Context,
    _version: ProtoVersion,
) -> Result<()> {
    ctx.reporter.report(StatusCode::Ok, &[]);
    Ok(())
}
