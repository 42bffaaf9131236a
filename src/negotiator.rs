//! Protocol negotiator (spec §4.2): version negotiation followed by
//! method dispatch, with a single terminal report guaranteed via the
//! [`crate::status::Latch`] living on [`Context`].

use crate::context::Context;
use crate::dispatch;
use crate::error::{ClipShareError, Result};
use crate::methods::MethodArgs;
use crate::socket::Socket;
use crate::status::StatusCode;
use crate::wire::{Method, ProtoStatus, ProtoVersion};

/// Runs the S0→S1→S2 state machine, then the negotiated version's method
/// dispatch, reporting exactly once via `ctx.reporter` on every path.
pub fn handle_proto(sock: &mut Socket, method: Method, args: MethodArgs, ctx: &Context) -> Result<()> {
    let result = run(sock, method, args, ctx);
    if let Err(ref e) = result {
        ctx.reporter.report(e.status_code(), &[]);
    }
    ctx.reporter.finish_with_default();
    result
}

fn run(sock: &mut Socket, method: Method, args: MethodArgs, ctx: &Context) -> Result<()> {
    let max_version = ctx.config.max_proto_version;
    let min_version = ctx.config.min_proto_version;

    sock.write_exact(&[max_version as u8])?;
    let mut status_buf = [0u8; 1];
    sock.read_exact(&mut status_buf)?;

    let version = match ProtoStatus::from_byte(status_buf[0]) {
        Some(ProtoStatus::Supported) => max_version,
        Some(ProtoStatus::Obsolete) => {
            return Err(ClipShareError::ProtoVersionMismatch(
                "peer reports our max version obsolete".into(),
            ))
        }
        Some(ProtoStatus::Unknown) => negotiate_unknown_version(sock, min_version, max_version)?,
        None => {
            return Err(ClipShareError::ServerError(format!(
                "undefined protocol status byte {}",
                status_buf[0]
            )))
        }
    };

    dispatch_method(sock, method, args, ctx, ProtoVersion(version))
}

fn negotiate_unknown_version(sock: &mut Socket, min_version: u16, max_version: u16) -> Result<u16> {
    let mut offer_buf = [0u8; 1];
    sock.read_exact(&mut offer_buf)?;
    let offered = offer_buf[0] as u16;
    if offered >= min_version && offered <= max_version {
        sock.write_exact(&[offered as u8])?;
        Ok(offered)
    } else {
        sock.write_exact(&[0u8])?;
        Err(ClipShareError::ProtoVersionMismatch(format!(
            "peer offered version {offered} outside [{min_version}, {max_version}]"
        )))
    }
}

fn dispatch_method(
    sock: &mut Socket,
    method: Method,
    args: MethodArgs,
    ctx: &Context,
    version: ProtoVersion,
) -> Result<()> {
    let handler = dispatch::lookup(version.0, method)
        .ok_or_else(|| ClipShareError::ProtoMethodError(method.code()))?;

    sock.write_exact(&[method.code()])?;
    let mut status_buf = [0u8; 1];
    sock.read_exact(&mut status_buf)?;

    match crate::wire::MethodStatus::from_byte(status_buf[0]) {
        Some(crate::wire::MethodStatus::Ok) => {}
        Some(crate::wire::MethodStatus::NoData) => {
            ctx.reporter.report(StatusCode::NoData, &[]);
            return Err(ClipShareError::NoData);
        }
        Some(crate::wire::MethodStatus::UnknownMethod) | Some(crate::wire::MethodStatus::NotImplemented) => {
            let err = ClipShareError::MethodNotAllowed(format!("method {}", method.code()));
            ctx.reporter.report(StatusCode::MethodNotAllowed, &[]);
            return Err(err);
        }
        None => {
            let err = ClipShareError::ServerError(format!(
                "undefined method-status byte {}",
                status_buf[0]
            ));
            ctx.reporter.report(StatusCode::ServerError, &[]);
            return Err(err);
        }
    }

    handler(sock, args, ctx, version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::{ClipboardAdapter, ClipboardContentType, DirectoryFilesBundle};
    use crate::config::Configuration;
    use crate::status::{Latch, NullReporter};
    use std::net::{TcpListener, TcpStream};
    use std::path::PathBuf;
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex;
    use std::thread;

    struct FakeClipboard {
        text: Mutex<String>,
    }

    impl ClipboardAdapter for FakeClipboard {
        fn get_text(&self) -> Result<String> {
            Ok(self.text.lock().unwrap().clone())
        }
        fn put_text(&self, data: &str) -> Result<()> {
            *self.text.lock().unwrap() = data.to_string();
            Ok(())
        }
        fn get_copied_files(&self) -> Result<Vec<PathBuf>> {
            Ok(Vec::new())
        }
        fn get_copied_dirs_files(&self, _include_leaf_dirs: bool) -> Result<DirectoryFilesBundle> {
            Ok(DirectoryFilesBundle::default())
        }
        fn set_cut_files(&self, _paths: Vec<PathBuf>) -> Result<()> {
            Ok(())
        }
        fn current_type(&self) -> Result<ClipboardContentType> {
            Ok(ClipboardContentType::Text)
        }
        fn wait_for_change(&self, _running: &AtomicBool) {}
    }

    #[test]
    fn happy_path_negotiates_max_version_and_runs_get_text() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut sock = Socket::Plain(stream);
            let mut buf = [0u8; 1];
            sock.read_exact(&mut buf).unwrap();
            assert_eq!(buf[0], 3);
            sock.write_exact(&[1]).unwrap(); // SUPPORTED
            sock.read_exact(&mut buf).unwrap();
            assert_eq!(buf[0], Method::GetText.code());
            sock.write_exact(&[1]).unwrap(); // method OK
            sock.write_size(5).unwrap();
            sock.write_exact(b"Hello").unwrap();
        });

        let mut client = Socket::Plain(TcpStream::connect(addr).unwrap());
        let cfg = Configuration::default();
        let clipboard = FakeClipboard {
            text: Mutex::new(String::new()),
        };
        let null = NullReporter;
        let latch = Latch::new(&null);
        let ctx = Context::new(&cfg, &clipboard, &latch);

        let result = handle_proto(&mut client, Method::GetText, MethodArgs::None, &ctx);
        assert!(result.is_ok());
        assert_eq!(*clipboard.text.lock().unwrap(), "Hello");
        server.join().unwrap();
    }

    #[test]
    fn renegotiates_down_to_offered_version() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut sock = Socket::Plain(stream);
            let mut buf = [0u8; 1];
            sock.read_exact(&mut buf).unwrap();
            sock.write_exact(&[3]).unwrap(); // UNKNOWN
            sock.write_exact(&[2]).unwrap(); // offer v2
            sock.read_exact(&mut buf).unwrap();
            assert_eq!(buf[0], 2);
            sock.read_exact(&mut buf).unwrap();
            assert_eq!(buf[0], Method::Info.code());
            sock.write_exact(&[1]).unwrap();
        });

        let mut client = Socket::Plain(TcpStream::connect(addr).unwrap());
        let cfg = Configuration::default();
        let clipboard = FakeClipboard {
            text: Mutex::new(String::new()),
        };
        let null = NullReporter;
        let latch = Latch::new(&null);
        let ctx = Context::new(&cfg, &clipboard, &latch);

        let result = handle_proto(&mut client, Method::Info, MethodArgs::None, &ctx);
        assert!(result.is_ok());
        server.join().unwrap();
    }
}
