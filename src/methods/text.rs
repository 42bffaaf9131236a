//! GET_TEXT / SEND_TEXT (spec §4.3.1, §4.3.2).

use crate::context::Context;
use crate::eol;
use crate::error::{ClipShareError, Result};
use crate::socket::Socket;
use crate::status::StatusCode;
use crate::wire::ProtoVersion;

use super::MethodArgs;

/// Normalizes to the host's native line ending: LF on POSIX, CRLF on
/// Windows (spec §4.3.1).
#[cfg(not(windows))]
fn to_host_eol(bytes: &[u8]) -> Vec<u8> {
    eol::to_lf(bytes)
}

#[cfg(windows)]
fn to_host_eol(bytes: &[u8]) -> Vec<u8> {
    eol::to_crlf(bytes)
}

pub fn get_text(
    sock: &mut Socket,
    _args: MethodArgs,
    ctx: &Context,
    _version: ProtoVersion,
) -> Result<()> {
    let len = sock.read_size()?;
    if len <= 0 || len > ctx.config.max_text_length as i64 {
        let err = ClipShareError::DataError(format!("GET_TEXT size {len} out of range"));
        ctx.reporter.report(err.status_code(), &[]);
        return Err(err);
    }
    let mut buf = vec![0u8; len as usize];
    sock.read_exact(&mut buf)?;
    if std::str::from_utf8(&buf).is_err() {
        let err = ClipShareError::DataError("GET_TEXT payload is not valid UTF-8".into());
        ctx.reporter.report(err.status_code(), &[]);
        return Err(err);
    }
    ctx.reporter.report(StatusCode::Ok, &buf);

    let normalized = to_host_eol(&buf);
    let text = String::from_utf8(normalized)
        .map_err(|_| ClipShareError::LocalError("normalized text is not valid UTF-8".into()))?;
    crate::sentinel::mark_self_write();
    ctx.clipboard
        .put_text(&text)
        .map_err(|e| ClipShareError::LocalError(e.to_string()))?;
    Ok(())
}

pub fn send_text(
    sock: &mut Socket,
    args: MethodArgs,
    ctx: &Context,
    _version: ProtoVersion,
) -> Result<()> {
    let text = match ctx.clipboard.get_text() {
        Ok(t) => t,
        Err(_) => {
            if args.is_auto_send() {
                tracing::debug!("auto-send found no clipboard text to send");
            }
            ctx.reporter.report(StatusCode::NoData, &[]);
            return Err(ClipShareError::NoData);
        }
    };
    if text.is_empty() || text.len() as u32 > ctx.config.max_text_length {
        if args.is_auto_send() {
            tracing::debug!("auto-send found no clipboard text to send");
        }
        ctx.reporter.report(StatusCode::NoData, &[]);
        return Err(ClipShareError::NoData);
    }

    let normalized = eol::to_lf(text.as_bytes());
    if normalized.is_empty() {
        let err = ClipShareError::LocalError("EOL normalization produced empty text".into());
        ctx.reporter.report(err.status_code(), &[]);
        return Err(err);
    }

    sock.write_size(normalized.len() as i64)?;
    sock.write_exact(&normalized)?;
    ctx.reporter.report(StatusCode::Ok, &normalized);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::{ClipboardAdapter, ClipboardContentType, DirectoryFilesBundle};
    use crate::config::Configuration;
    use crate::socket::Socket;
    use crate::status::{Latch, NullReporter, Reporter, StatusCode};
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

    struct RecordingReporter(Mutex<Vec<(StatusCode, Vec<u8>)>>);
    impl Reporter for RecordingReporter {
        fn report(&self, status: StatusCode, payload: &[u8]) {
            self.0.lock().unwrap().push((status, payload.to_vec()));
        }
    }

    #[test]
    fn get_text_normalizes_and_stores_on_clipboard() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut sock = Socket::Plain(stream);
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

        get_text(&mut client, MethodArgs::None, &ctx, ProtoVersion(3)).unwrap();
        assert_eq!(*clipboard.text.lock().unwrap(), "Hello");
        server.join().unwrap();
    }

    #[test]
    fn send_text_normalizes_mixed_eol_to_lf() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut sock = Socket::Plain(stream);
            let len = sock.read_size().unwrap();
            let mut buf = vec![0u8; len as usize];
            sock.read_exact(&mut buf).unwrap();
            buf
        });

        let mut client = Socket::Plain(TcpStream::connect(addr).unwrap());
        let cfg = Configuration::default();
        let clipboard = FakeClipboard {
            text: Mutex::new("a\r\nb\nc".to_string()),
        };
        let rec = RecordingReporter(Mutex::new(Vec::new()));
        let latch = Latch::new(&rec);
        let ctx = Context::new(&cfg, &clipboard, &latch);

        send_text(&mut client, MethodArgs::None, &ctx, ProtoVersion(3)).unwrap();
        let received = server.join().unwrap();
        assert_eq!(received, b"a\nb\nc");
        assert_eq!(rec.0.lock().unwrap()[0].1, b"a\nb\nc");
    }

    #[test]
    fn send_text_reports_no_data_on_empty_clipboard() {
        let cfg = Configuration::default();
        let clipboard = FakeClipboard {
            text: Mutex::new(String::new()),
        };
        let rec = RecordingReporter(Mutex::new(Vec::new()));
        let latch = Latch::new(&rec);
        let ctx = Context::new(&cfg, &clipboard, &latch);

        // No socket I/O should happen; use a throwaway connected pair.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let _accept_thread = thread::spawn(move || listener.accept().unwrap());
        let mut client = Socket::Plain(TcpStream::connect(addr).unwrap());

        let result = send_text(&mut client, MethodArgs::None, &ctx, ProtoVersion(3));
        assert!(result.is_err());
        assert_eq!(rec.0.lock().unwrap()[0].0, StatusCode::NoData);
    }
}
