//! Command-line surface (spec §6.2): exit codes are the only contract
//! that matters to callers, so argument parsing here is deliberately
//! minimal and mirrors the original's `-c <cmd> [server] [arg]` shape.

use std::net::Ipv4Addr;

use crate::clipboard::{ClipboardAdapter, PlatformClipboard};
use crate::config::Configuration;
use crate::context::Context;
use crate::error::{ClipShareError, Result};
use crate::methods::MethodArgs;
use crate::negotiator;
use crate::scanner;
use crate::socket::Socket;
use crate::status::{Latch, Reporter, StatusCode};
use crate::tls;
use crate::wire::Method;

pub enum Command {
    Help,
    Version,
    Stop,
    Scan,
    Invoke {
        method: Method,
        server: Ipv4Addr,
        display: Option<u16>,
    },
}

/// Parses `argv` (excluding the program name) into a [`Command`] (spec
/// §6.2). Returns `Err` for anything malformed; the caller prints usage
/// and exits 1.
pub fn parse_args(argv: &[String]) -> Result<Command> {
    match argv.first().map(String::as_str) {
        Some("-h") => return Ok(Command::Help),
        Some("-v") => return Ok(Command::Version),
        Some("-s") => return Ok(Command::Stop),
        Some("-c") => {}
        _ => return Err(ClipShareError::DataError("unrecognized flag".into())),
    }

    let cmd = argv
        .get(1)
        .ok_or_else(|| ClipShareError::DataError("missing command after -c".into()))?;
    if cmd == "sc" {
        return Ok(Command::Scan);
    }

    let method = match cmd.as_str() {
        "g" => Method::GetText,
        "s" => Method::SendText,
        "fg" => Method::GetFile,
        "fs" => Method::SendFile,
        "i" => Method::GetImage,
        "ic" => Method::GetCopiedImage,
        "is" => Method::GetScreenshot,
        other => return Err(ClipShareError::DataError(format!("unknown command '{other}'"))),
    };

    let server: Ipv4Addr = argv
        .get(2)
        .ok_or_else(|| ClipShareError::DataError("missing server address".into()))?
        .parse()
        .map_err(|_| ClipShareError::InvalidAddress(argv[2].clone()))?;

    let display = if method == Method::GetScreenshot {
        match argv.get(3) {
            Some(raw) => {
                let d: u32 = raw
                    .parse()
                    .map_err(|_| ClipShareError::DataError(format!("invalid display value '{raw}'")))?;
                if d >= 65536 {
                    return Err(ClipShareError::DataError(format!("invalid display value '{raw}'")));
                }
                Some(d as u16)
            }
            None => None,
        }
    } else {
        None
    };

    Ok(Command::Invoke {
        method,
        server,
        display,
    })
}

struct PrintingReporter;
impl Reporter for PrintingReporter {
    fn report(&self, status: StatusCode, _payload: &[u8]) {
        tracing::info!(?status, "request finished");
    }
}

/// Runs one `-c` invocation end to end, printing `<action> done|failed!`
/// per spec §7 and returning the process exit code (0/1).
pub fn run_invoke(config: &Configuration, method: Method, server: Ipv4Addr, display: Option<u16>) -> i32 {
    let label = action_label(method);
    let args = match method {
        Method::GetScreenshot => MethodArgs::Display(display.unwrap_or(0)),
        _ => MethodArgs::None,
    };

    let outcome = (|| -> Result<()> {
        let tls_config = tls::client_config_for(config)?;
        let port = if tls_config.is_some() {
            config.tls_port
        } else {
            config.plaintext_port
        };
        let mut sock = Socket::connect(server, port, tls_config)?;
        let clipboard = PlatformClipboard::default();
        let reporter = PrintingReporter;
        let latch = Latch::new(&reporter);
        let ctx = Context::new(config, &clipboard as &dyn ClipboardAdapter, &latch);
        negotiator::handle_proto(&mut sock, method, args, &ctx)
    })();

    match outcome {
        Ok(()) => {
            println!("{label} done");
            0
        }
        Err(e) => {
            println!("{label} failed!");
            tracing::warn!(error = %e, "invocation failed");
            1
        }
    }
}

fn action_label(method: Method) -> &'static str {
    match method {
        Method::GetText => "Get text",
        Method::SendText => "Send text",
        Method::GetFile => "Get files",
        Method::SendFile => "Send files",
        Method::GetImage => "Get image",
        Method::GetCopiedImage => "Get copied image",
        Method::GetScreenshot => "Get screenshot",
        Method::Info => "Info",
    }
}

/// Runs the scanner and prints one discovered peer per line (spec §4.5).
pub fn run_scan(config: &Configuration) -> i32 {
    match scanner::scan(config.udp_port) {
        Ok(peers) => {
            for peer in &peers {
                println!("{peer}");
            }
            0
        }
        Err(e) => {
            eprintln!("scan failed: {e}");
            1
        }
    }
}

pub fn print_usage(prog_name: &str) {
    println!("Usage: {prog_name} [-h] [-v] [-s] [-c <cmd> [server-ipv4] [arg]]");
    println!("  -h            print this help and exit");
    println!("  -v            print version and exit");
    println!("  -s            stop a running background instance");
    println!("  -c sc         scan for peers");
    println!("  -c g <addr>   get clipboard text");
    println!("  -c s <addr>   send clipboard text");
    println!("  -c fg <addr>  get files");
    println!("  -c fs <addr>  send files");
    println!("  -c i <addr>   get image");
    println!("  -c ic <addr>  get copied image");
    println!("  -c is <addr> [display]  get screenshot");
}
