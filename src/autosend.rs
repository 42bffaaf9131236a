//! Clipboard auto-send listener loop (spec §4.7), runs only when
//! `auto_send_text` or `auto_send_files` is enabled in the configuration.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use rustls::ClientConfig;

use crate::clipboard::{ClipboardAdapter, ClipboardContentType};
use crate::config::Configuration;
use crate::context::Context;
use crate::error::Result;
use crate::methods::MethodArgs;
use crate::negotiator;
use crate::scanner;
use crate::sentinel;
use crate::socket::Socket;
use crate::status::{Latch, NullReporter};
use crate::tls;
use crate::wire::Method;

/// Owns the running flag the listener loop observes between events and
/// `cleanup_listener` clears (spec §4.7 "Cancellation").
pub struct AutoSendListener {
    running: Arc<AtomicBool>,
}

impl AutoSendListener {
    pub fn new() -> Self {
        AutoSendListener {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Stops the loop and wakes the clipboard event source.
    pub fn cleanup_listener(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Runs until `cleanup_listener` is called. Intended to be invoked from
    /// its own dedicated thread by the caller. The TLS config is resolved
    /// once up front (spec §5: "`SSL_CTX` is created on first use and
    /// shared") and reused for every peer this loop ever sends to.
    pub fn run(&self, config: &Configuration, clipboard: &(dyn ClipboardAdapter)) -> Result<()> {
        if !config.auto_send_text && !config.auto_send_files {
            return Ok(());
        }

        let tls_config = tls::client_config_for(config)?;

        while self.running.load(Ordering::SeqCst) {
            clipboard.wait_for_change(&self.running);
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            if sentinel::check_and_delete_own_write_sentinel() {
                continue;
            }

            let content_type = match clipboard.current_type() {
                Ok(t) => t,
                Err(_) => continue,
            };

            let method = match content_type {
                ClipboardContentType::Text if config.auto_send_text => Method::SendText,
                ClipboardContentType::File if config.auto_send_files => Method::SendFile,
                _ => continue,
            };

            fan_out_to_peers(config, clipboard, method, tls_config.clone());
        }

        Ok(())
    }
}

impl Default for AutoSendListener {
    fn default() -> Self {
        Self::new()
    }
}

fn fan_out_to_peers(
    config: &Configuration,
    clipboard: &(dyn ClipboardAdapter),
    method: Method,
    tls_config: Option<Arc<ClientConfig>>,
) {
    let peers = match scanner::scan(config.udp_port) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "auto-send scan failed");
            return;
        }
    };
    if peers.is_empty() {
        return;
    }

    thread::scope(|scope| {
        for peer in peers {
            let config = config.clone();
            let tls_config = tls_config.clone();
            scope.spawn(move || {
                if let Err(e) = send_one(&config, clipboard, method, peer, tls_config) {
                    tracing::warn!(%peer, error = %e, "auto-send session failed");
                }
            });
        }
    });
}

fn send_one(
    config: &Configuration,
    clipboard: &(dyn ClipboardAdapter),
    method: Method,
    peer: Ipv4Addr,
    tls_config: Option<Arc<ClientConfig>>,
) -> Result<()> {
    let port = if tls_config.is_some() {
        config.tls_port
    } else {
        config.plaintext_port
    };
    let mut sock = Socket::connect(peer, port, tls_config)?;
    let null = NullReporter;
    let latch = Latch::new(&null);
    let ctx = Context::new(config, clipboard, &latch);
    negotiator::handle_proto(&mut sock, method, MethodArgs::AutoSend(true), &ctx)
}
