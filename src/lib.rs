//! ClipShare-Desktop core: a blocking, versioned-protocol client for
//! sending and receiving clipboard text, images, screenshots, and files
//! with ClipShare peer servers over plaintext TCP or mutually
//! authenticated TLS.

pub mod autosend;
pub mod cli;
pub mod clipboard;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod eol;
pub mod error;
pub mod fsadapter;
pub mod methods;
pub mod negotiator;
pub mod pathsafety;
pub mod scanner;
pub mod sentinel;
pub mod socket;
pub mod status;
pub mod tls;
pub mod wire;

pub use config::Configuration;
pub use context::Context;
pub use error::{ClipShareError, Result};
pub use status::{Latch, Reporter, StatusCode};
