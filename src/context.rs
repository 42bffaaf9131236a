//! Read-only `Context` threaded through every public call (spec §9
//! redesign notes: "ambient globals... the redesign threads a read-only
//! `Context` value through every public call; the reporter is part of it").

use crate::clipboard::ClipboardAdapter;
use crate::config::Configuration;
use crate::status::Latch;

pub struct Context<'a> {
    pub config: &'a Configuration,
    pub clipboard: &'a dyn ClipboardAdapter,
    pub reporter: &'a Latch<'a>,
}

impl<'a> Context<'a> {
    pub fn new(
        config: &'a Configuration,
        clipboard: &'a dyn ClipboardAdapter,
        reporter: &'a Latch<'a>,
    ) -> Self {
        Context {
            config,
            clipboard,
            reporter,
        }
    }
}
