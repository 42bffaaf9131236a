//! Per-version method whitelist and dispatch table (spec §4.2), replacing
//! the original's preprocessor-gated version blocks with a runtime table
//! from `(version, method)` to handler (spec §9 redesign notes).

use crate::methods::{file, image, info, screenshot, text, MethodHandler};
use crate::wire::Method;

/// Looks up the handler for `method` at `version`, returning `None` if the
/// method is not in that version's whitelist (spec §4.2).
pub fn lookup(version: u16, method: Method) -> Option<MethodHandler> {
    match version {
        1 => match method {
            Method::GetText => Some(text::get_text),
            Method::SendText => Some(text::send_text),
            Method::GetFile => Some(file::get_file),
            Method::SendFile => Some(file::send_file),
            Method::GetImage => Some(image::get_image),
            Method::Info => Some(info::info),
            _ => None,
        },
        2 => match method {
            Method::GetText => Some(text::get_text),
            Method::SendText => Some(text::send_text),
            Method::GetFile => Some(file::get_file),
            Method::SendFile => Some(file::send_file),
            Method::GetImage => Some(image::get_image),
            Method::Info => Some(info::info),
            _ => None,
        },
        3 => match method {
            Method::GetText => Some(text::get_text),
            Method::SendText => Some(text::send_text),
            Method::GetFile => Some(file::get_file),
            Method::SendFile => Some(file::send_file),
            Method::GetImage => Some(image::get_image),
            Method::GetCopiedImage => Some(image::get_copied_image),
            Method::GetScreenshot => Some(screenshot::get_screenshot),
            Method::Info => Some(info::info),
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v1_rejects_v3_only_methods() {
        assert!(lookup(1, Method::GetScreenshot).is_none());
        assert!(lookup(1, Method::GetCopiedImage).is_none());
        assert!(lookup(1, Method::GetText).is_some());
    }

    #[test]
    fn v3_accepts_every_method() {
        for m in [
            Method::GetText,
            Method::SendText,
            Method::GetFile,
            Method::SendFile,
            Method::GetImage,
            Method::GetCopiedImage,
            Method::GetScreenshot,
            Method::Info,
        ] {
            assert!(lookup(3, m).is_some());
        }
    }

    #[test]
    fn unknown_version_has_no_methods() {
        assert!(lookup(4, Method::Info).is_none());
    }
}
