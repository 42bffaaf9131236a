//! Bit-exact wire constants (spec §6.1).

/// UDP discovery probe payload (spec §6.1, §4.5).
pub const UDP_PROBE: &[u8] = b"in";

/// Expected UDP reply payload (SPEC_FULL §4.8).
pub const INFO_NAME: &str = "clip_share";

/// 64 KiB file streaming chunk size (spec §4.3.5/§4.3.6, SPEC_FULL §11.5).
pub const FILE_CHUNK_SIZE: usize = 65536;

/// Directory sentinel for v3 SEND_FILE/GET_FILE (spec §4.3.5/§4.3.6).
pub const DIR_SIZE_SENTINEL: i64 = -1;

pub const MAX_FILE_NAME_LENGTH: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Method {
    GetText = 1,
    SendText = 2,
    GetFile = 3,
    SendFile = 4,
    GetImage = 5,
    GetCopiedImage = 6,
    GetScreenshot = 7,
    Info = 125,
}

impl Method {
    pub fn code(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProtoStatus {
    Supported = 1,
    Obsolete = 2,
    Unknown = 3,
}

impl ProtoStatus {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(ProtoStatus::Supported),
            2 => Some(ProtoStatus::Obsolete),
            3 => Some(ProtoStatus::Unknown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MethodStatus {
    Ok = 1,
    NoData = 2,
    UnknownMethod = 3,
    NotImplemented = 4,
}

impl MethodStatus {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(MethodStatus::Ok),
            2 => Some(MethodStatus::NoData),
            3 => Some(MethodStatus::UnknownMethod),
            4 => Some(MethodStatus::NotImplemented),
            _ => None,
        }
    }
}

/// Protocol version at which a session is running, threaded through every
/// method call so a single implementation can branch on v1/v2/v3 semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProtoVersion(pub u16);
