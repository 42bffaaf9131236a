//! Core-relevant configuration (spec §3 "Configuration").
//!
//! Loading a configuration file is an external collaborator's job (spec
//! §1); this module only holds the validated, read-only value the core
//! consumes and the defaulting rules an external loader is expected to
//! apply before handing it over.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Protocol version bounds this build supports (spec glossary).
pub const PROTOCOL_MIN: u16 = 1;
pub const PROTOCOL_MAX: u16 = 3;

/// Default config file name (SPEC_FULL §4.9), compared against during
/// file-receive to avoid a client overwriting its own config (spec §4.4).
pub const DEFAULT_CONFIG_FILE_NAME: &str = "clipshare-desktop.conf";

/// Historical 64 GiB default for `max_file_size` (SPEC_FULL §11.4).
pub const DEFAULT_MAX_FILE_SIZE: i64 = 68_719_476_736;

const DEFAULT_PLAINTEXT_PORT: u16 = 4337;
const DEFAULT_TLS_PORT: u16 = 4338;
const DEFAULT_UDP_PORT: u16 = 4337;
const DEFAULT_WEB_PORT: u16 = 8888;
const DEFAULT_MAX_TEXT_LENGTH: u32 = 4 * 1024 * 1024;
const DEFAULT_MAX_FILE_COUNT: u32 = 128;

/// Deserialized directly from the `clipshare-desktop.conf` JSON document by
/// an external loader (loading itself is out of scope, SPEC_FULL §10.3);
/// the core only ever sees the already-validated, `with_defaults`-applied
/// value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub plaintext_port: u16,
    pub tls_port: u16,
    pub udp_port: u16,
    pub web_port: u16,
    pub secure_mode_enabled: bool,
    #[serde(with = "serde_bytes_as_hex")]
    pub client_cert: Vec<u8>,
    #[serde(with = "serde_bytes_as_hex")]
    pub ca_cert: Vec<u8>,
    pub trusted_servers: HashSet<String>,
    pub max_text_length: u32,
    pub max_file_size: i64,
    pub max_file_count: u32,
    pub min_proto_version: u16,
    pub max_proto_version: u16,
    pub auto_send_text: bool,
    pub auto_send_files: bool,
    pub working_dir: Option<PathBuf>,
    pub bind_addr: u32,
}

/// Certificate/key bytes round-trip through the JSON config as plain hex
/// strings rather than a byte array, matching how the teacher's
/// `secure/rust` DTOs serialize binary fields.
mod serde_bytes_as_hex {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        hex::encode(bytes).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            plaintext_port: DEFAULT_PLAINTEXT_PORT,
            tls_port: DEFAULT_TLS_PORT,
            udp_port: DEFAULT_UDP_PORT,
            web_port: DEFAULT_WEB_PORT,
            secure_mode_enabled: false,
            client_cert: Vec::new(),
            ca_cert: Vec::new(),
            trusted_servers: HashSet::new(),
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_file_count: DEFAULT_MAX_FILE_COUNT,
            min_proto_version: PROTOCOL_MIN,
            max_proto_version: PROTOCOL_MAX,
            auto_send_text: false,
            auto_send_files: false,
            working_dir: None,
            bind_addr: 0,
        }
    }
}

impl Configuration {
    /// Applies the zero/out-of-range defaulting rules spec §3 requires,
    /// consuming a partially-populated configuration (e.g. parsed from a
    /// file by an external loader) and returning one safe for the core to
    /// use.
    pub fn with_defaults(mut self) -> Self {
        if self.plaintext_port == 0 {
            self.plaintext_port = DEFAULT_PLAINTEXT_PORT;
        }
        if self.tls_port == 0 {
            self.tls_port = DEFAULT_TLS_PORT;
        }
        if self.udp_port == 0 {
            self.udp_port = DEFAULT_UDP_PORT;
        }
        if self.web_port == 0 {
            self.web_port = DEFAULT_WEB_PORT;
        }
        if self.max_text_length == 0 {
            self.max_text_length = DEFAULT_MAX_TEXT_LENGTH;
        }
        if self.max_file_size <= 0 {
            self.max_file_size = DEFAULT_MAX_FILE_SIZE;
        }
        if self.max_file_count == 0 {
            self.max_file_count = DEFAULT_MAX_FILE_COUNT;
        }
        if self.min_proto_version < PROTOCOL_MIN {
            self.min_proto_version = PROTOCOL_MIN;
        }
        if self.max_proto_version > PROTOCOL_MAX || self.max_proto_version == 0 {
            self.max_proto_version = PROTOCOL_MAX;
        }
        if self.min_proto_version > self.max_proto_version {
            self.min_proto_version = self.max_proto_version;
        }
        self
    }

    /// Whether `name` is the literal configured config filename, used by
    /// the file-receive collision rule (spec §4.4): a non-default working
    /// directory means the client can't be overwriting its own config, so
    /// the shift is skipped (grounded in the spec's "unless a non-default
    /// working directory is in use" clause).
    pub fn is_own_config_filename(&self, name: &str) -> bool {
        self.working_dir.is_none() && name == DEFAULT_CONFIG_FILE_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_zeroed_fields() {
        let cfg = Configuration {
            plaintext_port: 0,
            tls_port: 0,
            udp_port: 0,
            web_port: 0,
            max_text_length: 0,
            max_file_size: 0,
            max_file_count: 0,
            min_proto_version: 0,
            max_proto_version: 0,
            ..Configuration::default()
        }
        .with_defaults();
        assert_eq!(cfg.plaintext_port, DEFAULT_PLAINTEXT_PORT);
        assert_eq!(cfg.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(cfg.min_proto_version, PROTOCOL_MIN);
        assert_eq!(cfg.max_proto_version, PROTOCOL_MAX);
    }

    #[test]
    fn clamps_out_of_range_proto_bounds() {
        let cfg = Configuration {
            min_proto_version: 0,
            max_proto_version: 99,
            ..Configuration::default()
        }
        .with_defaults();
        assert_eq!(cfg.max_proto_version, PROTOCOL_MAX);
        assert_eq!(cfg.min_proto_version, PROTOCOL_MIN);
    }

    #[test]
    fn round_trips_through_json_with_hex_encoded_certs() {
        let cfg = Configuration {
            client_cert: vec![0xde, 0xad, 0xbe, 0xef],
            ca_cert: vec![0x01, 0x02],
            trusted_servers: ["peer1".to_string()].into_iter().collect(),
            ..Configuration::default()
        };

        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"deadbeef\""));

        let parsed: Configuration = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.client_cert, cfg.client_cert);
        assert_eq!(parsed.ca_cert, cfg.ca_cert);
        assert_eq!(parsed.trusted_servers, cfg.trusted_servers);
    }

    #[test]
    fn own_config_filename_only_matches_default_working_dir() {
        let cfg = Configuration::default();
        assert!(cfg.is_own_config_filename(DEFAULT_CONFIG_FILE_NAME));
        let cfg2 = Configuration {
            working_dir: Some(PathBuf::from("/tmp/custom")),
            ..Configuration::default()
        };
        assert!(!cfg2.is_own_config_filename(DEFAULT_CONFIG_FILE_NAME));
    }
}
