use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use toml::Value;

use crate::receiver_config::{ReceiverConfig, StreamKind};

/// Build a `ReceiverConfig` from a TOML configuration string.
pub fn from_toml_str(toml_str: &str) -> Result<ReceiverConfig, Box<dyn std::error::Error>> {
    let root: TomlConfigRoot = toml::from_str(toml_str)?;

    let expected_config_version = "0.3";
    if root.config_version != expected_config_version {
        return Err(format!(
            "Unrecognized config_version: {}, expect {}",
            root.config_version, expected_config_version
        )
        .into());
    }
    if !root.extra.is_empty() {
        return Err(format!("Unrecognized top-level fields: {:?}", sorted_keys(&root.extra)).into());
    }
    if let Some(ref io) = root.io {
        if !io.extra.is_empty() {
            return Err(format!("Unrecognized fields: io::{:?}", sorted_keys(&io.extra)).into());
        }
    }
    if let Some(ref ul) = root.uplink {
        if !ul.extra.is_empty() {
            return Err(format!("Unrecognized fields: uplink::{:?}", sorted_keys(&ul.extra)).into());
        }
    }

    let mut cfg = ReceiverConfig {
        debug_log: root.debug_log,
        ..ReceiverConfig::default()
    };

    if let Some(io) = root.io {
        if let Some(v) = io.receive_port {
            cfg.receive_port = v;
        }
        if let Some(v) = io.send_port {
            cfg.send_port = v;
        }
        if let Some(v) = io.packed {
            cfg.packed = v;
        }
        if let Some(v) = io.iq_stream {
            cfg.stream = if v { StreamKind::Iq } else { StreamKind::Bits };
        }
        cfg.input_file = io.input_file;
        cfg.output_file = io.output_file;
        if let Some(v) = io.num_workers {
            if v == 0 {
                return Err("io.num_workers must be at least 1".into());
            }
            cfg.num_workers = v;
        }
    }

    if let Some(ul) = root.uplink {
        cfg.uplink_scrambling_code = ul.scrambling_code;
    }

    Ok(cfg)
}

/// Build a `ReceiverConfig` from any reader.
pub fn from_reader<R: Read>(reader: R) -> Result<ReceiverConfig, Box<dyn std::error::Error>> {
    let mut contents = String::new();
    let mut reader = BufReader::new(reader);
    reader.read_to_string(&mut contents)?;
    from_toml_str(&contents)
}

/// Build a `ReceiverConfig` from a file path.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ReceiverConfig, Box<dyn std::error::Error>> {
    let f = File::open(path)?;
    from_reader(BufReader::new(f))
}

fn sorted_keys(map: &HashMap<String, Value>) -> Vec<&String> {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    keys
}

#[derive(Debug, Deserialize)]
struct TomlConfigRoot {
    config_version: String,
    debug_log: Option<String>,
    io: Option<IoDto>,
    uplink: Option<UplinkDto>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct IoDto {
    receive_port: Option<u16>,
    send_port: Option<u16>,
    packed: Option<bool>,
    iq_stream: Option<bool>,
    input_file: Option<String>,
    output_file: Option<String>,
    num_workers: Option<usize>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct UplinkDto {
    scrambling_code: Option<u32>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let cfg = from_toml_str(
            r#"
            config_version = "0.3"
            debug_log = "rx.log"

            [io]
            receive_port = 42000
            send_port = 42100
            packed = true
            iq_stream = false
            input_file = "capture.bits"
            num_workers = 2

            [uplink]
            scrambling_code = 0x41FFFE03
            "#,
        )
        .unwrap();

        assert_eq!(cfg.receive_port, 42000);
        assert_eq!(cfg.send_port, 42100);
        assert!(cfg.packed);
        assert_eq!(cfg.stream, StreamKind::Bits);
        assert_eq!(cfg.input_file.as_deref(), Some("capture.bits"));
        assert_eq!(cfg.num_workers, 2);
        assert_eq!(cfg.uplink_scrambling_code, Some(0x41FFFE03));
        assert_eq!(cfg.debug_log.as_deref(), Some("rx.log"));
    }

    #[test]
    fn defaults_apply_when_sections_missing() {
        let cfg = from_toml_str("config_version = \"0.3\"").unwrap();
        assert_eq!(cfg.receive_port, 42000);
        assert_eq!(cfg.num_workers, 4);
        assert!(!cfg.packed);
        assert_eq!(cfg.uplink_scrambling_code, None);
    }

    #[test]
    fn rejects_unknown_keys_and_wrong_version() {
        assert!(from_toml_str("config_version = \"9.9\"").is_err());
        assert!(
            from_toml_str("config_version = \"0.3\"\n[io]\nrecieve_port = 1\n").is_err(),
            "typoed key must be rejected"
        );
    }
}
