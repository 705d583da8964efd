//! Persisted configuration: a key/value rc file parsed into the options
//! spec.md §6 lists (`capture.*`, `storage.*`, `hep.*`, `alias`,
//! `externip`, `attribute.*`).
//!
//! Syntax, one directive per line: `set <option> <value>` for every
//! dotted option, or a bare `alias <addr> <name>` / `externip <addr>
//! <addr>` pair. Blank lines and lines starting with `#` are ignored.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// One `attribute.<name>.*` override or addition from the config file.
#[derive(Debug, Clone, Default)]
pub struct AttributeOverride {
    pub title: Option<String>,
    pub desc: Option<String>,
    pub regexp: Option<String>,
    pub length: Option<usize>,
}

/// Parsed contents of a config file, defaults matching spec.md §6's
/// "Persisted state" table.
#[derive(Debug, Clone)]
pub struct Config {
    pub capture_limit: usize,
    pub capture_storage: u64,
    pub capture_device: Option<String>,
    pub capture_rtp: bool,
    pub capture_rotate: bool,
    pub storage_filter_methods: Option<String>,
    pub storage_savepath: Option<String>,
    pub hep_send: HashMap<String, String>,
    pub hep_listen: HashMap<String, String>,
    pub aliases: HashMap<String, String>,
    pub externips: HashMap<String, String>,
    pub attribute_overrides: HashMap<String, AttributeOverride>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture_limit: 0,
            capture_storage: u64::MAX,
            capture_device: None,
            capture_rtp: false,
            capture_rotate: false,
            storage_filter_methods: None,
            storage_savepath: None,
            hep_send: HashMap::new(),
            hep_listen: HashMap::new(),
            aliases: HashMap::new(),
            externips: HashMap::new(),
            attribute_overrides: HashMap::new(),
        }
    }
}

impl Config {
    /// Read and parse a config file from disk. A missing or malformed
    /// line is logged and skipped (spec.md §7's `ConfigError` policy);
    /// only an unreadable file is a hard error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let mut config = Config::default();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Err(()) = config.apply_line(line) {
                tracing::warn!(line, "skipping unrecognized config line");
            }
        }
        Ok(config)
    }

    fn apply_line(&mut self, line: &str) -> Result<(), ()> {
        let mut parts = line.splitn(2, char::is_whitespace);
        let directive = parts.next().ok_or(())?;
        let rest = parts.next().unwrap_or("").trim();

        match directive {
            "set" => self.apply_set(rest),
            "alias" => {
                let (addr, name) = rest.split_once(char::is_whitespace).ok_or(())?;
                self.aliases.insert(addr.to_string(), name.trim().to_string());
                Ok(())
            }
            "externip" => {
                let (addr, twin) = rest.split_once(char::is_whitespace).ok_or(())?;
                self.externips.insert(addr.to_string(), twin.trim().to_string());
                Ok(())
            }
            _ => Err(()),
        }
    }

    fn apply_set(&mut self, rest: &str) -> Result<(), ()> {
        let (option, value) = rest.split_once(char::is_whitespace).ok_or(())?;
        let value = value.trim();

        match option {
            "capture.limit" => self.capture_limit = value.parse().map_err(|_| ())?,
            "capture.storage" => self.capture_storage = value.parse().map_err(|_| ())?,
            "capture.device" => self.capture_device = Some(value.to_string()),
            "capture.rtp" => self.capture_rtp = parse_bool(value)?,
            "capture.rotate" => self.capture_rotate = parse_bool(value)?,
            "storage.filter.methods" => self.storage_filter_methods = Some(value.to_string()),
            "storage.savepath" => self.storage_savepath = Some(value.to_string()),
            _ if option.starts_with("hep.send.") => {
                self.hep_send.insert(option["hep.send.".len()..].to_string(), value.to_string());
            }
            _ if option.starts_with("hep.listen.") => {
                self.hep_listen.insert(option["hep.listen.".len()..].to_string(), value.to_string());
            }
            _ if option.starts_with("attribute.") => {
                let rest = &option["attribute.".len()..];
                let (name, field) = rest.rsplit_once('.').ok_or(())?;
                let entry = self.attribute_overrides.entry(name.to_string()).or_default();
                match field {
                    "title" => entry.title = Some(value.to_string()),
                    "desc" => entry.desc = Some(value.to_string()),
                    "regexp" => entry.regexp = Some(value.to_string()),
                    "length" => entry.length = Some(value.parse().map_err(|_| ())?),
                    _ => return Err(()),
                }
            }
            _ => return Err(()),
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Result<bool, ()> {
    match value {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(()),
    }
}
