//! Configuration model for the bridge
//!
//! Loads the YAML document mapping OSC addresses to MIDI control change targets.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;
use tracing::warn;

use crate::error::{Error, Result};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub endpoints: Vec<Endpoint>,
}

/// An OSC address bound to one or more MIDI targets
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Endpoint {
    pub address: String,
    #[serde(deserialize_with = "null_as_default")]
    pub cc: TargetSpec,
}

/// Where the arguments of a message are sent.
///
/// A YAML sequence under `cc` gives one target per positional argument, a
/// single mapping gives one target shared by every argument.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TargetSpec {
    PerArgument(Vec<MidiCc>),
    Shared(MidiCc),
}

/// An explicit YAML null (`cc:` with no value) means the same as a missing key
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Default for TargetSpec {
    fn default() -> Self {
        TargetSpec::PerArgument(Vec::new())
    }
}

/// A MIDI channel (1-16) and controller number (0-127)
///
/// Kept as plain integers: out-of-range values are passed through to the
/// output unless strict validation is requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MidiCc {
    pub channel: i32,
    pub number: i32,
}

impl MidiCc {
    pub fn new(channel: i32, number: i32) -> Self {
        Self { channel, number }
    }
}

impl Config {
    /// Load configuration from file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read(path).await.map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_slice(&contents)?;
        config.warn_duplicates();
        Ok(config)
    }

    /// Parse configuration from raw YAML bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        // An empty document is a config with no endpoints
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_slice(bytes)?)
    }

    /// Addresses configured more than once, in first-seen order
    pub fn duplicate_addresses(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for endpoint in &self.endpoints {
            let address = endpoint.address.as_str();
            if !seen.insert(address) && !duplicates.contains(&address) {
                duplicates.push(address);
            }
        }
        duplicates
    }

    fn warn_duplicates(&self) {
        for address in self.duplicate_addresses() {
            warn!(
                "Endpoint '{}' is configured more than once, the last one wins",
                address
            );
        }
    }

    /// Strict validation: unique non-empty addresses and in-range targets
    pub fn validate(&self) -> Result<()> {
        if let Some(address) = self.duplicate_addresses().first() {
            return Err(Error::ConfigInvalid(format!(
                "endpoint '{}' is configured more than once",
                address
            )));
        }

        for (idx, endpoint) in self.endpoints.iter().enumerate() {
            if endpoint.address.is_empty() {
                return Err(Error::ConfigInvalid(format!(
                    "endpoint {} address cannot be empty",
                    idx
                )));
            }

            let targets: &[MidiCc] = match &endpoint.cc {
                TargetSpec::PerArgument(targets) => targets,
                TargetSpec::Shared(target) => std::slice::from_ref(target),
            };

            for cc in targets {
                if !(1..=16).contains(&cc.channel) {
                    return Err(Error::ConfigInvalid(format!(
                        "endpoint '{}' has invalid MIDI channel {} (must be 1-16)",
                        endpoint.address, cc.channel
                    )));
                }
                if !(0..=127).contains(&cc.number) {
                    return Err(Error::ConfigInvalid(format!(
                        "endpoint '{}' has invalid CC number {} (must be 0-127)",
                        endpoint.address, cc.number
                    )));
                }
            }
        }

        Ok(())
    }
}
