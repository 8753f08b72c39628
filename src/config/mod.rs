// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration for the relay.
//!
//! Settings come from an optional YAML file and are then overridden by
//! environment variables. Both are read once at startup.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable holding the listen port
pub const ENV_PORT: &str = "PORT";
/// Environment variable holding the listen host
pub const ENV_HOST: &str = "MIDI_RELAY_HOST";
/// Environment variable holding the output port name to look for
pub const ENV_OUTPUT_PORT: &str = "MIDI_OUTPUT_PORT";
/// Environment variable holding a config file path
pub const ENV_CONFIG: &str = "MIDI_RELAY_CONFIG";

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ServerConfig {
    /// Network listener settings
    #[serde(default)]
    pub server: ListenConfig,
    /// MIDI output settings
    #[serde(default)]
    pub output: OutputConfig,
}

impl ServerConfig {
    /// Load a configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_yaml(&contents)
    }

    /// Parse a configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")
    }

    /// Serialize to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration to YAML")
    }

    /// Build the startup configuration.
    ///
    /// Reads the file named by `path`, or by `MIDI_RELAY_CONFIG` when `path`
    /// is `None`, then applies the process environment.
    pub fn from_startup(path: Option<&Path>) -> Result<Self> {
        Self::resolve(path, |key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_startup`] with an explicit variable lookup
    pub fn resolve<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = path
            .map(Path::to_path_buf)
            .or_else(|| lookup(ENV_CONFIG).map(Into::into));

        let mut config = match file {
            Some(file) => Self::load(file)?,
            None => Self::default(),
        };
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot select a port
    pub fn validate(&self) -> Result<()> {
        if self.output.port_name.trim().is_empty() {
            return Err(anyhow!("Output port name must not be empty"));
        }
        Ok(())
    }

    /// Override fields from environment variables
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(ENV_PORT) {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| anyhow!("Invalid {} value: {:?}", ENV_PORT, port))?;
        }
        if let Some(host) = lookup(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(name) = lookup(ENV_OUTPUT_PORT) {
            self.output.port_name = name;
        }
        Ok(())
    }
}

/// Listener settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListenConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port to bind
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8000
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// MIDI output settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    /// Substring to match against output port names; also the name of the
    /// virtual port created when nothing matches
    #[serde(default = "default_port_name")]
    pub port_name: String,
    /// Client name registered with the MIDI system
    #[serde(default = "default_client_name")]
    pub client_name: String,
}

fn default_port_name() -> String {
    "MIDI Relay Out".to_string()
}
fn default_client_name() -> String {
    "midi-relay".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            port_name: default_port_name(),
            client_name: default_client_name(),
        }
    }
}
