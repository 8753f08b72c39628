// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! midir backend.
//!
//! This module provides a midir implementation of the `MidiOutput` trait:
//! port enumeration, opening a port by index or by name, and creating a
//! virtual port where the platform supports it.

use anyhow::{anyhow, Result};
use midir::{MidiOutput as MidirClient, MidiOutputConnection};
use tracing::{info, warn};

use super::MidiOutput;
use crate::config::OutputConfig;

/// midir output connection.
pub struct MidirOutput {
    connection: MidiOutputConnection,
    port_name: String,
}

impl MidirOutput {
    /// Create a new output connected to the specified port.
    ///
    /// # Arguments
    /// * `client_name` - Name the client registers with the MIDI system
    /// * `port_index` - Index of the port in the system's output list
    pub fn new(client_name: &str, port_index: usize) -> Result<Self> {
        let client = MidirClient::new(client_name)
            .map_err(|e| anyhow!("Failed to create MIDI client: {}", e))?;

        let ports = client.ports();
        let port = ports.get(port_index).ok_or_else(|| {
            anyhow!(
                "MIDI destination {} not found (only {} available)",
                port_index,
                ports.len()
            )
        })?;

        let port_name = client
            .port_name(port)
            .unwrap_or_else(|_| format!("Unknown {}", port_index));

        let connection = client
            .connect(port, client_name)
            .map_err(|e| anyhow!("Failed to connect to '{}': {}", port_name, e))?;

        Ok(Self {
            connection,
            port_name,
        })
    }

    /// Create a virtual output port other applications can connect to.
    #[cfg(unix)]
    pub fn new_virtual(client_name: &str, port_name: &str) -> Result<Self> {
        use midir::os::unix::VirtualOutput;

        let client = MidirClient::new(client_name)
            .map_err(|e| anyhow!("Failed to create MIDI client: {}", e))?;

        let connection = client
            .create_virtual(port_name)
            .map_err(|e| anyhow!("Failed to create virtual port '{}': {}", port_name, e))?;

        Ok(Self {
            connection,
            port_name: port_name.to_string(),
        })
    }

    #[cfg(not(unix))]
    pub fn new_virtual(_client_name: &str, port_name: &str) -> Result<Self> {
        Err(anyhow!(
            "Virtual MIDI ports are not supported on this platform (wanted '{}')",
            port_name
        ))
    }
}

impl MidiOutput for MidirOutput {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        self.connection
            .send(message)
            .map_err(|e| anyhow!("Failed to send MIDI message: {}", e))
    }

    fn name(&self) -> &str {
        &self.port_name
    }
}

/// Open the output described by the configuration.
///
/// Picks the first port whose name contains `port_name` (case-insensitive).
/// When nothing matches, a virtual port with that name is created instead.
/// Any other failure is returned to the caller, which treats it as fatal.
pub fn open_output(config: &OutputConfig) -> Result<MidirOutput> {
    if let Some(index) = find_destination(&config.port_name) {
        let output = MidirOutput::new(&config.client_name, index)?;
        info!(port = %output.port_name, "Opened MIDI output port");
        return Ok(output);
    }

    warn!(
        wanted = %config.port_name,
        "No MIDI output port matched, creating virtual port"
    );
    let output = MidirOutput::new_virtual(&config.client_name, &config.port_name)?;
    info!(port = %output.port_name, "Opened virtual MIDI port");
    Ok(output)
}

/// Index of the first destination whose name contains `name`, ignoring case
fn find_destination(name: &str) -> Option<usize> {
    let needle = name.to_lowercase();
    list_destinations()
        .into_iter()
        .find(|(_, n)| n.to_lowercase().contains(&needle))
        .map(|(i, _)| i)
}

/// List all available MIDI output ports.
///
/// # Returns
/// A vector of (index, name) tuples. Empty if the MIDI system is unavailable.
pub fn list_destinations() -> Vec<(usize, String)> {
    let client = match MidirClient::new("midi-relay-list") {
        Ok(client) => client,
        Err(e) => {
            warn!("MIDI system unavailable: {}", e);
            return Vec::new();
        }
    };

    client
        .ports()
        .iter()
        .enumerate()
        .map(|(i, port)| {
            let name = client
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown {}", i));
            (i, name)
        })
        .collect()
}

/// Print all available MIDI output ports to stdout.
pub fn print_destinations() {
    let destinations = list_destinations();
    if destinations.is_empty() {
        println!("No MIDI destinations found.");
    } else {
        println!("Available MIDI destinations:");
        for (i, name) in destinations {
            println!("  {}: {}", i, name);
        }
    }
}
