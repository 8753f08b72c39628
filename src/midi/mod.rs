// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI output abstraction layer.
//!
//! This module provides a trait-based abstraction for MIDI output so the
//! scheduler and request handlers can write through a real port (midir) or a
//! test double interchangeably. All writes go through the shared
//! [`OutputSink`].

pub mod memory;
pub mod message;
pub mod midir_backend;
pub mod sink;

use anyhow::Result;

pub use memory::{MemoryOutput, SentMessage};
pub use message::{encode, ChannelMessage};
pub use midir_backend::{list_destinations, open_output, print_destinations, MidirOutput};
pub use sink::OutputSink;

/// Trait for MIDI output implementations.
///
/// Implementations only need to hand bytes to the local transport. There is
/// no acknowledgment from the receiving device.
pub trait MidiOutput: Send {
    /// Send a MIDI message immediately.
    ///
    /// # Arguments
    /// * `message` - Raw MIDI bytes (e.g., `[0x90, 60, 127]` for Note On)
    ///
    /// # Returns
    /// * `Ok(())` if the transport accepted the bytes
    /// * `Err` if the message could not be sent
    fn send(&mut self, message: &[u8]) -> Result<()>;

    /// Human-readable name of the connected port
    fn name(&self) -> &str;
}

/// MIDI status nibbles (lower nibble is the channel 0-15)
pub mod messages {
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const CONTROL_CHANGE: u8 = 0xB0;
    pub const PROGRAM_CHANGE: u8 = 0xC0;
}
