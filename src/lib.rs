// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI relay.
//!
//! Turns remote requests into MIDI output: single Note On, Note Off, Control
//! Change and Program Change messages, plus timed batches of notes played
//! concurrently through one shared output port.

pub mod config;
pub mod error;
pub mod midi;
pub mod sequence;
pub mod server;

pub use config::ServerConfig;
pub use error::{Error, Result};
pub use midi::{MemoryOutput, MidiOutput, OutputSink};
pub use sequence::{EventOutcome, EventRequest, MidiEvent, OutcomePhase, Scheduler, SequenceReport};
pub use server::{MidiService, ToolResponse};
