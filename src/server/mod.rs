// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Request handling.
//!
//! [`MidiService`] is the operation surface: four single-message calls and
//! one batch call, all writing through the shared sink. The `protocol` and
//! `listener` modules put it on the network as newline-delimited JSON.

pub mod listener;
pub mod protocol;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::midi::{list_destinations, ChannelMessage, OutputSink};
use crate::sequence::validate::{validate_control_args, validate_note_args, validate_program_args};
use crate::sequence::{validate_events, EventRequest, Scheduler, SequenceReport};

pub use listener::serve;
pub use protocol::{handle_bytes, handle_line, Method, Request, Response, RpcError};

/// Default Note On velocity
pub const NOTE_ON_VELOCITY: i64 = 127;
/// Default Note Off velocity
pub const NOTE_OFF_VELOCITY: i64 = 64;

/// Reply to a single-message call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub status: String,
    pub message: String,
}

impl ToolResponse {
    fn success(message: String) -> Self {
        Self {
            status: "success".to_string(),
            message,
        }
    }
}

/// Output ports visible to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortListing {
    pub status: String,
    /// Port the relay is writing to, if still open
    pub active: Option<String>,
    /// Every output port the MIDI system reports
    pub ports: Vec<String>,
}

/// The relay's operations, bound to one output sink
#[derive(Clone)]
pub struct MidiService {
    sink: OutputSink,
    scheduler: Scheduler,
}

impl MidiService {
    pub fn new(sink: OutputSink) -> Self {
        Self {
            scheduler: Scheduler::new(sink.clone()),
            sink,
        }
    }

    /// The sink all operations write through
    pub fn sink(&self) -> &OutputSink {
        &self.sink
    }

    /// Send a Note On
    pub fn note_on(&self, note: i64, velocity: i64, channel: i64) -> Result<ToolResponse> {
        let (note, velocity, channel) = validate_note_args(note, velocity, channel)?;
        self.sink
            .send(&ChannelMessage::NoteOn { channel, note, velocity }.to_bytes())?;

        let message = format!("Sent Note On: ch={}, note={}, vel={}", channel, note, velocity);
        info!("{}", message);
        Ok(ToolResponse::success(message))
    }

    /// Send a Note Off
    pub fn note_off(&self, note: i64, velocity: i64, channel: i64) -> Result<ToolResponse> {
        let (note, velocity, channel) = validate_note_args(note, velocity, channel)?;
        self.sink
            .send(&ChannelMessage::NoteOff { channel, note, velocity }.to_bytes())?;

        let message = format!("Sent Note Off: ch={}, note={}, vel={}", channel, note, velocity);
        info!("{}", message);
        Ok(ToolResponse::success(message))
    }

    /// Send a Control Change
    pub fn control_change(&self, controller: i64, value: i64, channel: i64) -> Result<ToolResponse> {
        let (controller, value, channel) = validate_control_args(controller, value, channel)?;
        self.sink
            .send(&ChannelMessage::ControlChange { channel, controller, value }.to_bytes())?;

        let message = format!("Sent CC: ch={}, cc={}, val={}", channel, controller, value);
        info!("{}", message);
        Ok(ToolResponse::success(message))
    }

    /// Send a Program Change
    pub fn program_change(&self, program: i64, channel: i64) -> Result<ToolResponse> {
        let (program, channel) = validate_program_args(program, channel)?;
        self.sink
            .send(&ChannelMessage::ProgramChange { channel, program }.to_bytes())?;

        let message = format!("Sent Program Change: ch={}, program={}", channel, program);
        info!("{}", message);
        Ok(ToolResponse::success(message))
    }

    /// Validate the whole batch, then play it.
    ///
    /// Nothing is sent if any event is invalid.
    pub async fn run_sequence(&self, events: &[EventRequest]) -> Result<SequenceReport> {
        let events = validate_events(events)?;
        info!(events = events.len(), "Starting sequence");
        Ok(self.scheduler.run(events).await)
    }

    /// Report the output ports the MIDI system can see
    pub fn list_ports(&self) -> PortListing {
        PortListing {
            status: "success".to_string(),
            active: self.sink.port_name(),
            ports: list_destinations().into_iter().map(|(_, name)| name).collect(),
        }
    }
}
