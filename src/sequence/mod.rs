// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Timed note sequences.
//!
//! This module provides the batch side of the relay:
//! - Event types as received over the wire and after validation
//! - Range and presence validation for single messages and whole batches
//! - The scheduler that plays a validated batch against the output sink

pub mod scheduler;
pub mod validate;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use scheduler::Scheduler;
pub use validate::{parse_events, validate_events, Field, ValidationError};

/// Default velocity for sequence notes
pub const DEFAULT_VELOCITY: u8 = 127;

/// One sequence entry exactly as the caller sent it.
///
/// Fields stay untyped until validation so that a wrong type can be reported
/// against the event index and field name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EventRequest {
    #[serde(default)]
    pub note: Option<Value>,
    #[serde(default)]
    pub velocity: Option<Value>,
    #[serde(default)]
    pub channel: Option<Value>,
    #[serde(default)]
    pub duration: Option<Value>,
    #[serde(default)]
    pub start_time: Option<Value>,
}

/// A validated note event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidiEvent {
    /// MIDI note number (0-127)
    pub note: u8,
    /// Note On velocity (0-127)
    pub velocity: u8,
    /// MIDI channel (0-15)
    pub channel: u8,
    /// How long the note sounds
    pub duration: Duration,
    /// Offset from the batch epoch
    pub start_time: Duration,
}

impl MidiEvent {
    /// Create an event starting at the epoch with default velocity and channel
    pub fn new(note: u8, duration: Duration) -> Self {
        Self {
            note,
            velocity: DEFAULT_VELOCITY,
            channel: 0,
            duration,
            start_time: Duration::ZERO,
        }
    }

    /// Set the start offset
    pub fn starting_at(mut self, start_time: Duration) -> Self {
        self.start_time = start_time;
        self
    }

    /// Set the channel
    pub fn on_channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    /// Set the velocity
    pub fn with_velocity(mut self, velocity: u8) -> Self {
        self.velocity = velocity;
        self
    }
}

/// Lifecycle step an outcome entry reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomePhase {
    NoteOnSent,
    NoteOffSent,
    Error,
}

/// One entry in a batch's result list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventOutcome {
    /// Position of the event in the request
    pub event_index: usize,
    /// Which step this entry reports
    #[serde(rename = "status")]
    pub phase: OutcomePhase,
    /// Human-readable detail
    pub message: String,
}

/// Overall batch response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceReport {
    /// Always "success" once validation passed; see `results` for per-event detail
    pub status: String,
    pub message: String,
    pub results: Vec<EventOutcome>,
}

impl SequenceReport {
    /// Outcomes for one event, in the order they were recorded
    pub fn outcomes_for(&self, event_index: usize) -> Vec<&EventOutcome> {
        self.results
            .iter()
            .filter(|o| o.event_index == event_index)
            .collect()
    }

    /// Number of events that recorded an error
    pub fn failed_events(&self) -> usize {
        self.results
            .iter()
            .filter(|o| o.phase == OutcomePhase::Error)
            .count()
    }
}
