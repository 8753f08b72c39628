// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Request validation.
//!
//! Single-message checks run field by field and stop at the first violation.
//! Batch checks run over every event before anything is scheduled; the first
//! bad event rejects the whole batch.

use std::fmt;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use super::{EventRequest, MidiEvent, DEFAULT_VELOCITY};

/// Highest data byte value
pub const MAX_DATA: u8 = 127;
/// Highest channel number
pub const MAX_CHANNEL: u8 = 15;

/// Named request field, used in error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Note,
    Velocity,
    Channel,
    Controller,
    Value,
    Program,
    Duration,
    StartTime,
}

impl Field {
    /// Key as it appears in request payloads
    pub fn key(&self) -> &'static str {
        match self {
            Field::Note => "note",
            Field::Velocity => "velocity",
            Field::Channel => "channel",
            Field::Controller => "controller",
            Field::Value => "value",
            Field::Program => "program",
            Field::Duration => "duration",
            Field::StartTime => "start_time",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Field::Note => "Note",
            Field::Velocity => "Velocity",
            Field::Channel => "Channel",
            Field::Controller => "Controller number",
            Field::Value => "Value",
            Field::Program => "Program",
            Field::Duration => "Duration",
            Field::StartTime => "start_time",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Single-message argument outside its range
    #[error("{field} must be between 0 and {max}")]
    OutOfRange { field: Field, value: i64, max: u8 },

    /// Sequence entry that is not a JSON object
    #[error("Event {index}: must be an object")]
    NotAnObject { index: usize },

    /// Sequence event without a required field
    #[error("Event {index}: '{}' is required.", .field.key())]
    MissingField { index: usize, field: Field },

    /// Sequence event field that is not an integer in range
    #[error("Event {index}: {field} must be an integer between 0 and {max}")]
    InvalidInteger { index: usize, field: Field, max: u8 },

    /// Sequence event time that is not a usable non-negative number
    #[error("Event {index}: {field} must be a non-negative number")]
    InvalidTime { index: usize, field: Field },
}

impl ValidationError {
    /// Index of the offending event, for batch errors
    pub fn event_index(&self) -> Option<usize> {
        match self {
            ValidationError::OutOfRange { .. } => None,
            ValidationError::NotAnObject { index }
            | ValidationError::MissingField { index, .. }
            | ValidationError::InvalidInteger { index, .. }
            | ValidationError::InvalidTime { index, .. } => Some(*index),
        }
    }

    /// Field the error is about, if it concerns a single field
    pub fn field(&self) -> Option<Field> {
        match self {
            ValidationError::NotAnObject { .. } => None,
            ValidationError::OutOfRange { field, .. }
            | ValidationError::MissingField { field, .. }
            | ValidationError::InvalidInteger { field, .. }
            | ValidationError::InvalidTime { field, .. } => Some(*field),
        }
    }
}

/// Check a single-message argument against `0..=max`
pub fn check_range(field: Field, value: i64, max: u8) -> Result<u8, ValidationError> {
    if (0..=max as i64).contains(&value) {
        Ok(value as u8)
    } else {
        Err(ValidationError::OutOfRange { field, value, max })
    }
}

/// Validate note, velocity and channel for Note On / Note Off
pub fn validate_note_args(
    note: i64,
    velocity: i64,
    channel: i64,
) -> Result<(u8, u8, u8), ValidationError> {
    Ok((
        check_range(Field::Note, note, MAX_DATA)?,
        check_range(Field::Velocity, velocity, MAX_DATA)?,
        check_range(Field::Channel, channel, MAX_CHANNEL)?,
    ))
}

/// Validate controller, value and channel for Control Change
pub fn validate_control_args(
    controller: i64,
    value: i64,
    channel: i64,
) -> Result<(u8, u8, u8), ValidationError> {
    Ok((
        check_range(Field::Controller, controller, MAX_DATA)?,
        check_range(Field::Value, value, MAX_DATA)?,
        check_range(Field::Channel, channel, MAX_CHANNEL)?,
    ))
}

/// Validate program and channel for Program Change
pub fn validate_program_args(program: i64, channel: i64) -> Result<(u8, u8), ValidationError> {
    Ok((
        check_range(Field::Program, program, MAX_DATA)?,
        check_range(Field::Channel, channel, MAX_CHANNEL)?,
    ))
}

/// Turn raw batch entries into requests, naming the first entry that is
/// not an object
pub fn parse_events(values: &[Value]) -> Result<Vec<EventRequest>, ValidationError> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            if !value.is_object() {
                return Err(ValidationError::NotAnObject { index });
            }
            serde_json::from_value(value.clone()).map_err(|_| ValidationError::NotAnObject { index })
        })
        .collect()
}

/// Validate a whole batch in input order.
///
/// Returns the typed events only if every event passes.
pub fn validate_events(events: &[EventRequest]) -> Result<Vec<MidiEvent>, ValidationError> {
    events
        .iter()
        .enumerate()
        .map(|(index, event)| validate_event(index, event))
        .collect()
}

fn validate_event(index: usize, event: &EventRequest) -> Result<MidiEvent, ValidationError> {
    let note = event
        .note
        .as_ref()
        .ok_or(ValidationError::MissingField { index, field: Field::Note })?;
    let duration = event
        .duration
        .as_ref()
        .ok_or(ValidationError::MissingField { index, field: Field::Duration })?;

    let note = event_integer(index, Field::Note, note, MAX_DATA)?;
    let velocity = match &event.velocity {
        Some(v) => event_integer(index, Field::Velocity, v, MAX_DATA)?,
        None => DEFAULT_VELOCITY,
    };
    let channel = match &event.channel {
        Some(v) => event_integer(index, Field::Channel, v, MAX_CHANNEL)?,
        None => 0,
    };
    let duration = event_time(index, Field::Duration, duration)?;
    let start_time = match &event.start_time {
        Some(v) => event_time(index, Field::StartTime, v)?,
        None => Duration::ZERO,
    };

    Ok(MidiEvent {
        note,
        velocity,
        channel,
        duration,
        start_time,
    })
}

fn event_integer(index: usize, field: Field, value: &Value, max: u8) -> Result<u8, ValidationError> {
    value
        .as_i64()
        .filter(|v| (0..=max as i64).contains(v))
        .map(|v| v as u8)
        .ok_or(ValidationError::InvalidInteger { index, field, max })
}

fn event_time(index: usize, field: Field, value: &Value) -> Result<Duration, ValidationError> {
    let invalid = ValidationError::InvalidTime { index, field };
    let secs = value.as_f64().ok_or(invalid.clone())?;

    if secs < 0.0 {
        return Err(invalid);
    }
    if secs == 0.0 {
        return Ok(Duration::ZERO);
    }
    Duration::try_from_secs_f64(secs).map_err(|_| invalid)
}
