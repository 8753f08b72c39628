// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Channel voice message encoding.
//!
//! Builds the 2-3 byte wire form of the four message kinds the relay emits.
//! No range checks happen here; callers validate first.

use super::messages;

/// A channel voice message ready to be written to an output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMessage {
    /// Note On: channel (0-15), note (0-127), velocity (0-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },
    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },
    /// Control Change: channel (0-15), controller (0-127), value (0-127)
    ControlChange { channel: u8, controller: u8, value: u8 },
    /// Program Change: channel (0-15), program (0-127)
    ProgramChange { channel: u8, program: u8 },
}

impl ChannelMessage {
    /// Convert to MIDI bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        match *self {
            ChannelMessage::NoteOn { channel, note, velocity } => {
                vec![messages::NOTE_ON | channel, note, velocity]
            }
            ChannelMessage::NoteOff { channel, note, velocity } => {
                vec![messages::NOTE_OFF | channel, note, velocity]
            }
            ChannelMessage::ControlChange { channel, controller, value } => {
                vec![messages::CONTROL_CHANGE | channel, controller, value]
            }
            ChannelMessage::ProgramChange { channel, program } => {
                vec![messages::PROGRAM_CHANGE | channel, program]
            }
        }
    }

    /// Parse raw MIDI bytes back into a message.
    ///
    /// Only the four kinds above are recognized. A Note On with velocity 0 is
    /// kept as a Note On so that round trips stay exact.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let status = *data.first()?;
        let channel = status & 0x0F;

        match status & 0xF0 {
            messages::NOTE_ON if data.len() >= 3 => Some(ChannelMessage::NoteOn {
                channel,
                note: data[1] & 0x7F,
                velocity: data[2] & 0x7F,
            }),
            messages::NOTE_OFF if data.len() >= 3 => Some(ChannelMessage::NoteOff {
                channel,
                note: data[1] & 0x7F,
                velocity: data[2] & 0x7F,
            }),
            messages::CONTROL_CHANGE if data.len() >= 3 => Some(ChannelMessage::ControlChange {
                channel,
                controller: data[1] & 0x7F,
                value: data[2] & 0x7F,
            }),
            messages::PROGRAM_CHANGE if data.len() >= 2 => Some(ChannelMessage::ProgramChange {
                channel,
                program: data[1] & 0x7F,
            }),
            _ => None,
        }
    }
}

/// Encode a message from its status nibble, channel and data bytes.
///
/// Data bytes beyond what the kind uses are ignored. Unknown status nibbles
/// yield `None`.
pub fn encode(status: u8, channel: u8, data: &[u8]) -> Option<Vec<u8>> {
    let byte = |i: usize| data.get(i).copied();
    let message = match status & 0xF0 {
        messages::NOTE_ON => ChannelMessage::NoteOn {
            channel,
            note: byte(0)?,
            velocity: byte(1)?,
        },
        messages::NOTE_OFF => ChannelMessage::NoteOff {
            channel,
            note: byte(0)?,
            velocity: byte(1)?,
        },
        messages::CONTROL_CHANGE => ChannelMessage::ControlChange {
            channel,
            controller: byte(0)?,
            value: byte(1)?,
        },
        messages::PROGRAM_CHANGE => ChannelMessage::ProgramChange {
            channel,
            program: byte(0)?,
        },
        _ => return None,
    };
    Some(message.to_bytes())
}
