// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Error types for the relay.

use thiserror::Error;

use crate::sequence::ValidationError;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Request arguments failed range or presence checks
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The output transport rejected a write
    #[error("MIDI transport error: {0}")]
    Transport(String),

    /// The output sink has been closed
    #[error("MIDI output port is closed")]
    PortClosed,

    /// A port could not be found, opened, or created
    #[error("MIDI port error: {0}")]
    Port(String),
}

impl Error {
    /// True for errors caused by the caller's input rather than the transport
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}
