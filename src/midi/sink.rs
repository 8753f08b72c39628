// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Shared output sink.
//!
//! One `OutputSink` wraps the process's single open port. Clones share the
//! same port; every `send` holds the lock for the whole write so two callers
//! can never interleave the bytes of different messages.

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use super::MidiOutput;
use crate::error::{Error, Result};

/// Cloneable, synchronized handle to the open MIDI output
#[derive(Clone)]
pub struct OutputSink {
    inner: Arc<Mutex<Option<Box<dyn MidiOutput>>>>,
}

impl OutputSink {
    /// Take ownership of an opened output
    pub fn new(output: impl MidiOutput + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(Box::new(output)))),
        }
    }

    /// Write one complete message to the port.
    ///
    /// `Ok` only means the local transport accepted the bytes.
    pub fn send(&self, message: &[u8]) -> Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| Error::Transport("output lock poisoned".to_string()))?;
        let output = guard.as_mut().ok_or(Error::PortClosed)?;

        output
            .send(message)
            .map_err(|e| Error::Transport(e.to_string()))?;
        debug!(bytes = ?message, "MIDI message sent");
        Ok(())
    }

    /// Name of the connected port, or `None` once closed
    pub fn port_name(&self) -> Option<String> {
        let guard = self.inner.lock().ok()?;
        guard.as_ref().map(|output| output.name().to_string())
    }

    /// Whether the port is still open
    pub fn is_open(&self) -> bool {
        self.inner
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Release the port. Later sends fail with [`Error::PortClosed`].
    pub fn close(&self) {
        let taken = match self.inner.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(output) = taken {
            info!(port = %output.name(), "Closing MIDI output port");
        }
    }
}
