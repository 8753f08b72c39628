// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! In-memory output.
//!
//! Records every message with the time it was written instead of talking to
//! a device. Backs `--dry-run` and stands in for a port in tests.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use tokio::time::Instant;
use tracing::info;

use super::{ChannelMessage, MidiOutput};

type FailurePredicate = Arc<dyn Fn(&[u8]) -> bool + Send + Sync>;

/// A message captured by [`MemoryOutput`]
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub bytes: Vec<u8>,
    pub at: Instant,
}

impl SentMessage {
    /// Decoded form of the bytes, if they are a known channel message
    pub fn decoded(&self) -> Option<ChannelMessage> {
        ChannelMessage::parse(&self.bytes)
    }
}

/// Output that keeps messages in memory. Clones share the same log.
#[derive(Clone, Default)]
pub struct MemoryOutput {
    log: Arc<Mutex<Vec<SentMessage>>>,
    fail_when: Option<FailurePredicate>,
    echo_only: bool,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// An output that rejects every message matching `predicate`
    pub fn failing_when(predicate: impl Fn(&[u8]) -> bool + Send + Sync + 'static) -> Self {
        Self {
            fail_when: Some(Arc::new(predicate)),
            ..Self::default()
        }
    }

    /// An output that logs each message at info level and keeps nothing
    pub fn echo_only() -> Self {
        Self {
            echo_only: true,
            ..Self::default()
        }
    }

    /// Everything accepted so far, in write order
    pub fn messages(&self) -> Vec<SentMessage> {
        self.lock().clone()
    }

    /// Raw bytes of everything accepted so far
    pub fn bytes(&self) -> Vec<Vec<u8>> {
        self.lock().iter().map(|m| m.bytes.clone()).collect()
    }

    /// Number of accepted messages
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SentMessage>> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for MemoryOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryOutput")
            .field("messages", &self.len())
            .field("failing", &self.fail_when.is_some())
            .field("echo_only", &self.echo_only)
            .finish()
    }
}

impl MidiOutput for MemoryOutput {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        if let Some(fail) = &self.fail_when {
            if fail(message) {
                return Err(anyhow!("transport rejected message {:02X?}", message));
            }
        }

        if self.echo_only {
            info!(midi = ?ChannelMessage::parse(message), "dry-run output");
            return Ok(());
        }
        self.lock().push(SentMessage {
            bytes: message.to_vec(),
            at: Instant::now(),
        });
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
