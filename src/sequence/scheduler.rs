// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Timed batch playback.
//!
//! Every event in a batch gets its own task. Each task waits for its start
//! offset from the shared epoch, sends Note On, waits for its duration, then
//! sends Note Off with velocity 0. Tasks only suspend on those two timers, so
//! overlapping notes run side by side while the sink keeps writes whole.

use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinSet;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use super::{EventOutcome, MidiEvent, OutcomePhase, SequenceReport};
use crate::error::Result;
use crate::midi::{ChannelMessage, OutputSink};

/// Plays validated batches against the shared output
#[derive(Clone)]
pub struct Scheduler {
    sink: OutputSink,
}

impl Scheduler {
    pub fn new(sink: OutputSink) -> Self {
        Self { sink }
    }

    /// Play every event and wait for all of them to finish.
    ///
    /// The report's status is "success" even when individual events failed;
    /// failures show up as `error` entries in `results`.
    pub async fn run(&self, events: Vec<MidiEvent>) -> SequenceReport {
        let count = events.len();
        let sequence_start = Instant::now();
        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();
        let mut tasks = JoinSet::new();

        for (index, event) in events.into_iter().enumerate() {
            let unit = EventUnit {
                sink: self.sink.clone(),
                event,
                index,
                outcomes: outcome_tx.clone(),
            };
            tasks.spawn(unit.play(sequence_start));
        }
        drop(outcome_tx);

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Sequence event task ended abnormally: {}", e);
            }
        }

        let mut results = Vec::with_capacity(count * 2);
        while let Ok(outcome) = outcome_rx.try_recv() {
            results.push(outcome);
        }

        let report = SequenceReport {
            status: "success".to_string(),
            message: format!("Successfully processed {} events.", count),
            results,
        };
        info!(
            events = count,
            failed = report.failed_events(),
            elapsed_ms = sequence_start.elapsed().as_millis() as u64,
            "Sequence finished"
        );
        report
    }
}

/// One event's lifecycle
struct EventUnit {
    sink: OutputSink,
    event: MidiEvent,
    index: usize,
    outcomes: UnboundedSender<EventOutcome>,
}

impl EventUnit {
    async fn play(self, sequence_start: Instant) {
        let elapsed = sequence_start.elapsed();
        if self.event.start_time > elapsed {
            sleep(self.event.start_time - elapsed).await;
        }

        if let Err(e) = self.note_lifecycle().await {
            let message = format!("Event {}: Error processing event: {}", self.index, e);
            warn!("{}", message);
            self.record(OutcomePhase::Error, message);
        }
    }

    async fn note_lifecycle(&self) -> Result<()> {
        let MidiEvent {
            note,
            velocity,
            channel,
            duration,
            ..
        } = self.event;

        self.sink
            .send(&ChannelMessage::NoteOn { channel, note, velocity }.to_bytes())?;
        let message = format!("Sent Note On: ch={}, note={}, vel={}", channel, note, velocity);
        debug!(event = self.index, "{}", message);
        self.record(OutcomePhase::NoteOnSent, message);

        if !duration.is_zero() {
            sleep(duration).await;
        }

        self.sink
            .send(&ChannelMessage::NoteOff { channel, note, velocity: 0 }.to_bytes())?;
        let message = format!("Sent Note Off: ch={}, note={}", channel, note);
        debug!(event = self.index, "{}", message);
        self.record(OutcomePhase::NoteOffSent, message);

        Ok(())
    }

    fn record(&self, phase: OutcomePhase, message: String) {
        // The receiver lives until every unit has been joined
        let _ = self.outcomes.send(EventOutcome {
            event_index: self.index,
            phase,
            message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::{MemoryOutput, SentMessage};
    use std::time::Duration;

    fn scheduler_with(output: &MemoryOutput) -> Scheduler {
        Scheduler::new(OutputSink::new(output.clone()))
    }

    fn find(messages: &[SentMessage], status: u8, note: u8) -> &SentMessage {
        messages
            .iter()
            .find(|m| m.bytes[0] & 0xF0 == status && m.bytes[1] == note)
            .expect("message not sent")
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_batch() {
        let output = MemoryOutput::new();
        let report = scheduler_with(&output).run(Vec::new()).await;

        assert_eq!(report.status, "success");
        assert_eq!(report.message, "Successfully processed 0 events.");
        assert!(report.results.is_empty());
        assert!(output.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_event_lifecycle() {
        let output = MemoryOutput::new();
        let event = MidiEvent::new(60, Duration::from_millis(250))
            .on_channel(3)
            .with_velocity(90);

        let report = scheduler_with(&output).run(vec![event]).await;

        assert_eq!(output.bytes(), vec![vec![0x93, 60, 90], vec![0x83, 60, 0]]);
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results[0].phase, OutcomePhase::NoteOnSent);
        assert_eq!(report.results[0].message, "Sent Note On: ch=3, note=60, vel=90");
        assert_eq!(report.results[1].phase, OutcomePhase::NoteOffSent);
        assert_eq!(report.results[1].message, "Sent Note Off: ch=3, note=60");

        let messages = output.messages();
        assert!(messages[1].at - messages[0].at >= Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_simultaneous_notes_interleave() {
        let output = MemoryOutput::new();
        let events = vec![
            MidiEvent::new(60, Duration::from_millis(50)),
            MidiEvent::new(64, Duration::from_millis(50)),
        ];

        let report = scheduler_with(&output).run(events).await;
        assert_eq!(report.results.len(), 4);

        let kinds: Vec<u8> = output.bytes().iter().map(|b| b[0] & 0xF0).collect();
        assert_eq!(kinds, vec![0x90, 0x90, 0x80, 0x80]);

        let messages = output.messages();
        for note in [60, 64] {
            let on = find(&messages, 0x90, note);
            let off = find(&messages, 0x80, note);
            assert!(off.at - on.at >= Duration::from_millis(50));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_offsets_respected() {
        let output = MemoryOutput::new();
        let epoch = Instant::now();
        let events = vec![
            MidiEvent::new(72, Duration::from_millis(10)).starting_at(Duration::from_millis(300)),
            MidiEvent::new(60, Duration::from_millis(10)),
        ];

        scheduler_with(&output).run(events).await;

        let messages = output.messages();
        let early = find(&messages, 0x90, 60).at - epoch;
        let late = find(&messages, 0x90, 72).at - epoch;
        assert!(early < Duration::from_millis(20));
        assert!(late >= Duration::from_millis(300));
        assert!(late < Duration::from_millis(320));
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_note_does_not_delay_later_start() {
        let output = MemoryOutput::new();
        let epoch = Instant::now();
        let events = vec![
            MidiEvent::new(48, Duration::from_secs(2)),
            MidiEvent::new(67, Duration::from_millis(100)).starting_at(Duration::from_millis(500)),
        ];

        scheduler_with(&output).run(events).await;

        let messages = output.messages();
        let second_on = find(&messages, 0x90, 67).at - epoch;
        let first_off = find(&messages, 0x80, 48).at - epoch;
        assert!(second_on < Duration::from_millis(520));
        assert!(second_on < first_off);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_sends_both() {
        let output = MemoryOutput::new();
        let report = scheduler_with(&output)
            .run(vec![MidiEvent::new(60, Duration::ZERO)])
            .await;

        assert_eq!(report.results.len(), 2);
        let messages = output.messages();
        assert_eq!(messages[0].at, messages[1].at);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_isolated_to_event() {
        // Reject anything for note 61
        let output = MemoryOutput::failing_when(|bytes| bytes.get(1) == Some(&61));
        let events = vec![
            MidiEvent::new(60, Duration::from_millis(10)),
            MidiEvent::new(61, Duration::from_millis(10)),
            MidiEvent::new(62, Duration::from_millis(10)),
        ];

        let report = scheduler_with(&output).run(events).await;

        assert_eq!(report.status, "success");
        assert_eq!(report.results.len(), 5);
        assert_eq!(report.failed_events(), 1);

        let failed = report.outcomes_for(1);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].phase, OutcomePhase::Error);
        assert!(failed[0].message.starts_with("Event 1: Error processing event:"));

        for index in [0, 2] {
            let phases: Vec<_> = report.outcomes_for(index).iter().map(|o| o.phase).collect();
            assert_eq!(phases, vec![OutcomePhase::NoteOnSent, OutcomePhase::NoteOffSent]);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_note_off_failure_after_note_on() {
        let output = MemoryOutput::failing_when(|bytes| bytes[0] & 0xF0 == 0x80);
        let report = scheduler_with(&output)
            .run(vec![MidiEvent::new(60, Duration::from_millis(10))])
            .await;

        let phases: Vec<_> = report.results.iter().map(|o| o.phase).collect();
        assert_eq!(phases, vec![OutcomePhase::NoteOnSent, OutcomePhase::Error]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_sink_reports_errors() {
        let output = MemoryOutput::new();
        let sink = OutputSink::new(output.clone());
        sink.close();

        let report = Scheduler::new(sink)
            .run(vec![
                MidiEvent::new(60, Duration::from_millis(10)),
                MidiEvent::new(62, Duration::from_millis(10)),
            ])
            .await;

        assert_eq!(report.failed_events(), 2);
        assert!(report.results.iter().all(|o| o.message.contains("closed")));
        assert!(output.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeat_runs_have_same_shape() {
        let output = MemoryOutput::new();
        let scheduler = scheduler_with(&output);
        let events = vec![
            MidiEvent::new(60, Duration::from_millis(100)),
            MidiEvent::new(64, Duration::from_millis(50)).starting_at(Duration::from_millis(25)),
        ];

        let shape = |report: &SequenceReport| {
            let mut entries: Vec<_> = report
                .results
                .iter()
                .map(|o| (o.event_index, o.phase as u8))
                .collect();
            entries.sort();
            entries
        };

        let first = scheduler.run(events.clone()).await;
        let second = scheduler.run(events).await;
        assert_eq!(shape(&first), shape(&second));
        assert_eq!(first.message, second.message);
    }
}
