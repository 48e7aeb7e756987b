// Copyright (C) 2025  Tom Waddington
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Interactive record/playback session
//!
//! F8 toggles playback through the hotkey decision table, F9 starts a fresh
//! recording, Esc quits.

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::PlaybackOptions;
use crate::error::PlaybackError;
use crate::hotkey::{HotkeyResult, HotkeyTarget, handle_trigger};
use crate::playback::{PlaybackEngine, PlaybackOutcome};
use crate::recorder::{RawModeGuard, Recorder, capture, status};
use crate::types::{PlaybackSettings, RecordedEvent};

pub const TRIGGER: KeyCode = KeyCode::F(8);
pub const RECORD: KeyCode = KeyCode::F(9);

struct RunningPlayback {
    cancel: CancellationToken,
    handle: JoinHandle<Result<PlaybackOutcome, PlaybackError>>,
}

pub struct Session {
    recorder: Recorder,
    recording: bool,
    playback: Option<RunningPlayback>,
    settings: PlaybackSettings,
    options: PlaybackOptions,
}

impl Session {
    pub fn new(
        events: Vec<RecordedEvent>,
        settings: PlaybackSettings,
        options: PlaybackOptions,
    ) -> Self {
        Self {
            // Nothing loaded means straight into recording
            recording: events.is_empty(),
            recorder: Recorder::from_events(events),
            playback: None,
            settings,
            options,
        }
    }

    pub fn events(&self) -> &[RecordedEvent] {
        self.recorder.events()
    }

    fn start_recording(&mut self) {
        self.recorder.clear();
        self.recording = true;
        status("Recording... press F8 to stop and play, Esc to quit.");
    }

    fn handle_key(&mut self, key_event: &KeyEvent) {
        if !self.recording {
            return;
        }
        match capture(key_event) {
            Some(captured) => {
                let recorded = self.recorder.push(captured, Instant::now());
                status(&format!(
                    "Captured: {}. Total {} keys.",
                    recorded.label(),
                    self.recorder.len()
                ));
            }
            None => warn!(code = ?key_event.code, "ignoring key with no mapping"),
        }
    }

    async fn playback_finished(&mut self) -> Result<PlaybackOutcome> {
        let Some(running) = self.playback.as_mut() else {
            return std::future::pending().await;
        };
        let result = (&mut running.handle).await;
        self.playback = None;
        Ok(result.context("Playback task failed")??)
    }
}

impl HotkeyTarget for Session {
    fn is_recording(&self) -> bool {
        self.recording
    }

    fn is_playing(&self) -> bool {
        self.playback.is_some()
    }

    fn recorded_count(&self) -> usize {
        self.recorder.len()
    }

    fn stop_recording(&mut self) {
        self.recording = false;
        status(&format!("Recording stopped. {} keys captured.", self.recorder.len()));
    }

    fn start_playback(&mut self) {
        let events: Arc<[RecordedEvent]> = self.recorder.events().into();
        let settings = self.settings.clone();
        let sender = self.options.sender();
        let planner = self.options.planner();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut engine = PlaybackEngine::with_planner(sender, planner);
            engine.play(&events, &settings, &token).await
        });
        self.playback = Some(RunningPlayback { cancel, handle });
    }

    fn cancel_playback(&mut self) {
        if let Some(running) = &self.playback {
            running.cancel.cancel();
        }
    }
}

fn spawn_reader() -> mpsc::UnboundedReceiver<KeyEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        loop {
            match event::read() {
                Ok(Event::Key(key_event)) => {
                    if tx.send(key_event).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("terminal read failed: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

/// Runs the session until Esc and returns the final recording.
pub async fn run(
    events: Vec<RecordedEvent>,
    settings: PlaybackSettings,
    options: PlaybackOptions,
) -> Result<Vec<RecordedEvent>> {
    let _raw_mode = RawModeGuard::new()?;
    let mut keys = spawn_reader();
    let mut session = Session::new(events, settings, options);

    if session.recording {
        session.start_recording();
    } else {
        status(&format!(
            "Loaded {} keys. F8 plays or stops, F9 records again, Esc quits.",
            session.recorded_count()
        ));
    }

    loop {
        tokio::select! {
            key_event = keys.recv() => {
                let Some(key_event) = key_event else { break };
                if key_event.kind != KeyEventKind::Press {
                    continue;
                }
                match key_event.code {
                    TRIGGER => match handle_trigger(&mut session) {
                        HotkeyResult::StartedPlayback => status("Playback started. F8 stops it."),
                        HotkeyResult::CancelledPlayback => status("Stopping playback..."),
                        HotkeyResult::NoRecordingAvailable => status("Nothing recorded yet. F9 records."),
                    },
                    RECORD if !session.recording && !session.is_playing() => session.start_recording(),
                    KeyCode::Esc if !session.is_playing() => break,
                    KeyCode::Esc => session.cancel_playback(),
                    _ => session.handle_key(&key_event),
                }
            }
            outcome = session.playback_finished(), if session.is_playing() => {
                match outcome {
                    Ok(PlaybackOutcome::Completed { keys_sent }) => {
                        status(&format!("Playback finished after {keys_sent} keys."));
                    }
                    Ok(PlaybackOutcome::Cancelled { keys_sent }) => {
                        status(&format!("Playback cancelled after {keys_sent} keys."));
                    }
                    Err(e) => status(&format!("Playback failed: {e:#}")),
                }
            }
        }
    }

    info!(count = session.recorded_count(), "session closed");
    Ok(session.events().to_vec())
}
