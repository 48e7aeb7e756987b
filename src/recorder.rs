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

//! Terminal keystroke recorder
//!
//! Captures key presses in raw mode and measures the delay between them

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io::{IsTerminal, Write};
use std::time::Instant;
use tracing::{debug, warn};

use crate::keys::Key;
use crate::types::{Modifier, Modifiers, RecordedEvent};

// RAII guard for terminal raw mode - only enables if stdin is a TTY
pub struct RawModeGuard {
    enabled: bool,
}

impl RawModeGuard {
    pub fn new() -> Result<Self> {
        let enabled = if std::io::stdin().is_terminal() {
            enable_raw_mode().context("Failed to enable raw mode")?;
            true
        } else {
            false
        };
        Ok(RawModeGuard { enabled })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.enabled {
            let _ = disable_raw_mode();
        }
    }
}

/// A captured key press, before timing is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Captured {
    pub key: Key,
    pub modifiers: Modifiers,
    pub character: Option<char>,
}

fn char_key(c: char) -> Option<(Key, bool)> {
    // (key, needs shift) on a US layout
    let mapped = match c {
        'a'..='z' | '0'..='9' => {
            return Some((c.to_ascii_uppercase().to_string().parse().ok()?, false));
        }
        'A'..='Z' => return Some((c.to_string().parse().ok()?, true)),
        ' ' => (Key::Space, false),
        '!' => (Key::D1, true),
        '@' => (Key::D2, true),
        '#' => (Key::D3, true),
        '$' => (Key::D4, true),
        '%' => (Key::D5, true),
        '^' => (Key::D6, true),
        '&' => (Key::D7, true),
        '*' => (Key::D8, true),
        '(' => (Key::D9, true),
        ')' => (Key::D0, true),
        ';' => (Key::OemSemicolon, false),
        ':' => (Key::OemSemicolon, true),
        '=' => (Key::OemPlus, false),
        '+' => (Key::OemPlus, true),
        ',' => (Key::OemComma, false),
        '<' => (Key::OemComma, true),
        '-' => (Key::OemMinus, false),
        '_' => (Key::OemMinus, true),
        '.' => (Key::OemPeriod, false),
        '>' => (Key::OemPeriod, true),
        '/' => (Key::OemQuestion, false),
        '?' => (Key::OemQuestion, true),
        '`' => (Key::OemTilde, false),
        '~' => (Key::OemTilde, true),
        '[' => (Key::OemOpenBrackets, false),
        '{' => (Key::OemOpenBrackets, true),
        '\\' => (Key::OemPipe, false),
        '|' => (Key::OemPipe, true),
        ']' => (Key::OemCloseBrackets, false),
        '}' => (Key::OemCloseBrackets, true),
        '\'' => (Key::OemQuotes, false),
        '"' => (Key::OemQuotes, true),
        _ => return None,
    };
    Some(mapped)
}

pub fn capture(event: &KeyEvent) -> Option<Captured> {
    let mut modifiers = Modifiers::NONE;
    if event.modifiers.contains(KeyModifiers::CONTROL) {
        modifiers.insert(Modifier::Control);
    }
    if event.modifiers.contains(KeyModifiers::SHIFT) {
        modifiers.insert(Modifier::Shift);
    }
    if event.modifiers.contains(KeyModifiers::ALT) {
        modifiers.insert(Modifier::Alt);
    }
    if event.modifiers.intersects(KeyModifiers::SUPER | KeyModifiers::META) {
        modifiers.insert(Modifier::Meta);
    }

    let key = match event.code {
        KeyCode::Char(c) => {
            let chord = !modifiers.without(Modifier::Shift).is_empty();
            // Characters with no key on the layout cannot be replayed
            let (key, shifted) = char_key(c)?;
            if shifted {
                modifiers.insert(Modifier::Shift);
            }
            return Some(Captured {
                key,
                modifiers,
                // Chords are replayed by key, not by literal
                character: (!chord).then_some(c),
            });
        }
        KeyCode::Enter => Key::Return,
        KeyCode::Tab | KeyCode::BackTab => Key::Tab,
        KeyCode::Backspace => Key::Back,
        KeyCode::Esc => Key::Escape,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::Insert => Key::Insert,
        KeyCode::Delete => Key::Delete,
        KeyCode::F(n) => Key::from_f_number(n)?,
        KeyCode::CapsLock => Key::CapsLock,
        KeyCode::ScrollLock => Key::Scroll,
        KeyCode::NumLock => Key::NumLock,
        KeyCode::PrintScreen => Key::PrintScreen,
        KeyCode::Pause => Key::Pause,
        KeyCode::Menu => Key::Apps,
        _ => return None,
    };

    if event.code == KeyCode::BackTab {
        modifiers.insert(Modifier::Shift);
    }

    Some(Captured {
        key,
        modifiers,
        character: None,
    })
}

/// Accumulates captured keys, timing each against the previous one.
#[derive(Debug, Default)]
pub struct Recorder {
    events: Vec<RecordedEvent>,
    last: Option<Instant>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continues from an existing recording. The next key is timed from zero.
    pub fn from_events(events: Vec<RecordedEvent>) -> Self {
        Self { events, last: None }
    }

    pub fn push(&mut self, captured: Captured, at: Instant) -> &RecordedEvent {
        // First key never waits
        let delay = self
            .last
            .map(|last| at.saturating_duration_since(last))
            .unwrap_or_default();
        self.last = Some(at);

        let mut event = RecordedEvent::new(captured.key, delay).with_modifiers(captured.modifiers);
        event.character = captured.character;
        self.events.push(event);
        &self.events[self.events.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.last = None;
    }

    pub fn into_events(self) -> Vec<RecordedEvent> {
        self.events
    }
}

/// Writes a status line that survives raw mode.
pub fn status(message: &str) {
    let mut stderr = std::io::stderr();
    let _ = write!(stderr, "{message}\r\n");
    let _ = stderr.flush();
}

/// Records key presses from the terminal until `Esc`.
pub fn record_terminal() -> Result<Vec<RecordedEvent>> {
    let _raw_mode = RawModeGuard::new()?;
    let mut recorder = Recorder::new();
    status("Recording... press Esc to stop.");

    loop {
        let Event::Key(key_event) = event::read().context("Failed to read terminal event")? else {
            continue;
        };
        if key_event.kind != KeyEventKind::Press {
            continue;
        }
        if key_event.code == KeyCode::Esc {
            break;
        }

        match capture(&key_event) {
            Some(captured) => {
                let recorded = recorder.push(captured, Instant::now());
                status(&format!(
                    "Captured: {}. Total {} keys.",
                    recorded.label(),
                    recorder.len()
                ));
            }
            None => warn!(code = ?key_event.code, "ignoring key with no mapping"),
        }
    }

    debug!(count = recorder.len(), "recording finished");
    Ok(recorder.into_events())
}
