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

//! Core types for keystroke recording and playback

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;
use std::time::Duration;

use crate::error::{EditError, SettingsError};
use crate::keys::Key;
use crate::label;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Control,
    Shift,
    Alt,
    Meta,
}

impl Modifier {
    // Canonical order used for labels, documents and chord presses
    pub const ORDER: [Modifier; 4] = [
        Modifier::Control,
        Modifier::Shift,
        Modifier::Alt,
        Modifier::Meta,
    ];

    fn bit(self) -> u8 {
        match self {
            Modifier::Control => 0b0001,
            Modifier::Shift => 0b0010,
            Modifier::Alt => 0b0100,
            Modifier::Meta => 0b1000,
        }
    }

    /// Left-hand key pressed when this modifier is part of a chord.
    pub fn key(self) -> Key {
        match self {
            Modifier::Control => Key::LeftCtrl,
            Modifier::Shift => Key::LeftShift,
            Modifier::Alt => Key::LeftAlt,
            Modifier::Meta => Key::LWin,
        }
    }
}

/// Set of held modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const CONTROL: Modifiers = Modifiers(0b0001);
    pub const SHIFT: Modifiers = Modifiers(0b0010);
    pub const ALT: Modifiers = Modifiers(0b0100);
    pub const META: Modifiers = Modifiers(0b1000);

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, modifier: Modifier) -> bool {
        self.0 & modifier.bit() != 0
    }

    pub fn insert(&mut self, modifier: Modifier) {
        self.0 |= modifier.bit();
    }

    pub fn without(self, modifier: Modifier) -> Modifiers {
        Modifiers(self.0 & !modifier.bit())
    }

    pub fn iter(self) -> impl Iterator<Item = Modifier> {
        Modifier::ORDER.into_iter().filter(move |m| self.contains(*m))
    }
}

impl From<Modifier> for Modifiers {
    fn from(modifier: Modifier) -> Self {
        Modifiers(modifier.bit())
    }
}

impl FromIterator<Modifier> for Modifiers {
    fn from_iter<I: IntoIterator<Item = Modifier>>(iter: I) -> Self {
        let mut modifiers = Modifiers::NONE;
        for modifier in iter {
            modifiers.insert(modifier);
        }
        modifiers
    }
}

impl BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}

/// A key press captured during recording.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub key: Key,
    pub delay_since_previous: Duration,
    pub modifiers: Modifiers,
    pub character: Option<char>,
    pub comment: Option<String>,
}

impl RecordedEvent {
    pub fn new(key: Key, delay_since_previous: Duration) -> Self {
        Self {
            key,
            delay_since_previous,
            modifiers: Modifiers::NONE,
            character: None,
            comment: None,
        }
    }

    /// First event of a recording, which never waits.
    pub fn first(key: Key) -> Self {
        Self::new(key, Duration::ZERO)
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_character(mut self, character: char) -> Self {
        self.character = Some(character);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        let comment = comment.into();
        self.comment = if comment.trim().is_empty() {
            None
        } else {
            Some(comment)
        };
        self
    }

    pub fn delay_millis(&self) -> f64 {
        self.delay_since_previous.as_secs_f64() * 1000.0
    }

    /// Replace the delay, rejecting values a recorder could never produce.
    pub fn set_delay_millis(&mut self, millis: i64) -> Result<(), EditError> {
        let millis = u64::try_from(millis).map_err(|_| EditError::NegativeDelay(millis))?;
        self.delay_since_previous = Duration::from_millis(millis);
        Ok(())
    }

    /// Replace key, modifiers and character from an inline label such as
    /// `Ctrl+Shift+A ("A")`. The event is untouched when the label is invalid.
    pub fn apply_label(&mut self, text: &str) -> Result<(), EditError> {
        let parsed = label::parse(text)?;
        self.key = parsed.key;
        self.modifiers = parsed.modifiers;
        // A label without a literal keeps the character captured at record time
        if parsed.character.is_some() {
            self.character = parsed.character;
        }
        Ok(())
    }

    pub fn label(&self) -> String {
        label::format(self.key, self.modifiers, self.character)
    }
}

impl fmt::Display for RecordedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} after {}ms", self.label(), self.delay_since_previous.as_millis())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaybackSettings {
    // Shuffle event order before computing delays
    pub randomize_order: bool,
    // Scales every recorded delay
    pub speed_multiplier: f64,
    // Symmetric random offset bound, in milliseconds
    pub variance_milliseconds: f64,
    pub enable_variance_jitter: bool,
    // Perturbation of the variance bound itself, as a percentage
    pub variance_jitter_percent: f64,
    // Floor applied after scaling and variance
    pub minimum_delay_milliseconds: f64,
    pub loop_playback: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            randomize_order: false,
            speed_multiplier: 1.0,
            variance_milliseconds: 0.0,
            enable_variance_jitter: false,
            variance_jitter_percent: 0.0,
            minimum_delay_milliseconds: 5.0,
            loop_playback: true,
        }
    }
}

impl PlaybackSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.speed_multiplier.is_finite() && self.speed_multiplier > 0.0) {
            return Err(SettingsError::SpeedMultiplier(self.speed_multiplier));
        }
        if !(self.variance_milliseconds.is_finite() && self.variance_milliseconds >= 0.0) {
            return Err(SettingsError::VarianceMilliseconds(
                self.variance_milliseconds,
            ));
        }
        if !(self.variance_jitter_percent.is_finite() && self.variance_jitter_percent >= 0.0) {
            return Err(SettingsError::VarianceJitterPercent(
                self.variance_jitter_percent,
            ));
        }
        if !(self.minimum_delay_milliseconds.is_finite()
            && self.minimum_delay_milliseconds >= 0.0)
        {
            return Err(SettingsError::MinimumDelayMilliseconds(
                self.minimum_delay_milliseconds,
            ));
        }
        Ok(())
    }
}

/// One planned keypress and the wait that precedes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPlaybackAction {
    pub key: Key,
    pub modifiers: Modifiers,
    pub character: Option<char>,
    pub delay_before_millis: u64,
}

impl KeyPlaybackAction {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_before_millis)
    }
}
