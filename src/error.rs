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

//! Error types for planning, injection, playback and recording files

use std::fmt;
use thiserror::Error;

/// Invalid playback settings, one variant per field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("speed multiplier must be positive (got {0})")]
    SpeedMultiplier(f64),

    #[error("variance must be non-negative (got {0})")]
    VarianceMilliseconds(f64),

    #[error("jitter percent must be non-negative (got {0})")]
    VarianceJitterPercent(f64),

    #[error("minimum delay must be non-negative (got {0})")]
    MinimumDelayMilliseconds(f64),
}

/// Inline key label rejected by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("Enter a key name.")]
    Empty,

    #[error("Character literal must end with \")\".")]
    UnterminatedLiteral,

    #[error("Character literal must contain exactly one character.")]
    LiteralLength,

    #[error("Remove extra text after the character literal.")]
    TrailingText,

    #[error("Enter the name of the key to send.")]
    MissingKey,

    #[error("Unknown modifier '{0}'.")]
    UnknownModifier(String),

    #[error("Unknown key '{0}'.")]
    UnknownKey(String),

    #[error("Key name must resolve to a specific key.")]
    NoSpecificKey,
}

/// A rejected in-place edit of a recorded event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("delay cannot be negative (got {0}ms)")]
    NegativeDelay(i64),

    #[error(transparent)]
    Label(#[from] LabelError),
}

/// Failure reported by a single native keyboard call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NativeKeyError {
    /// The call itself reported the event as structurally invalid.
    #[error("SendInput failed with error code {code} ({detail})")]
    ParameterRejected { code: u32, detail: String },

    #[error("{0}")]
    Unavailable(String),
}

impl NativeKeyError {
    pub fn is_parameter_rejected(&self) -> bool {
        matches!(self, NativeKeyError::ParameterRejected { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Unicode,
    ScanCode,
    VirtualKey,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Unicode => "Unicode",
            Strategy::ScanCode => "ScanCode",
            Strategy::VirtualKey => "VirtualKey",
        };
        f.write_str(name)
    }
}

/// One failed delivery attempt, kept for the aggregated failure message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyFailure {
    pub strategy: Strategy,
    pub error: NativeKeyError,
}

impl fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InjectionError {
    /// Non-recoverable platform failure; no further strategy was tried.
    #[error("{0}")]
    Fatal(StrategyFailure),

    /// Every strategy was rejected.
    #[error(
        "SendInput failed for virtual key {virtual_key} using all strategies. Details: INPUT.cbSize={input_size}{}",
        render_failures(.failures)
    )]
    Exhausted {
        virtual_key: u16,
        input_size: usize,
        failures: Vec<StrategyFailure>,
    },

    /// No scan code mapping exists and every strategy that was tried was rejected.
    #[error(
        "Failed to map virtual key {virtual_key} to a scan code and the remaining strategies failed. Details: INPUT.cbSize={input_size}{}",
        render_failures(.failures)
    )]
    Unmapped {
        virtual_key: u16,
        input_size: usize,
        failures: Vec<StrategyFailure>,
    },

    /// A chord modifier could not be pressed or released.
    #[error("failed to toggle modifier key {virtual_key}: {source}")]
    Modifier {
        virtual_key: u16,
        source: NativeKeyError,
    },
}

fn render_failures(failures: &[StrategyFailure]) -> String {
    failures.iter().map(|failure| format!(" | {failure}")).collect()
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("invalid playback settings: {0}")]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Injection(#[from] InjectionError),
}

#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("Recording file is empty.")]
    Empty,

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Unsupported recording version: {0}.")]
    UnsupportedVersion(i64),

    #[error("Recording file contains no entries.")]
    NoEntries,

    #[error("Entry {entry} is missing a key.")]
    MissingKey { entry: usize },

    #[error("Entry {entry} has unknown key '{key}'.")]
    UnknownKey { entry: usize, key: String },

    #[error("Entry {entry} has a negative delay.")]
    NegativeDelay { entry: usize },

    #[error("Entry {entry}: {message}")]
    Modifier { entry: usize, message: String },

    #[error("Entry {entry} has an invalid character literal.")]
    InvalidCharacter { entry: usize },
}
