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

//! Keystroke recording and humanized replay
//!
//! A recording is a list of [`RecordedEvent`]s. [`SequencePlanner`] turns it
//! into timed actions, [`PlaybackEngine`] waits and sends them through a
//! [`KeySender`] until the run completes or its token is cancelled.

pub mod config;
pub mod error;
pub mod hotkey;
pub mod injector;
pub mod keys;
pub mod label;
pub mod native;
pub mod planner;
pub mod playback;
pub mod random;
pub mod recorder;
pub mod recording;
pub mod session;
pub mod types;

pub use error::{InjectionError, PlaybackError, RecordingError, SettingsError};
pub use injector::{KeyInjector, KeySender, NativeKeyboard};
pub use keys::Key;
pub use planner::SequencePlanner;
pub use playback::{PlaybackEngine, PlaybackOutcome};
pub use types::{KeyPlaybackAction, Modifier, Modifiers, PlaybackSettings, RecordedEvent};
