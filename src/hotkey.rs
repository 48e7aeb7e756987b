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

//! Playback toggle hotkey decisions

/// State and actions the hotkey drives.
pub trait HotkeyTarget {
    fn is_recording(&self) -> bool;
    fn is_playing(&self) -> bool;
    fn recorded_count(&self) -> usize;

    fn stop_recording(&mut self);
    fn start_playback(&mut self);
    fn cancel_playback(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyResult {
    StartedPlayback,
    CancelledPlayback,
    NoRecordingAvailable,
}

/// Priority order: recording, then playing, then empty, then idle with data.
pub fn handle_trigger(target: &mut impl HotkeyTarget) -> HotkeyResult {
    // Recording always yields, then the trigger is evaluated as usual
    if target.is_recording() {
        target.stop_recording();
    }

    if target.is_playing() {
        target.cancel_playback();
        return HotkeyResult::CancelledPlayback;
    }

    if target.recorded_count() == 0 {
        return HotkeyResult::NoRecordingAvailable;
    }

    target.start_playback();
    HotkeyResult::StartedPlayback
}
