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

//! Recording documents
//!
//! ```json
//! {
//!   "version": 1,
//!   "entries": [
//!     { "key": "A", "modifiers": ["Shift"], "delayMilliseconds": 120, "character": "A" }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::RecordingError;
use crate::keys::Key;
use crate::types::{Modifier, Modifiers, RecordedEvent};

pub const CURRENT_VERSION: i64 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordingDocument {
    #[serde(default)]
    version: i64,
    #[serde(default)]
    entries: Option<Vec<RecordingEntry>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordingEntry {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    modifiers: Option<Vec<String>>,
    #[serde(default)]
    delay_milliseconds: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    character: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
}

fn modifier_name(modifier: Modifier) -> &'static str {
    match modifier {
        Modifier::Control => "Control",
        Modifier::Shift => "Shift",
        Modifier::Alt => "Alt",
        Modifier::Meta => "Windows",
    }
}

fn parse_modifiers(values: Option<Vec<String>>) -> Result<Modifiers, String> {
    let mut modifiers = Modifiers::NONE;
    for value in values.unwrap_or_default() {
        let modifier = match value.trim() {
            "" => return Err("Modifier name cannot be blank.".to_string()),
            "Control" | "Ctrl" => Modifier::Control,
            "Shift" => Modifier::Shift,
            "Alt" => Modifier::Alt,
            "Windows" | "Win" | "Meta" => Modifier::Meta,
            _ => return Err(format!("Unknown modifier '{value}'.")),
        };
        modifiers.insert(modifier);
    }
    Ok(modifiers)
}

fn non_blank(comment: Option<&str>) -> Option<String> {
    comment
        .filter(|c| !c.trim().is_empty())
        .map(str::to_string)
}

pub fn serialize(events: &[RecordedEvent]) -> Result<String, RecordingError> {
    let document = RecordingDocument {
        version: CURRENT_VERSION,
        entries: Some(
            events
                .iter()
                .map(|event| RecordingEntry {
                    key: Some(event.key.name().to_string()),
                    modifiers: Some(
                        event
                            .modifiers
                            .iter()
                            .map(|m| modifier_name(m).to_string())
                            .collect(),
                    ),
                    delay_milliseconds: event.delay_millis().round() as i64,
                    character: event.character.map(String::from),
                    comment: non_blank(event.comment.as_deref()),
                })
                .collect(),
        ),
    };

    Ok(serde_json::to_string_pretty(&document)?)
}

pub fn deserialize(json: &str) -> Result<Vec<RecordedEvent>, RecordingError> {
    if json.trim().is_empty() {
        return Err(RecordingError::Empty);
    }

    let document: Option<RecordingDocument> = serde_json::from_str(json)?;
    let document = document.ok_or(RecordingError::Empty)?;

    if document.version != CURRENT_VERSION {
        return Err(RecordingError::UnsupportedVersion(document.version));
    }

    let entries = document
        .entries
        .filter(|entries| !entries.is_empty())
        .ok_or(RecordingError::NoEntries)?;

    let mut events = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let number = index + 1;

        let name = entry
            .key
            .filter(|key| !key.trim().is_empty())
            .ok_or(RecordingError::MissingKey { entry: number })?;
        let key: Key = name.parse().map_err(|_| RecordingError::UnknownKey {
            entry: number,
            key: name.clone(),
        })?;

        let delay = u64::try_from(entry.delay_milliseconds)
            .map_err(|_| RecordingError::NegativeDelay { entry: number })?;

        let modifiers = parse_modifiers(entry.modifiers).map_err(|message| {
            RecordingError::Modifier {
                entry: number,
                message,
            }
        })?;

        let character = match entry.character.as_deref() {
            None | Some("") => None,
            Some(text) => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(c),
                    _ => return Err(RecordingError::InvalidCharacter { entry: number }),
                }
            }
        };

        events.push(RecordedEvent {
            key,
            delay_since_previous: Duration::from_millis(delay),
            modifiers,
            character,
            comment: non_blank(entry.comment.as_deref()),
        });
    }

    Ok(events)
}
