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

//! Inline key label parser
//!
//! Labels have the format:
//! - `Mod+Mod+Key`, modifiers optional and case-insensitive
//! - an optional character literal: `Shift+A ("A")`

use nom::{
    IResult, Parser,
    bytes::complete::{tag, take_while1},
    character::complete::{anychar, char, space0},
    combinator::all_consuming,
    multi::separated_list1,
    sequence::{delimited, preceded},
};

use crate::error::LabelError;
use crate::keys::Key;
use crate::types::{Modifier, Modifiers};

const LITERAL_OPEN: &str = "(\"";
const LITERAL_CLOSE: &str = "\")";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLabel {
    pub key: Key,
    pub modifiers: Modifiers,
    pub character: Option<char>,
}

pub fn format(key: Key, modifiers: Modifiers, character: Option<char>) -> String {
    let mut label = String::new();
    for modifier in modifiers.iter() {
        label.push_str(modifier_label(modifier));
        label.push('+');
    }
    label.push_str(key.name());

    if let Some(c) = character {
        label.push_str(" (\"");
        label.push(c);
        label.push_str("\")");
    }

    label
}

fn modifier_label(modifier: Modifier) -> &'static str {
    match modifier {
        Modifier::Control => "Ctrl",
        Modifier::Shift => "Shift",
        Modifier::Alt => "Alt",
        Modifier::Meta => "Win",
    }
}

pub fn lookup_modifier(name: &str) -> Option<Modifier> {
    match name.to_ascii_lowercase().as_str() {
        "control" | "ctrl" => Some(Modifier::Control),
        "shift" => Some(Modifier::Shift),
        "alt" => Some(Modifier::Alt),
        "win" | "windows" | "meta" => Some(Modifier::Meta),
        _ => None,
    }
}

fn parse_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

fn parse_separator(input: &str) -> IResult<&str, char> {
    delimited(space0, char('+'), space0).parse(input)
}

fn parse_chord(input: &str) -> IResult<&str, Vec<&str>> {
    all_consuming(delimited(
        space0,
        separated_list1(parse_separator, parse_name),
        space0,
    ))
    .parse(input)
}

fn parse_literal(input: &str) -> IResult<&str, char> {
    let (input, c) = preceded(tag(LITERAL_OPEN), anychar).parse(input)?;
    let (input, _) = tag(LITERAL_CLOSE)(input)?;
    Ok((input, c))
}

pub fn parse(input: &str) -> Result<ParsedLabel, LabelError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(LabelError::Empty);
    }

    let (chord, character) = match trimmed.find(LITERAL_OPEN) {
        Some(marker) => {
            let literal = &trimmed[marker..];
            if !literal[LITERAL_OPEN.len()..].contains(LITERAL_CLOSE) {
                return Err(LabelError::UnterminatedLiteral);
            }
            let (rest, c) = parse_literal(literal).map_err(|_| LabelError::LiteralLength)?;
            if !rest.trim().is_empty() {
                return Err(LabelError::TrailingText);
            }
            (&trimmed[..marker], Some(c))
        }
        None => (trimmed, None),
    };

    if chord.trim().is_empty() {
        return Err(LabelError::MissingKey);
    }

    let (_, names) =
        parse_chord(chord).map_err(|_| LabelError::UnknownKey(chord.trim().to_string()))?;
    let Some((key_name, modifier_names)) = names.split_last() else {
        return Err(LabelError::MissingKey);
    };

    let mut modifiers = Modifiers::NONE;
    for name in modifier_names {
        let modifier =
            lookup_modifier(name).ok_or_else(|| LabelError::UnknownModifier(name.to_string()))?;
        modifiers.insert(modifier);
    }

    let key: Key = key_name
        .parse()
        .map_err(|_| LabelError::UnknownKey(key_name.to_string()))?;
    if key == Key::None {
        return Err(LabelError::NoSpecificKey);
    }

    Ok(ParsedLabel {
        key,
        modifiers,
        character,
    })
}
