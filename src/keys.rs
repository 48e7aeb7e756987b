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

//! Key identifiers and their platform virtual-key codes
//!
//! Names follow the ones written into recording files (`A`, `D1`, `Return`,
//! `LeftCtrl`, `OemComma`, ...), so documents stay readable and stable.

use std::fmt;
use std::str::FromStr;

macro_rules! define_keys {
    ($($variant:ident => $vk:expr),* $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Key {
            None,
            $($variant,)*
        }

        impl Key {
            /// Every key that maps to a virtual-key code.
            pub const ALL: &'static [Key] = &[$(Key::$variant,)*];

            pub fn name(self) -> &'static str {
                match self {
                    Key::None => "None",
                    $(Key::$variant => stringify!($variant),)*
                }
            }

            /// Windows virtual-key code, `None` for [`Key::None`].
            pub fn virtual_key(self) -> Option<u16> {
                match self {
                    Key::None => None,
                    $(Key::$variant => Some($vk),)*
                }
            }
        }
    };
}

define_keys! {
    Back => 0x08,
    Tab => 0x09,
    Clear => 0x0C,
    Return => 0x0D,
    Pause => 0x13,
    CapsLock => 0x14,
    Escape => 0x1B,
    Space => 0x20,
    PageUp => 0x21,
    PageDown => 0x22,
    End => 0x23,
    Home => 0x24,
    Left => 0x25,
    Up => 0x26,
    Right => 0x27,
    Down => 0x28,
    Select => 0x29,
    Print => 0x2A,
    Execute => 0x2B,
    PrintScreen => 0x2C,
    Insert => 0x2D,
    Delete => 0x2E,
    Help => 0x2F,
    D0 => 0x30,
    D1 => 0x31,
    D2 => 0x32,
    D3 => 0x33,
    D4 => 0x34,
    D5 => 0x35,
    D6 => 0x36,
    D7 => 0x37,
    D8 => 0x38,
    D9 => 0x39,
    A => 0x41,
    B => 0x42,
    C => 0x43,
    D => 0x44,
    E => 0x45,
    F => 0x46,
    G => 0x47,
    H => 0x48,
    I => 0x49,
    J => 0x4A,
    K => 0x4B,
    L => 0x4C,
    M => 0x4D,
    N => 0x4E,
    O => 0x4F,
    P => 0x50,
    Q => 0x51,
    R => 0x52,
    S => 0x53,
    T => 0x54,
    U => 0x55,
    V => 0x56,
    W => 0x57,
    X => 0x58,
    Y => 0x59,
    Z => 0x5A,
    LWin => 0x5B,
    RWin => 0x5C,
    Apps => 0x5D,
    Sleep => 0x5F,
    NumPad0 => 0x60,
    NumPad1 => 0x61,
    NumPad2 => 0x62,
    NumPad3 => 0x63,
    NumPad4 => 0x64,
    NumPad5 => 0x65,
    NumPad6 => 0x66,
    NumPad7 => 0x67,
    NumPad8 => 0x68,
    NumPad9 => 0x69,
    Multiply => 0x6A,
    Add => 0x6B,
    Separator => 0x6C,
    Subtract => 0x6D,
    Decimal => 0x6E,
    Divide => 0x6F,
    F1 => 0x70,
    F2 => 0x71,
    F3 => 0x72,
    F4 => 0x73,
    F5 => 0x74,
    F6 => 0x75,
    F7 => 0x76,
    F8 => 0x77,
    F9 => 0x78,
    F10 => 0x79,
    F11 => 0x7A,
    F12 => 0x7B,
    F13 => 0x7C,
    F14 => 0x7D,
    F15 => 0x7E,
    F16 => 0x7F,
    F17 => 0x80,
    F18 => 0x81,
    F19 => 0x82,
    F20 => 0x83,
    F21 => 0x84,
    F22 => 0x85,
    F23 => 0x86,
    F24 => 0x87,
    NumLock => 0x90,
    Scroll => 0x91,
    LeftShift => 0xA0,
    RightShift => 0xA1,
    LeftCtrl => 0xA2,
    RightCtrl => 0xA3,
    LeftAlt => 0xA4,
    RightAlt => 0xA5,
    BrowserBack => 0xA6,
    BrowserForward => 0xA7,
    BrowserRefresh => 0xA8,
    BrowserStop => 0xA9,
    BrowserSearch => 0xAA,
    BrowserFavorites => 0xAB,
    BrowserHome => 0xAC,
    VolumeMute => 0xAD,
    VolumeDown => 0xAE,
    VolumeUp => 0xAF,
    MediaNextTrack => 0xB0,
    MediaPreviousTrack => 0xB1,
    MediaStop => 0xB2,
    MediaPlayPause => 0xB3,
    LaunchMail => 0xB4,
    SelectMedia => 0xB5,
    OemSemicolon => 0xBA,
    OemPlus => 0xBB,
    OemComma => 0xBC,
    OemMinus => 0xBD,
    OemPeriod => 0xBE,
    OemQuestion => 0xBF,
    OemTilde => 0xC0,
    OemOpenBrackets => 0xDB,
    OemPipe => 0xDC,
    OemCloseBrackets => 0xDD,
    OemQuotes => 0xDE,
    Oem8 => 0xDF,
    OemBackslash => 0xE2,
}

impl Key {
    pub fn from_f_number(n: u8) -> Option<Key> {
        const F_KEYS: [Key; 24] = [
            Key::F1, Key::F2, Key::F3, Key::F4, Key::F5, Key::F6,
            Key::F7, Key::F8, Key::F9, Key::F10, Key::F11, Key::F12,
            Key::F13, Key::F14, Key::F15, Key::F16, Key::F17, Key::F18,
            Key::F19, Key::F20, Key::F21, Key::F22, Key::F23, Key::F24,
        ];
        F_KEYS.get(usize::from(n).checked_sub(1)?).copied()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown key '{0}'")]
pub struct UnknownKey(pub String);

impl FromStr for Key {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();

        let alias = match name.to_ascii_lowercase().as_str() {
            "none" => Some(Key::None),
            "enter" | "ret" => Some(Key::Return),
            "backspace" | "bs" => Some(Key::Back),
            "esc" => Some(Key::Escape),
            "ins" => Some(Key::Insert),
            "del" => Some(Key::Delete),
            "pgup" | "prior" => Some(Key::PageUp),
            "pgdn" | "next" => Some(Key::PageDown),
            "capital" => Some(Key::CapsLock),
            "scrolllock" => Some(Key::Scroll),
            "snapshot" => Some(Key::PrintScreen),
            "leftshift" | "lshift" => Some(Key::LeftShift),
            "rshift" => Some(Key::RightShift),
            "lctrl" | "leftcontrol" => Some(Key::LeftCtrl),
            "rctrl" | "rightcontrol" => Some(Key::RightCtrl),
            "lalt" => Some(Key::LeftAlt),
            "ralt" => Some(Key::RightAlt),
            "menu" => Some(Key::Apps),
            _ => None,
        };
        if let Some(key) = alias {
            return Ok(key);
        }

        // Bare digits are accepted for the top-row number keys.
        if let [digit @ b'0'..=b'9'] = name.as_bytes() {
            const DIGITS: [Key; 10] = [
                Key::D0, Key::D1, Key::D2, Key::D3, Key::D4,
                Key::D5, Key::D6, Key::D7, Key::D8, Key::D9,
            ];
            return Ok(DIGITS[usize::from(digit - b'0')]);
        }

        Key::ALL
            .iter()
            .copied()
            .find(|key| key.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| UnknownKey(name.to_string()))
    }
}
