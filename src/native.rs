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

//! Platform keyboard backends
//!
//! Windows goes through `SendInput`. Other platforms get a backend that
//! refuses every send, so playback fails loudly instead of doing nothing.

#[cfg(target_os = "windows")]
pub use win32::Win32Keyboard as PlatformKeyboard;

#[cfg(not(target_os = "windows"))]
pub use unsupported::UnsupportedKeyboard as PlatformKeyboard;

#[cfg(target_os = "windows")]
mod win32 {
    use std::mem::size_of;
    use windows::Win32::Foundation::{ERROR_INVALID_PARAMETER, GetLastError};
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        INPUT, INPUT_0, INPUT_KEYBOARD, KEYBD_EVENT_FLAGS, KEYBDINPUT, KEYEVENTF_EXTENDEDKEY,
        KEYEVENTF_KEYUP, KEYEVENTF_SCANCODE, KEYEVENTF_UNICODE, MAPVK_VK_TO_CHAR,
        MAPVK_VK_TO_VSC_EX, MapVirtualKeyW, SendInput, VIRTUAL_KEY,
    };

    use crate::error::NativeKeyError;
    use crate::injector::{NativeKeyboard, ScanCode};

    const INPUT_SIZE: usize = size_of::<INPUT>();

    #[derive(Debug, Default)]
    pub struct Win32Keyboard;

    impl Win32Keyboard {
        pub fn new() -> Self {
            Self
        }
    }

    fn keyboard_input(vk: u16, scan: u16, flags: KEYBD_EVENT_FLAGS) -> INPUT {
        INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: VIRTUAL_KEY(vk),
                    wScan: scan,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        }
    }

    fn up_flag(key_up: bool) -> KEYBD_EVENT_FLAGS {
        if key_up {
            KEYEVENTF_KEYUP
        } else {
            KEYBD_EVENT_FLAGS(0)
        }
    }

    fn send(inputs: &[INPUT], detail: impl FnOnce() -> String) -> Result<(), NativeKeyError> {
        let sent = unsafe { SendInput(inputs, INPUT_SIZE as i32) };
        if sent as usize == inputs.len() {
            return Ok(());
        }

        let error = unsafe { GetLastError() };
        if error == ERROR_INVALID_PARAMETER {
            Err(NativeKeyError::ParameterRejected {
                code: error.0,
                detail: detail(),
            })
        } else {
            Err(NativeKeyError::Unavailable(format!(
                "SendInput failed with error code {} ({})",
                error.0,
                detail()
            )))
        }
    }

    impl NativeKeyboard for Win32Keyboard {
        fn map_virtual_key(&self, virtual_key: u16) -> Option<ScanCode> {
            let mapped = unsafe { MapVirtualKeyW(u32::from(virtual_key), MAPVK_VK_TO_VSC_EX) };
            let code = (mapped & 0xFF) as u16;
            if code == 0 {
                return None;
            }
            // High byte carries the 0xE0/0xE1 prefix of extended keys
            let prefix = (mapped >> 8) & 0xFF;
            Some(ScanCode {
                code,
                extended: prefix == 0xE0 || prefix == 0xE1,
            })
        }

        fn map_virtual_key_to_char(&self, virtual_key: u16) -> Option<char> {
            let mapped = unsafe { MapVirtualKeyW(u32::from(virtual_key), MAPVK_VK_TO_CHAR) };
            // Bit 31 marks dead keys; the low word is the character
            match mapped & 0xFFFF {
                0 => None,
                code => char::from_u32(code).map(|c| c.to_ascii_lowercase()),
            }
        }

        fn send_scan_code_event(
            &mut self,
            scan_code: ScanCode,
            key_up: bool,
            original_virtual_key: u16,
        ) -> Result<(), NativeKeyError> {
            let mut flags = KEYEVENTF_SCANCODE | up_flag(key_up);
            if scan_code.extended {
                flags |= KEYEVENTF_EXTENDEDKEY;
            }
            let input = keyboard_input(0, scan_code.code, flags);
            send(&[input], || format!("VK={original_virtual_key}"))
        }

        fn send_virtual_key_event(
            &mut self,
            virtual_key: u16,
            key_up: bool,
        ) -> Result<(), NativeKeyError> {
            let input = keyboard_input(virtual_key, 0, up_flag(key_up));
            send(&[input], || format!("VK={virtual_key}"))
        }

        fn send_unicode_event(&mut self, character: char, key_up: bool) -> Result<(), NativeKeyError> {
            let mut units = [0u16; 2];
            let inputs: Vec<INPUT> = character
                .encode_utf16(&mut units)
                .iter()
                .map(|unit| keyboard_input(0, *unit, KEYEVENTF_UNICODE | up_flag(key_up)))
                .collect();
            send(&inputs, || format!("Char={}", u32::from(character)))
        }

        fn input_size(&self) -> usize {
            INPUT_SIZE
        }
    }
}

#[cfg(not(target_os = "windows"))]
mod unsupported {
    use crate::error::NativeKeyError;
    use crate::injector::{NativeKeyboard, ScanCode};

    #[derive(Debug, Default)]
    pub struct UnsupportedKeyboard;

    impl UnsupportedKeyboard {
        pub fn new() -> Self {
            Self
        }

        fn refuse(&self) -> Result<(), NativeKeyError> {
            Err(NativeKeyError::Unavailable(format!(
                "keyboard injection is not supported on {}",
                std::env::consts::OS
            )))
        }
    }

    impl NativeKeyboard for UnsupportedKeyboard {
        fn map_virtual_key(&self, _virtual_key: u16) -> Option<ScanCode> {
            None
        }

        fn map_virtual_key_to_char(&self, _virtual_key: u16) -> Option<char> {
            None
        }

        fn send_scan_code_event(
            &mut self,
            _scan_code: ScanCode,
            _key_up: bool,
            _original_virtual_key: u16,
        ) -> Result<(), NativeKeyError> {
            self.refuse()
        }

        fn send_virtual_key_event(
            &mut self,
            _virtual_key: u16,
            _key_up: bool,
        ) -> Result<(), NativeKeyError> {
            self.refuse()
        }

        fn send_unicode_event(
            &mut self,
            _character: char,
            _key_up: bool,
        ) -> Result<(), NativeKeyError> {
            self.refuse()
        }

        fn input_size(&self) -> usize {
            0
        }
    }

}
