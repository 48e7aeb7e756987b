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

//! Key injection with layered fallback
//!
//! A keypress is delivered as a down/up pair using the first strategy that
//! the platform accepts: the literal character, then the hardware scan code,
//! then the raw virtual key, then the literal once more. Only parameter
//! rejections fall through to the next strategy; anything else aborts the
//! keypress.

use tracing::{debug, warn};

use crate::error::{InjectionError, NativeKeyError, Strategy, StrategyFailure};
use crate::keys::Key;
use crate::types::{Modifier, Modifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanCode {
    pub code: u16,
    pub extended: bool,
}

/// Low-level keyboard calls the injector is built on.
pub trait NativeKeyboard {
    /// Hardware scan code for a virtual key, `None` when unmapped.
    fn map_virtual_key(&self, virtual_key: u16) -> Option<ScanCode>;

    /// Character the current layout produces for a virtual key.
    fn map_virtual_key_to_char(&self, virtual_key: u16) -> Option<char>;

    fn send_scan_code_event(
        &mut self,
        scan_code: ScanCode,
        key_up: bool,
        original_virtual_key: u16,
    ) -> Result<(), NativeKeyError>;

    fn send_virtual_key_event(&mut self, virtual_key: u16, key_up: bool)
    -> Result<(), NativeKeyError>;

    fn send_unicode_event(&mut self, character: char, key_up: bool) -> Result<(), NativeKeyError>;

    /// Size in bytes of one input record handed to the platform.
    fn input_size(&self) -> usize;
}

/// Sends one logical keypress.
pub trait KeySender {
    fn send_key_press(
        &mut self,
        key: Key,
        modifiers: Modifiers,
        character: Option<char>,
    ) -> Result<(), InjectionError>;
}

impl<S: KeySender + ?Sized> KeySender for Box<S> {
    fn send_key_press(
        &mut self,
        key: Key,
        modifiers: Modifiers,
        character: Option<char>,
    ) -> Result<(), InjectionError> {
        (**self).send_key_press(key, modifiers, character)
    }
}

// Keys whose hardware events carry the extended bit
pub fn is_extended_key(virtual_key: u16) -> bool {
    matches!(
        virtual_key,
        // PageUp, PageDown, End, Home, arrows
        0x21..=0x28
            // PrintScreen, Insert, Delete
            | 0x2C | 0x2D | 0x2E
            // Windows and application keys
            | 0x5B | 0x5C | 0x5D
            // Numpad divide
            | 0x6F
            // NumLock, ScrollLock
            | 0x90 | 0x91
            // Right Ctrl, Right Alt
            | 0xA3 | 0xA5
            // Browser, volume, media and launch keys
            | 0xA6..=0xB5
    )
}

enum Attempt {
    Delivered,
    Rejected(StrategyFailure),
}

impl Attempt {
    fn delivered(self, failures: &mut Vec<StrategyFailure>) -> bool {
        match self {
            Attempt::Delivered => true,
            Attempt::Rejected(failure) => {
                failures.push(failure);
                false
            }
        }
    }
}

pub struct KeyInjector<K> {
    keyboard: K,
}

impl<K: NativeKeyboard> KeyInjector<K> {
    pub fn new(keyboard: K) -> Self {
        Self { keyboard }
    }

    pub fn keyboard(&self) -> &K {
        &self.keyboard
    }

    fn attempt(
        &mut self,
        strategy: Strategy,
        send: impl Fn(&mut K, bool) -> Result<(), NativeKeyError>,
    ) -> Result<Attempt, InjectionError> {
        debug!(%strategy, "sending key down/up");
        let result = send(&mut self.keyboard, false).and_then(|()| send(&mut self.keyboard, true));

        match result {
            Ok(()) => Ok(Attempt::Delivered),
            Err(error) if error.is_parameter_rejected() => {
                warn!(%strategy, %error, "strategy rejected, falling back");
                Ok(Attempt::Rejected(StrategyFailure { strategy, error }))
            }
            Err(error) => Err(InjectionError::Fatal(StrategyFailure { strategy, error })),
        }
    }

    fn press_modifiers(&mut self, chord: &[u16]) -> Result<(), InjectionError> {
        for (pressed, &virtual_key) in chord.iter().enumerate() {
            if let Err(source) = self.keyboard.send_virtual_key_event(virtual_key, false) {
                self.release_modifiers(&chord[..pressed]);
                return Err(InjectionError::Modifier {
                    virtual_key,
                    source,
                });
            }
        }
        Ok(())
    }

    // Best effort: a release failure must not hide the keypress outcome
    fn release_modifiers(&mut self, chord: &[u16]) -> Option<InjectionError> {
        let mut first_error = None;
        for &virtual_key in chord.iter().rev() {
            if let Err(source) = self.keyboard.send_virtual_key_event(virtual_key, true) {
                warn!(virtual_key, %source, "failed to release modifier");
                first_error.get_or_insert(InjectionError::Modifier {
                    virtual_key,
                    source,
                });
            }
        }
        first_error
    }

    fn send_literal(
        &mut self,
        c: char,
        failures: &mut Vec<StrategyFailure>,
    ) -> Result<bool, InjectionError> {
        let attempt = self.attempt(Strategy::Unicode, |keyboard, up| {
            keyboard.send_unicode_event(c, up)
        })?;
        Ok(attempt.delivered(failures))
    }

    fn send_hardware(
        &mut self,
        virtual_key: u16,
        scan_code: Option<ScanCode>,
        failures: &mut Vec<StrategyFailure>,
    ) -> Result<bool, InjectionError> {
        match scan_code {
            Some(scan_code) => {
                let attempt = self.attempt(Strategy::ScanCode, |keyboard, up| {
                    keyboard.send_scan_code_event(scan_code, up, virtual_key)
                })?;
                if attempt.delivered(failures) {
                    return Ok(true);
                }
            }
            None => debug!(virtual_key, "no scan code mapping, skipping scan code strategy"),
        }

        let attempt = self.attempt(Strategy::VirtualKey, |keyboard, up| {
            keyboard.send_virtual_key_event(virtual_key, up)
        })?;
        Ok(attempt.delivered(failures))
    }
}

impl<K: NativeKeyboard> KeySender for KeyInjector<K> {
    fn send_key_press(
        &mut self,
        key: Key,
        modifiers: Modifiers,
        recorded_character: Option<char>,
    ) -> Result<(), InjectionError> {
        let Some(virtual_key) = key.virtual_key() else {
            return Ok(());
        };

        // The layout mapping only knows the unmodified character
        let character = match recorded_character {
            Some(c) => Some(c),
            None if modifiers.is_empty() => self.keyboard.map_virtual_key_to_char(virtual_key),
            None => None,
        };
        // A recorded literal already reflects Shift, but cannot carry Ctrl, Alt or Meta
        let literal = character.filter(|_| modifiers.without(Modifier::Shift).is_empty());
        let mut failures = Vec::new();

        if let Some(c) = literal {
            if self.send_literal(c, &mut failures)? {
                return Ok(());
            }
        }

        let scan_code = self
            .keyboard
            .map_virtual_key(virtual_key)
            .map(|mapped| ScanCode {
                code: mapped.code,
                extended: mapped.extended || is_extended_key(virtual_key),
            });
        let chord: Vec<u16> = modifiers
            .iter()
            .filter_map(|modifier| modifier.key().virtual_key())
            .collect();

        self.press_modifiers(&chord)?;
        let delivered = self.send_hardware(virtual_key, scan_code, &mut failures);
        let release_error = self.release_modifiers(&chord);
        let mut delivered = delivered?;

        // The literal gets one more try once both hardware strategies are rejected
        if !delivered {
            if let Some(c) = literal {
                delivered = self.send_literal(c, &mut failures)?;
            }
        }

        if !delivered {
            let input_size = self.keyboard.input_size();
            return Err(match scan_code {
                Some(_) => InjectionError::Exhausted {
                    virtual_key,
                    input_size,
                    failures,
                },
                None => InjectionError::Unmapped {
                    virtual_key,
                    input_size,
                    failures,
                },
            });
        }
        release_error.map_or(Ok(()), Err)
    }
}

/// Logs keypresses instead of sending them.
#[derive(Debug, Default)]
pub struct LoggingSender {
    pub sent: usize,
}

impl KeySender for LoggingSender {
    fn send_key_press(
        &mut self,
        key: Key,
        modifiers: Modifiers,
        character: Option<char>,
    ) -> Result<(), InjectionError> {
        self.sent += 1;
        tracing::info!(
            key = %crate::label::format(key, modifiers, character),
            "dry run keypress"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Sent {
        Scan { code: u16, extended: bool, up: bool },
        VirtualKey { vk: u16, up: bool },
        Unicode { c: char, up: bool },
    }

    /// Records every send and fails on demand.
    #[derive(Default)]
    pub struct FakeKeyboard {
        pub scan_codes: HashMap<u16, ScanCode>,
        pub chars: HashMap<u16, char>,
        pub sent: Vec<Sent>,
        pub fail_scan: Option<NativeKeyError>,
        pub fail_vk: Option<NativeKeyError>,
        pub fail_unicode: Vec<NativeKeyError>,
    }

    pub fn rejected(detail: &str) -> NativeKeyError {
        NativeKeyError::ParameterRejected {
            code: 87,
            detail: detail.to_string(),
        }
    }

    impl NativeKeyboard for FakeKeyboard {
        fn map_virtual_key(&self, virtual_key: u16) -> Option<ScanCode> {
            self.scan_codes.get(&virtual_key).copied()
        }

        fn map_virtual_key_to_char(&self, virtual_key: u16) -> Option<char> {
            self.chars.get(&virtual_key).copied()
        }

        fn send_scan_code_event(
            &mut self,
            scan_code: ScanCode,
            key_up: bool,
            _original_virtual_key: u16,
        ) -> Result<(), NativeKeyError> {
            if let Some(error) = &self.fail_scan {
                return Err(error.clone());
            }
            self.sent.push(Sent::Scan {
                code: scan_code.code,
                extended: scan_code.extended,
                up: key_up,
            });
            Ok(())
        }

        fn send_virtual_key_event(
            &mut self,
            virtual_key: u16,
            key_up: bool,
        ) -> Result<(), NativeKeyError> {
            // Modifier keys are never failed by the fake
            let is_modifier = matches!(virtual_key, 0xA0..=0xA5 | 0x5B);
            if let (Some(error), false) = (&self.fail_vk, is_modifier) {
                return Err(error.clone());
            }
            self.sent.push(Sent::VirtualKey {
                vk: virtual_key,
                up: key_up,
            });
            Ok(())
        }

        fn send_unicode_event(&mut self, c: char, key_up: bool) -> Result<(), NativeKeyError> {
            if !self.fail_unicode.is_empty() {
                return Err(self.fail_unicode.remove(0));
            }
            self.sent.push(Sent::Unicode { c, up: key_up });
            Ok(())
        }

        fn input_size(&self) -> usize {
            40
        }
    }

    fn keyboard_with_scan(vk: u16, code: u16) -> FakeKeyboard {
        let mut keyboard = FakeKeyboard::default();
        keyboard.scan_codes.insert(vk, ScanCode { code, extended: false });
        keyboard
    }

    #[test]
    fn test_sends_down_then_up_with_extended_flag() {
        let mut injector = KeyInjector::new(keyboard_with_scan(0xA3, 0x1D));

        injector
            .send_key_press(Key::RightCtrl, Modifiers::NONE, None)
            .unwrap();

        assert_eq!(
            injector.keyboard().sent,
            vec![
                Sent::Scan { code: 0x1D, extended: true, up: false },
                Sent::Scan { code: 0x1D, extended: true, up: true },
            ]
        );
    }

    #[test]
    fn test_uses_unicode_when_layout_maps_character() {
        let mut keyboard = keyboard_with_scan(0x41, 0x1E);
        keyboard.chars.insert(0x41, 'a');
        let mut injector = KeyInjector::new(keyboard);

        injector.send_key_press(Key::A, Modifiers::NONE, None).unwrap();

        assert_eq!(
            injector.keyboard().sent,
            vec![Sent::Unicode { c: 'a', up: false }, Sent::Unicode { c: 'a', up: true }]
        );
    }

    #[test]
    fn test_prefers_recorded_character() {
        let mut keyboard = keyboard_with_scan(0x41, 0x1E);
        keyboard.chars.insert(0x41, 'a');
        let mut injector = KeyInjector::new(keyboard);

        injector
            .send_key_press(Key::A, Modifiers::SHIFT, Some('A'))
            .unwrap();

        // No scan-code or virtual-key events at all
        assert_eq!(
            injector.keyboard().sent,
            vec![Sent::Unicode { c: 'A', up: false }, Sent::Unicode { c: 'A', up: true }]
        );
    }

    #[test]
    fn test_falls_back_to_virtual_key_on_invalid_parameter() {
        let mut keyboard = keyboard_with_scan(0x48, 0x23);
        keyboard.fail_scan = Some(rejected("VK=72"));
        let mut injector = KeyInjector::new(keyboard);

        injector.send_key_press(Key::H, Modifiers::NONE, None).unwrap();

        assert_eq!(
            injector.keyboard().sent,
            vec![
                Sent::VirtualKey { vk: 0x48, up: false },
                Sent::VirtualKey { vk: 0x48, up: true },
            ]
        );
    }

    #[test]
    fn test_missing_scan_code_goes_straight_to_virtual_key() {
        let mut injector = KeyInjector::new(FakeKeyboard::default());

        injector.send_key_press(Key::F13, Modifiers::NONE, None).unwrap();

        assert_eq!(
            injector.keyboard().sent,
            vec![
                Sent::VirtualKey { vk: 0x7C, up: false },
                Sent::VirtualKey { vk: 0x7C, up: true },
            ]
        );
    }

    #[test]
    fn test_unicode_rejection_falls_back_to_scan_code() {
        let mut keyboard = keyboard_with_scan(0x20, 0x39);
        keyboard.fail_unicode = vec![rejected("Char=32")];
        let mut injector = KeyInjector::new(keyboard);

        injector
            .send_key_press(Key::Space, Modifiers::NONE, Some(' '))
            .unwrap();

        assert_eq!(
            injector.keyboard().sent,
            vec![
                Sent::Scan { code: 0x39, extended: false, up: false },
                Sent::Scan { code: 0x39, extended: false, up: true },
            ]
        );
    }

    #[test]
    fn test_exhausted_error_lists_every_strategy() {
        let mut keyboard = keyboard_with_scan(0x41, 0x1E);
        keyboard.fail_unicode = vec![rejected("Char=97"), rejected("Char=97")];
        keyboard.fail_scan = Some(rejected("VK=65"));
        keyboard.fail_vk = Some(rejected("VK=65"));
        let mut injector = KeyInjector::new(keyboard);

        let error = injector
            .send_key_press(Key::A, Modifiers::NONE, Some('a'))
            .unwrap_err();

        let message = error.to_string();
        assert!(message.contains("virtual key 65"), "{message}");
        assert!(message.contains("INPUT.cbSize=40"), "{message}");
        let unicode = message.find("Unicode: ").unwrap();
        let scan = message.find("ScanCode: ").unwrap();
        let vk = message.find("VirtualKey: ").unwrap();
        let retry = message.rfind("Unicode: ").unwrap();
        assert!(unicode < scan && scan < vk && vk < retry, "{message}");
        assert!(injector.keyboard().sent.is_empty());
    }

    #[test]
    fn test_unicode_retried_after_virtual_key_rejected() {
        let mut keyboard = keyboard_with_scan(0x20, 0x39);
        keyboard.chars.insert(0x20, ' ');
        keyboard.fail_unicode = vec![rejected("Char=32")];
        keyboard.fail_scan = Some(rejected("VK=32"));
        keyboard.fail_vk = Some(rejected("VK=32"));
        let mut injector = KeyInjector::new(keyboard);

        injector
            .send_key_press(Key::Space, Modifiers::NONE, None)
            .unwrap();

        assert_eq!(
            injector.keyboard().sent,
            vec![Sent::Unicode { c: ' ', up: false }, Sent::Unicode { c: ' ', up: true }]
        );
    }

    #[test]
    fn test_unmapped_scan_code_reported_separately() {
        let mut keyboard = FakeKeyboard::default();
        keyboard.fail_vk = Some(rejected("VK=124"));
        let mut injector = KeyInjector::new(keyboard);

        let error = injector
            .send_key_press(Key::F13, Modifiers::NONE, None)
            .unwrap_err();

        assert!(matches!(error, InjectionError::Unmapped { virtual_key: 0x7C, .. }));
        let message = error.to_string();
        assert!(message.starts_with("Failed to map virtual key 124"), "{message}");
        assert!(!message.contains("ScanCode: "), "{message}");
        assert!(message.contains("VirtualKey: "), "{message}");
    }

    #[test]
    fn test_control_chord_ignores_literal() {
        let mut keyboard = keyboard_with_scan(0x43, 0x2E);
        keyboard.chars.insert(0x43, 'c');
        let mut injector = KeyInjector::new(keyboard);

        injector
            .send_key_press(Key::C, Modifiers::CONTROL, Some('c'))
            .unwrap();

        assert_eq!(
            injector.keyboard().sent,
            vec![
                Sent::VirtualKey { vk: 0xA2, up: false },
                Sent::Scan { code: 0x2E, extended: false, up: false },
                Sent::Scan { code: 0x2E, extended: false, up: true },
                Sent::VirtualKey { vk: 0xA2, up: true },
            ]
        );
    }

    #[test]
    fn test_fatal_error_stops_fallback() {
        let mut keyboard = keyboard_with_scan(0x41, 0x1E);
        keyboard.fail_scan = Some(NativeKeyError::Unavailable("Send failure".to_string()));
        let mut injector = KeyInjector::new(keyboard);

        let error = injector
            .send_key_press(Key::A, Modifiers::NONE, None)
            .unwrap_err();

        assert_eq!(
            error,
            InjectionError::Fatal(StrategyFailure {
                strategy: Strategy::ScanCode,
                error: NativeKeyError::Unavailable("Send failure".to_string()),
            })
        );
        assert!(injector.keyboard().sent.is_empty());
    }

    #[test]
    fn test_chord_wraps_keypress_in_modifiers() {
        let mut keyboard = keyboard_with_scan(0x43, 0x2E);
        keyboard.chars.insert(0x43, 'c');
        let mut injector = KeyInjector::new(keyboard);

        injector
            .send_key_press(Key::C, Modifiers::CONTROL | Modifiers::SHIFT, None)
            .unwrap();

        assert_eq!(
            injector.keyboard().sent,
            vec![
                Sent::VirtualKey { vk: 0xA2, up: false },
                Sent::VirtualKey { vk: 0xA0, up: false },
                Sent::Scan { code: 0x2E, extended: false, up: false },
                Sent::Scan { code: 0x2E, extended: false, up: true },
                Sent::VirtualKey { vk: 0xA0, up: true },
                Sent::VirtualKey { vk: 0xA2, up: true },
            ]
        );
    }

    #[test]
    fn test_modifiers_released_when_keypress_fails() {
        let mut keyboard = keyboard_with_scan(0x43, 0x2E);
        keyboard.fail_scan = Some(rejected("VK=67"));
        keyboard.fail_vk = Some(rejected("VK=67"));
        let mut injector = KeyInjector::new(keyboard);

        let error = injector
            .send_key_press(Key::C, Modifiers::CONTROL, None)
            .unwrap_err();

        assert!(matches!(error, InjectionError::Exhausted { .. }));
        assert_eq!(
            injector.keyboard().sent,
            vec![
                Sent::VirtualKey { vk: 0xA2, up: false },
                Sent::VirtualKey { vk: 0xA2, up: true },
            ]
        );
    }

    #[test]
    fn test_key_without_virtual_key_is_noop() {
        let mut injector = KeyInjector::new(FakeKeyboard::default());
        injector
            .send_key_press(Key::None, Modifiers::NONE, Some('x'))
            .unwrap();
        assert!(injector.keyboard().sent.is_empty());
    }

    #[test]
    fn test_extended_keys() {
        assert!(is_extended_key(0x25)); // Left arrow
        assert!(is_extended_key(0x2E)); // Delete
        assert!(is_extended_key(0xA5)); // Right Alt
        assert!(!is_extended_key(0xA4)); // Left Alt
        assert!(!is_extended_key(0x41));
    }
}
