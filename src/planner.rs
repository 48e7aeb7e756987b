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

//! Sequence planner
//!
//! Turns recorded events and playback settings into timed actions. All
//! randomness comes from the injected [`RandomSource`], so a scripted source
//! yields the same plan every time.

use crate::error::SettingsError;
use crate::random::{RandomSource, ThreadRandomSource};
use crate::types::{KeyPlaybackAction, PlaybackSettings, RecordedEvent};

pub struct SequencePlanner<R = ThreadRandomSource> {
    random: R,
}

impl Default for SequencePlanner<ThreadRandomSource> {
    fn default() -> Self {
        Self::new(ThreadRandomSource::new())
    }
}

impl<R: RandomSource> SequencePlanner<R> {
    pub fn new(random: R) -> Self {
        Self { random }
    }

    pub fn random(&self) -> &R {
        &self.random
    }

    pub fn build_plan(
        &mut self,
        events: &[RecordedEvent],
        settings: &PlaybackSettings,
    ) -> Result<Vec<KeyPlaybackAction>, SettingsError> {
        settings.validate()?;

        if events.is_empty() {
            return Ok(Vec::new());
        }

        let mut ordered: Vec<&RecordedEvent> = events.iter().collect();
        if settings.randomize_order {
            self.shuffle(&mut ordered);
        }

        Ok(ordered
            .into_iter()
            .map(|event| KeyPlaybackAction {
                key: event.key,
                modifiers: event.modifiers,
                character: event.character,
                delay_before_millis: self.delay_millis(event, settings),
            })
            .collect())
    }

    // Fisher-Yates, highest index first. Draw order is part of the contract.
    fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.random.next_int(0, i + 1);
            items.swap(i, j);
        }
    }

    fn delay_millis(&mut self, event: &RecordedEvent, settings: &PlaybackSettings) -> u64 {
        let base = event.delay_millis().max(0.0);
        let scaled = base * settings.speed_multiplier;

        let mut variance = settings.variance_milliseconds;
        if settings.enable_variance_jitter && variance > 0.0 && settings.variance_jitter_percent > 0.0
        {
            // Jitter draw must precede the offset draw
            let jitter_range = variance * (settings.variance_jitter_percent / 100.0);
            let jitter = (2.0 * self.random.next_double() - 1.0) * jitter_range;
            variance = (variance + jitter).max(0.0);
        }

        let offset = if variance > 0.0 {
            (2.0 * self.random.next_double() - 1.0) * variance
        } else {
            0.0
        };

        let delay = settings.minimum_delay_milliseconds.max(scaled + offset);
        // f64::round breaks ties away from zero; delay is never negative here
        delay.round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::Key;
    use crate::random::ScriptedRandomSource;
    use crate::types::Modifiers;
    use std::time::Duration;

    fn event(key: Key, millis: u64) -> RecordedEvent {
        RecordedEvent::new(key, Duration::from_millis(millis))
    }

    fn settings() -> PlaybackSettings {
        PlaybackSettings {
            minimum_delay_milliseconds: 0.0,
            loop_playback: false,
            ..Default::default()
        }
    }

    fn keys(plan: &[KeyPlaybackAction]) -> Vec<Key> {
        plan.iter().map(|action| action.key).collect()
    }

    fn delays(plan: &[KeyPlaybackAction]) -> Vec<u64> {
        plan.iter().map(|action| action.delay_before_millis).collect()
    }

    #[test]
    fn test_basic_scaling() {
        let events = [event(Key::A, 0), event(Key::B, 100), event(Key::C, 150)];
        let settings = PlaybackSettings {
            speed_multiplier: 2.0,
            ..settings()
        };
        let mut planner = SequencePlanner::new(ScriptedRandomSource::default());

        let plan = planner.build_plan(&events, &settings).unwrap();

        assert_eq!(delays(&plan), vec![0, 200, 300]);
        assert_eq!(keys(&plan), vec![Key::A, Key::B, Key::C]);
    }

    #[test]
    fn test_scaling_rounds_half_away_from_zero() {
        let events = [event(Key::A, 5), event(Key::B, 3)];
        let settings = PlaybackSettings {
            speed_multiplier: 0.5,
            ..settings()
        };
        let mut planner = SequencePlanner::new(ScriptedRandomSource::default());

        let plan = planner.build_plan(&events, &settings).unwrap();

        assert_eq!(delays(&plan), vec![3, 2]);
    }

    #[test]
    fn test_randomizes_order() {
        let events = [event(Key::A, 0), event(Key::B, 0), event(Key::C, 0)];
        let settings = PlaybackSettings {
            randomize_order: true,
            ..settings()
        };
        let mut planner = SequencePlanner::new(ScriptedRandomSource::ints([0, 0]));

        let plan = planner.build_plan(&events, &settings).unwrap();

        assert_eq!(keys(&plan), vec![Key::B, Key::C, Key::A]);
        assert_eq!(planner.random().int_draws, 2);
    }

    #[test]
    fn test_applies_variance() {
        let events = [event(Key::A, 0), event(Key::B, 100)];
        let settings = PlaybackSettings {
            variance_milliseconds: 40.0,
            ..settings()
        };
        let mut planner = SequencePlanner::new(ScriptedRandomSource::doubles([0.75, 0.25]));

        let plan = planner.build_plan(&events, &settings).unwrap();

        assert_eq!(delays(&plan), vec![20, 80]);
    }

    #[test]
    fn test_jitter_draw_precedes_offset_draw() {
        let events = [event(Key::A, 100)];
        let settings = PlaybackSettings {
            variance_milliseconds: 40.0,
            enable_variance_jitter: true,
            variance_jitter_percent: 50.0,
            ..settings()
        };
        // jitter = (2*1.0 - 1) * 20 = +20 -> variance 60; offset = (2*0.75 - 1) * 60 = +30
        let mut planner = SequencePlanner::new(ScriptedRandomSource::doubles([1.0, 0.75]));

        let plan = planner.build_plan(&events, &settings).unwrap();

        assert_eq!(delays(&plan), vec![130]);
        assert_eq!(planner.random().double_draws, 2);
    }

    #[test]
    fn test_jitter_disabled_draws_once_per_action() {
        let events = [event(Key::A, 100), event(Key::B, 100)];
        let settings = PlaybackSettings {
            variance_milliseconds: 10.0,
            enable_variance_jitter: false,
            variance_jitter_percent: 50.0,
            ..settings()
        };
        let mut planner = SequencePlanner::new(ScriptedRandomSource::doubles([0.5, 0.5]));

        planner.build_plan(&events, &settings).unwrap();

        assert_eq!(planner.random().double_draws, 2);
    }

    #[test]
    fn test_zero_variance_draws_nothing() {
        let events = [event(Key::A, 100)];
        let settings = PlaybackSettings {
            enable_variance_jitter: true,
            variance_jitter_percent: 50.0,
            ..settings()
        };
        let mut planner = SequencePlanner::new(ScriptedRandomSource::default());

        planner.build_plan(&events, &settings).unwrap();

        assert_eq!(planner.random().double_draws, 0);
    }

    #[test]
    fn test_enforces_minimum_delay() {
        let events = [event(Key::A, 10)];
        let settings = PlaybackSettings {
            variance_milliseconds: 50.0,
            minimum_delay_milliseconds: 15.0,
            ..settings()
        };
        let mut planner = SequencePlanner::new(ScriptedRandomSource::doubles([0.0]));

        let plan = planner.build_plan(&events, &settings).unwrap();

        assert_eq!(delays(&plan), vec![15]);
    }

    #[test]
    fn test_minimum_delay_holds_for_many_draws() {
        let events: Vec<RecordedEvent> = (0..50).map(|i| event(Key::A, i * 3)).collect();
        let settings = PlaybackSettings {
            variance_milliseconds: 80.0,
            enable_variance_jitter: true,
            variance_jitter_percent: 100.0,
            minimum_delay_milliseconds: 12.0,
            randomize_order: true,
            ..settings()
        };
        let mut planner = SequencePlanner::new(ThreadRandomSource::seeded(7));

        let plan = planner.build_plan(&events, &settings).unwrap();

        assert_eq!(plan.len(), 50);
        assert!(plan.iter().all(|action| action.delay_before_millis >= 12));
    }

    #[test]
    fn test_preserves_recorded_characters() {
        let events = [
            event(Key::A, 0).with_character('a'),
            event(Key::B, 10)
                .with_modifiers(Modifiers::SHIFT)
                .with_character('B'),
        ];
        let mut planner = SequencePlanner::new(ScriptedRandomSource::default());

        let plan = planner.build_plan(&events, &settings()).unwrap();

        assert_eq!(keys(&plan), vec![Key::A, Key::B]);
        assert_eq!(plan[0].character, Some('a'));
        assert_eq!(plan[1].character, Some('B'));
        assert_eq!(plan[1].modifiers, Modifiers::SHIFT);
    }

    #[test]
    fn test_shuffle_carries_fields_with_their_key() {
        let events = [
            event(Key::A, 0).with_character('a'),
            event(Key::B, 0).with_character('b'),
            event(Key::C, 0).with_character('c'),
        ];
        let settings = PlaybackSettings {
            randomize_order: true,
            ..settings()
        };
        let mut planner = SequencePlanner::new(ScriptedRandomSource::ints([0, 0]));

        let plan = planner.build_plan(&events, &settings).unwrap();

        let characters: Vec<Option<char>> = plan.iter().map(|a| a.character).collect();
        assert_eq!(characters, vec![Some('b'), Some('c'), Some('a')]);
    }

    #[test]
    fn test_deterministic_for_same_draws() {
        let events = [event(Key::A, 40), event(Key::B, 90), event(Key::C, 10)];
        let settings = PlaybackSettings {
            randomize_order: true,
            variance_milliseconds: 25.0,
            enable_variance_jitter: true,
            variance_jitter_percent: 30.0,
            ..settings()
        };

        let first = SequencePlanner::new(ThreadRandomSource::seeded(99))
            .build_plan(&events, &settings)
            .unwrap();
        let second = SequencePlanner::new(ThreadRandomSource::seeded(99))
            .build_plan(&events, &settings)
            .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_events() {
        let mut planner = SequencePlanner::new(ScriptedRandomSource::default());
        assert_eq!(planner.build_plan(&[], &settings()), Ok(Vec::new()));
    }

    #[test]
    fn test_validation_runs_before_planning() {
        let settings = PlaybackSettings {
            speed_multiplier: -1.0,
            randomize_order: true,
            ..settings()
        };
        let mut planner = SequencePlanner::new(ScriptedRandomSource::default());

        assert_eq!(
            planner.build_plan(&[], &settings),
            Err(SettingsError::SpeedMultiplier(-1.0))
        );
        assert_eq!(planner.random().int_draws, 0);
    }
}
