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

//! Randomness used by the sequence planner

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

pub trait RandomSource {
    /// Uniform value in `[0, 1)`.
    fn next_double(&mut self) -> f64;

    /// Uniform value in `[min_inclusive, max_exclusive)`.
    fn next_int(&mut self, min_inclusive: usize, max_exclusive: usize) -> usize;
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_double(&mut self) -> f64 {
        (**self).next_double()
    }

    fn next_int(&mut self, min_inclusive: usize, max_exclusive: usize) -> usize {
        (**self).next_int(min_inclusive, max_exclusive)
    }
}

pub struct ThreadRandomSource {
    rng: StdRng,
}

impl ThreadRandomSource {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible source, for replaying the exact same shuffle and jitter.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for ThreadRandomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for ThreadRandomSource {
    fn next_double(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }

    fn next_int(&mut self, min_inclusive: usize, max_exclusive: usize) -> usize {
        if max_exclusive <= min_inclusive {
            return min_inclusive;
        }
        self.rng.gen_range(min_inclusive..max_exclusive)
    }
}

/// Replays fixed values in order.
///
/// Once a queue runs dry it falls back to `0.5` for doubles and the lower
/// bound for integers, and counts the draws so callers can assert on them.
#[derive(Debug, Default, Clone)]
pub struct ScriptedRandomSource {
    doubles: VecDeque<f64>,
    ints: VecDeque<usize>,
    pub double_draws: usize,
    pub int_draws: usize,
}

impl ScriptedRandomSource {
    pub fn new(doubles: impl IntoIterator<Item = f64>, ints: impl IntoIterator<Item = usize>) -> Self {
        Self {
            doubles: doubles.into_iter().collect(),
            ints: ints.into_iter().collect(),
            double_draws: 0,
            int_draws: 0,
        }
    }

    pub fn doubles(values: impl IntoIterator<Item = f64>) -> Self {
        Self::new(values, [])
    }

    pub fn ints(values: impl IntoIterator<Item = usize>) -> Self {
        Self::new([], values)
    }
}

impl RandomSource for ScriptedRandomSource {
    fn next_double(&mut self) -> f64 {
        self.double_draws += 1;
        self.doubles.pop_front().unwrap_or(0.5)
    }

    fn next_int(&mut self, min_inclusive: usize, max_exclusive: usize) -> usize {
        self.int_draws += 1;
        match self.ints.pop_front() {
            Some(value) if max_exclusive > min_inclusive => {
                value.clamp(min_inclusive, max_exclusive - 1)
            }
            _ => min_inclusive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_sources_agree() {
        let mut a = ThreadRandomSource::seeded(42);
        let mut b = ThreadRandomSource::seeded(42);
        for _ in 0..16 {
            assert_eq!(a.next_double(), b.next_double());
            assert_eq!(a.next_int(0, 10), b.next_int(0, 10));
        }
    }

    #[test]
    fn test_thread_source_bounds() {
        let mut source = ThreadRandomSource::new();
        for _ in 0..1000 {
            let d = source.next_double();
            assert!((0.0..1.0).contains(&d));
            let i = source.next_int(3, 7);
            assert!((3..7).contains(&i));
        }
        assert_eq!(source.next_int(5, 5), 5);
    }

    #[test]
    fn test_scripted_source_replays_then_falls_back() {
        let mut source = ScriptedRandomSource::new([0.25], [2]);
        assert_eq!(source.next_double(), 0.25);
        assert_eq!(source.next_double(), 0.5);
        assert_eq!(source.next_int(0, 3), 2);
        assert_eq!(source.next_int(1, 3), 1);
        assert_eq!(source.double_draws, 2);
        assert_eq!(source.int_draws, 2);
    }
}
