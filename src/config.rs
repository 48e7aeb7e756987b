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

//! Playback configuration from the command line and settings files

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};

use crate::injector::{KeyInjector, KeySender, LoggingSender};
use crate::native::PlatformKeyboard;
use crate::planner::SequencePlanner;
use crate::random::ThreadRandomSource;
use crate::recording;
use crate::types::{PlaybackSettings, RecordedEvent};

#[derive(Debug, Clone, Default, Args)]
pub struct PlaybackOptions {
    /// JSON settings file; flags below override its values
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Shuffle key order on every pass
    #[arg(long)]
    pub randomize: bool,

    /// Multiplier applied to recorded delays (2.0 = half speed)
    #[arg(long, value_name = "FACTOR")]
    pub speed: Option<f64>,

    /// Random offset bound per key, in milliseconds
    #[arg(long, value_name = "MS")]
    pub variance: Option<f64>,

    /// Perturb the variance bound itself by up to this percentage
    #[arg(long, value_name = "PERCENT")]
    pub jitter: Option<f64>,

    /// Never wait less than this between keys, in milliseconds
    #[arg(long, value_name = "MS")]
    pub min_delay: Option<f64>,

    /// Play the recording once instead of looping
    #[arg(long)]
    pub once: bool,

    /// Seed for reproducible shuffles and variance
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log keypresses instead of sending them
    #[arg(long)]
    pub dry_run: bool,
}

impl PlaybackOptions {
    pub fn apply(&self, mut settings: PlaybackSettings) -> PlaybackSettings {
        if self.randomize {
            settings.randomize_order = true;
        }
        if let Some(speed) = self.speed {
            settings.speed_multiplier = speed;
        }
        if let Some(variance) = self.variance {
            settings.variance_milliseconds = variance;
        }
        if let Some(percent) = self.jitter {
            settings.enable_variance_jitter = percent > 0.0;
            settings.variance_jitter_percent = percent;
        }
        if let Some(min_delay) = self.min_delay {
            settings.minimum_delay_milliseconds = min_delay;
        }
        if self.once {
            settings.loop_playback = false;
        }
        settings
    }

    /// Settings file (or defaults) with flags applied, validated.
    pub fn resolve(&self) -> Result<PlaybackSettings> {
        let base = match &self.settings {
            Some(path) => load_settings(path)?,
            None => PlaybackSettings::default(),
        };
        let settings = self.apply(base);
        settings.validate()?;
        Ok(settings)
    }

    pub fn planner(&self) -> SequencePlanner<ThreadRandomSource> {
        let random = match self.seed {
            Some(seed) => ThreadRandomSource::seeded(seed),
            None => ThreadRandomSource::new(),
        };
        SequencePlanner::new(random)
    }

    pub fn sender(&self) -> Box<dyn KeySender + Send> {
        if self.dry_run {
            Box::new(LoggingSender::default())
        } else {
            Box::new(KeyInjector::new(PlatformKeyboard::new()))
        }
    }
}

pub fn load_settings(path: &Path) -> Result<PlaybackSettings> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse settings file {}", path.display()))
}

pub fn load_recording(path: &Path) -> Result<Vec<RecordedEvent>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read recording {}", path.display()))?;
    recording::deserialize(&text)
        .with_context(|| format!("Failed to load recording {}", path.display()))
}

pub fn save_recording(path: &Path, events: &[RecordedEvent]) -> Result<()> {
    let json = recording::serialize(events)?;
    fs::write(path, json).with_context(|| format!("Failed to write recording {}", path.display()))
}
