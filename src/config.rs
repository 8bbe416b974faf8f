use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Everything tunable about a game, fixed at construction. Defaults mirror
/// the classic arcade feel: half-minute rounds, moles up for 1.3s, spawn
/// gaps between 0.6s and 1.2s.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameConfig {
    pub initial_time_secs: u32,
    pub min_spawn_ms: u64,
    pub max_spawn_ms: u64,
    pub mole_stay_ms: u64,
    /// How long the hit splat stays before the hole empties again.
    /// Independent of `mole_stay_ms`.
    pub hit_clear_ms: u64,
    pub min_holes: usize,
    pub max_holes: usize,
    pub score_per_hit: u32,
    pub audio: AudioConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioConfig {
    /// Melodic set for the background loop (C major arpeggio up and back).
    pub pitches_hz: Vec<f32>,
    pub beat_ms: u64,
    pub note_ms: u64,
}

impl GameConfig {
    /// A stored config is only usable if its random ranges are non-empty;
    /// an inverted pair would make the samplers panic.
    fn bounds_ok(&self) -> bool {
        self.min_holes >= 1
            && self.min_holes <= self.max_holes
            && self.min_spawn_ms <= self.max_spawn_ms
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            initial_time_secs: 30,
            min_spawn_ms: 600,
            max_spawn_ms: 1200,
            mole_stay_ms: 1300,
            hit_clear_ms: 500,
            min_holes: 6,
            max_holes: 8,
            score_per_hit: 10,
            audio: AudioConfig::default(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            // C E G C G E
            pitches_hz: vec![523.25, 659.25, 783.99, 1046.5, 783.99, 659.25],
            beat_ms: 250,
            note_ms: 200,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> GameConfig;
    fn save(&self, cfg: &GameConfig) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "bonk") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("bonk_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> GameConfig {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(cfg) = serde_json::from_slice::<GameConfig>(&bytes) {
                if cfg.bounds_ok() {
                    return cfg;
                }
            }
        }
        GameConfig::default()
    }

    fn save(&self, cfg: &GameConfig) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
