//! Конфигурация platform link (immutable после создания контроллера)

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layers::{LayerMask, LOCAL_PLAYER_LAYER};

/// Радиус sphere sweep под телом (метры)
pub const SWEEP_RADIUS: f32 = 0.18;

/// Подъём точки старта sweep над origin тела
pub const SWEEP_ORIGIN_LIFT: f32 = 0.23;

/// Максимум кандидатов sweep за кадр
pub const MAX_SWEEP_HITS: usize = 128;

/// Радиус overlap запроса station guard
pub const STATION_PROBE_RADIUS: f32 = 1.0;

/// Максимум объектов в overlap запросе station guard
pub const MAX_STATION_OVERLAPS: usize = 32;

/// Debounce перед unlink (секунды)
pub const UNLINK_DEBOUNCE: f32 = 0.1;

/// Слой тела для Collision Mask Builder
pub const BODY_LAYER: u8 = LOCAL_PLAYER_LAYER;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse platform link config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unlink search distance must be finite and positive, got {0}")]
    InvalidSearchDistance(f32),
}

/// Параметры контроллера
///
/// ```toml
/// linkable_layers = 4096
/// inherit_velocity_on_release = true
/// unlink_search_distance = 10.0
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformLinkConfig {
    /// На какие слои можно прилинковаться
    pub linkable_layers: LayerMask,
    /// Сохранять скорость платформы при сходе с неё
    pub inherit_velocity_on_release: bool,
    /// Длина sweep вниз (насколько высоко над collider можно быть до unlink)
    pub unlink_search_distance: f32,
}

impl Default for PlatformLinkConfig {
    fn default() -> Self {
        Self {
            linkable_layers: LayerMask::NONE,
            inherit_velocity_on_release: true,
            unlink_search_distance: 10.0,
        }
    }
}

impl PlatformLinkConfig {
    pub fn new(linkable_layers: LayerMask) -> Self {
        Self {
            linkable_layers,
            ..Self::default()
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: PlatformLinkConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let distance = self.unlink_search_distance;
        if !distance.is_finite() || distance <= 0.0 {
            return Err(ConfigError::InvalidSearchDistance(distance));
        }
        Ok(())
    }
}
