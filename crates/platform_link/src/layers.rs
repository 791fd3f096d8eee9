//! Collision layers + Collision Mask Builder
//!
//! ## Архитектура:
//! - **Layer (0..32):** индекс слоя, на котором лежит collider
//! - **LayerMask (битовая маска):** набор слоёв (`1 << layer`)
//! - **LayerCollisionMatrix:** статическая ignore-матрица движка (какие пары слоёв НЕ коллайдят)
//!
//! Маска тела строится один раз при старте контроллера (`build_collision_mask`).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::{BitAnd, BitOr, Not};

/// Количество слоёв в матрице
pub const LAYER_COUNT: u8 = 32;

/// Слой, на котором живёт управляемое тело (local player)
pub const LOCAL_PLAYER_LAYER: u8 = 10;

/// Зарезервированный бит local player (0b100_0000_0000 = 1024)
///
/// Через include/exclude overrides на этом бите дизайнер может
/// исключить collider из platform логики (или явно включить).
pub const LOCAL_PLAYER_MASK: LayerMask = LayerMask::from_layer(LOCAL_PLAYER_LAYER);

/// Битовая маска слоёв
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    /// Маска из одного слоя. Слои вне 0..32 дают пустую маску.
    pub const fn from_layer(layer: u8) -> Self {
        if layer < LAYER_COUNT {
            LayerMask(1 << layer)
        } else {
            LayerMask(0)
        }
    }

    pub fn from_layers(layers: &[u8]) -> Self {
        layers
            .iter()
            .fold(LayerMask::NONE, |mask, layer| mask | LayerMask::from_layer(*layer))
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains_layer(self, layer: u8) -> bool {
        layer < LAYER_COUNT && (self.0 & (1 << layer)) != 0
    }

    pub const fn intersects(self, other: LayerMask) -> bool {
        (self.0 & other.0) != 0
    }

    pub const fn with_layer(self, layer: u8) -> Self {
        LayerMask(self.0 | LayerMask::from_layer(layer).0)
    }
}

impl BitOr for LayerMask {
    type Output = LayerMask;

    fn bitor(self, rhs: LayerMask) -> LayerMask {
        LayerMask(self.0 | rhs.0)
    }
}

impl BitAnd for LayerMask {
    type Output = LayerMask;

    fn bitand(self, rhs: LayerMask) -> LayerMask {
        LayerMask(self.0 & rhs.0)
    }
}

impl Not for LayerMask {
    type Output = LayerMask;

    fn not(self) -> LayerMask {
        LayerMask(!self.0)
    }
}

/// Per-object include/exclude overrides (collider или rigid body)
///
/// Обычные sweep/cast запросы их не учитывают, поэтому резолвер
/// применяет их вручную. Для rigid body и collider маски OR-ятся.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
pub struct LayerOverrides {
    /// Слои, с которыми объект коллайдит дополнительно к матрице
    pub include: LayerMask,
    /// Слои, с которыми объект НЕ коллайдит несмотря на матрицу
    pub exclude: LayerMask,
}

impl LayerOverrides {
    pub const NONE: LayerOverrides = LayerOverrides {
        include: LayerMask::NONE,
        exclude: LayerMask::NONE,
    };

    /// Явно исключить local player
    pub const fn excluding_local_player() -> Self {
        Self {
            include: LayerMask::NONE,
            exclude: LOCAL_PLAYER_MASK,
        }
    }

    /// Явно включить local player (opt-in поверх матрицы)
    pub const fn including_local_player() -> Self {
        Self {
            include: LOCAL_PLAYER_MASK,
            exclude: LayerMask::NONE,
        }
    }

    pub fn combine(self, other: LayerOverrides) -> LayerOverrides {
        LayerOverrides {
            include: self.include | other.include,
            exclude: self.exclude | other.exclude,
        }
    }
}

/// Источник статической layer collision матрицы
pub trait LayerCollisionMatrix {
    /// true если пара слоёв игнорирует коллизии друг с другом
    fn ignores(&self, a: u8, b: u8) -> bool;
}

/// Симметричная 32×32 ignore-матрица
///
/// По умолчанию все слои коллайдят со всеми.
#[derive(Resource, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticLayerMatrix {
    /// ignore_rows[a] бит b: пара (a, b) игнорируется
    ignore_rows: [u32; LAYER_COUNT as usize],
}

impl Default for StaticLayerMatrix {
    fn default() -> Self {
        Self {
            ignore_rows: [0; LAYER_COUNT as usize],
        }
    }
}

impl StaticLayerMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Включить/выключить игнор пары (симметрично)
    pub fn set_ignore(&mut self, a: u8, b: u8, ignore: bool) {
        if a >= LAYER_COUNT || b >= LAYER_COUNT {
            return;
        }
        let (a, b) = (a as usize, b as usize);
        if ignore {
            self.ignore_rows[a] |= 1 << b;
            self.ignore_rows[b] |= 1 << a;
        } else {
            self.ignore_rows[a] &= !(1 << b);
            self.ignore_rows[b] &= !(1 << a);
        }
    }

    pub fn with_ignored(mut self, a: u8, b: u8) -> Self {
        self.set_ignore(a, b, true);
        self
    }
}

impl LayerCollisionMatrix for StaticLayerMatrix {
    fn ignores(&self, a: u8, b: u8) -> bool {
        if a >= LAYER_COUNT || b >= LAYER_COUNT {
            return true;
        }
        (self.ignore_rows[a as usize] & (1 << b)) != 0
    }
}

/// Collision Mask Builder
///
/// Собирает маску слоёв, с которыми `body_layer` физически коллайдит.
/// Матрица недоступна → пустая маска (все слои non-colliding).
pub fn build_collision_mask(matrix: Option<&dyn LayerCollisionMatrix>, body_layer: u8) -> LayerMask {
    let Some(matrix) = matrix else {
        return LayerMask::NONE;
    };

    (0..LAYER_COUNT)
        .filter(|layer| !matrix.ignores(body_layer, *layer))
        .fold(LayerMask::NONE, |mask, layer| mask.with_layer(layer))
}

/// Название слоя для debug логов
pub fn layer_name(layer: u8) -> String {
    match layer {
        LOCAL_PLAYER_LAYER => "LocalPlayer".to_string(),
        other => format!("Layer{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_player_mask_is_reserved_bit() {
        assert_eq!(LOCAL_PLAYER_MASK.bits(), 1024);
        assert!(LOCAL_PLAYER_MASK.contains_layer(LOCAL_PLAYER_LAYER));
    }

    #[test]
    fn test_from_layer_out_of_range() {
        assert!(LayerMask::from_layer(32).is_empty());
        assert!(!LayerMask::ALL.contains_layer(40));
    }

    #[test]
    fn test_matrix_is_symmetric() {
        let matrix = StaticLayerMatrix::new().with_ignored(3, LOCAL_PLAYER_LAYER);

        assert!(matrix.ignores(3, LOCAL_PLAYER_LAYER));
        assert!(matrix.ignores(LOCAL_PLAYER_LAYER, 3));
        assert!(!matrix.ignores(3, 4));
    }

    #[test]
    fn test_collision_mask_skips_ignored_layers() {
        let matrix = StaticLayerMatrix::new()
            .with_ignored(LOCAL_PLAYER_LAYER, 5)
            .with_ignored(LOCAL_PLAYER_LAYER, 31);

        let mask = build_collision_mask(Some(&matrix), LOCAL_PLAYER_LAYER);

        assert!(!mask.contains_layer(5));
        assert!(!mask.contains_layer(31));
        assert!(mask.contains_layer(0));
        assert!(mask.contains_layer(LOCAL_PLAYER_LAYER));
        assert_eq!(mask.bits().count_ones(), 30);
    }

    #[test]
    fn test_collision_mask_without_matrix_is_empty() {
        assert_eq!(build_collision_mask(None, LOCAL_PLAYER_LAYER), LayerMask::NONE);
    }

    #[test]
    fn test_overrides_combine() {
        let collider = LayerOverrides {
            include: LayerMask::from_layer(1),
            exclude: LayerMask::NONE,
        };
        let body = LayerOverrides::excluding_local_player();

        let combined = collider.combine(body);
        assert!(combined.include.contains_layer(1));
        assert_eq!(combined.exclude, LOCAL_PLAYER_MASK);
    }
}
