//! Collision layers ↔ Rapier CollisionGroups
//!
//! ## Архитектура:
//! - **memberships:** один бит = слой объекта (младший установленный бит)
//! - **filters:** с какими слоями объект коллидирует (строка матрицы)
//!
//! Layer 10 зарезервирован под local player (см. `LOCAL_PLAYER_LAYER`).

use bevy_rapier3d::prelude::{CollisionGroups, Group};
use platform_link::{LayerCollisionMatrix, LayerMask, LOCAL_PLAYER_LAYER};

/// Слой объекта по memberships (младший бит), 0 если групп нет
pub fn layer_of(groups: Option<&CollisionGroups>) -> u8 {
    let bits = groups.map_or(1, |groups| groups.memberships.bits());
    if bits == 0 {
        return 0;
    }
    bits.trailing_zeros() as u8
}

/// Groups для объекта на `layer` с фильтром по матрице
pub fn layer_groups(matrix: &dyn LayerCollisionMatrix, layer: u8) -> CollisionGroups {
    let filters = platform_link::build_collision_mask(Some(matrix), layer);
    CollisionGroups::new(
        Group::from_bits_truncate(LayerMask::from_layer(layer).bits()),
        Group::from_bits_truncate(filters.bits()),
    )
}

/// Groups для avatar'а local player
pub fn local_player_groups(matrix: &dyn LayerCollisionMatrix) -> CollisionGroups {
    layer_groups(matrix, LOCAL_PLAYER_LAYER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform_link::StaticLayerMatrix;

    #[test]
    fn test_layer_of_uses_lowest_membership_bit() {
        let groups = CollisionGroups::new(Group::GROUP_13 | Group::GROUP_15, Group::ALL);
        assert_eq!(layer_of(Some(&groups)), 12);
    }

    #[test]
    fn test_missing_groups_is_layer_zero() {
        assert_eq!(layer_of(None), 0);
        let empty = CollisionGroups::new(Group::NONE, Group::ALL);
        assert_eq!(layer_of(Some(&empty)), 0);
    }

    #[test]
    fn test_local_player_filters_follow_matrix() {
        let matrix = StaticLayerMatrix::new().with_ignored(LOCAL_PLAYER_LAYER, 4);
        let groups = local_player_groups(&matrix);

        assert_eq!(layer_of(Some(&groups)), LOCAL_PLAYER_LAYER);
        assert!(!groups.filters.contains(Group::GROUP_5));
        assert!(groups.filters.contains(Group::GROUP_1));
    }
}
