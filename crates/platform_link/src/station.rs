//! Station Guard: сидит ли тело в station (seat/attachment point)
//!
//! Overlap sphere вокруг тела. Хост помечает невидимые collider'ы station
//! как невалидные объекты. Если ВСЕ объекты в overlap невалидны: тело docked.
//!
//! Open question: пустой overlap тоже считается docked
//! (тривиально "все элементы невалидны"). Поведение сохранено намеренно.

use bevy::prelude::*;

use crate::config::{MAX_STATION_OVERLAPS, STATION_PROBE_RADIUS};
use crate::host::PhysicsQueryProvider;
use crate::logger;

#[derive(Debug, Clone)]
pub struct StationGuard {
    radius: f32,
    overlaps: Vec<Option<Entity>>,
}

impl Default for StationGuard {
    fn default() -> Self {
        Self::new(STATION_PROBE_RADIUS)
    }
}

impl StationGuard {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            overlaps: Vec::with_capacity(MAX_STATION_OVERLAPS),
        }
    }

    /// true: тело docked, platform link подавлен
    ///
    /// Provider недоступен → docked (fail safe в Unlinked).
    pub fn is_docked<P: PhysicsQueryProvider + ?Sized>(&mut self, physics: &P, body_position: Vec3) -> bool {
        self.overlaps.clear();

        if let Err(err) = physics.overlap_sphere(body_position, self.radius, &mut self.overlaps) {
            logger::log_warning(&format!("StationGuard: overlap failed ({}), treating as docked", err));
            return true;
        }

        self.overlaps
            .iter()
            .take(MAX_STATION_OVERLAPS)
            .all(|overlap| overlap.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessScene;

    #[test]
    fn test_valid_overlap_means_not_docked() {
        let mut scene = HeadlessScene::new();
        scene.set_overlaps(vec![None, Some(Entity::from_raw(4)), None]);

        assert!(!StationGuard::default().is_docked(&scene, Vec3::ZERO));
    }

    #[test]
    fn test_only_invalid_overlaps_means_docked() {
        let mut scene = HeadlessScene::new();
        scene.set_overlaps(vec![None, None]);

        assert!(StationGuard::default().is_docked(&scene, Vec3::ZERO));
    }

    #[test]
    fn test_empty_overlap_means_docked() {
        let scene = HeadlessScene::new();
        assert!(StationGuard::default().is_docked(&scene, Vec3::ZERO));
    }

    #[test]
    fn test_unavailable_provider_means_docked() {
        let mut scene = HeadlessScene::new();
        scene.set_overlaps(vec![Some(Entity::from_raw(1))]);
        scene.set_available(false);

        assert!(StationGuard::default().is_docked(&scene, Vec3::ZERO));
    }

    #[test]
    fn test_overlaps_past_cap_ignored() {
        let mut scene = HeadlessScene::new();
        let mut overlaps = vec![None; MAX_STATION_OVERLAPS];
        overlaps.push(Some(Entity::from_raw(9)));
        scene.set_overlaps(overlaps);

        assert!(StationGuard::default().is_docked(&scene, Vec3::ZERO));
    }
}
