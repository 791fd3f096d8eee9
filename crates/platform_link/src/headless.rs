//! Headless хост: scripted реализация всех host trait'ов
//!
//! Без движка и без Rapier. Sweep/overlap отдают заранее заданные кандидаты,
//! платформы: просто таблица transforms. Используется для replay/демо и тестов.

use std::cell::Cell;
use std::collections::HashMap;

use bevy::prelude::*;

use crate::host::{
    BodyTelemetry, PhysicsQueryProvider, QueryError, SweepHit, TeleportAlignment, TrackedPose, TrackingKind,
    TransformLookup,
};
use crate::pose::{compose_pose, relative_pose};

/// Параметры последнего sweep запроса
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepQuery {
    pub origin: Vec3,
    pub radius: f32,
    pub max_distance: f32,
}

/// Scripted physics + transforms
#[derive(Debug, Default)]
pub struct HeadlessScene {
    sweep_hits: Vec<SweepHit>,
    overlaps: Vec<Option<Entity>>,
    transforms: HashMap<Entity, Transform>,
    unavailable: bool,
    last_sweep: Cell<Option<SweepQuery>>,
    sync_count: Cell<u32>,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_sweep_hits(&mut self, hits: Vec<SweepHit>) {
        self.sweep_hits = hits;
    }

    pub fn clear_sweep_hits(&mut self) {
        self.sweep_hits.clear();
    }

    pub fn set_overlaps(&mut self, overlaps: Vec<Option<Entity>>) {
        self.overlaps = overlaps;
    }

    /// Провайдер перестаёт отвечать (оба запроса возвращают Unavailable)
    pub fn set_available(&mut self, available: bool) {
        self.unavailable = !available;
    }

    pub fn insert_transform(&mut self, entity: Entity, transform: Transform) {
        self.transforms.insert(entity, transform);
    }

    pub fn remove_transform(&mut self, entity: Entity) -> Option<Transform> {
        self.transforms.remove(&entity)
    }

    pub fn transform_mut(&mut self, entity: Entity) -> Option<&mut Transform> {
        self.transforms.get_mut(&entity)
    }

    pub fn last_sweep(&self) -> Option<SweepQuery> {
        self.last_sweep.get()
    }

    pub fn sync_count(&self) -> u32 {
        self.sync_count.get()
    }
}

impl PhysicsQueryProvider for HeadlessScene {
    fn sweep_down(
        &self,
        origin: Vec3,
        radius: f32,
        max_distance: f32,
        hits: &mut Vec<SweepHit>,
    ) -> Result<(), QueryError> {
        if self.unavailable {
            return Err(QueryError::Unavailable);
        }
        self.last_sweep.set(Some(SweepQuery {
            origin,
            radius,
            max_distance,
        }));
        hits.extend(self.sweep_hits.iter().filter(|hit| hit.distance <= max_distance).copied());
        Ok(())
    }

    fn overlap_sphere(
        &self,
        _origin: Vec3,
        _radius: f32,
        overlaps: &mut Vec<Option<Entity>>,
    ) -> Result<(), QueryError> {
        if self.unavailable {
            return Err(QueryError::Unavailable);
        }
        overlaps.extend(self.overlaps.iter().copied());
        Ok(())
    }

    fn sync_transforms(&self) {
        self.sync_count.set(self.sync_count.get() + 1);
    }
}

impl TransformLookup for HeadlessScene {
    fn world_transform(&self, entity: Entity) -> Option<Transform> {
        self.transforms.get(&entity).copied()
    }
}

/// Запись teleport вызова
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeleportRecord {
    pub position: Vec3,
    pub rotation: Quat,
    pub alignment: TeleportAlignment,
    pub keep_velocity: bool,
}

/// Scripted тело (root + tracking origin)
#[derive(Debug, Clone)]
pub struct HeadlessBody {
    pub root: TrackedPose,
    /// Origin tracking space (play area)
    pub origin: TrackedPose,
    pub velocity: Vec3,
    pub grounded: bool,
    pub head_tracked: bool,
    pub walk_speed: f32,
    pub run_speed: f32,
    pub strafe_speed: f32,
    pub jump_impulse: f32,
    pub teleports: Vec<TeleportRecord>,
}

impl Default for HeadlessBody {
    fn default() -> Self {
        Self {
            root: TrackedPose::IDENTITY,
            origin: TrackedPose::IDENTITY,
            velocity: Vec3::ZERO,
            grounded: true,
            head_tracked: false,
            walk_speed: 2.0,
            run_speed: 4.0,
            strafe_speed: 2.0,
            jump_impulse: 3.0,
            teleports: Vec::new(),
        }
    }
}

impl HeadlessBody {
    pub fn at(position: Vec3) -> Self {
        Self {
            root: TrackedPose::new(position, Quat::IDENTITY),
            origin: TrackedPose::new(position, Quat::IDENTITY),
            ..Self::default()
        }
    }
}

impl BodyTelemetry for HeadlessBody {
    fn tracked_pose(&self, kind: TrackingKind) -> TrackedPose {
        match kind {
            TrackingKind::AvatarRoot => self.root,
            TrackingKind::Origin => self.origin,
        }
    }

    fn rotation(&self) -> Quat {
        self.root.rotation
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    fn is_grounded(&self) -> bool {
        self.grounded
    }

    fn is_head_tracked(&self) -> bool {
        self.head_tracked
    }

    fn teleport(&mut self, position: Vec3, rotation: Quat, alignment: TeleportAlignment, keep_velocity: bool) {
        let target = TrackedPose::new(position, rotation);
        match alignment {
            TeleportAlignment::Body => {
                let origin_in_root = relative_pose(self.root, self.origin);
                self.root = target;
                self.origin = compose_pose(target, origin_in_root);
            }
            TeleportAlignment::Room => {
                let root_in_origin = relative_pose(self.origin, self.root);
                self.origin = target;
                self.root = compose_pose(target, root_in_origin);
            }
        }
        if !keep_velocity {
            self.velocity = Vec3::ZERO;
        }
        self.teleports.push(TeleportRecord {
            position,
            rotation,
            alignment,
            keep_velocity,
        });
    }

    fn walk_speed(&self) -> f32 {
        self.walk_speed
    }

    fn run_speed(&self) -> f32 {
        self.run_speed
    }

    fn strafe_speed(&self) -> f32 {
        self.strafe_speed
    }

    fn jump_impulse(&self) -> f32 {
        self.jump_impulse
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_teleport_moves_root_with_origin() {
        let mut body = HeadlessBody::default();
        body.origin = TrackedPose::new(Vec3::new(0.0, 0.0, 0.0), Quat::IDENTITY);
        body.root = TrackedPose::new(Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY);

        body.teleport(Vec3::new(0.0, 0.0, 5.0), Quat::IDENTITY, TeleportAlignment::Room, false);

        assert_eq!(body.origin.position, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(body.root.position, Vec3::new(1.0, 0.0, 5.0));
        assert_eq!(body.velocity, Vec3::ZERO);
    }

    #[test]
    fn test_sweep_respects_max_distance() {
        let mut scene = HeadlessScene::new();
        scene.set_sweep_hits(vec![
            SweepHit {
                distance: 0.5,
                collider: None,
                rigid_body: None,
            },
            SweepHit {
                distance: 20.0,
                collider: None,
                rigid_body: None,
            },
        ]);

        let mut hits = Vec::new();
        scene.sweep_down(Vec3::ZERO, 0.18, 10.0, &mut hits).unwrap();
        assert_eq!(hits.len(), 1);
    }
}
