//! Интерфейсы хоста (engine collaborators)
//!
//! Ядро не знает про конкретный движок. Всё, что нужно от мира,
//! идёт через эти trait'ы:
//! - `BodyTelemetry`: управляемое тело (pose, velocity, teleport, скорости)
//! - `PhysicsQueryProvider`: sweep вниз + overlap sphere
//! - `TransformLookup`: weak-ссылки на платформы (валидируются при каждом доступе)
//! - `InputSource`: оси движения + run modifier

use bevy::prelude::*;
use thiserror::Error;

use crate::layers::LayerOverrides;

/// Какую tracked pose спрашиваем у тела
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum TrackingKind {
    /// Root аватара (ноги/центр тела в мире)
    AvatarRoot,
    /// Origin tracking space (play area): только для head-tracked режима
    Origin,
}

/// Как выравнивать тело при teleport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum TeleportAlignment {
    /// Pose задаёт root тела
    Body,
    /// Pose задаёт origin tracking space (room), root следует за ним
    Room,
}

/// World pose (позиция + ориентация)
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct TrackedPose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl TrackedPose {
    pub const IDENTITY: TrackedPose = TrackedPose {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }
}

impl Default for TrackedPose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Управляемое тело (avatar) глазами ядра
pub trait BodyTelemetry {
    fn tracked_pose(&self, kind: TrackingKind) -> TrackedPose;
    /// Визуальная ориентация тела (frame для локальной velocity)
    fn rotation(&self) -> Quat;
    fn velocity(&self) -> Vec3;
    fn set_velocity(&mut self, velocity: Vec3);
    fn is_grounded(&self) -> bool;
    fn is_head_tracked(&self) -> bool;
    fn teleport(&mut self, position: Vec3, rotation: Quat, alignment: TeleportAlignment, keep_velocity: bool);
    fn walk_speed(&self) -> f32;
    fn run_speed(&self) -> f32;
    fn strafe_speed(&self) -> f32;
    fn jump_impulse(&self) -> f32;
}

/// Collider, попавший в sweep
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct ColliderRef {
    pub entity: Entity,
    /// Индекс слоя collider'а (0..32)
    pub layer: u8,
    pub overrides: LayerOverrides,
}

/// Rigid body, к которому прикреплён collider
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct RigidBodyRef {
    pub entity: Entity,
    pub overrides: LayerOverrides,
}

/// Кандидат из sweep запроса
///
/// `collider == None`: объект уничтожен во время запроса (кандидат пропускается).
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct SweepHit {
    pub distance: f32,
    pub collider: Option<ColliderRef>,
    pub rigid_body: Option<RigidBodyRef>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("physics query provider is unavailable")]
    Unavailable,

    #[error("physics backend error: {0}")]
    Backend(String),
}

/// Physics query primitives хоста
pub trait PhysicsQueryProvider {
    /// Sphere sweep строго вниз от `origin` на `max_distance`.
    /// Триггеры игнорируются, порядок кандидатов: как отдаёт движок.
    fn sweep_down(
        &self,
        origin: Vec3,
        radius: f32,
        max_distance: f32,
        hits: &mut Vec<SweepHit>,
    ) -> Result<(), QueryError>;

    /// Overlap sphere. `None` в выдаче: невалидный (protected/destroyed) объект.
    fn overlap_sphere(
        &self,
        origin: Vec3,
        radius: f32,
        overlaps: &mut Vec<Option<Entity>>,
    ) -> Result<(), QueryError>;

    /// Синхронизировать transforms с physics после teleport (по умолчанию no-op)
    fn sync_transforms(&self) {}
}

/// Weak lookup платформ: None если объект больше не существует
pub trait TransformLookup {
    fn world_transform(&self, entity: Entity) -> Option<Transform>;
}

/// Снимок input за кадр
#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub struct MoveInput {
    /// Strafe ось [-1, 1]
    pub horizontal: f32,
    /// Forward ось [-1, 1]
    pub vertical: f32,
    /// Run modifier зажат
    pub run_held: bool,
}

pub trait InputSource {
    fn move_input(&self) -> MoveInput;
}

impl InputSource for MoveInput {
    fn move_input(&self) -> MoveInput {
        *self
    }
}

/// Кэш input событий
///
/// Хост присылает оси событиями (по одному значению за раз),
/// контроллер читает последнее значение каждый кадр.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct InputLatch {
    horizontal: f32,
    vertical: f32,
    run_held: bool,
}

impl InputLatch {
    pub fn on_move_horizontal(&mut self, value: f32) {
        self.horizontal = clamp_axis(value);
    }

    pub fn on_move_vertical(&mut self, value: f32) {
        self.vertical = clamp_axis(value);
    }

    pub fn set_run_held(&mut self, held: bool) {
        self.run_held = held;
    }
}

impl InputSource for InputLatch {
    fn move_input(&self) -> MoveInput {
        MoveInput {
            horizontal: self.horizontal,
            vertical: self.vertical,
            run_held: self.run_held,
        }
    }
}

fn clamp_axis(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_latch_keeps_last_value() {
        let mut latch = InputLatch::default();
        latch.on_move_horizontal(0.5);
        latch.on_move_vertical(-0.25);
        latch.on_move_vertical(1.0);
        latch.set_run_held(true);

        let input = latch.move_input();
        assert_eq!(input.horizontal, 0.5);
        assert_eq!(input.vertical, 1.0);
        assert!(input.run_held);
    }

    #[test]
    fn test_input_latch_clamps_axes() {
        let mut latch = InputLatch::default();
        latch.on_move_horizontal(3.0);
        latch.on_move_vertical(f32::NAN);

        let input = latch.move_input();
        assert_eq!(input.horizontal, 1.0);
        assert_eq!(input.vertical, 0.0);
    }
}
