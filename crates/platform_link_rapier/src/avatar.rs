//! Kinematic avatar для local player
//!
//! Архитектура:
//! - Rapier для коллизий и ground raycast (RigidBody::KinematicPositionBased)
//! - Custom velocity integration (не используем Rapier forces)
//! - Пока тело linked, горизонтальную скорость задаёт Motion Compositor
//!
//! `AvatarTelemetry` отдаёт ядру доступ к телу на время одного tick'а.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use platform_link::pose::{compose_pose, relative_pose};
use platform_link::{
    BodyTelemetry, InputLatch, InputSource, LayerCollisionMatrix, MoveInput, PlatformLinkConfig,
    PlatformLinkController, TeleportAlignment, TrackedPose, TrackingKind,
};

use crate::collision_layers::local_player_groups;

/// Kinematic тело avatar'а
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct AvatarBody {
    pub velocity: Vec3,
    /// m/s
    pub walk_speed: f32,
    pub run_speed: f32,
    pub strafe_speed: f32,
    /// Потолок вертикальной скорости пока linked
    pub jump_impulse: f32,
    /// m/s²
    pub gravity: f32,
    pub grounded: bool,
    /// Насколько ниже root ещё считаемся на земле
    pub ground_probe: f32,
}

impl Default for AvatarBody {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            walk_speed: 2.0,
            run_speed: 4.0,
            strafe_speed: 2.0,
            jump_impulse: 3.5,
            gravity: -9.81,
            grounded: false,
            ground_probe: 0.1,
        }
    }
}

/// Head-tracked режим: origin tracking space (play area) в мире
///
/// Есть компонент → тело head-tracked, teleport идёт через room alignment.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct TrackingRig {
    pub origin: Transform,
}

/// Доступ ядра к телу на один tick
pub struct AvatarTelemetry<'a> {
    transform: &'a mut Transform,
    body: &'a mut AvatarBody,
    rig: Option<&'a mut TrackingRig>,
}

impl<'a> AvatarTelemetry<'a> {
    pub fn new(transform: &'a mut Transform, body: &'a mut AvatarBody, rig: Option<&'a mut TrackingRig>) -> Self {
        Self { transform, body, rig }
    }

    fn root(&self) -> TrackedPose {
        TrackedPose::new(self.transform.translation, self.transform.rotation)
    }
}

fn set_pose(transform: &mut Transform, pose: TrackedPose) {
    transform.translation = pose.position;
    transform.rotation = pose.rotation;
}

impl BodyTelemetry for AvatarTelemetry<'_> {
    fn tracked_pose(&self, kind: TrackingKind) -> TrackedPose {
        match (kind, self.rig.as_deref()) {
            (TrackingKind::Origin, Some(rig)) => TrackedPose::new(rig.origin.translation, rig.origin.rotation),
            _ => self.root(),
        }
    }

    fn rotation(&self) -> Quat {
        self.transform.rotation
    }

    fn velocity(&self) -> Vec3 {
        self.body.velocity
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        self.body.velocity = velocity;
    }

    fn is_grounded(&self) -> bool {
        self.body.grounded
    }

    fn is_head_tracked(&self) -> bool {
        self.rig.is_some()
    }

    fn teleport(&mut self, position: Vec3, rotation: Quat, alignment: TeleportAlignment, keep_velocity: bool) {
        let target = TrackedPose::new(position, rotation);
        let root = self.root();

        match (alignment, self.rig.as_deref_mut()) {
            (TeleportAlignment::Room, Some(rig)) => {
                let origin = TrackedPose::new(rig.origin.translation, rig.origin.rotation);
                let root_in_origin = relative_pose(origin, root);
                set_pose(&mut rig.origin, target);
                set_pose(self.transform, compose_pose(target, root_in_origin));
            }
            (_, Some(rig)) => {
                let origin = TrackedPose::new(rig.origin.translation, rig.origin.rotation);
                let origin_in_root = relative_pose(root, origin);
                set_pose(&mut rig.origin, compose_pose(target, origin_in_root));
                set_pose(self.transform, target);
            }
            (_, None) => set_pose(self.transform, target),
        }

        if !keep_velocity {
            self.body.velocity = Vec3::ZERO;
        }
    }

    fn walk_speed(&self) -> f32 {
        self.body.walk_speed
    }

    fn run_speed(&self) -> f32 {
        self.body.run_speed
    }

    fn strafe_speed(&self) -> f32 {
        self.body.strafe_speed
    }

    fn jump_impulse(&self) -> f32 {
        self.body.jump_impulse
    }
}

/// Горизонтальная скорость от input (мировая), Y не трогаем
pub fn input_velocity(rotation: Quat, input: MoveInput, body: &AvatarBody) -> Vec3 {
    let forward_speed = if input.run_held { body.run_speed } else { body.walk_speed };
    let forward = rotation * Vec3::NEG_Z * (input.vertical * forward_speed);
    let strafe = rotation * Vec3::X * (input.horizontal * body.strafe_speed);

    let mut velocity = forward + strafe;
    velocity.y = 0.0;
    velocity
}

/// Система ground detection через Rapier raycast
///
/// Нет RapierContext → grounded не меняем.
pub fn avatar_ground_detection(
    rapier_context: ReadRapierContext,
    mut query: Query<(Entity, &Transform, &mut AvatarBody)>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, transform, mut body) in query.iter_mut() {
        // Старт чуть выше root, чтобы не стартовать внутри пола
        let lift = 0.05;
        let origin = transform.translation + Vec3::Y * lift;
        let filter = QueryFilter::new().exclude_sensors().exclude_rigid_body(entity);

        let hit = context.cast_ray(origin, Vec3::NEG_Y, body.ground_probe + lift, true, filter);
        body.grounded = hit.is_some() && body.velocity.y <= 0.0;
    }
}

/// Input → velocity для свободного тела (linked тело ведёт compositor)
pub fn apply_avatar_input(
    mut query: Query<(&InputLatch, &Transform, &mut AvatarBody, Option<&PlatformLinkController>)>,
) {
    for (input, transform, mut body, link) in query.iter_mut() {
        if link.is_some_and(PlatformLinkController::is_linked) {
            continue;
        }
        let horizontal = input_velocity(transform.rotation, input.move_input(), &body);
        body.velocity.x = horizontal.x;
        body.velocity.z = horizontal.z;
    }
}

/// Gravity для тела в воздухе, на земле гасим падение
pub fn apply_avatar_gravity(mut query: Query<&mut AvatarBody>, time: Res<Time<Fixed>>) {
    let delta = time.delta_secs();

    for mut body in query.iter_mut() {
        if body.grounded {
            body.velocity.y = body.velocity.y.max(0.0);
        } else {
            body.velocity.y += body.gravity * delta;
        }
    }
}

/// position += velocity * dt
pub fn integrate_avatar_velocity(mut query: Query<(&AvatarBody, &mut Transform)>, time: Res<Time<Fixed>>) {
    let delta = time.delta_secs();

    for (body, mut transform) in query.iter_mut() {
        transform.translation += body.velocity * delta;
    }
}

/// Посадить/высадить avatar из station
///
/// Пока сидит, коллайдер тела выключен и не попадает в overlap Station Guard.
pub fn set_seated(commands: &mut Commands, avatar: Entity, seated: bool) {
    if seated {
        commands.entity(avatar).insert(ColliderDisabled);
    } else {
        commands.entity(avatar).remove::<ColliderDisabled>();
    }
}

/// Spawn helper: avatar local player'а со всем набором компонентов
pub fn spawn_avatar(
    commands: &mut Commands,
    position: Vec3,
    config: PlatformLinkConfig,
    matrix: &dyn LayerCollisionMatrix,
) -> Entity {
    commands
        .spawn((
            Transform::from_translation(position),
            AvatarBody::default(),
            InputLatch::default(),
            PlatformLinkController::new(config, Some(matrix)),
            RigidBody::KinematicPositionBased,
            // Capsule с низом в root: центр на 0.8
            Collider::capsule(Vec3::new(0.0, 0.3, 0.0), Vec3::new(0.0, 1.3, 0.0), 0.3),
            local_player_groups(matrix),
        ))
        .id()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_velocity_forward_is_negative_z() {
        let body = AvatarBody::default();
        let input = MoveInput {
            horizontal: 0.0,
            vertical: 1.0,
            run_held: false,
        };

        let velocity = input_velocity(Quat::IDENTITY, input, &body);
        assert!((velocity - Vec3::new(0.0, 0.0, -2.0)).length() < 1.0e-5, "velocity = {:?}", velocity);
    }

    #[test]
    fn test_input_velocity_run_and_strafe_follow_rotation() {
        let body = AvatarBody::default();
        let input = MoveInput {
            horizontal: 1.0,
            vertical: 1.0,
            run_held: true,
        };
        let rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);

        let velocity = input_velocity(rotation, input, &body);
        // Повёрнуты на 90°: forward → -X, strafe → -Z
        assert!((velocity - Vec3::new(-4.0, 0.0, -2.0)).length() < 1.0e-4, "velocity = {:?}", velocity);
    }

    #[test]
    fn test_body_teleport_carries_rig_origin() {
        let mut transform = Transform::from_xyz(1.0, 0.0, 0.0);
        let mut body = AvatarBody {
            velocity: Vec3::new(1.0, 0.0, 0.0),
            ..default()
        };
        let mut rig = TrackingRig {
            origin: Transform::from_xyz(0.0, 0.0, 0.0),
        };

        {
            let mut telemetry = AvatarTelemetry::new(&mut transform, &mut body, Some(&mut rig));
            assert!(telemetry.is_head_tracked());
            telemetry.teleport(Vec3::new(1.0, 0.0, 5.0), Quat::IDENTITY, TeleportAlignment::Body, true);
        }

        assert_eq!(transform.translation, Vec3::new(1.0, 0.0, 5.0));
        assert_eq!(rig.origin.translation, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(body.velocity, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_room_teleport_moves_root_with_origin() {
        let mut transform = Transform::from_xyz(0.5, 0.0, 0.0);
        let mut body = AvatarBody::default();
        let mut rig = TrackingRig::default();

        {
            let mut telemetry = AvatarTelemetry::new(&mut transform, &mut body, Some(&mut rig));
            telemetry.teleport(Vec3::new(0.0, 2.0, 0.0), Quat::IDENTITY, TeleportAlignment::Room, false);
        }

        assert_eq!(rig.origin.translation, Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(transform.translation, Vec3::new(0.5, 2.0, 0.0));
    }

    #[test]
    fn test_without_rig_origin_is_root() {
        let mut transform = Transform::from_xyz(3.0, 1.0, 0.0);
        let mut body = AvatarBody::default();
        let telemetry = AvatarTelemetry::new(&mut transform, &mut body, None);

        assert!(!telemetry.is_head_tracked());
        assert_eq!(
            telemetry.tracked_pose(TrackingKind::Origin).position,
            Vec3::new(3.0, 1.0, 0.0)
        );
    }
}
