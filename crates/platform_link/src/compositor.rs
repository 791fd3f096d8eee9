//! Motion Compositor: новая pose тела пока Linked
//!
//! Работает ДО повторного резолва платформы (т.е. по платформе прошлого кадра):
//! 1. teleport_point = платформа(last_local_pos) + собственное смещение тела за кадр
//! 2. teleport_rot = yaw от heading на платформе × собственный поворот тела за кадр
//!    (pitch/roll платформы в ориентацию тела не протекают)
//! 3. Teleport вместо инкрементального движения (physics не борется с платформой)
//! 4. Velocity: input управляет горизонталью, в воздухе без input: сохраняем инерцию
//! 5. Скорость платформы за кадр (для inheritance при release)
//! 6. Recapture anchor на следующий кадр

use bevy::prelude::*;

use crate::host::{BodyTelemetry, MoveInput, PhysicsQueryProvider, TeleportAlignment, TrackingKind};
use crate::link::LinkAnchor;
use crate::pose::{to_local_direction, to_local_point, to_world_direction, to_world_point, yaw_rotation, FORWARD};

/// Оси input ближе к нулю считаются неактивными
const AXIS_DEAD_ZONE: f32 = f32::EPSILON * 8.0;

/// Результат композиции за кадр
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct CompositeOutcome {
    pub teleport_point: Vec3,
    pub teleport_rotation: Quat,
    /// Скорость тела после композиции (world)
    pub velocity: Vec3,
    /// (platform.pos - last_platform_pos) / dt
    pub platform_velocity: Vec3,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MotionCompositor;

impl MotionCompositor {
    pub fn composite<B, P>(
        &self,
        anchor: &mut LinkAnchor,
        platform: &Transform,
        body: &mut B,
        physics: &P,
        input: MoveInput,
        dt: f32,
    ) -> CompositeOutcome
    where
        B: BodyTelemetry + ?Sized,
        P: PhysicsQueryProvider + ?Sized,
    {
        let root = body.tracked_pose(TrackingKind::AvatarRoot);

        let teleport_point = to_world_point(platform, anchor.last_local_pos) + (root.position - anchor.last_world_pos);

        let heading = to_world_direction(platform, anchor.last_local_heading);
        // Платформа перевёрнута на 90° → heading вертикален, берём yaw прошлого кадра
        let yaw = yaw_rotation(heading)
            .or_else(|| yaw_rotation(anchor.last_world_rot * FORWARD))
            .unwrap_or(Quat::IDENTITY);
        let teleport_rotation = (yaw * (root.rotation * anchor.last_world_rot.inverse())).normalize();

        let current_velocity = body.velocity();

        let (forward_speed, strafe_speed) = if body.is_head_tracked() {
            // Room alignment: двигаем origin так, чтобы голова осталась непрерывной
            let origin = body.tracked_pose(TrackingKind::Origin);
            let inv_root = root.rotation.inverse();
            body.teleport(
                teleport_point + teleport_rotation * inv_root * (origin.position - root.position),
                teleport_rotation * (inv_root * origin.rotation),
                TeleportAlignment::Room,
                true,
            );

            (body.run_speed() * input.vertical, body.strafe_speed() * input.horizontal)
        } else {
            body.teleport(teleport_point, teleport_rotation, TeleportAlignment::Body, true);

            let forward = if input.run_held { body.run_speed() } else { body.walk_speed() };
            (forward * input.vertical, body.strafe_speed() * input.horizontal)
        };

        let velocity = blend_velocity(
            current_velocity,
            body.rotation(),
            input,
            forward_speed,
            strafe_speed,
            body.is_grounded(),
            body.jump_impulse(),
        );
        body.set_velocity(velocity);

        anchor.last_world_pos = teleport_point;
        anchor.last_local_pos = to_local_point(platform, teleport_point);
        anchor.last_world_rot = teleport_rotation;
        anchor.last_local_heading = to_local_direction(platform, teleport_rotation * FORWARD);

        let platform_velocity = platform_velocity(anchor.last_platform_pos, platform.translation, dt);
        anchor.last_platform_pos = platform.translation;

        physics.sync_transforms();

        CompositeOutcome {
            teleport_point,
            teleport_rotation,
            velocity,
            platform_velocity,
        }
    }
}

/// Скорость платформы за кадр. dt <= 0 → ноль.
pub fn platform_velocity(last_position: Vec3, position: Vec3, dt: f32) -> Vec3 {
    if dt > 0.0 {
        (position - last_position) / dt
    } else {
        Vec3::ZERO
    }
}

/// Новая world velocity тела
///
/// По каждой горизонтальной оси: нет input И в воздухе → сохраняем local компонент
/// (прыжок с платформы сохраняет инерцию), иначе скорость из input.
/// Вертикаль: clamp сверху jump impulse, вниз без ограничений.
pub fn blend_velocity(
    world_velocity: Vec3,
    body_rotation: Quat,
    input: MoveInput,
    forward_speed: f32,
    strafe_speed: f32,
    grounded: bool,
    jump_impulse: f32,
) -> Vec3 {
    let local = body_rotation.inverse() * world_velocity;

    let x = if axis_idle(input.horizontal) && !grounded {
        local.x
    } else {
        strafe_speed
    };
    // Forward = -Z
    let z = if axis_idle(input.vertical) && !grounded {
        local.z
    } else {
        -forward_speed
    };
    let y = world_velocity.y.min(jump_impulse);

    body_rotation * Vec3::new(x, y, z)
}

fn axis_idle(value: f32) -> bool {
    value.abs() < AXIS_DEAD_ZONE
}
