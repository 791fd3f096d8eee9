//! Pose math: world ↔ local пространства платформы, yaw-only ориентация

use bevy::prelude::*;

use crate::host::TrackedPose;

/// Forward направление тела (Bevy convention: -Z)
pub const FORWARD: Vec3 = Vec3::NEG_Z;

/// Горизонтальные направления короче этого считаются вырожденными
const MIN_FLAT_LENGTH_SQ: f32 = 1.0e-10;

/// Local точка платформы → world (с учётом scale)
pub fn to_world_point(platform: &Transform, local: Vec3) -> Vec3 {
    platform.transform_point(local)
}

/// World точка → local пространство платформы
pub fn to_local_point(platform: &Transform, world: Vec3) -> Vec3 {
    platform.compute_affine().inverse().transform_point3(world)
}

/// Local направление → world (только rotation, scale не влияет)
pub fn to_world_direction(platform: &Transform, local: Vec3) -> Vec3 {
    platform.rotation * local
}

pub fn to_local_direction(platform: &Transform, world: Vec3) -> Vec3 {
    platform.rotation.inverse() * world
}

/// Yaw-only ориентация, смотрящая вдоль `direction` спроецированного на горизонталь
///
/// Pitch/roll наклонённой платформы отбрасываются. None если проекция вырождена
/// (направление почти вертикально).
pub fn yaw_rotation(direction: Vec3) -> Option<Quat> {
    let flat = Vec3::new(direction.x, 0.0, direction.z);
    if !flat.is_finite() || flat.length_squared() <= MIN_FLAT_LENGTH_SQ {
        return None;
    }
    // R_y(θ) · (-Z) = (-sin θ, 0, -cos θ)
    Some(Quat::from_rotation_y(f32::atan2(-flat.x, -flat.z)))
}

/// Pose `child` в системе координат `parent`
pub fn relative_pose(parent: TrackedPose, child: TrackedPose) -> TrackedPose {
    let inv = parent.rotation.inverse();
    TrackedPose {
        position: inv * (child.position - parent.position),
        rotation: inv * child.rotation,
    }
}

/// Обратная к `relative_pose`: local pose относительно `parent` → world
pub fn compose_pose(parent: TrackedPose, local: TrackedPose) -> TrackedPose {
    TrackedPose {
        position: parent.position + parent.rotation * local.position,
        rotation: parent.rotation * local.rotation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn approx_vec(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1.0e-4
    }

    #[test]
    fn test_point_roundtrip_with_scale() {
        let platform = Transform::from_xyz(5.0, 1.0, -2.0)
            .with_rotation(Quat::from_rotation_y(0.7))
            .with_scale(Vec3::new(2.0, 1.0, 0.5));
        let world = Vec3::new(6.0, 2.0, -1.0);

        let local = to_local_point(&platform, world);
        assert!(approx_vec(to_world_point(&platform, local), world));
    }

    #[test]
    fn test_direction_ignores_scale() {
        let platform = Transform::from_rotation(Quat::from_rotation_y(FRAC_PI_2)).with_scale(Vec3::splat(3.0));

        let world = to_world_direction(&platform, FORWARD);
        assert!(approx_vec(world, Vec3::NEG_X));
        assert!(approx_vec(to_local_direction(&platform, world), FORWARD));
    }

    #[test]
    fn test_yaw_rotation_looks_along_direction() {
        let rotation = yaw_rotation(Vec3::new(1.0, 0.0, 0.0)).unwrap();
        assert!(approx_vec(rotation * FORWARD, Vec3::X));

        let rotation = yaw_rotation(FORWARD).unwrap();
        assert!(approx_vec(rotation * FORWARD, FORWARD));
    }

    #[test]
    fn test_yaw_rotation_drops_pitch() {
        // Направление с наклоном вверх: результат всё равно горизонтальный
        let rotation = yaw_rotation(Vec3::new(0.0, 0.8, -0.6)).unwrap();
        let forward = rotation * FORWARD;
        assert!(forward.y.abs() < 1.0e-5);
        assert!(approx_vec(forward, FORWARD));
    }

    #[test]
    fn test_yaw_rotation_degenerate() {
        assert!(yaw_rotation(Vec3::Y).is_none());
        assert!(yaw_rotation(Vec3::ZERO).is_none());
    }

    #[test]
    fn test_relative_compose_roundtrip() {
        let parent = TrackedPose::new(Vec3::new(1.0, 0.0, 3.0), Quat::from_rotation_y(1.2));
        let child = TrackedPose::new(Vec3::new(-2.0, 1.5, 0.5), Quat::from_rotation_y(-0.4));

        let restored = compose_pose(parent, relative_pose(parent, child));
        assert!(approx_vec(restored.position, child.position));
        assert!(restored.rotation.angle_between(child.rotation) < 1.0e-3);
    }
}
