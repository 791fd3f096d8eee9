//! RapierScene: PhysicsQueryProvider + TransformLookup поверх bevy_rapier3d
//!
//! Живёт один кадр внутри системы, заимствует RapierContext и ECS queries.
//! Sweep исключает avatar (exclude_rigid_body). Overlap avatar'а НЕ исключает:
//! собственный коллайдер тела всегда валиден, поэтому docked только когда
//! он выключен (seated, см. `set_seated`) и рядом одни station коллайдеры.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use platform_link::config::{MAX_STATION_OVERLAPS, MAX_SWEEP_HITS};
use platform_link::{
    ColliderRef, LayerOverrides, PhysicsQueryProvider, QueryError, RigidBodyRef, SweepHit, TransformLookup,
};

use crate::collision_layers::{layer_groups, layer_of};

/// Station/dock коллайдер: в overlap'е считается невалидным объектом
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct StationCollider;

/// Что нужно знать о коллайдере для фильтрации
pub type ColliderData = (
    Option<&'static CollisionGroups>,
    Option<&'static LayerOverrides>,
    Option<&'static ChildOf>,
    Has<RigidBody>,
    Has<StationCollider>,
);

pub struct RapierScene<'a, 'w, 's> {
    context: Option<&'a RapierContext<'a>>,
    colliders: &'a Query<'w, 's, ColliderData, With<Collider>>,
    bodies: &'a Query<'w, 's, Option<&'static LayerOverrides>, With<RigidBody>>,
    transforms: &'a Query<'w, 's, &'static GlobalTransform>,
    avatar: Entity,
}

impl<'a, 'w, 's> RapierScene<'a, 'w, 's> {
    pub fn new(
        context: Option<&'a RapierContext<'a>>,
        colliders: &'a Query<'w, 's, ColliderData, With<Collider>>,
        bodies: &'a Query<'w, 's, Option<&'static LayerOverrides>, With<RigidBody>>,
        transforms: &'a Query<'w, 's, &'static GlobalTransform>,
        avatar: Entity,
    ) -> Self {
        Self {
            context,
            colliders,
            bodies,
            transforms,
            avatar,
        }
    }

    fn context(&self) -> Result<&'a RapierContext<'a>, QueryError> {
        self.context.ok_or(QueryError::Unavailable)
    }

    /// Collider entity → SweepHit (слой, overrides, владеющий rigid body)
    fn describe_hit(&self, entity: Entity, distance: f32) -> SweepHit {
        let Ok((groups, overrides, parent, is_body, _)) = self.colliders.get(entity) else {
            return SweepHit {
                distance,
                collider: None,
                rigid_body: None,
            };
        };

        let owner = if is_body { Some(entity) } else { parent.map(ChildOf::parent) };
        let rigid_body = owner.and_then(|body| {
            self.bodies.get(body).ok().map(|overrides| RigidBodyRef {
                entity: body,
                overrides: overrides.copied().unwrap_or(LayerOverrides::NONE),
            })
        });

        SweepHit {
            distance,
            collider: Some(ColliderRef {
                entity,
                layer: layer_of(groups),
                overrides: overrides.copied().unwrap_or(LayerOverrides::NONE),
            }),
            rigid_body,
        }
    }
}

fn sweep_options(max_distance: f32) -> ShapeCastOptions {
    ShapeCastOptions {
        max_time_of_impact: max_distance,
        target_distance: 0.0,
        stop_at_penetration: true,
        compute_impact_geometry_on_penetration: false,
    }
}

/// Rapier паникует на вырожденных shape, отсекаем заранее
fn check_query(radius: f32, max_distance: f32) -> Result<(), QueryError> {
    if radius.is_finite() && radius > 0.0 && max_distance.is_finite() && max_distance >= 0.0 {
        Ok(())
    } else {
        Err(QueryError::Backend(format!(
            "invalid query shape: radius {}, max distance {}",
            radius, max_distance
        )))
    }
}

impl PhysicsQueryProvider for RapierScene<'_, '_, '_> {
    /// Rapier cast_shape возвращает только первый hit,
    /// поэтому повторяем cast исключая уже найденные коллайдеры
    fn sweep_down(
        &self,
        origin: Vec3,
        radius: f32,
        max_distance: f32,
        hits: &mut Vec<SweepHit>,
    ) -> Result<(), QueryError> {
        check_query(radius, max_distance)?;
        let context = self.context()?;
        let shape = Collider::ball(radius);
        let mut seen: Vec<Entity> = Vec::new();

        while hits.len() < MAX_SWEEP_HITS {
            let cast = {
                let unseen = |entity: Entity| !seen.contains(&entity);
                let filter = QueryFilter::new()
                    .exclude_sensors()
                    .exclude_rigid_body(self.avatar)
                    .predicate(&unseen);
                context.cast_shape(
                    origin,
                    Quat::IDENTITY,
                    Vec3::NEG_Y,
                    &*shape.raw,
                    sweep_options(max_distance),
                    filter,
                )
            };

            let Some((entity, hit)) = cast else {
                break;
            };
            seen.push(entity);
            hits.push(self.describe_hit(entity, hit.time_of_impact));
        }

        Ok(())
    }

    fn overlap_sphere(
        &self,
        origin: Vec3,
        radius: f32,
        overlaps: &mut Vec<Option<Entity>>,
    ) -> Result<(), QueryError> {
        check_query(radius, 0.0)?;
        let context = self.context()?;
        let shape = Collider::ball(radius);
        let filter = QueryFilter::new();

        context.intersect_shape(origin, Quat::IDENTITY, &*shape.raw, filter, |entity| {
            let station = self
                .colliders
                .get(entity)
                .map_or(false, |(.., station)| station);
            overlaps.push(if station { None } else { Some(entity) });
            overlaps.len() < MAX_STATION_OVERLAPS
        });

        Ok(())
    }

    // sync_transforms не переопределяем: после teleport ядро делает только sweep,
    // а он avatar исключает, так что устаревшая поза его коллайдера не видна.
}

impl TransformLookup for RapierScene<'_, '_, '_> {
    fn world_transform(&self, entity: Entity) -> Option<Transform> {
        self.transforms
            .get(entity)
            .ok()
            .map(GlobalTransform::compute_transform)
    }
}

/// Spawn helper: kinematic платформа-box на `layer`
pub fn spawn_platform(
    commands: &mut Commands,
    transform: Transform,
    half_extents: Vec3,
    layer: u8,
    matrix: &dyn platform_link::LayerCollisionMatrix,
) -> Entity {
    commands
        .spawn((
            transform,
            RigidBody::KinematicPositionBased,
            Collider::cuboid(half_extents.x, half_extents.y, half_extents.z),
            layer_groups(matrix, layer),
        ))
        .id()
}
