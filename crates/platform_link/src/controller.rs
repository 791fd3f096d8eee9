//! Per-body контроллер: один кадр platform link
//!
//! Порядок за кадр:
//! 1. Station Guard (docked → release без инерции, дальше ничего)
//! 2. Linked → Motion Compositor по платформе прошлого кадра
//! 3. Platform Resolver
//! 4. Link State Controller (link / re-link / hold / debounce / release)

use bevy::prelude::*;

use crate::compositor::{CompositeOutcome, MotionCompositor};
use crate::config::{PlatformLinkConfig, BODY_LAYER};
use crate::host::{BodyTelemetry, InputSource, PhysicsQueryProvider, TrackingKind, TransformLookup};
use crate::layers::{build_collision_mask, LayerCollisionMatrix};
use crate::link::{LinkState, LinkStateController, LinkTransition};
use crate::logger;
use crate::resolver::{PlatformHit, PlatformResolver};
use crate::station::StationGuard;

/// Итог кадра
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub docked: bool,
    /// Some если compositor отработал (тело было Linked и платформа жива)
    pub composite: Option<CompositeOutcome>,
    pub hit: Option<PlatformHit>,
    pub transition: LinkTransition,
}

impl FrameReport {
    fn docked(transition: LinkTransition) -> Self {
        Self {
            docked: true,
            composite: None,
            hit: None,
            transition,
        }
    }

    /// Скорость платформы за кадр (ноль если compositor не работал)
    pub fn platform_velocity(&self) -> Vec3 {
        self.composite.map_or(Vec3::ZERO, |outcome| outcome.platform_velocity)
    }
}

/// Platform link для одного тела
///
/// Владеет LinkState эксклюзивно, никаких shared/global состояний.
#[derive(Component, Debug, Clone)]
pub struct PlatformLinkController {
    config: PlatformLinkConfig,
    resolver: PlatformResolver,
    guard: StationGuard,
    compositor: MotionCompositor,
    link: LinkStateController,
}

impl PlatformLinkController {
    /// Collision mask строится один раз здесь
    pub fn new(config: PlatformLinkConfig, matrix: Option<&dyn LayerCollisionMatrix>) -> Self {
        let resolver = PlatformResolver::new(
            build_collision_mask(matrix, BODY_LAYER),
            config.linkable_layers,
            config.unlink_search_distance,
        );
        logger::log(&format!(
            "PlatformLinkController: collision mask {:#010x}, linkable {:#010x}",
            resolver.collision_mask().bits(),
            config.linkable_layers.bits()
        ));

        Self {
            config,
            resolver,
            guard: StationGuard::default(),
            compositor: MotionCompositor,
            link: LinkStateController::new(config.inherit_velocity_on_release),
        }
    }

    pub fn config(&self) -> &PlatformLinkConfig {
        &self.config
    }

    pub fn state(&self) -> &LinkState {
        self.link.state()
    }

    pub fn is_linked(&self) -> bool {
        self.link.state().is_linked()
    }

    pub fn linked_platform(&self) -> Option<Entity> {
        self.link.state().linked_platform()
    }

    pub fn tick<B, P, T, I>(&mut self, body: &mut B, physics: &P, transforms: &T, input: &I, dt: f32) -> FrameReport
    where
        B: BodyTelemetry + ?Sized,
        P: PhysicsQueryProvider + ?Sized,
        T: TransformLookup + ?Sized,
        I: InputSource + ?Sized,
    {
        let root = body.tracked_pose(TrackingKind::AvatarRoot);

        if self.guard.is_docked(physics, root.position) {
            let transition = self.link.on_docked(body);
            return FrameReport::docked(transition);
        }

        let mut composite = None;
        if let Some(anchor) = self.link.state_mut().anchor_mut() {
            match transforms.world_transform(anchor.platform) {
                Some(platform) => {
                    composite = Some(self.compositor.composite(
                        anchor,
                        &platform,
                        body,
                        physics,
                        input.move_input(),
                        dt,
                    ));
                }
                None => {
                    logger::log(&format!(
                        "PlatformLinkController: platform {:?} is gone, waiting for debounce",
                        anchor.platform
                    ));
                }
            }
        }

        // Резолвим от позиции после teleport
        let origin = body.tracked_pose(TrackingKind::AvatarRoot).position;
        let hit = self.resolver.resolve(physics, origin);

        let mut report = FrameReport {
            docked: false,
            composite,
            hit,
            transition: LinkTransition::Idle,
        };
        report.transition = self
            .link
            .on_resolved(hit, body, transforms, report.platform_velocity(), dt);

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessBody, HeadlessScene};
    use crate::host::{ColliderRef, MoveInput, RigidBodyRef, SweepHit};
    use crate::layers::{LayerMask, LayerOverrides, StaticLayerMatrix, LOCAL_PLAYER_LAYER};

    const PLATFORM_LAYER: u8 = 12;

    fn platform_scene(platform: Entity, overrides: LayerOverrides) -> HeadlessScene {
        let mut scene = HeadlessScene::new();
        scene.insert_transform(platform, Transform::IDENTITY);
        scene.set_overlaps(vec![Some(Entity::from_raw(99))]);
        scene.set_sweep_hits(vec![SweepHit {
            distance: 0.3,
            collider: Some(ColliderRef {
                entity: Entity::from_raw(2),
                layer: PLATFORM_LAYER,
                overrides,
            }),
            rigid_body: Some(RigidBodyRef {
                entity: platform,
                overrides: LayerOverrides::NONE,
            }),
        }]);
        scene
    }

    #[test]
    fn test_collision_mask_built_from_matrix() {
        let matrix = StaticLayerMatrix::new().with_ignored(LOCAL_PLAYER_LAYER, PLATFORM_LAYER);
        let config = PlatformLinkConfig::new(LayerMask::from_layer(PLATFORM_LAYER));
        let controller = PlatformLinkController::new(config, Some(&matrix));

        assert_eq!(controller.config(), &config);
        assert!(!controller.resolver.collision_mask().contains_layer(PLATFORM_LAYER));
        assert!(controller.resolver.collision_mask().contains_layer(0));
    }

    #[test]
    fn test_ignored_layer_links_only_with_include_override() {
        let platform = Entity::from_raw(1);
        let matrix = StaticLayerMatrix::new().with_ignored(LOCAL_PLAYER_LAYER, PLATFORM_LAYER);
        let config = PlatformLinkConfig::new(LayerMask::from_layer(PLATFORM_LAYER));
        let input = MoveInput::default();

        let mut controller = PlatformLinkController::new(config, Some(&matrix));
        let scene = platform_scene(platform, LayerOverrides::NONE);
        let report = controller.tick(&mut HeadlessBody::default(), &scene, &scene, &input, 0.016);
        assert_eq!(report.transition, LinkTransition::Idle);

        let mut controller = PlatformLinkController::new(config, Some(&matrix));
        let scene = platform_scene(platform, LayerOverrides::including_local_player());
        let report = controller.tick(&mut HeadlessBody::default(), &scene, &scene, &input, 0.016);
        assert_eq!(report.transition, LinkTransition::Linked { platform });
    }

    #[test]
    fn test_report_carries_platform_velocity() {
        let platform = Entity::from_raw(1);
        let config = PlatformLinkConfig::new(LayerMask::from_layer(PLATFORM_LAYER));
        let mut controller = PlatformLinkController::new(config, Some(&StaticLayerMatrix::new()));
        let mut scene = platform_scene(platform, LayerOverrides::NONE);
        let mut body = HeadlessBody::default();
        let input = MoveInput::default();

        let report = controller.tick(&mut body, &scene, &scene, &input, 0.02);
        assert_eq!(report.platform_velocity(), Vec3::ZERO);

        if let Some(transform) = scene.transform_mut(platform) {
            transform.translation.x += 0.2;
        }
        let report = controller.tick(&mut body, &scene, &scene, &input, 0.02);
        assert!((report.platform_velocity() - Vec3::new(10.0, 0.0, 0.0)).length() < 1.0e-3);
    }
}
