//! Bevy система platform link: один tick ядра на avatar за кадр
//!
//! Запускается в PostUpdate после Rapier writeback и transform propagation,
//! чтобы платформы уже стояли в позиции этого кадра.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use platform_link::{
    log, transition_events, InputLatch, LayerOverrides, PlatformLinkController, PlatformLinked, PlatformReleased,
};

use crate::avatar::{AvatarBody, AvatarTelemetry, TrackingRig};
use crate::scene::{ColliderData, RapierScene};

#[allow(clippy::too_many_arguments)]
pub fn platform_link_system(
    time: Res<Time>,
    rapier_context: ReadRapierContext,
    colliders: Query<ColliderData, With<Collider>>,
    bodies: Query<Option<&'static LayerOverrides>, With<RigidBody>>,
    platforms: Query<&'static GlobalTransform>,
    mut avatars: Query<(
        Entity,
        &mut PlatformLinkController,
        &mut Transform,
        &mut AvatarBody,
        Option<&mut TrackingRig>,
        &InputLatch,
    )>,
    mut linked_events: EventWriter<PlatformLinked>,
    mut released_events: EventWriter<PlatformReleased>,
) {
    let dt = time.delta_secs();
    // Нет контекста → provider недоступен, ядро отпустит тело как docked
    let context = rapier_context.single().ok();
    if context.is_none() {
        log("platform_link_system: RapierContext not found");
    }

    for (entity, mut controller, mut transform, mut body, mut rig, input) in avatars.iter_mut() {
        let scene = RapierScene::new(context.as_ref(), &colliders, &bodies, &platforms, entity);
        let mut telemetry = AvatarTelemetry::new(&mut transform, &mut body, rig.as_deref_mut());

        let report = controller.tick(&mut telemetry, &scene, &scene, input, dt);

        let (linked, released) = transition_events(entity, report.transition);
        if let Some(event) = linked {
            linked_events.write(event);
        }
        if let Some(event) = released {
            released_events.write(event);
        }
    }
}
