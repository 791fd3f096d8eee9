//! Headless демо platform link
//!
//! Scripted сцена без движка: платформа едет по X, тело стоит на ней,
//! через 2 секунды платформа "исчезает" из sweep и тело отпускается с инерцией.

use bevy::prelude::*;
use platform_link::headless::{HeadlessBody, HeadlessScene};
use platform_link::{
    init_logger, ColliderRef, LayerMask, LayerOverrides, MoveInput, PlatformLinkConfig, PlatformLinkController,
    RigidBodyRef, StaticLayerMatrix, SweepHit,
};

const PLATFORM_LAYER: u8 = 12;
const DT: f32 = 1.0 / 60.0;

fn main() {
    init_logger();

    let platform = Entity::from_raw(1);
    let collider = Entity::from_raw(2);
    let ground_marker = Entity::from_raw(3);

    let mut scene = HeadlessScene::new();
    scene.insert_transform(platform, Transform::from_xyz(0.0, 0.0, 0.0));
    // Валидный объект рядом с телом: не в station
    scene.set_overlaps(vec![Some(ground_marker)]);
    scene.set_sweep_hits(vec![SweepHit {
        distance: 0.23,
        collider: Some(ColliderRef {
            entity: collider,
            layer: PLATFORM_LAYER,
            overrides: LayerOverrides::NONE,
        }),
        rigid_body: Some(RigidBodyRef {
            entity: platform,
            overrides: LayerOverrides::NONE,
        }),
    }]);

    let config = PlatformLinkConfig::new(LayerMask::from_layers(&[PLATFORM_LAYER]));
    let matrix = StaticLayerMatrix::new();
    let mut controller = PlatformLinkController::new(config, Some(&matrix));

    let mut body = HeadlessBody::at(Vec3::new(0.0, 0.5, 0.0));
    let input = MoveInput::default();
    let platform_speed = Vec3::new(3.0, 0.0, 0.0);

    println!(
        "Starting platform link headless demo (linkable {:#010x}, inherit velocity: {})",
        controller.config().linkable_layers.bits(),
        controller.config().inherit_velocity_on_release
    );

    for tick in 0..180 {
        if let Some(transform) = scene.transform_mut(platform) {
            transform.translation += platform_speed * DT;
        }
        if tick == 120 {
            scene.clear_sweep_hits();
        }

        let report = controller.tick(&mut body, &scene, &scene, &input, DT);

        if tick % 30 == 0 || (120..130).contains(&tick) {
            println!(
                "Tick {}: body {:?} platform velocity {:?} linked={} transition={:?}",
                tick,
                body.root.position,
                report.platform_velocity(),
                controller.is_linked(),
                report.transition
            );
        }
    }

    println!("Final body velocity: {:?}", body.velocity);
}
