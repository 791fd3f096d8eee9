//! Property-based тесты детерминизма
//!
//! Проверяем что прогон platform link с одинаковым seed даёт идентичные результаты

use bevy::prelude::*;
use platform_link::headless::{HeadlessBody, HeadlessScene};
use platform_link::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const PLATFORM_LAYER: u8 = 12;
const DT: f32 = 1.0 / 64.0;

#[test]
fn test_determinism_same_seed() {
    const SEED: u64 = 12345;
    const TICK_COUNT: usize = 1000;

    let snapshot1 = run_simulation(SEED, TICK_COUNT);
    let snapshot2 = run_simulation(SEED, TICK_COUNT);

    assert_eq!(
        snapshot1, snapshot2,
        "Прогон с одинаковым seed ({}) дал разные результаты!",
        SEED
    );
}

#[test]
fn test_determinism_multiple_runs() {
    const SEED: u64 = 42;
    const TICK_COUNT: usize = 1000;

    let snapshots: Vec<_> = (0..5).map(|_| run_simulation(SEED, TICK_COUNT)).collect();

    for (i, snapshot) in snapshots.iter().enumerate().skip(1) {
        assert_eq!(
            snapshots[0], *snapshot,
            "Прогон {} дал результат отличный от прогона 0",
            i
        );
    }
}

/// Scripted прогон: платформа дрейфует, sweep иногда теряет её, input случайный.
/// Возвращает байтовый snapshot pose/velocity тела + лог переходов.
fn run_simulation(seed: u64, tick_count: usize) -> Vec<u8> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let platform = Entity::from_raw(1);
    let mut scene = HeadlessScene::new();
    scene.insert_transform(platform, Transform::default());
    scene.set_overlaps(vec![Some(Entity::from_raw(99))]);

    let hit = SweepHit {
        distance: 0.23,
        collider: Some(ColliderRef {
            entity: Entity::from_raw(2),
            layer: PLATFORM_LAYER,
            overrides: LayerOverrides::NONE,
        }),
        rigid_body: Some(RigidBodyRef {
            entity: platform,
            overrides: LayerOverrides::NONE,
        }),
    };

    let config = PlatformLinkConfig::new(LayerMask::from_layer(PLATFORM_LAYER));
    let mut controller = PlatformLinkController::new(config, Some(&StaticLayerMatrix::new()));
    let mut body = HeadlessBody::default();
    let mut snapshot = Vec::new();

    for _ in 0..tick_count {
        if let Some(transform) = scene.transform_mut(platform) {
            transform.translation += Vec3::new(rng.gen_range(-0.05..0.05), 0.0, rng.gen_range(-0.05..0.05));
            transform.rotation = Quat::from_rotation_y(rng.gen_range(-0.02..0.02)) * transform.rotation;
        }
        if rng.gen_bool(0.95) {
            scene.set_sweep_hits(vec![hit]);
        } else {
            scene.clear_sweep_hits();
        }
        body.grounded = rng.gen_bool(0.9);

        let input = MoveInput {
            horizontal: rng.gen_range(-1.0..1.0),
            vertical: rng.gen_range(-1.0..1.0),
            run_held: rng.gen_bool(0.3),
        };

        let report = controller.tick(&mut body, &scene, &scene, &input, DT);
        snapshot.push(transition_tag(report.transition));
    }

    for value in [
        body.root.position.x,
        body.root.position.y,
        body.root.position.z,
        body.velocity.x,
        body.velocity.y,
        body.velocity.z,
    ] {
        snapshot.extend_from_slice(&value.to_le_bytes());
    }
    snapshot
}

fn transition_tag(transition: LinkTransition) -> u8 {
    match transition {
        LinkTransition::Idle => 0,
        LinkTransition::Linked { .. } => 1,
        LinkTransition::Held { .. } => 2,
        LinkTransition::Relinked { .. } => 3,
        LinkTransition::Debouncing { .. } => 4,
        LinkTransition::Released { .. } => 5,
        LinkTransition::DockedRelease { .. } => 6,
    }
}
