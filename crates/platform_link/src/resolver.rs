//! Platform Resolver
//!
//! Sweep вниз под телом → фильтрация кандидатов → ближайшая валидная платформа.
//!
//! Sweep/cast примитивы движка НЕ учитывают per-collider include/exclude overrides,
//! поэтому берём всех кандидатов со всех слоёв и фильтруем вручную:
//! 1. Слой коллайдит с телом по матрице → принимаем, если exclude не содержит local player бит
//! 2. Слой НЕ коллайдит → принимаем только при явном opt-in (include & !exclude содержит бит)
//! 3. Из принятых: минимальная distance (при равенстве побеждает первый)
//! 4. Валидна только если слой linkable И есть rigid body

use bevy::prelude::*;

use crate::config::{MAX_SWEEP_HITS, SWEEP_ORIGIN_LIFT, SWEEP_RADIUS};
use crate::host::{PhysicsQueryProvider, SweepHit};
use crate::layers::{LayerMask, LayerOverrides, LOCAL_PLAYER_MASK};
use crate::logger;

/// Найденная платформа
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct PlatformHit {
    /// Transform платформы (rigid body)
    pub platform: Entity,
    pub collider: Entity,
    pub distance: f32,
    pub layer: u8,
}

/// Лучший кандидат во время сканирования
#[derive(Debug, Clone, Copy)]
struct BestCandidate {
    distance: f32,
    collider: Entity,
    rigid_body: Option<Entity>,
    layer: u8,
}

#[derive(Debug, Clone)]
pub struct PlatformResolver {
    collision_mask: LayerMask,
    linkable_layers: LayerMask,
    search_distance: f32,
    hits: Vec<SweepHit>,
}

impl PlatformResolver {
    pub fn new(collision_mask: LayerMask, linkable_layers: LayerMask, search_distance: f32) -> Self {
        Self {
            collision_mask,
            linkable_layers,
            search_distance,
            hits: Vec::with_capacity(MAX_SWEEP_HITS),
        }
    }

    pub fn collision_mask(&self) -> LayerMask {
        self.collision_mask
    }

    /// Ближайшая валидная платформа под `origin` (или None)
    pub fn resolve<P: PhysicsQueryProvider + ?Sized>(
        &mut self,
        physics: &P,
        origin: Vec3,
    ) -> Option<PlatformHit> {
        self.hits.clear();
        let sweep_origin = origin + Vec3::new(0.0, SWEEP_ORIGIN_LIFT, 0.0);

        if let Err(err) = physics.sweep_down(sweep_origin, SWEEP_RADIUS, self.search_distance, &mut self.hits) {
            logger::log_warning(&format!("PlatformResolver: sweep failed ({}), no platform", err));
            return None;
        }
        self.hits.truncate(MAX_SWEEP_HITS);

        let best = select_nearest(&self.hits, self.collision_mask)?;

        if !LayerMask::from_layer(best.layer).intersects(self.linkable_layers) {
            return None;
        }
        // Статика без rigid body никогда не платформа
        let platform = best.rigid_body?;

        Some(PlatformHit {
            platform,
            collider: best.collider,
            distance: best.distance,
            layer: best.layer,
        })
    }
}

/// Ближайший eligible кандидат (до проверки linkable/rigid body)
fn select_nearest(hits: &[SweepHit], collision_mask: LayerMask) -> Option<BestCandidate> {
    let mut best: Option<BestCandidate> = None;

    for hit in hits {
        if hit.distance.is_nan() {
            continue;
        }
        // Не ближе текущего: пропускаем (при равенстве остаётся первый)
        if let Some(current) = best {
            if hit.distance >= current.distance {
                continue;
            }
        }
        let Some(collider) = hit.collider else {
            continue;
        };

        let overrides = match hit.rigid_body {
            Some(body) => collider.overrides.combine(body.overrides),
            None => collider.overrides,
        };

        if !is_eligible(collision_mask, collider.layer, overrides) {
            continue;
        }

        best = Some(BestCandidate {
            distance: hit.distance,
            collider: collider.entity,
            rigid_body: hit.rigid_body.map(|body| body.entity),
            layer: collider.layer,
        });
    }

    best
}

/// Коллайдит ли local player с объектом с учётом overrides
pub fn is_eligible(collision_mask: LayerMask, layer: u8, overrides: LayerOverrides) -> bool {
    if collision_mask.intersects(LayerMask::from_layer(layer)) {
        !overrides.exclude.intersects(LOCAL_PLAYER_MASK)
    } else {
        (overrides.include & !overrides.exclude).intersects(LOCAL_PLAYER_MASK)
    }
}
