//! Link State Controller: FSM Unlinked ⇄ Linked с unlink debounce
//!
//! Переходы (раз в кадр, после Station Guard):
//! - docked → если Linked, release с нулевой скоростью
//! - hit + Unlinked → Linked, только если тело grounded
//! - hit + Linked к той же платформе → сброс unlink_timer
//! - hit + Linked к другой платформе → мгновенный re-link (не release)
//! - нет hit + Linked → unlink_timer += dt, release когда timer > UNLINK_DEBOUNCE
//!
//! Debounce нужен на краях платформ и при одиночных промахах sweep.

use bevy::prelude::*;

use crate::config::UNLINK_DEBOUNCE;
use crate::host::{BodyTelemetry, TrackedPose, TrackingKind, TransformLookup};
use crate::layers::layer_name;
use crate::logger;
use crate::pose::{to_local_direction, to_local_point, FORWARD};
use crate::resolver::PlatformHit;

/// Данные привязки к платформе (существуют только в Linked)
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct LinkAnchor {
    /// Weak handle платформы (валидируется через TransformLookup)
    pub platform: Entity,
    pub last_world_pos: Vec3,
    pub last_world_rot: Quat,
    /// last_world_pos в local space платформы
    pub last_local_pos: Vec3,
    /// Forward тела в local space платформы (направление, не rotation)
    pub last_local_heading: Vec3,
    pub last_platform_pos: Vec3,
    /// Сколько времени платформа не находится резолвером
    pub unlink_timer: f32,
}

impl LinkAnchor {
    /// Захват состояния относительно платформы
    pub fn capture(platform: Entity, platform_transform: &Transform, pose: TrackedPose) -> Self {
        Self {
            platform,
            last_world_pos: pose.position,
            last_world_rot: pose.rotation,
            last_local_pos: to_local_point(platform_transform, pose.position),
            last_local_heading: to_local_direction(platform_transform, pose.rotation * FORWARD),
            last_platform_pos: platform_transform.translation,
            unlink_timer: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub enum LinkState {
    #[default]
    Unlinked,
    Linked(LinkAnchor),
}

impl LinkState {
    pub fn is_linked(&self) -> bool {
        matches!(self, LinkState::Linked(_))
    }

    pub fn linked_platform(&self) -> Option<Entity> {
        match self {
            LinkState::Linked(anchor) => Some(anchor.platform),
            LinkState::Unlinked => None,
        }
    }

    pub fn anchor(&self) -> Option<&LinkAnchor> {
        match self {
            LinkState::Linked(anchor) => Some(anchor),
            LinkState::Unlinked => None,
        }
    }

    pub fn anchor_mut(&mut self) -> Option<&mut LinkAnchor> {
        match self {
            LinkState::Linked(anchor) => Some(anchor),
            LinkState::Unlinked => None,
        }
    }
}

/// Что произошло с link за кадр
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub enum LinkTransition {
    /// Ничего (Unlinked и остался)
    Idle,
    /// Unlinked → Linked
    Linked { platform: Entity },
    /// Linked, платформа найдена, timer сброшен
    Held { platform: Entity },
    /// Переход на другую платформу в том же кадре
    Relinked { from: Entity, to: Entity },
    /// Linked, платформа не найдена, ждём debounce
    Debouncing { platform: Entity, timer: f32 },
    /// Linked → Unlinked по debounce
    Released { platform: Entity, velocity: Vec3 },
    /// Linked → Unlinked из-за station (без инерции)
    DockedRelease { platform: Entity },
}

#[derive(Debug, Clone, Default)]
pub struct LinkStateController {
    state: LinkState,
    inherit_velocity: bool,
}

impl LinkStateController {
    pub fn new(inherit_velocity: bool) -> Self {
        Self {
            state: LinkState::Unlinked,
            inherit_velocity,
        }
    }

    pub fn state(&self) -> &LinkState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut LinkState {
        &mut self.state
    }

    /// Station Guard сказал docked
    pub fn on_docked<B: BodyTelemetry + ?Sized>(&mut self, body: &mut B) -> LinkTransition {
        match self.state.linked_platform() {
            Some(platform) => {
                self.release(body, Vec3::ZERO);
                logger::log_info(&format!("PlatformLink: docked → released from {:?}", platform));
                LinkTransition::DockedRelease { platform }
            }
            None => LinkTransition::Idle,
        }
    }

    /// Применить результат резолвера
    ///
    /// `platform_velocity`: скорость платформы, посчитанная compositor'ом в этом кадре.
    pub fn on_resolved<B, T>(
        &mut self,
        hit: Option<PlatformHit>,
        body: &mut B,
        transforms: &T,
        platform_velocity: Vec3,
        dt: f32,
    ) -> LinkTransition
    where
        B: BodyTelemetry + ?Sized,
        T: TransformLookup + ?Sized,
    {
        // Платформа могла исчезнуть между sweep и lookup: считаем промахом
        let found = hit.and_then(|hit| {
            transforms
                .world_transform(hit.platform)
                .map(|transform| (hit, transform))
        });

        match (found, self.state.linked_platform()) {
            (Some((hit, transform)), None) => {
                if !body.is_grounded() {
                    return LinkTransition::Idle;
                }
                self.link(hit.platform, &transform, body);
                logger::log_info(&format!(
                    "PlatformLink: linked to {:?} (distance {:.3}, {})",
                    hit.platform,
                    hit.distance,
                    layer_name(hit.layer)
                ));
                LinkTransition::Linked { platform: hit.platform }
            }
            (Some((hit, transform)), Some(current)) => {
                if hit.platform == current {
                    if let Some(anchor) = self.state.anchor_mut() {
                        anchor.unlink_timer = 0.0;
                    }
                    LinkTransition::Held { platform: current }
                } else {
                    self.link(hit.platform, &transform, body);
                    logger::log_info(&format!("PlatformLink: relinked {:?} → {:?}", current, hit.platform));
                    LinkTransition::Relinked {
                        from: current,
                        to: hit.platform,
                    }
                }
            }
            (None, Some(current)) => {
                let timer = match self.state.anchor_mut() {
                    Some(anchor) => {
                        anchor.unlink_timer += dt;
                        anchor.unlink_timer
                    }
                    None => 0.0,
                };

                if timer > UNLINK_DEBOUNCE {
                    self.release(body, platform_velocity);
                    logger::log_info(&format!(
                        "PlatformLink: released from {:?} (velocity {:?})",
                        current, platform_velocity
                    ));
                    LinkTransition::Released {
                        platform: current,
                        velocity: platform_velocity,
                    }
                } else {
                    LinkTransition::Debouncing { platform: current, timer }
                }
            }
            (None, None) => LinkTransition::Idle,
        }
    }

    fn link<B: BodyTelemetry + ?Sized>(&mut self, platform: Entity, transform: &Transform, body: &B) {
        let pose = body.tracked_pose(TrackingKind::AvatarRoot);
        self.state = LinkState::Linked(LinkAnchor::capture(platform, transform, pose));
    }

    fn release<B: BodyTelemetry + ?Sized>(&mut self, body: &mut B, velocity: Vec3) {
        self.state = LinkState::Unlinked;
        if self.inherit_velocity {
            let current = body.velocity();
            body.set_velocity(current + velocity);
        }
    }
}
