//! Platform link события для хоста (Bevy)

use bevy::prelude::*;

use crate::link::LinkTransition;

/// Тело прилинковалось к платформе (в т.ч. re-link)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct PlatformLinked {
    pub body: Entity,
    pub platform: Entity,
    /// Some(previous) для re-link
    pub previous: Option<Entity>,
}

/// Тело отлинковалось
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct PlatformReleased {
    pub body: Entity,
    pub platform: Entity,
    /// Добавленная скорость (ноль при docking)
    pub velocity: Vec3,
    pub docked: bool,
}

/// Перевод transition кадра в события (если есть что сообщить)
pub fn transition_events(body: Entity, transition: LinkTransition) -> (Option<PlatformLinked>, Option<PlatformReleased>) {
    match transition {
        LinkTransition::Linked { platform } => (
            Some(PlatformLinked {
                body,
                platform,
                previous: None,
            }),
            None,
        ),
        LinkTransition::Relinked { from, to } => (
            Some(PlatformLinked {
                body,
                platform: to,
                previous: Some(from),
            }),
            None,
        ),
        LinkTransition::Released { platform, velocity } => (
            None,
            Some(PlatformReleased {
                body,
                platform,
                velocity,
                docked: false,
            }),
        ),
        LinkTransition::DockedRelease { platform } => (
            None,
            Some(PlatformReleased {
                body,
                platform,
                velocity: Vec3::ZERO,
                docked: true,
            }),
        ),
        LinkTransition::Idle | LinkTransition::Held { .. } | LinkTransition::Debouncing { .. } => (None, None),
    }
}
