//! Platform Link Core
//!
//! Moving-platform attachment для avatar контроллера:
//! тело на движущейся платформе повторяет её движение каждый кадр,
//! а при сходе отпускается с инерцией платформы.
//!
//! Архитектура (leaf-first):
//! - layers: Collision Mask Builder + include/exclude overrides
//! - resolver: Platform Resolver (sweep + ручная фильтрация слоёв)
//! - station: Station Guard (docked → link подавлен)
//! - link: Link State Controller (FSM + unlink debounce)
//! - compositor: Motion Compositor (pose тела от платформы + input)
//! - controller: всё вместе, один `tick` на кадр
//!
//! Движок подключается через trait'ы из `host` (см. bridge crate для Rapier).

use bevy::prelude::*;

pub mod compositor;
pub mod config;
pub mod controller;
pub mod events;
pub mod headless;
pub mod host;
pub mod layers;
pub mod link;
pub mod logger;
pub mod pose;
pub mod resolver;
pub mod station;

// Re-export основных типов
pub use compositor::{blend_velocity, platform_velocity, CompositeOutcome, MotionCompositor};
pub use config::{ConfigError, PlatformLinkConfig, UNLINK_DEBOUNCE};
pub use controller::{FrameReport, PlatformLinkController};
pub use events::{transition_events, PlatformLinked, PlatformReleased};
pub use host::{
    BodyTelemetry, ColliderRef, InputLatch, InputSource, MoveInput, PhysicsQueryProvider, QueryError,
    RigidBodyRef, SweepHit, TeleportAlignment, TrackedPose, TrackingKind, TransformLookup,
};
pub use layers::{
    build_collision_mask, LayerCollisionMatrix, LayerMask, LayerOverrides, StaticLayerMatrix, LOCAL_PLAYER_LAYER,
    LOCAL_PLAYER_MASK,
};
pub use link::{LinkAnchor, LinkState, LinkStateController, LinkTransition};
pub use logger::{init_logger, log, log_error, log_info, log_warning, set_log_level, LogLevel, LogPrinter};
pub use resolver::{PlatformHit, PlatformResolver};
pub use station::StationGuard;

/// Plugin: регистрирует события и reflect-типы platform link
///
/// Сами системы кадра живут в host bridge (знают про конкретную физику).
pub struct PlatformLinkPlugin;

impl Plugin for PlatformLinkPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<PlatformLinked>()
            .add_event::<PlatformReleased>()
            .register_type::<LayerOverrides>()
            .register_type::<InputLatch>();
    }
}

/// Создаёт minimal Bevy App для headless режима
pub fn create_headless_app() -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins).add_plugins(PlatformLinkPlugin);

    app
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_app_registers_link_events() {
        let mut app = create_headless_app();
        app.update();

        assert!(app.world().contains_resource::<Events<PlatformLinked>>());
        assert!(app.world().contains_resource::<Events<PlatformReleased>>());
    }
}
