//! Platform Link ↔ bevy_rapier3d bridge
//!
//! - `RapierScene`: PhysicsQueryProvider + TransformLookup поверх RapierContext
//! - `AvatarBody`: kinematic тело local player (gravity, ground raycast, input)
//! - `platform_link_system`: tick ядра на каждый avatar, события link/release
//!
//! RapierPhysicsPlugin добавляет сам host app.

use bevy::prelude::*;
use bevy::transform::TransformSystem;
use bevy_rapier3d::plugin::PhysicsSet;
use platform_link::logger::set_logger_if_needed;
use platform_link::PlatformLinkPlugin;

pub mod avatar;
pub mod collision_layers;
pub mod link_system;
pub mod logger;
pub mod scene;

pub use avatar::{
    apply_avatar_gravity, apply_avatar_input, avatar_ground_detection, input_velocity, integrate_avatar_velocity,
    set_seated, spawn_avatar, AvatarBody, AvatarTelemetry, TrackingRig,
};
pub use collision_layers::{layer_groups, layer_of, local_player_groups};
pub use link_system::platform_link_system;
pub use logger::FileLogger;
pub use scene::{spawn_platform, RapierScene, StationCollider};

/// Plugin: avatar movement (FixedUpdate) + platform link (PostUpdate)
///
/// Включает `PlatformLinkPlugin`, отдельно его добавлять не нужно.
pub struct PlatformLinkRapierPlugin {
    /// Файл лога, None → только ядро/stdout
    pub log_file: Option<String>,
}

impl Default for PlatformLinkRapierPlugin {
    fn default() -> Self {
        Self {
            log_file: Some("logs/platform_link.log".to_string()),
        }
    }
}

impl Plugin for PlatformLinkRapierPlugin {
    fn build(&self, app: &mut App) {
        match &self.log_file {
            Some(path) => set_logger_if_needed(Box::new(FileLogger::start_session(path))),
            None => platform_link::init_logger(),
        }

        app.add_plugins(PlatformLinkPlugin)
            .register_type::<AvatarBody>()
            .register_type::<TrackingRig>()
            .register_type::<StationCollider>();

        // Движение avatar'а до rapier physics step
        app.add_systems(
            FixedUpdate,
            (
                avatar_ground_detection,
                apply_avatar_input,
                apply_avatar_gravity,
                integrate_avatar_velocity,
            )
                .chain()
                .before(PhysicsSet::SyncBackend),
        );

        app.add_systems(
            PostUpdate,
            platform_link_system
                .after(PhysicsSet::Writeback)
                .after(TransformSystem::TransformPropagate),
        );
    }
}
