//! Reaper Services Layer
//!
//! Platform glue for the lifecycle subsystem: settings loading and host
//! telemetry adapters.

pub mod settings;
pub mod telemetry;

pub use settings::{load_settings, SettingsError, CONFIG_ENV};
pub use telemetry::{GpuTextures, HostMemory};

/// Host capabilities the manager samples.
pub struct Services {
    pub memory: HostMemory,
    pub textures: GpuTextures,
}

/// Queries the host once. Missing capabilities degrade to "unavailable".
pub fn init_services() -> Services {
    let services = Services {
        memory: HostMemory,
        textures: GpuTextures::detect(),
    };
    tracing::info!(
        memory = reaper_env::process_memory().is_some(),
        textures = services.textures.max_units().is_some(),
        "host telemetry initialised"
    );
    services
}
