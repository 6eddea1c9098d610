//! Headless adapter probing
//!
//! Asks wgpu for any adapter (no compatible surface) and reads its limits.

use crate::{BackendType, DeviceCapabilities};

/// Query available rendering capabilities.
///
/// Returns `None` when no adapter can be obtained (headless CI, missing
/// drivers). Blocks on the adapter request; call once at startup.
pub fn query_capabilities() -> Option<DeviceCapabilities> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::default(),
        compatible_surface: None,
        force_fallback_adapter: false,
    }));

    let Some(adapter) = adapter else {
        tracing::debug!("no graphics adapter available; texture limits unknown");
        return None;
    };

    let info = adapter.get_info();
    let limits = adapter.limits();
    let caps = DeviceCapabilities {
        backend: BackendType::from(info.backend),
        adapter_name: info.name,
        max_texture_size: limits.max_texture_dimension_2d,
        max_texture_units: limits.max_sampled_textures_per_shader_stage,
    };
    tracing::info!(
        backend = ?caps.backend,
        adapter = %caps.adapter_name,
        texture_units = caps.max_texture_units,
        "queried graphics backend"
    );
    Some(caps)
}
