//! Reaper Render Capabilities
//!
//! Reads what the graphics backend can hold so the texture cache guard knows
//! how close it is to the limit. No surface or window is ever created.

pub mod backend;

pub use backend::query_capabilities;
pub use wgpu;

/// Rendering backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Metal (macOS, iOS)
    Metal,
    /// DirectX 12 (Windows)
    DirectX12,
    /// Vulkan (cross-platform)
    Vulkan,
    /// OpenGL / WebGL (cross-platform, fallback)
    OpenGL,
    /// WebGPU (web)
    WebGpu,
    /// No real backend (software or empty adapter)
    Software,
}

impl From<wgpu::Backend> for BackendType {
    fn from(backend: wgpu::Backend) -> Self {
        match backend {
            wgpu::Backend::Metal => BackendType::Metal,
            wgpu::Backend::Dx12 => BackendType::DirectX12,
            wgpu::Backend::Vulkan => BackendType::Vulkan,
            wgpu::Backend::Gl => BackendType::OpenGL,
            wgpu::Backend::BrowserWebGpu => BackendType::WebGpu,
            #[allow(unreachable_patterns)]
            _ => BackendType::Software,
        }
    }
}

/// Capabilities reported by the adapter
#[derive(Debug, Clone)]
pub struct DeviceCapabilities {
    pub backend: BackendType,
    pub adapter_name: String,
    pub max_texture_size: u32,
    /// Textures a single shader stage may sample at once.
    pub max_texture_units: u32,
}
