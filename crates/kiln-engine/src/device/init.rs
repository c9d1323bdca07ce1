/// Parameters for creating the headless GPU context.
///
/// Defaults pick a high-performance adapter on any backend with default
/// limits and an sRGB colour format.
#[derive(Debug, Clone)]
pub struct GpuInit {
    pub backends: wgpu::Backends,
    pub power_preference: wgpu::PowerPreference,

    /// Use a software adapter even when hardware is available.
    pub force_fallback_adapter: bool,

    /// Favor an empty set for portability unless a feature is strictly necessary.
    pub required_features: wgpu::Features,
    pub required_limits: wgpu::Limits,

    /// Colour format for framebuffers and uploaded textures.
    pub prefer_srgb: bool,

    /// Device label, visible in graphics debuggers.
    pub label: String,
}

impl GpuInit {
    pub fn color_format(&self) -> wgpu::TextureFormat {
        if self.prefer_srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        }
    }
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            prefer_srgb: true,
            label: "kiln device".to_owned(),
        }
    }
}
