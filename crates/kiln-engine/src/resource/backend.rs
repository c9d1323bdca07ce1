use crate::device::GpuError;

use super::DecodedImage;

/// Opaque handle to a texture owned by a [`GpuBackend`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(u64);

impl TextureHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum WrapMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirrorRepeat,
}

/// Sampling configuration applied when a texture is uploaded.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TextureSettings {
    pub filter: FilterMode,
    pub wrap: WrapMode,
    /// Treat the pixels as sRGB-encoded colour.
    pub srgb: bool,
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self {
            filter: FilterMode::Linear,
            wrap: WrapMode::ClampToEdge,
            srgb: true,
        }
    }
}

/// GPU calls the resource layer needs.
///
/// Both methods are only invoked from tasks pinned to the GPU thread.
pub trait GpuBackend: Send + Sync + 'static {
    fn upload_texture(
        &self,
        image: &DecodedImage,
        settings: &TextureSettings,
    ) -> Result<TextureHandle, GpuError>;

    fn destroy_texture(&self, handle: TextureHandle);
}
