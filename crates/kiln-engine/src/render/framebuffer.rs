use crate::device::GpuError;

/// How fragment output combines with what is already in the target.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum BlendMode {
    /// Output replaces the target.
    #[default]
    Disabled,
    /// Straight alpha: `src * a + dst * (1 - a)`.
    Alpha,
    Additive,
    /// Colour already multiplied by alpha: `src + dst * (1 - a)`.
    Premultiplied,
}

/// Depth/stencil configuration a scene step requests for its target.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DepthStencil {
    pub depth_test: bool,
    pub depth_write: bool,
    pub stencil: bool,
}

impl DepthStencil {
    pub const DISABLED: Self = Self {
        depth_test: false,
        depth_write: false,
        stencil: false,
    };

    /// Depth tested and written; typical for opaque geometry.
    pub const OPAQUE: Self = Self {
        depth_test: true,
        depth_write: true,
        stencil: false,
    };

    pub fn uses_depth(self) -> bool {
        self.depth_test || self.depth_write
    }
}

impl Default for DepthStencil {
    fn default() -> Self {
        Self::DISABLED
    }
}

/// A bindable render target.
///
/// The pipeline only ever sees this surface: how attachments are allocated
/// and what binding means is up to the implementation.
pub trait Framebuffer {
    type Attachment;

    /// Makes this framebuffer the current target, (re)allocating storage if
    /// the requested size changed.
    fn bind(&mut self) -> Result<(), GpuError>;

    fn width(&self) -> u32;
    fn height(&self) -> u32;

    fn size(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Requests a new size; takes effect on the next [`Framebuffer::bind`].
    fn resize(&mut self, width: u32, height: u32);

    fn color_attachment(&self, index: usize) -> Option<&Self::Attachment>;
    fn depth_stencil_attachment(&self) -> Option<&Self::Attachment>;

    fn set_blend_mode(&mut self, mode: BlendMode);
    fn blend_mode(&self) -> BlendMode;

    fn set_depth_stencil(&mut self, state: DepthStencil);
    fn depth_stencil(&self) -> DepthStencil;
}
