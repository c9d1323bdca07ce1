use std::sync::Arc;

use crate::render::{BlendMode, DepthStencil, Framebuffer};

use super::backend::check_texture_size;
use super::{Gpu, GpuError, GpuErrorCode};

pub const DEPTH_STENCIL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// One texture of a [`WgpuFramebuffer`] plus its default view.
pub struct WgpuAttachment {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl WgpuAttachment {
    fn new(
        gpu: &Gpu,
        label: &str,
        (width, height): (u32, u32),
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

/// Off-screen colour + depth/stencil target.
///
/// Storage is allocated on the first `bind` and reallocated whenever the
/// requested size no longer matches.
pub struct WgpuFramebuffer {
    gpu: Arc<Gpu>,
    label: String,
    format: wgpu::TextureFormat,
    requested: (u32, u32),
    color: Option<WgpuAttachment>,
    depth: Option<WgpuAttachment>,
    blend: BlendMode,
    depth_stencil: DepthStencil,
}

impl WgpuFramebuffer {
    pub fn new(gpu: Arc<Gpu>, label: impl Into<String>, width: u32, height: u32) -> Self {
        let format = gpu.color_format();
        Self {
            gpu,
            label: label.into(),
            format,
            requested: (width, height),
            color: None,
            depth: None,
            blend: BlendMode::Disabled,
            depth_stencil: DepthStencil::DISABLED,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Size of the currently allocated storage, if any.
    pub fn allocated_size(&self) -> Option<(u32, u32)> {
        self.color.as_ref().map(|color| {
            let size = color.texture.size();
            (size.width, size.height)
        })
    }

    fn allocate(&mut self) -> Result<(), GpuError> {
        let size = self.requested;
        log::debug!(
            "allocating framebuffer `{}` at {}x{}",
            self.label,
            size.0,
            size.1
        );

        let (color, depth) = self
            .gpu
            .scoped("framebuffer allocation", || {
                let color = WgpuAttachment::new(
                    &self.gpu,
                    &format!("{} color", self.label),
                    size,
                    self.format,
                    wgpu::TextureUsages::RENDER_ATTACHMENT
                        | wgpu::TextureUsages::TEXTURE_BINDING
                        | wgpu::TextureUsages::COPY_SRC
                        | wgpu::TextureUsages::COPY_DST,
                );
                let depth = WgpuAttachment::new(
                    &self.gpu,
                    &format!("{} depth", self.label),
                    size,
                    DEPTH_STENCIL_FORMAT,
                    wgpu::TextureUsages::RENDER_ATTACHMENT,
                );
                (color, depth)
            })
            .map_err(|err| err.within(&self.label))?;

        self.color = Some(color);
        self.depth = Some(depth);
        Ok(())
    }
}

impl Framebuffer for WgpuFramebuffer {
    type Attachment = WgpuAttachment;

    fn bind(&mut self) -> Result<(), GpuError> {
        let (width, height) = self.requested;
        if width == 0 || height == 0 {
            return Err(
                GpuError::new(format!("framebuffer `{}` has zero size", self.label))
                    .with_code(GpuErrorCode::InvalidFramebufferOperation),
            );
        }
        let max = self.gpu.limits().max_texture_dimension_2d;
        check_texture_size(width, height, max)?;

        if self.allocated_size() != Some(self.requested) {
            self.allocate()?;
        }
        Ok(())
    }

    fn width(&self) -> u32 {
        self.requested.0
    }

    fn height(&self) -> u32 {
        self.requested.1
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.requested = (width, height);
    }

    fn color_attachment(&self, index: usize) -> Option<&WgpuAttachment> {
        match index {
            0 => self.color.as_ref(),
            _ => None,
        }
    }

    fn depth_stencil_attachment(&self) -> Option<&WgpuAttachment> {
        self.depth.as_ref()
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend = mode;
    }

    fn blend_mode(&self) -> BlendMode {
        self.blend
    }

    fn set_depth_stencil(&mut self, state: DepthStencil) {
        self.depth_stencil = state;
    }

    fn depth_stencil(&self) -> DepthStencil {
        self.depth_stencil
    }
}

/// Blend state for a colour target in `mode`; `None` means replace.
pub fn to_blend_state(mode: BlendMode) -> Option<wgpu::BlendState> {
    match mode {
        BlendMode::Disabled => None,
        BlendMode::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
        BlendMode::Premultiplied => Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
        BlendMode::Additive => {
            let add = wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            };
            Some(wgpu::BlendState {
                color: add,
                alpha: add,
            })
        }
    }
}
