use std::sync::Arc;

use crate::render::{Camera, DepthStencil, Framebuffer, PostprocessStep, Scene, SceneStep};

use super::{Gpu, GpuError, GpuErrorCode, WgpuAttachment, WgpuBackend, WgpuFramebuffer};

fn color_of(target: &WgpuFramebuffer) -> Result<&WgpuAttachment, GpuError> {
    target.color_attachment(0).ok_or_else(|| {
        GpuError::new(format!("framebuffer `{}` has no color attachment", target.label()))
            .with_code(GpuErrorCode::InvalidFramebufferOperation)
    })
}

/// Clears colour and, when the step uses depth, depth/stencil.
pub struct ClearStep {
    gpu: Arc<Gpu>,
    color: wgpu::Color,
    depth_stencil: DepthStencil,
}

impl ClearStep {
    pub fn new(gpu: Arc<Gpu>, color: wgpu::Color) -> Self {
        Self {
            gpu,
            color,
            depth_stencil: DepthStencil::OPAQUE,
        }
    }

    pub fn with_depth_stencil(mut self, depth_stencil: DepthStencil) -> Self {
        self.depth_stencil = depth_stencil;
        self
    }
}

impl SceneStep<WgpuFramebuffer> for ClearStep {
    fn name(&self) -> &str {
        "clear"
    }

    fn depth_stencil(&self) -> DepthStencil {
        self.depth_stencil
    }

    fn render(&mut self, _scene: &Scene, target: &mut WgpuFramebuffer) -> Result<(), GpuError> {
        let color = color_of(target)?;
        let clear_depth = self.depth_stencil.uses_depth() || self.depth_stencil.stencil;
        let depth_stencil_attachment = target
            .depth_stencil_attachment()
            .filter(|_| clear_depth)
            .map(|depth| wgpu::RenderPassDepthStencilAttachment {
                view: depth.view(),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Store,
                }),
            });

        self.gpu.scoped("clear", || {
            let mut encoder = self.gpu.create_encoder("kiln clear");
            // Pass must be dropped before the encoder is finished.
            {
                let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("kiln clear"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: color.view(),
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(self.color),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                    multiview_mask: None,
                });
            }
            self.gpu.submit(encoder);
        })
    }
}

/// Writes the scene camera into a uniform buffer once per frame, for steps
/// that bind it at `@group(0) @binding(0)`.
pub struct CameraUniformStep {
    gpu: Arc<Gpu>,
    buffer: Option<wgpu::Buffer>,
}

impl CameraUniformStep {
    pub fn new(gpu: Arc<Gpu>) -> Self {
        Self { gpu, buffer: None }
    }

    /// The uniform buffer, once the first frame has created it.
    pub fn buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffer.as_ref()
    }
}

impl SceneStep<WgpuFramebuffer> for CameraUniformStep {
    fn name(&self) -> &str {
        "camera uniform"
    }

    fn depth_stencil(&self) -> DepthStencil {
        DepthStencil::DISABLED
    }

    fn render(&mut self, scene: &Scene, _target: &mut WgpuFramebuffer) -> Result<(), GpuError> {
        let gpu = &self.gpu;
        let buffer = &mut self.buffer;
        gpu.scoped("camera upload", || {
            let ubo = buffer.get_or_insert_with(|| {
                gpu.device().create_buffer(&wgpu::BufferDescriptor {
                    label: Some("kiln camera ubo"),
                    size: std::mem::size_of::<Camera>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            });
            gpu.queue().write_buffer(ubo, 0, scene.camera().as_bytes());
        })
    }
}

/// Copies each ready batch's first texture into the target's top-left
/// corner, clipped to the target.
pub struct TextureBlitStep {
    gpu: Arc<Gpu>,
    backend: Arc<WgpuBackend>,
}

impl TextureBlitStep {
    pub fn new(gpu: Arc<Gpu>, backend: Arc<WgpuBackend>) -> Self {
        Self { gpu, backend }
    }
}

impl SceneStep<WgpuFramebuffer> for TextureBlitStep {
    fn name(&self) -> &str {
        "texture blit"
    }

    fn depth_stencil(&self) -> DepthStencil {
        DepthStencil::DISABLED
    }

    fn render(&mut self, scene: &Scene, target: &mut WgpuFramebuffer) -> Result<(), GpuError> {
        let color = color_of(target)?;
        let mut handles = Vec::new();
        for batch in scene.ready_batches() {
            if let Some(texture) = batch.textures().first() {
                let handle = texture.handle().map_err(|err| GpuError::new(err.to_string()))?;
                handles.push((texture.label(), handle));
            }
        }

        let copies = self.gpu.scoped("texture blit", || {
            let mut encoder = self.gpu.create_encoder("kiln blit");
            let mut copies = 0;
            for (label, handle) in &handles {
                self.backend.with_texture(*handle, |source| {
                    if source.texture.format() != target.format() {
                        log::warn!(
                            "skipping blit of `{label}`: format {:?} does not match target {:?}",
                            source.texture.format(),
                            target.format()
                        );
                        return;
                    }
                    let size = source.texture.size();
                    encoder.copy_texture_to_texture(
                        source.texture.as_image_copy(),
                        color.texture().as_image_copy(),
                        wgpu::Extent3d {
                            width: size.width.min(target.width()),
                            height: size.height.min(target.height()),
                            depth_or_array_layers: 1,
                        },
                    );
                    copies += 1;
                });
            }
            self.gpu.submit(encoder);
            copies
        })?;

        log::trace!("blitted {copies} texture(s) into `{}`", target.label());
        Ok(())
    }
}

/// Postprocess pass copying the source colour attachment into the target.
pub struct CopyStep {
    gpu: Arc<Gpu>,
}

impl CopyStep {
    pub fn new(gpu: Arc<Gpu>) -> Self {
        Self { gpu }
    }
}

impl PostprocessStep<WgpuFramebuffer> for CopyStep {
    fn name(&self) -> &str {
        "copy"
    }

    fn apply(
        &mut self,
        source: &WgpuFramebuffer,
        target: &mut WgpuFramebuffer,
    ) -> Result<(), GpuError> {
        if source.size() != target.size() {
            return Err(GpuError::new(format!(
                "cannot copy {}x{} `{}` into {}x{} `{}`",
                source.width(),
                source.height(),
                source.label(),
                target.width(),
                target.height(),
                target.label()
            ))
            .with_code(GpuErrorCode::InvalidOperation));
        }
        if source.format() != target.format() {
            return Err(GpuError::new(format!(
                "cannot copy {:?} into {:?}",
                source.format(),
                target.format()
            ))
            .with_code(GpuErrorCode::InvalidOperation));
        }

        let from = color_of(source)?;
        let to = color_of(target)?;

        self.gpu.scoped("copy", || {
            let mut encoder = self.gpu.create_encoder("kiln copy");
            encoder.copy_texture_to_texture(
                from.texture().as_image_copy(),
                to.texture().as_image_copy(),
                wgpu::Extent3d {
                    width: target.width(),
                    height: target.height(),
                    depth_or_array_layers: 1,
                },
            );
            self.gpu.submit(encoder);
        })
    }
}
