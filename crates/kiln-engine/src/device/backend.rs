use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::resource::{
    DecodedImage, FilterMode, GpuBackend, TextureHandle, TextureSettings, WrapMode,
};

use super::{Gpu, GpuError, GpuErrorCode};

/// A texture uploaded through [`WgpuBackend`].
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

/// [`GpuBackend`] over a wgpu device.
///
/// Textures live in a handle-keyed table until `destroy_texture`.
pub struct WgpuBackend {
    gpu: Arc<Gpu>,
    textures: Mutex<HashMap<TextureHandle, GpuTexture>>,
    next_id: AtomicU64,
}

impl WgpuBackend {
    pub fn new(gpu: Arc<Gpu>) -> Self {
        Self {
            gpu,
            textures: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Runs `f` with the texture behind `handle`, if it is still alive.
    pub fn with_texture<R>(
        &self,
        handle: TextureHandle,
        f: impl FnOnce(&GpuTexture) -> R,
    ) -> Option<R> {
        self.textures.lock().get(&handle).map(f)
    }

    pub fn live_textures(&self) -> usize {
        self.textures.lock().len()
    }
}

impl GpuBackend for WgpuBackend {
    fn upload_texture(
        &self,
        image: &DecodedImage,
        settings: &TextureSettings,
    ) -> Result<TextureHandle, GpuError> {
        let max = self.gpu.limits().max_texture_dimension_2d;
        check_texture_size(image.width(), image.height(), max)?;

        let format = if settings.srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        let size = wgpu::Extent3d {
            width: image.width(),
            height: image.height(),
            depth_or_array_layers: 1,
        };

        let device = self.gpu.device();
        let uploaded = self.gpu.scoped("texture upload", || {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("kiln texture"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_DST
                    | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            });

            self.gpu.queue().write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                image.pixels(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(image.bytes_per_row()),
                    rows_per_image: Some(image.height()),
                },
                size,
            );

            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            let address_mode = address_mode(settings.wrap);
            let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("kiln texture sampler"),
                address_mode_u: address_mode,
                address_mode_v: address_mode,
                address_mode_w: address_mode,
                mag_filter: filter_mode(settings.filter),
                min_filter: filter_mode(settings.filter),
                mipmap_filter: wgpu::MipmapFilterMode::Nearest,
                ..Default::default()
            });

            GpuTexture {
                texture,
                view,
                sampler,
            }
        })?;

        let handle = TextureHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.textures.lock().insert(handle, uploaded);
        log::trace!(
            "uploaded texture {} ({}x{}, {format:?})",
            handle.raw(),
            image.width(),
            image.height()
        );
        Ok(handle)
    }

    fn destroy_texture(&self, handle: TextureHandle) {
        match self.textures.lock().remove(&handle) {
            Some(entry) => entry.texture.destroy(),
            None => log::warn!("destroy of unknown texture handle {}", handle.raw()),
        }
    }
}

pub(crate) fn check_texture_size(width: u32, height: u32, max: u32) -> Result<(), GpuError> {
    if width == 0 || height == 0 {
        return Err(GpuError::new(format!("texture size {width}x{height} is empty"))
            .with_code(GpuErrorCode::InvalidValue));
    }
    if width > max || height > max {
        return Err(GpuError::new(format!(
            "texture size {width}x{height} exceeds the device limit of {max}"
        ))
        .with_code(GpuErrorCode::InvalidValue));
    }
    Ok(())
}

fn filter_mode(filter: FilterMode) -> wgpu::FilterMode {
    match filter {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

fn address_mode(wrap: WrapMode) -> wgpu::AddressMode {
    match wrap {
        WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
        WrapMode::MirrorRepeat => wgpu::AddressMode::MirrorRepeat,
    }
}
