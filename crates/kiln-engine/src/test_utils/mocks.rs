use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::device::{GpuError, GpuErrorCode};
use crate::render::{BlendMode, DepthStencil, FrameControl, Framebuffer, Presenter};
use crate::resource::{
    DecodeError, DecodedImage, GpuBackend, ImageDecoder, TextureHandle, TextureSettings,
    TextureSource,
};

/// Decodes every source to a solid white image of a fixed size.
#[derive(Debug, Copy, Clone)]
pub(crate) struct SolidDecoder {
    width: u32,
    height: u32,
}

impl SolidDecoder {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl ImageDecoder for SolidDecoder {
    fn decode(&self, _source: &TextureSource) -> Result<DecodedImage, DecodeError> {
        Ok(DecodedImage::solid(self.width, self.height, [255; 4]))
    }
}

#[derive(Debug, Copy, Clone)]
pub(crate) struct FailingDecoder;

impl ImageDecoder for FailingDecoder {
    fn decode(&self, source: &TextureSource) -> Result<DecodedImage, DecodeError> {
        Err(DecodeError::Empty(source.label()))
    }
}

/// Backend that hands out sequential handles and records what it was asked
/// to do, including which thread destroyed each texture.
#[derive(Debug, Default)]
pub(crate) struct RecordingBackend {
    next: AtomicU64,
    fail: AtomicBool,
    uploads: Mutex<Vec<TextureHandle>>,
    destroys: Mutex<Vec<(TextureHandle, String)>>,
}

impl RecordingBackend {
    pub(crate) fn fail_uploads(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub(crate) fn uploads(&self) -> Vec<TextureHandle> {
        self.uploads.lock().clone()
    }

    pub(crate) fn destroys(&self) -> Vec<(TextureHandle, String)> {
        self.destroys.lock().clone()
    }
}

impl GpuBackend for RecordingBackend {
    fn upload_texture(
        &self,
        _image: &DecodedImage,
        _settings: &TextureSettings,
    ) -> Result<TextureHandle, GpuError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(GpuError::new("texture upload failed").with_code(GpuErrorCode::OutOfMemory));
        }
        let handle = TextureHandle::new(self.next.fetch_add(1, Ordering::SeqCst) + 1);
        self.uploads.lock().push(handle);
        Ok(handle)
    }

    fn destroy_texture(&self, handle: TextureHandle) {
        let thread = std::thread::current().name().unwrap_or_default().to_owned();
        self.destroys.lock().push((handle, thread));
    }
}

/// Ordered record of mock events shared between test doubles.
#[derive(Debug, Default, Clone)]
pub(crate) struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub(crate) fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// Framebuffer that only logs binds and tracks requested state.
#[derive(Debug)]
pub(crate) struct MockFramebuffer {
    id: &'static str,
    log: EventLog,
    width: u32,
    height: u32,
    blend: BlendMode,
    depth_stencil: DepthStencil,
    color: String,
    fail_bind: bool,
}

impl MockFramebuffer {
    pub(crate) fn new(id: &'static str, log: EventLog) -> Self {
        Self {
            id,
            log,
            width: 1,
            height: 1,
            blend: BlendMode::Disabled,
            depth_stencil: DepthStencil::DISABLED,
            color: format!("{id}.color0"),
            fail_bind: false,
        }
    }

    pub(crate) fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub(crate) fn failing_bind(mut self) -> Self {
        self.fail_bind = true;
        self
    }

    pub(crate) fn id(&self) -> &'static str {
        self.id
    }
}

impl Framebuffer for MockFramebuffer {
    type Attachment = String;

    fn bind(&mut self) -> Result<(), GpuError> {
        self.log.push(format!("bind {}", self.id));
        if self.fail_bind {
            return Err(GpuError::new(format!("bind {} failed", self.id))
                .with_code(GpuErrorCode::InvalidFramebufferOperation));
        }
        Ok(())
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn color_attachment(&self, index: usize) -> Option<&String> {
        (index == 0).then_some(&self.color)
    }

    fn depth_stencil_attachment(&self) -> Option<&String> {
        None
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

/// Presents a fixed number of frames, then asks to exit.
///
/// `skip_every` makes every n-th acquire return no target.
#[derive(Debug)]
pub(crate) struct MockPresenter {
    log: EventLog,
    frames_left: u32,
    acquires: u32,
    skip_every: Option<u32>,
    fail_present: bool,
}

impl MockPresenter {
    pub(crate) fn new(frames: u32, log: EventLog) -> Self {
        Self {
            log,
            frames_left: frames,
            acquires: 0,
            skip_every: None,
            fail_present: false,
        }
    }

    pub(crate) fn skipping_every(mut self, n: u32) -> Self {
        self.skip_every = Some(n);
        self
    }

    pub(crate) fn failing_present(mut self) -> Self {
        self.fail_present = true;
        self
    }
}

impl Presenter<MockFramebuffer> for MockPresenter {
    fn acquire(&mut self) -> Result<Option<MockFramebuffer>, GpuError> {
        self.acquires += 1;
        if self.skip_every.is_some_and(|n| self.acquires % n == 0) {
            self.log.push("skip");
            return Ok(None);
        }
        Ok(Some(MockFramebuffer::new("display", self.log.clone())))
    }

    fn present(&mut self, frame: MockFramebuffer) -> Result<FrameControl, GpuError> {
        if self.fail_present {
            return Err(GpuError::new("present failed").with_code(GpuErrorCode::DeviceLost));
        }
        self.log.push(format!("present {}", frame.id()));
        self.frames_left = self.frames_left.saturating_sub(1);
        if self.frames_left == 0 {
            Ok(FrameControl::Exit)
        } else {
            Ok(FrameControl::Continue)
        }
    }
}
