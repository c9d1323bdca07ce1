use std::sync::Arc;

use crate::render::{FrameControl, Framebuffer, Presenter};

use super::{Gpu, GpuError, WgpuFramebuffer};

/// Presents into an off-screen display framebuffer for a fixed number of
/// frames, then asks the frame task to exit.
pub struct OffscreenPresenter {
    display: Option<WgpuFramebuffer>,
    frame_limit: u64,
    presented: u64,
}

impl OffscreenPresenter {
    pub fn new(gpu: Arc<Gpu>, width: u32, height: u32, frame_limit: u64) -> Self {
        Self {
            display: Some(WgpuFramebuffer::new(gpu, "kiln display", width, height)),
            frame_limit,
            presented: 0,
        }
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl Presenter<WgpuFramebuffer> for OffscreenPresenter {
    fn acquire(&mut self) -> Result<Option<WgpuFramebuffer>, GpuError> {
        Ok(self.display.take())
    }

    fn present(&mut self, frame: WgpuFramebuffer) -> Result<FrameControl, GpuError> {
        self.presented += 1;
        log::debug!(
            "presented frame {} ({}x{})",
            self.presented,
            frame.width(),
            frame.height()
        );
        self.display = Some(frame);

        if self.presented >= self.frame_limit {
            Ok(FrameControl::Exit)
        } else {
            Ok(FrameControl::Continue)
        }
    }
}
