use crate::device::GpuError;
use crate::task::{Scheduler, StopTask, Task, TaskError, TaskFlags, TaskStatus};

use super::{FrameClock, Framebuffer, RenderPipeline, SharedScene};

/// What the presenter wants after a frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameControl {
    Continue,
    Exit,
}

/// Supplies display targets and shows finished frames.
pub trait Presenter<F: Framebuffer>: Send {
    /// Returns the display target for the next frame, or `None` to skip it
    /// (e.g. a minimised surface).
    fn acquire(&mut self) -> Result<Option<F>, GpuError>;

    fn present(&mut self, frame: F) -> Result<FrameControl, GpuError>;
}

/// Repeating GPU-thread task that renders one frame per run.
///
/// It requeues itself while the presenter says `Continue`. On `Exit` it
/// submits a [`StopTask`] and finishes.
pub struct FrameTask<F: Framebuffer, P> {
    pipeline: RenderPipeline<F>,
    presenter: P,
    scene: SharedScene,
    flags: TaskFlags,
    clock: FrameClock,
}

impl<F, P> FrameTask<F, P>
where
    F: Framebuffer + Send + 'static,
    P: Presenter<F> + 'static,
{
    pub fn new(pipeline: RenderPipeline<F>, presenter: P, scene: SharedScene) -> Self {
        Self {
            pipeline,
            presenter,
            scene,
            flags: TaskFlags::MAIN_THREAD | TaskFlags::GPU_THREAD,
            clock: FrameClock::new(),
        }
    }

    /// Runs frames ahead of other pinned work such as uploads.
    pub fn with_high_priority(mut self, high: bool) -> Self {
        self.flags.set(TaskFlags::HIGH_PRIORITY, high);
        self
    }
}

impl<F, P> Task for FrameTask<F, P>
where
    F: Framebuffer + Send + 'static,
    P: Presenter<F> + 'static,
{
    fn flags(&self) -> TaskFlags {
        self.flags
    }

    fn run(&mut self, scheduler: &Scheduler) -> Result<TaskStatus, TaskError> {
        let time = self.clock.tick();

        let Some(mut display) = self.presenter.acquire()? else {
            log::trace!("frame {}: no display target, skipping", time.frame_index);
            return Ok(TaskStatus::Continue);
        };

        {
            let scene = self.scene.read();
            self.pipeline.render_frame(&scene, &mut display)?;
        }
        log::trace!("frame {} rendered (dt {:.4}s)", time.frame_index, time.dt);

        match self.presenter.present(display)? {
            FrameControl::Continue => Ok(TaskStatus::Continue),
            FrameControl::Exit => {
                log::info!(
                    "presenter requested exit after {} frame(s)",
                    self.pipeline.stats().frames
                );
                scheduler.submit(StopTask::new());
                Ok(TaskStatus::Done)
            }
        }
    }

    fn name(&self) -> &str {
        "frame"
    }
}
