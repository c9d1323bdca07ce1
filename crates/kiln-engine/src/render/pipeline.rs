use crate::device::GpuError;

use super::{BlendMode, DepthStencil, Framebuffer, Scene};

/// Draws scene geometry into a target.
pub trait SceneStep<F: Framebuffer>: Send {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn blend_mode(&self) -> BlendMode {
        BlendMode::Disabled
    }

    fn depth_stencil(&self) -> DepthStencil {
        DepthStencil::OPAQUE
    }

    fn render(&mut self, scene: &Scene, target: &mut F) -> Result<(), GpuError>;
}

/// Reads one framebuffer and writes another. `source` and `target` are
/// always distinct objects.
pub trait PostprocessStep<F: Framebuffer>: Send {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn blend_mode(&self) -> BlendMode {
        BlendMode::Disabled
    }

    fn apply(&mut self, source: &F, target: &mut F) -> Result<(), GpuError>;
}

/// Counters accumulated across frames.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct FrameStats {
    pub frames: u64,
    pub scene_passes: u64,
    pub postprocess_passes: u64,
}

/// Scene steps followed by a postprocess chain.
///
/// Two off-screen framebuffers are reused for the whole chain regardless of
/// its length; the last pass of a frame always lands on the display.
pub struct RenderPipeline<F: Framebuffer> {
    buffers: [F; 2],
    scene_steps: Vec<Box<dyn SceneStep<F>>>,
    postprocess_steps: Vec<Box<dyn PostprocessStep<F>>>,
    stats: FrameStats,
}

impl<F: Framebuffer> RenderPipeline<F> {
    pub fn new(front: F, back: F) -> Self {
        Self {
            buffers: [front, back],
            scene_steps: Vec::new(),
            postprocess_steps: Vec::new(),
            stats: FrameStats::default(),
        }
    }

    pub fn with_scene_step(mut self, step: impl SceneStep<F> + 'static) -> Self {
        self.push_scene_step(step);
        self
    }

    pub fn with_postprocess_step(mut self, step: impl PostprocessStep<F> + 'static) -> Self {
        self.push_postprocess_step(step);
        self
    }

    pub fn push_scene_step(&mut self, step: impl SceneStep<F> + 'static) {
        self.scene_steps.push(Box::new(step));
    }

    pub fn push_postprocess_step(&mut self, step: impl PostprocessStep<F> + 'static) {
        self.postprocess_steps.push(Box::new(step));
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn buffers(&self) -> &[F; 2] {
        &self.buffers
    }

    /// Renders one frame into `display`.
    ///
    /// The first GPU error aborts the rest of the frame and is returned with
    /// the failing step's name prefixed.
    pub fn render_frame(&mut self, scene: &Scene, display: &mut F) -> Result<(), GpuError> {
        let Self {
            buffers,
            scene_steps,
            postprocess_steps,
            stats,
        } = self;

        if postprocess_steps.is_empty() {
            for step in scene_steps.iter_mut() {
                run_scene_step(&mut **step, scene, display)?;
                stats.scene_passes += 1;
            }
            stats.frames += 1;
            return Ok(());
        }

        let (width, height) = display.size();
        for buffer in buffers.iter_mut() {
            buffer.resize(width, height);
        }

        let mut front = 0;
        for step in scene_steps.iter_mut() {
            run_scene_step(&mut **step, scene, &mut buffers[front])?;
            stats.scene_passes += 1;
        }

        let last = postprocess_steps.len() - 1;
        for (index, step) in postprocess_steps.iter_mut().enumerate() {
            let source = front;
            front ^= 1;

            let result = if index == last {
                prepare_target(display, step.blend_mode(), DepthStencil::DISABLED)
                    .and_then(|()| step.apply(&buffers[source], display))
            } else {
                let (source, target) = split(buffers, source);
                prepare_target(target, step.blend_mode(), DepthStencil::DISABLED)
                    .and_then(|()| step.apply(source, target))
            };
            result.map_err(|err| err.within(step.name()))?;
            stats.postprocess_passes += 1;
        }

        stats.frames += 1;
        Ok(())
    }
}

fn run_scene_step<F: Framebuffer, S: SceneStep<F> + ?Sized>(
    step: &mut S,
    scene: &Scene,
    target: &mut F,
) -> Result<(), GpuError> {
    prepare_target(target, step.blend_mode(), step.depth_stencil())
        .and_then(|()| step.render(scene, target))
        .map_err(|err| err.within(step.name()))
}

fn prepare_target<F: Framebuffer>(
    target: &mut F,
    blend: BlendMode,
    depth_stencil: DepthStencil,
) -> Result<(), GpuError> {
    target.set_blend_mode(blend);
    target.set_depth_stencil(depth_stencil);
    target.bind()
}

/// Borrows `buffers[source]` for reading and the other buffer for writing.
fn split<F>(buffers: &mut [F; 2], source: usize) -> (&F, &mut F) {
    let [first, second] = buffers;
    if source == 0 {
        (first, second)
    } else {
        (second, first)
    }
}
