//! Frame composition.
//!
//! A [`RenderPipeline`] runs scene steps and then a postprocess chain over two
//! ping-ponged off-screen framebuffers; a [`FrameTask`] drives it on the GPU
//! thread through the task scheduler. Everything here is generic over the
//! [`Framebuffer`] trait, so the wgpu types in `device` are one implementation
//! among others.

mod clock;
mod frame;
mod framebuffer;
mod pipeline;
mod scene;

pub use clock::{FrameClock, FrameTime};
pub use frame::{FrameControl, FrameTask, Presenter};
pub use framebuffer::{BlendMode, DepthStencil, Framebuffer};
pub use pipeline::{FrameStats, PostprocessStep, RenderPipeline, SceneStep};
pub use scene::{BatchId, Camera, DrawRange, MaterialBatch, MaterialKey, Scene, SharedScene};
