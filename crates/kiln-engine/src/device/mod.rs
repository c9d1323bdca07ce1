//! wgpu implementation of the GPU collaborators.
//!
//! This module is responsible for:
//! - creating a headless wgpu Instance/Adapter/Device/Queue
//! - uploading and destroying textures for the resource layer
//! - off-screen framebuffers and the built-in render steps
//!
//! [`GpuError`] lives here too; the task and resource layers only see it as
//! an error value.

mod backend;
mod error;
mod gpu;
mod init;
mod present;
mod steps;
mod target;

pub use backend::{GpuTexture, WgpuBackend};
pub use error::{GpuError, GpuErrorCode};
pub use gpu::Gpu;
pub use init::GpuInit;
pub use present::OffscreenPresenter;
pub use steps::{CameraUniformStep, ClearStep, CopyStep, TextureBlitStep};
pub use target::{DEPTH_STENCIL_FORMAT, WgpuAttachment, WgpuFramebuffer, to_blend_state};
