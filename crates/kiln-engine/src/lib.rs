//! Kiln engine crate.
//!
//! An affinity-aware task scheduler, GPU texture references that load through
//! it, and a render pipeline that runs as a GPU-thread task. The wgpu types in
//! [`device`] implement the GPU-facing traits; everything else is backend
//! agnostic.

pub mod device;
pub mod logging;
pub mod render;
pub mod resource;
pub mod task;

#[cfg(test)]
mod test_utils;
