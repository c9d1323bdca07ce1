use std::sync::Arc;

use anyhow::{Context, Result};
use kiln_engine::device::{
    CameraUniformStep, ClearStep, CopyStep, Gpu, GpuInit, OffscreenPresenter, TextureBlitStep,
    WgpuBackend, WgpuFramebuffer,
};
use kiln_engine::logging::{LoggingConfig, init_logging};
use kiln_engine::render::{Camera, FrameTask, MaterialKey, RenderPipeline, Scene};
use kiln_engine::resource::{DecodedImage, LoadFailurePolicy, TextureLoader};
use kiln_engine::task::{Scheduler, SchedulerConfig, StopTask, TaskFlags, WorkerCount};

mod config;

use config::StudioConfig;

/// Capabilities of the thread that owns the device.
const RENDER_THREAD: TaskFlags = TaskFlags::MAIN_THREAD.union(TaskFlags::GPU_THREAD);

fn main() {
    init_logging(LoggingConfig::default());

    if let Err(err) = run() {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = StudioConfig::from_env()?;
    log::info!(
        "kiln studio: {} frame(s) at {}x{}, {} texture(s)",
        config.frames,
        config.width,
        config.height,
        config.textures.len()
    );

    let gpu = Arc::new(Gpu::headless_blocking(GpuInit::default())?);
    let scheduler = Scheduler::new(SchedulerConfig::default());
    let backend = Arc::new(WgpuBackend::new(gpu.clone()));

    let policy = if config.isolate_failures {
        LoadFailurePolicy::Isolate
    } else {
        LoadFailurePolicy::Fatal
    };
    let loader = TextureLoader::new(scheduler.clone(), backend.clone()).with_failure_policy(policy);

    let mut scene = Scene::new();
    scene.set_camera(pixel_camera(config.width, config.height));
    scene.add_batch(
        MaterialKey(0),
        vec![loader.from_image("checker", checkerboard(64, 8)?)],
    );
    for (index, path) in config.textures.iter().enumerate() {
        let material = MaterialKey(u32::try_from(index + 1).context("too many textures")?);
        scene.add_batch(material, vec![loader.load_file(path)]);
    }
    let scene = scene.into_shared();

    let (width, height) = (config.width, config.height);
    let pipeline = RenderPipeline::new(
        WgpuFramebuffer::new(gpu.clone(), "kiln ping", width, height),
        WgpuFramebuffer::new(gpu.clone(), "kiln pong", width, height),
    )
    .with_scene_step(CameraUniformStep::new(gpu.clone()))
    .with_scene_step(ClearStep::new(
        gpu.clone(),
        wgpu::Color {
            r: 0.08,
            g: 0.06,
            b: 0.05,
            a: 1.0,
        },
    ))
    .with_scene_step(TextureBlitStep::new(gpu.clone(), backend.clone()))
    .with_postprocess_step(CopyStep::new(gpu.clone()))
    .with_postprocess_step(CopyStep::new(gpu.clone()));

    let presenter = OffscreenPresenter::new(gpu.clone(), width, height, config.frames);
    scheduler.submit(FrameTask::new(pipeline, presenter, scene.clone()).with_high_priority(true));

    scheduler.start(WorkerCount::Auto {
        main_participates: true,
    })?;
    scheduler.become_worker(RENDER_THREAD);
    scheduler.stop(false).context("render loop failed")?;

    // Releasing the scene queues destroy tasks for every uploaded texture;
    // drain them on this thread before tearing down.
    drop(scene);
    scheduler.start(WorkerCount::Exact(0))?;
    scheduler.submit(StopTask::with_flags(TaskFlags::NONE));
    scheduler.become_worker(RENDER_THREAD);
    scheduler.stop(true).context("texture cleanup failed")?;

    let stats = scheduler.stats();
    log::info!(
        "done on `{}`: {} task run(s), {} requeue(s), {} live texture(s)",
        gpu.adapter_info().name,
        stats.executed,
        stats.resubmitted,
        backend.live_textures()
    );
    Ok(())
}

/// Orthographic camera mapping pixel coordinates (origin top-left) to clip space.
fn pixel_camera(width: u32, height: u32) -> Camera {
    let (w, h) = (width.max(1) as f32, height.max(1) as f32);
    Camera {
        view: Camera::IDENTITY.view,
        projection: [
            [2.0 / w, 0.0, 0.0, 0.0],
            [0.0, -2.0 / h, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [-1.0, 1.0, 0.0, 1.0],
        ],
    }
}

/// Two-colour checkerboard used as the always-present background batch.
fn checkerboard(size: u32, cell: u32) -> Result<DecodedImage> {
    let mut pixels = Vec::with_capacity((size * size * DecodedImage::BYTES_PER_PIXEL) as usize);
    for y in 0..size {
        for x in 0..size {
            let rgba: [u8; 4] = if ((x / cell) + (y / cell)) % 2 == 0 {
                [200, 200, 200, 255]
            } else {
                [60, 60, 60, 255]
            };
            pixels.extend_from_slice(&rgba);
        }
    }
    Ok(DecodedImage::new(size, size, pixels)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(camera: &Camera, x: f32, y: f32) -> (f32, f32) {
        let p = camera.projection;
        (p[0][0] * x + p[3][0], p[1][1] * y + p[3][1])
    }

    #[test]
    fn pixel_camera_maps_corners_to_clip_space() {
        let camera = pixel_camera(256, 128);
        assert_eq!(project(&camera, 0.0, 0.0), (-1.0, 1.0));
        assert_eq!(project(&camera, 256.0, 128.0), (1.0, -1.0));
        assert_eq!(camera.view, Camera::IDENTITY.view);
    }
}
