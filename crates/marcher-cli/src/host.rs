//! Headless frame loop around the raymarch pass

use anyhow::Result;
use glam::Vec3;
use marcher_render::{
    Camera, FrameInputs, FrameStatus, RaymarchPass, RaymarchSettings, TargetDescriptor,
    WgpuBackend, init_headless, wgpu,
};
use marcher_sdf::{Scene, SceneSource};
use std::path::Path;
use tracing::info;

/// Storage-capable format shared by the color buffer and the kernel output
const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Everything needed to render a scene file
pub struct RenderJob {
    pub scene: Scene,
    pub kernel: String,
    pub entry: String,
    pub settings: RaymarchSettings,
    pub width: u32,
    pub height: u32,
    pub frames: u32,
    pub eye: Vec3,
    pub target: Vec3,
    pub background: Vec3,
}

pub fn run_render(job: &RenderJob, output: &Path) -> Result<()> {
    if job.frames == 0 {
        anyhow::bail!("At least one frame is required");
    }

    println!(
        "Rendering to {} ({}x{}, {} frame(s))...",
        output.display(),
        job.width,
        job.height,
        job.frames
    );

    let (device, queue) = pollster::block_on(init_headless())?;
    let mut backend = WgpuBackend::new(device, queue);
    let program = backend.load_program(&job.kernel, &job.entry, OUTPUT_FORMAT)?;

    let mut pass = RaymarchPass::new(job.settings.clone()).with_program(program);
    info!(insert_at = ?pass.insert_at(), "Raymarch pass ready");

    // Stand-ins for the buffers a host renderer would have drawn into
    let background = wgpu::Color {
        r: f64::from(job.background.x),
        g: f64::from(job.background.y),
        b: f64::from(job.background.z),
        a: 1.0,
    };
    let color = backend.create_color_texture(job.width, job.height, OUTPUT_FORMAT, background);
    let depth = backend.create_depth_texture(job.width, job.height, 1.0);

    let mut camera = Camera::look_at(job.eye, job.target);
    let nodes = job.scene.snapshot();
    let mut composited = color.clone();

    for _ in 0..job.frames {
        let frame = FrameInputs {
            camera: camera.camera_data(job.width, job.height),
            target: TargetDescriptor::new(job.width, job.height, OUTPUT_FORMAT),
            color_source: &color,
            depth: &depth,
            z_buffer_params: camera.z_buffer_params(),
        };

        let result = pass.render_frame(&mut backend, &frame, &nodes);
        if let FrameStatus::Skipped(reason) = result.status {
            pass.teardown(&mut backend);
            anyhow::bail!("Frame {} skipped: {reason}", pass.frame_index());
        }
        composited = result.color;
    }

    pass.teardown(&mut backend);

    let img = backend.read_texture(&composited)?;
    img.save(output)?;
    println!(
        "Rendered {} object(s), saved to: {}",
        nodes.len(),
        output.display()
    );

    Ok(())
}
