//! Marcher CLI - Headless host for the raymarch pass

mod host;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use glam::Vec3;
use marcher_render::{ColorMode, FrameUniforms, RaymarchSettings, kernel_interface, names};
use marcher_sdf::{PACKED_MATERIAL_SIZE, PACKED_SDF_FIELDS, PACKED_SDF_STRIDE, Scene, SceneSource, pack};
use std::path::{Path, PathBuf};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "marcher")]
#[command(about = "Raymarch SDF scenes through a compute kernel", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a scene file to an image (headless)
    Render {
        /// Scene file (.json)
        scene: PathBuf,

        /// WGSL raymarch kernel
        #[arg(short, long)]
        shader: PathBuf,

        /// Kernel entry point
        #[arg(long, default_value = "main")]
        entry: String,

        /// Pass settings file (.json)
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Override the settings' color mode
        #[arg(long, value_enum)]
        color_mode: Option<ColorModeArg>,

        /// Override the settings' iteration limit
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Image width
        #[arg(long, default_value = "640")]
        width: u32,

        /// Image height
        #[arg(long, default_value = "480")]
        height: u32,

        /// Frames to run before saving the last one
        #[arg(long, default_value = "1")]
        frames: u32,

        /// Camera position (x,y,z)
        #[arg(long, value_delimiter = ',', default_values_t = [0.0, 1.5, 5.0])]
        eye: Vec<f32>,

        /// Point the camera looks at (x,y,z)
        #[arg(long, value_delimiter = ',', default_values_t = [0.0, 0.0, 0.0])]
        target: Vec<f32>,

        /// Color the frame is cleared to before the pass runs (r,g,b)
        #[arg(long, value_delimiter = ',', default_values_t = [0.1, 0.1, 0.1])]
        background: Vec<f32>,

        /// Output image file (.png)
        #[arg(short, long, default_value = "render.png")]
        output: PathBuf,
    },

    /// Print the packed record layout and the kernel interface
    Layout,

    /// Pack a scene file into GPU records
    Pack {
        /// Scene file (.json)
        scene: PathBuf,

        /// Write the raw records to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorModeArg {
    Brdf,
    Heatmap,
}

impl From<ColorModeArg> for ColorMode {
    fn from(arg: ColorModeArg) -> Self {
        match arg {
            ColorModeArg::Brdf => ColorMode::Brdf,
            ColorModeArg::Heatmap => ColorMode::Heatmap,
        }
    }
}

fn main() -> Result<()> {
    // Logs go to stderr so `pack` output stays clean
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            scene,
            shader,
            entry,
            settings,
            color_mode,
            max_iterations,
            width,
            height,
            frames,
            eye,
            target,
            background,
            output,
        } => {
            let settings = load_settings(settings.as_deref(), color_mode, max_iterations)?;
            let job = host::RenderJob {
                scene: Scene::load(&scene)
                    .with_context(|| format!("Failed to load scene {}", scene.display()))?,
                kernel: std::fs::read_to_string(&shader)
                    .with_context(|| format!("Failed to read kernel {}", shader.display()))?,
                entry,
                settings,
                width,
                height,
                frames,
                eye: vec3(&eye)?,
                target: vec3(&target)?,
                background: vec3(&background)?,
            };
            host::run_render(&job, &output)?;
        }
        Commands::Layout => {
            run_layout()?;
        }
        Commands::Pack { scene, output } => {
            run_pack(&scene, output.as_deref())?;
        }
    }

    Ok(())
}

/// Settings from an optional JSON file, with command-line overrides applied
fn load_settings(
    path: Option<&Path>,
    color_mode: Option<ColorModeArg>,
    max_iterations: Option<u32>,
) -> Result<RaymarchSettings> {
    let mut settings = match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Invalid settings file {}", path.display()))?
        }
        None => RaymarchSettings::default(),
    };

    if let Some(mode) = color_mode {
        settings.color_mode = mode.into();
    }
    if let Some(max_iterations) = max_iterations {
        settings.max_iterations = max_iterations;
    }

    Ok(settings)
}

fn vec3(values: &[f32]) -> Result<Vec3> {
    match values {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => anyhow::bail!("Expected three components, got {}", values.len()),
    }
}

fn run_layout() -> Result<()> {
    println!("PackedSdf: {PACKED_SDF_STRIDE} bytes");
    println!("  {:>6}  field", "offset");
    for (field, offset) in PACKED_SDF_FIELDS {
        println!("  {offset:>6}  {field}");
    }
    println!("PackedMaterial: {PACKED_MATERIAL_SIZE} bytes");
    println!(
        "FrameUniforms: {} bytes",
        std::mem::size_of::<FrameUniforms>()
    );

    println!();
    println!("Textures: {}", names::TEXTURES.join(", "));
    println!("Uniforms: {}", names::UNIFORMS.join(", "));
    println!("Buffer:   {}", names::VOLUMES);

    let format = marcher_render::wgpu::TextureFormat::Rgba8Unorm;
    let interface =
        kernel_interface(format).context("Output format has no storage texture form")?;
    println!();
    println!("// Kernel interface ({format:?})");
    println!("{interface}");

    Ok(())
}

fn run_pack(scene_path: &Path, output: Option<&Path>) -> Result<()> {
    let scene = Scene::load(scene_path)
        .with_context(|| format!("Failed to load scene {}", scene_path.display()))?;
    let nodes = scene.snapshot();
    let packed = pack(&nodes);

    println!(
        "{} of {} nodes active, {} bytes",
        packed.count(),
        scene.len(),
        packed.byte_len()
    );
    for (index, node) in nodes.iter().enumerate() {
        println!(
            "  {index:>3}  {:<16} {:<10} {:<5} blend={:.2}",
            node.label(),
            node.kind.name(),
            node.operation.name(),
            node.blend_strength
        );
    }

    if let Some(output) = output {
        std::fs::write(output, packed.as_bytes())
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("Saved to: {}", output.display());
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_render_flags() {
        let cli = Cli::try_parse_from([
            "marcher",
            "render",
            "scene.json",
            "--shader",
            "kernel.wgsl",
            "--eye",
            "1,2,3",
            "--color-mode",
            "heatmap",
            "--frames",
            "3",
        ])
        .unwrap();

        match cli.command {
            Commands::Render {
                eye,
                target,
                frames,
                color_mode,
                entry,
                ..
            } => {
                assert_eq!(eye, vec![1.0, 2.0, 3.0]);
                assert_eq!(target, vec![0.0, 0.0, 0.0]);
                assert_eq!(frames, 3);
                assert!(matches!(color_mode, Some(ColorModeArg::Heatmap)));
                assert_eq!(entry, "main");
            }
            _ => panic!("expected render command"),
        }
    }

    #[test]
    fn test_flag_overrides_apply_over_defaults() {
        let settings = load_settings(None, Some(ColorModeArg::Heatmap), Some(32)).unwrap();

        assert_eq!(settings.color_mode, ColorMode::Heatmap);
        assert_eq!(settings.max_iterations, 32);
        assert_eq!(settings.max_distance, 100.0);
    }

    #[test]
    fn test_settings_file_with_overrides() {
        let path = std::env::temp_dir().join("marcher_cli_settings_test.json");
        std::fs::write(&path, r#"{ "max_iterations": 12, "shadow_bias": 0.2 }"#).unwrap();

        let settings = load_settings(Some(&path), None, Some(20)).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(settings.max_iterations, 20);
        assert_eq!(settings.shadow_bias, 0.2);
        assert_eq!(settings.color_mode, ColorMode::Brdf);
    }

    #[test]
    fn test_vec3_requires_three_components() {
        assert_eq!(vec3(&[1.0, 2.0, 3.0]).unwrap(), Vec3::new(1.0, 2.0, 3.0));
        assert!(vec3(&[1.0]).is_err());
    }
}
