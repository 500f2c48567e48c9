//! wgpu implementation of [`RaymarchBackend`]
//!
//! Each program is a compute pipeline compiled from integrator WGSL prefixed
//! with [`kernel_interface`]. Named parameters are staged into a
//! [`FrameUniforms`] and uploaded when the kernel is dispatched.

use std::sync::Arc;

use bytemuck::Zeroable;
use marcher_sdf::{PackedScene, PackedSdf};
use tracing::{debug, error, trace, warn};
use wgpu::util::DeviceExt;

use crate::backend::{BackendError, RaymarchBackend, TargetDescriptor};
use crate::names;
use crate::uniforms::{FrameUniforms, ShaderParam, kernel_interface, slots};

/// Handle to a compute program loaded into a [`WgpuBackend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(usize);

/// Shared handle to a wgpu texture
#[derive(Debug, Clone)]
pub struct WgpuTexture(Arc<wgpu::Texture>);

impl WgpuTexture {
    pub fn texture(&self) -> &wgpu::Texture {
        &self.0
    }

    pub fn size(&self) -> (u32, u32) {
        (self.0.width(), self.0.height())
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.0.format()
    }

    fn view(&self) -> wgpu::TextureView {
        self.0.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<wgpu::Texture> for WgpuTexture {
    fn from(texture: wgpu::Texture) -> Self {
        Self(Arc::new(texture))
    }
}

/// Scene buffer and the number of records it holds
#[derive(Debug, Clone)]
pub struct WgpuBuffer {
    buffer: Arc<wgpu::Buffer>,
    count: u32,
}

impl WgpuBuffer {
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn size(&self) -> u64 {
        self.buffer.size()
    }
}

/// Pipeline plus everything bound to it for the next dispatch
struct ProgramState {
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    uniforms: FrameUniforms,
    source: Option<WgpuTexture>,
    destination: Option<WgpuTexture>,
    depth: Option<WgpuTexture>,
    volumes: Option<Arc<wgpu::Buffer>>,
}

/// Raymarch backend on a wgpu device
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    programs: Vec<ProgramState>,
}

impl WgpuBackend {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        device.on_uncaptured_error(Box::new(|err: wgpu::Error| {
            error!("Uncaptured GPU error: {err}");
        }));

        Self {
            device,
            queue,
            programs: Vec::new(),
        }
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    /// Compile a kernel writing to `output_format` and return its handle
    pub fn load_program(
        &mut self,
        kernel_source: &str,
        entry_point: &str,
        output_format: wgpu::TextureFormat,
    ) -> Result<ProgramId, BackendError> {
        let interface =
            kernel_interface(output_format).ok_or(BackendError::UnsupportedFormat(output_format))?;
        let source = format!("{interface}\n{kernel_source}");

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Raymarch Kernel"),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        let layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Raymarch Bind Group Layout"),
                entries: &bind_group_layout_entries(output_format),
            });

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Raymarch Pipeline Layout"),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });

        let pipeline = self
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("Raymarch Pipeline"),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some(entry_point),
                compilation_options: Default::default(),
                cache: None,
            });

        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(BackendError::Shader(err.to_string()));
        }

        let uniform_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        self.programs.push(ProgramState {
            pipeline,
            layout,
            uniform_buffer,
            uniforms: FrameUniforms::zeroed(),
            source: None,
            destination: None,
            depth: None,
            volumes: None,
        });

        let id = ProgramId(self.programs.len() - 1);
        debug!(?id, entry_point, ?output_format, "Loaded raymarch kernel");
        Ok(id)
    }

    /// Color texture usable as a frame's color source or composite target
    pub fn create_color_texture(
        &self,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        clear: wgpu::Color,
    ) -> WgpuTexture {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Color Texture"),
            size: extent(width, height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Clear Color Encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Color"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        texture.into()
    }

    /// `Depth32Float` texture cleared to `depth` (1.0 is the far plane)
    pub fn create_depth_texture(&self, width: u32, height: u32, depth: f32) -> WgpuTexture {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: extent(width, height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Clear Depth Encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Depth"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(depth),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        texture.into()
    }

    /// Copy an 8-bit RGBA texture back to the CPU.
    ///
    /// Blocks until the GPU has finished all submitted work.
    pub fn read_texture(&self, texture: &WgpuTexture) -> Result<image::RgbaImage, BackendError> {
        let format = texture.format();
        if format.remove_srgb_suffix() != wgpu::TextureFormat::Rgba8Unorm {
            return Err(BackendError::Readback(format!(
                "cannot read back {format:?} as RGBA8"
            )));
        }
        let (width, height) = texture.size();

        // Rows in the staging buffer are padded to the copy alignment
        let bytes_per_pixel = 4u32;
        let unpadded_bytes_per_row = width * bytes_per_pixel;
        let padded_bytes_per_row =
            unpadded_bytes_per_row.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
                * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let buffer_size = u64::from(padded_bytes_per_row) * u64::from(height);

        let output_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: buffer_size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });

        encoder.copy_texture_to_buffer(
            texel_copy(texture),
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            extent(width, height),
        );

        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = output_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::Wait)
            .map_err(|e| BackendError::Readback(e.to_string()))?;
        rx.recv()
            .map_err(|e| BackendError::Readback(e.to_string()))?
            .map_err(|e| BackendError::Readback(e.to_string()))?;

        let data = buffer_slice.get_mapped_range();

        let mut img = image::RgbaImage::new(width, height);
        for (y, row) in data
            .chunks_exact(padded_bytes_per_row as usize)
            .take(height as usize)
            .enumerate()
        {
            for (x, pixel) in row[..unpadded_bytes_per_row as usize]
                .chunks_exact(bytes_per_pixel as usize)
                .enumerate()
            {
                img.put_pixel(
                    x as u32,
                    y as u32,
                    image::Rgba([pixel[0], pixel[1], pixel[2], pixel[3]]),
                );
            }
        }

        drop(data);
        output_buffer.unmap();

        Ok(img)
    }

    fn program_mut(&mut self, program: ProgramId) -> Option<&mut ProgramState> {
        let state = self.programs.get_mut(program.0);
        if state.is_none() {
            warn!(?program, "Binding to unknown program ignored");
        }
        state
    }
}

impl RaymarchBackend for WgpuBackend {
    type Program = ProgramId;
    type Texture = WgpuTexture;
    type Buffer = WgpuBuffer;

    fn create_target(&mut self, desc: &TargetDescriptor) -> Result<WgpuTexture, BackendError> {
        let limit = self.device.limits().max_texture_dimension_2d;
        if desc.is_empty() || desc.width > limit || desc.height > limit {
            return Err(BackendError::InvalidTargetSize {
                width: desc.width,
                height: desc.height,
                limit,
            });
        }
        if desc.random_write && crate::uniforms::storage_format_name(desc.format).is_none() {
            return Err(BackendError::UnsupportedFormat(desc.format));
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Raymarch Target"),
            size: extent(desc.width, desc.height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format,
            usage: desc.usage(),
            view_formats: &[],
        });
        trace!(width = desc.width, height = desc.height, "Created raymarch target");
        Ok(texture.into())
    }

    fn release_target(&mut self, target: WgpuTexture) {
        for state in &mut self.programs {
            for slot in [&mut state.source, &mut state.destination, &mut state.depth] {
                if slot.as_ref().is_some_and(|bound| bound.same(&target)) {
                    *slot = None;
                }
            }
        }
        target.0.destroy();
        trace!("Released raymarch target");
    }

    fn create_scene_buffer(&mut self, scene: &PackedScene) -> Result<WgpuBuffer, BackendError> {
        let count = u32::try_from(scene.count())
            .map_err(|_| BackendError::Allocation(format!("{} records", scene.count())))?;

        // Storage bindings cannot be empty, so an empty scene gets one zeroed record
        let placeholder = [PackedSdf::zeroed()];
        let contents = if scene.is_empty() {
            bytemuck::cast_slice(&placeholder)
        } else {
            scene.as_bytes()
        };

        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Scene Buffer"),
                contents,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            });
        trace!(count, bytes = contents.len(), "Created scene buffer");

        Ok(WgpuBuffer {
            buffer: Arc::new(buffer),
            count,
        })
    }

    fn release_buffer(&mut self, buffer: WgpuBuffer) {
        for state in &mut self.programs {
            if state
                .volumes
                .as_ref()
                .is_some_and(|bound| Arc::ptr_eq(bound, &buffer.buffer))
            {
                state.volumes = None;
            }
        }
        buffer.buffer.destroy();
    }

    fn set_param(&mut self, program: &ProgramId, name: &str, value: ShaderParam) {
        if let Some(state) = self.program_mut(*program) {
            if !state.uniforms.apply(name, value) {
                warn!(name, ?value, "Unknown or mistyped kernel parameter");
            }
        }
    }

    fn set_texture(&mut self, program: &ProgramId, name: &str, texture: &WgpuTexture) {
        if let Some(state) = self.program_mut(*program) {
            let slot = match name {
                names::SOURCE => &mut state.source,
                names::DESTINATION => &mut state.destination,
                names::DEPTH_TEXTURE => &mut state.depth,
                _ => {
                    warn!(name, "Unknown kernel texture");
                    return;
                }
            };
            *slot = Some(texture.clone());
        }
    }

    fn set_buffer(&mut self, program: &ProgramId, name: &str, buffer: &WgpuBuffer) {
        if let Some(state) = self.program_mut(*program) {
            if name == names::VOLUMES {
                state.volumes = Some(Arc::clone(&buffer.buffer));
            } else {
                warn!(name, "Unknown kernel buffer");
            }
        }
    }

    fn dispatch(&mut self, program: &ProgramId, groups: [u32; 3]) -> Result<(), BackendError> {
        let state = self
            .programs
            .get(program.0)
            .ok_or(BackendError::UnknownProgram)?;

        let source = state
            .source
            .as_ref()
            .ok_or(BackendError::MissingBinding(names::SOURCE))?
            .view();
        let destination = state
            .destination
            .as_ref()
            .ok_or(BackendError::MissingBinding(names::DESTINATION))?
            .view();
        let depth = state
            .depth
            .as_ref()
            .ok_or(BackendError::MissingBinding(names::DEPTH_TEXTURE))?
            .view();
        let volumes = state
            .volumes
            .as_ref()
            .ok_or(BackendError::MissingBinding(names::VOLUMES))?;

        self.queue
            .write_buffer(&state.uniform_buffer, 0, bytemuck::bytes_of(&state.uniforms));

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Raymarch Bind Group"),
            layout: &state.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: slots::UNIFORMS,
                    resource: state.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: slots::SOURCE,
                    resource: wgpu::BindingResource::TextureView(&source),
                },
                wgpu::BindGroupEntry {
                    binding: slots::DESTINATION,
                    resource: wgpu::BindingResource::TextureView(&destination),
                },
                wgpu::BindGroupEntry {
                    binding: slots::DEPTH_TEXTURE,
                    resource: wgpu::BindingResource::TextureView(&depth),
                },
                wgpu::BindGroupEntry {
                    binding: slots::VOLUMES,
                    resource: volumes.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Raymarch Encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Raymarch Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&state.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(groups[0], groups[1], groups[2]);
        }
        let commands = encoder.finish();

        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(BackendError::Dispatch(err.to_string()));
        }

        self.queue.submit(std::iter::once(commands));
        Ok(())
    }

    fn blit(&mut self, from: &WgpuTexture, to: &WgpuTexture) -> Result<(), BackendError> {
        let (from_w, from_h) = from.size();
        let (to_w, to_h) = to.size();
        if (from_w, from_h) != (to_w, to_h)
            || from.format().remove_srgb_suffix() != to.format().remove_srgb_suffix()
        {
            return Err(BackendError::CopyMismatch {
                from: (from_w, from_h, from.format()),
                to: (to_w, to_h, to.format()),
            });
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Composite Encoder"),
            });
        encoder.copy_texture_to_texture(texel_copy(from), texel_copy(to), extent(from_w, from_h));
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

fn texel_copy(texture: &WgpuTexture) -> wgpu::TexelCopyTextureInfo<'_> {
    wgpu::TexelCopyTextureInfo {
        texture: texture.texture(),
        mip_level: 0,
        origin: wgpu::Origin3d::ZERO,
        aspect: wgpu::TextureAspect::All,
    }
}

fn bind_group_layout_entries(output_format: wgpu::TextureFormat) -> [wgpu::BindGroupLayoutEntry; 5] {
    let entry = |binding, ty| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty,
        count: None,
    };

    [
        entry(
            slots::UNIFORMS,
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
        ),
        entry(
            slots::SOURCE,
            wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
        ),
        entry(
            slots::DESTINATION,
            wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::WriteOnly,
                format: output_format,
                view_dimension: wgpu::TextureViewDimension::D2,
            },
        ),
        entry(
            slots::DEPTH_TEXTURE,
            wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Depth,
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
        ),
        entry(
            slots::VOLUMES,
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
        ),
    ]
}

/// Initialize wgpu for headless rendering (no window)
pub async fn init_headless() -> Result<(Arc<wgpu::Device>, Arc<wgpu::Queue>), BackendError> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| BackendError::Adapter(e.to_string()))?;

    debug!(adapter = ?adapter.get_info(), "Using GPU adapter");

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("Marcher Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: wgpu::Trace::Off,
        })
        .await
        .map_err(|e| BackendError::Device(e.to_string()))?;

    Ok((Arc::new(device), Arc::new(queue)))
}
