//! Recording backend shared by the integration tests
//!
//! Every call is appended to an event log; textures and buffers are plain
//! ids so tests can check exactly what was allocated, bound and released.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use glam::{Mat4, Vec3};
use marcher_render::{
    BackendError, Camera, FrameInputs, RaymarchBackend, ShaderParam, TargetDescriptor, wgpu,
};
use marcher_sdf::{PackedScene, PackedSdf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TexId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    CreateTarget(TexId, TargetDescriptor),
    ReleaseTarget(TexId),
    CreateBuffer(BufId, usize),
    ReleaseBuffer(BufId),
    SetParam(String, ShaderParam),
    SetTexture(String, TexId),
    SetBuffer(String, BufId),
    Dispatch([u32; 3]),
    Blit(TexId, TexId),
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub events: Vec<Event>,
    pub live_targets: BTreeSet<TexId>,
    pub live_buffers: BTreeSet<BufId>,
    /// Records uploaded into each scene buffer
    pub contents: BTreeMap<BufId, Vec<PackedSdf>>,
    pub fail_target: bool,
    pub fail_buffer: bool,
    pub fail_dispatch: bool,
    pub fail_blit: bool,
    next_id: u32,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A texture owned by the host (color or depth buffer)
    pub fn host_texture(&mut self) -> TexId {
        TexId(self.next())
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn position(&self, pred: impl Fn(&Event) -> bool) -> Option<usize> {
        self.events.iter().position(pred)
    }

    /// Last value set for a parameter name
    pub fn param(&self, name: &str) -> Option<ShaderParam> {
        self.events.iter().rev().find_map(|e| match e {
            Event::SetParam(n, value) if n == name => Some(*value),
            _ => None,
        })
    }

    /// Last texture bound to a name
    pub fn texture(&self, name: &str) -> Option<TexId> {
        self.events.iter().rev().find_map(|e| match e {
            Event::SetTexture(n, id) if n == name => Some(*id),
            _ => None,
        })
    }

    pub fn last_buffer_contents(&self) -> Option<&Vec<PackedSdf>> {
        self.contents.values().next_back()
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl RaymarchBackend for RecordingBackend {
    type Program = ();
    type Texture = TexId;
    type Buffer = BufId;

    fn create_target(&mut self, desc: &TargetDescriptor) -> Result<TexId, BackendError> {
        if self.fail_target {
            return Err(BackendError::InvalidTargetSize {
                width: desc.width,
                height: desc.height,
                limit: 0,
            });
        }
        let id = TexId(self.next());
        self.live_targets.insert(id);
        self.events.push(Event::CreateTarget(id, *desc));
        Ok(id)
    }

    fn release_target(&mut self, target: TexId) {
        assert!(self.live_targets.remove(&target), "double release of {target:?}");
        self.events.push(Event::ReleaseTarget(target));
    }

    fn create_scene_buffer(&mut self, scene: &PackedScene) -> Result<BufId, BackendError> {
        if self.fail_buffer {
            return Err(BackendError::Allocation("out of memory".into()));
        }
        let id = BufId(self.next());
        self.live_buffers.insert(id);
        self.contents.insert(id, scene.records().to_vec());
        self.events.push(Event::CreateBuffer(id, scene.count()));
        Ok(id)
    }

    fn release_buffer(&mut self, buffer: BufId) {
        assert!(self.live_buffers.remove(&buffer), "double release of {buffer:?}");
        self.events.push(Event::ReleaseBuffer(buffer));
    }

    fn set_param(&mut self, _program: &(), name: &str, value: ShaderParam) {
        self.events.push(Event::SetParam(name.to_string(), value));
    }

    fn set_texture(&mut self, _program: &(), name: &str, texture: &TexId) {
        self.events.push(Event::SetTexture(name.to_string(), *texture));
    }

    fn set_buffer(&mut self, _program: &(), name: &str, buffer: &BufId) {
        self.events.push(Event::SetBuffer(name.to_string(), *buffer));
    }

    fn dispatch(&mut self, _program: &(), groups: [u32; 3]) -> Result<(), BackendError> {
        if self.fail_dispatch {
            return Err(BackendError::Dispatch("device lost".into()));
        }
        self.events.push(Event::Dispatch(groups));
        Ok(())
    }

    fn blit(&mut self, from: &TexId, to: &TexId) -> Result<(), BackendError> {
        if self.fail_blit {
            return Err(BackendError::CopyMismatch {
                from: (1, 1, wgpu::TextureFormat::Rgba8Unorm),
                to: (2, 2, wgpu::TextureFormat::Rgba8Unorm),
            });
        }
        self.events.push(Event::Blit(*from, *to));
        Ok(())
    }
}

/// Host color and depth textures plus frame inputs of the given size
pub struct Host {
    pub color: TexId,
    pub depth: TexId,
    pub camera: Camera,
    pub width: u32,
    pub height: u32,
}

impl Host {
    pub fn new(backend: &mut RecordingBackend, width: u32, height: u32) -> Self {
        Self {
            color: backend.host_texture(),
            depth: backend.host_texture(),
            camera: Camera::look_at(Vec3::new(0.0, 1.0, 5.0), Vec3::ZERO),
            width,
            height,
        }
    }

    pub fn frame(&self) -> FrameInputs<'_, TexId> {
        let camera = self.camera.clone().camera_data(self.width, self.height);
        FrameInputs {
            camera,
            target: TargetDescriptor::new(self.width, self.height, wgpu::TextureFormat::Rgba8Unorm),
            color_source: &self.color,
            depth: &self.depth,
            z_buffer_params: self.camera.z_buffer_params(),
        }
    }
}

pub fn matrix(param: Option<ShaderParam>) -> Mat4 {
    match param {
        Some(ShaderParam::Matrix(m)) => m,
        other => panic!("expected a matrix, got {other:?}"),
    }
}
