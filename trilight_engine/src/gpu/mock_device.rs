//! Mock GPU backend for tests
//!
//! Implements the full device/command-list surface without touching a
//! GPU. Every resource is a plain struct, every recorded command becomes
//! a `MockCommand` value, and a shared layout tracker validates the
//! image-transition protocol:
//!
//! - a transition whose `from` does not match the image's tracked state
//!   is recorded as a hazard (`Undefined` is exempt: it discards)
//! - sampling a texture that is not in `ShaderRead` is a hazard
//! - rendering into an attachment that is not in its attachment state
//!   is a hazard
//!
//! Tests construct the real passes against this device and then assert
//! on the recorded command stream and the hazard list.

use rustc_hash::FxHashMap;
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::binding_group::{
    BindingGroup, BindingGroupLayout, BindingGroupLayoutDesc, BindingResource,
};
use super::buffer::{Buffer, BufferDesc};
use super::command_list::{CommandList, Rect2D, RenderingDesc, ResolveMode, Viewport};
use super::device::Device;
use super::pipeline::{Pipeline, PipelineDesc, ShaderStage};
use super::texture::{Extent2d, GpuImage, Texture, TextureDesc, TextureFormat};
use super::transition::{ImageAccess, ImageTransition};
use crate::error::{Error, Result};

// ===== LAYOUT TRACKER =====

/// Shared per-image access state, plus every detected hazard
#[derive(Default)]
struct TrackerState {
    /// Current access state per image id (absent means Undefined)
    layouts: FxHashMap<u64, ImageAccess>,

    /// Human-readable protocol violations, in detection order
    hazards: Vec<String>,
}

impl TrackerState {
    fn current(&self, id: u64) -> ImageAccess {
        self.layouts.get(&id).copied().unwrap_or(ImageAccess::Undefined)
    }
}

// ===== DEVICE =====

/// GPU-free device implementation
pub struct MockDevice {
    next_id: AtomicU64,
    tracker: Arc<Mutex<TrackerState>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            tracker: Arc::new(Mutex::new(TrackerState::default())),
        }
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Create a command list recording into this device's tracker
    pub fn create_command_list(&self) -> MockCommandList {
        MockCommandList {
            tracker: self.tracker.clone(),
            commands: Mutex::new(Vec::new()),
            recording: Mutex::new(false),
            in_rendering: Mutex::new(false),
        }
    }

    /// Create a stand-in for a swapchain image
    pub fn create_surface_image(&self, extent: Extent2d) -> MockSurfaceImage {
        MockSurfaceImage {
            id: self.allocate_id(),
            extent,
        }
    }

    /// All hazards detected so far
    pub fn hazards(&self) -> Vec<String> {
        self.tracker.lock().unwrap().hazards.clone()
    }

    /// Current tracked access state of an image
    pub fn image_access(&self, image: &dyn GpuImage) -> ImageAccess {
        self.tracker.lock().unwrap().current(image.image_id())
    }
}

impl Device for MockDevice {
    fn create_texture(&self, desc: &TextureDesc) -> Result<Arc<dyn Texture>> {
        if desc.extent.width == 0 || desc.extent.height == 0 {
            return Err(Error::InvalidResource(format!(
                "texture '{}' has zero extent",
                desc.name
            )));
        }
        Ok(Arc::new(MockTexture {
            id: self.allocate_id(),
            desc: desc.clone(),
        }))
    }

    fn create_texture_with_data(
        &self,
        desc: &TextureDesc,
        data: &[u8],
    ) -> Result<Arc<dyn Texture>> {
        let expected =
            (desc.extent.width * desc.extent.height * desc.format.size_bytes()) as usize;
        if data.len() != expected {
            return Err(Error::InvalidResource(format!(
                "texture '{}' upload is {} bytes, expected {}",
                desc.name,
                data.len(),
                expected
            )));
        }
        let texture = self.create_texture(desc)?;
        // Uploads end shader-readable, mirroring the staging-copy path
        // of the real backends.
        self.tracker
            .lock()
            .unwrap()
            .layouts
            .insert(texture.image_id(), ImageAccess::ShaderRead);
        Ok(texture)
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>> {
        if desc.size == 0 {
            return Err(Error::InvalidResource(format!(
                "buffer '{}' has zero size",
                desc.name
            )));
        }
        Ok(Arc::new(MockBuffer {
            desc: desc.clone(),
            contents: Mutex::new(vec![0u8; desc.size as usize]),
        }))
    }

    fn create_binding_group_layout(
        &self,
        desc: &BindingGroupLayoutDesc,
    ) -> Result<Arc<dyn BindingGroupLayout>> {
        Ok(Arc::new(MockBindingGroupLayout { desc: desc.clone() }))
    }

    fn create_binding_group(
        &self,
        layout: &Arc<dyn BindingGroupLayout>,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn BindingGroup>> {
        let layout_desc = layout.desc();
        if resources.len() != layout_desc.entries.len() {
            return Err(Error::InvalidResource(format!(
                "binding group for layout '{}' needs {} resources, got {}",
                layout_desc.name,
                layout_desc.entries.len(),
                resources.len()
            )));
        }

        let mut sampled_images = Vec::new();
        for (slot, resource) in layout_desc.entries.iter().zip(resources) {
            match resource {
                BindingResource::UniformBuffer(_) => {}
                BindingResource::SampledTexture(texture) => {
                    sampled_images.push(texture.image_id());
                }
                BindingResource::SampledTextureArray(textures) => {
                    if textures.len() as u32 != slot.count {
                        return Err(Error::InvalidResource(format!(
                            "array binding {} of layout '{}' needs {} textures, got {}",
                            slot.binding,
                            layout_desc.name,
                            slot.count,
                            textures.len()
                        )));
                    }
                    for texture in textures {
                        sampled_images.push(texture.image_id());
                    }
                }
            }
        }

        Ok(Arc::new(MockBindingGroup { sampled_images }))
    }

    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Arc<dyn Pipeline>> {
        if !desc.shaders.iter().any(|s| s.stage == ShaderStage::Vertex) {
            return Err(Error::InvalidResource(format!(
                "pipeline '{}' has no vertex shader",
                desc.name
            )));
        }
        Ok(Arc::new(MockPipeline { desc: desc.clone() }))
    }
}

// ===== RESOURCES =====

pub struct MockTexture {
    id: u64,
    desc: TextureDesc,
}

impl GpuImage for MockTexture {
    fn image_id(&self) -> u64 {
        self.id
    }

    fn extent(&self) -> Extent2d {
        self.desc.extent
    }

    fn format(&self) -> TextureFormat {
        self.desc.format
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Texture for MockTexture {
    fn desc(&self) -> &TextureDesc {
        &self.desc
    }
}

/// Stand-in for a swapchain image: a `GpuImage` that is not a `Texture`
pub struct MockSurfaceImage {
    id: u64,
    extent: Extent2d,
}

impl GpuImage for MockSurfaceImage {
    fn image_id(&self) -> u64 {
        self.id
    }

    fn extent(&self) -> Extent2d {
        self.extent
    }

    fn format(&self) -> TextureFormat {
        TextureFormat::Bgra8Unorm
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockBuffer {
    desc: BufferDesc,
    contents: Mutex<Vec<u8>>,
}

impl MockBuffer {
    /// Snapshot of the buffer contents, for assertions on uploads
    pub fn contents(&self) -> Vec<u8> {
        self.contents.lock().unwrap().clone()
    }
}

impl Buffer for MockBuffer {
    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset + data.len() as u64;
        if end > self.desc.size {
            return Err(Error::InvalidResource(format!(
                "write of {} bytes at offset {} overruns buffer '{}' ({} bytes)",
                data.len(),
                offset,
                self.desc.name,
                self.desc.size
            )));
        }
        let mut contents = self.contents.lock().unwrap();
        contents[offset as usize..end as usize].copy_from_slice(data);
        Ok(())
    }

    fn size(&self) -> u64 {
        self.desc.size
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockBindingGroupLayout {
    desc: BindingGroupLayoutDesc,
}

impl BindingGroupLayout for MockBindingGroupLayout {
    fn desc(&self) -> &BindingGroupLayoutDesc {
        &self.desc
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockBindingGroup {
    /// Image ids of every texture sampled through this group
    sampled_images: Vec<u64>,
}

pub struct MockPipeline {
    desc: PipelineDesc,
}

impl MockPipeline {
    /// The description this pipeline was created from, for assertions
    pub fn desc(&self) -> &PipelineDesc {
        &self.desc
    }
}

impl BindingGroup for MockBindingGroup {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Pipeline for MockPipeline {
    fn push_constant_size(&self) -> u32 {
        self.desc.push_constant_size
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ===== COMMAND LIST =====

/// One recorded command, reduced to the data tests assert on
#[derive(Debug, Clone, PartialEq)]
pub enum MockCommand {
    Begin,
    End,
    /// One batched barrier dependency: (image id, from, to) per entry
    Transition(Vec<(u64, ImageAccess, ImageAccess)>),
    BeginRendering {
        extent: Extent2d,
        /// (target id, resolve id, resolve mode, clear color)
        color: Option<(u64, Option<u64>, ResolveMode, [f32; 4])>,
        /// (target id, clear depth)
        depth: Option<(u64, f32)>,
    },
    EndRendering,
    SetViewport(Viewport),
    SetScissor(Rect2D),
    BindPipeline(String),
    BindBindingGroup {
        set_index: u32,
        sampled_images: Vec<u64>,
    },
    PushConstants {
        offset: u32,
        data: Vec<u8>,
    },
    BindVertexBuffers {
        first_binding: u32,
        count: u32,
    },
    BindIndexBuffer,
    Draw {
        vertex_count: u32,
        first_vertex: u32,
    },
    DrawIndexed {
        index_count: u32,
    },
}

pub struct MockCommandList {
    tracker: Arc<Mutex<TrackerState>>,
    commands: Mutex<Vec<MockCommand>>,
    recording: Mutex<bool>,
    in_rendering: Mutex<bool>,
}

impl MockCommandList {
    /// Snapshot of the recorded command stream
    pub fn commands(&self) -> Vec<MockCommand> {
        self.commands.lock().unwrap().clone()
    }

    fn record(&self, command: MockCommand) {
        self.commands.lock().unwrap().push(command);
    }

    fn check_attachment(tracker: &mut TrackerState, id: u64, expected: ImageAccess, role: &str) {
        let current = tracker.current(id);
        if current != expected {
            tracker.hazards.push(format!(
                "{} image {} is in {:?}, expected {:?} at begin_rendering",
                role, id, current, expected
            ));
        }
    }
}

impl CommandList for MockCommandList {
    fn begin(&self) -> Result<()> {
        *self.recording.lock().unwrap() = true;
        self.record(MockCommand::Begin);
        Ok(())
    }

    fn end(&self) -> Result<()> {
        *self.recording.lock().unwrap() = false;
        self.record(MockCommand::End);
        Ok(())
    }

    fn transition_images(&self, transitions: &[ImageTransition]) -> Result<()> {
        let mut batch = Vec::with_capacity(transitions.len());
        {
            let mut tracker = self.tracker.lock().unwrap();
            for transition in transitions {
                let id = transition.image.image_id();
                let current = tracker.current(id);
                // `from: Undefined` is a discard and is valid from any state.
                if transition.from != current && transition.from != ImageAccess::Undefined {
                    tracker.hazards.push(format!(
                        "image {} transitioned from {:?} but is in {:?}",
                        id, transition.from, current
                    ));
                }
                tracker.layouts.insert(id, transition.to);
                batch.push((id, transition.from, transition.to));
            }
        }
        self.record(MockCommand::Transition(batch));
        Ok(())
    }

    fn begin_rendering(&self, desc: &RenderingDesc) -> Result<()> {
        if *self.in_rendering.lock().unwrap() {
            return Err(Error::BackendError(
                "begin_rendering inside an open rendering scope".to_string(),
            ));
        }

        let color = desc.color.as_ref().map(|color| {
            (
                color.target.image_id(),
                color.resolve.map(|r| r.image_id()),
                color.resolve_mode,
                color.clear,
            )
        });
        let depth = desc.depth.as_ref().map(|depth| (depth.target.image_id(), depth.clear));

        {
            let mut tracker = self.tracker.lock().unwrap();
            if let Some((target, resolve, _, _)) = &color {
                Self::check_attachment(&mut tracker, *target, ImageAccess::ColorAttachment, "color");
                if let Some(resolve) = resolve {
                    Self::check_attachment(
                        &mut tracker,
                        *resolve,
                        ImageAccess::ColorAttachment,
                        "resolve",
                    );
                }
            }
            if let Some((target, _)) = &depth {
                Self::check_attachment(&mut tracker, *target, ImageAccess::DepthAttachment, "depth");
            }
        }

        *self.in_rendering.lock().unwrap() = true;
        self.record(MockCommand::BeginRendering {
            extent: desc.extent,
            color,
            depth,
        });
        Ok(())
    }

    fn end_rendering(&self) -> Result<()> {
        if !*self.in_rendering.lock().unwrap() {
            return Err(Error::BackendError(
                "end_rendering without begin_rendering".to_string(),
            ));
        }
        *self.in_rendering.lock().unwrap() = false;
        self.record(MockCommand::EndRendering);
        Ok(())
    }

    fn set_viewport(&self, viewport: Viewport) -> Result<()> {
        self.record(MockCommand::SetViewport(viewport));
        Ok(())
    }

    fn set_scissor(&self, scissor: Rect2D) -> Result<()> {
        self.record(MockCommand::SetScissor(scissor));
        Ok(())
    }

    fn bind_pipeline(&self, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        let mock = pipeline
            .as_any()
            .downcast_ref::<MockPipeline>()
            .ok_or_else(|| Error::BackendError("pipeline is not a MockPipeline".to_string()))?;
        self.record(MockCommand::BindPipeline(mock.desc.name.clone()));
        Ok(())
    }

    fn bind_binding_group(
        &self,
        _pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        group: &Arc<dyn BindingGroup>,
    ) -> Result<()> {
        let mock = group
            .as_any()
            .downcast_ref::<MockBindingGroup>()
            .ok_or_else(|| Error::BackendError("group is not a MockBindingGroup".to_string()))?;

        {
            let mut tracker = self.tracker.lock().unwrap();
            for id in &mock.sampled_images {
                let current = tracker.current(*id);
                if current != ImageAccess::ShaderRead {
                    tracker
                        .hazards
                        .push(format!("image {} sampled while in {:?}", id, current));
                }
            }
        }

        self.record(MockCommand::BindBindingGroup {
            set_index,
            sampled_images: mock.sampled_images.clone(),
        });
        Ok(())
    }

    fn push_constants(&self, pipeline: &Arc<dyn Pipeline>, offset: u32, data: &[u8]) -> Result<()> {
        if offset + data.len() as u32 > pipeline.push_constant_size() {
            return Err(Error::InvalidResource(format!(
                "push constant write of {} bytes at offset {} overruns block of {} bytes",
                data.len(),
                offset,
                pipeline.push_constant_size()
            )));
        }
        self.record(MockCommand::PushConstants {
            offset,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn bind_vertex_buffers(&self, first_binding: u32, buffers: &[&Arc<dyn Buffer>]) -> Result<()> {
        self.record(MockCommand::BindVertexBuffers {
            first_binding,
            count: buffers.len() as u32,
        });
        Ok(())
    }

    fn bind_index_buffer(&self, _buffer: &Arc<dyn Buffer>) -> Result<()> {
        self.record(MockCommand::BindIndexBuffer);
        Ok(())
    }

    fn draw(&self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.record(MockCommand::Draw {
            vertex_count,
            first_vertex,
        });
        Ok(())
    }

    fn draw_indexed(&self, index_count: u32) -> Result<()> {
        self.record(MockCommand::DrawIndexed { index_count });
        Ok(())
    }
}

#[cfg(test)]
#[path = "mock_device_tests.rs"]
mod mock_device_tests;
