//! Tests for grouped and animated drawables

use super::*;
use crate::gpu::mock_device::MockDevice;
use crate::gpu::{
    BlendMode, CullMode, DepthState, Device, PipelineDesc, PrimitiveTopology, SampleCount,
    ShaderDesc, ShaderStage, TextureFormat, VertexLayout,
};
use crate::textures::TextureRegistry;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

struct RecordingDrawable {
    ticks: Arc<AtomicU32>,
    parents: Arc<Mutex<Vec<Mat4>>>,
}

impl Drawable for RecordingDrawable {
    fn tick(&mut self, _delta_seconds: f32) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    fn draw(&self, _cmd: &dyn CommandList, _ctx: &DrawContext, parent: Mat4) -> Result<()> {
        self.parents.lock().unwrap().push(parent);
        Ok(())
    }
}

fn setup() -> (Arc<MockDevice>, TextureRegistry, Arc<dyn crate::gpu::Pipeline>) {
    let mock = Arc::new(MockDevice::new());
    let device: Arc<dyn Device> = mock.clone();
    let registry = TextureRegistry::new(&device).unwrap();
    let pipeline = device
        .create_pipeline(&PipelineDesc {
            name: "entities_test".to_string(),
            shaders: vec![ShaderDesc {
                stage: ShaderStage::Vertex,
                source: "#version 450\nvoid main() {}\n",
                entry_point: "main",
            }],
            vertex_layout: VertexLayout::default(),
            topology: PrimitiveTopology::TriangleList,
            cull_mode: CullMode::None,
            depth: DepthState::DISABLED,
            blend: BlendMode::Disabled,
            sample_count: SampleCount::X1,
            color_format: Some(TextureFormat::Rgba8Unorm),
            depth_format: None,
            binding_group_layouts: vec![],
            push_constant_size: 192,
        })
        .unwrap();
    (mock, registry, pipeline)
}

#[test]
fn test_group_ticks_all_children() {
    let ticks = Arc::new(AtomicU32::new(0));
    let mut group = Group::new(Mat4::IDENTITY);
    for _ in 0..3 {
        group.add(Box::new(RecordingDrawable {
            ticks: ticks.clone(),
            parents: Arc::default(),
        }));
    }
    assert_eq!(group.len(), 3);

    group.tick(0.016);
    assert_eq!(ticks.load(Ordering::Relaxed), 3);
}

#[test]
fn test_group_composes_its_transform_once() {
    let (mock, registry, pipeline) = setup();
    let parents = Arc::new(Mutex::new(Vec::new()));

    let offset = Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0));
    let mut group = Group::new(offset);
    group.add(Box::new(RecordingDrawable {
        ticks: Arc::default(),
        parents: parents.clone(),
    }));

    let cmd = mock.create_command_list();
    cmd.begin().unwrap();
    let ctx = DrawContext {
        pipeline: &pipeline,
        model_push_offset: 128,
        textures: Some(&registry),
    };
    let outer = Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0));
    group.draw(&cmd, &ctx, outer).unwrap();
    cmd.end().unwrap();

    let seen = parents.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let expected = outer * offset;
    assert!(seen[0].abs_diff_eq(expected, 1e-6));
}
