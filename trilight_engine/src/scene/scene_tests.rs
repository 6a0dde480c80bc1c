//! Tests for the scene collection

use super::*;
use crate::error::Result;
use crate::gpu::CommandList;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct CountingDrawable {
    ticks: Arc<AtomicU32>,
    draws: Arc<AtomicU32>,
}

impl Drawable for CountingDrawable {
    fn tick(&mut self, _delta_seconds: f32) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    fn draw(&self, _cmd: &dyn CommandList, _ctx: &DrawContext, _parent: Mat4) -> Result<()> {
        self.draws.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[test]
fn test_add_and_remove() {
    let mut scene = Scene::new();
    assert!(scene.is_empty());

    let key = scene.add(Box::new(CountingDrawable::default()));
    assert_eq!(scene.len(), 1);

    assert!(scene.remove(key).is_some());
    assert!(scene.is_empty());

    // Stale handles are rejected.
    assert!(scene.remove(key).is_none());
}

#[test]
fn test_tick_reaches_every_drawable() {
    let mut scene = Scene::new();
    let ticks = Arc::new(AtomicU32::new(0));
    for _ in 0..3 {
        scene.add(Box::new(CountingDrawable {
            ticks: ticks.clone(),
            draws: Arc::default(),
        }));
    }

    scene.tick_all(0.016);
    assert_eq!(ticks.load(Ordering::Relaxed), 3);
}

#[test]
fn test_draw_reaches_every_drawable() {
    use crate::gpu::mock_device::MockDevice;
    use crate::gpu::Device;
    use crate::textures::TextureRegistry;

    let mock = Arc::new(MockDevice::new());
    let device: Arc<dyn Device> = mock.clone();
    let registry = TextureRegistry::new(&device).unwrap();
    let pipeline = device.create_pipeline(&test_pipeline()).unwrap();

    let mut scene = Scene::new();
    let draws = Arc::new(AtomicU32::new(0));
    for _ in 0..4 {
        scene.add(Box::new(CountingDrawable {
            ticks: Arc::default(),
            draws: draws.clone(),
        }));
    }

    let cmd = mock.create_command_list();
    cmd.begin().unwrap();
    scene
        .draw_all(
            &cmd,
            &DrawContext {
                pipeline: &pipeline,
                model_push_offset: 128,
                textures: Some(&registry),
            },
        )
        .unwrap();
    cmd.end().unwrap();

    assert_eq!(draws.load(Ordering::Relaxed), 4);
}

fn test_pipeline() -> crate::gpu::PipelineDesc {
    use crate::gpu::*;

    PipelineDesc {
        name: "scene_test".to_string(),
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
    }
}
