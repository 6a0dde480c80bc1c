//! Tests for the shadow pass, driven through the mock backend

use super::*;
use crate::gpu::mock_device::{MockCommand, MockDevice, MockPipeline};
use crate::passes::light_rig::LightRig;

fn setup() -> (Arc<MockDevice>, Arc<dyn Device>, ShadowPass, LightRig) {
    let mock = Arc::new(MockDevice::new());
    let device: Arc<dyn Device> = mock.clone();
    let pass = ShadowPass::new(&device).unwrap();
    let rig = LightRig::new(&device).unwrap();
    (mock, device, pass, rig)
}

#[test]
fn test_pipeline_is_depth_only() {
    let (_, _, pass, _) = setup();
    let desc = pass
        .pipeline()
        .as_any()
        .downcast_ref::<MockPipeline>()
        .unwrap()
        .desc();

    assert!(desc.color_format.is_none());
    assert!(desc.binding_group_layouts.is_empty());
    assert!(desc.depth.bias.is_some());

    // Position stream only.
    assert_eq!(desc.vertex_layout.bindings.len(), 1);
    assert_eq!(desc.vertex_layout.bindings[0].attributes.len(), 1);
    assert_eq!(desc.vertex_layout.bindings[0].attributes[0].location, 0);
}

#[test]
fn test_creates_one_map_per_light() {
    let (_, _, pass, _) = setup();
    assert_eq!(pass.depth_maps().len(), LIGHT_COUNT);
    for map in pass.depth_maps() {
        assert_eq!(map.extent(), Extent2d::new(SHADOW_RESOLUTION, SHADOW_RESOLUTION));
        assert_eq!(map.format(), TextureFormat::D32Sfloat);
    }
}

#[test]
fn test_model_offset_follows_light_block() {
    let (_, _, pass, _) = setup();
    assert_eq!(pass.model_push_offset(), 128);
    assert_eq!(pass.pipeline().push_constant_size(), 192);
}

#[test]
fn test_pass_renders_once_per_light() {
    let (mock, _, pass, rig) = setup();
    let cmd = mock.create_command_list();

    cmd.begin().unwrap();
    pass.do_pass(&cmd, &rig, |_| Ok(())).unwrap();
    cmd.end().unwrap();

    let commands = cmd.commands();
    let begins = commands
        .iter()
        .filter(|c| matches!(c, MockCommand::BeginRendering { .. }))
        .count();
    assert_eq!(begins, LIGHT_COUNT);

    // Every rendering scope is depth-only with a 1.0 clear.
    for command in &commands {
        if let MockCommand::BeginRendering { color, depth, .. } = command {
            assert!(color.is_none());
            let (_, clear) = depth.expect("depth attachment");
            assert_eq!(clear, 1.0);
        }
    }

    assert!(mock.hazards().is_empty(), "hazards: {:?}", mock.hazards());
}

#[test]
fn test_transitions_bracket_the_pass_in_two_batches() {
    let (mock, _, pass, rig) = setup();
    let cmd = mock.create_command_list();

    cmd.begin().unwrap();
    pass.do_pass(&cmd, &rig, |_| Ok(())).unwrap();
    cmd.end().unwrap();

    let batches: Vec<_> = cmd
        .commands()
        .into_iter()
        .filter_map(|c| match c {
            MockCommand::Transition(batch) => Some(batch),
            _ => None,
        })
        .collect();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].len(), LIGHT_COUNT);
    assert_eq!(batches[1].len(), LIGHT_COUNT);

    for (_, from, to) in &batches[0] {
        assert_eq!(*from, ImageAccess::Undefined);
        assert_eq!(*to, ImageAccess::DepthAttachment);
    }
    for (_, from, to) in &batches[1] {
        assert_eq!(*from, ImageAccess::DepthAttachment);
        assert_eq!(*to, ImageAccess::ShaderRead);
    }
}

#[test]
fn test_light_matrices_pushed_at_offset_zero() {
    let (mock, _, pass, rig) = setup();
    let cmd = mock.create_command_list();

    cmd.begin().unwrap();
    pass.do_pass(&cmd, &rig, |_| Ok(())).unwrap();
    cmd.end().unwrap();

    let pushes: Vec<_> = cmd
        .commands()
        .into_iter()
        .filter_map(|c| match c {
            MockCommand::PushConstants { offset, data } => Some((offset, data)),
            _ => None,
        })
        .collect();
    assert_eq!(pushes.len(), LIGHT_COUNT);

    for (light_index, (offset, data)) in pushes.iter().enumerate() {
        assert_eq!(*offset, 0);
        assert_eq!(data.len(), 128);
        let expected = rig.matrices(light_index);
        assert_eq!(data.as_slice(), bytemuck::bytes_of(&expected));
    }
}

#[test]
fn test_maps_end_shader_readable() {
    let (mock, _, pass, rig) = setup();
    let cmd = mock.create_command_list();

    cmd.begin().unwrap();
    pass.do_pass(&cmd, &rig, |_| Ok(())).unwrap();
    cmd.end().unwrap();

    for map in pass.depth_maps() {
        assert_eq!(mock.image_access(map.as_ref()), ImageAccess::ShaderRead);
    }
}

#[test]
fn test_sampling_maps_before_pass_is_flagged() {
    let (mock, _, pass, _) = setup();
    let cmd = mock.create_command_list();

    cmd.begin().unwrap();
    // Bind the shadow maps for sampling without ever rendering them.
    pass.bind(&cmd, pass.pipeline(), 2).unwrap();
    cmd.end().unwrap();

    assert_eq!(mock.hazards().len(), LIGHT_COUNT);
}

#[test]
fn test_scene_callback_runs_inside_each_scope() {
    let (mock, _, pass, rig) = setup();
    let cmd = mock.create_command_list();
    let mut calls = 0;

    cmd.begin().unwrap();
    pass.do_pass(&cmd, &rig, |inner| {
        calls += 1;
        inner.draw(3, 0)
    })
    .unwrap();
    cmd.end().unwrap();

    assert_eq!(calls, LIGHT_COUNT);
    let draws = cmd
        .commands()
        .iter()
        .filter(|c| matches!(c, MockCommand::Draw { .. }))
        .count();
    assert_eq!(draws, LIGHT_COUNT);
}
