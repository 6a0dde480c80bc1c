//! Tests for the lighting pass, driven through the mock backend

use super::*;
use crate::gpu::mock_device::{MockCommand, MockDevice};

const EXTENT: Extent2d = Extent2d {
    width: 1280,
    height: 720,
};

fn layouts(device: &Arc<dyn Device>) -> [Arc<dyn BindingGroupLayout>; 3] {
    use crate::gpu::{BindingGroupLayoutDesc, BindingSlotDesc, BindingType, ShaderStageFlags};

    let sampler = |name: &str, count: u32| {
        device
            .create_binding_group_layout(&BindingGroupLayoutDesc {
                name: name.to_string(),
                entries: vec![BindingSlotDesc {
                    binding: 0,
                    binding_type: BindingType::CombinedImageSampler,
                    count,
                    stage_flags: ShaderStageFlags::FRAGMENT,
                }],
            })
            .unwrap()
    };
    let uniform = device
        .create_binding_group_layout(&BindingGroupLayoutDesc {
            name: "lights".to_string(),
            entries: vec![BindingSlotDesc {
                binding: 0,
                binding_type: BindingType::UniformBuffer,
                count: 1,
                stage_flags: ShaderStageFlags::VERTEX_FRAGMENT,
            }],
        })
        .unwrap();

    [sampler("mesh_texture", 1), uniform, sampler("shadow_maps", 3)]
}

fn make_pass(sample_count: SampleCount) -> (Arc<MockDevice>, LightingPass) {
    let mock = Arc::new(MockDevice::new());
    let device: Arc<dyn Device> = mock.clone();
    let [mesh, lights, shadows] = layouts(&device);
    let pass = LightingPass::new(
        &device,
        &mesh,
        &lights,
        &shadows,
        TextureFormat::Rgba8Unorm,
        sample_count,
        EXTENT,
    )
    .unwrap();
    (mock, pass)
}

#[test]
fn test_model_offset_follows_camera_block() {
    let (_, pass) = make_pass(SampleCount::X1);
    assert_eq!(pass.model_push_offset(), 128);
    assert_eq!(pass.pipeline().push_constant_size(), 192);
}

#[test]
fn test_no_msaa_targets_without_multisampling() {
    let (_, pass) = make_pass(SampleCount::X1);
    assert!(pass.msaa_targets().is_none());
}

#[test]
fn test_single_sample_pass_renders_directly() {
    let (mock, pass) = make_pass(SampleCount::X1);
    let cmd = mock.create_command_list();

    cmd.begin().unwrap();
    pass.begin_pass(&cmd).unwrap();
    pass.end_pass(&cmd).unwrap();
    cmd.end().unwrap();

    let commands = cmd.commands();
    let begin = commands
        .iter()
        .find_map(|c| match c {
            MockCommand::BeginRendering { color, depth, extent } => Some((*color, *depth, *extent)),
            _ => None,
        })
        .expect("rendering scope");
    let (color, depth, extent) = begin;

    assert_eq!(extent, EXTENT);
    let (target, resolve, mode, clear) = color.expect("color attachment");
    assert_eq!(target, pass.color_output().image_id());
    assert!(resolve.is_none());
    assert_eq!(mode, ResolveMode::None);
    assert_eq!(clear, [0.0, 0.0, 0.0, 1.0]);
    let (_, depth_clear) = depth.expect("depth attachment");
    assert_eq!(depth_clear, 1.0);

    assert!(mock.hazards().is_empty(), "hazards: {:?}", mock.hazards());
}

#[test]
fn test_msaa_pass_resolves_into_color_output() {
    let (mock, pass) = make_pass(SampleCount::X4);
    let cmd = mock.create_command_list();

    cmd.begin().unwrap();
    pass.begin_pass(&cmd).unwrap();
    pass.end_pass(&cmd).unwrap();
    cmd.end().unwrap();

    let (msaa_color, _) = pass.msaa_targets().expect("msaa targets");

    let begin = cmd
        .commands()
        .iter()
        .find_map(|c| match c {
            MockCommand::BeginRendering { color, .. } => *color,
            _ => None,
        })
        .expect("color attachment");
    let (target, resolve, mode, _) = begin;

    assert_eq!(target, msaa_color.image_id());
    assert_eq!(resolve, Some(pass.color_output().image_id()));
    assert_eq!(mode, ResolveMode::Average);

    assert!(mock.hazards().is_empty(), "hazards: {:?}", mock.hazards());
}

#[test]
fn test_begin_transitions_all_targets_in_one_batch() {
    for (sample_count, expected) in [(SampleCount::X1, 2), (SampleCount::X4, 4)] {
        let (mock, pass) = make_pass(sample_count);
        let cmd = mock.create_command_list();

        cmd.begin().unwrap();
        pass.begin_pass(&cmd).unwrap();

        let batches: Vec<_> = cmd
            .commands()
            .into_iter()
            .filter_map(|c| match c {
                MockCommand::Transition(batch) => Some(batch),
                _ => None,
            })
            .collect();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), expected);
    }
}

#[test]
fn test_color_output_ends_shader_readable() {
    let (mock, pass) = make_pass(SampleCount::X4);
    let cmd = mock.create_command_list();

    cmd.begin().unwrap();
    pass.begin_pass(&cmd).unwrap();
    pass.end_pass(&cmd).unwrap();
    cmd.end().unwrap();

    assert_eq!(
        mock.image_access(pass.color_output().as_ref()),
        ImageAccess::ShaderRead
    );
}

#[test]
fn test_second_frame_reuses_targets_without_hazards() {
    let (mock, pass) = make_pass(SampleCount::X4);

    for _ in 0..2 {
        let cmd = mock.create_command_list();
        cmd.begin().unwrap();
        pass.begin_pass(&cmd).unwrap();
        pass.end_pass(&cmd).unwrap();
        cmd.end().unwrap();
    }

    assert!(mock.hazards().is_empty(), "hazards: {:?}", mock.hazards());
}
