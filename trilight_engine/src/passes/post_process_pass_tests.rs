//! Tests for the post-process pass, plus a whole-frame protocol test

use super::*;
use crate::gpu::mock_device::{MockCommand, MockDevice};
use crate::gpu::{Extent2d, SampleCount, TextureDesc, TextureUsage};
use crate::passes::lighting_pass::LightingPass;
use crate::passes::light_rig::LightRig;
use crate::passes::shadow_pass::ShadowPass;
use crate::textures::TextureRegistry;

fn lit_input(device: &Arc<dyn Device>) -> Arc<dyn Texture> {
    device
        .create_texture(&TextureDesc {
            name: "lit".to_string(),
            extent: Extent2d::new(640, 480),
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsage::COLOR_ATTACHMENT | TextureUsage::SAMPLED,
            sample_count: SampleCount::X1,
        })
        .unwrap()
}

fn setup() -> (Arc<MockDevice>, Arc<dyn Device>, PostProcessPass, Arc<dyn Texture>) {
    let mock = Arc::new(MockDevice::new());
    let device: Arc<dyn Device> = mock.clone();
    let input = lit_input(&device);
    let pass = PostProcessPass::new(&device, TextureFormat::Bgra8Unorm, &input).unwrap();
    (mock, device, pass, input)
}

/// Record the lit input into the shader-readable state, as the lighting
/// pass would have left it.
fn make_input_readable(mock: &MockDevice, input: &Arc<dyn Texture>) {
    let cmd = mock.create_command_list();
    cmd.begin().unwrap();
    cmd.transition_images(&[
        ImageTransition::new(input.as_ref(), ImageAccess::Undefined, ImageAccess::ColorAttachment),
        ])
        .unwrap();
    cmd.transition_images(&[
        ImageTransition::new(input.as_ref(), ImageAccess::ColorAttachment, ImageAccess::ShaderRead),
        ])
        .unwrap();
    cmd.end().unwrap();
}

#[test]
fn test_default_mode() {
    let (_, _, pass, _) = setup();
    assert_eq!(pass.options().mode, 4);
    assert_eq!(pass.pipeline().push_constant_size(), 4);
}

#[test]
fn test_composite_draws_full_screen_triangle() {
    let (mock, _, pass, input) = setup();
    make_input_readable(&mock, &input);

    let present = mock.create_surface_image(Extent2d::new(640, 480));
    let cmd = mock.create_command_list();

    cmd.begin().unwrap();
    pass.do_pass(&cmd, &present, |_| Ok(())).unwrap();
    cmd.end().unwrap();

    let commands = cmd.commands();
    assert!(commands.contains(&MockCommand::Draw {
        vertex_count: 3,
        first_vertex: 0
    }));

    // Mode pushed as a single u32.
    let push = commands
        .iter()
        .find_map(|c| match c {
            MockCommand::PushConstants { offset, data } => Some((*offset, data.clone())),
            _ => None,
        })
        .expect("mode push");
    assert_eq!(push.0, 0);
    assert_eq!(push.1, 4u32.to_le_bytes().to_vec());

    assert!(mock.hazards().is_empty(), "hazards: {:?}", mock.hazards());
}

#[test]
fn test_present_image_ends_in_present_state() {
    let (mock, _, pass, input) = setup();
    make_input_readable(&mock, &input);

    let present = mock.create_surface_image(Extent2d::new(640, 480));
    let cmd = mock.create_command_list();

    cmd.begin().unwrap();
    pass.do_pass(&cmd, &present, |_| Ok(())).unwrap();
    cmd.end().unwrap();

    assert_eq!(mock.image_access(&present), ImageAccess::Present);
}

#[test]
fn test_set_options_changes_pushed_mode() {
    let (mock, _, mut pass, input) = setup();
    make_input_readable(&mock, &input);
    pass.set_options(PostProcessOptions { mode: 2 });

    let present = mock.create_surface_image(Extent2d::new(640, 480));
    let cmd = mock.create_command_list();
    cmd.begin().unwrap();
    pass.do_pass(&cmd, &present, |_| Ok(())).unwrap();
    cmd.end().unwrap();

    let push = cmd
        .commands()
        .iter()
        .find_map(|c| match c {
            MockCommand::PushConstants { data, .. } => Some(data.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(push, 2u32.to_le_bytes().to_vec());
}

#[test]
fn test_extra_draws_run_inside_the_scope() {
    let (mock, _, pass, input) = setup();
    make_input_readable(&mock, &input);

    let present = mock.create_surface_image(Extent2d::new(640, 480));
    let cmd = mock.create_command_list();

    cmd.begin().unwrap();
    pass.do_pass(&cmd, &present, |inner| inner.draw(6, 0)).unwrap();
    cmd.end().unwrap();

    let commands = cmd.commands();
    let overlay_index = commands
        .iter()
        .position(|c| matches!(c, MockCommand::Draw { vertex_count: 6, .. }))
        .expect("overlay draw");
    let end_index = commands
        .iter()
        .position(|c| matches!(c, MockCommand::EndRendering))
        .unwrap();
    assert!(overlay_index < end_index);
}

#[test]
fn test_sampling_unwritten_input_is_flagged() {
    let (mock, _, pass, _) = setup();
    // Input never rendered: compositing must surface a hazard.
    let present = mock.create_surface_image(Extent2d::new(640, 480));
    let cmd = mock.create_command_list();

    cmd.begin().unwrap();
    pass.do_pass(&cmd, &present, |_| Ok(())).unwrap();
    cmd.end().unwrap();

    assert_eq!(mock.hazards().len(), 1);
}

// ===== WHOLE FRAME =====

#[test]
fn test_full_frame_follows_the_transition_protocol() {
    let mock = Arc::new(MockDevice::new());
    let device: Arc<dyn Device> = mock.clone();

    let mut registry = TextureRegistry::new(&device).unwrap();
    registry.register_white("white").unwrap();

    let rig = LightRig::new(&device).unwrap();
    let shadow = ShadowPass::new(&device).unwrap();
    let lighting = LightingPass::new(
        &device,
        registry.layout(),
        rig.layout(),
        shadow.shadow_map_layout(),
        TextureFormat::Rgba8Unorm,
        SampleCount::X4,
        Extent2d::new(1280, 720),
    )
    .unwrap();
    let post = PostProcessPass::new(&device, TextureFormat::Bgra8Unorm, lighting.color_output())
        .unwrap();

    let present = mock.create_surface_image(Extent2d::new(1280, 720));

    // Two frames back to back, sharing all resources.
    for _ in 0..2 {
        let cmd = mock.create_command_list();
        cmd.begin().unwrap();

        // Depth-only draws: no descriptor sets during the shadow phase.
        shadow.do_pass(&cmd, &rig, |inner| inner.draw(3, 0)).unwrap();

        lighting.begin_pass(&cmd).unwrap();
        rig.bind(&cmd, lighting.pipeline(), 1).unwrap();
        shadow.bind(&cmd, lighting.pipeline(), 2).unwrap();
        cmd.bind_binding_group(lighting.pipeline(), 0, registry.group("white").unwrap())
            .unwrap();
        cmd.draw(3, 0).unwrap();
        lighting.end_pass(&cmd).unwrap();

        post.do_pass(&cmd, &present, |_| Ok(())).unwrap();

        cmd.end().unwrap();
    }

    assert!(mock.hazards().is_empty(), "hazards: {:?}", mock.hazards());
    assert_eq!(mock.image_access(&present), ImageAccess::Present);
}
