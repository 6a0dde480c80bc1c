//! Trilight demo
//!
//! A shadow-mapped scene under three orbiting colored lights: checkered
//! ground plane, a spinning cube, an orbiting sphere and a bouncing
//! cylinder, rendered through the shadow -> lighting -> post-process
//! chain and presented with a Vulkan swapchain.
//!
//! Controls: WASD to move, Space/Ctrl to rise and descend, mouse to
//! look, 1-4 to switch the post-process mode, Escape to quit.

use std::sync::Arc;
use std::time::Instant;

use glam::{Mat4, Vec3};
use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use trilight_engine::trilight::gpu::{CommandList, Device, Extent2d, SampleCount};
use trilight_engine::trilight::passes::{LightRig, LightingPass, PostProcessOptions, PostProcessPass, ShadowPass};
use trilight_engine::trilight::scene::{
    self, BouncingMesh, DrawContext, Mesh, OrbitingSphere, Scene, SpinningMesh,
};
use trilight_engine::{engine_error, engine_info};
use trilight_engine::{Camera, Engine, Error, Result, TextureRegistry};
use trilight_engine_renderer_vulkan::VulkanDevice;

/// Degrees per second the light triangle orbits at
const LIGHT_ORBIT_SPEED: f32 = 30.0;
const MSAA: SampleCount = SampleCount::X4;

// ===== RENDERER =====

/// Everything that needs a live device, created once the window exists
struct Renderer {
    vulkan: Arc<VulkanDevice>,
    device: Arc<dyn Device>,
    registry: TextureRegistry,
    rig: LightRig,
    shadow: ShadowPass,
    lighting: LightingPass,
    post: PostProcessPass,
    camera: Camera,
    scene: Scene,
    last_frame: Instant,
}

impl Renderer {
    fn new(window: &Window) -> Result<Self> {
        let size = window.inner_size();
        let extent = Extent2d::new(size.width.max(1), size.height.max(1));

        let vulkan = VulkanDevice::new(window, extent)?;
        let device: Arc<dyn Device> = vulkan.clone();
        let extent = vulkan.surface_extent();

        let mut registry = TextureRegistry::new(&device)?;
        registry.register_white("white")?;
        registry.register_checker("checker", 256, 16)?;

        let rig = LightRig::new(&device)?;
        let shadow = ShadowPass::new(&device)?;
        let lighting = LightingPass::new(
            &device,
            registry.layout(),
            rig.layout(),
            shadow.shadow_map_layout(),
            vulkan.surface_format(),
            MSAA,
            extent,
        )?;
        let post = PostProcessPass::new(&device, vulkan.surface_format(), lighting.color_output())?;

        let camera = Camera::with_defaults(extent.width, extent.height);
        let scene = build_scene(&device)?;

        engine_info!(
            "trilight_demo",
            "Renderer ready: {} drawables, {}x{}",
            scene.len(),
            extent.width,
            extent.height
        );

        Ok(Self {
            vulkan,
            device,
            registry,
            rig,
            shadow,
            lighting,
            post,
            camera,
            scene,
            last_frame: Instant::now(),
        })
    }

    /// Rebuild the swapchain and the extent-dependent passes
    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let extent = Extent2d::new(width.max(1), height.max(1));
        self.vulkan.recreate_swapchain(extent)?;
        let extent = self.vulkan.surface_extent();

        self.lighting = LightingPass::new(
            &self.device,
            self.registry.layout(),
            self.rig.layout(),
            self.shadow.shadow_map_layout(),
            self.vulkan.surface_format(),
            MSAA,
            extent,
        )?;
        self.post
            .set_input(&self.device, self.lighting.color_output())?;
        self.camera = Camera::with_defaults(extent.width, extent.height);
        Ok(())
    }

    /// Record and submit one frame
    fn render(&mut self) -> Result<()> {
        let now = Instant::now();
        let delta_seconds = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.scene.tick_all(delta_seconds);
        self.rig.advance_animation(LIGHT_ORBIT_SPEED * delta_seconds)?;

        let image = match self.vulkan.acquire_frame() {
            Ok(image) => image,
            Err(Error::SwapchainOutOfDate) => return Ok(()),
            Err(e) => return Err(e),
        };

        let cmd = self.vulkan.create_command_list()?;
        cmd.begin()?;

        self.shadow.do_pass(&cmd, &self.rig, |inner| {
            self.scene.draw_all(
                inner,
                &DrawContext {
                    pipeline: self.shadow.pipeline(),
                    model_push_offset: self.shadow.model_push_offset(),
                    textures: None,
                },
            )
        })?;

        self.lighting.begin_pass(&cmd)?;
        cmd.push_constants(
            self.lighting.pipeline(),
            0,
            bytemuck::bytes_of(&self.camera.matrices()),
        )?;
        self.rig.bind(&cmd, self.lighting.pipeline(), 1)?;
        self.shadow.bind(&cmd, self.lighting.pipeline(), 2)?;
        self.scene.draw_all(
            &cmd,
            &DrawContext {
                pipeline: self.lighting.pipeline(),
                model_push_offset: self.lighting.model_push_offset(),
                textures: Some(&self.registry),
            },
        )?;
        self.lighting.end_pass(&cmd)?;

        self.post.do_pass(&cmd, &image, |_| Ok(()))?;

        cmd.end()?;

        match self.vulkan.submit_and_present(&cmd, &image) {
            Err(Error::SwapchainOutOfDate) => Ok(()),
            result => result,
        }
    }
}

fn build_scene(device: &Arc<dyn Device>) -> Result<Scene> {
    let mut scene = Scene::new();

    scene.add(Box::new(Mesh::new(
        device,
        "ground",
        &scene::primitives::plane(20.0),
        "checker",
        Mat4::IDENTITY,
    )?));

    scene.add(Box::new(SpinningMesh::new(
        Mesh::new(
            device,
            "cube",
            &scene::primitives::cube(1.5),
            "white",
            Mat4::IDENTITY,
        )?,
        Vec3::new(0.0, 0.75, 0.0),
        0.8,
    )));

    scene.add(Box::new(OrbitingSphere::new(
        Mesh::new(
            device,
            "sphere",
            &scene::primitives::uv_sphere(0.6, 24, 16),
            "white",
            Mat4::IDENTITY,
        )?,
        3.0,
        1.2,
        0.6,
    )));

    scene.add(Box::new(BouncingMesh::new(
        Mesh::new(
            device,
            "cylinder",
            &scene::primitives::cylinder(0.4, 1.0, 24),
            "white",
            Mat4::IDENTITY,
        )?,
        Vec3::new(-2.5, 0.5, 2.0),
        1.2,
        1.5,
    )));

    Ok(scene)
}

// ===== APPLICATION =====

#[derive(Default)]
struct App {
    window: Option<Window>,
    renderer: Option<Renderer>,
}

impl App {
    fn handle_key(&mut self, event_loop: &ActiveEventLoop, code: KeyCode) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        match code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::KeyW => renderer.camera.forward(),
            KeyCode::KeyS => renderer.camera.back(),
            KeyCode::KeyA => renderer.camera.left(),
            KeyCode::KeyD => renderer.camera.right(),
            KeyCode::Space => renderer.camera.rise(),
            KeyCode::ControlLeft => renderer.camera.descend(),
            KeyCode::Digit1 => renderer.post.set_options(PostProcessOptions { mode: 1 }),
            KeyCode::Digit2 => renderer.post.set_options(PostProcessOptions { mode: 2 }),
            KeyCode::Digit3 => renderer.post.set_options(PostProcessOptions { mode: 3 }),
            KeyCode::Digit4 => renderer.post.set_options(PostProcessOptions { mode: 4 }),
            _ => {}
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title("Trilight Demo")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => window,
            Err(e) => {
                engine_error!("trilight_demo", "Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        match Renderer::new(&window) {
            Ok(renderer) => {
                self.renderer = Some(renderer);
                self.window = Some(window);
            }
            Err(e) => {
                engine_error!("trilight_demo", "Renderer setup failed: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    if let Err(e) = renderer.resize(size.width, size.height) {
                        engine_error!("trilight_demo", "Resize failed: {}", e);
                        event_loop.exit();
                    }
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed {
                    if let PhysicalKey::Code(code) = event.physical_key {
                        self.handle_key(event_loop, code);
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(renderer) = self.renderer.as_mut() {
                    if let Err(e) = renderer.render() {
                        engine_error!("trilight_demo", "Frame failed: {}", e);
                        event_loop.exit();
                        return;
                    }
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if let Some(renderer) = self.renderer.as_mut() {
                renderer.camera.process_mouse_movement(dx as f32, dy as f32);
            }
        }
    }
}

fn main() -> std::process::ExitCode {
    if let Err(e) = Engine::initialize() {
        eprintln!("Engine initialization failed: {e}");
        return std::process::ExitCode::FAILURE;
    }

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            engine_error!("trilight_demo", "Failed to create event loop: {}", e);
            return std::process::ExitCode::FAILURE;
        }
    };

    let mut app = App::default();
    if let Err(e) = event_loop.run_app(&mut app) {
        engine_error!("trilight_demo", "Event loop error: {}", e);
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}
