// Eight-legged walker demo: procedural leg placement over a random heightfield
// The locomotion core lives in engine::controller; this file owns the window,
// the instanced cube renderer and the ECS scene the core is drawn from.

mod engine;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use bevy_ecs::prelude::*;
use glam::{Mat4, Vec3};
use winit::{
    event::{ElementState, Event as WinitEvent, KeyEvent, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use engine::clock::WallClock;
use engine::controller::SpiderController;
use engine::debug_overlay::{ControlPanel, DebugOverlay, DebugStats};
use engine::input::InputState;
use engine::params::Params;
use engine::spider::{Creature, Spider};
use engine::systems;
use engine::terrain::Terrain;
use engine::{Color as EntityColor, Scale, TerrainTile, Transform};

const TERRAIN_SIZE: f32 = 40.0;
const TERRAIN_SAMPLES: u32 = 81;
const TERRAIN_HILLS: usize = 24;
const TILE_STRIDE: u32 = 1;

/// Height above the terrain the body is dropped from before grounding.
const SPAWN_HEIGHT: f32 = 1.0;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

// ============================================================================
// VERTEX DEFINITION
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
}

impl Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

// ============================================================================
// INSTANCE DATA (per-entity)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct InstanceData {
    position: [f32; 3],
    scale: f32, // Fills the 16-byte slot before color
    color: [f32; 4],
}

impl InstanceData {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceData>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                // Position (location 1)
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Scale (location 2)
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32,
                },
                // Color (location 3)
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

// Unit cube, scaled per instance
const CUBE_VERTICES: &[Vertex] = &[
    Vertex { position: [-0.5, -0.5,  0.5] },
    Vertex { position: [ 0.5, -0.5,  0.5] },
    Vertex { position: [ 0.5,  0.5,  0.5] },
    Vertex { position: [-0.5,  0.5,  0.5] },
    Vertex { position: [-0.5, -0.5, -0.5] },
    Vertex { position: [ 0.5, -0.5, -0.5] },
    Vertex { position: [ 0.5,  0.5, -0.5] },
    Vertex { position: [-0.5,  0.5, -0.5] },
];

const CUBE_INDICES: &[u16] = &[
    0, 1, 2,  0, 2, 3,  // Top (+Z)
    5, 4, 7,  5, 7, 6,  // Bottom
    4, 0, 3,  4, 3, 7,  // -X
    1, 5, 6,  1, 6, 2,  // +X
    3, 2, 6,  3, 6, 7,  // +Y
    4, 5, 1,  4, 1, 0,  // -Y
];

// ============================================================================
// UNIFORM DATA (camera only)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
}

impl Uniforms {
    fn new() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
        }
    }
}

// ============================================================================
// FRAME TIMING
// ============================================================================

/// Frame times collected over the current one-second window.
struct FrameTimer {
    frame_times_ms: Vec<f32>,
    window_start: Instant,
    fps: u32,
    avg_ms: f32,
    min_ms: f32,
    max_ms: f32,
}

impl FrameTimer {
    fn new() -> Self {
        Self {
            frame_times_ms: Vec::new(),
            window_start: Instant::now(),
            fps: 0,
            avg_ms: 0.0,
            min_ms: 0.0,
            max_ms: 0.0,
        }
    }

    /// Record one frame. Returns true when a new one-second summary is ready.
    fn record(&mut self, dt: f32) -> bool {
        self.frame_times_ms.push(dt * 1000.0);
        let now = Instant::now();
        if (now - self.window_start).as_secs_f32() < 1.0 {
            return false;
        }
        let n = self.frame_times_ms.len().max(1);
        self.fps = self.frame_times_ms.len() as u32;
        self.avg_ms = self.frame_times_ms.iter().sum::<f32>() / n as f32;
        self.min_ms = self.frame_times_ms.iter().copied().fold(f32::INFINITY, f32::min);
        self.max_ms = self.frame_times_ms.iter().copied().fold(0.0, f32::max);
        self.frame_times_ms.clear();
        self.window_start = now;
        true
    }
}

// ============================================================================
// APPLICATION STATE
// ============================================================================

struct State {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    render_pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    depth_view: wgpu::TextureView,
    num_indices: u32,
    max_instances: usize,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,

    // ECS World
    world: World,
    terrain_tiles: usize,
    last_update: Instant,

    // Locomotion
    terrain: Terrain,
    controller: SpiderController<Spider, WallClock>,
    /// Whether every foot found terrain when the spider was spawned.
    spawn_grounded: bool,

    // Debug UI
    overlay: DebugOverlay,
    show_controls: bool,
    timer: FrameTimer,
}

impl State {
    async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("failed to create window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no GPU adapter compatible with the window surface")?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .context("failed to open GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no supported formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader_instanced.wgsl").into()),
        });

        use wgpu::util::DeviceExt;

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::cast_slice(&[Uniforms::new()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("uniform_bind_group_layout"),
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("uniform_bind_group"),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout],
                push_constant_ranges: &[],
            });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::desc(), InstanceData::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(CUBE_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: bytemuck::cast_slice(CUBE_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        // Terrain tiles + spider parts + one frame of debug markers
        let max_instances = 16384;
        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance Buffer"),
            size: (max_instances * std::mem::size_of::<InstanceData>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let num_indices = CUBE_INDICES.len() as u32;

        // Terrain and scene
        let mut rng = rand::thread_rng();
        let terrain = Terrain::generate(&mut rng, TERRAIN_SIZE, TERRAIN_SAMPLES, TERRAIN_HILLS);
        let mut world = World::new();
        systems::spawn_terrain_tiles(&mut world, &terrain, TILE_STRIDE, &mut rng);
        systems::spawn_spider_parts(&mut world);
        let terrain_tiles = world.query::<&TerrainTile>().iter(&world).count();

        // Creature, dropped above the terrain at the origin and grounded
        let spawn = Vec3::new(0.0, 0.0, terrain.sample_height(0.0, 0.0) + SPAWN_HEIGHT);
        let mut controller = SpiderController::new(
            Spider::new(spawn),
            WallClock::new(),
            Params::default(),
            (config.width, config.height),
        );
        let spawn_grounded = controller.ground_to_surface(&terrain, true);
        if !spawn_grounded {
            log::warn!("Spider spawned with legs off the terrain");
        }
        systems::sync_spider_parts(&mut world, controller.creature());

        let overlay = DebugOverlay::new(&window, &device, config.format);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            render_pipeline,
            vertex_buffer,
            index_buffer,
            instance_buffer,
            depth_view,
            num_indices,
            max_instances,
            uniform_buffer,
            uniform_bind_group,
            world,
            terrain_tiles,
            last_update: Instant::now(),
            terrain,
            controller,
            spawn_grounded,
            overlay,
            show_controls: true,
            timer: FrameTimer::new(),
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, &self.config);
        }
    }

    fn update(&mut self, input: &InputState) {
        let now = Instant::now();
        let dt = (now - self.last_update).as_secs_f32();
        self.last_update = now;

        self.controller.handle_idle_frame(input, &self.terrain);
        self.controller.update(&self.terrain);

        // Last frame's markers go, this frame's are spawned
        systems::lifetime_system(&mut self.world, dt);
        systems::spawn_debug_markers(&mut self.world, self.controller.debug());
        systems::sync_spider_parts(&mut self.world, self.controller.creature());

        if self.timer.record(dt) {
            let entity_count = self.world.entities().len();
            log::info!(
                "FPS: {} | Entities: {} | Body: {:.2?}",
                self.timer.fps,
                entity_count,
                self.controller.creature().translation()
            );
        }
    }

    fn stats(&self) -> DebugStats {
        let body = self.controller.creature().translation();
        let duration = self.controller.params().animation_duration();
        DebugStats {
            fps: self.timer.fps,
            frame_time_avg_ms: self.timer.avg_ms,
            frame_time_min_ms: self.timer.min_ms,
            frame_time_max_ms: self.timer.max_ms,
            entity_count: self.world.entities().len() as usize,
            terrain_tiles: self.terrain_tiles,
            resolution: (self.size.width, self.size.height),
            body_position: (body.x, body.y, body.z),
            speed: self.controller.body().speed(),
            camera_distance: self.controller.camera().distance_to_center,
            gait_event: self.controller.gait_event().map(|event| {
                let progress = if duration > 0.0 { (event.elapsed / duration).min(1.0) } else { 1.0 };
                (event.partition, progress)
            }),
            spawn_grounded: self.spawn_grounded,
        }
    }

    fn render(&mut self, window: &Window) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // Collect instance data from ECS BEFORE creating render pass
        let mut instance_data = Vec::new();
        let mut query = self.world.query::<(&Transform, &Scale, &EntityColor)>();
        for (transform, scale, color) in query.iter(&self.world) {
            instance_data.push(InstanceData {
                position: transform.position.to_array(),
                scale: scale.size,
                color: [color.r, color.g, color.b, 1.0],
            });
        }

        let instance_count = instance_data.len().min(self.max_instances);

        if !instance_data.is_empty() {
            self.queue.write_buffer(
                &self.instance_buffer,
                0,
                bytemuck::cast_slice(&instance_data[..instance_count]),
            );
        }

        let uniforms = Uniforms {
            view_proj: self.controller.camera().view_projection().to_cols_array_2d(),
        };
        self.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.45,
                            g: 0.6,
                            b: 0.8,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);

            // One draw call for terrain, creature and debug markers
            render_pass.draw_indexed(0..self.num_indices, 0, 0..instance_count as u32);
        }

        if self.overlay.visible || self.show_controls {
            let stats = self.overlay.visible.then(|| self.stats());
            let screen_descriptor = egui_wgpu::ScreenDescriptor {
                size_in_pixels: [self.config.width, self.config.height],
                pixels_per_point: window.scale_factor() as f32,
            };
            let controls = self.show_controls.then(|| {
                let (params, debug) = self.controller.settings_mut();
                ControlPanel { params, debug }
            });
            self.overlay.render(
                &self.device,
                &self.queue,
                &mut encoder,
                window,
                &view,
                &screen_descriptor,
                stats.as_ref(),
                controls,
            );
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

// ============================================================================
// MAIN
// ============================================================================

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let event_loop = EventLoop::new().context("failed to create event loop")?;

    let window_attributes = Window::default_attributes()
        .with_title("Spider Walker - Procedural Leg Placement")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

    let window = Arc::new(
        event_loop
            .create_window(window_attributes)
            .context("failed to create window")?,
    );

    let mut state = pollster::block_on(State::new(window.clone()))?;
    let mut input = InputState::new();
    input.window_size = (state.size.width, state.size.height);

    log::info!("Controls: ZQSD/WASD/arrows to walk (layout in the Spider panel), drag to orbit, F1 panel, F3 stats, Esc quits");

    event_loop.run(move |event, control_flow| {
        match event {
            WinitEvent::WindowEvent {
                ref event,
                window_id,
            } if window_id == window.id() => {
                let response = state.overlay.handle_window_event(&window, event);
                // A click on the panel must not start a camera drag.
                let clicked_ui = response.consumed
                    && matches!(event, WindowEvent::MouseInput { state: ElementState::Pressed, .. });
                if !clicked_ui {
                    input.process_event(event);
                }

                match event {
                    WindowEvent::CloseRequested
                    | WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                state: ElementState::Pressed,
                                physical_key: PhysicalKey::Code(KeyCode::Escape),
                                ..
                            },
                        ..
                    } => control_flow.exit(),
                    WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                state: ElementState::Pressed,
                                physical_key: PhysicalKey::Code(code),
                                repeat: false,
                                ..
                            },
                        ..
                    } => match code {
                        KeyCode::F3 => state.overlay.toggle(),
                        KeyCode::F1 => state.show_controls = !state.show_controls,
                        _ => {}
                    },
                    WindowEvent::Resized(physical_size) => {
                        state.resize(*physical_size);
                    }
                    WindowEvent::RedrawRequested => {
                        state.update(&input);
                        match state.render(&window) {
                            Ok(_) => {}
                            Err(wgpu::SurfaceError::Lost) => state.resize(state.size),
                            Err(wgpu::SurfaceError::OutOfMemory) => control_flow.exit(),
                            Err(e) => log::error!("{:?}", e),
                        }
                        input.end_frame();
                    }
                    _ => {}
                }
            }
            WinitEvent::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}
