use egui::epaint::Shadow;

use super::debug::DebugRecords;
use super::input::KeyboardLayout;
use super::params::Params;

pub struct DebugStats {
    pub fps: u32,
    pub frame_time_avg_ms: f32,
    pub frame_time_min_ms: f32,
    pub frame_time_max_ms: f32,
    pub entity_count: usize,
    pub terrain_tiles: usize,
    pub resolution: (u32, u32),
    pub body_position: (f32, f32, f32),
    pub speed: f32,
    pub camera_distance: f32,
    /// Partition and progress of the step in flight, `None` while idle.
    pub gait_event: Option<(usize, f32)>,
    /// Grounding result at spawn; grounding is not repeated afterwards.
    pub spawn_grounded: bool,
}

/// Live-editable settings shown in the controls window.
pub struct ControlPanel<'a> {
    pub params: &'a mut Params,
    pub debug: &'a mut DebugRecords,
}

pub struct DebugOverlay {
    pub visible: bool,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl DebugOverlay {
    pub fn new(
        window: &winit::window::Window,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let egui_ctx = egui::Context::default();

        // Style: dark, semi-transparent, small monospace white font
        let mut visuals = egui::Visuals::dark();
        visuals.window_fill = egui::Color32::from_rgba_premultiplied(0, 0, 0, 180);
        visuals.window_stroke = egui::Stroke::NONE;
        visuals.window_shadow = Shadow::NONE;
        visuals.override_text_color = Some(egui::Color32::WHITE);
        egui_ctx.set_visuals(visuals);

        let mut style = (*egui_ctx.style()).clone();
        style.override_font_id = Some(egui::FontId::monospace(13.0));
        egui_ctx.set_style(style);

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let egui_renderer = egui_wgpu::Renderer::new(
            device,
            surface_format,
            None,  // no depth
            1,     // msaa samples
            false, // no dithering
        );

        Self {
            visible: true,
            egui_ctx,
            egui_state,
            egui_renderer,
        }
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    pub fn handle_window_event(
        &mut self,
        window: &winit::window::Window,
        event: &winit::event::WindowEvent,
    ) -> egui_winit::EventResponse {
        self.egui_state.on_window_event(window, event)
    }

    /// Render one egui frame:
    ///
    /// - `stats`: F3 stats panel (`None` = hidden).
    /// - `controls`: parameter sliders and debug-layer toggles (`None` = hidden).
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        window: &winit::window::Window,
        view: &wgpu::TextureView,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
        stats: Option<&DebugStats>,
        mut controls: Option<ControlPanel<'_>>,
    ) {
        let raw_input = self.egui_state.take_egui_input(window);

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            // ── F3: stats panel ──────────────────────────────────────────────
            if let Some(stats) = stats {
                egui::Area::new(egui::Id::new("debug_overlay"))
                    .fixed_pos(egui::pos2(10.0, 10.0))
                    .show(ctx, |ui| {
                        egui::Frame::none()
                            .fill(egui::Color32::from_rgba_premultiplied(0, 0, 0, 180))
                            .inner_margin(egui::Margin::same(8.0))
                            .rounding(4.0)
                            .show(ui, |ui: &mut egui::Ui| {
                                ui.label(format!("FPS: {}", stats.fps));
                                ui.label(format!(
                                    "Frame: {:.2} ms (min: {:.1} | max: {:.1})",
                                    stats.frame_time_avg_ms,
                                    stats.frame_time_min_ms,
                                    stats.frame_time_max_ms
                                ));
                                ui.label(format!(
                                    "Entities: {} ({} tiles)",
                                    stats.entity_count, stats.terrain_tiles
                                ));
                                ui.label(format!(
                                    "Resolution: {} x {}",
                                    stats.resolution.0, stats.resolution.1
                                ));
                                ui.label(format!(
                                    "Body: ({:.2}, {:.2}, {:.2})  speed {:.2}",
                                    stats.body_position.0, stats.body_position.1,
                                    stats.body_position.2, stats.speed
                                ));
                                ui.label(format!("Camera distance: {:.2}", stats.camera_distance));
                                match stats.gait_event {
                                    Some((partition, progress)) => ui.label(format!(
                                        "Stepping partition {} ({:.0}%)",
                                        partition,
                                        progress * 100.0
                                    )),
                                    None => ui.label("Idle"),
                                };
                                if !stats.spawn_grounded {
                                    ui.colored_label(egui::Color32::LIGHT_RED, "Spawned with legs off the terrain");
                                }
                            });
                    });
            }

            // ── Controls window ──────────────────────────────────────────────
            if let Some(panel) = controls.as_mut() {
                egui::Window::new("Spider")
                    .default_pos(egui::pos2(10.0, 220.0))
                    .resizable(false)
                    .show(ctx, |ui| {
                        let params = &mut *panel.params;
                        ui.add(egui::Slider::new(&mut params.body_height, 0.1..=1.5).text("Body height"));
                        ui.add(egui::Slider::new(&mut params.rest_position_distance, 0.5..=3.0).text("Rest distance"));
                        ui.add(egui::Slider::new(&mut params.acceleration, 0.1..=5.0).text("Acceleration"));
                        ui.add(egui::Slider::new(&mut params.max_speed, 0.1..=3.0).text("Max speed"));
                        ui.add(egui::Slider::new(&mut params.max_leg_elevation, 0.0..=2.0).text("Max leg elevation"));
                        ui.add(egui::Slider::new(&mut params.min_leg_elevation, -2.0..=0.0).text("Min leg elevation"));
                        ui.add(egui::Slider::new(&mut params.animation_speed, 0.2..=4.0).text("Animation speed"));
                        ui.add(egui::Slider::new(&mut params.animation_height, 0.0..=1.0).text("Animation height"));
                        ui.add(egui::Slider::new(&mut params.camera_max_distance, 1.0..=10.0).text("Camera distance"));
                        ui.checkbox(&mut params.move_all_legs, "Move all legs");

                        egui::ComboBox::from_label("Keyboard")
                            .selected_text(params.keyboard.label())
                            .show_ui(ui, |ui| {
                                for layout in KeyboardLayout::ALL {
                                    ui.selectable_value(&mut params.keyboard, layout, layout.label());
                                }
                            });

                        ui.separator();
                        ui.checkbox(&mut panel.debug.show_ground_rays, "Display grounding rays");
                        ui.checkbox(&mut panel.debug.show_rest_positions, "Display rest positions");
                    });
            }
        });

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let tris = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, &tris, screen_descriptor);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            self.egui_renderer
                .render(&mut render_pass.forget_lifetime(), &tris, screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}
