// GUI implementation for the AirAware route viewer using egui/eframe
use crate::aa_models::{AirAwareClient, PredictionResult, Station};
use crate::aa_overlay::{self, LatLon, Marker, Polyline};
use crate::aa_state::AppState;
use crate::aa_summary::{self, SummaryView};
use eframe::egui;
use egui::{Color32, Pos2, RichText, Sense, Shape, Stroke, Ui};
use egui_extras::{Column, TableBuilder};
use geo_types::Rect;
use log::{error, info};
use poll_promise::Promise;
use std::time::Duration;

const ROUTE_COLORS: [Color32; 4] = [
    Color32::from_rgb(37, 99, 235),
    Color32::from_rgb(22, 163, 74),
    Color32::from_rgb(234, 88, 12),
    Color32::from_rgb(147, 51, 234),
];
const START_COLOR: Color32 = Color32::from_rgb(0, 170, 0);
const END_COLOR: Color32 = Color32::from_rgb(220, 38, 38);
const STATION_COLOR: Color32 = Color32::from_rgb(100, 100, 100);

// ============================================================================
// Application State
// ============================================================================

pub struct AAApp {
    client: AirAwareClient,
    state: AppState,

    // Background requests
    stations_promise: Option<Promise<Result<Vec<Station>, String>>>,
    predict_promise: Option<Promise<Result<PredictionResult, String>>>,
    stations_loading: bool,

    // Filter text for the selector dropdowns
    station_filter: String,
}

impl AAApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, client: AirAwareClient) -> Self {
        let mut app = Self {
            client,
            state: AppState::new(),
            stations_promise: None,
            predict_promise: None,
            stations_loading: false,
            station_filter: String::new(),
        };

        app.start_station_load();
        app
    }

    fn start_station_load(&mut self) {
        let client = self.client.clone();
        self.stations_promise = Some(Promise::spawn_thread("stations", move || {
            client.list_stations().map_err(|e| e.to_string())
        }));
        self.stations_loading = true;
    }

    fn start_prediction(&mut self) {
        let (source, destination) = match self.state.predict_request() {
            Some(request) => request,
            None => return,
        };

        info!("Predicting route {} -> {}", source, destination);
        let client = self.client.clone();
        self.predict_promise = Some(Promise::spawn_thread("predict", move || {
            client
                .predict_route(&source, &destination)
                .map_err(|e| e.to_string())
        }));
        self.state.set_loading(true);
    }

    fn poll_requests(&mut self) {
        if let Some(promise) = self.stations_promise.take() {
            match promise.try_take() {
                Ok(Ok(stations)) => {
                    self.state.set_stations(stations);
                    self.stations_loading = false;
                }
                Ok(Err(e)) => {
                    error!("Station load failed: {}", e);
                    self.state.notify_error(format!("Failed to load stations: {}", e));
                    self.stations_loading = false;
                }
                Err(pending) => self.stations_promise = Some(pending),
            }
        }

        if let Some(promise) = self.predict_promise.take() {
            match promise.try_take() {
                Ok(Ok(result)) => {
                    self.state.set_result(result);
                    self.state.set_loading(false);
                }
                Ok(Err(e)) => {
                    error!("Prediction failed: {}", e);
                    self.state.notify_error(format!("Route prediction failed: {}", e));
                    self.state.set_loading(false);
                }
                Err(pending) => self.predict_promise = Some(pending),
            }
        }
    }
}

impl eframe::App for AAApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_requests();

        if self.stations_loading || self.state.is_loading() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("🌫️ AirAware - Clean Air Route Viewer");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(RichText::new(self.client.base_url()).weak());
                });
            });
        });

        egui::SidePanel::left("controls_panel").min_width(260.0).show(ctx, |ui| {
            self.show_controls(ui);
        });

        egui::SidePanel::right("results_panel").min_width(320.0).show(ctx, |ui| {
            self.show_results(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_map(ui);
        });

        self.show_error_window(ctx);
    }
}

// ============================================================================
// View Implementations
// ============================================================================

impl AAApp {
    fn show_controls(&mut self, ui: &mut Ui) {
        ui.heading("Route");
        ui.separator();

        if self.stations_loading {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Loading stations...");
            });
        } else {
            ui.label(format!("{} stations", self.state.stations().len()));
            if ui.small_button("Reload stations").clicked() {
                self.start_station_load();
            }
        }

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.label("Filter:");
            ui.text_edit_singleline(&mut self.station_filter);
        });

        ui.add_space(8.0);
        let mut start_id = self.state.selection().start.as_ref().map(|s| s.id.clone());
        let mut end_id = self.state.selection().end.as_ref().map(|s| s.id.clone());

        self.station_combo(ui, "start_station", "Start", &mut start_id);
        self.station_combo(ui, "end_station", "End", &mut end_id);

        if start_id.as_deref() != self.state.selection().start.as_ref().map(|s| s.id.as_str()) {
            let station = start_id.and_then(|id| self.state.find_station(&id).cloned());
            self.state.set_start(station);
        }
        if end_id.as_deref() != self.state.selection().end.as_ref().map(|s| s.id.as_str()) {
            let station = end_id.and_then(|id| self.state.find_station(&id).cloned());
            self.state.set_end(station);
        }

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            if ui.button("⇅ Swap").clicked() {
                self.state.swap();
            }
            if ui.button("Clear").clicked() {
                self.state.set_start(None);
                self.state.set_end(None);
            }
        });

        ui.add_space(12.0);
        let label = if self.state.is_loading() { "Predicting..." } else { "🔮 Predict route" };
        let predict = ui.add_enabled(self.state.predict_enabled(), egui::Button::new(label));
        if predict.clicked() {
            self.start_prediction();
        }
        if self.state.is_loading() {
            ui.spinner();
        } else if !self.state.can_predict() {
            ui.label(RichText::new("Pick a start and an end station").weak());
        }

        ui.add_space(12.0);
        ui.separator();
        ui.label(RichText::new("Map: left-click sets start, right-click sets end").weak());
    }

    fn station_combo(&self, ui: &mut Ui, id: &str, label: &str, selected: &mut Option<String>) {
        let selected_text = selected
            .as_deref()
            .and_then(|id| self.state.find_station(id))
            .map(|s| s.name.clone())
            .unwrap_or_else(|| "None".to_string());

        ui.label(label);
        egui::ComboBox::from_id_source(id)
            .selected_text(selected_text)
            .width(240.0)
            .show_ui(ui, |ui| {
                ui.selectable_value(selected, None, "None");
                for station in self.state.search_stations(&self.station_filter) {
                    let text = if station.has_valid_position() {
                        station.name.clone()
                    } else {
                        format!("{} (no coordinates)", station.name)
                    };
                    ui.selectable_value(selected, Some(station.id.clone()), text);
                }
            });
    }

    fn show_results(&mut self, ui: &mut Ui) {
        ui.heading("Prediction");
        ui.separator();

        if let Some(at) = self.state.result_received_at() {
            ui.label(RichText::new(format!("Received at {}", at.format("%H:%M:%S"))).weak());
        }

        match aa_summary::summarize(self.state.result()) {
            SummaryView::NoResultYet => {
                ui.label("No prediction yet.");
            }
            SummaryView::NoValidPredictions => {
                ui.colored_label(Color32::from_rgb(255, 165, 0), "⚠️ No valid predictions for this route.");
            }
            SummaryView::Routes(rows) => {
                let best = aa_summary::cleanest_route(&rows).map(|r| r.index);
                TableBuilder::new(ui)
                    .striped(true)
                    .column(Column::auto())
                    .column(Column::auto())
                    .column(Column::auto())
                    .column(Column::remainder())
                    .header(20.0, |mut header| {
                        header.col(|ui| {
                            ui.strong("Route");
                        });
                        header.col(|ui| {
                            ui.strong("Avg PM2.5");
                        });
                        header.col(|ui| {
                            ui.strong("Max PM2.5");
                        });
                        header.col(|ui| {
                            ui.strong("Waypoints");
                        });
                    })
                    .body(|mut body| {
                        for row in &rows {
                            body.row(18.0, |mut table_row| {
                                table_row.col(|ui| {
                                    let color = route_color(row.index as usize);
                                    let text = if Some(row.index) == best {
                                        format!("{} 🌿", row.index)
                                    } else {
                                        row.index.to_string()
                                    };
                                    ui.colored_label(color, text);
                                });
                                table_row.col(|ui| {
                                    ui.label(aa_summary::format_value(row.avg));
                                });
                                table_row.col(|ui| {
                                    ui.label(aa_summary::format_value(row.max));
                                });
                                table_row.col(|ui| {
                                    ui.label(row.waypoints.to_string());
                                });
                            });
                        }
                    });
            }
        }

        if let Some(result) = self.state.result() {
            ui.add_space(12.0);
            ui.group(|ui| {
                ui.label(RichText::new("🤖 AI Summary").strong());
                ui.separator();
                match &result.gemini_summary {
                    Some(summary) => {
                        ui.label(summary);
                    }
                    None => {
                        ui.label(RichText::new("No summary available.").weak());
                    }
                }
            });
        }
    }

    fn show_map(&mut self, ui: &mut Ui) {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click());
        let canvas = response.rect;
        painter.rect_filled(canvas, 4.0, Color32::from_rgb(235, 240, 245));

        let overlays: Vec<Polyline> = self
            .state
            .result()
            .map(aa_overlay::build_overlays)
            .unwrap_or_default();
        let markers = aa_overlay::renderable_markers(self.state.stations(), self.state.selection());

        let bounds = match aa_overlay::viewport_bounds(&markers, &overlays) {
            Some(bounds) => aa_overlay::pad_bounds(bounds, 0.05, 0.02),
            None => {
                painter.text(
                    canvas.center(),
                    egui::Align2::CENTER_CENTER,
                    "No stations with coordinates to display",
                    egui::FontId::proportional(16.0),
                    STATION_COLOR,
                );
                return;
            }
        };
        let projection = Projection::new(bounds, canvas);

        for (i, line) in overlays.iter().enumerate() {
            let points: Vec<Pos2> = line.iter().map(|p| projection.to_screen(*p)).collect();
            if points.len() >= 2 {
                painter.add(Shape::line(points, Stroke::new(4.0, route_color(i + 1))));
            }
        }

        for marker in &markers {
            let pos = projection.to_screen(marker.position);
            let (radius, color) = match (marker.highlight.is_start, marker.highlight.is_end) {
                (true, _) => (7.0, START_COLOR),
                (_, true) => (7.0, END_COLOR),
                _ => (4.0, STATION_COLOR),
            };
            painter.circle_filled(pos, radius, color);
            if marker.highlight.is_start && marker.highlight.is_end {
                painter.circle_stroke(pos, radius + 2.0, Stroke::new(2.0, END_COLOR));
            }
        }

        if let Some(hover) = response.hover_pos() {
            if let Some(marker) = nearest_marker(&markers, &projection, hover, 10.0) {
                painter.text(
                    hover + egui::vec2(10.0, -10.0),
                    egui::Align2::LEFT_BOTTOM,
                    &marker.station.name,
                    egui::FontId::proportional(14.0),
                    Color32::BLACK,
                );
            }
        }

        let clicked = if response.clicked() {
            Some(true)
        } else if response.secondary_clicked() {
            Some(false)
        } else {
            None
        };

        if let (Some(is_start), Some(pointer)) = (clicked, response.interact_pointer_pos()) {
            let picked = nearest_marker(&markers, &projection, pointer, 10.0).map(|m| m.station.clone());
            if let Some(station) = picked {
                if is_start {
                    self.state.set_start(Some(station));
                } else {
                    self.state.set_end(Some(station));
                }
            }
        }
    }

    /// Blocking notification: the rest of the UI stays visible but the
    /// window must be dismissed explicitly.
    fn show_error_window(&mut self, ctx: &egui::Context) {
        let message = match self.state.error() {
            Some(message) => message.to_string(),
            None => return,
        };

        let mut dismiss = false;
        egui::Window::new("❌ Error")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(&message);
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    dismiss = true;
                }
            });

        if dismiss {
            self.state.dismiss_error();
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Equirectangular mapping from lon/lat bounds onto the canvas.
struct Projection {
    bounds: Rect<f64>,
    canvas: egui::Rect,
}

impl Projection {
    fn new(bounds: Rect<f64>, canvas: egui::Rect) -> Self {
        Self { bounds, canvas }
    }

    fn to_screen(&self, [lat, lon]: LatLon) -> Pos2 {
        let fx = (lon - self.bounds.min().x) / self.bounds.width();
        let fy = (lat - self.bounds.min().y) / self.bounds.height();
        Pos2::new(
            self.canvas.left() + fx as f32 * self.canvas.width(),
            self.canvas.bottom() - fy as f32 * self.canvas.height(),
        )
    }
}

fn nearest_marker<'a, 'b>(
    markers: &'b [Marker<'a>],
    projection: &Projection,
    pointer: Pos2,
    max_distance: f32,
) -> Option<&'b Marker<'a>> {
    markers
        .iter()
        .map(|m| (m, projection.to_screen(m.position).distance(pointer)))
        .filter(|(_, d)| *d <= max_distance)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(m, _)| m)
}

fn route_color(route_index: usize) -> Color32 {
    ROUTE_COLORS[route_index.saturating_sub(1) % ROUTE_COLORS.len()]
}

// ============================================================================
// Public entry point
// ============================================================================

pub fn run_gui(client: AirAwareClient) -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([900.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "AirAware Route Viewer",
        options,
        Box::new(move |cc| Ok(Box::new(AAApp::new(cc, client)))),
    )
}
