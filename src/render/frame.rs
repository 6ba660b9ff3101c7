//! Frame renderer and playback state machine.
//!
//! The renderer owns the loaded channels, the cursor and the projector. Each
//! redraw runs the whole pipeline: clear, grid, axes, projection, sweep
//! indicator, present. While playing, one frame is drawn per animation tick;
//! otherwise the last window is drawn again unchanged.

use crate::dsp::{AutoScaler, ScaleCache, ScaleRange, TimeCursor, Window, WindowSelector, decimate};
use crate::error::SignalError;
use crate::playback::TransportEvent;
use crate::render::common::{ClipTransform, Rect, Vertex, dot_vertices, quad_vertices};
use crate::render::geometry::{DEFAULT_FEATHER, build_aa_line_list, circle_points};
use crate::render::project::{FrameInput, Heatmap, Lane, PolarPlot, Project, Projected, Projector};
use crate::render::surface::{Label, Layer, Surface};
use crate::render::theme::RenderStyle;
use crate::source::{ChannelBuffer, ChannelSet};
use serde::Serialize;
use tracing::{debug, info, warn};

pub const DEFAULT_DISPLAY_RATE: f32 = 50.0;

const RING_SEGMENTS: usize = 96;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PlaybackState {
    /// Nothing loaded.
    #[default]
    Idle,
    Ready,
    Playing,
    Paused,
    /// Transient: drawn once, then back to `Ready` at the start.
    Ended,
}

/// Holds at most one outstanding animation-frame request.
#[derive(Debug, Clone, Default)]
pub struct FrameScheduler {
    pending: Option<u64>,
    issued: u64,
}

impl FrameScheduler {
    /// Requests the next frame; an outstanding request is reused.
    pub fn request(&mut self) -> u64 {
        if let Some(id) = self.pending {
            return id;
        }
        self.issued += 1;
        self.pending = Some(self.issued);
        self.issued
    }

    /// Consumes the outstanding request, if any.
    pub fn take(&mut self) -> Option<u64> {
        self.pending.take()
    }

    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Requests issued so far.
    pub fn issued(&self) -> u64 {
        self.issued
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DensityExtrema {
    pub min: u32,
    pub max: u32,
    pub total: u64,
}

/// Read-only snapshot for the surrounding UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayMetrics {
    pub state: PlaybackState,
    pub projection: &'static str,
    pub cursor: f32,
    pub duration: f32,
    pub window: Window,
    /// Range of the first selected channel.
    pub scale: Option<ScaleRange>,
    pub density: Option<DensityExtrema>,
    pub channels: usize,
    pub frames_drawn: u64,
    #[serde(skip)]
    pub placeholder: Option<SignalError>,
}

#[derive(Debug)]
pub struct FrameRenderer {
    state: PlaybackState,
    style: RenderStyle,
    projector: Projector,
    display_rate: f32,
    selector: WindowSelector,
    scales: ScaleCache,
    source: ChannelSet,
    selection: Vec<usize>,
    selected: Vec<ChannelBuffer>,
    cursor: TimeCursor,
    window: Window,
    scheduler: FrameScheduler,
    metrics: DisplayMetrics,
}

impl FrameRenderer {
    pub fn new(projector: Projector, style: RenderStyle) -> Self {
        Self {
            state: PlaybackState::Idle,
            style,
            metrics: DisplayMetrics {
                state: PlaybackState::Idle,
                projection: projector.name(),
                cursor: 0.0,
                duration: 0.0,
                window: Window::default(),
                scale: None,
                density: None,
                channels: 0,
                frames_drawn: 0,
                placeholder: None,
            },
            projector,
            display_rate: DEFAULT_DISPLAY_RATE,
            selector: WindowSelector::default(),
            scales: ScaleCache::default(),
            source: ChannelSet::default(),
            selection: Vec::new(),
            selected: Vec::new(),
            cursor: TimeCursor::default(),
            window: Window::default(),
            scheduler: FrameScheduler::default(),
        }
    }

    /// Target rate for decimation on load; applies to the next `load`.
    pub fn with_display_rate(mut self, rate: f32) -> Self {
        self.display_rate = rate;
        self
    }

    pub fn with_window_seconds(mut self, seconds: f32) -> Self {
        self.selector = WindowSelector::new(seconds);
        self
    }

    pub fn with_scaler(mut self, scaler: AutoScaler) -> Self {
        self.scales.set_scaler(scaler);
        self
    }

    /// Channel indices to show; empty shows all.
    pub fn with_selection(mut self, selection: Vec<usize>) -> Self {
        self.selection = selection;
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn cursor(&self) -> &TimeCursor {
        &self.cursor
    }

    pub fn channels(&self) -> &[ChannelBuffer] {
        &self.selected
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    pub fn metrics(&self) -> &DisplayMetrics {
        &self.metrics
    }

    /// Replaces the loaded channels, decimated to the display rate.
    pub fn load(&mut self, set: ChannelSet, surface: &mut impl Surface) {
        let channels = set
            .into_channels()
            .into_iter()
            .map(|channel| match decimate(&channel, self.display_rate) {
                Ok(decimated) => decimated,
                Err(err) => {
                    warn!(
                        "[renderer] '{}': {err}; showing it at {} Hz",
                        channel.name(),
                        channel.sample_rate()
                    );
                    channel
                }
            })
            .collect();
        self.source = ChannelSet::new(channels);
        self.scales.retain(self.source.channels());
        self.apply_selection();
        info!(
            "[renderer] loaded {} channel(s), {} selected, {:.2}s",
            self.source.len(),
            self.selected.len(),
            self.cursor.duration()
        );
        self.scheduler.cancel();
        self.state = PlaybackState::Ready;
        self.redraw(surface);
    }

    /// Drops the channels and clears the surface.
    pub fn unload(&mut self, surface: &mut impl Surface) {
        self.scheduler.cancel();
        self.source = ChannelSet::default();
        self.selected.clear();
        self.scales.retain(&[]);
        self.projector.reset();
        self.cursor = TimeCursor::default();
        self.window = Window::default();
        self.state = PlaybackState::Idle;
        self.redraw(surface);
    }

    pub fn select_channels(&mut self, selection: Vec<usize>, surface: &mut impl Surface) {
        self.selection = selection;
        if self.state == PlaybackState::Idle {
            return;
        }
        let position = self.cursor.position();
        self.apply_selection();
        self.cursor.seek(position);
        self.refresh_window();
        self.redraw(surface);
    }

    pub fn set_projector(&mut self, projector: Projector, surface: &mut impl Surface) {
        self.projector = projector;
        if self.state != PlaybackState::Idle {
            self.redraw(surface);
        }
    }

    /// Redraws the last window at the surface's current size.
    pub fn resize(&mut self, surface: &mut impl Surface) {
        self.redraw(surface);
    }

    /// Applies one transport event. Returns whether a frame was drawn.
    pub fn handle(&mut self, event: TransportEvent, surface: &mut impl Surface) -> bool {
        use PlaybackState::*;
        match (self.state, event) {
            (Idle, _) => {
                debug!("[renderer] {event:?} ignored: nothing loaded");
                false
            }
            (Ready | Paused, TransportEvent::Play) => {
                self.state = Playing;
                self.scheduler.request();
                self.redraw(surface);
                true
            }
            (Playing, TransportEvent::Pause) => {
                self.state = Paused;
                self.scheduler.cancel();
                self.redraw(surface);
                true
            }
            (Playing, TransportEvent::Tick(seconds)) => {
                if self.scheduler.take().is_none() {
                    return false;
                }
                self.cursor.advance_to(seconds);
                self.refresh_window();
                self.redraw(surface);
                self.scheduler.request();
                true
            }
            (_, TransportEvent::Tick(_)) => false,
            (_, TransportEvent::Seek(seconds)) => {
                self.cursor.seek(seconds);
                self.refresh_window();
                self.redraw(surface);
                true
            }
            (Playing | Paused, TransportEvent::Ended) => {
                self.scheduler.cancel();
                self.cursor.seek(self.cursor.duration());
                self.refresh_window();
                self.state = Ended;
                self.redraw(surface);
                self.rewind(surface);
                true
            }
            (_, TransportEvent::Stop) => {
                self.scheduler.cancel();
                self.rewind(surface);
                true
            }
            (state, event) => {
                debug!("[renderer] {event:?} ignored while {state:?}");
                false
            }
        }
    }

    fn rewind(&mut self, surface: &mut impl Surface) {
        self.state = PlaybackState::Ready;
        self.cursor.reset();
        self.projector.reset();
        self.refresh_window();
        self.redraw(surface);
    }

    fn apply_selection(&mut self) {
        self.selected = self.source.select(&self.selection);
        if self.selected.is_empty() && !self.selection.is_empty() {
            warn!(
                "[renderer] channel selection {:?} matches none of {} channel(s)",
                self.selection,
                self.source.len()
            );
        }
        let duration = self
            .selected
            .iter()
            .map(ChannelBuffer::duration)
            .fold(0.0, f32::max);
        self.cursor = TimeCursor::new(duration);
        self.projector.reset();
        self.refresh_window();
    }

    fn refresh_window(&mut self) {
        self.window = match self.selected.first() {
            Some(first) => self
                .selector
                .select(self.cursor.position(), first.sample_rate(), first.len()),
            None => Window::default(),
        };
    }

    /// Runs the full draw pipeline for the current state.
    pub fn redraw(&mut self, surface: &mut impl Surface) {
        let (width, height) = surface.size();
        let clip = ClipTransform::new(width, height);
        let plot = Rect::new(0.0, 0.0, width, height).inset(self.style.padding);
        let style = &self.style;

        surface.begin_frame(style.background);
        if self.state == PlaybackState::Idle {
            surface.present();
            self.update_metrics(None, None);
            return;
        }

        draw_grid(surface, style, plot, clip);

        let scales: Vec<ScaleRange> = self.selected.iter().map(|c| self.scales.get(c)).collect();
        let input = FrameInput {
            channels: &self.selected,
            scales: &scales,
            selector: self.selector,
            window: self.window,
            cursor: self.cursor.position(),
            duration: self.cursor.duration(),
        };
        let projected = self.projector.project(&input, plot);

        draw_axes(surface, style, &projected, plot, clip);
        draw_projection(surface, style, &projected, clip);
        draw_indicator(surface, style, &projected, self.window, plot, clip);
        surface.present();

        let first_scale = scales.first().copied();
        self.update_metrics(Some(&projected), first_scale);
    }

    fn update_metrics(&mut self, projected: Option<&Projected>, scale: Option<ScaleRange>) {
        let placeholder = match projected {
            Some(Projected::Empty(err)) => Some(err.clone()),
            _ => None,
        };
        if let Some(err) = placeholder
            .as_ref()
            .filter(|err| self.metrics.placeholder.as_ref() != Some(*err))
        {
            warn!("[renderer] placeholder frame: {err}");
        }
        let density = match (projected, &self.projector) {
            (Some(Projected::Heatmap(map)), Projector::Density(_)) => Some(DensityExtrema {
                min: map.min as u32,
                max: map.max as u32,
                total: map.total,
            }),
            _ => None,
        };
        self.metrics = DisplayMetrics {
            state: self.state,
            projection: self.projector.name(),
            cursor: self.cursor.position(),
            duration: self.cursor.duration(),
            window: self.window,
            scale,
            density,
            channels: self.selected.len(),
            frames_drawn: self.metrics.frames_drawn + 1,
            placeholder,
        };
    }
}

fn label(surface: &mut impl Surface, text: String, x: f32, y: f32, color: [f32; 4]) {
    surface.label(Label { text, x, y, color });
}

fn segment(
    a: (f32, f32),
    b: (f32, f32),
    width: f32,
    color: [f32; 4],
    clip: &ClipTransform,
) -> Vec<Vertex> {
    build_aa_line_list(&[a, b], width, DEFAULT_FEATHER, color, clip)
}

fn draw_grid(surface: &mut impl Surface, style: &RenderStyle, plot: Rect, clip: ClipTransform) {
    let n = style.grid_divisions.max(1);
    let mut verts = Vec::with_capacity((n + 1) * 12);
    for i in 0..=n {
        let t = i as f32 / n as f32;
        let x = plot.x + t * plot.width;
        let y = plot.y + t * plot.height;
        verts.extend(segment((x, plot.y), (x, plot.bottom()), 1.0, style.grid, &clip));
        verts.extend(segment((plot.x, y), (plot.right(), y), 1.0, style.grid, &clip));
    }
    surface.draw(Layer::Grid, &verts);
}

fn draw_axes(
    surface: &mut impl Surface,
    style: &RenderStyle,
    projected: &Projected,
    plot: Rect,
    clip: ClipTransform,
) {
    let mut verts = Vec::new();
    match projected {
        Projected::Trace(lanes) => {
            for lane in lanes {
                let a = lane.area;
                verts.extend(segment((a.x, a.y), (a.x, a.bottom()), 1.0, style.axis, &clip));
                verts.extend(segment(
                    (a.x, a.bottom()),
                    (a.right(), a.bottom()),
                    1.0,
                    style.axis,
                    &clip,
                ));
                label(surface, lane.name.clone(), a.x + 4.0, a.y + 12.0, style.text);
                label(surface, format!("{:.2}", lane.scale.max), 2.0, a.y + 10.0, style.text);
                label(surface, format!("{:.2}", lane.scale.min), 2.0, a.bottom(), style.text);
            }
        }
        Projected::Polar(plot_data) => {
            let (cx, cy) = plot_data.center;
            let r = plot_data.max_radius;
            verts.extend(build_aa_line_list(
                &circle_points(cx, cy, r, RING_SEGMENTS),
                1.0,
                DEFAULT_FEATHER,
                style.axis,
                &clip,
            ));
            verts.extend(segment((cx - r, cy), (cx + r, cy), 1.0, style.axis, &clip));
            verts.extend(segment((cx, cy - r), (cx, cy + r), 1.0, style.axis, &clip));
            label(surface, plot_data.name.clone(), plot.x + 4.0, plot.y + 12.0, style.text);
        }
        Projected::Heatmap(map) => {
            let a = map.area;
            let corners = [
                (a.x, a.y),
                (a.right(), a.y),
                (a.right(), a.bottom()),
                (a.x, a.bottom()),
                (a.x, a.y),
            ];
            verts.extend(build_aa_line_list(&corners, 1.0, DEFAULT_FEATHER, style.axis, &clip));
            let axes = &map.axes;
            let x_label = format!("{} [{:.2}, {:.2}]", axes.x_title, axes.x.0, axes.x.1);
            let y_label = format!("{} [{:.2}, {:.2}]", axes.y_title, axes.y.0, axes.y.1);
            label(surface, x_label, a.x, a.bottom() + 16.0, style.text);
            label(surface, y_label, a.x + 4.0, a.y + 12.0, style.text);
        }
        Projected::Empty(_) => {}
    }
    surface.draw(Layer::Axes, &verts);
}

fn draw_projection(
    surface: &mut impl Surface,
    style: &RenderStyle,
    projected: &Projected,
    clip: ClipTransform,
) {
    match projected {
        Projected::Trace(lanes) => {
            for (i, lane) in lanes.iter().enumerate() {
                surface.draw(Layer::Data, &trace_vertices(lane, style.trace(i), style, &clip));
            }
        }
        Projected::Polar(plot) => surface.draw(Layer::Data, &polar_vertices(plot, style, &clip)),
        Projected::Heatmap(map) => surface.draw(Layer::Data, &heatmap_vertices(map, style, clip)),
        Projected::Empty(err) => {
            let (w, h) = surface.size();
            label(surface, err.to_string(), w * 0.5, h * 0.5, style.placeholder);
        }
    }
}

fn trace_vertices(
    lane: &Lane,
    color: [f32; 4],
    style: &RenderStyle,
    clip: &ClipTransform,
) -> Vec<Vertex> {
    let pts: Vec<(f32, f32)> = lane.points.iter().map(|p| (p.x, p.y)).collect();
    match pts.as_slice() {
        [] => Vec::new(),
        [(x, y)] => dot_vertices(*x, *y, style.dot_radius, DEFAULT_FEATHER, color, *clip).to_vec(),
        _ => build_aa_line_list(&pts, style.line_width, DEFAULT_FEATHER, color, clip),
    }
}

fn polar_vertices(plot: &PolarPlot, style: &RenderStyle, clip: &ClipTransform) -> Vec<Vertex> {
    let color = style.trace(0);
    let mut verts = Vec::new();
    if plot.cumulative {
        let pts: Vec<(f32, f32)> = plot.points.iter().map(|p| (p.x, p.y)).collect();
        verts.extend(build_aa_line_list(&pts, style.line_width, DEFAULT_FEATHER, color, clip));
    } else if let Some(p) = plot.points.first() {
        verts.extend(segment(plot.center, (p.x, p.y), style.line_width, color, clip));
    }
    if let Some(p) = plot.points.last() {
        verts.extend(dot_vertices(p.x, p.y, style.dot_radius, DEFAULT_FEATHER, color, *clip));
    }
    verts
}

fn heatmap_vertices(map: &Heatmap, style: &RenderStyle, clip: ClipTransform) -> Vec<Vertex> {
    map.cells
        .iter()
        .flat_map(|cell| quad_vertices(map.cell_rect(cell), clip, style.heat(map.level(cell))))
        .collect()
}

fn draw_indicator(
    surface: &mut impl Surface,
    style: &RenderStyle,
    projected: &Projected,
    window: Window,
    plot: Rect,
    clip: ClipTransform,
) {
    let verts = match projected {
        Projected::Trace(_) => {
            let x = plot.x + window.fraction_elapsed * plot.width;
            segment((x, plot.y), (x, plot.bottom()), 1.0, style.indicator, &clip)
        }
        Projected::Polar(p) => {
            let (cx, cy) = p.center;
            let end = (
                cx + p.max_radius * p.sweep_angle.cos(),
                cy + p.max_radius * p.sweep_angle.sin(),
            );
            segment((cx, cy), end, 1.0, style.indicator, &clip)
        }
        Projected::Heatmap(map) => {
            let x = map.area.x + map.progress * map.area.width;
            segment((x, map.area.y), (x, map.area.bottom()), 1.0, style.indicator, &clip)
        }
        Projected::Empty(_) => Vec::new(),
    };
    surface.draw(Layer::Indicator, &verts);
}
