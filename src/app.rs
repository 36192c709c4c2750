use crate::data::{CountryRecord, RiskTable};
use crate::figure::{build_figure, ChoroplethFigure, HoverRow};
use crate::map::{country_at, ChoroplethRenderer, Viewport};
use crate::risk::Taxonomy;
use ratatui::layout::Rect;
use tracing::debug;

/// Initial slider position, just above 100 so every country is shown
pub const DEFAULT_THRESHOLD: f64 = 100.001;

/// Slack above the largest contribution so the slider can include it
pub const SLIDER_HEADROOM: f64 = 0.001;

/// Slider over the cumulative-contribution threshold, `0..=max + headroom`
#[derive(Debug, Clone, PartialEq)]
pub struct ContributionSlider {
    max: f64,
    value: f64,
}

impl ContributionSlider {
    /// A `NaN` initial value starts at the top of the range
    pub fn new(max_contribution: f64, initial: f64) -> Self {
        let max = max_contribution.max(0.0) + SLIDER_HEADROOM;
        let value = if initial.is_nan() { max } else { initial.clamp(0.0, max) };
        Self { max, value }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Position as a fraction of the range
    pub fn fraction(&self) -> f64 {
        if self.max > 0.0 {
            self.value / self.max
        } else {
            0.0
        }
    }

    /// Set the value, clamped into range; returns whether it moved
    pub fn set(&mut self, value: f64) -> bool {
        if value.is_nan() {
            return false;
        }
        let value = value.clamp(0.0, self.max);
        let moved = value != self.value;
        self.value = value;
        moved
    }

    pub fn step(&mut self, delta: f64) -> bool {
        self.set(self.value + delta)
    }

    pub fn to_start(&mut self) -> bool {
        self.set(0.0)
    }

    pub fn to_end(&mut self) -> bool {
        self.set(self.max)
    }
}

/// Application state
pub struct App {
    pub viewport: Viewport,
    pub renderer: ChoroplethRenderer,
    pub slider: ContributionSlider,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Current mouse position for the hover readout
    pub mouse_pos: Option<(u16, u16)>,
    table: RiskTable,
    taxonomy: Taxonomy,
    figure: ChoroplethFigure,
    /// Legend entry shown alone, if any
    isolated: Option<usize>,
    /// Table record under the mouse
    hovered: Option<usize>,
    /// Terminal cells the map is drawn into
    map_area: Rect,
}

impl App {
    pub fn new(table: RiskTable, taxonomy: Taxonomy, threshold: f64, map_area: Rect) -> Self {
        let slider = ContributionSlider::new(table.max_contribution(), threshold);
        let figure = build_figure(&table, slider.value(), taxonomy);
        // Braille gives 2x4 resolution per character
        let viewport = Viewport::world(map_area.width as usize * 2, map_area.height as usize * 4);

        Self {
            viewport,
            renderer: ChoroplethRenderer::new(),
            slider,
            should_quit: false,
            last_mouse: None,
            mouse_pos: None,
            table,
            taxonomy,
            figure,
            isolated: None,
            hovered: None,
            map_area,
        }
    }

    pub fn table(&self) -> &RiskTable {
        &self.table
    }

    pub fn figure(&self) -> &ChoroplethFigure {
        &self.figure
    }

    pub fn taxonomy(&self) -> Taxonomy {
        self.taxonomy
    }

    pub fn map_area(&self) -> Rect {
        self.map_area
    }

    /// Update the map area when the terminal resizes
    pub fn set_map_area(&mut self, area: Rect) {
        self.map_area = area;
        self.viewport.width = area.width as usize * 2;
        self.viewport.height = area.height as usize * 4;
        self.update_hover();
    }

    /// Rebuild the figure after a slider or selector change
    fn refresh(&mut self) {
        self.figure = build_figure(&self.table, self.slider.value(), self.taxonomy);
        if self
            .isolated
            .is_some_and(|idx| idx >= self.figure.legend.entries.len())
        {
            self.isolated = None;
        }
        debug!(
            "threshold {:.3}, {} regions",
            self.slider.value(),
            self.figure.regions.len()
        );
    }

    pub fn set_taxonomy(&mut self, taxonomy: Taxonomy) {
        if taxonomy != self.taxonomy {
            self.taxonomy = taxonomy;
            self.isolated = None;
            self.refresh();
        }
    }

    pub fn toggle_taxonomy(&mut self) {
        self.set_taxonomy(self.taxonomy.toggle());
    }

    /// Move the slider by `delta` percentage points
    pub fn step_slider(&mut self, delta: f64) {
        if self.slider.step(delta) {
            self.refresh();
        }
    }

    pub fn slider_to_start(&mut self) {
        if self.slider.to_start() {
            self.refresh();
        }
    }

    pub fn slider_to_end(&mut self) {
        if self.slider.to_end() {
            self.refresh();
        }
    }

    /// Isolate a legend entry; selecting the isolated entry shows all again
    pub fn toggle_legend_entry(&mut self, idx: usize) {
        if idx >= self.figure.legend.entries.len() {
            return;
        }
        self.isolated = if self.isolated == Some(idx) {
            None
        } else {
            Some(idx)
        };
    }

    pub fn isolated(&self) -> Option<usize> {
        self.isolated
    }

    /// Category drawn alone, if a legend entry is isolated
    pub fn isolated_category(&self) -> Option<&str> {
        self.isolated
            .and_then(|idx| self.figure.legend.entries.get(idx))
            .map(|entry| entry.label.as_str())
    }

    /// Country under the mouse, whether or not it passed the filter
    pub fn hovered_record(&self) -> Option<&CountryRecord> {
        self.hovered.and_then(|idx| self.table.get(idx))
    }

    /// Hover row of the country under the mouse, if it is in the figure
    pub fn hovered_row(&self) -> Option<&HoverRow> {
        self.hovered.and_then(|idx| self.figure.hover_for(idx))
    }

    /// Pan the map
    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
        self.update_hover();
    }

    /// Zoom in
    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
        self.update_hover();
    }

    /// Zoom out
    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
        self.update_hover();
    }

    /// Terminal cell to braille pixel inside the map, `None` outside it
    fn to_map_pixel(&self, col: u16, row: u16) -> Option<(i32, i32)> {
        let area = self.map_area;
        if col < area.x || row < area.y || col >= area.right() || row >= area.bottom() {
            return None;
        }
        let px = (col - area.x) as i32 * 2;
        let py = (row - area.y) as i32 * 4;
        Some((px, py))
    }

    /// Zoom in towards a screen position (terminal column/row)
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.to_map_pixel(col, row) {
            self.viewport.zoom_in_at(px, py);
            self.update_hover();
        }
    }

    /// Zoom out from a screen position (terminal column/row)
    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.to_map_pixel(col, row) {
            self.viewport.zoom_out_at(px, py);
            self.update_hover();
        }
    }

    /// Handle mouse drag
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - x as i32;
            let dy = last_y as i32 - y as i32;
            // One terminal cell is 2x4 braille pixels
            self.pan(dx * 2, dy * 4);
        }
        self.last_mouse = Some((x, y));
    }

    /// Reset drag state when mouse button released
    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    /// Update mouse cursor position and the country under it
    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
        self.update_hover();
    }

    fn update_hover(&mut self) {
        self.hovered = self
            .mouse_pos
            .and_then(|(col, row)| self.to_map_pixel(col, row))
            .and_then(|(px, py)| {
                // Sample the middle of the character cell
                self.viewport.unproject(px + 1, py + 2)
            })
            .and_then(|(lon, lat)| country_at(&self.table, lon, lat));
    }

    /// Back to the whole-world view
    pub fn reset_view(&mut self) {
        self.viewport = Viewport::world(self.viewport.width, self.viewport.height);
        self.update_hover();
    }

    /// Request quit
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Get current zoom level as a string
    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.viewport.zoom)
    }

    /// Get current center coordinates as a string
    pub fn center_coords(&self) -> String {
        let (lon, lat) = self.viewport.center_lonlat();
        format!(
            "{:.1}°{}, {:.1}°{}",
            lat.abs(),
            if lat >= 0.0 { "N" } else { "S" },
            lon.abs(),
            if lon >= 0.0 { "E" } else { "W" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::normalize;

    fn square(iso3: &str, lon: f64, lat: f64, size: f64, contribution: Option<f64>, aggregated: &str) -> CountryRecord {
        CountryRecord {
            country: iso3.to_string(),
            iso3: iso3.to_string(),
            bbox: Some((lon, lat, lon + size, lat + size)),
            polygons: vec![vec![vec![
                (lon, lat),
                (lon + size, lat),
                (lon + size, lat + size),
                (lon, lat + size),
                (lon, lat),
            ]]],
            cumulative_contribution: contribution,
            aggregated_category: Some(aggregated.to_string()),
            detailed_category: Some("At risk of absolute deforestation".to_string()),
            ..CountryRecord::default()
        }
    }

    fn app() -> App {
        let mut table = RiskTable::new(vec![
            square("BRA", -70.0, -30.0, 35.0, Some(40.0), "at-risk country"),
            square("AUS", 115.0, -40.0, 35.0, Some(75.0), "at-risk country"),
            square("FRA", -5.0, 42.0, 10.0, None, "DCF country"),
        ]);
        normalize(&mut table);
        App::new(
            table,
            Taxonomy::Aggregated,
            DEFAULT_THRESHOLD,
            Rect::new(1, 2, 100, 30),
        )
    }

    #[test]
    fn test_slider_range() {
        let mut slider = ContributionSlider::new(100.0, DEFAULT_THRESHOLD);
        assert_eq!(slider.value(), DEFAULT_THRESHOLD);
        assert!(slider.step(-1.0));
        assert!((slider.value() - 99.001).abs() < 1e-9);
        assert!(slider.to_start());
        assert!(!slider.step(-5.0));
        assert_eq!(slider.value(), 0.0);
        assert!(slider.to_end());
        assert_eq!(slider.value(), 100.0 + SLIDER_HEADROOM);
    }

    #[test]
    fn test_slider_clamps_default_to_small_max() {
        let slider = ContributionSlider::new(50.0, DEFAULT_THRESHOLD);
        assert_eq!(slider.value(), 50.0 + SLIDER_HEADROOM);
    }

    #[test]
    fn test_slider_sanitises_initial_value() {
        assert_eq!(ContributionSlider::new(80.0, -3.0).value(), 0.0);
        assert_eq!(ContributionSlider::new(80.0, 500.0).value(), 80.0 + SLIDER_HEADROOM);
        assert_eq!(ContributionSlider::new(80.0, f64::NAN).value(), 80.0 + SLIDER_HEADROOM);

        let mut slider = ContributionSlider::new(80.0, 10.0);
        assert!(!slider.set(f64::NAN));
        assert_eq!(slider.value(), 10.0);
    }

    #[test]
    fn test_default_state_shows_everything() {
        let app = app();
        assert_eq!(app.taxonomy(), Taxonomy::Aggregated);
        assert_eq!(app.figure().regions.len(), 3);
    }

    #[test]
    fn test_slider_filters_figure() {
        let mut app = app();
        app.slider_to_start();
        assert!(app.figure().regions.is_empty());
        app.step_slider(50.0);
        let kept: Vec<&str> = app.figure().regions.iter().map(|r| r.iso3.as_str()).collect();
        assert_eq!(kept, vec!["BRA"]);
        app.slider_to_end();
        assert_eq!(app.figure().regions.len(), 3);
    }

    #[test]
    fn test_taxonomy_toggle_resets_isolation() {
        let mut app = app();
        app.toggle_legend_entry(1);
        assert_eq!(app.isolated_category(), Some("at-risk country"));
        app.toggle_taxonomy();
        assert_eq!(app.taxonomy(), Taxonomy::Detailed);
        assert_eq!(app.isolated(), None);
        assert_eq!(app.figure().legend.title, "Detailed risk categories");
    }

    #[test]
    fn test_legend_toggle_others() {
        let mut app = app();
        app.toggle_legend_entry(0);
        assert_eq!(app.isolated(), Some(0));
        app.toggle_legend_entry(0);
        assert_eq!(app.isolated(), None);
        app.toggle_legend_entry(42);
        assert_eq!(app.isolated(), None);
    }

    #[test]
    fn test_hover_follows_mouse() {
        let mut app = app();
        let area = app.map_area();
        let (px, py) = app.viewport.project(-52.0, -12.0);
        let col = area.x + (px / 2) as u16;
        let row = area.y + (py / 4) as u16;

        app.set_mouse_pos(col, row);
        assert_eq!(app.hovered_record().map(|r| r.iso3.as_str()), Some("BRA"));
        assert_eq!(app.hovered_row().map(|r| r.contribution), Some(40.0));

        // Filtered out: still hovered, but no longer in the figure
        app.slider_to_start();
        assert!(app.hovered_record().is_some());
        assert!(app.hovered_row().is_none());

        app.set_mouse_pos(0, 0);
        assert!(app.hovered_record().is_none());
    }
}
