use crate::app::App;
use crate::figure::{HoverRow, Legend, Rgb};
use crate::map::MapLayers;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
    Frame,
};

pub const TITLE: &str = "Global cattle deforestation risk";
pub const SLIDER_HEADING: &str = "Contribution to the global cattle deforestation";

/// Color used for countries outside the current selection
const LAND_COLOR: Color = Color::DarkGray;

fn rgb(color: Rgb) -> Color {
    Color::Rgb(color.0, color.1, color.2)
}

/// Areas of the page, top to bottom
pub struct PageLayout {
    pub title: Rect,
    pub map: Rect,
    pub selector: Rect,
    pub slider_heading: Rect,
    pub slider: Rect,
    pub status: Rect,
}

pub fn page_layout(area: Rect) -> PageLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title
            Constraint::Min(5),    // Map
            Constraint::Length(1), // Taxonomy selector
            Constraint::Length(1), // Slider heading + value
            Constraint::Length(1), // Slider
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    PageLayout {
        title: chunks[0],
        map: chunks[1],
        selector: chunks[2],
        slider_heading: chunks[3],
        slider: chunks[4],
        status: chunks[5],
    }
}

fn map_block() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
}

/// Terminal cells the map itself is drawn into
pub fn map_inner_area(area: Rect) -> Rect {
    map_block().inner(page_layout(area).map)
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let layout = page_layout(frame.area());

    let title = Paragraph::new(Line::from(Span::styled(
        TITLE,
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    )));
    frame.render_widget(title, layout.title);

    render_map(frame, app, layout.map);
    render_selector(frame, app, layout.selector);
    render_slider(frame, app, layout.slider_heading, layout.slider);
    render_status_bar(frame, app, layout.status);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = map_block();
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut viewport = app.viewport.clone();
    // Braille gives 2x4 resolution per character
    viewport.width = inner.width as usize * 2;
    viewport.height = inner.height as usize * 4;

    let layers = app.renderer.render(
        app.table(),
        app.figure(),
        app.isolated_category(),
        inner.width as usize,
        inner.height as usize,
        &viewport,
    );

    let map_widget = MapWidget {
        layers,
        legend: &app.figure().legend,
        isolated: app.isolated(),
    };
    frame.render_widget(map_widget, inner);

    if let Some(record) = app.hovered_record() {
        let lines = match app.hovered_row() {
            Some(row) => hover_lines(row),
            None => vec![
                Line::from(Span::styled(
                    record.country.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    "not in the current selection",
                    Style::default().fg(Color::DarkGray),
                )),
            ],
        };
        let width = lines
            .iter()
            .map(|l| l.width() as u16 + 2)
            .max()
            .unwrap_or(0)
            .min(inner.width);
        let height = (lines.len() as u16 + 2).min(inner.height);
        let popup = Rect::new(
            inner.right().saturating_sub(width),
            inner.bottom().saturating_sub(height),
            width,
            height,
        );
        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(lines).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::DarkGray)),
            ),
            popup,
        );
    }
}

fn format_quantity(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.0}"),
        None => "n/a".to_string(),
    }
}

fn hover_lines(row: &HoverRow) -> Vec<Line<'static>> {
    let label = Style::default().fg(Color::DarkGray);
    let field = |name: &'static str, value: String| {
        Line::from(vec![Span::styled(name, label), Span::raw(value)])
    };
    vec![
        Line::from(Span::styled(
            format!("{} ({})", row.country, row.iso3),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        field("Risk category: ", row.risk_category.clone()),
        field(
            "Contribution to global deforestation (%): ",
            format!("{:.2}", row.contribution),
        ),
        field(
            "2014-2018 Cattle deforestation (ha): ",
            format_quantity(row.deforestation_ha),
        ),
        field(
            "2014-2018 Cattle production (ton.): ",
            format_quantity(row.production_t),
        ),
    ]
}

/// Renders the painted braille map with the legend overlaid
struct MapWidget<'a> {
    layers: MapLayers,
    legend: &'a Legend,
    isolated: Option<usize>,
}

impl MapWidget<'_> {
    fn render_legend(&self, area: Rect, buf: &mut Buffer) {
        let font = Style::default().fg(rgb(self.legend.font_color));
        let width = area.width as usize;
        let (x, mut y) = (area.x + 1, area.y);

        buf.set_stringn(x, y, self.legend.title, width, font.add_modifier(Modifier::BOLD));
        for (idx, entry) in self.legend.entries.iter().enumerate() {
            y += 1;
            if y >= area.bottom() {
                break;
            }
            let hidden = self.isolated.is_some_and(|i| i != idx);
            let swatch = if hidden { LAND_COLOR } else { rgb(entry.color) };
            let text_style = if hidden { Style::default().fg(LAND_COLOR) } else { font };

            let key = if idx < 9 { format!("{} ", idx + 1) } else { "  ".to_string() };
            let (x, _) = buf.set_stringn(x, y, key, width, text_style);
            let (x, _) = buf.set_stringn(x, y, "■ ", width, Style::default().fg(swatch));
            buf.set_stringn(x, y, &entry.label, width.saturating_sub((x - area.x) as usize), text_style);
        }
    }
}

impl Widget for MapWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for (col, row, cell) in self.layers.canvas.lit_cells() {
            if col >= area.width as usize || row >= area.height as usize {
                continue;
            }
            let color = cell
                .paint
                .and_then(|p| self.layers.fills.get(p as usize))
                .map(|fill| fill.color.map_or(LAND_COLOR, rgb))
                .unwrap_or(LAND_COLOR);
            let x = area.x + col as u16;
            let y = area.y + row as u16;
            buf[(x, y)].set_char(cell.glyph).set_fg(color);
        }

        self.render_legend(area, buf);
    }
}

fn render_selector(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::raw(" ")];
    for taxonomy in crate::risk::Taxonomy::ALL {
        let selected = taxonomy == app.taxonomy();
        let (mark, style) = if selected {
            ("(•) ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        } else {
            ("( ) ", Style::default().fg(Color::Gray))
        };
        spans.push(Span::styled(mark, style));
        spans.push(Span::styled(taxonomy.label(), style));
        spans.push(Span::raw("   "));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Slider track as (filled, knob, rest) for a track of `width` cells
pub fn slider_track(fraction: f64, width: usize) -> (usize, usize, usize) {
    if width == 0 {
        return (0, 0, 0);
    }
    let knob = ((fraction.clamp(0.0, 1.0) * (width - 1) as f64).round()) as usize;
    (knob, 1, width - knob - 1)
}

fn render_slider(frame: &mut Frame, app: &App, heading_area: Rect, area: Rect) {
    let slider = &app.slider;

    let heading = Line::from(vec![
        Span::styled(
            format!(" {SLIDER_HEADING} "),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("[ {:.3} ]", slider.value()),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled(
            format!("  {} countries shown", app.figure().regions.len()),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(heading), heading_area);

    let min_label = " 0 ".to_string();
    let max_label = format!(" {:.3}", slider.max());
    let track_width = (area.width as usize).saturating_sub(min_label.len() + max_label.len());
    let (filled, knob, rest) = slider_track(slider.fraction(), track_width);

    let bar = Line::from(vec![
        Span::styled(min_label, Style::default().fg(Color::DarkGray)),
        Span::styled("━".repeat(filled), Style::default().fg(Color::Cyan)),
        Span::styled("●".repeat(knob), Style::default().fg(Color::Yellow)),
        Span::styled("─".repeat(rest), Style::default().fg(Color::DarkGray)),
        Span::styled(max_label, Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(bar), area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let settings = &app.renderer.settings;

    let status = Line::from(vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
        Span::raw(" "),
        Span::styled(
            if settings.show_outlines { "[B]orders " } else { "[b]orders " },
            Style::default().fg(if settings.show_outlines { Color::Green } else { Color::DarkGray }),
        ),
        Span::styled(
            if settings.show_land { "[G]round " } else { "[g]round " },
            Style::default().fg(if settings.show_land { Color::Green } else { Color::DarkGray }),
        ),
        Span::styled(
            "| tab:taxonomy [/]:±1 {/}:±10 1-9:legend hjkl:pan +/-:zoom r:reset q:quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(status), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_inner_area_inside_page() {
        let area = Rect::new(0, 0, 120, 40);
        let inner = map_inner_area(area);
        // Title row plus the block border above, four control rows plus border below
        assert_eq!(inner.y, 2);
        assert_eq!(inner.x, 1);
        assert_eq!(inner.width, 118);
        assert_eq!(inner.height, 40 - 1 - 4 - 2);
    }

    #[test]
    fn test_slider_track() {
        assert_eq!(slider_track(0.0, 10), (0, 1, 9));
        assert_eq!(slider_track(1.0, 10), (9, 1, 0));
        assert_eq!(slider_track(0.5, 11), (5, 1, 5));
        assert_eq!(slider_track(0.5, 0), (0, 0, 0));
    }
}
