use anyhow::{Context, Result};
use cattle_risk_map::app::{App, ContributionSlider, DEFAULT_THRESHOLD};
use cattle_risk_map::data::{self, LoadOptions};
use cattle_risk_map::figure::{build_figure, export_figure};
use cattle_risk_map::risk::{self, Taxonomy};
use cattle_risk_map::ui;
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "cattle-risk-map",
    about = "Choropleth of global cattle deforestation risk in the terminal"
)]
struct Args {
    /// GeoJSON risk dataset
    #[arg(long, default_value = data::DEFAULT_DATA_PATH)]
    data: PathBuf,

    /// Delimited attribute table joined on ISO3
    #[arg(long)]
    attributes: Option<PathBuf>,

    /// Field delimiter of the attribute table
    #[arg(long, default_value_t = data::DEFAULT_DELIMITER)]
    delimiter: char,

    /// Keep NA markers such as "NA" or "nan" as literal text
    #[arg(long)]
    no_default_na: bool,

    /// Initial contribution threshold (%)
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f64,

    /// Initial taxonomy: risk-categories or detailed-risk-categories
    #[arg(long, default_value = "risk-categories")]
    taxonomy: String,

    /// Write the figure as JSON to this path instead of starting the UI
    #[arg(long)]
    export: Option<PathBuf>,

    /// Log file for the interactive UI
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(args: &Args) -> Result<()> {
    let level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if args.export.is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
    } else if let Some(path) = &args.log_file {
        // The terminal belongs to the UI, so logs only go to a file
        let file = File::create(path)
            .with_context(|| format!("failed to create log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let taxonomy: Taxonomy = args.taxonomy.parse()?;
    let options = LoadOptions {
        delimiter: args.delimiter,
        keep_default_na: !args.no_default_na,
        attributes: args.attributes.clone(),
    };
    let mut table = data::load_risk_table(&args.data, &options)
        .with_context(|| format!("failed to load {}", args.data.display()))?;
    risk::normalize(&mut table);
    info!("{} countries loaded", table.len());

    if let Some(path) = &args.export {
        // Same clamping as the interactive slider
        let threshold = ContributionSlider::new(table.max_contribution(), args.threshold).value();
        let figure = build_figure(&table, threshold, taxonomy);
        export_figure(&figure, path)
            .with_context(|| format!("failed to export figure to {}", path.display()))?;
        info!("Figure with {} regions written to {:?}", figure.regions.len(), path);
        return Ok(());
    }

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let size = terminal.size()?;
    let map_area = ui::map_inner_area(ratatui::layout::Rect::new(0, 0, size.width, size.height));
    let mut app = App::new(table, taxonomy, args.threshold, map_area);

    // Run the app
    let result = run(&mut terminal, &mut app);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Handle mouse events for panning, zooming and hover
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    // Always track mouse position for the hover readout
    app.set_mouse_pos(mouse.column, mouse.row);

    match mouse.kind {
        // Scroll wheel for zooming towards mouse position
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        // Horizontal scroll for panning (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        // Click and drag to pan
        MouseEventKind::Down(MouseButton::Left) => {
            app.last_mouse = Some((mouse.column, mouse.row));
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            app.handle_drag(mouse.column, mouse.row);
        }
        MouseEventKind::Up(MouseButton::Left) => {
            app.end_drag();
        }
        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    // Main loop
    loop {
        // Draw
        terminal.draw(|frame| ui::render(frame, app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) => {
                    // Only handle key press events (not release)
                    if key.kind == KeyEventKind::Press {
                        match key.code {
                            KeyCode::Char('q') | KeyCode::Esc => app.quit(),

                            // Taxonomy selector
                            KeyCode::Tab | KeyCode::Char('t') => app.toggle_taxonomy(),

                            // Contribution slider
                            KeyCode::Char('[') => app.step_slider(-1.0),
                            KeyCode::Char(']') => app.step_slider(1.0),
                            KeyCode::Char('{') => app.step_slider(-10.0),
                            KeyCode::Char('}') => app.step_slider(10.0),
                            KeyCode::Home => app.slider_to_start(),
                            KeyCode::End => app.slider_to_end(),

                            // Legend entries
                            KeyCode::Char(c @ '1'..='9') => {
                                app.toggle_legend_entry(c as usize - '1' as usize);
                            }

                            // Pan with hjkl or arrow keys
                            KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
                            KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
                            KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
                            KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

                            // Zoom
                            KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
                            KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

                            // Layer toggles
                            KeyCode::Char('b') | KeyCode::Char('B') => {
                                app.renderer.toggle_outlines();
                            }
                            KeyCode::Char('g') | KeyCode::Char('G') => {
                                app.renderer.toggle_land();
                            }

                            // Reset view
                            KeyCode::Char('r') | KeyCode::Char('0') => app.reset_view(),

                            _ => {}
                        }
                    }
                }
                Event::Mouse(mouse) => {
                    handle_mouse(app, mouse);
                }
                Event::Resize(width, height) => {
                    app.set_map_area(ui::map_inner_area(ratatui::layout::Rect::new(
                        0, 0, width, height,
                    )));
                }
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
