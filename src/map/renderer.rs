use crate::braille::BrailleCanvas;
use crate::data::{CountryRecord, RiskTable};
use crate::figure::{ChoroplethFigure, Rgb};
use crate::map::geometry::{erase_ring, fill_polygon, pixel_extent, point_in_rings, PixelRing};
use crate::map::projection::Viewport;
use rayon::prelude::*;

/// Outlines are only knocked out of polygons at least this many pixels across,
/// so small countries stay visible at world zoom
const MIN_OUTLINED_EXTENT: i32 = 6;

/// What a paint id on the canvas stands for
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    /// Index into the risk table
    pub record: usize,
    /// Category colour; `None` for base land outside the figure
    pub color: Option<Rgb>,
}

/// Rasterised map: the canvas plus the meaning of each paint id
pub struct MapLayers {
    pub canvas: BrailleCanvas,
    pub fills: Vec<Fill>,
}

impl MapLayers {
    /// Fill behind a character cell, if anything was painted there
    pub fn fill_at(&self, col: usize, row: usize) -> Option<&Fill> {
        let paint = self.canvas.cell(col, row)?.paint?;
        self.fills.get(paint as usize)
    }
}

/// Display settings for map layers
#[derive(Clone)]
pub struct DisplaySettings {
    /// Knock country outlines out of the fill
    pub show_outlines: bool,
    /// Paint countries outside the figure as neutral land
    pub show_land: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_outlines: true,
            show_land: true,
        }
    }
}

/// Choropleth renderer over the braille canvas
pub struct ChoroplethRenderer {
    pub settings: DisplaySettings,
}

impl ChoroplethRenderer {
    pub fn new() -> Self {
        Self {
            settings: DisplaySettings::default(),
        }
    }

    /// Render the figure for the given viewport.
    /// `only_category` restricts coloured regions to one legend entry;
    /// the rest fall back to land.
    pub fn render(
        &self,
        table: &RiskTable,
        figure: &ChoroplethFigure,
        only_category: Option<&str>,
        width: usize,
        height: usize,
        viewport: &Viewport,
    ) -> MapLayers {
        let mut canvas = BrailleCanvas::new(width, height);

        let mut drawable: Vec<Fill> = table
            .index()
            .query(viewport.visible_bounds())
            .into_iter()
            .filter_map(|record| match figure.region_for(record) {
                Some(region) if only_category.map_or(true, |c| c == region.category) => Some(Fill {
                    record,
                    color: Some(region.color),
                }),
                _ => self.settings.show_land.then_some(Fill { record, color: None }),
            })
            .collect();
        // Land underneath, regions on top
        drawable.sort_by_key(|fill| fill.color.is_some());

        let projected: Vec<Vec<Vec<PixelRing>>> = drawable
            .par_iter()
            .map(|fill| project_record(&table.records()[fill.record], viewport))
            .collect();

        let mut fills = Vec::with_capacity(drawable.len());
        let mut outlined: Vec<&Vec<PixelRing>> = Vec::new();
        for (fill, polygons) in drawable.iter().zip(&projected) {
            if polygons.is_empty() {
                continue;
            }
            let paint = fills.len() as u32;
            fills.push(*fill);

            for rings in polygons {
                let lit = fill_polygon(&mut canvas, rings, paint);
                if lit == 0 {
                    // Too small to cover a pixel centre: mark it with one dot
                    if let Some(&(x, y)) = rings.first().and_then(|r| r.first()) {
                        canvas.set_pixel_signed(x, y, paint);
                    }
                }
                let (w, h) = pixel_extent(rings);
                if w >= MIN_OUTLINED_EXTENT && h >= MIN_OUTLINED_EXTENT {
                    outlined.push(rings);
                }
            }
        }

        if self.settings.show_outlines {
            for rings in outlined {
                for ring in rings {
                    erase_ring(&mut canvas, ring);
                }
            }
        }

        MapLayers { canvas, fills }
    }

    /// Toggle country outlines
    pub fn toggle_outlines(&mut self) {
        self.settings.show_outlines = !self.settings.show_outlines;
    }

    /// Toggle base land
    pub fn toggle_land(&mut self) {
        self.settings.show_land = !self.settings.show_land;
    }
}

impl Default for ChoroplethRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Project a record's polygons to pixel rings, dropping polygons out of view
fn project_record(record: &CountryRecord, viewport: &Viewport) -> Vec<Vec<PixelRing>> {
    record
        .polygons
        .iter()
        .filter_map(|polygon| {
            let rings: Vec<PixelRing> = polygon
                .iter()
                .map(|ring| {
                    let mut pixels: PixelRing = Vec::with_capacity(ring.len());
                    for &(lon, lat) in ring {
                        let p = viewport.project(lon, lat);
                        if pixels.last() != Some(&p) {
                            pixels.push(p);
                        }
                    }
                    pixels
                })
                .collect();

            let exterior = rings.first()?;
            let min = exterior
                .iter()
                .fold((i32::MAX, i32::MAX), |m, &(x, y)| (m.0.min(x), m.1.min(y)));
            let max = exterior
                .iter()
                .fold((i32::MIN, i32::MIN), |m, &(x, y)| (m.0.max(x), m.1.max(y)));
            viewport.box_might_be_visible(min, max).then_some(rings)
        })
        .collect()
}

/// Index of the country containing (lon, lat), if any
pub fn country_at(table: &RiskTable, lon: f64, lat: f64) -> Option<usize> {
    table
        .index()
        .query_point(lon, lat)
        .into_iter()
        .find(|&idx| {
            table.get(idx).is_some_and(|record| {
                record
                    .polygons
                    .iter()
                    .any(|rings| point_in_rings(lon, lat, rings))
            })
        })
}
