//! Choropleth figure: hover table, palette and legend for one slider/selector state.

use crate::data::RiskTable;
use crate::error::{DashboardError, Result};
use crate::risk::{FilteredView, Taxonomy, NO_DATA};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// 24-bit colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

const AGGREGATED_PALETTE: [(&str, Rgb); 3] = [
    ("DCF country", Rgb(0xBB, 0xFF, 0xEC)),
    ("at-risk country", Rgb(0xFF, 0x6A, 0x5F)),
    (NO_DATA, Rgb(0xE2, 0xEA, 0xE7)),
];

const DETAILED_PALETTE: [(&str, Rgb); 6] = [
    ("At-risk: commoditity deforestation", Rgb(0xE2, 0x72, 0x27)),
    ("At-risk: ecosystem conversion", Rgb(0xE9, 0xEF, 0x00)),
    ("At-risk: high footprint", Rgb(0xEB, 0x60, 0xC2)),
    ("Negligible risk: low ecosystem conversion", Rgb(0x65, 0x82, 0x70)),
    ("Negligible risk: not major producer", Rgb(0x84, 0x9A, 0x8E)),
    (NO_DATA, Rgb(0xE2, 0xEA, 0xE7)),
];

/// Colours handed out, in order, to categories missing from a palette
const FALLBACK_COLORS: [Rgb; 4] = [
    Rgb(0x63, 0x6E, 0xFA),
    Rgb(0x00, 0xCC, 0x96),
    Rgb(0xAB, 0x63, 0xFA),
    Rgb(0xFF, 0xA1, 0x5A),
];

/// Legend text colour
pub const LEGEND_FONT_COLOR: Rgb = Rgb(0x83, 0x9A, 0x8C);

/// Fixed category colours of a taxonomy, in legend order
pub fn palette(taxonomy: Taxonomy) -> &'static [(&'static str, Rgb)] {
    match taxonomy {
        Taxonomy::Aggregated => &AGGREGATED_PALETTE,
        Taxonomy::Detailed => &DETAILED_PALETTE,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: Rgb,
}

#[derive(Debug, Clone, Serialize)]
pub struct Legend {
    pub title: &'static str,
    pub font_color: Rgb,
    pub entries: Vec<LegendEntry>,
    /// Entries coming from the fixed palette
    #[serde(skip)]
    fixed: usize,
}

impl Legend {
    fn for_taxonomy(taxonomy: Taxonomy) -> Self {
        let fixed = palette(taxonomy);
        Self {
            title: taxonomy.label(),
            font_color: LEGEND_FONT_COLOR,
            entries: fixed
                .iter()
                .map(|&(label, color)| LegendEntry {
                    label: label.to_string(),
                    color,
                })
                .collect(),
            fixed: fixed.len(),
        }
    }

    /// Colour of a category, adding a fallback entry for unknown ones
    fn color_for(&mut self, category: &str) -> Rgb {
        if let Some(entry) = self.entries.iter().find(|e| e.label == category) {
            return entry.color;
        }
        let extra = self.entries.len() - self.fixed;
        let color = FALLBACK_COLORS[extra % FALLBACK_COLORS.len()];
        self.entries.push(LegendEntry {
            label: category.to_string(),
            color,
        });
        color
    }
}

/// One row of the hover annotation table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoverRow {
    #[serde(rename = "ISO-3")]
    pub iso3: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Risk category")]
    pub risk_category: String,
    #[serde(rename = "Contribution to global deforestation (%)")]
    pub contribution: f64,
    #[serde(rename = "2014-2018 Cattle deforestation (ha)")]
    pub deforestation_ha: Option<f64>,
    #[serde(rename = "2014-2018 Cattle production (ton.)")]
    pub production_t: Option<f64>,
}

/// Build the hover table for the filtered rows under a taxonomy
pub fn hover_table(view: &FilteredView<'_>, taxonomy: Taxonomy) -> Vec<HoverRow> {
    view.iter()
        .map(|(_, record)| HoverRow {
            iso3: record.iso3.clone(),
            country: record.country.clone(),
            risk_category: taxonomy.category(record).to_string(),
            contribution: record.cumulative_contribution.unwrap_or_default(),
            deforestation_ha: record.pasture_deforestation_ha,
            production_t: record.cattle_production_t,
        })
        .collect()
}

/// A coloured country of the figure, keyed by ISO-3
#[derive(Debug, Clone, Serialize)]
pub struct Region {
    #[serde(skip)]
    pub record: usize,
    pub iso3: String,
    pub category: String,
    pub color: Rgb,
    #[serde(skip)]
    pub hover: usize,
}

/// Everything needed to draw the map for one slider/selector state
#[derive(Debug, Clone, Serialize)]
pub struct ChoroplethFigure {
    pub taxonomy: Taxonomy,
    pub threshold: f64,
    pub projection: &'static str,
    pub legend: Legend,
    pub regions: Vec<Region>,
    pub hover: Vec<HoverRow>,
    #[serde(skip)]
    by_record: HashMap<usize, usize>,
}

impl ChoroplethFigure {
    /// Region drawn for a table record, if it passed the filter
    pub fn region_for(&self, record: usize) -> Option<&Region> {
        self.by_record.get(&record).map(|&i| &self.regions[i])
    }

    /// Hover row of a table record, if it passed the filter
    pub fn hover_for(&self, record: usize) -> Option<&HoverRow> {
        self.region_for(record).map(|r| &self.hover[r.hover])
    }

    /// Distinct categories actually present among the regions
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for region in &self.regions {
            if !seen.contains(&region.category.as_str()) {
                seen.push(&region.category);
            }
        }
        seen
    }
}

/// Filter the table below `threshold` and colour the result by `taxonomy`
pub fn build_figure(table: &RiskTable, threshold: f64, taxonomy: Taxonomy) -> ChoroplethFigure {
    let view = table.filter_below(threshold);
    let hover = hover_table(&view, taxonomy);
    let mut legend = Legend::for_taxonomy(taxonomy);

    let mut regions = Vec::with_capacity(view.len());
    let mut by_record = HashMap::with_capacity(view.len());
    for (row, ((record_idx, _), hover_row)) in view.iter().zip(&hover).enumerate() {
        let color = legend.color_for(&hover_row.risk_category);
        by_record.insert(record_idx, regions.len());
        regions.push(Region {
            record: record_idx,
            iso3: hover_row.iso3.clone(),
            category: hover_row.risk_category.clone(),
            color,
            hover: row,
        });
    }

    let figure = ChoroplethFigure {
        taxonomy,
        threshold,
        projection: "robinson",
        legend,
        regions,
        hover,
        by_record,
    };
    debug!(
        "figure: {} of {} countries below {:.3} ({}), categories {:?}",
        figure.regions.len(),
        table.len(),
        threshold,
        taxonomy,
        figure.categories()
    );
    figure
}

/// Write the figure as pretty JSON
pub fn export_figure(figure: &ChoroplethFigure, path: &Path) -> Result<()> {
    let json = simd_json::to_string_pretty(figure)?;
    fs::write(path, json).map_err(|e| DashboardError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CountryRecord;
    use crate::risk::normalize;

    fn record(iso3: &str, contribution: Option<f64>, aggregated: Option<&str>, detailed: Option<&str>) -> CountryRecord {
        CountryRecord {
            country: format!("Country {iso3}"),
            iso3: iso3.to_string(),
            cumulative_contribution: contribution,
            aggregated_category: aggregated.map(str::to_string),
            detailed_category: detailed.map(str::to_string),
            pasture_deforestation_ha: Some(1000.0),
            ..CountryRecord::default()
        }
    }

    fn table() -> RiskTable {
        let mut table = RiskTable::new(vec![
            record("BRA", Some(41.2), Some("at-risk country"), Some("At risk of absolute deforestation")),
            record("PRY", Some(49.9), Some("at-risk country"), Some("At risk of relative deforestation")),
            record("ARG", Some(60.0), Some("at-risk country"), Some("At risk of ecosystem conversion")),
            record("FRA", None, Some("DCF country"), Some("DCF country - low ecosystem conversion")),
            record("ISL", None, None, None),
        ]);
        normalize(&mut table);
        table
    }

    #[test]
    fn test_hex_colors() {
        assert_eq!(Rgb(0xBB, 0xFF, 0xEC).to_hex(), "#BBFFEC");
        assert_eq!(Rgb(0x06, 0x0A, 0x00).to_hex(), "#060A00");
    }

    #[test]
    fn test_aggregated_at_fifty() {
        let table = table();
        let figure = build_figure(&table, 50.0, Taxonomy::Aggregated);
        let allowed = ["DCF country", "at-risk country", "no data"];
        assert_eq!(figure.regions.len(), 2);
        for category in figure.categories() {
            assert!(allowed.contains(&category), "{category}");
        }
        assert_eq!(figure.legend.title, "Aggregated risk categories");
        assert_eq!(figure.legend.entries.len(), 3);
    }

    #[test]
    fn test_detailed_at_default_includes_everything() {
        let table = table();
        let figure = build_figure(&table, 100.001, Taxonomy::Detailed);
        assert_eq!(figure.regions.len(), table.len());
        assert_eq!(figure.hover.len(), table.len());
        assert_eq!(figure.legend.title, "Detailed risk categories");
        assert_eq!(figure.legend.entries.len(), 6);

        let bra = figure.region_for(0).unwrap();
        assert_eq!(bra.category, "At-risk: commoditity deforestation");
        assert_eq!(bra.color, Rgb(0xE2, 0x72, 0x27));
        let isl = figure.hover_for(4).unwrap();
        assert_eq!(isl.risk_category, "no data");
        assert_eq!(isl.contribution, 100.0);
    }

    #[test]
    fn test_zero_threshold_is_empty() {
        let figure = build_figure(&table(), 0.0, Taxonomy::Aggregated);
        assert!(figure.regions.is_empty());
        assert!(figure.hover.is_empty());
        assert!(figure.region_for(0).is_none());
    }

    #[test]
    fn test_unknown_category_gets_fallback() {
        let table = RiskTable::new(vec![record("XXX", Some(1.0), Some("watch list"), None)]);
        let figure = build_figure(&table, 50.0, Taxonomy::Aggregated);
        assert_eq!(figure.legend.entries.len(), 4);
        assert_eq!(figure.legend.entries[3].label, "watch list");
        assert_eq!(figure.regions[0].color, FALLBACK_COLORS[0]);
    }

    #[test]
    fn test_hover_columns() {
        let table = table();
        let figure = build_figure(&table, 50.0, Taxonomy::Aggregated);
        let row = &figure.hover[1];
        assert_eq!(row.iso3, "PRY");
        assert_eq!(row.country, "Country PRY");
        assert_eq!(row.risk_category, "at-risk country");
        assert_eq!(row.contribution, 49.9);
        assert_eq!(row.deforestation_ha, Some(1000.0));
        assert_eq!(row.production_t, None);
    }

    #[test]
    fn test_export_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("figure.json");
        let figure = build_figure(&table(), 50.0, Taxonomy::Aggregated);
        export_figure(&figure, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"risk-categories\""));
        assert!(text.contains("\"#FF6A5F\""));
        assert!(text.contains("\"ISO-3\""));
        assert!(text.contains("Aggregated risk categories"));
    }
}
