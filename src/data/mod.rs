//! Loading of the per-country risk table from GeoJSON.

pub mod attributes;

use crate::error::{DashboardError, Result};
use crate::map::{BboxGrid, Bbox};
use geojson::{Feature, GeoJson, Geometry, JsonValue, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default location of the risk dataset, relative to the working directory
pub const DEFAULT_DATA_PATH: &str =
    "data/global_beef_deforestation_risk_categorization_first_stage.geojson";

/// Field delimiter of the embedded tabular data
pub const DEFAULT_DELIMITER: char = ';';

/// Missing-value markers recognised when `keep_default_na` is set
const DEFAULT_NA_VALUES: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub(crate) fn is_default_na(cell: &str) -> bool {
    let cell = cell.trim();
    DEFAULT_NA_VALUES.contains(&cell)
}

/// A closed ring of (lon, lat) positions
pub type Ring = Vec<(f64, f64)>;

/// A polygon as rings, exterior first, then holes
pub type Polygon = Vec<Ring>;

/// Columns of the risk table, named as in the source dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Country,
    Iso3,
    Contribution,
    AggregatedCategory,
    DetailedCategory,
    PastureDeforestation,
    CattleProduction,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::Country,
        Column::Iso3,
        Column::Contribution,
        Column::AggregatedCategory,
        Column::DetailedCategory,
        Column::PastureDeforestation,
        Column::CattleProduction,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::Country => "Country",
            Column::Iso3 => "ISO3",
            Column::Contribution => "Cumulative contribution (%)",
            Column::AggregatedCategory => "risk category (aggregated)",
            Column::DetailedCategory => "risk category (detailed)",
            Column::PastureDeforestation => "Average pasture deforestation (2014-2018) - ha",
            Column::CattleProduction => "Average cattle production (2014-2018) - tonnes",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    fn is_numeric(self) -> bool {
        matches!(
            self,
            Column::Contribution | Column::PastureDeforestation | Column::CattleProduction
        )
    }
}

/// A single raw table cell before typing
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Cell<'a> {
    Missing,
    Number(f64),
    Text(&'a str),
}

impl<'a> Cell<'a> {
    pub(crate) fn from_text(text: &'a str, keep_default_na: bool) -> Self {
        if keep_default_na && is_default_na(text) {
            Cell::Missing
        } else {
            Cell::Text(text)
        }
    }

    fn from_json(value: &'a JsonValue, keep_default_na: bool) -> Self {
        match value {
            JsonValue::Null => Cell::Missing,
            JsonValue::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Missing),
            JsonValue::String(s) => Cell::from_text(s, keep_default_na),
            JsonValue::Bool(true) => Cell::Text("true"),
            JsonValue::Bool(false) => Cell::Text("false"),
            JsonValue::Array(_) | JsonValue::Object(_) => Cell::Missing,
        }
    }
}

/// One country of the risk table
#[derive(Debug, Clone, Default)]
pub struct CountryRecord {
    pub country: String,
    pub iso3: String,
    pub polygons: Vec<Polygon>,
    /// Bounding box of all polygons; `None` without geometry
    pub bbox: Option<Bbox>,
    /// Rank-accumulated share of global cattle deforestation, 0-100
    pub cumulative_contribution: Option<f64>,
    pub aggregated_category: Option<String>,
    pub detailed_category: Option<String>,
    pub pasture_deforestation_ha: Option<f64>,
    pub cattle_production_t: Option<f64>,
}

impl CountryRecord {
    /// Store a cell in the given column. Missing cells leave the required
    /// text columns untouched and clear the optional ones.
    pub(crate) fn set(&mut self, column: Column, cell: Cell<'_>, location: &str) -> Result<()> {
        if column.is_numeric() {
            let value = match cell {
                Cell::Missing => None,
                Cell::Number(n) => Some(n),
                Cell::Text(text) => Some(parse_number(text, column, location)?),
            };
            match column {
                Column::Contribution => self.cumulative_contribution = value,
                Column::PastureDeforestation => self.pasture_deforestation_ha = value,
                _ => self.cattle_production_t = value,
            }
            return Ok(());
        }

        let text = match cell {
            Cell::Missing => None,
            Cell::Number(n) => Some(n.to_string()),
            Cell::Text(text) => Some(text.trim().to_string()),
        };
        match (column, text) {
            (Column::Country, Some(text)) => self.country = text,
            (Column::Iso3, Some(text)) => self.iso3 = text,
            (Column::Country | Column::Iso3, None) => {}
            (Column::AggregatedCategory, text) => self.aggregated_category = text,
            (_, text) => self.detailed_category = text,
        }
        Ok(())
    }

    pub fn has_geometry(&self) -> bool {
        self.bbox.is_some()
    }
}

fn parse_number(text: &str, column: Column, location: &str) -> Result<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| DashboardError::InvalidNumber {
            location: location.to_string(),
            column: column.name().to_string(),
            value: text.to_string(),
        })
}

/// The immutable per-country table, with a bbox index for rendering
#[derive(Debug)]
pub struct RiskTable {
    records: Vec<CountryRecord>,
    index: BboxGrid,
}

impl RiskTable {
    pub fn new(records: Vec<CountryRecord>) -> Self {
        let index = BboxGrid::build(
            records.iter().map(|r| r.bbox.as_ref()),
            BboxGrid::DEFAULT_CELL_SIZE,
        );
        Self { records, index }
    }

    pub fn records(&self) -> &[CountryRecord] {
        &self.records
    }

    /// Geometry must not change through this; the bbox index depends on it
    pub(crate) fn records_mut(&mut self) -> &mut [CountryRecord] {
        &mut self.records
    }

    pub fn get(&self, idx: usize) -> Option<&CountryRecord> {
        self.records.get(idx)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn index(&self) -> &BboxGrid {
        &self.index
    }

    /// Largest cumulative contribution present, 0 for an empty table
    pub fn max_contribution(&self) -> f64 {
        self.records
            .iter()
            .filter_map(|r| r.cumulative_contribution)
            .fold(0.0, f64::max)
    }

    pub fn position_iso3(&self, iso3: &str) -> Option<usize> {
        self.records.iter().position(|r| r.iso3 == iso3)
    }
}

/// How the dataset is read
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Field delimiter of the attribute sidecar
    pub delimiter: char,
    /// Treat the default NA markers as missing values
    pub keep_default_na: bool,
    /// Optional delimited attribute table joined on ISO3
    pub attributes: Option<PathBuf>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            keep_default_na: true,
            attributes: None,
        }
    }
}

/// Load the risk table from a GeoJSON file (plus the optional sidecar)
pub fn load_risk_table(path: &Path, options: &LoadOptions) -> Result<RiskTable> {
    info!("Loading risk table from {:?}", path);
    let bytes = fs::read(path).map_err(|e| DashboardError::io(path, e))?;
    let mut records = parse_risk_geojson(bytes, options)?;

    if let Some(attributes_path) = &options.attributes {
        info!("Joining attributes from {:?}", attributes_path);
        let text = fs::read_to_string(attributes_path)
            .map_err(|e| DashboardError::io(attributes_path, e))?;
        let table = attributes::parse_attributes(&text, options.delimiter)?;
        let joined = attributes::apply_attributes(&mut records, &table, options.keep_default_na)?;
        info!("Applied {} attribute rows", joined);
    }

    let table = RiskTable::new(records);
    info!(
        "Loaded {} countries ({} with geometry)",
        table.len(),
        table.index().len()
    );
    Ok(table)
}

/// Parse GeoJSON bytes into country records
pub fn parse_risk_geojson(mut bytes: Vec<u8>, options: &LoadOptions) -> Result<Vec<CountryRecord>> {
    let geojson: GeoJson = simd_json::serde::from_slice(&mut bytes)?;
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        GeoJson::Feature(_) => return Err(DashboardError::NotFeatureCollection("Feature")),
        GeoJson::Geometry(_) => return Err(DashboardError::NotFeatureCollection("Geometry")),
    };

    collection
        .features
        .iter()
        .enumerate()
        .map(|(idx, feature)| record_from_feature(idx, feature, options.keep_default_na))
        .collect()
}

fn record_from_feature(idx: usize, feature: &Feature, keep_default_na: bool) -> Result<CountryRecord> {
    let location = format!("feature {idx}");
    let props = feature.properties.as_ref();
    let cell = |column: Column| {
        props
            .and_then(|p| p.get(column.name()))
            .map(|v| Cell::from_json(v, keep_default_na))
            .unwrap_or(Cell::Missing)
    };

    let mut record = CountryRecord::default();
    for column in [Column::Country, Column::Iso3] {
        if cell(column) == Cell::Missing {
            return Err(DashboardError::MissingProperty {
                feature: idx,
                column: column.name(),
            });
        }
    }
    for column in Column::ALL {
        record.set(column, cell(column), &location)?;
    }

    if let Some(geometry) = &feature.geometry {
        collect_polygons(geometry, &mut record.polygons);
    }
    if let Some(&(lon, lat)) = record
        .polygons
        .iter()
        .flatten()
        .flatten()
        .find(|(lon, lat)| !(-180.0..=180.0).contains(lon) || !(-90.0..=90.0).contains(lat))
    {
        return Err(DashboardError::CoordinateOutOfRange {
            feature: idx,
            lon,
            lat,
        });
    }
    record.bbox = polygons_bbox(&record.polygons);
    if record.bbox.is_none() {
        debug!("{} ({}) has no polygon geometry", record.country, record.iso3);
    }

    Ok(record)
}

fn to_ring(positions: &[Vec<f64>]) -> Ring {
    positions
        .iter()
        .filter(|p| p.len() >= 2)
        .map(|p| (p[0], p[1]))
        .collect()
}

/// Gather the polygonal parts of a geometry; lines and points are ignored
fn collect_polygons(geometry: &Geometry, out: &mut Vec<Polygon>) {
    match &geometry.value {
        Value::Polygon(rings) => {
            out.push(rings.iter().map(|r| to_ring(r)).collect());
        }
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                out.push(rings.iter().map(|r| to_ring(r)).collect());
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_polygons(g, out);
            }
        }
        _ => {}
    }
}

fn polygons_bbox(polygons: &[Polygon]) -> Option<Bbox> {
    let mut positions = polygons.iter().flatten().flatten().peekable();
    positions.peek()?;
    Some(positions.fold(
        (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
        |(min_lon, min_lat, max_lon, max_lat), &(lon, lat)| {
            (min_lon.min(lon), min_lat.min(lat), max_lon.max(lon), max_lat.max(lat))
        },
    ))
}
