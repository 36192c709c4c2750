//! Delimited attribute sidecar, joined onto the GeoJSON records by ISO3.

use super::{Cell, Column, CountryRecord};
use crate::error::{DashboardError, Result};
use std::collections::HashMap;
use tracing::warn;

/// A parsed delimited table: header plus rows of raw fields
#[derive(Debug)]
pub struct AttributeTable {
    pub headers: Vec<String>,
    /// (line number, fields)
    pub rows: Vec<(usize, Vec<String>)>,
}

/// Split a delimited text table. The first non-empty line is the header;
/// blank lines are skipped and every row must match the header's width.
/// Quoting is not supported: a delimiter inside quotes still splits the field.
pub fn parse_attributes(text: &str, delimiter: char) -> Result<AttributeTable> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty());

    let (header_line, header) = lines.next().ok_or_else(|| DashboardError::Attributes {
        line: 1,
        reason: "empty attribute table".to_string(),
    })?;
    let headers: Vec<String> = header
        .split(delimiter)
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();

    if !headers.iter().any(|h| h == Column::Iso3.name()) {
        return Err(DashboardError::Attributes {
            line: header_line,
            reason: format!("no {:?} column in header", Column::Iso3.name()),
        });
    }

    let mut rows = Vec::new();
    for (line, row) in lines {
        let fields: Vec<String> = row.split(delimiter).map(str::to_string).collect();
        if fields.len() != headers.len() {
            return Err(DashboardError::Attributes {
                line,
                reason: format!("expected {} fields, found {}", headers.len(), fields.len()),
            });
        }
        rows.push((line, fields));
    }

    Ok(AttributeTable { headers, rows })
}

/// Override record properties with sidecar values. Columns that are not
/// part of the risk table are ignored, as are unknown ISO3 codes.
/// Returns the number of rows joined.
pub fn apply_attributes(
    records: &mut [CountryRecord],
    table: &AttributeTable,
    keep_default_na: bool,
) -> Result<usize> {
    let by_iso3: HashMap<String, usize> = records
        .iter()
        .enumerate()
        .map(|(idx, r)| (r.iso3.clone(), idx))
        .collect();

    let iso3_col = table
        .headers
        .iter()
        .position(|h| h == Column::Iso3.name())
        .ok_or_else(|| DashboardError::Attributes {
            line: 1,
            reason: format!("no {:?} column in header", Column::Iso3.name()),
        })?;
    let columns: Vec<(usize, Column)> = table
        .headers
        .iter()
        .enumerate()
        .filter(|&(idx, _)| idx != iso3_col)
        .filter_map(|(idx, h)| Column::from_name(h).map(|c| (idx, c)))
        .collect();

    let mut joined = 0;
    for (line, fields) in &table.rows {
        let iso3 = fields[iso3_col].trim();
        let Some(&record_idx) = by_iso3.get(iso3) else {
            warn!("attribute line {}: unknown ISO3 {:?}, skipped", line, iso3);
            continue;
        };

        let location = format!("attribute line {line}");
        let record = &mut records[record_idx];
        for &(idx, column) in &columns {
            record.set(column, Cell::from_text(&fields[idx], keep_default_na), &location)?;
        }
        joined += 1;
    }

    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<CountryRecord> {
        vec![
            CountryRecord {
                country: "Brazil".to_string(),
                iso3: "BRA".to_string(),
                cumulative_contribution: Some(40.0),
                ..CountryRecord::default()
            },
            CountryRecord {
                country: "France".to_string(),
                iso3: "FRA".to_string(),
                ..CountryRecord::default()
            },
        ]
    }

    #[test]
    fn test_parse_semicolon_table() {
        let text = "ISO3;Cumulative contribution (%);Comment\nBRA;41,5;x\n\nFRA;NA;y\n";
        let table = parse_attributes(text, ';').unwrap();
        assert_eq!(table.headers.len(), 3);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].0, 4);
    }

    #[test]
    fn test_row_width_mismatch() {
        let text = "ISO3;Country\nBRA;Brazil;extra\n";
        let err = parse_attributes(text, ';').unwrap_err();
        assert!(matches!(err, DashboardError::Attributes { line: 2, .. }));
    }

    #[test]
    fn test_header_without_iso3() {
        let err = parse_attributes("Country;Other\n", ';').unwrap_err();
        assert!(matches!(err, DashboardError::Attributes { line: 1, .. }));
    }

    #[test]
    fn test_header_error_reports_its_line() {
        let err = parse_attributes("\n\nCountry;Other\nBrazil;x\n", ';').unwrap_err();
        assert!(matches!(err, DashboardError::Attributes { line: 3, .. }));
    }

    #[test]
    fn test_apply_overrides_known_columns() {
        let text = "ISO3;Cumulative contribution (%);risk category (aggregated);Comment\n\
                    BRA;38.25;at-risk country;ignored\n\
                    FRA;NA;DCF country;ignored\n\
                    ZZZ;1;DCF country;ignored\n";
        let table = parse_attributes(text, ';').unwrap();
        let mut records = records();
        let joined = apply_attributes(&mut records, &table, true).unwrap();

        assert_eq!(joined, 2);
        assert_eq!(records[0].cumulative_contribution, Some(38.25));
        assert_eq!(records[0].aggregated_category.as_deref(), Some("at-risk country"));
        assert_eq!(records[1].cumulative_contribution, None);
        assert_eq!(records[1].aggregated_category.as_deref(), Some("DCF country"));
    }

    #[test]
    fn test_apply_rejects_bad_number() {
        let table = parse_attributes("ISO3|Cumulative contribution (%)\nBRA|lots\n", '|').unwrap();
        let mut records = records();
        let err = apply_attributes(&mut records, &table, true).unwrap_err();
        match err {
            DashboardError::InvalidNumber { location, .. } => {
                assert_eq!(location, "attribute line 2")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
