//! Risk taxonomies, label normalisation and contribution filtering.

use crate::data::{CountryRecord, RiskTable};
use crate::error::DashboardError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Contribution assigned to countries that are not ranked
pub const UNRANKED_CONTRIBUTION: f64 = 100.0;

/// Category of countries without an assessment
pub const NO_DATA: &str = "no data";

/// Source detailed-category labels and their display names.
/// "commoditity" is kept as spelled: it keys the detailed palette.
pub const DETAILED_LABELS: [(&str, &str); 5] = [
    (
        "DCF country - not a major producer",
        "Negligible risk: not major producer",
    ),
    (
        "At risk of absolute deforestation",
        "At-risk: commoditity deforestation",
    ),
    ("At risk of relative deforestation", "At-risk: high footprint"),
    ("At risk of ecosystem conversion", "At-risk: ecosystem conversion"),
    (
        "DCF country - low ecosystem conversion",
        "Negligible risk: low ecosystem conversion",
    ),
];

/// Which risk classification colours the map
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Taxonomy {
    #[default]
    #[serde(rename = "risk-categories")]
    Aggregated,
    #[serde(rename = "detailed-risk-categories")]
    Detailed,
}

impl Taxonomy {
    pub const ALL: [Taxonomy; 2] = [Taxonomy::Aggregated, Taxonomy::Detailed];

    /// Selector value
    pub fn id(self) -> &'static str {
        match self {
            Taxonomy::Aggregated => "risk-categories",
            Taxonomy::Detailed => "detailed-risk-categories",
        }
    }

    /// Selector label, also the legend title
    pub fn label(self) -> &'static str {
        match self {
            Taxonomy::Aggregated => "Aggregated risk categories",
            Taxonomy::Detailed => "Detailed risk categories",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Taxonomy::Aggregated => Taxonomy::Detailed,
            Taxonomy::Detailed => Taxonomy::Aggregated,
        }
    }

    /// The record's category under this taxonomy
    pub fn category(self, record: &CountryRecord) -> &str {
        let category = match self {
            Taxonomy::Aggregated => record.aggregated_category.as_deref(),
            Taxonomy::Detailed => record.detailed_category.as_deref(),
        };
        category.unwrap_or(NO_DATA)
    }
}

impl fmt::Display for Taxonomy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Taxonomy {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Taxonomy::ALL
            .into_iter()
            .find(|t| t.id() == s)
            .ok_or_else(|| DashboardError::UnknownTaxonomy(s.to_string()))
    }
}

/// Map source detailed labels to display names (substring replacement)
pub fn relabel_detailed(label: &str) -> String {
    DETAILED_LABELS
        .iter()
        .fold(label.to_string(), |acc, (source, display)| {
            if acc.contains(source) {
                acc.replace(source, display)
            } else {
                acc
            }
        })
}

/// Fill unranked contributions, relabel detailed categories and mark
/// unassessed countries as `no data`. Applying it twice changes nothing.
pub fn normalize(table: &mut RiskTable) {
    for record in table.records_mut() {
        record.cumulative_contribution = record
            .cumulative_contribution
            .or(Some(UNRANKED_CONTRIBUTION));

        record.detailed_category = Some(match record.detailed_category.take() {
            Some(label) => relabel_detailed(&label),
            None => NO_DATA.to_string(),
        });
        if record.aggregated_category.is_none() {
            record.aggregated_category = Some(NO_DATA.to_string());
        }
    }
}

/// Rows of the table that pass the contribution filter
pub struct FilteredView<'a> {
    table: &'a RiskTable,
    indices: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    /// Table indices of the kept rows, in table order
    #[cfg(test)]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &'a CountryRecord)> + '_ {
        let table = self.table;
        self.indices
            .iter()
            .filter_map(move |&idx| table.get(idx).map(|record| (idx, record)))
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

impl RiskTable {
    /// Rows whose cumulative contribution is strictly below `threshold`.
    /// Rows without a contribution never pass; normalise first.
    pub fn filter_below(&self, threshold: f64) -> FilteredView<'_> {
        let indices = self
            .records()
            .iter()
            .enumerate()
            .filter(|(_, r)| r.cumulative_contribution.is_some_and(|c| c < threshold))
            .map(|(idx, _)| idx)
            .collect();
        FilteredView {
            table: self,
            indices,
        }
    }
}
