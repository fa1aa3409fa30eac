//! Threshold-band classification.
//!
//! A `ClassificationTable` is an ordered list of half-open bands
//! `[lower, upper)`. Lookup walks the bands in ascending order and returns the
//! first one containing the value; values outside every band get the
//! `"unclassified"` fallback rather than an error.

use serde::{Deserialize, Serialize};

/// Label returned when a value falls outside every band.
pub const UNCLASSIFIED_LABEL: &str = "unclassified";

/// Description paired with `UNCLASSIFIED_LABEL`.
pub const UNCLASSIFIED_DESCRIPTION: &str = "Value outside classification range";

/// One row of a classification table.
///
/// `upper == None` means the band is unbounded above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub lower: f64,
    #[serde(default)]
    pub upper: Option<f64>,
    pub label: String,
    pub description: String,
}

impl Band {
    pub fn new(lower: f64, upper: Option<f64>, label: &str, description: &str) -> Self {
        Self {
            lower,
            upper,
            label: label.to_string(),
            description: description.to_string(),
        }
    }

    /// Lower bound inclusive, upper bound exclusive.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && self.upper.is_none_or(|upper| value < upper)
    }
}

/// The label/description pair chosen for a metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub class_label: String,
    pub description: String,
}

impl ClassificationResult {
    pub fn unclassified() -> Self {
        Self {
            class_label: UNCLASSIFIED_LABEL.to_string(),
            description: UNCLASSIFIED_DESCRIPTION.to_string(),
        }
    }

    pub fn is_unclassified(&self) -> bool {
        self.class_label == UNCLASSIFIED_LABEL
    }
}

/// Errors found while validating a table.
#[derive(Debug, Clone, PartialEq)]
pub enum TableError {
    Empty(String),
    InvertedBand { table: String, label: String },
    Overlap { table: String, label: String },
    UnboundedBeforeEnd { table: String, label: String },
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableError::Empty(table) => write!(f, "table '{}' has no bands", table),
            TableError::InvertedBand { table, label } => {
                write!(f, "band '{}' in table '{}' has lower >= upper", label, table)
            }
            TableError::Overlap { table, label } => write!(
                f,
                "band '{}' in table '{}' starts below the previous band's upper bound",
                label, table
            ),
            TableError::UnboundedBeforeEnd { table, label } => write!(
                f,
                "band '{}' in table '{}' is unbounded but is not the last band",
                label, table
            ),
        }
    }
}

impl std::error::Error for TableError {}

/// An ordered threshold table for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationTable {
    pub name: String,
    pub bands: Vec<Band>,
}

impl ClassificationTable {
    /// Builds a table, rejecting bands that are empty, inverted, overlapping
    /// or out of order.
    pub fn new(name: &str, bands: Vec<Band>) -> Result<Self, TableError> {
        let table = Self {
            name: name.to_string(),
            bands,
        };
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<(), TableError> {
        if self.bands.is_empty() {
            return Err(TableError::Empty(self.name.clone()));
        }

        for (i, band) in self.bands.iter().enumerate() {
            match band.upper {
                Some(upper) if band.lower >= upper => {
                    return Err(TableError::InvertedBand {
                        table: self.name.clone(),
                        label: band.label.clone(),
                    });
                }
                None if i + 1 < self.bands.len() => {
                    return Err(TableError::UnboundedBeforeEnd {
                        table: self.name.clone(),
                        label: band.label.clone(),
                    });
                }
                _ => {}
            }

            if i > 0 {
                // Previous band is bounded, checked above.
                let prev_upper = self.bands[i - 1].upper.unwrap_or(f64::INFINITY);
                if band.lower < prev_upper {
                    return Err(TableError::Overlap {
                        table: self.name.clone(),
                        label: band.label.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Maps `value` to the first band containing it.
    pub fn classify(&self, value: f64) -> ClassificationResult {
        self.bands
            .iter()
            .find(|band| band.contains(value))
            .map(|band| ClassificationResult {
                class_label: band.label.clone(),
                description: band.description.clone(),
            })
            .unwrap_or_else(ClassificationResult::unclassified)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn three_band_table() -> ClassificationTable {
        ClassificationTable::new(
            "test",
            vec![
                Band::new(0.0, Some(10.0), "low", "Low"),
                Band::new(10.0, Some(20.0), "mid", "Mid"),
                Band::new(20.0, None, "high", "High"),
            ],
        )
        .expect("valid table")
    }

    #[test]
    fn test_lower_bound_is_inclusive() {
        let t = three_band_table();
        assert_eq!(t.classify(0.0).class_label, "low");
        assert_eq!(t.classify(10.0).class_label, "mid");
        assert_eq!(t.classify(20.0).class_label, "high");
    }

    #[test]
    fn test_upper_bound_is_exclusive() {
        let t = three_band_table();
        assert_eq!(t.classify(9.999).class_label, "low");
        assert_eq!(t.classify(19.999).class_label, "mid");
    }

    #[test]
    fn test_unbounded_last_band_catches_large_values() {
        assert_eq!(three_band_table().classify(1.0e9).class_label, "high");
    }

    #[test]
    fn test_negative_and_nan_fall_back_to_unclassified() {
        let t = three_band_table();
        assert!(t.classify(-0.01).is_unclassified());
        assert!(t.classify(f64::NAN).is_unclassified());
        assert_eq!(t.classify(-5.0).description, UNCLASSIFIED_DESCRIPTION);
    }

    #[test]
    fn test_gap_between_bands_is_unclassified() {
        let t = ClassificationTable::new(
            "gappy",
            vec![
                Band::new(0.0, Some(1.0), "a", "A"),
                Band::new(2.0, Some(3.0), "b", "B"),
            ],
        )
        .unwrap();
        assert!(t.classify(1.5).is_unclassified());
        assert_eq!(t.classify(2.0).class_label, "b");
    }

    #[test]
    fn test_empty_table_is_rejected() {
        assert_eq!(
            ClassificationTable::new("empty", vec![]),
            Err(TableError::Empty("empty".to_string()))
        );
    }

    #[test]
    fn test_inverted_band_is_rejected() {
        let result = ClassificationTable::new("bad", vec![Band::new(5.0, Some(5.0), "x", "X")]);
        assert!(matches!(result, Err(TableError::InvertedBand { .. })));
    }

    #[test]
    fn test_overlapping_bands_are_rejected() {
        let result = ClassificationTable::new(
            "bad",
            vec![
                Band::new(0.0, Some(10.0), "a", "A"),
                Band::new(5.0, Some(15.0), "b", "B"),
            ],
        );
        assert!(matches!(result, Err(TableError::Overlap { .. })));
    }

    #[test]
    fn test_unbounded_band_must_be_last() {
        let result = ClassificationTable::new(
            "bad",
            vec![
                Band::new(0.0, None, "a", "A"),
                Band::new(5.0, Some(15.0), "b", "B"),
            ],
        );
        assert!(matches!(result, Err(TableError::UnboundedBeforeEnd { .. })));
    }
}
