//! Column-oriented dataframe.
//!
//! Holds raw values only. Filtering never drops rows from a frame; the
//! per-sheet `RowView` decides which rows are visible.

use rustc_hash::FxHashSet;

use crate::cell::CellValue;
use crate::error::StepError;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataFrame {
    headers: Vec<String>,
    columns: Vec<Vec<CellValue>>,
}

impl DataFrame {
    /// Build a frame from headers and columns of equal length.
    pub fn new(headers: Vec<String>, columns: Vec<Vec<CellValue>>) -> Result<Self, StepError> {
        if headers.len() != columns.len() {
            return Err(StepError::InvalidParameter {
                param: "columns".to_string(),
                reason: format!("{} headers but {} columns", headers.len(), columns.len()),
            });
        }

        let mut seen = FxHashSet::default();
        for header in &headers {
            if !seen.insert(header.as_str()) {
                return Err(StepError::InvalidParameter {
                    param: "headers".to_string(),
                    reason: format!("duplicate column header '{header}'"),
                });
            }
        }

        if let Some(first) = columns.first() {
            let len = first.len();
            if let Some((idx, _)) = columns.iter().enumerate().find(|(_, c)| c.len() != len) {
                return Err(StepError::InvalidParameter {
                    param: "columns".to_string(),
                    reason: format!("column '{}' has a different length", headers[idx]),
                });
            }
        }

        Ok(Self { headers, columns })
    }

    /// Build a frame from row-major records. Short rows are padded with blanks.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self, StepError> {
        let mut columns: Vec<Vec<CellValue>> = vec![Vec::with_capacity(rows.len()); headers.len()];
        for row in rows {
            if row.len() > headers.len() {
                return Err(StepError::InvalidParameter {
                    param: "rows".to_string(),
                    reason: format!("row has {} fields, expected at most {}", row.len(), headers.len()),
                });
            }
            let mut row = row.into_iter();
            for column in columns.iter_mut() {
                column.push(row.next().unwrap_or_default());
            }
        }
        Self::new(headers, columns)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |c| c.len())
    }

    pub fn column(&self, header: &str) -> Option<&[CellValue]> {
        self.headers
            .iter()
            .position(|h| h == header)
            .map(|idx| self.columns[idx].as_slice())
    }

    pub fn row(&self, row: usize) -> Option<Vec<&CellValue>> {
        if row >= self.row_count() {
            return None;
        }
        Some(self.columns.iter().map(|c| &c[row]).collect())
    }

    /// Distinct values of a column, in first-seen order.
    pub fn distinct_values(&self, header: &str) -> Vec<CellValue> {
        let Some(column) = self.column(header) else {
            return Vec::new();
        };

        let mut seen: FxHashSet<&CellValue> = FxHashSet::default();
        column
            .iter()
            .filter(|v| seen.insert(*v))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> DataFrame {
        DataFrame::from_rows(
            vec!["A".to_string(), "B".to_string()],
            vec![
                vec![CellValue::text("aaron"), CellValue::number(1.0)],
                vec![CellValue::text("jake"), CellValue::number(2.0)],
                vec![CellValue::text("Nate")],
                vec![CellValue::text("aaron"), CellValue::number(1.0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_from_rows_pads_short_rows() {
        let df = people();
        assert_eq!(df.row_count(), 4);
        assert_eq!(df.column("B").unwrap()[2], CellValue::Blank);
    }

    #[test]
    fn test_distinct_values_first_seen_order() {
        let df = people();
        assert_eq!(
            df.distinct_values("B"),
            vec![CellValue::number(1.0), CellValue::number(2.0), CellValue::Blank]
        );
        assert!(df.distinct_values("missing").is_empty());
    }

    #[test]
    fn test_rejects_duplicate_headers() {
        let result = DataFrame::new(
            vec!["A".to_string(), "A".to_string()],
            vec![vec![], vec![]],
        );
        assert!(matches!(result, Err(StepError::InvalidParameter { .. })));
    }

    #[test]
    fn test_rejects_ragged_columns() {
        let result = DataFrame::new(
            vec!["A".to_string(), "B".to_string()],
            vec![vec![CellValue::Blank], vec![]],
        );
        assert!(result.is_err());
    }
}
