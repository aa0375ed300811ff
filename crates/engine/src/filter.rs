//! Column filters and the row view layer.
//!
//! A sheet's frame keeps every row; filtering only changes which rows are
//! visible. Key invariants:
//! - visible_mask is indexed by DATA row
//! - A row is visible iff every column filter of its sheet passes
//! - Re-applying filters is a pure function of (frame, column filters)

use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::cell::CellValue;
use crate::column_ids::{ColumnId, SheetColumnIds};
use crate::frame::DataFrame;

// =============================================================================
// RowView: visible rows of a sheet
// =============================================================================

/// Row view layer: which data rows survive the sheet's filters
#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    /// Visibility mask indexed by data row
    /// true = visible, false = hidden by filter
    visible_mask: Vec<bool>,

    /// Cached list of visible row indices, rebuilt when the mask changes
    visible_rows: Vec<usize>,
}

impl Default for RowView {
    fn default() -> Self {
        Self::new(0)
    }
}

impl RowView {
    /// All N rows visible
    pub fn new(row_count: usize) -> Self {
        Self {
            visible_mask: vec![true; row_count],
            visible_rows: (0..row_count).collect(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.visible_mask.len()
    }

    pub fn visible_count(&self) -> usize {
        self.visible_rows.len()
    }

    pub fn visible_rows(&self) -> &[usize] {
        &self.visible_rows
    }

    /// Apply filter visibility (mask indexed by data row)
    pub fn apply_filter(&mut self, visible_mask: Vec<bool>) {
        self.visible_mask = visible_mask;
        self.rebuild_visible_cache();
    }

    fn rebuild_visible_cache(&mut self) {
        self.visible_rows = self
            .visible_mask
            .iter()
            .enumerate()
            .filter_map(|(row, &visible)| visible.then_some(row))
            .collect();
    }
}

// =============================================================================
// Simple filters (filter_list)
// =============================================================================

/// Condition of a simple filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterCondition {
    Contains,
    StringDoesNotContain,
    StringExactly,
    StringNotExactly,
    StringStartsWith,
    StringEndsWith,
    NumberExactly,
    NumberNotExactly,
    Greater,
    GreaterThanOrEqual,
    Less,
    LessThanOrEqual,
    Empty,
    NotEmpty,
    BooleanIsTrue,
    BooleanIsFalse,
}

/// Simple filter predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub condition: FilterCondition,
    #[serde(default)]
    pub value: CellValue,
}

impl Filter {
    pub fn new(condition: FilterCondition, value: impl Into<CellValue>) -> Self {
        Self {
            condition,
            value: value.into(),
        }
    }

    /// RULE: non-text values FAIL text conditions, non-numbers FAIL number conditions
    pub fn matches(&self, cell: &CellValue) -> bool {
        use FilterCondition::*;

        match self.condition {
            Contains | StringDoesNotContain | StringStartsWith | StringEndsWith => {
                let (Some(text), Some(needle)) = (cell.as_text(), self.value.as_text()) else {
                    return false;
                };
                let haystack = text.to_lowercase();
                let needle = needle.to_lowercase();
                match self.condition {
                    Contains => haystack.contains(&needle),
                    StringDoesNotContain => !haystack.contains(&needle),
                    StringStartsWith => haystack.starts_with(&needle),
                    _ => haystack.ends_with(&needle),
                }
            }
            StringExactly | StringNotExactly => {
                let (Some(text), Some(operand)) = (cell.as_text(), self.value.as_text()) else {
                    return false;
                };
                (text == operand) == (self.condition == StringExactly)
            }
            NumberExactly | NumberNotExactly | Greater | GreaterThanOrEqual | Less
            | LessThanOrEqual => {
                let (Some(n), Some(operand)) = (cell.as_number(), self.value.as_number()) else {
                    return false;
                };
                match self.condition {
                    NumberExactly => n == operand,
                    NumberNotExactly => n != operand,
                    Greater => n > operand,
                    GreaterThanOrEqual => n >= operand,
                    Less => n < operand,
                    _ => n <= operand,
                }
            }
            Empty => cell.is_blank(),
            NotEmpty => !cell.is_blank(),
            BooleanIsTrue => matches!(cell, CellValue::Bool(true)),
            BooleanIsFalse => matches!(cell, CellValue::Bool(false)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    #[default]
    And,
    Or,
}

/// Simple filters of one column, joined by an operator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterList {
    #[serde(default)]
    pub operator: FilterOperator,
    #[serde(default)]
    pub filters: Vec<Filter>,
}

impl FilterList {
    /// Empty list = all pass
    pub fn passes(&self, cell: &CellValue) -> bool {
        if self.filters.is_empty() {
            return true;
        }
        match self.operator {
            FilterOperator::And => self.filters.iter().all(|f| f.matches(cell)),
            FilterOperator::Or => self.filters.iter().any(|f| f.matches(cell)),
        }
    }
}

// =============================================================================
// Bulk filter
// =============================================================================

pub const BULK_FILTER_CONDITION_IS_EXACTLY: &str = "bulk_is_exactly";
pub const BULK_FILTER_CONDITION_IS_NOT_EXACTLY: &str = "bulk_is_not_exactly";

/// Inclusion/exclusion mode of a bulk filter.
///
/// Unknown tags are preserved as `Unrecognized` rather than failing to parse,
/// so the transition matrix can reject them with a dedicated error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BulkFilterCondition {
    IsExactly,
    IsNotExactly,
    Unrecognized(String),
}

impl BulkFilterCondition {
    pub fn as_str(&self) -> &str {
        match self {
            BulkFilterCondition::IsExactly => BULK_FILTER_CONDITION_IS_EXACTLY,
            BulkFilterCondition::IsNotExactly => BULK_FILTER_CONDITION_IS_NOT_EXACTLY,
            BulkFilterCondition::Unrecognized(tag) => tag,
        }
    }
}

impl From<String> for BulkFilterCondition {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            BULK_FILTER_CONDITION_IS_EXACTLY => BulkFilterCondition::IsExactly,
            BULK_FILTER_CONDITION_IS_NOT_EXACTLY => BulkFilterCondition::IsNotExactly,
            _ => BulkFilterCondition::Unrecognized(tag),
        }
    }
}

impl From<BulkFilterCondition> for String {
    fn from(condition: BulkFilterCondition) -> Self {
        condition.as_str().to_string()
    }
}

/// Column-level inclusion/exclusion predicate over the column's distinct values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkFilter {
    pub condition: BulkFilterCondition,
    /// IS_EXACTLY: the kept values. IS_NOT_EXACTLY: the negated operand.
    pub value: Vec<CellValue>,
}

impl Default for BulkFilter {
    fn default() -> Self {
        Self {
            condition: BulkFilterCondition::IsNotExactly,
            value: Vec::new(),
        }
    }
}

impl BulkFilter {
    pub fn passes(&self, cell: &CellValue) -> bool {
        match &self.condition {
            BulkFilterCondition::IsExactly => self.value.contains(cell),
            BulkFilterCondition::IsNotExactly => !self.value.contains(cell),
            BulkFilterCondition::Unrecognized(_) => true,
        }
    }

    /// Does this filter hide anything at all?
    pub fn is_active(&self) -> bool {
        match self.condition {
            BulkFilterCondition::IsNotExactly => !self.value.is_empty(),
            _ => true,
        }
    }
}

// =============================================================================
// ColumnFilter: everything filtering a single column
// =============================================================================

/// Per-column filter record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnFilter {
    pub filter_list: FilterList,
    pub bulk_filter: BulkFilter,
    /// Values currently excluded by the bulk filter
    pub filtered_out_values: Vec<CellValue>,
}

impl ColumnFilter {
    /// filter_list AND bulk_filter
    pub fn passes(&self, cell: &CellValue) -> bool {
        self.filter_list.passes(cell) && self.bulk_filter.passes(cell)
    }

    pub fn is_active(&self) -> bool {
        !self.filter_list.filters.is_empty() || self.bulk_filter.is_active()
    }
}

/// Filters of one sheet, keyed by column id
pub type SheetFilters = FxHashMap<ColumnId, ColumnFilter>;

/// Default filters for every column of a sheet
pub fn default_sheet_filters(column_ids: &SheetColumnIds) -> SheetFilters {
    column_ids
        .ids()
        .map(|id| (id.clone(), ColumnFilter::default()))
        .collect()
}

/// Compute the visible mask of a sheet from all of its column filters.
///
/// Returns the mask and the time spent computing it.
pub fn compute_visible_mask(
    frame: &DataFrame,
    column_ids: &SheetColumnIds,
    filters: &SheetFilters,
) -> (Vec<bool>, Duration) {
    let start = Instant::now();
    let mut mask = vec![true; frame.row_count()];

    for (column_id, column_filter) in filters {
        if !column_filter.is_active() {
            continue;
        }
        let Some(column) = column_ids
            .header_for(column_id)
            .and_then(|header| frame.column(header))
        else {
            continue;
        };
        for (visible, cell) in mask.iter_mut().zip(column) {
            if *visible && !column_filter.passes(cell) {
                *visible = false;
            }
        }
    }

    (mask, start.elapsed())
}

// =============================================================================
// Tests
// =============================================================================
