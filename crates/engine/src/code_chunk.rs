//! Generated code for recorded steps.
//!
//! Each performer's `transpile` describes its transition as code chunks;
//! chunks render to pandas code. Chunks are built from the states and params
//! a step already produced, never by re-running the step.
//!
//! Design principles:
//! - One chunk per user intent (not per value toggled)
//! - Every filter chunk rebuilds its dataframe from `<df>_unfiltered`, the
//!   copy taken before the first filter, so chunks never compound
//! - Deterministic output (columns in sheet order, values in recorded order)
//! - String literals always escaped

use rustc_hash::FxHashSet;

use crate::cell::{python_string_literal, CellValue};
use crate::error::StepError;
use crate::filter::{BulkFilterCondition, ColumnFilter, Filter, FilterCondition, FilterOperator};
use crate::state::TabularState;

/// A unit of generated code.
#[derive(Debug, Clone, PartialEq)]
pub enum CodeChunk {
    /// Re-filter a dataframe after an edit to one of its columns
    Filter {
        sheet_index: usize,
        df_name: String,
        /// Header of the column the step edited
        column_header: String,
        /// Every column filter of the sheet after the step, in column order
        column_filters: Vec<(String, ColumnFilter)>,
    },
}

/// Rendering switches for generated code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeOptions {
    /// Emit a `# description` line before each chunk
    pub include_comments: bool,
    /// Drop chunks that a later chunk supersedes
    pub optimize: bool,
}

impl Default for CodeOptions {
    fn default() -> Self {
        Self {
            include_comments: true,
            optimize: true,
        }
    }
}

impl CodeChunk {
    /// Filter chunk for an edit of `column_id`, snapshotting the sheet's
    /// filters as they stand in `post_state`.
    pub fn filter(post_state: &TabularState, sheet_index: usize, column_id: &str) -> Result<Self, StepError> {
        let column_ids = post_state.column_ids();
        let mut column_filters = Vec::new();
        for id in column_ids.sheet(sheet_index)?.ids() {
            column_filters.push((
                column_ids.get_column_header_by_id(sheet_index, id)?.to_string(),
                post_state.column_filter(sheet_index, id)?.clone(),
            ));
        }

        Ok(CodeChunk::Filter {
            sheet_index,
            df_name: post_state.df_name(sheet_index)?.to_string(),
            column_header: column_ids.get_column_header_by_id(sheet_index, column_id)?.to_string(),
            column_filters,
        })
    }

    /// Human-readable description, used as the chunk's comment.
    pub fn description(&self) -> String {
        match self {
            CodeChunk::Filter { df_name, column_header, column_filters, .. } => {
                let active = column_filters
                    .iter()
                    .any(|(header, filter)| header == column_header && filter.is_active());
                if active {
                    format!("Filtered {} in {}", column_header, df_name)
                } else {
                    format!("Removed filter on {} in {}", column_header, df_name)
                }
            }
        }
    }

    /// Dataframe the chunk reassigns
    pub fn df_name(&self) -> &str {
        match self {
            CodeChunk::Filter { df_name, .. } => df_name,
        }
    }

    /// True if the chunk leaves every row of its dataframe in place.
    pub fn keeps_every_row(&self) -> bool {
        match self {
            CodeChunk::Filter { df_name, column_filters, .. } => {
                sheet_mask(&unfiltered_name(df_name), column_filters).is_none()
            }
        }
    }

    /// Code lines of this chunk. Expects `<df>_unfiltered` to exist; `render`
    /// emits it ahead of a dataframe's first chunk.
    pub fn to_code(&self) -> Vec<String> {
        match self {
            CodeChunk::Filter { df_name, column_filters, .. } => {
                let source = unfiltered_name(df_name);
                match sheet_mask(&source, column_filters) {
                    Some(mask) => vec![format!("{} = {}[{}]", df_name, source, mask)],
                    None => vec![format!("{} = {}.copy()", df_name, source)],
                }
            }
        }
    }

    /// True if `later` makes this chunk's effect irrelevant.
    ///
    /// A filter chunk carries the whole filter set of its sheet, so any later
    /// filter chunk on the same sheet replaces it.
    pub fn superseded_by(&self, later: &CodeChunk) -> bool {
        match (self, later) {
            (
                CodeChunk::Filter { sheet_index, .. },
                CodeChunk::Filter { sheet_index: later_sheet, .. },
            ) => sheet_index == later_sheet,
        }
    }
}

/// Drop every chunk superseded by a later one, keeping order.
pub fn optimize(chunks: Vec<CodeChunk>) -> Vec<CodeChunk> {
    let keep: Vec<bool> = chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| !chunks[i + 1..].iter().any(|later| chunk.superseded_by(later)))
        .collect();

    chunks
        .into_iter()
        .zip(keep)
        .filter_map(|(chunk, keep)| keep.then_some(chunk))
        .collect()
}

/// Render chunks into code lines.
pub fn render(chunks: Vec<CodeChunk>, options: CodeOptions) -> Vec<String> {
    let chunks = if options.optimize { optimize(chunks) } else { chunks };

    let mut preserved: FxHashSet<String> = FxHashSet::default();
    let mut lines = Vec::new();
    for chunk in chunks {
        let df_name = chunk.df_name();
        if !preserved.contains(df_name) {
            // Nothing filtered this dataframe yet
            if chunk.keeps_every_row() {
                continue;
            }
            lines.push(format!("{} = {}.copy()", unfiltered_name(df_name), df_name));
            preserved.insert(df_name.to_string());
        }
        if options.include_comments {
            lines.push(format!("# {}", chunk.description()));
        }
        lines.extend(chunk.to_code());
    }
    lines
}

fn unfiltered_name(df_name: &str) -> String {
    format!("{}_unfiltered", df_name)
}

// ============================================================================
// Mask helpers
// ============================================================================

/// Mask over every column filter of a sheet, or None if it keeps every row.
fn sheet_mask(df: &str, column_filters: &[(String, ColumnFilter)]) -> Option<String> {
    let terms: Vec<String> = column_filters
        .iter()
        .filter_map(|(header, filter)| {
            filter_mask(&format!("{}[{}]", df, python_string_literal(header)), filter)
        })
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(parenthesize(&terms, " & "))
    }
}

/// Boolean mask expression for a column filter, or None if it keeps every row.
fn filter_mask(series: &str, column_filter: &ColumnFilter) -> Option<String> {
    let mut terms = Vec::new();

    let list = &column_filter.filter_list;
    if !list.filters.is_empty() {
        let parts: Vec<String> = list
            .filters
            .iter()
            .map(|f| filter_expression(series, f))
            .collect();
        let joiner = match list.operator {
            FilterOperator::And => " & ",
            FilterOperator::Or => " | ",
        };
        terms.push(parenthesize(&parts, joiner));
    }

    let bulk = &column_filter.bulk_filter;
    match bulk.condition {
        BulkFilterCondition::IsExactly => {
            terms.push(format!("{}.isin({})", series, values_to_python_list(&bulk.value)));
        }
        BulkFilterCondition::IsNotExactly if !bulk.value.is_empty() => {
            terms.push(format!("~{}.isin({})", series, values_to_python_list(&bulk.value)));
        }
        _ => {}
    }

    match terms.len() {
        0 => None,
        1 => terms.pop(),
        _ => Some(parenthesize(&terms, " & ")),
    }
}

fn parenthesize(parts: &[String], joiner: &str) -> String {
    if parts.len() == 1 {
        return parts[0].clone();
    }
    parts
        .iter()
        .map(|p| format!("({})", p))
        .collect::<Vec<_>>()
        .join(joiner)
}

fn filter_expression(series: &str, filter: &Filter) -> String {
    use FilterCondition::*;

    let literal = filter.value.to_python_literal();
    let lowered = python_string_literal(&filter.value.display_string().to_lowercase());

    match filter.condition {
        Contains => format!("{}.str.contains({}, na=False, case=False, regex=False)", series, literal),
        StringDoesNotContain => {
            format!("~{}.str.contains({}, na=True, case=False, regex=False)", series, literal)
        }
        StringExactly | NumberExactly => format!("{} == {}", series, literal),
        StringNotExactly | NumberNotExactly => format!("{} != {}", series, literal),
        StringStartsWith => format!("{}.str.lower().str.startswith({}, na=False)", series, lowered),
        StringEndsWith => format!("{}.str.lower().str.endswith({}, na=False)", series, lowered),
        Greater => format!("{} > {}", series, literal),
        GreaterThanOrEqual => format!("{} >= {}", series, literal),
        Less => format!("{} < {}", series, literal),
        LessThanOrEqual => format!("{} <= {}", series, literal),
        Empty => format!("{}.isna()", series),
        NotEmpty => format!("{}.notna()", series),
        BooleanIsTrue => format!("{} == True", series),
        BooleanIsFalse => format!("{} == False", series),
    }
}

fn values_to_python_list(values: &[CellValue]) -> String {
    let items: Vec<String> = values.iter().map(CellValue::to_python_literal).collect();
    format!("[{}]", items.join(", "))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{BulkFilter, FilterList};

    fn chunk(header: &str, column_filter: ColumnFilter) -> CodeChunk {
        sheet_chunk(0, header, vec![(header, column_filter)])
    }

    fn sheet_chunk(sheet_index: usize, header: &str, filters: Vec<(&str, ColumnFilter)>) -> CodeChunk {
        CodeChunk::Filter {
            sheet_index,
            df_name: format!("df{}", sheet_index + 1),
            column_header: header.to_string(),
            column_filters: filters.into_iter().map(|(h, f)| (h.to_string(), f)).collect(),
        }
    }

    fn bulk(condition: BulkFilterCondition, value: Vec<CellValue>) -> ColumnFilter {
        ColumnFilter {
            bulk_filter: BulkFilter { condition, value },
            ..ColumnFilter::default()
        }
    }

    fn exactly(values: &[f64]) -> ColumnFilter {
        bulk(BulkFilterCondition::IsExactly, values.iter().map(|&v| CellValue::number(v)).collect())
    }

    #[test]
    fn test_bulk_is_exactly_code() {
        let c = chunk("A", exactly(&[1.0, 3.0]));
        assert_eq!(c.to_code(), vec!["df1 = df1_unfiltered[df1_unfiltered['A'].isin([1, 3])]"]);
    }

    #[test]
    fn test_bulk_is_not_exactly_code() {
        let c = chunk("A", bulk(BulkFilterCondition::IsNotExactly, vec![CellValue::text("it's")]));
        assert_eq!(
            c.to_code(),
            vec![r"df1 = df1_unfiltered[~df1_unfiltered['A'].isin(['it\'s'])]"]
        );
    }

    #[test]
    fn test_inactive_filter_restores_unfiltered() {
        let c = chunk("A", ColumnFilter::default());
        assert!(c.keeps_every_row());
        assert_eq!(c.to_code(), vec!["df1 = df1_unfiltered.copy()"]);
        assert_eq!(c.description(), "Removed filter on A in df1");
    }

    #[test]
    fn test_filter_list_and_bulk_combined() {
        let column_filter = ColumnFilter {
            filter_list: FilterList {
                operator: FilterOperator::Or,
                filters: vec![
                    Filter::new(FilterCondition::Greater, 5.0),
                    Filter::new(FilterCondition::Empty, CellValue::Blank),
                ],
            },
            bulk_filter: BulkFilter {
                condition: BulkFilterCondition::IsNotExactly,
                value: vec![CellValue::number(7.0)],
            },
            filtered_out_values: vec![CellValue::number(7.0)],
        };
        let code = chunk("B", column_filter).to_code();
        assert_eq!(
            code,
            vec![
                "df1 = df1_unfiltered[((df1_unfiltered['B'] > 5) | (df1_unfiltered['B'].isna())) \
                 & (~df1_unfiltered['B'].isin([7]))]"
            ]
        );
    }

    #[test]
    fn test_chunk_masks_every_filtered_column() {
        let c = sheet_chunk(
            0,
            "B",
            vec![("A", exactly(&[1.0])), ("B", ColumnFilter::default()), ("C", exactly(&[2.0]))],
        );
        assert_eq!(c.description(), "Removed filter on B in df1");
        assert_eq!(
            c.to_code(),
            vec![
                "df1 = df1_unfiltered[(df1_unfiltered['A'].isin([1])) \
                 & (df1_unfiltered['C'].isin([2]))]"
            ]
        );
    }

    #[test]
    fn test_optimize_keeps_last_filter_per_sheet() {
        let first = sheet_chunk(0, "A", vec![("A", exactly(&[1.0]))]);
        let other = sheet_chunk(1, "B", vec![("B", exactly(&[2.0]))]);
        let last = sheet_chunk(0, "C", vec![("A", exactly(&[1.0])), ("C", exactly(&[3.0]))]);

        let optimized = optimize(vec![first, other.clone(), last.clone()]);
        assert_eq!(optimized, vec![other, last]);
    }

    #[test]
    fn test_render_with_and_without_comments() {
        let c = chunk("A", exactly(&[1.0]));

        let lines = render(vec![c.clone()], CodeOptions::default());
        assert_eq!(
            lines,
            vec![
                "df1_unfiltered = df1.copy()",
                "# Filtered A in df1",
                "df1 = df1_unfiltered[df1_unfiltered['A'].isin([1])]",
            ]
        );

        let lines = render(vec![c], CodeOptions { include_comments: false, optimize: false });
        assert_eq!(
            lines,
            vec!["df1_unfiltered = df1.copy()", "df1 = df1_unfiltered[df1_unfiltered['A'].isin([1])]"]
        );
    }

    #[test]
    fn test_unoptimized_chunks_never_compound() {
        let chunks = vec![
            chunk("A", exactly(&[1.0, 3.0])),
            chunk("A", ColumnFilter::default()),
            chunk("A", exactly(&[1.0, 3.0, 2.0])),
        ];
        let lines = render(chunks, CodeOptions { include_comments: false, optimize: false });
        assert_eq!(
            lines,
            vec![
                "df1_unfiltered = df1.copy()",
                "df1 = df1_unfiltered[df1_unfiltered['A'].isin([1, 3])]",
                "df1 = df1_unfiltered.copy()",
                "df1 = df1_unfiltered[df1_unfiltered['A'].isin([1, 3, 2])]",
            ]
        );
    }

    #[test]
    fn test_render_skips_no_op_before_first_filter() {
        let chunks = vec![
            chunk("A", ColumnFilter::default()),
            sheet_chunk(1, "B", vec![("B", exactly(&[2.0]))]),
        ];
        let lines = render(chunks, CodeOptions { include_comments: false, optimize: false });
        assert_eq!(
            lines,
            vec!["df2_unfiltered = df2.copy()", "df2 = df2_unfiltered[df2_unfiltered['B'].isin([2])]"]
        );
    }
}
