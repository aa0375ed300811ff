//! Tabular state: the dataframes of a session plus their per-column metadata.
//!
//! States are snapshots. A step never edits its `prev_state`; it asks for a
//! `copy` that owns the sheets it will touch and shares everything else with
//! the previous snapshot through `Rc`.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use crate::cell::CellValue;
use crate::column_ids::{ColumnIdMap, SheetColumnIds};
use crate::error::StepError;
use crate::filter::{compute_visible_mask, default_sheet_filters, ColumnFilter, RowView, SheetFilters};
use crate::frame::DataFrame;
use crate::graph::GraphRecord;

#[derive(Debug, Clone, Default)]
pub struct TabularState {
    dfs: Vec<Rc<DataFrame>>,
    df_names: Vec<String>,
    column_ids: ColumnIdMap,
    column_filters: Vec<Rc<SheetFilters>>,
    row_views: Vec<Rc<RowView>>,
    graphs: Rc<BTreeMap<String, GraphRecord>>,
}

impl TabularState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a state from named frames, every column unfiltered.
    pub fn from_frames(frames: Vec<(String, DataFrame)>) -> Self {
        let mut state = Self::new();
        for (name, frame) in frames {
            state.add_sheet(name, frame);
        }
        state
    }

    /// Append a sheet, returning its index.
    pub fn add_sheet(&mut self, name: String, frame: DataFrame) -> usize {
        let ids = SheetColumnIds::from_headers(frame.headers());
        self.column_filters.push(Rc::new(default_sheet_filters(&ids)));
        self.row_views.push(Rc::new(RowView::new(frame.row_count())));
        self.column_ids.push_sheet(ids);
        self.dfs.push(Rc::new(frame));
        self.df_names.push(name);
        self.dfs.len() - 1
    }

    /// New state sharing every sheet except `deep_sheet_indexes`, which get
    /// their own independent copies. Out-of-range indexes are ignored.
    pub fn copy(&self, deep_sheet_indexes: &[usize]) -> TabularState {
        let mut copy = self.clone();
        for &idx in deep_sheet_indexes {
            if idx >= copy.dfs.len() {
                continue;
            }
            copy.dfs[idx] = Rc::new(self.dfs[idx].as_ref().clone());
            copy.column_filters[idx] = Rc::new(self.column_filters[idx].as_ref().clone());
            copy.row_views[idx] = Rc::new(self.row_views[idx].as_ref().clone());
            copy.column_ids.deep_copy_sheet(idx);
        }
        copy
    }

    /// True if both states hold the very same (aliased) sheet
    pub fn shares_sheet_with(&self, other: &TabularState, sheet_index: usize) -> bool {
        let same = |a: Option<&Rc<DataFrame>>, b: Option<&Rc<DataFrame>>| match (a, b) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        };
        same(self.dfs.get(sheet_index), other.dfs.get(sheet_index))
            && self.column_ids.shares_sheet_with(&other.column_ids, sheet_index)
            && matches!(
                (self.column_filters.get(sheet_index), other.column_filters.get(sheet_index)),
                (Some(a), Some(b)) if Rc::ptr_eq(a, b)
            )
            && matches!(
                (self.row_views.get(sheet_index), other.row_views.get(sheet_index)),
                (Some(a), Some(b)) if Rc::ptr_eq(a, b)
            )
    }

    fn check_sheet(&self, sheet_index: usize) -> Result<(), StepError> {
        if sheet_index < self.dfs.len() {
            Ok(())
        } else {
            Err(StepError::UnknownSheet(sheet_index))
        }
    }

    pub fn df(&self, sheet_index: usize) -> Result<&DataFrame, StepError> {
        self.dfs
            .get(sheet_index)
            .map(|df| df.as_ref())
            .ok_or(StepError::UnknownSheet(sheet_index))
    }

    pub fn df_name(&self, sheet_index: usize) -> Result<&str, StepError> {
        self.df_names
            .get(sheet_index)
            .map(String::as_str)
            .ok_or(StepError::UnknownSheet(sheet_index))
    }

    pub fn df_names(&self) -> &[String] {
        &self.df_names
    }

    pub fn column_ids(&self) -> &ColumnIdMap {
        &self.column_ids
    }

    pub fn column_filter(&self, sheet_index: usize, column_id: &str) -> Result<&ColumnFilter, StepError> {
        self.check_sheet(sheet_index)?;
        self.column_filters[sheet_index]
            .get(column_id)
            .ok_or_else(|| StepError::UnknownColumn {
                sheet_index,
                column_id: column_id.to_string(),
            })
    }

    /// Mutable filter record. Clones the sheet's filters first if they are
    /// still shared with another state.
    pub fn column_filter_mut(
        &mut self,
        sheet_index: usize,
        column_id: &str,
    ) -> Result<&mut ColumnFilter, StepError> {
        self.check_sheet(sheet_index)?;
        Rc::make_mut(&mut self.column_filters[sheet_index])
            .get_mut(column_id)
            .ok_or_else(|| StepError::UnknownColumn {
                sheet_index,
                column_id: column_id.to_string(),
            })
    }

    pub fn row_view(&self, sheet_index: usize) -> Result<&RowView, StepError> {
        self.row_views
            .get(sheet_index)
            .map(|view| view.as_ref())
            .ok_or(StepError::UnknownSheet(sheet_index))
    }

    /// Re-run every column filter of a sheet against its data.
    ///
    /// Returns the time spent filtering.
    pub fn reapply_filters(&mut self, sheet_index: usize) -> Result<Duration, StepError> {
        self.check_sheet(sheet_index)?;
        let (mask, elapsed) = compute_visible_mask(
            &self.dfs[sheet_index],
            self.column_ids.sheet(sheet_index)?,
            &self.column_filters[sheet_index],
        );
        Rc::make_mut(&mut self.row_views[sheet_index]).apply_filter(mask);
        Ok(elapsed)
    }

    /// Values of the visible rows of a column
    pub fn visible_values(&self, sheet_index: usize, column_id: &str) -> Result<Vec<CellValue>, StepError> {
        let header = self.column_ids.get_column_header_by_id(sheet_index, column_id)?;
        let column = self.df(sheet_index)?.column(header).unwrap_or(&[]);
        let view = self.row_view(sheet_index)?;
        Ok(view
            .visible_rows()
            .iter()
            .filter_map(|&row| column.get(row).cloned())
            .collect())
    }

    /// Every distinct value the column holds, visible or not
    pub fn distinct_values(&self, sheet_index: usize, column_id: &str) -> Result<Vec<CellValue>, StepError> {
        let header = self.column_ids.get_column_header_by_id(sheet_index, column_id)?;
        Ok(self.df(sheet_index)?.distinct_values(header))
    }

    pub fn graph(&self, graph_id: &str) -> Option<&GraphRecord> {
        self.graphs.get(graph_id)
    }

    pub fn set_graph(&mut self, record: GraphRecord) {
        Rc::make_mut(&mut self.graphs).insert(record.graph_id.clone(), record);
    }
}
