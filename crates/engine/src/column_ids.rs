//! Stable column identities.
//!
//! Steps refer to columns by id, never by header, so a rename does not break
//! replay. Ids are assigned from the header a column had when its sheet was
//! created.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::StepError;

pub type ColumnId = String;

/// Id -> header mapping of one sheet, in column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetColumnIds {
    order: Vec<ColumnId>,
    id_to_header: FxHashMap<ColumnId, String>,
}

impl SheetColumnIds {
    pub fn from_headers(headers: &[String]) -> Self {
        let mut ids = Self::default();
        for header in headers {
            ids.insert(header.clone(), header.clone());
        }
        ids
    }

    fn insert(&mut self, id: ColumnId, header: String) {
        self.order.push(id.clone());
        self.id_to_header.insert(id, header);
    }

    pub fn header_for(&self, id: &str) -> Option<&str> {
        self.id_to_header.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.id_to_header.contains_key(id)
    }

    /// Ids in column order
    pub fn ids(&self) -> impl Iterator<Item = &ColumnId> {
        self.order.iter()
    }
}

/// Column ids of every sheet. Sheets are shared between states.
#[derive(Debug, Clone, Default)]
pub struct ColumnIdMap {
    sheets: Vec<Rc<SheetColumnIds>>,
}

impl ColumnIdMap {
    pub fn push_sheet(&mut self, ids: SheetColumnIds) {
        self.sheets.push(Rc::new(ids));
    }

    pub fn sheet(&self, sheet_index: usize) -> Result<&SheetColumnIds, StepError> {
        self.sheets
            .get(sheet_index)
            .map(|ids| ids.as_ref())
            .ok_or(StepError::UnknownSheet(sheet_index))
    }

    pub fn get_column_header_by_id(
        &self,
        sheet_index: usize,
        column_id: &str,
    ) -> Result<&str, StepError> {
        self.sheet(sheet_index)?
            .header_for(column_id)
            .ok_or_else(|| StepError::UnknownColumn {
                sheet_index,
                column_id: column_id.to_string(),
            })
    }

    pub(crate) fn shares_sheet_with(&self, other: &ColumnIdMap, sheet_index: usize) -> bool {
        match (self.sheets.get(sheet_index), other.sheets.get(sheet_index)) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub(crate) fn deep_copy_sheet(&mut self, sheet_index: usize) {
        if let Some(ids) = self.sheets.get_mut(sheet_index) {
            *ids = Rc::new(ids.as_ref().clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_in_column_order() {
        let ids = SheetColumnIds::from_headers(&["A".to_string(), "B".to_string()]);
        assert_eq!(ids.header_for("A"), Some("A"));
        assert!(ids.contains("B"));
        assert!(ids.header_for("C").is_none());
        assert_eq!(ids.ids().cloned().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn test_unknown_sheet_and_column() {
        let mut map = ColumnIdMap::default();
        map.push_sheet(SheetColumnIds::from_headers(&["A".to_string()]));

        assert!(matches!(map.sheet(1), Err(StepError::UnknownSheet(1))));
        assert!(matches!(
            map.get_column_header_by_id(0, "Z"),
            Err(StepError::UnknownColumn { sheet_index: 0, .. })
        ));
        assert_eq!(map.get_column_header_by_id(0, "A").unwrap(), "A");
    }
}
