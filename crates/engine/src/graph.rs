use serde::{Deserialize, Serialize};

use crate::column_ids::ColumnId;

/// Graph kinds understood by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphType {
    #[serde(rename = "bar")]
    Bar,
    #[serde(rename = "box")]
    Box,
    #[serde(rename = "density contour")]
    DensityContour,
    #[serde(rename = "density heatmap")]
    DensityHeatmap,
    #[serde(rename = "ecdf")]
    Ecdf,
    #[serde(rename = "histogram")]
    Histogram,
    #[serde(rename = "line")]
    Line,
    #[serde(rename = "scatter")]
    Scatter,
    #[serde(rename = "strip")]
    Strip,
    #[serde(rename = "violin")]
    Violin,
}

/// Column selection and layout of a graph. Rendering happens elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRecord {
    pub graph_id: String,
    pub graph_type: GraphType,
    pub sheet_index: usize,
    pub safety_filter_turned_on_by_user: bool,
    pub x_axis_column_ids: Vec<ColumnId>,
    pub y_axis_column_ids: Vec<ColumnId>,
    pub height: u32,
    pub width: u32,
}

impl GraphRecord {
    /// A graph with no axis selected renders nothing
    pub fn has_output(&self) -> bool {
        !self.x_axis_column_ids.is_empty() || !self.y_axis_column_ids.is_empty()
    }
}
