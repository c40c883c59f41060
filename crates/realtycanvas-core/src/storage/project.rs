//! Whole-canvas project snapshots.

use super::{Storage, StorageResult, load_json, save_json};
use crate::document::CanvasDocument;
use crate::elements::MeasurementUnit;
use crate::layer::LayerStack;
use crate::tools::ToolKind;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Storage key for the saved project.
pub const PROJECT_KEY: &str = "realtycanvas-project";

/// Everything needed to put a canvas back the way it was (minus the photo pixels).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectState {
    pub document: CanvasDocument,
    pub layers: LayerStack,
    pub active_tool: ToolKind,
    pub brush_size: f64,
    pub color: String,
    pub opacity: f64,
    pub font_size: f64,
    pub font_family: String,
    pub text_color: String,
    pub text_background_color: String,
    pub text_background: bool,
    pub zoom: f64,
    pub pixels_per_foot: f64,
    pub unit: MeasurementUnit,
    pub show_measurements: bool,
}

/// A project snapshot tagged with its capture time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectData {
    pub canvas_state: ProjectState,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl ProjectData {
    pub fn capture(canvas_state: ProjectState) -> Self {
        Self {
            canvas_state,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Persist `state` under [`PROJECT_KEY`].
pub async fn save_project(storage: &dyn Storage, state: &ProjectState) -> StorageResult<ProjectData> {
    let data = ProjectData::capture(state.clone());
    save_json(storage, PROJECT_KEY, &data).await?;
    log::info!(
        "Saved project ({} shapes, {} texts, {} measurements)",
        state.document.shapes.len(),
        state.document.texts.len(),
        state.document.measurements.len()
    );
    Ok(data)
}

/// Read the saved project. The live canvas is not touched; see `Canvas::apply_project`.
pub async fn load_project(storage: &dyn Storage) -> StorageResult<ProjectData> {
    load_json(storage, PROJECT_KEY).await
}
