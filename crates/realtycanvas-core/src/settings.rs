//! User preferences, recent files and export history.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Storage key for persisted settings.
pub const SETTINGS_KEY: &str = "realtycanvas-settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanvasQuality {
    Low,
    Medium,
    #[default]
    High,
}

/// Encoded export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    Jpg,
    Webp,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpg => "jpg",
            ExportFormat::Webp => "webp",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "png" => Some(ExportFormat::Png),
            "jpg" | "jpeg" => Some(ExportFormat::Jpg),
            "webp" => Some(ExportFormat::Webp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelPosition {
    #[default]
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentFile {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub last_modified: i64,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    pub id: String,
    pub filename: String,
    pub format: ExportFormat,
    pub quality: f64,
    pub file_size: u64,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Export time in milliseconds.
    pub duration: u64,
    pub canvas_size: CanvasSize,
    pub includes_logos: bool,
    pub includes_measurements: bool,
    pub includes_annotations: bool,
}

/// Export record fields supplied by the caller; id and timestamp are assigned on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExportRecord {
    pub filename: String,
    pub format: ExportFormat,
    pub quality: f64,
    pub file_size: u64,
    pub thumbnail: Option<String>,
    pub duration: u64,
    pub canvas_size: CanvasSize,
    pub includes_logos: bool,
    pub includes_measurements: bool,
    pub includes_annotations: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatBreakdown {
    pub png: usize,
    pub jpg: usize,
    pub webp: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportStats {
    pub total_exports: usize,
    pub total_file_size: u64,
    /// Mean duration in milliseconds.
    pub average_export_time: f64,
    pub format_breakdown: FormatBreakdown,
    pub recent_exports: Vec<ExportRecord>,
}

/// Persisted application settings.
///
/// Missing fields take their defaults and unknown fields are ignored, so older
/// settings files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub canvas_quality: CanvasQuality,
    pub grid_visible: bool,
    pub grid_size: u32,
    pub snap_to_grid: bool,

    pub default_export_format: ExportFormat,
    pub export_quality: f64,
    pub include_layers: bool,

    pub auto_save: bool,
    /// Minutes.
    pub auto_save_interval: u32,

    pub default_brush_size: f64,
    pub default_color: String,
    pub smoothing: bool,

    pub panel_position: PanelPosition,
    pub show_tooltips: bool,
    pub show_welcome_screen: bool,

    pub max_history_steps: usize,
    pub memory_optimization: bool,

    pub default_logo_opacity: f64,
    pub default_logo_scale: f64,
    pub logo_snap_to_edges: bool,

    pub recent_files: Vec<RecentFile>,
    pub max_recent_files: usize,

    pub export_history: Vec<ExportRecord>,
    pub max_export_history: usize,
    pub track_exports: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            canvas_quality: CanvasQuality::High,
            grid_visible: true,
            grid_size: 20,
            snap_to_grid: false,
            default_export_format: ExportFormat::Png,
            export_quality: 0.9,
            include_layers: true,
            auto_save: true,
            auto_save_interval: 5,
            default_brush_size: 3.0,
            default_color: "#e4915c".to_string(),
            smoothing: true,
            panel_position: PanelPosition::Left,
            show_tooltips: true,
            show_welcome_screen: true,
            max_history_steps: crate::history::MAX_UNDO_HISTORY,
            memory_optimization: true,
            default_logo_opacity: 90.0,
            default_logo_scale: 100.0,
            logo_snap_to_edges: true,
            recent_files: Vec::new(),
            max_recent_files: 10,
            export_history: Vec::new(),
            max_export_history: 50,
            track_exports: true,
        }
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl Settings {
    /// Apply a bulk update.
    pub fn update(&mut self, f: impl FnOnce(&mut Settings)) {
        f(self);
    }

    pub fn reset(&mut self) {
        *self = Settings::default();
    }

    pub fn export_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| {
            log::error!("Failed to serialize settings: {}", e);
            String::from("{}")
        })
    }

    /// Replace the settings with `json` merged over the defaults.
    ///
    /// On a parse error the current settings are kept and `false` is returned.
    pub fn import_json(&mut self, json: &str) -> bool {
        match serde_json::from_str::<Settings>(json) {
            Ok(imported) => {
                *self = imported;
                true
            }
            Err(e) => {
                log::error!("Failed to import settings: {}", e);
                false
            }
        }
    }

    /// Loose shape check for raw settings JSON.
    pub fn validate(value: &serde_json::Value) -> bool {
        let Some(obj) = value.as_object() else {
            return false;
        };
        let quality_ok = obj
            .get("canvasQuality")
            .and_then(|q| q.as_str())
            .is_some_and(|q| matches!(q, "low" | "medium" | "high"));
        quality_ok
            && obj.get("autoSave").is_some_and(|v| v.is_boolean())
            && obj.get("gridVisible").is_some_and(|v| v.is_boolean())
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.auto_save_interval.max(1)) * 60)
    }

    /// Record an opened file, most recent first, de-duplicated by name.
    pub fn add_recent_file(&mut self, name: &str, path: Option<String>, size: u64) -> String {
        let id = Uuid::new_v4().to_string();
        let entry = RecentFile {
            id: id.clone(),
            name: name.to_string(),
            path,
            thumbnail: None,
            last_modified: now_millis(),
            size,
        };
        self.recent_files.retain(|f| f.name != name);
        self.recent_files.insert(0, entry);
        self.recent_files.truncate(self.max_recent_files);
        id
    }

    pub fn remove_recent_file(&mut self, id: &str) {
        self.recent_files.retain(|f| f.id != id);
    }

    pub fn clear_recent_files(&mut self) {
        self.recent_files.clear();
    }

    /// Prepend an export record. Ignored when export tracking is off.
    pub fn add_export_record(&mut self, record: NewExportRecord) -> Option<String> {
        if !self.track_exports {
            return None;
        }
        let id = Uuid::new_v4().to_string();
        self.export_history.insert(
            0,
            ExportRecord {
                id: id.clone(),
                filename: record.filename,
                format: record.format,
                quality: record.quality,
                file_size: record.file_size,
                timestamp: now_millis(),
                thumbnail: record.thumbnail,
                duration: record.duration,
                canvas_size: record.canvas_size,
                includes_logos: record.includes_logos,
                includes_measurements: record.includes_measurements,
                includes_annotations: record.includes_annotations,
            },
        );
        self.export_history.truncate(self.max_export_history);
        Some(id)
    }

    pub fn remove_export_record(&mut self, id: &str) {
        self.export_history.retain(|r| r.id != id);
    }

    pub fn clear_export_history(&mut self) {
        self.export_history.clear();
    }

    pub fn export_stats(&self) -> ExportStats {
        let history = &self.export_history;
        let count = |format| history.iter().filter(|r| r.format == format).count();
        let average = if history.is_empty() {
            0.0
        } else {
            history.iter().map(|r| r.duration as f64).sum::<f64>() / history.len() as f64
        };
        ExportStats {
            total_exports: history.len(),
            total_file_size: history.iter().map(|r| r.file_size).sum(),
            average_export_time: average,
            format_breakdown: FormatBreakdown {
                png: count(ExportFormat::Png),
                jpg: count(ExportFormat::Jpg),
                webp: count(ExportFormat::Webp),
            },
            recent_exports: history.iter().take(5).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(format: ExportFormat, size: u64, duration: u64) -> NewExportRecord {
        NewExportRecord {
            filename: format!("export.{}", format.extension()),
            format,
            quality: 0.9,
            file_size: size,
            thumbnail: None,
            duration,
            canvas_size: CanvasSize {
                width: 1200,
                height: 800,
            },
            includes_logos: false,
            includes_measurements: true,
            includes_annotations: true,
        }
    }

    #[test]
    fn test_round_trip() {
        let mut settings = Settings::default();
        settings.grid_size = 32;
        settings.add_recent_file("house.jpg", None, 1024);
        let json = settings.export_json();

        let mut restored = Settings::default();
        assert!(restored.import_json(&json));
        assert_eq!(restored, settings);
    }

    #[test]
    fn test_import_merges_defaults_and_ignores_unknown() {
        let mut settings = Settings::default();
        assert!(settings.import_json(r#"{"gridSize": 40, "legacyTheme": "dark"}"#));
        assert_eq!(settings.grid_size, 40);
        assert_eq!(settings.max_history_steps, 50);
        assert_eq!(settings.default_color, "#e4915c");
    }

    #[test]
    fn test_import_failure_keeps_state() {
        let mut settings = Settings::default();
        settings.grid_size = 12;
        assert!(!settings.import_json("{not json"));
        assert!(!settings.import_json(r#"{"gridSize": "big"}"#));
        assert_eq!(settings.grid_size, 12);
    }

    #[test]
    fn test_recent_files_dedup_and_cap() {
        let mut settings = Settings::default();
        settings.max_recent_files = 3;
        for name in ["a.jpg", "b.jpg", "c.jpg", "a.jpg", "d.jpg"] {
            settings.add_recent_file(name, None, 1);
        }
        let names: Vec<_> = settings.recent_files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["d.jpg", "a.jpg", "c.jpg"]);

        let id = settings.recent_files[0].id.clone();
        settings.remove_recent_file(&id);
        assert_eq!(settings.recent_files.len(), 2);
    }

    #[test]
    fn test_export_history() {
        let mut settings = Settings::default();
        settings.add_export_record(record(ExportFormat::Png, 100, 10));
        settings.add_export_record(record(ExportFormat::Jpg, 300, 30));
        let stats = settings.export_stats();
        assert_eq!(stats.total_exports, 2);
        assert_eq!(stats.total_file_size, 400);
        assert!((stats.average_export_time - 20.0).abs() < 1e-9);
        assert_eq!(stats.format_breakdown, FormatBreakdown { png: 1, jpg: 1, webp: 0 });
        assert_eq!(stats.recent_exports[0].format, ExportFormat::Jpg);

        settings.track_exports = false;
        assert!(settings.add_export_record(record(ExportFormat::Webp, 1, 1)).is_none());
        assert_eq!(settings.export_history.len(), 2);
    }

    #[test]
    fn test_validate() {
        let good = serde_json::to_value(Settings::default()).unwrap();
        assert!(Settings::validate(&good));
        let bad = serde_json::json!({"canvasQuality": "ultra", "autoSave": true, "gridVisible": true});
        assert!(!Settings::validate(&bad));
    }

    #[test]
    fn test_autosave_interval() {
        assert_eq!(Settings::default().autosave_interval(), Duration::from_secs(300));
    }
}
