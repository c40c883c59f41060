//! Reusable element bundles (built-in and user-created).

use crate::canvas::Canvas;
use crate::elements::{
    ElementKind, ElementRef, Measurement, MeasurementKind, SerializableColor, Shape, ShapeKind, TextAnnotation, VectorPath,
};
use crate::storage::{Storage, StorageError, StorageResult, load_json, save_json};
use chrono::Utc;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Storage key for custom templates.
pub const TEMPLATES_KEY: &str = "realtycanvas-templates";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Cannot delete default template '{0}'")]
    BuiltIn(String),
    #[error("Template not found: {0}")]
    NotFound(String),
    #[error("Invalid template JSON: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateCategory {
    PropertyLines,
    Features,
    Measurements,
    Labels,
    Custom,
}

impl TemplateCategory {
    pub const ALL: [TemplateCategory; 5] = [
        TemplateCategory::PropertyLines,
        TemplateCategory::Features,
        TemplateCategory::Measurements,
        TemplateCategory::Labels,
        TemplateCategory::Custom,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TemplateCategory::PropertyLines => "property-lines",
            TemplateCategory::Features => "features",
            TemplateCategory::Measurements => "measurements",
            TemplateCategory::Labels => "labels",
            TemplateCategory::Custom => "custom",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateElementKind {
    Text,
    Measurement,
    Shape,
    Logo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateShapeType {
    Rectangle,
    Circle,
    Line,
    Polygon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateMeasurementType {
    Distance,
    Area,
}

/// Per-kind element properties; only the fields relevant to the kind are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_background: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape_type: Option<TemplateShapeType>,
    /// Offsets relative to the element position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Point>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement_type: Option<TemplateMeasurementType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateElement {
    #[serde(rename = "type")]
    pub kind: TemplateElementKind,
    pub id: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub properties: TemplateProperties,
}

impl TemplateElement {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyTemplate {
    pub id: String,
    pub name: String,
    pub category: TemplateCategory,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub elements: Vec<TemplateElement>,
    pub is_custom: bool,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<i64>,
    #[serde(default)]
    pub use_count: u32,
}

/// Caller-supplied fields for a new template.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTemplate {
    pub name: String,
    pub category: TemplateCategory,
    pub description: String,
    pub thumbnail: Option<String>,
    pub elements: Vec<TemplateElement>,
    pub is_custom: bool,
}

/// Persisted form: `{ "templates": [...] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TemplateFile {
    templates: Vec<PropertyTemplate>,
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn text_element(id: &str, x: f64, y: f64, text: &str, font_size: f64, color: &str) -> TemplateElement {
    TemplateElement {
        kind: TemplateElementKind::Text,
        id: id.to_string(),
        x,
        y,
        properties: TemplateProperties {
            text: Some(text.to_string()),
            font_size: Some(font_size),
            font_family: Some("Inter".to_string()),
            color: Some(color.to_string()),
            background_color: Some("#ffffff".to_string()),
            has_background: Some(true),
            ..Default::default()
        },
    }
}

fn shape_element(id: &str, x: f64, y: f64, shape_type: TemplateShapeType, props: TemplateProperties) -> TemplateElement {
    TemplateElement {
        kind: TemplateElementKind::Shape,
        id: id.to_string(),
        x,
        y,
        properties: TemplateProperties {
            shape_type: Some(shape_type),
            stroke_width: Some(2.0),
            ..props
        },
    }
}

fn measurement_element(
    id: &str,
    x: f64,
    y: f64,
    kind: TemplateMeasurementType,
    unit: &str,
    points: &[(f64, f64)],
) -> TemplateElement {
    TemplateElement {
        kind: TemplateElementKind::Measurement,
        id: id.to_string(),
        x,
        y,
        properties: TemplateProperties {
            measurement_type: Some(kind),
            unit: Some(unit.to_string()),
            points: Some(points.iter().map(|&(px, py)| Point::new(px, py)).collect()),
            ..Default::default()
        },
    }
}

fn built_in(id: &str, name: &str, category: TemplateCategory, description: &str, elements: Vec<TemplateElement>) -> PropertyTemplate {
    PropertyTemplate {
        id: id.to_string(),
        name: name.to_string(),
        category,
        description: description.to_string(),
        thumbnail: None,
        elements,
        is_custom: false,
        created_at: now_millis(),
        last_used: None,
        use_count: 0,
    }
}

/// The five templates that ship with the app.
pub fn default_templates() -> Vec<PropertyTemplate> {
    vec![
        built_in(
            "property-boundary-basic",
            "Property Boundary - Basic",
            TemplateCategory::PropertyLines,
            "Basic property line marking with corner labels",
            vec![
                text_element("corner-1", 50.0, 50.0, "Property Corner", 12.0, "#cc0000"),
                shape_element(
                    "boundary-line",
                    50.0,
                    70.0,
                    TemplateShapeType::Line,
                    TemplateProperties {
                        points: Some(vec![Point::new(0.0, 0.0), Point::new(200.0, 0.0)]),
                        stroke_color: Some("#cc0000".to_string()),
                        ..Default::default()
                    },
                ),
            ],
        ),
        built_in(
            "building-outline",
            "Building Outline",
            TemplateCategory::Features,
            "Standard building outline with square footage label",
            vec![
                shape_element(
                    "building-rect",
                    100.0,
                    100.0,
                    TemplateShapeType::Rectangle,
                    TemplateProperties {
                        width: Some(150.0),
                        height: Some(100.0),
                        stroke_color: Some("#0066cc".to_string()),
                        fill_color: Some("#e6f3ff".to_string()),
                        ..Default::default()
                    },
                ),
                text_element("sqft-label", 175.0, 150.0, "1,200 sq ft", 14.0, "#0066cc"),
            ],
        ),
        built_in(
            "landscape-features",
            "Landscape Features",
            TemplateCategory::Features,
            "Trees, garden areas, and landscape elements",
            vec![
                shape_element(
                    "tree-circle",
                    200.0,
                    200.0,
                    TemplateShapeType::Circle,
                    TemplateProperties {
                        radius: Some(25.0),
                        stroke_color: Some("#009900".to_string()),
                        fill_color: Some("#ccffcc".to_string()),
                        ..Default::default()
                    },
                ),
                text_element("tree-label", 185.0, 240.0, "Oak Tree", 11.0, "#009900"),
            ],
        ),
        built_in(
            "driveway-parking",
            "Driveway & Parking",
            TemplateCategory::Features,
            "Driveway outline with parking spaces",
            vec![
                shape_element(
                    "driveway",
                    50.0,
                    300.0,
                    TemplateShapeType::Rectangle,
                    TemplateProperties {
                        width: Some(20.0),
                        height: Some(100.0),
                        stroke_color: Some("#666666".to_string()),
                        fill_color: Some("#f0f0f0".to_string()),
                        ..Default::default()
                    },
                ),
                text_element("driveway-label", 45.0, 410.0, "Driveway", 12.0, "#666666"),
            ],
        ),
        built_in(
            "measurement-combo",
            "Property Measurements",
            TemplateCategory::Measurements,
            "Distance and area measurement tools combo",
            vec![
                measurement_element(
                    "front-distance",
                    100.0,
                    50.0,
                    TemplateMeasurementType::Distance,
                    "feet",
                    &[(0.0, 0.0), (200.0, 0.0)],
                ),
                measurement_element(
                    "lot-area",
                    150.0,
                    150.0,
                    TemplateMeasurementType::Area,
                    "sq ft",
                    &[(0.0, 0.0), (200.0, 0.0), (200.0, 150.0), (0.0, 150.0)],
                ),
            ],
        ),
    ]
}

fn parse_templates(json: &str) -> Result<Vec<PropertyTemplate>, TemplateError> {
    serde_json::from_str::<TemplateFile>(json)
        .map(|file| file.templates)
        .map_err(|e| TemplateError::Parse(e.to_string()))
}

/// Built-in plus custom templates.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateCatalog {
    templates: Vec<PropertyTemplate>,
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self {
            templates: default_templates(),
        }
    }
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-ins followed by the custom entries of `stored`.
    pub fn with_custom(stored: Vec<PropertyTemplate>) -> Self {
        let mut catalog = Self::new();
        catalog.templates.extend(stored.into_iter().filter(|t| t.is_custom));
        catalog
    }

    pub fn all(&self) -> &[PropertyTemplate] {
        &self.templates
    }

    pub fn get(&self, id: &str) -> Option<&PropertyTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn require(&self, id: &str) -> Result<&PropertyTemplate, TemplateError> {
        self.get(id).ok_or_else(|| TemplateError::NotFound(id.to_string()))
    }

    /// Filter by category and case-insensitive name/description search,
    /// most used first, then by name.
    pub fn templates(&self, category: Option<TemplateCategory>, search: Option<&str>) -> Vec<&PropertyTemplate> {
        let query = search.map(str::to_lowercase).filter(|q| !q.is_empty());
        let mut found: Vec<_> = self
            .templates
            .iter()
            .filter(|t| category.is_none_or(|c| t.category == c))
            .filter(|t| {
                query.as_ref().is_none_or(|q| {
                    t.name.to_lowercase().contains(q.as_str()) || t.description.to_lowercase().contains(q.as_str())
                })
            })
            .collect();
        found.sort_by(|a, b| {
            b.use_count
                .cmp(&a.use_count)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        found
    }

    pub fn add(&mut self, template: NewTemplate) -> String {
        let id = Uuid::new_v4().to_string();
        self.templates.push(PropertyTemplate {
            id: id.clone(),
            name: template.name,
            category: template.category,
            description: template.description,
            thumbnail: template.thumbnail,
            elements: template.elements,
            is_custom: template.is_custom,
            created_at: now_millis(),
            last_used: None,
            use_count: 0,
        });
        id
    }

    pub fn update(&mut self, id: &str, f: impl FnOnce(&mut PropertyTemplate)) -> bool {
        match self.templates.iter_mut().find(|t| t.id == id) {
            Some(template) => {
                f(template);
                true
            }
            None => false,
        }
    }

    /// Remove a custom template. Built-ins are refused and left in place.
    pub fn remove(&mut self, id: &str) -> Result<bool, TemplateError> {
        if self.get(id).is_some_and(|t| !t.is_custom) {
            return Err(TemplateError::BuiltIn(id.to_string()));
        }
        let before = self.templates.len();
        self.templates.retain(|t| t.id != id);
        Ok(self.templates.len() != before)
    }

    /// Bump the use count and last-used time.
    pub fn use_template(&mut self, id: &str) -> bool {
        self.update(id, |t| {
            t.use_count += 1;
            t.last_used = Some(now_millis());
        })
    }

    pub fn popular(&self, limit: usize) -> Vec<&PropertyTemplate> {
        let mut used: Vec<_> = self.templates.iter().filter(|t| t.use_count > 0).collect();
        used.sort_by(|a, b| b.use_count.cmp(&a.use_count));
        used.truncate(limit);
        used
    }

    pub fn recent(&self, limit: usize) -> Vec<&PropertyTemplate> {
        let mut used: Vec<_> = self.templates.iter().filter(|t| t.last_used.is_some()).collect();
        used.sort_by(|a, b| b.last_used.cmp(&a.last_used));
        used.truncate(limit);
        used
    }

    /// A custom template (not yet added to the catalog).
    pub fn create_from_canvas(name: &str, description: &str, elements: Vec<TemplateElement>) -> PropertyTemplate {
        PropertyTemplate {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            category: TemplateCategory::Custom,
            description: description.to_string(),
            thumbnail: None,
            elements,
            is_custom: true,
            created_at: now_millis(),
            last_used: None,
            use_count: 0,
        }
    }

    pub fn custom_templates(&self) -> Vec<PropertyTemplate> {
        self.templates.iter().filter(|t| t.is_custom).cloned().collect()
    }

    /// Custom templates as pretty JSON.
    pub fn export_json(&self) -> String {
        let file = TemplateFile {
            templates: self.custom_templates(),
        };
        serde_json::to_string_pretty(&file).unwrap_or_else(|e| {
            log::error!("Failed to serialize templates: {}", e);
            String::from("{\"templates\": []}")
        })
    }

    /// Append templates from JSON as new custom entries.
    ///
    /// Ids are regenerated with an `imported-` prefix and usage is reset. On a
    /// parse failure the catalog is unchanged and `false` is returned.
    pub fn import_json(&mut self, json: &str) -> bool {
        let imported = match parse_templates(json) {
            Ok(templates) => templates,
            Err(e) => {
                log::error!("Failed to import templates: {}", e);
                return false;
            }
        };
        let now = now_millis();
        for mut template in imported {
            template.id = format!("imported-{}-{}", now, Uuid::new_v4().simple());
            template.is_custom = true;
            template.created_at = now;
            template.use_count = 0;
            template.last_used = None;
            self.templates.push(template);
        }
        true
    }
}

/// A template element converted into something the canvas can hold.
enum Placed {
    Text(TextAnnotation),
    Shape(Shape),
    Path(VectorPath),
    Measurement(Measurement),
}

fn place(element: &TemplateElement, canvas: &Canvas, origin: Vec2) -> Option<Placed> {
    let props = &element.properties;
    let at = element.position() + origin;
    let offsets = || -> Vec<Point> {
        props
            .points
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|p| at + p.to_vec2())
            .collect()
    };
    let stroke = props
        .stroke_color
        .as_deref()
        .map_or_else(|| SerializableColor::from_hex(&canvas.color), SerializableColor::from_hex);
    let stroke_width = props.stroke_width.unwrap_or(canvas.brush_size);
    let fill = props.fill_color.as_deref().map(SerializableColor::from_hex);

    match element.kind {
        TemplateElementKind::Text => {
            let mut text = TextAnnotation::new(
                props.text.clone().unwrap_or_else(|| "Text".to_string()),
                at,
                props.font_size.unwrap_or(canvas.font_size),
            );
            if let Some(family) = &props.font_family {
                text.font_family = family.clone();
            }
            if let Some(color) = &props.color {
                text.color = SerializableColor::from_hex(color);
            }
            if let Some(background) = &props.background_color {
                text.background_color = SerializableColor::from_hex(background);
            }
            text.has_background = props.has_background.unwrap_or(false);
            text.rotation = props.rotation.unwrap_or(0.0);
            text.remeasure(canvas.measurer());
            Some(Placed::Text(text))
        }
        TemplateElementKind::Shape => match props.shape_type.unwrap_or(TemplateShapeType::Rectangle) {
            TemplateShapeType::Rectangle => {
                let size = Vec2::new(props.width.unwrap_or(100.0), props.height.unwrap_or(100.0));
                let mut shape = Shape::new(ShapeKind::Rectangle, at, at + size).with_style(
                    stroke,
                    stroke_width,
                    props.opacity.unwrap_or(100.0),
                );
                shape.fill = fill;
                Some(Placed::Shape(shape))
            }
            TemplateShapeType::Circle => {
                let mut shape = Shape::circle(at, props.radius.unwrap_or(25.0)).with_style(
                    stroke,
                    stroke_width,
                    props.opacity.unwrap_or(100.0),
                );
                shape.fill = fill;
                Some(Placed::Shape(shape))
            }
            shape_type @ (TemplateShapeType::Line | TemplateShapeType::Polygon) => {
                let mut path = VectorPath::from_points(&offsets(), stroke, stroke_width)?;
                if shape_type == TemplateShapeType::Polygon {
                    path.closed = true;
                    path.fill = fill;
                }
                Some(Placed::Path(path))
            }
        },
        TemplateElementKind::Measurement => {
            let kind = match props.measurement_type.unwrap_or(TemplateMeasurementType::Distance) {
                TemplateMeasurementType::Distance => MeasurementKind::Distance,
                TemplateMeasurementType::Area => MeasurementKind::Area,
            };
            canvas.build_measurement(kind, offsets()).map(Placed::Measurement)
        }
        TemplateElementKind::Logo => {
            log::warn!("Template element '{}' references a logo; skipped", element.id);
            None
        }
    }
}

/// Add every element of `template` to the canvas, shifted by `origin`, as one
/// undoable step. Measurements are valued with the canvas calibration.
pub fn instantiate(template: &PropertyTemplate, canvas: &mut Canvas, origin: Vec2) -> Vec<ElementRef> {
    let placed: Vec<Placed> = template
        .elements
        .iter()
        .filter_map(|element| place(element, canvas, origin))
        .collect();
    log::info!("Applying template '{}' ({} elements)", template.name, placed.len());

    canvas.edit_document(|doc| {
        placed
            .into_iter()
            .map(|item| match item {
                Placed::Text(text) => ElementRef::new(ElementKind::Text, doc.add_text(text)),
                Placed::Shape(shape) => ElementRef::new(ElementKind::Shape, doc.add_shape(shape)),
                Placed::Path(path) => ElementRef::new(ElementKind::VectorPath, doc.add_path(path)),
                Placed::Measurement(m) => ElementRef::new(ElementKind::Measurement, doc.add_measurement(m)),
            })
            .collect()
    })
}

/// Catalog with the custom templates stored in `storage`.
pub async fn load_catalog(storage: &dyn Storage) -> TemplateCatalog {
    match load_json::<TemplateFile>(storage, TEMPLATES_KEY).await {
        Ok(file) => TemplateCatalog::with_custom(file.templates),
        Err(StorageError::NotFound(_)) => TemplateCatalog::new(),
        Err(e) => {
            log::warn!("Failed to load templates: {}", e);
            TemplateCatalog::new()
        }
    }
}

/// Persist the custom templates only.
pub async fn save_catalog(storage: &dyn Storage, catalog: &TemplateCatalog) -> StorageResult<()> {
    let file = TemplateFile {
        templates: catalog.custom_templates(),
    };
    save_json(storage, TEMPLATES_KEY, &file).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn custom(name: &str) -> NewTemplate {
        NewTemplate {
            name: name.to_string(),
            category: TemplateCategory::Custom,
            description: "mine".to_string(),
            thumbnail: None,
            elements: vec![text_element("t", 0.0, 0.0, "Hi", 12.0, "#000000")],
            is_custom: true,
        }
    }

    #[test]
    fn test_builtins() {
        let catalog = TemplateCatalog::new();
        assert_eq!(catalog.all().len(), 5);
        let combo = catalog.get("measurement-combo").unwrap();
        assert_eq!(combo.elements.len(), 2);
        assert!(!combo.is_custom);
    }

    #[test]
    fn test_filter_and_sort() {
        let mut catalog = TemplateCatalog::new();
        let features = catalog.templates(Some(TemplateCategory::Features), None);
        let names: Vec<_> = features.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Building Outline", "Driveway & Parking", "Landscape Features"]);

        catalog.use_template("landscape-features");
        let features = catalog.templates(Some(TemplateCategory::Features), None);
        assert_eq!(features[0].id, "landscape-features");

        let found = catalog.templates(None, Some("TREES"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "landscape-features");
    }

    #[test]
    fn test_remove_builtin_refused() {
        let mut catalog = TemplateCatalog::new();
        assert!(matches!(catalog.remove("building-outline"), Err(TemplateError::BuiltIn(_))));
        assert_eq!(catalog.all().len(), 5);

        let id = catalog.add(custom("Mine"));
        assert!(catalog.remove(&id).unwrap());
        assert!(!catalog.remove("unknown").unwrap());
    }

    #[test]
    fn test_popular_and_recent() {
        let mut catalog = TemplateCatalog::new();
        catalog.use_template("building-outline");
        catalog.use_template("building-outline");
        catalog.use_template("driveway-parking");
        let popular = catalog.popular(5);
        assert_eq!(popular.len(), 2);
        assert_eq!(popular[0].id, "building-outline");
        assert_eq!(catalog.recent(1).len(), 1);
    }

    #[test]
    fn test_export_import() {
        let mut catalog = TemplateCatalog::new();
        catalog.add(custom("Mine"));
        let json = catalog.export_json();

        let mut other = TemplateCatalog::new();
        assert!(other.import_json(&json));
        let imported = other.custom_templates();
        assert_eq!(imported.len(), 1);
        assert!(imported[0].id.starts_with("imported-"));
        assert_eq!(imported[0].use_count, 0);

        assert!(!other.import_json("{\"templates\": 3}"));
        assert_eq!(other.all().len(), 6);
    }

    #[test]
    fn test_instantiate_single_snapshot() {
        let catalog = TemplateCatalog::new();
        let mut canvas = Canvas::new(Default::default());
        let before = canvas.history().len();

        let building = catalog.require("building-outline").unwrap();
        let placed = instantiate(building, &mut canvas, Vec2::ZERO);
        assert_eq!(placed.len(), 2);
        assert_eq!(canvas.history().len(), before + 1);
        let rect = &canvas.document().shapes[0];
        assert_eq!(rect.end, Point::new(250.0, 200.0));
        assert_eq!(rect.fill, Some(SerializableColor::from_hex("#e6f3ff")));

        let boundary = catalog.require("property-boundary-basic").unwrap();
        instantiate(boundary, &mut canvas, Vec2::new(10.0, 0.0));
        let line = &canvas.document().paths[0];
        assert_eq!(line.positions(), vec![Point::new(60.0, 70.0), Point::new(260.0, 70.0)]);
        assert!(!line.closed);

        canvas.undo();
        assert!(canvas.document().paths.is_empty());
        assert_eq!(canvas.document().shapes.len(), 1);
    }

    #[test]
    fn test_instantiate_measurements_use_calibration() {
        let catalog = TemplateCatalog::new();
        let mut canvas = Canvas::new(Default::default());
        instantiate(catalog.require("measurement-combo").unwrap(), &mut canvas, Vec2::ZERO);
        let measurements = &canvas.document().measurements;
        assert_eq!(measurements.len(), 2);
        assert!((measurements[0].value - 2.0).abs() < 1e-9);
        assert!((measurements[1].value - 3.0).abs() < 1e-9);
        assert_eq!(measurements[1].points[0], Point::new(150.0, 150.0));
        assert!(matches!(catalog.require("nope"), Err(TemplateError::NotFound(_))));
    }

    #[test]
    fn test_persistence_keeps_only_custom() {
        let storage = MemoryStorage::new();
        let mut catalog = TemplateCatalog::new();
        catalog.add(custom("Mine"));
        pollster::block_on(save_catalog(&storage, &catalog)).unwrap();

        let stored = pollster::block_on(storage.load(TEMPLATES_KEY)).unwrap();
        assert!(!stored.contains("building-outline"));

        let loaded = pollster::block_on(load_catalog(&storage));
        assert_eq!(loaded.all().len(), 6);
    }
}
