//! The three fixed composition layers.

use serde::{Deserialize, Serialize};

/// Identifies one of the fixed layers, in draw order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerId {
    /// The imported photograph.
    Background,
    /// Shapes, vector paths, measurements and text.
    PropertyLines,
    /// Logos and arrows.
    Annotations,
}

impl LayerId {
    pub const ALL: [LayerId; 3] = [LayerId::Background, LayerId::PropertyLines, LayerId::Annotations];

    pub fn name(self) -> &'static str {
        match self {
            LayerId::Background => "Background",
            LayerId::PropertyLines => "Property Lines",
            LayerId::Annotations => "Annotations",
        }
    }
}

/// Per-layer display state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub visible: bool,
    /// Opacity in percent.
    pub opacity: f64,
}

impl Layer {
    pub fn new(id: LayerId) -> Self {
        Self {
            id,
            name: id.name().to_string(),
            visible: true,
            opacity: 100.0,
        }
    }
}

/// Ordered set of the fixed layers plus the active one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerStack {
    layers: Vec<Layer>,
    active: LayerId,
}

impl Default for LayerStack {
    fn default() -> Self {
        Self {
            layers: LayerId::ALL.iter().copied().map(Layer::new).collect(),
            active: LayerId::PropertyLines,
        }
    }
}

impl LayerStack {
    /// Layers in draw order (background first).
    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn is_visible(&self, id: LayerId) -> bool {
        self.get(id).is_some_and(|l| l.visible)
    }

    pub fn opacity(&self, id: LayerId) -> f64 {
        self.get(id).map_or(100.0, |l| l.opacity)
    }

    pub fn toggle_visibility(&mut self, id: LayerId) {
        if let Some(layer) = self.layers.iter_mut().find(|l| l.id == id) {
            layer.visible = !layer.visible;
        }
    }

    pub fn set_opacity(&mut self, id: LayerId, opacity: f64) {
        if let Some(layer) = self.layers.iter_mut().find(|l| l.id == id) {
            layer.opacity = opacity.clamp(0.0, 100.0);
        }
    }

    pub fn active(&self) -> LayerId {
        self.active
    }

    pub fn set_active(&mut self, id: LayerId) {
        self.active = id;
    }
}
