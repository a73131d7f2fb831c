use crate::foundation::core::{Canvas, Vec2};

/// JSON boundary representation of a layered document.
///
/// This is the human-edited layer stack: a canvas plus a tree of layers listed bottom-to-top.
/// It is validated and prepared into a [`crate::DocumentTemplate`] before any rendering.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentDef {
    /// Output canvas size.
    pub canvas: Canvas,
    /// Top-level layers, bottom-to-top.
    #[serde(default)]
    pub layers: Vec<LayerDef>,
}

/// One node of the layer tree.
///
/// A node with `children` is a group; otherwise it is a leaf that paints either `source` or
/// `fill`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerDef {
    /// Layer name used for trait lookup.
    pub name: String,
    /// Image or SVG path, relative to the document file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Solid straight-alpha RGBA8 fill covering the canvas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<[u8; 4]>,
    /// Top-left placement in canvas pixels.
    #[serde(default, skip_serializing_if = "is_zero_offset")]
    pub offset: Vec2,
    /// Layer opacity in `[0, 1]`.
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    /// Child layers, bottom-to-top. Present iff this layer is a group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<LayerDef>>,
}

impl LayerDef {
    /// Leaf layer painting an image file.
    pub fn image(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::bare(name)
        }
    }

    /// Leaf layer painting a solid straight-alpha color over the whole canvas.
    pub fn fill(name: impl Into<String>, rgba: [u8; 4]) -> Self {
        Self {
            fill: Some(rgba),
            ..Self::bare(name)
        }
    }

    /// Group layer.
    pub fn group(name: impl Into<String>, children: Vec<LayerDef>) -> Self {
        Self {
            children: Some(children),
            ..Self::bare(name)
        }
    }

    /// Return a copy placed at `offset`.
    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    /// Return a copy with `opacity`.
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    /// `true` when this definition describes a group.
    pub fn is_group(&self) -> bool {
        self.children.is_some()
    }

    fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
            fill: None,
            offset: Vec2::ZERO,
            opacity: 1.0,
            children: None,
        }
    }
}

fn default_opacity() -> f32 {
    1.0
}

fn is_zero_offset(v: &Vec2) -> bool {
    *v == Vec2::ZERO
}
