use std::{
    collections::HashSet,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    assets::store::{PreparedAssetStore, PreparedImage},
    document::model::{DocumentDef, LayerDef},
    foundation::core::{Canvas, Rgba8Premul},
    foundation::error::{TraitStackError, TraitStackResult},
};

/// Stable handle to one layer inside a document tree.
///
/// Ids are only meaningful for documents instantiated from the same [`DocumentTemplate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(pub(crate) usize);

impl LayerId {
    /// Position of this layer in pre-order traversal of the document.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Options applied while loading a document.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    /// Reject duplicate layer names within one sibling scope instead of resolving them
    /// first-match at lookup time.
    pub strict_names: bool,
}

/// Decoded pixels of a leaf layer plus its placement.
#[derive(Clone, Debug)]
pub(crate) struct LayerPaint {
    pub(crate) image: PreparedImage,
    pub(crate) x: i64,
    pub(crate) y: i64,
    pub(crate) opacity: f32,
}

#[derive(Debug)]
struct TemplateNode {
    name: String,
    paint: Option<LayerPaint>,
    children: Option<Vec<LayerId>>,
}

#[derive(Debug)]
struct TemplateInner {
    canvas: Canvas,
    nodes: Vec<TemplateNode>,
    roots: Vec<LayerId>,
    source_path: Option<PathBuf>,
}

/// Parsed, validated, and decoded layer tree.
///
/// A template is immutable and cheap to clone. It carries no visibility state; every call to
/// [`DocumentTemplate::instantiate`] yields an independent [`LayeredDocument`] with every layer
/// hidden.
#[derive(Clone, Debug)]
pub struct DocumentTemplate {
    inner: Arc<TemplateInner>,
}

impl DocumentTemplate {
    /// Load a layer-stack JSON file. Layer sources resolve relative to the file's directory.
    pub fn open(path: impl AsRef<Path>, opts: &LoadOptions) -> TraitStackResult<Self> {
        Self::open_path(path.as_ref(), opts)
    }

    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    fn open_path(path: &Path, opts: &LoadOptions) -> TraitStackResult<Self> {
        let f = File::open(path).map_err(|e| {
            TraitStackError::document_load(format!("open document '{}': {e}", path.display()))
        })?;
        let def: DocumentDef = serde_json::from_reader(BufReader::new(f)).map_err(|e| {
            TraitStackError::document_load(format!("parse document '{}': {e}", path.display()))
        })?;

        let root = path.parent().unwrap_or_else(|| Path::new("."));
        let template = Self::build(&def, root, opts, Some(path.to_path_buf()))?;
        tracing::info!(
            layers = template.layer_count(),
            width = template.canvas().width,
            height = template.canvas().height,
            "loaded document"
        );
        Ok(template)
    }

    /// Validate and prepare an in-memory definition, resolving sources against `assets_root`.
    pub fn from_def(
        def: &DocumentDef,
        assets_root: impl Into<PathBuf>,
        opts: &LoadOptions,
    ) -> TraitStackResult<Self> {
        Self::build(def, assets_root, opts, None)
    }

    fn build(
        def: &DocumentDef,
        assets_root: impl Into<PathBuf>,
        opts: &LoadOptions,
        source_path: Option<PathBuf>,
    ) -> TraitStackResult<Self> {
        def.canvas
            .validate()
            .map_err(|e| TraitStackError::document_load(e.to_string()))?;

        let mut builder = TemplateBuilder {
            canvas: def.canvas,
            assets: PreparedAssetStore::new(assets_root),
            nodes: Vec::new(),
            strict_names: opts.strict_names,
        };
        let roots = builder.add_siblings(&def.layers, "document root")?;

        Ok(Self {
            inner: Arc::new(TemplateInner {
                canvas: def.canvas,
                nodes: builder.nodes,
                roots,
                source_path,
            }),
        })
    }

    /// Create a fresh document with every layer hidden.
    pub fn instantiate(&self) -> LayeredDocument {
        LayeredDocument {
            template: Arc::clone(&self.inner),
            visible: vec![false; self.inner.nodes.len()],
        }
    }

    /// Output canvas size.
    pub fn canvas(&self) -> Canvas {
        self.inner.canvas
    }

    /// Total number of layers (groups included).
    pub fn layer_count(&self) -> usize {
        self.inner.nodes.len()
    }

    /// File this template was loaded from, when loaded via [`DocumentTemplate::open`].
    pub fn source_path(&self) -> Option<&Path> {
        self.inner.source_path.as_deref()
    }
}

struct TemplateBuilder {
    canvas: Canvas,
    assets: PreparedAssetStore,
    nodes: Vec<TemplateNode>,
    strict_names: bool,
}

impl TemplateBuilder {
    fn add_siblings(&mut self, defs: &[LayerDef], scope: &str) -> TraitStackResult<Vec<LayerId>> {
        if self.strict_names {
            let mut seen = HashSet::new();
            for def in defs {
                if !seen.insert(def.name.as_str()) {
                    return Err(TraitStackError::document_load(format!(
                        "duplicate layer name '{}' in {scope}",
                        def.name
                    )));
                }
            }
        }
        defs.iter().map(|def| self.add_layer(def, scope)).collect()
    }

    fn add_layer(&mut self, def: &LayerDef, scope: &str) -> TraitStackResult<LayerId> {
        let invalid = |msg: &str| {
            TraitStackError::document_load(format!("layer '{}' in {scope}: {msg}", def.name))
        };

        if !def.opacity.is_finite() || !(0.0..=1.0).contains(&def.opacity) {
            return Err(invalid("opacity must be finite and within [0, 1]"));
        }
        if !def.offset.is_finite() {
            return Err(invalid("offset must be finite"));
        }

        // Reserve the slot first so ids follow pre-order.
        let id = LayerId(self.nodes.len());
        self.nodes.push(TemplateNode {
            name: def.name.clone(),
            paint: None,
            children: None,
        });

        if let Some(children) = &def.children {
            if def.source.is_some() || def.fill.is_some() {
                return Err(invalid("a group must not carry 'source' or 'fill'"));
            }
            let child_scope = format!("group '{}'", def.name);
            let child_ids = self.add_siblings(children, &child_scope)?;
            self.nodes[id.0].children = Some(child_ids);
            return Ok(id);
        }

        let image = match (&def.source, def.fill) {
            (Some(source), None) => self.assets.load(source)?,
            (None, Some([r, g, b, a])) => PreparedImage::solid(
                self.canvas.width,
                self.canvas.height,
                Rgba8Premul::from_straight_rgba(r, g, b, a),
            ),
            (Some(_), Some(_)) => {
                return Err(invalid("a leaf must carry exactly one of 'source' or 'fill'"));
            }
            (None, None) => {
                return Err(invalid("a leaf must carry 'source' or 'fill'"));
            }
        };

        self.nodes[id.0].paint = Some(LayerPaint {
            image,
            x: def.offset.x.round() as i64,
            y: def.offset.y.round() as i64,
            opacity: def.opacity,
        });
        Ok(id)
    }
}

/// Read-only view of one layer of a [`LayeredDocument`].
#[derive(Clone, Copy, Debug)]
pub struct Layer<'a> {
    /// Handle of this layer.
    pub id: LayerId,
    /// Layer name.
    pub name: &'a str,
    /// Direct children; `None` for leaves.
    pub children: Option<&'a [LayerId]>,
    /// Current visibility flag.
    pub visible: bool,
}

impl Layer<'_> {
    /// `true` when this layer is a group.
    pub fn is_group(&self) -> bool {
        self.children.is_some()
    }
}

/// One mutable instance of a layered document.
///
/// The tree structure and pixels are shared with its [`DocumentTemplate`]; the visibility flags
/// are owned exclusively by this instance.
#[derive(Clone, Debug)]
pub struct LayeredDocument {
    template: Arc<TemplateInner>,
    visible: Vec<bool>,
}

impl LayeredDocument {
    /// Load a document from disk and instantiate it with default options.
    pub fn open(path: impl AsRef<Path>) -> TraitStackResult<Self> {
        Ok(DocumentTemplate::open(path, &LoadOptions::default())?.instantiate())
    }

    /// Output canvas size.
    pub fn canvas(&self) -> Canvas {
        self.template.canvas
    }

    /// Top-level layers, bottom-to-top.
    pub fn roots(&self) -> &[LayerId] {
        &self.template.roots
    }

    /// View of layer `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this document's template.
    pub fn layer(&self, id: LayerId) -> Layer<'_> {
        let node = &self.template.nodes[id.0];
        Layer {
            id,
            name: &node.name,
            children: node.children.as_deref(),
            visible: self.visible[id.0],
        }
    }

    /// Find a layer by exact name among the document's top-level layers, or among the direct
    /// children of `within_group` when given. The first match wins.
    pub fn find_layer(
        &self,
        name: &str,
        within_group: Option<LayerId>,
    ) -> TraitStackResult<LayerId> {
        let (candidates, scope): (&[LayerId], String) = match within_group {
            None => (self.template.roots.as_slice(), "document root".to_string()),
            Some(group) => {
                let node = &self.template.nodes[group.0];
                match node.children.as_deref() {
                    Some(children) => (children, format!("group '{}'", node.name)),
                    None => {
                        return Err(TraitStackError::layer_not_found(
                            name,
                            format!("leaf layer '{}' (not a group)", node.name),
                        ));
                    }
                }
            }
        };

        candidates
            .iter()
            .copied()
            .find(|id| self.template.nodes[id.0].name == name)
            .ok_or_else(|| TraitStackError::layer_not_found(name, scope))
    }

    /// Set the visibility flag of a single layer. Children are not affected.
    pub fn set_visible(&mut self, id: LayerId, visible: bool) {
        self.visible[id.0] = visible;
    }

    /// Current visibility flag of `id`.
    pub fn is_visible(&self, id: LayerId) -> bool {
        self.visible[id.0]
    }

    /// Names of all visible layers in pre-order (groups before their children).
    pub fn visible_layers(&self) -> Vec<&str> {
        self.template
            .nodes
            .iter()
            .zip(&self.visible)
            .filter(|(_, visible)| **visible)
            .map(|(node, _)| node.name.as_str())
            .collect()
    }

    pub(crate) fn paint(&self, id: LayerId) -> Option<&LayerPaint> {
        self.template.nodes[id.0].paint.as_ref()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/document/store.rs"]
mod tests;
