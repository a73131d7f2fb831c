use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    assets::decode::{decode_image, parse_svg, rasterize_svg},
    foundation::core::Rgba8Premul,
    foundation::error::{TraitStackError, TraitStackResult},
};

#[derive(Clone, Debug)]
/// Prepared raster image in premultiplied RGBA8 form.
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl PreparedImage {
    /// Build a `width x height` image filled with one premultiplied color.
    pub fn solid(width: u32, height: u32, color: Rgba8Premul) -> Self {
        let px = color.to_array();
        let len = (width as usize) * (height as usize);
        Self {
            width,
            height,
            rgba8_premul: Arc::new(px.repeat(len)),
        }
    }
}

#[derive(Clone, Debug)]
/// Prepared SVG asset represented as a parsed `usvg` tree.
pub struct PreparedSvg {
    /// Parsed SVG tree.
    pub tree: Arc<usvg::Tree>,
}

/// Normalize and validate document-relative asset paths.
///
/// The normalized result uses `/` separators, removes `.` segments, and rejects absolute paths or
/// parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> TraitStackResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(TraitStackError::validation("asset paths must be relative"));
    }
    if s.is_empty() {
        return Err(TraitStackError::validation("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(TraitStackError::validation(
                "asset paths must not contain '..'",
            ));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(TraitStackError::validation(
            "asset path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

/// Loads layer sources relative to a document root, decoding each distinct path once.
///
/// All IO happens here; the compositor only ever sees decoded [`PreparedImage`]s.
#[derive(Debug)]
pub struct PreparedAssetStore {
    root: PathBuf,
    images: HashMap<String, PreparedImage>,
}

impl PreparedAssetStore {
    /// Create an empty store resolving paths against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            images: HashMap::new(),
        }
    }

    /// Number of distinct decoded sources.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Return `true` when nothing has been decoded yet.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Load (or fetch from cache) the raster for a document-relative `source`.
    ///
    /// `.svg` sources are rasterized at their intrinsic size; everything else goes through the
    /// `image` decoders.
    pub fn load(&mut self, source: &str) -> TraitStackResult<PreparedImage> {
        let key = normalize_rel_path(source).map_err(|e| {
            TraitStackError::document_load(format!("invalid layer source '{source}': {e}"))
        })?;
        if let Some(img) = self.images.get(&key) {
            return Ok(img.clone());
        }

        let path = self.root.join(&key);
        let bytes = std::fs::read(&path).map_err(|e| {
            TraitStackError::document_load(format!("read layer source '{}': {e}", path.display()))
        })?;

        let is_svg = Path::new(&key)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
        let decoded = if is_svg {
            parse_svg(&bytes).and_then(|svg| rasterize_svg(&svg))
        } else {
            decode_image(&bytes)
        };
        let img = decoded.map_err(|e| {
            TraitStackError::document_load(format!("decode layer source '{key}': {e}"))
        })?;

        tracing::debug!(source = %key, width = img.width, height = img.height, "decoded layer source");
        self.images.insert(key, img.clone());
        Ok(img)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/store.rs"]
mod tests;
