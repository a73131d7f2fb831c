//! traitstack renders a family of images from one layered artwork.
//!
//! A manifest lists trait sets (attribute name to trait value). For every entry the matching
//! layers of the source document are made visible and the visible stack is flattened into
//! `<index>.png`.
//!
//! # Pipeline overview
//!
//! 1. **Load**: layer-stack JSON + sources -> [`DocumentTemplate`] (decoded once, immutable)
//! 2. **Instantiate**: [`DocumentTemplate::instantiate`] -> [`LayeredDocument`] (all hidden)
//! 3. **Resolve**: [`apply_trait_set`] reveals the layers one [`TraitSet`] selects
//! 4. **Render**: [`render`] flattens visible layers, [`persist`] writes the PNG
//! 5. **Batch**: [`run`] / [`run_manifest`] drive 2-4 over the manifest from a resume offset
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic**: the same visibility state always flattens to the same bytes.
//! - **No IO in the compositor**: sources are decoded up front by the template.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod batch;
mod document;
mod foundation;
mod render;
mod resolve;

pub use assets::decode::{decode_image, parse_svg, rasterize_svg};
pub use assets::store::{PreparedAssetStore, PreparedImage, PreparedSvg, normalize_rel_path};
pub use batch::driver::{
    BatchConfig, BatchFailure, BatchOptions, BatchReport, BatchThreading, FailurePolicy, run,
    run_manifest,
};
pub use document::model::{DocumentDef, LayerDef};
pub use document::store::{DocumentTemplate, Layer, LayerId, LayeredDocument, LoadOptions};
pub use foundation::core::{Canvas, Rect, Rgba8Premul, Vec2};
pub use foundation::error::{TraitStackError, TraitStackResult};
pub use render::composite::{PremulRgba8, over, over_in_place};
pub use render::compositor::{RenderedImage, render};
pub use render::persist::{output_path, persist};
pub use resolve::manifest::{ID_KEY, NO_TRAITS, TraitManifest, TraitSet};
pub use resolve::visibility::apply_trait_set;
