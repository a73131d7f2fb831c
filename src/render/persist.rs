use std::path::{Path, PathBuf};

use crate::{
    foundation::error::{TraitStackError, TraitStackResult},
    render::compositor::RenderedImage,
};

/// Path of the output image for manifest entry `index`: `<out_dir>/<index>.png`.
pub fn output_path(out_dir: &Path, index: usize) -> PathBuf {
    out_dir.join(format!("{index}.png"))
}

/// Write `image` as `<out_dir>/<index>.png`, replacing any existing file.
///
/// The PNG is encoded into a sibling `.tmp` file and renamed into place, so an interrupted write
/// never leaves a truncated image under the final name.
pub fn persist(image: &RenderedImage, out_dir: &Path, index: usize) -> TraitStackResult<PathBuf> {
    let path = output_path(out_dir, index);
    let tmp = out_dir.join(format!("{index}.png.tmp"));

    let straight = image.to_straight_rgba8();
    let written = image::save_buffer_with_format(
        &tmp,
        &straight,
        image.width,
        image.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    );
    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp);
        return Err(match e {
            image::ImageError::IoError(source) => TraitStackError::io(&path, source),
            other => TraitStackError::render(format!("encode png '{}': {other}", path.display())),
        });
    }

    if let Err(source) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(TraitStackError::io(&path, source));
    }
    Ok(path)
}

#[cfg(test)]
#[path = "../../tests/unit/render/persist.rs"]
mod tests;
