use crate::{
    assets::decode::unpremultiply_rgba8_in_place,
    document::store::{LayerId, LayerPaint, LayeredDocument},
    foundation::core::{Canvas, Rect},
    foundation::error::{TraitStackError, TraitStackResult},
    render::composite::over_in_place,
};

/// A flattened document as premultiplied RGBA8 pixels at canvas size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedImage {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
}

impl RenderedImage {
    /// Copy of the pixels converted to straight alpha, as expected by PNG encoders.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        unpremultiply_rgba8_in_place(&mut out);
        out
    }

    /// Straight-alpha pixel at `(x, y)`, or `None` when out of bounds.
    pub fn straight_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let mut px = [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ];
        unpremultiply_rgba8_in_place(&mut px);
        Some(px)
    }
}

/// Flatten every visible layer of `doc` into one image.
///
/// Every call recomputes the whole canvas from a transparent clear: siblings paint bottom-to-top,
/// and a layer only contributes when it and all of its ancestors are visible. There is no cached
/// extent from an earlier render that could go stale after visibility changes.
#[tracing::instrument(skip_all)]
pub fn render(doc: &LayeredDocument) -> TraitStackResult<RenderedImage> {
    let canvas = doc.canvas();
    let mut data = vec![0u8; canvas.rgba8_len()?];
    let mut painted = 0usize;

    let mut stack: Vec<LayerId> = doc.roots().iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
        let layer = doc.layer(id);
        if !layer.visible {
            continue;
        }
        if let Some(children) = layer.children {
            stack.extend(children.iter().rev().copied());
            continue;
        }
        if let Some(paint) = doc.paint(id) {
            blit(&mut data, canvas, paint)?;
            painted += 1;
        }
    }

    tracing::debug!(painted, "flattened document");
    Ok(RenderedImage {
        width: canvas.width,
        height: canvas.height,
        data,
    })
}

fn blit(dst: &mut [u8], canvas: Canvas, paint: &LayerPaint) -> TraitStackResult<()> {
    let img = &paint.image;
    let expected = (img.width as usize) * (img.height as usize) * 4;
    if img.rgba8_premul.len() != expected {
        return Err(TraitStackError::render(format!(
            "layer raster is {} bytes, expected {expected} for {}x{}",
            img.rgba8_premul.len(),
            img.width,
            img.height
        )));
    }

    let placed = Rect::new(
        paint.x as f64,
        paint.y as f64,
        paint.x as f64 + f64::from(img.width),
        paint.y as f64 + f64::from(img.height),
    );
    let visible = placed.intersect(canvas.rect());
    if visible.is_zero_area() {
        return Ok(());
    }

    // Offsets are whole pixels, so the intersection has integral edges.
    let (x0, y0) = (visible.x0 as usize, visible.y0 as usize);
    let (x1, y1) = (visible.x1 as usize, visible.y1 as usize);
    let src_x0 = (x0 as i64 - paint.x) as usize;
    let row_len = (x1 - x0) * 4;
    let canvas_stride = canvas.width as usize * 4;
    let src_stride = img.width as usize * 4;

    for y in y0..y1 {
        let src_y = (y as i64 - paint.y) as usize;
        let d = y * canvas_stride + x0 * 4;
        let s = src_y * src_stride + src_x0 * 4;
        over_in_place(
            &mut dst[d..d + row_len],
            &img.rgba8_premul[s..s + row_len],
            paint.opacity,
        )?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
