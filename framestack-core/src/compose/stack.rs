use image::RgbaImage;

use crate::foundation::{
    core::RasterFrame,
    error::{FramestackError, FramestackResult},
};

/// Largest RGBA8 canvas, in bytes, a single allocation can hold on this
/// platform.
pub const MAX_CANVAS_BYTES: u64 = isize::MAX as u64;

/// Where one frame lands on the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct StripPlacement {
    /// Position of the frame in the sequence.
    pub index: usize,
    /// Top edge; the left edge is always 0.
    pub y: u32,
    /// Native frame width.
    pub width: u32,
    /// Native frame height.
    pub height: u32,
}

/// Canvas geometry for a vertical stack of frames.
///
/// `width` is the widest frame, `height` the sum of all heights, and the
/// strips tile `0..height` in sequence order with no gap and no overlap.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct StackLayout {
    /// Canvas width.
    pub width: u32,
    /// Canvas height.
    pub height: u32,
    /// One entry per frame, in paint order.
    pub strips: Vec<StripPlacement>,
}

impl StackLayout {
    /// Lay out frames of the given `(width, height)` sizes top to bottom.
    ///
    /// Fails for an empty sequence, for a summed height past `u32::MAX`, and
    /// for canvases larger than [`MAX_CANVAS_BYTES`].
    pub fn from_sizes<I>(sizes: I) -> FramestackResult<Self>
    where
        I: IntoIterator<Item = (u32, u32)>,
    {
        Self::from_sizes_within(sizes, MAX_CANVAS_BYTES)
    }

    /// Like [`StackLayout::from_sizes`], but also rejects canvases larger than
    /// `max_bytes` of RGBA8 pixel data.
    pub fn from_sizes_within<I>(sizes: I, max_bytes: u64) -> FramestackResult<Self>
    where
        I: IntoIterator<Item = (u32, u32)>,
    {
        let mut width = 0u32;
        let mut y = 0u32;
        let mut strips = Vec::new();

        for (index, (w, h)) in sizes.into_iter().enumerate() {
            strips.push(StripPlacement {
                index,
                y,
                width: w,
                height: h,
            });
            width = width.max(w);
            y = y.checked_add(h).ok_or_else(|| {
                FramestackError::validation(format!(
                    "stacked height overflows u32 at frame {index}"
                ))
            })?;
        }

        if strips.is_empty() {
            return Err(FramestackError::validation(
                "cannot lay out an empty frame sequence",
            ));
        }

        let limit = max_bytes.min(MAX_CANVAS_BYTES);
        let fits = u64::from(width)
            .checked_mul(u64::from(y))
            .and_then(|px| px.checked_mul(4))
            .is_some_and(|bytes| bytes <= limit);
        if !fits {
            return Err(FramestackError::validation(format!(
                "canvas {width}x{y} is too large (limit {limit} bytes)"
            )));
        }

        Ok(Self {
            width,
            height: y,
            strips,
        })
    }

    /// Lay out a decoded frame sequence within `max_bytes`.
    pub fn for_frames<'a, I>(frames: I, max_bytes: u64) -> FramestackResult<Self>
    where
        I: IntoIterator<Item = &'a RasterFrame>,
    {
        Self::from_sizes_within(
            frames.into_iter().map(|f| (f.width(), f.height())),
            max_bytes,
        )
    }
}

/// Paint `frames` top to bottom onto a fully transparent canvas.
///
/// Each frame is copied at `(0, y)` at its native size with its alpha intact;
/// the part of a strip to the right of a narrower frame stays transparent.
/// The output depends only on the input frames. The canvas is refused before
/// allocation when it would exceed `max_bytes`.
pub fn composite_vertical(
    frames: &[RasterFrame],
    max_bytes: u64,
) -> FramestackResult<RgbaImage> {
    let layout = StackLayout::for_frames(frames, max_bytes)?;
    let mut canvas = RgbaImage::new(layout.width, layout.height);

    for (frame, strip) in frames.iter().zip(&layout.strips) {
        image::imageops::replace(&mut canvas, frame.as_image(), 0, i64::from(strip.y));
    }

    tracing::debug!(
        frames = frames.len(),
        width = layout.width,
        height = layout.height,
        "composited vertical stack"
    );
    Ok(canvas)
}

#[cfg(test)]
#[path = "../../tests/unit/compose/stack.rs"]
mod tests;
