use std::{fs::File, io::BufReader, path::Path};

use anyhow::Context as _;
use image::{AnimationDecoder, ImageEncoder, ImageFormat, RgbaImage, codecs::gif::GifDecoder};

use crate::foundation::{
    core::{ImageKind, InputFile, RasterFrame},
    error::{FramestackError, FramestackResult},
};

/// Decode/encode collaborator used by the pipeline.
///
/// Implementations must release any file handle before returning, on success
/// and on error.
pub trait ImageCodec {
    /// Decode a still image into exactly one frame.
    fn decode_still(&self, path: &Path) -> FramestackResult<RasterFrame>;

    /// Decode every frame of an animation, in stored order.
    fn decode_animation(&self, path: &Path) -> FramestackResult<Vec<RasterFrame>>;

    /// Number of frames stored in an animation.
    fn frame_count(&self, path: &Path) -> FramestackResult<usize> {
        Ok(self.decode_animation(path)?.len())
    }

    /// Encode a canvas as PNG bytes.
    fn encode_png(&self, canvas: &RgbaImage) -> FramestackResult<Vec<u8>>;

    /// Decode `file` according to its kind.
    fn decode(&self, file: &InputFile) -> FramestackResult<Vec<RasterFrame>> {
        match file.kind() {
            ImageKind::Png => Ok(vec![self.decode_still(file.path())?]),
            ImageKind::Gif => self.decode_animation(file.path()),
        }
    }
}

/// [`ImageCodec`] backed by the `image` crate.
///
/// Stateless: each call opens its own buffered reader, dropped on return.
/// Animated frames come out fully composited at the GIF's logical screen
/// size, with frame disposal already applied.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultCodec;

impl DefaultCodec {
    fn open(path: &Path) -> FramestackResult<BufReader<File>> {
        let f = File::open(path).map_err(|e| FramestackError::decode(path, e))?;
        Ok(BufReader::new(f))
    }

    fn gif_decoder(path: &Path) -> FramestackResult<GifDecoder<BufReader<File>>> {
        GifDecoder::new(Self::open(path)?).map_err(|e| FramestackError::decode(path, e))
    }
}

impl ImageCodec for DefaultCodec {
    fn decode_still(&self, path: &Path) -> FramestackResult<RasterFrame> {
        let img = image::ImageReader::with_format(Self::open(path)?, ImageFormat::Png)
            .decode()
            .map_err(|e| FramestackError::decode(path, e))?;
        Ok(RasterFrame::new(img.into_rgba8()))
    }

    fn decode_animation(&self, path: &Path) -> FramestackResult<Vec<RasterFrame>> {
        let frames = Self::gif_decoder(path)?
            .into_frames()
            .collect_frames()
            .map_err(|e| FramestackError::decode(path, e))?;
        Ok(frames
            .into_iter()
            .map(|f| RasterFrame::new(f.into_buffer()))
            .collect())
    }

    fn frame_count(&self, path: &Path) -> FramestackResult<usize> {
        Self::gif_decoder(path)?
            .into_frames()
            .try_fold(0usize, |n, frame| frame.map(|_| n + 1))
            .map_err(|e| FramestackError::decode(path, e))
    }

    fn encode_png(&self, canvas: &RgbaImage) -> FramestackResult<Vec<u8>> {
        let mut buf = Vec::new();
        image::codecs::png::PngEncoder::new(&mut buf)
            .write_image(
                canvas.as_raw(),
                canvas.width(),
                canvas.height(),
                image::ExtendedColorType::Rgba8,
            )
            .context("encode png")?;
        Ok(buf)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/codec/image_codec.rs"]
mod tests;
