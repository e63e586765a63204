use fast_image_resize::images::Image;
use fast_image_resize::{PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, ImageBuffer, Rgba};
use rayon::prelude::*;

use crate::engine::{DType, TensorDesc};
use crate::error::ClassifyError;

/// Spatial layout of an NHWC input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputLayout {
    pub height: u32,
    pub width: u32,
    pub channels: usize,
}

impl InputLayout {
    /// Reads height, width and channels from a `[1, H, W, 3]` descriptor.
    pub fn from_desc(desc: &TensorDesc) -> Result<Self, ClassifyError> {
        let shape = &desc.shape;
        let &[1, height, width, channels] = shape.0.as_slice() else {
            return Err(ClassifyError::InvalidTensorShape(format!(
                "expected input shape [1, H, W, C], got {:?}",
                shape.0
            )));
        };
        if channels != 3 {
            return Err(ClassifyError::InvalidTensorShape(format!(
                "expected 3 input channels, got {}",
                channels
            )));
        }
        let to_u32 = |v: usize| {
            u32::try_from(v)
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(|| ClassifyError::InvalidTensorShape(format!("bad dimension {}", v)))
        };
        Ok(Self {
            height: to_u32(height)?,
            width: to_u32(width)?,
            channels,
        })
    }

    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * self.channels
    }
}

/// Decodes any image format the `image` crate recognizes.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, ClassifyError> {
    image::load_from_memory(bytes).map_err(|e| ClassifyError::Decode(e.to_string()))
}

/// 16-bit RGBA pixels, the sample depth of the color model.
pub type Rgba16Image = ImageBuffer<Rgba<u16>, Vec<u16>>;

/// Maps a 16-bit channel to the model's input byte.
///
/// The channel is alpha-premultiplied, then divided by 255 and truncated to
/// a byte, wrapping on overflow. This keeps the existing deployment's input
/// encoding, which collapses most of the channel range.
pub fn quantize_channel(value: u16, alpha: u16) -> u8 {
    let c16 = u64::from(value) * u64::from(alpha) / 0xffff;
    (c16 as f64 / 255.0) as u32 as u8
}

#[derive(Debug)]
pub struct Processor {
    pub layout: InputLayout,
}

impl Processor {
    pub fn new(layout: InputLayout) -> Self {
        Self { layout }
    }

    pub fn from_desc(desc: &TensorDesc) -> Result<Self, ClassifyError> {
        InputLayout::from_desc(desc).map(Self::new)
    }

    /// Nearest-neighbor resize to exactly the model's width x height.
    /// 8-bit sources are widened to 16 bits (`c * 257`) first.
    pub fn resize(&self, image: &DynamicImage) -> Result<Rgba16Image, ClassifyError> {
        let (width, height) = (self.layout.width, self.layout.height);
        let src = DynamicImage::ImageRgba16(image.to_rgba16());
        let mut dst_image = Image::new(width, height, PixelType::U16x4);

        let resize_options = ResizeOptions::new()
            .resize_alg(ResizeAlg::Nearest)
            .use_alpha(false);
        let mut resizer = Resizer::new();
        resizer
            .resize(&src, &mut dst_image, Some(&resize_options))
            .map_err(|e| ClassifyError::Decode(format!("resize failed: {}", e)))?;

        let samples: Vec<u16> = dst_image
            .buffer()
            .chunks_exact(2)
            .map(|b| u16::from_ne_bytes([b[0], b[1]]))
            .collect();
        Rgba16Image::from_raw(width, height, samples)
            .ok_or_else(|| ClassifyError::Decode("resized buffer has wrong size".into()))
    }

    /// Packs RGB (alpha dropped) row-major, 3 bytes per pixel.
    pub fn quantize(&self, resized: &Rgba16Image) -> Vec<u8> {
        let width = resized.width() as usize;
        let row_len = width * 3;
        let mut buf = vec![0u8; row_len * resized.height() as usize];

        buf.par_chunks_mut(row_len).enumerate().for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(3).enumerate() {
                let [r, g, b, a] = resized.get_pixel(x as u32, y as u32).0;
                px[0] = quantize_channel(r, a);
                px[1] = quantize_channel(g, a);
                px[2] = quantize_channel(b, a);
            }
        });
        buf
    }

    /// Resizes and encodes `image` into the bytes of an input tensor of `dtype`.
    pub fn preprocess(&self, image: &DynamicImage, dtype: &DType) -> Result<Vec<u8>, ClassifyError> {
        let t = std::time::Instant::now();
        let resized = self.resize(image)?;
        tracing::trace!(elapsed = ?t.elapsed(), "[preprocessing - resize]");

        match dtype {
            DType::U8 => {
                let t = std::time::Instant::now();
                let buf = self.quantize(&resized);
                tracing::trace!(elapsed = ?t.elapsed(), "[preprocessing - quantize]");
                Ok(buf)
            }
            other => Err(ClassifyError::UnsupportedTensorType(other.clone())),
        }
    }
}
