//! Grayscale 2-D image files (PNG, TIFF) through the `image` crate.
//!
//! Samples are exchanged in normalized intensity: black is 0 and white is
//! the pixel type's [`Pixel::DISPLAY_MAX`]. One-byte pixel types are written
//! as 8-bit files, everything else as 16-bit.

use crate::core::buffer::{ImageBuffer, ImageInformation};
use crate::core::error::{PipelineError, PipelineResult};
use crate::core::pixel::Pixel;
use crate::core::region::Region;
use crate::io::{samples_in, ImageSink, ImageSource};
use image::{GrayImage, Luma};
use log::debug;
use std::path::{Path, PathBuf};

/// Reads a 2-D image file as grayscale.
#[derive(Debug, Clone)]
pub struct ImageFileReader {
    path: PathBuf,
    spacing: [f64; 2],
}

impl ImageFileReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            spacing: [1.0, 1.0],
        }
    }

    /// Physical spacing to attach to the image (files carry none).
    pub fn with_spacing(mut self, spacing: [f64; 2]) -> Self {
        self.spacing = spacing;
        self
    }
}

impl<P: Pixel> ImageSource<P, 2> for ImageFileReader {
    fn read(&mut self) -> PipelineResult<ImageBuffer<P, 2>> {
        let decoded = image::open(&self.path)?.to_luma32f();
        let (width, height) = decoded.dimensions();
        debug!("read {} ({}x{})", self.path.display(), width, height);

        let samples = decoded
            .pixels()
            .map(|Luma([v])| P::from_f64(f64::from(*v) * P::DISPLAY_MAX))
            .collect();
        let information = ImageInformation::new(Region::from_size([width as usize, height as usize]))
            .with_spacing(self.spacing);
        ImageBuffer::from_vec(information, samples)
    }
}

/// Writes a region of a 2-D buffer as a grayscale image file.
///
/// The format follows the file extension.
#[derive(Debug, Clone)]
pub struct ImageFileWriter {
    path: PathBuf,
}

impl ImageFileWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl<P: Pixel> ImageSink<P, 2> for ImageFileWriter {
    fn write(&mut self, image: &ImageBuffer<P, 2>, region: &Region<2>) -> PipelineResult<()> {
        let samples = samples_in(image, region)?;
        let [width, height] = region.size();
        let width = u32::try_from(width).map_err(|_| too_large(region))?;
        let height = u32::try_from(height).map_err(|_| too_large(region))?;

        let normalized = samples
            .iter()
            .map(|v| (v.to_f64() / P::DISPLAY_MAX).clamp(0.0, 1.0));

        if std::mem::size_of::<P>() == 1 {
            let data: Vec<u8> = normalized.map(|v| (v * 255.0).round() as u8).collect();
            let file = GrayImage::from_raw(width, height, data).ok_or_else(|| too_large(region))?;
            file.save(&self.path)?;
        } else {
            let data: Vec<u16> = normalized.map(|v| (v * 65535.0).round() as u16).collect();
            let file = image::ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(width, height, data)
                .ok_or_else(|| too_large(region))?;
            file.save(&self.path)?;
        }
        debug!("wrote {} ({}x{})", self.path.display(), width, height);
        Ok(())
    }
}

fn too_large(region: &Region<2>) -> PipelineError {
    PipelineError::parameter("region", format!("{} cannot be stored in an image file", region))
}
