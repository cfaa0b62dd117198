//! External collaborators that move images in and out of a pipeline.
//!
//! A source is read once before the graph is built and its buffer handed to
//! an [`ImageSourceNode`](crate::filters::ImageSourceNode). A sink receives a
//! finished output buffer together with the region to consume.

pub mod image_file;
pub mod raw;

use crate::core::buffer::ImageBuffer;
use crate::core::error::{PipelineError, PipelineResult};
use crate::core::pixel::Pixel;
use crate::core::region::Region;

pub use image_file::{ImageFileReader, ImageFileWriter};
pub use raw::{RawVolumeReader, RawVolumeWriter};

/// Produces an initial image buffer from an external resource.
pub trait ImageSource<P: Pixel, const D: usize> {
    /// Read the whole image. Its buffered region becomes the largest
    /// possible region of the pipeline that consumes it.
    fn read(&mut self) -> PipelineResult<ImageBuffer<P, D>>;
}

/// Consumes the samples of a finished buffer within a region.
pub trait ImageSink<P: Pixel, const D: usize> {
    /// Write `region` of `image`. The region must be buffered.
    fn write(&mut self, image: &ImageBuffer<P, D>, region: &Region<D>) -> PipelineResult<()>;
}

/// Serves a buffer held in memory.
#[derive(Debug, Clone)]
pub struct MemoryImageSource<P: Pixel, const D: usize> {
    image: ImageBuffer<P, D>,
}

impl<P: Pixel, const D: usize> MemoryImageSource<P, D> {
    pub fn new(image: ImageBuffer<P, D>) -> Self {
        Self { image }
    }
}

impl<P: Pixel, const D: usize> ImageSource<P, D> for MemoryImageSource<P, D> {
    fn read(&mut self) -> PipelineResult<ImageBuffer<P, D>> {
        Ok(self.image.clone())
    }
}

/// Collects written regions in memory.
#[derive(Debug, Clone)]
pub struct MemoryImageSink<P: Pixel, const D: usize> {
    /// Every write so far: the region and its samples in memory order.
    pub written: Vec<(Region<D>, Vec<P>)>,
}

impl<P: Pixel, const D: usize> MemoryImageSink<P, D> {
    pub fn new() -> Self {
        Self { written: Vec::new() }
    }
}

impl<P: Pixel, const D: usize> Default for MemoryImageSink<P, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Pixel, const D: usize> ImageSink<P, D> for MemoryImageSink<P, D> {
    fn write(&mut self, image: &ImageBuffer<P, D>, region: &Region<D>) -> PipelineResult<()> {
        let samples = samples_in(image, region)?;
        self.written.push((*region, samples));
        Ok(())
    }
}

/// Samples of `region` in memory order. Fails unless the region is buffered.
pub(crate) fn samples_in<P: Pixel, const D: usize>(
    image: &ImageBuffer<P, D>,
    region: &Region<D>,
) -> PipelineResult<Vec<P>> {
    if !region.is_subset_of(image.buffered_region()) {
        return Err(PipelineError::parameter(
            "region",
            format!(
                "{} is not inside the buffered region {}",
                region,
                image.buffered_region()
            ),
        ));
    }
    Ok(image.pixels_in(region).map(|(_, value)| value).collect())
}
