//! Headerless N-D volumes stored as native-endian sample arrays.
//!
//! The file holds exactly `number_of_pixels * size_of::<P>()` bytes in
//! memory order (axis 0 fastest). Size and spacing are supplied by the
//! caller.

use crate::core::buffer::{ImageBuffer, ImageInformation};
use crate::core::error::{PipelineError, PipelineResult};
use crate::core::pixel::Pixel;
use crate::core::region::{Region, Size};
use crate::io::{samples_in, ImageSink, ImageSource};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads a raw volume of known size.
#[derive(Debug, Clone)]
pub struct RawVolumeReader<const D: usize> {
    path: PathBuf,
    size: Size<D>,
    spacing: [f64; D],
}

impl<const D: usize> RawVolumeReader<D> {
    pub fn new(path: impl AsRef<Path>, size: Size<D>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            size,
            spacing: [1.0; D],
        }
    }

    pub fn with_spacing(mut self, spacing: [f64; D]) -> Self {
        self.spacing = spacing;
        self
    }
}

impl<P: Pixel, const D: usize> ImageSource<P, D> for RawVolumeReader<D> {
    fn read(&mut self) -> PipelineResult<ImageBuffer<P, D>> {
        let bytes = fs::read(&self.path)?;
        let region = Region::from_size(self.size);
        let expected = region.number_of_pixels().saturating_mul(std::mem::size_of::<P>());
        if bytes.len() != expected {
            return Err(PipelineError::Config(format!(
                "{}: expected {} bytes for {:?} {} samples, found {}",
                self.path.display(),
                expected,
                self.size,
                P::NAME,
                bytes.len()
            )));
        }
        debug!("read raw volume {} ({:?} {})", self.path.display(), self.size, P::NAME);

        let samples: Vec<P> = bytemuck::pod_collect_to_vec(&bytes);
        ImageBuffer::from_vec(ImageInformation::new(region).with_spacing(self.spacing), samples)
    }
}

/// Writes a region of a buffer as a raw volume.
#[derive(Debug, Clone)]
pub struct RawVolumeWriter {
    path: PathBuf,
}

impl RawVolumeWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl<P: Pixel, const D: usize> ImageSink<P, D> for RawVolumeWriter {
    fn write(&mut self, image: &ImageBuffer<P, D>, region: &Region<D>) -> PipelineResult<()> {
        let bytes = if region == image.buffered_region() {
            image.as_bytes().to_vec()
        } else {
            bytemuck::cast_slice(&samples_in(image, region)?).to_vec()
        };
        fs::write(&self.path, bytes)?;
        debug!("wrote raw volume {} {}", self.path.display(), region);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_volume_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("volume.raw");
        let image = ImageBuffer::<i16, 3>::from_fn(
            ImageInformation::new(Region::from_size([4, 3, 2])),
            |index| (index[0] - 10 * index[1] + 100 * index[2]) as i16,
        );

        RawVolumeWriter::new(&path)
            .write(&image, image.buffered_region())
            .unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 24 * 2);

        let read: ImageBuffer<i16, 3> = RawVolumeReader::new(&path, [4, 3, 2])
            .with_spacing([1.0, 1.0, 2.5])
            .read()
            .unwrap();
        assert_eq!(read.as_slice(), image.as_slice());
        assert_eq!(read.information().spacing, [1.0, 1.0, 2.5]);
    }

    #[test]
    fn test_sub_region_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("slice.raw");
        let image = ImageBuffer::<f32, 2>::from_fn(
            ImageInformation::new(Region::from_size([3, 3])),
            |index| (index[0] + 3 * index[1]) as f32,
        );

        RawVolumeWriter::new(&path)
            .write(&image, &Region::new([0, 1], [3, 1]))
            .unwrap();
        let read: ImageBuffer<f32, 1> = RawVolumeReader::new(&path, [3]).read().unwrap();
        assert_eq!(read.as_slice(), &[3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.raw");
        fs::write(&path, [0u8; 7]).unwrap();
        let result: PipelineResult<ImageBuffer<u16, 2>> = RawVolumeReader::new(&path, [2, 2]).read();
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }
}
