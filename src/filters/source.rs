//! Source node that feeds an in-memory image into a graph.

use crate::core::buffer::{ImageBuffer, ImageInformation};
use crate::core::context::ComputeContext;
use crate::core::error::PipelineResult;
use crate::core::node::{Category, NodeMetadata, PipelineNode};
use crate::core::pixel::Pixel;
use crate::core::time::ModifiedTime;
use std::any::Any;
use std::sync::Arc;

/// Holds an image and serves any region of it on request.
///
/// The largest possible region is the held image's buffered region.
pub struct ImageSourceNode<P: Pixel, const D: usize> {
    image: Arc<ImageBuffer<P, D>>,
    modified: ModifiedTime,
}

impl<P: Pixel, const D: usize> ImageSourceNode<P, D> {
    /// Create a source for `image`.
    pub fn new(image: ImageBuffer<P, D>) -> Self {
        Self {
            image: Arc::new(image),
            modified: ModifiedTime::new(),
        }
    }

    /// Replace the held image. Everything downstream becomes stale.
    pub fn set_image(&mut self, image: ImageBuffer<P, D>) {
        self.image = Arc::new(image);
        self.modified.modified();
    }

    /// The held image.
    pub fn image(&self) -> &ImageBuffer<P, D> {
        &self.image
    }
}

impl<P: Pixel, const D: usize> PipelineNode<P, D> for ImageSourceNode<P, D> {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("image_source", "Image Source")
            .category(Category::Source)
            .description("Serves regions of an in-memory image")
            .build()
    }

    fn modified_time(&self) -> u64 {
        self.modified.get()
    }

    fn generate_output_information(
        &self,
        _inputs: &[&ImageInformation<D>],
    ) -> PipelineResult<ImageInformation<D>> {
        let mut information = self.image.information().clone();
        information.largest_possible_region = *self.image.buffered_region();
        Ok(information)
    }

    fn compute(&mut self, ctx: &mut ComputeContext<'_, P, D>) -> PipelineResult<()> {
        let image = self.image.clone();
        ctx.dispatch(|chunk| {
            for (index, value) in chunk.pixels_mut() {
                *value = image.get(&index).unwrap_or_default();
            }
            Ok(())
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::region::Region;

    #[test]
    fn test_information_follows_image() {
        let info = ImageInformation::new(Region::from_size([3, 2])).with_spacing([0.5, 2.0]);
        let mut source = ImageSourceNode::new(ImageBuffer::<u8, 2>::from_fn(info, |_| 1));
        let before = <ImageSourceNode<u8, 2> as PipelineNode<u8, 2>>::modified_time(&source);

        let derived = source.generate_output_information(&[]).unwrap();
        assert_eq!(derived.largest_possible_region, Region::from_size([3, 2]));
        assert_eq!(derived.spacing, [0.5, 2.0]);

        source.set_image(ImageBuffer::from_fn(
            ImageInformation::new(Region::from_size([5, 5])),
            |_| 2,
        ));
        assert!(source.modified_time() > before);
        assert_eq!(
            source.generate_output_information(&[]).unwrap().largest_possible_region,
            Region::from_size([5, 5])
        );
    }
}
