//! Image buffers and the spatial metadata that travels with them.
//!
//! An [`ImageBuffer`] owns a contiguous sample array laid out over its
//! buffered region (axis 0 fastest) and tracks the three regions the
//! pipeline negotiates with:
//!
//! - *largest possible*: the maximal extent the data could ever have
//! - *buffered*: where storage is allocated and valid
//! - *requested*: what the consumer asked to be valid after an update

use crate::core::error::{NodeId, PipelineError, PipelineResult};
use crate::core::pixel::Pixel;
use crate::core::region::{Index, Region};

/// Spatial metadata produced during the information phase.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInformation<const D: usize> {
    /// Maximal extent of the data.
    pub largest_possible_region: Region<D>,
    /// Physical distance between samples along each axis.
    pub spacing: [f64; D],
    /// Physical position of index zero.
    pub origin: [f64; D],
    /// Direction cosines, row per axis.
    pub direction: [[f64; D]; D],
}

impl<const D: usize> ImageInformation<D> {
    /// Unit spacing, zero origin, identity direction.
    pub fn new(largest_possible_region: Region<D>) -> Self {
        let mut direction = [[0.0; D]; D];
        for (axis, row) in direction.iter_mut().enumerate() {
            row[axis] = 1.0;
        }
        Self {
            largest_possible_region,
            spacing: [1.0; D],
            origin: [0.0; D],
            direction,
        }
    }

    /// Set the spacing.
    pub fn with_spacing(mut self, spacing: [f64; D]) -> Self {
        self.spacing = spacing;
        self
    }

    /// Set the origin.
    pub fn with_origin(mut self, origin: [f64; D]) -> Self {
        self.origin = origin;
        self
    }
}

/// Sample storage over a buffered region plus its metadata.
#[derive(Debug, Clone)]
pub struct ImageBuffer<P: Pixel, const D: usize> {
    information: ImageInformation<D>,
    buffered_region: Region<D>,
    requested_region: Region<D>,
    data: Vec<P>,
}

impl<P: Pixel, const D: usize> ImageBuffer<P, D> {
    /// Allocate storage for `region`, filled with the default sample.
    ///
    /// Fails with a region error if `region` is not inside the largest
    /// possible region and with an allocation error if storage cannot be
    /// reserved. Nothing is left allocated on failure.
    pub fn allocate(
        node_id: NodeId,
        information: ImageInformation<D>,
        region: Region<D>,
    ) -> PipelineResult<Self> {
        if !region.is_subset_of(&information.largest_possible_region) {
            return Err(PipelineError::region(
                node_id,
                &region,
                &information.largest_possible_region,
            ));
        }
        let pixels = region
            .checked_number_of_pixels()
            .ok_or(PipelineError::Allocation {
                node_id,
                pixels: usize::MAX,
            })?;
        let mut data = Vec::new();
        data.try_reserve_exact(pixels)
            .map_err(|_| PipelineError::Allocation { node_id, pixels })?;
        data.resize(pixels, P::default());
        Ok(Self {
            information,
            buffered_region: region,
            requested_region: region,
            data,
        })
    }

    /// Wrap existing samples covering the whole largest possible region.
    pub fn from_vec(information: ImageInformation<D>, data: Vec<P>) -> PipelineResult<Self> {
        let region = information.largest_possible_region;
        if data.len() != region.number_of_pixels() {
            return Err(PipelineError::parameter(
                "data",
                format!(
                    "expected {} samples for region {}, got {}",
                    region.number_of_pixels(),
                    region,
                    data.len()
                ),
            ));
        }
        Ok(Self {
            information,
            buffered_region: region,
            requested_region: region,
            data,
        })
    }

    /// Build an image over `region` by evaluating `f` at every index.
    pub fn from_fn(information: ImageInformation<D>, f: impl Fn(&Index<D>) -> P) -> Self {
        let region = information.largest_possible_region;
        let data = region.indices().map(|index| f(&index)).collect();
        Self {
            information,
            buffered_region: region,
            requested_region: region,
            data,
        }
    }

    /// Spatial metadata.
    pub fn information(&self) -> &ImageInformation<D> {
        &self.information
    }

    /// Largest possible region.
    pub fn largest_possible_region(&self) -> &Region<D> {
        &self.information.largest_possible_region
    }

    /// Region for which samples are stored and valid.
    pub fn buffered_region(&self) -> &Region<D> {
        &self.buffered_region
    }

    /// Region this buffer was generated for.
    ///
    /// Fixed once the buffer is stored; a later, smaller request served
    /// from the cache shows up in
    /// [`ProcessingGraph::negotiated_region`](crate::graph::ProcessingGraph::negotiated_region).
    pub fn requested_region(&self) -> &Region<D> {
        &self.requested_region
    }

    /// Bounds-checked read.
    pub fn get(&self, index: &Index<D>) -> Option<P> {
        if !self.buffered_region.contains_index(index) {
            return None;
        }
        Some(self.data[self.buffered_region.offset_of(index)])
    }

    /// Bounds-checked write. Returns false if `index` is not buffered.
    pub fn set(&mut self, index: &Index<D>, value: P) -> bool {
        if !self.buffered_region.contains_index(index) {
            return false;
        }
        let offset = self.buffered_region.offset_of(index);
        self.data[offset] = value;
        true
    }

    /// Fill every buffered sample with `value`.
    pub fn fill(&mut self, value: P) {
        self.data.fill(value);
    }

    /// Samples in memory order.
    pub fn as_slice(&self) -> &[P] {
        &self.data
    }

    /// Mutable samples in memory order.
    pub fn as_mut_slice(&mut self) -> &mut [P] {
        &mut self.data
    }

    /// Raw bytes of the sample array.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// Iterate over `(index, sample)` pairs inside `region`.
    ///
    /// Indices outside the buffered region are skipped.
    pub fn pixels_in<'a>(&'a self, region: &Region<D>) -> impl Iterator<Item = (Index<D>, P)> + 'a {
        region
            .indices()
            .filter_map(move |index| self.get(&index).map(|value| (index, value)))
    }

    /// Smallest and largest sample value in the buffered region.
    pub fn value_range(&self) -> Option<(P, P)> {
        let mut iter = self.data.iter().copied();
        let first = iter.next()?;
        Some(iter.fold((first, first), |(min, max), v| {
            (
                if v < min { v } else { min },
                if v > max { v } else { max },
            )
        }))
    }
}
