//! Hyper-rectangular regions of an N-dimensional index space.
//!
//! A region is a start index plus a size per axis. Axis 0 is the
//! fastest-varying axis in memory, the last axis the slowest. Regions carry
//! no behavior beyond containment and intersection arithmetic; everything
//! that moves pixels lives in [`crate::core::buffer`].

use std::fmt;

/// An index into an N-dimensional image.
pub type Index<const D: usize> = [i64; D];

/// Extent of a region along every axis.
pub type Size<const D: usize> = [usize; D];

/// Axis-aligned start index + size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region<const D: usize> {
    index: Index<D>,
    size: Size<D>,
}

impl<const D: usize> Region<D> {
    /// Create a region from a start index and a size.
    pub fn new(index: Index<D>, size: Size<D>) -> Self {
        Self { index, size }
    }

    /// Create a region starting at the origin.
    pub fn from_size(size: Size<D>) -> Self {
        Self {
            index: [0; D],
            size,
        }
    }

    /// Start index.
    pub fn index(&self) -> Index<D> {
        self.index
    }

    /// Size per axis.
    pub fn size(&self) -> Size<D> {
        self.size
    }

    /// Exclusive upper bound along an axis, saturating at `i64::MAX`.
    pub fn upper_bound(&self, axis: usize) -> i64 {
        let upper = i128::from(self.index[axis]) + self.size[axis] as i128;
        i64::try_from(upper).unwrap_or(i64::MAX)
    }

    /// Number of pixels covered, or `None` if the count overflows `usize`.
    pub fn checked_number_of_pixels(&self) -> Option<usize> {
        self.size
            .iter()
            .try_fold(1usize, |count, &extent| count.checked_mul(extent))
    }

    /// Number of pixels covered, saturating at `usize::MAX`.
    pub fn number_of_pixels(&self) -> usize {
        self.checked_number_of_pixels().unwrap_or(usize::MAX)
    }

    /// True when any axis has zero extent.
    pub fn is_empty(&self) -> bool {
        self.size.iter().any(|&s| s == 0)
    }

    /// Check whether an index lies inside this region.
    pub fn contains_index(&self, index: &Index<D>) -> bool {
        (0..D).all(|axis| index[axis] >= self.index[axis] && index[axis] < self.upper_bound(axis))
    }

    /// Check whether this region lies entirely inside `other`.
    ///
    /// An empty region is a subset of every region.
    pub fn is_subset_of(&self, other: &Region<D>) -> bool {
        if self.is_empty() {
            return true;
        }
        (0..D).all(|axis| {
            self.index[axis] >= other.index[axis] && self.upper_bound(axis) <= other.upper_bound(axis)
        })
    }

    /// Intersection of two regions, or `None` when they do not overlap.
    pub fn intersection(&self, other: &Region<D>) -> Option<Region<D>> {
        let mut index = [0; D];
        let mut size = [0; D];
        for axis in 0..D {
            let lower = self.index[axis].max(other.index[axis]);
            let upper = self.upper_bound(axis).min(other.upper_bound(axis));
            if upper <= lower {
                return None;
            }
            index[axis] = lower;
            size[axis] = extent(lower, upper);
        }
        Some(Region { index, size })
    }

    /// Smallest region covering both `self` and `other`.
    pub fn bounding_union(&self, other: &Region<D>) -> Region<D> {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let mut index = [0; D];
        let mut size = [0; D];
        for axis in 0..D {
            let lower = self.index[axis].min(other.index[axis]);
            let upper = self.upper_bound(axis).max(other.upper_bound(axis));
            index[axis] = lower;
            size[axis] = extent(lower, upper);
        }
        Region { index, size }
    }

    /// Grow the region by `radius` on both sides of every axis.
    ///
    /// Bounds saturate at the ends of the `i64` index space.
    pub fn padded_by(&self, radius: &Size<D>) -> Region<D> {
        let mut index = self.index;
        let mut size = self.size;
        for axis in 0..D {
            let step = i64::try_from(radius[axis]).unwrap_or(i64::MAX);
            let lower = self.index[axis].saturating_sub(step);
            let upper = self.upper_bound(axis).saturating_add(step);
            index[axis] = lower;
            size[axis] = extent(lower, upper);
        }
        Region { index, size }
    }

    /// Clip the region to `bounds`. Returns `None` if nothing remains.
    pub fn cropped_to(&self, bounds: &Region<D>) -> Option<Region<D>> {
        self.intersection(bounds)
    }

    /// Linear offset of `index` within a buffer laid out over this region.
    ///
    /// The caller guarantees `contains_index(index)`.
    pub fn offset_of(&self, index: &Index<D>) -> usize {
        let mut offset = 0usize;
        let mut stride = 1usize;
        for axis in 0..D {
            offset += (index[axis] - self.index[axis]) as usize * stride;
            stride *= self.size[axis];
        }
        offset
    }

    /// Iterate over every index of the region, axis 0 fastest.
    pub fn indices(&self) -> RegionIndices<D> {
        RegionIndices {
            region: *self,
            next: if self.is_empty() { None } else { Some(self.index) },
        }
    }
}

/// Length of `[lower, upper)`, saturating at `usize::MAX`.
fn extent(lower: i64, upper: i64) -> usize {
    usize::try_from(i128::from(upper) - i128::from(lower)).unwrap_or(usize::MAX)
}

impl<const D: usize> Default for Region<D> {
    /// The empty region at the origin.
    fn default() -> Self {
        Self::from_size([0; D])
    }
}

impl<const D: usize> fmt::Display for Region<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[index {:?}, size {:?}]", self.index, self.size)
    }
}

/// Iterator over the indices of a region in memory order.
#[derive(Debug, Clone)]
pub struct RegionIndices<const D: usize> {
    region: Region<D>,
    next: Option<Index<D>>,
}

impl<const D: usize> Iterator for RegionIndices<D> {
    type Item = Index<D>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        let mut advanced = current;
        let mut carried = true;
        for axis in 0..D {
            advanced[axis] += 1;
            if advanced[axis] < self.region.upper_bound(axis) {
                carried = false;
                break;
            }
            advanced[axis] = self.region.index[axis];
        }
        self.next = if carried { None } else { Some(advanced) };
        Some(current)
    }
}
