//! Precomputed weight tables shared by the smoothing filters.
//!
//! - [`DomainKernel`]: spatial Gaussian weights over a truncated
//!   hyper-ellipsoid of integer offsets.
//! - [`RangeTable`]: Gaussian weights over discretized absolute intensity
//!   differences.
//!
//! Both are immutable once built and are read concurrently by every worker
//! of a compute step.

use crate::core::error::{PipelineError, PipelineResult};
use crate::core::region::{Index, Region, Size};

/// Range differences at or beyond this many range sigmas get zero weight.
///
/// The range table covers `RANGE_CUTOFF_SIGMAS * sigma` rather than the
/// full difference span of the sample type; for `f32` and `f64` that span
/// would put every realistic difference in bucket zero.
pub const RANGE_CUTOFF_SIGMAS: f64 = 4.0;

/// One neighbor offset and its normalized spatial weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelEntry<const D: usize> {
    pub offset: Index<D>,
    pub weight: f64,
}

/// Spatial Gaussian weights keyed by integer neighbor offset.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainKernel<const D: usize> {
    radius: Size<D>,
    entries: Vec<KernelEntry<D>>,
}

impl<const D: usize> DomainKernel<D> {
    /// Build the kernel.
    ///
    /// Only the first `dimensionality` axes get a neighborhood; the others
    /// have radius zero. Along an active axis the radius is
    /// `ceil(mu * sigma / spacing)`, and an offset is kept when its distance
    /// in sigma units, measured in physical space, is at most `mu`. Weights
    /// sum to one. Fails when the kernel has too many offsets to enumerate.
    pub fn build(
        sigma: &[f64; D],
        mu: f64,
        dimensionality: usize,
        spacing: &[f64; D],
    ) -> PipelineResult<Self> {
        Self::build_within(sigma, mu, dimensionality, spacing, &[usize::MAX; D])
    }

    /// Build the kernel for an image of `extent` pixels per axis.
    ///
    /// Offsets of `extent` or more along an axis can never reach a second
    /// pixel of the image, so the radius is capped at `extent - 1`.
    pub fn build_within(
        sigma: &[f64; D],
        mu: f64,
        dimensionality: usize,
        spacing: &[f64; D],
        extent: &Size<D>,
    ) -> PipelineResult<Self> {
        let active = dimensionality.min(D);
        let mut radius = Self::radius_for(sigma, mu, dimensionality, spacing)?;

        let mut box_index = [0i64; D];
        let mut box_size = [1usize; D];
        for axis in 0..D {
            radius[axis] = radius[axis].min(extent[axis].saturating_sub(1));
            box_index[axis] = -i64::try_from(radius[axis]).unwrap_or(i64::MAX);
            box_size[axis] = radius[axis].saturating_mul(2).saturating_add(1);
        }
        let kernel_box = Region::new(box_index, box_size);
        let max_entries = isize::MAX as usize / std::mem::size_of::<KernelEntry<D>>();
        if kernel_box
            .checked_number_of_pixels()
            .map_or(true, |count| count > max_entries)
        {
            return Err(PipelineError::parameter(
                "domain_sigma",
                format!("kernel radius {:?} is too large to enumerate", radius),
            ));
        }

        let limit = mu * mu;
        let mut entries: Vec<KernelEntry<D>> = kernel_box
            .indices()
            .filter_map(|offset| {
                let distance = (0..active)
                    .map(|axis| {
                        let scaled = offset[axis] as f64 * spacing[axis].abs() / sigma[axis];
                        scaled * scaled
                    })
                    .sum::<f64>();
                (distance <= limit * (1.0 + 1e-12)).then(|| KernelEntry {
                    offset,
                    weight: (-0.5 * distance).exp(),
                })
            })
            .collect();

        let total: f64 = entries.iter().map(|e| e.weight).sum();
        for entry in &mut entries {
            entry.weight /= total;
        }

        Ok(Self { radius, entries })
    }

    /// Radius `build` would produce, without enumerating the kernel.
    pub fn radius_for(
        sigma: &[f64; D],
        mu: f64,
        dimensionality: usize,
        spacing: &[f64; D],
    ) -> PipelineResult<Size<D>> {
        let mut radius = [0usize; D];
        for axis in 0..dimensionality.min(D) {
            let step = spacing[axis].abs();
            if !(step > 0.0 && step.is_finite()) {
                return Err(PipelineError::parameter(
                    "spacing",
                    format!("spacing along axis {} must be positive, got {}", axis, spacing[axis]),
                ));
            }
            radius[axis] = (mu * sigma[axis] / step).ceil() as usize;
        }
        Ok(radius)
    }

    /// Per-axis neighborhood radius.
    pub fn radius(&self) -> Size<D> {
        self.radius
    }

    /// Kernel entries in offset order.
    pub fn entries(&self) -> &[KernelEntry<D>] {
        &self.entries
    }

    /// Number of offsets in the kernel.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the kernel has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Gaussian range weights over `samples` buckets of absolute difference.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeTable {
    weights: Vec<f64>,
    span: f64,
    cutoff: f64,
}

impl RangeTable {
    /// Build the table.
    ///
    /// The tabulated span is `RANGE_CUTOFF_SIGMAS * sigma`, capped at
    /// `representable_span` (the largest difference the sample type can
    /// produce). Bucket `i` holds the weight at its lower edge, so bucket
    /// zero always has weight one.
    pub fn build(sigma: f64, samples: usize, representable_span: f64) -> Self {
        let cutoff = RANGE_CUTOFF_SIGMAS * sigma;
        let span = cutoff.min(representable_span);
        let samples = samples.max(1);
        let width = span / samples as f64;
        let weights = (0..samples)
            .map(|i| {
                let x = i as f64 * width / sigma;
                (-0.5 * x * x).exp()
            })
            .collect();
        Self {
            weights,
            span,
            cutoff,
        }
    }

    /// Weight for an absolute intensity difference, or `None` when the
    /// difference reaches the cutoff and the neighbor does not contribute.
    #[inline]
    pub fn weight(&self, difference: f64) -> Option<f64> {
        let difference = difference.abs();
        if difference >= self.cutoff || difference.is_nan() {
            return None;
        }
        let last = self.weights.len() - 1;
        let bucket = if self.span > 0.0 {
            ((difference * self.weights.len() as f64 / self.span) as usize).min(last)
        } else {
            0
        };
        Some(self.weights[bucket])
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether the table has no buckets. Never true for a built table.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Difference at which weights drop to zero.
    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }
}
