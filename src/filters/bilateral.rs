//! Edge-preserving bilateral smoothing.
//!
//! Every output sample is a weighted average of its neighbors, where the
//! weight is the product of a spatial Gaussian on the neighbor's offset and
//! a Gaussian on the intensity difference to the center. Averaging therefore
//! stops at strong intensity discontinuities.
//!
//! Neighbors outside the input's buffered region are skipped and the
//! remaining weights renormalize implicitly, so pixels at the image border
//! see a truncated neighborhood rather than padding.

use crate::core::buffer::ImageInformation;
use crate::core::context::ComputeContext;
use crate::core::error::{PipelineError, PipelineResult};
use crate::core::node::{Category, NodeMetadata, PipelineNode};
use crate::core::pixel::Pixel;
use crate::core::region::{Region, Size};
use crate::core::time::ModifiedTime;
use crate::core::types::Value;
use crate::filters::kernel::{DomainKernel, RangeTable};
use log::debug;
use std::any::Any;

/// Default spatial standard deviation along every axis.
pub const DEFAULT_DOMAIN_SIGMA: f64 = 4.0;
/// Default kernel truncation, in domain sigmas.
pub const DEFAULT_DOMAIN_MU: f64 = 2.5;
/// Default intensity standard deviation.
pub const DEFAULT_RANGE_SIGMA: f64 = 50.0;
/// Default number of range table buckets.
pub const DEFAULT_RANGE_SAMPLES: usize = 100;

/// Tables built for one combination of parameters, spacing and sample type.
#[derive(Debug)]
struct KernelTables<const D: usize> {
    modified: u64,
    spacing: [f64; D],
    extent: Size<D>,
    span: f64,
    domain: DomainKernel<D>,
    range: RangeTable,
}

/// Bilateral filter node.
///
/// ```ignore
/// let mut filter = BilateralImageFilter::<2>::new();
/// filter.set_domain_sigma_all(2.0)?;
/// filter.set_range_sigma(10.0)?;
/// let id = graph.add_filter(filter);
/// graph.set_input(id, 0, source)?;
/// ```
#[derive(Debug)]
pub struct BilateralImageFilter<const D: usize> {
    domain_sigma: [f64; D],
    domain_mu: f64,
    range_sigma: f64,
    filter_dimensionality: usize,
    range_samples: usize,
    modified: ModifiedTime,
    tables: Option<KernelTables<D>>,
}

impl<const D: usize> Default for BilateralImageFilter<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const D: usize> BilateralImageFilter<D> {
    /// Create a filter with default parameters.
    pub fn new() -> Self {
        Self {
            domain_sigma: [DEFAULT_DOMAIN_SIGMA; D],
            domain_mu: DEFAULT_DOMAIN_MU,
            range_sigma: DEFAULT_RANGE_SIGMA,
            filter_dimensionality: D,
            range_samples: DEFAULT_RANGE_SAMPLES,
            modified: ModifiedTime::new(),
            tables: None,
        }
    }

    /// Per-axis spatial standard deviation, in physical units.
    pub fn domain_sigma(&self) -> [f64; D] {
        self.domain_sigma
    }

    /// Set the per-axis spatial standard deviation. Every entry must be
    /// positive.
    pub fn set_domain_sigma(&mut self, sigma: [f64; D]) -> PipelineResult<()> {
        for (axis, &value) in sigma.iter().enumerate() {
            if !is_positive(value) {
                return Err(PipelineError::parameter(
                    "domain_sigma",
                    format!("axis {} must be positive, got {}", axis, value),
                ));
            }
        }
        if sigma != self.domain_sigma {
            self.domain_sigma = sigma;
            self.modified.modified();
        }
        Ok(())
    }

    /// Set the same spatial standard deviation on every axis.
    pub fn set_domain_sigma_all(&mut self, sigma: f64) -> PipelineResult<()> {
        self.set_domain_sigma([sigma; D])
    }

    /// Kernel truncation, in domain sigmas.
    pub fn domain_mu(&self) -> f64 {
        self.domain_mu
    }

    /// Set the kernel truncation. Must be positive.
    pub fn set_domain_mu(&mut self, mu: f64) -> PipelineResult<()> {
        if !is_positive(mu) {
            return Err(PipelineError::parameter(
                "domain_mu",
                format!("must be positive, got {}", mu),
            ));
        }
        if mu != self.domain_mu {
            self.domain_mu = mu;
            self.modified.modified();
        }
        Ok(())
    }

    /// Intensity standard deviation.
    pub fn range_sigma(&self) -> f64 {
        self.range_sigma
    }

    /// Set the intensity standard deviation. Must be positive.
    pub fn set_range_sigma(&mut self, sigma: f64) -> PipelineResult<()> {
        if !is_positive(sigma) {
            return Err(PipelineError::parameter(
                "range_sigma",
                format!("must be positive, got {}", sigma),
            ));
        }
        if sigma != self.range_sigma {
            self.range_sigma = sigma;
            self.modified.modified();
        }
        Ok(())
    }

    /// Number of leading axes the neighborhood extends along.
    pub fn filter_dimensionality(&self) -> usize {
        self.filter_dimensionality
    }

    /// Restrict the neighborhood to the first `dimensionality` axes.
    /// Must be between 1 and the image dimension.
    pub fn set_filter_dimensionality(&mut self, dimensionality: usize) -> PipelineResult<()> {
        if dimensionality == 0 || dimensionality > D {
            return Err(PipelineError::parameter(
                "filter_dimensionality",
                format!("must be between 1 and {}, got {}", D, dimensionality),
            ));
        }
        if dimensionality != self.filter_dimensionality {
            self.filter_dimensionality = dimensionality;
            self.modified.modified();
        }
        Ok(())
    }

    /// Number of range table buckets.
    pub fn range_samples(&self) -> usize {
        self.range_samples
    }

    /// Set the number of range table buckets. Must be positive.
    pub fn set_range_samples(&mut self, samples: usize) -> PipelineResult<()> {
        if samples == 0 {
            return Err(PipelineError::parameter("range_samples", "must be positive"));
        }
        if samples != self.range_samples {
            self.range_samples = samples;
            self.modified.modified();
        }
        Ok(())
    }

    /// Per-axis radius of the domain kernel for an input with `spacing`.
    pub fn kernel_radius(&self, spacing: &[f64; D]) -> PipelineResult<[usize; D]> {
        DomainKernel::radius_for(
            &self.domain_sigma,
            self.domain_mu,
            self.filter_dimensionality,
            spacing,
        )
    }

    /// Tables for the current parameters, rebuilt only when something they
    /// depend on changed since the last compute step.
    fn tables<P: Pixel>(
        &mut self,
        spacing: &[f64; D],
        extent: &Size<D>,
    ) -> PipelineResult<&KernelTables<D>> {
        let modified = self.modified.get();
        let span = P::difference_span();
        let tables = match self.tables.take() {
            Some(tables)
                if tables.modified == modified
                    && tables.spacing == *spacing
                    && tables.extent == *extent
                    && tables.span == span =>
            {
                tables
            }
            _ => {
                let domain = DomainKernel::build_within(
                    &self.domain_sigma,
                    self.domain_mu,
                    self.filter_dimensionality,
                    spacing,
                    extent,
                )?;
                let range = RangeTable::build(self.range_sigma, self.range_samples, span);
                debug!(
                    "bilateral tables rebuilt: {} kernel offsets, radius {:?}, {} range buckets",
                    domain.len(),
                    domain.radius(),
                    range.len()
                );
                KernelTables {
                    modified,
                    spacing: *spacing,
                    extent: *extent,
                    span,
                    domain,
                    range,
                }
            }
        };
        Ok(&*self.tables.insert(tables))
    }
}

impl<P: Pixel, const D: usize> PipelineNode<P, D> for BilateralImageFilter<D> {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("bilateral", "Bilateral Filter")
            .category(Category::Smoothing)
            .description("Edge-preserving smoothing weighted by spatial distance and intensity similarity")
            .inputs(1)
            .parameter("domain_sigma")
            .parameter("domain_mu")
            .parameter("range_sigma")
            .parameter("filter_dimensionality")
            .parameter("range_samples")
            .build()
    }

    fn modified_time(&self) -> u64 {
        self.modified.get()
    }

    fn generate_input_requested_region(
        &self,
        output_region: &Region<D>,
        inputs: &[&ImageInformation<D>],
    ) -> PipelineResult<Vec<Region<D>>> {
        let Some(input) = inputs.first() else {
            return Ok(Vec::new());
        };
        if output_region.is_empty() {
            return Ok(vec![Region::default()]);
        }
        let largest = input.largest_possible_region;
        let mut radius = self.kernel_radius(&input.spacing)?;
        for (axis, extent) in largest.size().into_iter().enumerate() {
            radius[axis] = radius[axis].min(extent);
        }
        let padded = output_region.padded_by(&radius);
        Ok(vec![padded
            .cropped_to(&largest)
            .unwrap_or_default()])
    }

    fn compute(&mut self, ctx: &mut ComputeContext<'_, P, D>) -> PipelineResult<()> {
        let input = ctx.input(0)?;
        let node_id = ctx.node_id;
        let information = input.information();
        let tables = self.tables::<P>(
            &information.spacing,
            &information.largest_possible_region.size(),
        )?;
        let domain = &tables.domain;
        let range = &tables.range;

        ctx.dispatch(|chunk| {
            for (index, value) in chunk.pixels_mut() {
                let center = input
                    .get(&index)
                    .ok_or_else(|| PipelineError::Execution {
                        node_id,
                        reason: format!("input does not cover index {:?}", index),
                    })?
                    .to_f64();

                let mut weight_sum = 0.0;
                let mut delta_sum = 0.0;
                for entry in domain.entries() {
                    let mut neighbor = index;
                    for axis in 0..D {
                        neighbor[axis] += entry.offset[axis];
                    }
                    let Some(sample) = input.get(&neighbor) else {
                        continue;
                    };
                    let delta = sample.to_f64() - center;
                    let Some(range_weight) = range.weight(delta) else {
                        continue;
                    };
                    let weight = entry.weight * range_weight;
                    weight_sum += weight;
                    delta_sum += weight * delta;
                }

                *value = if weight_sum > 0.0 {
                    P::from_f64(center + delta_sum / weight_sum)
                } else {
                    P::from_f64(center)
                };
            }
            Ok(())
        })
    }

    fn set_parameter(&mut self, name: &str, value: &Value) -> PipelineResult<()> {
        match name {
            "domain_sigma" => {
                let list = value
                    .as_float_list()
                    .ok_or_else(|| type_mismatch(name, "float or list of floats", value))?;
                match list.as_slice() {
                    [sigma] => self.set_domain_sigma_all(*sigma),
                    _ => {
                        let sigma: [f64; D] = list.as_slice().try_into().map_err(|_| {
                            PipelineError::parameter(
                                name,
                                format!("expected 1 or {} values, got {}", D, list.len()),
                            )
                        })?;
                        self.set_domain_sigma(sigma)
                    }
                }
            }
            "domain_mu" => self.set_domain_mu(
                value
                    .as_float()
                    .ok_or_else(|| type_mismatch(name, "float", value))?,
            ),
            "range_sigma" => self.set_range_sigma(
                value
                    .as_float()
                    .ok_or_else(|| type_mismatch(name, "float", value))?,
            ),
            "filter_dimensionality" => self.set_filter_dimensionality(non_negative(name, value)?),
            "range_samples" => self.set_range_samples(non_negative(name, value)?),
            _ => Err(PipelineError::parameter(
                name,
                "bilateral filter has no such parameter",
            )),
        }
    }

    fn parameters(&self) -> Vec<(String, Value)> {
        vec![
            ("domain_sigma".to_string(), Value::FloatList(self.domain_sigma.to_vec())),
            ("domain_mu".to_string(), Value::Float(self.domain_mu)),
            ("range_sigma".to_string(), Value::Float(self.range_sigma)),
            (
                "filter_dimensionality".to_string(),
                Value::Integer(self.filter_dimensionality as i64),
            ),
            ("range_samples".to_string(), Value::Integer(self.range_samples as i64)),
        ]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub(crate) fn is_positive(value: f64) -> bool {
    value > 0.0 && value.is_finite()
}

pub(crate) fn type_mismatch(name: &str, expected: &str, value: &Value) -> PipelineError {
    PipelineError::parameter(
        name,
        format!("expected {}, got {}", expected, value.type_name()),
    )
}

pub(crate) fn non_negative(name: &str, value: &Value) -> PipelineResult<usize> {
    let integer = value
        .as_integer()
        .ok_or_else(|| type_mismatch(name, "integer", value))?;
    usize::try_from(integer)
        .map_err(|_| PipelineError::parameter(name, format!("must not be negative, got {}", integer)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::buffer::ImageBuffer;
    use crate::execution::engine::{ExecutionEngine, ExecutionOptions};
    use crate::filters::gaussian::GaussianSmoothingFilter;
    use crate::filters::source::ImageSourceNode;
    use crate::graph::structure::ProcessingGraph;
    use std::sync::Arc;

    /// Run `filter` over `image` with `threads` workers and return its output.
    fn run<P, const D: usize, F>(
        image: ImageBuffer<P, D>,
        filter: F,
        requested: Option<Region<D>>,
        threads: usize,
    ) -> (ProcessingGraph<P, D>, Arc<ImageBuffer<P, D>>)
    where
        P: Pixel,
        F: PipelineNode<P, D>,
    {
        let engine = ExecutionEngine::with_options(ExecutionOptions::new().with_threads(threads)).unwrap();
        let mut graph = ProcessingGraph::new();
        let source = graph.add_filter(ImageSourceNode::new(image));
        let node = graph.add_filter(filter);
        graph.set_input(node, 0, source).unwrap();
        if let Some(region) = requested {
            graph.set_requested_region(node, region).unwrap();
        }
        engine.update(&mut graph, node).unwrap();
        let output = graph.output(node).unwrap().unwrap();
        (graph, output)
    }

    fn bilateral<const D: usize>(domain_sigma: f64, range_sigma: f64) -> BilateralImageFilter<D> {
        let mut filter = BilateralImageFilter::new();
        filter.set_domain_sigma_all(domain_sigma).unwrap();
        filter.set_range_sigma(range_sigma).unwrap();
        filter
    }

    fn image<P: Pixel, const D: usize>(size: [usize; D], f: impl Fn(&[i64; D]) -> P) -> ImageBuffer<P, D> {
        ImageBuffer::from_fn(ImageInformation::new(Region::from_size(size)), f)
    }

    /// Deterministic noise in [0, 1).
    fn noise(index: &[i64; 2]) -> f64 {
        let mut x = (index[0] * 73_856_093 ^ index[1] * 19_349_663) as u64;
        x ^= x >> 13;
        x = x.wrapping_mul(0x5bd1_e995);
        x ^= x >> 15;
        (x % 10_000) as f64 / 10_000.0
    }

    #[test]
    fn test_defaults() {
        let filter = BilateralImageFilter::<3>::new();
        assert_eq!(filter.domain_sigma(), [4.0; 3]);
        assert_eq!(filter.domain_mu(), 2.5);
        assert_eq!(filter.range_sigma(), 50.0);
        assert_eq!(filter.filter_dimensionality(), 3);
        assert_eq!(filter.range_samples(), 100);
    }

    #[test]
    fn test_flat_image_is_unchanged() {
        let (_, output) = run(image([9, 7], |_| 137u8), bilateral::<2>(2.0, 10.0), None, 3);
        assert!(output.as_slice().iter().all(|&v| v == 137));

        let (_, output) = run(image([5, 4, 3], |_| 0.3f32), bilateral::<3>(1.5, 0.01), None, 2);
        assert!(output.as_slice().iter().all(|&v| v == 0.3));
    }

    #[test]
    fn test_edge_preserved_better_than_gaussian() {
        let step = || image([16, 16], |index| if index[0] < 8 { 0u8 } else { 255u8 });

        let (_, smoothed) = run(step(), bilateral::<2>(2.0, 10.0), None, 2);
        let mut gaussian = GaussianSmoothingFilter::<2>::new();
        gaussian.set_domain_sigma_all(2.0).unwrap();
        let (_, blurred) = run(step(), gaussian, None, 2);

        let original = step();
        for y in 0..16 {
            for x in [7, 8] {
                let index = [x, y];
                let before = original.get(&index).unwrap() as i32;
                let bilateral_change = (smoothed.get(&index).unwrap() as i32 - before).abs();
                let gaussian_change = (blurred.get(&index).unwrap() as i32 - before).abs();
                assert!(
                    bilateral_change < gaussian_change,
                    "at {:?}: bilateral {} vs gaussian {}",
                    index,
                    bilateral_change,
                    gaussian_change
                );
            }
        }
    }

    #[test]
    fn test_isolated_outlier_does_not_bleed() {
        let spike = image([9, 9], |index| if *index == [4, 4] { 200u8 } else { 100u8 });
        let (_, output) = run(spike, bilateral::<2>(1.0, 20.0), None, 1);
        assert_eq!(output.get(&[3, 4]), Some(100));
        assert_eq!(output.get(&[5, 5]), Some(100));
        // The outlier itself has no similar neighbor and stays
        assert_eq!(output.get(&[4, 4]), Some(200));
    }

    #[test]
    fn test_border_pixel_renormalizes_in_bounds_neighbors() {
        let requested = Region::new([0, 0], [1, 1]);
        let (graph, output) = run(
            image([4, 4], |_| 100.0f64),
            bilateral::<2>(0.5, 1000.0),
            Some(requested),
            1,
        );
        assert_eq!(*output.buffered_region(), requested);
        // Zero padding would pull the corner towards zero
        assert_eq!(output.get(&[0, 0]), Some(100.0));

        let source = graph
            .nodes()
            .find(|node| node.filter.metadata().id == "image_source")
            .unwrap()
            .id;
        // Radius ceil(2.5 * 0.5) = 2, clipped at the origin
        assert_eq!(
            graph.negotiated_region(source).unwrap(),
            Some(Region::new([0, 0], [3, 3]))
        );
    }

    #[test]
    fn test_border_pixel_matches_truncated_kernel() {
        let ramp = image([4, 4], |index| (index[0] * 10 + index[1] * 40) as f64);
        let mut filter = bilateral::<2>(1.0, 30.0);
        filter.set_domain_mu(2.0).unwrap();
        let (_, output) = run(ramp.clone(), filter, None, 1);

        let domain = DomainKernel::build(&[1.0; 2], 2.0, 2, &[1.0; 2]).unwrap();
        let range = RangeTable::build(30.0, 100, f64::difference_span());
        let mut weights = 0.0;
        let mut values = 0.0;
        for entry in domain.entries() {
            if let Some(sample) = ramp.get(&entry.offset) {
                if let Some(w) = range.weight(sample) {
                    weights += entry.weight * w;
                    values += entry.weight * w * sample;
                }
            }
        }
        let expected = values / weights;
        let actual = output.get(&[0, 0]).unwrap();
        assert!((actual - expected).abs() < 1e-9, "{} vs {}", actual, expected);
    }

    #[test]
    fn test_thread_count_does_not_change_output() {
        let noisy = || image([33, 21], |index| (noise(index) * 4000.0) as u16);
        let (_, single) = run(noisy(), bilateral::<2>(1.5, 300.0), None, 1);
        let (_, many) = run(noisy(), bilateral::<2>(1.5, 300.0), None, 4);
        assert_eq!(single.as_slice(), many.as_slice());

        let noisy = || image([17, 29], |index| noise(index) as f32);
        let (_, single) = run(noisy(), bilateral::<2>(2.0, 0.2), None, 1);
        let (_, many) = run(noisy(), bilateral::<2>(2.0, 0.2), None, 5);
        assert_eq!(single.as_slice(), many.as_slice());
    }

    #[test]
    fn test_input_request_is_padded_and_clipped() {
        let mut filter = BilateralImageFilter::<2>::new();
        filter.set_domain_sigma([1.0, 2.0]).unwrap();
        filter.set_domain_mu(2.0).unwrap();
        let info = ImageInformation::new(Region::from_size([20, 20]));

        let request = |region: Region<2>| {
            <BilateralImageFilter<2> as PipelineNode<u8, 2>>::generate_input_requested_region(
                &filter,
                &region,
                &[&info],
            )
            .unwrap()
        };

        assert_eq!(
            request(Region::new([5, 5], [3, 3])),
            vec![Region::new([3, 1], [7, 11])]
        );
        assert_eq!(
            request(Region::new([0, 0], [2, 2])),
            vec![Region::new([0, 0], [4, 6])]
        );

        // Coarser spacing shrinks the radius in index units
        let coarse = info.clone().with_spacing([2.0, 2.0]);
        let padded = <BilateralImageFilter<2> as PipelineNode<u8, 2>>::generate_input_requested_region(
            &filter,
            &Region::new([5, 5], [3, 3]),
            &[&coarse],
        )
        .unwrap();
        assert_eq!(padded, vec![Region::new([4, 3], [5, 7])]);
    }

    #[test]
    fn test_huge_domain_sigma_requests_whole_input() {
        let mut filter = BilateralImageFilter::<2>::new();
        filter.set_domain_sigma_all(1e30).unwrap();
        let info = ImageInformation::new(Region::from_size([8, 8]));

        let padded = <BilateralImageFilter<2> as PipelineNode<u8, 2>>::generate_input_requested_region(
            &filter,
            &Region::new([2, 2], [2, 2]),
            &[&info],
        )
        .unwrap();
        assert_eq!(padded, vec![Region::from_size([8, 8])]);

        // The kernel then spans the whole image and a flat image stays flat
        let (_, output) = run(image([8, 5], |_| 42u8), filter, Some(Region::new([2, 2], [2, 2])), 2);
        assert!(output.as_slice().iter().all(|&v| v == 42));
    }

    #[test]
    fn test_differences_past_cutoff_are_ignored() {
        // Range sigma 20 puts the cutoff at 80: 0 and 85 never mix, 0 and 30 do
        let far = image([6, 1], |index| if index[0] < 3 { 0u8 } else { 85u8 });
        let (_, output) = run(far, bilateral::<2>(1.0, 20.0), None, 1);
        assert_eq!(output.get(&[2, 0]), Some(0));
        assert_eq!(output.get(&[3, 0]), Some(85));

        let near = image([6, 1], |index| if index[0] < 3 { 0u8 } else { 30u8 });
        let (_, output) = run(near, bilateral::<2>(1.0, 20.0), None, 1);
        assert!(output.get(&[2, 0]).unwrap() > 0);
        assert!(output.get(&[3, 0]).unwrap() < 30);
    }

    #[test]
    fn test_setters_validate_immediately() {
        let mut filter = BilateralImageFilter::<2>::new();
        let before = filter.modified.get();

        assert!(filter.set_range_sigma(0.0).is_err());
        assert!(filter.set_range_sigma(-1.0).is_err());
        assert!(filter.set_range_sigma(f64::NAN).is_err());
        assert!(filter.set_domain_sigma([1.0, 0.0]).is_err());
        assert!(filter.set_domain_mu(0.0).is_err());
        assert!(filter.set_filter_dimensionality(0).is_err());
        assert!(filter.set_filter_dimensionality(3).is_err());
        assert!(filter.set_range_samples(0).is_err());

        // Rejected values are never stored
        assert_eq!(filter.range_sigma(), DEFAULT_RANGE_SIGMA);
        assert_eq!(filter.domain_sigma(), [DEFAULT_DOMAIN_SIGMA; 2]);
        assert_eq!(filter.modified.get(), before);

        filter.set_range_sigma(DEFAULT_RANGE_SIGMA).unwrap();
        assert_eq!(filter.modified.get(), before);
        filter.set_filter_dimensionality(1).unwrap();
        assert!(filter.modified.get() > before);
    }

    #[test]
    fn test_set_parameter_by_name() {
        let mut filter = BilateralImageFilter::<2>::new();
        let node: &mut dyn PipelineNode<u8, 2> = &mut filter;

        node.set_parameter("domain_sigma", &Value::FloatList(vec![1.0, 2.0]))
            .unwrap();
        node.set_parameter("range_sigma", &Value::Integer(12)).unwrap();
        node.set_parameter("range_samples", &Value::Integer(64)).unwrap();
        assert!(node.set_parameter("domain_sigma", &Value::FloatList(vec![1.0; 3])).is_err());
        assert!(node.set_parameter("range_sigma", &Value::Boolean(true)).is_err());
        assert!(node.set_parameter("range_samples", &Value::Integer(-4)).is_err());
        assert!(node.set_parameter("sharpness", &Value::Float(1.0)).is_err());

        node.set_parameter("domain_sigma", &Value::Float(3.0)).unwrap();
        assert_eq!(filter.domain_sigma(), [3.0, 3.0]);
        assert_eq!(filter.range_sigma(), 12.0);
        assert_eq!(filter.range_samples(), 64);
    }

    #[test]
    fn test_restricted_dimensionality_keeps_slices_independent() {
        // Each slice along the last axis is flat, with a different value
        let layered = || image([6, 5, 4], |index| (index[2] * 10) as f32);

        let mut in_plane = bilateral::<3>(1.0, 1000.0);
        in_plane.set_filter_dimensionality(2).unwrap();
        let (_, output) = run(layered(), in_plane, None, 2);
        assert_eq!(output.as_slice(), layered().as_slice());

        let (_, output) = run(layered(), bilateral::<3>(1.0, 1000.0), None, 2);
        assert_ne!(output.as_slice(), layered().as_slice());
    }

    #[test]
    fn test_tables_rebuilt_only_on_change() {
        let mut filter = BilateralImageFilter::<2>::new();
        filter.set_domain_sigma_all(1.0).unwrap();
        let first = filter.tables::<u8>(&[1.0, 1.0], &[16, 16]).unwrap().domain.len();
        let stamp = filter.tables.as_ref().unwrap().modified;
        filter.tables::<u8>(&[1.0, 1.0], &[16, 16]).unwrap();
        assert_eq!(filter.tables.as_ref().unwrap().modified, stamp);

        filter.set_domain_mu(1.0).unwrap();
        let second = filter.tables::<u8>(&[1.0, 1.0], &[16, 16]).unwrap().domain.len();
        assert!(second < first);
        assert!(filter.tables.as_ref().unwrap().modified > stamp);
    }
}
