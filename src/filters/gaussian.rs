//! Spatial Gaussian smoothing.
//!
//! Shares the domain kernel of the bilateral filter but has no intensity
//! term, so it blurs across edges. Mostly useful as a reference.

use crate::core::buffer::ImageInformation;
use crate::core::context::ComputeContext;
use crate::core::error::{PipelineError, PipelineResult};
use crate::core::node::{Category, NodeMetadata, PipelineNode};
use crate::core::pixel::Pixel;
use crate::core::region::Region;
use crate::core::time::ModifiedTime;
use crate::core::types::Value;
use crate::filters::bilateral::{is_positive, non_negative, type_mismatch, DEFAULT_DOMAIN_MU, DEFAULT_DOMAIN_SIGMA};
use crate::filters::kernel::DomainKernel;
use std::any::Any;

/// Gaussian smoothing node with a truncated, renormalized kernel.
#[derive(Debug)]
pub struct GaussianSmoothingFilter<const D: usize> {
    sigma: [f64; D],
    mu: f64,
    filter_dimensionality: usize,
    modified: ModifiedTime,
}

impl<const D: usize> Default for GaussianSmoothingFilter<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const D: usize> GaussianSmoothingFilter<D> {
    pub fn new() -> Self {
        Self {
            sigma: [DEFAULT_DOMAIN_SIGMA; D],
            mu: DEFAULT_DOMAIN_MU,
            filter_dimensionality: D,
            modified: ModifiedTime::new(),
        }
    }

    pub fn domain_sigma(&self) -> [f64; D] {
        self.sigma
    }

    pub fn set_domain_sigma(&mut self, sigma: [f64; D]) -> PipelineResult<()> {
        if let Some(bad) = sigma.iter().find(|&&s| !is_positive(s)) {
            return Err(PipelineError::parameter(
                "domain_sigma",
                format!("must be positive, got {}", bad),
            ));
        }
        if sigma != self.sigma {
            self.sigma = sigma;
            self.modified.modified();
        }
        Ok(())
    }

    pub fn set_domain_sigma_all(&mut self, sigma: f64) -> PipelineResult<()> {
        self.set_domain_sigma([sigma; D])
    }

    pub fn domain_mu(&self) -> f64 {
        self.mu
    }

    pub fn set_domain_mu(&mut self, mu: f64) -> PipelineResult<()> {
        if !is_positive(mu) {
            return Err(PipelineError::parameter(
                "domain_mu",
                format!("must be positive, got {}", mu),
            ));
        }
        if mu != self.mu {
            self.mu = mu;
            self.modified.modified();
        }
        Ok(())
    }

    pub fn filter_dimensionality(&self) -> usize {
        self.filter_dimensionality
    }

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
}

impl<P: Pixel, const D: usize> PipelineNode<P, D> for GaussianSmoothingFilter<D> {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("gaussian", "Gaussian Smoothing")
            .category(Category::Smoothing)
            .description("Spatial Gaussian blur with a truncated kernel")
            .inputs(1)
            .parameter("domain_sigma")
            .parameter("domain_mu")
            .parameter("filter_dimensionality")
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
        let mut radius = DomainKernel::radius_for(&self.sigma, self.mu, self.filter_dimensionality, &input.spacing)?;
        for (axis, extent) in largest.size().into_iter().enumerate() {
            radius[axis] = radius[axis].min(extent);
        }
        Ok(vec![output_region
            .padded_by(&radius)
            .cropped_to(&largest)
            .unwrap_or_default()])
    }

    fn compute(&mut self, ctx: &mut ComputeContext<'_, P, D>) -> PipelineResult<()> {
        let input = ctx.input(0)?;
        let information = input.information();
        let kernel = DomainKernel::build_within(
            &self.sigma,
            self.mu,
            self.filter_dimensionality,
            &information.spacing,
            &information.largest_possible_region.size(),
        )?;

        ctx.dispatch(|chunk| {
            for (index, value) in chunk.pixels_mut() {
                let center = input.get(&index).unwrap_or_default().to_f64();
                let mut weight_sum = 0.0;
                let mut delta_sum = 0.0;
                for entry in kernel.entries() {
                    let mut neighbor = index;
                    for axis in 0..D {
                        neighbor[axis] += entry.offset[axis];
                    }
                    if let Some(sample) = input.get(&neighbor) {
                        weight_sum += entry.weight;
                        delta_sum += entry.weight * (sample.to_f64() - center);
                    }
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
            "domain_sigma" => match value.as_float_list().as_deref() {
                Some([sigma]) => self.set_domain_sigma_all(*sigma),
                Some(list) => {
                    let sigma: [f64; D] = list.try_into().map_err(|_| {
                        PipelineError::parameter(
                            name,
                            format!("expected 1 or {} values, got {}", D, list.len()),
                        )
                    })?;
                    self.set_domain_sigma(sigma)
                }
                None => Err(type_mismatch(name, "float or list of floats", value)),
            },
            "domain_mu" => self.set_domain_mu(
                value
                    .as_float()
                    .ok_or_else(|| type_mismatch(name, "float", value))?,
            ),
            "filter_dimensionality" => self.set_filter_dimensionality(non_negative(name, value)?),
            _ => Err(PipelineError::parameter(
                name,
                "gaussian filter has no such parameter",
            )),
        }
    }

    fn parameters(&self) -> Vec<(String, Value)> {
        vec![
            ("domain_sigma".to_string(), Value::FloatList(self.sigma.to_vec())),
            ("domain_mu".to_string(), Value::Float(self.mu)),
            (
                "filter_dimensionality".to_string(),
                Value::Integer(self.filter_dimensionality as i64),
            ),
        ]
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
    use crate::core::buffer::ImageBuffer;
    use crate::core::error::NodeId;
    use crate::execution::dispatcher::Dispatcher;
    use std::sync::Arc;

    #[test]
    fn test_blurs_a_step() {
        let info = ImageInformation::new(Region::from_size([8, 1]));
        let input = Arc::new(ImageBuffer::<f64, 2>::from_fn(info.clone(), |index| {
            if index[0] < 4 { 0.0 } else { 1.0 }
        }));
        let mut output = ImageBuffer::allocate(NodeId::new(), info, Region::from_size([8, 1])).unwrap();

        let mut filter = GaussianSmoothingFilter::<2>::new();
        filter.set_domain_sigma_all(1.0).unwrap();
        let dispatcher = Dispatcher::with_threads(2).unwrap();
        let inputs = [input];
        let mut ctx = ComputeContext::new(NodeId::new(), &inputs, &mut output, &dispatcher);
        filter.compute(&mut ctx).unwrap();

        let left = output.get(&[3, 0]).unwrap();
        let right = output.get(&[4, 0]).unwrap();
        assert!(left > 0.0 && left < 0.5);
        assert!(right > 0.5 && right < 1.0);
        // Far from the step and the border nothing changes much
        assert!(output.get(&[0, 0]).unwrap() < 0.05);
    }

    #[test]
    fn test_huge_sigma_requests_whole_input() {
        let mut filter = GaussianSmoothingFilter::<2>::new();
        filter.set_domain_sigma_all(f64::MAX).unwrap();
        let info = ImageInformation::new(Region::from_size([6, 4]));
        let padded = <GaussianSmoothingFilter<2> as PipelineNode<u8, 2>>::generate_input_requested_region(
            &filter,
            &Region::new([1, 1], [1, 1]),
            &[&info],
        )
        .unwrap();
        assert_eq!(padded, vec![Region::from_size([6, 4])]);
    }

    #[test]
    fn test_rejects_bad_sigma() {
        let mut filter = GaussianSmoothingFilter::<2>::new();
        assert!(filter.set_domain_sigma([1.0, -1.0]).is_err());
        assert!(filter.set_domain_mu(0.0).is_err());
        assert_eq!(filter.domain_sigma(), [DEFAULT_DOMAIN_SIGMA; 2]);
    }
}
