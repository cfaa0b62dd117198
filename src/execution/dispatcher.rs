//! Worker dispatch for per-pixel computation.
//!
//! A region is split along its slowest-varying axis into contiguous blocks
//! whose sizes differ by at most one. Because the split axis is the
//! outermost one with extent greater than one, every block maps to a
//! contiguous run of the output buffer, so each worker receives its own
//! `&mut [P]` and no locking is needed.
//!
//! # Example
//!
//! ```ignore
//! let dispatcher = Dispatcher::with_threads(4)?;
//! dispatcher.dispatch(&mut output, |chunk| {
//!     for (index, value) in chunk.pixels_mut() {
//!         *value = compute(index);
//!     }
//!     Ok(())
//! })?;
//! ```

use crate::core::buffer::ImageBuffer;
use crate::core::error::{PipelineError, PipelineResult};
use crate::core::pixel::Pixel;
use crate::core::region::{Index, Region};
use log::trace;
use rayon::prelude::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// One disjoint piece of the output handed to a single worker.
pub struct OutputChunk<'a, P: Pixel, const D: usize> {
    /// Position of this chunk in split order.
    pub chunk_index: usize,
    region: Region<D>,
    data: &'a mut [P],
}

impl<'a, P: Pixel, const D: usize> OutputChunk<'a, P, D> {
    /// Region this chunk covers.
    pub fn region(&self) -> &Region<D> {
        &self.region
    }

    /// Samples of this chunk in memory order.
    pub fn data_mut(&mut self) -> &mut [P] {
        &mut *self.data
    }

    /// Iterate over `(index, sample)` pairs of the chunk.
    pub fn pixels_mut(&mut self) -> impl Iterator<Item = (Index<D>, &mut P)> + '_ {
        self.region.indices().zip(self.data.iter_mut())
    }
}

/// Partitions regions and runs chunk computations concurrently.
#[derive(Clone)]
pub struct Dispatcher {
    pool: Option<Arc<rayon::ThreadPool>>,
    threads: usize,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("threads", &self.threads)
            .field("dedicated_pool", &self.pool.is_some())
            .finish()
    }
}

impl Dispatcher {
    /// Use the global pool sized to the available hardware concurrency.
    pub fn new() -> Self {
        Self {
            pool: None,
            threads: rayon::current_num_threads().max(1),
        }
    }

    /// Use a dedicated pool with `threads` workers (0 = hardware concurrency).
    pub fn with_threads(threads: usize) -> PipelineResult<Self> {
        if threads == 0 {
            return Ok(Self::new());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("strata-worker-{}", i))
            .build()
            .map_err(|e| PipelineError::Config(format!("failed to build worker pool: {}", e)))?;
        Ok(Self {
            pool: Some(Arc::new(pool)),
            threads,
        })
    }

    /// Upper bound on the number of chunks per dispatch.
    pub fn thread_count(&self) -> usize {
        self.threads
    }

    /// Split `region` into at most `chunks` disjoint blocks along its split axis.
    ///
    /// The blocks cover `region` exactly, appear in memory order, and differ
    /// in extent by at most one. No block is empty.
    pub fn split_region<const D: usize>(region: &Region<D>, chunks: usize) -> Vec<Region<D>> {
        if region.is_empty() || D == 0 {
            return Vec::new();
        }
        let axis = split_axis(region);
        let extent = region.size()[axis];
        let count = chunks.clamp(1, extent);
        let base = extent / count;
        let remainder = extent % count;

        let mut pieces = Vec::with_capacity(count);
        let mut start = region.index()[axis];
        for i in 0..count {
            let length = base + usize::from(i < remainder);
            let mut index = region.index();
            let mut size = region.size();
            index[axis] = start;
            size[axis] = length;
            pieces.push(Region::new(index, size));
            start += length as i64;
        }
        pieces
    }

    /// Run `f` over disjoint chunks of `output`'s buffered region and join.
    ///
    /// All chunks run to completion even if some fail; the error of the
    /// first failing chunk in split order is returned afterwards.
    pub fn dispatch<P, const D: usize, F>(&self, output: &mut ImageBuffer<P, D>, f: F) -> PipelineResult<()>
    where
        P: Pixel,
        F: Fn(&mut OutputChunk<'_, P, D>) -> PipelineResult<()> + Send + Sync,
    {
        let region = *output.buffered_region();
        let pieces = Self::split_region(&region, self.threads);
        if pieces.is_empty() {
            return Ok(());
        }
        trace!("dispatching {} into {} chunk(s)", region, pieces.len());

        let mut chunks = Vec::with_capacity(pieces.len());
        let mut rest = output.as_mut_slice();
        for (chunk_index, piece) in pieces.into_iter().enumerate() {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(piece.number_of_pixels());
            chunks.push(OutputChunk {
                chunk_index,
                region: piece,
                data: head,
            });
            rest = tail;
        }

        let run = || {
            chunks
                .into_par_iter()
                .map(|mut chunk| {
                    let chunk_index = chunk.chunk_index;
                    match catch_unwind(AssertUnwindSafe(|| f(&mut chunk))) {
                        Ok(Ok(())) => Ok(()),
                        Ok(Err(error)) => Err(PipelineError::Worker {
                            chunk: chunk_index,
                            source: Box::new(error),
                        }),
                        Err(payload) => Err(PipelineError::WorkerPanic {
                            chunk: chunk_index,
                            message: panic_message(payload.as_ref()),
                        }),
                    }
                })
                .collect::<Vec<_>>()
        };

        let results = match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        };
        results.into_iter().collect()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Outermost axis with extent greater than one, else the last axis.
fn split_axis<const D: usize>(region: &Region<D>) -> usize {
    let size = region.size();
    (0..D).rev().find(|&axis| size[axis] > 1).unwrap_or(D - 1)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::buffer::ImageInformation;
    use crate::core::error::NodeId;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn output(size: [usize; 2]) -> ImageBuffer<i32, 2> {
        let info = ImageInformation::new(Region::from_size(size));
        ImageBuffer::allocate(NodeId::new(), info, Region::from_size(size)).unwrap()
    }

    #[test]
    fn test_split_sizes_differ_by_at_most_one() {
        let region = Region::new([0, 3], [5, 10]);
        let pieces = Dispatcher::split_region(&region, 4);
        let sizes: Vec<_> = pieces.iter().map(|p| p.size()[1]).collect();
        assert_eq!(sizes, vec![3, 3, 2, 2]);
        assert_eq!(pieces[0].index(), [0, 3]);
        assert_eq!(pieces[3].index(), [0, 11]);
    }

    #[test]
    fn test_split_never_creates_empty_chunks() {
        let region = Region::new([0, 0], [8, 3]);
        assert_eq!(Dispatcher::split_region(&region, 16).len(), 3);
        assert!(Dispatcher::split_region(&Region::<2>::from_size([4, 0]), 4).is_empty());
    }

    #[test]
    fn test_split_skips_unit_outer_axes() {
        let region = Region::new([0, 0, 7], [6, 4, 1]);
        let pieces = Dispatcher::split_region(&region, 2);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].size(), [6, 2, 1]);
        assert_eq!(pieces[1].index(), [0, 2, 7]);
    }

    #[test]
    fn test_dispatch_writes_every_pixel_once() {
        let dispatcher = Dispatcher::with_threads(3).unwrap();
        let mut image = output([7, 5]);
        let calls = AtomicUsize::new(0);
        dispatcher
            .dispatch(&mut image, |chunk| {
                calls.fetch_add(1, Ordering::Relaxed);
                for (index, value) in chunk.pixels_mut() {
                    *value += (index[0] + 10 * index[1]) as i32 + 1;
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 3);
        for (index, value) in image.pixels_in(&Region::from_size([7, 5])) {
            assert_eq!(value, (index[0] + 10 * index[1]) as i32 + 1);
        }
    }

    #[test]
    fn test_dispatch_joins_all_before_reporting_first_error() {
        let dispatcher = Dispatcher::with_threads(4).unwrap();
        let mut image = output([2, 8]);
        let finished = AtomicUsize::new(0);
        let result = dispatcher.dispatch(&mut image, |chunk| {
            finished.fetch_add(1, Ordering::SeqCst);
            if chunk.chunk_index >= 1 {
                return Err(PipelineError::Config(format!("chunk {}", chunk.chunk_index)));
            }
            Ok(())
        });
        assert_eq!(finished.load(Ordering::SeqCst), 4);
        match result {
            Err(PipelineError::Worker { chunk, source }) => {
                assert_eq!(chunk, 1);
                assert!(source.to_string().contains("chunk 1"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_dispatch_converts_panics() {
        let dispatcher = Dispatcher::with_threads(2).unwrap();
        let mut image = output([2, 2]);
        let result = dispatcher.dispatch(&mut image, |chunk| {
            if chunk.chunk_index == 1 {
                panic!("worker exploded");
            }
            Ok(())
        });
        assert!(matches!(
            result,
            Err(PipelineError::WorkerPanic { chunk: 1, ref message }) if message.contains("exploded")
        ));
    }

    proptest! {
        #[test]
        fn prop_split_covers_region_exactly(
            x in -5i64..5, y in -5i64..5, w in 1usize..20, h in 1usize..20, chunks in 1usize..12,
        ) {
            let region = Region::new([x, y], [w, h]);
            let pieces = Dispatcher::split_region(&region, chunks);
            let total: usize = pieces.iter().map(|p| p.number_of_pixels()).sum();
            prop_assert_eq!(total, region.number_of_pixels());
            for (i, piece) in pieces.iter().enumerate() {
                prop_assert!(!piece.is_empty());
                prop_assert!(piece.is_subset_of(&region));
                for other in &pieces[i + 1..] {
                    prop_assert!(piece.intersection(other).is_none());
                }
            }
        }
    }
}
