use rayon::prelude::*;

use crate::{
    MockupError, MockupResult, Raster,
    pipeline::{PlacementOptions, PlacementResult, place_mockup},
    template::TemplateSpec,
};

/// One independent placement call.
#[derive(Clone, Copy, Debug)]
pub struct PlacementRequest<'a> {
    pub artwork: &'a Raster,
    pub template: &'a Raster,
    pub spec: &'a TemplateSpec,
    pub options: &'a PlacementOptions,
}

/// Bounded worker pool for batches of placements.
#[derive(Debug)]
pub struct PlacementPool {
    pool: rayon::ThreadPool,
}

impl PlacementPool {
    /// `None` sizes the pool to the available cores.
    pub fn new(threads: Option<usize>) -> MockupResult<Self> {
        if let Some(n) = threads
            && n == 0
        {
            return Err(MockupError::validation(
                "placement pool 'threads' must be >= 1 when set",
            ));
        }

        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(n) = threads {
            builder = builder.num_threads(n);
        }
        let pool = builder
            .build()
            .map_err(|e| MockupError::validation(format!("failed to build rayon thread pool: {e}")))?;
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run every request; results come back in input order and one failure
    /// doesn't affect the others.
    #[tracing::instrument(skip_all, fields(requests = requests.len(), threads = self.threads()))]
    pub fn run_batch(&self, requests: &[PlacementRequest<'_>]) -> Vec<MockupResult<PlacementResult>> {
        self.pool.install(|| {
            requests
                .par_iter()
                .map(|r| place_mockup(r.artwork, r.template, r.spec, r.options))
                .collect()
        })
    }

    /// Run `f` inside the pool, so row-parallel detection and warping use its
    /// threads too.
    pub fn install<R: Send>(&self, f: impl FnOnce() -> R + Send) -> R {
        self.pool.install(f)
    }
}
