//! Shared application state.

use std::sync::Arc;

use specscope_common::labeling::SpikeOverlapDetector;
use specscope_common::predict::Predictor;
use specscope_common::simulate::DataSource;

/// State shared across all request handlers. Built once at startup and
/// never mutated.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    predictor: Predictor,
    /// Source of simulated readings for the spectrum views.
    source: Arc<dyn DataSource>,
    detector: SpikeOverlapDetector,
}

impl AppState {
    pub fn new(predictor: Predictor, source: Arc<dyn DataSource>) -> Self {
        Self {
            inner: Arc::new(Inner {
                predictor,
                source,
                detector: SpikeOverlapDetector::default(),
            }),
        }
    }

    pub fn predictor(&self) -> &Predictor {
        &self.inner.predictor
    }

    pub fn source(&self) -> Arc<dyn DataSource> {
        Arc::clone(&self.inner.source)
    }

    pub fn detector(&self) -> SpikeOverlapDetector {
        self.inner.detector
    }
}
