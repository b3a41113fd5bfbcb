//! Cancellation and background execution
//!
//! Engines are synchronous. A host that wants to keep a UI responsive runs
//! one engine per [`SegmentationTask`], which owns a blocking worker and a
//! [`CancelToken`] the engine polls between iterations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag requesting that a running segmentation stop early
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; every clone observes it
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[cfg(feature = "background")]
pub use background::SegmentationTask;

#[cfg(feature = "background")]
mod background {
    use log::debug;
    use tokio::task::JoinHandle;

    use super::CancelToken;
    use crate::error::{Result, ZoneError};
    use crate::kmeans::KMeansEngine;
    use crate::raster::Raster;
    use crate::regions::RegionSimilarityEngine;

    /// Handle to a segmentation running on tokio's blocking pool
    ///
    /// Must be spawned from within a tokio runtime.
    pub struct SegmentationTask<T> {
        handle: JoinHandle<Result<T>>,
        cancel: CancelToken,
    }

    impl<T: Send + 'static> SegmentationTask<T> {
        /// Run `job` in the background, handing it the task's cancel token
        pub fn spawn<F>(job: F) -> Self
        where
            F: FnOnce(&CancelToken) -> Result<T> + Send + 'static,
        {
            let cancel = CancelToken::new();
            let token = cancel.clone();
            let handle = tokio::task::spawn_blocking(move || job(&token));
            Self { handle, cancel }
        }

        /// Ask the job to stop at its next checkpoint
        pub fn cancel(&self) {
            debug!("Cancelling background segmentation");
            self.cancel.cancel();
        }

        pub fn cancel_token(&self) -> CancelToken {
            self.cancel.clone()
        }

        pub fn is_finished(&self) -> bool {
            self.handle.is_finished()
        }

        /// Wait for the job and return its result
        pub async fn join(self) -> Result<T> {
            self.handle
                .await
                .map_err(|e| ZoneError::TaskFailed(e.to_string()))?
        }
    }

    impl SegmentationTask<(KMeansEngine, Raster)> {
        /// Cluster `image` in the background; the engine is handed back with the result
        pub fn kmeans(mut engine: KMeansEngine, image: Raster) -> Self {
            Self::spawn(move |cancel| {
                let output = engine.run_with_cancel(&image, cancel)?;
                Ok((engine, output))
            })
        }
    }

    impl SegmentationTask<(RegionSimilarityEngine, Raster)> {
        /// Run the quadtree segmentation in the background
        pub fn regions(mut engine: RegionSimilarityEngine) -> Self {
            Self::spawn(move |cancel| {
                let output = engine.process_with_cancel(cancel)?;
                Ok((engine, output))
            })
        }
    }
}
