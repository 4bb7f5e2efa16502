use std::{
    path::PathBuf,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::{
    codec::image_codec::ImageCodec,
    foundation::error::{FramestackError, FramestackResult},
    pipeline::{
        batch::{BatchOutcome, Pipeline},
        report::Reporter,
    },
};

/// A [`Pipeline`] that several submitters can share.
///
/// Batches run one at a time: a submitter blocks until the batch ahead of it
/// reaches a terminal stage. [`SharedPipeline::close`] stops new batches from
/// starting but never interrupts the one in flight.
pub struct SharedPipeline<C, R> {
    inner: Mutex<Pipeline<C, R>>,
    closed: AtomicBool,
}

impl<C: ImageCodec, R: Reporter> SharedPipeline<C, R> {
    /// Wrap a pipeline.
    pub fn new(pipeline: Pipeline<C, R>) -> Self {
        Self {
            inner: Mutex::new(pipeline),
            closed: AtomicBool::new(false),
        }
    }

    /// Run a batch once every earlier batch has finished.
    ///
    /// Fails with [`FramestackError::Closed`] if the pipeline was closed
    /// before this batch got its turn.
    pub fn submit<I, P>(&self, paths: I) -> FramestackResult<BatchOutcome>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        if self.is_closed() {
            return Err(FramestackError::Closed);
        }
        // A panicking batch leaves no state the next batch depends on.
        let mut pipeline = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_closed() {
            return Err(FramestackError::Closed);
        }
        pipeline.process_batch(paths)
    }

    /// Refuse batches that have not started yet.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Whether [`SharedPipeline::close`] was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Unwrap the pipeline, e.g. to read its reporter.
    pub fn into_inner(self) -> Pipeline<C, R> {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/shared.rs"]
mod tests;
