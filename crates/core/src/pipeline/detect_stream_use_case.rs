use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::error::StreamError;
use crate::pipeline::invoker::DetectionInvoker;
use crate::pipeline::run_config::RunConfig;
use crate::pipeline::stream_logger::StreamLogger;
use crate::sink::domain::display_sink::DisplaySink;
use crate::source::domain::frame_source::FrameSource;

/// Lifecycle of a run. A run is `Idle` until its source and sink are both
/// open, then `Running` until the stream ends, the flag cancels it, or a
/// component fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Counters for a finished run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_processed: usize,
    pub detections_total: usize,
}

/// Orchestrates one detection run: source → invoker → sink, frame by frame.
///
/// Single-use: `execute` drives one run to completion and the struct is
/// done. Cancellation is cooperative via the shared flag, checked once
/// per iteration; a cancelled run counts as completed, not failed.
pub struct DetectStreamUseCase {
    source: Box<dyn FrameSource>,
    invoker: DetectionInvoker,
    sink: Box<dyn DisplaySink>,
    logger: Box<dyn StreamLogger>,
    config: RunConfig,
    cancelled: Arc<AtomicBool>,
    state: RunState,
}

impl DetectStreamUseCase {
    pub fn new(
        source: Box<dyn FrameSource>,
        invoker: DetectionInvoker,
        sink: Box<dyn DisplaySink>,
        logger: Box<dyn StreamLogger>,
        config: RunConfig,
        cancelled: Option<Arc<AtomicBool>>,
    ) -> Self {
        Self {
            source,
            invoker,
            sink,
            logger,
            config,
            cancelled: cancelled.unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn execute(&mut self, target: &Path) -> Result<RunSummary, StreamError> {
        if self.state != RunState::Idle {
            return Err(StreamError::Config("run already started".into()));
        }
        self.config.validate()?;

        // An unopenable target leaves the run Idle: nothing was acquired,
        // so there is nothing to tear down.
        let metadata = self.source.open(target)?;

        if let Err(e) = self.sink.open(&metadata) {
            self.source.close();
            self.state = RunState::Failed;
            return Err(e.into());
        }

        self.state = RunState::Running;
        self.logger.info(&format!(
            "streaming {}x{} from {}",
            metadata.width,
            metadata.height,
            metadata.origin.as_deref().unwrap_or("source")
        ));

        let total = metadata.total_frames;
        let result = self.run_loop(total);

        self.source.close();
        let close_result = self.sink.close();

        match (result, close_result) {
            (Ok(summary), Ok(())) => {
                self.state = RunState::Completed;
                self.logger.summary();
                Ok(summary)
            }
            (Ok(_), Err(e)) => {
                self.state = RunState::Failed;
                Err(e.into())
            }
            (Err(e), _) => {
                self.state = RunState::Failed;
                Err(e)
            }
        }
    }

    fn run_loop(&mut self, total: Option<usize>) -> Result<RunSummary, StreamError> {
        let cancelled = self.cancelled.clone();
        let max_frames = self.config.max_frames;
        let mut summary = RunSummary::default();

        let mut frames = self.source.frames();
        loop {
            if cancelled.load(Ordering::Relaxed) {
                self.logger.info("run cancelled");
                break;
            }
            let Some(next) = frames.next() else {
                break;
            };
            let frame = next?;

            let started = Instant::now();
            let (annotated, detections) = self.invoker.infer(&frame)?;
            self.logger
                .timing("detect", started.elapsed().as_secs_f64() * 1000.0);

            self.sink.push(&annotated)?;

            summary.frames_processed += 1;
            summary.detections_total += detections.len();
            self.logger.progress(summary.frames_processed, total);

            if max_frames.is_some_and(|max| summary.frames_processed >= max) {
                break;
            }
        }

        Ok(summary)
    }
}
