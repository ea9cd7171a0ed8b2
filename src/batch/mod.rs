//! Batch orchestration.
//!
//! [`BatchProcessor`] walks an input directory, renders the watermark onto
//! every image it finds and writes the results, isolating failures per file.
//! A broken image never stops the run; it becomes a [`FailureRecord`] in the
//! returned [`RunSummary`].
//!
//! # Example
//!
//! ```no_run
//! use watermill::batch::BatchProcessor;
//! use watermill::output::OutputPolicy;
//! use watermill::watermark::{WatermarkPosition, WatermarkSpec};
//!
//! let spec = WatermarkSpec::text("(c) ACME").with_position(WatermarkPosition::Center);
//! let policy = OutputPolicy::Mirrored { output_root: "out".into(), prefix: None, suffix: None };
//! let summary = BatchProcessor::new(spec, policy)?.recursive(true).run("photos")?;
//! println!("{}", summary);
//! # Ok::<(), watermill::error::WatermarkError>(())
//! ```

pub mod summary;

pub use summary::{FailureRecord, FileOutcome, FileStatus, RunSummary};

use crate::constants::{DEFAULT_JOBS, MAX_JOBS};
use crate::error::WatermarkError;
use crate::locator::{ImageLocator, LocatedEntry};
use crate::output::{OutputOptions, OutputPolicy, OutputWriter};
use crate::watermark::{decode_image, WatermarkRenderer, WatermarkSpec};
use image::DynamicImage;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Cooperative cancellation flag, checked before each file.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Underlying flag, for signal handler registration.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

/// One input file bound to the run's watermark settings.
#[derive(Debug, Clone)]
pub struct ImageTask<'a> {
    pub path: PathBuf,
    pub spec: &'a WatermarkSpec,
}

impl<'a> ImageTask<'a> {
    pub fn new(path: impl Into<PathBuf>, spec: &'a WatermarkSpec) -> Self {
        Self {
            path: path.into(),
            spec,
        }
    }
}

/// Result of rendering a task, before it is written.
#[derive(Debug)]
pub enum RenderResult {
    Rendered {
        image: DynamicImage,
        output_path: PathBuf,
    },
    Failed(FailureRecord),
}

/// Reported after each file completes.
#[derive(Debug)]
pub struct Progress<'a> {
    pub done: usize,
    pub total: usize,
    pub outcome: &'a FileOutcome,
}

pub type ProgressCallback = Box<dyn Fn(&Progress<'_>) + Send + Sync>;

pub struct BatchProcessor {
    renderer: WatermarkRenderer,
    writer: OutputWriter,
    recursive: bool,
    jobs: usize,
    cancel: CancelToken,
    progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for BatchProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchProcessor")
            .field("renderer", &self.renderer)
            .field("writer", &self.writer)
            .field("recursive", &self.recursive)
            .field("jobs", &self.jobs)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl BatchProcessor {
    /// Validate the spec and prepare the renderer. Fails with a configuration
    /// error before any file is touched.
    pub fn new(spec: WatermarkSpec, policy: OutputPolicy) -> Result<Self, WatermarkError> {
        let renderer = WatermarkRenderer::new(&spec)?;
        Ok(Self {
            renderer,
            writer: OutputWriter::new(policy, OutputOptions::default()),
            recursive: false,
            jobs: DEFAULT_JOBS,
            cancel: CancelToken::new(),
            progress: None,
        })
    }

    pub fn with_output_options(mut self, options: OutputOptions) -> Self {
        self.writer = OutputWriter::new(self.writer.policy().clone(), options);
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Worker count; 1 runs sequentially on the calling thread.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.clamp(1, MAX_JOBS);
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn on_progress(mut self, callback: impl Fn(&Progress<'_>) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn spec(&self) -> &WatermarkSpec {
        self.renderer.spec()
    }

    pub fn writer(&self) -> &OutputWriter {
        &self.writer
    }

    /// Watermark every image under `root`.
    ///
    /// Only configuration errors (missing root, output policy conflicting
    /// with the root) are returned; per-file failures land in the summary.
    pub fn run(&self, root: impl AsRef<Path>) -> Result<RunSummary, WatermarkError> {
        let started = Instant::now();
        let root = root.as_ref();

        let mut locator = ImageLocator::new(root, self.recursive)?;
        self.writer.validate(root)?;
        if let Some(dir) = self.writer.policy().excluded_dir() {
            locator = locator.exclude(dir);
        }

        let mut summary = RunSummary::new();
        let mut paths = Vec::new();
        for entry in locator.entries() {
            match entry {
                LocatedEntry::Image(path) => paths.push(path),
                LocatedEntry::Skipped { path, reason } => {
                    tracing::debug!(path = %path.display(), reason = ?reason, "Skipping entry");
                    summary.record_skipped();
                }
            }
        }
        paths.sort();
        paths.dedup();

        tracing::info!(
            root = %root.display(),
            images = paths.len(),
            jobs = self.jobs,
            recursive = self.recursive,
            "Starting watermark run"
        );

        let outcomes = if self.jobs > 1 && paths.len() > 1 {
            self.run_parallel(&paths, root)
        } else {
            self.run_sequential(&paths, root)
        };

        for outcome in outcomes {
            summary.record(outcome);
        }
        summary.elapsed = started.elapsed();

        tracing::info!(
            processed = summary.processed,
            skipped = summary.skipped,
            failed = summary.failed,
            cancelled = summary.cancelled,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Watermark run finished"
        );

        Ok(summary)
    }

    fn run_sequential(&self, paths: &[PathBuf], root: &Path) -> Vec<FileOutcome> {
        let done = AtomicUsize::new(0);
        paths
            .iter()
            .map(|path| self.process(path, root, &done, paths.len()))
            .collect()
    }

    fn run_parallel(&self, paths: &[PathBuf], root: &Path) -> Vec<FileOutcome> {
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .thread_name(|i| format!("watermill-worker-{}", i))
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to build worker pool, processing sequentially");
                return self.run_sequential(paths, root);
            }
        };

        let done = AtomicUsize::new(0);
        pool.install(|| {
            paths
                .par_iter()
                .map(|path| self.process(path, root, &done, paths.len()))
                .collect()
        })
    }

    fn process(&self, path: &Path, root: &Path, done: &AtomicUsize, total: usize) -> FileOutcome {
        let outcome = if self.cancel.is_cancelled() {
            tracing::debug!(path = %path.display(), "Run cancelled, skipping");
            FileOutcome::cancelled(path)
        } else {
            let task = ImageTask::new(path, self.renderer.spec());
            let rendered = self.render_task(&task, root);
            self.write_result(&task, rendered)
        };

        let done = done.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(callback) = &self.progress {
            callback(&Progress {
                done,
                total,
                outcome: &outcome,
            });
        }
        outcome
    }

    /// Decode and watermark one file.
    pub fn render_task(&self, task: &ImageTask<'_>, root: &Path) -> RenderResult {
        let result = self
            .writer
            .destination(&task.path, root)
            .and_then(|output_path| {
                let source = decode_image(&task.path)?;
                let context = self.renderer.context_for(&task.path);
                let image = self.renderer.render_with(&source, &context)?;
                Ok((image, output_path))
            });

        match result {
            Ok((image, output_path)) => RenderResult::Rendered { image, output_path },
            Err(e) => RenderResult::Failed(FailureRecord::from_error(&task.path, &e)),
        }
    }

    fn write_result(&self, task: &ImageTask<'_>, rendered: RenderResult) -> FileOutcome {
        let outcome = match rendered {
            RenderResult::Rendered { image, output_path } => {
                match self.writer.write_to(&image, &task.path, &output_path) {
                    Ok(()) => FileOutcome::written(&task.path, output_path),
                    Err(e) => FileOutcome::failed(FailureRecord::from_error(&task.path, &e)),
                }
            }
            RenderResult::Failed(record) => FileOutcome::failed(record),
        };

        match &outcome.status {
            FileStatus::Written(output) => {
                tracing::debug!(
                    path = %task.path.display(),
                    output = %output.display(),
                    "Watermarked image"
                );
            }
            FileStatus::Failed(record) => {
                tracing::warn!(
                    path = %record.path.display(),
                    kind = %record.kind,
                    error = %record.message,
                    "Failed to watermark image"
                );
            }
            FileStatus::Cancelled => {}
        }
        outcome
    }
}

/// Watermark every image directly under `root` with default output options.
pub fn run(
    root: impl AsRef<Path>,
    spec: WatermarkSpec,
    policy: OutputPolicy,
) -> Result<RunSummary, WatermarkError> {
    BatchProcessor::new(spec, policy)?.run(root)
}
