//! Batch variant generation.
//!
//! A batch takes an ordered list of source images and an ordered list of
//! target sizes and produces one output file per (source, size) pair:
//!
//! ```text
//! destination/
//! ├── 1200x600/
//! │   ├── beach.jpg
//! │   └── harbour.jpg
//! └── 300x200/
//!     ├── beach.jpg
//!     └── harbour.jpg
//! ```
//!
//! ## Work Order
//!
//! Sources are processed in list order and sizes in catalog order. Each
//! source is decoded once and reused for all of its sizes. Every
//! (source, size) pair is one item: it either writes a file or fails on its
//! own, and a failing item never aborts the run. A source that cannot be
//! decoded fails each of its items.
//!
//! ## Events
//!
//! Progress is reported as [`ProcessEvent`] values over an optional
//! `mpsc::Sender`. A started run always ends with
//! [`ProcessEvent::Completed`], even when every item failed or the run was
//! cancelled. A run refused up front (no sources, no sizes, a zero-sized
//! target) emits a single [`ProcessEvent::Stopped`] and returns an error.
//!
//! ## Isolation
//!
//! The overlay configuration travels as an `Arc<OverlayState>` snapshot taken
//! when the [`BatchRequest`] is built, so a session can keep editing its live
//! overlay while a batch runs. [`BatchRunner`] runs one batch at a time on a
//! background thread.

use crate::imaging::{
    BackendError, EncodeOptions, GeometryError, ImageBackend, render_variant,
};
use crate::naming::output_path;
use crate::overlay::{Compositor, OverlayState};
use crate::types::{NormalizedPoint, TargetSize};
use image::DynamicImage;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("No source images to process")]
    NoSources,
    #[error("No output sizes selected")]
    NoSizes,
    #[error("Invalid target size: {0}")]
    Geometry(#[from] GeometryError),
    #[error("A batch is already running")]
    AlreadyRunning,
    #[error("Failed to start batch worker: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Batch worker panicked")]
    WorkerPanicked,
}

/// Which sources get a custom crop focus.
///
/// Resolved per source at run time; sources without a focus are cropped
/// around their center.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CropPolicy {
    #[default]
    None,
    /// Every source uses the same focus.
    AllFiles(NormalizedPoint),
    /// Only the listed sources get a focus.
    PerFile(BTreeMap<PathBuf, NormalizedPoint>),
}

impl CropPolicy {
    /// Per-file policy keyed by [`policy_key`], so `./a.jpg` and `a.jpg`
    /// name the same source.
    pub fn per_file(entries: impl IntoIterator<Item = (PathBuf, NormalizedPoint)>) -> Self {
        Self::PerFile(
            entries
                .into_iter()
                .map(|(path, p)| (policy_key(&path), p))
                .collect(),
        )
    }

    pub fn resolve(&self, source: &Path) -> Option<NormalizedPoint> {
        match self {
            Self::None => None,
            Self::AllFiles(p) => Some(*p),
            Self::PerFile(map) => map
                .get(source)
                .or_else(|| map.get(&policy_key(source)))
                .copied(),
        }
    }
}

/// `path` without `.` components.
pub fn policy_key(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Everything a batch needs, frozen at request time.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub sources: Vec<PathBuf>,
    pub sizes: Vec<TargetSize>,
    pub destination: PathBuf,
    pub overlay: Arc<OverlayState>,
    pub crop: CropPolicy,
    pub encode: EncodeOptions,
}

impl BatchRequest {
    pub fn new(sources: Vec<PathBuf>, sizes: Vec<TargetSize>, destination: impl Into<PathBuf>) -> Self {
        Self {
            sources,
            sizes,
            destination: destination.into(),
            overlay: Arc::new(OverlayState::default()),
            crop: CropPolicy::None,
            encode: EncodeOptions::default(),
        }
    }

    /// Snapshot `overlay` for this request.
    pub fn with_overlay(mut self, overlay: &OverlayState) -> Self {
        self.overlay = Arc::new(overlay.clone());
        self
    }

    pub fn with_crop(mut self, crop: CropPolicy) -> Self {
        self.crop = crop;
        self
    }

    pub fn with_encode(mut self, encode: EncodeOptions) -> Self {
        self.encode = encode;
        self
    }

    pub fn total_items(&self) -> usize {
        self.sources.len() * self.sizes.len()
    }

    /// Reject requests that cannot produce any output.
    pub fn validate(&self) -> Result<(), ProcessError> {
        if self.sources.is_empty() {
            return Err(ProcessError::NoSources);
        }
        if self.sizes.is_empty() {
            return Err(ProcessError::NoSizes);
        }
        for size in &self.sizes {
            if size.check().is_err() {
                return Err(GeometryError::EmptyTarget(size.width, size.height).into());
            }
        }
        Ok(())
    }
}

/// Outcome of one (source, size) item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Written {
        path: PathBuf,
        original_bytes: u64,
        output_bytes: u64,
        focus_applied: bool,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemResult {
    pub source: PathBuf,
    pub size: TargetSize,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

impl ItemResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Written { .. })
    }
}

/// Aggregate result of a run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: bool,
    pub results: Vec<ItemResult>,
}

impl BatchSummary {
    fn record(&mut self, result: ItemResult) {
        self.completed += 1;
        if result.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(result);
    }

    /// Every queued item was written.
    pub fn all_succeeded(&self) -> bool {
        !self.cancelled && self.failed == 0 && self.completed == self.total
    }

    /// `(original, output)` byte totals over the written items.
    pub fn byte_totals(&self) -> (u64, u64) {
        self.results
            .iter()
            .filter_map(|r| match r.outcome {
                ItemOutcome::Written {
                    original_bytes,
                    output_bytes,
                    ..
                } => Some((original_bytes, output_bytes)),
                ItemOutcome::Failed { .. } => None,
            })
            .fold((0, 0), |(a, b), (o, w)| (a + o, b + w))
    }
}

/// Progress report emitted while a batch runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    Queued {
        sources: usize,
        total: usize,
    },
    ItemProcessed {
        completed: usize,
        total: usize,
        source: PathBuf,
        size: TargetSize,
        output: PathBuf,
        original_bytes: u64,
        output_bytes: u64,
        focus_applied: bool,
        overlays: bool,
    },
    ItemFailed {
        completed: usize,
        total: usize,
        source: PathBuf,
        size: TargetSize,
        error: String,
    },
    /// `completed / total × 100`, after every item.
    Progress {
        percent: u32,
    },
    /// The run was refused before any work.
    Stopped {
        reason: String,
    },
    Completed {
        summary: BatchSummary,
    },
}

/// Cooperative cancellation flag, checked before every item.
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
}

#[derive(Error, Debug)]
enum ItemError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

fn emit(events: &Option<Sender<ProcessEvent>>, event: ProcessEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is listening.
        let _ = tx.send(event);
    }
}

fn percent(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    (completed * 100 / total) as u32
}

/// Resize, composite, encode and write one item.
fn process_item(
    backend: &impl ImageBackend,
    request: &BatchRequest,
    compositor: &mut Compositor,
    image: &DynamicImage,
    source: &Path,
    size: &TargetSize,
    focus: Option<NormalizedPoint>,
) -> Result<(PathBuf, u64), ItemError> {
    let params = request
        .encode
        .params_for(source)
        .ok_or_else(|| BackendError::UnsupportedFormat(source.display().to_string()))?;
    let variant = render_variant(image, size, focus, &request.overlay, compositor)?;
    let output = output_path(&request.destination, size, source, request.encode.format);
    let written = backend.encode(&variant, &output, &params)?;
    Ok((output, written))
}

/// Run a batch synchronously on the calling thread.
///
/// Per-item failures are reported through events and the summary; only a
/// request that cannot start returns `Err`.
pub fn run_batch(
    backend: &impl ImageBackend,
    request: &BatchRequest,
    compositor: &mut Compositor,
    events: Option<Sender<ProcessEvent>>,
    cancel: &CancelToken,
) -> Result<BatchSummary, ProcessError> {
    if let Err(e) = request.validate() {
        warn!(error = %e, "Batch refused");
        emit(&events, ProcessEvent::Stopped {
            reason: e.to_string(),
        });
        return Err(e);
    }

    let total = request.total_items();
    let mut summary = BatchSummary {
        total,
        ..BatchSummary::default()
    };
    let overlays = request.overlay.any_enabled();

    info!(
        sources = request.sources.len(),
        sizes = request.sizes.len(),
        total,
        destination = %request.destination.display(),
        "Batch started"
    );
    emit(&events, ProcessEvent::Queued {
        sources: request.sources.len(),
        total,
    });

    'sources: for source in &request.sources {
        if cancel.is_cancelled() {
            summary.cancelled = true;
            break;
        }
        let decoded = backend.decode(source);
        let original_bytes = match &decoded {
            Ok(_) => backend.byte_size(source).unwrap_or_else(|e| {
                warn!(source = %source.display(), error = %e, "Could not read source size");
                0
            }),
            Err(e) => {
                warn!(source = %source.display(), error = %e, "Source could not be decoded");
                0
            }
        };
        let focus = request.crop.resolve(source);

        for size in &request.sizes {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break 'sources;
            }

            let outcome = match &decoded {
                Ok(image) => process_item(backend, request, compositor, image, source, size, focus)
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };

            let result = match outcome {
                Ok((output, output_bytes)) => {
                    debug!(
                        source = %source.display(),
                        size = %size,
                        output = %output.display(),
                        output_bytes,
                        "Variant written"
                    );
                    ItemResult {
                        source: source.clone(),
                        size: size.clone(),
                        outcome: ItemOutcome::Written {
                            path: output,
                            original_bytes,
                            output_bytes,
                            focus_applied: focus.is_some(),
                        },
                    }
                }
                Err(error) => {
                    warn!(source = %source.display(), size = %size, %error, "Variant failed");
                    ItemResult {
                        source: source.clone(),
                        size: size.clone(),
                        outcome: ItemOutcome::Failed { error },
                    }
                }
            };

            summary.record(result.clone());
            let completed = summary.completed;
            let event = match result.outcome {
                ItemOutcome::Written {
                    path,
                    original_bytes,
                    output_bytes,
                    focus_applied,
                } => ProcessEvent::ItemProcessed {
                    completed,
                    total,
                    source: result.source,
                    size: result.size,
                    output: path,
                    original_bytes,
                    output_bytes,
                    focus_applied,
                    overlays,
                },
                ItemOutcome::Failed { error } => ProcessEvent::ItemFailed {
                    completed,
                    total,
                    source: result.source,
                    size: result.size,
                    error,
                },
            };
            emit(&events, event);
            emit(&events, ProcessEvent::Progress {
                percent: percent(completed, total),
            });
        }
    }

    info!(
        completed = summary.completed,
        succeeded = summary.succeeded,
        failed = summary.failed,
        cancelled = summary.cancelled,
        "Batch finished"
    );
    emit(&events, ProcessEvent::Completed {
        summary: summary.clone(),
    });
    Ok(summary)
}

/// Clears the runner's busy flag when the worker ends, however it ends.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Runs batches on a background thread, one at a time.
pub struct BatchRunner<B> {
    backend: Arc<B>,
    busy: Arc<AtomicBool>,
}

impl<B: ImageBackend + Send + 'static> BatchRunner<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Start `request` on a worker thread.
    ///
    /// Fails with [`ProcessError::AlreadyRunning`] while a previous batch is
    /// still in flight.
    pub fn start(&self, request: BatchRequest, compositor: Compositor) -> Result<BatchHandle, ProcessError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ProcessError::AlreadyRunning);
        }
        let guard = BusyGuard(Arc::clone(&self.busy));

        let (tx, rx) = mpsc::channel();
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let backend = Arc::clone(&self.backend);

        let join = std::thread::Builder::new()
            .name("webcrop-batch".to_string())
            .spawn(move || {
                let _guard = guard;
                let mut compositor = compositor;
                run_batch(
                    backend.as_ref(),
                    &request,
                    &mut compositor,
                    Some(tx),
                    &worker_cancel,
                )
            })?;

        Ok(BatchHandle {
            events: rx,
            cancel,
            join,
        })
    }
}

/// A running batch.
pub struct BatchHandle {
    events: Receiver<ProcessEvent>,
    cancel: CancelToken,
    join: JoinHandle<Result<BatchSummary, ProcessError>>,
}

impl BatchHandle {
    /// Event stream; ends when the worker finishes.
    pub fn events(&self) -> &Receiver<ProcessEvent> {
        &self.events
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Block until the worker ends and return its result.
    pub fn wait(self) -> Result<BatchSummary, ProcessError> {
        self.join.join().map_err(|_| ProcessError::WorkerPanicked)?
    }
}
