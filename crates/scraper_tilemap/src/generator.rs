//! # Chunk Generator
//!
//! **Background terrain production**
//!
//! The generator appends randomly chosen templates from the weather pool to
//! the shared column store. One worker thread per level drives it:
//!
//! ```text
//!   Simulation thread                      Worker thread
//!   ─────────────────                      ─────────────
//!   grid.update()
//!     ├─ set_workload(n)   ──(atomic)──►
//!     └─ request_run()     ──(bounded(1) channel)──►  recv()
//!                                                     run() ─► append permit
//!   query_tile_type() ◄──(lock-free reads)──────────  push columns
//! ```
//!
//! A single `run()` holds the append permit for at most
//! [`RUN_COLUMN_CAP`] columns. Larger workloads stay pending and are served
//! by further runs. A template drawn but not appended because it would cross
//! the cap is held back and opens the next run, so the template sequence
//! does not depend on how the workload was split.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::column_store::ColumnStore;
use crate::error::{TileMapError, TileMapResult};
use crate::grid::GridAppender;
use crate::pool::{TemplatePool, WeatherCondition};
use crate::template::TemplateLibrary;

/// Workload after a fully served run.
pub const DEFAULT_WORKLOAD: usize = 1;

/// Largest workload a caller may request.
pub const MAX_WORKLOAD: usize = 100;

/// Most columns appended while holding the permit once.
///
/// The first template of a run is always appended, so a template wider than
/// the cap still gets placed, alone.
pub const RUN_COLUMN_CAP: usize = 30;

/// Outcome of one [`ChunkGenerator::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Templates appended.
    pub templates: usize,
    /// Columns appended.
    pub columns: usize,
    /// Templates still pending after this run.
    pub remaining: usize,
    /// Column count after the run.
    pub len: usize,
}

/// Generator statistics.
#[derive(Clone, Debug, Default)]
pub struct GeneratorStats {
    /// Calls to `run()`.
    pub runs: u64,
    /// Runs that stopped at the column cap with work left.
    pub capped_runs: u64,
    /// Templates appended by runs and seeding.
    pub templates_appended: u64,
    /// Columns appended by runs and seeding.
    pub columns_appended: u64,
}

/// Template selection state: the RNG and a pick carried over from a capped
/// run.
struct Selector {
    rng: ChaCha8Rng,
    held: Option<usize>,
}

impl Selector {
    fn next(&mut self, candidates: &[usize]) -> usize {
        match self.held.take() {
            Some(index) => index,
            None => candidates[self.rng.gen_range(0..candidates.len())],
        }
    }
}

/// Appends templates from one weather pool to a column store.
pub struct ChunkGenerator {
    library: Arc<TemplateLibrary>,
    columns: Arc<ColumnStore>,
    pool: TemplatePool,
    /// Catalog indices of the active pool.
    candidates: Vec<usize>,
    selector: Mutex<Selector>,
    workload: AtomicUsize,
    active: AtomicBool,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
    stats: Mutex<GeneratorStats>,
}

impl std::fmt::Debug for ChunkGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkGenerator")
            .field("pool", &self.pool)
            .field("candidates", &self.candidates.len())
            .field("workload", &self.workload())
            .field("active", &self.is_active())
            .field("columns", &self.columns.len())
            .finish()
    }
}

impl ChunkGenerator {
    /// Creates an inactive generator over a fresh column store.
    ///
    /// `condition` is the weather collaborator's condition string; it picks
    /// the pool. The same seed and condition always produce the same level.
    #[must_use]
    pub fn new(library: Arc<TemplateLibrary>, condition: &str, seed: u64) -> Self {
        let pool = WeatherCondition::parse(condition).pool();
        let candidates = library.pool(pool).to_vec();
        let (wake_tx, wake_rx) = crossbeam_channel::bounded(1);

        tracing::debug!(%pool, candidates = candidates.len(), seed, "chunk generator created");

        Self {
            library,
            columns: Arc::new(ColumnStore::new()),
            pool,
            candidates,
            selector: Mutex::new(Selector {
                rng: ChaCha8Rng::seed_from_u64(seed),
                held: None,
            }),
            workload: AtomicUsize::new(DEFAULT_WORKLOAD),
            active: AtomicBool::new(false),
            wake_tx,
            wake_rx,
            stats: Mutex::new(GeneratorStats::default()),
        }
    }

    /// Sets the number of templates the next run appends.
    ///
    /// # Errors
    ///
    /// Returns [`TileMapError::InvalidArgument`] unless `1 <= n <= 100`.
    pub fn set_workload(&self, n: usize) -> TileMapResult<()> {
        if !(1..=MAX_WORKLOAD).contains(&n) {
            return Err(TileMapError::InvalidArgument(format!(
                "workload {n} is outside 1..={MAX_WORKLOAD}"
            )));
        }
        self.workload.store(n, Ordering::Release);
        Ok(())
    }

    /// Returns the pending workload.
    #[inline]
    #[must_use]
    pub fn workload(&self) -> usize {
        self.workload.load(Ordering::Acquire)
    }

    /// Lets the worker serve run requests.
    pub fn activate(&self) {
        self.active.store(true, Ordering::Release);
    }

    /// Stops the worker from starting further runs. A run in flight
    /// completes.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Returns true if the worker may start runs.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Wakes the worker without blocking. Returns false if a request was
    /// already pending.
    pub fn request_run(&self) -> bool {
        match self.wake_tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) | Err(TrySendError::Disconnected(())) => false,
        }
    }

    /// Appends up to the pending workload, holding the append permit for at
    /// most [`RUN_COLUMN_CAP`] columns.
    ///
    /// # Errors
    ///
    /// Propagates append failures from the column store.
    pub fn run(&self) -> TileMapResult<RunReport> {
        let workload = self.workload();
        let mut report = RunReport::default();

        {
            let mut appender = GridAppender::lock(&self.columns, self.library.rows());
            let mut selector = self.selector.lock();

            while report.templates < workload {
                let index = selector.next(&self.candidates);
                if let Some(template) = self.library.get(index) {
                    if report.templates > 0 && report.columns + template.len() > RUN_COLUMN_CAP {
                        selector.held = Some(index);
                        break;
                    }
                    report.columns += appender.append_template(template)?;
                }
                report.templates += 1;
            }
            report.len = appender.len();
        }

        report.remaining = workload - report.templates;
        let next = if report.remaining == 0 {
            DEFAULT_WORKLOAD
        } else {
            report.remaining
        };
        // A concurrent set_workload wins over our bookkeeping.
        let _ = self
            .workload
            .compare_exchange(workload, next, Ordering::AcqRel, Ordering::Acquire);

        {
            let mut stats = self.stats.lock();
            stats.runs += 1;
            if report.remaining > 0 {
                stats.capped_runs += 1;
            }
            stats.templates_appended += report.templates as u64;
            stats.columns_appended += report.columns as u64;
        }

        tracing::debug!(
            templates = report.templates,
            columns = report.columns,
            remaining = report.remaining,
            len = report.len,
            "chunk run"
        );

        Ok(report)
    }

    /// Synchronously appends filler until at least `min_columns` exist.
    /// Returns the columns appended.
    ///
    /// Falls back to the active pool if the library has no filler.
    ///
    /// # Errors
    ///
    /// Propagates append failures from the column store.
    pub fn seed(&self, min_columns: usize) -> TileMapResult<usize> {
        let fillers = if self.library.fillers().is_empty() {
            self.candidates.as_slice()
        } else {
            self.library.fillers()
        };

        let mut appender = GridAppender::lock(&self.columns, self.library.rows());
        let mut selector = self.selector.lock();
        let mut appended = 0;
        let mut templates = 0u64;

        while appender.len() < min_columns {
            let index = fillers[selector.rng.gen_range(0..fillers.len())];
            if let Some(template) = self.library.get(index) {
                appended += appender.append_template(template)?;
            }
            templates += 1;
        }

        let mut stats = self.stats.lock();
        stats.templates_appended += templates;
        stats.columns_appended += appended as u64;

        Ok(appended)
    }

    /// Returns the shared column store.
    #[must_use]
    pub fn columns(&self) -> &Arc<ColumnStore> {
        &self.columns
    }

    /// Returns the template library.
    #[must_use]
    pub fn library(&self) -> &Arc<TemplateLibrary> {
        &self.library
    }

    /// Returns the weather pool templates are drawn from.
    #[must_use]
    pub fn pool(&self) -> TemplatePool {
        self.pool
    }

    /// Returns a snapshot of the statistics.
    #[must_use]
    pub fn stats(&self) -> GeneratorStats {
        self.stats.lock().clone()
    }

    fn wake_receiver(&self) -> &Receiver<()> {
        &self.wake_rx
    }
}

// ============================================================================
// WORKER THREAD
// ============================================================================

/// The per-level worker thread driving a [`ChunkGenerator`].
///
/// Stopping (or dropping) the worker deactivates the generator, wakes the
/// thread and joins it.
pub struct GeneratorWorker {
    generator: Arc<ChunkGenerator>,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl GeneratorWorker {
    /// Name of the worker thread.
    pub const THREAD_NAME: &'static str = "scraper-chunk-worker";

    /// Spawns the worker. The generator stays inactive until
    /// [`ChunkGenerator::activate`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`TileMapError::Io`] if the thread cannot be spawned.
    pub fn spawn(generator: Arc<ChunkGenerator>) -> TileMapResult<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker_generator = Arc::clone(&generator);
        let worker_shutdown = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name(Self::THREAD_NAME.to_string())
            .spawn(move || Self::worker_loop(&worker_generator, &worker_shutdown))?;

        tracing::info!(pool = %generator.pool(), "chunk worker started");

        Ok(Self {
            generator,
            shutdown,
            handle: Some(handle),
        })
    }

    fn worker_loop(generator: &ChunkGenerator, shutdown: &AtomicBool) {
        while generator.wake_receiver().recv().is_ok() {
            if shutdown.load(Ordering::Acquire) {
                break;
            }

            while generator.is_active() {
                match generator.run() {
                    Ok(report) if report.remaining == 0 => break,
                    Ok(report) => {
                        if shutdown.load(Ordering::Acquire) {
                            tracing::warn!(
                                remaining = report.remaining,
                                "chunk generation interrupted"
                            );
                            return;
                        }
                    }
                    Err(error) => {
                        tracing::error!(%error, "chunk run failed, worker exiting");
                        return;
                    }
                }
            }
        }
    }

    /// Returns the driven generator.
    #[must_use]
    pub fn generator(&self) -> &Arc<ChunkGenerator> {
        &self.generator
    }

    /// Returns true while the thread is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Stops and joins the worker.
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        self.shutdown.store(true, Ordering::Release);
        self.generator.deactivate();
        self.generator.request_run();

        if handle.join().is_err() {
            tracing::error!("chunk worker panicked");
        }
        tracing::info!(columns = self.generator.columns().len(), "chunk worker stopped");
    }
}

impl Drop for GeneratorWorker {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}
