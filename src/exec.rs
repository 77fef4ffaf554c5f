//! Execution engine — the worker pool and its nesting discipline.
//!
//! A [`Scraper`] drains its submitted jobs on a bounded pool of scoped
//! worker threads. Nested scrapes triggered while binding (deep bindings,
//! source-providing values) never touch the pool: they run inline on the
//! thread that triggered them. Queuing nested work would consume a pool
//! slot while the submitting worker blocks on the result, and enough
//! simultaneous top-level jobs would leave every worker blocked on nested
//! work that can never get a slot.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

use tracing::{debug, info};

use crate::bind::{Bindable, bind_node};
use crate::config::EngineConfig;
use crate::dom::Node;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::source::{ScrapeSource, SourceProvider};

/// Distinguishes concurrently running pools in thread names and logs.
static POOL_ID: AtomicU64 = AtomicU64::new(1);

// ---------------------------------------------------------------------------
// Execution context
// ---------------------------------------------------------------------------

/// Where a binding pass is currently executing.
///
/// Threaded through every nested submission so the inline-vs-queue decision
/// is a branch on explicit state rather than an inspection of the current
/// thread's identity. Only [`Scraper::scrape`] ever enqueues onto a pool.
#[derive(Clone, Copy, Debug)]
pub struct ExecCtx(Ctx);

#[derive(Clone, Copy, Debug)]
enum Ctx {
    /// On the caller's own thread, no pool involved.
    Direct,
    /// On a pool worker thread.
    Worker { pool: u64, worker: usize },
}

impl ExecCtx {
    pub(crate) fn direct() -> Self {
        Self(Ctx::Direct)
    }

    fn worker(pool: u64, worker: usize) -> Self {
        Self(Ctx::Worker { pool, worker })
    }

    /// Run a nested binding pass over a live node, inline.
    pub(crate) fn run_nested_node(
        &self,
        node: Node<'_>,
        origin: &str,
        fetcher: &Fetcher,
        target: &mut dyn Bindable,
    ) -> Result<()> {
        self.trace_inline();
        bind_node(self, fetcher, node, origin, target)
    }

    /// Resolve a nested source and bind it, inline.
    pub(crate) fn run_nested_source(
        &self,
        source: &ScrapeSource,
        fetcher: &Fetcher,
        target: &mut dyn Bindable,
    ) -> Result<()> {
        self.trace_inline();
        let origin = source.origin();
        let doc = source.load(fetcher)?;
        bind_node(self, fetcher, doc.root(), &origin, target)
    }

    fn trace_inline(&self) {
        match self.0 {
            Ctx::Worker { pool, worker } => {
                debug!(pool, worker, "nested scrape inlined on pool worker");
            }
            Ctx::Direct => debug!("nested scrape on caller thread"),
        }
    }
}

// ---------------------------------------------------------------------------
// Jobs and builder
// ---------------------------------------------------------------------------

struct Job<'a> {
    source: ScrapeSource,
    target: &'a mut (dyn Bindable + Send),
}

/// Accumulates (source, target) jobs and pool configuration.
pub struct ScrapeBuilder<'a> {
    jobs: Vec<Job<'a>>,
    config: EngineConfig,
}

impl<'a> ScrapeBuilder<'a> {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            config: EngineConfig::default(),
        }
    }

    /// Queue `target` to be bound from `source`.
    pub fn add<T: Bindable + Send>(mut self, source: ScrapeSource, target: &'a mut T) -> Self {
        self.jobs.push(Job { source, target });
        self
    }

    /// Queue a target that supplies its own source.
    pub fn add_provider<T: Bindable + SourceProvider + Send>(mut self, target: &'a mut T) -> Self {
        let source = target.source();
        self.jobs.push(Job { source, target });
        self
    }

    /// Queue a batch of self-sourcing targets.
    pub fn add_providers<T: Bindable + SourceProvider + Send + 'a>(
        self,
        targets: impl IntoIterator<Item = &'a mut T>,
    ) -> Self {
        let mut builder = self;
        for target in targets {
            builder = builder.add_provider(target);
        }
        builder
    }

    /// Cap the worker count (at least one).
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers.max(1);
        self
    }

    /// Replace the whole engine configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Scraper<'a> {
        let fetcher = Fetcher::new(&self.config);
        Scraper {
            jobs: self.jobs,
            config: self.config,
            fetcher,
        }
    }
}

impl Default for ScrapeBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Scraper
// ---------------------------------------------------------------------------

/// A configured batch of scrape jobs, consumed by [`Scraper::scrape`].
pub struct Scraper<'a> {
    jobs: Vec<Job<'a>>,
    config: EngineConfig,
    fetcher: Fetcher,
}

impl<'a> Scraper<'a> {
    pub fn builder() -> ScrapeBuilder<'a> {
        ScrapeBuilder::new()
    }

    /// Drain all jobs on a worker pool and block until they finish.
    ///
    /// The first error observed stops further job pickup (in-flight jobs
    /// run to completion) and is returned with its kind intact. Targets of
    /// jobs that never ran are left untouched.
    pub fn scrape(self) -> Result<()> {
        let Scraper {
            jobs,
            config,
            fetcher,
        } = self;
        if jobs.is_empty() {
            return Ok(());
        }

        let pool = POOL_ID.fetch_add(1, Ordering::Relaxed);
        let workers = config.workers.max(1).min(jobs.len());
        info!(pool, jobs = jobs.len(), workers, "starting scrape");

        let fetcher = &fetcher;
        let queue = Mutex::new(VecDeque::from(jobs));
        let failed = AtomicBool::new(false);
        let first_error = Mutex::new(None);

        thread::scope(|s| {
            for worker in 0..workers {
                let queue = &queue;
                let failed = &failed;
                let first_error = &first_error;
                thread::Builder::new()
                    .name(format!("docbind-{pool}-worker-{worker}"))
                    .spawn_scoped(s, move || {
                        let exec = ExecCtx::worker(pool, worker);
                        loop {
                            if failed.load(Ordering::Acquire) {
                                break;
                            }
                            let job = queue.lock().expect("scrape queue poisoned").pop_front();
                            let Some(job) = job else { break };
                            if let Err(e) = run_job(&exec, fetcher, job) {
                                let mut slot =
                                    first_error.lock().expect("error slot poisoned");
                                if slot.is_none() {
                                    *slot = Some(e);
                                }
                                failed.store(true, Ordering::Release);
                            }
                        }
                    })
                    .expect("failed to spawn scrape worker");
            }
        });

        match first_error.into_inner().expect("error slot poisoned") {
            Some(e) => Err(e),
            None => {
                info!(pool, "scrape completed");
                Ok(())
            }
        }
    }
}

fn run_job(exec: &ExecCtx, fetcher: &Fetcher, job: Job<'_>) -> Result<()> {
    let origin = job.source.origin();
    debug!(origin = %origin, "scraping document");
    let doc = job.source.load(fetcher)?;
    bind_node(exec, fetcher, doc.root(), &origin, job.target)
}

/// Bind a single source into `target` on the calling thread, with default
/// configuration. The one-document convenience entry point.
pub fn scrape<T: Bindable>(source: ScrapeSource, target: &mut T) -> Result<()> {
    let fetcher = Fetcher::new(&EngineConfig::default());
    let origin = source.origin();
    let doc = source.load(&fetcher)?;
    bind_node(&ExecCtx::direct(), &fetcher, doc.root(), &origin, target)
}
