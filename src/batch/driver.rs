use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
    time::{Duration, Instant},
};

use rayon::prelude::*;

use crate::{
    document::store::{DocumentTemplate, LoadOptions},
    foundation::error::{TraitStackError, TraitStackResult},
    render::compositor::render,
    render::persist::persist,
    resolve::manifest::{TraitManifest, TraitSet},
    resolve::visibility::apply_trait_set,
};

/// What to do when one manifest entry fails to render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the batch and return the error. Images already written stay on disk.
    #[default]
    Abort,
    /// Record the failure in [`BatchReport::failures`] and continue with the next entry.
    Skip,
}

#[derive(Clone, Debug, Default)]
/// Threading controls for batch rendering.
pub struct BatchThreading {
    /// Render entries on a rayon pool when `true`.
    pub parallel: bool,
    /// Optional explicit worker thread count.
    pub threads: Option<usize>,
}

/// Options for rendering an already-loaded manifest.
#[derive(Clone, Debug)]
pub struct BatchOptions {
    /// Directory receiving `<index>.png` files. Created if absent.
    pub out_dir: PathBuf,
    /// Layer revealed in every image regardless of traits.
    pub effects_layer: Option<String>,
    /// First manifest index to render. Earlier entries are assumed to be done.
    pub offset: usize,
    /// Threading configuration.
    pub threading: BatchThreading,
    /// Per-entry failure handling.
    pub on_error: FailurePolicy,
}

impl BatchOptions {
    /// Sequential, fail-fast options writing into `out_dir` from offset 0.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            effects_layer: None,
            offset: 0,
            threading: BatchThreading::default(),
            on_error: FailurePolicy::Abort,
        }
    }
}

/// Full batch configuration: inputs on disk plus [`BatchOptions`].
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Layer-stack document JSON.
    pub source: PathBuf,
    /// Trait manifest JSON.
    pub manifest: PathBuf,
    /// Document load options.
    pub load: LoadOptions,
    /// Rendering options.
    pub opts: BatchOptions,
}

/// One entry that failed under [`FailurePolicy::Skip`].
#[derive(Debug)]
pub struct BatchFailure {
    /// Manifest index of the failed entry.
    pub index: usize,
    /// Why it failed.
    pub error: TraitStackError,
}

/// Outcome of a batch run.
#[derive(Debug)]
pub struct BatchReport {
    /// Manifest length.
    pub total: usize,
    /// Offset the run started from.
    pub offset: usize,
    /// Written image paths in manifest order.
    pub written: Vec<PathBuf>,
    /// Skipped entries in manifest order.
    pub failures: Vec<BatchFailure>,
    /// Wall time of the run.
    pub elapsed: Duration,
}

impl BatchReport {
    /// Number of images written by this run.
    pub fn images_written(&self) -> usize {
        self.written.len()
    }
}

/// Load the document and manifest named by `cfg` and render every entry from `cfg.opts.offset`.
pub fn run(cfg: &BatchConfig) -> TraitStackResult<BatchReport> {
    let template = DocumentTemplate::open(&cfg.source, &cfg.load)?;
    let manifest = TraitManifest::from_path(&cfg.manifest)?;
    run_manifest(&template, &manifest, &cfg.opts)
}

/// Render entries `opts.offset..` of `manifest` against fresh instances of `template`.
///
/// Each entry gets its own [`crate::LayeredDocument`], so no visibility state carries over
/// between images. Output file names always equal the manifest index, whatever the completion
/// order in parallel mode.
#[tracing::instrument(skip_all, fields(entries = manifest.len(), offset = opts.offset))]
pub fn run_manifest(
    template: &DocumentTemplate,
    manifest: &TraitManifest,
    opts: &BatchOptions,
) -> TraitStackResult<BatchReport> {
    if opts.offset > manifest.len() {
        return Err(TraitStackError::validation(format!(
            "offset {} is past the end of a {}-entry manifest",
            opts.offset,
            manifest.len()
        )));
    }
    std::fs::create_dir_all(&opts.out_dir).map_err(|e| TraitStackError::io(&opts.out_dir, e))?;

    let started = Instant::now();
    let pending = &manifest.entries()[opts.offset..];
    let effects = opts.effects_layer.as_deref();
    tracing::info!(
        remaining = pending.len(),
        out_dir = %opts.out_dir.display(),
        "starting batch"
    );

    let outcomes = if opts.threading.parallel {
        render_parallel(template, pending, effects, opts)?
    } else {
        render_sequential(template, pending, effects, opts)
    };

    let mut report = BatchReport {
        total: manifest.len(),
        offset: opts.offset,
        written: Vec::with_capacity(outcomes.len()),
        failures: Vec::new(),
        elapsed: Duration::ZERO,
    };
    for (index, outcome) in outcomes {
        match outcome {
            Ok(path) => report.written.push(path),
            Err(error) => match opts.on_error {
                FailurePolicy::Abort => return Err(error),
                FailurePolicy::Skip => report.failures.push(BatchFailure { index, error }),
            },
        }
    }
    report.elapsed = started.elapsed();

    tracing::info!(
        written = report.images_written(),
        failed = report.failures.len(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "batch complete"
    );
    Ok(report)
}

type Outcome = (usize, TraitStackResult<PathBuf>);

fn render_sequential(
    template: &DocumentTemplate,
    pending: &[TraitSet],
    effects: Option<&str>,
    opts: &BatchOptions,
) -> Vec<Outcome> {
    let mut out = Vec::with_capacity(pending.len());
    for set in pending {
        let result = render_entry(template, set, effects, &opts.out_dir);
        let failed = result.is_err();
        out.push((set.index(), result));
        if failed && opts.on_error == FailurePolicy::Abort {
            break;
        }
    }
    out
}

fn render_parallel(
    template: &DocumentTemplate,
    pending: &[TraitSet],
    effects: Option<&str>,
    opts: &BatchOptions,
) -> TraitStackResult<Vec<Outcome>> {
    let pool = build_thread_pool(opts.threading.threads)?;
    // Lowest manifest index that failed so far; usize::MAX while none has.
    let first_failed = AtomicUsize::new(usize::MAX);

    let outcomes: Vec<Option<Outcome>> = pool.install(|| {
        pending
            .par_iter()
            .map(|set| {
                // Entries past a known failure are dropped; earlier ones still run so the
                // lowest failing index is always the one reported.
                if set.index() > first_failed.load(Ordering::Relaxed) {
                    return None;
                }
                let result = render_entry(template, set, effects, &opts.out_dir);
                if result.is_err() && opts.on_error == FailurePolicy::Abort {
                    first_failed.fetch_min(set.index(), Ordering::Relaxed);
                }
                Some((set.index(), result))
            })
            .collect()
    });

    Ok(outcomes.into_iter().flatten().collect())
}

fn render_entry(
    template: &DocumentTemplate,
    set: &TraitSet,
    effects: Option<&str>,
    out_dir: &Path,
) -> TraitStackResult<PathBuf> {
    let index = set.index();
    tracing::info!(index, id = ?set.id(), "rendering image");

    let mut doc = template.instantiate();
    let result = apply_trait_set(&mut doc, set, effects)
        .and_then(|()| render(&doc))
        .and_then(|image| persist(&image, out_dir, index));

    match &result {
        Ok(path) => tracing::info!(index, path = %path.display(), "wrote image"),
        Err(e) => tracing::warn!(index, error = %e, "image failed"),
    }
    result
}

fn build_thread_pool(threads: Option<usize>) -> TraitStackResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(TraitStackError::validation(
            "batch threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| TraitStackError::render(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/batch/driver.rs"]
mod tests;
