use std::{path::PathBuf, process::ExitCode};

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Render one PNG per manifest entry from a layered document.
#[derive(Parser, Debug)]
#[command(name = "traitstack", version)]
struct Cli {
    /// Layer-stack document JSON.
    #[arg(long)]
    source: PathBuf,

    /// Trait manifest JSON (array of attribute -> trait objects).
    #[arg(long, required_unless_present = "inspect")]
    manifest: Option<PathBuf>,

    /// Output directory for `<index>.png` files (created if missing).
    #[arg(long, required_unless_present = "inspect")]
    out: Option<PathBuf>,

    /// Layer revealed in every image regardless of traits.
    #[arg(long)]
    effects: Option<String>,

    /// First manifest index to render; earlier entries are assumed done.
    #[arg(long, default_value_t = 0)]
    offset: usize,

    /// Render entries in parallel.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Override rayon worker threads (parallel mode only).
    #[arg(long)]
    threads: Option<usize>,

    /// Log failed entries and keep going instead of aborting the batch.
    #[arg(long, default_value_t = false)]
    skip_failures: bool,

    /// Reject duplicate layer names within one group at load time.
    #[arg(long, default_value_t = false)]
    strict_names: bool,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print the document's layer tree and exit.
    #[arg(long, default_value_t = false)]
    inspect: bool,
}

/// Exit status when the batch finished but `--skip-failures` dropped some entries.
const EXIT_INCOMPLETE: u8 = 3;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    let load = traitstack::LoadOptions {
        strict_names: cli.strict_names,
    };
    if cli.inspect {
        cmd_inspect(&cli, &load)?;
        return Ok(ExitCode::SUCCESS);
    }
    cmd_render(cli, load)
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid --log-level '{level}'"))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn cmd_inspect(cli: &Cli, load: &traitstack::LoadOptions) -> anyhow::Result<()> {
    let template = traitstack::DocumentTemplate::open(&cli.source, load)
        .with_context(|| format!("load document '{}'", cli.source.display()))?;
    let doc = template.instantiate();
    let canvas = doc.canvas();
    println!("canvas {}x{}", canvas.width, canvas.height);

    let mut stack: Vec<(traitstack::LayerId, usize)> =
        doc.roots().iter().rev().map(|id| (*id, 0)).collect();
    while let Some((id, depth)) = stack.pop() {
        let layer = doc.layer(id);
        let indent = "  ".repeat(depth);
        match layer.children {
            Some(children) => {
                println!("{indent}{}/", layer.name);
                stack.extend(children.iter().rev().map(|c| (*c, depth + 1)));
            }
            None => println!("{indent}{}", layer.name),
        }
    }
    Ok(())
}

fn cmd_render(cli: Cli, load: traitstack::LoadOptions) -> anyhow::Result<ExitCode> {
    let (Some(manifest), Some(out_dir)) = (cli.manifest, cli.out) else {
        anyhow::bail!("--manifest and --out are required to render");
    };

    let cfg = traitstack::BatchConfig {
        source: cli.source,
        manifest,
        load,
        opts: traitstack::BatchOptions {
            out_dir,
            effects_layer: cli.effects,
            offset: cli.offset,
            threading: traitstack::BatchThreading {
                parallel: cli.parallel,
                threads: cli.threads,
            },
            on_error: if cli.skip_failures {
                traitstack::FailurePolicy::Skip
            } else {
                traitstack::FailurePolicy::Abort
            },
        },
    };

    let report = traitstack::run(&cfg).context("batch render failed")?;
    for failure in &report.failures {
        eprintln!("skipped {}: {}", failure.index, failure.error);
    }
    eprintln!(
        "wrote {} image(s) to {} in {:.2?}",
        report.images_written(),
        cfg.opts.out_dir.display(),
        report.elapsed
    );
    if !report.failures.is_empty() {
        return Ok(ExitCode::from(EXIT_INCOMPLETE));
    }
    Ok(ExitCode::SUCCESS)
}
