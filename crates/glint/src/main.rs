//! glint CLI - Post-process a rendered static site: highlight code blocks and decorate them.

use anyhow::{Context, Result, bail};
use facet::Facet;
use facet_args as args;
use glint::config::{self, ConfigFile};
use glint::{Site, SiteOptions};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Post-process the HTML output of a static site generator.
///
/// Highlights `<pre><code class="language-*">` blocks, injects theme CSS and
/// optionally adds labels, copy buttons and bundled stylesheets, as configured
/// in `glint.toml`.
#[derive(Debug, Facet)]
struct Args {
    /// Directory containing the rendered site (e.g., public)
    #[facet(args::positional)]
    input: PathBuf,

    /// Output directory (defaults to modifying input in place)
    #[facet(args::positional, default)]
    output: Option<PathBuf>,

    /// Config file (defaults to ./glint.toml when present)
    #[facet(args::named, args::short = 'c', default)]
    config: Option<PathBuf>,

    /// Show verbose output
    #[facet(args::named, args::short = 'v', default)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args: Args = facet_args::from_std_args()?;

    let filter = if args.verbose {
        EnvFilter::new("glint=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Validate input directory
    if !args.input.exists() {
        bail!("Input directory does not exist: {}", args.input.display());
    }

    if !args.input.is_dir() {
        bail!("Input path is not a directory: {}", args.input.display());
    }

    let config_path = config::locate(args.config.as_deref());
    let config = match &config_path {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };
    let plugins = config.plugins().context("invalid configuration")?;

    let mut options = SiteOptions::new(&args.input);
    options.output_dir = args.output.clone();
    options.progress = true;

    let mut site = Site::new(options);
    for plugin in plugins {
        site.use_boxed(plugin);
    }

    // Print header
    eprintln!(
        "{} Processing site: {}",
        "glint".green().bold(),
        args.input.display()
    );

    if let Some(out) = &args.output {
        eprintln!("  Output: {}", out.display());
    } else {
        eprintln!("  {} Modifying in place", "Note:".yellow());
    }

    match &config_path {
        Some(path) => eprintln!("  Config: {}", path.display()),
        None => eprintln!("  {} No glint.toml, using defaults", "Note:".yellow()),
    }

    eprintln!();

    // Process
    let start = Instant::now();
    let stats = site.build()?;
    let elapsed = start.elapsed();

    // Print results
    eprintln!("{}", "Results:".bold());
    eprintln!(
        "  {} HTML files processed, {} rewritten",
        stats.pages_loaded.to_string().cyan(),
        stats.pages_written.to_string().cyan()
    );
    eprintln!(
        "  {} code blocks highlighted",
        stats.blocks_highlighted.to_string().green()
    );
    eprintln!(
        "  {} code blocks skipped (no language or already wrapped)",
        stats.blocks_skipped.to_string().yellow()
    );
    if stats.labels_added > 0 || stats.buttons_added > 0 {
        eprintln!(
            "  {} labels and {} copy buttons added",
            stats.labels_added.to_string().green(),
            stats.buttons_added.to_string().green()
        );
    }

    for path in stats.generated_files.iter().chain(&stats.assets_written) {
        eprintln!("  {} Wrote {}", "✓".green(), path.display());
    }

    eprintln!(
        "  {:+.1}% HTML size, {:.1} MB/s",
        stats.html_inflation_percent(),
        stats.throughput_mb_s()
    );

    if !stats.is_success() {
        eprintln!("\n  {} {} pages failed:", "Error:".red().bold(), stats.failures.len());
        for failure in &stats.failures {
            eprintln!("    {} [{}]: {}", failure.url, failure.plugin, failure.error);
        }
    }

    eprintln!("\n  Completed in {:.2}s", elapsed.as_secs_f64());

    if !stats.is_success() {
        bail!("{} pages could not be processed", stats.failures.len());
    }

    Ok(())
}
