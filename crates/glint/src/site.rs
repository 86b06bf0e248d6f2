//! Site driver: loads the pages of a rendered site, runs the plugins over
//! them and writes the results back.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use indexmap::{IndexMap, IndexSet};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::error::{BuildError, PageError};
use crate::hooks::{Hooks, Registry};
use crate::plugins::Plugin;

/// Options for a [`Site`] build.
#[derive(Debug, Clone)]
pub struct SiteOptions {
    /// Directory holding the rendered site.
    pub input_dir: PathBuf,
    /// Output directory (if None, modifies in place).
    pub output_dir: Option<PathBuf>,
    /// Show a spinner and a progress bar on stderr.
    pub progress: bool,
}

impl SiteOptions {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: None,
            progress: false,
        }
    }
}

/// One page of the site.
#[derive(Debug, Clone)]
pub struct Page {
    url: String,
    content: String,
    dirty: bool,
}

impl Page {
    pub fn new(url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content: content.into(),
            dirty: false,
        }
    }

    /// URL path, e.g. `/docs/index.html`.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Replace the page's HTML. Marks the page as changed when it differs.
    pub fn set_content(&mut self, content: String) {
        if content != self.content {
            self.content = content;
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Per-build counters shared by all plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    BlocksHighlighted,
    BlocksSkipped,
    Labels,
    Buttons,
}

const COUNTERS: usize = 4;

#[derive(Debug, Default)]
struct GeneratedOutput {
    segments: IndexSet<String>,
    contributors: HashSet<String>,
}

/// State shared by every `process` call of a build.
#[derive(Debug)]
pub struct ProcessContext {
    hooks: Hooks,
    outputs: Mutex<IndexMap<String, GeneratedOutput>>,
    counters: [AtomicUsize; COUNTERS],
}

impl ProcessContext {
    pub fn new(hooks: Hooks) -> Self {
        Self {
            hooks,
            outputs: Mutex::new(IndexMap::new()),
            counters: Default::default(),
        }
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn add(&self, counter: Counter, n: usize) {
        self.counters[counter as usize].fetch_add(n, Ordering::Relaxed);
    }

    pub fn count(&self, counter: Counter) -> usize {
        self.counters[counter as usize].load(Ordering::Relaxed)
    }

    /// Append `segment` to the generated file at `url`, creating it if needed.
    ///
    /// A contributor (usually the page URL) is accepted once per output, and a
    /// segment identical to one already stored is not stored again. Returns
    /// whether the output changed.
    pub fn append_output(&self, url: &str, contributor: &str, segment: &str) -> bool {
        let mut outputs = self.outputs.lock().unwrap_or_else(PoisonError::into_inner);
        let output = outputs.entry(url.to_string()).or_default();
        if !output.contributors.insert(contributor.to_string()) {
            return false;
        }
        output.segments.insert(segment.to_string())
    }

    /// Current content of a generated file.
    pub fn output(&self, url: &str) -> Option<String> {
        let outputs = self.outputs.lock().unwrap_or_else(PoisonError::into_inner);
        outputs.get(url).map(|output| output.segments.iter().map(String::as_str).collect())
    }

    fn into_outputs(self) -> (Hooks, Vec<(String, String)>) {
        let outputs = self
            .outputs
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_iter()
            .map(|(url, output)| (url, output.segments.into_iter().collect()))
            .collect();
        (self.hooks, outputs)
    }
}

/// A page that could not be processed.
#[derive(Debug, Clone)]
pub struct PageFailure {
    pub url: String,
    pub plugin: &'static str,
    pub error: String,
}

/// Statistics from a build.
#[derive(Debug, Default)]
pub struct BuildStats {
    /// Pages read from disk.
    pub pages_loaded: usize,
    /// Pages written back because a plugin changed them.
    pub pages_written: usize,
    pub blocks_highlighted: usize,
    pub blocks_skipped: usize,
    pub labels_added: usize,
    pub buttons_added: usize,
    /// Generated files (shared CSS output) written.
    pub generated_files: Vec<PathBuf>,
    /// Static assets copied into the output.
    pub assets_written: Vec<PathBuf>,
    pub failures: Vec<PageFailure>,
    /// Total bytes of the loaded pages.
    pub bytes_input: u64,
    /// Total bytes of the pages written back.
    pub bytes_output: u64,
    /// Time spent processing pages (excludes clone time).
    pub process_duration: Duration,
}

impl BuildStats {
    /// Growth of the rewritten pages in percent of the loaded input.
    pub fn html_inflation_percent(&self) -> f64 {
        if self.bytes_input == 0 {
            0.0
        } else {
            (self.bytes_output as f64 - self.bytes_input as f64) / self.bytes_input as f64 * 100.0
        }
    }

    /// Processing throughput in MB/s (excludes clone time).
    pub fn throughput_mb_s(&self) -> f64 {
        let secs = self.process_duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            (self.bytes_input as f64 / (1024.0 * 1024.0)) / secs
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

struct Slot {
    path: PathBuf,
    page: Page,
    input_size: usize,
    failure: Option<PageFailure>,
}

/// A rendered site and the plugins that post-process it.
pub struct Site {
    options: SiteOptions,
    plugins: Vec<Box<dyn Plugin>>,
}

impl Site {
    pub fn new(options: SiteOptions) -> Self {
        Self {
            options,
            plugins: Vec::new(),
        }
    }

    /// Add a plugin. Plugins run in the order they are added.
    pub fn use_plugin(&mut self, plugin: impl Plugin + 'static) -> &mut Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn use_boxed(&mut self, plugin: Box<dyn Plugin>) -> &mut Self {
        self.plugins.push(plugin);
        self
    }

    /// Directory the build writes to.
    pub fn output_dir(&self) -> &Path {
        self.options
            .output_dir
            .as_deref()
            .unwrap_or(&self.options.input_dir)
    }

    /// Run every plugin over the site.
    pub fn build(&self) -> Result<BuildStats, BuildError> {
        let output_dir = self.output_dir().to_path_buf();

        // If output_dir is different from input_dir, copy everything first
        if let Some(out) = &self.options.output_dir
            && out != &self.options.input_dir
        {
            self.clone_input(out)?;
        }

        let mut registry = Registry::new();
        for plugin in &self.plugins {
            plugin.setup(&mut registry)?;
        }
        let hooks = registry.freeze();
        tracing::debug!(?hooks, "plugins set up");

        let mut slots = self.load_pages(&output_dir)?;
        let mut stats = BuildStats {
            pages_loaded: slots.iter().filter(|s| s.failure.is_none()).count(),
            bytes_input: slots.iter().map(|s| s.input_size as u64).sum(),
            ..BuildStats::default()
        };
        tracing::info!(pages = slots.len(), dir = %output_dir.display(), "pages loaded");

        let total: usize = self
            .plugins
            .iter()
            .map(|plugin| slots.iter().filter(|s| plugin.accepts(s.page.url())).count())
            .sum();
        let progress = self.progress_bar(total as u64);
        let process_start = Instant::now();
        let cx = ProcessContext::new(hooks);

        for plugin in &self.plugins {
            slots
                .par_iter_mut()
                .filter(|slot| plugin.accepts(slot.page.url()))
                .for_each(|slot| {
                    if slot.failure.is_none()
                        && let Err(error) = plugin.process(&mut slot.page, &cx)
                    {
                        slot.failure = Some(Self::report(plugin.name(), &slot.page, &error));
                    }
                    progress.inc(1);
                });
        }

        stats.process_duration = process_start.elapsed();
        progress.finish_and_clear();

        stats.blocks_highlighted = cx.count(Counter::BlocksHighlighted);
        stats.blocks_skipped = cx.count(Counter::BlocksSkipped);
        stats.labels_added = cx.count(Counter::Labels);
        stats.buttons_added = cx.count(Counter::Buttons);

        for slot in slots {
            if let Some(failure) = slot.failure {
                stats.failures.push(failure);
                continue;
            }
            if slot.page.is_dirty() {
                fs::write(&slot.path, slot.page.content())?;
                stats.pages_written += 1;
                stats.bytes_output += slot.page.content().len() as u64;
            } else {
                stats.bytes_output += slot.input_size as u64;
            }
        }

        let (hooks, outputs) = cx.into_outputs();
        for (url, content) in &outputs {
            let path = write_url(&output_dir, url, content)?;
            tracing::debug!(path = %path.display(), "generated file written");
            stats.generated_files.push(path);
        }
        for asset in hooks.assets().iter().filter(|asset| asset.copy) {
            if outputs.iter().any(|(url, _)| url == &asset.url) {
                continue;
            }
            stats
                .assets_written
                .push(write_url(&output_dir, &asset.url, &asset.contents)?);
        }

        tracing::info!(
            written = stats.pages_written,
            highlighted = stats.blocks_highlighted,
            failed = stats.failures.len(),
            "build finished"
        );
        Ok(stats)
    }

    fn clone_input(&self, out: &Path) -> Result<(), BuildError> {
        // Remove output directory if it exists (clean slate)
        if out.exists() {
            fs::remove_dir_all(out)?;
        }

        let spinner = if self.options.progress {
            let spinner = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
                spinner.set_style(style);
            }
            spinner.set_message("Cloning directory tree...");
            spinner.enable_steady_tick(Duration::from_millis(80));
            spinner
        } else {
            ProgressBar::hidden()
        };

        clonetree::clone_tree(&self.options.input_dir, out, &clonetree::Options::new()).map_err(
            |e| BuildError::Clone {
                from: self.options.input_dir.clone(),
                to: out.to_path_buf(),
                message: e.to_string(),
            },
        )?;

        spinner.finish_with_message("Clone complete");
        Ok(())
    }

    /// Read every file some plugin accepts. A file that cannot be read as
    /// UTF-8 becomes a failed slot, the walk itself failing is fatal.
    fn load_pages(&self, root: &Path) -> Result<Vec<Slot>, BuildError> {
        let mut found = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|source| BuildError::Walk {
                path: root.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(url) = url_for(root, entry.path()) else {
                continue;
            };
            if self.plugins.iter().any(|plugin| plugin.accepts(&url)) {
                found.push((entry.into_path(), url));
            }
        }

        let slots = found
            .into_par_iter()
            .map(|(path, url)| match fs::read_to_string(&path) {
                Ok(content) => Slot {
                    input_size: content.len(),
                    page: Page::new(url, content),
                    path,
                    failure: None,
                },
                // Unreadable or non-UTF-8 files fail on their own
                Err(error) => {
                    let page = Page::new(url, String::new());
                    let failure = Self::report("load", &page, &PageError::Read(error));
                    Slot {
                        input_size: 0,
                        page,
                        path,
                        failure: Some(failure),
                    }
                }
            })
            .collect();
        Ok(slots)
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.options.progress {
            return ProgressBar::hidden();
        }
        let progress = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
        {
            progress.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
        }
        progress
    }

    fn report(plugin: &'static str, page: &Page, error: &PageError) -> PageFailure {
        tracing::warn!(page = page.url(), plugin, %error, "page failed");
        PageFailure {
            url: page.url().to_string(),
            plugin,
            error: error.to_string(),
        }
    }
}

/// `/a/b.html` for `<root>/a/b.html`.
fn url_for(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut url = String::new();
    for component in relative.components() {
        url.push('/');
        url.push_str(component.as_os_str().to_str()?);
    }
    Some(url)
}

fn write_url(root: &Path, url: &str, content: &str) -> Result<PathBuf, BuildError> {
    let path = root.join(url.trim_start_matches('/'));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, content)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_tracks_changes() {
        let mut page = Page::new("/index.html", "<p>a</p>");
        page.set_content("<p>a</p>".to_string());
        assert!(!page.is_dirty());
        page.set_content("<p>b</p>".to_string());
        assert!(page.is_dirty());
        assert_eq!(page.content(), "<p>b</p>");
    }

    #[test]
    fn outputs_deduplicate_segments_and_contributors() {
        let cx = ProcessContext::new(Hooks::default());
        assert!(cx.append_output("/code.css", "/a.html", ".a{}"));
        assert!(!cx.append_output("/code.css", "/a.html", ".b{}"));
        assert!(!cx.append_output("/code.css", "/b.html", ".a{}"));
        assert!(cx.append_output("/code.css", "/c.html", ".c{}"));
        assert_eq!(cx.output("/code.css").as_deref(), Some(".a{}.c{}"));
        assert!(cx.output("/other.css").is_none());
    }

    #[test]
    fn counters() {
        let cx = ProcessContext::new(Hooks::default());
        cx.add(Counter::Labels, 2);
        cx.add(Counter::Labels, 1);
        assert_eq!(cx.count(Counter::Labels), 3);
        assert_eq!(cx.count(Counter::Buttons), 0);
    }

    #[test]
    fn urls_use_forward_slashes() {
        let root = Path::new("/site");
        assert_eq!(
            url_for(root, &root.join("docs").join("index.html")).as_deref(),
            Some("/docs/index.html")
        );
    }

    #[test]
    fn inflation() {
        let stats = BuildStats {
            bytes_input: 100,
            bytes_output: 150,
            ..BuildStats::default()
        };
        assert_eq!(stats.html_inflation_percent(), 50.0);
        assert!(stats.is_success());
    }
}
