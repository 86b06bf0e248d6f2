use std::fs;
use std::path::Path;

use glint::config::{ConfigFile, HighlightOptions};
use glint::plugins::{
    AttributeLabel, AttributeOptions, COPY_SCRIPT, CopyButton, CopyOptions, Highlight, LangLabel, LangOptions,
};
use glint::{BuildError, ConfigError, Site, SiteOptions};
use tempfile::tempdir;

const PAGE: &str = "<!doctype html><html><head><title>t</title></head><body>\
    <pre><code class=\"language-rust\" label=\"main.rs\">fn main() {}</code></pre>\
    </body></html>";

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn build(site: &Site) -> glint::BuildStats {
    site.build().expect("build succeeds")
}

#[test]
fn highlights_into_separate_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("public");
    let output = dir.path().join("out");
    write(&input, "index.html", PAGE);
    write(&input, "docs/guide.html", PAGE);
    write(&input, "robots.txt", "User-agent: *");

    let mut options = SiteOptions::new(&input);
    options.output_dir = Some(output.clone());
    let mut site = Site::new(options);
    site.use_plugin(Highlight::new(HighlightOptions::default()).unwrap());
    let stats = build(&site);

    assert_eq!(stats.pages_loaded, 2);
    assert_eq!(stats.pages_written, 2);
    assert_eq!(stats.blocks_highlighted, 2);
    assert!(stats.is_success());

    let guide = fs::read_to_string(output.join("docs/guide.html")).unwrap();
    assert!(guide.contains("<div class=\"code-block\"><header></header><pre class=\"glint"));
    // A single theme is inlined, so there is no theme stylesheet to inject
    assert!(guide.contains("style=\"background-color:#"));
    assert!(!guide.contains("<style data-glint=\"theme\">"));
    assert_eq!(fs::read_to_string(output.join("robots.txt")).unwrap(), "User-agent: *");

    // Input is left as it was
    assert_eq!(fs::read_to_string(input.join("index.html")).unwrap(), PAGE);
}

#[test]
fn rebuilding_in_place_is_stable() {
    let dir = tempdir().unwrap();
    write(dir.path(), "index.html", PAGE);

    let mut site = Site::new(SiteOptions::new(dir.path()));
    site.use_plugin(Highlight::new(HighlightOptions::default()).unwrap())
        .use_plugin(CopyButton::new(CopyOptions::default()).unwrap());

    let first = build(&site);
    assert_eq!(first.pages_written, 1);
    let once = fs::read_to_string(dir.path().join("index.html")).unwrap();

    let second = build(&site);
    assert_eq!(second.pages_written, 0);
    assert_eq!(second.blocks_skipped, 1);
    assert_eq!(fs::read_to_string(dir.path().join("index.html")).unwrap(), once);
}

#[test]
fn labels_and_copy_button() {
    let dir = tempdir().unwrap();
    write(dir.path(), "index.html", PAGE);

    let mut site = Site::new(SiteOptions::new(dir.path()));
    site.use_plugin(Highlight::new(HighlightOptions::default()).unwrap())
        .use_plugin(AttributeLabel::new(AttributeOptions::default()).unwrap())
        .use_plugin(LangLabel::new(LangOptions::default()))
        .use_plugin(CopyButton::new(CopyOptions::default()).unwrap());
    let stats = build(&site);

    assert_eq!(stats.labels_added, 2);
    assert_eq!(stats.buttons_added, 1);

    let html = fs::read_to_string(dir.path().join("index.html")).unwrap();
    let header_start = html.find("<header>").unwrap();
    let header_end = html.find("</header>").unwrap();
    let header = &html[header_start..header_end];
    assert!(header.contains("<div style=\"order: 2\" class=\"attribute-label\">main.rs</div>"));
    assert!(header.contains("<div style=\"order: 1\" class=\"attribute-lang\">rs</div>"));
    assert!(header.contains("<button style=\"order: 3\" class=\"copy\"></button>"));
    assert!(!html.contains("label=\"main.rs\""));
    assert!(html.contains("<script src=\"/glint/copy.js\" data-glint=\"copy\"></script>"));

    let script = fs::read_to_string(dir.path().join("glint/copy.js")).unwrap();
    assert_eq!(script, COPY_SCRIPT);
    assert!(stats.assets_written.contains(&dir.path().join("glint/copy.js")));
}

#[test]
fn failed_page_is_reported_and_left_alone() {
    let dir = tempdir().unwrap();
    let broken = "<html><head></head><body><pre><code class=\"language-nonexistent-xyz\">x</code></pre></body></html>";
    write(dir.path(), "broken.html", broken);
    write(dir.path(), "index.html", PAGE);

    let mut site = Site::new(SiteOptions::new(dir.path()));
    site.use_plugin(Highlight::new(HighlightOptions::default()).unwrap());
    let stats = build(&site);

    assert!(!stats.is_success());
    assert_eq!(stats.failures.len(), 1);
    assert_eq!(stats.failures[0].url, "/broken.html");
    assert_eq!(stats.failures[0].plugin, "highlight");
    assert!(stats.failures[0].error.contains("nonexistent-xyz"));
    assert_eq!(stats.pages_written, 1);
    assert_eq!(fs::read_to_string(dir.path().join("broken.html")).unwrap(), broken);
}

#[test]
fn config_file_drives_the_build() {
    let dir = tempdir().unwrap();
    write(dir.path(), "index.html", PAGE);
    write(dir.path(), "about/index.html", PAGE);

    let config = ConfigFile::parse(
        r#"
css_file = "styles/code.css"
default_color = "dark"
transformers = ["notation-diff"]

[themes]
light = "InspiredGitHub"
dark = "base16-ocean.dark"

[css]
base_dir = "styles/glint"

[lang]
"#,
        Path::new("glint.toml"),
    )
    .unwrap();

    let mut site = Site::new(SiteOptions::new(dir.path()));
    for plugin in config.plugins().unwrap() {
        site.use_boxed(plugin);
    }
    let stats = build(&site);
    assert!(stats.is_success());

    let html = fs::read_to_string(dir.path().join("about/index.html")).unwrap();
    assert!(html.contains("<body data-color=\"dark\">"));
    assert!(!html.contains("<style data-glint=\"theme\">"));
    assert!(html.contains("@import \"/styles/glint/main.css\";"));
    assert!(html.contains("class=\"attribute-lang\">rs</div>"));

    let css = fs::read_to_string(dir.path().join("styles/code.css")).unwrap();
    assert_eq!(css.matches("[data-color=\"dark\"] .glint span {").count(), 1);
    assert!(css.contains("--glint-diff-add: var(--glint-light-diff-add, inherit);"));
    assert!(stats.generated_files.contains(&dir.path().join("styles/code.css")));

    for sheet in ["main.css", "notation-diff.css", "render-whitespace.css"] {
        assert!(dir.path().join("styles/glint").join(sheet).is_file(), "{sheet} written");
    }
}

#[test]
fn unreadable_page_does_not_stop_the_build() {
    let dir = tempdir().unwrap();
    write(dir.path(), "index.html", PAGE);
    let latin1: &[u8] = b"<html><body><pre><code class=\"language-text\">caf\xe9</code></pre></body></html>";
    fs::write(dir.path().join("latin1.html"), latin1).unwrap();

    let mut site = Site::new(SiteOptions::new(dir.path()));
    site.use_plugin(Highlight::new(HighlightOptions::default()).unwrap());
    let stats = build(&site);

    assert_eq!(stats.pages_loaded, 1);
    assert_eq!(stats.pages_written, 1);
    assert_eq!(stats.failures.len(), 1);
    assert_eq!(stats.failures[0].url, "/latin1.html");
    assert_eq!(stats.failures[0].plugin, "load");

    let index = fs::read_to_string(dir.path().join("index.html")).unwrap();
    assert!(index.contains("<div class=\"code-block\">"));
    assert_eq!(fs::read(dir.path().join("latin1.html")).unwrap(), latin1);
}

#[test]
fn unknown_theme_fails_before_pages_are_touched() {
    let dir = tempdir().unwrap();
    write(dir.path(), "index.html", PAGE);

    let config = ConfigFile::parse("theme = \"InspiredGithub\"", Path::new("glint.toml")).unwrap();
    let mut site = Site::new(SiteOptions::new(dir.path()));
    for plugin in config.plugins().unwrap() {
        site.use_boxed(plugin);
    }

    let err = site.build().err().expect("build fails");
    assert!(matches!(err, BuildError::Config(ConfigError::UnknownTheme { .. })));
    assert_eq!(fs::read_to_string(dir.path().join("index.html")).unwrap(), PAGE);
}
