//! Post-process the HTML output of a static site generator.
//!
//! glint walks a rendered site and runs a chain of plugins over every page:
//!
//! - [`Highlight`](plugins::Highlight) highlights `<pre><code class="language-*">`
//!   blocks with syntect, wraps them in `<div class="code-block">` with an
//!   empty `<header>` and `<footer>`, and injects the theme CSS.
//! - [`CssBundle`](plugins::CssBundle) and [`ExtraAssets`](plugins::ExtraAssets)
//!   ship stylesheets for the wrapper and the `[!code ...]` notations.
//! - [`AttributeLabel`](plugins::AttributeLabel) and
//!   [`LangLabel`](plugins::LangLabel) fill the header or footer with labels.
//! - [`CopyButton`](plugins::CopyButton) adds copy-to-clipboard buttons.
//!
//! # Usage
//!
//! ```bash
//! glint ./public ./public-highlighted
//! ```
//!
//! or as a library:
//!
//! ```no_run
//! use glint::config::HighlightOptions;
//! use glint::plugins::{CopyButton, CopyOptions, Highlight};
//! use glint::{Site, SiteOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut site = Site::new(SiteOptions::new("public"));
//! site.use_plugin(Highlight::new(HighlightOptions::default())?)
//!     .use_plugin(CopyButton::new(CopyOptions::default())?);
//! let stats = site.build()?;
//! println!("{} blocks highlighted", stats.blocks_highlighted);
//! # Ok(())
//! # }
//! ```
//!
//! # How it works
//!
//! Every plugin first gets a `setup` call, where it registers transformers,
//! themed CSS variables and assets. Pages are then rewritten with lol_html,
//! one plugin at a time, pages in parallel. Generated files (a shared theme
//! stylesheet, bundled CSS, the copy script) are written once all pages are
//! done.

pub mod config;
pub mod css;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod html;
pub mod plugins;
pub mod site;
pub mod transformers;

pub use config::{ConfigFile, HighlightOptions, Position, ThemeSelection, ThemedVariable};
pub use error::{BuildError, ConfigError, HighlightError, PageError};
pub use site::{BuildStats, Page, PageFailure, ProcessContext, Site, SiteOptions};
