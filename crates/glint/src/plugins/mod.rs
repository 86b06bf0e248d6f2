//! Page-processing plugins.
//!
//! A plugin has two phases. [`Plugin::setup`] runs once per build, in
//! registration order, and may add transformers, themed variables and assets
//! to the [`Registry`]. [`Plugin::process`] then runs for every page the
//! plugin accepts, possibly on many threads at once.

mod attribute;
mod copy;
mod css_bundle;
mod extra;
mod highlight;
mod lang;

pub use attribute::{AttributeLabel, AttributeOptions, DefaultValue, Format, Node};
pub use copy::{COPY_SCRIPT, CopyButton, CopyOptions, clipboard_text};
pub use css_bundle::{CssBundle, CssBundleOptions, StyleSheet};
pub use extra::{ExtraAssets, ExtraOptions};
pub use highlight::Highlight;
pub use lang::{CatalogRef, LangLabel, LangOptions};

use crate::error::{ConfigError, PageError};
use crate::hooks::Registry;
use crate::site::{Page, ProcessContext};

/// CSS variables used by the notation stylesheets.
pub const NOTATION_VARIABLES: &[&str] = &[
    "diff-add",
    "diff-add-bg",
    "diff-remove",
    "diff-remove-bg",
    "highlighted-bg",
    "highlighted-warning-bg",
    "highlighted-error-bg",
];

pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether pages at this URL path go through [`Plugin::process`].
    fn accepts(&self, url: &str) -> bool {
        url.ends_with(".html")
    }

    fn setup(&self, _registry: &mut Registry) -> Result<(), ConfigError> {
        Ok(())
    }

    fn process(&self, page: &mut Page, cx: &ProcessContext) -> Result<(), PageError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Plugin;
    use crate::hooks::Registry;
    use crate::site::{Page, ProcessContext};

    /// Set up `plugins` and run them over one page.
    pub(crate) fn run(plugins: &[&dyn Plugin], html: &str) -> (String, ProcessContext) {
        let mut registry = Registry::new();
        for plugin in plugins {
            plugin.setup(&mut registry).expect("setup succeeds");
        }
        let cx = ProcessContext::new(registry.freeze());
        let mut page = Page::new("/index.html", html);
        for plugin in plugins {
            plugin.process(&mut page, &cx).expect("page processes");
        }
        (page.content().to_string(), cx)
    }
}
