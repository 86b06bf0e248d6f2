//! Language labels, e.g. `js` for a `language-javascript` block.

use std::sync::Arc;

use serde::Deserialize;

use super::{AttributeLabel, Plugin};
use crate::config::Position;
use crate::engine::LanguageCatalog;
use crate::error::{ConfigError, PageError};
use crate::hooks::Registry;
use crate::site::{Page, ProcessContext};

/// `[lang]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LangOptions {
    pub position: Position,
    pub order: i32,
}

impl Default for LangOptions {
    fn default() -> Self {
        Self {
            position: Position::Top,
            order: 1,
        }
    }
}

/// Language label: an attribute label on `lang` whose default value is the
/// shortest known name of the block's language. Blocks in a language the
/// engine does not know get no label.
pub struct LangLabel {
    label: AttributeLabel,
}

impl LangLabel {
    pub fn new(options: LangOptions) -> Self {
        Self::with_catalog(options, LanguageCatalog::bundled())
    }

    /// Resolve languages against `catalog` instead of the bundled metadata.
    pub fn with_catalog(options: LangOptions, catalog: impl Into<CatalogRef>) -> Self {
        let catalog = catalog.into();
        let label = AttributeLabel::with_parts("lang", options.position, options.order)
            .with_default_value(move |block| {
                let lang = block.language()?;
                catalog
                    .get()
                    .find(lang)
                    .map(|info| info.shortest_alias().to_string())
            });
        Self { label }
    }
}

/// A language catalog, either the bundled one or one supplied by the caller.
pub enum CatalogRef {
    Static(&'static LanguageCatalog),
    Shared(Arc<LanguageCatalog>),
}

impl CatalogRef {
    fn get(&self) -> &LanguageCatalog {
        match self {
            CatalogRef::Static(catalog) => catalog,
            CatalogRef::Shared(catalog) => catalog,
        }
    }
}

impl From<&'static LanguageCatalog> for CatalogRef {
    fn from(catalog: &'static LanguageCatalog) -> Self {
        CatalogRef::Static(catalog)
    }
}

impl From<Arc<LanguageCatalog>> for CatalogRef {
    fn from(catalog: Arc<LanguageCatalog>) -> Self {
        CatalogRef::Shared(catalog)
    }
}

impl From<LanguageCatalog> for CatalogRef {
    fn from(catalog: LanguageCatalog) -> Self {
        CatalogRef::Shared(Arc::new(catalog))
    }
}

impl Plugin for LangLabel {
    fn name(&self) -> &'static str {
        "lang-label"
    }

    fn accepts(&self, url: &str) -> bool {
        self.label.accepts(url)
    }

    fn setup(&self, registry: &mut Registry) -> Result<(), ConfigError> {
        self.label.setup(registry)
    }

    fn process(&self, page: &mut Page, cx: &ProcessContext) -> Result<(), PageError> {
        self.label.process(page, cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LanguageInfo;
    use crate::plugins::testing::run;
    use crate::site::Counter;

    fn wrapped(class: &str) -> String {
        format!(
            "<div class=\"code-block\"><header></header><pre><code class=\"{class}\">x</code></pre><footer></footer></div>"
        )
    }

    #[test]
    fn shortest_alias_is_the_label() {
        let catalog = LanguageCatalog::new(vec![LanguageInfo::new("javascript", "JavaScript", &["js"])]);
        let plugin = LangLabel::with_catalog(LangOptions::default(), catalog);
        assert_eq!(plugin.label.attribute(), "lang");
        let (html, _) = run(&[&plugin], &wrapped("language-js"));
        assert!(html.contains("<header><div style=\"order: 1\" class=\"attribute-lang\">js</div></header>"));
    }

    #[test]
    fn bundled_metadata() {
        let plugin = LangLabel::new(LangOptions::default());
        let (html, _) = run(&[&plugin], &wrapped("language-javascript"));
        assert!(html.contains("class=\"attribute-lang\">js</div>"));
    }

    #[test]
    fn unknown_language_gets_no_label() {
        let plugin = LangLabel::new(LangOptions::default());
        let page = wrapped("language-nonexistent-xyz");
        let (html, cx) = run(&[&plugin], &page);
        assert_eq!(html, page);
        assert_eq!(cx.count(Counter::Labels), 0);
    }

    #[test]
    fn explicit_lang_attribute_wins() {
        let plugin = LangLabel::new(LangOptions {
            position: Position::Bottom,
            order: 4,
        });
        let page = wrapped("language-js\" lang=\"ECMAScript");
        let (html, _) = run(&[&plugin], &page);
        assert!(html.contains("<footer><div style=\"order: 4\" class=\"attribute-lang\">ECMAScript</div></footer>"));
        assert!(!html.contains("lang=\"ECMAScript\""));
    }
}
