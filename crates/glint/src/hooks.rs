//! Registry that plugins populate during setup.
//!
//! Plugins add transformers, themed CSS variables and static assets to a
//! [`Registry`]. Once every plugin has been set up the registry is frozen into
//! [`Hooks`], which page processing only reads. Registration order does not
//! matter beyond the order in which entries are reported.

use std::borrow::Cow;
use std::sync::Arc;

use crate::config::ThemedVariable;
use crate::transformers::Transformer;

/// A static file served next to the generated pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// URL path, e.g. `/styles/glint/main.css`.
    pub url: String,
    pub contents: Cow<'static, str>,
    /// Written into the output directory when set, otherwise only referenced.
    pub copy: bool,
}

impl Asset {
    pub fn new(url: impl Into<String>, contents: impl Into<Cow<'static, str>>, copy: bool) -> Self {
        Self {
            url: url.into(),
            contents: contents.into(),
            copy,
        }
    }
}

/// Mutable registry used while plugins are set up.
#[derive(Default)]
pub struct Registry {
    transformers: Vec<Arc<dyn Transformer>>,
    themed_variables: Vec<ThemedVariable>,
    assets: Vec<Asset>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add transformers. One with the same name as an already registered
    /// transformer is ignored.
    pub fn add_transformers(&mut self, transformers: impl IntoIterator<Item = Arc<dyn Transformer>>) {
        for transformer in transformers {
            if self.transformers.iter().any(|t| t.name() == transformer.name()) {
                tracing::debug!(name = transformer.name(), "transformer already registered");
                continue;
            }
            self.transformers.push(transformer);
        }
    }

    /// Add CSS variables that need a per-color mapping. Suffixes already
    /// registered keep their first fallback.
    pub fn add_themed_variables<V>(&mut self, variables: impl IntoIterator<Item = V>)
    where
        V: Into<ThemedVariable>,
    {
        for variable in variables {
            let variable = variable.into();
            if !self
                .themed_variables
                .iter()
                .any(|v| v.suffix() == variable.suffix())
            {
                self.themed_variables.push(variable);
            }
        }
    }

    /// Register a static asset. A later registration of the same URL replaces
    /// the contents, and the asset is copied if any registration asks for it.
    pub fn add_asset(&mut self, asset: Asset) {
        match self.assets.iter_mut().find(|a| a.url == asset.url) {
            Some(existing) => {
                existing.copy |= asset.copy;
                existing.contents = asset.contents;
            }
            None => self.assets.push(asset),
        }
    }

    /// Close the registry.
    pub fn freeze(self) -> Hooks {
        Hooks {
            transformers: self.transformers,
            themed_variables: self.themed_variables,
            assets: self.assets,
        }
    }
}

/// Read-only view of everything plugins registered.
#[derive(Clone, Default)]
pub struct Hooks {
    transformers: Vec<Arc<dyn Transformer>>,
    themed_variables: Vec<ThemedVariable>,
    assets: Vec<Asset>,
}

impl Hooks {
    pub fn transformers(&self) -> &[Arc<dyn Transformer>] {
        &self.transformers
    }

    pub fn themed_variables(&self) -> &[ThemedVariable] {
        &self.themed_variables
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field(
                "transformers",
                &self.transformers.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("themed_variables", &self.themed_variables)
            .field("assets", &self.assets.iter().map(|a| &a.url).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transformers::{NotationDiff, NotationFocus};

    #[test]
    fn transformers_are_deduplicated_by_name() {
        let mut registry = Registry::new();
        registry.add_transformers([Arc::new(NotationDiff) as Arc<dyn Transformer>]);
        registry.add_transformers([
            Arc::new(NotationFocus) as Arc<dyn Transformer>,
            Arc::new(NotationDiff) as Arc<dyn Transformer>,
        ]);
        let hooks = registry.freeze();
        let names: Vec<&str> = hooks.transformers().iter().map(|t| t.name()).collect();
        assert_eq!(names, ["notation-diff", "notation-focus"]);
    }

    #[test]
    fn themed_variables_keep_first_fallback() {
        let mut registry = Registry::new();
        registry.add_themed_variables([ThemedVariable::WithFallback("diff-add".into(), "green".into())]);
        registry.add_themed_variables(["diff-add", "diff-remove"]);
        let hooks = registry.freeze();
        assert_eq!(
            hooks.themed_variables(),
            [
                ThemedVariable::WithFallback("diff-add".into(), "green".into()),
                ThemedVariable::from("diff-remove"),
            ]
        );
    }

    #[test]
    fn assets_merge_by_url() {
        let mut registry = Registry::new();
        registry.add_asset(Asset::new("/a.css", "a {}", false));
        registry.add_asset(Asset::new("/a.css", "b {}", true));
        let hooks = registry.freeze();
        assert_eq!(hooks.assets(), [Asset::new("/a.css", "b {}", true)]);
    }
}
