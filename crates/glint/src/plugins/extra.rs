//! Notation transformers plus their stylesheets, without touching pages.

use serde::Deserialize;

use super::{NOTATION_VARIABLES, Plugin, StyleSheet};
use crate::config::normalize_base_dir;
use crate::error::{ConfigError, PageError};
use crate::hooks::{Asset, Registry};
use crate::site::{Page, ProcessContext};
use crate::transformers::TransformerKind;

const SHEETS: [StyleSheet; 5] = [
    StyleSheet::Main,
    StyleSheet::NotationDiff,
    StyleSheet::NotationErrorLevel,
    StyleSheet::NotationFocus,
    StyleSheet::NotationHighlight,
];

/// `[extra]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtraOptions {
    pub base_dir: String,
    pub copy_files: bool,
    pub transformers: Vec<TransformerKind>,
}

impl Default for ExtraOptions {
    fn default() -> Self {
        Self {
            base_dir: "styles/glint-extra/".to_string(),
            copy_files: false,
            transformers: vec![
                TransformerKind::NotationDiff,
                TransformerKind::NotationErrorLevel,
                TransformerKind::NotationFocus,
                TransformerKind::NotationHighlight,
            ],
        }
    }
}

/// Registers the notation transformers, their variables and stylesheets.
/// Pages are left to the highlight plugin.
#[derive(Debug, Clone)]
pub struct ExtraAssets {
    base_dir: String,
    copy_files: bool,
    transformers: Vec<TransformerKind>,
}

impl ExtraAssets {
    pub fn new(options: ExtraOptions) -> Result<Self, ConfigError> {
        Ok(Self {
            base_dir: normalize_base_dir(&options.base_dir)?,
            copy_files: options.copy_files,
            transformers: options.transformers,
        })
    }
}

impl Plugin for ExtraAssets {
    fn name(&self) -> &'static str {
        "extra-assets"
    }

    fn accepts(&self, _url: &str) -> bool {
        false
    }

    fn setup(&self, registry: &mut Registry) -> Result<(), ConfigError> {
        for sheet in SHEETS {
            let url = format!("{}{}", self.base_dir, sheet.file_name());
            registry.add_asset(Asset::new(url, sheet.contents(), self.copy_files));
        }
        registry.add_transformers(self.transformers.iter().map(|kind| kind.build()));
        registry.add_themed_variables(NOTATION_VARIABLES.iter().copied());
        Ok(())
    }

    fn process(&self, _page: &mut Page, _cx: &ProcessContext) -> Result<(), PageError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_everything() {
        let plugin = ExtraAssets::new(ExtraOptions::default()).unwrap();
        let mut registry = Registry::new();
        plugin.setup(&mut registry).unwrap();
        let hooks = registry.freeze();

        let names: Vec<&str> = hooks.transformers().iter().map(|t| t.name()).collect();
        assert_eq!(names.len(), 4);
        assert_eq!(hooks.assets().len(), 5);
        assert_eq!(hooks.assets()[0].url, "/styles/glint-extra/main.css");
        assert!(hooks.assets().iter().all(|a| !a.copy));
        assert_eq!(hooks.themed_variables().len(), NOTATION_VARIABLES.len());
        assert!(!plugin.accepts("/index.html"));
    }

    #[test]
    fn honours_base_dir_and_transformer_list() {
        let plugin = ExtraAssets::new(ExtraOptions {
            base_dir: "css".into(),
            copy_files: true,
            transformers: vec![TransformerKind::RenderWhitespace],
        })
        .unwrap();
        let mut registry = Registry::new();
        plugin.setup(&mut registry).unwrap();
        let hooks = registry.freeze();

        assert_eq!(hooks.transformers().len(), 1);
        assert_eq!(hooks.assets()[4].url, "/css/notation-highlight.css");
        assert!(hooks.assets()[4].copy);
    }
}
