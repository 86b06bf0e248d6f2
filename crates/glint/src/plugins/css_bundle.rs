//! Stylesheets for wrapped blocks and notation classes.

use indexmap::IndexMap;
use serde::Deserialize;

use super::{NOTATION_VARIABLES, Plugin};
use crate::config::normalize_base_dir;
use crate::error::{ConfigError, PageError};
use crate::hooks::{Asset, Registry};
use crate::html;
use crate::site::{Page, ProcessContext};

/// Marks the `@import` stylesheet so it is added once per page.
const BUNDLE_STYLE: &str = r#"style[data-glint="bundle"]"#;

/// A stylesheet shipped with glint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StyleSheet {
    Main,
    NotationDiff,
    NotationErrorLevel,
    NotationFocus,
    NotationHighlight,
    RenderWhitespace,
}

impl StyleSheet {
    pub const ALL: [StyleSheet; 6] = [
        StyleSheet::Main,
        StyleSheet::NotationDiff,
        StyleSheet::NotationErrorLevel,
        StyleSheet::NotationFocus,
        StyleSheet::NotationHighlight,
        StyleSheet::RenderWhitespace,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            StyleSheet::Main => "main.css",
            StyleSheet::NotationDiff => "notation-diff.css",
            StyleSheet::NotationErrorLevel => "notation-error-level.css",
            StyleSheet::NotationFocus => "notation-focus.css",
            StyleSheet::NotationHighlight => "notation-highlight.css",
            StyleSheet::RenderWhitespace => "render-whitespace.css",
        }
    }

    pub fn contents(self) -> &'static str {
        match self {
            StyleSheet::Main => include_str!("../../assets/styles/main.css"),
            StyleSheet::NotationDiff => include_str!("../../assets/styles/notation-diff.css"),
            StyleSheet::NotationErrorLevel => {
                include_str!("../../assets/styles/notation-error-level.css")
            }
            StyleSheet::NotationFocus => include_str!("../../assets/styles/notation-focus.css"),
            StyleSheet::NotationHighlight => {
                include_str!("../../assets/styles/notation-highlight.css")
            }
            StyleSheet::RenderWhitespace => {
                include_str!("../../assets/styles/render-whitespace.css")
            }
        }
    }
}

/// `[css]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CssBundleOptions {
    /// Stylesheets to turn off or on. Missing entries are on.
    pub includes: IndexMap<StyleSheet, bool>,
    pub base_dir: String,
    /// Write the stylesheets into the output.
    pub copy_files: bool,
    /// Add a `<style>` importing every stylesheet to each page.
    pub import: bool,
}

impl Default for CssBundleOptions {
    fn default() -> Self {
        Self {
            includes: IndexMap::new(),
            base_dir: "styles/glint/".to_string(),
            copy_files: true,
            import: true,
        }
    }
}

/// Registers the bundled stylesheets and imports them from every page.
#[derive(Debug, Clone)]
pub struct CssBundle {
    /// URL paths of the included stylesheets.
    files: Vec<(StyleSheet, String)>,
    copy_files: bool,
    import: bool,
}

impl CssBundle {
    pub fn new(options: CssBundleOptions) -> Result<Self, ConfigError> {
        let base_dir = normalize_base_dir(&options.base_dir)?;
        let files = StyleSheet::ALL
            .into_iter()
            .filter(|sheet| options.includes.get(sheet).copied().unwrap_or(true))
            .map(|sheet| (sheet, format!("{base_dir}{}", sheet.file_name())))
            .collect();
        Ok(Self {
            files,
            copy_files: options.copy_files,
            import: options.import,
        })
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|(_, url)| url.as_str())
    }

    /// `<style>` element importing every stylesheet.
    pub fn import_style(&self) -> String {
        let mut style = String::from("<style data-glint=\"bundle\">\n");
        for url in self.urls() {
            style.push_str(&format!("@import \"{url}\";\n"));
        }
        style.push_str("</style>");
        style
    }
}

impl Plugin for CssBundle {
    fn name(&self) -> &'static str {
        "css-bundle"
    }

    fn setup(&self, registry: &mut Registry) -> Result<(), ConfigError> {
        for (sheet, url) in &self.files {
            registry.add_asset(Asset::new(url.clone(), sheet.contents(), self.copy_files));
        }
        registry.add_themed_variables(NOTATION_VARIABLES.iter().copied());
        Ok(())
    }

    fn process(&self, page: &mut Page, _cx: &ProcessContext) -> Result<(), PageError> {
        if !self.import || self.files.is_empty() || html::contains_element(page.content(), BUNDLE_STYLE)? {
            return Ok(());
        }
        let html = html::insert_into_head(page.content(), &self.import_style())?;
        page.set_content(html);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::testing::run;

    #[test]
    fn registers_assets_under_base_dir() {
        let mut includes = IndexMap::new();
        includes.insert(StyleSheet::RenderWhitespace, false);
        let plugin = CssBundle::new(CssBundleOptions {
            includes,
            base_dir: "assets/code".into(),
            ..CssBundleOptions::default()
        })
        .unwrap();
        let (html, cx) = run(&[&plugin], "<html><head><!-- glint-imports --></head></html>");

        let urls: Vec<&str> = cx.hooks().assets().iter().map(|a| a.url.as_str()).collect();
        assert_eq!(
            urls,
            [
                "/assets/code/main.css",
                "/assets/code/notation-diff.css",
                "/assets/code/notation-error-level.css",
                "/assets/code/notation-focus.css",
                "/assets/code/notation-highlight.css",
            ]
        );
        assert!(cx.hooks().assets().iter().all(|a| a.copy));
        assert!(html.starts_with(
            "<html><head><style data-glint=\"bundle\">\n@import \"/assets/code/main.css\";\n"
        ));
        assert!(html.ends_with("</style><!-- glint-imports --></head></html>"));
        assert_eq!(cx.hooks().themed_variables().len(), NOTATION_VARIABLES.len());
    }

    #[test]
    fn import_can_be_disabled() {
        let plugin = CssBundle::new(CssBundleOptions {
            import: false,
            ..CssBundleOptions::default()
        })
        .unwrap();
        let page = "<html><head></head></html>";
        let (html, _) = run(&[&plugin], page);
        assert_eq!(html, page);
    }

    #[test]
    fn imports_once() {
        let plugin = CssBundle::new(CssBundleOptions::default()).unwrap();
        let (once, _) = run(&[&plugin], "<html><head></head></html>");
        let (twice, _) = run(&[&plugin], &once);
        assert_eq!(once, twice);
    }

    #[test]
    fn rejects_parent_dirs() {
        assert!(CssBundle::new(CssBundleOptions {
            base_dir: "../styles".into(),
            ..CssBundleOptions::default()
        })
        .is_err());
    }
}
