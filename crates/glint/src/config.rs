//! Configuration: validated highlight options and the `glint.toml` file.
//!
//! The file is parsed once into [`ConfigFile`] and merged into validated
//! options. The single-theme/multi-theme choice is settled here, as a
//! [`ThemeSelection`], and never re-checked at use sites.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::engine::HighlighterConfig;
use crate::error::ConfigError;
use crate::plugins::{
    AttributeLabel, AttributeOptions, CopyButton, CopyOptions, CssBundle, CssBundleOptions,
    ExtraAssets, ExtraOptions, Highlight, LangLabel, LangOptions, Plugin,
};
use crate::transformers::{Transformer, TransformerKind};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "glint.toml";

pub const DEFAULT_THEME: &str = "InspiredGitHub";
pub const DEFAULT_LIGHT_THEME: &str = "InspiredGitHub";
pub const DEFAULT_DARK_THEME: &str = "base16-ocean.dark";
pub const DEFAULT_PREFIX: &str = "--glint-";
pub const DEFAULT_COLOR_ATTRIBUTE: &str = "data-color";

/// Which theme(s) code is highlighted with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeSelection {
    Single {
        theme: String,
    },
    /// Color-mode key (`light`, `dark`, ...) to theme name.
    Multi {
        themes: IndexMap<String, String>,
        /// Stamped on `<body>` when set.
        default_color: Option<String>,
    },
}

impl Default for ThemeSelection {
    fn default() -> Self {
        ThemeSelection::Single {
            theme: DEFAULT_THEME.to_string(),
        }
    }
}

impl ThemeSelection {
    /// Light and dark defaults.
    pub fn light_dark() -> Self {
        let mut themes = IndexMap::new();
        themes.insert("light".to_string(), DEFAULT_LIGHT_THEME.to_string());
        themes.insert("dark".to_string(), DEFAULT_DARK_THEME.to_string());
        ThemeSelection::Multi {
            themes,
            default_color: None,
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, ThemeSelection::Multi { .. })
    }

    /// `(color key, theme name)` pairs; the key is `None` for a single theme.
    pub fn entries(&self) -> Vec<(Option<&str>, &str)> {
        match self {
            ThemeSelection::Single { theme } => vec![(None, theme.as_str())],
            ThemeSelection::Multi { themes, .. } => themes
                .iter()
                .map(|(color, theme)| (Some(color.as_str()), theme.as_str()))
                .collect(),
        }
    }

    pub fn default_color(&self) -> Option<&str> {
        match self {
            ThemeSelection::Single { .. } => None,
            ThemeSelection::Multi { default_color, .. } => default_color.as_deref(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let ThemeSelection::Multi {
            themes,
            default_color,
        } = self
        else {
            return Ok(());
        };
        if themes.is_empty() {
            return Err(ConfigError::EmptyThemes);
        }
        if let Some(color) = default_color
            && !themes.contains_key(color)
        {
            return Err(ConfigError::UnknownDefaultColor {
                color: color.clone(),
                known: themes.keys().cloned().collect::<Vec<_>>().join(", "),
            });
        }
        Ok(())
    }
}

/// A CSS custom property that is mapped per color, optionally with a
/// fallback value (`inherit` otherwise).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ThemedVariable {
    Name(String),
    WithFallback(String, String),
}

impl ThemedVariable {
    pub fn suffix(&self) -> &str {
        match self {
            ThemedVariable::Name(name) | ThemedVariable::WithFallback(name, _) => name,
        }
    }

    pub fn fallback(&self) -> &str {
        match self {
            ThemedVariable::Name(_) => "inherit",
            ThemedVariable::WithFallback(_, fallback) => fallback,
        }
    }
}

impl From<&str> for ThemedVariable {
    fn from(name: &str) -> Self {
        ThemedVariable::Name(name.to_string())
    }
}

/// Where a label or button goes inside the block wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    #[default]
    Top,
    Bottom,
}

impl Position {
    /// Tag name of the wrapper slot.
    pub fn container(self) -> &'static str {
        match self {
            Position::Top => "header",
            Position::Bottom => "footer",
        }
    }
}

/// Options of the highlight-and-inject pipeline.
#[derive(Clone)]
pub struct HighlightOptions {
    /// Page extensions to process.
    pub extensions: Vec<String>,
    pub theme: ThemeSelection,
    pub highlighter: HighlighterConfig,
    /// Shared CSS output path. When set, no per-page `<style>` is injected.
    pub css_file: Option<String>,
    pub extra_css: String,
    pub transformers: Vec<Arc<dyn Transformer>>,
    pub css_variable_prefix: String,
    pub css_themed_variables: Vec<ThemedVariable>,
    /// Switch colors with `prefers-color-scheme` instead of an attribute.
    pub use_color_scheme: bool,
    /// Attribute stamped on `<body>` with the default color.
    pub color_attribute: String,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self {
            extensions: vec![".html".to_string()],
            theme: ThemeSelection::default(),
            highlighter: HighlighterConfig::default(),
            css_file: None,
            extra_css: String::new(),
            transformers: Vec::new(),
            css_variable_prefix: DEFAULT_PREFIX.to_string(),
            css_themed_variables: Vec::new(),
            use_color_scheme: false,
            color_attribute: DEFAULT_COLOR_ATTRIBUTE.to_string(),
        }
    }
}

impl std::fmt::Debug for HighlightOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighlightOptions")
            .field("extensions", &self.extensions)
            .field("theme", &self.theme)
            .field("highlighter", &self.highlighter)
            .field("css_file", &self.css_file)
            .field(
                "transformers",
                &self.transformers.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("css_variable_prefix", &self.css_variable_prefix)
            .field("css_themed_variables", &self.css_themed_variables)
            .field("use_color_scheme", &self.use_color_scheme)
            .field("color_attribute", &self.color_attribute)
            .finish_non_exhaustive()
    }
}

impl HighlightOptions {
    /// Check the options and add every referenced theme to the preload list.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        self.theme.validate()?;
        for ext in &self.extensions {
            validate_extension(ext)?;
        }
        if !self.css_variable_prefix.starts_with("--") {
            return Err(ConfigError::InvalidPrefix(self.css_variable_prefix));
        }
        validate_attribute(&self.color_attribute)?;
        if let Some(path) = &self.css_file {
            self.css_file = Some(normalize_file_path(path)?);
        }

        if !self.highlighter.themes.is_empty() {
            for (_, name) in self.theme.entries() {
                if !self.highlighter.themes.iter().any(|t| t == name) {
                    self.highlighter.themes.push(name.to_string());
                }
            }
        }
        Ok(self)
    }
}

/// Raw contents of `glint.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub extensions: Option<Vec<String>>,
    pub css_file: Option<String>,
    pub extra_css: Option<String>,
    pub transformers: Vec<TransformerKind>,
    pub css_variable_prefix: Option<String>,
    pub css_themed_variables: Vec<ThemedVariable>,
    pub use_color_scheme: bool,
    pub color_attribute: Option<String>,
    pub theme: Option<String>,
    pub themes: Option<IndexMap<String, String>>,
    pub default_color: Option<String>,
    pub highlighter: HighlighterConfig,
    pub css: Option<CssBundleOptions>,
    pub extra: Option<ExtraOptions>,
    pub lang: Option<LangOptions>,
    pub copy: Option<CopyOptions>,
    pub attribute: Vec<AttributeOptions>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, path)
    }

    /// Parse TOML text; `path` is only used for error messages.
    pub fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Merge the file over the defaults.
    pub fn highlight_options(&self) -> Result<HighlightOptions, ConfigError> {
        let theme = match (&self.theme, &self.themes) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingThemes),
            (Some(theme), None) => {
                if self.default_color.is_some() {
                    return Err(ConfigError::DefaultColorWithoutThemes);
                }
                ThemeSelection::Single {
                    theme: theme.clone(),
                }
            }
            (None, Some(themes)) => ThemeSelection::Multi {
                themes: themes.clone(),
                default_color: self.default_color.clone(),
            },
            (None, None) => {
                if self.default_color.is_some() {
                    return Err(ConfigError::DefaultColorWithoutThemes);
                }
                ThemeSelection::default()
            }
        };

        let defaults = HighlightOptions::default();
        HighlightOptions {
            extensions: self.extensions.clone().unwrap_or(defaults.extensions),
            theme,
            highlighter: self.highlighter.clone(),
            css_file: self.css_file.clone(),
            extra_css: self.extra_css.clone().unwrap_or_default(),
            transformers: self.transformers.iter().map(|kind| kind.build()).collect(),
            css_variable_prefix: self
                .css_variable_prefix
                .clone()
                .unwrap_or(defaults.css_variable_prefix),
            css_themed_variables: self.css_themed_variables.clone(),
            use_color_scheme: self.use_color_scheme,
            color_attribute: self
                .color_attribute
                .clone()
                .unwrap_or(defaults.color_attribute),
        }
        .validate()
    }

    /// Plugins enabled by this file, in processing order: highlight, CSS
    /// bundle, extra assets, attribute labels, language label, copy button.
    pub fn plugins(&self) -> Result<Vec<Box<dyn Plugin>>, ConfigError> {
        let mut plugins: Vec<Box<dyn Plugin>> = vec![Box::new(Highlight::new(self.highlight_options()?)?)];
        if let Some(css) = &self.css {
            plugins.push(Box::new(CssBundle::new(css.clone())?));
        }
        if let Some(extra) = &self.extra {
            plugins.push(Box::new(ExtraAssets::new(extra.clone())?));
        }
        for attribute in &self.attribute {
            plugins.push(Box::new(AttributeLabel::new(attribute.clone())?));
        }
        if let Some(lang) = &self.lang {
            plugins.push(Box::new(LangLabel::new(lang.clone())));
        }
        if let Some(copy) = &self.copy {
            plugins.push(Box::new(CopyButton::new(copy.clone())?));
        }
        Ok(plugins)
    }
}

/// Find the config file: an explicit path must exist, otherwise `glint.toml`
/// in the working directory is used when present.
pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default = PathBuf::from(CONFIG_FILE);
            default.is_file().then_some(default)
        }
    }
}

/// `styles/glint` becomes `/styles/glint/`.
pub fn normalize_base_dir(dir: &str) -> Result<String, ConfigError> {
    let trimmed = dir.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Ok("/".to_string());
    }
    if trimmed.contains('\\') || trimmed.split('/').any(|seg| seg.is_empty() || seg == "..") {
        return Err(ConfigError::InvalidBaseDir(dir.to_string()));
    }
    Ok(format!("/{trimmed}/"))
}

/// `styles/code.css` becomes `/styles/code.css`.
pub fn normalize_file_path(path: &str) -> Result<String, ConfigError> {
    let trimmed = path.trim().trim_start_matches('/');
    if trimmed.is_empty()
        || trimmed.ends_with('/')
        || trimmed.contains('\\')
        || trimmed.split('/').any(|seg| seg.is_empty() || seg == "..")
    {
        return Err(ConfigError::InvalidBaseDir(path.to_string()));
    }
    Ok(format!("/{trimmed}"))
}

fn validate_extension(ext: &str) -> Result<(), ConfigError> {
    let valid = ext.len() > 1
        && ext.starts_with('.')
        && ext[1..].chars().all(|c| c.is_ascii_alphanumeric() || c == '.');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidExtension(ext.to_string()))
    }
}

/// HTML attribute names accepted in configuration.
pub(crate) fn validate_attribute(name: &str) -> Result<(), ConfigError> {
    let valid = !name.is_empty()
        && name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidAttribute(name.to_string()))
    }
}
