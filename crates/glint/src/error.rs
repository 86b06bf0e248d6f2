//! Error types shared by the engine, the plugins and the site driver.

use std::path::PathBuf;

use thiserror::Error;

/// Invalid or inconsistent configuration.
///
/// Raised while options are merged and plugins are set up, before any page is
/// touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("`theme` and `themes` are mutually exclusive")]
    ConflictingThemes,

    #[error("`themes` must map at least one color to a theme")]
    EmptyThemes,

    #[error("`default_color` is set but no `themes` table is configured")]
    DefaultColorWithoutThemes,

    #[error("default color `{color}` is not one of the configured colors ({known})")]
    UnknownDefaultColor { color: String, known: String },

    #[error("invalid base directory `{0}`")]
    InvalidBaseDir(String),

    #[error("invalid extension `{0}` (expected something like `.html`)")]
    InvalidExtension(String),

    #[error("invalid CSS variable prefix `{0}` (must start with `--`)")]
    InvalidPrefix(String),

    #[error("invalid attribute name `{0}`")]
    InvalidAttribute(String),

    #[error("unknown theme `{theme}` (available: {known})")]
    UnknownTheme { theme: String, known: String },

    #[error("failed to load the highlighter: {0}")]
    Engine(#[from] HighlightError),
}

/// Failures of the highlighting engine.
///
/// These are not recovered locally: an unsupported language is a content or
/// configuration problem the author has to fix.
#[derive(Debug, Clone, Error)]
pub enum HighlightError {
    #[error("unsupported language `{language}`")]
    UnsupportedLanguage { language: String },

    #[error("theme `{theme}` is not loaded (loaded: {loaded})")]
    ThemeNotLoaded { theme: String, loaded: String },

    #[error("failed to load theme file {path}: {message}")]
    ThemeFile { path: PathBuf, message: String },

    #[error("failed to load syntax folder {path}: {message}")]
    SyntaxFolder { path: PathBuf, message: String },

    #[error("failed to tokenize `{language}` source: {message}")]
    Tokenize { language: String, message: String },
}

/// A single page could not be processed.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("failed to read page: {0}")]
    Read(#[source] std::io::Error),

    #[error(transparent)]
    Highlight(#[from] HighlightError),

    #[error("HTML rewriting failed: {0}")]
    Rewrite(#[from] lol_html::errors::RewritingError),
}

/// Errors that abort a whole build.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to clone {from} into {to}: {message}")]
    Clone {
        from: PathBuf,
        to: PathBuf,
        message: String,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
