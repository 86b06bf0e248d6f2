//! Highlighting engine adapter around syntect.
//!
//! The [`Highlighter`] is built once per build from a [`HighlighterConfig`]
//! (languages and themes to preload) and is read-only afterwards, so a single
//! instance can be shared by reference across worker threads.
//!
//! A highlight call tokenizes the source once, then styles the same parse
//! operations once per theme. The per-theme token streams are merged so every
//! token carries one style per theme, which is what dual-theme output needs.

mod code;
mod languages;

pub use code::{
    AppliedTheme, HighlightedCode, LINE_CLASS, Line, ROOT_CLASS, Token, hex, theme_class,
};
pub use languages::{LanguageCatalog, LanguageInfo, PLAIN_TEXT_IDS};

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use syntect::highlighting::{
    HighlightIterator, HighlightState, Highlighter as ThemeHighlighter, Theme, ThemeSet,
};
use syntect::parsing::{ParseState, ScopeStack, SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::config::ThemeSelection;
use crate::error::HighlightError;
use crate::transformers::Transformer;

/// Which languages and themes the engine preloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HighlighterConfig {
    /// Language ids to accept. Empty means every bundled language.
    pub langs: Vec<String>,
    /// Bundled theme names to load. Empty means every bundled theme.
    pub themes: Vec<String>,
    /// Extra `.tmTheme` files.
    pub theme_files: Vec<PathBuf>,
    /// Extra folders of `.sublime-syntax` definitions.
    pub syntax_dirs: Vec<PathBuf>,
}

/// One highlight call.
pub struct HighlightRequest<'a> {
    pub source: &'a str,
    pub language: &'a str,
    pub theme: &'a ThemeSelection,
    pub transformers: &'a [Arc<dyn Transformer>],
    pub css_variable_prefix: &'a str,
    /// Color key to render as plain properties. The page pipeline always
    /// passes `None` and manages default colors itself.
    pub default_color: Option<&'a str>,
}

/// A loaded highlighting engine.
pub struct Highlighter {
    syntaxes: SyntaxSet,
    themes: BTreeMap<String, Theme>,
    catalog: LanguageCatalog,
    /// Syntax names accepted, or `None` for all of them.
    allowed: Option<Vec<String>>,
}

impl std::fmt::Debug for Highlighter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Highlighter")
            .field("languages", &self.catalog.len())
            .field("themes", &self.themes.keys().collect::<Vec<_>>())
            .field("allowed", &self.allowed)
            .finish()
    }
}

impl Highlighter {
    /// Load syntaxes and themes.
    pub fn new(config: &HighlighterConfig) -> Result<Self, HighlightError> {
        let syntaxes = if config.syntax_dirs.is_empty() {
            SyntaxSet::load_defaults_newlines()
        } else {
            let mut builder = SyntaxSet::load_defaults_newlines().into_builder();
            for dir in &config.syntax_dirs {
                builder
                    .add_from_folder(dir, true)
                    .map_err(|e| HighlightError::SyntaxFolder {
                        path: dir.clone(),
                        message: e.to_string(),
                    })?;
            }
            builder.build()
        };

        let mut bundled = ThemeSet::load_defaults().themes;
        let mut themes = BTreeMap::new();
        if config.themes.is_empty() {
            themes.extend(bundled);
        } else {
            for name in &config.themes {
                let Some(theme) = bundled.remove(name) else {
                    // May come from a theme file instead
                    continue;
                };
                themes.insert(name.clone(), theme);
            }
        }

        for path in &config.theme_files {
            let theme = ThemeSet::get_theme(path).map_err(|e| HighlightError::ThemeFile {
                path: path.clone(),
                message: e.to_string(),
            })?;
            let name = theme.name.clone().unwrap_or_else(|| {
                path.file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });
            themes.insert(name, theme);
        }

        for name in &config.themes {
            if !themes.contains_key(name) {
                return Err(HighlightError::ThemeNotLoaded {
                    theme: name.clone(),
                    loaded: themes.keys().cloned().collect::<Vec<_>>().join(", "),
                });
            }
        }

        let catalog = LanguageCatalog::from_syntaxes(&syntaxes);

        let allowed = if config.langs.is_empty() {
            None
        } else {
            let mut names = Vec::with_capacity(config.langs.len());
            for lang in &config.langs {
                if is_plain_text(lang) {
                    continue;
                }
                let syntax = find_syntax(&syntaxes, &catalog, lang).ok_or_else(|| {
                    HighlightError::UnsupportedLanguage {
                        language: lang.clone(),
                    }
                })?;
                names.push(syntax.name.clone());
            }
            Some(names)
        };

        tracing::debug!(
            languages = catalog.len(),
            themes = themes.len(),
            "highlighter loaded"
        );

        Ok(Self {
            syntaxes,
            themes,
            catalog,
            allowed,
        })
    }

    /// Language metadata of everything the engine bundles.
    pub fn languages(&self) -> &LanguageCatalog {
        &self.catalog
    }

    pub fn theme_names(&self) -> impl Iterator<Item = &str> {
        self.themes.keys().map(String::as_str)
    }

    /// Highlight `request.source` and run the request's transformers over the result.
    pub fn highlight(&self, request: &HighlightRequest<'_>) -> Result<HighlightedCode, HighlightError> {
        let syntax = self.resolve_syntax(request.language)?;

        let mut applied = Vec::new();
        let mut loaded = Vec::new();
        for (color, name) in request.theme.entries() {
            let theme = self.themes.get(name).ok_or_else(|| HighlightError::ThemeNotLoaded {
                theme: name.to_string(),
                loaded: self.themes.keys().cloned().collect::<Vec<_>>().join(", "),
            })?;
            applied.push(AppliedTheme {
                color: color.map(str::to_string),
                name: name.to_string(),
                foreground: theme.settings.foreground.unwrap_or(syntect::highlighting::Color::BLACK),
                background: theme.settings.background.unwrap_or(syntect::highlighting::Color::WHITE),
            });
            loaded.push(theme);
        }

        let highlighters: Vec<ThemeHighlighter<'_>> =
            loaded.iter().map(|theme| ThemeHighlighter::new(theme)).collect();
        let mut states: Vec<HighlightState> = highlighters
            .iter()
            .map(|h| HighlightState::new(h, ScopeStack::new()))
            .collect();
        let mut parse_state = ParseState::new(syntax);

        let source = request.source.trim_end_matches('\n');
        let mut lines = Vec::new();
        for line in LinesWithEndings::from(source) {
            let ops = parse_state
                .parse_line(line, &self.syntaxes)
                .map_err(|e| HighlightError::Tokenize {
                    language: request.language.to_string(),
                    message: e.to_string(),
                })?;

            let styled: Vec<Vec<_>> = highlighters
                .iter()
                .zip(states.iter_mut())
                .map(|(highlighter, state)| {
                    HighlightIterator::new(state, &ops, line, highlighter).collect()
                })
                .collect();

            lines.push(Line::from_styled(line, &styled));
        }

        let mut pre_classes = vec![ROOT_CLASS.to_string()];
        if request.theme.is_multi() {
            pre_classes.push(format!("{ROOT_CLASS}-themes"));
        }
        for theme in &applied {
            let class = theme_class(&theme.name);
            if !pre_classes.contains(&class) {
                pre_classes.push(class);
            }
        }

        let mut code = HighlightedCode {
            language: request.language.to_string(),
            themes: applied,
            pre_classes,
            lines,
            css_variable_prefix: request.css_variable_prefix.to_string(),
            default_color: request.default_color.map(str::to_string),
        };

        for transformer in request.transformers {
            transformer.transform(&mut code);
        }

        Ok(code)
    }

    fn resolve_syntax(&self, lang: &str) -> Result<&SyntaxReference, HighlightError> {
        if is_plain_text(lang) {
            return Ok(self.syntaxes.find_syntax_plain_text());
        }

        let unsupported = || HighlightError::UnsupportedLanguage {
            language: lang.to_string(),
        };

        let syntax = find_syntax(&self.syntaxes, &self.catalog, lang).ok_or_else(unsupported)?;
        if let Some(allowed) = &self.allowed
            && !allowed.contains(&syntax.name)
        {
            return Err(unsupported());
        }
        Ok(syntax)
    }
}

fn is_plain_text(lang: &str) -> bool {
    PLAIN_TEXT_IDS.iter().any(|id| id.eq_ignore_ascii_case(lang))
}

fn find_syntax<'s>(
    syntaxes: &'s SyntaxSet,
    catalog: &LanguageCatalog,
    lang: &str,
) -> Option<&'s SyntaxReference> {
    catalog
        .find(lang)
        .and_then(|info| syntaxes.find_syntax_by_name(&info.name))
        .or_else(|| syntaxes.find_syntax_by_token(lang))
}
