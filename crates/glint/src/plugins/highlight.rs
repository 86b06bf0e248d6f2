//! The highlight-and-inject pipeline.
//!
//! For every page: find `<pre><code class="language-*">` blocks, highlight
//! them, splice the result into the original elements, wrap each block with a
//! header and a footer, then add the theme CSS and the default color marker.

use std::sync::OnceLock;

use super::Plugin;
use crate::config::HighlightOptions;
use crate::css::theme_css;
use crate::engine::{HighlightRequest, Highlighter};
use crate::error::{ConfigError, HighlightError, PageError};
use crate::hooks::{Hooks, Registry};
use crate::html::{self, BlockRewrite};
use crate::site::{Counter, Page, ProcessContext};

/// Marks the inline theme stylesheet so it is added once per page.
const THEME_STYLE: &str = r#"style[data-glint="theme"]"#;

pub struct Highlight {
    options: HighlightOptions,
    /// Built on first use and shared by every page of the build.
    engine: OnceLock<Result<Highlighter, HighlightError>>,
}

impl Highlight {
    /// Validate `options` and build the plugin. The engine itself is loaded
    /// during setup.
    pub fn new(options: HighlightOptions) -> Result<Self, ConfigError> {
        Ok(Self {
            options: options.validate()?,
            engine: OnceLock::new(),
        })
    }

    pub fn options(&self) -> &HighlightOptions {
        &self.options
    }

    /// The engine, loading it on first call. Concurrent first calls block
    /// until the one doing the loading is done.
    pub fn engine(&self) -> Result<&Highlighter, HighlightError> {
        self.engine
            .get_or_init(|| {
                tracing::debug!(config = ?self.options.highlighter, "loading highlighter");
                Highlighter::new(&self.options.highlighter)
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Theme CSS shared by every page.
    pub fn css(&self, hooks: &Hooks) -> String {
        theme_css(
            &self.options.theme,
            &self.options.extra_css,
            &self.options.css_variable_prefix,
            hooks.themed_variables(),
            self.options.use_color_scheme,
            &self.options.color_attribute,
        )
    }

    fn highlight_blocks(&self, html: &str, cx: &ProcessContext) -> Result<Option<String>, PageError> {
        let blocks = html::scan_code_blocks(html)?;
        if blocks.is_empty() {
            return Ok(None);
        }

        let mut rewrites = Vec::with_capacity(blocks.len());
        let mut skipped = 0;
        for block in &blocks {
            let language = match block.language() {
                Some(language) if !block.wrapped && !block.text.is_empty() => language,
                _ => {
                    tracing::debug!(class = %block.class, wrapped = block.wrapped, "skipping code block");
                    skipped += 1;
                    rewrites.push(None);
                    continue;
                }
            };

            let code = self.engine()?.highlight(&HighlightRequest {
                source: &block.text,
                language,
                theme: &self.options.theme,
                transformers: cx.hooks().transformers(),
                css_variable_prefix: &self.options.css_variable_prefix,
                default_color: None,
            })?;
            rewrites.push(Some(BlockRewrite {
                pre_attributes: code.pre_attributes(),
                code_html: code.code_html(),
            }));
        }

        let highlighted = blocks.len() - skipped;
        cx.add(Counter::BlocksHighlighted, highlighted);
        cx.add(Counter::BlocksSkipped, skipped);
        if highlighted == 0 {
            return Ok(None);
        }
        Ok(Some(html::wrap_code_blocks(html, &blocks, &rewrites)?))
    }
}

impl Plugin for Highlight {
    fn name(&self) -> &'static str {
        "highlight"
    }

    fn accepts(&self, url: &str) -> bool {
        self.options.extensions.iter().any(|ext| url.ends_with(ext.as_str()))
    }

    fn setup(&self, registry: &mut Registry) -> Result<(), ConfigError> {
        let engine = self.engine()?;
        for (_, theme) in self.options.theme.entries() {
            if !engine.theme_names().any(|name| name == theme) {
                return Err(ConfigError::UnknownTheme {
                    theme: theme.to_string(),
                    known: engine.theme_names().collect::<Vec<_>>().join(", "),
                });
            }
        }

        registry.add_transformers(self.options.transformers.iter().cloned());
        registry.add_themed_variables(self.options.css_themed_variables.iter().cloned());
        Ok(())
    }

    fn process(&self, page: &mut Page, cx: &ProcessContext) -> Result<(), PageError> {
        let mut html = match self.highlight_blocks(page.content(), cx)? {
            Some(html) => html,
            None => page.content().to_string(),
        };

        let css = self.css(cx.hooks());
        if let Some(css_file) = &self.options.css_file {
            cx.append_output(css_file, page.url(), &css);
        } else if !css.is_empty() && !html::contains_element(&html, THEME_STYLE)? {
            html = html::insert_into_head(&html, &format!("<style data-glint=\"theme\">\n{css}</style>"))?;
        }

        if let Some(color) = self.options.theme.default_color() {
            html = html::set_body_attribute(&html, &self.options.color_attribute, color)?;
        }

        page.set_content(html);
        Ok(())
    }
}
