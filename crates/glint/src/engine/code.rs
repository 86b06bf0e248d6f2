//! The intermediate tree produced by the engine.
//!
//! A [`HighlightedCode`] is what transformers rewrite before it is serialized
//! into `<pre>` attributes and `<code>` inner HTML. Every token carries one
//! [`Style`] per theme, in the order of [`HighlightedCode::themes`].

use std::fmt::Write as _;
use std::ops::Range;

use syntect::highlighting::{Color, FontStyle, Style};

/// Class carried by every highlighted `<pre>`.
pub const ROOT_CLASS: &str = "glint";

/// Class of each line span inside `<code>`.
pub const LINE_CLASS: &str = "line";

/// A theme applied to a block, with its base colors.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedTheme {
    /// Color-mode key (`light`, `dark`, ...) or `None` for a single theme.
    pub color: Option<String>,
    /// Theme name as loaded by the engine.
    pub name: String,
    pub foreground: Color,
    pub background: Color,
}

/// A run of text with uniform styling in every theme.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub content: String,
    pub styles: Vec<Style>,
    pub classes: Vec<String>,
}

impl Token {
    pub fn new(content: impl Into<String>, styles: Vec<Style>) -> Self {
        Self {
            content: content.into(),
            styles,
            classes: Vec::new(),
        }
    }
}

/// One source line.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Line {
    pub classes: Vec<String>,
    pub tokens: Vec<Token>,
}

impl Line {
    /// Build a line from per-theme token streams over the same text.
    ///
    /// Token boundaries from every theme are merged, so a token is split
    /// wherever any theme changes style. A trailing line terminator is dropped.
    pub fn from_styled(text: &str, styled: &[Vec<(Style, &str)>]) -> Self {
        let visible = text.trim_end_matches(['\n', '\r']);
        let end = visible.len();

        let mut bounds = vec![0, end];
        for tokens in styled {
            let mut offset = 0;
            for (_, piece) in tokens {
                offset += piece.len();
                if offset < end {
                    bounds.push(offset);
                }
            }
        }
        bounds.sort_unstable();
        bounds.dedup();

        // (token index, byte offset where that token starts) per theme
        let mut cursors = vec![(0usize, 0usize); styled.len()];
        let mut tokens: Vec<Token> = Vec::new();

        for window in bounds.windows(2) {
            let (start, stop) = (window[0], window[1]);
            if start == stop {
                continue;
            }

            let styles: Vec<Style> = styled
                .iter()
                .zip(cursors.iter_mut())
                .map(|(theme_tokens, (idx, token_start))| {
                    while *idx < theme_tokens.len()
                        && *token_start + theme_tokens[*idx].1.len() <= start
                    {
                        *token_start += theme_tokens[*idx].1.len();
                        *idx += 1;
                    }
                    theme_tokens
                        .get(*idx)
                        .map(|(style, _)| *style)
                        .unwrap_or_default()
                })
                .collect();

            let piece = &visible[start..stop];
            if let Some(last) = tokens.last_mut()
                && last.styles == styles
            {
                last.content.push_str(piece);
            } else {
                tokens.push(Token::new(piece, styles));
            }
        }

        Self {
            classes: vec![LINE_CLASS.to_string()],
            tokens,
        }
    }

    /// Concatenated text of the line.
    pub fn text(&self) -> String {
        self.tokens.iter().map(|t| t.content.as_str()).collect()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if !self.has_class(class) {
            self.classes.push(class.to_string());
        }
    }

    /// Remove a byte range of [`Line::text`], splitting across tokens as needed.
    /// Tokens left empty are dropped.
    pub fn remove_range(&mut self, range: Range<usize>) {
        let mut offset = 0;
        for token in &mut self.tokens {
            let len = token.content.len();
            let start = range.start.max(offset);
            let stop = range.end.min(offset + len);
            if start < stop {
                token.content.replace_range(start - offset..stop - offset, "");
            }
            offset += len;
        }
        self.tokens.retain(|t| !t.content.is_empty());
    }
}

/// Output of one highlight call, before serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightedCode {
    pub language: String,
    pub themes: Vec<AppliedTheme>,
    pub pre_classes: Vec<String>,
    pub lines: Vec<Line>,
    pub css_variable_prefix: String,
    /// Color key rendered as plain properties instead of custom properties.
    pub default_color: Option<String>,
}

impl HighlightedCode {
    pub fn add_pre_class(&mut self, class: &str) {
        if !self.pre_classes.iter().any(|c| c == class) {
            self.pre_classes.push(class.to_string());
        }
    }

    fn is_multi(&self) -> bool {
        self.themes.iter().any(|t| t.color.is_some())
    }

    /// Attributes for the `<pre>` element, in output order.
    pub fn pre_attributes(&self) -> Vec<(String, String)> {
        let mut style = String::new();
        for theme in &self.themes {
            match self.variable_for(theme) {
                None => {
                    push_decl(&mut style, "background-color", &hex(theme.background));
                    push_decl(&mut style, "color", &hex(theme.foreground));
                }
                Some(var) => {
                    push_decl(&mut style, &var, &hex(theme.foreground));
                    push_decl(&mut style, &format!("{var}-bg"), &hex(theme.background));
                }
            }
        }

        vec![
            ("class".to_string(), self.pre_classes.join(" ")),
            ("style".to_string(), style),
            ("tabindex".to_string(), "0".to_string()),
        ]
    }

    /// Inner HTML of the `<code>` element.
    pub fn code_html(&self) -> String {
        let mut html = String::new();
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                html.push('\n');
            }
            html.push_str("<span class=\"");
            html.push_str(&escape_attr(&line.classes.join(" ")));
            html.push_str("\">");
            for token in &line.tokens {
                self.write_token(&mut html, token);
            }
            html.push_str("</span>");
        }
        html
    }

    /// Standalone `<pre><code>` fragment.
    pub fn to_html(&self) -> String {
        let mut html = String::from("<pre");
        for (name, value) in self.pre_attributes() {
            let _ = write!(html, " {name}=\"{}\"", escape_attr(&value));
        }
        html.push_str("><code>");
        html.push_str(&self.code_html());
        html.push_str("</code></pre>");
        html
    }

    /// Custom-property base name for a theme, or `None` when its colors are
    /// emitted as plain properties.
    fn variable_for(&self, theme: &AppliedTheme) -> Option<String> {
        if !self.is_multi() {
            return None;
        }
        let color = theme.color.as_deref()?;
        if self.default_color.as_deref() == Some(color) {
            return None;
        }
        Some(format!("{}{color}", self.css_variable_prefix))
    }

    fn write_token(&self, html: &mut String, token: &Token) {
        let mut style = String::new();
        for (theme, token_style) in self.themes.iter().zip(&token.styles) {
            let var = self.variable_for(theme);
            let name = |plain: &str, suffix: &str| match &var {
                None => plain.to_string(),
                Some(var) if suffix.is_empty() => var.clone(),
                Some(var) => format!("{var}-{suffix}"),
            };

            push_decl(&mut style, &name("color", ""), &hex(token_style.foreground));
            let font = token_style.font_style;
            if font.contains(FontStyle::ITALIC) {
                push_decl(&mut style, &name("font-style", "font-style"), "italic");
            }
            if font.contains(FontStyle::BOLD) {
                push_decl(&mut style, &name("font-weight", "font-weight"), "bold");
            }
            if font.contains(FontStyle::UNDERLINE) {
                push_decl(
                    &mut style,
                    &name("text-decoration", "text-decoration"),
                    "underline",
                );
            }
        }

        html.push_str("<span");
        if !token.classes.is_empty() {
            html.push_str(" class=\"");
            html.push_str(&escape_attr(&token.classes.join(" ")));
            html.push('"');
        }
        if !style.is_empty() {
            html.push_str(" style=\"");
            html.push_str(&escape_attr(&style));
            html.push('"');
        }
        html.push('>');
        html.push_str(&html_escape::encode_text(&token.content));
        html.push_str("</span>");
    }
}

fn push_decl(style: &mut String, property: &str, value: &str) {
    if !style.is_empty() {
        style.push(';');
    }
    let _ = write!(style, "{property}:{value}");
}

/// `#rrggbb`, or `#rrggbbaa` when not fully opaque.
pub fn hex(color: Color) -> String {
    if color.a == 0xff {
        format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
    } else {
        format!("#{:02x}{:02x}{:02x}{:02x}", color.r, color.g, color.b, color.a)
    }
}

/// CSS class for a theme name: `Solarized (dark)` becomes `solarized-dark`.
pub fn theme_class(name: &str) -> String {
    let mut class = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            class.push(c.to_ascii_lowercase());
        } else if !class.is_empty() && !class.ends_with('-') {
            class.push('-');
        }
    }
    while class.ends_with('-') {
        class.pop();
    }
    class
}

pub(crate) fn escape_attr(value: &str) -> std::borrow::Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(r: u8) -> Style {
        Style {
            foreground: Color { r, g: 0, b: 0, a: 0xff },
            ..Style::default()
        }
    }

    fn theme(color: Option<&str>, name: &str) -> AppliedTheme {
        AppliedTheme {
            color: color.map(str::to_string),
            name: name.to_string(),
            foreground: Color { r: 0, g: 0, b: 0, a: 0xff },
            background: Color { r: 0xff, g: 0xff, b: 0xff, a: 0xff },
        }
    }

    #[test]
    fn merges_boundaries_across_themes() {
        let text = "let x\n";
        let light = vec![(style(1), "let"), (style(2), " x\n")];
        let dark = vec![(style(3), "let "), (style(4), "x\n")];
        let line = Line::from_styled(text, &[light, dark]);

        let pieces: Vec<&str> = line.tokens.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(pieces, ["let", " ", "x"]);
        assert_eq!(line.tokens[1].styles, vec![style(2), style(3)]);
        assert_eq!(line.text(), "let x");
    }

    #[test]
    fn coalesces_identical_neighbours() {
        let line = Line::from_styled("ab", &[vec![(style(1), "a"), (style(1), "b")]]);
        assert_eq!(line.tokens.len(), 1);
        assert_eq!(line.tokens[0].content, "ab");
    }

    #[test]
    fn remove_range_spans_tokens() {
        let mut line = Line::from_styled(
            "ab // x",
            &[vec![(style(1), "ab"), (style(2), " // "), (style(3), "x")]],
        );
        line.remove_range(2..7);
        assert_eq!(line.text(), "ab");
        assert_eq!(line.tokens.len(), 1);
    }

    #[test]
    fn single_theme_uses_plain_properties() {
        let code = HighlightedCode {
            language: "rust".into(),
            themes: vec![theme(None, "InspiredGitHub")],
            pre_classes: vec![ROOT_CLASS.into(), "inspiredgithub".into()],
            lines: vec![Line::from_styled("fn", &[vec![(style(0xaa), "fn")]])],
            css_variable_prefix: "--glint-".into(),
            default_color: None,
        };

        let html = code.to_html();
        assert!(html.starts_with(
            "<pre class=\"glint inspiredgithub\" style=\"background-color:#ffffff;color:#000000\" tabindex=\"0\">"
        ));
        assert!(html.contains("<span class=\"line\"><span style=\"color:#aa0000\">fn</span></span>"));
    }

    #[test]
    fn multi_theme_uses_custom_properties() {
        let code = HighlightedCode {
            language: "rust".into(),
            themes: vec![theme(Some("light"), "a"), theme(Some("dark"), "b")],
            pre_classes: vec![ROOT_CLASS.into()],
            lines: vec![Line::from_styled(
                "fn",
                &[vec![(style(1), "fn")], vec![(style(2), "fn")]],
            )],
            css_variable_prefix: "--glint-".into(),
            default_color: None,
        };

        let attrs = code.pre_attributes();
        assert_eq!(
            attrs[1].1,
            "--glint-light:#000000;--glint-light-bg:#ffffff;--glint-dark:#000000;--glint-dark-bg:#ffffff"
        );
        assert!(code
            .code_html()
            .contains("style=\"--glint-light:#010000;--glint-dark:#020000\""));
    }

    #[test]
    fn default_color_is_inlined() {
        let code = HighlightedCode {
            language: "rust".into(),
            themes: vec![theme(Some("light"), "a"), theme(Some("dark"), "b")],
            pre_classes: vec![ROOT_CLASS.into()],
            lines: vec![Line::from_styled(
                "fn",
                &[vec![(style(1), "fn")], vec![(style(2), "fn")]],
            )],
            css_variable_prefix: "--glint-".into(),
            default_color: Some("light".into()),
        };
        assert!(code
            .code_html()
            .contains("style=\"color:#010000;--glint-dark:#020000\""));
    }

    #[test]
    fn escapes_token_text() {
        let line = Line::from_styled("a<b", &[vec![(style(1), "a<b")]]);
        let code = HighlightedCode {
            language: "text".into(),
            themes: vec![theme(None, "t")],
            pre_classes: vec![],
            lines: vec![line],
            css_variable_prefix: "--glint-".into(),
            default_color: None,
        };
        assert!(code.code_html().contains("a&lt;b"));
    }

    #[test]
    fn theme_classes() {
        assert_eq!(theme_class("Solarized (dark)"), "solarized-dark");
        assert_eq!(theme_class("base16-ocean.dark"), "base16-ocean-dark");
        assert_eq!(theme_class("InspiredGitHub"), "inspiredgithub");
    }
}
