//! Theme CSS for highlighted blocks.
//!
//! Multi-theme output only carries per-color custom properties
//! (`--glint-dark`, `--glint-dark-bg`, ...). The rules generated here pick one
//! color set, either through `prefers-color-scheme` or through an attribute
//! selector such as `[data-color="dark"]`, and map themed variables
//! (`--glint-diff-add`) to their per-color counterparts.

use std::fmt::Write as _;

use crate::config::{ThemeSelection, ThemedVariable};
use crate::engine::ROOT_CLASS;

/// Inputs of [`themed_css`].
#[derive(Debug, Clone, Copy)]
pub struct ThemedCss<'a> {
    /// Color key, or `None` for a single theme.
    pub color: Option<&'a str>,
    pub prefix: &'a str,
    pub variables: &'a [ThemedVariable],
    pub use_color_scheme: bool,
    pub color_attribute: &'a str,
}

/// CSS for one color key.
///
/// Each themed variable becomes `<prefix><suffix>: var(<prefix><color>-<suffix>, <fallback>)`,
/// where the color defaults to `light` when none is given. With a color key the
/// block also sets the background and token colors of `.glint`, and the whole
/// thing is scoped by `@media (prefers-color-scheme: ...)` when
/// `use_color_scheme` is set and the key is `light` or `dark`, or by
/// `[<attribute>="<color>"]` otherwise.
pub fn themed_css(options: &ThemedCss<'_>) -> String {
    let ThemedCss {
        color,
        prefix,
        variables,
        use_color_scheme,
        color_attribute,
    } = *options;

    let media = color.filter(|c| use_color_scheme && matches!(*c, "light" | "dark"));
    let root = match (color, media) {
        (Some(color), None) => format!("[{color_attribute}=\"{color}\"] .{ROOT_CLASS}"),
        _ => format!(".{ROOT_CLASS}"),
    };

    let mut css = String::new();
    if let Some(color) = color {
        let var = format!("{prefix}{color}");
        let _ = write!(
            css,
            "{root} {{\n  background-color: var({var}-bg);\n  color: var({var});\n}}\n\
             {root} span {{\n  color: var({var});\n  font-style: var({var}-font-style, inherit);\n  \
             font-weight: var({var}-font-weight, inherit);\n  \
             text-decoration: var({var}-text-decoration, inherit);\n}}\n"
        );
    }

    if !variables.is_empty() {
        let source = color.unwrap_or("light");
        let _ = writeln!(css, "{root} {{");
        for variable in variables {
            let suffix = variable.suffix();
            let _ = writeln!(
                css,
                "  {prefix}{suffix}: var({prefix}{source}-{suffix}, {});",
                variable.fallback()
            );
        }
        css.push_str("}\n");
    }

    match media {
        Some(scheme) if !css.is_empty() => {
            format!("@media (prefers-color-scheme: {scheme}) {{\n{css}}}\n")
        }
        _ => css,
    }
}

/// Complete CSS for a theme selection: the extra CSS followed by the rules of
/// every configured color, in configuration order.
pub fn theme_css(
    theme: &ThemeSelection,
    extra_css: &str,
    prefix: &str,
    variables: &[ThemedVariable],
    use_color_scheme: bool,
    color_attribute: &str,
) -> String {
    let mut css = extra_css.to_string();
    for (color, _) in theme.entries() {
        if !css.is_empty() && !css.ends_with('\n') {
            css.push('\n');
        }
        css.push_str(&themed_css(&ThemedCss {
            color,
            prefix,
            variables,
            use_color_scheme,
            color_attribute,
        }));
    }
    css
}
