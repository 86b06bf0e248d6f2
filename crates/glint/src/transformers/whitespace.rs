use super::Transformer;
use crate::engine::{HighlightedCode, Token};

/// Wraps every space and tab in its own token classed `space` or `tab`, so
/// stylesheets can make them visible.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderWhitespace;

impl Transformer for RenderWhitespace {
    fn name(&self) -> &str {
        "render-whitespace"
    }

    fn transform(&self, code: &mut HighlightedCode) {
        for line in &mut code.lines {
            let mut tokens = Vec::with_capacity(line.tokens.len());
            for token in line.tokens.drain(..) {
                split_whitespace(token, &mut tokens);
            }
            line.tokens = tokens;
        }
    }
}

fn split_whitespace(token: Token, out: &mut Vec<Token>) {
    if !token.content.contains([' ', '\t']) {
        out.push(token);
        return;
    }

    let mut run = String::new();
    for c in token.content.chars() {
        let class = match c {
            ' ' => "space",
            '\t' => "tab",
            _ => {
                run.push(c);
                continue;
            }
        };
        if !run.is_empty() {
            out.push(Token {
                content: std::mem::take(&mut run),
                styles: token.styles.clone(),
                classes: token.classes.clone(),
            });
        }
        let mut classes = token.classes.clone();
        classes.push(class.to_string());
        out.push(Token {
            content: c.to_string(),
            styles: token.styles.clone(),
            classes,
        });
    }
    if !run.is_empty() {
        out.push(Token {
            content: run,
            styles: token.styles,
            classes: token.classes,
        });
    }
}
