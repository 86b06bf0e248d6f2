//! `[!code ...]` notation comments.
//!
//! A notation marks the line it sits on. With a `:N` suffix it marks N lines
//! starting there. A notation alone on its line marks the following line(s)
//! and the notation line itself is dropped.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use super::Transformer;
use crate::engine::{HighlightedCode, Line};

static NOTATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*(?:(?://|#|--|;|/\*|<!--|\{/\*)\s*)?\[!code\s+([^\]\s:]+)(?::(\d+))?\]\s*(?:\*/\}|\*/|-->)?")
        .expect("notation pattern is valid")
});

type Classes = &'static [&'static str];

const DIFF_ADD: Classes = &["diff", "add"];
const DIFF_REMOVE: Classes = &["diff", "remove"];
const HIGHLIGHTED: Classes = &["highlighted"];
const FOCUSED: Classes = &["focused"];
const ERROR: Classes = &["highlighted", "error"];
const WARNING: Classes = &["highlighted", "warning"];

/// Mark lines for every notation `classify` recognizes and strip those
/// notations from the output.
fn apply_notation(code: &mut HighlightedCode, pre_class: &str, classify: impl Fn(&str) -> Option<Classes>) {
    let mut pending: Vec<(Classes, usize)> = Vec::new();
    let mut touched = false;
    let mut lines = Vec::with_capacity(code.lines.len());

    for mut line in code.lines.drain(..) {
        let text = line.text();
        let mut found: Vec<(Range<usize>, Classes, usize)> = Vec::new();
        for caps in NOTATION.captures_iter(&text) {
            let (Some(whole), Some(kind)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let Some(classes) = classify(kind.as_str()) else {
                continue;
            };
            let count = caps
                .get(2)
                .and_then(|n| n.as_str().parse::<usize>().ok())
                .unwrap_or(1)
                .max(1);
            found.push((whole.range(), classes, count));
        }

        if found.is_empty() {
            apply_pending(&mut line, &mut pending);
            lines.push(line);
            continue;
        }

        touched = true;
        for (range, _, _) in found.iter().rev() {
            line.remove_range(range.clone());
        }

        if line.text().trim().is_empty() {
            // Notation-only line: applies to what follows
            pending.extend(found.iter().map(|(_, classes, count)| (*classes, *count)));
            continue;
        }

        apply_pending(&mut line, &mut pending);
        for (_, classes, count) in found {
            for class in classes {
                line.add_class(class);
            }
            if count > 1 {
                pending.push((classes, count - 1));
            }
        }
        lines.push(line);
    }

    code.lines = lines;
    if touched {
        code.add_pre_class(pre_class);
    }
}

fn apply_pending(line: &mut Line, pending: &mut Vec<(Classes, usize)>) {
    for (classes, remaining) in pending.iter_mut() {
        for class in classes.iter() {
            line.add_class(class);
        }
        *remaining -= 1;
    }
    pending.retain(|(_, remaining)| *remaining > 0);
}

/// `[!code ++]` and `[!code --]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotationDiff;

impl Transformer for NotationDiff {
    fn name(&self) -> &str {
        "notation-diff"
    }

    fn transform(&self, code: &mut HighlightedCode) {
        apply_notation(code, "has-diff", |kind| match kind {
            "++" => Some(DIFF_ADD),
            "--" => Some(DIFF_REMOVE),
            _ => None,
        });
    }
}

/// `[!code highlight]` and `[!code hl]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotationHighlight;

impl Transformer for NotationHighlight {
    fn name(&self) -> &str {
        "notation-highlight"
    }

    fn transform(&self, code: &mut HighlightedCode) {
        apply_notation(code, "has-highlighted", |kind| match kind {
            "highlight" | "hl" => Some(HIGHLIGHTED),
            _ => None,
        });
    }
}

/// `[!code focus]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotationFocus;

impl Transformer for NotationFocus {
    fn name(&self) -> &str {
        "notation-focus"
    }

    fn transform(&self, code: &mut HighlightedCode) {
        apply_notation(code, "has-focused", |kind| match kind {
            "focus" => Some(FOCUSED),
            _ => None,
        });
    }
}

/// `[!code error]` and `[!code warning]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotationErrorLevel;

impl Transformer for NotationErrorLevel {
    fn name(&self) -> &str {
        "notation-error-level"
    }

    fn transform(&self, code: &mut HighlightedCode) {
        apply_notation(code, "has-highlighted", |kind| match kind {
            "error" => Some(ERROR),
            "warning" => Some(WARNING),
            _ => None,
        });
    }
}
