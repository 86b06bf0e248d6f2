//! Transformers rewrite a [`HighlightedCode`] tree before it is serialized.
//!
//! The built-in ones implement the `[!code ...]` notation comments (diff
//! markers, highlighted lines, error levels, focus) and whitespace rendering.

mod notation;
mod whitespace;

pub use notation::{NotationDiff, NotationErrorLevel, NotationFocus, NotationHighlight};
pub use whitespace::RenderWhitespace;

use std::sync::Arc;

use serde::Deserialize;

use crate::engine::HighlightedCode;

/// A rewrite of the engine's output tree.
pub trait Transformer: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    fn transform(&self, code: &mut HighlightedCode);
}

/// Built-in transformers selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformerKind {
    NotationDiff,
    NotationHighlight,
    NotationFocus,
    NotationErrorLevel,
    RenderWhitespace,
}

impl TransformerKind {
    pub fn build(self) -> Arc<dyn Transformer> {
        match self {
            TransformerKind::NotationDiff => Arc::new(NotationDiff),
            TransformerKind::NotationHighlight => Arc::new(NotationHighlight),
            TransformerKind::NotationFocus => Arc::new(NotationFocus),
            TransformerKind::NotationErrorLevel => Arc::new(NotationErrorLevel),
            TransformerKind::RenderWhitespace => Arc::new(RenderWhitespace),
        }
    }
}
