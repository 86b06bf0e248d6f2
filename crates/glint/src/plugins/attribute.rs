//! Labels built from an attribute of the code element.

use std::fmt::Write as _;
use std::sync::Arc;

use serde::Deserialize;

use super::Plugin;
use crate::config::{Position, validate_attribute};
use crate::error::{ConfigError, PageError};
use crate::html::{self, WrappedBlock};
use crate::site::{Counter, Page, ProcessContext};

/// Label content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        children: Vec<Node>,
    },
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    pub fn element(tag: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Element {
            tag: tag.into(),
            attributes: Vec::new(),
            children,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Node::Element { attributes, .. } = &mut self {
            attributes.push((name.into(), value.into()));
        }
        self
    }

    pub fn to_html(&self) -> String {
        let mut html = String::new();
        self.write_html(&mut html);
        html
    }

    fn write_html(&self, html: &mut String) {
        match self {
            Node::Text(text) => html.push_str(&html_escape::encode_text(text)),
            Node::Element {
                tag,
                attributes,
                children,
            } => {
                let _ = write!(html, "<{tag}");
                for (name, value) in attributes {
                    let _ = write!(
                        html,
                        " {name}=\"{}\"",
                        html_escape::encode_double_quoted_attribute(value)
                    );
                }
                html.push('>');
                for child in children {
                    child.write_html(html);
                }
                let _ = write!(html, "</{tag}>");
            }
        }
    }
}

/// Turns a label value into label content.
pub type Format = Arc<dyn Fn(&str) -> Vec<Node> + Send + Sync>;

/// Value used when the code element has no label attribute.
pub type DefaultValue = Arc<dyn Fn(&WrappedBlock) -> Option<String> + Send + Sync>;

/// `[[attribute]]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttributeOptions {
    /// Attribute of the `<code>` element holding the label.
    pub attribute: String,
    pub position: Position,
    /// Flex order of the label inside its container.
    pub order: i32,
    /// Bold text shown before the value.
    pub title: Option<String>,
}

impl Default for AttributeOptions {
    fn default() -> Self {
        Self {
            attribute: "label".to_string(),
            position: Position::Top,
            order: 2,
            title: None,
        }
    }
}

/// Moves an attribute of each wrapped `<code>` into a
/// `<div class="attribute-<name>">` in the block's header or footer.
pub struct AttributeLabel {
    attribute: String,
    position: Position,
    order: i32,
    format: Format,
    default_value: DefaultValue,
}

impl AttributeLabel {
    pub fn new(options: AttributeOptions) -> Result<Self, ConfigError> {
        validate_attribute(&options.attribute)?;
        let label = Self::with_parts(options.attribute, options.position, options.order);
        Ok(match options.title {
            Some(title) => label.with_format(move |value| {
                vec![
                    Node::element("b", vec![Node::text(title.clone())]),
                    Node::element("span", vec![Node::text(value)]),
                ]
            }),
            None => label,
        })
    }

    pub(crate) fn with_parts(attribute: impl Into<String>, position: Position, order: i32) -> Self {
        Self {
            attribute: attribute.into(),
            position,
            order,
            format: Arc::new(|value: &str| vec![Node::text(value)]),
            default_value: Arc::new(|_: &WrappedBlock| None),
        }
    }

    pub fn with_format(mut self, format: impl Fn(&str) -> Vec<Node> + Send + Sync + 'static) -> Self {
        self.format = Arc::new(format);
        self
    }

    pub fn with_default_value(
        mut self,
        default_value: impl Fn(&WrappedBlock) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.default_value = Arc::new(default_value);
        self
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// The label value of a block: the attribute when present and non-empty,
    /// the default value otherwise.
    pub fn value_for(&self, block: &WrappedBlock) -> Option<String> {
        block
            .attribute(&self.attribute)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .or_else(|| (self.default_value)(block))
    }

    /// Label element for a value.
    pub fn render(&self, value: &str) -> String {
        Node::element("div", (self.format)(value))
            .with_attribute("style", format!("order: {}", self.order))
            .with_attribute("class", self.class())
            .to_html()
    }

    fn class(&self) -> String {
        format!("attribute-{}", self.attribute)
    }
}

impl Plugin for AttributeLabel {
    fn name(&self) -> &'static str {
        "attribute-label"
    }

    fn process(&self, page: &mut Page, cx: &ProcessContext) -> Result<(), PageError> {
        let blocks = html::scan_wrapped_blocks(page.content())?;
        let labels: Vec<Option<String>> = blocks
            .iter()
            .map(|block| {
                if !block.has_code || !block.has_container(self.position) {
                    tracing::debug!(attribute = %self.attribute, "block has no label container");
                    return None;
                }
                if block.has_item(self.position, &self.class()) {
                    return None;
                }
                self.value_for(block).map(|value| self.render(&value))
            })
            .collect();

        let added = labels.iter().flatten().count();
        if added == 0 {
            return Ok(());
        }

        let html = html::decorate_wrapped_blocks(
            page.content(),
            &labels,
            self.position,
            Some(self.attribute.as_str()),
        )?;
        cx.add(Counter::Labels, added);
        page.set_content(html);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::testing::run;

    const WRAPPED: &str = "<div class=\"code-block\"><header></header>\
        <pre><code class=\"language-js\" label=\"main.js\">x</code></pre>\
        <footer></footer></div>";

    #[test]
    fn moves_attribute_into_header() {
        let plugin = AttributeLabel::new(AttributeOptions::default()).unwrap();
        let (html, cx) = run(&[&plugin], WRAPPED);
        assert_eq!(
            html,
            "<div class=\"code-block\"><header><div style=\"order: 2\" class=\"attribute-label\">main.js</div></header>\
             <pre><code class=\"language-js\">x</code></pre>\
             <footer></footer></div>"
        );
        assert_eq!(cx.count(Counter::Labels), 1);
    }

    #[test]
    fn bottom_position_uses_footer() {
        let plugin = AttributeLabel::new(AttributeOptions {
            position: Position::Bottom,
            order: 5,
            ..AttributeOptions::default()
        })
        .unwrap();
        let (html, _) = run(&[&plugin], WRAPPED);
        assert!(html.contains("<footer><div style=\"order: 5\" class=\"attribute-label\">main.js</div></footer>"));
        assert!(html.contains("<header></header>"));
    }

    #[test]
    fn title_formats_label() {
        let plugin = AttributeLabel::new(AttributeOptions {
            title: Some("title:".into()),
            ..AttributeOptions::default()
        })
        .unwrap();
        let (html, _) = run(&[&plugin], WRAPPED);
        assert!(html.contains("<b>title:</b><span>main.js</span>"));
    }

    #[test]
    fn missing_value_skips_block() {
        let page = WRAPPED.replace(" label=\"main.js\"", "");
        let plugin = AttributeLabel::new(AttributeOptions::default()).unwrap();
        let (html, cx) = run(&[&plugin], &page);
        assert_eq!(html, page);
        assert_eq!(cx.count(Counter::Labels), 0);
    }

    #[test]
    fn unwrapped_blocks_are_left_alone() {
        let page = "<pre><code class=\"language-js\" label=\"a\">x</code></pre>";
        let plugin = AttributeLabel::new(AttributeOptions::default()).unwrap();
        let (html, _) = run(&[&plugin], page);
        assert_eq!(html, page);
    }

    #[test]
    fn default_value_and_escaping() {
        let plugin = AttributeLabel::new(AttributeOptions {
            attribute: "title".into(),
            ..AttributeOptions::default()
        })
        .unwrap()
        .with_default_value(|_| Some("<a & b>".into()));
        let (html, _) = run(&[&plugin], WRAPPED);
        assert!(html.contains("class=\"attribute-title\">&lt;a &amp; b&gt;</div>"));
    }

    #[test]
    fn labelled_blocks_are_not_labelled_again() {
        let plugin = AttributeLabel::new(AttributeOptions::default())
            .unwrap()
            .with_default_value(|_| Some("fallback".into()));
        let (once, _) = run(&[&plugin], WRAPPED);
        let (twice, cx) = run(&[&plugin], &once);
        assert_eq!(once, twice);
        assert_eq!(cx.count(Counter::Labels), 0);
    }

    #[test]
    fn rejects_bad_attribute_names() {
        assert!(AttributeLabel::new(AttributeOptions {
            attribute: "no spaces".into(),
            ..AttributeOptions::default()
        })
        .is_err());
    }
}
