//! Copy-to-clipboard buttons.
//!
//! The plugin adds a `<button class="copy">` to every wrapped block and links
//! a small script that does the copying in the browser. [`clipboard_text`]
//! computes the same text the script puts on the clipboard.

use std::cell::RefCell;

use lol_html::errors::RewritingError;
use lol_html::{RewriteStrSettings, element, rewrite_str, text};
use serde::Deserialize;

use super::{Node, Plugin};
use crate::config::{Position, normalize_file_path};
use crate::error::{ConfigError, PageError};
use crate::hooks::{Asset, Registry};
use crate::html;
use crate::site::{Counter, Page, ProcessContext};

/// Client-side script handling clicks on copy buttons.
pub const COPY_SCRIPT: &str = include_str!("../../assets/copy.js");

const SCRIPT_TAG: &str = r#"script[data-glint="copy"]"#;
const LINE: &str = r#"code[class*="language-"] span.line"#;

/// `[copy]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CopyOptions {
    pub position: Position,
    pub order: i32,
    /// Text of the button.
    pub content: String,
    /// URL the script is served from.
    pub script_path: String,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            position: Position::Top,
            order: 3,
            content: String::new(),
            script_path: "/glint/copy.js".to_string(),
        }
    }
}

pub struct CopyButton {
    position: Position,
    order: i32,
    script_path: String,
    button: String,
}

impl CopyButton {
    pub fn new(options: CopyOptions) -> Result<Self, ConfigError> {
        let script_path = normalize_file_path(&options.script_path)?;
        Ok(Self {
            position: options.position,
            order: options.order,
            script_path,
            button: button_html(options.order, vec![Node::text(options.content)]),
        })
    }

    /// Replace the button's content.
    pub fn with_content(mut self, content: Vec<Node>) -> Self {
        self.button = button_html(self.order, content);
        self
    }

    pub fn script_path(&self) -> &str {
        &self.script_path
    }
}

fn button_html(order: i32, content: Vec<Node>) -> String {
    Node::element("button", content)
        .with_attribute("style", format!("order: {order}"))
        .with_attribute("class", "copy")
        .to_html()
}

impl Plugin for CopyButton {
    fn name(&self) -> &'static str {
        "copy-button"
    }

    fn setup(&self, registry: &mut Registry) -> Result<(), ConfigError> {
        registry.add_asset(Asset::new(self.script_path.clone(), COPY_SCRIPT, true));
        Ok(())
    }

    fn process(&self, page: &mut Page, cx: &ProcessContext) -> Result<(), PageError> {
        let blocks = html::scan_wrapped_blocks(page.content())?;
        let buttons: Vec<Option<String>> = blocks
            .iter()
            .map(|block| {
                let wanted = block.has_code
                    && block.has_container(self.position)
                    && !block.has_item(self.position, "copy");
                wanted.then(|| self.button.clone())
            })
            .collect();

        let added = buttons.iter().flatten().count();
        if added == 0 {
            return Ok(());
        }

        let mut html = html::decorate_wrapped_blocks(page.content(), &buttons, self.position, None)?;
        if !html::contains_element(&html, SCRIPT_TAG)? {
            let tag = format!(
                "<script src=\"{}\" data-glint=\"copy\"></script>",
                html_escape::encode_double_quoted_attribute(&self.script_path)
            );
            html = html::insert_into_head(&html, &tag)?;
        }

        cx.add(Counter::Buttons, added);
        page.set_content(html);
        Ok(())
    }
}

/// Text a copy button puts on the clipboard: the `span.line` elements of the
/// code, newline-separated, without lines marked `diff remove`.
pub fn clipboard_text(html: &str) -> Result<String, RewritingError> {
    let lines: RefCell<Vec<Option<String>>> = RefCell::new(Vec::new());

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!(LINE, |el| {
                    let class = el.get_attribute("class").unwrap_or_default();
                    let mut classes = class.split_ascii_whitespace();
                    let removed = classes.clone().any(|c| c == "diff") && classes.any(|c| c == "remove");
                    lines.borrow_mut().push((!removed).then(String::new));
                    Ok(())
                }),
                text!(LINE, |chunk| {
                    if let Some(Some(line)) = lines.borrow_mut().last_mut() {
                        line.push_str(chunk.as_str());
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::new()
        },
    )?;

    let text = lines
        .into_inner()
        .into_iter()
        .flatten()
        .map(|line| html_escape::decode_html_entities(&line).into_owned())
        .collect::<Vec<_>>()
        .join("\n");
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::testing::run;

    const PAGE: &str = "<html><head></head><body>\
        <div class=\"code-block\"><header></header><pre><code class=\"language-js\">x</code></pre><footer></footer></div>\
        <div class=\"code-block\"><header></header><pre><code class=\"language-js\">y</code></pre><footer></footer></div>\
        </body></html>";

    #[test]
    fn adds_buttons_and_one_script() {
        let plugin = CopyButton::new(CopyOptions::default()).unwrap();
        let (html, cx) = run(&[&plugin], PAGE);
        assert_eq!(
            html.matches("<header><button style=\"order: 3\" class=\"copy\"></button></header>").count(),
            2
        );
        assert_eq!(html.matches("<script src=\"/glint/copy.js\" data-glint=\"copy\"></script>").count(), 1);
        assert!(html.contains("<script src=\"/glint/copy.js\" data-glint=\"copy\"></script></head>"));
        assert_eq!(cx.count(Counter::Buttons), 2);
        assert_eq!(cx.hooks().assets()[0].url, "/glint/copy.js");
        assert!(cx.hooks().assets()[0].copy);
    }

    #[test]
    fn second_run_adds_nothing() {
        let plugin = CopyButton::new(CopyOptions::default()).unwrap();
        let (once, _) = run(&[&plugin], PAGE);
        let (twice, cx) = run(&[&plugin], &once);
        assert_eq!(once, twice);
        assert_eq!(cx.count(Counter::Buttons), 0);
    }

    #[test]
    fn custom_content_in_footer() {
        let plugin = CopyButton::new(CopyOptions {
            position: Position::Bottom,
            content: "Copy".into(),
            script_path: "assets/copy.js".into(),
            ..CopyOptions::default()
        })
        .unwrap();
        assert_eq!(plugin.script_path(), "/assets/copy.js");
        let (html, _) = run(&[&plugin], PAGE);
        assert!(html.contains("<footer><button style=\"order: 3\" class=\"copy\">Copy</button></footer>"));
        assert!(html.contains("src=\"/assets/copy.js\""));
    }

    #[test]
    fn pages_without_blocks_are_untouched() {
        let page = "<html><head></head><body><pre>x</pre></body></html>";
        let plugin = CopyButton::new(CopyOptions::default()).unwrap();
        let (html, _) = run(&[&plugin], page);
        assert_eq!(html, page);
    }

    #[test]
    fn clipboard_skips_removed_lines() {
        let code = "<pre><code class=\"language-js\">\
            <span class=\"line diff remove\"><span>old</span></span>\n\
            <span class=\"line\"><span>a</span></span>\n\
            <span class=\"line diff add\"><span>b</span></span></code></pre>";
        assert_eq!(clipboard_text(code).unwrap(), "a\nb");
    }

    #[test]
    fn clipboard_decodes_entities() {
        let code = "<pre><code class=\"language-html\"><span class=\"line\">&lt;p&gt; &amp;</span></code></pre>";
        assert_eq!(clipboard_text(code).unwrap(), "<p> &");
    }
}
