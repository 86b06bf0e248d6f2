//! Streaming HTML passes built on lol_html.
//!
//! lol_html never holds a tree, so every change that depends on content seen
//! later in the document is done in two passes: a scan that collects what the
//! page contains, then a rewrite driven by the scan results. Both passes match
//! the same selectors over the same input, so the n-th match of a rewrite is
//! the n-th entry of its scan.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::LazyLock;

use lol_html::errors::RewritingError;
use lol_html::html_content::ContentType;
use lol_html::{RewriteStrSettings, doc_comments, element, end, rewrite_str, text};
use regex::Regex;

use crate::config::Position;

/// Class of the element wrapping each highlighted block.
pub const WRAPPER_CLASS: &str = "code-block";

/// Comment before which generated head tags are inserted.
pub const HEAD_SENTINEL: &str = "glint-imports";

const CODE: &str = r#"pre > code[class*="language-"]"#;
const WRAPPED_PRE: &str = "div.code-block > pre";
const WRAPPER: &str = "div.code-block";
const WRAPPER_HEADER: &str = "div.code-block > header";
const WRAPPER_FOOTER: &str = "div.code-block > footer";
const HEADER_ITEM: &str = "div.code-block > header > *";
const FOOTER_ITEM: &str = "div.code-block > footer > *";
const WRAPPED_CODE: &str = r#"div.code-block > pre > code[class*="language-"]"#;

static LANGUAGE_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)language-(\S+)").expect("language class pattern is valid"));

/// Language id from a `class` attribute value, e.g. `js` from `language-js`.
pub fn language_from_class(class: &str) -> Option<&str> {
    LANGUAGE_CLASS
        .captures(class)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// A `<pre><code class="language-*">` block found by [`scan_code_blocks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Index of the parent `<pre>` among all `<pre>` elements of the page.
    pub pre: usize,
    /// `class` attribute of the `<code>` element.
    pub class: String,
    /// Text content with entities decoded.
    pub text: String,
    /// The block already sits in a wrapper from an earlier run.
    pub wrapped: bool,
}

impl CodeBlock {
    pub fn language(&self) -> Option<&str> {
        language_from_class(&self.class)
    }
}

/// Every language-tagged code block of a page, in document order.
pub fn scan_code_blocks(html: &str) -> Result<Vec<CodeBlock>, RewritingError> {
    let pres: RefCell<Vec<bool>> = RefCell::new(Vec::new());
    let blocks: RefCell<Vec<CodeBlock>> = RefCell::new(Vec::new());

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("pre", |_el| {
                    pres.borrow_mut().push(false);
                    Ok(())
                }),
                element!(WRAPPED_PRE, |_el| {
                    if let Some(wrapped) = pres.borrow_mut().last_mut() {
                        *wrapped = true;
                    }
                    Ok(())
                }),
                element!(CODE, |el| {
                    let pres = pres.borrow();
                    blocks.borrow_mut().push(CodeBlock {
                        pre: pres.len().saturating_sub(1),
                        class: el.get_attribute("class").unwrap_or_default(),
                        text: String::new(),
                        wrapped: pres.last().copied().unwrap_or(false),
                    });
                    Ok(())
                }),
                text!(CODE, |chunk| {
                    if let Some(block) = blocks.borrow_mut().last_mut() {
                        block.text.push_str(chunk.as_str());
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::new()
        },
    )?;

    let mut blocks = blocks.into_inner();
    for block in &mut blocks {
        block.text = html_escape::decode_html_entities(&block.text).into_owned();
    }
    Ok(blocks)
}

/// Replacement for one code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRewrite {
    /// Attributes copied onto the original `<pre>`.
    pub pre_attributes: Vec<(String, String)>,
    /// New inner HTML of the original `<code>`.
    pub code_html: String,
}

/// Splice highlighted output into the blocks returned by [`scan_code_blocks`]
/// and wrap each rewritten `<pre>` as
/// `<div class="code-block"><header></header><pre>..</pre><footer></footer></div>`.
///
/// `rewrites[i]` belongs to `blocks[i]`; `None` leaves the block untouched.
pub fn wrap_code_blocks(
    html: &str,
    blocks: &[CodeBlock],
    rewrites: &[Option<BlockRewrite>],
) -> Result<String, RewritingError> {
    let by_pre: HashMap<usize, &BlockRewrite> = blocks
        .iter()
        .zip(rewrites)
        .filter_map(|(block, rewrite)| rewrite.as_ref().map(|r| (block.pre, r)))
        .collect();
    let opening = format!("<div class=\"{WRAPPER_CLASS}\"><header></header>");
    let pre_index = Cell::new(0usize);
    let code_index = Cell::new(0usize);

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("pre", |el| {
                    let index = pre_index.replace(pre_index.get() + 1);
                    if let Some(rewrite) = by_pre.get(&index) {
                        for (name, value) in &rewrite.pre_attributes {
                            el.set_attribute(name, value)?;
                        }
                        el.before(&opening, ContentType::Html);
                        el.after("<footer></footer></div>", ContentType::Html);
                    }
                    Ok(())
                }),
                element!(CODE, |el| {
                    let index = code_index.replace(code_index.get() + 1);
                    if let Some(Some(rewrite)) = rewrites.get(index) {
                        el.set_inner_content(&rewrite.code_html, ContentType::Html);
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::new()
        },
    )
}

/// A block wrapper found by [`scan_wrapped_blocks`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrappedBlock {
    /// Attributes of the wrapped `<code class="language-*">`, empty when the
    /// wrapper holds no such element.
    pub code_attributes: Vec<(String, String)>,
    pub has_code: bool,
    pub has_header: bool,
    pub has_footer: bool,
    /// Class attributes of the elements already in the header or footer.
    pub items: Vec<(Position, String)>,
}

impl WrappedBlock {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.code_attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn language(&self) -> Option<&str> {
        self.attribute("class").and_then(language_from_class)
    }

    /// Whether the header or footer for `position` exists.
    pub fn has_container(&self, position: Position) -> bool {
        match position {
            Position::Top => self.has_header,
            Position::Bottom => self.has_footer,
        }
    }

    /// Whether the header or footer for `position` already holds an element
    /// with `class`.
    pub fn has_item(&self, position: Position, class: &str) -> bool {
        self.items
            .iter()
            .any(|(at, classes)| *at == position && classes.split_ascii_whitespace().any(|c| c == class))
    }
}

/// Every `div.code-block` wrapper of a page, in document order.
pub fn scan_wrapped_blocks(html: &str) -> Result<Vec<WrappedBlock>, RewritingError> {
    let wrappers: RefCell<Vec<WrappedBlock>> = RefCell::new(Vec::new());

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!(WRAPPER, |_el| {
                    wrappers.borrow_mut().push(WrappedBlock::default());
                    Ok(())
                }),
                element!(WRAPPER_HEADER, |_el| {
                    if let Some(wrapper) = wrappers.borrow_mut().last_mut() {
                        wrapper.has_header = true;
                    }
                    Ok(())
                }),
                element!(WRAPPER_FOOTER, |_el| {
                    if let Some(wrapper) = wrappers.borrow_mut().last_mut() {
                        wrapper.has_footer = true;
                    }
                    Ok(())
                }),
                element!(HEADER_ITEM, |el| {
                    if let (Some(wrapper), Some(class)) =
                        (wrappers.borrow_mut().last_mut(), el.get_attribute("class"))
                    {
                        wrapper.items.push((Position::Top, class));
                    }
                    Ok(())
                }),
                element!(FOOTER_ITEM, |el| {
                    if let (Some(wrapper), Some(class)) =
                        (wrappers.borrow_mut().last_mut(), el.get_attribute("class"))
                    {
                        wrapper.items.push((Position::Bottom, class));
                    }
                    Ok(())
                }),
                element!(WRAPPED_CODE, |el| {
                    if let Some(wrapper) = wrappers.borrow_mut().last_mut()
                        && !wrapper.has_code
                    {
                        wrapper.has_code = true;
                        wrapper.code_attributes = el
                            .attributes()
                            .iter()
                            .map(|attr| (attr.name(), attr.value()))
                            .collect();
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::new()
        },
    )?;

    Ok(wrappers.into_inner())
}

/// Append `items[i]` (HTML) to the header or footer of the i-th wrapper found
/// by [`scan_wrapped_blocks`]. When `strip_attribute` is given it is removed
/// from the `<code>` of every decorated block.
pub fn decorate_wrapped_blocks(
    html: &str,
    items: &[Option<String>],
    position: Position,
    strip_attribute: Option<&str>,
) -> Result<String, RewritingError> {
    let seen = Cell::new(0usize);
    let current = || seen.get().checked_sub(1).and_then(|i| items.get(i)).and_then(Option::as_ref);
    let container = format!("{WRAPPER} > {}", position.container());

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!(WRAPPER, |_el| {
                    seen.set(seen.get() + 1);
                    Ok(())
                }),
                element!(container, |el| {
                    if let Some(item) = current() {
                        el.append(item, ContentType::Html);
                    }
                    Ok(())
                }),
                element!(WRAPPED_CODE, |el| {
                    if let (Some(name), Some(_)) = (strip_attribute, current()) {
                        el.remove_attribute(name);
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::new()
        },
    )
}

/// Elements that may come before body content when `<head>` and `<body>`
/// are left implicit.
const HEAD_LEVEL: &[&str] = &[
    "html", "head", "title", "base", "link", "meta", "style", "script", "noscript", "template",
];

/// Insert `fragment` into `<head>`: right before the `<!-- glint-imports -->`
/// comment when there is one, at the end of `<head>` otherwise. When the page
/// leaves `<head>` implicit the fragment goes before the first body content,
/// where a browser still puts it in the head, or at the end of a page without
/// any.
pub fn insert_into_head(html: &str, fragment: &str) -> Result<String, RewritingError> {
    let has_sentinel = Cell::new(false);
    rewrite_str(
        html,
        RewriteStrSettings {
            document_content_handlers: vec![doc_comments!(|comment| {
                if comment.text().trim() == HEAD_SENTINEL {
                    has_sentinel.set(true);
                }
                Ok(())
            })],
            ..RewriteStrSettings::new()
        },
    )?;

    if has_sentinel.get() {
        let inserted = Cell::new(false);
        return rewrite_str(
            html,
            RewriteStrSettings {
                document_content_handlers: vec![doc_comments!(|comment| {
                    if !inserted.get() && comment.text().trim() == HEAD_SENTINEL {
                        comment.before(fragment, ContentType::Html);
                        inserted.set(true);
                    }
                    Ok(())
                })],
                ..RewriteStrSettings::new()
            },
        );
    }

    if contains_element(html, "head")? {
        return rewrite_str(
            html,
            RewriteStrSettings {
                element_content_handlers: vec![element!("head", |el| {
                    el.append(fragment, ContentType::Html);
                    Ok(())
                })],
                ..RewriteStrSettings::new()
            },
        );
    }

    match before_body_content(html, fragment)? {
        Some(out) => Ok(out),
        None => rewrite_str(
            html,
            RewriteStrSettings {
                document_content_handlers: vec![end!(|end| {
                    end.append(fragment, ContentType::Html);
                    Ok(())
                })],
                ..RewriteStrSettings::new()
            },
        ),
    }
}

/// Set an attribute on `<body>`. A page with an implicit body gets an
/// explicit `<body>` start tag before its first body content; a page with no
/// body content is returned unchanged.
pub fn set_body_attribute(html: &str, name: &str, value: &str) -> Result<String, RewritingError> {
    if !contains_element(html, "body")? {
        let tag = format!(
            "<body {name}=\"{}\">",
            html_escape::encode_double_quoted_attribute(value)
        );
        return Ok(before_body_content(html, &tag)?.unwrap_or_else(|| html.to_string()));
    }

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("body", |el| {
                el.set_attribute(name, value)?;
                Ok(())
            })],
            ..RewriteStrSettings::new()
        },
    )
}

/// Insert `fragment` before the first element that is not head-level, or
/// `None` when there is no such element.
fn before_body_content(html: &str, fragment: &str) -> Result<Option<String>, RewritingError> {
    let inserted = Cell::new(false);
    let out = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("*", |el| {
                if !inserted.get() && !HEAD_LEVEL.contains(&el.tag_name().as_str()) {
                    el.before(fragment, ContentType::Html);
                    inserted.set(true);
                }
                Ok(())
            })],
            ..RewriteStrSettings::new()
        },
    )?;
    Ok(inserted.get().then_some(out))
}

/// Whether any element matches `selector`, which must be a valid selector.
pub fn contains_element(html: &str, selector: &str) -> Result<bool, RewritingError> {
    let found = Cell::new(false);
    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!(selector, |_el| {
                found.set(true);
                Ok(())
            })],
            ..RewriteStrSettings::new()
        },
    )?;
    Ok(found.get())
}
