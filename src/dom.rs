//! Node accessor — the capability boundary over the HTML tree and its query
//! language.
//!
//! The rest of the engine consumes documents exclusively through [`Document`]
//! and [`Node`]: "select(query) → ordered nodes", "text()/attr(name) →
//! string", plus the parent/sibling navigation the relative root selector
//! needs. `scraper` types never leak past this module.

use scraper::{ElementRef, Html, Selector};

use crate::error::{BindError, Result};

/// Tags treated as block-level when summarizing child text.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "fieldset", "footer", "form", "h1",
    "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section",
    "table", "tr", "ul",
];

/// A parsed HTML document, owning the underlying tree.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parse raw markup into a document. Parsing is error-tolerant; malformed
    /// markup yields a best-effort tree rather than a failure.
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }

    /// The root element of the document (the `<html>` element).
    pub fn root(&self) -> Node<'_> {
        Node {
            el: self.html.root_element(),
        }
    }
}

/// A borrowed handle on one element of a parsed document.
#[derive(Clone, Copy, Debug)]
pub struct Node<'doc> {
    el: ElementRef<'doc>,
}

impl<'doc> Node<'doc> {
    pub(crate) fn new(el: ElementRef<'doc>) -> Self {
        Self { el }
    }

    /// Evaluate a CSS query against this node, returning matches in document
    /// order. An empty result is valid; an unparsable query is a
    /// configuration error.
    pub fn select(&self, query: &str) -> Result<Vec<Node<'doc>>> {
        let selector = Selector::parse(query)
            .map_err(|e| BindError::configuration(format!("invalid CSS query '{query}': {e}")))?;
        Ok(self.el.select(&selector).map(|el| Node { el }).collect())
    }

    /// The concatenated text of this element and all its descendants.
    pub fn text(&self) -> String {
        self.el.text().collect()
    }

    /// The text of this element's direct text children only.
    pub fn own_text(&self) -> String {
        let mut out = String::new();
        for child in self.el.children() {
            if let Some(t) = child.value().as_text() {
                out.push_str(&t.text);
            }
        }
        out
    }

    /// An attribute value, or `None` if the attribute is not present.
    pub fn attr(&self, name: &str) -> Option<&'doc str> {
        self.el.value().attr(name)
    }

    /// The element's tag name (lowercase).
    pub fn tag(&self) -> &'doc str {
        self.el.value().name()
    }

    /// The nearest ancestor element, if any.
    pub fn parent(&self) -> Option<Node<'doc>> {
        self.el.parent().and_then(ElementRef::wrap).map(Node::new)
    }

    /// The next sibling element (skipping text/comment nodes).
    pub fn next_sibling(&self) -> Option<Node<'doc>> {
        let mut cur = self.el.next_sibling();
        while let Some(node) = cur {
            if let Some(el) = ElementRef::wrap(node) {
                return Some(Node::new(el));
            }
            cur = node.next_sibling();
        }
        None
    }

    /// The previous sibling element (skipping text/comment nodes).
    pub fn prev_sibling(&self) -> Option<Node<'doc>> {
        let mut cur = self.el.prev_sibling();
        while let Some(node) = cur {
            if let Some(el) = ElementRef::wrap(node) {
                return Some(Node::new(el));
            }
            cur = node.prev_sibling();
        }
        None
    }

    /// Direct child elements in document order.
    pub fn children(&self) -> impl Iterator<Item = Node<'doc>> + '_ {
        self.el.children().filter_map(ElementRef::wrap).map(Node::new)
    }

    /// Whether this element is block-level (used for child-text separators).
    pub fn is_block(&self) -> bool {
        BLOCK_TAGS.contains(&self.tag())
    }

    /// Serialize this element back to markup (includes the element itself).
    pub fn html(&self) -> String {
        self.el.html()
    }
}
