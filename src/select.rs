//! Root selectors — reposition the query root before extraction.
//!
//! The default is the unmodified scrape root. [`RootSelector::Relative`]
//! walks up N ancestors and then across M siblings, which covers the common
//! "value lives in the column next to my anchor cell" layouts without a
//! second query.

use std::sync::Arc;

use crate::dom::Node;
use crate::error::Result;

/// Pluggable root-selection strategy.
pub trait SelectRoot: Send + Sync {
    /// Return the node to evaluate the field's query against.
    fn select<'doc>(&self, root: Node<'doc>) -> Result<Node<'doc>>;
}

/// Built-in root selector kinds, resolved once per rule.
#[derive(Clone)]
pub enum RootSelector {
    /// Identity: query against the unmodified scrape root.
    Here,
    /// Advance `parent` ancestors, then `sibling` siblings (positive =
    /// following, negative = preceding). Running out of ancestors or siblings
    /// mid-walk stops at the last reachable node rather than failing.
    Relative { parent: u32, sibling: i32 },
    /// Caller-provided strategy.
    Custom(Arc<dyn SelectRoot>),
}

impl RootSelector {
    pub(crate) fn select<'doc>(&self, root: Node<'doc>) -> Result<Node<'doc>> {
        match self {
            Self::Here => Ok(root),
            Self::Relative { parent, sibling } => Ok(walk(root, *parent, *sibling)),
            Self::Custom(selector) => selector.select(root),
        }
    }
}

fn walk(mut node: Node<'_>, parents: u32, siblings: i32) -> Node<'_> {
    for _ in 0..parents {
        match node.parent() {
            Some(parent) => node = parent,
            None => break,
        }
    }
    for _ in 0..siblings.unsigned_abs() {
        let next = if siblings > 0 {
            node.next_sibling()
        } else {
            node.prev_sibling()
        };
        match next {
            Some(sibling) => node = sibling,
            None => break,
        }
    }
    node
}
