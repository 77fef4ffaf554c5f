//! The binding engine — the per-field extraction pipeline.
//!
//! A [`Binder`] is handed to [`Bindable::bind`] once per (document, target)
//! pair. The target calls one binder method per field, in order, with that
//! field's [`BindingRule`] and a `&mut` slot; this explicit enumeration is
//! the whole field-discovery mechanism. Each call runs one pass of the
//! pipeline:
//!
//! root-select → query → single/collection unboxing → text or attribute
//! extraction → regex rewrite → whitespace normalization → empty check →
//! validation → conversion → assignment.
//!
//! "Absent" outcomes (lenient miss, empty-and-disallowed) leave the slot
//! untouched; every error propagates unchanged in kind.

use regex::Regex;
use tracing::debug;

use crate::convert::{FromScrape, convert};
use crate::dom::Node;
use crate::error::{BindError, Result};
use crate::exec::ExecCtx;
use crate::fetch::Fetcher;
use crate::rule::BindingRule;
use crate::source::SourceProvider;

// ---------------------------------------------------------------------------
// Bindable targets
// ---------------------------------------------------------------------------

/// A target object whose fields can be populated from a document.
///
/// Implementations call one [`Binder`] method per bindable field, in order.
/// The engine only ever writes through the slots handed to it.
pub trait Bindable {
    fn bind(&mut self, b: &Binder<'_, '_>) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Binding context
// ---------------------------------------------------------------------------

/// Per-field pipeline state, created fresh for every field invocation and
/// never shared across concurrent invocations.
pub struct BindingContext<'a, 'doc> {
    rule: &'a BindingRule,
    root: Node<'doc>,
    node: Node<'doc>,
    raw: String,
    text: String,
    origin: &'a str,
}

impl<'a, 'doc> BindingContext<'a, 'doc> {
    /// The rule driving this field.
    pub fn rule(&self) -> &'a BindingRule {
        self.rule
    }

    /// The (possibly repositioned) root the query ran against.
    pub fn root(&self) -> Node<'doc> {
        self.root
    }

    /// The currently selected node.
    pub fn node(&self) -> Node<'doc> {
        self.node
    }

    /// The extracted text before rewrite and trimming.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The normalized text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Document identity for diagnostics.
    pub fn origin(&self) -> &str {
        self.origin
    }

    /// Diagnostic label of the field being bound.
    pub fn field(&self) -> &str {
        self.rule.label()
    }
}

// ---------------------------------------------------------------------------
// Binder
// ---------------------------------------------------------------------------

/// Per-(document, target) handle exposing the field pipeline.
pub struct Binder<'a, 'doc> {
    root: Node<'doc>,
    origin: &'a str,
    exec: &'a ExecCtx,
    fetcher: &'a Fetcher,
}

/// Run a full binding pass of `target` against `node`.
pub(crate) fn bind_node(
    exec: &ExecCtx,
    fetcher: &Fetcher,
    node: Node<'_>,
    origin: &str,
    target: &mut dyn Bindable,
) -> Result<()> {
    let binder = Binder {
        root: node,
        origin,
        exec,
        fetcher,
    };
    target.bind(&binder)
}

impl<'a, 'doc> Binder<'a, 'doc> {
    /// Bind a scalar field. A query matching more than one node is an
    /// ambiguity error unless the rule carries a `result_index`; an absent
    /// value leaves the slot untouched.
    pub fn field<T: FromScrape>(&self, rule: &BindingRule, slot: &mut T) -> Result<()> {
        if let Some(value) = self.scalar::<T>(rule)? {
            *slot = value;
        }
        Ok(())
    }

    /// Bind an optional scalar field; an absent value leaves the `Option`
    /// as it was.
    pub fn optional<T: FromScrape>(&self, rule: &BindingRule, slot: &mut Option<T>) -> Result<()> {
        if let Some(value) = self.scalar::<T>(rule)? {
            *slot = Some(value);
        }
        Ok(())
    }

    /// Bind a collection field: one accepted element per matched node, in
    /// document order, into a freshly allocated `Vec`. `result_index` and
    /// ambiguity checks do not apply; absent values are skipped.
    pub fn fields<T: FromScrape>(&self, rule: &BindingRule, slot: &mut Vec<T>) -> Result<()> {
        let nodes = self.query(rule)?;
        let regex = self.rewrite(rule)?;
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            if let Some(cx) = self.normalized(rule, node, regex.as_ref())? {
                out.push(convert::<T>(&cx)?);
            }
        }
        *slot = out;
        Ok(())
    }

    /// Bind a nested target: the selected node becomes the root of a
    /// recursive binding pass over a freshly defaulted `T`.
    pub fn nested<T: Bindable + Default>(&self, rule: &BindingRule, slot: &mut T) -> Result<()> {
        let nodes = self.query(rule)?;
        let Some(node) = self.unbox(rule, &nodes)? else {
            return Ok(());
        };
        let regex = self.rewrite(rule)?;
        if self.normalized(rule, node, regex.as_ref())?.is_some() {
            let mut value = T::default();
            self.exec
                .run_nested_node(node, self.origin, self.fetcher, &mut value)?;
            *slot = value;
        }
        Ok(())
    }

    /// Bind a collection of nested targets, one per matched node.
    pub fn nested_all<T: Bindable + Default>(
        &self,
        rule: &BindingRule,
        slot: &mut Vec<T>,
    ) -> Result<()> {
        let nodes = self.query(rule)?;
        let regex = self.rewrite(rule)?;
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            if self.normalized(rule, node, regex.as_ref())?.is_some() {
                let mut value = T::default();
                self.exec
                    .run_nested_node(node, self.origin, self.fetcher, &mut value)?;
                out.push(value);
            }
        }
        *slot = out;
        Ok(())
    }

    /// Bind a scalar field whose converted value supplies its own source,
    /// then scrape that source into the value with a nested pass. This is
    /// how object graphs pull their own sub-documents.
    pub fn follow<T>(&self, rule: &BindingRule, slot: &mut T) -> Result<()>
    where
        T: FromScrape + Bindable + SourceProvider,
    {
        let Some(mut value) = self.scalar::<T>(rule)? else {
            return Ok(());
        };
        let source = value.source();
        self.exec
            .run_nested_source(&source, self.fetcher, &mut value)?;
        *slot = value;
        Ok(())
    }

    // -- pipeline steps -----------------------------------------------------

    fn scalar<T: FromScrape>(&self, rule: &BindingRule) -> Result<Option<T>> {
        let nodes = self.query(rule)?;
        let Some(node) = self.unbox(rule, &nodes)? else {
            return Ok(None);
        };
        let regex = self.rewrite(rule)?;
        match self.normalized(rule, node, regex.as_ref())? {
            Some(cx) => convert::<T>(&cx).map(Some),
            None => Ok(None),
        }
    }

    /// Reposition the root, then run the rule's query.
    fn query(&self, rule: &BindingRule) -> Result<Vec<Node<'doc>>> {
        let root = rule.selector.select(self.root)?;
        root.select(&rule.query)
    }

    /// Resolve single-result semantics: `None` means "absent, leave the
    /// field unassigned" (lenient miss).
    fn unbox(&self, rule: &BindingRule, nodes: &[Node<'doc>]) -> Result<Option<Node<'doc>>> {
        let index = match rule.result_index {
            None if nodes.len() > 1 => {
                return Err(BindError::Ambiguous {
                    query: rule.query.clone(),
                    count: nodes.len(),
                });
            }
            None => 0,
            Some(index) => index,
        };

        match nodes.get(index) {
            Some(node) => Ok(Some(*node)),
            None if rule.lenient => {
                debug!(
                    field = rule.label(),
                    query = %rule.query,
                    index,
                    "no match, leaving lenient field unassigned"
                );
                Ok(None)
            }
            None => Err(BindError::NotFound {
                query: rule.query.clone(),
                index,
                origin: self.origin.to_string(),
            }),
        }
    }

    /// Compile the rule's rewrite regex once per field invocation.
    fn rewrite(&self, rule: &BindingRule) -> Result<Option<Regex>> {
        match &rule.pattern {
            None => Ok(None),
            Some(pattern) => Regex::new(pattern).map(Some).map_err(|e| {
                BindError::configuration(format!(
                    "invalid regex '{pattern}' (field '{}'): {e}",
                    rule.label()
                ))
            }),
        }
    }

    /// Extraction + normalization + validation for one selected node.
    /// `Ok(None)` is the absent outcome.
    fn normalized<'r>(
        &'r self,
        rule: &'r BindingRule,
        node: Node<'doc>,
        regex: Option<&Regex>,
    ) -> Result<Option<BindingContext<'r, 'doc>>> {
        let raw = match &rule.attribute {
            Some(attr) => node.attr(attr).unwrap_or_default().to_owned(),
            None if rule.own_text => node.own_text(),
            None => node.text(),
        };

        let mut text = raw.clone();
        if let Some(re) = regex {
            // First match wins: its capture groups are expanded through the
            // replacement template and the result replaces the whole value.
            if let Some(caps) = re.captures(&text) {
                let mut rewritten = String::new();
                caps.expand(&rule.replace, &mut rewritten);
                text = rewritten;
            }
        }

        if rule.trim {
            text = collapse_whitespace(&text);
        }

        if text.is_empty() && !rule.allow_empty {
            return Ok(None);
        }

        let cx = BindingContext {
            rule,
            root: self.root,
            node,
            raw,
            text,
            origin: self.origin,
        };
        rule.validator.check(&cx)?;
        Ok(Some(cx))
    }
}

/// Collapse whitespace runs (including non-breaking space) to a single space
/// and trim the ends.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
