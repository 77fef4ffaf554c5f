//! Per-field binding rules.
//!
//! A [`BindingRule`] is the declarative configuration attached to one target
//! field: where to look (CSS query + root selector), what to extract
//! (attribute / own text / descendant text), how to normalize (regex rewrite,
//! whitespace trim), and which validation/conversion strategies to run.
//! Rules are immutable once built; strategy kinds are resolved at build time
//! (closed enums), while query and regex text are only checked at first use.

use crate::convert::Convert;
use crate::select::RootSelector;
use crate::validate::Validator;

/// Declarative extraction configuration for a single bindable field.
///
/// ```
/// use docbind::BindingRule;
///
/// let rule = BindingRule::new("td.price")
///     .attribute("data-value")
///     .regex(r"(\d+)")
///     .lenient(true);
/// ```
#[derive(Clone)]
pub struct BindingRule {
    pub(crate) query: String,
    pub(crate) name: Option<&'static str>,
    pub(crate) attribute: Option<String>,
    pub(crate) pattern: Option<String>,
    pub(crate) replace: String,
    pub(crate) trim: bool,
    pub(crate) allow_empty: bool,
    pub(crate) result_index: Option<usize>,
    pub(crate) lenient: bool,
    pub(crate) own_text: bool,
    pub(crate) selector: RootSelector,
    pub(crate) validator: Validator,
    pub(crate) converter: Convert,
}

impl BindingRule {
    /// A rule with the given CSS query and default options: descendant text,
    /// whitespace trimming on, empty values allowed, single-result "auto"
    /// unboxing, identity root selector, pass-all validator, default
    /// converter.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            name: None,
            attribute: None,
            pattern: None,
            replace: "$1".into(),
            trim: true,
            allow_empty: true,
            result_index: None,
            lenient: false,
            own_text: false,
            selector: RootSelector::Here,
            validator: Validator::Pass,
            converter: Convert::Default,
        }
    }

    /// Field label used in diagnostics; defaults to the query string.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    /// Extract the given attribute's value instead of element text.
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.attribute = Some(name.into());
        self
    }

    /// Rewrite the extracted text through a regular expression: the first
    /// match's capture groups are expanded through the replacement template
    /// (default `"$1"`) and the result replaces the whole value. A non-match
    /// leaves the text unchanged.
    pub fn regex(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Replacement template for [`regex`](Self::regex).
    pub fn replace(mut self, replacement: impl Into<String>) -> Self {
        self.replace = replacement.into();
        self
    }

    /// Collapse whitespace runs (including non-breaking space) to a single
    /// space and trim the ends. Default `true`.
    pub fn trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    /// Whether an empty normalized value is still assigned. With `false`, an
    /// empty value becomes "absent" and leaves the field untouched. Default
    /// `true`.
    pub fn allow_empty(mut self, allow: bool) -> Self {
        self.allow_empty = allow;
        self
    }

    /// Pick the k-th match of a multi-result query on a scalar field. Without
    /// this, more than one match is an ambiguity error.
    pub fn result_index(mut self, index: usize) -> Self {
        self.result_index = Some(index);
        self
    }

    /// Turn "no element at the required index" into "field left unassigned"
    /// instead of an error.
    pub fn lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    /// Extract only the element's own text, not its descendants'.
    pub fn own_text(mut self, own: bool) -> Self {
        self.own_text = own;
        self
    }

    /// Reposition the query root before selecting.
    pub fn select_root(mut self, selector: RootSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Validation strategy, run after normalization and before conversion.
    pub fn validate_with(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Conversion strategy from normalized text to the field's value type.
    pub fn convert_with(mut self, converter: Convert) -> Self {
        self.converter = converter;
        self
    }

    /// Diagnostic label for this rule's field.
    pub(crate) fn label(&self) -> &str {
        self.name.unwrap_or(&self.query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_declaration_surface() {
        let rule = BindingRule::new("div.name");
        assert_eq!(rule.query, "div.name");
        assert_eq!(rule.replace, "$1");
        assert!(rule.trim);
        assert!(rule.allow_empty);
        assert!(!rule.lenient);
        assert!(!rule.own_text);
        assert!(rule.result_index.is_none());
        assert_eq!(rule.label(), "div.name");
    }

    #[test]
    fn named_overrides_the_label() {
        let rule = BindingRule::new("div.name").named("team_name");
        assert_eq!(rule.label(), "team_name");
    }
}
