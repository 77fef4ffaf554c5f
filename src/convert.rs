//! Converters — from normalized text (or the selected node) to the field's
//! value type.
//!
//! The conversion *kind* is part of the rule ([`Convert`], a closed set of
//! variants plus a custom text hook); the *type* seam is [`FromScrape`],
//! which field types implement. Built-in implementations cover `String`,
//! booleans, all primitive numerics, and the `chrono` date types; enums go
//! through the [`ScrapedEnum`] helper so a variant can opt into custom text
//! equality instead of exact name match.
//!
//! Conversions a type does not support fail with a configuration error at
//! first use, mirroring the lazy strategy checks of the rest of the rule
//! surface.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::bind::BindingContext;
use crate::dom::Node;
use crate::error::{BindError, Result};

// ---------------------------------------------------------------------------
// Converter kinds
// ---------------------------------------------------------------------------

/// Conversion strategy attached to a rule.
#[derive(Clone)]
pub enum Convert {
    /// Parse the normalized text via [`FromScrape::from_text`].
    Default,
    /// Canonicalize locale-formatted numeric text, then parse.
    Number(NumberStyle),
    /// Parse date/time text with the given `chrono` format pattern.
    Date(String),
    /// Invoke the target type's registered factory with an engine-assembled
    /// argument list.
    Construct(ConstructSpec),
    /// Summarize the text of the selected node's direct children, then parse.
    ChildText(ChildTextSpec),
    /// Caller-provided text transform, applied before [`FromScrape::from_text`].
    Custom(Arc<dyn ConvertText>),
}

/// Pluggable text-transform hook for [`Convert::Custom`].
pub trait ConvertText: Send + Sync {
    /// Produce the text handed to the target type's parser.
    fn convert(&self, cx: &BindingContext<'_, '_>) -> Result<String>;
}

/// Grouping/decimal separators for [`Convert::Number`].
#[derive(Clone, Copy)]
pub struct NumberStyle {
    grouping: char,
    decimal: char,
}

impl Default for NumberStyle {
    fn default() -> Self {
        Self {
            grouping: ',',
            decimal: '.',
        }
    }
}

impl NumberStyle {
    pub fn new(grouping: char, decimal: char) -> Self {
        Self { grouping, decimal }
    }

    /// Strip grouping separators and map the decimal separator to `.`.
    fn canonicalize(&self, text: &str) -> String {
        text.chars()
            .filter(|c| *c != self.grouping)
            .map(|c| if c == self.decimal { '.' } else { c })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Construct converter
// ---------------------------------------------------------------------------

/// Which value the engine passes as the factory's primary argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgKind {
    /// The normalized text.
    Text,
    /// The currently selected node.
    Node,
    /// The full binding context.
    Context,
}

/// Configuration for [`Convert::Construct`]: the primary argument kind plus
/// literal string arguments declared on the rule.
#[derive(Clone)]
pub struct ConstructSpec {
    primary: ArgKind,
    literals: Vec<String>,
}

impl ConstructSpec {
    pub fn text() -> Self {
        Self::new(ArgKind::Text)
    }

    pub fn node() -> Self {
        Self::new(ArgKind::Node)
    }

    pub fn context() -> Self {
        Self::new(ArgKind::Context)
    }

    fn new(primary: ArgKind) -> Self {
        Self {
            primary,
            literals: Vec::new(),
        }
    }

    /// Append a literal string argument.
    pub fn literal(mut self, arg: impl Into<String>) -> Self {
        self.literals.push(arg.into());
        self
    }
}

/// Engine-assembled argument list handed to [`FromScrape::construct`].
pub struct ConstructArgs<'a, 'doc> {
    /// The primary argument, per the rule's [`ArgKind`].
    pub primary: Primary<'a, 'doc>,
    /// Literal string arguments declared on the rule, in order.
    pub literals: &'a [String],
}

/// The resolved primary argument of a construct conversion.
pub enum Primary<'a, 'doc> {
    Text(&'a str),
    Node(Node<'doc>),
    Context(&'a BindingContext<'a, 'doc>),
}

impl<'a, 'doc> ConstructArgs<'a, 'doc> {
    /// The primary argument as text, or a configuration error if the rule
    /// asked for a node/context primary.
    pub fn text(&self) -> Result<&'a str> {
        match self.primary {
            Primary::Text(text) => Ok(text),
            _ => Err(BindError::configuration(
                "construct factory expected a text primary argument",
            )),
        }
    }

    /// The primary argument as a node, or a configuration error.
    pub fn node(&self) -> Result<Node<'doc>> {
        match self.primary {
            Primary::Node(node) => Ok(node),
            _ => Err(BindError::configuration(
                "construct factory expected a node primary argument",
            )),
        }
    }

    /// The primary argument as the full binding context, or a configuration
    /// error.
    pub fn context(&self) -> Result<&'a BindingContext<'a, 'doc>> {
        match self.primary {
            Primary::Context(cx) => Ok(cx),
            _ => Err(BindError::configuration(
                "construct factory expected a context primary argument",
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Child-text summarizer
// ---------------------------------------------------------------------------

/// Configuration for [`Convert::ChildText`]: include/exclude tag lists.
#[derive(Clone, Default)]
pub struct ChildTextSpec {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl ChildTextSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only summarize children with this tag (repeatable).
    pub fn include(mut self, tag: impl Into<String>) -> Self {
        self.include.push(tag.into());
        self
    }

    /// Skip children with this tag (repeatable).
    pub fn exclude(mut self, tag: impl Into<String>) -> Self {
        self.exclude.push(tag.into());
        self
    }

    fn filtered(&self, node: &Node<'_>) -> bool {
        let tag = node.tag();
        if !self.include.is_empty() && !self.include.iter().any(|t| t == tag) {
            return true;
        }
        self.exclude.iter().any(|t| t == tag)
    }

    /// Concatenate direct-child text, separating block-level children with a
    /// newline.
    fn summarize(&self, node: Node<'_>) -> String {
        let mut out = String::new();
        for child in node.children() {
            if self.filtered(&child) {
                continue;
            }
            let text = child.text();
            if text.is_empty() {
                continue;
            }
            if !out.is_empty() && child.is_block() {
                out.push('\n');
            }
            out.push_str(&text);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// FromScrape — the typed conversion seam
// ---------------------------------------------------------------------------

/// Conversion seam implemented by every scalar field type.
///
/// All methods default to a configuration error, so a type only implements
/// the conversions it supports; asking a type for an unsupported conversion
/// fails lazily at first use.
pub trait FromScrape: Sized {
    /// Build a value from normalized text (the default converter, and the
    /// number/child-text/custom converters after their text transforms).
    fn from_text(text: &str, cx: &BindingContext<'_, '_>) -> Result<Self> {
        let _ = text;
        Err(unsupported::<Self>("text", cx))
    }

    /// Build a value from date/time text with a `chrono` format pattern.
    fn from_date(pattern: &str, cx: &BindingContext<'_, '_>) -> Result<Self> {
        let _ = pattern;
        Err(unsupported::<Self>("date", cx))
    }

    /// Factory for [`Convert::Construct`].
    fn construct(args: ConstructArgs<'_, '_>, cx: &BindingContext<'_, '_>) -> Result<Self> {
        let _ = args;
        Err(unsupported::<Self>("construct", cx))
    }
}

fn unsupported<T>(kind: &str, cx: &BindingContext<'_, '_>) -> BindError {
    BindError::configuration(format!(
        "{} does not support {kind} conversion (field '{}')",
        std::any::type_name::<T>(),
        cx.field(),
    ))
}

/// Run the rule's conversion strategy for one selected node.
pub(crate) fn convert<T: FromScrape>(cx: &BindingContext<'_, '_>) -> Result<T> {
    match &cx.rule().converter {
        Convert::Default => T::from_text(cx.text(), cx),
        Convert::Number(style) => T::from_text(&style.canonicalize(cx.text()), cx),
        Convert::Date(pattern) => T::from_date(pattern, cx),
        Convert::Construct(spec) => {
            let primary = match spec.primary {
                ArgKind::Text => Primary::Text(cx.text()),
                ArgKind::Node => Primary::Node(cx.node()),
                ArgKind::Context => Primary::Context(cx),
            };
            T::construct(
                ConstructArgs {
                    primary,
                    literals: &spec.literals,
                },
                cx,
            )
        }
        Convert::ChildText(spec) => T::from_text(&spec.summarize(cx.node()), cx),
        Convert::Custom(custom) => T::from_text(&custom.convert(cx)?, cx),
    }
}

// ---------------------------------------------------------------------------
// Built-in implementations
// ---------------------------------------------------------------------------

impl FromScrape for String {
    fn from_text(text: &str, _cx: &BindingContext<'_, '_>) -> Result<Self> {
        Ok(text.to_owned())
    }
}

impl FromScrape for bool {
    fn from_text(text: &str, _cx: &BindingContext<'_, '_>) -> Result<Self> {
        text.parse()
            .map_err(|_| BindError::conversion::<bool>(text, "expected 'true' or 'false'"))
    }
}

impl FromScrape for char {
    fn from_text(text: &str, _cx: &BindingContext<'_, '_>) -> Result<Self> {
        text.parse()
            .map_err(|_| BindError::conversion::<char>(text, "expected a single character"))
    }
}

macro_rules! impl_from_scrape_numeric {
    ($($ty:ty),+) => {$(
        impl FromScrape for $ty {
            fn from_text(text: &str, _cx: &BindingContext<'_, '_>) -> Result<Self> {
                text.parse()
                    .map_err(|e: <$ty as std::str::FromStr>::Err| {
                        BindError::conversion::<$ty>(text, e.to_string())
                    })
            }
        }
    )+};
}

impl_from_scrape_numeric!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl FromScrape for NaiveDate {
    /// ISO 8601 (`2024-07-01`) without a pattern.
    fn from_text(text: &str, _cx: &BindingContext<'_, '_>) -> Result<Self> {
        text.parse()
            .map_err(|e: chrono::ParseError| BindError::conversion::<NaiveDate>(text, e.to_string()))
    }

    fn from_date(pattern: &str, cx: &BindingContext<'_, '_>) -> Result<Self> {
        NaiveDate::parse_from_str(cx.text(), pattern)
            .map_err(|e| BindError::conversion::<NaiveDate>(cx.text(), e.to_string()))
    }
}

impl FromScrape for NaiveDateTime {
    fn from_text(text: &str, _cx: &BindingContext<'_, '_>) -> Result<Self> {
        text.parse().map_err(|e: chrono::ParseError| {
            BindError::conversion::<NaiveDateTime>(text, e.to_string())
        })
    }

    fn from_date(pattern: &str, cx: &BindingContext<'_, '_>) -> Result<Self> {
        NaiveDateTime::parse_from_str(cx.text(), pattern)
            .map_err(|e| BindError::conversion::<NaiveDateTime>(cx.text(), e.to_string()))
    }
}

impl FromScrape for DateTime<Utc> {
    /// RFC 3339 without a pattern.
    fn from_text(text: &str, _cx: &BindingContext<'_, '_>) -> Result<Self> {
        DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| BindError::conversion::<DateTime<Utc>>(text, e.to_string()))
    }

    fn from_date(pattern: &str, cx: &BindingContext<'_, '_>) -> Result<Self> {
        NaiveDateTime::parse_from_str(cx.text(), pattern)
            .map(|naive| naive.and_utc())
            .map_err(|e| BindError::conversion::<DateTime<Utc>>(cx.text(), e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Enum support
// ---------------------------------------------------------------------------

/// Helper trait for enums built from scraped text.
///
/// The default match is exact comparison against [`token`](Self::token);
/// override [`matches`](Self::matches) for custom text equality.
pub trait ScrapedEnum: Sized + Copy + 'static {
    /// All variants, in declaration order.
    const VARIANTS: &'static [Self];

    /// The literal token of this variant.
    fn token(&self) -> &'static str;

    /// Whether this variant corresponds to the scraped text.
    fn matches(&self, text: &str) -> bool {
        self.token() == text
    }
}

/// Resolve an enum variant from normalized text; intended to back a type's
/// [`FromScrape::from_text`] implementation.
pub fn enum_from_text<T: ScrapedEnum>(text: &str) -> Result<T> {
    T::VARIANTS
        .iter()
        .copied()
        .find(|variant| variant.matches(text))
        .ok_or_else(|| BindError::conversion::<T>(text, "no matching enum variant"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::rule::BindingRule;
    use crate::{Bindable, Binder, ScrapeSource, scrape};

    #[test]
    fn number_style_canonicalizes_separators() {
        let us = NumberStyle::default();
        assert_eq!(us.canonicalize("1,234,567.89"), "1234567.89");

        let de = NumberStyle::new('.', ',');
        assert_eq!(de.canonicalize("1.234.567,89"), "1234567.89");
    }

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Grade {
        Pass,
        Fail,
    }

    impl ScrapedEnum for Grade {
        const VARIANTS: &'static [Self] = &[Self::Pass, Self::Fail];

        fn token(&self) -> &'static str {
            match self {
                Self::Pass => "Pass",
                Self::Fail => "Fail",
            }
        }

        // The site renders grades with a checkmark prefix.
        fn matches(&self, text: &str) -> bool {
            text.trim_start_matches("✓ ") == self.token()
        }
    }

    #[test]
    fn enum_resolution_with_custom_equality() {
        assert_eq!(enum_from_text::<Grade>("Fail").unwrap(), Grade::Fail);
        assert_eq!(enum_from_text::<Grade>("✓ Pass").unwrap(), Grade::Pass);
        assert!(enum_from_text::<Grade>("Unknown").is_err());
    }

    #[derive(Default)]
    struct ConvertTarget {
        count: u32,
        ratio: f64,
        amount: f64,
        born: NaiveDate,
        summary: String,
        price: Price,
    }

    #[derive(Default, Debug, PartialEq)]
    struct Price {
        amount: f64,
        currency: String,
    }

    impl FromScrape for Price {
        fn construct(args: ConstructArgs<'_, '_>, _cx: &BindingContext<'_, '_>) -> Result<Self> {
            let text = args.text()?;
            let amount = text
                .parse()
                .map_err(|_| BindError::conversion::<Price>(text, "amount is not numeric"))?;
            let currency = args
                .literals
                .first()
                .ok_or_else(|| BindError::configuration("Price needs a currency literal"))?
                .clone();
            Ok(Self { amount, currency })
        }
    }

    impl Bindable for ConvertTarget {
        fn bind(&mut self, b: &Binder<'_, '_>) -> Result<()> {
            b.field(&BindingRule::new(".count"), &mut self.count)?;
            b.field(&BindingRule::new(".ratio"), &mut self.ratio)?;
            b.field(
                &BindingRule::new(".amount")
                    .convert_with(Convert::Number(NumberStyle::default())),
                &mut self.amount,
            )?;
            b.field(
                &BindingRule::new(".born").convert_with(Convert::Date("%d.%m.%Y".into())),
                &mut self.born,
            )?;
            b.field(
                &BindingRule::new("div.body").convert_with(Convert::ChildText(
                    ChildTextSpec::new().exclude("script"),
                )),
                &mut self.summary,
            )?;
            b.field(
                &BindingRule::new(".price")
                    .convert_with(Convert::Construct(ConstructSpec::text().literal("EUR"))),
                &mut self.price,
            )
        }
    }

    const PAGE: &str = r#"
        <span class="count">17</span>
        <span class="ratio">0.25</span>
        <span class="amount">1,234.5</span>
        <span class="born">01.07.1990</span>
        <div class="body">
            <p>First block.</p>
            <script>ignore();</script>
            <span>inline tail</span>
        </div>
        <span class="price">19.99</span>
    "#;

    #[test]
    fn built_in_conversions_end_to_end() {
        let mut target = ConvertTarget::default();
        scrape(ScrapeSource::from_html(PAGE), &mut target).unwrap();

        assert_eq!(target.count, 17);
        assert_eq!(target.ratio, 0.25);
        assert_eq!(target.amount, 1234.5);
        assert_eq!(target.born, NaiveDate::from_ymd_opt(1990, 7, 1).unwrap());
        assert_eq!(target.summary, "First block.inline tail");
        assert_eq!(
            target.price,
            Price {
                amount: 19.99,
                currency: "EUR".into()
            }
        );
    }

    #[derive(Default)]
    struct BadTarget {
        count: u32,
    }

    impl Bindable for BadTarget {
        fn bind(&mut self, b: &Binder<'_, '_>) -> Result<()> {
            b.field(&BindingRule::new(".count"), &mut self.count)
        }
    }

    #[test]
    fn failed_parse_is_a_conversion_error() {
        let mut target = BadTarget::default();
        let err = scrape(
            ScrapeSource::from_html("<span class=\"count\">many</span>"),
            &mut target,
        )
        .unwrap_err();
        match err {
            BindError::Conversion { target, value, .. } => {
                assert_eq!(target, "u32");
                assert_eq!(value, "many");
            }
            other => panic!("expected conversion error, got: {other}"),
        }
    }

    #[derive(Default)]
    struct DateAsConstruct {
        when: NaiveDate,
    }

    impl Bindable for DateAsConstruct {
        fn bind(&mut self, b: &Binder<'_, '_>) -> Result<()> {
            // NaiveDate registers no construct factory; this must fail as a
            // configuration error at first use.
            b.field(
                &BindingRule::new(".when").convert_with(Convert::Construct(ConstructSpec::text())),
                &mut self.when,
            )
        }
    }

    #[test]
    fn unsupported_conversion_is_a_configuration_error() {
        let mut target = DateAsConstruct::default();
        let err = scrape(
            ScrapeSource::from_html("<span class=\"when\">2024-01-01</span>"),
            &mut target,
        )
        .unwrap_err();
        assert!(matches!(err, BindError::Configuration { .. }));
    }

    // A factory built from the selected node rather than its text.
    #[derive(Default, Debug, PartialEq)]
    struct Link {
        href: String,
    }

    impl FromScrape for Link {
        fn construct(args: ConstructArgs<'_, '_>, _cx: &BindingContext<'_, '_>) -> Result<Self> {
            let node = args.node()?;
            let href = node
                .attr("href")
                .ok_or_else(|| BindError::conversion::<Link>(node.tag(), "missing href"))?
                .to_owned();
            Ok(Self { href })
        }
    }

    // A factory that inspects the full binding context.
    #[derive(Default, Debug, PartialEq)]
    struct FieldEcho {
        field: String,
        value: String,
    }

    impl FromScrape for FieldEcho {
        fn construct(args: ConstructArgs<'_, '_>, _cx: &BindingContext<'_, '_>) -> Result<Self> {
            let cx = args.context()?;
            Ok(Self {
                field: cx.field().to_owned(),
                value: cx.text().to_owned(),
            })
        }
    }

    #[derive(Default)]
    struct PrimaryKinds {
        link: Link,
        echo: FieldEcho,
    }

    impl Bindable for PrimaryKinds {
        fn bind(&mut self, b: &Binder<'_, '_>) -> Result<()> {
            b.field(
                &BindingRule::new("a.next")
                    .convert_with(Convert::Construct(ConstructSpec::node())),
                &mut self.link,
            )?;
            b.field(
                &BindingRule::new(".who")
                    .named("who")
                    .convert_with(Convert::Construct(ConstructSpec::context())),
                &mut self.echo,
            )
        }
    }

    #[test]
    fn construct_node_and_context_primaries() {
        let markup = r#"<a class="next" href="/page/2">more</a><span class="who">karl</span>"#;
        let mut target = PrimaryKinds::default();
        scrape(ScrapeSource::from_html(markup), &mut target).unwrap();

        assert_eq!(target.link.href, "/page/2");
        assert_eq!(
            target.echo,
            FieldEcho {
                field: "who".into(),
                value: "karl".into()
            }
        );
    }

    #[test]
    fn primary_kind_mismatch_is_a_configuration_error() {
        // A node-primary factory handed a text primary must fail fatally.
        #[derive(Default)]
        struct Wrong {
            link: Link,
        }
        impl Bindable for Wrong {
            fn bind(&mut self, b: &Binder<'_, '_>) -> Result<()> {
                b.field(
                    &BindingRule::new("a.next")
                        .convert_with(Convert::Construct(ConstructSpec::text())),
                    &mut self.link,
                )
            }
        }

        let mut target = Wrong::default();
        let err = scrape(
            ScrapeSource::from_html(r#"<a class="next" href="/x">more</a>"#),
            &mut target,
        )
        .unwrap_err();
        assert!(matches!(err, BindError::Configuration { .. }));
    }

    // The site marks approximate counts with a tilde.
    struct StripTilde;

    impl ConvertText for StripTilde {
        fn convert(&self, cx: &BindingContext<'_, '_>) -> Result<String> {
            Ok(cx.text().trim_start_matches('~').to_owned())
        }
    }

    #[test]
    fn custom_text_transform_runs_before_parsing() {
        #[derive(Default)]
        struct Approx {
            count: u32,
        }
        impl Bindable for Approx {
            fn bind(&mut self, b: &Binder<'_, '_>) -> Result<()> {
                b.field(
                    &BindingRule::new(".approx")
                        .convert_with(Convert::Custom(Arc::new(StripTilde))),
                    &mut self.count,
                )
            }
        }

        let mut target = Approx::default();
        scrape(
            ScrapeSource::from_html("<span class=\"approx\">~40</span>"),
            &mut target,
        )
        .unwrap();
        assert_eq!(target.count, 40);
    }

    #[test]
    fn child_text_include_filter() {
        let spec = ChildTextSpec::new().include("p");
        let doc = crate::dom::Document::parse(
            "<div id=\"d\"><p>one</p><span>skip</span><p>two</p></div>",
        );
        let div = doc.root().select("#d").unwrap()[0];
        assert_eq!(spec.summarize(div), "one\ntwo");
    }
}
