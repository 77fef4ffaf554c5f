//! Declarative HTML-to-struct binding with a concurrent execution engine.
//!
//! A target type implements [`Bindable`] by pairing each of its fields with
//! a [`BindingRule`] (a CSS query plus extraction, rewrite, validation, and
//! conversion settings). The engine resolves every rule against a parsed
//! document and assigns the converted values, so callers describe *what*
//! each field is bound to and never hand-roll traversal code.
//!
//! Entry points:
//! - [`scrape`] — bind one source into one target on the calling thread
//! - [`Scraper`] — batch many (source, target) jobs onto a worker pool
//!
//! ```no_run
//! use docbind::{Bindable, Binder, BindingRule, Result, ScrapeSource, scrape};
//!
//! #[derive(Default)]
//! struct Article {
//!     title: String,
//!     tags: Vec<String>,
//! }
//!
//! impl Bindable for Article {
//!     fn bind(&mut self, b: &Binder<'_, '_>) -> Result<()> {
//!         b.field(&BindingRule::new("h1.title"), &mut self.title)?;
//!         b.fields(&BindingRule::new("ul.tags li"), &mut self.tags)
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let mut article = Article::default();
//! scrape(ScrapeSource::from_url("https://example.com/post/1")?, &mut article)?;
//! # Ok(())
//! # }
//! ```

pub mod bind;
pub mod config;
pub mod convert;
pub mod dom;
pub mod error;
pub mod exec;
pub mod fetch;
pub mod rule;
pub mod select;
pub mod source;
pub mod validate;

pub use bind::{Bindable, Binder, BindingContext};
pub use config::EngineConfig;
pub use convert::{
    ArgKind, ChildTextSpec, ConstructArgs, ConstructSpec, Convert, ConvertText, FromScrape,
    NumberStyle, Primary, ScrapedEnum, enum_from_text,
};
pub use dom::{Document, Node};
pub use error::{BindError, Result};
pub use exec::{ExecCtx, ScrapeBuilder, Scraper, scrape};
pub use fetch::Fetcher;
pub use rule::BindingRule;
pub use select::{RootSelector, SelectRoot};
pub use source::{ScrapeSource, SourceProvider};
pub use validate::{Validate, Validator};
