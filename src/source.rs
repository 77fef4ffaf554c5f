//! Scrape sources — anything that yields a root document.
//!
//! A [`ScrapeSource`] is built from raw markup, from an existing node, or
//! from a URL locator resolved through the fetch collaborator. Sources are
//! `Send` so they can cross onto pool workers; a node-backed source captures
//! the node's serialized markup for that reason (same-thread nested scrapes
//! bind the live node directly and never go through a source).

use url::Url;

use crate::dom::{Document, Node};
use crate::error::{BindError, Result};
use crate::fetch::Fetcher;

/// A means to obtain a scrapable root document.
#[derive(Clone, Debug)]
pub struct ScrapeSource {
    kind: SourceKind,
}

#[derive(Clone, Debug)]
enum SourceKind {
    Markup { markup: String, origin: String },
    Locator {
        url: Url,
        retries: Option<u32>,
        user_agent: Option<String>,
    },
}

impl ScrapeSource {
    /// A source over raw markup text.
    pub fn from_html(markup: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::Markup {
                markup: markup.into(),
                origin: "inline".into(),
            },
        }
    }

    /// A source over an existing node, reserialized so the source stays
    /// independent of the node's document.
    pub fn from_node(node: Node<'_>) -> Self {
        Self {
            kind: SourceKind::Markup {
                markup: node.html(),
                origin: "inline".into(),
            },
        }
    }

    /// A source resolved by fetching the given URL. Retries default to the
    /// engine configuration unless overridden per source.
    pub fn from_url(url: &str) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| BindError::configuration(format!("invalid source URL '{url}': {e}")))?;
        Ok(Self {
            kind: SourceKind::Locator {
                url,
                retries: None,
                user_agent: None,
            },
        })
    }

    /// Override the retry count (URL sources only; ignored otherwise).
    pub fn retries(mut self, retries: u32) -> Self {
        if let SourceKind::Locator { retries: r, .. } = &mut self.kind {
            *r = Some(retries);
        }
        self
    }

    /// Override the user-agent for this source (URL sources only).
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        if let SourceKind::Locator { user_agent: ua, .. } = &mut self.kind {
            *ua = Some(user_agent.into());
        }
        self
    }

    /// Document identity for diagnostics.
    pub(crate) fn origin(&self) -> String {
        match &self.kind {
            SourceKind::Markup { origin, .. } => origin.clone(),
            SourceKind::Locator { url, .. } => url.to_string(),
        }
    }

    /// Resolve this source to a parsed document.
    pub(crate) fn load(&self, fetcher: &Fetcher) -> Result<Document> {
        match &self.kind {
            SourceKind::Markup { markup, .. } => Ok(Document::parse(markup)),
            SourceKind::Locator {
                url,
                retries,
                user_agent,
            } => {
                let body = fetcher.get(url, *retries, user_agent.as_deref())?;
                Ok(Document::parse(&body))
            }
        }
    }
}

/// Targets that expose their own scrape source.
///
/// When a converted object implements this, the engine follows up with a
/// nested scrape of that source (see [`Binder::follow`](crate::Binder::follow)),
/// letting object graphs pull their own sub-documents. Such targets can also
/// be handed to the builder directly, source included.
pub trait SourceProvider {
    /// The source this object should be scraped from.
    fn source(&self) -> ScrapeSource;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    #[test]
    fn invalid_url_is_a_configuration_error() {
        let err = ScrapeSource::from_url("not a url").unwrap_err();
        assert!(matches!(err, BindError::Configuration { .. }));
    }

    #[test]
    fn origin_identifies_the_document() {
        let inline = ScrapeSource::from_html("<p>x</p>");
        assert_eq!(inline.origin(), "inline");

        let url = ScrapeSource::from_url("https://example.com/page").unwrap();
        assert_eq!(url.origin(), "https://example.com/page");
    }

    #[test]
    fn markup_source_loads_without_network() {
        let source = ScrapeSource::from_html("<p id=\"x\">hello</p>");
        let fetcher = Fetcher::new(&EngineConfig::default());
        let doc = source.load(&fetcher).unwrap();
        assert_eq!(doc.root().select("#x").unwrap()[0].text(), "hello");
    }

    #[test]
    fn node_source_reserializes() {
        let doc = Document::parse("<div><span class=\"a\">kept</span></div>");
        let span = doc.root().select("span.a").unwrap()[0];
        let source = ScrapeSource::from_node(span);

        let fetcher = Fetcher::new(&EngineConfig::default());
        let copy = source.load(&fetcher).unwrap();
        assert_eq!(copy.root().select(".a").unwrap()[0].text(), "kept");
    }
}
