//! Retrieval of ontology documents by IRI.
//!
//! The loader only depends on the [`Fetcher`] trait, so import resolution can
//! be exercised in tests (and offline) through [`MemoryFetcher`] while
//! production use dereferences IRIs over HTTP with [`HttpFetcher`].

use oxhttp::model::Request;
use oxhttp::model::header::ACCEPT;
use rustc_hash::FxHashMap;
use std::io::{self, Error, ErrorKind, Read};
use std::time::Duration;

/// Timeout applied to every HTTP fetch unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

const REDIRECTION_LIMIT: usize = 10;

/// Retrieves the document an ontology IRI dereferences to.
pub trait Fetcher {
    /// Returns the raw bytes of the document behind `iri`.
    ///
    /// The bytes are expected to be UTF-8 encoded Turtle; decoding and
    /// parsing are the caller's concern.
    fn fetch(&self, iri: &str) -> io::Result<Vec<u8>>;
}

/// A [`Fetcher`] dereferencing IRIs with HTTP GET requests.
///
/// Requests carry an `Accept: text/turtle` header, follow redirections and
/// abort after the configured timeout. A non-success status is an error, not
/// an empty document.
pub struct HttpFetcher {
    client: oxhttp::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: oxhttp::Client::new()
                .with_redirection_limit(REDIRECTION_LIMIT)
                .with_user_agent(concat!("owlet/", env!("CARGO_PKG_VERSION")))
                .unwrap()
                .with_global_timeout(timeout),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, iri: &str) -> io::Result<Vec<u8>> {
        let request = Request::builder()
            .uri(iri)
            .header(ACCEPT, "text/turtle")
            .body(())
            .map_err(|e| Error::new(ErrorKind::InvalidInput, e))?;
        let response = self.client.request(request)?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::other(format!(
                "Error {status} returned by {iri} with payload:\n{}",
                response.into_body().to_string()?
            )));
        }
        let mut document = Vec::new();
        response.into_body().read_to_end(&mut document)?;
        Ok(document)
    }
}

/// A [`Fetcher`] serving documents from an in-memory map.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    documents: FxHashMap<String, String>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `document` as the content behind `iri`.
    #[must_use]
    pub fn with_document(mut self, iri: impl Into<String>, document: impl Into<String>) -> Self {
        self.documents.insert(iri.into(), document.into());
        self
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(&self, iri: &str) -> io::Result<Vec<u8>> {
        self.documents
            .get(iri)
            .map(|document| document.clone().into_bytes())
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::NotFound,
                    format!("No document registered for {iri}"),
                )
            })
    }
}
