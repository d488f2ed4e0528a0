use owlet_rdf::{IriParseError, NamedNode};
use owlet_ttl::TurtleSyntaxError;
use std::io;

/// An error raised while loading, extracting or resolving an ontology.
///
/// Every pipeline stage fails fast: the first error aborts the run and is
/// propagated unchanged, there is no partial ontology.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum OwlError {
    /// An ontology document is not valid Turtle.
    #[error(transparent)]
    Syntax(#[from] TurtleSyntaxError),
    /// A caller-supplied ontology IRI is not a valid IRI.
    #[error(transparent)]
    InvalidIri(#[from] IriParseError),
    /// An ontology document could not be retrieved.
    #[error("Failed to fetch {iri}: {cause}")]
    Fetch {
        /// The IRI of the document that could not be retrieved.
        iri: NamedNode,
        #[source]
        cause: io::Error,
    },
    /// The graph lacks a statement the model cannot be built without, like a
    /// property domain or the `owl:Ontology` declaration.
    #[error("Incomplete ontology: {0}")]
    Extract(String),
    /// A range or parent reference does not name a declared class or a known
    /// datatype.
    #[error("Unresolvable ontology: {0}")]
    Resolution(String),
}
