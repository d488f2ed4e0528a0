//! owlet-rdf provides the RDF data structures the owlet ontology toolkit is
//! built on: [IRIs](NamedNode), [blank nodes](BlankNode), [literals](Literal),
//! [triples](Triple) and an insertion-ordered, subject-indexed [`Graph`].
//!
//! Usage example:
//! ```
//! use owlet_rdf::vocab::{owl, rdf};
//! use owlet_rdf::{Graph, NamedNodeRef, Triple};
//!
//! let person = NamedNodeRef::new("http://example.com/Person")?;
//! let mut graph = Graph::new();
//! graph.insert(Triple::new(person, rdf::TYPE, owl::CLASS));
//!
//! assert_eq!(
//!     graph.object_for_subject_predicate(person, rdf::TYPE),
//!     Some(owl::CLASS.into())
//! );
//! # Result::<_, owlet_rdf::IriParseError>::Ok(())
//! ```

mod blank_node;
pub mod graph;
mod literal;
mod named_node;
mod triple;
pub mod vocab;

pub use crate::blank_node::{BlankNode, BlankNodeIdParseError, BlankNodeRef};
pub use crate::graph::{Graph, Node};
pub use crate::literal::{Literal, LiteralRef};
pub use crate::named_node::{NamedNode, NamedNodeRef};
pub use crate::triple::{Subject, SubjectRef, Term, TermRef, Triple, TripleRef};
pub use oxilangtag::LanguageTagParseError;
pub use oxiri::IriParseError;
