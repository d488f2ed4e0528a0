//! owlet-owl loads [OWL](https://www.w3.org/TR/owl2-overview/) ontologies into
//! a code-generator friendly model.
//!
//! Documents are parsed as Turtle, their `owl:imports` closure is fetched and
//! merged into one graph, and the graph is resolved into named [`Class`],
//! [`Property`] and [`Individual`] records with collapsed literal types,
//! propagated inheritance and package qualified cross-ontology references.
//!
//! Usage example:
//! ```
//! use owlet_owl::{MemoryFetcher, Multiplicity, OntologyLoader};
//!
//! let document = r#"
//! @prefix owl: <http://www.w3.org/2002/07/owl#> .
//! @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
//! @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
//! @prefix ex: <http://example.com/zoo#> .
//!
//! ex: a owl:Ontology .
//! ex:Animal a owl:Class ; rdfs:comment "Something living in the zoo" .
//! ex:name a owl:DatatypeProperty , owl:FunctionalProperty ;
//!     rdfs:domain ex:Animal ;
//!     rdfs:range xsd:string .
//! "#;
//!
//! let ontology = OntologyLoader::new(MemoryFetcher::new()).load_str(document, None)?;
//! let animal = &ontology.classes["Animal"];
//! assert_eq!(animal.comment, "Something living in the zoo");
//! assert_eq!(animal.properties.len(), 1);
//! assert_eq!(animal.properties[0].name, "name");
//! assert_eq!(animal.properties[0].multiplicity, Multiplicity::Single);
//! # Result::<_, owlet_owl::OwlError>::Ok(())
//! ```

mod error;
mod extract;
mod fetch;
mod loader;
mod model;
mod resolve;

pub use crate::error::OwlError;
pub use crate::fetch::{DEFAULT_TIMEOUT, Fetcher, HttpFetcher, MemoryFetcher};
pub use crate::loader::OntologyLoader;
pub use crate::model::{
    BaseType, Class, Individual, Multiplicity, Ontology, Property, Representation, TypeRef,
};
pub use owlet_rdf::{Graph, NamedNode};
