//! Turtle document loading with recursive `owl:imports` resolution.

use crate::error::OwlError;
use crate::extract::extract;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::model::Ontology;
use crate::resolve::resolve;
use owlet_rdf::vocab::{owl, rdf};
use owlet_rdf::{Graph, NamedNode, SubjectRef, TermRef};
use owlet_ttl::TurtleParser;
use rustc_hash::FxHashSet;

/// Loads ontology documents into an [`Ontology`] model.
///
/// The loader parses a Turtle document, follows its `owl:imports` closure
/// through the given [`Fetcher`], merges everything into one graph and
/// resolves the result. Loading fails as a whole on the first syntax, fetch
/// or resolution problem, there is no partial model.
pub struct OntologyLoader<F: Fetcher = HttpFetcher> {
    fetcher: F,
    follow_imports: bool,
}

impl Default for OntologyLoader {
    fn default() -> Self {
        Self::new(HttpFetcher::default())
    }
}

impl<F: Fetcher> OntologyLoader<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            follow_imports: true,
        }
    }

    /// Disables `owl:imports` resolution. Only the given document itself is
    /// loaded; its import declarations still show up in
    /// [`Ontology::imports`].
    #[inline]
    #[must_use]
    pub fn without_imports(mut self) -> Self {
        self.follow_imports = false;
        self
    }

    /// Loads the ontology serialized in `document`.
    ///
    /// Relative IRIs are resolved against `base_iri` when one is given. The
    /// document must declare an `owl:Ontology` subject, the first one is the
    /// root of the loaded model.
    pub fn load_str(&self, document: &str, base_iri: Option<&str>) -> Result<Ontology, OwlError> {
        let graph = parse_document(document.as_bytes(), base_iri)?;
        let root = root_ontology(&graph)?;
        let mut visited = FxHashSet::default();
        visited.insert(root.clone());
        self.finish(graph, root, visited)
    }

    /// Fetches the document at `iri` and loads it, with the IRI as the base
    /// for relative references.
    pub fn load_iri(&self, iri: &str) -> Result<Ontology, OwlError> {
        let iri = NamedNode::new(iri)?;
        let document = self
            .fetcher
            .fetch(iri.as_str())
            .map_err(|cause| OwlError::Fetch {
                iri: iri.clone(),
                cause,
            })?;
        let graph = parse_document(&document, Some(iri.as_str()))?;
        let root = root_ontology(&graph)?;
        let mut visited = FxHashSet::default();
        visited.insert(root.clone());
        visited.insert(iri);
        self.finish(graph, root, visited)
    }

    fn finish(
        &self,
        mut graph: Graph,
        root: NamedNode,
        mut visited: FxHashSet<NamedNode>,
    ) -> Result<Ontology, OwlError> {
        if self.follow_imports {
            self.resolve_imports(&mut graph, &mut visited)?;
        }
        let extraction = extract(&graph)?;
        resolve(extraction, root, graph)
    }

    /// Fetches every unvisited `owl:imports` target of `graph`, resolves the
    /// imports of the fetched documents in turn and merges everything into
    /// `graph`. The visited set keeps mutual and diamond imports from being
    /// loaded twice.
    fn resolve_imports(
        &self,
        graph: &mut Graph,
        visited: &mut FxHashSet<NamedNode>,
    ) -> Result<(), OwlError> {
        let targets: Vec<NamedNode> = graph
            .triples_for_predicate(owl::IMPORTS)
            .filter_map(|triple| match triple.object {
                TermRef::NamedNode(target) => Some(target.into_owned()),
                _ => None,
            })
            .collect();
        for target in targets {
            if !visited.insert(target.clone()) {
                continue;
            }
            let document = self
                .fetcher
                .fetch(target.as_str())
                .map_err(|cause| OwlError::Fetch {
                    iri: target.clone(),
                    cause,
                })?;
            let mut imported = parse_document(&document, Some(target.as_str()))?;
            // The fetched document may declare its ontology under another IRI
            // than the one it was imported by.
            if let Some(declared) = declared_ontology(&imported) {
                visited.insert(declared);
            }
            self.resolve_imports(&mut imported, visited)?;
            graph.merge(imported);
        }
        Ok(())
    }
}

fn parse_document(document: &[u8], base_iri: Option<&str>) -> Result<Graph, OwlError> {
    let mut parser = TurtleParser::new();
    if let Some(base_iri) = base_iri {
        parser = parser.with_base_iri(base_iri)?;
    }
    Ok(Graph::from_triples(parser.parse_slice(document)?))
}

/// The first subject declared as `owl:Ontology`, in document order.
fn declared_ontology(graph: &Graph) -> Option<NamedNode> {
    graph
        .subjects_for_predicate_object(rdf::TYPE, owl::ONTOLOGY)
        .find_map(|subject| match subject {
            SubjectRef::NamedNode(iri) => Some(iri.into_owned()),
            SubjectRef::BlankNode(_) => None,
        })
}

fn root_ontology(graph: &Graph) -> Result<NamedNode, OwlError> {
    declared_ontology(graph)
        .ok_or_else(|| OwlError::Extract("the document declares no owl:Ontology".into()))
}
