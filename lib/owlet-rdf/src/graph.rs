//! [RDF graphs](https://www.w3.org/TR/rdf11-concepts/#dfn-rdf-graph) as an
//! insertion-ordered triple sequence with a subject-indexed adjacency view.
//!
//! Usage example:
//! ```
//! use owlet_rdf::{Graph, NamedNodeRef, TripleRef};
//!
//! let mut graph = Graph::new();
//! let ex = NamedNodeRef::new("http://example.com")?;
//! graph.insert(TripleRef::new(ex, ex, ex));
//!
//! let results: Vec<_> = graph.triples_for_subject(ex).collect();
//! assert_eq!(vec![TripleRef::new(ex, ex, ex)], results);
//! # Result::<_, Box<dyn std::error::Error>>::Ok(())
//! ```

use crate::named_node::NamedNodeRef;
use crate::triple::{Subject, SubjectRef, TermRef, Triple, TripleRef};
use rustc_hash::FxHashMap;
use std::fmt;

/// An RDF graph owning its triples.
///
/// Triples keep their insertion order and are *not* deduplicated: merging the
/// same document twice doubles the edge lists. Consumers treat duplicate edges
/// as redundant rather than erroneous.
#[derive(Debug, Default, Clone)]
pub struct Graph {
    triples: Vec<Triple>,
    nodes: FxHashMap<Subject, Node>,
}

/// The outgoing edges of one subject, stored as indices into the owning
/// graph's triple sequence.
#[derive(Debug, Default, Clone)]
pub struct Node {
    edges: Vec<usize>,
}

impl Node {
    /// Number of outgoing edges, duplicates included.
    #[inline]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl Graph {
    /// Creates a new empty graph.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from a triple sequence, indexing subjects in one pass.
    pub fn from_triples(triples: Vec<Triple>) -> Self {
        let mut nodes = FxHashMap::<Subject, Node>::default();
        for (i, triple) in triples.iter().enumerate() {
            nodes.entry(triple.subject.clone()).or_default().edges.push(i);
        }
        Self { triples, nodes }
    }

    /// Adds a triple to the graph, keeping insertion order.
    pub fn insert(&mut self, triple: impl Into<Triple>) {
        let triple = triple.into();
        let i = self.triples.len();
        self.nodes
            .entry(triple.subject.clone())
            .or_default()
            .edges
            .push(i);
        self.triples.push(triple);
    }

    /// Moves all triples of `other` into `self`.
    ///
    /// The triple sequences are concatenated and per-subject edge lists
    /// unioned. Nothing is deduplicated.
    pub fn merge(&mut self, other: Self) {
        let offset = self.triples.len();
        for (subject, node) in other.nodes {
            let edges = &mut self.nodes.entry(subject).or_default().edges;
            edges.extend(node.edges.iter().map(|i| i + offset));
        }
        self.triples.extend(other.triples);
    }

    /// Number of triples, duplicates included.
    #[inline]
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// All triples, in insertion order.
    #[inline]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.triples.iter(),
        }
    }

    /// The adjacency [`Node`] of `subject`, if the subject occurs in the graph.
    pub fn node<'b>(&self, subject: impl Into<SubjectRef<'b>>) -> Option<&Node> {
        self.nodes.get(&subject.into().into_owned())
    }

    /// All triples with the given subject, in insertion order.
    pub fn triples_for_subject<'a, 'b>(
        &'a self,
        subject: impl Into<SubjectRef<'b>>,
    ) -> impl Iterator<Item = TripleRef<'a>> + 'a {
        self.node(subject)
            .map(|node| node.edges.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(move |&i| Some(self.triples.get(i)?.as_ref()))
    }

    /// All objects of triples with the given subject and predicate.
    pub fn objects_for_subject_predicate<'a, 'b>(
        &'a self,
        subject: impl Into<SubjectRef<'b>>,
        predicate: impl Into<NamedNodeRef<'b>>,
    ) -> impl Iterator<Item = TermRef<'a>> + 'a {
        let predicate = predicate.into().into_owned();
        self.triples_for_subject(subject)
            .filter(move |t| t.predicate == predicate)
            .map(|t| t.object)
    }

    /// The first object of a triple with the given subject and predicate.
    pub fn object_for_subject_predicate<'a, 'b>(
        &'a self,
        subject: impl Into<SubjectRef<'b>>,
        predicate: impl Into<NamedNodeRef<'b>>,
    ) -> Option<TermRef<'a>> {
        self.objects_for_subject_predicate(subject, predicate).next()
    }

    /// All triples with the given predicate, in insertion order.
    pub fn triples_for_predicate<'a, 'b>(
        &'a self,
        predicate: impl Into<NamedNodeRef<'b>>,
    ) -> impl Iterator<Item = TripleRef<'a>> + 'a {
        let predicate = predicate.into().into_owned();
        self.iter().filter(move |t| t.predicate == predicate)
    }

    /// All subjects of triples with the given predicate and object.
    pub fn subjects_for_predicate_object<'a, 'b>(
        &'a self,
        predicate: impl Into<NamedNodeRef<'b>>,
        object: impl Into<TermRef<'b>>,
    ) -> impl Iterator<Item = SubjectRef<'a>> + 'a {
        let predicate = predicate.into().into_owned();
        let object = object.into().into_owned();
        self.iter()
            .filter(move |t| t.predicate == predicate && t.object == object.as_ref())
            .map(|t| t.subject)
    }

    /// Checks if the graph contains the given triple, by term equality.
    pub fn contains<'a>(&self, triple: impl Into<TripleRef<'a>>) -> bool {
        let triple = triple.into();
        self.triples_for_subject(triple.subject)
            .any(|t| t.predicate == triple.predicate && t.object == triple.object)
    }
}

impl Extend<Triple> for Graph {
    fn extend<I: IntoIterator<Item = Triple>>(&mut self, iter: I) {
        for triple in iter {
            self.insert(triple);
        }
    }
}

impl FromIterator<Triple> for Graph {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        Self::from_triples(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Graph {
    type Item = TripleRef<'a>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the triples of a [`Graph`], in insertion order.
pub struct Iter<'a> {
    inner: std::slice::Iter<'a, Triple>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = TripleRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.inner.next()?.as_ref())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl fmt::Display for Graph {
    /// Formats the graph as N-Triples, one statement per line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for t in self.iter() {
            writeln!(f, "{t} .")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Literal;
    use crate::named_node::NamedNode;
    use crate::vocab::rdf;

    fn ex(name: &str) -> NamedNode {
        NamedNode::new(format!("http://example.com/{name}")).unwrap()
    }

    #[test]
    fn build_and_query() {
        let graph = Graph::from_triples(vec![
            Triple::new(ex("a"), ex("p"), ex("b")),
            Triple::new(ex("a"), ex("q"), Literal::from("v")),
            Triple::new(ex("b"), ex("p"), ex("c")),
        ]);
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.triples_for_subject(&ex("a")).count(), 2);
        assert_eq!(
            graph.object_for_subject_predicate(&ex("a"), &ex("p")),
            Some(ex("b").as_ref().into())
        );
        assert_eq!(
            graph
                .subjects_for_predicate_object(&ex("p"), &ex("c"))
                .count(),
            1
        );
        assert!(graph.contains(TripleRef::new(
            ex("a").as_ref(),
            ex("p").as_ref(),
            ex("b").as_ref()
        )));
    }

    #[test]
    fn merge_concatenates_without_dedup() {
        let triples = vec![
            Triple::new(ex("a"), rdf::TYPE, ex("T")),
            Triple::new(ex("b"), ex("p"), ex("a")),
        ];
        let mut graph = Graph::from_triples(triples.clone());
        graph.merge(Graph::from_triples(triples));
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.triples_for_subject(&ex("a")).count(), 2);
        assert_eq!(graph.node(&ex("b")).unwrap().len(), 2);
    }

    #[test]
    fn merge_preserves_order() {
        let mut graph = Graph::from_triples(vec![Triple::new(ex("a"), ex("p"), ex("b"))]);
        graph.merge(Graph::from_triples(vec![Triple::new(
            ex("c"),
            ex("p"),
            ex("d"),
        )]));
        let subjects: Vec<_> = graph.iter().map(|t| t.subject.into_owned()).collect();
        assert_eq!(subjects, vec![ex("a").into(), ex("c").into()]);
    }

    #[test]
    fn display_is_ntriples() {
        let graph = Graph::from_triples(vec![Triple::new(
            ex("a"),
            ex("p"),
            Literal::from("line\nbreak"),
        )]);
        assert_eq!(
            graph.to_string(),
            "<http://example.com/a> <http://example.com/p> \"line\\nbreak\" .\n"
        );
    }
}
