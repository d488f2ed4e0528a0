//! First modelling stage: pulls ontology, class, property and individual
//! declarations out of a merged graph without resolving cross-references.
//!
//! Extraction tolerates duplicate edges (merges do not deduplicate triples)
//! but fails on structurally incomplete declarations, like a property with no
//! `rdfs:domain`.

use crate::error::OwlError;
use owlet_rdf::vocab::{dc, owl, rdf, rdfs};
use owlet_rdf::{Graph, NamedNode, NamedNodeRef, Subject, SubjectRef, TermRef, TripleRef};
use rustc_hash::FxHashSet;

/// Comment recorded for entities that carry no `rdfs:comment`.
pub(crate) const NO_COMMENT: &str = "no comment";

/// The unresolved declarations of one merged graph.
#[derive(Debug)]
pub(crate) struct Extraction {
    pub ontologies: Vec<OntologyDecl>,
    pub classes: Vec<ClassDecl>,
    pub properties: Vec<PropertyDecl>,
    pub individuals: Vec<IndividualDecl>,
}

/// A subject declared `rdf:type owl:Ontology`.
#[derive(Debug)]
pub(crate) struct OntologyDecl {
    pub iri: NamedNode,
    pub description: Option<String>,
    pub imports: Vec<NamedNode>,
}

/// A subject declared `rdf:type owl:Class`, with its parent IRIs.
#[derive(Debug)]
pub(crate) struct ClassDecl {
    pub iri: NamedNode,
    pub comment: String,
    /// Named `rdfs:subClassOf` targets, union members expanded, in
    /// declaration order.
    pub parents: Vec<NamedNode>,
}

/// A subject declared as an object or datatype property.
#[derive(Debug)]
pub(crate) struct PropertyDecl {
    pub iri: NamedNode,
    pub comment: String,
    /// Named `rdfs:domain` targets, union members expanded. Never empty.
    pub domains: Vec<NamedNode>,
    /// Named `rdfs:range` targets, union members expanded. Never empty.
    pub ranges: Vec<NamedNode>,
    pub inverse_of: Option<NamedNode>,
    /// Declared functional, or capped to one value by a cardinality
    /// restriction on some class.
    pub functional: bool,
}

/// A subject typed with a declared class.
#[derive(Debug)]
pub(crate) struct IndividualDecl {
    pub iri: NamedNode,
    pub class_iri: NamedNode,
}

/// Extracts all declarations of `graph`.
pub(crate) fn extract(graph: &Graph) -> Result<Extraction, OwlError> {
    let ontologies = ontology_decls(graph);
    let (classes, single_valued) = class_decls(graph);
    let properties = property_decls(graph, &single_valued)?;
    let individuals = individual_decls(graph, &classes);
    Ok(Extraction {
        ontologies,
        classes,
        properties,
        individuals,
    })
}

fn ontology_decls(graph: &Graph) -> Vec<OntologyDecl> {
    typed_subjects(graph, owl::ONTOLOGY)
        .into_iter()
        .map(|iri| {
            let description = graph
                .objects_for_subject_predicate(&iri, dc::DESCRIPTION)
                .find_map(|object| match object {
                    TermRef::Literal(literal) => Some(literal.value().to_owned()),
                    _ => None,
                });
            let imports = edge_targets(graph, &iri, owl::IMPORTS);
            OntologyDecl {
                iri,
                description,
                imports,
            }
        })
        .collect()
}

/// Extracts the class declarations plus the set of property IRIs some class
/// restricts to at most one value.
fn class_decls(graph: &Graph) -> (Vec<ClassDecl>, FxHashSet<NamedNode>) {
    let mut single_valued = FxHashSet::default();
    let mut decls = Vec::new();
    for iri in typed_subjects(graph, owl::CLASS) {
        for object in graph.objects_for_subject_predicate(&iri, rdfs::SUB_CLASS_OF) {
            if let TermRef::BlankNode(node) = object {
                if let Some(property) = restricted_property(graph, node.into()) {
                    single_valued.insert(property);
                }
            }
        }
        let parents = edge_targets(graph, &iri, rdfs::SUB_CLASS_OF);
        let comment = comment(graph, &iri);
        decls.push(ClassDecl {
            iri,
            comment,
            parents,
        });
    }
    (decls, single_valued)
}

fn property_decls(
    graph: &Graph,
    single_valued: &FxHashSet<NamedNode>,
) -> Result<Vec<PropertyDecl>, OwlError> {
    let mut seen = FxHashSet::default();
    let mut decls = Vec::new();
    for type_iri in [owl::OBJECT_PROPERTY, owl::DATATYPE_PROPERTY] {
        for iri in typed_subjects(graph, type_iri) {
            if !seen.insert(iri.clone()) {
                continue;
            }
            let domains = edge_targets(graph, &iri, rdfs::DOMAIN);
            if domains.is_empty() {
                return Err(OwlError::Extract(format!(
                    "the property {iri} has no rdfs:domain"
                )));
            }
            let ranges = edge_targets(graph, &iri, rdfs::RANGE);
            if ranges.is_empty() {
                return Err(OwlError::Extract(format!(
                    "the property {iri} has no rdfs:range"
                )));
            }
            let inverse_of = graph
                .object_for_subject_predicate(&iri, owl::INVERSE_OF)
                .and_then(|object| match object {
                    TermRef::NamedNode(node) => Some(node.into_owned()),
                    _ => None,
                });
            let functional = single_valued.contains(&iri)
                || graph.contains(TripleRef::new(&iri, rdf::TYPE, owl::FUNCTIONAL_PROPERTY));
            let comment = comment(graph, &iri);
            decls.push(PropertyDecl {
                iri,
                comment,
                domains,
                ranges,
                inverse_of,
                functional,
            });
        }
    }
    Ok(decls)
}

fn individual_decls(graph: &Graph, classes: &[ClassDecl]) -> Vec<IndividualDecl> {
    let class_iris: FxHashSet<&str> = classes.iter().map(|class| class.iri.as_str()).collect();
    let mut seen = FxHashSet::default();
    let mut decls = Vec::new();
    for triple in graph.triples_for_predicate(rdf::TYPE) {
        let TermRef::NamedNode(class_iri) = triple.object else {
            continue;
        };
        if !class_iris.contains(class_iri.as_str()) {
            continue;
        }
        let SubjectRef::NamedNode(subject) = triple.subject else {
            continue;
        };
        let iri = subject.into_owned();
        // The first declared type wins when an individual carries several.
        if !seen.insert(iri.clone()) {
            continue;
        }
        decls.push(IndividualDecl {
            iri,
            class_iri: class_iri.into_owned(),
        });
    }
    decls
}

/// Named subjects declared `rdf:type <type_iri>`, deduplicated, in insertion
/// order.
fn typed_subjects(graph: &Graph, type_iri: NamedNodeRef<'_>) -> Vec<NamedNode> {
    let mut seen = FxHashSet::default();
    graph
        .subjects_for_predicate_object(rdf::TYPE, type_iri)
        .filter_map(|subject| match subject {
            SubjectRef::NamedNode(node) => Some(node.into_owned()),
            SubjectRef::BlankNode(_) => None,
        })
        .filter(|node| seen.insert(node.clone()))
        .collect()
}

/// The first `rdfs:comment` literal of `subject`, newlines flattened to
/// spaces, or the [`NO_COMMENT`] sentinel.
fn comment(graph: &Graph, subject: &NamedNode) -> String {
    graph
        .objects_for_subject_predicate(subject, rdfs::COMMENT)
        .find_map(|object| match object {
            TermRef::Literal(literal) => {
                Some(literal.value().replace("\r\n", " ").replace('\n', " "))
            }
            _ => None,
        })
        .unwrap_or_else(|| NO_COMMENT.to_owned())
}

/// Collects the named targets of `predicate` on `subject`, expanding
/// anonymous `owl:unionOf` nodes into their list members.
fn edge_targets(graph: &Graph, subject: &NamedNode, predicate: NamedNodeRef<'_>) -> Vec<NamedNode> {
    let mut targets = Vec::new();
    for object in graph.objects_for_subject_predicate(subject, predicate) {
        match object {
            TermRef::NamedNode(node) => push_unique(&mut targets, node.into_owned()),
            TermRef::BlankNode(node) => {
                if let Some(head) = graph.object_for_subject_predicate(node, owl::UNION_OF) {
                    for member in collect_list(graph, head) {
                        push_unique(&mut targets, member);
                    }
                }
            }
            TermRef::Literal(_) => {}
        }
    }
    targets
}

/// Appends `target` unless it is already listed, so that duplicate edges from
/// merged documents collapse while the declaration order stays intact.
fn push_unique(targets: &mut Vec<NamedNode>, target: NamedNode) {
    if !targets.contains(&target) {
        targets.push(target);
    }
}

/// Walks an `rdf:first`/`rdf:rest` chain from `head`, collecting the named
/// members and skipping `rdf:nil`. Cyclic chains terminate instead of
/// looping.
fn collect_list(graph: &Graph, head: TermRef<'_>) -> Vec<NamedNode> {
    let mut members = Vec::new();
    let mut visited = FxHashSet::default();
    let mut current: Option<Subject> = head.as_subject().map(SubjectRef::into_owned);
    while let Some(cell) = current.take() {
        if !visited.insert(cell.clone()) {
            break;
        }
        if let Some(TermRef::NamedNode(member)) =
            graph.object_for_subject_predicate(&cell, rdf::FIRST)
        {
            if member != rdf::NIL {
                members.push(member.into_owned());
            }
        }
        current = graph
            .object_for_subject_predicate(&cell, rdf::REST)
            .and_then(TermRef::as_subject)
            .map(SubjectRef::into_owned);
    }
    members
}

/// Returns the restricted property when `node` is an `owl:Restriction`
/// capping it to at most one value.
fn restricted_property(graph: &Graph, node: SubjectRef<'_>) -> Option<NamedNode> {
    if !graph.contains(TripleRef::new(node, rdf::TYPE, owl::RESTRICTION)) {
        return None;
    }
    let Some(TermRef::NamedNode(property)) =
        graph.object_for_subject_predicate(node, owl::ON_PROPERTY)
    else {
        return None;
    };
    let cardinality = graph
        .object_for_subject_predicate(node, owl::MAX_CARDINALITY)
        .or_else(|| graph.object_for_subject_predicate(node, owl::CARDINALITY))?;
    if let TermRef::Literal(value) = cardinality {
        (value.value() == "1").then(|| property.into_owned())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use owlet_ttl::TurtleParser;

    fn graph(turtle: &str) -> Graph {
        Graph::from_triples(TurtleParser::new().parse_str(turtle).unwrap())
    }

    const PREFIXES: &str = concat!(
        "@prefix owl: <http://www.w3.org/2002/07/owl#> .\n",
        "@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .\n",
        "@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .\n",
        "@prefix ex: <http://example.com/onto#> .\n",
    );

    #[test]
    fn classes_default_to_the_comment_sentinel() {
        let graph = graph(&format!(
            "{PREFIXES}\
             ex:Person a owl:Class .\n\
             ex:Agent a owl:Class ; rdfs:comment \"An agent.\\nActs.\" ."
        ));
        let (classes, _) = class_decls(&graph);
        assert_eq!(classes.len(), 2);
        assert_eq!(classes[0].comment, "no comment");
        assert_eq!(classes[1].comment, "An agent. Acts.");
    }

    #[test]
    fn union_parents_expand_in_order() {
        let graph = graph(&format!(
            "{PREFIXES}\
             ex:A a owl:Class .\n\
             ex:B a owl:Class .\n\
             ex:C a owl:Class ;\n\
               rdfs:subClassOf ex:A ;\n\
               rdfs:subClassOf [ owl:unionOf ( ex:B ex:A ) ] ."
        ));
        let (classes, _) = class_decls(&graph);
        let c = classes
            .iter()
            .find(|class| class.iri.as_str().ends_with("#C"))
            .unwrap();
        let parents: Vec<_> = c.parents.iter().map(NamedNode::as_str).collect();
        assert_eq!(
            parents,
            ["http://example.com/onto#A", "http://example.com/onto#B"]
        );
    }

    #[test]
    fn cardinality_restrictions_mark_properties_single_valued() {
        let graph = graph(&format!(
            "{PREFIXES}\
             ex:Person a owl:Class ;\n\
               rdfs:subClassOf [\n\
                 a owl:Restriction ;\n\
                 owl:onProperty ex:hasName ;\n\
                 owl:maxCardinality \"1\"^^xsd:nonNegativeInteger\n\
               ] .\n\
             ex:hasName a owl:DatatypeProperty ;\n\
               rdfs:domain ex:Person ; rdfs:range xsd:string ."
        ));
        let extraction = extract(&graph).unwrap();
        assert!(extraction.properties[0].functional);
    }

    #[test]
    fn functional_properties_are_single_valued() {
        let graph = graph(&format!(
            "{PREFIXES}\
             ex:Person a owl:Class .\n\
             ex:id a owl:DatatypeProperty , owl:FunctionalProperty ;\n\
               rdfs:domain ex:Person ; rdfs:range xsd:string .\n\
             ex:knows a owl:ObjectProperty ;\n\
               rdfs:domain ex:Person ; rdfs:range ex:Person ."
        ));
        let extraction = extract(&graph).unwrap();
        let id = extraction
            .properties
            .iter()
            .find(|p| p.iri.as_str().ends_with("id"))
            .unwrap();
        assert!(id.functional);
        let knows = extraction
            .properties
            .iter()
            .find(|p| p.iri.as_str().ends_with("knows"))
            .unwrap();
        assert!(!knows.functional);
    }

    #[test]
    fn missing_domain_is_an_extraction_error() {
        let graph = graph(&format!(
            "{PREFIXES}\
             ex:broken a owl:DatatypeProperty ; rdfs:range xsd:string ."
        ));
        let err = extract(&graph).unwrap_err();
        assert!(matches!(err, OwlError::Extract(_)));
        assert!(err.to_string().contains("rdfs:domain"));
    }

    #[test]
    fn missing_range_is_an_extraction_error() {
        let graph = graph(&format!(
            "{PREFIXES}\
             ex:broken a owl:ObjectProperty ; rdfs:domain ex:Person .\n\
             ex:Person a owl:Class ."
        ));
        let err = extract(&graph).unwrap_err();
        assert!(err.to_string().contains("rdfs:range"));
    }

    #[test]
    fn individuals_keep_their_first_declared_type() {
        let graph = graph(&format!(
            "{PREFIXES}\
             ex:Person a owl:Class .\n\
             ex:Robot a owl:Class .\n\
             ex:alice a ex:Person , owl:NamedIndividual .\n\
             ex:bender a ex:Robot , ex:Person ."
        ));
        let extraction = extract(&graph).unwrap();
        assert_eq!(extraction.individuals.len(), 2);
        assert!(extraction.individuals[0].iri.as_str().ends_with("alice"));
        assert!(
            extraction.individuals[1]
                .class_iri
                .as_str()
                .ends_with("Robot")
        );
    }

    #[test]
    fn ontology_declarations_carry_description_and_imports() {
        let graph = graph(&format!(
            "{PREFIXES}\
             @prefix dc: <http://purl.org/dc/terms/> .\n\
             <http://example.com/onto> a owl:Ontology ;\n\
               dc:description \"Core vocabulary\" ;\n\
               owl:imports <http://example.com/base> , <http://example.com/time> ."
        ));
        let decls = ontology_decls(&graph);
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].iri.as_str(), "http://example.com/onto");
        assert_eq!(decls[0].description.as_deref(), Some("Core vocabulary"));
        let imports: Vec<_> = decls[0].imports.iter().map(NamedNode::as_str).collect();
        assert_eq!(
            imports,
            ["http://example.com/base", "http://example.com/time"]
        );
    }

    #[test]
    fn duplicate_merges_do_not_duplicate_declarations() {
        let turtle = format!(
            "{PREFIXES}\
             ex:Person a owl:Class ; rdfs:subClassOf ex:Agent .\n\
             ex:Agent a owl:Class ."
        );
        let mut merged = graph(&turtle);
        merged.merge(graph(&turtle));
        let (classes, _) = class_decls(&merged);
        assert_eq!(classes.len(), 2);
        assert_eq!(classes[0].parents.len(), 1);
    }
}
