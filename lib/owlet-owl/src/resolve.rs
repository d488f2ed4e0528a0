//! Second modelling stage: turns the raw declarations into the resolved
//! [`Ontology`] model.
//!
//! Passes run in a fixed order: range type resolution, property attachment,
//! inheritance propagation, exact-child detection, union-domain fan-out. The
//! order is observable, exact-child status is decided before union-domain
//! properties are attached.

use crate::error::OwlError;
use crate::extract::{Extraction, OntologyDecl};
use crate::model::{
    BaseType, Class, Individual, Multiplicity, Ontology, Property, Representation, TypeRef,
};
use owlet_rdf::vocab::{owl, xsd};
use owlet_rdf::{Graph, NamedNode, NamedNodeRef};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeMap, BTreeSet};

/// Resolves the extracted declarations of the merged `graph` into the final
/// model, rooted at the ontology `root`.
pub(crate) fn resolve(
    extraction: Extraction,
    root: NamedNode,
    graph: Graph,
) -> Result<Ontology, OwlError> {
    let scopes = Scopes::new(&extraction.ontologies, root.clone());

    // Class skeletons, indexed by IRI for range and parent lookups.
    let mut classes = Vec::with_capacity(extraction.classes.len());
    let mut parent_lists = Vec::with_capacity(extraction.classes.len());
    let mut by_iri = FxHashMap::default();
    for decl in extraction.classes {
        by_iri.insert(decl.iri.as_str().to_owned(), classes.len());
        let package = scopes.package_of(decl.iri.as_str());
        classes.push(Class {
            name: type_name(decl.iri.as_str()),
            iri: decl.iri,
            comment: decl.comment,
            package,
            parents: Vec::new(),
            direct_parent: None,
            exact_child: false,
            properties: Vec::new(),
            individuals: Vec::new(),
            imports: Vec::new(),
        });
        parent_lists.push(decl.parents);
    }

    // Range type resolution, and the domain each property instance attaches
    // to.
    let mut properties = Vec::with_capacity(extraction.properties.len());
    let mut attachments = Vec::with_capacity(extraction.properties.len());
    for decl in &extraction.properties {
        let mut first = None;
        let mut allowed_types = Vec::with_capacity(decl.ranges.len());
        for range in &decl.ranges {
            let (base, representation) = range_type(range, &decl.iri, &classes, &by_iri)?;
            if first.is_none() {
                first = Some((base, representation.clone(), range.clone()));
            }
            allowed_types.push(representation);
        }
        // Extraction rejects range-less properties.
        let Some((base_type, representation, first_range)) = first else {
            continue;
        };
        let mut domain_indices = Vec::with_capacity(decl.domains.len());
        for domain in &decl.domains {
            let Some(&index) = by_iri.get(domain.as_str()) else {
                return Err(OwlError::Resolution(format!(
                    "the domain {domain} of property {} is not a declared class",
                    decl.iri
                )));
            };
            domain_indices.push(index);
        }
        // Extraction rejects domain-less properties.
        let Some(&first_domain) = domain_indices.first() else {
            continue;
        };
        properties.push(Property {
            name: property_name(decl.iri.as_str()),
            capitalized: type_name(decl.iri.as_str()),
            iri: decl.iri.clone(),
            comment: decl.comment.clone(),
            multiplicity: if decl.functional {
                Multiplicity::Single
            } else {
                Multiplicity::Multiple
            },
            base_type,
            representation,
            allowed_types,
            inverse_of: decl
                .inverse_of
                .as_ref()
                .map(|iri| property_name(iri.as_str())),
            xsd_type: (base_type != BaseType::Object).then_some(first_range),
            domain: classes[first_domain].name.clone(),
        });
        attachments.push(domain_indices);
    }

    // Single-domain properties attach to their class now, union-domain ones
    // only in the last pass.
    for (property, domains) in properties.iter().zip(&attachments) {
        if let [index] = domains.as_slice() {
            classes[*index].properties.push(property.clone());
        }
    }

    // Parent resolution.
    let mut parent_indices = Vec::with_capacity(classes.len());
    let mut direct_parents = vec![None; classes.len()];
    for (index, parents) in parent_lists.iter().enumerate() {
        let mut indices = Vec::new();
        let mut names = Vec::new();
        for parent in parents {
            if parent.as_ref() == owl::THING {
                continue;
            }
            let Some(&parent_index) = by_iri.get(parent.as_str()) else {
                return Err(OwlError::Resolution(format!(
                    "the parent {parent} of class {} is not a declared class",
                    classes[index].iri
                )));
            };
            if parent_index != index && !indices.contains(&parent_index) {
                indices.push(parent_index);
                names.push(classes[parent_index].name.clone());
            }
        }
        classes[index].parents = names;
        parent_indices.push(indices);
    }
    for index in 0..classes.len() {
        let same_package: Vec<usize> = parent_indices[index]
            .iter()
            .copied()
            .filter(|&parent| classes[parent].package == classes[index].package)
            .collect();
        if let [parent] = same_package.as_slice() {
            let name = classes[*parent].name.clone();
            classes[index].direct_parent = Some(name);
            direct_parents[index] = Some(*parent);
        }
    }

    // Inheritance propagation, ancestors first so one pass is transitive.
    let mut done = vec![false; classes.len()];
    let mut visiting = FxHashSet::default();
    for index in 0..classes.len() {
        propagate(index, &mut classes, &parent_indices, &mut done, &mut visiting);
    }

    // Exact-child detection.
    for index in 0..classes.len() {
        let Some(parent) = direct_parents[index] else {
            continue;
        };
        let exact = classes[index].properties.iter().all(|property| {
            classes[parent].properties.iter().any(|candidate| {
                candidate.name == property.name
                    && candidate.base_type == property.base_type
                    && candidate.representation == property.representation
                    && candidate.multiplicity == property.multiplicity
                    && candidate.allowed_types == property.allowed_types
            })
        });
        classes[index].exact_child = exact;
    }

    // Union-domain fan-out.
    for (property, domains) in properties.iter().zip(&attachments) {
        if domains.len() > 1 {
            for &index in domains {
                let mut attached = property.clone();
                attached.domain = classes[index].name.clone();
                classes[index].properties.push(attached);
            }
        }
    }

    // External packages each class depends on through parents and property
    // types.
    let import_lists: Vec<Vec<String>> = (0..classes.len())
        .map(|index| {
            let class = &classes[index];
            let mut packages = BTreeSet::new();
            for &parent in &parent_indices[index] {
                if let Some(package) = &classes[parent].package {
                    if class.package.as_ref() != Some(package) {
                        packages.insert(package.clone());
                    }
                }
            }
            for property in &class.properties {
                for allowed in &property.allowed_types {
                    if let Representation::Class(type_ref) = allowed {
                        if let Some(package) = &type_ref.package {
                            if class.package.as_ref() != Some(package) {
                                packages.insert(package.clone());
                            }
                        }
                    }
                }
            }
            packages.into_iter().collect()
        })
        .collect();
    for (class, imports) in classes.iter_mut().zip(import_lists) {
        class.imports = imports;
    }

    // Individuals, recorded on their class and in the model map.
    let mut individuals = BTreeMap::new();
    for decl in &extraction.individuals {
        let Some(&class_index) = by_iri.get(decl.class_iri.as_str()) else {
            continue;
        };
        let name = type_name(decl.iri.as_str());
        let class = TypeRef {
            package: classes[class_index].package.clone(),
            name: classes[class_index].name.clone(),
        };
        let package = scopes.package_of(decl.iri.as_str());
        classes[class_index].individuals.push(name.clone());
        individuals.insert(
            name.clone(),
            Individual {
                name,
                iri: decl.iri.clone(),
                class,
                package,
            },
        );
    }

    // The import and description maps cover every ontology subject; import
    // targets whose document never declares one still get an empty entry.
    let mut imports = BTreeMap::new();
    let mut descriptions = BTreeMap::new();
    for decl in &extraction.ontologies {
        imports.insert(decl.iri.clone(), decl.imports.clone());
        if let Some(description) = &decl.description {
            descriptions.insert(decl.iri.clone(), description.clone());
        }
    }
    let targets: Vec<NamedNode> = imports.values().flatten().cloned().collect();
    for target in targets {
        imports.entry(target).or_default();
    }
    imports.entry(root.clone()).or_default();

    Ok(Ontology {
        iri: root,
        classes: classes
            .into_iter()
            .map(|class| (class.name.clone(), class))
            .collect(),
        properties: properties
            .into_iter()
            .map(|property| (property.name.clone(), property))
            .collect(),
        individuals,
        imports,
        descriptions,
        graph,
    })
}

/// Copies the properties of every ancestor of `index` into its list, unless a
/// same-named property is declared closer. Runs ancestors first, so one pass
/// per class is transitive; cycles terminate through the visiting set.
fn propagate(
    index: usize,
    classes: &mut [Class],
    parent_indices: &[Vec<usize>],
    done: &mut [bool],
    visiting: &mut FxHashSet<usize>,
) {
    if done[index] || !visiting.insert(index) {
        return;
    }
    for &parent in &parent_indices[index] {
        propagate(parent, classes, parent_indices, done, visiting);
        let inherited: Vec<Property> = classes[parent]
            .properties
            .iter()
            .filter(|property| {
                !classes[index]
                    .properties
                    .iter()
                    .any(|own| own.name == property.name)
            })
            .cloned()
            .collect();
        let child = &mut classes[index];
        for mut property in inherited {
            property.domain = child.name.clone();
            child.properties.push(property);
        }
    }
    visiting.remove(&index);
    done[index] = true;
}

/// Resolves one range IRI to its collapsed family and emitted type.
fn range_type(
    range: &NamedNode,
    property: &NamedNode,
    classes: &[Class],
    by_iri: &FxHashMap<String, usize>,
) -> Result<(BaseType, Representation), OwlError> {
    if let Some(literal) = literal_type(range.as_ref()) {
        return Ok(literal);
    }
    if range.as_ref() == owl::THING {
        return Ok((BaseType::Object, Representation::Thing));
    }
    if let Some(&index) = by_iri.get(range.as_str()) {
        let class = &classes[index];
        return Ok((
            BaseType::Object,
            Representation::Class(TypeRef {
                package: class.package.clone(),
                name: class.name.clone(),
            }),
        ));
    }
    Err(OwlError::Resolution(format!(
        "the range {range} of property {property} does not name a declared class or a known datatype"
    )))
}

/// The fixed literal type table: collapses the XSD integer, floating point
/// and string families and keys the temporal subtypes by exact datatype IRI.
fn literal_type(datatype: NamedNodeRef<'_>) -> Option<(BaseType, Representation)> {
    Some(match datatype {
        xsd::STRING | xsd::NORMALIZED_STRING | xsd::ANY_URI => {
            (BaseType::String, Representation::String)
        }
        xsd::BOOLEAN => (BaseType::Boolean, Representation::Boolean),
        xsd::INTEGER
        | xsd::INT
        | xsd::LONG
        | xsd::SHORT
        | xsd::BYTE
        | xsd::UNSIGNED_LONG
        | xsd::UNSIGNED_INT
        | xsd::UNSIGNED_SHORT
        | xsd::UNSIGNED_BYTE
        | xsd::NON_NEGATIVE_INTEGER
        | xsd::NON_POSITIVE_INTEGER
        | xsd::POSITIVE_INTEGER
        | xsd::NEGATIVE_INTEGER => (BaseType::Integer, Representation::Integer),
        xsd::FLOAT | xsd::DOUBLE | xsd::DECIMAL => (BaseType::Float, Representation::Float),
        xsd::DATE_TIME => (BaseType::Time, Representation::DateTime),
        xsd::DATE => (BaseType::Time, Representation::Date),
        xsd::DATE_TIME_STAMP => (BaseType::Time, Representation::DateTimeStamp),
        xsd::G_YEAR => (BaseType::Time, Representation::GYear),
        xsd::G_DAY => (BaseType::Time, Representation::GDay),
        xsd::G_YEAR_MONTH => (BaseType::Time, Representation::GYearMonth),
        xsd::G_MONTH => (BaseType::Time, Representation::GMonth),
        xsd::DURATION => (BaseType::Duration, Representation::Duration),
        _ => return None,
    })
}

/// Maps entity IRIs to the ontology declaring them, by longest IRI prefix
/// with the root as fallback.
struct Scopes {
    root: NamedNode,
    ontologies: Vec<NamedNode>,
}

impl Scopes {
    fn new(decls: &[OntologyDecl], root: NamedNode) -> Self {
        let mut ontologies: Vec<NamedNode> =
            decls.iter().map(|decl| decl.iri.clone()).collect();
        if !ontologies.contains(&root) {
            ontologies.push(root.clone());
        }
        Self { root, ontologies }
    }

    /// The package name owning `iri`, or `None` when the root ontology does.
    fn package_of(&self, iri: &str) -> Option<String> {
        let owner = self
            .ontologies
            .iter()
            .filter(|ontology| iri.starts_with(ontology.as_str()))
            .max_by_key(|ontology| ontology.as_str().len());
        match owner {
            Some(owner) if *owner != self.root => Some(package_name(owner.as_str())),
            _ => None,
        }
    }
}

/// The fragment of `iri`, or its last path segment when it has no fragment.
fn local_name(iri: &str) -> &str {
    let trimmed = iri.trim_end_matches(['#', '/']);
    match trimmed.rsplit_once(['#', '/']) {
        Some((_, name)) => name,
        None => trimmed,
    }
}

/// Class names and capitalized property names upper-case the first letter.
fn type_name(iri: &str) -> String {
    let name = local_name(iri);
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Property names lower-case the first letter.
fn property_name(iri: &str) -> String {
    let name = local_name(iri);
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Package names lower-case the whole ontology name.
fn package_name(iri: &str) -> String {
    local_name(iri).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_derive_from_fragment_or_last_segment() {
        assert_eq!(local_name("http://example.com/onto#Person"), "Person");
        assert_eq!(local_name("http://example.com/onto/person"), "person");
        assert_eq!(local_name("http://example.com/onto#"), "onto");
        assert_eq!(local_name("http://example.com/onto/"), "onto");
        assert_eq!(type_name("http://example.com/onto#person"), "Person");
        assert_eq!(property_name("http://example.com/onto#HasName"), "hasName");
        assert_eq!(package_name("http://example.com/Time#"), "time");
    }

    #[test]
    fn literal_table_collapses_families() {
        assert_eq!(
            literal_type(xsd::G_YEAR),
            Some((BaseType::Time, Representation::GYear))
        );
        assert_eq!(
            literal_type(xsd::UNSIGNED_SHORT),
            Some((BaseType::Integer, Representation::Integer))
        );
        assert_eq!(
            literal_type(xsd::DECIMAL),
            Some((BaseType::Float, Representation::Float))
        );
        assert_eq!(
            literal_type(xsd::ANY_URI),
            Some((BaseType::String, Representation::String))
        );
        assert_eq!(
            literal_type(xsd::DURATION),
            Some((BaseType::Duration, Representation::Duration))
        );
        assert_eq!(literal_type(owl::THING), None);
    }

    #[test]
    fn packages_resolve_by_longest_prefix() {
        let root = NamedNode::new("http://example.com/onto").unwrap();
        let decls = vec![
            OntologyDecl {
                iri: root.clone(),
                description: None,
                imports: Vec::new(),
            },
            OntologyDecl {
                iri: NamedNode::new("http://example.com/onto/time").unwrap(),
                description: None,
                imports: Vec::new(),
            },
        ];
        let scopes = Scopes::new(&decls, root);
        assert_eq!(scopes.package_of("http://example.com/onto#A"), None);
        assert_eq!(
            scopes.package_of("http://example.com/onto/time#Interval"),
            Some("time".into())
        );
        assert_eq!(scopes.package_of("http://elsewhere.org/X"), None);
    }
}
