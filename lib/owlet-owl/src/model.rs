//! The resolved ontology model handed to code emitters.
//!
//! All types here are plain data: the [`crate::OntologyLoader`] pipeline
//! populates them and they are never mutated afterwards, so the model can be
//! read concurrently without locking.

use owlet_rdf::{Graph, NamedNode};
#[cfg(feature = "serde")]
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// How many values a property may carry on one subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Multiplicity {
    /// At most one value (functional property or cardinality restriction).
    Single,
    /// A list of values.
    Multiple,
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Single => "single",
            Self::Multiple => "multiple",
        })
    }
}

/// The collapsed family of a property range.
///
/// The XSD integer family collapses to [`Integer`](Self::Integer),
/// `float`/`double`/`decimal` to [`Float`](Self::Float),
/// `string`/`normalizedString`/`anyURI` to [`String`](Self::String) and the
/// temporal instant subtypes to [`Time`](Self::Time). Class-valued ranges are
/// [`Object`](Self::Object).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum BaseType {
    Boolean,
    Integer,
    Float,
    String,
    Time,
    Duration,
    Object,
}

/// A reference to a class type, qualified by the package name of the imported
/// ontology that declares it when the class is not local.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct TypeRef {
    pub package: Option<String>,
    pub name: String,
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(package) = &self.package {
            write!(f, "{package}.{}", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

/// The emitted type of a property value.
///
/// Literal ranges keep their temporal subtype here even though they share the
/// [`BaseType::Time`] family, so an emitter can pick a distinct native type
/// per XSD datatype. `owl:Thing` is the explicit catch-all object type; there
/// is no implicit fallback for unknown ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Representation {
    Boolean,
    Integer,
    Float,
    String,
    DateTime,
    Date,
    DateTimeStamp,
    GYear,
    GDay,
    GYearMonth,
    GMonth,
    Duration,
    Class(TypeRef),
    Thing,
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => f.write_str("boolean"),
            Self::Integer => f.write_str("integer"),
            Self::Float => f.write_str("float"),
            Self::String => f.write_str("string"),
            Self::DateTime => f.write_str("dateTime"),
            Self::Date => f.write_str("date"),
            Self::DateTimeStamp => f.write_str("dateTimeStamp"),
            Self::GYear => f.write_str("gYear"),
            Self::GDay => f.write_str("gDay"),
            Self::GYearMonth => f.write_str("gYearMonth"),
            Self::GMonth => f.write_str("gMonth"),
            Self::Duration => f.write_str("duration"),
            Self::Class(type_ref) => type_ref.fmt(f),
            Self::Thing => f.write_str("owl.Thing"),
        }
    }
}

/// A resolved ontology property.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Property {
    /// Property name, first letter lowered.
    pub name: String,
    /// Property name, first letter capitalized.
    pub capitalized: String,
    pub iri: NamedNode,
    /// `rdfs:comment` with newlines flattened, or the `"no comment"` sentinel.
    pub comment: String,
    pub multiplicity: Multiplicity,
    /// The collapsed family of the first range.
    pub base_type: BaseType,
    /// The emitted type of the first range.
    pub representation: Representation,
    /// One emitted type per range, in range declaration order. Never empty;
    /// holds a single entry unless the range is a union.
    pub allowed_types: Vec<Representation>,
    /// Name of the property this one is `owl:inverseOf`, if any.
    pub inverse_of: Option<String>,
    /// The exact XSD datatype IRI when the first range is a literal type.
    pub xsd_type: Option<NamedNode>,
    /// Name of the class this property instance is attached to.
    pub domain: String,
}

/// A resolved ontology class.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Class {
    /// Class name, first letter capitalized.
    pub name: String,
    pub iri: NamedNode,
    /// `rdfs:comment` with newlines flattened, or the `"no comment"` sentinel.
    pub comment: String,
    /// Package name of the imported ontology declaring this class, or `None`
    /// for classes of the root ontology.
    pub package: Option<String>,
    /// Names of all parent classes, direct and union-expanded, in declaration
    /// order. `owl:Thing` parents are dropped.
    pub parents: Vec<String>,
    /// Set when exactly one parent is declared in the same ontology as this
    /// class.
    pub direct_parent: Option<String>,
    /// Whether every property of this class matches the same-named property
    /// of its direct parent on base type, representation, multiplicity and
    /// the full allowed-type list. Emitters may then reuse the parent type
    /// instead of redefining the class.
    pub exact_child: bool,
    /// Own properties first, inherited ones appended after, union-domain ones
    /// last.
    pub properties: Vec<Property>,
    /// Names of the individuals declared with this class as their type.
    pub individuals: Vec<String>,
    /// Package names of imported ontologies this class depends on through its
    /// parents and property types, sorted and deduplicated.
    pub imports: Vec<String>,
}

/// A named individual of a declared class.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Individual {
    /// Individual name, first letter capitalized.
    pub name: String,
    pub iri: NamedNode,
    /// The declared type of this individual.
    pub class: TypeRef,
    /// Package name of the ontology declaring the individual, or `None` for
    /// the root ontology.
    pub package: Option<String>,
}

/// A fully resolved ontology: the output of the load pipeline and the input
/// of code emitters.
///
/// Maps are ordered by name so that iteration, summaries and JSON exports are
/// deterministic for a given input.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Ontology {
    /// The IRI of the root ontology.
    pub iri: NamedNode,
    /// All declared classes, root and imported, keyed by name.
    pub classes: BTreeMap<String, Class>,
    /// All declared properties keyed by name. Union-domain properties appear
    /// once here, with their first domain.
    pub properties: BTreeMap<String, Property>,
    /// All individuals keyed by name.
    pub individuals: BTreeMap<String, Individual>,
    /// Ontology IRI to the IRIs it imports. Every fetched import gets an
    /// entry, an ontology without imports maps to an empty list.
    pub imports: BTreeMap<NamedNode, Vec<NamedNode>>,
    /// Ontology IRI to its `dc:description` text, for ontologies that carry
    /// one.
    pub descriptions: BTreeMap<NamedNode, String>,
    /// The merged graph of the root document and every resolved import, kept
    /// for re-serialization.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub graph: Graph,
}

impl fmt::Display for Ontology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ontology({}) [{} classes, {} properties, {} individuals]",
            self.iri,
            self.classes.len(),
            self.properties.len(),
            self.individuals.len()
        )
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::panic_in_result_fn)]

    use super::*;

    #[test]
    fn type_ref_display_qualifies_imported_classes() {
        let local = TypeRef {
            package: None,
            name: "Person".into(),
        };
        assert_eq!(local.to_string(), "Person");
        let imported = TypeRef {
            package: Some("core".into()),
            name: "Agent".into(),
        };
        assert_eq!(imported.to_string(), "core.Agent");
        assert_eq!(Representation::Class(imported).to_string(), "core.Agent");
        assert_eq!(Representation::Thing.to_string(), "owl.Thing");
        assert_eq!(Representation::GYear.to_string(), "gYear");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde() -> Result<(), Box<dyn std::error::Error>> {
        let property = Property {
            name: "hasName".into(),
            capitalized: "HasName".into(),
            iri: NamedNode::new("http://example.com/hasName")?,
            comment: "no comment".into(),
            multiplicity: Multiplicity::Single,
            base_type: BaseType::String,
            representation: Representation::String,
            allowed_types: vec![Representation::String],
            inverse_of: None,
            xsd_type: Some(NamedNode::new(
                "http://www.w3.org/2001/XMLSchema#string",
            )?),
            domain: "Person".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&property)?;
        assert_eq!(json["name"], "hasName");
        assert_eq!(json["multiplicity"], "Single");
        assert_eq!(json["iri"], "http://example.com/hasName");
        assert_eq!(json["allowed_types"][0], "String");
        Ok(())
    }
}
