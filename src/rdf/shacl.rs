//! SHACL Core subset over in-memory quads.
//!
//! Supported: node shapes targeting by `sh:targetClass` or `sh:targetNode`,
//! property shapes with an IRI `sh:path` and the constraints listed in
//! [`Constraint`]. Everything else in a shapes graph is ignored.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use oxigraph::model::vocab::rdf;
use oxigraph::model::{NamedNode, NamedNodeRef, Quad, Term};
use regex::Regex;

use crate::error::ShaclError;
use crate::rdf::parse_turtle;

const SH: &str = "http://www.w3.org/ns/shacl#";

const SH_NODE_SHAPE: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#NodeShape");
const SH_TARGET_CLASS: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#targetClass");
const SH_TARGET_NODE: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#targetNode");
const SH_PROPERTY: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#property");
const SH_PATH: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#path");
const SH_MIN_COUNT: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#minCount");
const SH_MAX_COUNT: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#maxCount");
const SH_DATATYPE: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#datatype");
const SH_NODE_KIND: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#nodeKind");
const SH_CLASS: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#class");
const SH_PATTERN: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#pattern");
const SH_MIN_LENGTH: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#minLength");
const SH_MAX_LENGTH: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#maxLength");

/// Value of `sh:nodeKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    BlankNode,
    Iri,
    Literal,
    BlankNodeOrIri,
    BlankNodeOrLiteral,
    IriOrLiteral,
}

impl NodeKind {
    fn from_iri(iri: &str) -> Option<Self> {
        let local = iri.strip_prefix(SH)?;
        Some(match local {
            "BlankNode" => Self::BlankNode,
            "IRI" => Self::Iri,
            "Literal" => Self::Literal,
            "BlankNodeOrIRI" => Self::BlankNodeOrIri,
            "BlankNodeOrLiteral" => Self::BlankNodeOrLiteral,
            "IRIOrLiteral" => Self::IriOrLiteral,
            _ => return None,
        })
    }

    fn accepts(self, term: &Term) -> bool {
        let (iri, blank, literal) = match term {
            Term::NamedNode(_) => (true, false, false),
            Term::BlankNode(_) => (false, true, false),
            Term::Literal(_) => (false, false, true),
            #[allow(unreachable_patterns)]
            _ => (false, false, false),
        };
        match self {
            Self::BlankNode => blank,
            Self::Iri => iri,
            Self::Literal => literal,
            Self::BlankNodeOrIri => blank || iri,
            Self::BlankNodeOrLiteral => blank || literal,
            Self::IriOrLiteral => iri || literal,
        }
    }
}

/// One supported constraint component.
#[derive(Debug, Clone)]
pub enum Constraint {
    MinCount(usize),
    MaxCount(usize),
    Datatype(NamedNode),
    NodeKind(NodeKind),
    Class(NamedNode),
    Pattern(Regex),
    MinLength(usize),
    MaxLength(usize),
}

impl Constraint {
    fn component(&self) -> &'static str {
        match self {
            Constraint::MinCount(_) => "sh:MinCountConstraintComponent",
            Constraint::MaxCount(_) => "sh:MaxCountConstraintComponent",
            Constraint::Datatype(_) => "sh:DatatypeConstraintComponent",
            Constraint::NodeKind(_) => "sh:NodeKindConstraintComponent",
            Constraint::Class(_) => "sh:ClassConstraintComponent",
            Constraint::Pattern(_) => "sh:PatternConstraintComponent",
            Constraint::MinLength(_) => "sh:MinLengthConstraintComponent",
            Constraint::MaxLength(_) => "sh:MaxLengthConstraintComponent",
        }
    }
}

#[derive(Debug, Clone)]
struct PropertyShape {
    path: NamedNode,
    constraints: Vec<Constraint>,
}

#[derive(Debug, Clone)]
struct NodeShape {
    id: Term,
    target_classes: Vec<Term>,
    target_nodes: Vec<Term>,
    properties: Vec<PropertyShape>,
}

/// Subject-keyed view over a set of quads (graph names ignored).
struct TermIndex {
    outgoing: HashMap<Term, Vec<(NamedNode, Term)>>,
    instances: HashMap<Term, Vec<Term>>,
}

impl TermIndex {
    fn new(quads: &[Quad]) -> Self {
        let mut outgoing: HashMap<Term, Vec<(NamedNode, Term)>> = HashMap::new();
        let mut instances: HashMap<Term, Vec<Term>> = HashMap::new();
        for quad in quads {
            let subject = Term::from(quad.subject.clone());
            if quad.predicate.as_ref() == rdf::TYPE {
                instances
                    .entry(quad.object.clone())
                    .or_default()
                    .push(subject.clone());
            }
            outgoing
                .entry(subject)
                .or_default()
                .push((quad.predicate.clone(), quad.object.clone()));
        }
        Self { outgoing, instances }
    }

    fn objects<'a>(
        &'a self,
        subject: &Term,
        predicate: NamedNodeRef<'a>,
    ) -> impl Iterator<Item = &'a Term> + 'a {
        self.outgoing
            .get(subject)
            .into_iter()
            .flatten()
            .filter(move |(p, _)| p.as_ref() == predicate)
            .map(|(_, o)| o)
    }

    fn subjects_with(&self, predicate: NamedNodeRef<'_>) -> Vec<Term> {
        let mut subjects: Vec<Term> = self
            .outgoing
            .iter()
            .filter(|(_, edges)| edges.iter().any(|(p, _)| p.as_ref() == predicate))
            .map(|(s, _)| s.clone())
            .collect();
        subjects.sort_by_key(ToString::to_string);
        subjects
    }

    fn instances_of(&self, class: &Term) -> &[Term] {
        self.instances.get(class).map(Vec::as_slice).unwrap_or_default()
    }

    fn has_type(&self, node: &Term, class: &NamedNode) -> bool {
        self.objects(node, rdf::TYPE)
            .any(|t| matches!(t, Term::NamedNode(n) if n == class))
    }
}

/// A parsed shapes graph.
#[derive(Debug, Clone, Default)]
pub struct ShapesGraph {
    shapes: Vec<NodeShape>,
}

impl ShapesGraph {
    /// Read a Turtle shapes file.
    pub fn load(path: &Path) -> Result<Self, ShaclError> {
        let text = std::fs::read_to_string(path).map_err(|e| ShaclError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&text)
    }

    /// Parse shapes from Turtle text.
    pub fn parse(turtle: &str) -> Result<Self, ShaclError> {
        let quads = parse_turtle(turtle).map_err(|e| ShaclError::Shapes {
            message: e.to_string(),
        })?;
        let index = TermIndex::new(&quads);

        let mut shape_ids: Vec<Term> = index
            .instances_of(&Term::from(SH_NODE_SHAPE.into_owned()))
            .to_vec();
        for id in index
            .subjects_with(SH_TARGET_CLASS)
            .into_iter()
            .chain(index.subjects_with(SH_TARGET_NODE))
        {
            if !shape_ids.contains(&id) {
                shape_ids.push(id);
            }
        }

        let shapes = shape_ids
            .into_iter()
            .map(|id| node_shape(&index, id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { shapes })
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Validate a data graph against every shape.
    pub fn validate(&self, data: &[Quad]) -> ValidationReport {
        let index = TermIndex::new(data);
        let mut results = Vec::new();

        for shape in &self.shapes {
            let mut focus_nodes: Vec<Term> = shape.target_nodes.clone();
            for class in &shape.target_classes {
                for node in index.instances_of(class) {
                    if !focus_nodes.contains(node) {
                        focus_nodes.push(node.clone());
                    }
                }
            }

            for focus in &focus_nodes {
                for property in &shape.properties {
                    let values: Vec<&Term> =
                        index.objects(focus, property.path.as_ref()).collect();
                    for constraint in &property.constraints {
                        check(&index, shape, focus, property, constraint, &values, &mut results);
                    }
                }
            }
        }

        ValidationReport {
            conforms: results.is_empty(),
            results,
        }
    }
}

fn node_shape(index: &TermIndex, id: Term) -> Result<NodeShape, ShaclError> {
    let target_classes = index.objects(&id, SH_TARGET_CLASS).cloned().collect();
    let target_nodes = index.objects(&id, SH_TARGET_NODE).cloned().collect();
    let mut properties = Vec::new();
    for property in index.objects(&id, SH_PROPERTY) {
        let Some(Term::NamedNode(path)) = index.objects(property, SH_PATH).next() else {
            tracing::warn!(shape = %id, "skipping property shape without an IRI sh:path");
            continue;
        };
        properties.push(PropertyShape {
            path: path.clone(),
            constraints: constraints(index, property)?,
        });
    }
    Ok(NodeShape {
        id,
        target_classes,
        target_nodes,
        properties,
    })
}

fn constraints(index: &TermIndex, property: &Term) -> Result<Vec<Constraint>, ShaclError> {
    let mut out = Vec::new();
    let count = |predicate| {
        index
            .objects(property, predicate)
            .filter_map(|t| match t {
                Term::Literal(l) => l.value().parse::<usize>().ok(),
                _ => None,
            })
            .collect::<Vec<_>>()
    };
    let iris = |predicate| {
        index
            .objects(property, predicate)
            .filter_map(|t| match t {
                Term::NamedNode(n) => Some(n.clone()),
                _ => None,
            })
            .collect::<Vec<_>>()
    };

    out.extend(count(SH_MIN_COUNT).into_iter().map(Constraint::MinCount));
    out.extend(count(SH_MAX_COUNT).into_iter().map(Constraint::MaxCount));
    out.extend(iris(SH_DATATYPE).into_iter().map(Constraint::Datatype));
    out.extend(
        iris(SH_NODE_KIND)
            .iter()
            .filter_map(|n| NodeKind::from_iri(n.as_str()))
            .map(Constraint::NodeKind),
    );
    out.extend(iris(SH_CLASS).into_iter().map(Constraint::Class));
    for term in index.objects(property, SH_PATTERN) {
        if let Term::Literal(l) = term {
            let regex = Regex::new(l.value()).map_err(|e| ShaclError::Pattern {
                pattern: l.value().to_string(),
                message: e.to_string(),
            })?;
            out.push(Constraint::Pattern(regex));
        }
    }
    out.extend(count(SH_MIN_LENGTH).into_iter().map(Constraint::MinLength));
    out.extend(count(SH_MAX_LENGTH).into_iter().map(Constraint::MaxLength));
    Ok(out)
}

/// Lexical form used by string-based constraints; blank nodes have none.
fn lexical_form(term: &Term) -> Option<&str> {
    match term {
        Term::NamedNode(n) => Some(n.as_str()),
        Term::Literal(l) => Some(l.value()),
        _ => None,
    }
}

fn check(
    index: &TermIndex,
    shape: &NodeShape,
    focus: &Term,
    property: &PropertyShape,
    constraint: &Constraint,
    values: &[&Term],
    results: &mut Vec<ValidationResult>,
) {
    let mut violation = |value: Option<&Term>, message: String| {
        results.push(ValidationResult {
            focus_node: focus.to_string(),
            result_path: property.path.to_string(),
            source_shape: shape.id.to_string(),
            component: constraint.component(),
            value: value.map(ToString::to_string),
            message,
        });
    };

    match constraint {
        Constraint::MinCount(min) if values.len() < *min => violation(
            None,
            format!("less than {min} values ({} found)", values.len()),
        ),
        Constraint::MaxCount(max) if values.len() > *max => violation(
            None,
            format!("more than {max} values ({} found)", values.len()),
        ),
        Constraint::Datatype(datatype) => {
            for &value in values {
                let ok = matches!(value, Term::Literal(l) if l.datatype() == datatype.as_ref());
                if !ok {
                    violation(Some(value), format!("value does not have datatype {datatype}"));
                }
            }
        }
        Constraint::NodeKind(kind) => {
            for &value in values {
                if !kind.accepts(value) {
                    violation(Some(value), format!("value is not of node kind {kind:?}"));
                }
            }
        }
        Constraint::Class(class) => {
            for &value in values {
                if !index.has_type(value, class) {
                    violation(Some(value), format!("value is not an instance of {class}"));
                }
            }
        }
        Constraint::Pattern(regex) => {
            for &value in values {
                if !lexical_form(value).is_some_and(|s| regex.is_match(s)) {
                    violation(
                        Some(value),
                        format!("value does not match pattern \"{}\"", regex.as_str()),
                    );
                }
            }
        }
        Constraint::MinLength(min) => {
            for &value in values {
                if !lexical_form(value).is_some_and(|s| s.chars().count() >= *min) {
                    violation(Some(value), format!("value is shorter than {min} characters"));
                }
            }
        }
        Constraint::MaxLength(max) => {
            for &value in values {
                if !lexical_form(value).is_some_and(|s| s.chars().count() <= *max) {
                    violation(Some(value), format!("value is longer than {max} characters"));
                }
            }
        }
        Constraint::MinCount(_) | Constraint::MaxCount(_) => {}
    }
}

/// One constraint violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub focus_node: String,
    pub result_path: String,
    pub source_shape: String,
    pub component: &'static str,
    pub value: Option<String>,
    pub message: String,
}

/// Outcome of [`ShapesGraph::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub conforms: bool,
    pub results: Vec<ValidationResult>,
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Validation Report")?;
        writeln!(f, "Conforms: {}", self.conforms)?;
        if self.results.is_empty() {
            return Ok(());
        }
        writeln!(f, "Results ({}):", self.results.len())?;
        for result in &self.results {
            writeln!(f, "Constraint Violation in {}:", result.component)?;
            writeln!(f, "\tSource Shape: {}", result.source_shape)?;
            writeln!(f, "\tFocus Node: {}", result.focus_node)?;
            if let Some(value) = &result.value {
                writeln!(f, "\tValue Node: {value}")?;
            }
            writeln!(f, "\tResult Path: {}", result.result_path)?;
            writeln!(f, "\tMessage: {}", result.message)?;
        }
        Ok(())
    }
}
