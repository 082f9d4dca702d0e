//! Bound query parameters.
//!
//! A query is a fixed template plus a `VALUES` row. Parameter values are
//! rendered as RDF terms by oxigraph, so free text can never leave its
//! literal.

use oxigraph::model::vocab::xsd;
use oxigraph::model::{Literal, NamedNode};

use crate::error::QueryError;

/// A typed parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Text(String),
    Decimal(f64),
    Iri(String),
}

impl Param {
    /// Render as a SPARQL term, validating numbers and IRIs.
    pub fn render(&self, name: &str) -> Result<String, QueryError> {
        match self {
            Param::Text(text) => Ok(Literal::new_simple_literal(text.as_str()).to_string()),
            Param::Decimal(value) if value.is_finite() => {
                Ok(Literal::new_typed_literal(value.to_string(), xsd::DECIMAL).to_string())
            }
            Param::Decimal(value) => Err(QueryError::Param {
                name: name.to_string(),
                message: format!("{value} is not a finite number"),
            }),
            Param::Iri(iri) => NamedNode::new(iri.as_str())
                .map(|node| node.to_string())
                .map_err(|e| QueryError::Param {
                    name: name.to_string(),
                    message: format!("<{iri}> is not a valid IRI: {e}"),
                }),
        }
    }
}

/// Fixed parts of a SELECT query; the `VALUES` row goes first in `WHERE`.
#[derive(Debug, Clone, Copy)]
pub struct QueryTemplate {
    pub name: &'static str,
    /// `PREFIX` declarations and the `SELECT` clause.
    pub head: &'static str,
    /// Patterns of the `WHERE` group.
    pub body: &'static str,
    /// `GROUP BY` / `ORDER BY` / `LIMIT`, possibly empty.
    pub modifiers: &'static str,
}

/// A template together with its variable bindings.
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    template: QueryTemplate,
    bindings: Vec<(&'static str, Param)>,
}

impl PreparedQuery {
    pub fn new(template: QueryTemplate) -> Self {
        Self {
            template,
            bindings: Vec::new(),
        }
    }

    /// Bind `?variable` to `value`.
    pub fn bind(mut self, variable: &'static str, value: Param) -> Self {
        self.bindings.push((variable, value));
        self
    }

    pub fn name(&self) -> &'static str {
        self.template.name
    }

    /// Full query text.
    pub fn render(&self) -> Result<String, QueryError> {
        let mut query = String::with_capacity(
            self.template.head.len() + self.template.body.len() + self.template.modifiers.len() + 64,
        );
        query.push_str(self.template.head.trim_end());
        query.push_str("\nWHERE {\n");
        if !self.bindings.is_empty() {
            let vars: Vec<String> = self.bindings.iter().map(|(v, _)| format!("?{v}")).collect();
            let terms = self
                .bindings
                .iter()
                .map(|(v, p)| p.render(v))
                .collect::<Result<Vec<_>, _>>()?;
            query.push_str(&format!(
                "  VALUES ({}) {{ ({}) }}\n",
                vars.join(" "),
                terms.join(" ")
            ));
        }
        query.push_str(self.template.body.trim_end());
        query.push_str("\n}\n");
        query.push_str(self.template.modifiers.trim());
        Ok(query)
    }
}
