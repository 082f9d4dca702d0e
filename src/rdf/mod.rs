//! RDF side of the pipeline: JSON-LD conversion and SHACL validation.
//!
//! Parsing and serialization go through `oxigraph::io`; this module holds
//! the Turtle helpers shared by the converter, the validator and the
//! preference collector, and the validated upload behind `rdf upload`.

pub mod convert;
pub mod shacl;

use std::path::Path;

use oxigraph::io::{RdfFormat, RdfParser, RdfSerializer};
use oxigraph::model::{Quad, Triple};

use crate::error::{AppResult, ConvertError};
use crate::triplestore::TripleStore;

pub use convert::{ConversionReport, convert_document, convert_tree, mirror_root};
pub use shacl::{ShapesGraph, ValidationReport};

/// schema.org namespace as used in every document and query.
pub const SCHEMA_NS: &str = "http://schema.org/";

/// Parse Turtle text into quads (all in the default graph).
pub fn parse_turtle(turtle: &str) -> Result<Vec<Quad>, ConvertError> {
    RdfParser::from_format(RdfFormat::Turtle)
        .for_reader(turtle.as_bytes())
        .map(|quad| {
            quad.map_err(|e| ConvertError::Turtle {
                message: e.to_string(),
            })
        })
        .collect()
}

/// Serialize triples as Turtle with the `schema:` prefix declared.
pub fn to_turtle<'a>(triples: impl IntoIterator<Item = &'a Triple>) -> Result<String, ConvertError> {
    let mut serializer = turtle_serializer()?;
    for triple in triples {
        serializer
            .serialize_triple(triple)
            .map_err(|e| ConvertError::Serialize {
                message: e.to_string(),
            })?;
    }
    finish_turtle(serializer.finish())
}

/// Result of [`upload_file`].
#[derive(Debug)]
pub enum UploadOutcome {
    Uploaded { triples: usize, validated: bool },
    /// The data did not conform; nothing was sent to the store.
    Rejected(ValidationReport),
}

/// Read a Turtle file and upload it to `graph`.
///
/// With `shapes`, the data is validated first and only conforming data is
/// uploaded.
pub fn upload_file(
    store: &dyn TripleStore,
    file: &Path,
    graph: Option<&str>,
    shapes: Option<&Path>,
) -> AppResult<UploadOutcome> {
    let turtle = std::fs::read_to_string(file).map_err(|source| ConvertError::Io {
        path: file.display().to_string(),
        source,
    })?;
    let quads = parse_turtle(&turtle)?;

    let validated = match shapes {
        Some(path) => {
            let report = ShapesGraph::load(path)?.validate(&quads);
            if !report.conforms {
                tracing::warn!(
                    file = %file.display(),
                    violations = report.results.len(),
                    "data does not conform to shapes, upload skipped"
                );
                return Ok(UploadOutcome::Rejected(report));
            }
            true
        }
        None => false,
    };

    store.upload(&turtle, graph)?;
    tracing::info!(
        file = %file.display(),
        graph = graph.unwrap_or("default"),
        triples = quads.len(),
        "uploaded"
    );
    Ok(UploadOutcome::Uploaded {
        triples: quads.len(),
        validated,
    })
}

pub(crate) fn turtle_serializer() -> Result<oxigraph::io::WriterQuadSerializer<Vec<u8>>, ConvertError> {
    Ok(RdfSerializer::from_format(RdfFormat::Turtle)
        .with_prefix("schema", SCHEMA_NS)
        .map_err(|e| ConvertError::Serialize {
            message: e.to_string(),
        })?
        .for_writer(Vec::new()))
}

pub(crate) fn finish_turtle(written: std::io::Result<Vec<u8>>) -> Result<String, ConvertError> {
    let bytes = written.map_err(|e| ConvertError::Serialize {
        message: e.to_string(),
    })?;
    String::from_utf8(bytes).map_err(|e| ConvertError::Serialize {
        message: e.to_string(),
    })
}
