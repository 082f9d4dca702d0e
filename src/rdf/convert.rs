//! JSON-LD to Turtle conversion over a directory tree.
//!
//! Each `*.json` file converts on its own: a file that fails is reported and
//! the walk carries on with its siblings.

use std::path::{Component, Path, PathBuf};

use oxigraph::io::{RdfFormat, RdfParser};
use serde_json::{Map, Value, json};

use crate::error::ConvertError;
use crate::rdf::{SCHEMA_NS, finish_turtle, turtle_serializer};

/// Remote context spellings replaced by an inline `@vocab`.
const SCHEMA_CONTEXTS: [&str; 4] = [
    "http://schema.org",
    "http://schema.org/",
    "https://schema.org",
    "https://schema.org/",
];

/// Outcome of a [`convert_tree`] run.
#[derive(Debug, Default)]
pub struct ConversionReport {
    pub output_root: PathBuf,
    /// `(input, output)` pairs, in walk order.
    pub converted: Vec<(PathBuf, PathBuf)>,
    pub failed: Vec<(PathBuf, ConvertError)>,
}

impl ConversionReport {
    /// True when there was input and none of it converted.
    pub fn all_failed(&self) -> bool {
        self.converted.is_empty() && !self.failed.is_empty()
    }
}

/// Convert one JSON-LD document to Turtle.
pub fn convert_document(json: &[u8]) -> Result<String, ConvertError> {
    let mut document: Value = serde_json::from_slice(json).map_err(|e| ConvertError::Json {
        message: e.to_string(),
    })?;
    inline_schema_context(&mut document);
    let normalized = serde_json::to_vec(&document).map_err(|e| ConvertError::Json {
        message: e.to_string(),
    })?;

    let format = RdfFormat::from_extension("jsonld").ok_or_else(|| ConvertError::JsonLd {
        message: "JSON-LD support is not compiled into oxigraph".into(),
    })?;

    let mut serializer = turtle_serializer()?;
    for quad in RdfParser::from_format(format).for_reader(normalized.as_slice()) {
        let quad = quad.map_err(|e| ConvertError::JsonLd {
            message: e.to_string(),
        })?;
        serializer
            .serialize_quad(&quad)
            .map_err(|e| ConvertError::Serialize {
                message: e.to_string(),
            })?;
    }
    finish_turtle(serializer.finish())
}

/// Replace every schema.org remote context with `{"@vocab": SCHEMA_NS}`.
fn inline_schema_context(value: &mut Value) {
    match value {
        Value::Object(map) => inline_in_map(map),
        Value::Array(items) => items.iter_mut().for_each(inline_schema_context),
        _ => {}
    }
}

fn inline_in_map(map: &mut Map<String, Value>) {
    for (key, value) in map.iter_mut() {
        if key == "@context" {
            inline_context_value(value);
        } else {
            inline_schema_context(value);
        }
    }
}

fn inline_context_value(context: &mut Value) {
    match context {
        Value::String(iri) if SCHEMA_CONTEXTS.contains(&iri.as_str()) => {
            *context = json!({ "@vocab": SCHEMA_NS });
        }
        Value::Array(entries) => entries.iter_mut().for_each(inline_context_value),
        _ => {}
    }
}

/// Output root for an input tree.
///
/// The rightmost `jsonld` component becomes `ttl`; without one, `X` maps to
/// the sibling `X-ttl`.
pub fn mirror_root(input: &Path) -> PathBuf {
    let components: Vec<Component<'_>> = input.components().collect();
    if let Some(pos) = components
        .iter()
        .rposition(|c| c.as_os_str() == "jsonld")
    {
        let mut out = PathBuf::new();
        for (i, component) in components.iter().enumerate() {
            if i == pos {
                out.push("ttl");
            } else {
                out.push(component.as_os_str());
            }
        }
        return out;
    }

    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "jsonld".into());
    input.with_file_name(format!("{name}-ttl"))
}

/// Convert every `*.json` file under `input` into the mirrored `ttl` tree.
pub fn convert_tree(input: &Path) -> Result<ConversionReport, ConvertError> {
    if !input.is_dir() {
        return Err(ConvertError::MissingInput {
            path: input.display().to_string(),
        });
    }

    let output_root = mirror_root(input);
    let mut files = Vec::new();
    collect_json_files(input, &mut files)?;

    let mut report = ConversionReport {
        output_root: output_root.clone(),
        ..Default::default()
    };

    for file in files {
        let relative = file.strip_prefix(input).unwrap_or(&file);
        let target = output_root.join(relative).with_extension("ttl");
        match convert_file(&file, &target) {
            Ok(()) => {
                tracing::info!(input = %file.display(), output = %target.display(), "converted");
                report.converted.push((file, target));
            }
            Err(e) => {
                tracing::warn!(input = %file.display(), error = %e, "conversion failed");
                report.failed.push((file, e));
            }
        }
    }
    Ok(report)
}

fn convert_file(input: &Path, output: &Path) -> Result<(), ConvertError> {
    let bytes = std::fs::read(input).map_err(|e| ConvertError::Io {
        path: input.display().to_string(),
        source: e,
    })?;
    let turtle = convert_document(&bytes)?;
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConvertError::Io {
            path: parent.display().to_string(),
            source: e,
        })?;
    }
    std::fs::write(output, turtle).map_err(|e| ConvertError::Io {
        path: output.display().to_string(),
        source: e,
    })
}

/// Depth-first, name-sorted walk so runs are reproducible.
fn collect_json_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), ConvertError> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| ConvertError::Io {
            path: dir.display().to_string(),
            source: e,
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    for path in entries {
        if path.is_dir() {
            collect_json_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            out.push(path);
        }
    }
    Ok(())
}
