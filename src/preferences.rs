//! Interactive collection of a user's delivery preferences.
//!
//! The answers become a small schema.org graph: a `Person` who `seeks` a
//! `Demand` with a `PriceSpecification` and a `GeoCoordinates` midpoint. The
//! graph is written to a local Turtle file and uploaded to the triple store,
//! where the `combined_prefs` query picks it up by the person's IRI.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use oxigraph::model::vocab::rdf;
use oxigraph::model::{Literal, NamedNode, Triple};

use crate::config::PreferencesConfig;
use crate::error::PreferenceError;
use crate::rdf::{SCHEMA_NS, to_turtle};
use crate::triplestore::TripleStore;

pub type PreferenceResult<T> = std::result::Result<T, PreferenceError>;

const NAME: &str = "What is your name? ";
const POSTAL_CODE: &str = "What is your postal code? ";
const LOCALITY: &str = "What is your locality? ";
const MAX_PRICE: &str = "What is the maximum price you are willing to pay (in EUR)? ";
const LONGITUDE: &str = "What is your longitude? ";
const LATITUDE: &str = "What is your latitude? ";

/// Answers to the preference questions, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPreferences {
    pub name: String,
    pub postal_code: String,
    pub locality: String,
    pub max_price: String,
    pub longitude: String,
    pub latitude: String,
}

fn ask(input: &mut impl BufRead, output: &mut impl Write, question: &str) -> PreferenceResult<String> {
    let io_err = |source| PreferenceError::Input {
        question: question.trim_end().to_string(),
        source,
    };
    output.write_all(question.as_bytes()).map_err(io_err)?;
    output.flush().map_err(io_err)?;

    let mut line = String::new();
    if input.read_line(&mut line).map_err(io_err)? == 0 {
        return Err(PreferenceError::EndOfInput {
            question: question.trim_end().to_string(),
        });
    }
    Ok(line.trim().to_string())
}

impl UserPreferences {
    /// Ask every question in order on `output`, reading answers from `input`.
    pub fn prompt(input: &mut impl BufRead, output: &mut impl Write) -> PreferenceResult<Self> {
        Ok(Self {
            name: ask(input, output, NAME)?,
            postal_code: ask(input, output, POSTAL_CODE)?,
            locality: ask(input, output, LOCALITY)?,
            max_price: ask(input, output, MAX_PRICE)?,
            longitude: ask(input, output, LONGITUDE)?,
            latitude: ask(input, output, LATITUDE)?,
        })
    }

    /// The preference graph with every node a fragment of `base_iri`.
    pub fn triples(&self, base_iri: &str) -> PreferenceResult<Vec<Triple>> {
        let node = |fragment: &str| {
            let iri = format!("{base_iri}#{fragment}");
            NamedNode::new(iri.as_str()).map_err(|e| PreferenceError::BaseIri {
                iri: base_iri.to_string(),
                message: e.to_string(),
            })
        };
        let schema = |local: &str| NamedNode::new_unchecked(format!("{SCHEMA_NS}{local}"));
        let text = |value: &str| Literal::new_simple_literal(value);

        let me = node("me")?;
        let address = node("address")?;
        let seeks = node("seeks")?;
        let price = node("price")?;
        let midpoint = node("geoMidpoint")?;
        let a = NamedNode::from(rdf::TYPE);

        Ok(vec![
            Triple::new(me.clone(), a.clone(), schema("Person")),
            Triple::new(me.clone(), schema("name"), text(&self.name)),
            Triple::new(me.clone(), schema("address"), address.clone()),
            Triple::new(me, schema("seeks"), seeks.clone()),
            Triple::new(address.clone(), a.clone(), schema("PostalAddress")),
            Triple::new(address.clone(), schema("postalCode"), text(&self.postal_code)),
            Triple::new(address, schema("addressLocality"), text(&self.locality)),
            Triple::new(seeks.clone(), a.clone(), schema("Demand")),
            Triple::new(seeks.clone(), schema("priceSpecification"), price.clone()),
            Triple::new(seeks, schema("availableAtOrFrom"), midpoint.clone()),
            Triple::new(price.clone(), a.clone(), schema("PriceSpecification")),
            Triple::new(price.clone(), schema("maxPrice"), text(&self.max_price)),
            Triple::new(price, schema("priceCurrency"), text("EUR")),
            Triple::new(midpoint.clone(), a, schema("GeoCoordinates")),
            Triple::new(midpoint.clone(), schema("latitude"), text(&self.latitude)),
            Triple::new(midpoint, schema("longitude"), text(&self.longitude)),
        ])
    }

    pub fn to_turtle(&self, base_iri: &str) -> PreferenceResult<String> {
        Ok(to_turtle(&self.triples(base_iri)?)?)
    }
}

/// What [`publish`] wrote and uploaded.
#[derive(Debug, Clone)]
pub struct PublishedPreferences {
    /// IRI of the person node, the `user_prefs_uri` of `combined_prefs`.
    pub person: String,
    pub turtle: String,
    pub path: PathBuf,
    pub graph: Option<String>,
}

/// Serialize `preferences`, save the local copy and upload it.
pub fn publish(
    preferences: &UserPreferences,
    config: &PreferencesConfig,
    store: &dyn TripleStore,
) -> PreferenceResult<PublishedPreferences> {
    let turtle = preferences.to_turtle(&config.base_iri)?;
    let path = config.output_file.clone();
    std::fs::write(&path, &turtle).map_err(|source| PreferenceError::Write {
        path: path.display().to_string(),
        source,
    })?;
    tracing::info!(path = %path.display(), "wrote user preferences");

    store.upload(&turtle, config.graph_uri.as_deref())?;
    tracing::info!(
        graph = config.graph_uri.as_deref().unwrap_or("default"),
        "published user preferences"
    );

    Ok(PublishedPreferences {
        person: format!("{}#me", config.base_iri),
        turtle,
        path,
        graph: config.graph_uri.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::parse_turtle;
    use crate::triplestore::EmbeddedTripleStore;
    use std::io::Cursor;

    const ANSWERS: &str = "Alice\n69002\nLyon\n15\n4.83\n45.76\n";

    fn alice() -> UserPreferences {
        UserPreferences::prompt(&mut Cursor::new(ANSWERS), &mut Vec::new()).unwrap()
    }

    #[test]
    fn prompts_in_order() {
        let mut output = Vec::new();
        let prefs = UserPreferences::prompt(&mut Cursor::new(ANSWERS), &mut output).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert_eq!(
            output,
            [NAME, POSTAL_CODE, LOCALITY, MAX_PRICE, LONGITUDE, LATITUDE].concat()
        );
        assert_eq!(prefs.name, "Alice");
        assert_eq!(prefs.max_price, "15");
        assert_eq!(prefs.longitude, "4.83");
        assert_eq!(prefs.latitude, "45.76");
    }

    #[test]
    fn short_input_is_end_of_input() {
        let err = UserPreferences::prompt(&mut Cursor::new("Alice\n69002\n"), &mut Vec::new())
            .unwrap_err();
        match err {
            PreferenceError::EndOfInput { question } => {
                assert_eq!(question, LOCALITY.trim_end())
            }
            other => panic!("expected EndOfInput, got {other:?}"),
        }
    }

    #[test]
    fn graph_links_person_to_price_and_midpoint() {
        let turtle = alice().to_turtle("http://localhost/preferences").unwrap();
        assert!(turtle.contains("<http://localhost/preferences#me>"));
        assert!(turtle.contains("schema:seeks"));
        assert!(turtle.contains("\"EUR\""));
        assert_eq!(parse_turtle(&turtle).unwrap().len(), 16);
    }

    #[test]
    fn relative_base_iri_is_rejected() {
        assert!(matches!(
            alice().triples("preferences"),
            Err(PreferenceError::BaseIri { .. })
        ));
    }

    #[test]
    fn publish_writes_file_and_uploads() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = PreferencesConfig {
            output_file: dir.path().join("user_preferences.ttl"),
            ..PreferencesConfig::default()
        };
        let store = EmbeddedTripleStore::in_memory().unwrap();

        let published = publish(&alice(), &config, &store).unwrap();
        assert_eq!(published.person, "http://localhost/preferences#me");
        assert_eq!(
            std::fs::read_to_string(&published.path).unwrap(),
            published.turtle
        );

        let ask = store
            .query("ASK { <http://localhost/preferences#me> <http://schema.org/name> \"Alice\" }")
            .unwrap();
        assert_eq!(ask.boolean, Some(true));
    }
}
