//! coopcycle-ld CLI: scrape CoopCycle, convert to RDF, query a triple store.

use std::io::Write;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use coopcycle_ld::config::Config;
use coopcycle_ld::docstore::FsDocumentStore;
use coopcycle_ld::fetch::HttpFetcher;
use coopcycle_ld::preferences::{self, UserPreferences};
use coopcycle_ld::rdf::{UploadOutcome, convert_tree, upload_file};
use coopcycle_ld::scrape::Scraper;
use coopcycle_ld::sparql::{DEFAULT_MAX_DISTANCE, QueryCatalog};
use coopcycle_ld::triplestore::open_store;

#[derive(Parser)]
#[command(
    name = "coopcycle-ld",
    version,
    about = "Scrape CoopCycle into JSON-LD, convert it to RDF and query it with SPARQL"
)]
struct Cli {
    /// Configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding scraped documents.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Triple store root URL, e.g. http://localhost:3030.
    #[arg(long, global = true)]
    store_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape one phase into JSON-LD documents.
    Jsonld {
        #[command(subcommand)]
        phase: JsonldPhase,
    },

    /// Convert a tree of JSON-LD documents to Turtle.
    #[command(name = "convert_jsonld")]
    ConvertJsonld {
        /// Root of the JSON-LD tree; defaults to `<data_dir>/jsonld`.
        #[arg(long = "input_folder")]
        input_folder: Option<PathBuf>,
    },

    /// Raw triple store operations.
    Rdf {
        #[command(subcommand)]
        action: RdfAction,
    },

    /// Run a named query.
    Sparql {
        #[command(subcommand)]
        query: SparqlQuery,
    },

    /// Collect and publish user preferences.
    #[command(name = "set_preferences")]
    SetPreferences,
}

#[derive(Subcommand)]
enum JsonldPhase {
    /// Fetch the catalog and write one Service document per cooperative.
    Service,
    /// Write the JSON-LD embedded in every restaurant page.
    Restaurant,
    /// Write the menu of every restaurant page.
    Offer,
}

#[derive(Subcommand)]
enum RdfAction {
    /// Run a SPARQL query and print the bindings.
    Query {
        #[arg(long)]
        query: String,
    },
    /// Upload a Turtle file to a graph.
    Upload {
        #[arg(long)]
        file: PathBuf,
        #[arg(long = "graph_uri")]
        graph_uri: String,
        /// SHACL shapes the data must conform to before upload.
        #[arg(long)]
        shacl: Option<PathBuf>,
    },
    /// Run a SPARQL update.
    Update {
        #[arg(long = "update_query")]
        update_query: String,
    },
    /// Drop a graph.
    Delete {
        #[arg(long = "graph_uri")]
        graph_uri: String,
    },
}

#[derive(Subcommand)]
enum SparqlQuery {
    /// All restaurants.
    Restaurant,
    /// Restaurants whose name contains a string.
    #[command(name = "restaurant_name")]
    RestaurantName {
        #[arg(long)]
        name: String,
    },
    /// Restaurants open on a day between two times (HH:MM).
    #[command(name = "open_by_day_time")]
    OpenByDayTime {
        #[arg(long)]
        day: String,
        #[arg(long = "open_time")]
        open_time: String,
        #[arg(long = "close_time")]
        close_time: String,
    },
    /// Restaurants inside a bounding box.
    #[command(name = "in_area")]
    InArea {
        #[arg(long = "central_lat", allow_hyphen_values = true)]
        central_lat: f64,
        #[arg(long = "central_long", allow_hyphen_values = true)]
        central_long: f64,
        #[arg(long = "lat_range")]
        lat_range: f64,
        #[arg(long = "long_range")]
        long_range: f64,
    },
    /// Menu items at or below a price.
    #[command(name = "price_range")]
    PriceRange {
        #[arg(long = "max_price")]
        max_price: f64,
    },
    /// CoopCycle delivery services.
    #[command(name = "delivery_services")]
    DeliveryServices,
    /// Restaurants matching a user's location or budget.
    #[command(name = "combined_prefs")]
    CombinedPrefs {
        /// IRI of the person published by `set_preferences`.
        #[arg(long = "user_prefs_uri")]
        user_prefs_uri: String,
        #[arg(long = "max_distance", default_value_t = DEFAULT_MAX_DISTANCE)]
        max_distance: f64,
    },
}

/// Print one JSON object per line.
fn print_records<T: Serialize>(records: &[T]) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for record in records {
        let line = serde_json::to_string(record).into_diagnostic()?;
        writeln!(out, "{line}").into_diagnostic()?;
    }
    Ok(())
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::InvalidSubcommand
            | ErrorKind::MissingSubcommand
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().into_diagnostic()?;
                return Ok(());
            }
            _ => err.exit(),
        },
    };

    let Some(command) = cli.command else {
        Cli::command().print_help().into_diagnostic()?;
        return Ok(());
    };

    let mut config = Config::resolve(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.scrape.data_dir = dir;
    }
    if let Some(url) = cli.store_url {
        config.store.base_url = url;
    }
    config.validate()?;

    match command {
        Commands::Jsonld { phase } => {
            let fetcher = HttpFetcher::new(&config.scrape.user_agent);
            let documents = FsDocumentStore::new(&config.scrape.data_dir);
            let scraper = Scraper::new(&fetcher, &documents, &config.scrape)?;
            let (name, summary) = match phase {
                JsonldPhase::Service => ("service", scraper.scrape_services()?),
                JsonldPhase::Restaurant => ("restaurant", scraper.scrape_restaurants()?),
                JsonldPhase::Offer => ("offer", scraper.scrape_offers()?),
            };
            println!("{name} phase: {summary}");
        }

        Commands::ConvertJsonld { input_folder } => {
            let input = input_folder.unwrap_or_else(|| config.scrape.data_dir.join("jsonld"));
            let report = convert_tree(&input)?;
            for (file, err) in &report.failed {
                eprintln!("{}: {err}", file.display());
            }
            println!(
                "Converted {} files into {} ({} failed)",
                report.converted.len(),
                report.output_root.display(),
                report.failed.len()
            );
            if report.all_failed() {
                miette::bail!("no file under {} could be converted", input.display());
            }
        }

        Commands::Rdf { action } => {
            let store = open_store(&config.store)?;
            match action {
                RdfAction::Query { query } => {
                    let results = store.query(&query)?;
                    match results.boolean {
                        Some(answer) => println!("{answer}"),
                        None => print_records(&results.rows)?,
                    }
                }
                RdfAction::Upload {
                    file,
                    graph_uri,
                    shacl,
                } => match upload_file(store.as_ref(), &file, Some(&graph_uri), shacl.as_deref())? {
                    UploadOutcome::Rejected(report) => println!("{report}"),
                    UploadOutcome::Uploaded { validated, .. } => {
                        if validated {
                            println!("RDF data conforms to SHACL shapes.");
                        }
                        println!("Data uploaded successfully to {graph_uri}");
                    }
                },
                RdfAction::Update { update_query } => {
                    store.update(&update_query)?;
                    println!("Data updated successfully.");
                }
                RdfAction::Delete { graph_uri } => {
                    store.delete(Some(&graph_uri))?;
                    println!("Graph {graph_uri} deleted successfully.");
                }
            }
        }

        Commands::Sparql { query } => {
            let store = open_store(&config.store)?;
            let catalog = QueryCatalog::new(store.as_ref());
            match query {
                SparqlQuery::Restaurant => print_records(&catalog.restaurants()?)?,
                SparqlQuery::RestaurantName { name } => {
                    print_records(&catalog.restaurants_by_name(&name)?)?
                }
                SparqlQuery::OpenByDayTime {
                    day,
                    open_time,
                    close_time,
                } => print_records(&catalog.open_by_day_time(&day, &open_time, &close_time)?)?,
                SparqlQuery::InArea {
                    central_lat,
                    central_long,
                    lat_range,
                    long_range,
                } => print_records(&catalog.in_area(
                    central_lat,
                    central_long,
                    lat_range,
                    long_range,
                )?)?,
                SparqlQuery::PriceRange { max_price } => {
                    print_records(&catalog.price_range(max_price)?)?
                }
                SparqlQuery::DeliveryServices => print_records(&catalog.delivery_services()?)?,
                SparqlQuery::CombinedPrefs {
                    user_prefs_uri,
                    max_distance,
                } => print_records(&catalog.combined_prefs(&user_prefs_uri, max_distance)?)?,
            }
        }

        Commands::SetPreferences => {
            let store = open_store(&config.store)?;
            let answers = {
                let stdin = std::io::stdin();
                let mut input = stdin.lock();
                let mut prompts = std::io::stdout();
                UserPreferences::prompt(&mut input, &mut prompts)?
            };
            let published = preferences::publish(&answers, &config.preferences, store.as_ref())?;
            println!("{}", published.turtle);
            println!(
                "Graph successfully published to {} (person <{}>, saved to {})",
                published.graph.as_deref().unwrap_or("the default graph"),
                published.person,
                published.path.display()
            );
        }
    }

    Ok(())
}
