//! # cmif CLI
//!
//! The `cmif` binary runs the CMIF pipeline from the command line: parse a
//! TEI-XML file or URL, query the correspSearch API, probe result counts,
//! and enrich results with coordinates. Results are printed as JSON on
//! stdout; progress goes to stderr.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cmif parse <source>` | Parse a CMIF file, URL, or inline XML |
//! | `cmif search` | Run a paginated correspSearch API query |
//! | `cmif count` | Probe how many results a query would return |
//! | `cmif enrich <data>` | Merge a coordinate cache into a saved result |
//!
//! ## Examples
//!
//! ```bash
//! # Parse a local CMIF file and save the result
//! cmif parse letters.xml --output letters.json
//!
//! # Parse a remote CMIF file
//! cmif parse https://example.org/cmif.xml
//!
//! # Query correspSearch by correspondent GND URI
//! cmif count --correspondent https://d-nb.info/gnd/118540238
//! cmif search --correspondent https://d-nb.info/gnd/118540238 --output goethe.json
//!
//! # Attach coordinates from a GeoNames cache
//! cmif enrich letters.json --coords coords.json --output letters-geo.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use cmif_kit::config::Config;
use cmif_kit::corresp_search::{self, HttpTransport, SearchParams};
use cmif_kit::enrich::{enrich_with_coordinates, load_coords_cache};
use cmif_kit::models::CmifResult;
use cmif_kit::pipeline::parse_cmif;
use cmif_kit::progress::ProgressMode;

/// cmif — parse CMIF/TEI correspondence metadata into a normalized
/// letters/indices/meta model.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file; a missing file means defaults.
#[derive(Parser)]
#[command(
    name = "cmif",
    about = "Parse CMIF/TEI correspondence metadata into a normalized letters/indices/meta model",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Optional; defaults apply when
    /// the file does not exist.
    #[arg(long, global = true, default_value = "./cmif.toml")]
    config: PathBuf,

    /// Progress reporting on stderr: `off`, `human`, or `json`.
    /// Defaults to `human` when stderr is a terminal.
    #[arg(long, global = true)]
    progress: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Parse a CMIF source into the normalized model.
    ///
    /// The source may be a local file path, an absolute http(s) URL, or an
    /// inline TEI-XML string. correspSearch API URLs are delegated to the
    /// API path and return its (less rich) result shape.
    Parse {
        /// File path, URL, or inline XML.
        source: String,

        /// JSON coordinate cache ({"<geonames_id>": {"lat": .., "lon": ..}})
        /// to merge into the result.
        #[arg(long)]
        coords: Option<PathBuf>,

        /// Write the result JSON here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run a paginated correspSearch API query.
    ///
    /// Pages through results ten at a time up to the configured safety
    /// cap; use `cmif count` first to see how large a query is.
    Search {
        /// Correspondent authority URI (e.g. a GND URI).
        #[arg(long)]
        correspondent: Option<String>,

        /// Place of sending or receiving (GeoNames URI).
        #[arg(long)]
        place: Option<String>,

        /// Place of sending only (GeoNames URI).
        #[arg(long)]
        place_sender: Option<String>,

        /// Earliest letter date (YYYY-MM-DD).
        #[arg(long)]
        start_date: Option<String>,

        /// Latest letter date (YYYY-MM-DD).
        #[arg(long)]
        end_date: Option<String>,

        /// Only letters with an online digital edition.
        #[arg(long)]
        available: bool,

        /// Write the result JSON here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Probe the first result page of a correspSearch query.
    ///
    /// Prints `{count, hasMore, totalHits}` so you can warn before
    /// committing to a large fetch.
    Count {
        /// Correspondent authority URI (e.g. a GND URI).
        #[arg(long)]
        correspondent: Option<String>,

        /// Place of sending or receiving (GeoNames URI).
        #[arg(long)]
        place: Option<String>,

        /// Place of sending only (GeoNames URI).
        #[arg(long)]
        place_sender: Option<String>,

        /// Earliest letter date (YYYY-MM-DD).
        #[arg(long)]
        start_date: Option<String>,

        /// Latest letter date (YYYY-MM-DD).
        #[arg(long)]
        end_date: Option<String>,

        /// Only letters with an online digital edition.
        #[arg(long)]
        available: bool,
    },

    /// Merge a coordinate cache into a previously saved result.
    ///
    /// Reads a result file produced by `parse` or `search`, attaches
    /// coordinates to every place with a cached GeoNames id, and writes
    /// the result back out. Running it twice is a no-op.
    Enrich {
        /// A result JSON file produced by `cmif parse` or `cmif search`.
        data: PathBuf,

        /// JSON coordinate cache ({"<geonames_id>": {"lat": .., "lon": ..}}).
        #[arg(long)]
        coords: PathBuf,

        /// Write the result JSON here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?;
    let progress = progress_mode(cli.progress.as_deref())?.reporter();

    match cli.command {
        Commands::Parse {
            source,
            coords,
            output,
        } => {
            let mut result = parse_cmif(&source, &config, progress.as_ref()).await?;
            if let Some(coords_path) = coords {
                let cache = load_coords_cache(&coords_path)?;
                enrich_with_coordinates(&mut result, &cache);
            }
            write_result(&result, output.as_deref())?;
        }
        Commands::Search {
            correspondent,
            place,
            place_sender,
            start_date,
            end_date,
            available,
            output,
        } => {
            let params = SearchParams {
                correspondent,
                place,
                place_sender,
                start_date,
                end_date,
                available,
            };
            let transport = HttpTransport::new(config.http.timeout_secs)?;
            let result =
                corresp_search::search(&transport, &config.api, &params, progress.as_ref()).await?;
            write_result(&result, output.as_deref())?;
        }
        Commands::Count {
            correspondent,
            place,
            place_sender,
            start_date,
            end_date,
            available,
        } => {
            let params = SearchParams {
                correspondent,
                place,
                place_sender,
                start_date,
                end_date,
                available,
            };
            let transport = HttpTransport::new(config.http.timeout_secs)?;
            let count = corresp_search::get_result_count(&transport, &config.api, &params).await?;
            println!("{}", serde_json::to_string_pretty(&count)?);
        }
        Commands::Enrich {
            data,
            coords,
            output,
        } => {
            let content = std::fs::read_to_string(&data)
                .with_context(|| format!("failed to read {}", data.display()))?;
            let mut result: CmifResult = serde_json::from_str(&content)
                .with_context(|| format!("{} is not a cmif result file", data.display()))?;
            let cache = load_coords_cache(&coords)?;
            enrich_with_coordinates(&mut result, &cache);
            write_result(&result, output.as_deref())?;
        }
    }
    Ok(())
}

fn progress_mode(flag: Option<&str>) -> Result<ProgressMode> {
    match flag {
        None => Ok(ProgressMode::default_for_tty()),
        Some("off") => Ok(ProgressMode::Off),
        Some("human") => Ok(ProgressMode::Human),
        Some("json") => Ok(ProgressMode::Json),
        Some(other) => bail!("unknown progress mode '{}': use off, human, or json", other),
    }
}

fn write_result(result: &CmifResult, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "wrote {} letters to {}",
                result.meta.total_letters,
                path.display()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}
