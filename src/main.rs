#![warn(clippy::unwrap_used)]

use clap::Parser as _;
use serde::Serialize as _;
use std::io::Write as _;
use std::path::PathBuf;

use formdoc::assembler::DocumentAssembler;
use formdoc::entry::Entry;
use formdoc::error::ContextError;
use formdoc::registry::ResolverRegistry;
use formdoc::results::{ResultsData, StaticResultsProvider, UnavailableResultsProvider};
use formdoc::schema::Form;

/// The command line arguments are the paths of the form schema and of the entry,
/// plus optionally pre-computed statistics results and an output path.
#[derive(clap::Parser)]
struct CliArguments {
    /// The path of the JSON form schema.
    #[arg(short = 'f', long = "form", value_name = "form_file")]
    form_path: PathBuf,
    /// The path of the JSON entry.
    #[arg(short = 'e', long = "entry", value_name = "entry_file")]
    entry_path: PathBuf,
    /// The path of a JSON file with pre-computed global results keyed by scope
    /// (`survey`, `quiz`, `poll`); without it the aggregate sections are omitted.
    #[arg(short = 'r', long = "results", value_name = "results_file")]
    results_path: Option<PathBuf>,
    /// The path of the output JSON document, standard output when absent.
    #[arg(short = 'o', long = "output", value_name = "output_file")]
    output_path: Option<PathBuf>,
}

fn main() -> Result<(), ContextError> {
    env_logger::init();
    let cli_arguments = CliArguments::parse();

    let form = Form::from_path(&cli_arguments.form_path)?;
    let entry = Entry::from_path(&cli_arguments.entry_path)?;

    let registry = ResolverRegistry::new();
    let document = match &cli_arguments.results_path {
        Some(results_path) => {
            let results_content = std::fs::read_to_string(results_path).map_err(|error| {
                ContextError::with_error(
                    format!("Unable to read the results {:?}", results_path),
                    &error,
                )
            })?;
            let by_scope: std::collections::HashMap<String, ResultsData> =
                serde_json::from_str(&results_content).map_err(|error| {
                    ContextError::with_error(
                        format!("Unable to parse the results {:?}", results_path),
                        &error,
                    )
                })?;
            let mut provider = StaticResultsProvider::new();
            for (scope, results) in by_scope {
                provider.insert(scope, results);
            }
            DocumentAssembler::new(&registry, &provider).build(&form, &entry)?
        }
        None => {
            let provider = UnavailableResultsProvider;
            DocumentAssembler::new(&registry, &provider).build(&form, &entry)?
        }
    };

    // Serialize the document with four-space indentation so template authors can
    // inspect the section layout directly.
    let mut content_buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut content_buffer, formatter);
    document.serialize(&mut serializer).map_err(|error| {
        ContextError::with_error("Unable to serialize the document", &error)
    })?;
    content_buffer.push(b'\n');

    match &cli_arguments.output_path {
        Some(output_path) => {
            std::fs::write(output_path, &content_buffer).map_err(|error| {
                ContextError::with_error(
                    format!("Unable to write the document {:?}", output_path),
                    &error,
                )
            })?;
        }
        None => {
            std::io::stdout()
                .write_all(&content_buffer)
                .map_err(|error| {
                    ContextError::with_error("Unable to write the document", &error)
                })?;
        }
    }

    Ok(())
}
