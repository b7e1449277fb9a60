use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod browser;
mod controller;
mod domain;
mod inputter;
mod model;
mod record;
mod source;
mod ui;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use browser::Column;
use controller::Controller;
use domain::{RecsConfig, RecsError};
use model::{Model, Status};
use ui::RecsUI;

/// A tui based record collection browser.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Record collection to browse (.json or .csv)
    file: String,

    /// Records shown per page
    #[arg(long, default_value_t = 10)]
    page_size: usize,

    /// Fields to show as columns: key[:Header],... (default: all fields)
    #[arg(long)]
    columns: Option<String>,

    /// Disable the search filter
    #[arg(long)]
    no_search: bool,

    /// Widest a column may grow
    #[arg(long, default_value_t = 42)]
    max_column_width: usize,

    /// Append a debug log to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    match run() {
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run() -> Result<(), RecsError> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    let path = shellexpand::full(&cli.file).map_err(|e| RecsError::LoadingFailed(e.to_string()))?;
    let path = PathBuf::from(path.as_ref());
    let collection = source::load_collection(&path)?;

    let columns = build_columns(&collection.fields, cli.columns.as_deref());
    info!(
        "Browsing \"{}\" with {} columns",
        collection.name,
        columns.len()
    );

    let cfg = RecsConfig::default()
        .page_size(cli.page_size)
        .searchable(!cli.no_search)
        .max_column_width(cli.max_column_width);

    let mut model = Model::init(&cfg, collection, columns, Some(path));
    let mut ui = RecsUI::new();
    let controller = Controller::new(&cfg);

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &mut model, &mut ui, &controller);
    ratatui::restore();
    result
}

fn event_loop(
    terminal: &mut ratatui::DefaultTerminal,
    model: &mut Model,
    ui: &mut RecsUI,
    controller: &Controller,
) -> Result<(), RecsError> {
    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(model, f))?;

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(model)? {
            model.update(message)?;
        }
    }
    Ok(())
}

fn init_logging(log_file: Option<&Path>) -> Result<(), RecsError> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Column set for the browser: the --columns selection if given, otherwise
/// every field of the collection in source order.
fn build_columns(fields: &[String], selection: Option<&str>) -> Vec<Column> {
    match selection {
        Some(selection) => selection
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| match s.split_once(':') {
                Some((key, header)) => Column::new(key.trim(), header.trim()),
                None => Column::new(s.trim(), header_for(s.trim())),
            })
            .collect(),
        None => fields
            .iter()
            .map(|field| Column::new(field, header_for(field)))
            .collect(),
    }
}

// "patient_name" => "Patient name"
fn header_for(key: &str) -> String {
    let text = key.replace('_', " ");
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_for_humanizes_keys() {
        assert_eq!(header_for("name"), "Name");
        assert_eq!(header_for("patient_name"), "Patient name");
        assert_eq!(header_for(""), "");
    }

    #[test]
    fn test_build_columns_from_selection() {
        let fields = vec!["id".to_string(), "name".to_string()];
        let columns = build_columns(&fields, Some("name:Nombre,status"));
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].key(), "name");
        assert_eq!(columns[0].header(), "Nombre");
        assert_eq!(columns[1].key(), "status");
        assert_eq!(columns[1].header(), "Status");
    }

    #[test]
    fn test_build_columns_defaults_to_all_fields() {
        let fields = vec!["id".to_string(), "patient_name".to_string()];
        let columns = build_columns(&fields, None);
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[1].key(), "patient_name");
        assert_eq!(columns[1].header(), "Patient name");
    }
}
