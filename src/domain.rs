use std::io::Error;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

/// Messages the controller produces from terminal events. The model decides
/// what each one means in its current modus.
#[derive(Debug)]
pub enum Message {
    Quit,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    MoveUp,
    MoveDown,
    Enter,
    Exit,
    Search,
    CopyCell,
    CopyRow,
    Reload,
    Help,
    RawKey(KeyEvent),
}

/// Runtime configuration, fixed once the model is initialized.
#[derive(Debug, Clone, Setters)]
pub struct RecsConfig {
    pub page_size: usize,
    pub searchable: bool,
    pub max_column_width: usize,
    pub event_poll_time: u64,
}

impl Default for RecsConfig {
    fn default() -> Self {
        RecsConfig {
            page_size: 10,
            searchable: true,
            max_column_width: 42,
            event_poll_time: 100,
        }
    }
}

#[derive(Debug)]
pub enum RecsError {
    IoError(Error),
    PolarsError(PolarsError),
    JsonError(serde_json::Error),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
}

impl From<Error> for RecsError {
    fn from(err: Error) -> Self {
        RecsError::IoError(err)
    }
}

impl From<PolarsError> for RecsError {
    fn from(err: PolarsError) -> Self {
        RecsError::PolarsError(err)
    }
}

impl From<serde_json::Error> for RecsError {
    fn from(err: serde_json::Error) -> Self {
        RecsError::JsonError(err)
    }
}

pub const HELP_TEXT: &str = "
 recs - record collection browser

 Table
   j / Down       move cursor down
   k / Up         move cursor up
   l / Right      next page
   h / Left       previous page
   g              first page
   G              last page
   /              search (live filter)
   Esc            clear the active filter
   Enter          open record view
   r              reload the collection from disk
   Y              copy row as csv
   ?              this help
   q              quit

 Search input
   Esc            cancel and clear filter
   Enter          keep filter

 Record view
   j / k          move between fields
   h / l          previous / next record
   y              copy field value
   Esc            back to table
";
