use std::path::PathBuf;
use std::time::Instant;

use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use tracing::{error, trace};

use crate::browser::{Browser, Column};
use crate::domain::{HELP_TEXT, Message, RecsConfig, RecsError};
use crate::inputter::{InputResult, Inputter};
use crate::source::{self, Collection};
use crate::ui::COLUMN_WIDTH_MARGIN;

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    RECORD,
    POPUP,
    SEARCH,
}

/// State of the single-record detail view.
struct RecordView {
    match_pos: usize, // Position within the filtered sequence
    curser_row: usize,
}

impl RecordView {
    fn empty() -> Self {
        RecordView {
            match_pos: 0,
            curser_row: 0,
        }
    }
}

/// Everything the UI needs for one frame. The model rebuilds this on every
/// state change; the UI never reaches back into model internals.
pub struct UIData {
    pub title: String,
    pub headers: Vec<String>,
    pub widths: Vec<usize>,
    pub rows: Vec<Vec<String>>,
    pub selected_row: usize,
    pub empty_message: Option<String>,
    pub summary: String,
    pub page_info: String,
    pub active_search: bool,
    pub cmdinput: InputResult,
    pub query: String,
    pub show_popup: bool,
    pub popup_message: String,
    pub status_message: String,
    pub last_status_message_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            title: String::new(),
            headers: Vec::new(),
            widths: Vec::new(),
            rows: Vec::new(),
            selected_row: 0,
            empty_message: None,
            summary: String::new(),
            page_info: String::new(),
            active_search: false,
            cmdinput: InputResult::default(),
            query: String::new(),
            show_popup: false,
            popup_message: String::new(),
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        }
    }
}

pub struct Model {
    config: RecsConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    browser: Browser,
    collection_name: String,
    source_path: Option<PathBuf>,
    curser_row: usize, // Selected row within the current page
    record_view: RecordView,
    clipboard: Option<Clipboard>,
    input: Inputter,
    last_input: InputResult,
    uidata: UIData,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(
        config: &RecsConfig,
        collection: Collection,
        columns: Vec<Column>,
        source_path: Option<PathBuf>,
    ) -> Self {
        let record_count = collection.records.len();
        let mut model = Model {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            browser: Browser::new(collection.records, columns, config),
            collection_name: collection.name,
            source_path,
            curser_row: 0,
            record_view: RecordView::empty(),
            clipboard: Clipboard::new().ok(),
            input: Inputter::default(),
            last_input: InputResult::default(),
            uidata: UIData::empty(),
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        };
        model.set_status_message(format!("Loaded {} records", record_count));
        model.update_table_data();
        model
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    /// Keystrokes go to the search input unedited while it is focused.
    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::SEARCH
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Message) -> Result<(), RecsError> {
        trace!("Update: Modus {:?}, Message {:?}", self.modus, message);
        match self.modus {
            Modus::TABLE => match message {
                Message::Quit => self.quit(),
                Message::MoveDown => self.move_table_selection_down(),
                Message::MoveUp => self.move_table_selection_up(),
                Message::NextPage => self.change_page(|b| b.next_page()),
                Message::PrevPage => self.change_page(|b| b.prev_page()),
                Message::FirstPage => self.change_page(|b| b.first_page()),
                Message::LastPage => self.change_page(|b| b.last_page()),
                Message::Search => self.enter_search(),
                Message::Enter => self.enter_record_view(),
                Message::Exit => self.clear_filter(),
                Message::Help => self.show_help(),
                Message::CopyRow => self.copy_table_row(),
                Message::Reload => self.reload(),
                _ => (),
            },
            Modus::RECORD => match message {
                Message::Quit => self.quit(),
                Message::MoveDown => self.move_record_selection(1),
                Message::MoveUp => self.move_record_selection(-1),
                Message::NextPage => self.next_record(),
                Message::PrevPage => self.previous_record(),
                Message::CopyCell => self.copy_record_cell(),
                Message::Help => self.show_help(),
                Message::Enter | Message::Exit => self.exit(),
                _ => (),
            },
            Modus::POPUP => match message {
                Message::Quit => self.quit(),
                Message::Enter | Message::Exit | Message::Help => self.exit(),
                _ => (),
            },
            Modus::SEARCH => {
                if let Message::RawKey(key) = message {
                    self.raw_input(key);
                }
            }
        }
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    fn exit(&mut self) {
        match self.modus {
            Modus::RECORD => {
                self.previous_modus = Modus::RECORD;
                self.modus = Modus::TABLE;
                self.update_table_data();
            }
            Modus::POPUP => {
                self.modus = self.previous_modus;
                self.previous_modus = Modus::POPUP;
                match self.modus {
                    Modus::RECORD => self.update_record_data(),
                    _ => self.update_table_data(),
                }
            }
            Modus::TABLE | Modus::SEARCH => {}
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.uidata.popup_message = HELP_TEXT.to_string();
        self.uidata.show_popup = true;
    }

    fn enter_search(&mut self) {
        if !self.browser.searchable() {
            self.set_status_message("Search is disabled for this collection");
            return;
        }
        self.previous_modus = self.modus;
        self.modus = Modus::SEARCH;
        // Seed the editor with the active query so it can be refined
        self.input.set(self.browser.query());
        self.last_input = self.input.get();
        self.update_table_data();
    }

    fn leave_search(&mut self) {
        self.modus = self.previous_modus;
        self.previous_modus = Modus::SEARCH;
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.canceled {
            self.browser.set_query("");
            self.leave_search();
            self.set_status_message("Filter cleared");
        } else {
            // Live filter: every edit re-derives the view right away
            self.browser.set_query(&self.last_input.input);
            if self.last_input.finished {
                self.leave_search();
                self.set_status_message(format!(
                    "Found {} matching records",
                    self.browser.match_count()
                ));
            }
        }
        self.update_table_data();
    }

    /// Re-read the collection from disk and swap it into the browser. The
    /// active query survives; the page clamps if the collection shrank.
    fn reload(&mut self) {
        let Some(path) = self.source_path.clone() else {
            return;
        };
        match source::load_collection(&path) {
            Ok(collection) => {
                self.browser.replace_records(collection.records);
                self.set_status_message(format!(
                    "Reloaded {} records",
                    self.browser.record_count()
                ));
            }
            Err(e) => {
                error!("Reloading {} failed: {:?}", path.display(), e);
                self.set_status_message("Reloading the collection failed");
            }
        }
        self.update_table_data();
    }

    fn clear_filter(&mut self) {
        if !self.browser.query().is_empty() {
            self.browser.set_query("");
            self.set_status_message("Filter cleared");
            self.update_table_data();
        }
    }

    fn change_page(&mut self, turn: impl Fn(&mut Browser)) {
        turn(&mut self.browser);
        self.update_table_data();
    }

    fn move_table_selection_down(&mut self) {
        let page_len = self.browser.page_rows().len();
        if page_len > 0 && self.curser_row < page_len - 1 {
            self.curser_row += 1;
            self.update_table_data();
        }
    }

    fn move_table_selection_up(&mut self) {
        if self.curser_row > 0 {
            self.curser_row -= 1;
            self.update_table_data();
        }
    }

    fn enter_record_view(&mut self) {
        if self.browser.page_rows().is_empty() {
            return;
        }
        let match_pos = (self.browser.current_page() - 1) * self.browser.page_size() + self.curser_row;
        self.record_view = RecordView {
            match_pos,
            curser_row: 0,
        };
        self.previous_modus = self.modus;
        self.modus = Modus::RECORD;
        self.update_record_data();
    }

    fn move_record_selection(&mut self, step: i32) {
        let nfields = self.browser.columns().len();
        if nfields == 0 {
            return;
        }
        let curser = self.record_view.curser_row as i32 + step;
        self.record_view.curser_row = curser.clamp(0, nfields as i32 - 1) as usize;
        self.update_record_data();
    }

    fn next_record(&mut self) {
        if self.record_view.match_pos + 1 < self.browser.match_count() {
            self.record_view.match_pos += 1;
            self.update_record_data();
        }
    }

    fn previous_record(&mut self) {
        if self.record_view.match_pos > 0 {
            self.record_view.match_pos -= 1;
            self.update_record_data();
        }
    }

    fn copy_table_row(&mut self) {
        let Some(&ridx) = self.browser.page_rows().get(self.curser_row) else {
            return;
        };
        let Some(record) = self.browser.record(ridx) else {
            return;
        };
        let content = self
            .browser
            .columns()
            .iter()
            .map(|column| Model::wrap_cell_content(&column.cell_text(record)))
            .collect::<Vec<String>>()
            .join(",");
        self.copy_to_clipboard(content, "row");
    }

    fn copy_record_cell(&mut self) {
        let Some(ridx) = self.browser.match_row(self.record_view.match_pos) else {
            return;
        };
        let Some(record) = self.browser.record(ridx) else {
            return;
        };
        let Some(column) = self.browser.columns().get(self.record_view.curser_row) else {
            return;
        };
        let content = column.cell_text(record);
        self.copy_to_clipboard(content, "field");
    }

    fn copy_to_clipboard(&mut self, content: String, what: &str) {
        match self.clipboard.as_mut() {
            Some(clipboard) => match clipboard.set_text(content) {
                Ok(_) => self.set_status_message(format!("Copied {what} to clipboard")),
                Err(e) => {
                    error!("Error copying to clipboard: {:?}", e);
                    self.set_status_message("Copying to clipboard failed");
                }
            },
            None => self.set_status_message("Clipboard is not available"),
        }
    }

    // Quote a cell the way a csv writer would
    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.contains('"');
        let needs_wrapping = needs_escaping || c.contains([' ', '\t', ',']);
        let mut out = String::from(c);
        if needs_escaping {
            out = out.replace('"', "\"\"");
        }
        if needs_wrapping {
            out = format!("\"{out}\"");
        }
        out
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
        self.uidata.status_message = self.status_message.clone();
        self.uidata.last_status_message_update = self.last_status_message_update;
    }

    // ----------------------- View derivation ------------------------------ //

    fn column_width(&self, header: &str, cells: impl Iterator<Item = usize>) -> usize {
        let width = std::cmp::max(header.len(), cells.max().unwrap_or(0)) + COLUMN_WIDTH_MARGIN;
        std::cmp::min(width, self.config.max_column_width)
    }

    /// Re-derive the paged grid for the UI. Runs after every mutation that
    /// can change the visible slice; the cursor is pulled back into the
    /// page in the same step.
    fn update_table_data(&mut self) {
        let page_rows = self.browser.page_rows().to_vec();
        self.curser_row = std::cmp::min(self.curser_row, page_rows.len().saturating_sub(1));

        let rows: Vec<Vec<String>> = page_rows
            .iter()
            .filter_map(|&ridx| match self.browser.record(ridx) {
                Some(record) => Some(
                    self.browser
                        .columns()
                        .iter()
                        .map(|column| column.cell_text(record))
                        .collect(),
                ),
                None => {
                    error!("Trying to access record with unknown idx {ridx}!");
                    None
                }
            })
            .collect();

        let headers: Vec<String> = self
            .browser
            .columns()
            .iter()
            .map(|column| column.header().to_string())
            .collect();

        let widths: Vec<usize> = headers
            .iter()
            .enumerate()
            .map(|(cidx, header)| {
                self.column_width(header, rows.iter().map(|row| row[cidx].len()))
            })
            .collect();

        let empty_message = if rows.is_empty() {
            if self.browser.record_count() == 0 {
                Some("Collection is empty".to_string())
            } else {
                Some("No matching records".to_string())
            }
        } else {
            None
        };

        let title = if self.browser.query().is_empty() {
            self.collection_name.clone()
        } else {
            format!("F[{}]", self.collection_name)
        };

        let page_info = if self.browser.total_pages() > 0 {
            format!(
                "Page {} of {}",
                self.browser.current_page(),
                self.browser.total_pages()
            )
        } else {
            String::new()
        };

        self.uidata = UIData {
            title,
            headers,
            widths,
            rows,
            selected_row: self.curser_row,
            empty_message,
            summary: self.browser.summary(),
            page_info,
            active_search: self.modus == Modus::SEARCH,
            cmdinput: self.last_input.clone(),
            query: self.browser.query().to_string(),
            show_popup: false,
            popup_message: String::new(),
            status_message: self.status_message.clone(),
            last_status_message_update: self.last_status_message_update,
        };
    }

    /// Re-derive the field/value listing of the record detail view.
    fn update_record_data(&mut self) {
        let record = self
            .browser
            .match_row(self.record_view.match_pos)
            .and_then(|ridx| self.browser.record(ridx));
        let Some(record) = record else {
            // The filtered sequence changed under the view; fall back
            self.modus = Modus::TABLE;
            self.update_table_data();
            return;
        };

        let rows: Vec<Vec<String>> = self
            .browser
            .columns()
            .iter()
            .map(|column| vec![column.header().to_string(), column.cell_text(record)])
            .collect();

        let widths = vec![
            self.column_width("Field", rows.iter().map(|row| row[0].len())),
            self.column_width("Value", rows.iter().map(|row| row[1].len())),
        ];

        self.uidata = UIData {
            title: format!("R[{}]", self.collection_name),
            headers: vec!["Field".to_string(), "Value".to_string()],
            widths,
            rows,
            selected_row: self.record_view.curser_row,
            empty_message: None,
            summary: format!(
                "Record {} of {}",
                self.record_view.match_pos + 1,
                self.browser.match_count()
            ),
            page_info: String::new(),
            active_search: false,
            cmdinput: self.last_input.clone(),
            query: self.browser.query().to_string(),
            show_popup: false,
            popup_message: String::new(),
            status_message: self.status_message.clone(),
            last_status_message_update: self.last_status_message_update,
        };
    }
}
