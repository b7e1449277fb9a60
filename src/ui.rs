use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Style, Stylize},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState},
};

use crate::model::{Model, UIData};

pub const COLUMN_WIDTH_MARGIN: usize = 2;
const STATUSLINE_HEIGHT: u16 = 1;
const SEARCHLINE_HEIGHT: u16 = 1;
const STATUS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct RecsUI {
    table_state: TableState,
}

impl RecsUI {
    pub fn new() -> Self {
        Self {
            table_state: TableState::default(),
        }
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let area = frame.area();

        let title = Line::from(format!(" {} ", uidata.title).bold());
        let instructions = Line::from(vec![
            " Search ".into(),
            "</>".blue().bold(),
            " Help ".into(),
            "<?>".blue().bold(),
            " Quit ".into(),
            "<q> ".blue().bold(),
        ]);
        let block = Block::bordered()
            .title(title.centered())
            .title_bottom(instructions.centered())
            .border_set(border::THICK);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let searchline_height = if uidata.active_search || !uidata.query.is_empty() {
            SEARCHLINE_HEIGHT
        } else {
            0
        };
        let [search_area, table_area, status_area] = Layout::vertical([
            Constraint::Length(searchline_height),
            Constraint::Min(0),
            Constraint::Length(STATUSLINE_HEIGHT),
        ])
        .areas(inner);

        self.draw_searchline(uidata, frame, search_area);
        self.draw_table(uidata, frame, table_area);
        self.draw_statusline(uidata, frame, status_area);

        if uidata.show_popup {
            let popup_area = centered_rect(area, 50, 80);
            let popup = Paragraph::new(uidata.popup_message.as_str())
                .block(Block::bordered().title(" Help "));
            frame.render_widget(Clear, popup_area);
            frame.render_widget(popup, popup_area);
        }
    }

    fn draw_searchline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if area.height == 0 {
            return;
        }
        if uidata.active_search {
            let line = Line::from(vec![
                "Search: ".bold(),
                Span::raw(uidata.cmdinput.input.as_str()),
            ]);
            frame.render_widget(Paragraph::new(line), area);
            // "Search: " is 8 cells wide
            frame.set_cursor_position((area.x + 8 + uidata.cmdinput.curser_pos as u16, area.y));
        } else {
            let line = Line::from(vec![
                "Filter: ".bold(),
                Span::raw(uidata.query.as_str()),
            ]);
            frame.render_widget(Paragraph::new(line).dim(), area);
        }
    }

    fn draw_table(&mut self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if let Some(message) = &uidata.empty_message {
            let placeholder = Paragraph::new(message.as_str()).dim().centered();
            frame.render_widget(placeholder, area);
            return;
        }

        let header = Row::new(
            uidata
                .headers
                .iter()
                .map(|header| Cell::from(header.as_str())),
        )
        .style(Style::new().bold());
        let rows = uidata
            .rows
            .iter()
            .map(|row| Row::new(row.iter().map(|cell| Cell::from(cell.as_str()))));
        let widths = uidata
            .widths
            .iter()
            .map(|&width| Constraint::Length(width as u16));

        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(1)
            .row_highlight_style(Style::new().reversed());

        self.table_state.select(Some(uidata.selected_row));
        frame.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn draw_statusline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let [left_area, right_area] =
            Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)])
                .areas(area);

        let mut left = uidata.summary.clone();
        if !uidata.page_info.is_empty() {
            left = format!("{left} | {}", uidata.page_info);
        }
        frame.render_widget(Paragraph::new(left).dim(), left_area);

        if !uidata.status_message.is_empty()
            && uidata.last_status_message_update.elapsed() < STATUS_MESSAGE_TIMEOUT
        {
            frame.render_widget(
                Paragraph::new(uidata.status_message.as_str())
                    .right_aligned()
                    .yellow(),
                right_area,
            );
        }
    }
}

fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [_, mid, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Percentage(percent_y),
        Constraint::Fill(1),
    ])
    .areas(area);
    let [_, rect, _] = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Percentage(percent_x),
        Constraint::Fill(1),
    ])
    .areas(mid);
    rect
}
