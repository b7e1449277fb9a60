use rayon::prelude::*;
use tracing::trace;

use crate::domain::RecsConfig;
use crate::record::{Record, Value};

// Placeholder for fields a record does not carry. Kept as a static so cell
// rendering can hand out a reference without allocating per cell.
static NULL: Value = Value::Null;

pub type RenderFn = Box<dyn Fn(&Value, &Record) -> String>;

/// Display configuration for one column: which field to read, what to call
/// it, and optionally how to format the cell. Columns are static; the
/// browser never derives them from the records.
pub struct Column {
    key: String,
    header: String,
    render: Option<RenderFn>,
}

impl Column {
    pub fn new(key: impl Into<String>, header: impl Into<String>) -> Self {
        Column {
            key: key.into(),
            header: header.into(),
            render: None,
        }
    }

    pub fn with_render(mut self, render: impl Fn(&Value, &Record) -> String + 'static) -> Self {
        self.render = Some(Box::new(render));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    /// The rendering contract: a declared render function wins and its
    /// result is used verbatim; otherwise the raw value passes through the
    /// display coercion. A missing field reads as null, never an error.
    pub fn cell_text(&self, record: &Record) -> String {
        let value = record.get(&self.key).unwrap_or(&NULL);
        match &self.render {
            Some(render) => render(value, record),
            None => value.to_string(),
        }
    }
}

/// Return the indices of all records matching the query, in input order.
///
/// A record matches when at least one field's display string contains the
/// query as a case-insensitive substring. The empty query matches every
/// record. Pure function; never reorders or deduplicates.
pub fn filter_rows(records: &[Record], query: &str) -> Vec<usize> {
    if query.is_empty() {
        return (0..records.len()).collect();
    }
    let needle = query.to_lowercase();
    // rayon keeps the input order when collecting, so the filter is stable
    records
        .par_iter()
        .enumerate()
        .filter(|(_, record)| record.matches(&needle))
        .map(|(idx, _)| idx)
        .collect()
}

/// Slices a filtered sequence into fixed-size pages. Holds only the 1-based
/// current page; everything else derives from the row count handed in.
#[derive(Debug, Clone)]
pub struct Pager {
    page_size: usize,
    current: usize,
}

impl Pager {
    pub fn new(page_size: usize) -> Self {
        Pager {
            page_size: page_size.max(1),
            current: 1,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn current_page(&self) -> usize {
        self.current
    }

    pub fn total_pages(&self, nrows: usize) -> usize {
        nrows.div_ceil(self.page_size)
    }

    pub fn reset(&mut self) {
        self.current = 1;
    }

    /// Pull the current page back into range after the row count shrank.
    /// Zero rows keep the page at 1; the empty state is a display concern.
    pub fn clamp(&mut self, nrows: usize) {
        let limit = self.total_pages(nrows).max(1);
        self.current = self.current.clamp(1, limit);
    }

    pub fn next(&mut self, nrows: usize) {
        if self.current < self.total_pages(nrows) {
            self.current += 1;
        }
    }

    pub fn prev(&mut self) {
        if self.current > 1 {
            self.current -= 1;
        }
    }

    pub fn first(&mut self) {
        self.current = 1;
    }

    pub fn last(&mut self, nrows: usize) {
        self.current = self.total_pages(nrows).max(1);
    }

    /// Half-open index range of the visible slice, clipped at the end.
    pub fn bounds(&self, nrows: usize) -> (usize, usize) {
        let begin = std::cmp::min((self.current - 1) * self.page_size, nrows);
        let end = std::cmp::min(begin + self.page_size, nrows);
        (begin, end)
    }

    /// 1-based inclusive range of the visible slice plus the filtered
    /// count. Recomputed on every call, never cached.
    pub fn summary(&self, nrows: usize) -> String {
        if nrows == 0 {
            return "No results".to_string();
        }
        let (begin, end) = self.bounds(nrows);
        format!("Showing {}-{} of {} results", begin + 1, end, nrows)
    }
}

/// The tabular data browser: records + columns in, a searched and paged
/// view out. Owns nothing but the query and the page index; the filtered
/// row mapping is re-derived synchronously on every mutation.
pub struct Browser {
    records: Vec<Record>,
    columns: Vec<Column>,
    query: String,
    searchable: bool,
    pager: Pager,
    rows: Vec<usize>, // Mapping of filtered position to record index
}

impl Browser {
    pub fn new(records: Vec<Record>, columns: Vec<Column>, config: &RecsConfig) -> Self {
        let rows = (0..records.len()).collect();
        Browser {
            records,
            columns,
            query: String::new(),
            searchable: config.searchable,
            pager: Pager::new(config.page_size),
            rows,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn searchable(&self) -> bool {
        self.searchable
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn match_count(&self) -> usize {
        self.rows.len()
    }

    pub fn record(&self, row: usize) -> Option<&Record> {
        self.records.get(row)
    }

    /// Record index behind the given position in the filtered sequence.
    pub fn match_row(&self, pos: usize) -> Option<usize> {
        self.rows.get(pos).copied()
    }

    /// Record indices of the current page slice.
    pub fn page_rows(&self) -> &[usize] {
        let (begin, end) = self.pager.bounds(self.rows.len());
        &self.rows[begin..end]
    }

    pub fn current_page(&self) -> usize {
        self.pager.current_page()
    }

    pub fn page_size(&self) -> usize {
        self.pager.page_size()
    }

    pub fn total_pages(&self) -> usize {
        self.pager.total_pages(self.rows.len())
    }

    pub fn summary(&self) -> String {
        self.pager.summary(self.rows.len())
    }

    /// Replace the query and re-derive the view. A changed filter
    /// invalidates the previous page framing, so the page resets to 1.
    /// With searching disabled the query is forced empty.
    pub fn set_query(&mut self, query: &str) {
        let query = if self.searchable { query } else { "" };
        if query == self.query {
            return;
        }
        self.query = query.to_string();
        self.rows = filter_rows(&self.records, &self.query);
        self.pager.reset();
        trace!(
            "Filter \"{}\" keeps {} of {} records",
            self.query,
            self.rows.len(),
            self.records.len()
        );
    }

    /// Swap in a new collection. The query survives; the page clamps in the
    /// same step so no stale out-of-range page is ever visible.
    pub fn replace_records(&mut self, records: Vec<Record>) {
        self.records = records;
        self.rows = filter_rows(&self.records, &self.query);
        self.pager.clamp(self.rows.len());
    }

    pub fn next_page(&mut self) {
        self.pager.next(self.rows.len());
    }

    pub fn prev_page(&mut self) {
        self.pager.prev();
    }

    pub fn first_page(&mut self) {
        self.pager.first();
    }

    pub fn last_page(&mut self) {
        self.pager.last(self.rows.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: usize, name: &str, status: &str) -> Record {
        let mut r = Record::new();
        r.set("id", Value::Num(id as f64));
        r.set("name", Value::Str(name.to_string()));
        r.set("status", Value::Str(status.to_string()));
        r
    }

    fn collection(n: usize) -> Vec<Record> {
        (1..=n)
            .map(|i| record(i, &format!("patient {i}"), "scheduled"))
            .collect()
    }

    fn browser(records: Vec<Record>) -> Browser {
        let columns = vec![
            Column::new("id", "Id"),
            Column::new("name", "Name"),
            Column::new("status", "Status"),
        ];
        Browser::new(records, columns, &RecsConfig::default())
    }

    #[test]
    fn test_empty_query_is_identity() {
        let records = collection(7);
        assert_eq!(filter_rows(&records, ""), (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn test_filter_preserves_order() {
        let records = vec![
            record(1, "ana", "scheduled"),
            record(2, "bob", "completed"),
            record(3, "anatol", "scheduled"),
        ];
        assert_eq!(filter_rows(&records, "ana"), vec![0, 2]);
    }

    #[test]
    fn test_filter_is_case_insensitive_on_both_sides() {
        let records = vec![record(1, "Ana TORRES", "scheduled")];
        assert_eq!(filter_rows(&records, "toRRes"), vec![0]);
    }

    #[test]
    fn test_filter_matches_any_field() {
        let records = vec![record(1, "ana", "completed"), record(2, "bob", "scheduled")];
        // "2" matches record 2 on id, "completed" matches record 1 on status
        assert_eq!(filter_rows(&records, "completed"), vec![0]);
        assert_eq!(filter_rows(&records, "2"), vec![1]);
    }

    #[test]
    fn test_duplicate_records_pass_independently() {
        let records = vec![record(1, "ana", "x"), record(1, "ana", "x")];
        assert_eq!(filter_rows(&records, "ana"), vec![0, 1]);
        assert_eq!(filter_rows(&records, "zz"), Vec::<usize>::new());
    }

    #[test]
    fn test_total_pages_is_ceil() {
        let pager = Pager::new(10);
        assert_eq!(pager.total_pages(0), 0);
        assert_eq!(pager.total_pages(1), 1);
        assert_eq!(pager.total_pages(10), 1);
        assert_eq!(pager.total_pages(11), 2);
        assert_eq!(pager.total_pages(25), 3);
    }

    #[test]
    fn test_pager_saturates_at_both_ends() {
        let mut pager = Pager::new(10);
        pager.prev();
        assert_eq!(pager.current_page(), 1);
        pager.next(25);
        pager.next(25);
        assert_eq!(pager.current_page(), 3);
        pager.next(25);
        assert_eq!(pager.current_page(), 3);
    }

    #[test]
    fn test_page_slices_of_25_records() {
        let mut b = browser(collection(25));
        assert_eq!(b.total_pages(), 3);
        assert_eq!(b.page_rows(), (0..10).collect::<Vec<_>>());
        b.next_page();
        assert_eq!(b.page_rows(), (10..20).collect::<Vec<_>>());
        b.next_page();
        assert_eq!(b.page_rows(), (20..25).collect::<Vec<_>>());
        b.next_page();
        assert_eq!(b.current_page(), 3);
    }

    #[test]
    fn test_query_change_resets_page() {
        let mut b = browser(collection(25));
        b.next_page();
        b.next_page();
        assert_eq!(b.current_page(), 3);
        b.set_query("patient");
        assert_eq!(b.current_page(), 1);
    }

    #[test]
    fn test_stricter_filter_clamps_to_single_page() {
        let mut b = browser(collection(25));
        b.next_page();
        b.next_page();
        b.set_query("patient 2");
        // matches "patient 2" and "patient 20".."patient 25"
        assert_eq!(b.match_count(), 7);
        assert_eq!(b.total_pages(), 1);
        assert_eq!(b.current_page(), 1);
    }

    #[test]
    fn test_filtered_view_keeps_record_identity() {
        let mut b = browser(collection(25));
        b.set_query("patient 25");
        assert_eq!(b.page_rows(), vec![24]);
        let row = b.page_rows()[0];
        assert_eq!(
            b.record(row).unwrap().get("name"),
            Some(&Value::Str("patient 25".into()))
        );
    }

    #[test]
    fn test_empty_collection_is_not_an_error() {
        let b = browser(Vec::new());
        assert_eq!(b.total_pages(), 0);
        assert_eq!(b.current_page(), 1);
        assert!(b.page_rows().is_empty());
        assert_eq!(b.summary(), "No results");
    }

    #[test]
    fn test_summary_reports_inclusive_range() {
        let mut b = browser(collection(37));
        b.next_page();
        assert_eq!(b.summary(), "Showing 11-20 of 37 results");
        b.last_page();
        assert_eq!(b.summary(), "Showing 31-37 of 37 results");
    }

    #[test]
    fn test_render_function_wins_over_raw_value() {
        let column = Column::new("status", "Estado").with_render(|value, _| {
            match value.to_string().as_str() {
                "scheduled" => "Programada".to_string(),
                other => other.to_string(),
            }
        });
        let r = record(1, "ana", "scheduled");
        assert_eq!(column.cell_text(&r), "Programada");
    }

    #[test]
    fn test_render_function_sees_the_whole_record() {
        let column = Column::new("id", "Id")
            .with_render(|value, record| format!("{}:{}", value, record.get("name").unwrap()));
        let r = record(9, "ana", "scheduled");
        assert_eq!(column.cell_text(&r), "9:ana");
    }

    #[test]
    fn test_missing_field_renders_empty() {
        let column = Column::new("email", "Email");
        let r = record(1, "ana", "scheduled");
        assert_eq!(column.cell_text(&r), "");
    }

    #[test]
    fn test_missing_field_reaches_renderer_as_null() {
        let column = Column::new("email", "Email")
            .with_render(|value, _| if value.is_null() { "-".into() } else { value.to_string() });
        let r = record(1, "ana", "scheduled");
        assert_eq!(column.cell_text(&r), "-");
    }

    #[test]
    fn test_unsearchable_browser_forces_empty_query() {
        let config = RecsConfig::default().searchable(false);
        let mut b = Browser::new(collection(25), vec![Column::new("id", "Id")], &config);
        b.set_query("patient 2");
        assert_eq!(b.query(), "");
        assert_eq!(b.match_count(), 25);
    }

    #[test]
    fn test_replace_records_keeps_query_and_clamps_page() {
        let mut b = browser(collection(50));
        b.set_query("patient");
        b.last_page();
        assert_eq!(b.current_page(), 5);
        b.replace_records(collection(12));
        assert_eq!(b.query(), "patient");
        assert_eq!(b.match_count(), 12);
        assert_eq!(b.current_page(), 2);
    }

    #[test]
    fn test_query_is_not_trimmed() {
        let records = vec![record(1, "ana maria", "x"), record(2, "ana", "x")];
        assert_eq!(filter_rows(&records, "ana "), vec![0]);
    }

    #[test]
    fn test_page_size_floor_is_one() {
        let pager = Pager::new(0);
        assert_eq!(pager.page_size(), 1);
    }
}
