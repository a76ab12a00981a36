use crate::data::format::format_cell;
use crate::data::result_set::{CellValue, ResultSet};
use anyhow::Result;
use std::cmp::Ordering;
use tracing::debug;

/// Tri-state sort direction cycled by repeated selection of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Ascending,
    Descending,
    #[default]
    None,
}

impl SortDirection {
    /// Next direction in the asc -> desc -> none cycle
    pub fn next(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::None,
            SortDirection::None => SortDirection::Ascending,
        }
    }

    pub fn indicator(self) -> &'static str {
        match self {
            SortDirection::Ascending => "^",
            SortDirection::Descending => "v",
            SortDirection::None => "",
        }
    }
}

/// Presentation state for one result: search, sort, page.
/// Derived per result, never persisted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewState {
    pub search_term: String,
    pub sort_column: Option<String>,
    pub sort_direction: SortDirection,
    pub page: usize,
}

impl ViewState {
    /// Change the search term; any change resets to the first page
    pub fn set_search(&mut self, term: impl Into<String>) {
        let term = term.into();
        if term != self.search_term {
            self.search_term = term;
            self.page = 0;
        }
    }

    /// Selecting the same column cycles the direction, a new column
    /// always starts ascending
    pub fn toggle_sort(&mut self, column: &str) {
        if self.sort_column.as_deref() == Some(column) {
            self.sort_direction = self.sort_direction.next();
        } else {
            self.sort_column = Some(column.to_string());
            self.sort_direction = SortDirection::Ascending;
        }
    }
}

/// One display-ready page plus the pagination metadata around it
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub rows: Vec<Vec<String>>,
    pub page: usize,
    pub total_pages: usize,
    pub total_filtered: usize,
}

impl RenderedPage {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Indices of rows retained by the search term, in source order.
/// An empty term retains everything; nulls never match a non-empty term.
pub fn filter_indices(result: &ResultSet, term: &str) -> Vec<usize> {
    if term.is_empty() {
        return (0..result.row_count()).collect();
    }
    let needle = term.to_lowercase();
    (0..result.row_count())
        .filter(|&row_idx| {
            result.rows[row_idx]
                .iter()
                .any(|value| !value.is_null() && value.to_string().to_lowercase().contains(&needle))
        })
        .collect()
}

/// Sort an index vector by one column. Nulls order after everything
/// regardless of direction; equal keys keep their relative order.
pub fn sort_indices(
    result: &ResultSet,
    indices: &mut [usize],
    column: &str,
    direction: SortDirection,
) {
    if direction == SortDirection::None {
        return;
    }
    let Some(col_idx) = result.column_index(column) else {
        debug!("Sort column '{}' not in result, leaving order", column);
        return;
    };
    let descending = direction == SortDirection::Descending;

    indices.sort_by(|&a, &b| {
        let val_a = &result.rows[a][col_idx];
        let val_b = &result.rows[b][col_idx];

        match (val_a.is_null(), val_b.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let cmp = compare_values(val_a, val_b);
                if descending {
                    cmp.reverse()
                } else {
                    cmp
                }
            }
        }
    });
}

/// Numeric pairs compare numerically, everything else falls back to a
/// case-insensitive comparison of the string forms
fn compare_values(a: &CellValue, b: &CellValue) -> Ordering {
    match (a, b) {
        (CellValue::Number(x), CellValue::Number(y)) => {
            x.partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        _ => {
            let sa = a.to_string();
            let sb = b.to_string();
            sa.to_lowercase()
                .cmp(&sb.to_lowercase())
                .then_with(|| sa.cmp(&sb))
        }
    }
}

/// Total pages for a filtered row count, exposed raw (0 when empty)
pub fn total_pages(filtered: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    filtered.div_ceil(page_size)
}

/// Slice bounds for one page; out-of-range pages clamp to an empty slice
pub fn page_bounds(filtered: usize, page: usize, page_size: usize) -> (usize, usize) {
    let start = page.saturating_mul(page_size).min(filtered);
    let end = start.saturating_add(page_size).min(filtered);
    (start, end)
}

/// Full pipeline as one pure function: filter, sort, paginate, format
pub fn render_page(result: &ResultSet, state: &ViewState, page_size: usize) -> RenderedPage {
    let mut indices = filter_indices(result, &state.search_term);
    if let Some(column) = &state.sort_column {
        sort_indices(result, &mut indices, column, state.sort_direction);
    }
    let total_filtered = indices.len();
    let (start, end) = page_bounds(total_filtered, state.page, page_size);

    let rows = indices[start..end]
        .iter()
        .map(|&row_idx| {
            result
                .columns
                .iter()
                .enumerate()
                .map(|(col_idx, col)| {
                    format_cell(&result.rows[row_idx][col_idx], col.semantic_type)
                })
                .collect()
        })
        .collect();

    RenderedPage {
        rows,
        page: state.page,
        total_pages: total_pages(total_filtered, page_size),
        total_filtered,
    }
}

#[derive(Debug, Clone)]
struct CachedIndices {
    search_term: String,
    sort_column: Option<String>,
    sort_direction: SortDirection,
    indices: Vec<usize>,
}

/// Stateful wrapper over one result: owns the ViewState and memoizes the
/// filtered/sorted index vector so page moves never recompute the pipeline.
/// The cache is invalidated whenever search or sort inputs change.
#[derive(Debug, Clone)]
pub struct ResultView {
    result: ResultSet,
    state: ViewState,
    page_size: usize,
    cached: Option<CachedIndices>,
}

impl ResultView {
    pub fn new(result: ResultSet, page_size: usize) -> Self {
        Self {
            result,
            state: ViewState::default(),
            page_size,
            cached: None,
        }
    }

    pub fn result(&self) -> &ResultSet {
        &self.result
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.state.set_search(term);
    }

    /// Cycle the sort on a column; unknown columns are rejected with no
    /// state change
    pub fn toggle_sort(&mut self, column: &str) -> Result<()> {
        if self.result.column_index(column).is_none() {
            anyhow::bail!("Unknown column: {}", column);
        }
        self.state.toggle_sort(column);
        Ok(())
    }

    pub fn set_page(&mut self, page: usize) {
        self.state.page = page;
    }

    pub fn next_page(&mut self) {
        let visible = self.visible_indices().len();
        let last = total_pages(visible, self.page_size).saturating_sub(1);
        if self.state.page < last {
            self.state.page += 1;
        }
    }

    pub fn prev_page(&mut self) {
        self.state.page = self.state.page.saturating_sub(1);
    }

    /// Filtered and sorted row indices, pre-pagination; recomputed only
    /// when the search or sort inputs changed since the last call
    pub fn visible_indices(&mut self) -> &[usize] {
        let stale = match &self.cached {
            Some(c) => {
                c.search_term != self.state.search_term
                    || c.sort_column != self.state.sort_column
                    || c.sort_direction != self.state.sort_direction
            }
            None => true,
        };
        if stale {
            debug!(
                search = %self.state.search_term,
                sort = ?self.state.sort_column,
                "Recomputing visible rows"
            );
            let mut indices = filter_indices(&self.result, &self.state.search_term);
            if let Some(column) = &self.state.sort_column {
                sort_indices(&self.result, &mut indices, column, self.state.sort_direction);
            }
            self.cached = Some(CachedIndices {
                search_term: self.state.search_term.clone(),
                sort_column: self.state.sort_column.clone(),
                sort_direction: self.state.sort_direction,
                indices,
            });
        }
        self.cached
            .as_ref()
            .map(|c| c.indices.as_slice())
            .unwrap_or(&[])
    }

    /// Rows retained by the current filter and sort, for the exporter
    pub fn visible_rows(&mut self) -> Vec<&[CellValue]> {
        let indices = self.visible_indices().to_vec();
        indices
            .into_iter()
            .map(|i| self.result.rows[i].as_slice())
            .collect()
    }

    /// Current page, display-formatted
    pub fn page(&mut self) -> RenderedPage {
        let page = self.state.page;
        let page_size = self.page_size;
        let indices = self.visible_indices();
        let total_filtered = indices.len();
        let (start, end) = page_bounds(total_filtered, page, page_size);
        let slice: Vec<usize> = indices[start..end].to_vec();

        let rows = slice
            .iter()
            .map(|&row_idx| {
                self.result
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(col_idx, col)| {
                        format_cell(&self.result.rows[row_idx][col_idx], col.semantic_type)
                    })
                    .collect()
            })
            .collect();

        RenderedPage {
            rows,
            page,
            total_pages: total_pages(total_filtered, page_size),
            total_filtered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::result_set::Column;

    fn sample() -> ResultSet {
        ResultSet::new(
            vec![Column::dimension("region"), Column::measure("revenue")],
            vec![
                vec![CellValue::Text("West".into()), CellValue::Number(100.0)],
                vec![CellValue::Text("East".into()), CellValue::Number(200.0)],
                vec![CellValue::Text("North".into()), CellValue::Null],
            ],
        )
    }

    #[test]
    fn test_sort_cycle_on_same_column() {
        let mut state = ViewState::default();
        state.toggle_sort("revenue");
        assert_eq!(state.sort_direction, SortDirection::Ascending);
        state.toggle_sort("revenue");
        assert_eq!(state.sort_direction, SortDirection::Descending);
        state.toggle_sort("revenue");
        assert_eq!(state.sort_direction, SortDirection::None);
        state.toggle_sort("revenue");
        assert_eq!(state.sort_direction, SortDirection::Ascending);
    }

    #[test]
    fn test_new_column_starts_ascending() {
        let mut state = ViewState::default();
        state.toggle_sort("revenue");
        state.toggle_sort("revenue");
        assert_eq!(state.sort_direction, SortDirection::Descending);
        state.toggle_sort("region");
        assert_eq!(state.sort_column.as_deref(), Some("region"));
        assert_eq!(state.sort_direction, SortDirection::Ascending);
    }

    #[test]
    fn test_search_change_resets_page() {
        let mut state = ViewState {
            page: 3,
            ..Default::default()
        };
        state.set_search("west");
        assert_eq!(state.page, 0);
        state.page = 2;
        state.set_search("west");
        assert_eq!(state.page, 2, "unchanged term keeps the page");
    }

    #[test]
    fn test_unknown_sort_column_rejected_without_mutation() {
        let mut view = ResultView::new(sample(), 25);
        assert!(view.toggle_sort("nope").is_err());
        assert_eq!(view.state().sort_column, None);
    }

    #[test]
    fn test_memoized_indices_reused_across_page_moves() {
        let mut view = ResultView::new(sample(), 1);
        view.set_search("e");
        let first = view.visible_indices().to_vec();
        view.next_page();
        let second = view.visible_indices().to_vec();
        assert_eq!(first, second);
    }
}
