//! Box-drawn tables.

use console::measure_text_width;

/// A table whose columns grow to fit their widest cell.
///
/// Widths are measured without ANSI escapes, so styled cells line up.
#[derive(Debug)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    column_widths: Vec<usize>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        let headers: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
        let column_widths = headers.iter().map(|h| measure_text_width(h)).collect();

        Self {
            headers,
            rows: Vec::new(),
            column_widths,
        }
    }

    /// Add a row; missing cells render empty and extra cells are dropped.
    pub fn add_row<S: Into<String>>(&mut self, row: Vec<S>) {
        let mut row: Vec<String> = row.into_iter().map(Into::into).collect();
        row.truncate(self.headers.len());

        for (width, cell) in self.column_widths.iter_mut().zip(&row) {
            *width = (*width).max(measure_text_width(cell));
        }

        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(self.rows.len() + 4);
        lines.push(self.render_border('┌', '┬', '┐'));
        lines.push(self.render_row(&self.headers));
        lines.push(self.render_border('├', '┼', '┤'));
        for row in &self.rows {
            lines.push(self.render_row(row));
        }
        lines.push(self.render_border('└', '┴', '┘'));
        lines.join("\n")
    }

    fn render_border(&self, left: char, mid: char, right: char) -> String {
        let segments: Vec<String> = self
            .column_widths
            .iter()
            .map(|w| "─".repeat(w + 2))
            .collect();
        format!("{}{}{}", left, segments.join(&mid.to_string()), right)
    }

    fn render_row(&self, row: &[String]) -> String {
        let mut s = String::from("│");
        for (i, width) in self.column_widths.iter().enumerate() {
            let cell = row.get(i).map(String::as_str).unwrap_or("");
            let pad = width.saturating_sub(measure_text_width(cell));
            s.push(' ');
            s.push_str(cell);
            s.push_str(&" ".repeat(pad));
            s.push_str(" │");
        }
        s
    }
}
