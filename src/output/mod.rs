use colored::Colorize;
use itertools::Itertools;
use serde::Serialize;

use crate::filter::SearchField;
use crate::pagination::{PageItem, PageWindow};
use crate::view::ListViewModel;

const MAX_CELL_WIDTH: usize = 40;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" | "table" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputRow {
    pub id: String,
    pub cells: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ListReport {
    pub screen: String,
    pub title: String,
    pub search_field: String,
    pub search_term: String,
    pub total_items: usize,
    pub filtered_items: usize,
    pub window: PageWindow,
    pub columns: Vec<String>,
    pub rows: Vec<OutputRow>,
}

pub fn build_report(vm: &ListViewModel) -> ListReport {
    let screen = vm.screen();
    let ctx = vm.display_context();
    let rows = vm
        .visible_rows()
        .iter()
        .map(|entity| OutputRow {
            id: entity.id().unwrap_or_default(),
            cells: screen
                .columns
                .iter()
                .map(|c| ctx.cell_text(entity, &c.field))
                .collect(),
        })
        .collect();
    ListReport {
        screen: screen.name.clone(),
        title: screen.title.clone(),
        search_field: match &vm.search().field {
            SearchField::All => "all".to_string(),
            SearchField::Field(name) => name.clone(),
        },
        search_term: vm.search().term.clone(),
        total_items: vm.items().len(),
        filtered_items: vm.filtered_count(),
        window: vm.window().clone(),
        columns: screen.columns.iter().map(|c| c.title.clone()).collect(),
        rows,
    }
}

/// `« 1 … 4 [5] 6 … 10 »`; empty when there is nothing to page through.
pub fn render_page_bar(window: &PageWindow) -> String {
    if window.total_pages == 0 {
        return String::new();
    }
    let items = window
        .page_numbers
        .iter()
        .map(|item| match item {
            PageItem::Page(n) if *n == window.current_page => format!("[{n}]"),
            PageItem::Page(n) => n.to_string(),
            PageItem::Ellipsis => "…".to_string(),
        })
        .join(" ");
    format!("« {items} »")
}

fn clip(value: &str) -> String {
    let flat = value.replace(['\n', '\r', '\t'], " ");
    if flat.chars().count() <= MAX_CELL_WIDTH {
        return flat;
    }
    let mut out: String = flat.chars().take(MAX_CELL_WIDTH - 1).collect();
    out.push('…');
    out
}

fn pad(value: &str, width: usize) -> String {
    let len = value.chars().count();
    format!("{value}{}", " ".repeat(width.saturating_sub(len)))
}

pub fn render_text(report: &ListReport) -> String {
    let mut out = String::new();
    let mut summary = format!(
        ":: {} :: {} of {} records",
        report.title, report.filtered_items, report.total_items
    );
    if !report.search_term.trim().is_empty() {
        summary.push_str(&format!(
            " matching '{}' in {}",
            report.search_term.trim(),
            report.search_field
        ));
    }
    out.push_str(&summary.bold().white().to_string());
    out.push('\n');

    if report.rows.is_empty() {
        out.push_str(&"no records".dimmed().to_string());
        out.push('\n');
        return out;
    }

    let mut headers = vec!["ID".to_string()];
    headers.extend(report.columns.iter().cloned());
    let table: Vec<Vec<String>> = report
        .rows
        .iter()
        .map(|r| {
            std::iter::once(clip(&r.id))
                .chain(r.cells.iter().map(|c| clip(c)))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            table
                .iter()
                .filter_map(|row| row.get(i))
                .map(|c| c.chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header_line = headers
        .iter()
        .zip(widths.iter())
        .map(|(h, w)| pad(h, *w))
        .join("  ");
    out.push_str(&header_line.bold().to_string());
    out.push('\n');
    for row in table.iter() {
        let line = row
            .iter()
            .zip(widths.iter())
            .map(|(c, w)| {
                if c == crate::display::NO_DATA {
                    pad(c, *w).dimmed().to_string()
                } else {
                    pad(c, *w)
                }
            })
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    }

    let bar = render_page_bar(&report.window);
    if !bar.is_empty() {
        out.push('\n');
        out.push_str(&bar.blue().to_string());
        out.push('\n');
    }
    out
}

pub fn render_json(report: &ListReport) -> Vec<u8> {
    serde_json::to_vec_pretty(report).unwrap_or_else(|_| b"{}\n".to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::compute_window;

    fn report() -> ListReport {
        ListReport {
            screen: "lots".to_string(),
            title: "Lots".to_string(),
            search_field: "all".to_string(),
            search_term: String::new(),
            total_items: 2,
            filtered_items: 2,
            window: compute_window(2, 10, 1),
            columns: vec!["Name".to_string(), "Warehouse".to_string()],
            rows: vec![
                OutputRow {
                    id: "1".to_string(),
                    cells: vec!["L-01".to_string(), "North".to_string()],
                },
                OutputRow {
                    id: "2".to_string(),
                    cells: vec!["L-02".to_string(), "no data".to_string()],
                },
            ],
        }
    }

    #[test]
    fn page_bar_marks_current_and_ellipsis() {
        assert_eq!(render_page_bar(&compute_window(50, 5, 5)), "« 1 … 4 [5] 6 … 10 »");
        assert_eq!(render_page_bar(&compute_window(0, 5, 1)), "");
    }

    #[test]
    fn text_table_has_header_rows_and_bar() {
        colored::control::set_override(false);
        let text = render_text(&report());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], ":: Lots :: 2 of 2 records");
        assert!(lines[1].starts_with("ID  Name  Warehouse"));
        assert_eq!(lines[2], "1   L-01  North");
        assert_eq!(lines[3], "2   L-02  no data");
        assert_eq!(lines[5], "« [1] »");
    }

    #[test]
    fn json_carries_window_and_rows() {
        let value: serde_json::Value = serde_json::from_slice(&render_json(&report())).unwrap();
        assert_eq!(value["window"]["total_pages"], 1);
        assert_eq!(value["rows"][1]["cells"][1], "no data");
    }

    #[test]
    fn long_cells_are_clipped() {
        let long = "x".repeat(100);
        assert_eq!(clip(&long).chars().count(), MAX_CELL_WIDTH);
        assert_eq!(clip("a\nb"), "a b");
    }

    #[test]
    fn format_parsing() {
        assert_eq!(OutputFormat::parse("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("table"), Some(OutputFormat::Text));
        assert_eq!(OutputFormat::parse("xml"), None);
        assert_eq!(infer_format_from_path("out.json"), Some(OutputFormat::Json));
        assert_eq!(infer_format_from_path("out.csv"), None);
    }
}
