use chrono::NaiveDateTime;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::types::{AdmissionSummary, AlignResult};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn print_summary(result: &AlignResult) {
    if result.dry_run {
        println!("Output: {} (dry run, nothing written)", result.output_dir.display());
    } else {
        println!("Output: {}", result.output_dir.display());
    }
    for admission in &result.admissions {
        println!();
        println!("Admission: {}", admission.id);
        println!(
            "Window: {} to {} ({} grid points)",
            format_time(admission.admit_time),
            format_time(admission.discharge_time),
            admission.grid_points
        );
        println!("{}", admission_table(admission));
        if !admission.messages.is_empty() {
            println!("Messages:");
            for message in &admission.messages {
                println!("- {message}");
            }
        }
    }
    if !result.errors.is_empty() {
        eprintln!("Errors:");
        for error in &result.errors {
            eprintln!("- {error}");
        }
    }
}

/// Per-source table of one admission with a TOTAL row.
pub fn admission_table(admission: &AdmissionSummary) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source"),
        header_cell("Kind"),
        header_cell("Rows"),
        header_cell("Columns"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);

    let mut total_rows = 0usize;
    let mut total_columns = 0usize;
    for source in &admission.sources {
        total_rows += source.rows.unwrap_or(0);
        total_columns += source.columns.unwrap_or(0);
        table.add_row(vec![
            Cell::new(&source.name),
            Cell::new(&source.kind),
            count_cell(source.rows),
            count_cell(source.columns),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(total_rows).add_attribute(Attribute::Bold),
        Cell::new(total_columns).add_attribute(Attribute::Bold),
    ]);
    table
}

fn format_time(value: Option<NaiveDateTime>) -> String {
    value.map_or_else(|| "?".to_string(), |t| t.format(TIME_FORMAT).to_string())
}

fn count_cell(count: Option<usize>) -> Cell {
    match count {
        Some(value) if value > 0 => Cell::new(value),
        Some(value) => dim_cell(value),
        None => dim_cell("-"),
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

pub fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

pub fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value.to_string()).fg(Color::DarkGrey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceSummary;

    #[test]
    fn test_admission_table_rows() {
        let admission = AdmissionSummary {
            id: "20000001".to_string(),
            admit_time: None,
            discharge_time: None,
            grid_points: 5,
            sources: vec![
                SourceSummary {
                    name: "vitals".to_string(),
                    kind: "discrete".to_string(),
                    rows: Some(12),
                    columns: Some(4),
                },
                SourceSummary {
                    name: "labs".to_string(),
                    kind: "discrete".to_string(),
                    rows: None,
                    columns: None,
                },
            ],
            messages: Vec::new(),
            files_written: 0,
        };
        let table = admission_table(&admission);
        assert_eq!(table.row_count(), 3);
        let rendered = table.to_string();
        assert!(rendered.contains("vitals"));
        assert!(rendered.contains("TOTAL"));
    }

    #[test]
    fn test_format_time() {
        let time =
            NaiveDateTime::parse_from_str("2150-01-01 08:30:00", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(format_time(Some(time)), "2150-01-01 08:30");
        assert_eq!(format_time(None), "?");
    }
}
