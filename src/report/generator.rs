//! Plain-text report generation.
//!
//! This module renders report blocks into aligned text tables. All
//! numeric values are rounded here and nowhere earlier.

use super::{Block, Payload, Report};
use crate::analysis::{AggregateTable, CorrelationMatrix, IndicatorSummary, OutlierSet};
use crate::error::Result;
use crate::models::DATE_FORMAT;

const TITLE_RULE: usize = 60;
const SECTION_RULE: usize = 30;

/// Generate the complete text report.
pub fn generate_text_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str(&report.title().to_uppercase());
    output.push('\n');
    output.push_str(&"=".repeat(TITLE_RULE));
    output.push_str("\n\n");

    for section in report.sections() {
        output.push_str(&format!("{}. {}\n", section.number, section.title.to_uppercase()));
        output.push_str(&"-".repeat(SECTION_RULE));
        output.push('\n');
        output.push_str(&section.body);
        output.push('\n');
    }

    output
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Render the blocks of one section, separated by blank lines.
pub(crate) fn render_blocks(blocks: &[Block]) -> String {
    let mut body = String::new();

    for block in blocks {
        if let Some(ref heading) = block.heading {
            body.push_str(heading);
            body.push_str(":\n");
        }
        body.push_str(&render_payload(&block.payload));
        if !body.ends_with('\n') {
            body.push('\n');
        }
        body.push('\n');
    }

    body
}

/// Render a single payload.
pub fn render_payload(payload: &Payload) -> String {
    match payload {
        Payload::Text(text) => text.clone(),
        Payload::Table(table) => render_table(table),
        Payload::Correlation(matrix) => render_correlation(matrix),
        Payload::Outliers(outliers) => render_outliers(outliers),
        Payload::Summary(summaries) => render_summary(summaries),
        Payload::Unavailable { analysis, reason } => {
            format!("{}: unavailable ({})", analysis, reason)
        }
    }
}

/// Render an aggregate table with 2-decimal values.
pub fn render_table(table: &AggregateTable) -> String {
    let mut headers = vec![table.group_by().key_label().to_string()];
    headers.extend(table.columns().iter().map(|c| c.header()));

    let rows: Vec<Vec<String>> = table
        .rows()
        .iter()
        .map(|row| {
            let mut cells = vec![row.key.to_string()];
            cells.extend(row.values.iter().map(|v| format_decimal(*v, 2)));
            cells
        })
        .collect();

    render_grid(&headers, &rows)
}

/// Render a correlation matrix. Undefined coefficients show as `n/a`.
pub fn render_correlation(matrix: &CorrelationMatrix) -> String {
    let mut headers = vec![String::new()];
    headers.extend(matrix.indicators().iter().map(|i| i.column().to_string()));

    let rows: Vec<Vec<String>> = matrix
        .indicators()
        .iter()
        .enumerate()
        .map(|(i, indicator)| {
            let mut cells = vec![indicator.column().to_string()];
            cells.extend(matrix.row(i).iter().map(|v| match v {
                Some(r) => format_decimal(*r, 2),
                None => "n/a".to_string(),
            }));
            cells
        })
        .collect();

    render_grid(&headers, &rows)
}

/// Render the outlier fences followed by the outlying records.
pub fn render_outliers(outliers: &OutlierSet) -> String {
    let indicator = outliers.indicator;
    let mut text = format!(
        "Q1 = {}, Q3 = {}, IQR = {}, bounds = [{}, {}] (k = {})\n",
        format_decimal(outliers.quartiles.q1, 2),
        format_decimal(outliers.quartiles.q3, 2),
        format_decimal(outliers.iqr(), 2),
        format_decimal(outliers.lower_bound, 2),
        format_decimal(outliers.upper_bound, 2),
        outliers.multiplier,
    );

    if outliers.is_empty() {
        text.push_str("No outliers found.\n");
        return text;
    }

    text.push_str(&format!("Outliers found: {}\n", outliers.len()));

    let headers = vec![
        "Date".to_string(),
        "City".to_string(),
        indicator.label().to_string(),
    ];
    let rows: Vec<Vec<String>> = outliers
        .records
        .iter()
        .map(|r| {
            vec![
                r.date.format(DATE_FORMAT).to_string(),
                r.city.clone(),
                r.value(indicator)
                    .map(|v| format_decimal(v, 2))
                    .unwrap_or_default(),
            ]
        })
        .collect();

    text.push_str(&render_grid(&headers, &rows));
    text
}

/// Render descriptive statistics, one row per indicator.
pub fn render_summary(summaries: &[IndicatorSummary]) -> String {
    let headers: Vec<String> = ["Indicator", "count", "mean", "std", "min", "25%", "50%", "75%", "max"]
        .iter()
        .map(|h| h.to_string())
        .collect();

    let rows: Vec<Vec<String>> = summaries
        .iter()
        .map(|s| {
            vec![
                s.indicator.column().to_string(),
                s.count.to_string(),
                format_decimal(s.mean, 2),
                s.std_dev
                    .map(|v| format_decimal(v, 2))
                    .unwrap_or_else(|| "n/a".to_string()),
                format_decimal(s.min, 2),
                format_decimal(s.quartiles.q1, 2),
                format_decimal(s.quartiles.median, 2),
                format_decimal(s.quartiles.q3, 2),
                format_decimal(s.max, 2),
            ]
        })
        .collect();

    render_grid(&headers, &rows)
}

/// Lay out cells in aligned columns. The first column is left-aligned,
/// the rest right-aligned.
fn render_grid(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_line = |cells: &[String]| {
        let line = cells
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (cell, width))| {
                if i == 0 {
                    format!("{:<width$}", cell, width = *width)
                } else {
                    format!("{:>width$}", cell, width = *width)
                }
            })
            .collect::<Vec<_>>()
            .join("  ");
        format!("{}\n", line.trim_end())
    };

    let mut output = format_line(headers);
    for row in rows {
        output.push_str(&format_line(row.as_slice()));
    }
    output
}

/// Format with a fixed number of decimals. Negative zero prints as zero.
pub fn format_decimal(value: f64, places: usize) -> String {
    let text = format!("{:.*}", places, value);
    if text.starts_with('-') && text[1..].chars().all(|c| c == '0' || c == '.') {
        text[1..].to_string()
    } else {
        text
    }
}

/// Format a headcount with thousands separators, e.g. `12,345`.
pub fn format_count(value: f64) -> String {
    let digits = format!("{:.0}", value.abs());
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if value < 0.0 && digits != "0" {
        format!("-{}", grouped)
    } else {
        grouped
    }
}
