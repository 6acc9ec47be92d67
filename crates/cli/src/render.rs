//! Terminal tables, CSV and JSON export, and the ASCII time-series chart.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

/// Left-aligned text table with a dashed rule under the header.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();

    let mut out = String::new();
    push_row(&mut out, headers.iter().copied(), &widths);
    push_row(&mut out, rule.iter().map(String::as_str), &widths);
    for row in rows {
        push_row(&mut out, row.iter().map(String::as_str), &widths);
    }
    out
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line = cells
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Plain rendering of a JSON scalar for tables and CSV.
pub fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Write `headers` then `rows` to `path`, creating parent directories.
pub fn write_csv(path: &Path, headers: &[&str], rows: &[Vec<String>]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// `{site}_{dimension}_{period}.csv`, with anything unsafe in a file name
/// replaced by `_`.
pub fn csv_file_name(site: &str, dimension: &str, period: &str) -> String {
    let clean = |s: &str| -> String {
        s.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    };
    format!("{}_{}_{}.csv", clean(site), clean(dimension), clean(period))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// Vertical bar chart of `(label, value)` points.
///
/// The plot area is `height` rows by at most `width` columns. When there
/// are more points than columns, points are sampled evenly.
pub fn chart(points: &[(String, u64)], height: usize, width: usize) -> String {
    if points.is_empty() || height == 0 || width == 0 {
        return "No data to chart.\n".to_string();
    }

    let columns = points.len().min(width);
    let column_width = (width / columns).max(1);
    let sampled: Vec<u64> = (0..columns)
        .map(|col| points[col * points.len() / columns].1)
        .collect();
    let max = sampled.iter().copied().max().unwrap_or(0).max(1);
    let axis_width = max.to_string().len();
    let rows = u64::try_from(height).unwrap_or(u64::MAX);

    let mut out = String::new();
    for level in (1..=rows).rev() {
        let label = if level == rows {
            max.to_string()
        } else {
            String::new()
        };
        let _ = write!(out, "{label:>axis_width$} |");
        for value in &sampled {
            let filled = value * rows >= level * max;
            let glyph = if filled { "#" } else { " " };
            out.push_str(&glyph.repeat(column_width));
        }
        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
        out.push('\n');
    }

    let _ = writeln!(
        out,
        "{:>axis_width$} +{}",
        0,
        "-".repeat(columns * column_width)
    );

    let first = &points[0].0;
    let last = &points[points.len() - 1].0;
    let span = columns * column_width;
    let gap = span.saturating_sub(first.len() + last.len()).max(1);
    let _ = writeln!(
        out,
        "{:>axis_width$}  {first}{}{last}",
        "",
        " ".repeat(gap)
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn table_aligns_columns() {
        let rendered = table(
            &["#", "Page", "Visitors"],
            &[
                vec!["1".into(), "/pricing".into(), "120".into()],
                vec!["2".into(), "/".into(), "7".into()],
            ],
        );
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines[0], "#  Page      Visitors");
        assert_eq!(lines[1], "-  --------  --------");
        assert_eq!(lines[2], "1  /pricing  120");
        assert_eq!(lines[3], "2  /         7");
    }

    #[test]
    fn cells_render_scalars_plainly() {
        assert_eq!(cell(Some(&json!("Chrome"))), "Chrome");
        assert_eq!(cell(Some(&json!(42))), "42");
        assert_eq!(cell(Some(&json!(null))), "-");
        assert_eq!(cell(None), "-");
    }

    #[test]
    fn csv_is_written_with_header() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out/sites.csv");
        write_csv(
            &path,
            &["domain", "timezone"],
            &[vec!["example.com".into(), "Europe/Berlin".into()]],
        )
        .unwrap();
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "domain,timezone\nexample.com,Europe/Berlin\n"
        );
    }

    #[test]
    fn csv_fields_are_quoted_when_needed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("referrers.csv");
        write_csv(
            &path,
            &["property", "visitors"],
            &[
                vec!["a,b".into(), "3".into()],
                vec!["say \"hi\"".into(), "1".into()],
            ],
        )
        .unwrap();
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "property,visitors\n\"a,b\",3\n\"say \"\"hi\"\"\",1\n"
        );
    }

    #[test]
    fn csv_file_names_are_safe() {
        assert_eq!(
            csv_file_name("example.com", "visit:country", "30d"),
            "example.com_visit_country_30d.csv"
        );
        assert_eq!(
            csv_file_name("example.com", "event:page", "2024-01-01..2024-01-31"),
            "example.com_event_page_2024-01-01..2024-01-31.csv"
        );
    }

    #[test]
    fn chart_has_requested_height() {
        let points: Vec<(String, u64)> = (1..=5)
            .map(|d| (format!("2024-05-0{d}"), d * 10))
            .collect();
        let rendered = chart(&points, 4, 10);
        let lines: Vec<_> = rendered.lines().collect();
        // plot rows, axis, labels
        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("50 |"));
        assert!(lines[0].ends_with("##"), "only the peak reaches the top row");
        assert!(lines[4].starts_with(" 0 +----------"));
        assert!(lines[5].contains("2024-05-01"));
        assert!(lines[5].contains("2024-05-05"));
    }

    #[test]
    fn chart_samples_when_points_exceed_width() {
        let points: Vec<(String, u64)> = (0..200).map(|i| (i.to_string(), 1)).collect();
        let rendered = chart(&points, 3, 50);
        let top = rendered.lines().next().unwrap();
        assert_eq!(top, format!("1 |{}", "#".repeat(50)));
    }

    #[test]
    fn empty_chart() {
        assert_eq!(chart(&[], 15, 78), "No data to chart.\n");
    }
}
