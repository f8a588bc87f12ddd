//! Presentation of a finished benchmark run: JSON report, plain-text table,
//! and an HTML page with a horizontal bar chart and per-solver output panels.

use std::fmt::Write as FmtWrite;

use serde::Serialize;

use crate::domain::benchmark::BenchmarkEntry;

const BAR_HEIGHT: usize = 28;
const BAR_GAP: usize = 8;
const LABEL_WIDTH: usize = 160;
const PLOT_WIDTH: usize = 480;

/// One bar of the elapsed-time chart
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChartBar {
    pub solver: String,
    pub time: f64,
    pub color: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    pub run_id: u64,
    pub model: String,
    pub time_limit: u64,
    pub results: Vec<BenchmarkEntry>,
    pub chart: Vec<ChartBar>,
}

impl BenchmarkReport {
    pub fn new(run_id: u64, model: String, time_limit: u64, results: Vec<BenchmarkEntry>) -> Self {
        let chart = chart_bars(&results);
        BenchmarkReport {
            run_id,
            model,
            time_limit,
            results,
            chart,
        }
    }
}

/// Bars for every solver that produced a record, in table order
pub fn chart_bars(entries: &[BenchmarkEntry]) -> Vec<ChartBar> {
    entries
        .iter()
        .filter_map(|entry| {
            let record = entry.record.as_ref()?;
            Some(ChartBar {
                solver: record.solver.clone(),
                time: record.time,
                color: entry.solver.color(),
            })
        })
        .collect()
}

fn cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn row_cells(entry: &BenchmarkEntry) -> [String; 7] {
    match &entry.record {
        Some(r) => [
            r.solver.clone(),
            format!("{:.3}", r.time),
            cell(r.iterations),
            cell(r.nodes),
            cell(r.gap),
            cell(r.objective),
            r.status.clone(),
        ],
        None => [
            entry.label().to_string(),
            "-".to_string(),
            "-".to_string(),
            "-".to_string(),
            "-".to_string(),
            "-".to_string(),
            format!("error: {}", entry.error.as_deref().unwrap_or("unknown")),
        ],
    }
}

const HEADERS: [&str; 7] = ["solver", "time", "iterations", "nodes", "gap", "objective", "status"];

/// Fixed-width table indexed by solver label; absent values print as `-`
pub fn text_table(entries: &[BenchmarkEntry]) -> String {
    let rows: Vec<[String; 7]> = entries.iter().map(row_cells).collect();
    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, value) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(value.len());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = HEADERS.iter().zip(widths).map(|(h, w)| format!("{:<w$}", h, w = w)).collect();
    let _ = writeln!(out, "{}", header.join("  ").trim_end());
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("  "));
    for row in &rows {
        let cells: Vec<String> = row.iter().zip(widths).map(|(c, w)| format!("{:<w$}", c, w = w)).collect();
        let _ = writeln!(out, "{}", cells.join("  ").trim_end());
    }
    out
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Horizontal bars of elapsed time, one per solver, scaled to the slowest
pub fn bar_chart_svg(bars: &[ChartBar]) -> String {
    let longest = bars.iter().map(|b| b.time).fold(0.0_f64, f64::max);
    let height = bars.len() * (BAR_HEIGHT + BAR_GAP) + BAR_GAP;
    let width = LABEL_WIDTH + PLOT_WIDTH + 80;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" role="img" aria-label="time per solver">"#
    );
    for (i, bar) in bars.iter().enumerate() {
        let y = BAR_GAP + i * (BAR_HEIGHT + BAR_GAP);
        let length = if longest > 0.0 {
            (bar.time / longest * PLOT_WIDTH as f64).round() as usize
        } else {
            0
        };
        let text_y = y + BAR_HEIGHT / 2 + 5;
        let _ = writeln!(
            svg,
            r#"  <text x="{}" y="{}" text-anchor="end" font-family="sans-serif" font-size="13">{}</text>"#,
            LABEL_WIDTH - 8,
            text_y,
            escape(&bar.solver)
        );
        let _ = writeln!(
            svg,
            r#"  <rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
            LABEL_WIDTH, y, length, BAR_HEIGHT, bar.color
        );
        let _ = writeln!(
            svg,
            r#"  <text x="{}" y="{}" font-family="sans-serif" font-size="12">{:.2}s</text>"#,
            LABEL_WIDTH + length + 6,
            text_y,
            bar.time
        );
    }
    svg.push_str("</svg>\n");
    svg
}

/// Full results page: table, chart, then one output panel per solver
pub fn html_page(report: &BenchmarkReport) -> String {
    let mut html = String::new();
    let _ = writeln!(html, "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">");
    let _ = writeln!(html, "<title>Benchmark {} - {}</title>", report.run_id, escape(&report.model));
    html.push_str(
        "<style>body{font-family:sans-serif;margin:2em}table{border-collapse:collapse}\
         td,th{border:1px solid #ccc;padding:4px 8px;text-align:left}\
         pre{background:#f6f6f6;padding:1em;max-height:30em;overflow:auto}</style>\n</head>\n<body>\n",
    );
    let _ = writeln!(
        html,
        "<h1>Benchmarking Gurobi and open-source solvers</h1>\n<p>Model <code>{}</code>, time limit {}s</p>",
        escape(&report.model),
        report.time_limit
    );

    html.push_str("<h2>Results</h2>\n<table>\n<tr>");
    for header in HEADERS {
        let _ = write!(html, "<th>{}</th>", header);
    }
    html.push_str("</tr>\n");
    for entry in &report.results {
        html.push_str("<tr>");
        for value in row_cells(entry) {
            let _ = write!(html, "<td>{}</td>", escape(&value));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n");

    html.push_str(&bar_chart_svg(&report.chart));

    for entry in &report.results {
        let _ = writeln!(
            html,
            "<h2>{}</h2>\n<pre>{}</pre>",
            escape(entry.solver.name()),
            escape(&entry.output)
        );
    }
    html.push_str("</body>\n</html>\n");
    html
}
