// src/report/render.rs

use arrow::{error::ArrowError, json::ArrayWriter, record_batch::RecordBatch, util::pretty};
use serde_json::{Map, Value};
use std::fmt::Write;

use super::DashboardReport;
use crate::error::QueryError;
use crate::query::{CategoryPoint, ToRecordBatch};

/// Plain-text rendering: one titled Arrow table per section.
pub fn render_text(report: &DashboardReport) -> Result<String, QueryError> {
    let mut out = String::new();

    section(&mut out, &format!("Data preview ({} rows total)", report.rows));
    table(&mut out, &report.preview)?;

    section(&mut out, "Null ratios");
    for r in &report.null_ratios {
        match r.ratio {
            Some(ratio) => line(&mut out, &format!("{}: {:.2}%", r.column, ratio * 100.0)),
            None => line(&mut out, &format!("{}: n/a (no rows)", r.column)),
        }
    }

    section(&mut out, "Daily null ratio trend");
    table(&mut out, &report.null_trend.to_record_batch()?)?;

    section(&mut out, "Top movies by sales");
    table(&mut out, &report.top_sales.to_record_batch()?)?;

    section(&mut out, "Top movies by audience");
    table(&mut out, &report.top_audience.to_record_batch()?)?;

    let range = &report.audience.range;
    section(
        &mut out,
        &format!(
            "Audience by date, multiMovieYn and repNationCd ({} .. {})",
            range.start.map_or("*".to_string(), |d| d.to_string()),
            range.end.map_or("*".to_string(), |d| d.to_string()),
        ),
    );
    table(&mut out, &report.audience.to_record_batch()?)?;

    section(&mut out, "Audience by multiMovieYn");
    points(&mut out, &report.audience_by_flag);
    section(&mut out, "Audience by repNationCd");
    points(&mut out, &report.audience_by_nation);

    match &report.movie {
        Some(movie) => {
            section(&mut out, &format!("'{}' audience and sales", movie.movie_nm));
            table(&mut out, &movie.to_record_batch()?)?;
        }
        None => {
            section(&mut out, "Movie detail");
            line(&mut out, "no movie selected");
        }
    }

    Ok(out)
}

/// JSON rendering of the whole report.
pub fn render_json(report: &DashboardReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

/// Rows of `batch` as JSON objects; null cells are left out.
pub fn batch_to_json_rows(batch: &RecordBatch) -> Result<Vec<Map<String, Value>>, ArrowError> {
    if batch.num_rows() == 0 {
        return Ok(Vec::new());
    }
    let mut writer = ArrayWriter::new(Vec::new());
    writer.write(batch)?;
    writer.finish()?;
    let buf = writer.into_inner();
    serde_json::from_slice(&buf).map_err(|e| ArrowError::JsonError(e.to_string()))
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n== {} ==", title);
}

fn line(out: &mut String, text: &str) {
    let _ = writeln!(out, "{}", text);
}

fn table(out: &mut String, batch: &RecordBatch) -> Result<(), QueryError> {
    if batch.num_rows() == 0 {
        line(out, "(empty)");
        return Ok(());
    }
    let formatted = pretty::pretty_format_batches(std::slice::from_ref(batch))?;
    let _ = writeln!(out, "{}", formatted);
    Ok(())
}

fn points(out: &mut String, points: &[CategoryPoint]) {
    if points.is_empty() {
        line(out, "(empty)");
    }
    for p in points {
        let _ = writeln!(out, "{}  {:<4} {:>12}", p.date, p.category, p.audi_cnt);
    }
}
