//! Row output for downstream consumers (plotting, spreadsheets).
//!
//! Column order is fixed: point, game, score, leverage, G_A, G_B, M_A, M_B.
//! Games are numbered from 1 in the table and CSV; JSON keeps the 0-based
//! indices of [`PointRow`].

use std::fmt::Write as _;

use anyhow::{Context, Result};
use clap::ValueEnum;

use crate::engine::{Competitor, Labels, MatchReport, PointRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Tab-separated table with a header and a rule line
    Table,
    Csv,
    Json,
}

pub fn render(report: &MatchReport, labels: &Labels, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => {
            render_table(&report.rows, labels).context("Failed to write match table")
        }
        OutputFormat::Csv => render_csv(&report.rows).context("Failed to write match CSV"),
        OutputFormat::Json => {
            serde_json::to_string_pretty(report).context("Failed to serialise match report")
        }
    }
}

fn render_table(rows: &[PointRow], labels: &Labels) -> Result<String, std::fmt::Error> {
    let header = format!(
        "Point #N\tGame\tScore({}:{})\tL_i\t\tG_A\t\tG_B\t\tM_A\t\tM_B",
        labels.label(Competitor::A),
        labels.label(Competitor::B)
    );
    let mut out = String::new();
    writeln!(out, "{}", header)?;
    writeln!(out, "{}", "-".repeat(100))?;
    for r in rows {
        writeln!(
            out,
            "{}\t\t{}\t{}\t\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}",
            r.point,
            r.game + 1,
            r.score_label(),
            r.leverage,
            r.g_a,
            r.g_b,
            r.momentum_a,
            r.momentum_b
        )?;
    }
    Ok(out)
}

fn render_csv(rows: &[PointRow]) -> Result<String, std::fmt::Error> {
    let mut out = String::from("point,game,score_a,score_b,leverage,g_a,g_b,momentum_a,momentum_b\n");
    for r in rows {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{}",
            r.point,
            r.game + 1,
            r.score_a,
            r.score_b,
            r.leverage,
            r.g_a,
            r.g_b,
            r.momentum_a,
            r.momentum_b
        )?;
    }
    Ok(out)
}
