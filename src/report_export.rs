use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};
use tracing::info;

use crate::backtest::{BacktestRow, PatternSummary};

pub struct ExportReport {
    pub rows: usize,
    pub patterns: usize,
    pub strong_patterns: usize,
}

/// Writes the backtest rows and the per-label summary to an xlsx workbook. Patterns passing
/// `min_matches` get a third sheet.
pub fn export_backtest_xlsx(
    path: &Path,
    rows: &[BacktestRow],
    summary: &[PatternSummary],
    min_matches: usize,
) -> Result<ExportReport> {
    let mut row_cells = vec![vec![
        "Date".to_string(),
        "League".to_string(),
        "Match".to_string(),
        "Label".to_string(),
        "Over 2.5 Odds".to_string(),
        "History".to_string(),
        "P(Over) %".to_string(),
        "EV %".to_string(),
        "Result".to_string(),
        "Hit".to_string(),
        "Profit".to_string(),
    ]];
    row_cells.extend(rows.iter().map(backtest_row));

    let header = vec![
        "Label".to_string(),
        "Matches".to_string(),
        "Mean EV %".to_string(),
        "Total Profit".to_string(),
        "Mean Profit".to_string(),
        "Over Hit %".to_string(),
    ];
    let mut pattern_cells = vec![header.clone()];
    pattern_cells.extend(summary.iter().map(pattern_row));
    let mut strong_cells = vec![header];
    strong_cells.extend(
        summary
            .iter()
            .filter(|p| p.is_strong(min_matches))
            .map(pattern_row),
    );

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Backtest")?;
        write_rows(sheet, &row_cells)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Patterns")?;
        write_rows(sheet, &pattern_cells)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("StrongPatterns")?;
        write_rows(sheet, &strong_cells)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    let report = ExportReport {
        rows: rows.len(),
        patterns: summary.len(),
        strong_patterns: strong_cells.len().saturating_sub(1),
    };
    info!(path = %path.display(), rows = report.rows, "backtest workbook written");
    Ok(report)
}

fn backtest_row(row: &BacktestRow) -> Vec<String> {
    vec![
        row.date.format("%Y-%m-%d").to_string(),
        row.league.clone(),
        format!("{} vs {}", row.home_team, row.away_team),
        row.label.to_string(),
        format!("{:.2}", row.over_odds),
        row.history.to_string(),
        format!("{:.1}", row.probability * 100.0),
        format!("{:.1}", row.ev * 100.0),
        row.scoreline.clone(),
        if row.hit { "Y" } else { "N" }.to_string(),
        format!("{:.2}", row.profit),
    ]
}

fn pattern_row(p: &PatternSummary) -> Vec<String> {
    vec![
        p.label.to_string(),
        p.matches.to_string(),
        format!("{:.2}", p.mean_ev * 100.0),
        format!("{:.2}", p.total_profit),
        format!("{:.2}", p.mean_profit),
        format!("{:.2}", p.over_hit.pct),
    ]
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
