use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::edge::PickRow;

/// Write the pick sheet to a workbook, one row per game. Blank cells mean
/// the market columns could not be computed for that game.
pub fn export_pick_sheet(path: &Path, rows: &[PickRow]) -> Result<()> {
    let mut sheet_rows = vec![vec![
        "Season".to_string(),
        "Week".to_string(),
        "Date".to_string(),
        "Home".to_string(),
        "Away".to_string(),
        "Model Home %".to_string(),
        "Rating Home %".to_string(),
        "Model Spread".to_string(),
        "Market Line".to_string(),
        "Home ML".to_string(),
        "Away ML".to_string(),
        "Home Fair %".to_string(),
        "Away Fair %".to_string(),
        "Home Edge".to_string(),
        "Away Edge".to_string(),
        "Home Stake".to_string(),
        "Away Stake".to_string(),
    ]];
    for row in rows {
        sheet_rows.push(pick_row_cells(row));
    }

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Picks").context("name picks sheet")?;
        write_rows(sheet, &sheet_rows)?;
    }
    workbook
        .save(path)
        .with_context(|| format!("save workbook {}", path.display()))?;
    Ok(())
}

fn pick_row_cells(row: &PickRow) -> Vec<String> {
    vec![
        row.season.to_string(),
        row.week.to_string(),
        row.gameday
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        row.home_team.clone(),
        row.away_team.clone(),
        format!("{:.1}", row.model_home_prob * 100.0),
        format!("{:.1}", row.rating_home_prob * 100.0),
        fmt_signed1(row.model_margin),
        fmt_signed1(row.home_line),
        fmt_price(row.home_price),
        fmt_price(row.away_price),
        fmt_pct(row.home_fair),
        fmt_pct(row.away_fair),
        fmt_signed3(row.home_edge),
        fmt_signed3(row.away_edge),
        fmt_stake(row.home_stake),
        fmt_stake(row.away_stake),
    ]
}

fn fmt_signed1(value: Option<f64>) -> String {
    value.map(|v| format!("{v:+.1}")).unwrap_or_default()
}

fn fmt_signed3(value: Option<f64>) -> String {
    value.map(|v| format!("{v:+.3}")).unwrap_or_default()
}

fn fmt_price(value: Option<f64>) -> String {
    value.map(|v| format!("{v:+.0}")).unwrap_or_default()
}

fn fmt_stake(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.3}")).unwrap_or_default()
}

fn fmt_pct(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.1}", v * 100.0))
        .unwrap_or_default()
}

fn write_rows(sheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            sheet
                .write_string(r as u32, c as u16, cell)
                .context("write cell")?;
        }
    }
    Ok(())
}
