use std::fs;
use std::path::{Path, PathBuf};
use chrono::Local;
use log::info;
use rust_xlsxwriter::{Workbook, Worksheet};
use crate::error::{Result, ScraperError};
use crate::report::{Report, Table};

const MAX_COLUMN_WIDTH: usize = 60;

pub fn default_workbook_name(rows: usize) -> String {
    format!(
        "Product_URLs_Results_{}rows_{}.xlsx",
        rows,
        Local::now().format("%Y%m%d_%H%M%S")
    )
}

/// Writes the report as one workbook with a sheet per table.
pub fn write_workbook<P: AsRef<Path>>(report: &Report, path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let mut workbook = Workbook::new();
    for table in report.tables() {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(table.name.as_str())?;
        fill_sheet(worksheet, table)?;
    }
    workbook.save(path)?;

    info!("Report written to {:?}", path);
    Ok(path.to_path_buf())
}

fn fill_sheet(worksheet: &mut Worksheet, table: &Table) -> Result<()> {
    check_shape(table)?;

    for (col, header) in table.headers.iter().enumerate() {
        worksheet.write_string(0, column(col)?, header.as_str())?;
    }
    for (i, row) in table.rows.iter().enumerate() {
        let r = u32::try_from(i + 1)
            .map_err(|_| ScraperError::Output(format!("sheet '{}' has too many rows", table.name)))?;
        for (col, cell) in row.iter().enumerate() {
            if !cell.is_empty() {
                worksheet.write_string(r, column(col)?, cell.as_str())?;
            }
        }
    }

    for (col, width) in column_widths(table).into_iter().enumerate() {
        worksheet.set_column_width(column(col)?, width as f64)?;
    }

    info!("Wrote {} rows to sheet '{}'", table.rows.len(), table.name);
    Ok(())
}

pub fn column_widths(table: &Table) -> Vec<usize> {
    table
        .headers
        .iter()
        .enumerate()
        .map(|(col, header)| {
            let longest = table
                .rows
                .iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.chars().count())
                .fold(header.chars().count(), usize::max);
            (longest + 2).min(MAX_COLUMN_WIDTH)
        })
        .collect()
}

fn column(index: usize) -> Result<u16> {
    u16::try_from(index).map_err(|_| ScraperError::Output(format!("column {} out of range", index)))
}

fn check_shape(table: &Table) -> Result<()> {
    match table.rows.iter().position(|row| row.len() != table.headers.len()) {
        Some(i) => Err(ScraperError::Output(format!(
            "row {} of '{}' has {} cells, expected {}",
            i + 1,
            table.name,
            table.rows[i].len(),
            table.headers.len()
        ))),
        None => Ok(()),
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .map_err(|e| ScraperError::Output(format!("cannot create {:?}: {}", parent, e))),
        _ => Ok(()),
    }
}

/// Writes each table to `<dir>/<table name>.csv`, overwriting existing files.
pub fn write_csv_tables<P: AsRef<Path>>(report: &Report, dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)
        .map_err(|e| ScraperError::Output(format!("cannot create {:?}: {}", dir, e)))?;

    let mut written = Vec::new();
    for table in report.tables() {
        let path = dir.join(format!("{}.csv", table.name));
        write_table(table, &path)?;
        written.push(path);
    }

    info!("Report written to {:?}", dir);
    Ok(written)
}

pub fn write_table(table: &Table, path: &Path) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .flexible(false)
        .from_path(path)?;

    csv_writer.write_record(&table.headers)?;
    for row in &table.rows {
        csv_writer.write_record(row)?;
    }
    csv_writer.flush()?;

    info!("Wrote {} rows to {:?}", table.rows.len(), path);
    Ok(())
}
