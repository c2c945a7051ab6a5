use std::fs::File;
use std::path::Path;
use log::{info, warn};
use calamine::{open_workbook_auto, Reader};
use crate::error::{Result, ScraperError};
use crate::record::ProductRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputTable {
    pub sheet: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelection {
    pub id: String,
    pub description: String,
    pub supplier: Option<String>,
    pub brand: Option<String>,
}

impl ColumnSelection {
    pub fn resolve(
        headers: &[String],
        id: Option<&str>,
        description: Option<&str>,
        supplier: Option<&str>,
        brand: Option<&str>,
    ) -> Result<Self> {
        let guess = |keywords: &[&str]| -> Option<String> {
            headers
                .iter()
                .find(|h| {
                    let lower = h.to_lowercase();
                    keywords.iter().any(|k| lower.contains(k))
                })
                .cloned()
        };

        let id = id
            .map(str::to_string)
            .or_else(|| guess(&["product id", "product_id", "sku", "item", "id"]))
            .ok_or_else(|| ScraperError::Input("no product ID column selected or detected".to_string()))?;
        let description = description
            .map(str::to_string)
            .or_else(|| guess(&["description", "desc", "name", "title"]))
            .ok_or_else(|| ScraperError::Input("no description column selected or detected".to_string()))?;
        let supplier = supplier.map(str::to_string).or_else(|| guess(&["supplier", "vendor"]));
        let brand = brand.map(str::to_string).or_else(|| guess(&["brand", "manufacturer"]));

        Ok(ColumnSelection {
            id,
            description,
            supplier,
            brand,
        })
    }

    pub fn headers(&self) -> Vec<String> {
        let mut headers = vec![self.id.clone(), self.description.clone()];
        headers.extend(self.supplier.clone());
        headers.extend(self.brand.clone());
        headers
    }
}

impl InputTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| {
                ScraperError::Input(format!(
                    "column '{}' not found in sheet '{}' (columns: {})",
                    name,
                    self.sheet,
                    self.headers.join(", ")
                ))
            })
    }

    pub fn select_records(&self, selection: &ColumnSelection, limit: usize) -> Result<Vec<ProductRecord>> {
        let id_idx = self.column_index(&selection.id)?;
        let desc_idx = self.column_index(&selection.description)?;
        let supplier_idx = selection
            .supplier
            .as_deref()
            .map(|name| self.column_index(name))
            .transpose()?;
        let brand_idx = selection
            .brand
            .as_deref()
            .map(|name| self.column_index(name))
            .transpose()?;

        let cell = |row: &[String], idx: usize| -> String {
            row.get(idx).cloned().unwrap_or_default()
        };

        let records = self
            .rows
            .iter()
            .take(limit)
            .enumerate()
            .map(|(i, row)| {
                let supplier = supplier_idx.map(|idx| cell(row, idx));
                let brand = brand_idx.map(|idx| cell(row, idx));
                ProductRecord::new(
                    i,
                    &cell(row, id_idx),
                    &cell(row, desc_idx),
                    supplier.as_deref(),
                    brand.as_deref(),
                )
            })
            .collect();

        Ok(records)
    }
}

fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| {
            matches!(ext.to_lowercase().as_str(), "xlsx" | "xlsm" | "xlsb" | "xls" | "ods")
        })
}

pub fn load_table<P: AsRef<Path>>(path: P, sheet: Option<&str>) -> Result<InputTable> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ScraperError::Input(format!("input file {:?} does not exist", path)));
    }

    let table = if is_spreadsheet(path) {
        load_spreadsheet(path, sheet)?
    } else {
        if sheet.is_some() {
            warn!("Sheet selection ignored for CSV input {:?}", path);
        }
        load_csv(path)?
    };

    if table.headers.is_empty() {
        return Err(ScraperError::Input(format!("{:?} has no header row", path)));
    }
    if table.rows.is_empty() {
        return Err(ScraperError::Input(format!("{:?} has no data rows", path)));
    }

    info!(
        "Loaded sheet '{}' with {} rows and {} columns from {:?}",
        table.sheet,
        table.rows.len(),
        table.headers.len(),
        path
    );
    Ok(table)
}

pub fn sheet_names<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let workbook = open_workbook_auto(path.as_ref())?;
    Ok(workbook.sheet_names().to_vec())
}

fn load_csv(path: &Path) -> Result<InputTable> {
    let file = File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let row: Vec<String> = record.iter().map(str::to_string).collect();
        if row.iter().all(|c| c.is_empty()) {
            continue;
        }
        rows.push(row);
    }

    let sheet = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(InputTable { sheet, headers, rows })
}

fn load_spreadsheet(path: &Path, sheet: Option<&str>) -> Result<InputTable> {
    let mut workbook = open_workbook_auto(path)?;
    let worksheets = workbook.worksheets();

    let (name, range) = match sheet {
        Some(wanted) => worksheets.into_iter().find(|(name, _)| name == wanted).ok_or_else(|| {
            ScraperError::Input(format!("sheet '{}' not found in {:?}", wanted, path))
        })?,
        None => worksheets
            .into_iter()
            .next()
            .ok_or_else(|| ScraperError::Input(format!("{:?} contains no sheets", path)))?,
    };

    let mut rows_iter = range.rows();
    let headers: Vec<String> = match rows_iter.next() {
        Some(header_row) => header_row.iter().map(|c| c.to_string().trim().to_string()).collect(),
        None => Vec::new(),
    };

    let rows = rows_iter
        .map(|row| row.iter().map(|c| c.to_string().trim().to_string()).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|c| !c.is_empty()))
        .collect();

    Ok(InputTable {
        sheet: name,
        headers,
        rows,
    })
}
