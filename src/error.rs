use thiserror::Error;

// Only Input and Output end a run; transport and decode failures stay inside a row.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("input error: {0}")]
    Input(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("output error: {0}")]
    Output(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Spreadsheet(#[from] calamine::Error),

    #[error(transparent)]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ScraperError>;
