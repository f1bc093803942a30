use std::path::PathBuf;

use thiserror::Error;

/// Pipeline errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("automaton error: {0}")]
    Ir(#[from] fsmc_ir::IrError),
    #[error("table error: {0}")]
    Table(#[from] fsmc_tables::TableError),
    #[error("emit error: {0}")]
    Emit(#[from] fsmc_emit::EmitError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid automaton JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
