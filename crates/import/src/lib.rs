pub mod csv;
pub mod export;

pub use self::csv::{
    import_statement, import_statement_file, ImportError, StatementColumns, StatementProfile,
};
pub use self::export::{export_csv, export_json, ExportError};
