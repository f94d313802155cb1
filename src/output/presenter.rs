use std::io::Write;

use serde_json::json;

use crate::common::{Error, ListResult, Sink, Warning};
use crate::config::OutputFormat;

/// Renders results for a terminal or for other programs.
///
/// `Table` writes data and logs to stdout and problems to stderr. `Json`
/// writes one document per message to stdout, each with a single top-level
/// key: `log`, `error` or `data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presenter {
    Table,
    Json,
}

impl From<OutputFormat> for Presenter {
    fn from(value: OutputFormat) -> Self {
        match value {
            OutputFormat::Text => Presenter::Table,
            OutputFormat::Json => Presenter::Json,
        }
    }
}

fn write_document<W: Write>(out: &mut W, document: &serde_json::Value) -> std::io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, document)?;
    writeln!(out)
}

impl Presenter {
    pub fn write_log<W: Write>(&self, out: &mut W, message: &str) -> std::io::Result<()> {
        match self {
            Presenter::Table => writeln!(out, "{message}"),
            Presenter::Json => write_document(out, &json!({ "log": message })),
        }
    }

    pub fn write_warning<W: Write>(&self, out: &mut W, warning: &Warning) -> std::io::Result<()> {
        match self {
            Presenter::Table => writeln!(out, "WARNING: {warning}"),
            Presenter::Json => write_document(out, &json!({ "error": warning })),
        }
    }

    pub fn write_error<W: Write>(&self, out: &mut W, error: &Error) -> std::io::Result<()> {
        match self {
            Presenter::Table => writeln!(out, "ERROR: {error}"),
            Presenter::Json => write_document(
                out,
                &json!({
                    "error": {
                        "kind": error.kind(),
                        "message": error.to_string(),
                        "code": error.exit_code(),
                    }
                }),
            ),
        }
    }

    pub fn write_result<W: Write>(&self, out: &mut W, result: &ListResult) -> std::io::Result<()> {
        match self {
            Presenter::Table => super::table::write_table(out, &result.machines),
            Presenter::Json => write_document(out, &json!({ "data": result.machines })),
        }
    }

    /// Print a fatal error to the stream this presenter uses for errors.
    pub fn report(&self, error: &Error) {
        let _ = match self {
            Presenter::Table => self.write_error(&mut std::io::stderr().lock(), error),
            Presenter::Json => self.write_error(&mut std::io::stdout().lock(), error),
        };
    }

    pub fn print_result(&self, result: &ListResult) -> std::io::Result<()> {
        self.write_result(&mut std::io::stdout().lock(), result)
    }
}

impl Sink for Presenter {
    fn log(&self, message: &str) {
        let _ = self.write_log(&mut std::io::stdout().lock(), message);
    }

    fn warn(&self, warning: &Warning) {
        let _ = match self {
            Presenter::Table => self.write_warning(&mut std::io::stderr().lock(), warning),
            Presenter::Json => self.write_warning(&mut std::io::stdout().lock(), warning),
        };
    }
}
