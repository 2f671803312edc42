use anyhow::Result;
use clap::Args;
use formsmith_editor::{to_fields, FieldRegistry};
use formsmith_workspace::load_envelope;
use serde_json::json;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Saved form to export
    pub file: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Emit `{ formName, fields }` instead of a bare field array
    #[arg(long)]
    pub wrap: bool,
}

pub fn export(args: ExportArgs, _cwd: &Path) -> Result<()> {
    let source = super::read_source(&args.file)?;
    let envelope = load_envelope(&source, super::now_ms())?;

    let registry = FieldRegistry::with_builtin_types();
    let fields = to_fields(&envelope.tree(), &registry);

    let document = if args.wrap {
        json!({ "formName": envelope.form_name, "fields": fields })
    } else {
        serde_json::to_value(&fields)?
    };

    super::write_output(args.output.as_deref(), &serde_json::to_string_pretty(&document)?)
}
