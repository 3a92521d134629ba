use std::path::Path;

use crate::cmd::CaptureArgs;
use crate::exit::{timing_error, CliResult, SUCCESS};
use crate::output::{print_rows, OutputFormat};

pub fn run(args: CaptureArgs, format: OutputFormat, cache_dir: Option<&Path>) -> CliResult<i32> {
    let table = args
        .open(cache_dir)
        .stints()
        .map_err(|err| timing_error("stints", err))?;

    if !table.drift.is_empty() {
        let mut fields: Vec<&str> = table.drift.iter().map(|d| d.field.as_str()).collect();
        fields.sort_unstable();
        fields.dedup();
        tracing::warn!(
            count = table.drift.len(),
            fields = %fields.join(","),
            "stint updates carried unknown fields"
        );
    }

    print_rows(&table.rows, format)?;
    Ok(SUCCESS)
}
