use std::path::Path;

use crate::cmd::LapArgs;
use crate::exit::{timing_error, CliResult, SUCCESS};
use crate::output::{print_rows, OutputFormat};

pub fn run(args: LapArgs, format: OutputFormat, cache_dir: Option<&Path>) -> CliResult<i32> {
    let session = args.capture.open_with(cache_dir, args.session_config());
    let rows = session.summary().map_err(|err| timing_error("summary", err))?;
    print_rows(&rows, format)?;
    Ok(SUCCESS)
}
