use std::path::Path;

use crate::cmd::CaptureArgs;
use crate::exit::{timing_error, CliResult, SUCCESS};
use crate::output::{print_rows, OutputFormat};

pub fn run(args: CaptureArgs, format: OutputFormat, cache_dir: Option<&Path>) -> CliResult<i32> {
    let gaps = args
        .open(cache_dir)
        .gaps()
        .map_err(|err| timing_error("gaps", err))?;
    print_rows(&gaps, format)?;
    Ok(SUCCESS)
}
