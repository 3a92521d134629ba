use std::path::Path;

use crate::cmd::LapArgs;
use crate::exit::{timing_error, CliResult, SUCCESS};
use crate::output::{print_rows, OutputFormat};

pub fn run(args: LapArgs, format: OutputFormat, cache_dir: Option<&Path>) -> CliResult<i32> {
    let session = args.capture.open_with(cache_dir, args.session_config());
    let laps = session.laps().map_err(|err| timing_error("laps", err))?;
    tracing::info!(laps = laps.len(), session = session.identity(), "laps reconstructed");
    print_rows(&laps, format)?;
    Ok(SUCCESS)
}
