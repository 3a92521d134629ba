use std::path::Path;

use crate::cmd::CaptureArgs;
use crate::exit::{timing_error, CliResult, SUCCESS};
use crate::output::{print_rows, OutputFormat};

pub fn run_car_data(
    args: CaptureArgs,
    format: OutputFormat,
    cache_dir: Option<&Path>,
) -> CliResult<i32> {
    let samples = args
        .open(cache_dir)
        .car_data()
        .map_err(|err| timing_error("car data", err))?;
    print_rows(&samples, format)?;
    Ok(SUCCESS)
}

pub fn run_position(
    args: CaptureArgs,
    format: OutputFormat,
    cache_dir: Option<&Path>,
) -> CliResult<i32> {
    let samples = args
        .open(cache_dir)
        .position()
        .map_err(|err| timing_error("position", err))?;
    print_rows(&samples, format)?;
    Ok(SUCCESS)
}
