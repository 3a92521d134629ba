use lapwire_frame::CATALOG;
use serde::Serialize;

use crate::cmd::ChannelsArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_rows, OutputFormat};

#[derive(Serialize)]
struct ChannelRow {
    name: &'static str,
    file: &'static str,
    stream: bool,
    compressed: bool,
}

pub fn run(args: ChannelsArgs, format: OutputFormat) -> CliResult<i32> {
    let rows: Vec<ChannelRow> = CATALOG
        .iter()
        .filter(|spec| !args.streams || spec.is_stream)
        .map(|spec| ChannelRow {
            name: spec.name,
            file: spec.endpoint_suffix,
            stream: spec.is_stream,
            compressed: spec.is_compressed,
        })
        .collect();
    print_rows(&rows, format)?;
    Ok(SUCCESS)
}
