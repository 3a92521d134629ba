use lapwire_frame::Decoded;
use lapwire_source::DirSource;
use lapwire_timing::Session;
use serde::Serialize;
use serde_json::Value;

use crate::cmd::DecodeArgs;
use crate::exit::{timing_error, CliResult, SUCCESS};
use crate::output::{print_rows, print_value, OutputFormat};

#[derive(Serialize)]
struct FrameRow<'a> {
    time: f64,
    channel: &'a str,
    payload: &'a Value,
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let identity = args.dir.display().to_string();
    let session = Session::new(identity, DirSource::new(&args.dir));
    let decoded = session
        .decode(&args.channel)
        .map_err(|err| timing_error(&format!("decode {}", args.channel), err))?;

    match decoded {
        Decoded::Value(value) => print_value(&value, format),
        Decoded::Stream(frames) => {
            let limit = args.limit.unwrap_or(frames.len());
            let rows: Vec<FrameRow<'_>> = frames
                .iter()
                .take(limit)
                .map(|frame| FrameRow {
                    time: frame.timestamp.as_secs_f64(),
                    channel: frame.channel,
                    payload: &frame.payload,
                })
                .collect();
            print_rows(&rows, format)?;
        }
    }
    Ok(SUCCESS)
}
