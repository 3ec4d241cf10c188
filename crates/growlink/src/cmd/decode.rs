use growlink_frame::{extract, Classifier, Extraction, IncomingEvent};

use crate::cmd::{capture_drained, replay_link, DecodeArgs};
use crate::config::ConfigFile;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_rows, EventRow, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat, config: &ConfigFile) -> CliResult<i32> {
    let mut link = replay_link(&args.capture, std::io::sink(), config)?;
    let classifier = Classifier::with_config(config.classifier_config());
    let mut rows = Vec::new();

    loop {
        let event = classifier
            .classify(&mut link)
            .map_err(|err| frame_error("decode failed", err))?;
        if event == IncomingEvent::None {
            if capture_drained(&link) {
                break;
            }
            if !args.all {
                continue;
            }
        }

        let mut row = EventRow::new(rows.len(), &event);
        if let IncomingEvent::DataReceived {
            channel,
            payload_budget,
        } = event
        {
            let extraction = extract(&mut link, channel, payload_budget)
                .map_err(|err| frame_error("decode failed", err))?;
            row = row.with_request(extraction.request());
            if extraction == Extraction::Unrecognized {
                row.action = Some("unrecognized".to_string());
            }
        }
        rows.push(row);
    }

    print_rows(&rows, format);
    Ok(SUCCESS)
}
