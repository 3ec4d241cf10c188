use growlink_frame::IncomingEvent;
use growlink_server::{Action, Dispatcher, Resource};
use tracing::debug;

use crate::cmd::{capture_drained, replay_link, ReplayArgs};
use crate::config::ConfigFile;
use crate::exit::{server_error, CliResult, SUCCESS};
use crate::output::{print_rows, EventRow, OutputFormat};

pub fn run(args: ReplayArgs, format: OutputFormat, config: &ConfigFile) -> CliResult<i32> {
    let mut link = replay_link(&args.capture, Vec::new(), config)?;
    let mut dispatcher = Dispatcher::with_config(config.status.clone(), config.server_config());
    let mut rows = Vec::new();

    loop {
        let dispatch = dispatcher
            .dispatch_once(&mut link)
            .map_err(|err| server_error("replay failed", err))?;
        if dispatch.event == IncomingEvent::None {
            if capture_drained(&link) {
                break;
            }
            if !args.all {
                continue;
            }
        }

        let mut row = EventRow::new(rows.len(), &dispatch.event)
            .with_request(dispatch.request.as_ref());

        if let IncomingEvent::SerialConsoleLine(text) = &dispatch.event {
            if let Some(resource) = Resource::from_path(text) {
                let before = link.console().len();
                let failed = dispatcher.render_console(&mut link, resource);
                row = row
                    .with_action(Action::Page(resource), failed)
                    .with_outbound(&link.console()[before..], args.show_output);
            }
        } else {
            let outbound = link.get_mut().take_written();
            if matches!(dispatch.event, IncomingEvent::DataReceived { .. }) {
                row = row.with_action(dispatch.action, dispatch.response_failed);
            }
            if !outbound.is_empty() || row.action.is_some() {
                row = row.with_outbound(&outbound, args.show_output);
            }
        }

        debug!(index = row.index, event = row.event, "replayed");
        rows.push(row);
    }

    print_rows(&rows, format);
    Ok(SUCCESS)
}
