use crate::cmd::ServeArgs;
use crate::config::ConfigFile;
use crate::exit::CliResult;
use crate::output::OutputFormat;

#[cfg(unix)]
pub fn run(args: ServeArgs, format: OutputFormat, config: &ConfigFile) -> CliResult<i32> {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use growlink_frame::{DecodedRequest, IncomingEvent};
    use growlink_server::{Action, Dispatcher, Resource};
    use growlink_transport::{SerialBridge, UartLink};
    use tracing::info;

    use crate::config::parse_duration;
    use crate::exit::{server_error, transport_error, SUCCESS};
    use crate::output::{print_row, EventRow};

    let mut link_config = config.link_config()?;
    if let Some(timeout) = &args.read_timeout {
        link_config.read_timeout = Some(parse_duration(timeout)?);
    }

    let stream =
        SerialBridge::connect(&args.path).map_err(|err| transport_error("connect failed", err))?;
    let mut link = UartLink::with_config_serial(stream, link_config)
        .map_err(|err| transport_error("link setup failed", err))?;

    let mut dispatcher = Dispatcher::with_config(config.status.clone(), config.server_config())
        .with_post_handler(|request: &DecodedRequest| {
            let fields: Vec<_> = request.form_fields().collect();
            info!(path = %request.path, ?fields, "form posted");
        });

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;
    info!(path = %args.path.display(), "serving");

    let mut handled = 0usize;
    while running.load(Ordering::SeqCst) {
        let dispatch = dispatcher
            .dispatch_once(&mut link)
            .map_err(|err| server_error("dispatch failed", err))?;

        let mut row = match &dispatch.event {
            IncomingEvent::None => {
                if link.is_closed() {
                    info!("serial bridge closed");
                    break;
                }
                continue;
            }
            IncomingEvent::SerialConsoleLine(text) => {
                let row = EventRow::new(handled, &dispatch.event);
                match Resource::from_path(text) {
                    Some(resource) => {
                        let failed = dispatcher.render_console(&mut link, resource);
                        row.with_action(Action::Page(resource), failed)
                    }
                    None => row,
                }
            }
            IncomingEvent::DataReceived { .. } => EventRow::new(handled, &dispatch.event)
                .with_action(dispatch.action, dispatch.response_failed),
            _ => EventRow::new(handled, &dispatch.event),
        };
        row = row.with_request(dispatch.request.as_ref());
        print_row(&row, format);

        handled = handled.saturating_add(1);
        if let Some(count) = args.count {
            if handled >= count {
                return Ok(SUCCESS);
            }
        }
    }

    Ok(SUCCESS)
}

#[cfg(not(unix))]
pub fn run(_args: ServeArgs, _format: OutputFormat, _config: &ConfigFile) -> CliResult<i32> {
    Err(crate::exit::CliError::new(
        crate::exit::USAGE,
        "serve needs a unix-socket serial bridge",
    ))
}

#[cfg(unix)]
fn install_ctrlc_handler(
    running: std::sync::Arc<std::sync::atomic::AtomicBool>,
) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, std::sync::atomic::Ordering::SeqCst);
    })
    .map_err(|err| {
        crate::exit::CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
