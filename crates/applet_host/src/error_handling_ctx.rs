use crate::error::HostError;

/// Print an error that ended a command, with the extra detail the host has for its own errors.
pub fn print_error(err: &anyhow::Error) {
    if let Some(host_err) = err.downcast_ref::<HostError>() {
        eprintln!("{}", format_host_error(host_err));
    } else if let Some(zbus::Error::MethodError(_, Some(detail), _)) = err.downcast_ref::<zbus::Error>() {
        eprintln!("{:#}\nThe applet host refused the request: {}", err, detail);
    } else {
        log::error!("{:?}", err);
    }
}

pub fn format_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<HostError>() {
        Some(host_err) => format_host_error(host_err),
        None => format!("{:?}", err),
    }
}

fn format_host_error(err: &HostError) -> String {
    match err {
        HostError::Config(conf_err) if conf_err.is_fatal() => format!("{}\nThe host config file could not be used.", err),
        HostError::Transport(transport_err) if err.is_closed() => format!("{}: the dock connection is gone", transport_err),
        _ => err.to_string(),
    }
}
