use std::{any::Any, future::Future, panic::AssertUnwindSafe};

use futures::FutureExt;

#[macro_export]
macro_rules! print_result_err {
    ($context:expr, $result:expr $(,)?) => {{
        if let Err(err) = $result {
            log::error!("[{}:{}] Error {}: {:?}", ::std::file!(), ::std::line!(), $context, err);
        }
    }};
}

#[macro_export]
macro_rules! regex {
    ($re:literal $(,)?) => {{
        static RE: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
        RE.get_or_init(|| regex::Regex::new($re).unwrap())
    }};
}

/// Log the error of a result, if any. Returns true when there was one.
pub fn log_err<T, E: std::fmt::Display>(result: Result<T, E>, context: &str) -> bool {
    match result {
        Ok(_) => false,
        Err(err) => {
            log::error!("{}: {}", context, err);
            true
        }
    }
}

/// Await a future, turning a panic into its message.
pub async fn catch_panic<T, F: Future<Output = T>>(fut: F) -> Result<T, String> {
    AssertUnwindSafe(fut).catch_unwind().await.map_err(|panic| panic_message(&panic).to_owned())
}

/// Run a future, turning a panic into a logged error instead of tearing down the worker.
/// Returns false when the future panicked.
pub async fn run_guarded<F: Future<Output = ()>>(context: &str, fut: F) -> bool {
    match catch_panic(fut).await {
        Ok(()) => true,
        Err(msg) => {
            log::error!("Panic while {}: {}", context, msg);
            false
        }
    }
}

pub(crate) fn panic_message(panic: &Box<dyn Any + Send>) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}
