mod cli;

use digest_core::ApiError;

fn main() {
    if let Err(e) = cli::run() {
        // API failures carry a localized sentence as their outermost context.
        if e.downcast_ref::<ApiError>().is_some() {
            tracing::debug!(error = %format!("{e:#}"), "Command failed");
            eprintln!("{e}");
            std::process::exit(if is_session_expired(&e) { 2 } else { 1 });
        }
        eprintln!("{e:#}"); // pretty anyhow chain
        std::process::exit(1);
    }
}

fn is_session_expired(e: &anyhow::Error) -> bool {
    e.downcast_ref::<ApiError>()
        .is_some_and(ApiError::is_session_expired)
}
