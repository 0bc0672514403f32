//! Resolution worker.
//!
//! One worker runs per domain name. It asks the resolver for the addresses,
//! writes exactly one outcome line and returns. Nothing a resolver does,
//! including panicking, escapes the worker boundary.

use crate::error::BulkDnsError;
use crate::resolver::Resolve;
use crate::sink::LogSink;
use crate::types::LookupOutcome;
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;

/// Resolve one domain and record the outcome.
///
/// Always writes exactly one entry to `sink`: the addresses on success, the
/// error otherwise. A panicking resolver is reported as a failed lookup.
pub async fn resolve_domain(resolver: &dyn Resolve, sink: &dyn LogSink, domain: String) {
    let lookup = AssertUnwindSafe(async { resolver.resolve(&domain).await })
        .catch_unwind()
        .await;

    let result = match lookup {
        Ok(result) => result,
        Err(payload) => {
            tracing::error!(domain = %domain, "resolver panicked");
            Err(BulkDnsError::resolution(
                &domain,
                format!("resolver panicked: {}", panic_message(payload.as_ref())),
            ))
        }
    };

    sink.record_lookup(&LookupOutcome { domain, result });
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
