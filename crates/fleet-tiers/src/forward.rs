//! Outbound hop: one fresh connection per request, no reuse.

use std::path::Path;
use std::time::Duration;

use tokio::net::UnixStream;

use fleet_core::{Failure, Outcome, Request, Response};

use crate::codec::{read_record, within, write_record, ExchangeError};

/// Send `request` to the tier listening at `endpoint` and wait for its reply.
///
/// `timeout` bounds the whole exchange after connect. A downstream that
/// drops the request without answering therefore costs at most `timeout`
/// instead of wedging this hop; `None` restores the unbounded wait.
pub async fn forward(endpoint: &Path, request: &Request, timeout: Option<Duration>) -> Outcome {
    let mut stream = match UnixStream::connect(endpoint).await {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(endpoint = %endpoint.display(), error = %e, "connect failed");
            return Outcome::Failed(Failure::Unreachable);
        }
    };

    let exchange = async {
        write_record(&mut stream, request).await?;
        read_record::<Response, _>(&mut stream).await
    };

    match within(timeout, exchange).await {
        Ok(response) => Outcome::from(response),
        Err(e) => {
            log_exchange_error(endpoint, &e);
            Outcome::Failed(Failure::Downstream)
        }
    }
}

fn log_exchange_error(endpoint: &Path, e: &ExchangeError) {
    match e {
        ExchangeError::TimedOut(limit) => tracing::warn!(
            endpoint = %endpoint.display(),
            timeout_ms = limit.as_millis() as u64,
            "no reply from downstream"
        ),
        other => tracing::warn!(
            endpoint = %endpoint.display(),
            error = %other,
            "error exchanging with downstream"
        ),
    }
}
