use std::time::Instant;

use tokio::net::UnixListener;

use fleet_core::{Failure, Outcome};
use fleet_tiers::forward::forward;

use crate::*;

/// Bind listeners for `workers` that accept connections and never answer.
fn silent_workers(chain: &Chain, workers: std::ops::RangeInclusive<u32>) -> Vec<JoinHandle<()>> {
    workers
        .map(|k| {
            let listener = UnixListener::bind(chain.path(compute(k))).unwrap();
            tokio::spawn(async move {
                let mut held = Vec::new();
                while let Ok((stream, _)) = listener.accept().await {
                    held.push(stream);
                }
            })
        })
        .collect()
}

#[tokio::test]
async fn negative_value_is_rejected_before_any_worker() {
    let mut chain = Chain::start().await;

    assert_eq!(chain.ask(2, -4.0).await, -1.0);
    assert_eq!(chain.ask(1, f64::NAN).await, -1.0);

    assert_eq!(chain.stats(router(2)).illegal(), 1);
    assert_eq!(chain.stats(router(1)).illegal(), 1);
    assert_eq!(chain.computed_by(1..=6), 0);
    // The dispatch tier only relays the sentinel.
    assert_eq!(chain.stats(Slot::dispatch()).failed(), 2);
    assert_eq!(chain.stats(Slot::dispatch()).illegal(), 0);
    chain.stop().await;
}

#[tokio::test]
async fn missing_workers_fail_only_their_router() {
    let mut chain = Chain::start_without(&[compute(1), compute(2), compute(3)]).await;

    assert_eq!(chain.ask(1, 4.0).await, -1.0);
    assert_eq!(chain.ask(2, 4.0).await, 2.0);
    assert_eq!(chain.stats(router(1)).failed(), 1);
    chain.stop().await;
}

#[tokio::test]
async fn missing_router_fails_at_dispatch() {
    let mut chain = Chain::start_without(&[router(2)]).await;

    assert_eq!(chain.ask(2, 4.0).await, -1.0);
    assert_eq!(chain.ask(3, 4.0).await, 2.0);
    assert_eq!(chain.stats(Slot::dispatch()).failed(), 1);
    chain.stop().await;
}

#[tokio::test]
async fn short_request_is_dropped_without_reply() {
    let mut chain = Chain::start().await;

    let mut stream = UnixStream::connect(chain.path(Slot::dispatch()))
        .await
        .unwrap();
    stream.write_all(&[7u8; 5]).await.unwrap();
    stream.shutdown().await.unwrap();
    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await.unwrap();

    assert!(reply.is_empty());
    assert_eq!(chain.stats(Slot::dispatch()).dropped(), 1);
    assert_eq!(chain.stats(router(1)).handled() + chain.stats(router(2)).handled(), 0);

    // Still serving.
    assert_eq!(chain.ask(1, 25.0).await, 5.0);
    chain.stop().await;
}

#[tokio::test]
async fn silent_workers_cost_one_response_timeout() {
    let mut chain = Chain::start_without(&[compute(4), compute(5), compute(6)]).await;

    let holders = silent_workers(&chain, 4..=6);

    let started = Instant::now();
    assert_eq!(chain.ask(2, 4.0).await, -1.0);
    let elapsed = started.elapsed();
    assert!(elapsed >= RESPONSE_TIMEOUT, "answered too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");

    // The other router is unaffected once router 2 gives up.
    assert_eq!(chain.ask(1, 9.0).await, 3.0);

    for holder in holders {
        holder.abort();
    }
    chain.stop().await;
}

#[tokio::test]
async fn client_with_its_own_timeout_sees_the_failure_value() {
    let mut chain = Chain::start_without(&[compute(4), compute(5), compute(6)]).await;
    let holders = silent_workers(&chain, 4..=6);

    // Same call and wait budget as fleet-ctl.
    let outcome = forward(
        &chain.path(Slot::dispatch()),
        &Request::new(2, 4.0),
        relay_config().client_timeout(),
    )
    .await;

    // The router times out first and its -1 travels all the way back.
    assert_eq!(outcome, Outcome::Failed(Failure::Propagated));
    assert_eq!(chain.stats(router(2)).failed(), 1);
    assert_eq!(chain.stats(Slot::dispatch()).failed(), 1);

    for holder in holders {
        holder.abort();
    }
    chain.stop().await;
}
