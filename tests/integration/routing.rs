use crate::*;

#[tokio::test]
async fn requesters_are_split_by_parity() {
    let mut chain = Chain::start().await;

    for id in [1, 3, 5, -7] {
        chain.ask(id, 4.0).await;
    }
    for id in [2, 4, 0] {
        chain.ask(id, 4.0).await;
    }

    assert_eq!(chain.stats(router(1)).handled(), 4);
    assert_eq!(chain.stats(router(2)).handled(), 3);
    assert_eq!(chain.stats(Slot::dispatch()).selections(1), 4);
    assert_eq!(chain.stats(Slot::dispatch()).selections(2), 3);
    chain.stop().await;
}

#[tokio::test]
async fn each_router_stays_within_its_workers() {
    let mut chain = Chain::start().await;

    for i in 0..30 {
        chain.ask(2 * i + 1, 1.0).await;
    }
    assert_eq!(chain.computed_by(1..=3), 30);
    assert_eq!(chain.computed_by(4..=6), 0);

    for i in 0..30 {
        chain.ask(2 * i, 1.0).await;
    }
    assert_eq!(chain.computed_by(1..=3), 30);
    assert_eq!(chain.computed_by(4..=6), 30);
    chain.stop().await;
}

#[tokio::test]
async fn answers_are_square_roots() {
    let mut chain = Chain::start().await;

    assert_eq!(chain.ask(4, 16.0).await, 4.0);
    assert_eq!(chain.ask(5, 0.0).await, 0.0);
    assert_eq!(chain.ask(6, 1e6).await, 1000.0);
    let root2 = chain.ask(7, 2.0).await;
    assert!((root2 - 1.41421356).abs() < 1e-8, "got {root2}");
    chain.stop().await;
}

#[tokio::test]
async fn one_request_touches_one_worker() {
    let mut chain = Chain::start().await;

    assert_eq!(chain.ask(3, 9.0).await, 3.0);

    let served: Vec<u64> = (1..=3).map(|k| chain.stats(compute(k)).served()).collect();
    assert_eq!(served.iter().sum::<u64>(), 1);
    assert_eq!(served.iter().filter(|n| **n == 1).count(), 1);
    assert_eq!(chain.computed_by(4..=6), 0);
    assert_eq!(chain.stats(router(2)).handled(), 0);
    chain.stop().await;
}
