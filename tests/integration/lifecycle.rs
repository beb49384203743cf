use crate::*;

#[tokio::test]
async fn stopping_unlinks_every_endpoint() {
    let mut chain = Chain::start().await;
    let paths: Vec<PathBuf> = spawn_waves()
        .into_iter()
        .flatten()
        .map(|slot| chain.path(slot))
        .collect();
    assert!(paths.iter().all(|p| p.exists()));

    chain.stop().await;
    for path in paths {
        assert!(!path.exists(), "{} left behind", path.display());
    }
}

#[tokio::test]
async fn counters_agree_across_tiers() {
    let mut chain = Chain::start().await;

    for id in 0..40 {
        let value = if id % 10 == 9 { -1.5 } else { id as f64 };
        chain.ask(id, value).await;
    }

    let dispatch = chain.stats(Slot::dispatch());
    assert_eq!(dispatch.handled(), 40);
    assert_eq!(dispatch.served(), 36);
    assert_eq!(dispatch.failed(), 4);

    let routed = chain.stats(router(1)).handled() + chain.stats(router(2)).handled();
    assert_eq!(routed, 40);
    assert_eq!(chain.computed_by(1..=6), 36);
    chain.stop().await;
}

#[tokio::test]
async fn concurrent_clients_are_served_one_at_a_time() {
    let mut chain = Chain::start().await;
    let dispatch = chain.path(Slot::dispatch());

    let clients: Vec<_> = (1..=12)
        .map(|id| {
            let dispatch = dispatch.clone();
            tokio::spawn(async move {
                let mut stream = UnixStream::connect(&dispatch).await.unwrap();
                let value = (id * id) as f64;
                stream
                    .write_all(Request::new(id, value).as_bytes())
                    .await
                    .unwrap();
                let mut reply = [0u8; 8];
                stream.read_exact(&mut reply).await.unwrap();
                (id, f64::from_ne_bytes(reply))
            })
        })
        .collect();

    for client in clients {
        let (id, result) = client.await.unwrap();
        assert_eq!(result, id as f64);
    }
    assert_eq!(chain.stats(Slot::dispatch()).served(), 12);
    chain.stop().await;
}
