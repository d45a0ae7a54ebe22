//! Concurrent publish/subscribe/unsubscribe tests.
//!
//! Run with: cargo test --test concurrency -- --nocapture

use hookbot::{Broker, BrokerConfig, HookbotError, OverflowPolicy};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

const PUBLISHERS: usize = 8;
const MESSAGES_PER_PUBLISHER: usize = 500;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::INFO)
        .try_init();
}

fn test_broker() -> Arc<Broker> {
    Arc::new(Broker::new(BrokerConfig {
        buffer_size: PUBLISHERS * MESSAGES_PER_PUBLISHER,
        ..Default::default()
    }))
}

#[test]
fn test_concurrent_publishers_no_loss_no_duplicates() {
    let broker = test_broker();
    let sub = broker.subscribe("/load/?recursive").unwrap();
    let barrier = Arc::new(Barrier::new(PUBLISHERS));

    let start = Instant::now();
    let handles: Vec<_> = (0..PUBLISHERS)
        .map(|p| {
            let broker = Arc::clone(&broker);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..MESSAGES_PER_PUBLISHER {
                    broker
                        .publish(&format!("/load/{}", p), format!("{}:{}", p, i))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    println!(
        "  {} publishes took {:.2}ms",
        PUBLISHERS * MESSAGES_PER_PUBLISHER,
        start.elapsed().as_secs_f64() * 1000.0
    );

    let mut seen = HashSet::new();
    let mut last_per_publisher = vec![None; PUBLISHERS];
    while let Ok(envelope) = sub.try_recv() {
        let body = envelope.body_str().unwrap().to_string();
        let (p, i) = body.split_once(':').unwrap();
        let (p, i): (usize, usize) = (p.parse().unwrap(), i.parse().unwrap());

        // Per-publisher FIFO holds within one subscription.
        if let Some(prev) = last_per_publisher[p] {
            assert!(i > prev, "out of order for publisher {}", p);
        }
        last_per_publisher[p] = Some(i);

        assert!(seen.insert(body), "duplicate delivery");
    }
    assert_eq!(seen.len(), PUBLISHERS * MESSAGES_PER_PUBLISHER);
}

#[test]
fn test_subscribe_unsubscribe_churn_during_publish() {
    let broker = test_broker();
    let stable = broker.subscribe("/churn").unwrap();
    let stop = Arc::new(AtomicBool::new(false));

    let churners: Vec<_> = (0..4)
        .map(|_| {
            let broker = Arc::clone(&broker);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut cycles = 0usize;
                while !stop.load(Ordering::Relaxed) {
                    let sub = broker.subscribe("/churn").unwrap();
                    broker.unsubscribe(sub.id());
                    broker.unsubscribe(sub.id());
                    // Whatever arrived before removal, then closure.
                    while sub.recv_timeout(Duration::from_secs(5)).is_ok() {}
                    cycles += 1;
                }
                cycles
            })
        })
        .collect();

    for i in 0..2000 {
        broker.publish("/churn", format!("{}", i)).unwrap();
    }
    stop.store(true, Ordering::Relaxed);

    let cycles: usize = churners.into_iter().map(|h| h.join().unwrap()).sum();
    println!("  {} subscribe/unsubscribe cycles", cycles);

    assert_eq!(broker.subscription_count(), 1);
    for i in 0..2000 {
        assert_eq!(stable.try_recv().unwrap().body(), format!("{}", i).as_bytes());
    }
    assert!(stable.try_recv().is_err());
}

#[test]
fn test_stalled_subscriber_does_not_block_others() {
    init_tracing();
    let broker = Arc::new(Broker::new(BrokerConfig {
        buffer_size: 64,
        overflow: OverflowPolicy::DropMessage,
        ..Default::default()
    }));
    let stalled = broker.subscribe("/hooks").unwrap();
    let reader = broker.subscribe("/hooks").unwrap();

    let consumer = thread::spawn(move || {
        let mut received = 0u64;
        while reader.recv().is_ok() {
            received += 1;
        }
        (received, reader.stats())
    });

    let start = Instant::now();
    for i in 0..1000 {
        broker.publish("/hooks", format!("{}", i)).unwrap();
    }
    let elapsed = start.elapsed();
    broker.shutdown();

    let (received, reader_stats) = consumer.join().unwrap();
    println!("  1000 publishes took {:.2}ms", elapsed.as_secs_f64() * 1000.0);

    assert!(elapsed < Duration::from_secs(10));
    assert_eq!(received, reader_stats.delivered);
    assert_eq!(reader_stats.delivered + reader_stats.dropped, 1000);

    let stalled_stats = stalled.stats();
    assert_eq!(stalled_stats.delivered, 64);
    assert_eq!(stalled_stats.dropped, 936);
    assert_eq!(broker.stats().published, 1000);
}

#[test]
fn test_shutdown_races_with_publishers() {
    let broker = test_broker();
    let sub = broker.subscribe("/race").unwrap();

    let publishers: Vec<_> = (0..4)
        .map(|_| {
            let broker = Arc::clone(&broker);
            thread::spawn(move || loop {
                match broker.publish("/race", "x") {
                    Ok(()) => continue,
                    Err(HookbotError::ShutDown) => break,
                    Err(e) => panic!("unexpected error: {}", e),
                }
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    broker.shutdown();

    for handle in publishers {
        handle.join().unwrap();
    }

    // Drains whatever was buffered, then observes closure.
    while sub.recv_timeout(Duration::from_secs(5)).is_ok() {}
    assert!(sub.try_recv().is_err());
}
