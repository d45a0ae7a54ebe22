//! Error handling and edge case tests.

use hookbot::{decode, Broker, BrokerConfig, HookbotError, OverflowPolicy, WireFormat};

fn test_broker() -> Broker {
    Broker::new(BrokerConfig::default())
}

// --- Malformed Topics ---

#[test]
fn test_publish_malformed_topic() {
    let broker = test_broker();

    for topic in ["", "no-leading-slash", "/a//b", "/a/../b", "/with space"] {
        let result = broker.publish(topic, "x");
        assert!(
            matches!(result, Err(HookbotError::MalformedTopic { .. })),
            "expected {:?} to be rejected",
            topic
        );
    }
    assert_eq!(broker.stats().published, 0);
}

#[test]
fn test_publish_rejects_recursive_marker() {
    let broker = test_broker();
    let result = broker.publish("/a/?recursive", "x");
    assert!(matches!(result, Err(HookbotError::MalformedTopic { .. })));
}

#[test]
fn test_subscribe_rejects_unknown_flag() {
    let broker = test_broker();

    let result = broker.subscribe("/a?deep");
    assert!(matches!(result, Err(HookbotError::MalformedTopic { .. })));
    assert_eq!(broker.subscription_count(), 0);
}

#[test]
fn test_malformed_topic_message_names_topic() {
    let err = test_broker().subscribe("/a//b").unwrap_err();
    assert!(err.to_string().contains("/a//b"), "{}", err);
}

// --- Decode Errors ---

#[test]
fn test_decode_garbage() {
    let result = decode(b"{\"Body\":", WireFormat::Json);
    assert!(matches!(result, Err(HookbotError::Decode(_))));

    let result = decode(b"\x93\x01\x02", WireFormat::MessagePack);
    assert!(matches!(result, Err(HookbotError::Decode(_))));
}

#[test]
fn test_decode_ignores_unknown_fields() {
    let envelope = decode(br#"{"Body":"hi","Extra":true}"#, WireFormat::Json).unwrap();
    assert_eq!(envelope.body(), b"hi");
}

// --- Lifecycle ---

#[test]
fn test_operations_after_shutdown() {
    let broker = test_broker();
    let sub = broker.subscribe("/a").unwrap();
    broker.shutdown();

    assert!(matches!(broker.publish("/a", "x"), Err(HookbotError::ShutDown)));
    assert!(matches!(broker.subscribe("/a"), Err(HookbotError::ShutDown)));

    // Neither of these is an error.
    broker.unsubscribe(sub.id());
    broker.shutdown();
}

#[test]
fn test_slow_subscriber_never_fails_publish() {
    let broker = Broker::new(BrokerConfig {
        buffer_size: 1,
        overflow: OverflowPolicy::DropMessage,
        ..Default::default()
    });
    let _slow = broker.subscribe("/a").unwrap();
    let fast = broker.subscribe("/a").unwrap();

    for i in 0..10 {
        broker.publish("/a", format!("{}", i)).unwrap();
        assert_eq!(fast.try_recv().unwrap().body(), format!("{}", i).as_bytes());
    }
    assert_eq!(broker.stats().dropped, 9);
}
