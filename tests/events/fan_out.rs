//! Channel fan-out semantics.

use std::thread;

use serde_json::Value;
use service_queue::{
    Delivery, EventManager, EventManagerConfig, QueueError, Service, ServiceRegistry,
};

use crate::support::{listener, picky_listener, Recorder};

#[test]
fn send_reaches_every_subscriber_of_the_channel_only() {
    let recorder = Recorder::new();
    let registry = ServiceRegistry::new();
    let s1 = registry.register(listener("s1", "orders", &recorder)).unwrap();
    let s2 = registry.register(listener("s2", "orders", &recorder)).unwrap();
    let s3 = registry.register(listener("s3", "orders", &recorder)).unwrap();
    let s4 = registry.register(listener("s4", "refunds", &recorder)).unwrap();

    let delivery = registry.events().send("orders", "order-1").unwrap();
    assert_eq!(delivery, Delivery { delivered: 3, dropped: 0 });

    for queue in [&s1, &s2, &s3, &s4] {
        queue.flush().unwrap();
    }

    let mut seen = recorder.entries();
    seen.sort();
    assert_eq!(seen, vec!["s1:order-1", "s2:order-1", "s3:order-1"]);
    assert_eq!(recorder.count_of("s4:"), 0);
    registry.stop_all().unwrap();
}

#[test]
fn each_subscriber_sees_events_in_send_order() {
    let recorder = Recorder::new();
    let registry = ServiceRegistry::new();
    let queue = registry.register(listener("s1", "ticks", &recorder)).unwrap();

    for tick in 0..50 {
        registry.events().send("ticks", &tick.to_string()).unwrap();
    }
    queue.flush().unwrap();

    let expected: Vec<String> = (0..50).map(|tick| format!("s1:{tick}")).collect();
    assert_eq!(recorder.entries(), expected);
    registry.stop_all().unwrap();
}

#[test]
fn send_array_spreads_arguments() {
    let registry = ServiceRegistry::new();
    let queue = registry
        .register(
            Service::new(Vec::<(String, i64)>::new())
                .named("payroll")
                .on_event("salary", "adjust", |rows, ctx| {
                    rows.push((ctx.arg(0)?, ctx.arg(1)?));
                    Ok(Value::Null)
                })
                .method("rows", |rows, _ctx| Ok(serde_json::to_value(&*rows)?)),
        )
        .unwrap();

    registry.events().send_array("salary", &("Rick", 100)).unwrap();
    // A single payload is always one argument, even when it is a list.
    registry.events().send("salary", &vec!["ignored"]).unwrap();
    queue.flush().unwrap();

    let rows = queue
        .enqueue_and_wait("rows", service_queue::Args::empty())
        .unwrap();
    assert_eq!(rows, serde_json::json!([["Rick", 100]]));
    // The second event failed to decode its missing salary; the first stuck.
    assert_eq!(queue.stats().tasks_failed, 1);
    registry.stop_all().unwrap();
}

#[test]
fn failing_subscriber_does_not_block_others() {
    let recorder = Recorder::new();
    let registry = ServiceRegistry::new();
    let picky = registry
        .register(picky_listener("picky", "orders", "bad", &recorder))
        .unwrap();
    let easy = registry.register(listener("easy", "orders", &recorder)).unwrap();

    registry.events().send("orders", "bad").unwrap();
    registry.events().send("orders", "good").unwrap();
    picky.flush().unwrap();
    easy.flush().unwrap();

    assert_eq!(recorder.count_of("easy:"), 2);
    assert_eq!(recorder.entries().iter().filter(|e| *e == "picky:good").count(), 1);
    assert_eq!(picky.stats().tasks_failed, 1);
    registry.stop_all().unwrap();
}

#[test]
fn stopped_subscriber_misses_events_without_failing_send() {
    let recorder = Recorder::new();
    let registry = ServiceRegistry::new();
    let gone = registry.register(listener("gone", "orders", &recorder)).unwrap();
    let here = registry.register(listener("here", "orders", &recorder)).unwrap();

    gone.stop().unwrap();
    let delivery = registry.events().send("orders", "order-2").unwrap();
    assert_eq!(delivery, Delivery { delivered: 1, dropped: 1 });

    here.flush().unwrap();
    assert_eq!(recorder.entries(), vec!["here:order-2"]);
    registry.stop_all().unwrap();
}

#[test]
fn unsubscribed_methods_stop_receiving() {
    let recorder = Recorder::new();
    let registry = ServiceRegistry::new();
    let queue = registry.register(listener("s1", "orders", &recorder)).unwrap();

    let handle = registry.events().subscribe("orders", &queue, "on_event").unwrap();
    assert_eq!(registry.events().subscribers("orders").unwrap().len(), 1);

    assert!(registry.events().unsubscribe(&handle).unwrap());
    assert!(!registry.events().unsubscribe(&handle).unwrap());
    let delivery = registry.events().send("orders", "order-3").unwrap();
    assert_eq!(delivery, Delivery::default());

    queue.flush().unwrap();
    assert!(recorder.entries().is_empty());
    registry.stop_all().unwrap();
}

#[test]
fn unknown_channels_are_ignored_unless_strict() {
    let relaxed = EventManager::new();
    assert_eq!(relaxed.send("nobody", "hello").unwrap(), Delivery::default());

    let strict = EventManager::with_config(EventManagerConfig::new().with_strict_channels(true));
    match strict.send("nobody", "hello") {
        Err(QueueError::UnknownChannel(channel)) => assert_eq!(channel, "nobody"),
        other => panic!("expected unknown channel, got {other:?}"),
    }
}

#[test]
fn stop_all_unbinds_every_service() {
    let recorder = Recorder::new();
    let registry = ServiceRegistry::new();
    registry.register(listener("s1", "orders", &recorder)).unwrap();
    registry.register(listener("s2", "refunds", &recorder)).unwrap();
    assert_eq!(registry.events().channels().unwrap(), vec!["orders", "refunds"]);

    let stopped = registry.stop_all().unwrap();
    let names: Vec<&str> = stopped.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["s1", "s2"]);
    assert!(registry.events().channels().unwrap().is_empty());
}

#[test]
fn non_finite_payloads_are_refused_before_delivery() {
    let registry = ServiceRegistry::new();
    let queue = registry
        .register(
            Service::new(Vec::<(String, f64)>::new())
                .named("payroll")
                .on_event("salary", "adjust", |rows, ctx| {
                    rows.push((ctx.arg(0)?, ctx.arg(1)?));
                    Ok(Value::Null)
                })
                .method("rows", |rows, _ctx| Ok(serde_json::to_value(&*rows)?)),
        )
        .unwrap();

    for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let err = registry.events().send_array("salary", &("Rick", bad)).unwrap_err();
        assert!(matches!(err, QueueError::Encode(_)), "got {err:?}");
        assert!(registry.events().send("salary", &bad).is_err());
    }

    let delivery = registry.events().send_array("salary", &("Rick", 100.75)).unwrap();
    assert_eq!(delivery.delivered, 1);
    queue.flush().unwrap();

    let rows = queue
        .enqueue_and_wait("rows", service_queue::Args::empty())
        .unwrap();
    assert_eq!(rows, serde_json::json!([["Rick", 100.75]]));
    let stats = queue.stats();
    assert_eq!(stats.tasks_failed, 0);
    assert_eq!(stats.tasks_handled, 2);
    registry.stop_all().unwrap();
}

#[test]
fn subscription_churn_during_sends_is_consistent() {
    let recorder = Recorder::new();
    let registry = ServiceRegistry::new();
    let steady = registry.register(listener("steady", "orders", &recorder)).unwrap();
    let fickle = registry.register(listener("fickle", "orders", &recorder)).unwrap();
    let bystander = registry.register(listener("bystander", "refunds", &recorder)).unwrap();
    let events = registry.events().clone();

    let churn = {
        let events = events.clone();
        let fickle = fickle.clone();
        thread::spawn(move || {
            // Subscribing an existing binding hands back its handle.
            let mut handle = events.subscribe("orders", &fickle, "on_event").unwrap();
            for _ in 0..200 {
                assert!(events.unsubscribe(&handle).unwrap());
                handle = events.subscribe("orders", &fickle, "on_event").unwrap();
            }
            assert!(events.unsubscribe(&handle).unwrap());
        })
    };

    for seq in 0..200 {
        let delivery = events.send("orders", &seq.to_string()).unwrap();
        assert_eq!(delivery.dropped, 0);
        assert!((1..=2).contains(&delivery.delivered), "{delivery:?}");
    }
    churn.join().unwrap();

    // fickle ended unsubscribed: later events reach steady alone.
    let delivery = events.send("orders", "late").unwrap();
    assert_eq!(delivery, Delivery { delivered: 1, dropped: 0 });
    for queue in [&steady, &fickle, &bystander] {
        queue.flush().unwrap();
    }

    let entries = recorder.entries();
    let steady_seen: Vec<&str> = entries
        .iter()
        .filter_map(|e| e.strip_prefix("steady:"))
        .collect();
    let mut expected: Vec<String> = (0..200).map(|seq| seq.to_string()).collect();
    expected.push("late".to_string());
    assert_eq!(steady_seen, expected);

    assert!(recorder.count_of("fickle:") <= 200);
    assert!(!entries.iter().any(|e| e == "fickle:late"));
    assert_eq!(recorder.count_of("bystander:"), 0);
    registry.stop_all().unwrap();
}
