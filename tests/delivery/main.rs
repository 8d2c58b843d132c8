//! End-to-end delivery guarantees: atomic capture, at-least-once dispatch,
//! terminal success, ordering, and quarantine.


use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use outbox_rust::{
    Aggregate, DispatchRegistry, MemoryStore, OutboxPublisher, OutboxStore, PublisherThread,
    Repository, StoreError,
};

use orders::{Order, OrderPaid, OrderPlaced};

fn counting_registry(calls: &Arc<AtomicUsize>) -> DispatchRegistry {
    let mut registry = DispatchRegistry::new();
    let counter = Arc::clone(calls);
    registry.register(OrderPlaced::EVENT_TYPE, move |_: &OrderPlaced| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    registry
}

fn wait_until(deadline: Duration, condition: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn rolled_back_operation_leaves_no_records() {
    let store = MemoryStore::new();

    let mut order = Order::place("order-1", 4200);
    store.commit(&mut order).unwrap();
    assert_eq!(store.peek_outbox().unwrap().len(), 1);

    // A concurrent writer loses: its row change and its captured event
    // vanish together.
    let mut stale = Order::place("order-1", 9999);
    let result = store.commit(&mut stale);
    assert!(matches!(result, Err(StoreError::ConcurrentWrite { .. })));

    assert_eq!(store.peek_outbox().unwrap().len(), 1);
    let fetched: Order = store.get("order-1").unwrap().unwrap();
    assert_eq!(fetched.total_cents, 4200);
}

#[test]
fn failed_delivery_is_retried_on_the_next_poll() {
    let store = MemoryStore::new();
    let mut order = Order::place("order-1", 4200);
    store.commit(&mut order).unwrap();

    // Fails on the first attempt, succeeds on the second.
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let mut registry = DispatchRegistry::new();
    registry.register(OrderPlaced::EVENT_TYPE, move |_: &OrderPlaced| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err("warehouse service unavailable".into());
        }
        Ok(())
    });

    let publisher = OutboxPublisher::new(store.clone(), Arc::new(registry));

    let result = publisher.run_once();
    assert_eq!(result.failed, 1);
    let record = &store.peek_outbox().unwrap()[0];
    assert!(record.is_undelivered());
    assert_eq!(record.retry_count, 1);
    assert!(record
        .last_error
        .as_deref()
        .unwrap()
        .contains("warehouse service unavailable"));

    let result = publisher.run_once();
    assert_eq!(result.delivered, 1);
    assert!(store.peek_outbox().unwrap()[0].is_delivered());
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn delivered_records_are_never_reprocessed() {
    let store = MemoryStore::new();
    let mut order = Order::place("order-1", 4200);
    store.commit(&mut order).unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let publisher = OutboxPublisher::new(store.clone(), Arc::new(counting_registry(&calls)));

    publisher.run_once();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    for _ in 0..5 {
        let result = publisher.run_once();
        assert_eq!(result.fetched, 0);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn quarantine_after_exactly_max_retries_failures() {
    let store = MemoryStore::new();
    let mut order = Order::place("order-1", 4200);
    store.commit(&mut order).unwrap();

    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let mut registry = DispatchRegistry::new();
    registry.register(OrderPlaced::EVENT_TYPE, move |_: &OrderPlaced| {
        counter.fetch_add(1, Ordering::SeqCst);
        Err("audit sink rejects the payload".into())
    });

    let publisher = OutboxPublisher::new(store.clone(), Arc::new(registry)).with_max_retries(3);

    for _ in 0..3 {
        publisher.run_once();
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 3);

    // No further polls select the record.
    let result = publisher.run_once();
    assert_eq!(result.fetched, 0);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);

    let quarantined = store.quarantined().unwrap();
    assert_eq!(quarantined.len(), 1);
    assert_eq!(quarantined[0].retry_count, 3);
    assert!(quarantined[0]
        .last_error
        .as_deref()
        .unwrap()
        .contains("audit sink rejects the payload"));
}

#[test]
fn events_from_one_transaction_dispatch_in_capture_order() {
    let store = MemoryStore::new();

    // One operation, two events: placed then paid.
    let mut order = Order::place("order-1", 4200);
    order.pay();
    store.commit(&mut order).unwrap();
    assert_eq!(store.undelivered_count().unwrap(), 2);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut registry = DispatchRegistry::new();
    let placed_sink = Arc::clone(&seen);
    registry.register(OrderPlaced::EVENT_TYPE, move |_: &OrderPlaced| {
        placed_sink.lock().unwrap().push("OrderPlaced");
        Ok(())
    });
    let paid_sink = Arc::clone(&seen);
    registry.register(OrderPaid::EVENT_TYPE, move |_: &OrderPaid| {
        paid_sink.lock().unwrap().push("OrderPaid");
        Ok(())
    });

    let publisher = OutboxPublisher::new(store.clone(), Arc::new(registry));

    // First poll delivers both, in occurrence order.
    let result = publisher.run_once();
    assert_eq!(result.delivered, 2);
    assert_eq!(*seen.lock().unwrap(), vec!["OrderPlaced", "OrderPaid"]);

    // Second poll selects nothing.
    let result = publisher.run_once();
    assert_eq!(result.fetched, 0);
}

#[test]
fn unknown_event_type_is_retried_then_quarantined() {
    let store = MemoryStore::new();
    let mut order = Order::place("order-1", 4200);
    store.commit(&mut order).unwrap();

    // The registry knows nothing about OrderPlaced.
    let mut registry = DispatchRegistry::new();
    registry.register(OrderPaid::EVENT_TYPE, |_: &OrderPaid| Ok(()));

    let publisher = OutboxPublisher::new(store.clone(), Arc::new(registry)).with_max_retries(3);

    publisher.run_once();
    let record = &store.peek_outbox().unwrap()[0];
    assert!(record.is_undelivered());
    assert_eq!(record.retry_count, 1);
    assert!(record
        .last_error
        .as_deref()
        .unwrap()
        .contains("no subscribers registered"));

    publisher.run_once();
    publisher.run_once();

    let quarantined = store.quarantined().unwrap();
    assert_eq!(quarantined.len(), 1);
    assert!(quarantined[0]
        .last_error
        .as_deref()
        .unwrap()
        .contains("no subscribers registered"));
}

#[test]
fn background_loop_drains_commits_across_aggregates() {
    let store = MemoryStore::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let publisher = OutboxPublisher::new(store.clone(), Arc::new(counting_registry(&calls)));
    let worker = PublisherThread::spawn(publisher, Duration::from_millis(10));

    let mut first = Order::place("order-1", 4200);
    let mut second = Order::place("order-2", 100);
    store
        .commit_all(&mut [&mut first as &mut dyn Aggregate, &mut second])
        .unwrap();
    worker.wake();

    assert!(wait_until(Duration::from_secs(2), || {
        store.undelivered_count().unwrap() == 0
    }));

    let stats = worker.stop();
    assert_eq!(stats.delivered, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(store.quarantined().unwrap().is_empty());
}

#[cfg(feature = "emitter")]
#[test]
fn emitter_bridge_fans_out_delivered_events() {
    use outbox_rust::{EmitterSubscriber, EventEmitter};

    let store = MemoryStore::new();
    let mut order = Order::place("order-1", 4200);
    store.commit(&mut order).unwrap();

    let mut emitter = EventEmitter::new();
    let heard = Arc::new(AtomicUsize::new(0));
    let listener = Arc::clone(&heard);
    emitter.on("OrderPlaced", move |payload: String| {
        assert!(payload.contains("order-1"));
        listener.fetch_add(1, Ordering::SeqCst);
    });

    let mut registry = DispatchRegistry::new();
    registry.register::<OrderPlaced, _>(OrderPlaced::EVENT_TYPE, EmitterSubscriber::new(emitter));

    let publisher = OutboxPublisher::new(store.clone(), Arc::new(registry));
    let result = publisher.run_once();
    assert_eq!(result.delivered, 1);

    // EventEmitter runs listeners asynchronously, give it time
    assert!(wait_until(Duration::from_secs(1), || {
        heard.load(Ordering::SeqCst) == 1
    }));
}
