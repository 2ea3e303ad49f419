use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use distributed_lock::{
    AcquireOptions, DistributedLockError, LeaseStore, LockConfig, LockGuard, LockManager, LockState,
    MemoryLeaseStore, ReleaseOutcome,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn manager_with(store: Arc<dyn LeaseStore>, watchdog_timeout_ms: u64) -> LockManager {
    let config = LockConfig {
        watchdog_timeout_ms,
        retry_min_delay_ms: 5,
        retry_max_delay_ms: 50,
        ..LockConfig::default()
    };
    LockManager::new(store, config).unwrap()
}

#[test]
fn test_concurrent_acquire_is_mutually_exclusive() {
    init_logger();
    let store = Arc::new(MemoryLeaseStore::new());
    let manager = Arc::new(manager_with(store, 2_000));
    let inside = Arc::new(AtomicUsize::new(0));
    let max_inside = Arc::new(AtomicUsize::new(0));
    let completed = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(8));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let manager = manager.clone();
            let inside = inside.clone();
            let max_inside = max_inside.clone();
            let completed = completed.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let options = AcquireOptions::watchdog().with_timeout(Duration::from_secs(10));
                let handle = manager.acquire("Test-Lock", &options).unwrap();
                let now_inside = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now_inside, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                inside.fetch_sub(1, Ordering::SeqCst);
                assert_eq!(manager.release(&handle).unwrap(), ReleaseOutcome::Released);
                completed.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    assert_eq!(completed.load(Ordering::SeqCst), 8);
}

#[test]
fn test_watchdog_keeps_lease_through_long_critical_section() {
    init_logger();
    let store = Arc::new(MemoryLeaseStore::new());
    let manager = manager_with(store.clone(), 300);
    let handle = manager.acquire("Test-Lock", &AcquireOptions::watchdog()).unwrap();
    let token = handle.owner_token().to_string();

    // more than three lease lifetimes, checked every 50ms
    let started = Instant::now();
    while started.elapsed() < Duration::from_millis(1_000) {
        let lease = store.lease("Test-Lock").expect("lease disappeared while held");
        assert_eq!(lease.owner_token, token);
        assert!(handle.ensure_held().is_ok());
        thread::sleep(Duration::from_millis(50));
    }

    // the delete succeeds only if our lease never lapsed in between
    assert_eq!(manager.release(&handle).unwrap(), ReleaseOutcome::Released);
    assert!(store.lease("Test-Lock").is_none());
}

#[test]
fn test_fixed_lease_expires_without_release() {
    init_logger();
    let store = Arc::new(MemoryLeaseStore::new());
    let manager = manager_with(store, 30_000);

    let first = manager
        .try_acquire("Test-Lock-Time", Duration::from_millis(400), Duration::ZERO)
        .unwrap();
    assert!(!first.is_renewing());
    assert!(matches!(
        manager.try_acquire("Test-Lock-Time", Duration::from_millis(400), Duration::ZERO),
        Err(DistributedLockError::AcquisitionTimeout { .. })
    ));

    thread::sleep(Duration::from_millis(450));
    let second = manager
        .try_acquire("Test-Lock-Time", Duration::from_millis(400), Duration::from_millis(100))
        .unwrap();
    assert_eq!(second.state(), LockState::Held);

    // the first owner finds its lease gone and must not delete the second one
    assert_eq!(first.release().unwrap(), ReleaseOutcome::Expired);
    assert_eq!(second.release().unwrap(), ReleaseOutcome::Released);
}

#[test]
fn test_acquire_timeout_is_bounded() {
    init_logger();
    let store = Arc::new(MemoryLeaseStore::new());
    let manager = manager_with(store, 30_000);
    let _holder = manager.acquire("Test-Lock", &AcquireOptions::watchdog()).unwrap();

    let started = Instant::now();
    let result = manager.acquire(
        "Test-Lock",
        &AcquireOptions::watchdog().with_timeout(Duration::from_secs(1)),
    );
    let elapsed = started.elapsed();

    match result {
        Err(DistributedLockError::AcquisitionTimeout { key, waited }) => {
            assert_eq!(key, "Test-Lock");
            assert!(waited >= Duration::from_secs(1));
        }
        other => panic!("expected acquisition timeout, got {:?}", other),
    }
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_millis(1_300), "took {:?}", elapsed);
}

#[test]
fn test_waiter_gets_lock_after_release() {
    init_logger();
    let store = Arc::new(MemoryLeaseStore::new());
    let manager = Arc::new(manager_with(store, 30_000));
    let holder = manager.acquire("Test-Lock", &AcquireOptions::watchdog()).unwrap();

    let waiter_manager = manager.clone();
    let waiter = thread::spawn(move || {
        let options = AcquireOptions::watchdog().with_timeout(Duration::from_secs(5));
        let handle = waiter_manager.acquire("Test-Lock", &options).unwrap();
        let acquired_at = Instant::now();
        waiter_manager.release(&handle).unwrap();
        acquired_at
    });

    thread::sleep(Duration::from_millis(200));
    let released_at = Instant::now();
    assert_eq!(manager.release(&holder).unwrap(), ReleaseOutcome::Released);
    let acquired_at = waiter.join().unwrap();
    assert!(acquired_at >= released_at);
}

#[test]
fn test_mismatched_owner_cannot_touch_lease() {
    init_logger();
    let store = Arc::new(MemoryLeaseStore::new());
    let manager = manager_with(store.clone(), 30_000);
    let handle = manager
        .try_acquire("Test-Lock", Duration::from_secs(5), Duration::ZERO)
        .unwrap();
    let before = store.lease("Test-Lock").unwrap();

    assert!(!store.extend("Test-Lock", "someone-else", Duration::from_secs(60)).unwrap());
    assert!(!store.delete_if_owner("Test-Lock", "someone-else").unwrap());
    assert_eq!(store.lease("Test-Lock"), Some(before));
    assert!(handle.remaining_ttl().unwrap().unwrap() <= Duration::from_secs(5));
}

#[test]
fn test_guard_releases_on_drop() {
    init_logger();
    let store = Arc::new(MemoryLeaseStore::new());
    let manager = manager_with(store.clone(), 30_000);
    {
        let guard = LockGuard::new(manager.acquire("Test-Lock", &AcquireOptions::watchdog()).unwrap());
        assert!(guard.is_renewing());
        assert!(store.lease("Test-Lock").is_some());
    }
    assert!(store.lease("Test-Lock").is_none());
    assert_eq!(manager.active_renewals(), 0);

    let guard: LockGuard = manager
        .try_acquire("Test-Lock", Duration::from_secs(5), Duration::ZERO)
        .unwrap()
        .into();
    assert_eq!(guard.release().unwrap(), ReleaseOutcome::Released);
}

/// Memory store whose `extend` takes `delay` and then fails, like a store
/// that stopped answering.
struct UnreachableOnExtend {
    inner: MemoryLeaseStore,
    delay: Duration,
}

impl LeaseStore for UnreachableOnExtend {
    fn try_create(&self, key: &str, owner_token: &str, ttl: Duration) -> distributed_lock::Result<bool> {
        self.inner.try_create(key, owner_token, ttl)
    }

    fn extend(&self, _key: &str, _owner_token: &str, _ttl: Duration) -> distributed_lock::Result<bool> {
        thread::sleep(self.delay);
        Err(DistributedLockError::StoreUnavailable("connection timed out".to_string()))
    }

    fn delete_if_owner(&self, key: &str, owner_token: &str) -> distributed_lock::Result<bool> {
        self.inner.delete_if_owner(key, owner_token)
    }

    fn remaining_ttl(&self, key: &str) -> distributed_lock::Result<Option<Duration>> {
        self.inner.remaining_ttl(key)
    }
}

#[test]
fn test_lease_expiring_during_outage_is_never_reported_held() {
    init_logger();
    let store = Arc::new(UnreachableOnExtend {
        inner: MemoryLeaseStore::new(),
        delay: Duration::from_millis(150),
    });
    let manager = manager_with(store.clone(), 300);
    let handle = manager.acquire("Test-Lock", &AcquireOptions::watchdog()).unwrap();

    thread::sleep(Duration::from_millis(400));
    let other = store.try_create("Test-Lock", "other-owner", Duration::from_secs(5)).unwrap();
    assert!(other);
    assert_eq!(handle.state(), LockState::Lost);
    assert!(!handle.is_held());
    assert!(matches!(handle.ensure_held(), Err(DistributedLockError::LeaseLost(_))));
    assert!(matches!(handle.release(), Err(DistributedLockError::LeaseLost(_))));
    assert_eq!(store.inner.lease("Test-Lock").unwrap().owner_token, "other-owner");
}

#[test]
fn test_lease_reads_lost_while_renewal_is_still_pending() {
    init_logger();
    let store = Arc::new(UnreachableOnExtend {
        inner: MemoryLeaseStore::new(),
        delay: Duration::from_secs(1),
    });
    let manager = manager_with(store.clone(), 300);
    let handle = manager.acquire("Test-Lock", &AcquireOptions::watchdog()).unwrap();

    // the first extend starts at ~100ms and hangs until ~1.1s
    thread::sleep(Duration::from_millis(200));
    assert!(handle.is_held());
    thread::sleep(Duration::from_millis(200));
    assert_eq!(handle.state(), LockState::Lost);
    assert!(matches!(handle.ensure_held(), Err(DistributedLockError::LeaseLost(_))));
}

/// Memory store whose `extend` reports that it started, then waits for a go
/// signal before running.
struct GatedExtend {
    inner: MemoryLeaseStore,
    entered: Mutex<Sender<()>>,
    proceed: Mutex<Receiver<()>>,
}

impl LeaseStore for GatedExtend {
    fn try_create(&self, key: &str, owner_token: &str, ttl: Duration) -> distributed_lock::Result<bool> {
        self.inner.try_create(key, owner_token, ttl)
    }

    fn extend(&self, key: &str, owner_token: &str, ttl: Duration) -> distributed_lock::Result<bool> {
        let _ = self.entered.lock().unwrap().send(());
        let _ = self.proceed.lock().unwrap().recv_timeout(Duration::from_secs(5));
        self.inner.extend(key, owner_token, ttl)
    }

    fn delete_if_owner(&self, key: &str, owner_token: &str) -> distributed_lock::Result<bool> {
        self.inner.delete_if_owner(key, owner_token)
    }

    fn remaining_ttl(&self, key: &str) -> distributed_lock::Result<Option<Duration>> {
        self.inner.remaining_ttl(key)
    }
}

#[test]
fn test_release_during_inflight_renewal_does_not_resurrect_lease() {
    init_logger();
    let (entered_tx, entered_rx) = mpsc::channel();
    let (proceed_tx, proceed_rx) = mpsc::channel();
    let store = Arc::new(GatedExtend {
        inner: MemoryLeaseStore::new(),
        entered: Mutex::new(entered_tx),
        proceed: Mutex::new(proceed_rx),
    });
    let manager = manager_with(store.clone(), 300);
    let handle = manager.acquire("Test-Lock", &AcquireOptions::watchdog()).unwrap();

    entered_rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(handle.release().unwrap(), ReleaseOutcome::Released);
    proceed_tx.send(()).unwrap();
    thread::sleep(Duration::from_millis(50));

    assert!(store.inner.lease("Test-Lock").is_none());
    assert_eq!(handle.state(), LockState::Released);
    assert_eq!(manager.active_renewals(), 0);
}

#[test]
fn test_unbounded_durations_do_not_panic() {
    init_logger();
    let store = Arc::new(MemoryLeaseStore::new());
    let manager = manager_with(store.clone(), 30_000);

    let options = AcquireOptions::watchdog().with_timeout(Duration::MAX);
    let handle = manager.acquire("Test-Lock", &options).unwrap();
    assert_eq!(handle.release().unwrap(), ReleaseOutcome::Released);

    assert!(matches!(
        manager.try_acquire("Test-Lock", Duration::MAX, Duration::ZERO),
        Err(DistributedLockError::InvalidArgument(_))
    ));
    assert!(store.lease("Test-Lock").is_none());
}
