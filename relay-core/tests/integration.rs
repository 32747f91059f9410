//! Integration Tests for Multicast Delegates
//!
//! These tests exercise delegates, the combine/remove algebra, and async
//! dispatch together through the public API.

use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use relay_core::{
    AsyncResult, Callback, CancellationToken, Delegate, DelegateError, InvocationList,
};

fn counter(offset: i32) -> Callback<(i32,), i32> {
    Callback::new(move |x: i32| x + offset)
}

/// Construct from f1, add f2, invoke: both run in order, f2's result wins.
#[test]
fn invoke_runs_callbacks_in_insertion_order() {
    let trace = Arc::new(parking_lot::Mutex::new(Vec::new()));

    let t1 = trace.clone();
    let c = Delegate::<(i32,), i32>::from_fn(move |x: i32| {
        t1.lock().push(format!("f1({x})"));
        x * 2
    });

    let t2 = trace.clone();
    c.add(Callback::new(move |x: i32| {
        t2.lock().push(format!("f2({x})"));
        x * 3
    }));

    assert_eq!(c.invoke((5,)), 15);
    assert_eq!(*trace.lock(), vec!["f1(5)".to_string(), "f2(5)".to_string()]);
}

/// Combining two delegates and removing the second gives back the first.
#[test]
fn combine_then_remove_restores_original() {
    let c = Delegate::new(counter(1));
    let d = Delegate::new(counter(2));
    let e = Delegate::combine(Some(&c), Some(&d)).unwrap();

    let mut expected = c.invocation_list().to_vec();
    expected.extend(d.invocation_list().iter().cloned());
    assert_eq!(e.invocation_list().as_slice(), expected.as_slice());

    e.remove(&d);
    assert_eq!(e, c);
}

/// Removing a composite needle only matches a contiguous run, rightmost first.
#[test]
fn composite_removal_matches_contiguous_runs() {
    let (a, b, x) = (counter(1), counter(2), counter(3));

    let needle = Delegate::new(a.clone());
    needle.add(b.clone());

    let hay = Delegate::new(a.clone());
    hay.add(b.clone());
    hay.add(x.clone());
    hay.add(a.clone());
    hay.add(b.clone());

    let removed = Delegate::remove_from(Some(&hay), Some(&needle)).unwrap();
    assert_eq!(removed.invocation_list().as_slice(), &[a.clone(), b.clone(), x.clone()]);

    let interleaved = Delegate::new(a.clone());
    interleaved.add(x.clone());
    interleaved.add(b.clone());
    assert!(!interleaved.remove(&needle));
    assert_eq!(interleaved.len(), 3);
}

/// remove_all over a triple combination leaves nothing behind.
#[test]
fn remove_all_of_triple_combination_is_empty() {
    let a = Delegate::new(counter(1));
    a.add(counter(2));

    let aaa = Delegate::combine_all([Some(&a), Some(&a), Some(&a)]).unwrap();
    assert_eq!(aaa.len(), 6);

    let rest = Delegate::remove_all_from(Some(&aaa), Some(&a)).unwrap();
    assert!(rest.is_empty());
    assert_eq!(aaa.len(), 6);
}

/// Container -> callback -> container keeps the list flat.
#[test]
fn conversion_round_trip_never_nests() {
    let d = Delegate::new(counter(1));
    d.add(counter(2));

    let plain: Callback<(i32,), i32> = (&d).into();
    let back: Delegate<(i32,), i32> = plain.clone().into();
    assert_eq!(back.invocation_list(), d.invocation_list());

    let twice: Delegate<(i32,), i32> = Callback::from(&back).into();
    assert_eq!(twice, d);

    let host = Delegate::new(plain.clone());
    host.add(plain);
    assert_eq!(host.len(), 4);
    assert!(host.invocation_list().iter().all(|cb| !cb.is_dispatch()));
}

/// Null constructor argument fails; null add is a silent no-op.
#[test]
fn constructor_and_add_treat_absent_callbacks_differently() {
    assert_eq!(
        Delegate::<(i32,), i32>::try_new(None).unwrap_err(),
        DelegateError::NullArgument { param: "callback" }
    );

    let c = Delegate::new(counter(1));
    let before = c.invocation_list();
    c.add(None::<Callback<(i32,), i32>>);
    assert_eq!(c.invocation_list(), before);
    assert!(c.invocation_list().ptr_eq(&before));

    let converted: Result<Delegate<(i32,), i32>, _> = None::<Callback<(i32,), i32>>.try_into();
    assert!(converted.is_err());
}

/// Bound methods compare by receiver and method, so a fresh binding removes.
#[test]
fn bound_methods_remove_by_identity() {
    struct Ledger {
        total: AtomicI32,
    }

    impl Ledger {
        fn record(&self, amount: i32) -> i32 {
            self.total.fetch_add(amount, Ordering::SeqCst) + amount
        }
    }

    let ledger = Arc::new(Ledger { total: AtomicI32::new(0) });
    let record = Ledger::record as fn(&Ledger, i32) -> i32;

    let d = Delegate::new(Callback::method(ledger.clone(), record));
    d.add(Callback::method(ledger.clone(), record));
    assert_eq!(d.invoke((5,)), 10);

    assert!(d.remove(Callback::method(ledger.clone(), record)));
    assert_eq!(d.len(), 1);
    assert!(d.target().is_some());
    assert_eq!(d.method(), Some(d.single().unwrap().method_address().unwrap()));
}

/// Wider shapes work end to end, including function-pointer identity.
#[test]
fn four_argument_delegate_invokes_and_removes() {
    fn describe(name: String, count: u32, loud: bool, suffix: char) -> String {
        let text = format!("{name}:{count}{suffix}");
        if loud {
            text.to_uppercase()
        } else {
            text
        }
    }

    type Describe = fn(String, u32, bool, char) -> String;

    let seen = Arc::new(AtomicUsize::new(0));
    let counted = seen.clone();

    let d = Delegate::<(String, u32, bool, char), String>::from_fn(
        move |name: String, count: u32, _: bool, _: char| {
            counted.fetch_add(count as usize, Ordering::SeqCst);
            name
        },
    );
    d.add(Callback::function(describe as Describe));

    assert_eq!(d.invoke(("relay".to_string(), 3, true, '!')), "RELAY:3!");
    assert_eq!(seen.load(Ordering::SeqCst), 3);

    assert!(d.remove(Callback::function(describe as Describe)));
    assert_eq!(d.invoke(("relay".to_string(), 2, false, '?')), "relay");
    assert_eq!(seen.load(Ordering::SeqCst), 5);
}

/// Many threads adding at once never lose an entry.
#[test]
fn concurrent_adds_are_linearizable() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 250;

    let d = Delegate::<(), ()>::empty();
    let barrier = Arc::new(Barrier::new(THREADS));
    let hits = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let d = d.clone();
            let barrier = barrier.clone();
            let hits = hits.clone();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..PER_THREAD {
                    let hits = hits.clone();
                    d.add(Callback::new(move || {
                        hits.fetch_add(1, Ordering::Relaxed);
                    }));
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(d.len(), THREADS * PER_THREAD);
    d.invoke(());
    assert_eq!(hits.load(Ordering::Relaxed), THREADS * PER_THREAD);
}

/// Concurrent add/remove pairs leave the list exactly as it started.
#[test]
fn concurrent_add_remove_pairs_balance_out() {
    let base = counter(0);
    let d = Delegate::new(base.clone());

    let workers: Vec<_> = (0..6)
        .map(|i| {
            let d = d.clone();
            thread::spawn(move || {
                let mine = counter(i + 1);
                for _ in 0..100 {
                    d.add(&mine);
                    assert!(d.remove(&mine));
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(d.invocation_list().as_slice(), &[base]);
}

/// Snapshots taken before a mutation keep their contents.
#[test]
fn snapshots_survive_mutation() {
    let d = Delegate::new(counter(1));
    let snapshot: InvocationList<(i32,), i32> = d.invocation_list();

    d.add(counter(2));
    d.remove_all(&snapshot);

    assert_eq!(snapshot.len(), 1);
    assert_eq!(d.len(), 1);
    assert_ne!(d.invocation_list(), snapshot);
}

/// Async invocation runs the whole batch and reports the last result.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn invoke_async_dispatches_entire_batch() {
    let seen = Arc::new(AtomicUsize::new(0));
    let d = Delegate::<(usize,), usize>::empty();
    for step in 1..=3 {
        let seen = seen.clone();
        d.add(Callback::new(move |x: usize| {
            seen.fetch_add(1, Ordering::SeqCst);
            x * step
        }));
    }

    let result = d.invoke_async((7,), CancellationToken::new()).await;
    assert_eq!(result, Ok(21));
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

/// A cancelled token prevents the batch from starting.
#[tokio::test]
async fn invoke_async_honours_cancellation() {
    let d = Delegate::<(), u32>::from_fn(|| 1_u32);
    let cancel = CancellationToken::new();
    cancel.cancel();

    assert_eq!(d.invoke_async((), cancel).await, Err(DelegateError::Cancelled));
}

/// Begin/end with caller state and a completion callback.
#[test]
fn begin_end_invoke_carries_state() {
    let d = Delegate::<(String,), usize>::from_fn(|s: String| s.len());
    let (tx, rx) = std::sync::mpsc::channel();

    let handle = d.begin_invoke(
        ("delegate".to_string(),),
        move |done: &AsyncResult<usize, u64>| {
            let _ = tx.send(*done.state());
        },
        77_u64,
    );

    assert_eq!(d.end_invoke(&handle), Ok(8));
    assert_eq!(rx.recv().unwrap(), 77);
    assert_eq!(d.end_invoke(&handle), Err(DelegateError::ResultConsumed));
}
