//! Concurrent first access against the process-wide singleton path.

use solitary::{Construct, DoubleChecked, InstanceCell, Locked, Singleton, State};
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Barrier;
use std::thread;

const THREADS: usize = 1000;

/// Every field is derived from `checksum`, so a partially written instance
/// would fail `assert_whole`.
struct Ledger {
    entries: Vec<u64>,
    total: u64,
    checksum: u64,
}

static LEDGER_BUILDS: AtomicUsize = AtomicUsize::new(0);

impl Ledger {
    fn new() -> Self {
        LEDGER_BUILDS.fetch_add(1, Ordering::SeqCst);
        let entries: Vec<u64> = (1..=256).collect();
        let total = entries.iter().sum();
        Ledger {
            checksum: total ^ 0xa5a5_a5a5,
            entries,
            total,
        }
    }

    fn assert_whole(&self) {
        assert_eq!(self.entries.len(), 256);
        assert_eq!(self.total, 256 * 257 / 2);
        assert_eq!(self.entries.iter().sum::<u64>(), self.total);
        assert_eq!(self.checksum, self.total ^ 0xa5a5_a5a5);
    }
}

impl Singleton for Ledger {
    type Cell = DoubleChecked<Ledger>;
    type Error = Infallible;

    fn cell() -> &'static Self::Cell {
        static CELL: DoubleChecked<Ledger> = DoubleChecked::new();
        &CELL
    }

    fn construct(_: Construct<Self>) -> Result<Self, Self::Error> {
        Ok(Ledger::new())
    }
}

#[test]
fn thousand_threads_one_construction() {
    let barrier = Barrier::new(THREADS);
    let addresses: Vec<usize> = thread::scope(|s| {
        let barrier = &barrier;
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(move || {
                    barrier.wait();
                    let ledger = Ledger::instance().unwrap();
                    ledger.assert_whole();
                    ledger as *const Ledger as usize
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(addresses.len(), THREADS);
    assert!(addresses.iter().all(|a| *a == addresses[0]));
    assert_eq!(LEDGER_BUILDS.load(Ordering::SeqCst), 1);
    assert_eq!(Ledger::cell().state(), State::Initialized);

    // idempotent afterwards
    for _ in 0..100 {
        let again = Ledger::instance().unwrap();
        assert_eq!(again as *const Ledger as usize, addresses[0]);
    }
    assert_eq!(LEDGER_BUILDS.load(Ordering::SeqCst), 1);
}

fn hammer<C>(cell: &C, builds: &AtomicUsize) -> Vec<usize>
where
    C: InstanceCell<Vec<u32>> + Sync,
{
    const CALLERS: usize = 128;
    let barrier = Barrier::new(CALLERS);
    thread::scope(|s| {
        let barrier = &barrier;
        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                s.spawn(move || {
                    barrier.wait();
                    let value = cell.get_or_init(|| {
                        builds.fetch_add(1, Ordering::SeqCst);
                        vec![7; 64]
                    });
                    assert!(value.iter().all(|v| *v == 7) && value.len() == 64);
                    value.as_ptr() as usize
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

#[test]
fn strategies_share_the_contract() {
    let builds = AtomicUsize::new(0);
    let double_checked = DoubleChecked::new();
    let seen = hammer(&double_checked, &builds);
    assert!(seen.iter().all(|a| *a == seen[0]));
    assert_eq!(builds.load(Ordering::SeqCst), 1);

    let builds = AtomicUsize::new(0);
    let locked = Locked::new();
    let seen = hammer(&locked, &builds);
    assert!(seen.iter().all(|a| *a == seen[0]));
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}
