//! Assertion utilities for testing

/// Assert that two byte arrays are equal
#[macro_export]
macro_rules! assert_bytes_eq {
    ($left:expr, $right:expr) => {
        assert_eq!($left.as_ref(), $right.as_ref());
    };
    ($left:expr, $right:expr, $($arg:tt)+) => {
        assert_eq!($left.as_ref(), $right.as_ref(), $($arg)+);
    };
}

/// Assert that a result is OK and unwrap it
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(val) => val,
            Err(err) => panic!("Expected Ok, got Err: {:?}", err),
        }
    };
    ($expr:expr, $($arg:tt)+) => {
        match $expr {
            Ok(val) => val,
            Err(err) => panic!("Expected Ok, got Err: {:?} ({})", err, format!($($arg)+)),
        }
    };
}

/// Assert that a result is Err and unwrap the error
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(val) => panic!("Expected Err, got Ok: {:?}", val),
            Err(err) => err,
        }
    };
    ($expr:expr, $($arg:tt)+) => {
        match $expr {
            Ok(val) => panic!("Expected Err, got Ok: {:?} ({})", val, format!($($arg)+)),
            Err(err) => err,
        }
    };
}

/// Assert that a value is within a specific range
#[macro_export]
macro_rules! assert_in_range {
    ($value:expr, $min:expr, $max:expr) => {
        assert!($value >= $min && $value <= $max, "{} not in range [{}, {}]", $value, $min, $max);
    };
    ($value:expr, $min:expr, $max:expr, $($arg:tt)+) => {
        assert!($value >= $min && $value <= $max, "{} not in range [{}, {}]: {}", $value, $min, $max, format!($($arg)+));
    };
}

use meridian_ledger::Ledger;
use meridian_types::primitives::{Account, Hash};

/// Property 1 — chain continuity: every block from `0` to `head_height` links
/// back to its predecessor, and height 0 has a zero `previous`.
pub fn assert_chain_continuity(ledger: &Ledger, account: &Account) {
    let txn = ledger.begin_read().expect("read txn");
    let info = txn
        .account_info_get(account)
        .expect("read account info")
        .expect("account exists");
    let mut expected_previous = Hash::ZERO;
    for height in 0..=info.head_height {
        let hash = txn
            .block_index_get(account, height)
            .expect("read index")
            .unwrap_or_else(|| panic!("missing block index at height {height}"));
        let (block, _) = txn.block_get(&hash).expect("read block").expect("block exists");
        assert_eq!(
            block.previous(),
            expected_previous,
            "chain continuity broken at height {height}"
        );
        expected_previous = hash;
    }
}

/// Property 5 — idempotence: submitting `block` to `processor` twice produces
/// one append and one "already exists" result.
pub fn assert_idempotent_append(processor: &mut meridian_node::BlockProcessor, block: &meridian_types::Block) {
    use meridian_node::{Outcome, Priority};
    processor.add(block.clone(), Priority::Low);
    let first = processor.drain_one().expect("first submission produces an event");
    assert!(
        matches!(first.outcome, Outcome::Appended { .. } | Outcome::Prepended { .. }),
        "first submission should append"
    );
    processor.add(block.clone(), Priority::Low);
    let second = processor.drain_one().expect("second submission produces an event");
    assert!(
        matches!(second.outcome, Outcome::AlreadyExists { .. }),
        "duplicate submission should be idempotent, got {:?}",
        second.outcome
    );
}

/// Property 6 — confirm monotonicity: `confirmed_height` never decreases.
pub fn assert_confirm_monotonic(previous: Option<u64>, current: Option<u64>) {
    if let (Some(prev), Some(curr)) = (previous, current) {
        assert!(curr >= prev, "confirmed_height regressed from {prev} to {curr}");
    }
}
