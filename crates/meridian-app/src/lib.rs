// Path: crates/meridian-app/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]
//! Application subscription framework for the meridian account-chain processor.
//!
//! Apps (token, alias, airdrop) don't see the ledger's write path directly.
//! Instead they register an [`AppHooks`] implementation with [`AppSubscriptions`],
//! and the processor invokes every subscribed hook inside its own ledger write
//! transaction as each block is appended or rolled back.

pub mod hooks;
pub mod subscriptions;

pub use hooks::AppHooks;
pub use subscriptions::AppSubscriptions;
