// Path: crates/meridian-app/src/subscriptions.rs
//! Fan-out registry dispatching ledger write-path events to every subscribed app.

use std::collections::HashMap;
use std::sync::Arc;

use meridian_ledger::transaction::WriteTxn;
use meridian_types::error::AppError;
use meridian_types::primitives::{Account, Hash};
use meridian_types::Block;

use crate::hooks::AppHooks;

/// Owns the set of apps subscribed to ledger write-path events and tracks
/// which accounts each client has an active subscription on.
#[derive(Default)]
pub struct AppSubscriptions {
    apps: Vec<Arc<dyn AppHooks>>,
    accounts: HashMap<Account, u32>,
}

impl AppSubscriptions {
    /// Creates an empty subscription registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `app` to receive every subsequent hook call.
    pub fn register(&mut self, app: Arc<dyn AppHooks>) {
        self.apps.push(app);
    }

    /// Number of apps currently registered.
    pub fn len(&self) -> usize {
        self.apps.len()
    }

    /// Invokes `pre_block_append` on every registered app, in registration
    /// order, stopping at the first rejection.
    pub fn pre_block_append(&self, txn: &WriteTxn<'_>, account: &Account, block: &Block) -> Result<(), AppError> {
        for app in &self.apps {
            app.pre_block_append(txn, account, block)?;
        }
        Ok(())
    }

    /// Invokes `after_block_append` on every registered app, in registration order.
    pub fn after_block_append(&self, txn: &WriteTxn<'_>, account: &Account, block: &Block) -> Result<(), AppError> {
        for app in &self.apps {
            app.after_block_append(txn, account, block)?;
        }
        Ok(())
    }

    /// Invokes `pre_block_rollback` on every registered app, in registration order.
    pub fn pre_block_rollback(&self, txn: &WriteTxn<'_>, account: &Account, hash: &Hash) -> Result<(), AppError> {
        for app in &self.apps {
            app.pre_block_rollback(txn, account, hash)?;
        }
        Ok(())
    }

    /// Invokes `after_block_rollback` on every registered app, in registration order.
    pub fn after_block_rollback(&self, txn: &WriteTxn<'_>, account: &Account, hash: &Hash) -> Result<(), AppError> {
        for app in &self.apps {
            app.after_block_rollback(txn, account, hash)?;
        }
        Ok(())
    }

    /// Records a new subscription on `account` and notifies every registered
    /// app via `after_subscribe`.
    pub fn subscribe(&mut self, account: Account) {
        let existing = self.accounts.contains_key(&account);
        *self.accounts.entry(account).or_insert(0) += 1;
        for app in &self.apps {
            app.after_subscribe(&account, existing);
        }
    }

    /// Notifies every registered app via `pre_unsubscribe`, then drops the
    /// subscription on `account` once its reference count reaches zero.
    pub fn unsubscribe(&mut self, account: Account) {
        for app in &self.apps {
            app.pre_unsubscribe(&account);
        }
        if let Some(count) = self.accounts.get_mut(&account) {
            *count -= 1;
            if *count == 0 {
                self.accounts.remove(&account);
            }
        }
    }

    /// Whether any client currently subscribes to `account`.
    pub fn is_subscribed(&self, account: &Account) -> bool {
        self.accounts.contains_key(account)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use meridian_types::block::{BlockCommon, Opcode, TransactionBlock};
    use meridian_types::primitives::Signature;

    use super::*;

    struct CountingApp {
        appends: AtomicUsize,
    }

    impl AppHooks for CountingApp {
        fn name(&self) -> &str {
            "counting"
        }
        fn pre_block_append(&self, _txn: &WriteTxn<'_>, _account: &Account, _block: &Block) -> Result<(), AppError> {
            Ok(())
        }
        fn after_block_append(&self, _txn: &WriteTxn<'_>, _account: &Account, _block: &Block) -> Result<(), AppError> {
            self.appends.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn pre_block_rollback(&self, _txn: &WriteTxn<'_>, _account: &Account, _hash: &Hash) -> Result<(), AppError> {
            Ok(())
        }
        fn after_block_rollback(&self, _txn: &WriteTxn<'_>, _account: &Account, _hash: &Hash) -> Result<(), AppError> {
            Ok(())
        }
        fn after_subscribe(&self, _account: &Account, _existing: bool) {}
        fn pre_unsubscribe(&self, _account: &Account) {}
    }

    fn dummy_block() -> Block {
        Block::Tx(TransactionBlock {
            common: BlockCommon {
                opcode: Opcode::Send,
                credit: 1,
                counter: 1,
                timestamp: 0,
                height: 1,
                account: Account::ZERO,
                previous: Hash::ZERO,
                signature: Signature::default(),
            },
            representative: Account::ZERO,
            balance: 0,
            link: Hash::ZERO,
            extensions: Vec::new(),
        })
    }

    #[test]
    fn subscribe_marks_account_subscribed_and_notifies_apps() {
        let mut subs = AppSubscriptions::new();
        let account = Account([3u8; 32]);
        subs.subscribe(account);
        assert!(subs.is_subscribed(&account));
    }

    #[test]
    fn unsubscribe_drops_tracking_once_refcount_hits_zero() {
        let mut subs = AppSubscriptions::new();
        let account = Account([4u8; 32]);
        subs.subscribe(account);
        subs.unsubscribe(account);
        assert!(!subs.is_subscribed(&account));
    }

    #[test]
    fn after_block_append_reaches_every_registered_app() {
        use meridian_ledger::Ledger;
        use tempfile::tempdir;

        let dir = tempdir().expect("tempdir");
        let ledger = Ledger::open(&dir.path().join("ledger.redb")).expect("open ledger");
        let txn = ledger.begin_write().expect("begin write");

        let app = Arc::new(CountingApp {
            appends: AtomicUsize::new(0),
        });
        let mut subs = AppSubscriptions::new();
        subs.register(app.clone());

        subs.after_block_append(&txn, &Account::ZERO, &dummy_block())
            .expect("hook succeeds");
        txn.abort();

        assert_eq!(app.appends.load(Ordering::SeqCst), 1);
    }
}
