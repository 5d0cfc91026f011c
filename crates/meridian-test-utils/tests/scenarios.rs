//! Integration tests expressing the account-chain scenarios end to end
//! against a [`TestHarness`], with no real networking involved.

use std::time::{Duration, Instant};

use meridian_crypto::hash::block_hash;
use meridian_crypto::sign::{generate_keypair, sign_hash};
use meridian_elections::StaticWeightTable;
use meridian_node::{BlockProcessor, Event, Outcome, Priority};
use meridian_test_utils::assertions::{assert_chain_continuity, assert_confirm_monotonic};
use meridian_test_utils::fixtures::{filler_block, sign_in_place, test_account, test_network_genesis};
use meridian_test_utils::harness::TestHarness;
use meridian_types::block::{BlockCommon, Opcode, TransactionBlock};
use meridian_types::primitives::{Account, Hash};
use meridian_types::Block;

fn appended_hash(event: &Event) -> Hash {
    match &event.outcome {
        Outcome::Appended { hash, .. } | Outcome::Prepended { hash, .. } => *hash,
        other => panic!("expected an append outcome, got {other:?}"),
    }
}

/// S1 — the test-network genesis appends as its own head and tail, and a
/// forced bootstrap confirm brings it to `confirmed_height == 0`.
#[test]
fn genesis_appends_and_bootstraps_to_confirmed() {
    let mut harness = TestHarness::new();
    let genesis = test_network_genesis();

    let event = harness.submit(genesis.block.clone(), Priority::Forced);
    assert!(event.error.is_none());
    assert_eq!(appended_hash(&event), genesis.hash);

    harness.processor.add_forced_confirm(genesis.keypair.account, 0);
    let confirm_event = harness.processor.drain_one().expect("confirm produces an event");
    assert!(matches!(
        confirm_event.outcome,
        Outcome::Confirmed { height: 0, .. }
    ));

    let txn = harness.ledger.begin_read().expect("read txn");
    let info = txn
        .account_info_get(&genesis.keypair.account)
        .expect("read info")
        .expect("account exists");
    assert_eq!(info.head_hash, genesis.hash);
    assert_eq!(info.confirmed_height, Some(0));

    assert_chain_continuity(&harness.ledger, &genesis.keypair.account);
}

fn send_block(
    keypair: &meridian_types::KeyPair,
    height: u64,
    counter: u32,
    previous: Hash,
    to: Account,
    balance_after: u128,
) -> Block {
    let mut block = Block::Tx(TransactionBlock {
        common: BlockCommon {
            opcode: Opcode::Send,
            credit: 0,
            counter,
            timestamp: 0,
            height,
            account: keypair.account,
            previous,
            signature: Default::default(),
        },
        representative: keypair.account,
        balance: balance_after,
        link: Hash(to.0),
        extensions: Vec::new(),
    });
    sign_in_place(&mut block, keypair);
    block
}

fn receive_block(keypair: &meridian_types::KeyPair, source_hash: Hash, amount: u128) -> Block {
    let mut block = Block::Tx(TransactionBlock {
        common: BlockCommon {
            opcode: Opcode::Receive,
            credit: 0,
            counter: 0,
            timestamp: 0,
            height: 0,
            account: keypair.account,
            previous: Hash::ZERO,
            signature: Default::default(),
        },
        representative: keypair.account,
        balance: amount,
        link: source_hash,
        extensions: Vec::new(),
    });
    sign_in_place(&mut block, keypair);
    block
}

/// S2 — a send from genesis to a fresh account, followed by that account's
/// receive, leaves both balances correct and the receivable table empty.
#[test]
fn send_receive_cycle_clears_the_receivable() {
    let mut harness = TestHarness::new();
    let genesis = test_network_genesis();
    let recipient = test_account(1);

    harness.submit(genesis.block.clone(), Priority::Forced);

    let send = send_block(&genesis.keypair, 1, 1, genesis.hash, recipient.account, 9_999_990);
    let send_event = harness.submit(send.clone(), Priority::Low);
    assert!(matches!(send_event.outcome, Outcome::Appended { .. }));
    let send_hash = block_hash(&send);

    let receive = receive_block(&recipient, send_hash, 10);
    let receive_event = harness.submit(receive, Priority::NewWithLink);
    assert!(matches!(receive_event.outcome, Outcome::Appended { .. }));

    let txn = harness.ledger.begin_read().expect("read txn");
    let genesis_info = txn
        .account_info_get(&genesis.keypair.account)
        .expect("read info")
        .expect("exists");
    let (genesis_head, _) = txn
        .block_get(&genesis_info.head_hash)
        .expect("read head")
        .expect("head exists");
    assert_eq!(genesis_head.balance(), 9_999_990);

    let recipient_info = txn
        .account_info_get(&recipient.account)
        .expect("read info")
        .expect("exists");
    let (recipient_head, _) = txn
        .block_get(&recipient_info.head_hash)
        .expect("read head")
        .expect("head exists");
    assert_eq!(recipient_head.balance(), 10);

    assert!(txn
        .receivable_get(&recipient.account, &send_hash)
        .expect("read receivable")
        .is_none());
}

/// S3 — submitting height 2 before height 1 stashes the former as a gap;
/// once height 1 arrives both are appended in order.
#[test]
fn out_of_order_block_is_stashed_then_resolved() {
    let mut harness = TestHarness::new();
    let genesis = test_network_genesis();
    harness.submit(genesis.block.clone(), Priority::Forced);

    let keypair = &genesis.keypair;
    let height1 = filler_block(keypair, 1, genesis.hash, 1, 10_000_000);
    let height1_hash = block_hash(&height1);
    let height2 = filler_block(keypair, 2, height1_hash, 2, 10_000_000);

    let gap_event = harness.submit(height2.clone(), Priority::Low);
    assert!(matches!(gap_event.outcome, Outcome::Gap { .. }));

    let first_event = harness.submit(height1, Priority::NewWithLink);
    assert!(matches!(first_event.outcome, Outcome::Appended { .. }));

    harness.processor.resolve_gap(&height1_hash);
    let second_event = harness.processor.drain_one().expect("gap resolution re-queues the block");
    assert!(matches!(second_event.outcome, Outcome::Appended { .. }));
    let _ = height2;

    let txn = harness.ledger.begin_read().expect("read txn");
    let info = txn
        .account_info_get(&keypair.account)
        .expect("read info")
        .expect("exists");
    assert_eq!(info.head_height, 2);
}

/// S4 — two competing blocks at the same height form a fork; the winning
/// side confirms after enough rounds past the weight threshold, and the
/// losing side's later arrival produces no rollback.
#[test]
fn fork_below_confirmation_resolves_without_rollback() {
    let mut processor_dir = tempfile::tempdir().expect("tempdir");
    let ledger = meridian_ledger::Ledger::open(processor_dir.path().join("ledger.redb")).expect("open ledger");
    let mut processor = BlockProcessor::new(ledger.clone());
    let mut elections = meridian_elections::Scheduler::new();

    let account_key = generate_keypair();
    let mut genesis = Block::Tx(TransactionBlock {
        common: BlockCommon {
            opcode: Opcode::Change,
            credit: 1,
            counter: 0,
            timestamp: 0,
            height: 0,
            account: account_key.account,
            previous: Hash::ZERO,
            signature: Default::default(),
        },
        representative: account_key.account,
        balance: 10_000_000,
        link: Hash::ZERO,
        extensions: Vec::new(),
    });
    sign_in_place(&mut genesis, &account_key);
    processor.add(genesis.clone(), Priority::Forced);
    processor.drain_one();

    // Build a chain of 4 filler blocks up to height 4, then two competing
    // sends at height 5.
    let mut previous = block_hash(&genesis);
    for height in 1..5 {
        let block = filler_block(&account_key, height, previous, height as u32, 10_000_000);
        previous = block_hash(&block);
        processor.add(block, Priority::Low);
        processor.drain_one();
    }

    let rep = generate_keypair();
    let recipient_a = test_account(10);
    let recipient_b = test_account(11);
    let block_a = send_block(&account_key, 5, 5, previous, recipient_a.account, 9_000_000);
    let block_b = send_block(&account_key, 5, 5, previous, recipient_b.account, 8_000_000);
    let hash_a = block_hash(&block_a);

    processor.add(block_a.clone(), Priority::Low);
    let first_event = processor.drain_one().expect("event");
    assert!(matches!(first_event.outcome, Outcome::Appended { .. }));
    elections.observe_block(account_key.account, 5, hash_a, block_a.clone(), Instant::now());

    processor.add(block_b.clone(), Priority::Low);
    let second_event = processor.drain_one().expect("event");
    assert!(matches!(second_event.outcome, Outcome::Fork { .. }));
    elections.observe_block(account_key.account, 5, block_hash(&block_b), block_b.clone(), Instant::now());

    let weights = StaticWeightTable::new([(rep.account, 100u128)]);
    let vote_hash = hash_a;
    let vote_sig = sign_hash(&rep, &vote_hash).expect("sign vote");
    elections
        .add_vote(
            account_key.account,
            5,
            rep.account,
            meridian_elections::Vote {
                timestamp: 1,
                signature: vote_sig,
                hash: vote_hash,
            },
            &weights,
        )
        .expect("add_vote");

    let mut now = Instant::now() + Duration::from_secs(2);
    let mut confirmed = false;
    for _ in 0..10 {
        if let Some((account, height, outcome)) = elections.tick_next_due(&weights, now) {
            if matches!(outcome, meridian_elections::RoundOutcome::Confirmed { .. }) {
                processor.add_forced_confirm(account, height);
                processor.drain_one();
                confirmed = true;
                break;
            }
        }
        now += Duration::from_secs(1);
    }
    assert!(confirmed, "election should confirm the winning block");

    let txn = ledger.begin_read().expect("read txn");
    let info = txn
        .account_info_get(&account_key.account)
        .expect("read info")
        .expect("exists");
    assert_eq!(info.confirmed_height, Some(5));
    assert_eq!(info.head_hash, hash_a);

    drop(txn);
    drop(processor_dir);
    let _ = elections;
}

/// S5 — a representative that votes for two different blocks at the same
/// height has its weight excluded from both candidates' totals, not just
/// left counting toward whichever one it voted for first.
#[test]
fn conflicting_vote_excludes_the_representative_from_both_totals() {
    let mut elections = meridian_elections::Scheduler::new();
    let account_key = generate_keypair();
    let rep = generate_keypair();

    let block_a = filler_block(&account_key, 5, Hash::ZERO, 5, 10_000_000);
    let block_b = filler_block(&account_key, 5, Hash::ZERO, 6, 10_000_000);
    let hash_a = block_hash(&block_a);
    let hash_b = block_hash(&block_b);

    let now = Instant::now();
    elections.observe_block(account_key.account, 5, hash_a, block_a, now);
    elections.observe_block(account_key.account, 5, hash_b, block_b, now);

    // This rep holds the entire online weight, so if its vote were still
    // tallied for either candidate that candidate would clear the 80%
    // confirm threshold on its own.
    let weights = StaticWeightTable::new([(rep.account, 100u128)]);

    let sig_a = sign_hash(&rep, &hash_a).expect("sign vote a");
    elections
        .add_vote(
            account_key.account,
            5,
            rep.account,
            meridian_elections::Vote {
                timestamp: 2,
                signature: sig_a,
                hash: hash_a,
            },
            &weights,
        )
        .expect("first vote recorded");

    let sig_b = sign_hash(&rep, &hash_b).expect("sign vote b");
    let result = elections.add_vote(
        account_key.account,
        5,
        rep.account,
        meridian_elections::Vote {
            timestamp: 1,
            signature: sig_b,
            hash: hash_b,
        },
        &weights,
    );
    assert!(matches!(result, Err(meridian_types::error::ElectionError::ConflictingVote)));

    let outcome = elections
        .tick_next_due(&weights, now + Duration::from_secs(2))
        .map(|(_, _, outcome)| outcome);
    assert!(
        matches!(outcome, Some(meridian_elections::RoundOutcome::NoWinner)),
        "conflicted rep's weight must not carry either candidate past threshold, got {outcome:?}"
    );
}

/// S6 — 100 blocks across 10 accounts survive a ledger close/reopen.
#[test]
fn restart_durability_preserves_every_block() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("ledger.redb");

    let mut expected_heads = Vec::new();
    {
        let ledger = meridian_ledger::Ledger::open(&path).expect("open ledger");
        let mut processor = BlockProcessor::new(ledger);
        for account_index in 0..10u64 {
            let keypair = test_account(100 + account_index);
            let mut head = Block::Tx(TransactionBlock {
                common: BlockCommon {
                    opcode: Opcode::Change,
                    credit: 1,
                    counter: 0,
                    timestamp: 0,
                    height: 0,
                    account: keypair.account,
                    previous: Hash::ZERO,
                    signature: Default::default(),
                },
                representative: keypair.account,
                balance: 1_000,
                link: Hash::ZERO,
                extensions: Vec::new(),
            });
            sign_in_place(&mut head, &keypair);
            processor.add(head.clone(), Priority::Forced);
            processor.drain_one();
            let mut previous = block_hash(&head);
            for height in 1..10u64 {
                let block = filler_block(&keypair, height, previous, height as u32, 1_000);
                previous = block_hash(&block);
                processor.add(block, Priority::Low);
                processor.drain_one();
            }
            expected_heads.push((keypair.account, previous));
        }
    }

    let ledger = meridian_ledger::Ledger::open(&path).expect("reopen ledger");
    let txn = ledger.begin_read().expect("read txn");
    for (account, expected_head) in expected_heads {
        let info = txn
            .account_info_get(&account)
            .expect("read info")
            .expect("account survives restart");
        assert_eq!(info.head_hash, expected_head);
        assert_eq!(info.head_height, 9);
        assert!(txn.block_get(&expected_head).expect("read block").is_some());
        assert_confirm_monotonic(None, info.confirmed_height);
    }
}
