// Path: crates/meridian-elections/src/constants.rs
//! Tunable thresholds governing how an election tallies votes and reschedules itself.

use std::time::Duration;

/// Fraction of online voting weight a single block hash must reach to win a round.
pub const CONFIRM_WEIGHT_PERCENTAGE: u8 = 80;

/// Number of consecutive winning rounds required before a block is forwarded to the
/// processor as a confirm operation. Split from the source's single
/// `FORK_ELECTION_ROUNDS_THRESHOLD`; this constant governs *how many* wins are required.
pub const CONFIRM_WINS_THRESHOLD: u32 = 5;

/// Latency floor: an election may not confirm before this much time has passed since
/// its creation, regardless of how quickly it accumulates winning rounds. Prevents a
/// just-created election from confirming on its first tick.
pub const MIN_ELECTION_INTERVAL: Duration = Duration::from_secs(1);

/// Reschedule interval for an election with no detected fork.
pub const NON_FORK_ROUND_INTERVAL: Duration = Duration::from_secs(1);

/// Reschedule interval for an election with a detected fork (two or more competing blocks).
pub const FORK_ROUND_INTERVAL: Duration = Duration::from_secs(32);
