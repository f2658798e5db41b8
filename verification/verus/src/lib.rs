//! Verus Formal Verification for hd-smart-idle
//!
//! Proofs over the pure arithmetic and decision logic of the daemon.
//! To verify, install Verus and run: verus verification/verus/src/lib.rs

use vstd::prelude::*;

verus! {

pub const MINUTES_PER_DAY: u32 = 1440;

// ============================================================================
// SCHEDULE: the next firing is strictly ahead and at most a day away
// ============================================================================

/// Minutes from `now` to the next occurrence of `target` (both minute-of-day)
pub open spec fn wait_minutes(now: int, target: int) -> int {
    if target > now {
        target - now
    } else {
        target - now + 1440
    }
}

pub proof fn lemma_wait_bounded(now: int, target: int)
    requires
        0 <= now < 1440,
        0 <= target < 1440,
    ensures
        0 < wait_minutes(now, target) <= 1440,
{
}

/// Firing at exactly the target minute schedules the following day
pub proof fn lemma_equal_advances_a_day(t: int)
    requires
        0 <= t < 1440,
    ensures
        wait_minutes(t, t) == 1440,
{
}

/// Landing point is the target minute of some later day
pub proof fn lemma_wait_lands_on_target(now: int, target: int)
    requires
        0 <= now < 1440,
        0 <= target < 1440,
    ensures
        (now + wait_minutes(now, target)) % 1440 == target,
{
    if target > now {
        assert(now + wait_minutes(now, target) == target);
    } else {
        assert(now + wait_minutes(now, target) == target + 1440);
    }
}

pub fn next_wait_minutes(now: u32, target: u32) -> (result: u32)
    requires
        now < MINUTES_PER_DAY,
        target < MINUTES_PER_DAY,
    ensures
        result == wait_minutes(now as int, target as int),
        0 < result <= MINUTES_PER_DAY,
{
    if target > now {
        target - now
    } else {
        target + MINUTES_PER_DAY - now
    }
}

// ============================================================================
// SCHEDULE PARSING: exactly 0-23 / 0-59 accepted, nothing clamped
// ============================================================================

pub fn schedule_in_range(hour: i64, minute: i64) -> (result: bool)
    ensures
        result == (0 <= hour <= 23 && 0 <= minute <= 59),
{
    0 <= hour && hour <= 23 && 0 <= minute && minute <= 59
}

// ============================================================================
// TRANSITIONS: disable spindown on first sight of a spinning drive or on wake
// ============================================================================

pub enum Reading {
    Active,
    Standby,
}

pub open spec fn should_disable(previous: Option<Reading>, current: Reading) -> bool {
    match (previous, current) {
        (None, Reading::Active) => true,
        (Some(Reading::Standby), Reading::Active) => true,
        _ => false,
    }
}

pub fn disables_spindown(previous: &Option<Reading>, current: &Reading) -> (result: bool)
    ensures
        result == should_disable(*previous, *current),
{
    match (previous, current) {
        (None, Reading::Active) => true,
        (Some(Reading::Standby), Reading::Active) => true,
        _ => false,
    }
}

/// A drive that reads standby never gets its timer disabled
pub proof fn lemma_standby_never_disables(previous: Option<Reading>)
    ensures
        !should_disable(previous, Reading::Standby),
{
}

/// Two consecutive active readings disable at most once
pub proof fn lemma_steady_active_is_quiet()
    ensures
        !should_disable(Some(Reading::Active), Reading::Active),
{
}

} // verus!
