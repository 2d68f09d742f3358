//! Linear unlock schedule for builder streams.
//!
//! A stream unlocks `cap` linearly over one cycle, counted from the last
//! completed withdrawal. It never compounds: once a full cycle has elapsed the
//! unlocked amount stays at `cap` until the next withdrawal resets the clock.

/// Amount a builder may withdraw at `now`.
///
/// `floor(cap * elapsed / cycle)` capped at `cap`, minus whatever was already
/// paid since the last reset, clamped to `[0, cap]`. Total over all inputs:
/// a non-positive cap, a zero cycle or a `now` earlier than `reset_at` all
/// yield 0 rather than an error.
pub fn unlocked_amount(
    cap: i128,
    cycle: u64,
    now: u64,
    reset_at: u64,
    paid_since_reset: i128,
) -> i128 {
    if cap <= 0 || cycle == 0 {
        return 0;
    }

    let elapsed = now.saturating_sub(reset_at);
    let accrued = if elapsed >= cycle {
        cap
    } else {
        pro_rata(cap, elapsed, cycle)
    };

    (accrued - paid_since_reset.max(0)).clamp(0, cap)
}

/// `floor(cap * elapsed / cycle)` for `elapsed < cycle`, without overflow.
///
/// Splits `cap = q * cycle + r` so the product never exceeds `cap`:
/// `q * elapsed < cap` and `r * elapsed < 2^128` fits in `u128`.
fn pro_rata(cap: i128, elapsed: u64, cycle: u64) -> i128 {
    let cycle_wide = cycle as i128;
    let whole = (cap / cycle_wide) * elapsed as i128;
    let rem = (cap % cycle_wide) as u128;
    let frac = (rem * elapsed as u128) / cycle as u128;
    whole + frac as i128
}

#[cfg(test)]
mod tests {
    use super::*;

    const CYCLE: u64 = 30 * 24 * 60 * 60;

    #[test]
    fn nothing_unlocked_at_reset() {
        assert_eq!(unlocked_amount(1_000_000_000, CYCLE, 500, 500, 0), 0);
    }

    #[test]
    fn half_cycle_unlocks_half_cap() {
        let half = CYCLE / 2;
        assert_eq!(
            unlocked_amount(1_000_000_000, CYCLE, 100 + half, 100, 0),
            500_000_000
        );
    }

    #[test]
    fn linear_growth_rounds_down() {
        // 10 over 3 seconds: 3, 6, then the full cap.
        assert_eq!(unlocked_amount(10, 3, 1, 0, 0), 3);
        assert_eq!(unlocked_amount(10, 3, 2, 0, 0), 6);
        assert_eq!(unlocked_amount(10, 3, 3, 0, 0), 10);
    }

    #[test]
    fn does_not_compound_across_cycles() {
        assert_eq!(unlocked_amount(1_000, CYCLE, CYCLE, 0, 0), 1_000);
        assert_eq!(unlocked_amount(1_000, CYCLE, CYCLE * 5, 0, 0), 1_000);
    }

    #[test]
    fn paid_since_reset_is_subtracted_and_clamped() {
        assert_eq!(unlocked_amount(1_000, 100, 50, 0, 200), 300);
        assert_eq!(unlocked_amount(1_000, 100, 50, 0, 900), 0);
        assert_eq!(unlocked_amount(1_000, 100, 50, 0, -5), 500);
    }

    #[test]
    fn degenerate_inputs_yield_zero() {
        assert_eq!(unlocked_amount(0, CYCLE, CYCLE, 0, 0), 0);
        assert_eq!(unlocked_amount(-10, CYCLE, CYCLE, 0, 0), 0);
        assert_eq!(unlocked_amount(1_000, 0, 10, 0, 0), 0);
        // Clock behind the reset timestamp.
        assert_eq!(unlocked_amount(1_000, 100, 10, 50, 0), 0);
    }

    #[test]
    fn max_cap_does_not_overflow() {
        let cap = i128::MAX;
        let cycle = u64::MAX;
        let elapsed = u64::MAX - 1;
        let unlocked = unlocked_amount(cap, cycle, elapsed, 0, 0);
        assert!(unlocked > 0);
        assert!(unlocked < cap);
        assert_eq!(unlocked_amount(cap, cycle, u64::MAX, 0, 0), cap);
    }

    #[test]
    fn never_exceeds_cap_and_never_decreases() {
        let cap = 1_234_567_891_i128;
        let mut previous = 0;
        let mut now = 0;
        while now <= CYCLE * 2 {
            let unlocked = unlocked_amount(cap, CYCLE, now, 0, 0);
            assert!((0..=cap).contains(&unlocked));
            assert!(unlocked >= previous, "unlock went backwards at t={now}");
            previous = unlocked;
            now += 86_399;
        }
        assert_eq!(previous, cap);
    }
}
