use crate::streak::types::{AlertMode, AlertState, Streak};

/// Decide whether this run should send an alert.
///
/// `Each` alerts whenever a qualifying streak grew since the previous run and
/// ends on a match that has not been alerted yet. A fallback source lagging by
/// a match shrinks the count for one run; coming back must not repeat the alert.
///
/// `ThresholdOnly` alerts once per streak: the count has to climb from below
/// the threshold, and the streak must start at a different match than the one
/// already alerted, which only happens after a draw.
pub fn should_notify(streak: &Streak, threshold: usize, mode: AlertMode, state: &AlertState) -> bool {
    if streak.last.is_none() || streak.length < threshold {
        return false;
    }

    match mode {
        AlertMode::Each => {
            streak.length > state.last_streak_len && streak.last_key() != state.last_notified_key
        }
        AlertMode::ThresholdOnly => {
            state.last_streak_len < threshold && streak.start_key() != state.last_notified_start_key
        }
    }
}
