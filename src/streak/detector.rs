use crate::data::types::MatchResult;
use crate::streak::types::Streak;

/// Count matches without a draw, walking back from the most recent one.
pub fn current_no_draw_streak(matches: &[MatchResult]) -> Streak {
    let length = matches
        .iter()
        .rev()
        .take_while(|m| !m.is_draw())
        .count();

    if length == 0 {
        return Streak::default();
    }

    Streak {
        length,
        first: matches.get(matches.len() - length).cloned(),
        last: matches.last().cloned(),
    }
}
