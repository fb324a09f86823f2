use crate::config::*;

/// Returns the party with the most votes.
///
/// Ties go to the first party reaching the maximum in scan order. Tallies
/// are ordered by canonical party id, so this is the alphabetically first
/// of the tied parties. A tally with no votes at all has no winner.
pub fn resolve_winner(votes: &VoteTally) -> Winner {
    let mut best: Option<(&Party, u64)> = None;
    for (party, &count) in votes.iter() {
        if count == 0 {
            continue;
        }
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((party, count)),
        }
    }
    match best {
        Some((party, _)) => Winner::Party(party.clone()),
        None => Winner::Unknown,
    }
}
