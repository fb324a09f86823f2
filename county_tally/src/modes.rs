use log::debug;

use crate::config::*;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ModeKind {
    /// A synthetic row carrying the final count ("TOTAL", "TOTAL VOTES").
    Aggregate,
    /// A channel that some years also fold into an aggregate row.
    Component,
    /// Any other channel.
    Unlisted,
}

/// Upper-cases and trims a mode label. Exports without a mode column report
/// final counts only, so an empty label is read as "TOTAL".
pub fn normalize_mode(raw: &str) -> String {
    let mode = raw.trim().to_uppercase();
    if mode.is_empty() {
        TOTAL.to_string()
    } else {
        mode
    }
}

pub fn classify_mode(mode: &str, rules: &TallyRules) -> ModeKind {
    if rules.is_aggregate(mode) {
        ModeKind::Aggregate
    } else if rules.is_component(mode) {
        ModeKind::Component
    } else {
        ModeKind::Unlisted
    }
}

/// Picks the final party tally of one county-year out of its per-mode tallies.
///
/// An aggregate mode is used verbatim, the first one in precedence order.
/// Without an aggregate, the component modes are the only source and every
/// mode is summed, including the unlisted ones.
pub fn resolve_modes(modes: &ModeTallies, rules: &TallyRules) -> VoteTally {
    for aggregate in rules.aggregate_modes.iter() {
        if let Some(tally) = modes.get(aggregate) {
            debug!(
                "resolve_modes: using aggregate mode {:?} out of {:?}",
                aggregate,
                modes.keys().collect::<Vec<_>>()
            );
            return tally.clone();
        }
    }

    let mut res = VoteTally::new();
    for (mode, tally) in modes.iter() {
        if classify_mode(mode, rules) == ModeKind::Unlisted {
            debug!("resolve_modes: summing unlisted mode {:?}", mode);
        }
        merge_tally(&mut res, tally);
    }
    res
}

/// Adds every party count of `other` into `into`.
pub fn merge_tally(into: &mut VoteTally, other: &VoteTally) {
    for (party, count) in other.iter() {
        *into.entry(party.clone()).or_insert(0) += count;
    }
}
