use crate::config::Party;

/// Maps a raw affiliation string to its canonical party.
///
/// The spelling of affiliations changed over the years ("REPUBLICAN",
/// "Republican Party", "GOP", "DEMOCRATIC", ...), so the match is a
/// case-insensitive substring test. Anything else is kept under its own
/// upper-cased label.
pub fn normalize_party(raw: &str) -> Party {
    let lowered = raw.to_lowercase();
    if lowered.contains("republican") || lowered.contains("gop") {
        Party::Republican
    } else if lowered.contains("democrat") {
        Party::Democrat
    } else {
        Party::Other(raw.trim().to_uppercase())
    }
}
