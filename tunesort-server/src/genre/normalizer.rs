//! Genre string normalization and primary-genre resolution

/// Generic genres deprioritized when picking a fallback primary genre
const GENERIC_GENRES: [&str; 5] = ["pop", "rock", "electronic", "indie", "alternative"];

/// Normalize a genre string: lowercase, strip special characters, collapse
/// whitespace/hyphen runs to a single space, trim.
///
/// Idempotent: `normalize(normalize(s)) == normalize(s)`. Normalized forms
/// are the only strings genre comparisons happen on.
pub fn normalize(genre: &str) -> String {
    let lowered = genre.to_lowercase();

    // Anything outside word chars, whitespace and hyphens becomes a space,
    // then whitespace/hyphen runs collapse into single spaces.
    let cleaned: String = lowered
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() || c == '-' {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve the primary genre for a track from its artists' tag lists.
///
/// Votes are tallied over normalized forms; a genre with the most votes
/// wins, with ties broken by first appearance in the flattened list so the
/// result is deterministic for a fixed input. When every tag has exactly
/// one vote there is no real signal, so the first non-generic tag is taken
/// instead. Returns the original (raw) spelling of the chosen genre, or
/// the empty string when no artist carries a usable tag.
pub fn resolve_primary_genre<'a>(tag_lists: impl IntoIterator<Item = &'a [String]>) -> String {
    // (raw, normalized) in first-seen order, skipping tags that normalize away
    let mut tags: Vec<(&str, String)> = Vec::new();
    for list in tag_lists {
        for raw in list {
            let norm = normalize(raw);
            if !norm.is_empty() {
                tags.push((raw.as_str(), norm));
            }
        }
    }

    if tags.is_empty() {
        return String::new();
    }

    let mut winner: (&str, usize) = ("", 0);
    for (raw, norm) in &tags {
        let count = tags.iter().filter(|(_, n)| n == norm).count();
        // Strictly greater keeps the first-seen genre on ties
        if count > winner.1 {
            winner = (raw, count);
        }
    }

    if winner.1 > 1 {
        winner.0.to_string()
    } else {
        // Every tag got exactly one vote: prefer the first non-generic tag
        extract_fallback_genre(&tags)
    }
}

/// Pick the first non-generic tag, defaulting to the first tag overall
fn extract_fallback_genre(tags: &[(&str, String)]) -> String {
    tags.iter()
        .find(|(_, norm)| !GENERIC_GENRES.contains(&norm.as_str()))
        .or_else(|| tags.first())
        .map(|(raw, _)| raw.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_collapses() {
        assert_eq!(normalize("Indie-Rock "), "indie rock");
        assert_eq!(normalize("  Synth--Pop!!"), "synth pop");
        assert_eq!(normalize("R&B"), "r b");
    }

    #[test]
    fn normalize_is_idempotent() {
        for input in ["Indie-Rock ", "Hip-Hop / Rap", "  weird***genre  ", "r&b"] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn normalize_empty_and_punctuation_only() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("!!!"), "");
    }

    #[test]
    fn primary_genre_majority_wins() {
        let a = vec!["indie rock".to_string(), "synth-pop".to_string()];
        let b = vec!["indie rock".to_string()];
        let lists = [a.as_slice(), b.as_slice()];
        assert_eq!(resolve_primary_genre(lists), "indie rock");
    }

    #[test]
    fn primary_genre_tie_breaks_by_first_seen() {
        let a = vec!["dream pop".to_string(), "shoegaze".to_string()];
        let lists = [a.as_slice()];
        assert_eq!(resolve_primary_genre(lists), "dream pop");
    }

    #[test]
    fn single_votes_skip_generic_tags() {
        // No majority; "pop" is generic so the narrower tag wins
        let a = vec!["pop".to_string(), "bedroom pop".to_string()];
        let lists = [a.as_slice()];
        assert_eq!(resolve_primary_genre(lists), "bedroom pop");
    }

    #[test]
    fn all_generic_tags_fall_back_to_first() {
        let a = vec!["rock".to_string(), "pop".to_string()];
        let lists = [a.as_slice()];
        assert_eq!(resolve_primary_genre(lists), "rock");
    }

    #[test]
    fn primary_genre_empty_input() {
        let lists: [&[String]; 0] = [];
        assert_eq!(resolve_primary_genre(lists), "");
    }

    #[test]
    fn primary_genre_matches_across_spellings() {
        // Different raw spellings of the same normalized genre vote together
        let a = vec!["Synth-Pop".to_string()];
        let b = vec!["synth pop".to_string(), "ambient".to_string()];
        let lists = [a.as_slice(), b.as_slice()];
        assert_eq!(resolve_primary_genre(lists), "Synth-Pop");
    }
}
