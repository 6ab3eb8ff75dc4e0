//! Genre family grouping
//!
//! Maps specific genres onto coarser parent categories and suggests which
//! families are worth merging. Table keys are stored in normalized form
//! (see [`normalize`]) so lookups never depend on raw spellings.

use super::normalizer::normalize;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// A parent genre and the child genres that map to it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenreGroup {
    pub parent: String,
    pub children: Vec<String>,
    pub count: usize,
}

/// A suggestion to merge a family's child genres into the parent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSuggestion {
    pub parent_genre: String,
    pub child_genres: Vec<String>,
    pub total_tracks: usize,
    pub playlists_to_merge: usize,
}

/// Specific genre (normalized) -> parent genre
static GENRE_FAMILIES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        // Rock family
        ("indie rock", "Rock"),
        ("alternative rock", "Rock"),
        ("classic rock", "Rock"),
        ("hard rock", "Rock"),
        ("soft rock", "Rock"),
        ("progressive rock", "Rock"),
        ("psychedelic rock", "Rock"),
        ("garage rock", "Rock"),
        ("punk rock", "Rock"),
        ("post punk", "Rock"),
        ("art rock", "Rock"),
        ("folk rock", "Rock"),
        ("blues rock", "Rock"),
        ("southern rock", "Rock"),
        ("glam rock", "Rock"),
        ("stoner rock", "Rock"),
        ("grunge", "Rock"),
        ("britpop", "Rock"),
        ("rock", "Rock"),
        // Pop family
        ("indie pop", "Pop"),
        ("synth pop", "Pop"),
        ("synthpop", "Pop"),
        ("electropop", "Pop"),
        ("dream pop", "Pop"),
        ("chamber pop", "Pop"),
        ("art pop", "Pop"),
        ("dance pop", "Pop"),
        ("power pop", "Pop"),
        ("baroque pop", "Pop"),
        ("k pop", "Pop"),
        ("j pop", "Pop"),
        ("c pop", "Pop"),
        ("pop", "Pop"),
        // Electronic family
        ("house", "Electronic"),
        ("deep house", "Electronic"),
        ("tech house", "Electronic"),
        ("progressive house", "Electronic"),
        ("techno", "Electronic"),
        ("trance", "Electronic"),
        ("drum and bass", "Electronic"),
        ("dubstep", "Electronic"),
        ("edm", "Electronic"),
        ("ambient", "Electronic"),
        ("idm", "Electronic"),
        ("downtempo", "Electronic"),
        ("chillwave", "Electronic"),
        ("electronica", "Electronic"),
        ("electronic", "Electronic"),
        ("synthwave", "Electronic"),
        ("retrowave", "Electronic"),
        ("vaporwave", "Electronic"),
        // Hip-Hop family
        ("hip hop", "Hip-Hop"),
        ("rap", "Hip-Hop"),
        ("trap", "Hip-Hop"),
        ("southern hip hop", "Hip-Hop"),
        ("east coast hip hop", "Hip-Hop"),
        ("west coast hip hop", "Hip-Hop"),
        ("underground hip hop", "Hip-Hop"),
        ("conscious hip hop", "Hip-Hop"),
        ("boom bap", "Hip-Hop"),
        ("gangsta rap", "Hip-Hop"),
        ("drill", "Hip-Hop"),
        // R&B family
        ("r b", "R&B/Soul"),
        ("rnb", "R&B/Soul"),
        ("soul", "R&B/Soul"),
        ("neo soul", "R&B/Soul"),
        ("contemporary r b", "R&B/Soul"),
        ("funk", "R&B/Soul"),
        ("motown", "R&B/Soul"),
        // Metal family
        ("heavy metal", "Metal"),
        ("death metal", "Metal"),
        ("black metal", "Metal"),
        ("thrash metal", "Metal"),
        ("progressive metal", "Metal"),
        ("doom metal", "Metal"),
        ("power metal", "Metal"),
        ("metalcore", "Metal"),
        ("nu metal", "Metal"),
        ("symphonic metal", "Metal"),
        ("metal", "Metal"),
        // Jazz family
        ("jazz", "Jazz"),
        ("smooth jazz", "Jazz"),
        ("acid jazz", "Jazz"),
        ("jazz fusion", "Jazz"),
        ("bebop", "Jazz"),
        ("swing", "Jazz"),
        ("big band", "Jazz"),
        ("free jazz", "Jazz"),
        // Classical family
        ("classical", "Classical"),
        ("baroque", "Classical"),
        ("romantic", "Classical"),
        ("opera", "Classical"),
        ("orchestral", "Classical"),
        ("chamber music", "Classical"),
        ("contemporary classical", "Classical"),
        // Country family
        ("country", "Country"),
        ("country rock", "Country"),
        ("alt country", "Country"),
        ("americana", "Country"),
        ("bluegrass", "Country"),
        ("country pop", "Country"),
        ("outlaw country", "Country"),
        // Folk family
        ("folk", "Folk"),
        ("indie folk", "Folk"),
        ("contemporary folk", "Folk"),
        ("acoustic", "Folk"),
        ("singer songwriter", "Folk"),
        // Reggae family
        ("reggae", "Reggae"),
        ("dancehall", "Reggae"),
        ("dub", "Reggae"),
        ("ska", "Reggae"),
        // Latin family
        ("latin", "Latin"),
        ("latin pop", "Latin"),
        ("salsa", "Latin"),
        ("bachata", "Latin"),
        ("cumbia", "Latin"),
        ("bossa nova", "Latin"),
        ("samba", "Latin"),
        ("reggaeton", "Latin"),
        // Blues family
        ("blues", "Blues"),
        ("delta blues", "Blues"),
        ("chicago blues", "Blues"),
        ("electric blues", "Blues"),
    ])
});

/// Keyword substrings (normalized) checked against genres with no exact
/// family entry. Longer, more specific keywords come first so "hip hop"
/// wins before "pop", and "indie pop" resolves via "pop" rather than the
/// trailing "indie" catch-all.
static PARENT_KEYWORDS: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    vec![
        ("hip hop", "Hip-Hop"),
        ("electronic", "Electronic"),
        ("classical", "Classical"),
        ("country", "Country"),
        ("reggae", "Reggae"),
        ("electro", "Electronic"),
        ("techno", "Electronic"),
        ("trance", "Electronic"),
        ("house", "Electronic"),
        ("metal", "Metal"),
        ("blues", "Blues"),
        ("latin", "Latin"),
        ("rock", "Rock"),
        ("jazz", "Jazz"),
        ("folk", "Folk"),
        ("soul", "R&B/Soul"),
        ("r b", "R&B/Soul"),
        ("punk", "Rock"),
        ("rap", "Hip-Hop"),
        ("pop", "Pop"),
        // Bare "indie" defaults to Rock; indie pop / indie folk etc. have
        // already matched their more specific keyword above.
        ("indie", "Rock"),
    ]
});

/// Parent genre for a given genre, or the genre itself when no family or
/// keyword matches (self-mapped).
pub fn parent_genre(genre: &str) -> String {
    let normalized = normalize(genre);

    if let Some(parent) = GENRE_FAMILIES.get(normalized.as_str()) {
        return (*parent).to_string();
    }

    for (keyword, parent) in PARENT_KEYWORDS.iter() {
        if normalized.contains(keyword) {
            return (*parent).to_string();
        }
    }

    genre.to_string()
}

/// Partition a genre -> track-count distribution into parent-genre groups.
///
/// Groups are sorted by combined count (descending, then parent name) and
/// each group's children by per-genre count (descending, then name), so the
/// result is deterministic for a fixed distribution.
pub fn group_genres(distribution: &HashMap<String, usize>) -> Vec<GenreGroup> {
    let mut groups: HashMap<String, GenreGroup> = HashMap::new();

    for (genre, &count) in distribution {
        let parent = parent_genre(genre);
        let group = groups.entry(parent.clone()).or_insert_with(|| GenreGroup {
            parent,
            children: Vec::new(),
            count: 0,
        });
        group.children.push(genre.clone());
        group.count += count;
    }

    let mut result: Vec<GenreGroup> = groups.into_values().collect();
    for group in &mut result {
        group
            .children
            .sort_by(|a, b| distribution[b].cmp(&distribution[a]).then_with(|| a.cmp(b)));
    }
    result.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.parent.cmp(&b.parent)));
    result
}

/// Suggest which genre families to merge into their parent playlist.
///
/// A family with more than one child is suggested when any child falls
/// below `min_tracks_threshold` or the family has more than 3 children.
/// Sorted by number of playlists merged, most impactful first.
pub fn suggest_groupings(
    distribution: &HashMap<String, usize>,
    min_tracks_threshold: usize,
) -> Vec<GroupSuggestion> {
    let mut suggestions: Vec<GroupSuggestion> = group_genres(distribution)
        .into_iter()
        .filter(|group| group.children.len() > 1)
        .filter(|group| {
            let has_small_child = group
                .children
                .iter()
                .any(|child| distribution[child] < min_tracks_threshold);
            has_small_child || group.children.len() > 3
        })
        .map(|group| GroupSuggestion {
            parent_genre: group.parent,
            playlists_to_merge: group.children.len(),
            child_genres: group.children,
            total_tracks: group.count,
        })
        .collect();

    suggestions.sort_by(|a, b| {
        b.playlists_to_merge
            .cmp(&a.playlists_to_merge)
            .then_with(|| a.parent_genre.cmp(&b.parent_genre))
    });
    suggestions
}

/// Map a genre to its parent if grouping is enabled for that family
pub fn apply_grouping(genre: &str, enabled_groups: &HashSet<String>) -> String {
    let parent = parent_genre(genre);
    if enabled_groups.contains(&parent) {
        parent
    } else {
        genre.to_string()
    }
}

/// All parent genre categories, sorted
pub fn all_parent_genres() -> Vec<String> {
    let parents: BTreeSet<&str> = GENRE_FAMILIES.values().copied().collect();
    parents.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_table_match() {
        assert_eq!(parent_genre("indie rock"), "Rock");
        assert_eq!(parent_genre("Synth-Pop"), "Pop");
        assert_eq!(parent_genre("r&b"), "R&B/Soul");
        assert_eq!(parent_genre("deep house"), "Electronic");
    }

    #[test]
    fn keyword_fallback_prefers_specific() {
        // Not in the table; "hip hop" keyword must win before "pop" or "rap"
        assert_eq!(parent_genre("finnish hip hop"), "Hip-Hop");
        // "pop" keyword fires before the "indie" catch-all
        assert_eq!(parent_genre("norwegian indie pop"), "Pop");
        assert_eq!(parent_genre("egg punk"), "Rock");
    }

    #[test]
    fn unknown_genre_is_self_mapped() {
        assert_eq!(parent_genre("made-up-genre-xyz"), "made-up-genre-xyz");
    }

    #[test]
    fn group_genres_partitions_and_sorts() {
        let distribution = HashMap::from([
            ("indie rock".to_string(), 5),
            ("classic rock".to_string(), 3),
            ("jazz".to_string(), 2),
        ]);
        let groups = group_genres(&distribution);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].parent, "Rock");
        assert_eq!(groups[0].count, 8);
        assert_eq!(groups[0].children, vec!["indie rock", "classic rock"]);
        assert_eq!(groups[1].parent, "Jazz");
    }

    #[test]
    fn suggest_groupings_below_threshold() {
        let distribution = HashMap::from([
            ("indie rock".to_string(), 5),
            ("classic rock".to_string(), 3),
            ("hard rock".to_string(), 2),
        ]);
        let suggestions = suggest_groupings(&distribution, 10);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].parent_genre, "Rock");
        assert_eq!(suggestions[0].playlists_to_merge, 3);
        assert_eq!(suggestions[0].total_tracks, 10);
        assert_eq!(
            suggestions[0].child_genres,
            vec!["indie rock", "classic rock", "hard rock"]
        );
    }

    #[test]
    fn no_suggestion_for_single_child_family() {
        let distribution = HashMap::from([("jazz".to_string(), 1)]);
        assert!(suggest_groupings(&distribution, 10).is_empty());
    }

    #[test]
    fn large_family_suggested_even_above_threshold() {
        let distribution = HashMap::from([
            ("indie rock".to_string(), 50),
            ("classic rock".to_string(), 40),
            ("hard rock".to_string(), 30),
            ("punk rock".to_string(), 20),
        ]);
        let suggestions = suggest_groupings(&distribution, 10);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].playlists_to_merge, 4);
    }

    #[test]
    fn apply_grouping_respects_enabled_set() {
        let enabled: HashSet<String> = HashSet::from(["Rock".to_string()]);
        assert_eq!(apply_grouping("indie rock", &enabled), "Rock");
        assert_eq!(apply_grouping("jazz", &enabled), "jazz");
        assert_eq!(apply_grouping("jazz", &HashSet::new()), "jazz");
    }

    #[test]
    fn all_parents_sorted_unique() {
        let parents = all_parent_genres();
        assert!(parents.contains(&"Rock".to_string()));
        assert!(parents.windows(2).all(|w| w[0] < w[1]));
    }
}
