//! Fuzzy title matching of local files against the candidate set.
//!
//! Every unmatched file is compared with every title and synonym of every
//! candidate using a case-insensitive Levenshtein distance, and is assigned
//! the candidate with the smallest distance. There is no cutoff: as long as
//! the candidate set is non-empty, a file with a usable title always gets
//! some media id.
//!
//! Ties on distance go to the longer matched title, since short titles reach
//! low distances against short queries without being good matches. Remaining
//! ties go to the lower media id.

use episodex_common::{Error, MediaId, Result};
use serde::Serialize;
use tracing::{debug, trace};

use super::comparison::{normalize_title, title_distance};
use super::container::MediaContainer;
use super::local_file::{LocalFile, ParsedData};

/// Best candidate for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub media_id: MediaId,
    pub distance: usize,
    /// Candidate title that produced the distance.
    pub matched_title: String,
}

/// Outcome counts of one matching pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchStats {
    pub matched: usize,
    pub unmatched: usize,
    /// Files that already carried a media id.
    pub already_matched: usize,
}

pub struct Matcher<'a> {
    container: &'a MediaContainer,
}

impl<'a> Matcher<'a> {
    pub fn new(container: &'a MediaContainer) -> Self {
        Self { container }
    }

    /// Assign a media id to every file that does not have one yet.
    ///
    /// Fails with [`Error::NoCandidates`] when the container is empty. Files
    /// with an empty parsed title stay unmatched.
    pub fn match_local_files(&self, files: &mut [LocalFile]) -> Result<MatchStats> {
        if self.container.is_empty() {
            return Err(Error::NoCandidates);
        }

        let mut stats = MatchStats::default();
        for file in files.iter_mut() {
            if file.is_matched() {
                stats.already_matched += 1;
                continue;
            }

            match self.best_match(&file.parsed_data) {
                Some(result) => {
                    trace!(
                        path = %file.path.display(),
                        media_id = %result.media_id,
                        distance = result.distance,
                        title = %result.matched_title,
                        "Matched file"
                    );
                    file.media_id = result.media_id;
                    stats.matched += 1;
                }
                None => {
                    debug!(path = %file.path.display(), "File has no usable title");
                    stats.unmatched += 1;
                }
            }
        }

        debug!(
            matched = stats.matched,
            unmatched = stats.unmatched,
            already_matched = stats.already_matched,
            "Matching complete"
        );
        Ok(stats)
    }

    /// Closest candidate for `parsed`, or `None` when its title is empty.
    pub fn best_match(&self, parsed: &ParsedData) -> Option<MatchResult> {
        let queries = queries(parsed);
        if queries.is_empty() {
            return None;
        }

        let mut best: Option<(MatchResult, usize)> = None;
        for media in self.container.iter() {
            for title in media.all_titles() {
                for query in &queries {
                    let distance = title_distance(query, title);
                    let length = normalize_title(title).chars().count();

                    let better = match &best {
                        None => true,
                        Some((current, current_length)) => {
                            distance < current.distance
                                || (distance == current.distance && length > *current_length)
                        }
                    };
                    if better {
                        best = Some((
                            MatchResult {
                                media_id: media.id,
                                distance,
                                matched_title: title.to_string(),
                            },
                            length,
                        ));
                    }
                }
            }
        }

        best.map(|(result, _)| result)
    }
}

/// Normalized query strings for a parsed title, including season variants.
fn queries(parsed: &ParsedData) -> Vec<String> {
    let title = normalize_title(&parsed.title);
    if title.is_empty() {
        return Vec::new();
    }

    let mut queries = Vec::with_capacity(3);
    if let Some(season) = parsed.season_number().filter(|s| *s > 1) {
        queries.push(format!("{title} season {season}"));
        queries.push(format!("{title} {season}"));
    }
    queries.push(title);
    queries
}

#[cfg(test)]
mod tests {
    use super::*;
    use episodex_common::{CanonicalMedia, MediaTitle};

    fn media(id: u32, english: &str, synonyms: &[&str]) -> CanonicalMedia {
        CanonicalMedia {
            title: MediaTitle {
                english: Some(english.to_string()),
                ..MediaTitle::default()
            },
            synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
            ..CanonicalMedia::new(MediaId::new(id), "")
        }
    }

    fn file(title: &str) -> LocalFile {
        LocalFile::new(
            format!("/anime/{title} - 01.mkv"),
            ParsedData {
                title: title.to_string(),
                episode: Some("01".to_string()),
                ..ParsedData::default()
            },
        )
    }

    fn container() -> MediaContainer {
        MediaContainer::new(vec![
            media(16498, "Attack on Titan", &["Shingeki no Kyojin"]),
            media(20958, "Attack on Titan Season 2", &[]),
            media(457, "Mushishi", &["Mushi-shi"]),
        ])
    }

    // ---------------------------------------------------------------------------
    // Matching
    // ---------------------------------------------------------------------------

    #[test]
    fn test_exact_and_synonym_matches() {
        let container = container();
        let matcher = Matcher::new(&container);
        let mut files = vec![file("Mushishi"), file("shingeki no kyojin")];

        let stats = matcher.match_local_files(&mut files).unwrap();

        assert_eq!(stats.matched, 2);
        assert_eq!(files[0].media_id, MediaId::new(457));
        assert_eq!(files[1].media_id, MediaId::new(16498));
    }

    #[test]
    fn test_season_hint_prefers_later_season() {
        let container = container();
        let matcher = Matcher::new(&container);
        let mut parsed = file("Attack on Titan").parsed_data;
        parsed.season = Some("2".to_string());

        let result = matcher.best_match(&parsed).unwrap();
        assert_eq!(result.media_id, MediaId::new(20958));
        assert_eq!(result.distance, 0);
    }

    #[test]
    fn test_always_assigns_some_candidate() {
        let container = container();
        let matcher = Matcher::new(&container);
        let mut files = vec![file("Completely Unrelated Show")];

        matcher.match_local_files(&mut files).unwrap();
        assert!(files[0].is_matched());
    }

    #[test]
    fn test_empty_candidate_set_fails() {
        let container = MediaContainer::new(Vec::new());
        let mut files = vec![file("Mushishi")];

        let err = Matcher::new(&container).match_local_files(&mut files).unwrap_err();
        assert!(matches!(err, Error::NoCandidates));
        assert!(!files[0].is_matched());
    }

    #[test]
    fn test_already_matched_and_untitled_files_untouched() {
        let container = container();
        let matcher = Matcher::new(&container);
        let mut preset = file("Mushishi");
        preset.media_id = MediaId::new(99);
        let mut files = vec![preset, file("   ")];

        let stats = matcher.match_local_files(&mut files).unwrap();

        assert_eq!(stats.already_matched, 1);
        assert_eq!(stats.unmatched, 1);
        assert_eq!(files[0].media_id, MediaId::new(99));
        assert!(!files[1].is_matched());
    }

    // ---------------------------------------------------------------------------
    // Tie-breaking
    // ---------------------------------------------------------------------------

    #[test]
    fn test_tie_prefers_longer_title() {
        // "abcd" is one edit from both "abc" and "abcde".
        let container = MediaContainer::new(vec![media(1, "abc", &[]), media(2, "abcde", &[])]);
        let result = Matcher::new(&container).best_match(&file("abcd").parsed_data).unwrap();

        assert_eq!(result.distance, 1);
        assert_eq!(result.media_id, MediaId::new(2));
        assert_eq!(result.matched_title, "abcde");
    }

    #[test]
    fn test_full_tie_prefers_lower_id() {
        let container = MediaContainer::new(vec![media(8, "abce", &[]), media(3, "abcf", &[])]);
        let result = Matcher::new(&container).best_match(&file("abcd").parsed_data).unwrap();
        assert_eq!(result.media_id, MediaId::new(3));
    }

    #[test]
    fn test_deterministic() {
        let container = container();
        let matcher = Matcher::new(&container);
        let parsed = file("Attack Titan").parsed_data;

        let first = matcher.best_match(&parsed).unwrap();
        for _ in 0..10 {
            assert_eq!(matcher.best_match(&parsed).unwrap(), first);
        }
    }
}
