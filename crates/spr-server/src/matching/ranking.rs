//! Pairwise re-ranking of a candidate block.
//!
//! Search scores only say how well a record matched the analyzed fields; the
//! final ordering compares each candidate against the caller-supplied
//! metadata field by field and averages over the criteria that were actually
//! provided. Scores live in `[0, 1]`, 1 is a perfect match.

use super::MatchCandidate;

/// DOI prefixes of preprint archives indexed alongside publisher records.
pub const PREPRINT_DOI_PREFIXES: [&str; 3] = ["10.1101", "10.36227", "10.48550"];

/// A runner-up this close to a preprint top hit takes its place.
pub const PREPRINT_DEMOTION_THRESHOLD: f64 = 0.99;

/// Caller-supplied metadata a block is ranked against.
#[derive(Debug, Clone, Default)]
pub struct ReferenceRecord {
    pub title: Option<String>,
    pub first_author: Option<String>,
    pub journal_title: Option<String>,
    pub year: Option<String>,
}

impl ReferenceRecord {
    /// True when no criterion besides the blocking score would apply.
    pub fn is_empty(&self) -> bool {
        non_blank(&self.title).is_none()
            && non_blank(&self.first_author).is_none()
            && non_blank(&self.journal_title).is_none()
            && non_blank(&self.year).is_none()
    }
}

/// Case-insensitive string similarity in `[0, 1]`. Blank input scores 0.
pub fn similarity(left: &str, right: &str) -> f64 {
    if left.trim().is_empty() || right.trim().is_empty() {
        return 0.0;
    }
    strsim::sorensen_dice(&left.to_lowercase(), &right.to_lowercase())
}

/// Distance between a candidate and the reference metadata: the mean over
/// the supplied criteria, with the blocking score always counted as one.
pub fn record_distance(candidate: &MatchCandidate, reference: &ReferenceRecord) -> f64 {
    let mut criteria = 0u32;
    let mut accumulated = 0.0;

    if let Some(title) = non_blank(&reference.title) {
        criteria += 1;
        if let Some(candidate_title) = non_blank(&candidate.title) {
            accumulated += similarity(title, candidate_title);
        }
    }

    if let Some(author) = non_blank(&reference.first_author) {
        criteria += 1;
        if let Some(candidate_author) = non_blank(&candidate.first_author) {
            accumulated += similarity(author, candidate_author);
        }
    }

    criteria += 1;
    accumulated += candidate.blocking_score;

    // journal titles are only trusted on records that carry a DOI; on the
    // rest the container name is usually a preprint archive
    if let Some(jtitle) = non_blank(&reference.journal_title) {
        if candidate.doi.is_some() {
            criteria += 1;
            let mut journal_score = 0.0;
            if let Some(journal) = non_blank(&candidate.journal) {
                journal_score = similarity(jtitle, journal);
            }
            if let Some(abbreviated) = non_blank(&candidate.abbreviated_journal) {
                journal_score = journal_score.max(similarity(jtitle, abbreviated));
            }
            accumulated += journal_score;
        }
    }

    if let Some(year) = non_blank(&reference.year) {
        criteria += 1;
        if candidate.year.as_deref() == Some(year) {
            accumulated += 1.0;
        }
    }

    accumulated / f64::from(criteria)
}

/// Score every candidate against the reference and sort best-first.
pub fn rank(mut candidates: Vec<MatchCandidate>, reference: &ReferenceRecord) -> Vec<MatchCandidate> {
    for candidate in &mut candidates {
        candidate.matching_score = record_distance(candidate, reference);
    }
    candidates.sort_by(|a, b| b.matching_score.total_cmp(&a.matching_score));
    candidates
}

/// Normalize raw search scores over the block to `[0, 1]`, anchored at 1.0
/// below and 0.0 above before folding in the hits. A block without spread
/// normalizes to full weight.
pub fn normalize_blocking_scores(candidates: &mut [MatchCandidate]) {
    if candidates.is_empty() {
        return;
    }

    let mut min = 1.0f64;
    let mut max = 0.0f64;
    for candidate in candidates.iter() {
        min = min.min(candidate.blocking_score);
        max = max.max(candidate.blocking_score);
    }

    let span = max - min;
    for candidate in candidates.iter_mut() {
        candidate.blocking_score = if span.abs() < f64::EPSILON {
            1.0
        } else {
            (candidate.blocking_score - min) / span
        };
    }
}

/// When the top hit is a preprint and the runner-up scored within
/// [`PREPRINT_DEMOTION_THRESHOLD`] of it, prefer the runner-up.
pub fn demote_preprints(candidates: &mut [MatchCandidate]) {
    if candidates.len() < 2 {
        return;
    }
    if candidates[1].blocking_score <= candidates[0].blocking_score * PREPRINT_DEMOTION_THRESHOLD {
        return;
    }

    let top_is_preprint = candidates[0].doi.as_deref().is_some_and(|doi| {
        PREPRINT_DOI_PREFIXES
            .iter()
            .any(|prefix| doi.starts_with(prefix))
    });
    if top_is_preprint {
        candidates.swap(0, 1);
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(doi: Option<&str>, blocking_score: f64) -> MatchCandidate {
        MatchCandidate {
            doi: doi.map(str::to_string),
            blocking_score,
            ..MatchCandidate::default()
        }
    }

    #[test]
    fn test_similarity_blank_scores_zero() {
        assert_eq!(similarity("", "anything"), 0.0);
        assert_eq!(similarity("anything", "   "), 0.0);
    }

    #[test]
    fn test_similarity_is_case_insensitive() {
        assert_eq!(similarity("Deep Learning", "deep learning"), 1.0);
    }

    #[test]
    fn test_record_distance_averages_supplied_criteria() {
        let candidate = MatchCandidate {
            title: Some("Deep learning".to_string()),
            first_author: Some("LeCun".to_string()),
            blocking_score: 0.5,
            ..MatchCandidate::default()
        };
        let reference = ReferenceRecord {
            title: Some("Deep learning".to_string()),
            first_author: Some("LeCun".to_string()),
            ..ReferenceRecord::default()
        };
        // title 1.0, author 1.0, blocking 0.5 over three criteria
        let score = record_distance(&candidate, &reference);
        assert!((score - 2.5 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_record_distance_missing_candidate_field_scores_zero() {
        let candidate = MatchCandidate {
            blocking_score: 1.0,
            ..MatchCandidate::default()
        };
        let reference = ReferenceRecord {
            title: Some("Deep learning".to_string()),
            ..ReferenceRecord::default()
        };
        // title 0.0 against a candidate without one, blocking 1.0
        let score = record_distance(&candidate, &reference);
        assert!((score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_record_distance_journal_needs_doi() {
        let reference = ReferenceRecord {
            journal_title: Some("Nature".to_string()),
            ..ReferenceRecord::default()
        };

        let mut with_doi = candidate(Some("10.1038/nature14539"), 1.0);
        with_doi.journal = Some("Nature".to_string());
        // blocking 1.0 + journal 1.0 over two criteria
        assert!((record_distance(&with_doi, &reference) - 1.0).abs() < 1e-9);

        let mut without_doi = candidate(None, 1.0);
        without_doi.journal = Some("Nature".to_string());
        // journal criterion skipped, only blocking counts
        assert!((record_distance(&without_doi, &reference) - 1.0).abs() < 1e-9);

        let mut mismatched = candidate(Some("10.1/x"), 0.0);
        mismatched.journal = Some("Journal of Irreproducible Results".to_string());
        let score = record_distance(&mismatched, &reference);
        assert!(score < 0.5);
    }

    #[test]
    fn test_record_distance_journal_prefers_better_of_full_and_abbreviated() {
        let reference = ReferenceRecord {
            journal_title: Some("Phys Rev Lett".to_string()),
            ..ReferenceRecord::default()
        };
        let mut candidate = candidate(Some("10.1103/physrevlett.1.1"), 0.0);
        candidate.journal = Some("Physical Review Letters".to_string());
        candidate.abbreviated_journal = Some("Phys Rev Lett".to_string());
        // abbreviated name matches exactly: journal criterion contributes 1.0
        let score = record_distance(&candidate, &reference);
        assert!((score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_record_distance_year_is_exact() {
        let reference = ReferenceRecord {
            year: Some("2015".to_string()),
            ..ReferenceRecord::default()
        };

        let mut same = candidate(None, 0.0);
        same.year = Some("2015".to_string());
        assert!((record_distance(&same, &reference) - 0.5).abs() < 1e-9);

        let mut off_by_one = candidate(None, 0.0);
        off_by_one.year = Some("2016".to_string());
        assert!(record_distance(&off_by_one, &reference).abs() < 1e-9);
    }

    #[test]
    fn test_rank_orders_best_first() {
        let mut strong = candidate(None, 1.0);
        strong.title = Some("Deep learning".to_string());
        let mut weak = candidate(None, 0.2);
        weak.title = Some("Shallow parsing".to_string());

        let reference = ReferenceRecord {
            title: Some("Deep learning".to_string()),
            ..ReferenceRecord::default()
        };
        let ranked = rank(vec![weak, strong], &reference);
        assert_eq!(ranked[0].title.as_deref(), Some("Deep learning"));
        assert!(ranked[0].matching_score > ranked[1].matching_score);
    }

    #[test]
    fn test_normalize_spreads_block() {
        let mut block = vec![candidate(None, 12.0), candidate(None, 4.5)];
        normalize_blocking_scores(&mut block);
        assert!((block[0].blocking_score - 1.0).abs() < 1e-9);
        // the lower anchor stays at 1.0, so the runner-up lands at 3.5/11
        assert!((block[1].blocking_score - 3.5 / 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_block_without_spread() {
        let mut block = vec![candidate(None, 1.0)];
        normalize_blocking_scores(&mut block);
        assert_eq!(block[0].blocking_score, 1.0);

        let mut tied = vec![candidate(None, 0.8), candidate(None, 0.8)];
        normalize_blocking_scores(&mut tied);
        assert_eq!(tied[0].blocking_score, 1.0);
        assert_eq!(tied[1].blocking_score, 1.0);
    }

    #[test]
    fn test_demote_preprint_top_hit() {
        let mut block = vec![
            candidate(Some("10.1101/2020.03.01.971242"), 1.0),
            candidate(Some("10.1038/s41586-020-2012-7"), 0.995),
        ];
        demote_preprints(&mut block);
        assert_eq!(block[0].doi.as_deref(), Some("10.1038/s41586-020-2012-7"));
    }

    #[test]
    fn test_demotion_needs_close_runner_up() {
        let mut block = vec![
            candidate(Some("10.1101/2020.03.01.971242"), 1.0),
            candidate(Some("10.1038/s41586-020-2012-7"), 0.5),
        ];
        demote_preprints(&mut block);
        assert_eq!(block[0].doi.as_deref(), Some("10.1101/2020.03.01.971242"));
    }

    #[test]
    fn test_demotion_leaves_publisher_top_hit_alone() {
        let mut block = vec![
            candidate(Some("10.1038/s41586-020-2012-7"), 1.0),
            candidate(Some("10.1101/2020.03.01.971242"), 0.995),
        ];
        demote_preprints(&mut block);
        assert_eq!(block[0].doi.as_deref(), Some("10.1038/s41586-020-2012-7"));
    }
}
