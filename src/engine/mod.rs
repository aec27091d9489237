//! Assignment & aggregation engine — the pure core of the pipeline.
//!
//! Takes the similarity matrix returned by the classifier and derives, with
//! no I/O and no mutation of its inputs:
//!
//! 1. A topic assignment per document: the highest-scoring topic when that
//!    score clears the cutoff, otherwise the "Unclassified" sentinel. Ties
//!    resolve to the lowest topic index (stable scan order).
//! 2. A per-topic, per-year count series over the distinct years present in
//!    the corpus, with the matching documents kept for drill-down. Topics
//!    with no matches still get a zero entry for every year.
//!
//! Unclassified documents are tracked per year alongside the topic series —
//! they matter for the count-conservation invariant — but are never part of
//! the rendered chart or the interpreter's trend text.
//!
//! A matrix whose shape disagrees with the document or topic list is a
//! programming-contract violation and fails fast rather than silently
//! truncating.

use anyhow::Result;

use crate::corpus::Document;

/// Sentinel topic name for documents whose best score is below the cutoff.
pub const UNCLASSIFIED: &str = "Unclassified";

/// One similarity row per document (corpus order), one score per topic
/// (request order).
pub type SimilarityMatrix = Vec<Vec<f64>>;

/// Derived per-document topic assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicAssignment {
    /// Index into the topic list, or `None` when unclassified.
    pub topic_index: Option<usize>,
    /// Topic name, or the [`UNCLASSIFIED`] sentinel.
    pub topic_name: String,
}

/// One point on a topic's line: a year, how many documents landed there,
/// and which ones (indices into the corpus, stored order preserved).
#[derive(Debug, Clone, PartialEq)]
pub struct YearPoint {
    pub year: String,
    pub count: usize,
    pub doc_indices: Vec<usize>,
}

/// A topic's full line: one point per year, ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicSeries {
    pub topic: String,
    pub points: Vec<YearPoint>,
}

/// The aggregated result: every requested topic's series over the shared
/// year axis, plus the internal unclassified bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendSeries {
    /// Distinct years present in the corpus, ascending.
    pub years: Vec<String>,
    /// One series per requested topic, in request order.
    pub topics: Vec<TopicSeries>,
    /// Per-year unclassified counts. Tracked for the conservation invariant,
    /// excluded from rendering and interpretation.
    pub unclassified: Vec<YearPoint>,
}

impl TrendSeries {
    /// Highest count across every topic point. Zero for an empty series.
    pub fn max_count(&self) -> usize {
        self.topics
            .iter()
            .flat_map(|t| t.points.iter())
            .map(|p| p.count)
            .max()
            .unwrap_or(0)
    }

    /// Topic names in request order.
    pub fn topic_names(&self) -> Vec<&str> {
        self.topics.iter().map(|t| t.topic.as_str()).collect()
    }
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

/// Check the matrix shape against the document and topic counts.
///
/// Fails with an explicit message on any mismatch — a wrong-shaped matrix
/// means the caller wired documents and responses together incorrectly, and
/// silently truncating would corrupt every downstream count.
pub fn validate_matrix_shape(
    similarity: &SimilarityMatrix,
    doc_count: usize,
    topic_count: usize,
) -> Result<()> {
    if similarity.len() != doc_count {
        anyhow::bail!(
            "invalid similarity matrix shape: {} rows for {} documents",
            similarity.len(),
            doc_count
        );
    }
    for (i, row) in similarity.iter().enumerate() {
        if row.len() != topic_count {
            anyhow::bail!(
                "invalid similarity matrix shape: row {} has {} scores for {} topics",
                i,
                row.len(),
                topic_count
            );
        }
    }
    Ok(())
}

/// Assign a topic to every document from its similarity row.
///
/// The assignment is `argmax(row)` accepted only when the winning score is
/// at or above `cutoff`. The scan keeps the first maximum it sees, so ties
/// deterministically resolve to the lowest topic index. An empty topic list
/// leaves every document unclassified.
pub fn assign_topics(
    similarity: &SimilarityMatrix,
    topics: &[String],
    doc_count: usize,
    cutoff: f64,
) -> Result<Vec<TopicAssignment>> {
    validate_matrix_shape(similarity, doc_count, topics.len())?;

    let assignments = similarity
        .iter()
        .map(|row| {
            let best = row
                .iter()
                .enumerate()
                // Strict greater-than keeps the first occurrence on ties.
                .fold(None::<(usize, f64)>, |best, (i, &score)| match best {
                    Some((_, top)) if score <= top => best,
                    _ => Some((i, score)),
                });

            match best {
                Some((index, score)) if score >= cutoff => TopicAssignment {
                    topic_index: Some(index),
                    topic_name: topics[index].clone(),
                },
                _ => TopicAssignment {
                    topic_index: None,
                    topic_name: UNCLASSIFIED.to_string(),
                },
            }
        })
        .collect();

    Ok(assignments)
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Group assignments into per-topic, per-year counts.
///
/// Years are the distinct set present in `documents`, ascending. Every topic
/// gets a point for every year, zero-filled where nothing matched, so a
/// topic with no documents at all still renders as a flat zero line. Pure
/// and deterministic: identical inputs always yield an identical series.
pub fn aggregate(
    documents: &[Document],
    assignments: &[TopicAssignment],
    topics: &[String],
) -> TrendSeries {
    debug_assert_eq!(documents.len(), assignments.len());

    let mut years: Vec<String> = documents.iter().map(|d| d.year.clone()).collect();
    years.sort();
    years.dedup();

    let year_index = |year: &str| years.iter().position(|y| y == year);

    let empty_points = || -> Vec<YearPoint> {
        years
            .iter()
            .map(|year| YearPoint {
                year: year.clone(),
                count: 0,
                doc_indices: Vec::new(),
            })
            .collect()
    };

    let mut topic_series: Vec<TopicSeries> = topics
        .iter()
        .map(|topic| TopicSeries {
            topic: topic.clone(),
            points: empty_points(),
        })
        .collect();
    let mut unclassified = empty_points();

    for (doc_index, (doc, assignment)) in documents.iter().zip(assignments.iter()).enumerate() {
        let Some(yi) = year_index(&doc.year) else {
            continue;
        };
        let point = match assignment.topic_index {
            Some(ti) => &mut topic_series[ti].points[yi],
            None => &mut unclassified[yi],
        };
        point.count += 1;
        point.doc_indices.push(doc_index);
    }

    TrendSeries {
        years,
        topics: topic_series,
        unclassified,
    }
}

/// Convenience for the full derivation: assign, then aggregate.
pub fn derive_series(
    documents: &[Document],
    similarity: &SimilarityMatrix,
    topics: &[String],
    cutoff: f64,
) -> Result<TrendSeries> {
    let assignments = assign_topics(similarity, topics, documents.len(), cutoff)?;
    Ok(aggregate(documents, &assignments, topics))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn doc(year: &str, title: &str, abstract_text: &str) -> Document {
        Document {
            id: format!("{year}.{title}"),
            title: title.to_string(),
            abstract_text: abstract_text.to_string(),
            update_date: format!("{year}-01-01"),
            year: year.to_string(),
            extra: BTreeMap::new(),
        }
    }

    fn topics(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn argmax_assignment_with_cutoff() {
        let similarity = vec![vec![0.9, 0.1], vec![0.2, 0.8], vec![0.25, 0.25]];
        let t = topics(&["t1", "t2"]);
        let assignments = assign_topics(&similarity, &t, 3, 0.3).unwrap();

        assert_eq!(assignments[0].topic_index, Some(0));
        assert_eq!(assignments[0].topic_name, "t1");
        assert_eq!(assignments[1].topic_index, Some(1));
        assert_eq!(assignments[2].topic_index, None);
        assert_eq!(assignments[2].topic_name, UNCLASSIFIED);
    }

    #[test]
    fn ties_resolve_to_lowest_index() {
        let similarity = vec![vec![0.6, 0.6, 0.6]];
        let t = topics(&["a", "b", "c"]);
        let assignments = assign_topics(&similarity, &t, 1, 0.3).unwrap();
        assert_eq!(assignments[0].topic_index, Some(0));
        assert_eq!(assignments[0].topic_name, "a");
    }

    #[test]
    fn empty_topic_list_leaves_everything_unclassified() {
        let similarity = vec![vec![], vec![]];
        let assignments = assign_topics(&similarity, &[], 2, 0.3).unwrap();
        assert!(assignments.iter().all(|a| a.topic_index.is_none()));
    }

    #[test]
    fn row_count_mismatch_fails_fast() {
        let similarity = vec![vec![0.5]];
        let t = topics(&["t1"]);
        let err = assign_topics(&similarity, &t, 2, 0.3).unwrap_err();
        assert!(err.to_string().contains("invalid similarity matrix shape"));
    }

    #[test]
    fn row_length_mismatch_fails_fast() {
        let similarity = vec![vec![0.5, 0.5], vec![0.5]];
        let t = topics(&["t1", "t2"]);
        let err = assign_topics(&similarity, &t, 2, 0.3).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn spec_scenario_aggregates_correctly() {
        // docs: 2020/A, 2020/B, 2021/C; cutoff 0.3
        let documents = vec![doc("2020", "A", "x"), doc("2020", "B", "y"), doc("2021", "C", "z")];
        let similarity = vec![vec![0.9, 0.1], vec![0.2, 0.8], vec![0.25, 0.25]];
        let t = topics(&["t1", "t2"]);

        let series = derive_series(&documents, &similarity, &t, 0.3).unwrap();

        assert_eq!(series.years, vec!["2020", "2021"]);
        let t1 = &series.topics[0];
        let t2 = &series.topics[1];
        assert_eq!(t1.points[0].count, 1); // A -> t1 in 2020
        assert_eq!(t1.points[1].count, 0);
        assert_eq!(t2.points[0].count, 1); // B -> t2 in 2020
        assert_eq!(t2.points[1].count, 0);
        // C ties at 0.25, below cutoff anyway -> unclassified 2021
        assert_eq!(series.unclassified[1].count, 1);
        assert_eq!(series.unclassified[1].doc_indices, vec![2]);
    }

    #[test]
    fn counts_are_conserved_per_year() {
        let documents = vec![
            doc("2020", "A", "x"),
            doc("2020", "B", "y"),
            doc("2020", "C", "z"),
            doc("2021", "D", "w"),
        ];
        let similarity = vec![
            vec![0.9, 0.1],
            vec![0.1, 0.9],
            vec![0.1, 0.1],
            vec![0.5, 0.4],
        ];
        let t = topics(&["t1", "t2"]);
        let series = derive_series(&documents, &similarity, &t, 0.3).unwrap();

        for (yi, year) in series.years.iter().enumerate() {
            let classified: usize = series.topics.iter().map(|t| t.points[yi].count).sum();
            let total = documents.iter().filter(|d| &d.year == year).count();
            assert_eq!(
                classified + series.unclassified[yi].count,
                total,
                "conservation violated for {year}"
            );
        }
    }

    #[test]
    fn raising_cutoff_is_monotone_toward_unclassified() {
        let documents = vec![doc("2020", "A", "x"), doc("2020", "B", "y"), doc("2021", "C", "z")];
        let similarity = vec![vec![0.9, 0.1], vec![0.2, 0.8], vec![0.4, 0.25]];
        let t = topics(&["t1", "t2"]);

        let low = assign_topics(&similarity, &t, 3, 0.3).unwrap();
        let high = assign_topics(&similarity, &t, 3, 0.5).unwrap();

        for (lo, hi) in low.iter().zip(high.iter()) {
            // A document classified at the high cutoff must have the same
            // assignment at the low cutoff; movement only goes one way.
            if hi.topic_index.is_some() {
                assert_eq!(lo.topic_index, hi.topic_index);
            }
        }
        // doc1 at 0.8 stays t2 across the raise; doc2 at 0.4 drops out.
        assert_eq!(high[1].topic_index, Some(1));
        assert_eq!(high[2].topic_index, None);
    }

    #[test]
    fn aggregation_is_deterministic() {
        let documents = vec![doc("2019", "A", "x"), doc("2020", "B", "y")];
        let similarity = vec![vec![0.7], vec![0.2]];
        let t = topics(&["only"]);

        let first = derive_series(&documents, &similarity, &t, 0.3).unwrap();
        let second = derive_series(&documents, &similarity, &t, 0.3).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn zero_match_topic_still_present_with_zero_line() {
        let documents = vec![doc("2020", "A", "x"), doc("2021", "B", "y")];
        let similarity = vec![vec![0.9, 0.0], vec![0.8, 0.0]];
        let t = topics(&["hot", "cold"]);
        let series = derive_series(&documents, &similarity, &t, 0.3).unwrap();

        assert_eq!(series.topics.len(), 2);
        let cold = &series.topics[1];
        assert_eq!(cold.topic, "cold");
        assert!(cold.points.iter().all(|p| p.count == 0));
        assert_eq!(cold.points.len(), series.years.len());
    }

    #[test]
    fn empty_topics_produce_empty_series_list() {
        let documents = vec![doc("2020", "A", "x")];
        let similarity = vec![vec![]];
        let series = derive_series(&documents, &similarity, &[], 0.3).unwrap();
        assert!(series.topics.is_empty());
        assert_eq!(series.max_count(), 0);
        assert_eq!(series.unclassified[0].count, 1);
    }

    #[test]
    fn doc_indices_preserve_corpus_order() {
        let documents = vec![doc("2020", "A", "x"), doc("2020", "B", "y"), doc("2020", "C", "z")];
        let similarity = vec![vec![0.9], vec![0.9], vec![0.9]];
        let t = topics(&["t"]);
        let series = derive_series(&documents, &similarity, &t, 0.3).unwrap();
        assert_eq!(series.topics[0].points[0].doc_indices, vec![0, 1, 2]);
    }
}
