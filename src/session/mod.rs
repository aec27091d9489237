//! Session context — explicit, shared state for one exploration session.
//!
//! Everything the original kept in page-level globals lives here instead:
//! the loaded corpus, the topic list, the most recent similarity matrix,
//! the cutoff, the derived trend series, and the chart's legend visibility.
//! Handlers take `&mut Session` plus user input and return new view state,
//! which keeps the pure pipeline unit-testable with no rendering surface.
//!
//! Classification runs are tagged with a request generation: `begin_classify`
//! issues the next tag, and `apply_classification` accepts a matrix only if
//! its tag is still the latest one issued. A slow response that arrives
//! after a newer classify was triggered is discarded instead of winning the
//! race by finishing last.

use anyhow::Result;

use crate::chart::Visibility;
use crate::corpus::{Corpus, Document};
use crate::engine::{self, SimilarityMatrix, TrendSeries};

/// Mutable state for one exploration session.
#[derive(Debug, Default)]
pub struct Session {
    /// Display name of the loaded demo, if any (used in prompts).
    pub demo_name: Option<String>,
    corpus: Option<Corpus>,
    topics: Vec<String>,
    pending_topics: Option<Vec<String>>,
    similarity: Option<SimilarityMatrix>,
    cutoff: f64,
    series: Option<TrendSeries>,
    visibility: Visibility,
    generation: u64,
}

impl Session {
    pub fn new(default_cutoff: f64) -> Self {
        Self {
            cutoff: default_cutoff,
            ..Self::default()
        }
    }

    // -- corpus ------------------------------------------------------------

    /// Replace the session's corpus wholesale. Clears the matrix and series
    /// from any previous corpus — derived views never outlive their inputs.
    pub fn set_corpus(&mut self, corpus: Corpus, demo_name: Option<String>, topics: Vec<String>) {
        self.corpus = Some(corpus);
        self.demo_name = demo_name;
        self.topics = topics;
        self.pending_topics = None;
        self.similarity = None;
        self.series = None;
        self.visibility.reset();
    }

    pub fn corpus(&self) -> Option<&Corpus> {
        self.corpus.as_ref()
    }

    pub fn documents(&self) -> &[Document] {
        self.corpus.as_ref().map_or(&[], |c| &c.documents)
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    // -- cutoff ------------------------------------------------------------

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Change the cutoff and re-derive the series from the stored matrix,
    /// without re-calling the classifier. A no-op on the series if nothing
    /// has been classified yet.
    pub fn set_cutoff(&mut self, cutoff: f64) -> Result<()> {
        self.cutoff = cutoff;
        self.recompute()
    }

    // -- classification ----------------------------------------------------

    /// Issue the tag for the next classification run. Call before the
    /// remote request; hand the tag back to [`apply_classification`].
    ///
    /// The topic list rides along as pending state and only becomes the
    /// session's topic list when the run's result is applied. A run that
    /// never resolves (endpoint failure, superseded request) leaves the
    /// committed topics and the derived series intact.
    pub fn begin_classify(&mut self, topics: Vec<String>) -> u64 {
        self.pending_topics = Some(topics);
        self.generation += 1;
        self.generation
    }

    /// Apply a classification result if its tag is still current.
    ///
    /// Returns `true` when applied. A stale tag (a newer classify was
    /// started while this response was in flight) leaves all state
    /// untouched and returns `false`. The new series is derived before
    /// anything is committed, so a malformed matrix also leaves the
    /// previous run in place.
    pub fn apply_classification(&mut self, tag: u64, similarity: SimilarityMatrix) -> Result<bool> {
        if tag != self.generation {
            return Ok(false);
        }
        let topics = self
            .pending_topics
            .take()
            .unwrap_or_else(|| self.topics.clone());
        let series = match &self.corpus {
            Some(corpus) => Some(engine::derive_series(
                &corpus.documents,
                &similarity,
                &topics,
                self.cutoff,
            )?),
            None => None,
        };
        self.topics = topics;
        self.similarity = Some(similarity);
        self.series = series;
        self.visibility.reset();
        Ok(true)
    }

    pub fn has_classification(&self) -> bool {
        self.similarity.is_some()
    }

    /// Re-derive the trend series from the stored matrix at the current
    /// cutoff.
    fn recompute(&mut self) -> Result<()> {
        let (Some(corpus), Some(similarity)) = (&self.corpus, &self.similarity) else {
            return Ok(());
        };
        self.series = Some(engine::derive_series(
            &corpus.documents,
            similarity,
            &self.topics,
            self.cutoff,
        )?);
        Ok(())
    }

    // -- derived views -----------------------------------------------------

    pub fn series(&self) -> Option<&TrendSeries> {
        self.series.as_ref()
    }

    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    /// Flip a topic's legend visibility; returns the new visible state.
    /// Pure rendering property — the series is untouched.
    pub fn toggle_topic(&mut self, topic: &str) -> bool {
        self.visibility.toggle(topic)
    }

    /// Documents assigned to `topic` in `year`, in stored order. Empty when
    /// nothing matches or nothing is classified.
    pub fn documents_for(&self, topic: &str, year: &str) -> Vec<&Document> {
        let Some(series) = &self.series else {
            return Vec::new();
        };
        let documents = self.documents();
        series
            .topics
            .iter()
            .find(|t| t.topic == topic)
            .and_then(|t| t.points.iter().find(|p| p.year == year))
            .map(|p| p.doc_indices.iter().map(|&i| &documents[i]).collect())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
id,title,abstract,update_date
1,A,x,2020-01-01
2,B,y,2020-06-01
3,C,z,2021-01-01
";

    fn session_with_corpus() -> Session {
        let mut session = Session::new(0.3);
        let corpus = Corpus::from_csv_str(SAMPLE).unwrap();
        session.set_corpus(
            corpus,
            Some("Sample".to_string()),
            vec!["t1".to_string(), "t2".to_string()],
        );
        session
    }

    fn matrix() -> SimilarityMatrix {
        vec![vec![0.9, 0.1], vec![0.2, 0.8], vec![0.25, 0.25]]
    }

    #[test]
    fn classify_apply_derives_series() {
        let mut session = session_with_corpus();
        let tag = session.begin_classify(vec!["t1".to_string(), "t2".to_string()]);
        assert!(session.apply_classification(tag, matrix()).unwrap());

        let series = session.series().unwrap();
        assert_eq!(series.topics[0].points[0].count, 1);
        assert_eq!(series.unclassified[1].count, 1);
    }

    #[test]
    fn stale_response_is_discarded() {
        let mut session = session_with_corpus();
        let old_tag = session.begin_classify(vec!["t1".to_string(), "t2".to_string()]);
        // A second classify supersedes the first before it resolves.
        let new_tag = session.begin_classify(vec!["t1".to_string(), "t2".to_string()]);

        assert!(!session.apply_classification(old_tag, matrix()).unwrap());
        assert!(session.series().is_none());
        assert!(session.apply_classification(new_tag, matrix()).unwrap());
        assert!(session.series().is_some());
    }

    #[test]
    fn cutoff_change_recomputes_without_matrix_replacement() {
        let mut session = session_with_corpus();
        let tag = session.begin_classify(vec!["t1".to_string(), "t2".to_string()]);
        session.apply_classification(tag, matrix()).unwrap();

        // At 0.9 only doc0's 0.9 survives.
        session.set_cutoff(0.9).unwrap();
        let series = session.series().unwrap();
        assert_eq!(series.topics[0].points[0].count, 1);
        assert_eq!(series.topics[1].points[0].count, 0);
        assert_eq!(series.unclassified[0].count, 1);
    }

    #[test]
    fn unresolved_run_keeps_previous_topics_and_series() {
        let mut session = session_with_corpus();
        let tag = session.begin_classify(vec!["t1".to_string(), "t2".to_string()]);
        session.apply_classification(tag, matrix()).unwrap();

        // A wider run starts, but its request fails and is never applied.
        session.begin_classify(vec![
            "t1".to_string(),
            "t2".to_string(),
            "t3".to_string(),
        ]);
        assert_eq!(session.topics(), ["t1", "t2"]);

        // The slider still re-derives against the stored two-topic matrix.
        session.set_cutoff(0.5).unwrap();
        assert_eq!(session.series().unwrap().topics.len(), 2);

        // And a retry with the wider list commits it.
        let tag = session.begin_classify(vec![
            "t1".to_string(),
            "t2".to_string(),
            "t3".to_string(),
        ]);
        let wide = vec![
            vec![0.9, 0.1, 0.0],
            vec![0.2, 0.8, 0.0],
            vec![0.25, 0.25, 0.9],
        ];
        assert!(session.apply_classification(tag, wide).unwrap());
        assert_eq!(session.topics(), ["t1", "t2", "t3"]);
        assert_eq!(session.series().unwrap().topics.len(), 3);
    }

    #[test]
    fn malformed_result_leaves_previous_run_in_place() {
        let mut session = session_with_corpus();
        let tag = session.begin_classify(vec!["t1".to_string(), "t2".to_string()]);
        session.apply_classification(tag, matrix()).unwrap();
        let before = session.series().unwrap().clone();

        let tag = session.begin_classify(vec![
            "t1".to_string(),
            "t2".to_string(),
            "t3".to_string(),
        ]);
        // Two-column rows for a three-topic run.
        assert!(session.apply_classification(tag, matrix()).is_err());

        assert_eq!(session.topics(), ["t1", "t2"]);
        assert_eq!(session.series().unwrap(), &before);
        session.set_cutoff(0.5).unwrap();
    }

    #[test]
    fn cutoff_change_before_classification_is_harmless() {
        let mut session = session_with_corpus();
        session.set_cutoff(0.7).unwrap();
        assert!(session.series().is_none());
        assert_eq!(session.cutoff(), 0.7);
    }

    #[test]
    fn new_corpus_clears_derived_state() {
        let mut session = session_with_corpus();
        let tag = session.begin_classify(vec!["t1".to_string(), "t2".to_string()]);
        session.apply_classification(tag, matrix()).unwrap();
        session.toggle_topic("t1");

        let corpus = Corpus::from_csv_str(SAMPLE).unwrap();
        session.set_corpus(corpus, None, Vec::new());
        assert!(session.series().is_none());
        assert!(!session.has_classification());
        assert!(session.visibility().is_visible("t1"));
    }

    #[test]
    fn documents_for_resolves_drilldown() {
        let mut session = session_with_corpus();
        let tag = session.begin_classify(vec!["t1".to_string(), "t2".to_string()]);
        session.apply_classification(tag, matrix()).unwrap();

        let docs = session.documents_for("t1", "2020");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "A");
        assert!(session.documents_for("t1", "2021").is_empty());
        assert!(session.documents_for("missing", "2020").is_empty());
    }

    #[test]
    fn toggle_leaves_series_untouched() {
        let mut session = session_with_corpus();
        let tag = session.begin_classify(vec!["t1".to_string(), "t2".to_string()]);
        session.apply_classification(tag, matrix()).unwrap();

        let before = session.series().unwrap().clone();
        assert!(!session.toggle_topic("t1"));
        assert!(session.toggle_topic("t1"));
        assert_eq!(session.series().unwrap(), &before);
    }
}
