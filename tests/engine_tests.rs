//! Corpus-to-series pipeline tests.
//!
//! Exercises CSV loading, topic assignment, and aggregation end to end
//! through the public API, plus the SVG rendering on top of the derived
//! series. Network-backed classification lives behind the similarity
//! client and is not called here; tests supply matrices directly.

use trendlens::chart::{self, Visibility};
use trendlens::corpus::Corpus;
use trendlens::engine::{self, UNCLASSIFIED};

const SAMPLE_CSV: &str = "\
id,title,abstract,update_date
2301.00001,Transformers at scale,Scaling laws for attention models.,2023-01-15
2301.00002,Graph contrastive learning,Self-supervised graphs.,2023-02-01
2201.00003,Quantum error correction,Surface codes in practice.,2022-06-10
2201.00004,Diffusion image synthesis,Denoising generative models.,2022-09-30
2101.00005,Federated optimization,Distributed training privacy.,2021-03-12
";

fn topics(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Corpus loading
// ---------------------------------------------------------------------------

#[test]
fn corpus_parses_rows_and_years() {
    let corpus = Corpus::from_csv_str(SAMPLE_CSV).unwrap();
    assert_eq!(corpus.len(), 5);
    assert_eq!(corpus.years(), vec!["2021", "2022", "2023"]);
    assert_eq!(
        corpus.year_range(),
        Some(("2021".to_string(), "2023".to_string()))
    );
}

#[test]
fn corpus_rejects_missing_required_columns() {
    let no_date = "id,title,abstract\n1,t,a\n";
    assert!(Corpus::from_csv_str(no_date).is_err());
}

#[test]
fn classification_text_joins_title_and_abstract() {
    let corpus = Corpus::from_csv_str(SAMPLE_CSV).unwrap();
    let texts = corpus.classification_texts();
    assert_eq!(
        texts[0],
        "Transformers at scale\nScaling laws for attention models."
    );
}

// ---------------------------------------------------------------------------
// Assignment and aggregation
// ---------------------------------------------------------------------------

#[test]
fn derive_series_counts_per_year_and_topic() {
    let corpus = Corpus::from_csv_str(SAMPLE_CSV).unwrap();
    let topics = topics(&["ML", "Quantum"]);
    // Rows follow CSV order: 2023, 2023, 2022, 2022, 2021.
    let matrix = vec![
        vec![0.9, 0.1],
        vec![0.8, 0.2],
        vec![0.1, 0.9],
        vec![0.7, 0.3],
        vec![0.6, 0.2],
    ];

    let series = engine::derive_series(&corpus.documents, &matrix, &topics, 0.3).unwrap();

    assert_eq!(series.years, vec!["2021", "2022", "2023"]);
    assert_eq!(series.topics.len(), 2);

    let ml = &series.topics[0];
    assert_eq!(ml.topic, "ML");
    let counts: Vec<usize> = ml.points.iter().map(|p| p.count).collect();
    assert_eq!(counts, vec![1, 1, 2]);

    let quantum = &series.topics[1];
    let counts: Vec<usize> = quantum.points.iter().map(|p| p.count).collect();
    assert_eq!(counts, vec![0, 1, 0]);
}

#[test]
fn raising_cutoff_moves_documents_to_unclassified() {
    let corpus = Corpus::from_csv_str(SAMPLE_CSV).unwrap();
    let topics = topics(&["ML"]);
    let matrix = vec![
        vec![0.9],
        vec![0.5],
        vec![0.2],
        vec![0.7],
        vec![0.4],
    ];

    let low = engine::derive_series(&corpus.documents, &matrix, &topics, 0.1).unwrap();
    let high = engine::derive_series(&corpus.documents, &matrix, &topics, 0.6).unwrap();

    let total = |s: &trendlens::engine::TrendSeries| -> usize {
        s.topics
            .iter()
            .flat_map(|t| t.points.iter())
            .map(|p| p.count)
            .sum()
    };

    assert_eq!(total(&low), 5);
    assert_eq!(total(&high), 2);

    // Every document is accounted for either in a topic or unclassified
    let high_unclassified: usize = high.unclassified.iter().map(|p| p.count).sum();
    assert_eq!(total(&high) + high_unclassified, corpus.len());
}

#[test]
fn assignment_tie_prefers_first_topic() {
    let topics = topics(&["A", "B"]);
    let matrix = vec![vec![0.8, 0.8]];
    let assignments = engine::assign_topics(&matrix, &topics, 1, 0.3).unwrap();
    assert_eq!(assignments[0].topic_index, Some(0));
    assert_eq!(assignments[0].topic_name, "A");
}

#[test]
fn all_below_cutoff_yields_empty_topic_lines() {
    let corpus = Corpus::from_csv_str(SAMPLE_CSV).unwrap();
    let topics = topics(&["ML"]);
    let matrix = vec![vec![0.1]; 5];

    let series = engine::derive_series(&corpus.documents, &matrix, &topics, 0.5).unwrap();
    assert!(series.topics[0].points.iter().all(|p| p.count == 0));
    let unclassified: usize = series.unclassified.iter().map(|p| p.count).sum();
    assert_eq!(unclassified, 5);
    assert_eq!(
        series.unclassified.first().map(|p| p.year.as_str()),
        Some("2021")
    );

    let assignments = engine::assign_topics(&matrix, &topics, 5, 0.5).unwrap();
    assert_eq!(assignments[0].topic_index, None);
    assert_eq!(assignments[0].topic_name, UNCLASSIFIED);
}

#[test]
fn mismatched_matrix_shape_is_rejected() {
    let corpus = Corpus::from_csv_str(SAMPLE_CSV).unwrap();
    let topics = topics(&["A", "B"]);
    let too_few_rows = vec![vec![0.5, 0.5]; 3];
    assert!(engine::derive_series(&corpus.documents, &too_few_rows, &topics, 0.3).is_err());

    let ragged = vec![
        vec![0.5, 0.5],
        vec![0.5],
        vec![0.5, 0.5],
        vec![0.5, 0.5],
        vec![0.5, 0.5],
    ];
    assert!(engine::derive_series(&corpus.documents, &ragged, &topics, 0.3).is_err());
}

// ---------------------------------------------------------------------------
// Chart rendering on a derived series
// ---------------------------------------------------------------------------

#[test]
fn svg_renders_one_line_group_per_topic() {
    let corpus = Corpus::from_csv_str(SAMPLE_CSV).unwrap();
    let topics = topics(&["ML", "Quantum"]);
    let matrix = vec![
        vec![0.9, 0.1],
        vec![0.8, 0.2],
        vec![0.1, 0.9],
        vec![0.7, 0.3],
        vec![0.6, 0.2],
    ];
    let series = engine::derive_series(&corpus.documents, &matrix, &topics, 0.3).unwrap();

    let svg = chart::render_svg(&series, &Visibility::default());
    assert_eq!(svg.matches("class=\"line-group\"").count(), 2);
    assert_eq!(svg.matches("class=\"legend-item\"").count(), 2);
    assert!(svg.contains(">ML<"));
    assert!(svg.contains(">Quantum<"));
    // Unclassified never appears in the chart
    assert!(!svg.contains("Unclassified"));
}

#[test]
fn svg_dims_hidden_topics() {
    let corpus = Corpus::from_csv_str(SAMPLE_CSV).unwrap();
    let topics = topics(&["ML"]);
    let matrix = vec![vec![0.9]; 5];
    let series = engine::derive_series(&corpus.documents, &matrix, &topics, 0.3).unwrap();

    let mut vis = Visibility::default();
    vis.toggle("ML");
    let svg = chart::render_svg(&series, &vis);
    assert!(svg.contains("opacity:0.1"));
}
