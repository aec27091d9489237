//! Prompt construction for trend interpretation.
//!
//! The interpreter call carries two messages: a user-editable **system
//! prompt** describing what to do with the trend, and a **user message**
//! holding the plain-text serialization of the aggregated series. Both are
//! built here so the CLI and the dashboard share identical wording.
//!
//! The trend text deliberately excludes the unclassified bucket — it is an
//! internal accounting detail, not a topic.

use crate::engine::TrendSeries;

/// Default system prompt, parameterized on the demo's display name.
///
/// Editable by the user before every interpretation run.
pub fn default_interpretation_prompt(demo_name: &str) -> String {
    format!(
        "Here is the trend of topics from documents in the {demo_name} category over time. \
         Interpret the trend. Explain what topics rising, falling, etc. Based on this \
         recommend actions for publishers, researchers, and policymakers. Use concise, \
         simple, language."
    )
}

/// Serialize a trend series to plain text for the interpreter.
///
/// Header line with the year range, then one line per topic with its
/// per-year counts in year order:
///
/// ```text
/// Topic trends from 2018 to 2024
///
/// Deep learning: 12, 30, 41, 55, 60, 48, 39
/// Quantum computing: 2, 3, 5, 9, 14, 21, 30
/// ```
pub fn trend_text(series: &TrendSeries) -> String {
    let (Some(first), Some(last)) = (series.years.first(), series.years.last()) else {
        return "No trend data available".to_string();
    };
    if series.topics.is_empty() {
        return "No trend data available".to_string();
    }

    let mut text = format!("Topic trends from {first} to {last}\n\n");
    for topic in &series.topics {
        let counts: Vec<String> = topic.points.iter().map(|p| p.count.to_string()).collect();
        text.push_str(&format!("{}: {}\n", topic.topic, counts.join(", ")));
    }
    text
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{TopicSeries, YearPoint};

    fn series() -> TrendSeries {
        let years = ["2020", "2021", "2022"];
        let point = |year: &str, count| YearPoint {
            year: year.to_string(),
            count,
            doc_indices: Vec::new(),
        };
        TrendSeries {
            years: years.iter().map(|y| y.to_string()).collect(),
            topics: vec![
                TopicSeries {
                    topic: "t1".to_string(),
                    points: vec![point("2020", 3), point("2021", 5), point("2022", 2)],
                },
                TopicSeries {
                    topic: "t2".to_string(),
                    points: vec![point("2020", 0), point("2021", 1), point("2022", 4)],
                },
            ],
            unclassified: vec![point("2020", 9), point("2021", 9), point("2022", 9)],
        }
    }

    #[test]
    fn trend_text_lists_topics_in_year_order() {
        let text = trend_text(&series());
        assert!(text.starts_with("Topic trends from 2020 to 2022\n\n"));
        assert!(text.contains("t1: 3, 5, 2\n"));
        assert!(text.contains("t2: 0, 1, 4\n"));
    }

    #[test]
    fn trend_text_excludes_unclassified() {
        let text = trend_text(&series());
        assert!(!text.contains("Unclassified"));
        assert!(!text.contains('9'));
    }

    #[test]
    fn empty_series_has_placeholder_text() {
        let empty = TrendSeries {
            years: Vec::new(),
            topics: Vec::new(),
            unclassified: Vec::new(),
        };
        assert_eq!(trend_text(&empty), "No trend data available");
    }

    #[test]
    fn default_prompt_names_the_demo() {
        let prompt = default_interpretation_prompt("Machine Learning");
        assert!(prompt.contains("Machine Learning category"));
        assert!(prompt.contains("Interpret the trend"));
    }
}
