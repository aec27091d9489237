//! Corpus loading — CSV document metadata with a derived publication year.
//!
//! A corpus is a CSV file with at least the columns `title`, `abstract`,
//! `id`, and `update_date` (`YYYY-MM-DD...`). Every other column is kept as
//! an opaque key-value pair so nothing from the source file is lost. The
//! `year` field is derived from `update_date` at load time and is the axis
//! the whole pipeline aggregates on.
//!
//! Documents are immutable once loaded: a session replaces its corpus
//! wholesale, never edits it in place.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

/// Columns a corpus must provide. Checked against the header up front so a
/// malformed file fails as a load error, not mid-aggregation.
const REQUIRED_COLUMNS: [&str; 4] = ["title", "abstract", "id", "update_date"];

/// A single document from the source corpus.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub abstract_text: String,
    pub update_date: String,
    /// First 4 characters of `update_date` (the whole value if shorter).
    pub year: String,
    /// All remaining CSV columns, in no particular significance.
    pub extra: BTreeMap<String, String>,
}

impl Document {
    /// Text sent to the classifier: title and abstract, newline-joined.
    pub fn classification_text(&self) -> String {
        format!("{}\n{}", self.title, self.abstract_text)
    }
}

/// A loaded corpus — the ordered document list plus its year span.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub documents: Vec<Document>,
}

impl Corpus {
    /// Load a corpus from a CSV file on disk.
    pub fn load(path: &Path) -> Result<Self> {
        let reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open corpus file {}", path.display()))?;
        Self::from_csv_reader(reader)
            .with_context(|| format!("failed to parse corpus file {}", path.display()))
    }

    /// Load a corpus from in-memory CSV text. Used by tests and by callers
    /// that fetch the file themselves.
    pub fn from_csv_str(text: &str) -> Result<Self> {
        Self::from_csv_reader(csv::Reader::from_reader(text.as_bytes()))
    }

    fn from_csv_reader<R: Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let headers = reader.headers().context("failed to read CSV header")?.clone();

        for col in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == col) {
                anyhow::bail!("corpus is missing required column '{col}'");
            }
        }

        let mut documents = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let record = result.with_context(|| format!("failed to read CSV record {row}"))?;

            let mut id = String::new();
            let mut title = String::new();
            let mut abstract_text = String::new();
            let mut update_date = String::new();
            let mut extra = BTreeMap::new();

            for (header, value) in headers.iter().zip(record.iter()) {
                match header {
                    "id" => id = value.to_string(),
                    "title" => title = value.to_string(),
                    "abstract" => abstract_text = value.to_string(),
                    "update_date" => update_date = value.to_string(),
                    _ => {
                        extra.insert(header.to_string(), value.to_string());
                    }
                }
            }

            let year = derive_year(&update_date);
            documents.push(Document {
                id,
                title,
                abstract_text,
                update_date,
                year,
                extra,
            });
        }

        Ok(Self { documents })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// The distinct years present in the corpus, sorted ascending.
    pub fn years(&self) -> Vec<String> {
        let mut years: Vec<String> = self.documents.iter().map(|d| d.year.clone()).collect();
        years.sort();
        years.dedup();
        years
    }

    /// Lowest and highest year in the corpus, if any documents exist.
    pub fn year_range(&self) -> Option<(String, String)> {
        let years = self.years();
        match (years.first(), years.last()) {
            (Some(min), Some(max)) => Some((min.clone(), max.clone())),
            _ => None,
        }
    }

    /// Classification inputs for every document, in corpus order.
    pub fn classification_texts(&self) -> Vec<String> {
        self.documents
            .iter()
            .map(|d| d.classification_text())
            .collect()
    }
}

/// Derive the year from a date string: the first 4 characters, or the whole
/// value when shorter. Character-based, not byte-based, so a malformed
/// multibyte value cannot panic.
fn derive_year(update_date: &str) -> String {
    update_date.chars().take(4).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
