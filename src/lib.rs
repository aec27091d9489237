//! trendlens — classify a document corpus into topics and chart how those
//! topics trend over time.
//!
//! The pipeline is: load a CSV corpus ([`corpus`]), score every document
//! against the topic list via an embedding-similarity endpoint ([`llm`]),
//! derive per-year counts ([`engine`]), and render the result as an SVG
//! multi-line chart ([`chart`]). The [`web`] module serves the interactive
//! explorer; [`cli`] drives the same pipeline from the terminal.

pub mod chart;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod engine;
pub mod llm;
pub mod session;
pub mod web;
