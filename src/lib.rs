//! # lexnote: Vocabulary Lookup and Review
//!
//! Looks words up through pluggable dictionary providers, renders the
//! result for a terminal or as plain text, and keeps a per-chapter
//! notebook of looked-up words for later review.
//!
//! ## Architecture
//!
//! - **[`config`]**: Configuration loading, validation, and template generation
//! - **[`dict`]**: Provider trait, endpoint registry, markup decoding, and the five providers
//! - **[`notebook`]**: Word notes with file (YAML) and SQLite backends
//! - **[`server`]**: Plain-text lookup endpoint over HTTP (axum)

pub mod config;
pub mod dict;
pub mod notebook;
pub mod server;
