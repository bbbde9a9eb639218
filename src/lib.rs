//! # ragdex — Local RAG Knowledge-Base Engine
//!
//! Turns uploaded documents into named, persistent knowledge bases and serves
//! the most relevant passages back for question answering. Documents are split
//! into overlapping chunks, embedded, and kept in a flat vector index that is
//! scanned exhaustively at query time.
//!
//! ## Architecture
//!
//! - **[`config`]** — Configuration loading, validation, and defaults
//! - **[`loader`]** — PDF and DOCX text extraction into per-source units
//! - **[`chunker`]** — Fixed-size windowing with overlap and boundary softening
//! - **[`embedder`]** — Text embedding via an OpenAI-compatible API (or a deterministic mock)
//! - **[`index`]** — Flat cosine-similarity vector index with a portable binary artifact
//! - **[`store`]** — Generation-based on-disk persistence of named knowledge bases
//! - **[`retriever`]** — Top-k chunk retrieval against a loaded knowledge base
//! - **[`synthesizer`]** — Answer synthesis seam over retrieved context
//! - **[`engine`]** — Ingest/query orchestration tying the pipeline together

pub mod chunker;
pub mod config;
pub mod embedder;
pub mod engine;
pub mod error;
pub mod index;
pub mod loader;
pub mod retriever;
pub mod store;
pub mod synthesizer;
