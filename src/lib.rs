//! Retrieval evaluation for RAG pipelines and LLM-as-judge answer analysis.
//!
//! - [`metrics`]: precision@k, recall@k, MAP, NDCG@k, semantic similarity,
//!   keyword coverage, and the [`metrics::RetrievalEvaluator`] orchestrator.
//! - [`report`]: versioned CSV / Markdown / PNG reports with a manifest.
//! - [`judge`]: agreement between LLM and human answer scores.
//! - [`mcp`]: the evaluator exposed as MCP tools over stdio.

pub mod config;
pub mod dataset;
pub mod embedding;
pub mod error;
pub mod judge;
pub mod mcp;
pub mod metrics;
pub mod report;
pub mod stats;
pub mod types;
