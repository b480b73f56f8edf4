use std::future::Future;

use rmcp::schemars;
use rmcp::{
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::*,
    tool, tool_handler, tool_router,
    transport::stdio,
    ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::EvalConfig;
use crate::dataset::{parse_query, parse_result};
use crate::embedding::build_embedder;
use crate::error::EvalError;
use crate::metrics::{available_metrics, RetrievalEvaluator};
use crate::types::{BatchEvaluationResult, EvaluationResult, RetrievalResult, SearchQuery};

// ── Parameter types ──

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EvaluateSingleParams {
    /// Search query: query_id, query, expected_relevant_content, keywords,
    /// relevance_criteria {must_contain, should_contain, semantic_aspects}
    pub query: Value,
    /// Retrieval result: query_id, retrieved_documents [{doc_id: content}], scores
    pub result: Value,
    /// Cutoff for precision@k and recall@k (defaults to the server's k)
    pub k: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EvaluateBatchParams {
    /// Search queries, paired by position with `results`
    pub queries: Vec<Value>,
    /// Retrieval results, same length as `queries`
    pub results: Vec<Value>,
    /// Cutoff for precision@k and recall@k (defaults to the server's k)
    pub k: Option<usize>,
}

// ── Evaluation over raw JSON ──

fn evaluate_single_json(
    evaluator: &RetrievalEvaluator,
    query: Value,
    result: Value,
    k: usize,
) -> Result<EvaluationResult, EvalError> {
    let query = parse_query(query)?;
    let result = parse_result(result)?;
    Ok(evaluator.evaluate_single(&query, &result, k))
}

fn evaluate_batch_json(
    evaluator: &RetrievalEvaluator,
    queries: Vec<Value>,
    results: Vec<Value>,
    k: usize,
) -> Result<BatchEvaluationResult, EvalError> {
    if queries.len() != results.len() {
        return Err(EvalError::LengthMismatch {
            queries: queries.len(),
            results: results.len(),
        });
    }
    let queries = queries
        .into_iter()
        .enumerate()
        .map(|(i, q)| parse_query(q).map_err(|e| indexed(e, i)))
        .collect::<Result<Vec<SearchQuery>, _>>()?;
    let results = results
        .into_iter()
        .enumerate()
        .map(|(i, r)| parse_result(r).map_err(|e| indexed(e, i)))
        .collect::<Result<Vec<RetrievalResult>, _>>()?;
    evaluator.evaluate_batch(&queries, &results, k)
}

/// Tag a schema error with the list position it came from.
fn indexed(err: EvalError, index: usize) -> EvalError {
    match err {
        EvalError::Schema { context, missing } => EvalError::Schema {
            context: format!("{context} {index}"),
            missing,
        },
        other => other,
    }
}

fn mcp_err(msg: impl std::fmt::Display) -> McpError {
    McpError::internal_error(msg.to_string(), None)
}

/// Caller mistakes become invalid-params; everything else is internal.
fn eval_err(err: EvalError) -> McpError {
    match err {
        EvalError::Schema { .. }
        | EvalError::LengthMismatch { .. }
        | EvalError::EmptyInput(_)
        | EvalError::InvalidValue { .. }
        | EvalError::Json(_) => McpError::invalid_params(err.to_string(), None),
        other => mcp_err(other),
    }
}

fn json_response<T: serde::Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| mcp_err(format!("serialization failed: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

// ── MCP Server ──

#[derive(Clone)]
pub struct RagEvalServer {
    tool_router: ToolRouter<Self>,
    /// Shared, stateless; clones share the embedder.
    evaluator: RetrievalEvaluator,
    k: usize,
}

#[tool_router]
impl RagEvalServer {
    pub fn new(evaluator: RetrievalEvaluator, k: usize) -> Self {
        Self {
            tool_router: Self::tool_router(),
            evaluator,
            k,
        }
    }

    /// Evaluate one query against its retrieval result.
    #[tool(
        description = "Evaluate one retrieval result against its search query. Returns precision@k, recall@k, mean average precision, semantic similarity and keyword coverage, plus their unweighted average."
    )]
    async fn evaluate_single(
        &self,
        Parameters(params): Parameters<EvaluateSingleParams>,
    ) -> Result<CallToolResult, McpError> {
        let evaluator = self.evaluator.clone();
        let k = params.k.unwrap_or(self.k);

        tokio::task::spawn_blocking(move || {
            debug!(k, "evaluate_single");
            let result = evaluate_single_json(&evaluator, params.query, params.result, k)
                .map_err(eval_err)?;
            json_response(&result)
        })
        .await
        .map_err(|e| mcp_err(format!("task join failed: {e}")))?
    }

    /// Evaluate parallel lists of queries and results.
    #[tool(
        description = "Evaluate parallel lists of search queries and retrieval results. Returns per-query results, per-metric averages and the overall average. Lists must have the same length."
    )]
    async fn evaluate_batch(
        &self,
        Parameters(params): Parameters<EvaluateBatchParams>,
    ) -> Result<CallToolResult, McpError> {
        let evaluator = self.evaluator.clone();
        let k = params.k.unwrap_or(self.k);

        tokio::task::spawn_blocking(move || {
            debug!(
                queries = params.queries.len(),
                results = params.results.len(),
                k,
                "evaluate_batch"
            );
            let batch = evaluate_batch_json(&evaluator, params.queries, params.results, k)
                .map_err(eval_err)?;
            json_response(&batch)
        })
        .await
        .map_err(|e| mcp_err(format!("task join failed: {e}")))?
    }

    /// Static metric catalog.
    #[tool(description = "List the available retrieval metrics with a one-line description each.")]
    async fn metrics_available(&self) -> Result<CallToolResult, McpError> {
        debug!("metrics_available");
        json_response(&available_metrics())
    }
}

#[tool_handler]
impl ServerHandler for RagEvalServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "rageval".into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
            instructions: Some(
                "rageval scores RAG retrieval quality.\n\n\
                 Workflow:\n\
                 1. Call metrics_available to see what is measured.\n\
                 2. Use evaluate_single for one query/result pair.\n\
                 3. Use evaluate_batch for many pairs; queries[i] is scored against results[i].\n\n\
                 Retrieved documents are single-key objects mapping a document id to its content. \
                 A document is relevant when its content contains any must_contain term \
                 (case-insensitive)."
                    .into(),
            ),
        }
    }
}

/// Start the MCP server over stdio.
pub async fn run_server(config: EvalConfig) -> anyhow::Result<()> {
    info!("starting rageval MCP server v{}", env!("CARGO_PKG_VERSION"));

    let evaluator = RetrievalEvaluator::new(build_embedder(&config)?);
    let server = RagEvalServer::new(evaluator, config.k);
    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    info!("rageval MCP server stopped");
    Ok(())
}
