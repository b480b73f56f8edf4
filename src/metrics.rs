//! Retrieval metrics.
//!
//! Every metric is a standalone function over plain ids/contents and is total:
//! empty inputs score `0.0` instead of erroring. [`RetrievalEvaluator`] derives
//! relevance labels from a query and runs the default battery.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::embedding::Embedder;
use crate::error::{EvalError, Result};
use crate::types::{
    BatchEvaluationResult, EvaluationResult, MetricInfo, MetricName, MetricResult,
    RetrievalResult, SearchQuery,
};

/// Default cut-off for precision@k and recall@k.
pub const DEFAULT_K: usize = 5;

/// Precision@k: relevant ids among the first `k`, divided by `k`.
///
/// The denominator stays `k` even when fewer than `k` documents were
/// retrieved, so short result lists are penalized.
pub fn precision_at_k(retrieved_docs: &[&str], relevant_docs: &HashSet<&str>, k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let hits = retrieved_docs
        .iter()
        .take(k)
        .filter(|d| relevant_docs.contains(*d))
        .count();
    hits as f64 / k as f64
}

/// Recall@k: `|top-k ∩ relevant| / |relevant|`, `0.0` when nothing is relevant.
pub fn recall_at_k(retrieved_docs: &[&str], relevant_docs: &HashSet<&str>, k: usize) -> f64 {
    if relevant_docs.is_empty() {
        return 0.0;
    }
    let top_k: HashSet<&str> = retrieved_docs.iter().take(k).copied().collect();
    let hits = top_k.intersection(relevant_docs).count();
    hits as f64 / relevant_docs.len() as f64
}

/// Mean of the precision values at every rank holding a relevant document.
///
/// Scans the full ranking, not a top-k prefix.
pub fn mean_average_precision(retrieved_docs: &[&str], relevant_docs: &HashSet<&str>) -> f64 {
    if relevant_docs.is_empty() {
        return 0.0;
    }

    let mut found = 0usize;
    let mut precision_sum = 0.0;
    for (i, doc) in retrieved_docs.iter().enumerate() {
        if relevant_docs.contains(doc) {
            found += 1;
            precision_sum += found as f64 / (i + 1) as f64;
        }
    }

    if found == 0 {
        0.0
    } else {
        precision_sum / found as f64
    }
}

/// NDCG@k with graded relevance. Ids missing from `weights` have weight `0.0`.
pub fn ndcg_at_k(retrieved_docs: &[&str], weights: &HashMap<&str, f64>, k: usize) -> f64 {
    let gains: Vec<f64> = retrieved_docs
        .iter()
        .take(k)
        .map(|d| weights.get(d).copied().unwrap_or(0.0))
        .collect();

    let mut ideal: Vec<f64> = weights.values().copied().collect();
    ideal.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    ideal.truncate(k);

    let idcg = dcg(&ideal);
    if idcg == 0.0 {
        0.0
    } else {
        dcg(&gains) / idcg
    }
}

fn dcg(gains: &[f64]) -> f64 {
    gains
        .iter()
        .enumerate()
        .map(|(i, rel)| rel / (i as f64 + 2.0).log2())
        .sum()
}

/// Cosine similarity; `0.0` when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Position-weighted mean cosine similarity between the query and each document.
///
/// The document at rank `r` (0-based) gets weight `1/(r+1)`. Embedding failures
/// never propagate: a failed query embedding scores `0.0`, and a failed document
/// contributes a similarity of `0.0` while its weight still counts.
pub fn semantic_similarity(
    embedder: &dyn Embedder,
    query_text: &str,
    retrieved_contents: &[&str],
) -> f64 {
    if retrieved_contents.is_empty() {
        return 0.0;
    }

    let query_vec = match embedder.embed(&[query_text.to_string()]) {
        Ok(mut v) if v.len() == 1 => v.remove(0),
        Ok(v) => {
            warn!(got = v.len(), "query embedding returned unexpected batch size");
            return 0.0;
        }
        Err(e) => {
            warn!(error = %e, "query embedding failed, semantic similarity is 0.0");
            return 0.0;
        }
    };

    let similarities: Vec<f64> = embed_documents(embedder, retrieved_contents)
        .iter()
        .map(|doc_vec| {
            doc_vec
                .as_deref()
                .map(|v| cosine_similarity(&query_vec, v))
                .unwrap_or(0.0)
        })
        .collect();

    let mut weighted = 0.0;
    let mut weight_sum = 0.0;
    for (rank, sim) in similarities.iter().enumerate() {
        let weight = 1.0 / (rank as f64 + 1.0);
        weighted += sim * weight;
        weight_sum += weight;
    }
    weighted / weight_sum
}

/// Embed all documents in one call; on failure retry one at a time so a single
/// bad document only loses its own vector. A timed-out batch is not retried:
/// every document scores `0.0`.
fn embed_documents(embedder: &dyn Embedder, contents: &[&str]) -> Vec<Option<Vec<f32>>> {
    let texts: Vec<String> = contents.iter().map(|c| c.to_string()).collect();
    match embedder.embed(&texts) {
        Ok(vectors) if vectors.len() == texts.len() => return vectors.into_iter().map(Some).collect(),
        Err(e @ EvalError::EmbeddingTimeout(_)) => {
            warn!(
                error = %e,
                documents = texts.len(),
                "document embedding timed out, scoring all documents 0.0"
            );
            return vec![None; texts.len()];
        }
        Ok(vectors) => {
            warn!(
                expected = texts.len(),
                got = vectors.len(),
                "document embedding returned unexpected batch size, retrying per document"
            );
        }
        Err(e) => {
            warn!(error = %e, "batch document embedding failed, retrying per document");
        }
    }

    texts
        .iter()
        .enumerate()
        .map(|(rank, text)| match embedder.embed(std::slice::from_ref(text)) {
            Ok(mut v) if v.len() == 1 => Some(v.remove(0)),
            Ok(_) => {
                warn!(rank, "document embedding returned no vector, scoring 0.0");
                None
            }
            Err(e) => {
                warn!(rank, error = %e, "document embedding failed, scoring 0.0");
                None
            }
        })
        .collect()
}

/// Fraction of distinct lower-cased keywords found as a substring in any document.
pub fn keyword_coverage(keywords: &[String], retrieved_contents: &[&str]) -> f64 {
    if keywords.is_empty() || retrieved_contents.is_empty() {
        return 0.0;
    }

    let keyword_set: HashSet<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
    let docs_lower: Vec<String> = retrieved_contents.iter().map(|d| d.to_lowercase()).collect();

    let covered = keyword_set
        .iter()
        .filter(|kw| docs_lower.iter().any(|doc| doc.contains(kw.as_str())))
        .count();
    covered as f64 / keyword_set.len() as f64
}

/// Ids of retrieved documents whose content contains any `must_contain` term,
/// case-insensitively.
pub fn derive_relevant_docs<'a>(query: &SearchQuery, result: &'a RetrievalResult) -> HashSet<&'a str> {
    let terms: Vec<String> = query
        .relevance_criteria
        .must_contain
        .iter()
        .map(|t| t.to_lowercase())
        .collect();

    result
        .retrieved_documents
        .iter()
        .filter(|doc| {
            let content = doc.content.to_lowercase();
            terms.iter().any(|t| content.contains(t.as_str()))
        })
        .map(|doc| doc.doc_id.as_str())
        .collect()
}

/// The static metric catalog.
pub fn available_metrics() -> Vec<MetricInfo> {
    MetricName::ALL
        .iter()
        .map(|&name| MetricInfo {
            name,
            description: name.description(),
        })
        .collect()
}

/// Runs the default metric battery with an injected embedder.
///
/// Holds no per-evaluation state; share it freely behind an `Arc`.
#[derive(Clone)]
pub struct RetrievalEvaluator {
    embedder: Arc<dyn Embedder>,
}

impl RetrievalEvaluator {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Precision@k, recall@k, MAP, semantic similarity and keyword coverage,
    /// in that order. NDCG needs graded labels and is left to direct callers.
    pub fn evaluate_retrieval(
        &self,
        query: &SearchQuery,
        result: &RetrievalResult,
        k: usize,
    ) -> Vec<MetricResult> {
        let doc_ids = result.doc_ids();
        let contents = result.contents();
        let relevant = derive_relevant_docs(query, result);
        debug!(
            query_id = %query.query_id,
            retrieved = doc_ids.len(),
            relevant = relevant.len(),
            "evaluating retrieval"
        );

        vec![
            MetricResult::new(
                MetricName::PrecisionAtK,
                precision_at_k(&doc_ids, &relevant, k),
            )
            .with_detail("k", k as f64),
            MetricResult::new(MetricName::RecallAtK, recall_at_k(&doc_ids, &relevant, k))
                .with_detail("k", k as f64),
            MetricResult::new(
                MetricName::MeanAveragePrecision,
                mean_average_precision(&doc_ids, &relevant),
            ),
            MetricResult::new(
                MetricName::SemanticSimilarity,
                semantic_similarity(self.embedder.as_ref(), &query.query, &contents),
            ),
            MetricResult::new(
                MetricName::KeywordCoverage,
                keyword_coverage(&query.keywords, &contents),
            ),
        ]
    }

    pub fn evaluate_single(
        &self,
        query: &SearchQuery,
        result: &RetrievalResult,
        k: usize,
    ) -> EvaluationResult {
        if query.query_id != result.query_id {
            warn!(
                query_id = %query.query_id,
                result_query_id = %result.query_id,
                "result query_id does not match query"
            );
        }
        EvaluationResult::new(
            query.query_id.clone(),
            self.evaluate_retrieval(query, result, k),
        )
    }

    /// Evaluate parallel lists of queries and results, one pair at a time.
    pub fn evaluate_batch(
        &self,
        queries: &[SearchQuery],
        results: &[RetrievalResult],
        k: usize,
    ) -> Result<BatchEvaluationResult> {
        if queries.len() != results.len() {
            return Err(EvalError::LengthMismatch {
                queries: queries.len(),
                results: results.len(),
            });
        }

        let evaluations = queries
            .iter()
            .zip(results)
            .map(|(q, r)| self.evaluate_single(q, r, k))
            .collect();
        aggregate(evaluations)
    }
}

/// Fold per-query results into batch averages.
pub fn aggregate(results: Vec<EvaluationResult>) -> Result<BatchEvaluationResult> {
    if results.is_empty() {
        return Err(EvalError::EmptyInput(
            "no query/result pairs to evaluate".into(),
        ));
    }

    let mut sums: BTreeMap<MetricName, (f64, usize)> = BTreeMap::new();
    for result in &results {
        for metric in &result.metrics {
            let entry = sums.entry(metric.metric_name).or_insert((0.0, 0));
            entry.0 += metric.score;
            entry.1 += 1;
        }
    }

    let metric_averages = sums
        .into_iter()
        .map(|(name, (sum, count))| (name, sum / count as f64))
        .collect();
    let overall_average =
        results.iter().map(|r| r.average_score).sum::<f64>() / results.len() as f64;

    Ok(BatchEvaluationResult {
        results,
        overall_average,
        metric_averages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashedEmbedder;
    use crate::error;
    use crate::types::RetrievedDocument;

    fn set<'a>(ids: &[&'a str]) -> HashSet<&'a str> {
        ids.iter().copied().collect()
    }

    fn evaluator() -> RetrievalEvaluator {
        RetrievalEvaluator::new(Arc::new(HashedEmbedder::default()))
    }

    /// Embedder returning a fixed vector per known text.
    struct TableEmbedder(HashMap<String, Vec<f32>>);

    impl Embedder for TableEmbedder {
        fn embed(&self, texts: &[String]) -> error::Result<Vec<Vec<f32>>> {
            texts
                .iter()
                .map(|t| {
                    self.0
                        .get(t)
                        .cloned()
                        .ok_or_else(|| EvalError::EmbeddingService(format!("unknown text {t}")))
                })
                .collect()
        }
    }

    struct FailingEmbedder;

    impl Embedder for FailingEmbedder {
        fn embed(&self, _texts: &[String]) -> error::Result<Vec<Vec<f32>>> {
            Err(EvalError::EmbeddingService("down".into()))
        }
    }

    // ── precision / recall ──

    #[test]
    fn precision_zero_k() {
        assert_eq!(precision_at_k(&["d1"], &set(&["d1"]), 0), 0.0);
    }

    #[test]
    fn precision_keeps_k_denominator_for_short_lists() {
        assert_eq!(precision_at_k(&["d1"], &set(&["d1"]), 4), 0.25);
    }

    #[test]
    fn precision_stays_in_unit_range() {
        let docs = ["a", "b", "c", "a"];
        for k in 0..8 {
            let p = precision_at_k(&docs, &set(&["a", "c"]), k);
            assert!((0.0..=1.0).contains(&p), "k={k} p={p}");
        }
    }

    #[test]
    fn recall_half_found() {
        assert_eq!(recall_at_k(&["d3", "d1"], &set(&["d1", "d2"]), 2), 0.5);
    }

    #[test]
    fn recall_empty_relevant_is_zero() {
        assert_eq!(recall_at_k(&["d1", "d2"], &HashSet::new(), 2), 0.0);
        assert_eq!(recall_at_k(&[], &HashSet::new(), 0), 0.0);
    }

    #[test]
    fn recall_only_counts_top_k() {
        assert_eq!(recall_at_k(&["x", "d1"], &set(&["d1"]), 1), 0.0);
    }

    // ── MAP ──

    #[test]
    fn map_averages_precision_at_hits() {
        // hits at ranks 1 and 3: (1/1 + 2/3) / 2
        let map = mean_average_precision(&["d1", "x", "d2"], &set(&["d1", "d2"]));
        assert!((map - (1.0 + 2.0 / 3.0) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn map_ignores_trailing_irrelevant_docs() {
        let relevant = set(&["d1", "d2"]);
        let short = mean_average_precision(&["x", "d1", "d2"], &relevant);
        let long = mean_average_precision(&["x", "d1", "d2", "y", "z"], &relevant);
        assert_eq!(short, long);
    }

    #[test]
    fn map_no_hits_is_zero() {
        assert_eq!(mean_average_precision(&["x", "y"], &set(&["d1"])), 0.0);
        assert_eq!(mean_average_precision(&["x"], &HashSet::new()), 0.0);
    }

    // ── NDCG ──

    #[test]
    fn ndcg_ideal_order_is_one() {
        let weights: HashMap<&str, f64> = [("a", 3.0), ("b", 2.0), ("c", 1.0)].into();
        let ndcg = ndcg_at_k(&["a", "b", "c"], &weights, 5);
        assert!((ndcg - 1.0).abs() < 1e-12);
    }

    #[test]
    fn ndcg_reversed_order_is_below_one() {
        let weights: HashMap<&str, f64> = [("a", 3.0), ("b", 2.0), ("c", 1.0)].into();
        let ndcg = ndcg_at_k(&["c", "b", "a"], &weights, 3);
        assert!(ndcg > 0.0 && ndcg < 1.0);
    }

    #[test]
    fn ndcg_zero_weights_is_zero() {
        let weights: HashMap<&str, f64> = [("a", 0.0)].into();
        assert_eq!(ndcg_at_k(&["a"], &weights, 3), 0.0);
        assert_eq!(ndcg_at_k(&["a"], &HashMap::new(), 3), 0.0);
    }

    #[test]
    fn ndcg_unknown_docs_weigh_nothing() {
        let weights: HashMap<&str, f64> = [("a", 1.0)].into();
        // a at rank 1 instead of 0: 1/log2(3)
        let ndcg = ndcg_at_k(&["zzz", "a"], &weights, 2);
        assert!((ndcg - 1.0 / 3f64.log2()).abs() < 1e-12);
    }

    // ── semantic similarity ──

    #[test]
    fn semantic_similarity_empty_docs_is_zero() {
        assert_eq!(semantic_similarity(&HashedEmbedder::default(), "q", &[]), 0.0);
    }

    #[test]
    fn semantic_similarity_is_position_weighted() {
        let table = TableEmbedder(
            [
                ("q".to_string(), vec![1.0, 0.0]),
                ("same".to_string(), vec![1.0, 0.0]),
                ("orthogonal".to_string(), vec![0.0, 1.0]),
            ]
            .into(),
        );
        // weights 1 and 1/2: (1*1 + 0*0.5) / 1.5
        let sim = semantic_similarity(&table, "q", &["same", "orthogonal"]);
        assert!((sim - 1.0 / 1.5).abs() < 1e-9);
        let sim = semantic_similarity(&table, "q", &["orthogonal", "same"]);
        assert!((sim - 0.5 / 1.5).abs() < 1e-9);
    }

    #[test]
    fn semantic_similarity_failed_doc_contributes_zero() {
        let table = TableEmbedder(
            [
                ("q".to_string(), vec![1.0, 0.0]),
                ("same".to_string(), vec![1.0, 0.0]),
            ]
            .into(),
        );
        // "missing" fails: batch fails, per-doc retry keeps "same"
        let sim = semantic_similarity(&table, "q", &["same", "missing"]);
        assert!((sim - 1.0 / 1.5).abs() < 1e-9);
    }

    #[test]
    fn semantic_similarity_embedder_down_is_zero() {
        assert_eq!(semantic_similarity(&FailingEmbedder, "q", &["doc"]), 0.0);
    }

    #[test]
    fn semantic_similarity_timed_out_embedder_is_zero() {
        struct Stalled;
        impl Embedder for Stalled {
            fn embed(&self, texts: &[String]) -> error::Result<Vec<Vec<f32>>> {
                std::thread::sleep(std::time::Duration::from_millis(300));
                Ok(texts.iter().map(|_| vec![1.0]).collect())
            }
        }

        let embedder = crate::embedding::TimeoutEmbedder::new(
            Arc::new(Stalled),
            std::time::Duration::from_millis(10),
        );
        assert_eq!(semantic_similarity(&embedder, "q", &["doc"]), 0.0);
    }

    /// Single-model backend: one lock, held for the whole call. Anything but
    /// the query text stalls while holding it.
    struct LockedBackend {
        model: std::sync::Mutex<()>,
        stall: std::time::Duration,
        calls: std::sync::atomic::AtomicUsize,
    }

    impl Embedder for LockedBackend {
        fn embed(&self, texts: &[String]) -> error::Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let _model = self
                .model
                .lock()
                .map_err(|_| EvalError::EmbeddingService("poisoned".into()))?;
            if texts.iter().any(|t| t != "q") {
                std::thread::sleep(self.stall);
            }
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    #[test]
    fn document_timeout_costs_one_deadline() {
        let timeout = std::time::Duration::from_millis(200);
        let backend = Arc::new(LockedBackend {
            model: std::sync::Mutex::new(()),
            stall: std::time::Duration::from_secs(2),
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let embedder = crate::embedding::TimeoutEmbedder::new(backend.clone(), timeout);

        let start = std::time::Instant::now();
        let sim = semantic_similarity(&embedder, "q", &["d1", "d2", "d3", "d4", "d5"]);
        assert_eq!(sim, 0.0);
        assert!(start.elapsed() < timeout * 2, "took {:?}", start.elapsed());
        // query + one document batch, no per-document retries
        assert_eq!(backend.calls.load(std::sync::atomic::Ordering::SeqCst), 2);

        // the next query fails fast while the stalled batch holds the model
        let start = std::time::Instant::now();
        assert_eq!(semantic_similarity(&embedder, "q", &["d1"]), 0.0);
        assert!(start.elapsed() < timeout);
    }

    #[test]
    fn timed_out_batch_is_not_retried_per_document() {
        struct TimesOutOnBatch(std::sync::atomic::AtomicUsize);
        impl Embedder for TimesOutOnBatch {
            fn embed(&self, texts: &[String]) -> error::Result<Vec<Vec<f32>>> {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                if texts.len() > 1 {
                    return Err(EvalError::EmbeddingTimeout("deadline".into()));
                }
                Ok(vec![vec![1.0, 0.0]])
            }
        }

        let embedder = TimesOutOnBatch(std::sync::atomic::AtomicUsize::new(0));
        assert_eq!(semantic_similarity(&embedder, "q", &["a", "b", "c"]), 0.0);
        assert_eq!(embedder.0.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn cosine_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[2.0, 0.0], &[3.0, 0.0]) - 1.0).abs() < 1e-12);
    }

    // ── keyword coverage ──

    #[test]
    fn keyword_coverage_counts_distinct_lowercased() {
        let keywords = vec!["Revenue".to_string(), "revenue".to_string(), "EBITDA".to_string()];
        let cov = keyword_coverage(&keywords, &["Revenue grew 10%"]);
        assert_eq!(cov, 0.5);
    }

    #[test]
    fn keyword_coverage_empty_inputs() {
        assert_eq!(keyword_coverage(&[], &["doc"]), 0.0);
        assert_eq!(keyword_coverage(&["x".to_string()], &[]), 0.0);
    }

    #[test]
    fn keyword_coverage_monotone_in_documents() {
        let keywords: Vec<String> = ["alpha", "beta", "gamma"].iter().map(|s| s.to_string()).collect();
        let docs = ["alpha here", "nothing", "gamma and beta", "alpha again"];
        let mut previous = 0.0;
        for n in 1..=docs.len() {
            let cov = keyword_coverage(&keywords, &docs[..n]);
            assert!(cov >= previous);
            previous = cov;
        }
        assert_eq!(previous, 1.0);
    }

    // ── relevance derivation + evaluate_retrieval ──

    fn revenue_case() -> (SearchQuery, RetrievalResult) {
        let query = SearchQuery::new("q1", "How did revenue change?")
            .with_keywords(["revenue", "increase"])
            .with_must_contain(["Revenue"]);
        let result = RetrievalResult::new(
            "q1",
            vec![RetrievedDocument::new("d1", "revenue increased by 12%")],
        );
        (query, result)
    }

    #[test]
    fn relevance_is_case_insensitive_substring() {
        let (query, result) = revenue_case();
        assert_eq!(derive_relevant_docs(&query, &result), set(&["d1"]));

        let no_terms = SearchQuery::new("q1", "x");
        assert!(derive_relevant_docs(&no_terms, &result).is_empty());
    }

    #[test]
    fn single_relevant_doc_precision_one() {
        let (query, result) = revenue_case();
        let metrics = evaluator().evaluate_retrieval(&query, &result, 1);
        assert_eq!(metrics[0].metric_name, MetricName::PrecisionAtK);
        assert_eq!(metrics[0].score, 1.0);
    }

    #[test]
    fn default_battery_order_and_details() {
        let (query, result) = revenue_case();
        let metrics = evaluator().evaluate_retrieval(&query, &result, DEFAULT_K);
        let names: Vec<MetricName> = metrics.iter().map(|m| m.metric_name).collect();
        assert_eq!(
            names,
            vec![
                MetricName::PrecisionAtK,
                MetricName::RecallAtK,
                MetricName::MeanAveragePrecision,
                MetricName::SemanticSimilarity,
                MetricName::KeywordCoverage,
            ]
        );
        assert_eq!(metrics[0].details.as_ref().unwrap()["k"], 5.0);
        assert_eq!(metrics[1].details.as_ref().unwrap()["k"], 5.0);
        assert!(metrics[2].details.is_none());
        // "increase" is a substring of "increased"
        assert_eq!(metrics[4].score, 1.0);
    }

    #[test]
    fn empty_retrieval_scores_zero_similarity_and_coverage() {
        let (query, _) = revenue_case();
        let empty = RetrievalResult::new("q1", Vec::new());
        let result = evaluator().evaluate_single(&query, &empty, 5);
        assert_eq!(result.score(MetricName::SemanticSimilarity), Some(0.0));
        assert_eq!(result.score(MetricName::KeywordCoverage), Some(0.0));
        assert_eq!(result.average_score, 0.0);
    }

    // ── batch ──

    #[test]
    fn batch_length_mismatch() {
        let (query, result) = revenue_case();
        let err = evaluator()
            .evaluate_batch(&[query.clone(), query], &[result], 5)
            .unwrap_err();
        assert!(matches!(
            err,
            EvalError::LengthMismatch {
                queries: 2,
                results: 1
            }
        ));
    }

    #[test]
    fn batch_empty_is_error() {
        let err = evaluator().evaluate_batch(&[], &[], 5).unwrap_err();
        assert!(matches!(err, EvalError::EmptyInput(_)));
    }

    #[test]
    fn batch_precision_average() {
        // precision@2 of 1.0, 0.5, 0.0
        let query = SearchQuery::new("q", "find revenue").with_must_contain(["revenue"]);
        let results = vec![
            RetrievalResult::new(
                "q",
                vec![
                    RetrievedDocument::new("a", "revenue"),
                    RetrievedDocument::new("b", "revenue"),
                ],
            ),
            RetrievalResult::new(
                "q",
                vec![
                    RetrievedDocument::new("a", "revenue"),
                    RetrievedDocument::new("b", "costs"),
                ],
            ),
            RetrievalResult::new(
                "q",
                vec![
                    RetrievedDocument::new("a", "costs"),
                    RetrievedDocument::new("b", "costs"),
                ],
            ),
        ];
        let queries = vec![query.clone(), query.clone(), query];
        let batch = evaluator().evaluate_batch(&queries, &results, 2).unwrap();

        assert_eq!(batch.results.len(), 3);
        assert_eq!(batch.metric_averages[&MetricName::PrecisionAtK], 0.5);
        assert!(!batch.metric_averages.contains_key(&MetricName::NdcgAtK));

        let mean_of_means =
            batch.results.iter().map(|r| r.average_score).sum::<f64>() / 3.0;
        assert!((batch.overall_average - mean_of_means).abs() < 1e-12);
    }

    #[test]
    fn catalog_lists_all_six_metrics() {
        let catalog = available_metrics();
        assert_eq!(catalog.len(), 6);
        assert!(catalog.iter().any(|m| m.name == MetricName::NdcgAtK));
        assert!(catalog.iter().all(|m| !m.description.is_empty()));
    }
}
