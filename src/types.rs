use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Substring rules deciding which retrieved documents count as relevant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelevanceCriteria {
    pub must_contain: Vec<String>,
    pub should_contain: Vec<String>,
    /// Topic labels. Informational only, no metric reads them.
    pub semantic_aspects: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query_id: String,
    pub query: String,
    pub expected_relevant_content: String,
    pub keywords: Vec<String>,
    pub relevance_criteria: RelevanceCriteria,
}

impl SearchQuery {
    /// Create a query with empty keywords and criteria.
    /// Use the builder-style setters to fill them in.
    pub fn new(query_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
            query: query.into(),
            expected_relevant_content: String::new(),
            keywords: Vec::new(),
            relevance_criteria: RelevanceCriteria::default(),
        }
    }

    pub fn with_expected_content(mut self, content: impl Into<String>) -> Self {
        self.expected_relevant_content = content.into();
        self
    }

    pub fn with_keywords<S: Into<String>>(mut self, keywords: impl IntoIterator<Item = S>) -> Self {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_must_contain<S: Into<String>>(
        mut self,
        terms: impl IntoIterator<Item = S>,
    ) -> Self {
        self.relevance_criteria.must_contain = terms.into_iter().map(Into::into).collect();
        self
    }
}

/// One ranked document, `{doc_id: content}` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct RetrievedDocument {
    pub doc_id: String,
    pub content: String,
}

impl RetrievedDocument {
    pub fn new(doc_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            content: content.into(),
        }
    }
}

impl TryFrom<BTreeMap<String, String>> for RetrievedDocument {
    type Error = String;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        if map.len() != 1 {
            return Err(format!(
                "retrieved document must be a single {{doc_id: content}} pair, got {} keys",
                map.len()
            ));
        }
        let (doc_id, content) = map
            .into_iter()
            .next()
            .ok_or_else(|| "empty retrieved document".to_string())?;
        Ok(Self { doc_id, content })
    }
}

impl From<RetrievedDocument> for BTreeMap<String, String> {
    fn from(doc: RetrievedDocument) -> Self {
        BTreeMap::from([(doc.doc_id, doc.content)])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub query_id: String,
    /// Ranked, best first.
    pub retrieved_documents: Vec<RetrievedDocument>,
    /// Parallel to `retrieved_documents` when the producer is honest. Not checked.
    #[serde(default)]
    pub scores: Vec<f64>,
}

impl RetrievalResult {
    pub fn new(query_id: impl Into<String>, retrieved_documents: Vec<RetrievedDocument>) -> Self {
        Self {
            query_id: query_id.into(),
            retrieved_documents,
            scores: Vec::new(),
        }
    }

    pub fn doc_ids(&self) -> Vec<&str> {
        self.retrieved_documents
            .iter()
            .map(|d| d.doc_id.as_str())
            .collect()
    }

    pub fn contents(&self) -> Vec<&str> {
        self.retrieved_documents
            .iter()
            .map(|d| d.content.as_str())
            .collect()
    }
}

/// The fixed metric vocabulary. Declaration order is report column order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    PrecisionAtK,
    RecallAtK,
    MeanAveragePrecision,
    NdcgAtK,
    SemanticSimilarity,
    KeywordCoverage,
}

impl MetricName {
    pub const ALL: [MetricName; 6] = [
        Self::PrecisionAtK,
        Self::RecallAtK,
        Self::MeanAveragePrecision,
        Self::NdcgAtK,
        Self::SemanticSimilarity,
        Self::KeywordCoverage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrecisionAtK => "precision_at_k",
            Self::RecallAtK => "recall_at_k",
            Self::MeanAveragePrecision => "mean_average_precision",
            Self::NdcgAtK => "ndcg_at_k",
            Self::SemanticSimilarity => "semantic_similarity",
            Self::KeywordCoverage => "keyword_coverage",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::PrecisionAtK => "Proportion of relevant documents among top k retrieved",
            Self::RecallAtK => "Proportion of relevant documents retrieved among all relevant",
            Self::MeanAveragePrecision => "Average precision at each relevant document position",
            Self::NdcgAtK => "Normalized Discounted Cumulative Gain at k",
            Self::SemanticSimilarity => {
                "Average semantic similarity between query and retrieved documents"
            }
            Self::KeywordCoverage => "Proportion of query keywords found in retrieved documents",
        }
    }
}

impl std::str::FromStr for MetricName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown metric: '{s}'"))
    }
}

impl std::fmt::Display for MetricName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog entry for a metric, as listed by `rageval metrics`.
#[derive(Debug, Clone, Serialize)]
pub struct MetricInfo {
    pub name: MetricName,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub metric_name: MetricName,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, f64>>,
}

impl MetricResult {
    pub fn new(metric_name: MetricName, score: f64) -> Self {
        Self {
            metric_name,
            score,
            details: None,
        }
    }

    /// Attach one auxiliary parameter, e.g. `("k", 5.0)`.
    pub fn with_detail(mut self, key: &str, value: f64) -> Self {
        self.details
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub query_id: String,
    pub metrics: Vec<MetricResult>,
    pub average_score: f64,
}

impl EvaluationResult {
    /// Build a result, computing the unweighted mean of the metric scores.
    pub fn new(query_id: impl Into<String>, metrics: Vec<MetricResult>) -> Self {
        let average_score = if metrics.is_empty() {
            0.0
        } else {
            metrics.iter().map(|m| m.score).sum::<f64>() / metrics.len() as f64
        };
        Self {
            query_id: query_id.into(),
            metrics,
            average_score,
        }
    }

    pub fn score(&self, metric: MetricName) -> Option<f64> {
        self.metrics
            .iter()
            .find(|m| m.metric_name == metric)
            .map(|m| m.score)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEvaluationResult {
    pub results: Vec<EvaluationResult>,
    pub overall_average: f64,
    pub metric_averages: BTreeMap<MetricName, f64>,
}
