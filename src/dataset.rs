//! Corpus and test-case ingestion.
//!
//! Inputs are checked for required fields before deserialization so a
//! malformed file fails with every missing field named at once.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EvalError, Result};
use crate::types::{RetrievalResult, SearchQuery};

const QUERY_FIELDS: &[&str] = &[
    "query_id",
    "query",
    "expected_relevant_content",
    "keywords",
    "relevance_criteria",
];
const CRITERIA_FIELDS: &[&str] = &["must_contain", "should_contain", "semantic_aspects"];
const RESULT_FIELDS: &[&str] = &["query_id", "retrieved_documents"];
const TEST_CASE_FIELDS: &[&str] = &["query", "simulated_result"];

/// Document collection the test cases were drawn from. Only its size is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    pub documents: Vec<Value>,
}

impl Corpus {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// One query with its pre-simulated retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub query: SearchQuery,
    pub simulated_result: RetrievalResult,
    /// For external harnesses; the engine ignores it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_relevant_docs: Option<Vec<String>>,
    /// For external harnesses; the engine ignores it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_metrics: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestCaseSet {
    pub test_cases: Vec<TestCase>,
}

impl TestCaseSet {
    pub fn len(&self) -> usize {
        self.test_cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.test_cases.is_empty()
    }
}

pub fn load_corpus(path: &Path) -> Result<Corpus> {
    parse_corpus(read_json(path)?)
}

pub fn load_test_cases(path: &Path) -> Result<TestCaseSet> {
    parse_test_cases(read_json(path)?)
}

fn read_json(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
    Ok(serde_json::from_str(&text)?)
}

pub fn parse_corpus(value: Value) -> Result<Corpus> {
    let missing = missing_fields(&value, &["documents"], "");
    if !missing.is_empty() {
        return Err(EvalError::schema("corpus", missing));
    }
    Ok(serde_json::from_value(value)?)
}

pub fn parse_test_cases(value: Value) -> Result<TestCaseSet> {
    let missing = missing_fields(&value, &["test_cases"], "");
    if !missing.is_empty() {
        return Err(EvalError::schema("test case file", missing));
    }

    let cases = match value.get("test_cases") {
        Some(Value::Array(cases)) => cases,
        _ => {
            return Err(EvalError::schema(
                "test case file",
                vec!["test_cases (array)".into()],
            ))
        }
    };

    let test_cases = cases
        .iter()
        .enumerate()
        .map(|(i, case)| parse_test_case(case, &format!("test case {i}")))
        .collect::<Result<Vec<_>>>()?;
    Ok(TestCaseSet { test_cases })
}

fn parse_test_case(value: &Value, context: &str) -> Result<TestCase> {
    let mut missing = missing_fields(value, TEST_CASE_FIELDS, "");
    if let Some(query) = value.get("query") {
        missing.extend(query_missing_fields(query, "query."));
    }
    if let Some(result) = value.get("simulated_result") {
        missing.extend(missing_fields(result, RESULT_FIELDS, "simulated_result."));
    }
    if !missing.is_empty() {
        return Err(EvalError::schema(context, missing));
    }
    Ok(serde_json::from_value(value.clone())?)
}

/// Validate and deserialize a standalone query object.
pub fn parse_query(value: Value) -> Result<SearchQuery> {
    let missing = query_missing_fields(&value, "");
    if !missing.is_empty() {
        return Err(EvalError::schema("query", missing));
    }
    Ok(serde_json::from_value(value)?)
}

/// Validate and deserialize a standalone retrieval result object.
pub fn parse_result(value: Value) -> Result<RetrievalResult> {
    let missing = missing_fields(&value, RESULT_FIELDS, "");
    if !missing.is_empty() {
        return Err(EvalError::schema("retrieval result", missing));
    }
    Ok(serde_json::from_value(value)?)
}

fn query_missing_fields(query: &Value, prefix: &str) -> Vec<String> {
    let mut missing = missing_fields(query, QUERY_FIELDS, prefix);
    if let Some(criteria) = query.get("relevance_criteria") {
        missing.extend(missing_fields(
            criteria,
            CRITERIA_FIELDS,
            &format!("{prefix}relevance_criteria."),
        ));
    }
    missing
}

/// Fields from `required` absent from `value` (all of them if it isn't an object).
fn missing_fields(value: &Value, required: &[&str], prefix: &str) -> Vec<String> {
    let object = value.as_object();
    required
        .iter()
        .filter(|field| object.map_or(true, |o| !o.contains_key(**field)))
        .map(|field| format!("{prefix}{field}"))
        .collect()
}
