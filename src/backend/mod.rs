//! Answer backend client.
//!
//! The backend is an opaque question-answering service: it takes a query
//! string and returns an answer string. Its response shape is not fixed to
//! one field; the answer is extracted by a fixed precedence order over the
//! accepted field names. Any transport-level failure (connection refused,
//! non-2xx, malformed payload) is treated uniformly as "backend unavailable".

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

/// Accepted answer field names, tried in precedence order.
const ANSWER_FIELDS: [&str; 3] = ["answer", "result", "response"];

const MAX_API_ERROR_CHARS: usize = 200;

/// An opaque `answer(query) -> text` collaborator.
#[async_trait]
pub trait AnswerBackend: Send + Sync {
    /// Answer a single query. No internal retry; latency is bounded only by
    /// the underlying transport's own defaults.
    async fn answer(&self, query: &str) -> Result<String>;

    fn name(&self) -> &str;
}

/// HTTP answer backend: POSTs `{"query": ...}` to a configured endpoint.
pub struct HttpAnswerBackend {
    client: Client,
    url: String,
}

impl HttpAnswerBackend {
    pub fn new(url: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl AnswerBackend for HttpAnswerBackend {
    async fn answer(&self, query: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("{} backend unreachable: {e}", self.name()))?;

        if !response.status().is_success() {
            return Err(api_error(self.name(), response).await);
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("{} backend returned malformed JSON: {e}", self.name()))?;

        extract_answer(&payload).ok_or_else(|| {
            anyhow::anyhow!(
                "{} backend response had no answer field (tried: {})",
                self.name(),
                ANSWER_FIELDS.join(", ")
            )
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Extract the answer text from a backend payload by field precedence.
///
/// Only string values count; a field that is present with a non-string
/// value is skipped in favor of the next candidate.
pub fn extract_answer(payload: &Value) -> Option<String> {
    ANSWER_FIELDS
        .iter()
        .find_map(|field| payload.get(field).and_then(Value::as_str))
        .map(str::to_string)
}

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')
}

fn token_end(input: &str, from: usize) -> usize {
    let mut end = from;
    for (i, c) in input[from..].char_indices() {
        if is_secret_char(c) {
            end = from + i + c.len_utf8();
        } else {
            break;
        }
    }
    end
}

/// Scrub known secret-like token prefixes from backend error strings.
pub fn scrub_secret_patterns(input: &str) -> String {
    const PREFIXES: [&str; 3] = ["sk-", "ghp_", "github_pat_"];

    let mut scrubbed = input.to_string();

    for prefix in PREFIXES {
        let mut search_from = 0;
        loop {
            let Some(rel) = scrubbed[search_from..].find(prefix) else {
                break;
            };

            let start = search_from + rel;
            let content_start = start + prefix.len();
            let end = token_end(&scrubbed, content_start);

            if end == content_start {
                search_from = content_start;
                continue;
            }

            scrubbed.replace_range(start..end, "[REDACTED]");
            search_from = start + "[REDACTED]".len();
        }
    }

    scrubbed
}

/// Sanitize backend error text by scrubbing secrets and truncating length.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input);

    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed;
    }

    let mut end = MAX_API_ERROR_CHARS;
    while end > 0 && !scrubbed.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}...", &scrubbed[..end])
}

/// Build a sanitized backend error from a failed HTTP response.
pub async fn api_error(backend: &str, response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read backend error body>".to_string());
    let sanitized = sanitize_api_error(&body);
    anyhow::anyhow!("{backend} backend error ({status}): {sanitized}")
}
