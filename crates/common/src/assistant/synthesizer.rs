//! LLM Synthesizer - Answers chat questions from gazette records
//!
//! Provides:
//! - Record-grounded answer generation through a chat-completions API
//! - A templated answer when no API key is configured
//! - Citation extraction back to gazette entry ids

use crate::config::AssistantConfig;
use crate::db::models::{GazetteEntry, NoticeKind};
use crate::errors::{AppError, Result};
use backoff::ExponentialBackoff;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

static CITATION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d+)\]").expect("citation regex"));

const SYSTEM_PROMPT: &str = "You are a research assistant for Ghana Government Gazette notices. \
    Answer only from the numbered records you are given. If the records do not answer the \
    question, say so. Do not make up names, dates or places.";

/// Answer returned to the chat client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatAnswer {
    /// Generated answer text
    pub answer: String,

    /// Records referenced by the answer
    pub citations: Vec<Citation>,

    /// Confidence score (0.0 - 1.0)
    pub confidence: f32,

    /// Whether the completion API produced the answer
    pub generated: bool,
}

/// Citation in a chat answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Citation {
    /// Citation index (1-based)
    pub index: usize,

    /// Gazette entry ID
    pub entry_id: Uuid,

    /// One-line description of the record
    pub summary: String,
}

/// Synthesizer for generating answers
pub struct Synthesizer {
    config: AssistantConfig,
    client: reqwest::Client,
}

impl Synthesizer {
    /// Create a new synthesizer
    pub fn new(config: AssistantConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e)
            })?;

        Ok(Self { config, client })
    }

    fn api_key(&self) -> Option<&str> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Answer a question from the given records
    pub async fn answer(&self, question: &str, records: &[GazetteEntry]) -> Result<ChatAnswer> {
        let Some(api_key) = self.api_key() else {
            return Ok(templated_answer(records));
        };

        if records.is_empty() {
            return Ok(templated_answer(records));
        }

        let prompt = build_prompt(question, records);
        let response = self.call_llm(api_key, &prompt).await?;
        let citations = extract_citations(&response, records);
        let confidence = calculate_confidence(&citations, records);

        Ok(ChatAnswer {
            answer: response,
            citations,
            confidence,
            generated: true,
        })
    }

    /// Call the chat-completions API, retrying transient failures
    async fn call_llm(&self, api_key: &str, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct ChatMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage<'a>>,
            max_tokens: usize,
            temperature: f32,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatMessageResponse,
        }

        #[derive(Deserialize)]
        struct ChatMessageResponse {
            content: String,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: prompt },
            ],
            max_tokens: self.config.max_tokens,
            temperature: 0.1,
        };

        let policy = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(self.config.max_retry_secs)),
            ..ExponentialBackoff::default()
        };

        let client = &self.client;
        let endpoint = self.config.endpoint.as_str();
        let request = &request;

        let chat_response: ChatResponse = backoff::future::retry(policy, || async move {
            let response = client
                .post(endpoint)
                .bearer_auth(api_key)
                .json(request)
                .send()
                .await
                .map_err(|e| {
                    tracing::warn!(error = %e, "Completion request failed, retrying");
                    backoff::Error::transient(AppError::Assistant {
                        message: format!("completion request failed: {}", e),
                    })
                })?;

            let status = response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                tracing::warn!(status = status.as_u16(), "Completion API unavailable, retrying");
                return Err(backoff::Error::transient(AppError::Assistant {
                    message: format!("completion API returned {}", status),
                }));
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(backoff::Error::permanent(AppError::Assistant {
                    message: format!("completion API error {}: {}", status, body),
                }));
            }

            response.json::<ChatResponse>().await.map_err(|e| {
                backoff::Error::permanent(AppError::Assistant {
                    message: format!("failed to parse completion response: {}", e),
                })
            })
        })
        .await?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AppError::Assistant {
                message: "empty response from completion API".to_string(),
            })
    }
}

/// Build the grounded prompt for the completion API
fn build_prompt(question: &str, records: &[GazetteEntry]) -> String {
    let mut prompt = format!(
        "Question: {}\n\nCite the records you rely on as [1], [2], etc.\n\nRecords:\n",
        question.trim()
    );

    for (i, record) in records.iter().enumerate() {
        prompt.push_str(&format!("[{}] {}\n", i + 1, describe(record)));
    }

    prompt.push_str("\nAnswer:");
    prompt
}

/// Deterministic answer listing the records
fn templated_answer(records: &[GazetteEntry]) -> ChatAnswer {
    if records.is_empty() {
        return ChatAnswer {
            answer: "I could not find any gazette notices matching your question. \
                Try including the person's full name as printed in the gazette."
                .to_string(),
            citations: Vec::new(),
            confidence: 0.0,
            generated: false,
        };
    }

    let mut answer = if records.len() == 1 {
        "I found 1 gazette notice that may answer your question:\n".to_string()
    } else {
        format!(
            "I found {} gazette notices that may answer your question:\n",
            records.len()
        )
    };

    let mut citations = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        let summary = describe(record);
        answer.push_str(&format!("[{}] {}\n", i + 1, summary));
        citations.push(Citation {
            index: i + 1,
            entry_id: record.id,
            summary,
        });
    }

    ChatAnswer {
        answer: answer.trim_end().to_string(),
        citations,
        confidence: 1.0,
        generated: false,
    }
}

/// One-line, human readable description of a record
pub fn describe(record: &GazetteEntry) -> String {
    let subject = match record.title.as_deref() {
        Some(title) => format!("{} {}", title, record.name),
        None => record.name.clone(),
    };

    let aliases = record.alias_list();
    let aka = if aliases.is_empty() {
        String::new()
    } else {
        format!(" (also known as {})", aliases.join(", "))
    };

    let mut text = match record.notice_kind() {
        Some(NoticeKind::ChangeOfName) => {
            let new_name = match (&record.new_title, &record.new_name) {
                (Some(title), Some(name)) => format!("{} {}", title, name),
                (None, Some(name)) => name.clone(),
                _ => "an unrecorded name".to_string(),
            };
            let mut s = format!("{}{} is now known as {}", subject, aka, new_name);
            if let Some(date) = record.effective_date {
                s.push_str(&format!(", with effect from {}", date.format("%-d %B %Y")));
            }
            s
        }
        Some(NoticeKind::ChangeOfDateOfBirth) => {
            correction(&subject, &aka, "date of birth", &record.new_value, &record.old_value)
        }
        Some(NoticeKind::ChangeOfPlaceOfBirth) => {
            correction(&subject, &aka, "place of birth", &record.new_value, &record.old_value)
        }
        Some(NoticeKind::MarriageOfficer) => {
            let mut s = format!("{} was appointed a marriage officer", subject);
            let place: Vec<&str> = [record.church.as_deref(), record.location.as_deref()]
                .into_iter()
                .flatten()
                .collect();
            if !place.is_empty() {
                s.push_str(&format!(" for {}", place.join(", ")));
            }
            s
        }
        None => format!("{}{} ({})", subject, aka, record.kind),
    };

    let mut reference = Vec::new();
    if let Some(number) = &record.gazette_number {
        reference.push(format!("Gazette No. {}", number));
    }
    if let Some(date) = record.gazette_date {
        reference.push(date.format("%-d %B %Y").to_string());
    }
    if let Some(item) = record.item_number {
        reference.push(format!("item {}", item));
    }
    if !reference.is_empty() {
        text.push_str(&format!(" ({})", reference.join(", ")));
    }

    text.push('.');
    text
}

fn correction(
    subject: &str,
    aka: &str,
    field: &str,
    new_value: &Option<String>,
    old_value: &Option<String>,
) -> String {
    let mut s = format!(
        "{}{} confirmed {} as {}",
        subject,
        aka,
        field,
        new_value.as_deref().unwrap_or("an unrecorded value")
    );
    if let Some(old) = old_value {
        s.push_str(&format!(" and not {}", old));
    }
    s
}

/// Extract citations from a generated answer
fn extract_citations(response: &str, records: &[GazetteEntry]) -> Vec<Citation> {
    let mut citations: Vec<Citation> = Vec::new();

    for cap in CITATION_PATTERN.captures_iter(response) {
        let Some(idx) = cap.get(1).and_then(|m| m.as_str().parse::<usize>().ok()) else {
            continue;
        };
        if idx == 0 || idx > records.len() || citations.iter().any(|c| c.index == idx) {
            continue;
        }
        let record = &records[idx - 1];
        citations.push(Citation {
            index: idx,
            entry_id: record.id,
            summary: describe(record),
        });
    }

    citations.sort_by_key(|c| c.index);
    citations
}

/// Share of supplied records the answer actually cites
fn calculate_confidence(citations: &[Citation], records: &[GazetteEntry]) -> f32 {
    if records.is_empty() {
        return 0.0;
    }
    if citations.is_empty() {
        return 0.3;
    }
    let coverage = citations.len() as f32 / records.len() as f32;
    (0.5 + coverage * 0.5).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use chrono::{NaiveDate, Utc};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn record(kind: NoticeKind, name: &str) -> GazetteEntry {
        GazetteEntry {
            id: Uuid::new_v4(),
            kind: kind.as_str().to_string(),
            item_number: Some(1024),
            gazette_number: Some("45".to_string()),
            gazette_date: NaiveDate::from_ymd_opt(2021, 3, 12),
            person_id: None,
            title: Some("Mr.".to_string()),
            name: name.to_string(),
            aliases: serde_json::json!([]),
            gender: "male".to_string(),
            new_name: None,
            new_title: None,
            effective_date: None,
            old_value: None,
            new_value: None,
            profession: None,
            church: None,
            location: None,
            raw_text: String::new(),
            source: None,
            search_text: String::new(),
            dedup_key: Uuid::new_v4().to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_describe_change_of_name() {
        let mut r = record(NoticeKind::ChangeOfName, "Kwame Mensah");
        r.aliases = serde_json::json!(["Kwame Asante"]);
        r.new_name = Some("Kwame Asante Mensah".to_string());
        r.effective_date = NaiveDate::from_ymd_opt(2020, 1, 1);

        assert_eq!(
            describe(&r),
            "Mr. Kwame Mensah (also known as Kwame Asante) is now known as Kwame Asante Mensah, \
             with effect from 1 January 2020 (Gazette No. 45, 12 March 2021, item 1024)."
        );
    }

    #[test]
    fn test_describe_birth_correction() {
        let mut r = record(NoticeKind::ChangeOfPlaceOfBirth, "Kofi Boateng");
        r.new_value = Some("Kumasi".to_string());
        r.old_value = Some("Accra".to_string());
        r.gazette_number = None;
        r.gazette_date = None;
        r.item_number = None;

        assert_eq!(
            describe(&r),
            "Mr. Kofi Boateng confirmed place of birth as Kumasi and not Accra."
        );
    }

    #[test]
    fn test_citation_extraction() {
        let records = vec![
            record(NoticeKind::ChangeOfName, "Kwame Mensah"),
            record(NoticeKind::ChangeOfName, "Ama Owusu"),
        ];

        let response = "Kwame changed his name [1]. See also [2] and again [1]; ignore [7].";
        let citations = extract_citations(response, &records);

        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].index, 1);
        assert_eq!(citations[0].entry_id, records[0].id);
        assert_eq!(citations[1].index, 2);
        assert_eq!(calculate_confidence(&citations, &records), 1.0);
    }

    #[tokio::test]
    async fn test_templated_answer_without_api_key() {
        let synthesizer = Synthesizer::new(AssistantConfig::default()).unwrap();
        let records = vec![record(NoticeKind::MarriageOfficer, "Samuel Osei")];

        let answer = synthesizer.answer("marriage officers", &records).await.unwrap();

        assert!(!answer.generated);
        assert!(answer.answer.starts_with("I found 1 gazette notice"));
        assert!(answer.answer.contains("[1] Mr. Samuel Osei was appointed a marriage officer"));
        assert_eq!(answer.citations.len(), 1);
        assert_eq!(answer.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_templated_answer_without_records() {
        let synthesizer = Synthesizer::new(AssistantConfig::default()).unwrap();
        let answer = synthesizer.answer("who?", &[]).await.unwrap();

        assert!(answer.citations.is_empty());
        assert_eq!(answer.confidence, 0.0);
    }

    /// Serve `responses` in order from a local completions endpoint,
    /// repeating the last one
    async fn completions_server(responses: Vec<(StatusCode, Value)>) -> (String, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let responses = Arc::new(responses);

        let handler = {
            let calls = calls.clone();
            move || {
                let calls = calls.clone();
                let responses = responses.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    let (status, body) = responses[n.min(responses.len() - 1)].clone();
                    (status, Json(body))
                }
            }
        };
        let app = Router::new().route("/v1/chat/completions", post(handler));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/v1/chat/completions", addr), calls)
    }

    fn completion(content: &str) -> Value {
        json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
    }

    fn live_config(endpoint: String) -> AssistantConfig {
        AssistantConfig {
            endpoint,
            api_key: Some("sk-test".to_string()),
            max_retry_secs: 5,
            ..AssistantConfig::default()
        }
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let (endpoint, calls) = completions_server(vec![
            (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "overloaded" })),
            (StatusCode::OK, completion("Ama Owusu changed her name [2].")),
        ])
        .await;
        let synthesizer = Synthesizer::new(live_config(endpoint)).unwrap();
        let records = vec![
            record(NoticeKind::ChangeOfName, "Kwame Mensah"),
            record(NoticeKind::ChangeOfName, "Ama Owusu"),
        ];

        let answer = synthesizer.answer("who changed their name?", &records).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(answer.generated);
        assert_eq!(answer.answer, "Ama Owusu changed her name [2].");
        assert_eq!(answer.citations.len(), 1);
        assert_eq!(answer.citations[0].index, 2);
        assert_eq!(answer.citations[0].entry_id, records[1].id);
        assert_eq!(answer.confidence, 0.75);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let (endpoint, calls) = completions_server(vec![(
            StatusCode::BAD_REQUEST,
            json!({ "error": "unknown model" }),
        )])
        .await;
        let synthesizer = Synthesizer::new(live_config(endpoint)).unwrap();
        let records = vec![record(NoticeKind::MarriageOfficer, "Samuel Osei")];

        let err = synthesizer.answer("marriage officers", &records).await.unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, AppError::Assistant { .. }));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_GATEWAY);
        assert_eq!(serde_json::to_value(err.code()).unwrap(), "ASSISTANT_ERROR");
    }

    #[tokio::test]
    async fn test_empty_choices_is_an_error() {
        let (endpoint, _) = completions_server(vec![(StatusCode::OK, json!({ "choices": [] }))]).await;
        let synthesizer = Synthesizer::new(live_config(endpoint)).unwrap();
        let records = vec![record(NoticeKind::MarriageOfficer, "Samuel Osei")];

        let err = synthesizer.answer("marriage officers", &records).await.unwrap_err();
        assert!(err.to_string().contains("empty response"));
    }
}
