//! Search assistant
//!
//! Answers natural-language questions about gazette notices:
//! - Query parsing into a notice kind, search terms and year
//! - Record retrieval through the repository
//! - Answer synthesis with citations back to gazette entries

mod query_parser;
mod synthesizer;

pub use query_parser::{ChatIntent, ChatQuery, QueryParser};
pub use synthesizer::{describe, ChatAnswer, Citation, Synthesizer};

use crate::config::AssistantConfig;
use crate::db::models::GazetteEntry;
use crate::db::{GazetteQuery, Repository};
use crate::errors::{AppError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Full reply to a chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    /// How the message was understood
    pub query: ChatQuery,

    /// Synthesized answer
    #[serde(flatten)]
    pub answer: ChatAnswer,

    /// Records the answer was built from
    pub records: Vec<GazetteEntry>,
}

/// Orchestrates parsing, retrieval and synthesis
pub struct Assistant {
    parser: QueryParser,
    synthesizer: Synthesizer,
    repository: Repository,
    max_context: u64,
}

impl Assistant {
    pub fn new(config: AssistantConfig, repository: Repository) -> Result<Self> {
        let max_context = config.max_context.max(1);
        Ok(Self {
            parser: QueryParser::new(),
            synthesizer: Synthesizer::new(config)?,
            repository,
            max_context,
        })
    }

    /// Answer a chat message
    pub async fn chat(&self, message: &str) -> Result<ChatReply> {
        let start = Instant::now();

        if message.trim().is_empty() {
            return Err(AppError::Validation {
                message: "message must not be empty".to_string(),
                field: Some("message".to_string()),
            });
        }

        let query = self.parser.parse(message);
        tracing::debug!(
            intent = query.intent.as_str(),
            terms = ?query.terms,
            year = ?query.year,
            "Parsed chat message"
        );

        let records = self.retrieve(&query).await?;
        let answer = self.synthesizer.answer(&query.original, &records).await?;

        crate::metrics::record_assistant(
            start.elapsed().as_secs_f64(),
            query.intent.as_str(),
            answer.generated,
        );

        tracing::info!(
            intent = query.intent.as_str(),
            records = records.len(),
            citations = answer.citations.len(),
            generated = answer.generated,
            "Answered chat message"
        );

        Ok(ChatReply { query, answer, records })
    }

    /// Fetch the records most likely to answer the query
    async fn retrieve(&self, query: &ChatQuery) -> Result<Vec<GazetteEntry>> {
        let search = build_search(query, self.max_context);

        // Without terms or a year, a kind-only search would return arbitrary notices
        if search.q.is_none() && search.from.is_none() {
            return Ok(Vec::new());
        }

        let page = self.repository.search_entries(&search).await?;
        if !page.items.is_empty() || search.kind.is_none() {
            return Ok(page.items);
        }

        if search.q.is_none() {
            return Ok(Vec::new());
        }

        // The intent guess may be wrong; retry across every notice kind
        let relaxed = GazetteQuery { kind: None, ..search };
        Ok(self.repository.search_entries(&relaxed).await?.items)
    }
}

/// Translate a parsed chat query into a repository search
fn build_search(query: &ChatQuery, max_context: u64) -> GazetteQuery {
    let birth_question = matches!(
        query.intent,
        ChatIntent::DateOfBirth | ChatIntent::PlaceOfBirth
    );

    let (q, from, to) = match query.year {
        // A year in a birth question is the birth year, which is part of the
        // corrected values in `search_text`, not the gazette year
        Some(year) if birth_question => {
            let mut q = query.search_text().unwrap_or_default();
            if !q.is_empty() {
                q.push(' ');
            }
            q.push_str(&year.to_string());
            (Some(q), None, None)
        }
        Some(year) => (
            query.search_text(),
            NaiveDate::from_ymd_opt(year, 1, 1),
            NaiveDate::from_ymd_opt(year, 12, 31),
        ),
        None => (query.search_text(), None, None),
    };

    GazetteQuery {
        q,
        kind: query.intent.kind(),
        from,
        to,
        page: Some(1),
        per_page: Some(max_context),
        ..GazetteQuery::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::NoticeKind;

    #[test]
    fn test_build_search_applies_gazette_year() {
        let query = QueryParser::new().parse("marriage officers for Adum in 2021");
        let search = build_search(&query, 8);

        assert_eq!(search.kind, Some(NoticeKind::MarriageOfficer));
        assert_eq!(search.q.as_deref(), Some("adum"));
        assert_eq!(search.from, NaiveDate::from_ymd_opt(2021, 1, 1));
        assert_eq!(search.to, NaiveDate::from_ymd_opt(2021, 12, 31));
        assert_eq!(search.per_page, Some(8));
    }

    #[test]
    fn test_build_search_keeps_birth_year_as_term() {
        let query = QueryParser::new().parse("date of birth of Ama Serwaa, born 1985?");
        let search = build_search(&query, 5);

        assert_eq!(search.kind, Some(NoticeKind::ChangeOfDateOfBirth));
        assert_eq!(search.q.as_deref(), Some("ama serwaa 1985"));
        assert!(search.from.is_none());
        assert!(search.to.is_none());

        let query = QueryParser::new().parse("Who corrected their date of birth to 1990?");
        assert_eq!(build_search(&query, 5).q.as_deref(), Some("1990"));
    }
}
