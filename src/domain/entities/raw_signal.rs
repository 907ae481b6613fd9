use crate::domain::values::signal_metadata::{Engagement, SignalMetadata};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One unit of externally observed information as collected from a source.
/// Identity is `(source, external_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSignal {
    pub id: String,
    pub source: String,
    pub external_id: String,
    pub symbol_candidates: Vec<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub url: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub collected_at: DateTime<Utc>,
    pub engagement: Engagement,
    pub metadata: SignalMetadata,
}

impl RawSignal {
    pub fn new(source: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source: source.into(),
            external_id: external_id.into(),
            symbol_candidates: Vec::new(),
            title: None,
            body: None,
            url: None,
            author: None,
            published_at: None,
            collected_at: Utc::now(),
            engagement: Engagement::new(),
            metadata: SignalMetadata::default(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_candidates<I, S>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbol_candidates = candidates.into_iter().map(Into::into).collect();
        self
    }

    pub fn published(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    pub fn identity(&self) -> (&str, &str) {
        (&self.source, &self.external_id)
    }

    /// Title and body joined for lexical analysis.
    pub fn text(&self) -> String {
        match (self.title.as_deref(), self.body.as_deref()) {
            (Some(t), Some(b)) if !b.trim().is_empty() => format!("{t}\n{b}"),
            (Some(t), _) => t.to_string(),
            (None, Some(b)) => b.to_string(),
            (None, None) => String::new(),
        }
    }
}
