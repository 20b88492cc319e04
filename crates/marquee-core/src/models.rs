use serde::{Deserialize, Serialize};

/// An incoming search request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            page: None,
            per_page: None,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Whether the text is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A video as returned by the primary provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Provider-assigned identity.
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub name: String,
    /// Canonical playback link.
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Length in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

/// One page of candidates plus the provider's pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CandidatePage {
    pub candidates: Vec<Candidate>,
    pub total: u32,
    pub page: u32,
    pub per_page: u32,
}

/// A candidate and the playback URLs accumulated for it.
///
/// `urls` is seeded with the candidate's canonical link; secondary
/// providers append after it in registration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedItem {
    #[serde(rename = "video")]
    pub candidate: Candidate,
    #[serde(rename = "videoUrls")]
    pub urls: Vec<String>,
}

impl From<Candidate> for EnrichedItem {
    fn from(candidate: Candidate) -> Self {
        let urls = vec![candidate.link.clone()];
        Self { candidate, urls }
    }
}

/// A user-facing error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub message: String,
}

impl ErrorDescriptor {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<&crate::error::AppError> for ErrorDescriptor {
    fn from(err: &crate::error::AppError) -> Self {
        Self::new(err.user_message())
    }
}

/// Uniform envelope for a remote call: data, errors, or both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterResult<T> {
    pub data: Option<T>,
    pub errors: Vec<ErrorDescriptor>,
}

impl<T> AdapterResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    pub fn failure(error: ErrorDescriptor) -> Self {
        Self {
            data: None,
            errors: vec![error],
        }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The combined, paginated answer to one query.
///
/// `is_success()` is derived from `messages`: any message, including a
/// warning from a secondary provider, marks the aggregate unsuccessful
/// while the items gathered so far stay in place.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "AggregateEntry", from = "AggregateEntry")]
pub struct AggregateResult {
    pub items: Option<Vec<EnrichedItem>>,
    pub total_count: u32,
    pub per_page: u32,
    pub page: u32,
    messages: Vec<ErrorDescriptor>,
}

impl AggregateResult {
    /// Terminal failure: no items and a single message.
    pub fn failure(error: ErrorDescriptor) -> Self {
        Self {
            messages: vec![error],
            ..Self::default()
        }
    }

    /// Seed an aggregate from a page of candidates.
    pub fn from_page(page: CandidatePage) -> Self {
        Self {
            items: Some(page.candidates.into_iter().map(EnrichedItem::from).collect()),
            total_count: page.total,
            per_page: page.per_page,
            page: page.page,
            messages: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[ErrorDescriptor] {
        &self.messages
    }

    pub fn push_message(&mut self, message: ErrorDescriptor) {
        self.messages.push(message);
    }

    pub fn extend_messages(&mut self, messages: impl IntoIterator<Item = ErrorDescriptor>) {
        self.messages.extend(messages);
    }

    pub fn is_success(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn items(&self) -> &[EnrichedItem] {
        self.items.as_deref().unwrap_or_default()
    }
}

/// Wire form of [`AggregateResult`], as stored in the cache and returned
/// over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AggregateEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Vec<EnrichedItem>>,
    #[serde(default)]
    total_count: u32,
    #[serde(default)]
    per_page: u32,
    #[serde(default)]
    page: u32,
    #[serde(default)]
    messages: Vec<ErrorDescriptor>,
    is_success: bool,
}

impl From<AggregateResult> for AggregateEntry {
    fn from(result: AggregateResult) -> Self {
        let is_success = result.is_success();
        Self {
            data: result.items,
            total_count: result.total_count,
            per_page: result.per_page,
            page: result.page,
            messages: result.messages,
            is_success,
        }
    }
}

impl From<AggregateEntry> for AggregateResult {
    fn from(entry: AggregateEntry) -> Self {
        Self {
            items: entry.data,
            total_count: entry.total_count,
            per_page: entry.per_page,
            page: entry.page,
            messages: entry.messages,
        }
    }
}
