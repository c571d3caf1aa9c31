use serde::{Deserialize, Serialize};

pub type MessageId = u32;

/// Raw RFC 822 bytes of one fetched message.
pub type RawMessage = Vec<u8>;

/// A newsletter sender and the label it is read out under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    pub address: String,
    pub label: String,
}

impl Source {
    pub fn new(address: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            label: label.into(),
        }
    }
}

/// Subject and plain-text body pulled out of one message.
/// Both are empty when the message could not be decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedContent {
    pub subject: String,
    pub body: String,
}

impl ExtractedContent {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_complete(&self) -> bool {
        !self.subject.is_empty() && !self.body.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestEntry {
    pub source: Source,
    pub subject: String,
    pub body: String,
}

impl DigestEntry {
    /// Only complete extractions become entries.
    pub fn from_content(source: &Source, content: ExtractedContent) -> Option<Self> {
        if !content.is_complete() {
            return None;
        }
        Some(Self {
            source: source.clone(),
            subject: content.subject,
            body: content.body,
        })
    }

    pub fn render(&self) -> String {
        format!(
            "From: {}\nSubject: {}\n\n{}\n\n",
            self.source.label, self.subject, self.body
        )
    }
}

/// Entries in configured source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Digest {
    entries: Vec<DigestEntry>,
}

impl Digest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: DigestEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[DigestEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn text(&self) -> String {
        self.entries.iter().map(DigestEntry::render).collect()
    }
}
