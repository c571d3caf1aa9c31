use chrono::NaiveDate;
use log::{debug, info, warn};

use crate::domain::digest::{MessageId, RawMessage};
use crate::error::DigestError;

/// Wire-level operations the pipeline needs from a mail store.
pub trait MailStore {
    fn select(&mut self, mailbox: &str) -> Result<(), DigestError>;
    /// Ids in the order the server returned them.
    fn search(&mut self, criteria: &str) -> Result<Vec<MessageId>, DigestError>;
    fn fetch(&mut self, id: MessageId) -> Result<RawMessage, DigestError>;
    fn logout(&mut self) -> Result<(), DigestError>;
}

/// Opens an authenticated [`MailStore`].
pub trait Connector {
    type Store: MailStore;

    fn open(&self) -> Result<Self::Store, DigestError>;
}

/// `FROM "<address>" SENTON <dd-Mon-yyyy>`
pub fn search_criteria(from_address: &str, on: NaiveDate) -> String {
    let quoted = from_address.replace('\\', "\\\\").replace('"', "\\\"");
    format!("FROM \"{}\" SENTON {}", quoted, on.format("%d-%b-%Y"))
}

/// One logged-in session. Logs out on `close` or, failing that, on drop.
pub struct MailSession<S: MailStore> {
    store: S,
    selected: Option<String>,
    closed: bool,
}

impl<S: MailStore> MailSession<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            selected: None,
            closed: false,
        }
    }

    pub fn open<C: Connector<Store = S>>(connector: &C) -> Result<Self, DigestError> {
        Ok(Self::new(connector.open()?))
    }

    fn ensure_selected(&mut self, mailbox: &str) -> Result<(), DigestError> {
        if self.selected.as_deref() == Some(mailbox) {
            return Ok(());
        }
        // Without a mailbox no source can be searched.
        self.store.select(mailbox).map_err(|e| match e {
            e if e.is_fatal() => e,
            e => DigestError::Mailbox {
                mailbox: mailbox.to_string(),
                reason: e.to_string(),
            },
        })?;
        self.selected = Some(mailbox.to_string());
        Ok(())
    }

    pub fn search(
        &mut self,
        mailbox: &str,
        from_address: &str,
        on: NaiveDate,
    ) -> Result<Vec<MessageId>, DigestError> {
        self.ensure_selected(mailbox)?;
        let criteria = search_criteria(from_address, on);
        info!("Search criteria: {criteria}");
        self.store.search(&criteria)
    }

    pub fn fetch(&mut self, id: MessageId) -> Result<RawMessage, DigestError> {
        debug!("Fetching message {id}");
        self.store.fetch(id)
    }

    pub fn close(&mut self) -> Result<(), DigestError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.store.logout()?;
        info!("Logged out of mail store.");
        Ok(())
    }
}

impl<S: MailStore> Drop for MailSession<S> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Logout failed: {e}");
        }
    }
}

/// Pull the ids out of the untagged `* SEARCH` lines of a raw response,
/// keeping the server's order.
pub fn parse_search_response(raw: &[u8]) -> Vec<MessageId> {
    let text = String::from_utf8_lossy(raw);
    let mut ids = Vec::new();
    for line in text.lines() {
        let mut words = line.split_whitespace();
        if words.next() != Some("*") {
            continue;
        }
        if !words
            .next()
            .is_some_and(|w| w.eq_ignore_ascii_case("SEARCH"))
        {
            continue;
        }
        ids.extend(words.filter_map(|w| w.parse::<MessageId>().ok()));
    }
    ids
}
