#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::rc::Rc;

use rs_digest_cast::domain::digest::{MessageId, RawMessage};
use rs_digest_cast::error::DigestError;
use rs_digest_cast::mail::session::{Connector, MailStore};
use rs_digest_cast::narration::Synthesizer;

pub fn plain_message(subject: &str, body: &str) -> RawMessage {
    format!("Subject: {subject}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{body}")
        .into_bytes()
}

/// Canned server contents: which ids each sender matches, in server order.
#[derive(Default)]
pub struct FakeMailbox {
    pub by_sender: HashMap<String, Vec<MessageId>>,
    pub messages: HashMap<MessageId, RawMessage>,
    pub broken_fetches: HashSet<MessageId>,
    pub broken_searches: HashSet<String>,
    pub lost_on_search: HashSet<String>,
    pub unselectable: bool,
}

impl FakeMailbox {
    pub fn with(mut self, sender: &str, ids: &[MessageId]) -> Self {
        self.by_sender.insert(sender.to_string(), ids.to_vec());
        self
    }

    pub fn message(mut self, id: MessageId, raw: RawMessage) -> Self {
        self.messages.insert(id, raw);
        self
    }
}

#[derive(Default, Debug)]
pub struct Journal {
    pub selects: Vec<String>,
    pub searches: Vec<String>,
    pub fetched: Vec<MessageId>,
    pub logouts: usize,
}

pub struct FakeStore {
    mailbox: Rc<FakeMailbox>,
    journal: Rc<RefCell<Journal>>,
}

fn sender_of(criteria: &str) -> &str {
    criteria.split('"').nth(1).unwrap_or_default()
}

impl MailStore for FakeStore {
    fn select(&mut self, mailbox: &str) -> Result<(), DigestError> {
        self.journal.borrow_mut().selects.push(mailbox.to_string());
        if self.mailbox.unselectable {
            return Err(DigestError::Search {
                criteria: format!("SELECT {mailbox}"),
                reason: "NO [NONEXISTENT] Unknown Mailbox".to_string(),
            });
        }
        Ok(())
    }

    fn search(&mut self, criteria: &str) -> Result<Vec<MessageId>, DigestError> {
        self.journal.borrow_mut().searches.push(criteria.to_string());
        let sender = sender_of(criteria);
        if self.mailbox.lost_on_search.contains(sender) {
            return Err(DigestError::ConnectionLost("connection reset by peer".to_string()));
        }
        if self.mailbox.broken_searches.contains(sender) {
            return Err(DigestError::Search {
                criteria: criteria.to_string(),
                reason: "connection reset".to_string(),
            });
        }
        Ok(self.mailbox.by_sender.get(sender).cloned().unwrap_or_default())
    }

    fn fetch(&mut self, id: MessageId) -> Result<RawMessage, DigestError> {
        self.journal.borrow_mut().fetched.push(id);
        if self.mailbox.broken_fetches.contains(&id) {
            return Err(DigestError::Fetch {
                id,
                reason: "server said NO".to_string(),
            });
        }
        self.mailbox.messages.get(&id).cloned().ok_or(DigestError::Fetch {
            id,
            reason: "not found".to_string(),
        })
    }

    fn logout(&mut self) -> Result<(), DigestError> {
        self.journal.borrow_mut().logouts += 1;
        Ok(())
    }
}

pub struct FakeConnector {
    pub mailbox: Rc<FakeMailbox>,
    pub journal: Rc<RefCell<Journal>>,
    pub refuse: bool,
}

impl FakeConnector {
    pub fn new(mailbox: FakeMailbox) -> Self {
        Self {
            mailbox: Rc::new(mailbox),
            journal: Rc::new(RefCell::new(Journal::default())),
            refuse: false,
        }
    }

    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::new(FakeMailbox::default())
        }
    }

    pub fn store(&self) -> FakeStore {
        FakeStore {
            mailbox: self.mailbox.clone(),
            journal: self.journal.clone(),
        }
    }
}

impl Connector for FakeConnector {
    type Store = FakeStore;

    fn open(&self) -> Result<FakeStore, DigestError> {
        if self.refuse {
            return Err(DigestError::Auth {
                user: "me@example.com".to_string(),
                reason: "invalid credentials".to_string(),
            });
        }
        Ok(self.store())
    }
}

/// Fails the first `failures` calls, then writes a fake MP3.
#[derive(Clone)]
pub struct FakeTts {
    pub failures: u32,
    pub calls: Rc<Cell<u32>>,
    pub spoken: Rc<RefCell<Vec<String>>>,
}

impl FakeTts {
    pub fn failing(failures: u32) -> Self {
        Self {
            failures,
            calls: Rc::new(Cell::new(0)),
            spoken: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn working() -> Self {
        Self::failing(0)
    }
}

impl Synthesizer for FakeTts {
    fn synthesize(&self, text: &str, dest: &Path) -> Result<(), DigestError> {
        let n = self.calls.get() + 1;
        self.calls.set(n);
        if n <= self.failures {
            return Err(DigestError::Synthesis(format!("429 Too Many Requests ({n})")));
        }
        self.spoken.borrow_mut().push(text.to_string());
        fs::write(dest, b"ID3fake")?;
        Ok(())
    }
}
