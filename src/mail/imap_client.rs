use log::info;
use native_tls::{TlsConnector, TlsStream};
use std::net::TcpStream;

use crate::domain::digest::{MessageId, RawMessage};
use crate::error::DigestError;
use crate::mail::decoders::decode_mailbox_name;
use crate::mail::session::{Connector, MailStore, parse_search_response};

pub const ACCOUNT_VAR: &str = "EMAIL";
pub const SECRET_VAR: &str = "PASSWORD";

/// Account and app password. Either may be missing; that only becomes an
/// error when a connection is attempted.
#[derive(Clone, Default)]
pub struct Credentials {
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            user: non_empty(ACCOUNT_VAR),
            password: non_empty(SECRET_VAR),
        }
    }

    fn require(&self) -> Result<(&str, &str), DigestError> {
        let user = self
            .user
            .as_deref()
            .ok_or(DigestError::MissingCredential(ACCOUNT_VAR))?;
        let password = self
            .password
            .as_deref()
            .ok_or(DigestError::MissingCredential(SECRET_VAR))?;
        Ok((user, password))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

pub struct ImapConnector {
    pub server: String,
    pub port: u16,
    pub credentials: Credentials,
}

impl ImapConnector {
    pub fn new(server: impl Into<String>, port: u16, credentials: Credentials) -> Self {
        Self {
            server: server.into(),
            port,
            credentials,
        }
    }
}

impl Connector for ImapConnector {
    type Store = ImapStore;

    fn open(&self) -> Result<ImapStore, DigestError> {
        ImapStore::connect(&self.server, self.port, &self.credentials)
    }
}

type TlsSession = imap::Session<TlsStream<TcpStream>>;

pub struct ImapStore {
    session: TlsSession,
}

impl ImapStore {
    pub fn connect(server: &str, port: u16, credentials: &Credentials) -> Result<Self, DigestError> {
        let (user, password) = credentials.require()?;
        info!("Attempting to connect to {server}:{port}...");

        let connect_err = |reason: String| DigestError::Connect {
            server: server.to_string(),
            reason,
        };
        let tls = TlsConnector::builder()
            .build()
            .map_err(|e| connect_err(e.to_string()))?;
        let client = imap::connect((server, port), server, &tls).map_err(|e| connect_err(e.to_string()))?;

        let session = client.login(user, password).map_err(|(e, _client)| DigestError::Auth {
            user: user.to_string(),
            reason: e.to_string(),
        })?;

        info!("Successfully connected to {server}.");
        Ok(Self { session })
    }

    /// All mailbox names on the account, decoded for display.
    pub fn list_mailboxes(&mut self) -> Result<Vec<String>, DigestError> {
        let names = self
            .session
            .list(Some(""), Some("*"))
            .map_err(|e| DigestError::Search {
                criteria: "LIST \"\" *".to_string(),
                reason: e.to_string(),
            })?;
        Ok(names.iter().map(|n| decode_mailbox_name(n.name())).collect())
    }
}

impl MailStore for ImapStore {
    fn select(&mut self, mailbox: &str) -> Result<(), DigestError> {
        let mb = self.session.select(mailbox).map_err(|e| {
            classify(e, |reason| DigestError::Mailbox {
                mailbox: mailbox.to_string(),
                reason,
            })
        })?;
        info!("{mailbox} has {} messages", mb.exists);
        Ok(())
    }

    // `Session::search` collects into a HashSet; the raw response keeps server order.
    fn search(&mut self, criteria: &str) -> Result<Vec<MessageId>, DigestError> {
        let raw = self
            .session
            .run_command_and_read_response(format!("SEARCH {criteria}"))
            .map_err(|e| {
                classify(e, |reason| DigestError::Search {
                    criteria: criteria.to_string(),
                    reason,
                })
            })?;
        Ok(parse_search_response(&raw))
    }

    fn fetch(&mut self, id: MessageId) -> Result<RawMessage, DigestError> {
        let fetch_err = |reason: String| DigestError::Fetch { id, reason };
        let fetches = self
            .session
            .fetch(id.to_string(), "RFC822")
            .map_err(|e| classify(e, |r| fetch_err(r)))?;
        let f = fetches
            .iter()
            .next()
            .ok_or_else(|| fetch_err("not found".to_string()))?;
        f.body()
            .map(|b| b.to_vec())
            .ok_or_else(|| fetch_err("response carried no body".to_string()))
    }

    fn logout(&mut self) -> Result<(), DigestError> {
        self.session.logout().map_err(|e| DigestError::Connect {
            server: "imap".to_string(),
            reason: format!("logout: {e}"),
        })
    }
}

/// A broken transport takes every later command down with it, so it is
/// reported as `ConnectionLost`; server refusals go through `other`.
fn classify(e: imap::Error, other: impl FnOnce(String) -> DigestError) -> DigestError {
    match e {
        imap::Error::Io(_) | imap::Error::ConnectionLost => {
            DigestError::ConnectionLost(e.to_string())
        }
        e => other(e.to_string()),
    }
}
