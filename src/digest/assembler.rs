use chrono::NaiveDate;
use log::info;

use crate::digest::harvester::harvest;
use crate::domain::digest::{Digest, Source};
use crate::error::DigestError;
use crate::mail::session::{MailSession, MailStore};

/// Harvest every source in configured order, one at a time, keeping the
/// entries that came back. Stops at the first fatal error.
pub fn assemble<S: MailStore>(
    session: &mut MailSession<S>,
    mailbox: &str,
    sources: &[Source],
    on: NaiveDate,
) -> Result<Digest, DigestError> {
    let mut digest = Digest::new();
    for source in sources {
        if let Some(entry) = harvest(session, mailbox, source, on)? {
            digest.push(entry);
        }
    }
    info!(
        "Total content length: {} characters ({} of {} sources)",
        digest.text().chars().count(),
        digest.entries().len(),
        sources.len()
    );
    Ok(digest)
}
