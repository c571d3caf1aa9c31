use chrono::NaiveDate;
use log::{debug, info, warn};

use crate::domain::digest::{DigestEntry, Source};
use crate::error::DigestError;
use crate::mail::extractor::extract;
use crate::mail::session::{MailSession, MailStore};

/// Search, pick the latest match and extract it.
///
/// Failures that only concern this source (a refused search or fetch, an
/// undecodable message) are logged and give `Ok(None)`. Fatal ones, such as
/// an unselectable mailbox or a lost connection, are returned.
///
/// "Latest" is the last id in the order the store returned, which is not
/// guaranteed to be chronological.
pub fn harvest<S: MailStore>(
    session: &mut MailSession<S>,
    mailbox: &str,
    source: &Source,
    on: NaiveDate,
) -> Result<Option<DigestEntry>, DigestError> {
    info!(
        "Searching for emails from {} ({})...",
        source.address, source.label
    );

    let ids = match session.search(mailbox, &source.address, on) {
        Ok(ids) => ids,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!("Search for {} failed: {e}", source.label);
            return Ok(None);
        }
    };
    info!("Found {} matching email(s).", ids.len());

    let Some(&latest) = ids.last() else {
        info!("No emails found for {} ({})", source.label, source.address);
        return Ok(None);
    };

    info!("Processing email ID: {latest}");
    let raw = match session.fetch(latest) {
        Ok(raw) => raw,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!("Skipping {}: {e}", source.label);
            return Ok(None);
        }
    };

    let entry = DigestEntry::from_content(source, extract(&raw));
    match &entry {
        Some(e) => {
            info!("Successfully processed email. Subject: {}", e.subject);
            debug!("{}: {} characters of body", source.label, e.body.chars().count());
        }
        None => warn!(
            "Email {latest} from {} had no usable subject or plain-text body",
            source.label
        ),
    }
    Ok(entry)
}
