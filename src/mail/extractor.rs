//! Turns a fetched RFC 822 message into the subject and plain-text body
//! that end up in the digest.

use log::{debug, warn};
use mailparse::{MailHeaderMap, ParsedMail};

use crate::domain::digest::ExtractedContent;
use crate::error::DigestError;
use crate::mail::decoders::decode_subject;

/// Extract subject and body. Never fails: a message that cannot be decoded
/// yields empty content and a warning, so one bad newsletter cannot sink the run.
pub fn extract(raw: &[u8]) -> ExtractedContent {
    match try_extract(raw) {
        Ok(content) => content,
        Err(e) => {
            warn!("Error processing email: {e}");
            ExtractedContent::empty()
        }
    }
}

fn try_extract(raw: &[u8]) -> Result<ExtractedContent, DigestError> {
    let parsed = mailparse::parse_mail(raw).map_err(|e| DigestError::Decode(e.to_string()))?;

    let subject = parsed
        .headers
        .get_first_header("Subject")
        .map(|h| decode_subject(h.get_value_raw()))
        .unwrap_or_default();

    let body = if is_multipart(&parsed) {
        match first_plain_text(&parsed) {
            Some(part) => decode_body(part)?,
            None => {
                debug!("No text/plain part in multipart message '{subject}'");
                String::new()
            }
        }
    } else {
        decode_body(&parsed)?
    };

    Ok(ExtractedContent { subject, body })
}

fn is_multipart(p: &ParsedMail) -> bool {
    p.ctype.mimetype.to_ascii_lowercase().starts_with("multipart/")
}

/// Depth-first, document order; the first text/plain part wins.
fn first_plain_text<'a>(p: &'a ParsedMail<'a>) -> Option<&'a ParsedMail<'a>> {
    if p.ctype.mimetype.eq_ignore_ascii_case("text/plain") {
        return Some(p);
    }
    p.subparts.iter().find_map(first_plain_text)
}

fn decode_body(p: &ParsedMail) -> Result<String, DigestError> {
    let body = p
        .get_body()
        .map_err(|e| DigestError::Decode(e.to_string()))?;
    // The line break before a closing boundary is not part of the text.
    let body = body
        .strip_suffix("\r\n")
        .or_else(|| body.strip_suffix('\n'))
        .unwrap_or(&body);
    Ok(body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_part_plain_text() {
        let raw = b"From: dan@tldrnewsletter.com\r\n\
Subject: TLDR\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
hello";
        let c = extract(raw);
        assert_eq!(c.subject, "TLDR");
        assert_eq!(c.body, "hello");
    }

    #[test]
    fn single_part_without_content_type_is_decoded_directly() {
        let raw = b"Subject: plain\r\n\r\nhello\r\n";
        assert_eq!(extract(raw).body, "hello");
    }

    #[test]
    fn multipart_takes_first_plain_part() {
        let raw = b"Subject: Mixed\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"XYZ\"\r\n\
\r\n\
--XYZ\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<p>not this</p>\r\n\
--XYZ\r\n\
Content-Type: image/png\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
iVBORw0KGgo=\r\n\
--XYZ\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
world\r\n\
--XYZ\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
second plain part\r\n\
--XYZ--\r\n";
        let c = extract(raw);
        assert_eq!(c.subject, "Mixed");
        assert_eq!(c.body, "world");
    }

    #[test]
    fn nested_alternative_is_walked_in_order() {
        let raw = b"Subject: Nested\r\n\
Content-Type: multipart/mixed; boundary=\"outer\"\r\n\
\r\n\
--outer\r\n\
Content-Type: multipart/alternative; boundary=\"inner\"\r\n\
\r\n\
--inner\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
inner plain\r\n\
--inner\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<b>inner html</b>\r\n\
--inner--\r\n\
--outer\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
outer plain\r\n\
--outer--\r\n";
        assert_eq!(extract(raw).body, "inner plain");
    }

    #[test]
    fn multipart_without_plain_text_has_empty_body() {
        let raw = b"Subject: Html only\r\n\
Content-Type: multipart/alternative; boundary=\"b\"\r\n\
\r\n\
--b\r\n\
Content-Type: text/html\r\n\
\r\n\
<p>hi</p>\r\n\
--b--\r\n";
        let c = extract(raw);
        assert_eq!(c.subject, "Html only");
        assert_eq!(c.body, "");
        assert!(!c.is_complete());
    }

    #[test]
    fn transfer_encoding_and_charset_are_honoured() {
        let raw = b"Subject: =?UTF-8?Q?Gr=C3=BC=C3=9Fe?=\r\n\
Content-Type: text/plain; charset=iso-8859-1\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\
\r\n\
Caf=E9 ouvert\r\n";
        let c = extract(raw);
        assert_eq!(c.subject, "Grüße");
        assert_eq!(c.body, "Café ouvert");
    }

    #[test]
    fn base64_plain_part() {
        let raw = b"Subject: b64\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
aGVsbG8gYmFzZTY0\r\n";
        assert_eq!(extract(raw).body, "hello base64");
    }

    #[test]
    fn whitespace_only_body_is_kept() {
        let c = extract(b"Subject: S\r\nContent-Type: text/plain\r\n\r\n   \r\n");
        assert_eq!(c.body, "   ");
        assert!(c.is_complete());
    }

    #[test]
    fn missing_subject_is_empty() {
        let c = extract(b"Content-Type: text/plain\r\n\r\nbody only");
        assert_eq!(c.subject, "");
        assert_eq!(c.body, "body only");
        assert!(!c.is_complete());
    }
}
