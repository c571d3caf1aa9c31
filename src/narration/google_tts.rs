//! Google Translate text-to-speech over its `batchexecute` RPC.
//!
//! The endpoint only accepts short inputs, so text is sent in pieces of at
//! most [`MAX_CHARS`] characters and the returned MP3 frames are
//! concatenated. The output file is written once every piece succeeded.

use base64::{Engine as _, engine::general_purpose};
use log::debug;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::error::DigestError;
use crate::narration::Synthesizer;

const RPC_ID: &str = "jQ1olc";
pub const MAX_CHARS: usize = 100;

pub struct GoogleTts {
    client: reqwest::blocking::Client,
    endpoint: Url,
    lang: String,
}

impl GoogleTts {
    pub fn new(lang: &str, tld: &str) -> Result<Self, DigestError> {
        let endpoint = Url::parse(&format!(
            "https://translate.google.{tld}/_/TranslateWebserverUi/data/batchexecute"
        ))
        .map_err(|e| DigestError::Synthesis(format!("bad tld '{tld}': {e}")))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DigestError::Synthesis(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            lang: lang.to_string(),
        })
    }

    fn speak_piece(&self, piece: &str) -> Result<Vec<u8>, DigestError> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .header("Referer", "http://translate.google.com/")
            .form(&[("f.req", rpc_payload(piece, &self.lang))])
            .send()
            .map_err(|e| DigestError::Synthesis(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DigestError::Synthesis(format!("TTS endpoint returned {status}")));
        }
        let body = resp
            .text()
            .map_err(|e| DigestError::Synthesis(e.to_string()))?;
        decode_audio(&body)
    }
}

impl Synthesizer for GoogleTts {
    fn synthesize(&self, text: &str, dest: &Path) -> Result<(), DigestError> {
        let pieces = split_text(text, MAX_CHARS);
        if pieces.is_empty() {
            return Err(DigestError::Synthesis("no text to speak".to_string()));
        }

        let mut audio = Vec::new();
        for (i, piece) in pieces.iter().enumerate() {
            debug!("TTS piece {}/{}", i + 1, pieces.len());
            audio.extend(self.speak_piece(piece)?);
        }

        fs::write(dest, audio)?;
        Ok(())
    }
}

/// Form value for `f.req`: the RPC envelope with the JSON-encoded arguments
/// nested as a string.
pub fn rpc_payload(text: &str, lang: &str) -> String {
    let args = json!([text, lang, null, "null"]).to_string();
    json!([[[RPC_ID, args, null, "generic"]]]).to_string()
}

/// Pull the base64 MP3 out of a `batchexecute` response. The body starts with
/// an anti-XSSI prefix followed by length-prefixed JSON chunks, one per line.
pub fn decode_audio(response: &str) -> Result<Vec<u8>, DigestError> {
    for line in response.lines().filter(|l| l.contains(RPC_ID)) {
        let Ok(Value::Array(frames)) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        for frame in &frames {
            if frame.get(1).and_then(Value::as_str) != Some(RPC_ID) {
                continue;
            }
            let Some(inner) = frame.get(2).and_then(Value::as_str) else {
                continue;
            };
            let audio_b64 = serde_json::from_str::<Value>(inner)
                .ok()
                .and_then(|v| v.get(0).and_then(Value::as_str).map(str::to_string));
            if let Some(b64) = audio_b64 {
                return general_purpose::STANDARD
                    .decode(b64)
                    .map_err(|e| DigestError::Synthesis(format!("bad audio payload: {e}")));
            }
        }
    }
    Err(DigestError::Synthesis(
        "no audio in TTS response".to_string(),
    ))
}

/// Split on whitespace into pieces of at most `max` characters.
/// Words longer than `max` are cut.
pub fn split_text(text: &str, max: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
                current_len = 0;
            }
            pieces.push(word.drain(..max).collect());
        }
        if word.is_empty() {
            continue;
        }

        let needed = if current.is_empty() { word.len() } else { word.len() + 1 };
        if current_len + needed > max {
            pieces.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }

    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}
