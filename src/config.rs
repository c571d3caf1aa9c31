use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::digest::Source;
use crate::narration::RetryPolicy;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub imap_server: String,
    pub imap_port: u16,
    pub mailbox: String,
    pub output_dir: PathBuf,
    /// Artifacts are `<file_stem>_<YYYY-MM-DD>.txt` / `.mp3`
    pub file_stem: String,
    pub narration: NarrationConfig,
    pub sources: Vec<Source>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct NarrationConfig {
    pub language: String,
    pub tld: String,
    #[serde(flatten)]
    pub retry: RetryPolicy,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            tld: "com".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            imap_server: "imap.gmail.com".to_string(),
            imap_port: 993,
            mailbox: "INBOX".to_string(),
            output_dir: PathBuf::from("."),
            file_stem: "consolidated_emails".to_string(),
            narration: NarrationConfig::default(),
            sources: default_sources(),
        }
    }
}

pub fn default_sources() -> Vec<Source> {
    const TLDR: &str = "dan@tldrnewsletter.com";
    [
        (TLDR, "TLDR"),
        (TLDR, "TLDR AI"),
        (TLDR, "TLDR InfoSec"),
        (TLDR, "TLDR Founders"),
        (TLDR, "TLDR Crypto"),
        (TLDR, "TLDR Design"),
        (TLDR, "TLDR Web Dev"),
        (TLDR, "TLDR Marketing"),
        (TLDR, "TLDR DevOps"),
        ("noreply@news.bloomberg.com", "Bloomberg Technology"),
        ("robotic@substack.com", "Interconnects by Nathan Lambert"),
    ]
    .into_iter()
    .map(|(address, label)| Source::new(address, label))
    .collect()
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir available"))?
        .join("rs_digest_cast"))
}

pub fn config_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("config.toml");
    Ok(p)
}

/// Load the config at `path`, or at the default location. A missing file is
/// created from the defaults, which are then used as-is.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_path()?,
    };
    if !path.exists() {
        let sample = Config::default();
        let tom = toml::to_string_pretty(&sample)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, tom)
            .with_context(|| format!("writing template config {}", path.display()))?;
        info!("Created template config at {} with default sources", path.display());
        return Ok(sample);
    }
    let s = fs::read_to_string(&path)
        .with_context(|| format!("reading config {}", path.display()))?;
    parse_config(&s).with_context(|| format!("parsing config {}", path.display()))
}

pub fn parse_config(s: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(s)?;
    if cfg.sources.is_empty() {
        anyhow::bail!("config lists no sources");
    }
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let cfg = parse_config(
            r#"
            mailbox = "Newsletters"

            [[sources]]
            address = "a@example.com"
            label = "A"

            [[sources]]
            address = "b@example.com"
            label = "B"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.imap_server, "imap.gmail.com");
        assert_eq!(cfg.mailbox, "Newsletters");
        assert_eq!(cfg.narration.retry, RetryPolicy::default());
        assert_eq!(
            cfg.sources,
            vec![Source::new("a@example.com", "A"), Source::new("b@example.com", "B")]
        );
    }

    #[test]
    fn narration_table_overrides_retry() {
        let cfg = parse_config(
            r#"
            [narration]
            language = "de"
            max_attempts = 5
            initial_delay_secs = 1
            "#,
        )
        .unwrap();
        assert_eq!(cfg.narration.language, "de");
        assert_eq!(cfg.narration.tld, "com");
        assert_eq!(cfg.narration.retry.max_attempts, 5);
        assert_eq!(cfg.narration.retry.initial_delay_secs, 1);
        assert_eq!(cfg.sources, default_sources());
    }

    #[test]
    fn empty_source_list_is_rejected() {
        assert!(parse_config("sources = []").is_err());
    }

    #[test]
    fn default_sources_keep_configured_order() {
        let s = default_sources();
        assert_eq!(s.len(), 11);
        assert_eq!(s[0].label, "TLDR");
        assert_eq!(s[8].label, "TLDR DevOps");
        assert_eq!(s[10].address, "robotic@substack.com");
    }

    #[test]
    fn missing_file_writes_template_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let first = load_config(Some(&path)).unwrap();
        assert!(path.exists());
        assert_eq!(first, Config::default());
        let second = load_config(Some(&path)).unwrap();
        assert_eq!(second, first);
    }
}
