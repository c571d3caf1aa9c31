pub mod google_tts;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::DigestError;

/// One opaque text-to-speech call that writes audio to `dest`.
pub trait Synthesizer {
    fn synthesize(&self, text: &str, dest: &Path) -> Result<(), DigestError>;
}

/// Attempt budget and exponential backoff for synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait after the first failure; doubles after each further failure
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_delay_secs() -> u64 {
    5
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_secs: default_initial_delay_secs(),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (1-indexed).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_secs(self.initial_delay_secs.saturating_mul(factor))
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// The narration written for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    pub path: PathBuf,
    pub attempts: u32,
}

pub struct Narrator<T: Synthesizer> {
    synth: T,
    policy: RetryPolicy,
    sleep: Box<dyn Fn(Duration)>,
}

impl<T: Synthesizer> Narrator<T> {
    pub fn new(synth: T, policy: RetryPolicy) -> Self {
        Self {
            synth,
            policy,
            sleep: Box::new(std::thread::sleep),
        }
    }

    /// Replace the blocking sleep between attempts.
    pub fn with_sleeper(mut self, sleep: impl Fn(Duration) + 'static) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    pub fn narrate(&self, text: &str, dest: &Path) -> Result<AudioArtifact, DigestError> {
        let mut attempt = 1;
        loop {
            match self.synth.synthesize(text, dest) {
                Ok(()) => {
                    info!("Successfully saved audio to {}", dest.display());
                    return Ok(AudioArtifact {
                        path: dest.to_path_buf(),
                        attempts: attempt,
                    });
                }
                Err(e) => {
                    warn!("Attempt {attempt} failed. Error: {e}");
                    if !self.policy.should_retry(attempt) {
                        error!("Max retries reached. Could not create audio file.");
                        return Err(e);
                    }
                    let delay = self.policy.delay_after(attempt);
                    info!("Retrying in {} seconds...", delay.as_secs());
                    (self.sleep)(delay);
                    attempt += 1;
                }
            }
        }
    }
}
