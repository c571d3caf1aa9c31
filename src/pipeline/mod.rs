//! One digest run: connect, harvest every source, write the text, narrate
//! it, log out. Failures end up in the returned [`RunReport`] rather than
//! propagating, since nothing waits on a run's result besides the log.

use chrono::{Local, NaiveDate};
use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::digest::assemble;
use crate::error::DigestError;
use crate::mail::session::{Connector, MailSession};
use crate::narration::{AudioArtifact, Narrator, Synthesizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Connected,
    Harvesting,
    Assembled,
    Persisted,
    Narrated,
    Closed,
}

#[derive(Debug)]
pub enum RunOutcome {
    Narrated {
        text_path: PathBuf,
        audio: AudioArtifact,
        entries: usize,
    },
    /// Nothing matched today; no files were written.
    EmptyDigest,
    Failed {
        error: DigestError,
        /// Set when the text was written before the failure.
        text_path: Option<PathBuf>,
    },
}

#[derive(Debug)]
pub struct RunReport {
    pub run_date: NaiveDate,
    pub states: Vec<PipelineState>,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn final_state(&self) -> PipelineState {
        self.states.last().copied().unwrap_or(PipelineState::Idle)
    }

    pub fn reached(&self, state: PipelineState) -> bool {
        self.states.contains(&state)
    }
}

/// Text and audio artifact paths for a run date.
pub fn output_paths(dir: &Path, stem: &str, date: NaiveDate) -> (PathBuf, PathBuf) {
    let day = date.format("%Y-%m-%d");
    (
        dir.join(format!("{stem}_{day}.txt")),
        dir.join(format!("{stem}_{day}.mp3")),
    )
}

pub struct PipelineDriver<C: Connector, T: Synthesizer> {
    config: Config,
    connector: C,
    narrator: Narrator<T>,
}

impl<C: Connector, T: Synthesizer> PipelineDriver<C, T> {
    pub fn new(config: Config, connector: C, narrator: Narrator<T>) -> Self {
        Self {
            config,
            connector,
            narrator,
        }
    }

    /// Run for today's local date.
    pub fn run(&self) -> RunReport {
        self.run_on(Local::now().date_naive())
    }

    pub fn run_on(&self, run_date: NaiveDate) -> RunReport {
        let mut states = vec![PipelineState::Idle];

        let mut session = match MailSession::open(&self.connector) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to connect to mail store. Error: {e}");
                return RunReport {
                    run_date,
                    states,
                    outcome: RunOutcome::Failed {
                        error: e,
                        text_path: None,
                    },
                };
            }
        };
        states.push(PipelineState::Connected);

        let outcome = self.publish(&mut session, run_date, &mut states);

        if let Err(e) = session.close() {
            warn!("Logout failed: {e}");
        }
        states.push(PipelineState::Closed);

        RunReport {
            run_date,
            states,
            outcome,
        }
    }

    fn publish(
        &self,
        session: &mut MailSession<C::Store>,
        run_date: NaiveDate,
        states: &mut Vec<PipelineState>,
    ) -> RunOutcome {
        states.push(PipelineState::Harvesting);
        let digest = match assemble(
            session,
            &self.config.mailbox,
            &self.config.sources,
            run_date,
        ) {
            Ok(digest) => digest,
            Err(e) => {
                error!("Harvesting aborted. Error: {e}");
                return RunOutcome::Failed {
                    error: e,
                    text_path: None,
                };
            }
        };
        states.push(PipelineState::Assembled);

        if digest.is_empty() {
            warn!("No content was retrieved. Cannot create audio file.");
            return RunOutcome::EmptyDigest;
        }

        let (text_path, audio_path) =
            output_paths(&self.config.output_dir, &self.config.file_stem, run_date);
        let text = digest.text();

        if let Err(e) = persist(&text_path, &text) {
            error!("Could not write {}: {e}", text_path.display());
            return RunOutcome::Failed {
                error: e,
                text_path: None,
            };
        }
        info!("Digest text saved to {}", text_path.display());
        states.push(PipelineState::Persisted);

        match self.narrator.narrate(&text, &audio_path) {
            Ok(audio) => {
                states.push(PipelineState::Narrated);
                info!(
                    "Process completed. Text saved to {} and audio saved to {}",
                    text_path.display(),
                    audio.path.display()
                );
                RunOutcome::Narrated {
                    text_path,
                    audio,
                    entries: digest.entries().len(),
                }
            }
            Err(e) => {
                error!(
                    "Narration failed; keeping text at {}. Error: {e}",
                    text_path.display()
                );
                RunOutcome::Failed {
                    error: e,
                    text_path: Some(text_path),
                }
            }
        }
    }
}

fn persist(path: &Path, text: &str) -> Result<(), DigestError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)?;
    Ok(())
}
