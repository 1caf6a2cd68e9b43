use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::encoder::{
    decode_base64_image, encode_file, EncodeError, PreviewRef, PreviewRegistry, SelectedFile,
};
use crate::gemini::{GenerationError, ImageGenerator};
use crate::ticker::{TickerHandle, STATUS_MESSAGES, TICK_INTERVAL};
use crate::utils::{download_file_name, now_unix_millis};

pub const GENERATION_FAILED: &str = "Failed to generate image. Please try again.";
pub const READ_FAILED: &str = "Failed to read the selected image. Please try another file.";

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("there is no generated image to save")]
    NothingToDownload,
    #[error("result image is not valid base64: {0}")]
    Decode(#[from] EncodeError),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct UserInput {
    pub file: SelectedFile,
    pub preview: PreviewRef,
    pub base64: String,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationState {
    pub is_generating: bool,
    pub error: Option<String>,
    pub result_image: Option<String>,
    pub status_message: String,
}

impl Default for GenerationState {
    fn default() -> Self {
        Self {
            is_generating: false,
            error: None,
            result_image: None,
            status_message: STATUS_MESSAGES[0].to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    ReadyToGenerate,
    Generating,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Ignored,
    Ready,
    ReadFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudioEvent {
    StatusChanged(&'static str),
    Succeeded,
    Failed,
}

impl StudioEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StudioEvent::StatusChanged(_))
    }
}

struct InFlight {
    id: Uuid,
    task: JoinHandle<Result<String, GenerationError>>,
    ticker: TickerHandle,
}

/// UI state for one session: the current upload, the generation in flight,
/// and its outcome.
pub struct Studio {
    generator: Arc<dyn ImageGenerator>,
    previews: PreviewRegistry,
    input: Option<UserInput>,
    state: GenerationState,
    in_flight: Option<InFlight>,
    tick_period: Duration,
}

impl Studio {
    pub fn new(generator: Arc<dyn ImageGenerator>) -> Self {
        Self {
            generator,
            previews: PreviewRegistry::default(),
            input: None,
            state: GenerationState::default(),
            in_flight: None,
            tick_period: TICK_INTERVAL,
        }
    }

    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    pub fn state(&self) -> &GenerationState {
        &self.state
    }

    pub fn input(&self) -> Option<&UserInput> {
        self.input.as_ref()
    }

    pub fn preview_bytes(&self) -> Option<Arc<[u8]>> {
        self.input.as_ref().and_then(|i| self.previews.get(&i.preview))
    }

    pub fn live_previews(&self) -> usize {
        self.previews.len()
    }

    pub fn phase(&self) -> Phase {
        if self.state.is_generating {
            Phase::Generating
        } else if self.state.error.is_some() {
            // A failed read before any upload leaves us waiting for a file.
            if self.input.is_some() {
                Phase::Failed
            } else {
                Phase::Idle
            }
        } else if self.state.result_image.is_some() {
            Phase::Succeeded
        } else if self.input.is_some() {
            Phase::ReadyToGenerate
        } else {
            Phase::Idle
        }
    }

    pub fn can_generate(&self) -> bool {
        !self.state.is_generating && self.input.as_ref().is_some_and(|i| !i.base64.is_empty())
    }

    /// Non-image files and selections made mid-generation are ignored.
    pub async fn select_file(&mut self, file: SelectedFile) -> Selection {
        if !file.is_image() {
            debug!(name = %file.name, declared = %file.declared_type, "ignoring non-image file");
            return Selection::Ignored;
        }
        if self.state.is_generating {
            debug!(name = %file.name, "upload disabled while generating");
            return Selection::Ignored;
        }

        // A new selection always discards the previous outcome.
        self.state.result_image = None;
        self.state.error = None;

        match encode_file(&file).await {
            Ok(encoded) => {
                if let Some(old) = self.input.take() {
                    self.previews.revoke(&old.preview);
                }
                let preview = self.previews.create(encoded.bytes.clone());
                info!(name = %file.name, size = encoded.bytes.len(), %preview, "image selected");
                self.input = Some(UserInput {
                    size: encoded.bytes.len(),
                    file,
                    preview,
                    base64: encoded.base64,
                });
                Selection::Ready
            }
            Err(e) => {
                error!(error = %e, "failed to read selected image");
                self.state.error = Some(READ_FAILED.to_string());
                Selection::ReadFailed
            }
        }
    }

    /// Returns false without side effects when there is nothing to send or a
    /// request is already in flight.
    pub fn start_generation(&mut self) -> bool {
        if self.state.is_generating {
            warn!("generation already in progress");
            return false;
        }
        let Some(input) = self.input.as_ref().filter(|i| !i.base64.is_empty()) else {
            debug!("no image payload");
            return false;
        };

        let id = Uuid::new_v4();
        let base64 = input.base64.clone();
        let mime_type = input.file.declared_type.clone();
        let generator = Arc::clone(&self.generator);
        let span = info_span!("generation", id = %id, mime = %mime_type);

        let task = tokio::spawn(
            async move { generator.generate(&base64, &mime_type).await }.instrument(span),
        );

        self.state.is_generating = true;
        self.state.error = None;
        self.state.status_message = STATUS_MESSAGES[0].to_string();
        self.in_flight = Some(InFlight {
            id,
            task,
            ticker: TickerHandle::start(self.tick_period),
        });
        info!(%id, "generation started");
        true
    }

    /// Waits for the next status tick or the request outcome and applies it.
    /// Returns `None` when nothing is in flight.
    pub async fn next_event(&mut self) -> Option<StudioEvent> {
        let flight = self.in_flight.as_mut()?;

        let joined = tokio::select! {
            biased;
            joined = &mut flight.task => joined,
            msg = flight.ticker.changed() => {
                self.state.status_message = msg.to_string();
                return Some(StudioEvent::StatusChanged(msg));
            }
        };

        let InFlight { id, ticker, .. } = self.in_flight.take()?;
        ticker.stop();
        self.state.is_generating = false;

        match joined {
            Ok(Ok(url)) => {
                info!(%id, "generation succeeded");
                self.state.result_image = Some(url);
                self.state.error = None;
                Some(StudioEvent::Succeeded)
            }
            Ok(Err(e)) => {
                error!(%id, error = %e, "image generation failed");
                self.state.error = Some(GENERATION_FAILED.to_string());
                Some(StudioEvent::Failed)
            }
            Err(e) => {
                error!(%id, error = %e, "generation task did not complete");
                self.state.error = Some(GENERATION_FAILED.to_string());
                Some(StudioEvent::Failed)
            }
        }
    }

    /// Runs one generation to completion, reporting state after every change.
    pub async fn generate(&mut self, mut on_change: impl FnMut(&GenerationState)) -> bool {
        if !self.start_generation() {
            return false;
        }
        on_change(&self.state);
        while let Some(event) = self.next_event().await {
            on_change(&self.state);
            if event.is_terminal() {
                break;
            }
        }
        true
    }

    /// Saves the result as `everskies-character-<unix-ms>.png` in `dir`.
    pub async fn download(&self, dir: &Path) -> Result<PathBuf, StudioError> {
        if self.phase() != Phase::Succeeded {
            return Err(StudioError::NothingToDownload);
        }
        let url = self
            .state
            .result_image
            .as_deref()
            .ok_or(StudioError::NothingToDownload)?;
        let bytes = decode_base64_image(url)?;

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| StudioError::Write {
                path: dir.to_path_buf(),
                source,
            })?;
        let path = dir.join(download_file_name(now_unix_millis()));
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| StudioError::Write {
                path: path.clone(),
                source,
            })?;
        info!(path = %path.display(), "saved generated image");
        Ok(path)
    }
}

impl Drop for Studio {
    fn drop(&mut self) {
        if let Some(flight) = self.in_flight.take() {
            flight.task.abort();
        }
    }
}
