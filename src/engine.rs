//! Speech recognition boundary
//!
//! The external engine runs two structurally independent recognition
//! channels: a continuous wake-phrase listener and a one-shot command
//! listener. At most one may be active at any time or the engine
//! rejects the start with a "session already active" failure. The
//! [`Recognizer`] arbiter enforces that invariant: starting one channel
//! requests a stop of the other first, a stop with nothing active is a
//! no-op, and the session-end event is the authoritative teardown
//! signal.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::pipeline::PipelineEvent;

/// Which recognition channel an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Continuous passive listener for the wake phrase
    Wake,
    /// One-shot capture of a spoken command
    Command,
}

impl Channel {
    /// Session options passed to the engine for this channel.
    pub fn session_config(self, language: &str) -> SessionConfig {
        SessionConfig {
            continuous: self == Channel::Wake,
            language: language.to_string(),
            max_alternatives: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub continuous: bool,
    pub language: String,
    pub max_alternatives: u32,
}

/// Recognition failure codes as the engine reports them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    NotAllowed,
    NoSpeech,
    AudioCapture,
    Network,
    Other(String),
}

impl RecognitionError {
    pub fn from_code(code: &str) -> Self {
        match code {
            "not-allowed" => RecognitionError::NotAllowed,
            "no-speech" => RecognitionError::NoSpeech,
            "audio-capture" => RecognitionError::AudioCapture,
            "network" => RecognitionError::Network,
            other => RecognitionError::Other(other.to_string()),
        }
    }

    /// User-facing title/detail pair for this failure.
    pub fn user_message(&self) -> (&str, &str) {
        match self {
            RecognitionError::NotAllowed => {
                ("Permiso denegado", "El acceso al micrófono está bloqueado")
            }
            RecognitionError::NoSpeech => {
                ("No se detectó voz", "Asegúrate de hablar claramente")
            }
            RecognitionError::AudioCapture => {
                ("Error de audio", "No se pudo acceder al micrófono")
            }
            RecognitionError::Network => ("Error de red", "Problema de conectividad"),
            RecognitionError::Other(_) => ("Error desconocido", "Intenta nuevamente"),
        }
    }
}

/// Events the engine delivers back to the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    SessionStart(Channel),
    Transcript(Channel, String),
    Error(Channel, RecognitionError),
    SessionEnd(Channel),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The previous session has not fully torn down yet
    #[error("a recognition session is already active")]
    SessionActive,
    #[error("recognition engine unavailable: {0}")]
    Unavailable(String),
}

pub trait SpeechEngine: Send {
    /// Request a capture session on `channel` with the given options.
    fn start(&mut self, channel: Channel, session: &SessionConfig) -> Result<(), EngineError>;
    /// Request a stop; the session-end event confirms the teardown.
    fn stop(&mut self, channel: Channel);
    /// Tear down everything immediately.
    fn abort(&mut self);
}

/// Arbiter keeping at most one channel active.
pub struct Recognizer<E: SpeechEngine> {
    engine: E,
    language: String,
    active: Option<Channel>,
}

impl<E: SpeechEngine> Recognizer<E> {
    pub fn new(engine: E, language: String) -> Self {
        Self {
            engine,
            language,
            active: None,
        }
    }

    pub fn active(&self) -> Option<Channel> {
        self.active
    }

    /// Start `channel`, stopping the other channel first if needed.
    /// Starting the already-active channel is a no-op.
    pub fn start(&mut self, channel: Channel) -> Result<(), EngineError> {
        if self.active == Some(channel) {
            return Ok(());
        }
        if let Some(other) = self.active {
            debug!(?other, ?channel, "stopping channel before switch");
            self.engine.stop(other);
        }
        let session = channel.session_config(&self.language);
        self.engine.start(channel, &session)?;
        self.active = Some(channel);
        Ok(())
    }

    /// Advisory stop; safe no-op when the channel is not active.
    pub fn stop(&mut self, channel: Channel) {
        if self.active == Some(channel) {
            self.engine.stop(channel);
        }
    }

    /// Record the authoritative end-of-session signal.
    pub fn session_ended(&mut self, channel: Channel) {
        if self.active == Some(channel) {
            self.active = None;
        }
    }

    pub fn abort(&mut self) {
        self.engine.abort();
        self.active = None;
    }
}

/// Engine driven from the terminal: sessions exist only as a shared
/// active-channel marker that the stdin loop consults to attribute
/// typed lines to the right channel.
pub struct ConsoleEngine {
    tx: UnboundedSender<PipelineEvent>,
    active: Arc<Mutex<Option<Channel>>>,
}

impl ConsoleEngine {
    pub fn new(tx: UnboundedSender<PipelineEvent>) -> (Self, Arc<Mutex<Option<Channel>>>) {
        let active = Arc::new(Mutex::new(None));
        (
            Self {
                tx,
                active: Arc::clone(&active),
            },
            active,
        )
    }

    fn send(&self, event: RecognitionEvent) {
        let _ = self.tx.send(PipelineEvent::Recognition(event));
    }
}

impl SpeechEngine for ConsoleEngine {
    fn start(&mut self, channel: Channel, session: &SessionConfig) -> Result<(), EngineError> {
        let mut active = self.active.lock().unwrap();
        if active.is_some() {
            return Err(EngineError::SessionActive);
        }
        debug!(
            ?channel,
            continuous = session.continuous,
            language = %session.language,
            "console session opened"
        );
        *active = Some(channel);
        self.send(RecognitionEvent::SessionStart(channel));
        Ok(())
    }

    fn stop(&mut self, channel: Channel) {
        let mut active = self.active.lock().unwrap();
        if *active == Some(channel) {
            *active = None;
            self.send(RecognitionEvent::SessionEnd(channel));
        }
    }

    fn abort(&mut self) {
        let mut active = self.active.lock().unwrap();
        if let Some(channel) = active.take() {
            self.send(RecognitionEvent::SessionEnd(channel));
        }
    }
}
