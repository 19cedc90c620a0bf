//! Command pipeline
//!
//! Converts transcripts and UI affordances into backend calls and
//! state/render effects. Runs as a single task draining an event
//! queue, so every mutation of the state machine and the pending
//! action runs to completion before the next event is processed.

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::backend::{Backend, BackendError};
use crate::config::Config;
use crate::engine::{Channel, RecognitionError, RecognitionEvent, Recognizer, SpeechEngine};
use crate::fuzzy::sanitize_command;
use crate::intent::ActionData;
use crate::render::{Render, Severity, messages};
use crate::sched::{Scheduler, TimerKind};
use crate::state::{InteractionState, StateMachine};
use crate::wake::WakeWordDetector;

/// Everything the pipeline reacts to: recognition callbacks, timers
/// and user affordances (confirm/cancel/selection/example commands).
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Recognition(RecognitionEvent),
    Timer(TimerKind, u64),
    /// Synthetic command, e.g. an example button or a UI affordance
    Command(String),
    Confirm,
    Cancel,
    SelectProduct(i64),
    Shutdown,
}

impl PipelineEvent {
    /// "More info" affordance on a product card.
    pub fn more_info(product_name: &str) -> Self {
        PipelineEvent::Command(format!("más información de {product_name}"))
    }

    /// "List everything" affordance.
    pub fn list_all() -> Self {
        PipelineEvent::Command("listar todos los productos".to_string())
    }
}

pub struct Pipeline<B, E, R>
where
    B: Backend,
    E: SpeechEngine,
    R: Render,
{
    config: Config,
    wake: WakeWordDetector,
    machine: StateMachine,
    backend: B,
    recognizer: Recognizer<E>,
    render: R,
    sched: Scheduler,
    /// Action awaiting confirmation or disambiguation
    pending_action: Option<ActionData>,
    wake_retries: u32,
}

impl<B, E, R> Pipeline<B, E, R>
where
    B: Backend,
    E: SpeechEngine,
    R: Render,
{
    pub fn new(
        config: Config,
        backend: B,
        engine: E,
        render: R,
        tx: UnboundedSender<PipelineEvent>,
    ) -> Self {
        let wake = WakeWordDetector::new(&config.wake_phrases, config.similarity_threshold);
        let recognizer = Recognizer::new(engine, config.language.clone());
        Self {
            config,
            wake,
            machine: StateMachine::new(),
            backend,
            recognizer,
            render,
            sched: Scheduler::new(tx),
            pending_action: None,
            wake_retries: 0,
        }
    }

    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    pub fn pending_action(&self) -> Option<&ActionData> {
        self.pending_action.as_ref()
    }

    /// Drain events until shutdown. Returns the pipeline so callers
    /// can inspect the final state.
    pub async fn run(mut self, mut rx: UnboundedReceiver<PipelineEvent>) -> Self {
        self.begin_wake_listening();

        while let Some(event) = rx.recv().await {
            match event {
                PipelineEvent::Recognition(ev) => self.on_recognition(ev).await,
                PipelineEvent::Timer(kind, seq) => {
                    if self.sched.claim(kind, seq) {
                        self.on_timer(kind);
                    } else {
                        debug!(?kind, seq, "stale timer discarded");
                    }
                }
                PipelineEvent::Command(text) => self.process_command(&text).await,
                PipelineEvent::Confirm => self.confirm().await,
                PipelineEvent::Cancel => self.cancel(),
                PipelineEvent::SelectProduct(id) => self.select_product(id),
                PipelineEvent::Shutdown => {
                    self.sched.cancel_all();
                    self.recognizer.abort();
                    break;
                }
            }
        }
        self
    }

    // ------------------------------------------------------------------
    // Recognition events
    // ------------------------------------------------------------------

    async fn on_recognition(&mut self, event: RecognitionEvent) {
        match event {
            RecognitionEvent::SessionStart(Channel::Wake) => {
                debug!("wake listener session started");
            }
            RecognitionEvent::SessionStart(Channel::Command) => {
                let _ = self.machine.transition(InteractionState::Listening);
                self.render.listening(true);
                let (title, detail) = messages::LISTENING;
                self.render.status(title, detail, Severity::Info);
            }
            RecognitionEvent::Transcript(Channel::Wake, text) => {
                if self.wake.detect(&text) {
                    info!(transcript = %text, "wake phrase detected");
                    self.wake_up();
                }
            }
            RecognitionEvent::Transcript(Channel::Command, text) => {
                self.process_command(&text).await;
            }
            RecognitionEvent::Error(channel, error) => self.on_recognition_error(channel, error),
            RecognitionEvent::SessionEnd(channel) => {
                self.recognizer.session_ended(channel);
                if channel == Channel::Command {
                    self.render.listening(false);
                    // the end callback is authoritative: a capture that
                    // ended without a transcript drops back to awake
                    if self.machine.current() == InteractionState::Listening {
                        let _ = self.machine.transition(InteractionState::Awake);
                    }
                }
            }
        }
    }

    fn on_recognition_error(&mut self, channel: Channel, error: RecognitionError) {
        // the passive channel hits no-speech constantly; not user-visible
        if channel == Channel::Wake {
            if error == RecognitionError::NoSpeech {
                debug!("wake listener: no speech");
            } else {
                warn!(?error, "wake listener error");
            }
            return;
        }

        let (title, detail) = error.user_message();
        warn!(?error, "recognition error");
        let _ = self.machine.transition(InteractionState::Error);
        self.render.listening(false);
        self.render.status(title, detail, Severity::Error);
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    fn on_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::WakeActivation => self.start_listening(),
            TimerKind::ResumeWakeListening | TimerKind::RetryBackoff => {
                self.begin_wake_listening()
            }
            TimerKind::ResultDisplay | TimerKind::PostExecute => {
                if self.machine.is_awake() {
                    self.sleep();
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Wake / sleep flows
    // ------------------------------------------------------------------

    /// Activate the assistant; no-op when already awake.
    fn wake_up(&mut self) {
        if self.machine.is_awake() {
            return;
        }
        // a stale return-to-idle must not fire into the new session
        self.sched.cancel(TimerKind::ResultDisplay);
        self.sched.cancel(TimerKind::PostExecute);

        let _ = self.machine.transition(InteractionState::Awake);
        self.recognizer.stop(Channel::Wake);

        let (title, detail) = messages::AWAKE;
        self.render.status(title, detail, Severity::Success);
        self.sched
            .schedule(TimerKind::WakeActivation, self.config.wake_timeout());
    }

    /// Go idle and resume wake listening after the backoff delay.
    fn sleep(&mut self) {
        let _ = self.machine.transition(InteractionState::Idle);
        self.sched
            .schedule(TimerKind::ResumeWakeListening, self.config.retry_delay());
    }

    /// Request one command capture from the engine.
    fn start_listening(&mut self) {
        if !self.machine.is_awake() {
            return;
        }
        if let Err(error) = self.recognizer.start(Channel::Command) {
            warn!(%error, "could not start command capture");
            self.render.status(
                "Error al iniciar",
                "No se pudo iniciar la grabación",
                Severity::Error,
            );
        }
    }

    /// Start the passive wake channel, with bounded retries when the
    /// previous session has not fully torn down yet.
    fn begin_wake_listening(&mut self) {
        if self.machine.is_awake() {
            return;
        }
        match self.recognizer.start(Channel::Wake) {
            Ok(()) => {
                self.wake_retries = 0;
                let _ = self.machine.transition(InteractionState::ListeningWake);
                let (title, detail) = messages::IDLE;
                self.render.status(title, detail, Severity::Info);
            }
            Err(error) => {
                warn!(%error, retries = self.wake_retries, "wake listener start failed");
                if self.wake_retries < self.config.max_retries {
                    self.wake_retries += 1;
                    self.sched
                        .schedule(TimerKind::RetryBackoff, self.config.retry_delay());
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Command lifecycle
    // ------------------------------------------------------------------

    async fn process_command(&mut self, raw: &str) {
        let sanitized = sanitize_command(raw, self.config.max_command_length);
        if sanitized.is_empty() {
            self.render.status(
                "Comando vacío",
                "No se detectó comando válido",
                Severity::Warning,
            );
            return;
        }

        // the user may speak the wake phrase and the command in
        // sequence; the wake phrase alone activates without being sent
        // to the backend as a command
        if self.wake.detect(&sanitized) && !self.machine.is_awake() {
            self.wake_up();
            return;
        }

        // a command supersedes any pending return-to-idle
        self.sched.cancel(TimerKind::ResultDisplay);
        self.sched.cancel(TimerKind::PostExecute);

        self.render.command(&sanitized);
        let _ = self.machine.transition(InteractionState::Processing);
        let (title, detail) = messages::PROCESSING;
        self.render.status(title, detail, Severity::Warning);

        match self.backend.process(&sanitized).await {
            Ok(data) => self.handle_response(data).await,
            Err(BackendError::Server(message)) => {
                warn!(%message, "backend reported an error");
                self.render
                    .status("Error del servidor", &message, Severity::Error);
                self.render.connection(false);
                let _ = self.machine.transition(InteractionState::Error);
            }
            Err(BackendError::Transport(message)) => {
                warn!(%message, "backend unreachable");
                self.render.status(
                    "Error de conexión",
                    "No se pudo contactar al servidor",
                    Severity::Error,
                );
                self.render.connection(false);
                let _ = self.machine.transition(InteractionState::Error);
            }
        }
    }

    async fn handle_response(&mut self, data: ActionData) {
        if data.auto_executable() {
            info!("executing movement automatically");
            self.execute(data).await;
            self.render.connection(true);
            let _ = self.machine.transition(InteractionState::Awake);
            return;
        }

        let needs_clarification = data.necesita_clarificacion;
        let movement = data.intencion.is_movement();

        if movement && data.puede_ejecutar {
            self.show_confirmation(data);
        } else {
            self.render.result(&data);
            self.show_candidates(data);
            if self.machine.is_awake() {
                self.sched
                    .schedule(TimerKind::ResultDisplay, self.config.result_display());
            }
        }

        self.render.connection(true);
        let _ = self.machine.transition(InteractionState::Awake);

        if needs_clarification {
            self.render.status(
                "Información incompleta",
                "El comando requiere más detalles",
                Severity::Warning,
            );
        } else if !movement {
            self.render.status(
                "Comando procesado",
                "Solicitud completada exitosamente",
                Severity::Success,
            );
        }
    }

    /// Render the candidate list; a clarification over candidates is
    /// stashed so a later selection can resolve it.
    fn show_candidates(&mut self, data: ActionData) {
        if data.productos_encontrados.is_empty() {
            return;
        }
        self.render.candidates(&data.productos_encontrados, &data);

        let awaiting_selection = data.necesita_clarificacion
            && data.campos_faltantes.iter().any(|f| f == "producto_especifico");
        if awaiting_selection {
            self.pending_action = Some(data);
        }
    }

    fn show_confirmation(&mut self, data: ActionData) {
        self.render.confirmation(&data);
        self.pending_action = Some(data);
    }

    async fn execute(&mut self, data: ActionData) {
        self.render.status(
            "Ejecutando movimiento...",
            "Registrando en el sistema",
            Severity::Warning,
        );

        match self.backend.execute(&data).await {
            Ok(outcome) => {
                self.render.status("Éxito", &outcome.message, Severity::Success);
                self.pending_action = None;
                if self.machine.is_awake() {
                    self.sched
                        .schedule(TimerKind::PostExecute, self.config.retry_delay());
                }
            }
            Err(BackendError::Server(message)) => {
                // reported, but an execute failure does not interrupt an
                // otherwise-awake session
                warn!(%message, "execute rejected by the server");
                self.render.status("Error", &message, Severity::Error);
            }
            Err(BackendError::Transport(message)) => {
                warn!(%message, "execute request failed");
                self.render.status(
                    "Error de conexión",
                    "No se pudo ejecutar el movimiento",
                    Severity::Error,
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // User affordances
    // ------------------------------------------------------------------

    async fn confirm(&mut self) {
        match self.pending_action.clone() {
            Some(data) => self.execute(data).await,
            None => warn!("confirm with no pending action"),
        }
    }

    fn cancel(&mut self) {
        self.pending_action = None;
        self.render.clear();
        if self.machine.is_awake() {
            self.sleep();
        } else {
            let (title, detail) = messages::IDLE;
            self.render.status(title, detail, Severity::Info);
        }
    }

    /// Resolve a disambiguation by candidate id. An unknown id is a
    /// logged no-op.
    fn select_product(&mut self, id: i64) {
        let Some(mut action) = self.pending_action.take() else {
            warn!(id, "product selected with no pending action");
            return;
        };

        match action
            .productos_encontrados
            .iter()
            .find(|p| p.id_articulo == id)
            .cloned()
        {
            Some(product) => {
                info!(id, nombre = %product.nombre, "product selected");
                action.select_product(product);
                self.show_confirmation(action);
            }
            None => {
                warn!(id, "selected product not in candidate list");
                self.pending_action = Some(action);
            }
        }
    }
}
