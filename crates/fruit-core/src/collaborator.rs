//! External collaborators: rendering, haptic/audio feedback and screen control.
//!
//! The core only sees these traits. Implementations are chosen per platform
//! and handed to the game loop in a [`Collaborators`] bundle. Every call is
//! fire-and-forget: failures are logged and never abort a tick.

use tracing::{debug, info, warn};

use crate::error::CollaboratorFailure;
use crate::fruit::TierId;
use crate::merge::MergeOutcome;
use crate::snapshot::Snapshot;

type Outcome = Result<(), CollaboratorFailure>;

/// Receives a snapshot after every tick.
pub trait Renderer: Send {
    fn name(&self) -> &'static str;
    fn present(&mut self, snapshot: &Snapshot) -> Outcome;
}

/// Haptic or audio feedback for game events.
pub trait FeedbackSink: Send {
    fn name(&self) -> &'static str;
    fn on_drop(&mut self, tier: TierId) -> Outcome;
    fn on_merge(&mut self, outcome: &MergeOutcome) -> Outcome;
    fn on_game_over(&mut self, score: u64) -> Outcome;
}

/// Screen orientation / immersive-mode control.
pub trait ScreenService: Send {
    fn name(&self) -> &'static str;
    fn enter_game_mode(&mut self) -> Outcome;
    fn exit_game_mode(&mut self) -> Outcome;
}

/// Host platform, used to pick collaborator implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Mobile,
    Web,
    Headless,
}

impl Platform {
    /// Platform of the current compilation target.
    pub fn detect() -> Self {
        if cfg!(target_arch = "wasm32") {
            Self::Web
        } else if cfg!(any(target_os = "android", target_os = "ios")) {
            Self::Mobile
        } else {
            Self::Headless
        }
    }
}

/// Feedback sink that writes events to the log.
#[derive(Debug, Clone, Copy)]
pub struct TracingFeedback {
    label: &'static str,
}

impl TracingFeedback {
    pub fn new(label: &'static str) -> Self {
        Self { label }
    }
}

impl FeedbackSink for TracingFeedback {
    fn name(&self) -> &'static str {
        self.label
    }

    fn on_drop(&mut self, tier: TierId) -> Outcome {
        debug!(sink = self.label, tier, "feedback: drop");
        Ok(())
    }

    fn on_merge(&mut self, outcome: &MergeOutcome) -> Outcome {
        debug!(
            sink = self.label,
            tier = outcome.consumed_a.tier_id,
            score_delta = outcome.score_delta,
            "feedback: merge"
        );
        Ok(())
    }

    fn on_game_over(&mut self, score: u64) -> Outcome {
        debug!(sink = self.label, score, "feedback: game over");
        Ok(())
    }
}

/// Feedback sink for platforms without the capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedFeedback;

impl FeedbackSink for UnsupportedFeedback {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn on_drop(&mut self, _tier: TierId) -> Outcome {
        Err(CollaboratorFailure::Unsupported)
    }

    fn on_merge(&mut self, _outcome: &MergeOutcome) -> Outcome {
        Err(CollaboratorFailure::Unsupported)
    }

    fn on_game_over(&mut self, _score: u64) -> Outcome {
        Err(CollaboratorFailure::Unsupported)
    }
}

/// Screen service that only logs mode changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingScreen;

impl ScreenService for TracingScreen {
    fn name(&self) -> &'static str {
        "tracing"
    }

    fn enter_game_mode(&mut self) -> Outcome {
        info!("screen: entering game mode");
        Ok(())
    }

    fn exit_game_mode(&mut self) -> Outcome {
        info!("screen: leaving game mode");
        Ok(())
    }
}

/// The set of collaborators a game loop notifies.
#[derive(Default)]
pub struct Collaborators {
    pub renderer: Option<Box<dyn Renderer>>,
    pub haptics: Option<Box<dyn FeedbackSink>>,
    pub audio: Option<Box<dyn FeedbackSink>>,
    pub screen: Option<Box<dyn ScreenService>>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("renderer", &self.renderer.as_ref().map(|r| r.name()))
            .field("haptics", &self.haptics.as_ref().map(|h| h.name()))
            .field("audio", &self.audio.as_ref().map(|a| a.name()))
            .field("screen", &self.screen.as_ref().map(|s| s.name()))
            .finish()
    }
}

impl Collaborators {
    /// No collaborators at all.
    pub fn headless() -> Self {
        Self::default()
    }

    /// Default feedback and screen services for `platform`.
    ///
    /// The renderer is left empty; hosts attach their own with [`Self::with_renderer`].
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Mobile => Self {
                renderer: None,
                haptics: Some(Box::new(TracingFeedback::new("haptics"))),
                audio: Some(Box::new(TracingFeedback::new("audio"))),
                screen: Some(Box::new(TracingScreen)),
            },
            Platform::Web => Self {
                renderer: None,
                haptics: Some(Box::new(UnsupportedFeedback)),
                audio: Some(Box::new(TracingFeedback::new("audio"))),
                screen: None,
            },
            Platform::Headless => Self {
                renderer: None,
                haptics: None,
                audio: Some(Box::new(TracingFeedback::new("audio"))),
                screen: None,
            },
        }
    }

    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Some(Box::new(renderer));
        self
    }

    pub(crate) fn present(&mut self, snapshot: &Snapshot) {
        if let Some(renderer) = self.renderer.as_mut() {
            let name = renderer.name();
            absorb("renderer", name, renderer.present(snapshot));
        }
    }

    pub(crate) fn drop_feedback(&mut self, tier: TierId) {
        for sink in self.feedback_sinks() {
            let name = sink.name();
            absorb("on_drop", name, sink.on_drop(tier));
        }
    }

    pub(crate) fn merge_feedback(&mut self, outcome: &MergeOutcome) {
        for sink in self.feedback_sinks() {
            let name = sink.name();
            absorb("on_merge", name, sink.on_merge(outcome));
        }
    }

    pub(crate) fn game_over_feedback(&mut self, score: u64) {
        for sink in self.feedback_sinks() {
            let name = sink.name();
            absorb("on_game_over", name, sink.on_game_over(score));
        }
    }

    pub(crate) fn enter_game_mode(&mut self) {
        if let Some(screen) = self.screen.as_mut() {
            let name = screen.name();
            absorb("enter_game_mode", name, screen.enter_game_mode());
        }
    }

    pub(crate) fn exit_game_mode(&mut self) {
        if let Some(screen) = self.screen.as_mut() {
            let name = screen.name();
            absorb("exit_game_mode", name, screen.exit_game_mode());
        }
    }

    fn feedback_sinks(&mut self) -> impl Iterator<Item = &mut Box<dyn FeedbackSink>> {
        self.haptics.iter_mut().chain(self.audio.iter_mut())
    }
}

/// Logs a collaborator failure and carries on.
fn absorb(call: &'static str, collaborator: &'static str, outcome: Outcome) {
    match outcome {
        Ok(()) => {}
        // Expected on platforms lacking the capability.
        Err(CollaboratorFailure::Unsupported) => {
            debug!(call, collaborator, "collaborator capability unsupported");
        }
        Err(err) => warn!(call, collaborator, error = %err, "collaborator call failed"),
    }
}
