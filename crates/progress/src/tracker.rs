//! Progress tracking service.
//!
//! [`LabProgress`] owns one session: the step registry, the analytics log
//! and the session metadata. Every mutation records an event, saves when
//! auto-save is on and re-renders the display surface.

use async_trait::async_trait;
use chrono::Duration;
use labtrack_core::{
    clamp_progress, time, Checkpoint, CompletionError, CompletionTarget, DisplaySurface, Event,
    EventKind, NullDisplay, ProgressView, SessionId, StepMetadata, StepRegistry, StepState,
    StepView, StudentId, Time,
};
use labtrack_storage::{
    resolve_progress_file, JsonProgressStore, ProgressDocument, ProgressStore,
};
use labtrack_tools::{ShellTool, Tool};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::config::TrackerConfig;
use crate::error::Result;

/// Progress tracker for one lab session.
pub struct LabProgress {
    pub(crate) lab_name: String,
    pub(crate) steps: StepRegistry,
    pub(crate) step_metadata: BTreeMap<String, StepMetadata>,
    pub(crate) analytics: Vec<Event>,
    pub(crate) step_start_times: BTreeMap<String, Time>,
    pub(crate) session_id: SessionId,
    pub(crate) previous_session_id: Option<SessionId>,
    pub(crate) student_id: StudentId,
    pub(crate) start_time: Time,
    pub(crate) overall_score: Option<f64>,
    pub(crate) resumed: bool,
    pub(crate) persist: bool,
    pub(crate) auto_save: bool,
    pub(crate) store: Box<dyn ProgressStore>,
    pub(crate) display: Arc<dyn DisplaySurface>,
    pub(crate) tool: Arc<dyn Tool>,
}

impl std::fmt::Debug for LabProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabProgress")
            .field("lab_name", &self.lab_name)
            .field("steps", &self.steps)
            .field("session_id", &self.session_id)
            .field("student_id", &self.student_id)
            .field("persist", &self.persist)
            .field("location", &self.store.location())
            .finish_non_exhaustive()
    }
}

/// Builder for [`LabProgress`].
pub struct LabProgressBuilder {
    config: TrackerConfig,
    steps: StepRegistry,
    step_metadata: BTreeMap<String, StepMetadata>,
    display: Arc<dyn DisplaySurface>,
    tool: Arc<dyn Tool>,
    store: Option<Box<dyn ProgressStore>>,
}

impl Default for LabProgressBuilder {
    fn default() -> Self {
        Self {
            config: TrackerConfig::default(),
            steps: StepRegistry::new(),
            step_metadata: BTreeMap::new(),
            display: Arc::new(NullDisplay),
            tool: Arc::new(ShellTool),
            store: None,
        }
    }
}

impl LabProgressBuilder {
    /// Set the whole config.
    pub fn config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the lab name.
    pub fn lab_name(mut self, name: impl Into<String>) -> Self {
        self.config.lab_name = name.into();
        self
    }

    /// Turn persistence on or off.
    pub fn persist(mut self, persist: bool) -> Self {
        self.config.persist = persist;
        self
    }

    /// Set the progress file.
    pub fn persist_file(mut self, path: impl AsRef<Path>) -> Self {
        self.config.persist_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Turn auto-save on or off.
    pub fn auto_save(mut self, auto_save: bool) -> Self {
        self.config.auto_save = auto_save;
        self
    }

    /// Fresh steps by name, in display order.
    pub fn steps<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps = StepRegistry::from_names(names);
        self
    }

    /// Pre-populated step records, in display order.
    pub fn step_states<I>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = (String, StepState)>,
    {
        let now = time::now();
        self.steps = StepRegistry::from_states(states.into_iter().map(|(name, mut state)| {
            state.normalize(now);
            (name, state)
        }));
        self
    }

    /// Guidance per step.
    pub fn step_metadata(mut self, metadata: BTreeMap<String, StepMetadata>) -> Self {
        self.step_metadata = metadata;
        self
    }

    /// Where progress is rendered.
    pub fn display(mut self, display: Arc<dyn DisplaySurface>) -> Self {
        self.display = display;
        self
    }

    /// What runs shell steps.
    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tool = tool;
        self
    }

    /// Use a custom store instead of the JSON file.
    pub fn store(mut self, store: Box<dyn ProgressStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Create the tracker.
    ///
    /// With persistence on, an existing progress file is loaded; a file that
    /// cannot be read is reported and the tracker starts fresh. Without an
    /// existing file, the initial state is saved when auto-save is on.
    pub async fn open(self) -> Result<LabProgress> {
        let store = match self.store {
            Some(store) => store,
            None => Box::new(JsonProgressStore::new(self.config.effective_persist_file())),
        };
        let mut tracker = LabProgress::from_parts(
            self.config,
            self.steps,
            self.step_metadata,
            store,
            self.display,
            self.tool,
        );

        if tracker.persist {
            if tracker.store.exists().await {
                match tracker.store.load().await {
                    Ok(document) => tracker.apply_document(document),
                    Err(e) => {
                        tracing::warn!(
                            "Could not load saved progress from {}: {}",
                            tracker.store.location().display(),
                            e
                        );
                        tracker
                            .display
                            .show_warning(&format!("Could not load saved progress: {e}"));
                    }
                }
            } else if tracker.auto_save {
                tracker.save().await?;
            }
        }

        tracker.render();
        Ok(tracker)
    }

    /// Resume a saved session, resolving the file relative to the current directory.
    pub async fn resume(
        self,
        lab_name: Option<&str>,
        persist_file: Option<&Path>,
    ) -> Result<LabProgress> {
        let cwd = std::env::current_dir()?;
        self.resume_in(&cwd, lab_name, persist_file).await
    }

    /// Resume a saved session, resolving the file relative to `dir`.
    ///
    /// An explicit file wins, then the lab name's default file, then the
    /// first hidden progress file found in `dir`.
    pub async fn resume_in(
        self,
        dir: &Path,
        lab_name: Option<&str>,
        persist_file: Option<&Path>,
    ) -> Result<LabProgress> {
        let path = resolve_progress_file(lab_name, persist_file, dir)?;
        let store = JsonProgressStore::new(&path);
        let document = store.load().await?;

        let config = TrackerConfig {
            lab_name: document.lab_name.clone(),
            persist: true,
            persist_file: Some(path.clone()),
            auto_save: self.config.auto_save,
        };
        let mut tracker = LabProgress::from_parts(
            config,
            StepRegistry::new(),
            BTreeMap::new(),
            Box::new(store),
            self.display,
            self.tool,
        );
        tracker.apply_document(document);

        let remaining = tracker.incomplete_steps().len();
        tracing::info!(
            "Resumed {} from {} ({} steps remaining)",
            tracker.lab_name,
            path.display(),
            remaining
        );
        tracker.display.show_info(
            "Session Resumed",
            &format!(
                "Lab: {}\nProgress: {:.1}% complete\n{} steps remaining",
                tracker.lab_name,
                tracker.completion_rate(),
                remaining
            ),
        );
        tracker.render();
        Ok(tracker)
    }
}

impl LabProgress {
    /// Start building a tracker.
    pub fn builder() -> LabProgressBuilder {
        LabProgressBuilder::default()
    }

    /// In-memory tracker with fresh steps and no display.
    pub fn new<I, S>(steps: I, lab_name: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let config = TrackerConfig::new(lab_name);
        let store = Box::new(JsonProgressStore::new(config.effective_persist_file()));
        Self::from_parts(
            config,
            StepRegistry::from_names(steps),
            BTreeMap::new(),
            store,
            Arc::new(NullDisplay),
            Arc::new(ShellTool),
        )
    }

    fn from_parts(
        config: TrackerConfig,
        steps: StepRegistry,
        step_metadata: BTreeMap<String, StepMetadata>,
        store: Box<dyn ProgressStore>,
        display: Arc<dyn DisplaySurface>,
        tool: Arc<dyn Tool>,
    ) -> Self {
        Self {
            lab_name: config.lab_name,
            steps,
            step_metadata,
            analytics: Vec::new(),
            step_start_times: BTreeMap::new(),
            session_id: SessionId::new(),
            previous_session_id: None,
            student_id: StudentId::new(),
            start_time: time::now(),
            overall_score: None,
            resumed: false,
            persist: config.persist,
            auto_save: config.auto_save,
            store,
            display,
            tool,
        }
    }

    /// Take over a loaded snapshot. Steps configured here but missing from
    /// the file are kept after the loaded ones.
    fn apply_document(&mut self, document: ProgressDocument) {
        let configured = std::mem::take(&mut self.steps);
        self.steps = document.steps;
        for (name, state) in configured.iter() {
            if !self.steps.contains(name) {
                self.steps.insert(name.to_string(), state.clone());
            }
        }

        self.lab_name = document.lab_name;
        self.start_time = document.start_time;
        self.previous_session_id = document.session_id;
        if let Some(student_id) = document.student_id {
            self.student_id = student_id;
        }
        self.step_metadata.extend(document.step_metadata);
        self.analytics = document.analytics_data;
        self.step_start_times = document.step_start_times;
        self.overall_score = document.overall_score;
        self.resumed = true;
    }

    /// Snapshot of the session as persisted.
    pub fn to_document(&self) -> ProgressDocument {
        ProgressDocument {
            lab_name: self.lab_name.clone(),
            steps: self.steps.clone(),
            start_time: self.start_time,
            session_id: Some(self.session_id.clone()),
            student_id: Some(self.student_id.clone()),
            last_saved: Some(time::now()),
            step_metadata: self.step_metadata.clone(),
            analytics_data: self.analytics.clone(),
            step_start_times: self.step_start_times.clone(),
            overall_score: self.overall_score,
        }
    }

    /// Write the session to the store.
    pub async fn save(&self) -> Result<()> {
        self.store.save(&self.to_document()).await?;
        Ok(())
    }

    pub(crate) async fn autosave(&self) -> Result<()> {
        if self.persist && self.auto_save {
            self.save().await?;
        }
        Ok(())
    }

    pub(crate) fn render(&self) {
        self.display.show_progress(&self.progress_view(), false);
    }

    /// Replace the display surface.
    pub fn set_display(&mut self, display: Arc<dyn DisplaySurface>) {
        self.display = display;
    }

    /// Re-render the progress panel.
    pub fn display_progress(&self, detailed: bool) {
        self.display.show_progress(&self.progress_view(), detailed);
    }

    fn known_step(&self, step: &str) -> bool {
        if self.steps.contains(step) {
            return true;
        }
        tracing::warn!("Unknown step: {}", step);
        self.display.show_warning(&format!("Unknown step: {step}"));
        false
    }

    pub(crate) fn record_event(&mut self, step: Option<&str>, kind: EventKind) {
        self.analytics.push(Event {
            timestamp: time::now(),
            session_id: self.session_id.clone(),
            student_id: self.student_id.clone(),
            lab_name: self.lab_name.clone(),
            step_name: step.map(str::to_string),
            kind,
        });
    }

    // === Mutations ===

    /// Mark a step completed. Unknown steps are a warned no-op.
    pub async fn mark_done(&mut self, step: &str, score: Option<f64>, notes: &str) -> Result<()> {
        if !self.known_step(step) {
            return Ok(());
        }
        let now = time::now();
        let time_spent = self
            .step_start_times
            .get(step)
            .map(|start| time::seconds_between(start, &now));

        if let Some(state) = self.steps.get_mut(step) {
            state.complete(now, score, notes);
        }
        tracing::debug!("Step completed: {} (score {:?})", step, score);

        self.record_event(
            Some(step),
            EventKind::StepCompleted {
                score,
                time_spent,
                notes: notes.to_string(),
            },
        );
        self.autosave().await?;
        self.render();
        Ok(())
    }

    /// Record partial progress on a step.
    ///
    /// The stored progress and the checkpoint's progress are clamped to
    /// [0, 1]; the event keeps the value as reported when it is finite and
    /// the clamped value otherwise, since JSON has no infinity or NaN. The
    /// step's start time is set the first time a positive value is reported.
    pub async fn mark_partial(
        &mut self,
        step: &str,
        progress: f64,
        notes: &str,
        checkpoint_name: Option<&str>,
    ) -> Result<()> {
        if !self.known_step(step) {
            return Ok(());
        }
        let now = time::now();
        if progress > 0.0 && !self.step_start_times.contains_key(step) {
            self.step_start_times.insert(step.to_string(), now);
        }

        if let Some(state) = self.steps.get_mut(step) {
            state.set_partial(progress);
            if !notes.is_empty() {
                state.notes = notes.to_string();
            }
            if let Some(name) = checkpoint_name {
                state.push_checkpoint(Checkpoint {
                    name: name.to_string(),
                    progress: clamp_progress(progress),
                    timestamp: now,
                });
            }
        }
        tracing::debug!("Partial progress on {}: {}", step, progress);

        self.record_event(
            Some(step),
            EventKind::PartialProgress {
                progress: if progress.is_finite() {
                    progress
                } else {
                    clamp_progress(progress)
                },
                checkpoint_name: checkpoint_name.map(str::to_string),
                notes: notes.to_string(),
            },
        );
        self.autosave().await?;
        self.render();
        Ok(())
    }

    /// Count one more attempt on a step. Does not re-render.
    pub async fn increment_attempts(&mut self, step: &str) -> Result<()> {
        if !self.known_step(step) {
            return Ok(());
        }
        if let Some(state) = self.steps.get_mut(step) {
            state.attempts += 1;
        }
        self.record_event(Some(step), EventKind::Attempt);
        self.autosave().await
    }

    /// Reset one step to its zero state, including its start time.
    pub async fn reset_step(&mut self, step: &str) -> Result<()> {
        if !self.known_step(step) {
            return Ok(());
        }
        if let Some(state) = self.steps.get_mut(step) {
            state.reset();
        }
        self.step_start_times.remove(step);
        tracing::debug!("Reset step {}", step);
        self.autosave().await?;
        self.render();
        Ok(())
    }

    /// Reset every step.
    pub async fn reset_all(&mut self) -> Result<()> {
        for (_, state) in self.steps.iter_mut() {
            state.reset();
        }
        self.step_start_times.clear();
        tracing::debug!("Reset all steps of {}", self.lab_name);
        self.autosave().await?;
        self.render();
        Ok(())
    }

    /// Set or replace a step's guidance. Unknown steps are a warned no-op.
    pub async fn set_step_metadata(&mut self, step: &str, metadata: StepMetadata) -> Result<()> {
        if !self.known_step(step) {
            return Ok(());
        }
        self.step_metadata.insert(step.to_string(), metadata);
        self.autosave().await
    }

    /// Record the auto-grading result for the lab.
    pub async fn set_overall_score(&mut self, score: f64) -> Result<()> {
        self.overall_score = Some(score);
        tracing::info!("Overall score for {}: {:.1}", self.lab_name, score);
        self.autosave().await
    }

    // === Queries ===

    /// Percentage of completed steps in [0, 100].
    pub fn completion_rate(&self) -> f64 {
        self.steps.completion_rate()
    }

    /// Mean score over completed, scored steps.
    pub fn average_score(&self) -> Option<f64> {
        self.steps.average_score()
    }

    /// Incomplete step names in order.
    pub fn incomplete_steps(&self) -> Vec<String> {
        self.steps.incomplete_steps()
    }

    /// First incomplete step.
    pub fn current_step(&self) -> Option<&str> {
        self.steps.current_step()
    }

    /// The step registry.
    pub fn steps(&self) -> &StepRegistry {
        &self.steps
    }

    /// One step's state.
    pub fn step(&self, name: &str) -> Option<&StepState> {
        self.steps.get(name)
    }

    /// Guidance for a step.
    pub fn metadata(&self, step: &str) -> Option<&StepMetadata> {
        self.step_metadata.get(step)
    }

    /// Lab name.
    pub fn lab_name(&self) -> &str {
        &self.lab_name
    }

    /// Current session id.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Session id found in the loaded file.
    pub fn previous_session_id(&self) -> Option<&SessionId> {
        self.previous_session_id.as_ref()
    }

    /// Student id.
    pub fn student_id(&self) -> &StudentId {
        &self.student_id
    }

    /// When the session started.
    pub fn start_time(&self) -> Time {
        self.start_time
    }

    /// Whether state was loaded from disk.
    pub fn is_resumed(&self) -> bool {
        self.resumed
    }

    /// Auto-grading result, if recorded.
    pub fn overall_score(&self) -> Option<f64> {
        self.overall_score
    }

    /// Analytics log, oldest first.
    pub fn analytics(&self) -> &[Event] {
        &self.analytics
    }

    /// When a step was first started.
    pub fn step_start_time(&self, step: &str) -> Option<Time> {
        self.step_start_times.get(step).copied()
    }

    /// Where progress is saved.
    pub fn persist_file(&self) -> &Path {
        self.store.location()
    }

    /// Derived view for the display surface.
    pub fn progress_view(&self) -> ProgressView {
        let elapsed = time::now() - self.start_time;
        ProgressView {
            lab_name: self.lab_name.clone(),
            completion_rate: self.completion_rate(),
            average_score: self.average_score(),
            steps: self
                .steps
                .iter()
                .map(|(name, state)| StepView {
                    name: name.to_string(),
                    status: state.status(),
                    timestamp: state.timestamp,
                    attempts: state.attempts,
                    score: state.score,
                    notes: state.notes.clone(),
                })
                .collect(),
            completed: self.steps.completed_count(),
            total: self.steps.len(),
            elapsed: elapsed.max(Duration::zero()),
            resumed: self.resumed,
        }
    }
}

#[async_trait]
impl CompletionTarget for LabProgress {
    async fn complete_step(
        &mut self,
        step: &str,
        score: Option<f64>,
        notes: &str,
    ) -> std::result::Result<(), CompletionError> {
        self.mark_done(step, score, notes)
            .await
            .map_err(|e| CompletionError(e.to_string()))
    }

    async fn record_overall_score(&mut self, score: f64) -> std::result::Result<(), CompletionError> {
        self.set_overall_score(score)
            .await
            .map_err(|e| CompletionError(e.to_string()))
    }
}
