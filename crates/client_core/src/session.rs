use std::{
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc, Weak,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use shared::{
    domain::ExamNumber,
    error::ErrorKind,
    protocol::{Acknowledged, FinishExamRequest, StartExamRequest, StartExamResponse},
};
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    request::Endpoint,
    timer::CountdownTimer,
    view::{log_missing, Control},
    UiContext,
};

pub const HOME_PATH: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub exam_number: ExamNumber,
    pub started_at: DateTime<Utc>,
    pub remaining_secs: i64,
}

/// Shown once a session has been closed on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionSummary {
    pub exam_number: ExamNumber,
    pub duration_secs: i64,
}

impl CompletionSummary {
    pub fn duration_text(&self) -> String {
        format_duration(self.duration_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Running(SessionState),
    Finished(CompletionSummary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Idle,
    Running,
    Finished,
}

impl SessionPhase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            Self::Idle => PhaseKind::Idle,
            Self::Running(_) => PhaseKind::Running,
            Self::Finished(_) => PhaseKind::Finished,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Requested,
    Expired,
}

/// Result of the finish request that closed a session.
pub type FinishOutcome = Result<CompletionSummary, ErrorKind>;

/// Drives one exam session at a time: start, countdown mirror, finish.
pub struct SessionController {
    ctx: UiContext,
    timer: CountdownTimer,
    phase: Mutex<SessionPhase>,
    remaining: AtomicI64,
    phase_tx: watch::Sender<PhaseKind>,
    outcome_tx: watch::Sender<Option<FinishOutcome>>,
    redirect: Mutex<Option<JoinHandle<()>>>,
    this: Weak<SessionController>,
}

impl SessionController {
    pub fn new(ctx: UiContext) -> Arc<Self> {
        let (phase_tx, _) = watch::channel(PhaseKind::Idle);
        let (outcome_tx, _) = watch::channel(None);
        Arc::new_cyclic(|this| Self {
            ctx,
            timer: CountdownTimer::default(),
            phase: Mutex::new(SessionPhase::Idle),
            remaining: AtomicI64::new(0),
            phase_tx,
            outcome_tx,
            redirect: Mutex::new(None),
            this: this.clone(),
        })
    }

    /// Current phase; a running session reports the latest countdown value.
    pub async fn phase(&self) -> SessionPhase {
        let mut phase = self.phase.lock().await.clone();
        if let SessionPhase::Running(state) = &mut phase {
            state.remaining_secs = self.remaining.load(Ordering::SeqCst);
        }
        phase
    }

    /// `Finished` is published when the session closes locally, before the
    /// finish request resolves. Use `wait_finished` for the server outcome.
    pub fn subscribe(&self) -> watch::Receiver<PhaseKind> {
        self.phase_tx.subscribe()
    }

    /// Resolves once the finish request of the latest session has been
    /// answered, whether it was sent by `finish` or by expiry.
    pub async fn wait_finished(&self) -> FinishOutcome {
        let mut outcome = self.outcome_tx.subscribe();
        let settled = outcome
            .wait_for(Option::is_some)
            .await
            .map(|settled| (*settled).clone());
        match settled {
            Ok(Some(result)) => result,
            _ => Err(ErrorKind::NoActiveSession),
        }
    }

    pub fn timer_running(&self) -> bool {
        self.timer.is_running()
    }

    pub async fn start(&self, exam_number: ExamNumber) -> Result<(), ErrorKind> {
        let _pending = self.ctx.pending.acquire(Control::StartExam)?;
        if self.ctx.pending.is_pending(Control::FinishExam) {
            info!(exam_number = %exam_number, "start refused; previous session still closing");
            self.ctx
                .status
                .error("The previous exam is still being finished!");
            return Err(ErrorKind::Busy(Control::FinishExam.name().to_string()));
        }
        if matches!(*self.phase.lock().await, SessionPhase::Running(_)) {
            return Err(ErrorKind::Busy(Control::StartExam.name().to_string()));
        }
        if let Some(redirect) = self.redirect.lock().await.take() {
            redirect.abort();
            debug!("pending redirect cancelled by new session");
        }

        let started_at = Utc::now();
        let response = self
            .ctx
            .actions
            .perform_json::<StartExamResponse, _>(
                Endpoint::StartExam,
                &StartExamRequest {
                    exam_number: exam_number.clone(),
                },
            )
            .await;
        let response = match response {
            Ok(response) => response,
            Err(err) => {
                self.ctx
                    .status
                    .report_failure(&err, |_| "Failed to start exam!".to_string());
                return Err(err);
            }
        };

        let budget = self.ctx.settings.exam_duration_secs;
        {
            let mut phase = self.phase.lock().await;
            *phase = SessionPhase::Running(SessionState {
                exam_number: exam_number.clone(),
                started_at,
                remaining_secs: budget,
            });
        }
        self.remaining.store(budget, Ordering::SeqCst);
        self.outcome_tx.send_replace(None);
        self.phase_tx.send_replace(PhaseKind::Running);
        info!(
            exam_number = %exam_number,
            injected = response.selected_errors.len(),
            budget_secs = budget,
            "exam session started"
        );

        self.ctx.status.success("Exam started! Faults have been injected.");
        log_missing(self.ctx.view.render_timer(&format_countdown(budget)));
        self.start_countdown(budget);

        let view = &self.ctx.view;
        log_missing(view.set_control_visible(Control::StartExam, false));
        log_missing(view.set_control_visible(Control::FinishExam, true));
        log_missing(view.set_timer_visible(true));
        Ok(())
    }

    /// Explicit finish triggered by the operator.
    pub async fn finish(&self) -> Result<CompletionSummary, ErrorKind> {
        self.finish_with(FinishReason::Requested).await
    }

    async fn finish_with(&self, reason: FinishReason) -> Result<CompletionSummary, ErrorKind> {
        let pending = self.ctx.pending.acquire(Control::FinishExam)?;
        let summary = {
            let mut phase = self.phase.lock().await;
            let SessionPhase::Running(state) = &*phase else {
                debug!(?reason, "finish ignored; no running session");
                return Err(ErrorKind::NoActiveSession);
            };
            let duration_secs = (Utc::now() - state.started_at).num_seconds().max(0);
            let summary = CompletionSummary {
                exam_number: state.exam_number.clone(),
                duration_secs,
            };
            *phase = SessionPhase::Finished(summary.clone());
            summary
        };
        self.timer.stop();
        self.phase_tx.send_replace(PhaseKind::Finished);
        info!(
            exam_number = %summary.exam_number,
            duration_secs = summary.duration_secs,
            ?reason,
            "finishing exam session"
        );

        let result = self
            .ctx
            .actions
            .perform_json::<Acknowledged, _>(
                Endpoint::FinishExam,
                &FinishExamRequest {
                    exam_number: summary.exam_number.clone(),
                    duration: summary.duration_secs,
                },
            )
            .await;
        let outcome = match result {
            Ok(_) => {
                self.ctx
                    .status
                    .success("Exam finished! All relays have been reset.");
                log_missing(self.ctx.view.render_completion(&summary));
                self.schedule_redirect().await;
                Ok(summary)
            }
            Err(err) => {
                warn!(exam_number = %summary.exam_number, error = %err, "server did not confirm finish");
                self.ctx
                    .status
                    .report_failure(&err, |_| "Failed to finish exam!".to_string());
                Err(err)
            }
        };
        // Release the control first so waiters can start the next session.
        drop(pending);
        self.outcome_tx.send_replace(Some(outcome.clone()));
        outcome
    }

    fn start_countdown(&self, budget: i64) {
        let tick_owner = self.this.clone();
        let expire_owner = self.this.clone();
        self.timer.start(
            budget,
            move |remaining| {
                if let Some(controller) = tick_owner.upgrade() {
                    controller.on_tick(remaining);
                }
            },
            move || {
                if let Some(controller) = expire_owner.upgrade() {
                    tokio::spawn(async move {
                        if let Err(err) = controller.finish_with(FinishReason::Expired).await {
                            debug!(error = %err, "automatic finish did not complete");
                        }
                    });
                }
            },
        );
    }

    fn on_tick(&self, remaining: i64) {
        self.remaining.store(remaining, Ordering::SeqCst);
        log_missing(self.ctx.view.render_timer(&format_countdown(remaining)));
    }

    async fn schedule_redirect(&self) {
        let view = Arc::clone(&self.ctx.view);
        let seconds = self.ctx.settings.redirect_delay_secs;
        log_missing(view.render_redirect_countdown(seconds));
        let handle = tokio::spawn(async move {
            for left in (0..seconds).rev() {
                tokio::time::sleep(Duration::from_secs(1)).await;
                log_missing(view.render_redirect_countdown(left));
            }
            view.navigate(HOME_PATH);
        });
        if let Some(previous) = self.redirect.lock().await.replace(handle) {
            previous.abort();
        }
    }
}

/// `MM:SS`, clamped at zero.
pub fn format_countdown(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// `M:SS` for completed-session durations.
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
