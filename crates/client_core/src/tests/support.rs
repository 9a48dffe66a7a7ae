//! Recording view and mock backend shared by the controller tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use serde_json::Value;
use shared::domain::CircuitSlot;
use tokio::net::TcpListener;

use crate::{
    panel::SelectionSummary,
    session::CompletionSummary,
    settings::Settings,
    view::{Control, InputField, MessageId, MissingTarget, Render, StatusKind, StatusMessage, View},
    UiContext,
};

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Message { kind: StatusKind, text: String },
    Dismissed(MessageId),
    Alert(String),
    Confirm(String),
    ControlVisible(Control, bool),
    ControlBusy(Control, bool),
    ClearInput(InputField),
    TimerVisible(bool),
    Timer(String),
    Completion(CompletionSummary),
    Redirect(u32),
    SlotDescription(CircuitSlot, Option<String>),
    Summary(SelectionSummary),
    ShutdownNotice,
    Debug(String),
    Navigate(String),
    Reload,
}

pub struct RecordingView {
    events: Mutex<Vec<ViewEvent>>,
    confirm_answer: AtomicBool,
    timer_present: AtomicBool,
}

impl RecordingView {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            confirm_answer: AtomicBool::new(true),
            timer_present: AtomicBool::new(true),
        })
    }

    pub fn answer_confirm(&self, answer: bool) {
        self.confirm_answer.store(answer, Ordering::SeqCst);
    }

    pub fn remove_timer_target(&self) {
        self.timer_present.store(false, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().expect("events").clone()
    }

    pub fn timers(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ViewEvent::Timer(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ViewEvent::Alert(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn messages(&self) -> Vec<(StatusKind, String)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ViewEvent::Message { kind, text } => Some((kind, text)),
                _ => None,
            })
            .collect()
    }

    pub fn last_summary(&self) -> Option<SelectionSummary> {
        self.events().into_iter().rev().find_map(|event| match event {
            ViewEvent::Summary(summary) => Some(summary),
            _ => None,
        })
    }

    pub fn contains(&self, expected: &ViewEvent) -> bool {
        self.events().iter().any(|event| event == expected)
    }

    fn record(&self, event: ViewEvent) {
        self.events.lock().expect("events").push(event);
    }
}

#[async_trait]
impl View for RecordingView {
    fn show_message(&self, message: &StatusMessage) -> Render {
        self.record(ViewEvent::Message {
            kind: message.kind,
            text: message.text.clone(),
        });
        Ok(())
    }

    fn dismiss_message(&self, id: MessageId) -> Render {
        self.record(ViewEvent::Dismissed(id));
        Ok(())
    }

    fn alert(&self, text: &str) {
        self.record(ViewEvent::Alert(text.to_string()));
    }

    async fn confirm(&self, question: &str) -> bool {
        self.record(ViewEvent::Confirm(question.to_string()));
        self.confirm_answer.load(Ordering::SeqCst)
    }

    fn set_control_visible(&self, control: Control, visible: bool) -> Render {
        self.record(ViewEvent::ControlVisible(control, visible));
        Ok(())
    }

    fn set_control_busy(&self, control: Control, busy: bool) -> Render {
        self.record(ViewEvent::ControlBusy(control, busy));
        Ok(())
    }

    fn clear_input(&self, field: InputField) -> Render {
        self.record(ViewEvent::ClearInput(field));
        Ok(())
    }

    fn set_timer_visible(&self, visible: bool) -> Render {
        self.record(ViewEvent::TimerVisible(visible));
        Ok(())
    }

    fn render_timer(&self, text: &str) -> Render {
        if !self.timer_present.load(Ordering::SeqCst) {
            return Err(MissingTarget("timer"));
        }
        self.record(ViewEvent::Timer(text.to_string()));
        Ok(())
    }

    fn render_completion(&self, summary: &CompletionSummary) -> Render {
        self.record(ViewEvent::Completion(summary.clone()));
        Ok(())
    }

    fn render_redirect_countdown(&self, seconds_left: u32) -> Render {
        self.record(ViewEvent::Redirect(seconds_left));
        Ok(())
    }

    fn render_slot_description(&self, slot: CircuitSlot, description: Option<&str>) -> Render {
        self.record(ViewEvent::SlotDescription(
            slot,
            description.map(str::to_string),
        ));
        Ok(())
    }

    fn render_selection_summary(&self, summary: &SelectionSummary) -> Render {
        self.record(ViewEvent::Summary(summary.clone()));
        Ok(())
    }

    fn render_shutdown_notice(&self) -> Render {
        self.record(ViewEvent::ShutdownNotice);
        Ok(())
    }

    fn debug_log(&self, line: &str) {
        self.record(ViewEvent::Debug(line.to_string()));
    }

    fn navigate(&self, path: &str) {
        self.record(ViewEvent::Navigate(path.to_string()));
    }

    fn reload(&self) {
        self.record(ViewEvent::Reload);
    }
}

#[derive(Debug, Clone)]
pub struct MockReply {
    status: StatusCode,
    content_type: &'static str,
    body: Vec<u8>,
    delay: Duration,
}

impl MockReply {
    pub fn json(value: Value) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: "application/json",
            body: serde_json::to_vec(&value).expect("json body"),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status: StatusCode::from_u16(status).expect("status code"),
            content_type: "text/plain",
            body: b"failure".to_vec(),
            delay: Duration::ZERO,
        }
    }

    pub fn asset(content_type: &'static str, body: &[u8]) -> Self {
        Self {
            status: StatusCode::OK,
            content_type,
            body: body.to_vec(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Clone, Default)]
struct BackendState {
    replies: Arc<Mutex<HashMap<String, MockReply>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// In-process backend bound to an ephemeral port. Unknown paths answer 404.
#[derive(Clone)]
pub struct MockBackend {
    url: String,
    state: BackendState,
}

impl MockBackend {
    pub async fn spawn() -> Self {
        let state = BackendState::default();
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let app = Router::new()
            .fallback(handle_request)
            .with_state(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            url: format!("http://{addr}"),
            state,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn reply(&self, path: &str, reply: MockReply) {
        self.state
            .replies
            .lock()
            .expect("replies")
            .insert(path.to_string(), reply);
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .expect("requests")
            .iter()
            .filter(|request| request.path == path)
            .cloned()
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.lock().expect("requests").len()
    }

    pub fn settings(&self) -> Settings {
        Settings {
            server_url: self.url.clone(),
            request_timeout_secs: 5,
            ..Settings::default()
        }
    }

    pub fn context(&self, view: Arc<RecordingView>) -> UiContext {
        self.context_with(view, self.settings())
    }

    pub fn context_with(&self, view: Arc<RecordingView>, settings: Settings) -> UiContext {
        UiContext::new(settings, view).expect("context")
    }
}

async fn handle_request(
    State(state): State<BackendState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let parsed = if body.is_empty() {
        None
    } else {
        serde_json::from_slice(&body).ok()
    };
    state.requests.lock().expect("requests").push(RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
        body: parsed,
    });

    let reply = state.replies.lock().expect("replies").get(&path).cloned();
    let Some(reply) = reply else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    (
        reply.status,
        [(header::CONTENT_TYPE, reply.content_type)],
        reply.body,
    )
        .into_response()
}

/// Polls `condition` for up to two seconds.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
