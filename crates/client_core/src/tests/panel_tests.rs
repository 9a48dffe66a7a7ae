use super::*;
use crate::test_support::{MockBackend, MockReply, RecordingView, ViewEvent};
use serde_json::json;
use std::sync::Arc;

fn choice(relay_id: u32, label: &str) -> Option<RelayChoice> {
    RelayChoice::new(relay_id, label)
}

#[tokio::test]
async fn every_slot_starts_without_selection() {
    let backend = MockBackend::spawn().await;
    let panel = ManualErrorPanel::new(backend.context(RecordingView::new()));

    let selection = panel.selection().await;
    assert_eq!(selection.len(), 7);
    assert!(selection.values().all(Option::is_none));
    assert_eq!(panel.summary().await, SelectionSummary::NoneActive);
}

#[tokio::test]
async fn submit_sends_only_selected_slots_and_reports_activation() {
    let backend = MockBackend::spawn().await;
    backend.reply(
        "/set_manual_errors",
        MockReply::json(json!({
            "success": true,
            "activated_count": 2,
            "active_relays": [5, 7],
            "failed_relays": [],
            "message": "2 errors activated"
        })),
    );
    let view = RecordingView::new();
    let panel = ManualErrorPanel::new(backend.context(Arc::clone(&view)));

    panel
        .set_selection(CircuitSlot(1), choice(5, "Open PE"))
        .await
        .expect("slot 1");
    panel
        .set_selection(CircuitSlot(3), choice(0, "No error"))
        .await
        .expect("slot 3");
    panel
        .set_selection(CircuitSlot(2), choice(7, "Swapped N/L"))
        .await
        .expect("slot 2");

    let report = panel.submit().await.expect("submit");

    assert_eq!(report.activated_count, 2);
    assert_eq!(report.active_relays, vec![RelayId(5), RelayId(7)]);
    let requests = backend.requests_to("/set_manual_errors");
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].body,
        Some(json!({"errors": {"stromkreis1": 5, "stromkreis2": 7}}))
    );

    let summary = view.last_summary().expect("summary rendered");
    assert_eq!(summary.active_count(), 2);
    assert_eq!(
        summary.to_string(),
        "2 errors selected:\n• Circuit 1: Open PE (relay 5)\n• Circuit 2: Swapped N/L (relay 7)"
    );
    assert_eq!(
        view.alerts(),
        vec!["✅ 2 errors activated!\nActive relays: 5, 7".to_string()]
    );
    assert!(view.contains(&ViewEvent::ControlBusy(Control::SubmitErrors, true)));
    assert!(view.contains(&ViewEvent::ControlBusy(Control::SubmitErrors, false)));
}

#[tokio::test]
async fn submit_with_nothing_selected_never_calls_backend() {
    let backend = MockBackend::spawn().await;
    let view = RecordingView::new();
    let panel = ManualErrorPanel::new(backend.context(Arc::clone(&view)));
    panel
        .set_selection(CircuitSlot(4), choice(0, "No error"))
        .await
        .expect("slot 4");

    let err = panel.submit().await.expect_err("empty");

    assert!(matches!(err, ErrorKind::Empty(_)));
    assert_eq!(backend.request_count(), 0);
    assert_eq!(view.alerts(), vec!["⚠ No errors selected!".to_string()]);
}

#[tokio::test]
async fn submit_rejection_surfaces_server_reason() {
    let backend = MockBackend::spawn().await;
    backend.reply(
        "/set_manual_errors",
        MockReply::json(json!({"success": false, "error": "Server error: bus timeout"})),
    );
    let view = RecordingView::new();
    let panel = ManualErrorPanel::new(backend.context(Arc::clone(&view)));
    panel
        .set_selection(CircuitSlot(6), choice(12, "Insulation fault"))
        .await
        .expect("slot 6");

    let err = panel.submit().await.expect_err("rejected");

    assert_eq!(err, ErrorKind::Rejected("Server error: bus timeout".into()));
    assert_eq!(
        view.alerts(),
        vec!["❌ Failed to activate errors: Server error: bus timeout".to_string()]
    );
    assert_eq!(panel.summary().await.active_count(), 1, "selection is kept");
}

#[tokio::test]
async fn selecting_unknown_slot_fails() {
    let backend = MockBackend::spawn().await;
    let panel = ManualErrorPanel::new(backend.context(RecordingView::new()));

    let err = panel
        .set_selection(CircuitSlot(8), choice(5, "Open PE"))
        .await
        .expect_err("slot 8 is out of range");
    assert_eq!(err, ErrorKind::UnknownSlot(8));
    assert_eq!(panel.selection().await.len(), 7);
}

#[tokio::test]
async fn selection_renders_slot_description() {
    let backend = MockBackend::spawn().await;
    let view = RecordingView::new();
    let panel = ManualErrorPanel::new(backend.context(Arc::clone(&view)));

    panel
        .set_selection(CircuitSlot(2), choice(9, "High loop impedance"))
        .await
        .expect("select");
    panel.set_selection(CircuitSlot(2), None).await.expect("clear");

    assert!(view.contains(&ViewEvent::SlotDescription(
        CircuitSlot(2),
        Some("High loop impedance".into())
    )));
    assert!(view.contains(&ViewEvent::SlotDescription(CircuitSlot(2), None)));
    assert_eq!(view.last_summary(), Some(SelectionSummary::NoneActive));
}

#[tokio::test]
async fn reset_clears_selection_after_success() {
    let backend = MockBackend::spawn().await;
    backend.reply(
        "/reset_relays",
        MockReply::json(json!({"success": true, "message": "All relays reset", "active_relays": []})),
    );
    let view = RecordingView::new();
    let panel = ManualErrorPanel::new(backend.context(Arc::clone(&view)));
    panel
        .set_selection(CircuitSlot(1), choice(5, "Open PE"))
        .await
        .expect("select");

    panel.reset().await.expect("reset");

    assert!(panel.selection().await.values().all(Option::is_none));
    assert_eq!(view.last_summary(), Some(SelectionSummary::NoneActive));
    assert_eq!(
        view.last_summary().expect("summary").to_string(),
        "No errors active"
    );
    assert_eq!(view.alerts(), vec!["✅ All relays reset!".to_string()]);
    assert_eq!(backend.requests_to("/reset_relays").len(), 1);
}

#[tokio::test]
async fn reset_clears_selection_even_when_server_rejects() {
    let backend = MockBackend::spawn().await;
    backend.reply(
        "/reset_relays",
        MockReply::json(json!({"success": false, "message": "module 1 unreachable"})),
    );
    let view = RecordingView::new();
    let panel = ManualErrorPanel::new(backend.context(Arc::clone(&view)));
    panel
        .set_selection(CircuitSlot(5), choice(21, "Missing RCD"))
        .await
        .expect("select");

    let err = panel.reset().await.expect_err("partial");

    assert_eq!(err, ErrorKind::Rejected("module 1 unreachable".into()));
    assert!(panel.selection().await.values().all(Option::is_none));
    assert_eq!(view.last_summary(), Some(SelectionSummary::NoneActive));
    assert_eq!(
        view.alerts(),
        vec!["⚠ Reset partially successful: module 1 unreachable".to_string()]
    );
}

#[tokio::test]
async fn reset_clears_selection_on_connection_failure() {
    let backend = MockBackend::spawn().await;
    backend.reply("/reset_relays", MockReply::status(502));
    let view = RecordingView::new();
    let panel = ManualErrorPanel::new(backend.context(Arc::clone(&view)));
    panel
        .set_selection(CircuitSlot(7), choice(30, "Broken N"))
        .await
        .expect("select");

    let err = panel.reset().await.expect_err("transport");

    assert_eq!(err, ErrorKind::Transport { status: 502 });
    assert!(panel.selection().await.values().all(Option::is_none));
    assert_eq!(view.last_summary(), Some(SelectionSummary::NoneActive));
    assert_eq!(
        view.alerts(),
        vec!["🚫 Connection error during reset!".to_string()]
    );
}

#[tokio::test]
async fn declined_reset_changes_nothing() {
    let backend = MockBackend::spawn().await;
    let view = RecordingView::new();
    view.answer_confirm(false);
    let panel = ManualErrorPanel::new(backend.context(Arc::clone(&view)));
    panel
        .set_selection(CircuitSlot(1), choice(5, "Open PE"))
        .await
        .expect("select");

    let err = panel.reset().await.expect_err("declined");

    assert_eq!(err, ErrorKind::Declined);
    assert_eq!(backend.request_count(), 0);
    assert_eq!(panel.summary().await.active_count(), 1);
}

#[tokio::test]
async fn duplicate_submit_while_in_flight_is_refused() {
    let backend = MockBackend::spawn().await;
    backend.reply(
        "/set_manual_errors",
        MockReply::json(json!({"success": true, "activated_count": 1, "active_relays": [5]}))
            .delayed(std::time::Duration::from_millis(300)),
    );
    let view = RecordingView::new();
    let panel = ManualErrorPanel::new(backend.context(Arc::clone(&view)));
    panel
        .set_selection(CircuitSlot(1), choice(5, "Open PE"))
        .await
        .expect("select");

    let (first, second) = tokio::join!(panel.submit(), panel.submit());

    assert!(first.is_ok());
    assert_eq!(second.expect_err("busy"), ErrorKind::Busy("submit_errors".into()));
    assert_eq!(backend.requests_to("/set_manual_errors").len(), 1);
}
