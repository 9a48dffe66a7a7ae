use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use client_core::{
    CompletionSummary, Control, InputField, MessageId, Render, SelectionSummary, StatusKind,
    StatusMessage, View,
};
use shared::domain::CircuitSlot;
use tracing::{debug, warn};

/// Terminal rendering of the exam station surface.
pub struct ConsoleView {
    assume_yes: bool,
}

impl ConsoleView {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

#[async_trait]
impl View for ConsoleView {
    fn show_message(&self, message: &StatusMessage) -> Render {
        match message.kind {
            StatusKind::Success => println!("[ok] {}", message.text),
            StatusKind::Error => println!("[error] {}", message.text),
        }
        Ok(())
    }

    fn dismiss_message(&self, id: MessageId) -> Render {
        debug!(message = id.0, "status message expired");
        Ok(())
    }

    fn alert(&self, text: &str) {
        println!("{text}");
    }

    async fn confirm(&self, question: &str) -> bool {
        if self.assume_yes {
            println!("{question} [y/N] y");
            return true;
        }

        let question = question.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            print!("{question} [y/N] ");
            io::stdout().flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok::<_, io::Error>(line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Ok(Err(err)) => {
                warn!(error = %err, "could not read confirmation");
                false
            }
            Err(err) => {
                warn!(error = %err, "confirmation prompt aborted");
                false
            }
        }
    }

    fn set_control_visible(&self, control: Control, visible: bool) -> Render {
        debug!(control = control.name(), visible, "control visibility");
        Ok(())
    }

    fn set_control_busy(&self, control: Control, busy: bool) -> Render {
        debug!(control = control.name(), busy, "control busy state");
        Ok(())
    }

    fn clear_input(&self, field: InputField) -> Render {
        debug!(?field, "input cleared");
        Ok(())
    }

    fn set_timer_visible(&self, visible: bool) -> Render {
        if !visible {
            println!();
        }
        Ok(())
    }

    fn render_timer(&self, text: &str) -> Render {
        let mut stdout = io::stdout().lock();
        // The countdown overwrites itself on one line.
        let _ = write!(stdout, "\rRemaining: {text}  ");
        let _ = stdout.flush();
        Ok(())
    }

    fn render_completion(&self, summary: &CompletionSummary) -> Render {
        println!(
            "\nExam {} finished after {}",
            summary.exam_number,
            summary.duration_text()
        );
        Ok(())
    }

    fn render_redirect_countdown(&self, seconds_left: u32) -> Render {
        println!("Returning to start in {seconds_left}s...");
        Ok(())
    }

    fn render_slot_description(&self, slot: CircuitSlot, description: Option<&str>) -> Render {
        debug!(slot = slot.0, description, "slot selection changed");
        Ok(())
    }

    fn render_selection_summary(&self, summary: &SelectionSummary) -> Render {
        println!("{summary}");
        Ok(())
    }

    fn render_shutdown_notice(&self) -> Render {
        println!("The station is powering off. It is safe to unplug in a minute.");
        Ok(())
    }

    fn debug_log(&self, line: &str) {
        debug!(target: "relay_console::debug", "{line}");
    }

    fn navigate(&self, path: &str) {
        println!("-> {path}");
    }

    fn reload(&self) {
        println!("-> reload");
    }
}
