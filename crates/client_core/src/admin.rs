use std::sync::Arc;

use shared::{
    error::ErrorKind,
    protocol::{Acknowledged, AdminLoginRequest, WifiConnectRequest},
};
use tracing::{info, warn};

use crate::{
    request::Endpoint,
    view::{log_missing, Control, InputField},
    UiContext,
};

pub const ADMIN_PANEL_PATH: &str = "/admin_panel";

/// Admin surface: login, WiFi, and the confirm-guarded destructive actions.
pub struct AdminActions {
    ctx: UiContext,
}

impl AdminActions {
    pub fn new(ctx: UiContext) -> Self {
        Self { ctx }
    }

    pub async fn admin_login(&self, code: &str) -> Result<(), ErrorKind> {
        let code = code.trim();
        if code.is_empty() {
            self.ctx.status.error("Please enter the code!");
            return Err(ErrorKind::Empty("admin code".into()));
        }

        let _pending = self.ctx.pending.acquire(Control::AdminLogin)?;
        let result = self
            .ctx
            .actions
            .perform_json::<Acknowledged, _>(
                Endpoint::AdminLogin,
                &AdminLoginRequest {
                    code: code.to_string(),
                },
            )
            .await;
        match result {
            Ok(_) => {
                info!("admin login accepted");
                self.ctx.view.navigate(ADMIN_PANEL_PATH);
                Ok(())
            }
            Err(ErrorKind::Rejected(reason)) => {
                // Never tell the operator why; a wrong code and any other refusal look the same.
                warn!(%reason, "admin login rejected");
                self.ctx.status.error("Wrong code!");
                log_missing(self.ctx.view.clear_input(InputField::AdminCode));
                Err(ErrorKind::Rejected(reason))
            }
            Err(err) => {
                self.ctx.status.report_failure(&err, |_| String::new());
                Err(err)
            }
        }
    }

    pub async fn connect_wifi(&self, ssid: &str, password: &str) -> Result<(), ErrorKind> {
        if ssid.trim().is_empty() {
            self.ctx.status.error("Please enter an SSID!");
            return Err(ErrorKind::Empty("wifi ssid".into()));
        }

        let _pending = self.ctx.pending.acquire(Control::ConnectWifi)?;
        let result = self
            .ctx
            .actions
            .perform_json::<Acknowledged, _>(
                Endpoint::ConnectWifi,
                &WifiConnectRequest {
                    ssid: ssid.trim().to_string(),
                    password: password.to_string(),
                },
            )
            .await;
        match result {
            Ok(_) => {
                info!(ssid = ssid.trim(), "wifi connection requested");
                self.ctx.status.success("Connecting to WiFi...");
                Ok(())
            }
            Err(err) => {
                self.ctx
                    .status
                    .report_failure(&err, |reason| format!("WiFi connection failed: {reason}"));
                Err(err)
            }
        }
    }

    pub async fn clear_database(&self) -> Result<(), ErrorKind> {
        self.confirm("Are you sure you want to delete the entire database?")
            .await?;

        let _pending = self.ctx.pending.acquire(Control::ClearDatabase)?;
        let result = self
            .ctx
            .actions
            .perform::<Acknowledged>(Endpoint::ClearDatabase)
            .await;
        if let Err(err) = result {
            self.ctx
                .status
                .report_failure(&err, |_| "Failed to clear the database!".to_string());
            return Err(err);
        }

        info!("database cleared");
        self.ctx.status.success("Database cleared!");
        let view = Arc::clone(&self.ctx.view);
        let delay = self.ctx.settings.reload_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            view.reload();
        });
        Ok(())
    }

    pub async fn shutdown_system(&self) -> Result<(), ErrorKind> {
        self.confirm("Really shut the system down?").await?;

        let _pending = self.ctx.pending.acquire(Control::ShutdownSystem)?;
        let result = self
            .ctx
            .actions
            .perform::<Acknowledged>(Endpoint::ShutdownSystem)
            .await;
        if let Err(err) = result {
            self.ctx
                .status
                .report_failure(&err, |reason| format!("Shutdown failed: {reason}"));
            return Err(err);
        }

        info!("system shutdown requested");
        self.ctx.status.success("System is shutting down...");
        log_missing(self.ctx.view.render_shutdown_notice());
        Ok(())
    }

    async fn confirm(&self, question: &str) -> Result<(), ErrorKind> {
        if self.ctx.view.confirm(question).await {
            Ok(())
        } else {
            info!(question, "destructive action declined");
            Err(ErrorKind::Declined)
        }
    }
}

#[cfg(test)]
#[path = "tests/admin_tests.rs"]
mod tests;
