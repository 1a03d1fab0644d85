//! CLI command implementations

use anyhow::{bail, Result};
use dialoguer::{theme::ColorfulTheme, Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

use crate::api::{ApiClient, AuthApi, NotificationApi};
use crate::auth::{
    Decision, FileStore, RegisterRequest, Requirement, RouteGuard, SessionManager, TokenStore,
};
use crate::cli::{
    confirm, error, format_decision, info, print_new_notification, print_notification_table,
    print_session_detail, requirement_for, success, warn, NotificationsAction, OutputFormat,
    RoleArg,
};
use crate::config::{self, Config};
use crate::error::Error;
use crate::notifications::{NotificationEvent, NotificationPoller, NotificationSummary};

/// Everything a command needs to talk to the backend
pub struct Context {
    pub config: Config,
    pub api: Arc<ApiClient>,
    pub session: SessionManager,
}

impl Context {
    pub fn new(config: Config) -> Result<Self> {
        let tokens = token_store(&config);
        let api = Arc::new(ApiClient::new(&config.api, tokens.clone())?);
        let session = SessionManager::new(tokens, api.clone());
        Ok(Self {
            config,
            api,
            session,
        })
    }

    fn guard(&self) -> RouteGuard {
        RouteGuard::new(self.session.clone())
    }

    /// Fail unless a live session exists, renewing an expired access token once
    async fn require_session(&self) -> Result<()> {
        if self.guard().authorize(Requirement::AnyAuthenticated) == Decision::Allow {
            return Ok(());
        }
        if self.session.tokens().refresh_token().is_some() {
            if let Ok(state) = self.session.renew().await {
                if state.is_authenticated {
                    return Ok(());
                }
            }
        }
        Err(Error::NotAuthenticated.into())
    }
}

fn token_store(config: &Config) -> TokenStore {
    let path = config.storage.path.clone().or_else(FileStore::default_path);
    match path {
        Some(path) => TokenStore::new(Arc::new(FileStore::new(path))),
        None => {
            tracing::warn!("No data directory available, session will not be persisted");
            TokenStore::in_memory()
        }
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Load configuration, applying the command-line base URL override
pub fn load_config(api_url: Option<String>) -> Result<Config> {
    let mut config = config::load_config()?;
    if let Some(url) = api_url {
        config.api.base_url = url;
    }
    Ok(config)
}

/// Initialize a new rainsafe.toml configuration file
pub async fn init() -> Result<()> {
    let config_path = Path::new(config::loader::CONFIG_FILENAME);

    if config_path.exists() {
        warn("rainsafe.toml already exists");
        return Ok(());
    }

    fs::write(config_path, config::loader::default_config_content())?;

    success("Created rainsafe.toml");
    info("Set the API base URL, then run 'rainsafe login'");

    Ok(())
}

/// Register a new account
pub async fn register(ctx: &Context, mut form: RegisterRequest) -> Result<()> {
    let theme = ColorfulTheme::default();
    form.password = Password::with_theme(&theme)
        .with_prompt("Password")
        .interact()?;
    form.password2 = Password::with_theme(&theme)
        .with_prompt("Confirm password")
        .interact()?;

    let problems = form.validate();
    if !problems.is_empty() {
        for (field, message) in &problems {
            error(&format!("{}: {}", field, message));
        }
        bail!("Please fix the highlighted errors.");
    }

    let pb = spinner("Creating account...");
    let result = ctx.api.register(&form).await;
    pb.finish_and_clear();

    match result {
        Ok(profile) => {
            success(&format!("Registered {}. You can now log in.", profile.email));
            Ok(())
        }
        Err(Error::Validation(fields)) => {
            for (field, messages) in &fields {
                error(&format!("{}: {}", field, messages.join(" ")));
            }
            bail!("Registration rejected");
        }
        Err(e) => {
            error(&format!("Registration failed: {}", e));
            Err(e.into())
        }
    }
}

/// Log in and persist the session
pub async fn login(ctx: &Context, email: Option<String>) -> Result<()> {
    let theme = ColorfulTheme::default();
    let email = match email {
        Some(email) => email,
        None => Input::<String>::with_theme(&theme)
            .with_prompt("Email")
            .interact_text()?,
    };
    let password = Password::with_theme(&theme)
        .with_prompt("Password")
        .interact()?;

    let pb = spinner("Logging in...");
    let result = ctx.session.login(&email, &password).await;
    pb.finish_and_clear();

    match result {
        Ok(state) if state.is_authenticated => {
            let role = state.role.map(|r| r.to_string()).unwrap_or_default();
            success(&format!("Logged in as {} ({})", email, role));
            Ok(())
        }
        Ok(_) => {
            error("Login succeeded but the issued token is not usable");
            bail!("Unusable session token");
        }
        Err(e) => {
            error(&format!("Login failed: {}", e));
            Err(e.into())
        }
    }
}

/// Forget the stored session
pub async fn logout(ctx: &Context) -> Result<()> {
    ctx.session.logout();
    success("Logged out");
    Ok(())
}

/// Show the current session
pub async fn status(ctx: &Context, format: OutputFormat) -> Result<()> {
    let state = ctx.session.refresh();

    match format {
        OutputFormat::Table => print_session_detail(&state),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&state)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&state)?),
    }

    Ok(())
}

/// Renew the access token
pub async fn renew(ctx: &Context) -> Result<()> {
    match ctx.session.renew().await {
        Ok(state) if state.is_authenticated => {
            success("Access token renewed");
            Ok(())
        }
        Ok(_) => bail!("Renewed token is not usable"),
        Err(e) => {
            error(&format!("Renew failed: {}", e));
            Err(e.into())
        }
    }
}

/// Report the guard decision for a requirement
pub async fn authorize(ctx: &Context, role: Option<RoleArg>) -> Result<()> {
    let decision = ctx.guard().authorize(requirement_for(role));
    println!("{}", format_decision(decision));

    match decision.redirect_path() {
        Some(path) => bail!("Access denied, redirect to {}", path),
        None => Ok(()),
    }
}

/// Manage notifications
pub async fn notifications(ctx: &Context, action: NotificationsAction) -> Result<()> {
    ctx.require_session().await?;

    match action {
        NotificationsAction::List { format } => {
            let summary = NotificationSummary::new(ctx.api.fetch_notifications().await?);
            match format {
                OutputFormat::Table => print_notification_table(&summary),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
                OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&summary)?),
            }
        }
        NotificationsAction::Watch => watch(ctx).await?,
        NotificationsAction::Read { id } => {
            ctx.api.mark_as_read(id).await?;
            success(&format!("Marked notification {} as read", id));
        }
        NotificationsAction::Clear { force } => {
            if !force && !confirm("Delete all notifications?") {
                info("Cancelled");
                return Ok(());
            }
            ctx.api.clear_all().await?;
            success("Cleared all notifications");
        }
    }

    Ok(())
}

/// Poll until interrupted or the session ends
async fn watch(ctx: &Context) -> Result<()> {
    let interval = ctx.config.notifications.poll_interval();
    let poller = NotificationPoller::new(ctx.api.clone(), interval);
    let mut events = poller.subscribe();
    let mut session = ctx.session.subscribe();
    let mut session_check = tokio::time::interval(interval);

    poller.start();
    info(&format!(
        "Watching for notifications every {}s (Ctrl+C to stop)",
        interval.as_secs()
    ));

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(NotificationEvent::New(item)) => print_new_notification(&item),
                Err(RecvError::Lagged(missed)) => warn(&format!("Missed {} notification signal(s)", missed)),
                Err(RecvError::Closed) => break,
            },
            _ = session_check.tick() => {
                if ctx.require_session().await.is_err() {
                    ctx.session.logout();
                }
            }
            changed = session.changed() => {
                if changed.is_err() || !session.borrow_and_update().is_authenticated {
                    warn("Session ended");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    poller.stop();
    let summary = poller.summary();
    info(&format!("{} unread notification(s)", summary.unread_count));
    Ok(())
}
