use anyhow::Context;
use console_session::clock::{Clock, TokioClock};
use console_session::config::Config;
use console_session::session::{AlertEvent, IdleAlert, SessionContext, SessionTracker, View};
use console_session::stub::{self, StubState};
use console_session::HttpConsoleApi;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Start the stub controller and return its base URL
async fn start_demo_controller(config: &Config) -> anyhow::Result<String> {
    let addr: SocketAddr = format!("{}:{}", config.demo.host, config.demo.port).parse()?;
    let state = StubState::new(config.demo.session_timeout);
    let (bound, _handle) = stub::serve(addr, state)
        .await
        .context("Failed to start stub controller")?;
    info!(
        "Demo mode: stub controller at {} (session timeout {}s)",
        bound, config.demo.session_timeout
    );
    Ok(format!("http://{}", bound))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "idle_console=debug,console_session=debug,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = Config::from_env();
    info!(
        "Loaded configuration: warning window {:?}, tick {:?}",
        config.idle.warning_window, config.idle.tick
    );

    let base_url = if config.demo.enabled {
        start_demo_controller(&config).await?
    } else {
        config.api.base_url.clone()
    };
    let clock: Arc<dyn Clock> = Arc::new(TokioClock);
    let tracker = Arc::new(SessionTracker::with_warning_window(
        clock.clone(),
        config.idle.warning_window,
    ));
    let api = Arc::new(HttpConsoleApi::new(
        &base_url,
        config.api.token.clone(),
        config.api.request_timeout,
        tracker.clone(),
    )?);
    info!("Controller: {}", api.base_url());
    let context = Arc::new(SessionContext::new(api, tracker.clone()));

    let (events_tx, mut events_rx) = mpsc::channel(32);
    let alert = IdleAlert::new(clock, context.clone(), events_tx)
        .with_tick(config.idle.tick)
        .spawn(tracker.subscribe());

    context.load().await;
    if context.current_view() == View::Loading {
        for notification in context.notifications().await {
            error!("{} {}", notification.title, notification.detail);
        }
        anyhow::bail!("Console configuration could not be loaded");
    }

    if let Some(user) = context.logged_in_user().await {
        info!("Logged in as {}", user.username);
    }
    if let Some(about) = context.about().await {
        info!(
            "Controller version {} (ansible {})",
            about.version,
            about.ansible_version.as_deref().unwrap_or("unknown")
        );
    }
    info!("Commands: [c]ontinue, [r]efresh, [l]ogout, [q]uit");

    let mut view = context.view();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if *view.borrow_and_update() == View::Login {
            break;
        }

        tokio::select! {
            Some(event) = events_rx.recv() => match event {
                AlertEvent::Show { remaining } => {
                    warn!("Your session will expire in {} seconds. Continue? [c]", remaining);
                }
                AlertEvent::Hide { .. } => info!("Idle session prompt closed"),
            },
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match line.trim() {
                    "c" | "continue" => alert.continue_session().await,
                    "r" | "refresh" => context.refresh_session().await,
                    "l" | "logout" => context.handle_logout().await,
                    "q" | "quit" => break,
                    "" => {}
                    other => warn!("Unknown command: {}", other),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    for notification in context.notifications().await {
        warn!("{} {}", notification.title, notification.detail);
    }

    alert.shutdown();
    tracker.shutdown();
    info!("Console session closed");
    Ok(())
}
