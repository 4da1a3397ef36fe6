mod app;
mod cli;
mod config;
mod input;
mod k8s;
mod model;
mod normalize;
mod schedule;
mod tree;
mod ui;
mod view;

use anyhow::{Context, Result};
use app::{App, AppCommand, FetchOutcome};
use chrono::Local;
use clap::Parser;
use cli::CliArgs;
use config::{ConfigSnapshot, RuntimeConfigWatcher, RuntimeSettings};
use crossterm::event::{Event, EventStream, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use k8s::KubeGateway;
use model::NamespaceScope;
use normalize::normalize_batch;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::fs::OpenOptions;
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior, interval, timeout};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use ui::Theme;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;
const CONFIG_RELOAD_INTERVAL: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter, args.log_file.as_deref())?;

    let mut config_watcher = RuntimeConfigWatcher::discover();
    let mut startup_warnings = Vec::new();
    let config = config_watcher.load_current().unwrap_or_else(|error| {
        warn!("config load failed: {error:#}");
        startup_warnings.push(format!("Config ignored: {}", compact_error(&error)));
        ConfigSnapshot::default()
    });
    let settings = RuntimeSettings::resolve(&args, &config);
    let theme = Theme::from_spec(&config.theme).unwrap_or_else(|error| {
        warn!("theme rejected: {error:#}");
        startup_warnings.push(format!("Theme ignored: {}", compact_error(&error)));
        Theme::default()
    });

    let gateway = KubeGateway::new(args.context.clone()).await?;
    if args.all_namespaces && args.namespace.is_some() {
        warn!("both --all-namespaces and --namespace were provided, using all namespaces");
    }
    let namespace_scope = resolve_namespace_scope(&args);
    info!(
        "watching {namespace_scope} on {} every {}s",
        gateway.cluster(),
        settings.refresh.as_secs()
    );

    let mut app = App::new(
        gateway.cluster().to_string(),
        gateway.context().to_string(),
        namespace_scope,
        settings.display_zone,
    );
    if let Some(status) = startup_status(&startup_warnings) {
        app.set_status(status);
    }

    run(&mut app, gateway, settings, theme, config_watcher).await
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();

    // The terminal is in raw mode, so logs only go somewhere when a file is given.
    let _ = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::sink).try_init(),
    };

    Ok(())
}

/// Every startup warning on one footer line, in the order they were raised.
fn startup_status(warnings: &[String]) -> Option<String> {
    if warnings.is_empty() {
        return None;
    }
    let lines = warnings
        .iter()
        .map(|warning| summarize_first_line(warning))
        .collect::<Vec<_>>();
    Some(lines.join("; "))
}

fn summarize_first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default().trim()
}

fn resolve_namespace_scope(args: &CliArgs) -> NamespaceScope {
    if args.all_namespaces {
        return NamespaceScope::All;
    }
    NamespaceScope::from_namespace(args.namespace.as_deref().unwrap_or_default())
}

async fn run(
    app: &mut App,
    gateway: KubeGateway,
    settings: RuntimeSettings,
    theme: Theme,
    config_watcher: RuntimeConfigWatcher,
) -> Result<()> {
    let mut terminal = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, gateway, settings, theme, config_watcher).await;
    let restore_result = restore_terminal(&mut terminal);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<TuiTerminal> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut TuiTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    gateway: KubeGateway,
    settings: RuntimeSettings,
    mut theme: Theme,
    mut config_watcher: RuntimeConfigWatcher,
) -> Result<()> {
    let mut reader = EventStream::new();
    let mut ticker = interval(settings.refresh);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut config_ticker = interval(CONFIG_RELOAD_INTERVAL);
    config_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let (fetch_tx, mut fetch_rx) = mpsc::unbounded_channel::<FetchOutcome>();

    loop {
        terminal
            .draw(|frame| ui::render(frame, app, &theme))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = input::map_key(app.mode(), key) {
                            debug!("action={action:?}");
                            let command = app.apply_action(action);
                            execute_app_command(app, command, &gateway, settings.timeout, &fetch_tx);
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        app.set_status(format!("terminal event error: {error}"));
                    }
                    None => {
                        app.set_status("terminal event stream closed");
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                let command = app.request_refresh();
                execute_app_command(app, command, &gateway, settings.timeout, &fetch_tx);
            }
            maybe_outcome = fetch_rx.recv() => {
                if let Some(outcome) = maybe_outcome {
                    app.apply_fetch_outcome(outcome, Local::now());
                }
            }
            _ = config_ticker.tick() => {
                reload_config(app, &mut config_watcher, &mut theme);
            }
        }
    }

    Ok(())
}

fn execute_app_command(
    app: &App,
    command: AppCommand,
    gateway: &KubeGateway,
    fetch_timeout: Duration,
    fetch_tx: &mpsc::UnboundedSender<FetchOutcome>,
) {
    match command {
        AppCommand::None => {}
        AppCommand::Fetch => spawn_fetch(
            gateway.clone(),
            app.namespace_scope().clone(),
            fetch_timeout,
            fetch_tx.clone(),
        ),
    }
}

fn spawn_fetch(
    gateway: KubeGateway,
    scope: NamespaceScope,
    fetch_timeout: Duration,
    tx: mpsc::UnboundedSender<FetchOutcome>,
) {
    tokio::spawn(async move {
        let started = Instant::now();
        let outcome = match timeout(fetch_timeout, gateway.list_all(&scope)).await {
            Ok(Ok(batch)) => {
                let records = normalize_batch(&batch);
                debug!(
                    "fetched {} records in {}ms",
                    records.len(),
                    started.elapsed().as_millis()
                );
                FetchOutcome::Batch(records)
            }
            Ok(Err(error)) => {
                warn!("refresh failed: {error:#}");
                FetchOutcome::Failed(compact_error(&error))
            }
            Err(_) => {
                warn!("refresh timed out after {}s", fetch_timeout.as_secs());
                FetchOutcome::Failed(format!(
                    "refresh timed out after {}s",
                    fetch_timeout.as_secs()
                ))
            }
        };
        let _ = tx.send(outcome);
    });
}

fn reload_config(app: &mut App, watcher: &mut RuntimeConfigWatcher, theme: &mut Theme) {
    match watcher.reload_if_changed() {
        Ok(Some(snapshot)) => match Theme::from_spec(&snapshot.theme) {
            Ok(reloaded) => {
                *theme = reloaded;
                let source = snapshot.source.as_deref().unwrap_or("defaults");
                info!("config reloaded from {source}");
                app.set_status(format!("Config reloaded from {source}"));
            }
            Err(error) => {
                warn!("theme rejected: {error:#}");
                app.set_status(format!("Theme ignored: {}", compact_error(&error)));
            }
        },
        Ok(None) => {}
        Err(error) => {
            warn!("config reload failed: {error:#}");
            app.set_status(format!("Config reload failed: {}", compact_error(&error)));
        }
    }
}

fn compact_error(error: &anyhow::Error) -> String {
    let mut out = Vec::new();
    for (index, cause) in error.chain().enumerate() {
        if index == 0 {
            out.push(cause.to_string());
        } else if index <= 2 {
            out.push(format!("caused by: {cause}"));
        } else {
            break;
        }
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{compact_error, resolve_namespace_scope, startup_status};
    use crate::cli::CliArgs;
    use crate::model::NamespaceScope;
    use anyhow::Context;
    use clap::Parser;

    #[test]
    fn namespace_flag_selects_scope() {
        let args = CliArgs::try_parse_from(["flowtop", "-n", "ops"]).expect("parse");
        assert_eq!(
            resolve_namespace_scope(&args),
            NamespaceScope::Named("ops".to_string())
        );
    }

    #[test]
    fn empty_or_missing_namespace_means_all() {
        let args = CliArgs::try_parse_from(["flowtop"]).expect("parse");
        assert_eq!(resolve_namespace_scope(&args), NamespaceScope::All);

        let args = CliArgs::try_parse_from(["flowtop", "-n", ""]).expect("parse");
        assert_eq!(resolve_namespace_scope(&args), NamespaceScope::All);

        let args = CliArgs::try_parse_from(["flowtop", "-n", "ops", "-A"]).expect("parse");
        assert_eq!(resolve_namespace_scope(&args), NamespaceScope::All);
    }

    #[test]
    fn startup_status_keeps_every_warning() {
        assert_eq!(startup_status(&[]), None);

        let warnings = vec![
            "Config ignored: failed to parse config flowtop.yaml\ncaused by: bad indent".to_string(),
            "Theme ignored: invalid theme.accent colour \"#zz\"".to_string(),
        ];
        assert_eq!(
            startup_status(&warnings).as_deref(),
            Some(
                "Config ignored: failed to parse config flowtop.yaml; Theme ignored: invalid theme.accent colour \"#zz\""
            )
        );
    }

    #[test]
    fn compact_error_keeps_two_causes() {
        let error = Err::<(), _>(anyhow::anyhow!("tcp reset"))
            .context("request failed")
            .context("failed to list jobs")
            .context("refresh")
            .expect_err("error");
        assert_eq!(
            compact_error(&error),
            "refresh\ncaused by: failed to list jobs\ncaused by: request failed"
        );
    }
}
