mod app;
mod handler;
mod tui;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use futures_util::StreamExt;
use mindcare_core::{
    ChatStream, Config, Fragment, FragmentStream, GeminiClient, RemoteCallError, Startup,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use app::App;
use handler::handle_event;

const TICK_RATE: Duration = Duration::from_millis(300);

#[derive(Parser)]
#[command(name = "mindcare")]
#[command(about = "Supportive mental health chat with a mood journal, in your terminal")]
#[command(version)]
struct Cli {
    /// Gemini model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature
    #[arg(short, long)]
    temperature: Option<f32>,

    /// Disable Google Search grounding
    #[arg(long)]
    no_web_search: bool,

    /// Directory for log files
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Write these options to the config file so later runs use them
    #[arg(long)]
    save_config: bool,
}

impl Cli {
    /// Layer command line options over the config file.
    fn apply(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.model = Some(model.clone());
        }
        if let Some(temperature) = self.temperature {
            config.temperature = Some(temperature);
        }
        if self.no_web_search {
            config.web_search = Some(false);
        }
    }
}

/// Log to a daily file; stderr is owned by the terminal UI.
fn init_logging(log_dir: Option<PathBuf>) -> Result<WorkerGuard> {
    let log_dir = match log_dir {
        Some(dir) => dir,
        None => dirs::data_local_dir()
            .ok_or_else(|| anyhow!("Could not determine data directory"))?
            .join("mindcare")
            .join("logs"),
    };
    std::fs::create_dir_all(&log_dir)?;

    let appender = tracing_appender::rolling::daily(&log_dir, "mindcare.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let env_filter =
        EnvFilter::try_from_env("MINDCARE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.log_dir.clone())?;

    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not read config, using defaults");
        Config::new()
    });
    cli.apply(&mut config);
    if cli.save_config {
        config.save().context("Failed to save config")?;
        tracing::info!("config saved");
    }
    let settings = config.settings();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        model = %settings.model,
        web_search = settings.web_search,
        "mindcare starting"
    );

    let model_label = format!("Gemini: {}", settings.model);
    let app = App::from_startup(Startup::from_env(), |key| {
        Arc::new(GeminiClient::new(key, settings.clone())) as Arc<dyn ChatStream>
    })
    .with_model_label(model_label);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, app).await;
    tui::restore()?;

    if let Err(e) = &result {
        tracing::error!(error = %e, "mindcare exited with an error");
    }
    result
}

async fn run(terminal: &mut tui::Tui, mut app: App) -> Result<()> {
    let mut events = tui::EventHandler::new(TICK_RATE);
    // The reply stream of the turn in progress, if any.
    let mut stream: Option<FragmentStream> = None;

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        tokio::select! {
            event = events.next() => {
                let Some(event) = event else { break };
                if let Some(started) = handle_event(&mut app, event) {
                    stream = Some(started);
                }
            }
            item = next_fragment(&mut stream) => {
                if app.on_item(item) {
                    stream = None;
                }
            }
        }
    }

    // Dropping an unfinished stream cancels the request.
    if stream.is_some() {
        tracing::info!("quitting with a reply still streaming");
    }
    Ok(())
}

/// Next item of the active stream; never resolves while idle.
async fn next_fragment(
    stream: &mut Option<FragmentStream>,
) -> Option<Result<Fragment, RemoteCallError>> {
    match stream.as_mut() {
        Some(s) => s.next().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_options_override_config_file() {
        let mut config = Config {
            model: Some("from-file".into()),
            temperature: Some(0.2),
            web_search: Some(true),
            base_url: None,
        };
        let cli = Cli::parse_from(["mindcare", "--model", "gemini-test", "--no-web-search"]);
        cli.apply(&mut config);

        let settings = config.settings();
        assert_eq!(settings.model, "gemini-test");
        assert_eq!(settings.temperature, 0.2);
        assert!(!settings.web_search);
        assert!(!cli.save_config);
    }

    #[test]
    fn absent_options_leave_config_alone() {
        let mut config = Config::new();
        Cli::parse_from(["mindcare", "--save-config"]).apply(&mut config);
        assert_eq!(config, Config::new());
    }
}
