use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;

use swingbot::alerts::{LogNotifier, Notifier, TelegramNotifier};
use swingbot::broker::broker_for;
use swingbot::config::Settings;
use swingbot::data::NseClient;
use swingbot::phases::PhaseManager;
use swingbot::scheduler::{wait_until, DailySchedule};

#[derive(Parser, Debug)]
#[command(name = "swingbot", about = "Swing-trading automation for NSE equities")]
struct Cli {
    /// Broker to route orders through: zerodha, upstox, or paper
    #[arg(long, default_value = "paper")]
    broker: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("failed to load settings: {e}");
            return ExitCode::FAILURE;
        }
    };

    let broker = match broker_for(&cli.broker, &settings) {
        Ok(broker) => broker,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(broker = broker.name(), "swingbot starting");

    if settings.watchlist.is_empty() {
        tracing::warn!("watchlist is empty; screening will shortlist nothing");
    }

    let notifier: Arc<dyn Notifier> = match settings.telegram.clone() {
        Some(telegram) => Arc::new(TelegramNotifier::new(telegram)),
        None => Arc::new(LogNotifier),
    };

    let mut phases = match PhaseManager::new(
        settings.clone(),
        settings.watchlist.clone(),
        Arc::new(NseClient::new()),
        broker,
        notifier,
    ) {
        Ok(phases) => phases,
        Err(e) => {
            tracing::error!("failed to initialize: {e}");
            return ExitCode::FAILURE;
        }
    };

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c, finishing current phase before exit");
            let _ = shutdown_tx.send(true);
        }
    });

    // One schedule per trading day; a running phase always completes
    // before shutdown is honored.
    'days: loop {
        let schedule = DailySchedule::build(&settings.schedule, &mut rand::thread_rng());
        let now = chrono::Local::now().time();
        tracing::info!(tasks = schedule.tasks().len(), "daily schedule built");

        let due: Vec<_> = schedule.remaining(now).copied().collect();
        for task in due {
            if !wait_until(task.time, &mut shutdown_rx).await {
                break 'days;
            }
            tracing::info!(phase = ?task.phase, time = %task.time, "running phase");
            phases.run_phase(task.phase).await;
            if *shutdown_rx.borrow() {
                break 'days;
            }
        }

        // Day done; park until just after midnight
        let midnight = chrono::NaiveTime::from_hms_opt(0, 0, 30).unwrap_or_default();
        tracing::info!("daily cycle complete, waiting for the next day");
        tokio::select! {
            _ = tokio::time::sleep(until_next(midnight)) => {}
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break 'days;
                }
            }
        }
    }

    tracing::info!("swingbot stopped");
    ExitCode::SUCCESS
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "swingbot=info".into()),
        )
        .init();
}

/// Duration until the next occurrence of a time of day
fn until_next(target: chrono::NaiveTime) -> tokio::time::Duration {
    let now = chrono::Local::now().time();
    let delta = target.signed_duration_since(now);
    let delta = if delta <= chrono::Duration::zero() {
        delta + chrono::Duration::days(1)
    } else {
        delta
    };
    delta.to_std().unwrap_or(tokio::time::Duration::from_secs(60))
}
