use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};

use gearpump_dashboard::controllers::AppDetailController;
use gearpump_dashboard::models::{AppId, Models, WorkerId};
use gearpump_dashboard::rest::{ClientConfig, RestClient, Scope};
use gearpump_dashboard::Result;

#[derive(Parser, Debug)]
#[command(name = "gearpump-dashboard")]
#[command(about = "Inspect and watch a streaming cluster through its dashboard REST API")]
struct Args {
    /// Address of the dashboard service
    #[arg(short, long, default_value = "http://127.0.0.1:8090")]
    url: String,

    /// Poll interval of live updates, in milliseconds
    #[arg(short, long, default_value = "2000")]
    interval: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the master and its cluster
    Master,
    /// List workers
    Workers,
    /// Show one worker, optionally with its metrics
    Worker {
        id: WorkerId,
        #[arg(long)]
        metrics: bool,
    },
    /// List applications
    Apps,
    /// Show one application with its stalling tasks
    App { id: AppId },
    /// Follow an application until interrupted
    WatchApp { id: AppId },
    /// Follow the worker list until interrupted
    WatchWorkers,
}

fn print<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(err) => error!("Could not render output: {}", err),
    }
}

async fn run(models: Models, command: Command) -> Result<()> {
    match command {
        Command::Master => print(&models.master().await?.data()),
        Command::Workers => print(&models.workers().await?.data()),
        Command::Worker { id, metrics } => {
            print(&models.worker_detail(id).await?.data());
            if metrics {
                print(&models.worker_metrics(id, true).await?.data());
            }
        }
        Command::Apps => print(&models.apps().await?.data()),
        Command::App { id } => {
            let (app, tasks) = futures::join!(models.app_detail(id), models.app_stalling_tasks(id));
            print(&app?.data());
            print(&tasks?.data());
        }
        Command::WatchApp { id } => {
            let ctrl = AppDetailController::load(&models, id).await?;
            let mut ticker = tokio::time::interval(models.rest().poll_interval());
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    _ = ticker.tick() => {
                        ctrl.with_view(|v| {
                            info!(
                                "app {} {} clock={} uptime={} stalling={} {}",
                                v.app.id(),
                                v.app.status,
                                v.dag.clock(),
                                v.uptime_compact,
                                v.stalling_processor_count(),
                                v.app_clock_concern.as_deref().unwrap_or(""),
                            );
                        });
                    }
                }
            }
            ctrl.destroy();
        }
        Command::WatchWorkers => {
            let workers = models.workers().await?;
            print(&workers.data());
            let scope = Scope::new();
            workers.subscribe(&scope, |workers| print(&workers));
            // a failed ctrl-c handler ends the watch as well
            let _ = tokio::signal::ctrl_c().await;
            scope.destroy();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = ClientConfig {
        base_url: args.url,
        poll_interval: Duration::from_millis(args.interval.max(1)),
    };
    info!("Using dashboard at {}", config.base_url);
    let models = Models::new(RestClient::new(&config));

    if let Err(err) = run(models, args.command).await {
        error!("{}", err);
        std::process::exit(1);
    }
}
