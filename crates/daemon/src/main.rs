// Copyright (C) 2025 Launchpad Contributors
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::{eyre, Report};
use launchpad_common::model::App;
use launchpad_kernel::clock::SystemClock;
use launchpad_kernel::launcher::LoggingOfferReviver;
use launchpad_kernel::task_factory::DefaultTaskFactory;
use launchpad_kernel::task_launcher::{LoggingTaskLauncher, TaskLauncher};
use launchpad_kernel::task_store::InMemoryTaskStore;
use launchpad_kernel::task_tracker::TaskTracker;
use launchpad_kernel::{AppScheduler, TaskStore, TaskStoreBackend};
use mimalloc::MiMalloc;
use tracing::{error, info};

mod args;
mod config;
mod offer_listener;

use args::Args;
use config::DaemonConfig;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn setup_logging(debug: bool, json: bool) -> Result<(), Report> {
    let filter = if debug { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_thread_names(true);

    if json {
        subscriber
            .json()
            .try_init()
            .map_err(|e| eyre!("unable to configure logging: {e}"))?;
    } else {
        subscriber
            .compact()
            .try_init()
            .map_err(|e| eyre!("unable to configure logging: {e}"))?;
    }
    Ok(())
}

fn build_task_store(config: &launchpad_kernel::Config) -> Result<Arc<dyn TaskStore>, Report> {
    match config.task_store_backend {
        TaskStoreBackend::Memory => Ok(Arc::new(InMemoryTaskStore::new())),
        TaskStoreBackend::Fjall => {
            #[cfg(feature = "fjall-store")]
            {
                let data_dir = config
                    .task_store_data_dir
                    .as_ref()
                    .ok_or_else(|| eyre!("taskStoreBackend=fjall requires taskStoreDataDir"))?;
                let store = launchpad_kernel::FjallTaskStore::open(data_dir)
                    .map_err(|e| eyre!("failed to open fjall task store: {e}"))?;
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "fjall-store"))]
            {
                Err(eyre!(
                    "taskStoreBackend=fjall requires building with the fjall-store feature"
                ))
            }
        }
    }
}

fn spawn_stats_loop(scheduler: Arc<AppScheduler>, interval: Duration, kill_switch: Arc<AtomicBool>) {
    std::thread::Builder::new()
        .name("launchpad-stats".to_string())
        .spawn(move || loop {
            if kill_switch.load(Ordering::Relaxed) {
                return;
            }
            std::thread::sleep(interval);
            if kill_switch.load(Ordering::Relaxed) {
                return;
            }
            let snapshot = scheduler.list();
            info!(
                app_count = snapshot.len(),
                tasks_left_to_launch = snapshot.iter().map(|q| q.tasks_left_to_launch).sum::<u32>(),
                tasks_in_flight = snapshot.iter().map(|q| q.task_launches_in_flight).sum::<u32>(),
                "scheduler snapshot"
            );
        })
        .expect("failed to spawn stats thread");
}

fn main() -> Result<(), Report> {
    color_eyre::install()?;
    let args = Args::parse();
    setup_logging(args.debug, args.log_json)?;

    let config = DaemonConfig::load(&args).map_err(|e| eyre!("failed to load configuration: {e}"))?;
    info!(backend = ?config.scheduler.task_store_backend, "launchpad daemon starting");

    let task_store = build_task_store(&config.scheduler)?;
    let task_tracker = Arc::new(
        TaskTracker::new(task_store).map_err(|e| eyre!("failed to load task store: {e}"))?,
    );

    let task_launcher: Arc<dyn TaskLauncher> = Arc::new(LoggingTaskLauncher);

    let scheduler = Arc::new(AppScheduler::new(
        Arc::new(SystemClock),
        Arc::new(DefaultTaskFactory),
        Arc::new(LoggingOfferReviver),
        task_tracker,
        task_launcher,
        config.scheduler.scheduler_config(),
    ));

    for seed in config.apps.clone() {
        let instances = seed.instances;
        let app: App = seed.into_app();
        let queued = scheduler.add(app.clone(), instances);
        info!(app_id = app.id, queued = queued.tasks_left_to_launch, "app registered at startup");
    }

    let kill_switch = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGTERM, kill_switch.clone())?;
    signal_hook::flag::register(signal_hook::consts::SIGINT, kill_switch.clone())?;

    spawn_stats_loop(
        scheduler.clone(),
        Duration::from_secs(config.scheduler.stats_log_interval_seconds),
        kill_switch.clone(),
    );

    let listener_handle = offer_listener::spawn(args.offer_listen.clone(), scheduler.clone(), kill_switch.clone())
        .map_err(|e| eyre!("failed to bind offer listener on {}: {e}", args.offer_listen))?;

    info!(offer_listen = args.offer_listen, "daemon started");

    while !kill_switch.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(200));
    }

    info!("shutdown signal received, draining launchers");
    for queued in scheduler.list() {
        if let Err(e) = scheduler.purge(&queued.app.id) {
            error!(app_id = queued.app.id, error = %e, "failed to purge app during shutdown");
        }
    }

    if let Err(e) = listener_handle.join() {
        error!(?e, "offer listener thread panicked");
    }

    info!("done");
    Ok(())
}
