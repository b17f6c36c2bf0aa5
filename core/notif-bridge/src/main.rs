//! notif-bridge: mirrors the macOS notification center into a JSON cache for SketchyBar.
//!
//! ## Subcommands
//!
//! - (none): read the store once, publish the cache and print it to stdout
//! - `dismiss <id|all>`: delete records, run side actions, republish and signal
//! - `watch`: run the change-detection loop until killed

mod logging;
mod runtime;

use clap::{Parser, Subcommand};
use notif_core::gateway::MutationGateway;
use notif_core::store::NotificationStore;
use notif_core::types::DismissTarget;
use notif_core::watcher::{self, wake_source_for};

use crate::runtime::Runtime;

#[derive(Parser)]
#[command(name = "notif-bridge")]
#[command(about = "Notification center bridge for SketchyBar")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Dismiss one notification by record id, or every notification with `all`
    Dismiss {
        #[arg(value_name = "ID|all")]
        target: DismissTarget,
    },

    /// Watch the store and republish the cache whenever the record set changes
    Watch,
}

fn main() {
    let cli = Cli::parse();

    let (config, config_problem) = runtime::load();
    let _logging_guard = logging::init(config.log_dir.as_deref());
    runtime::report_config_problem(config_problem);

    let runtime = match Runtime::build(config.clone()) {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!(error = %err, "notif-bridge startup failed");
            if cli.command.is_none() {
                // The list command still owes its caller a snapshot.
                print_listing(runtime::degraded_listing(&config));
                return;
            }
            std::process::exit(1);
        }
    };

    match cli.command {
        None => list(&runtime),
        Some(Commands::Dismiss { target }) => {
            let gateway = MutationGateway::new(
                &runtime.store,
                &runtime.actions,
                &runtime.publisher,
                &runtime.notifier,
            );
            let snapshot = gateway.dismiss(target);
            tracing::debug!(remaining = snapshot.len(), "Dismiss complete");
        }
        Some(Commands::Watch) => {
            let mut wake = wake_source_for(&runtime.config.watch, runtime.wal_path());
            watcher::watch(
                &runtime.store,
                &runtime.publisher,
                &runtime.notifier,
                wake.as_mut(),
                &runtime.config.watch,
            );
        }
    }
}

fn list(runtime: &Runtime) {
    let snapshot = runtime.store.read_all();
    print_listing(runtime::publish_listing(&snapshot, &runtime.publisher));
}

fn print_listing(listing: notif_core::Result<String>) {
    match listing {
        Ok(json) => println!("{json}"),
        Err(err) => {
            tracing::error!(error = %err, "Failed to render snapshot");
            std::process::exit(1);
        }
    }
}
