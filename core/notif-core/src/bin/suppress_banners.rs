//! One-shot utility that turns off native notification banners for every app.
//!
//! Safe to re-run: apps that already have banners off are left alone, and
//! nothing is written or restarted when there is nothing to change.

use notif_core::banners::{restart_notification_service, suppress_banners};
use notif_core::paths::{banner_prefs_path, user_home};
use notif_core::BridgeError;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let home = match user_home() {
        Ok(home) => home,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    };
    let path = banner_prefs_path(&home);

    match suppress_banners(&path) {
        Ok(outcome) if outcome.rewritten() => {
            for bundle_id in &outcome.cleared {
                tracing::debug!(bundle_id = %bundle_id, "Banners disabled");
            }
            restart_notification_service();
        }
        Ok(_) => tracing::info!("Banners already disabled for every app"),
        Err(BridgeError::FileNotFound(path)) => {
            eprintln!("Plist not found: {}", path.display());
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    }
}
