use std::time::Duration;
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, error, info};

use super::service::AuthService;

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Periodically delete expired verification codes and refresh sessions.
///
/// The first pass runs immediately. The task ends once `shutdown` turns `true`
/// or its sender is dropped.
pub fn spawn_sweeper(
    auth: AuthService,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match auth.sweep_expired().await {
                        Ok(report) if report.codes + report.sessions > 0 => info!(
                            codes = report.codes,
                            sessions = report.sessions,
                            "swept expired rows"
                        ),
                        Ok(_) => debug!("nothing to sweep"),
                        Err(err) => error!("sweep failed: {err:#}"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("sweeper stopped");
                        break;
                    }
                }
            }
        }
    })
}
