//! Periodic membership re-announcement.
//!
//! The relay may silently forget a member. Every tick re-asserts membership
//! while joined, or forces a reconnect attempt otherwise. The first tick
//! fires immediately.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::connection::{ConnectionManager, LinkState};

/// What the heartbeat drives.
pub trait HeartbeatTarget: Send + Sync + 'static {
    fn link_state(&self) -> LinkState;
    fn announce(&self) -> bool;
    fn connect(&self);
}

impl HeartbeatTarget for ConnectionManager {
    fn link_state(&self) -> LinkState {
        ConnectionManager::link_state(self)
    }

    fn announce(&self) -> bool {
        ConnectionManager::announce(self)
    }

    fn connect(&self) {
        ConnectionManager::connect(self)
    }
}

/// Shortest accepted tick. Shorter intervals, zero included, are raised to it.
pub const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// Running heartbeat. Stops when dropped.
pub struct PresenceHeartbeat {
    interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl PresenceHeartbeat {
    /// Spawn the ticking task. Must be called from within a tokio runtime.
    pub fn start<T: HeartbeatTarget>(target: T, interval: Duration) -> Self {
        if interval < MIN_HEARTBEAT_INTERVAL {
            warn!(
                requested_ms = interval.as_millis() as u64,
                "Heartbeat interval too short, using the minimum"
            );
        }
        let interval = interval.max(MIN_HEARTBEAT_INTERVAL);
        info!(interval_secs = interval.as_secs_f64(), "Presence heartbeat started");
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tick(&target);
            }
        });
        Self {
            interval,
            handle: Some(handle),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("Presence heartbeat stopped");
        }
    }
}

impl Drop for PresenceHeartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}

fn tick<T: HeartbeatTarget>(target: &T) {
    match target.link_state() {
        LinkState::Joined => {
            debug!("Heartbeat: re-announcing membership");
            target.announce();
        }
        state => {
            debug!(?state, "Heartbeat: not joined, forcing reconnect");
            target.connect();
        }
    }
}
