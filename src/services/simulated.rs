// SimulatedMiner - an offline MinerClient
//
// Walks a fake campaign (two drops per game) one simulated minute per tick,
// raising the same events a real client would. Used by the binary and by
// tests that need a client with real suspension points.

use super::{MinerClient, MinerError, MinerEvents};
use crate::config::SettingsStore;
use crate::models::{DropInfo, InventoryItem};
use crate::ui::bridge::StopSignal;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;

/// Games mined when the settings list none
pub const DEFAULT_GAMES: &[&str] = &["Rust", "Valorant"];

/// Simulated minutes needed per drop
pub const DROP_MINUTES: u32 = 5;

const DROPS_PER_GAME: usize = 2;

pub struct SimulatedMiner {
    settings: Arc<dyn SettingsStore>,
    events: Arc<dyn MinerEvents>,
    games: Vec<String>,
    minute: Duration,
    running: AtomicBool,
    stop_tx: watch::Sender<bool>,
    shutdown: Option<StopSignal>,
}

impl SimulatedMiner {
    /// Create a miner for `games` (falls back to [`DEFAULT_GAMES`] when empty)
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        events: Arc<dyn MinerEvents>,
        games: Vec<String>,
    ) -> Self {
        let games = if games.is_empty() {
            DEFAULT_GAMES.iter().map(|game| game.to_string()).collect()
        } else {
            games
        };

        let (stop_tx, _) = watch::channel(false);
        Self {
            settings,
            events,
            games,
            minute: Duration::from_millis(500),
            running: AtomicBool::new(false),
            stop_tx,
            shutdown: None,
        }
    }

    /// Wall-clock length of one simulated minute
    pub fn with_minute(mut self, minute: Duration) -> Self {
        self.minute = minute;
        self
    }

    /// Also end the run when the background loop shuts down
    pub fn with_stop_signal(mut self, signal: StopSignal) -> Self {
        self.shutdown = Some(signal);
        self
    }

    fn campaign(&self) -> Vec<DropInfo> {
        self.games
            .iter()
            .flat_map(|game| {
                (1..=DROPS_PER_GAME).map(move |n| DropInfo {
                    game: game.clone(),
                    campaign: format!("{} Drops", game),
                    name: format!("{} Reward #{}", game, n),
                    current_minutes: 0,
                    required_minutes: DROP_MINUTES,
                })
            })
            .collect()
    }

    fn inventory(&self) -> Vec<InventoryItem> {
        self.games
            .iter()
            .map(|game| InventoryItem {
                game: game.clone(),
                campaign: format!("{} Drops", game),
                claimed: 0,
                total: DROPS_PER_GAME,
            })
            .collect()
    }

    async fn shutdown_requested(&self) {
        match &self.shutdown {
            Some(signal) => signal.stopped().await,
            None => std::future::pending().await,
        }
    }

    async fn mine(&self, stop_rx: &mut watch::Receiver<bool>) -> Result<(), MinerError> {
        let mut inventory = self.inventory();
        self.events.on_inventory(inventory.clone());

        let mut ticker = tokio::time::interval(self.minute);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        for mut reward in self.campaign() {
            let channel = format!("{}_streamer", reward.game.to_lowercase().replace(' ', "_"));
            self.events.on_channel(channel.clone());
            self.events.on_status(format!("Watching {}", channel));
            self.events
                .on_log(format!("Watching {} for {}", channel, reward.name));

            while !reward.is_complete() {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stop_rx.wait_for(|stopped| *stopped) => {
                        self.events.on_log("Mining stopped".to_string());
                        return Ok(());
                    }
                    _ = self.shutdown_requested() => {
                        self.events.on_log("Mining interrupted by shutdown".to_string());
                        return Ok(());
                    }
                }

                reward.current_minutes += 1;
                self.events.on_progress(
                    u64::from(reward.current_minutes),
                    u64::from(reward.required_minutes),
                );
                self.events.on_drop(reward.clone());
            }

            self.events.on_log(format!("Claimed {}", reward.name));
            self.events
                .on_notify("Drop claimed".to_string(), reward.name.clone());

            if let Some(item) = inventory
                .iter_mut()
                .find(|item| item.game == reward.game)
            {
                item.claimed += 1;
            }
            self.events.on_inventory(inventory.clone());
        }

        self.events.on_status("All drops claimed".to_string());
        Ok(())
    }
}

#[async_trait]
impl MinerClient for SimulatedMiner {
    async fn login(&self) -> Result<(), MinerError> {
        let token = self.settings.oauth_token();
        if token.is_empty() {
            return Err(MinerError::NotLoggedIn);
        }
        if token.chars().any(char::is_whitespace) {
            return Err(MinerError::LoginRejected("token contains whitespace".to_string()));
        }

        self.events.on_log("Logged in".to_string());
        self.events.on_status("Logged in".to_string());
        Ok(())
    }

    async fn start(&self) -> Result<(), MinerError> {
        if self.settings.oauth_token().is_empty() {
            return Err(MinerError::NotLoggedIn);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            self.events.on_log("Mining already running".to_string());
            return Ok(());
        }

        self.stop_tx.send_replace(false);
        let mut stop_rx = self.stop_tx.subscribe();

        self.events.on_log("Mining started".to_string());
        let result = self.mine(&mut stop_rx).await;

        self.running.store(false, Ordering::SeqCst);
        self.events.on_status("Idle".to_string());
        result
    }

    async fn stop(&self) -> Result<(), MinerError> {
        if self.running.load(Ordering::SeqCst) {
            self.stop_tx.send_replace(true);
            self.events.on_log("Stop requested".to_string());
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingEvents {
        events: Mutex<Vec<String>>,
    }

    impl RecordingEvents {
        fn record(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }

        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.events.lock().unwrap())
        }
    }

    impl MinerEvents for RecordingEvents {
        fn on_log(&self, message: String) {
            self.record(format!("log:{}", message));
        }
        fn on_status(&self, status: String) {
            self.record(format!("status:{}", status));
        }
        fn on_progress(&self, current: u64, total: u64) {
            self.record(format!("progress:{}/{}", current, total));
        }
        fn on_channel(&self, channel: String) {
            self.record(format!("channel:{}", channel));
        }
        fn on_drop(&self, drop: DropInfo) {
            self.record(format!("drop:{}", drop.name));
        }
        fn on_inventory(&self, inventory: Vec<InventoryItem>) {
            let claimed: usize = inventory.iter().map(|item| item.claimed).sum();
            self.record(format!("inventory:{}", claimed));
        }
        fn on_notify(&self, title: String, message: String) {
            self.record(format!("notify:{}:{}", title, message));
        }
    }

    struct FixedToken(String);

    impl SettingsStore for FixedToken {
        fn oauth_token(&self) -> String {
            self.0.clone()
        }
        fn set_oauth_token(&self, _token: &str) {}
        fn notifications_enabled(&self) -> bool {
            true
        }
        fn auto_start(&self) -> bool {
            false
        }
        fn save(&self, _force: bool) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn miner_with_minute(
        token: &str,
        games: &[&str],
        minute: Duration,
    ) -> (Arc<SimulatedMiner>, Arc<RecordingEvents>) {
        let events = Arc::new(RecordingEvents::default());
        let miner = SimulatedMiner::new(
            Arc::new(FixedToken(token.to_string())),
            events.clone(),
            games.iter().map(|g| g.to_string()).collect(),
        )
        .with_minute(minute);
        (Arc::new(miner), events)
    }

    fn fast_miner(token: &str, games: &[&str]) -> (Arc<SimulatedMiner>, Arc<RecordingEvents>) {
        miner_with_minute(token, games, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_login_requires_token() {
        let (miner, _events) = fast_miner("", &["Rust"]);
        assert_eq!(miner.login().await, Err(MinerError::NotLoggedIn));
        assert_eq!(miner.start().await, Err(MinerError::NotLoggedIn));
    }

    #[tokio::test]
    async fn test_login_rejects_malformed_token() {
        let (miner, _events) = fast_miner("abc 123", &["Rust"]);
        assert!(matches!(
            miner.login().await,
            Err(MinerError::LoginRejected(_))
        ));
    }

    #[tokio::test]
    async fn test_full_campaign_claims_every_drop() {
        let (miner, events) = fast_miner("abc123", &["Rust"]);

        miner.login().await.unwrap();
        miner.start().await.unwrap();

        let recorded = events.take();
        assert_eq!(recorded[0], "log:Logged in");
        assert!(recorded.contains(&"channel:rust_streamer".to_string()));
        assert!(recorded.contains(&format!("progress:{}/{}", DROP_MINUTES, DROP_MINUTES)));
        assert!(recorded.contains(&"notify:Drop claimed:Rust Reward #1".to_string()));
        assert!(recorded.contains(&"notify:Drop claimed:Rust Reward #2".to_string()));
        assert!(recorded.contains(&"inventory:2".to_string()));
        assert_eq!(recorded.last().unwrap(), "status:Idle");
        assert!(!miner.is_running());
    }

    #[tokio::test]
    async fn test_stop_ends_run_at_next_suspension_point() {
        let (miner, events) = miner_with_minute("abc123", &["Rust"], Duration::from_secs(60));

        let runner = {
            let miner = miner.clone();
            tokio::spawn(async move { miner.start().await })
        };

        while !miner.is_running() {
            tokio::task::yield_now().await;
        }
        miner.stop().await.unwrap();

        runner.await.unwrap().unwrap();
        let recorded = events.take();
        assert!(recorded.contains(&"log:Stop requested".to_string()));
        assert!(recorded.contains(&"log:Mining stopped".to_string()));
        assert!(!recorded.iter().any(|e| e.starts_with("notify:")));
        assert!(!miner.is_running());
    }

    #[tokio::test]
    async fn test_default_games_when_none_configured() {
        let (miner, _events) = fast_miner("abc123", &[]);
        let games: Vec<_> = miner.inventory().into_iter().map(|i| i.game).collect();
        assert_eq!(games, DEFAULT_GAMES);
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        let (miner, events) = fast_miner("abc123", &["Rust"]);
        miner.stop().await.unwrap();
        assert!(events.take().is_empty());
    }
}
