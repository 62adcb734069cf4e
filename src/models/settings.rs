use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// User settings persisted in `settings.yaml`
///
/// Contains the login token and mining preferences. Missing keys fall back
/// to their defaults so older files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    /// OAuth token; empty means logged out
    #[serde(rename = "OAuth Token", default)]
    pub oauth_token: String,

    /// Games to mine first, in priority order
    #[serde(rename = "Priority Games", default)]
    pub priority_games: IndexSet<String>,

    /// Games never to mine
    #[serde(rename = "Exclude Games", default)]
    pub exclude_games: IndexSet<String>,

    /// Raise a platform notification when a drop is claimed
    #[serde(rename = "Notifications", default = "default_true")]
    pub notifications: bool,

    /// Start mining right after launch when logged in
    #[serde(rename = "Auto Start", default)]
    pub auto_start: bool,

    #[serde(rename = "Debug Mode", default)]
    pub debug_mode: bool,

    /// How long shutdown waits for background work to drain
    #[serde(rename = "Shutdown Timeout", default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            oauth_token: String::new(),
            priority_games: IndexSet::new(),
            exclude_games: IndexSet::new(),
            notifications: true,
            auto_start: false,
            debug_mode: false,
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_shutdown_timeout() -> u64 {
    5
}

impl UserSettings {
    pub fn is_logged_in(&self) -> bool {
        !self.oauth_token.is_empty()
    }

    /// Priority games that are not excluded, in priority order
    pub fn mineable_games(&self) -> Vec<String> {
        self.priority_games
            .iter()
            .filter(|game| !self.exclude_games.contains(*game))
            .cloned()
            .collect()
    }
}
