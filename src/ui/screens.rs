// Screens - presentation seam of the UI thread
//
// The controller drives screens only through these traits. Implementations
// are not required to be Send: a ScreenManager is created on the UI thread
// and never leaves it.

use crate::models::{DropInfo, InventoryItem, LogRing};
use std::fmt;
use std::str::FromStr;

/// Navigable screens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Home,
    Login,
    Inventory,
    Settings,
    Channels,
    Logs,
}

impl Screen {
    pub const ALL: [Screen; 6] = [
        Screen::Home,
        Screen::Login,
        Screen::Inventory,
        Screen::Settings,
        Screen::Channels,
        Screen::Logs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Screen::Home => "home",
            Screen::Login => "login",
            Screen::Inventory => "inventory",
            Screen::Settings => "settings",
            Screen::Channels => "channels",
            Screen::Logs => "logs",
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Screen {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Screen::ALL
            .into_iter()
            .find(|screen| screen.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown screen '{}'", s))
    }
}

pub trait HomeScreen {
    fn update_status(&mut self, status: &str);
    fn update_progress(&mut self, current: u64, total: u64);
    fn update_channel(&mut self, channel: &str);
    fn update_drop(&mut self, drop: &DropInfo);
}

pub trait InventoryScreen {
    fn update_inventory(&mut self, items: &[InventoryItem]);
}

pub trait LogsScreen {
    fn add_log(&mut self, line: &str);

    /// Called when the logs screen becomes current, with the full history
    fn on_enter(&mut self, _history: &LogRing) {}
}

/// Transient messages (snackbar)
pub trait Toaster {
    fn show(&mut self, text: &str);
}

/// Owns the screens and tracks which one is current
pub struct ScreenManager {
    current: Screen,
    home: Box<dyn HomeScreen>,
    inventory: Box<dyn InventoryScreen>,
    logs: Box<dyn LogsScreen>,
    toaster: Box<dyn Toaster>,
}

impl ScreenManager {
    pub fn new(
        home: Box<dyn HomeScreen>,
        inventory: Box<dyn InventoryScreen>,
        logs: Box<dyn LogsScreen>,
        toaster: Box<dyn Toaster>,
    ) -> Self {
        Self {
            current: Screen::Login,
            home,
            inventory,
            logs,
            toaster,
        }
    }

    pub fn current(&self) -> Screen {
        self.current
    }

    /// Switch screens; returns `false` if `screen` was already current
    pub fn set_current(&mut self, screen: Screen) -> bool {
        if self.current == screen {
            return false;
        }
        tracing::debug!("Screen {} -> {}", self.current, screen);
        self.current = screen;
        true
    }

    pub fn home(&mut self) -> &mut dyn HomeScreen {
        self.home.as_mut()
    }

    pub fn inventory(&mut self) -> &mut dyn InventoryScreen {
        self.inventory.as_mut()
    }

    pub fn logs(&mut self) -> &mut dyn LogsScreen {
        self.logs.as_mut()
    }

    pub fn toaster(&mut self) -> &mut dyn Toaster {
        self.toaster.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nothing;

    impl HomeScreen for Nothing {
        fn update_status(&mut self, _status: &str) {}
        fn update_progress(&mut self, _current: u64, _total: u64) {}
        fn update_channel(&mut self, _channel: &str) {}
        fn update_drop(&mut self, _drop: &DropInfo) {}
    }

    impl InventoryScreen for Nothing {
        fn update_inventory(&mut self, _items: &[InventoryItem]) {}
    }

    impl LogsScreen for Nothing {
        fn add_log(&mut self, _line: &str) {}
    }

    impl Toaster for Nothing {
        fn show(&mut self, _text: &str) {}
    }

    #[test]
    fn test_screen_names_round_trip() {
        for screen in Screen::ALL {
            assert_eq!(screen.name().parse::<Screen>().unwrap(), screen);
        }
        assert_eq!("LOGS".parse::<Screen>().unwrap(), Screen::Logs);
        assert!("nowhere".parse::<Screen>().is_err());
    }

    #[test]
    fn test_set_current_reports_change() {
        let mut screens = ScreenManager::new(
            Box::new(Nothing),
            Box::new(Nothing),
            Box::new(Nothing),
            Box::new(Nothing),
        );

        assert_eq!(screens.current(), Screen::Login);
        assert!(screens.set_current(Screen::Home));
        assert!(!screens.set_current(Screen::Home));
        assert_eq!(screens.current(), Screen::Home);
    }
}
