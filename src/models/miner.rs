use std::fmt;

/// A drop currently being mined
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropInfo {
    pub game: String,
    pub campaign: String,
    pub name: String,
    pub current_minutes: u32,
    pub required_minutes: u32,
}

impl DropInfo {
    pub fn is_complete(&self) -> bool {
        self.current_minutes >= self.required_minutes
    }

    /// Progress in the 0.0..=1.0 range
    pub fn progress(&self) -> f64 {
        if self.required_minutes == 0 {
            1.0
        } else {
            (self.current_minutes as f64 / self.required_minutes as f64).min(1.0)
        }
    }
}

impl fmt::Display for DropInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) {}/{} min",
            self.name, self.game, self.current_minutes, self.required_minutes
        )
    }
}

/// One campaign in the drops inventory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryItem {
    pub game: String,
    pub campaign: String,
    pub claimed: usize,
    pub total: usize,
}

impl InventoryItem {
    pub fn is_finished(&self) -> bool {
        self.claimed >= self.total
    }
}

impl fmt::Display for InventoryItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}: {}/{}", self.game, self.campaign, self.claimed, self.total)
    }
}

/// How a mining run ended, reported back to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    /// The run returned normally (stopped or nothing left to mine)
    Finished,
    /// The run failed with the given error
    Failed(String),
}
