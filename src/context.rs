// Application context - everything the controller needs, built once in main
//
// Replaces a global application singleton: main constructs the context after
// the crash log and the bridge exist and hands it to the controller.

use crate::config::SettingsStore;
use crate::crashlog::CrashLog;
use crate::metrics::Metrics;
use crate::services::MinerClient;
use crate::ui::{AppController, EventLoopBridgeHandle};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppContext {
    /// Settings collaborator (token, flags, persistence)
    pub settings: Arc<dyn SettingsStore>,

    /// Mining client whose futures run on the background loop
    pub client: Arc<dyn MinerClient>,

    /// Submission handle of the background loop, posting back to the controller
    pub bridge: EventLoopBridgeHandle<AppController>,

    /// Durable run log
    pub crash_log: CrashLog,

    pub metrics: Arc<Metrics>,
}
