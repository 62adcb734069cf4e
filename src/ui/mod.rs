// UI module - UI thread logic and the background loop bridge
//
// This module contains:
// - UiLoop: the UI thread's main loop executing posted callbacks
// - EventLoopBridge: Coordinates between the background tokio loop and the UI loop
// - AppController: Root of the UI loop, wires screens to the mining client
// - Screens: presentation traits, plus console implementations for the binary

pub mod bridge;
pub mod console;
pub mod controller;
pub mod event_loop;
pub mod screens;

pub use bridge::{
    BridgeConfig, BridgeError, EventLoopBridge, EventLoopBridgeHandle, StopSignal, TaskHandle,
    TaskState,
};
pub use controller::{AppController, ControllerEvents, MiningState};
pub use event_loop::{UiHandle, UiLoop};
pub use screens::{HomeScreen, InventoryScreen, LogsScreen, Screen, ScreenManager, Toaster};
