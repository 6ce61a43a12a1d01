// UI module - Slint window wiring
//
// - EventLoopBridge: marshals state events and log entries onto the Slint event loop
// - GuiController: connects the window to StateManager, BuildRunner and LogSink

pub mod bridge;
pub mod controller;

pub use bridge::{EventLoopBridge, EventLoopBridgeHandle};
pub use controller::GuiController;
