//! egui viewport as the session core's windowing capability.

use async_trait::async_trait;
use eframe::egui;
use taskdesk_core::{WindowCapability, WindowError};

/// Sends viewport commands to the root window. The context is thread-safe, so commands
/// issued from runtime tasks are picked up on the next frame.
pub struct EguiWindow {
    ctx: egui::Context,
}

impl EguiWindow {
    pub fn new(ctx: egui::Context) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl WindowCapability for EguiWindow {
    async fn set_size(&self, width: u32, height: u32) -> Result<(), WindowError> {
        if width == 0 || height == 0 {
            return Err(WindowError::Command(format!("invalid size {}x{}", width, height)));
        }
        self.ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(egui::vec2(
            width as f32,
            height as f32,
        )));
        self.ctx.request_repaint();
        Ok(())
    }

    async fn set_always_on_top(&self, on_top: bool) -> Result<(), WindowError> {
        let level = if on_top {
            egui::viewport::WindowLevel::AlwaysOnTop
        } else {
            egui::viewport::WindowLevel::Normal
        };
        self.ctx.send_viewport_cmd(egui::ViewportCommand::WindowLevel(level));
        self.ctx.request_repaint();
        Ok(())
    }
}
