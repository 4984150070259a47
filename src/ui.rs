use egui::Context;

use crate::model::HudState;

const INSTRUCTIONS: &[&str] = &[
    "Click to look around (Esc releases the mouse)",
    "W A S D - Move",
    "Space / Shift - Up / Down",
    "E - Use the machine when close",
    "Hold M and click - Place a marker",
    "Right click - Report the gift position",
];

/// Build the overlay and return egui output
pub fn build_ui(egui_ctx: &Context, raw_input: egui::RawInput, hud: &HudState) -> egui::FullOutput {
    egui_ctx.run(raw_input, |ctx| {
        draw_crosshair(ctx);
        if hud.instructions_visible {
            draw_instructions(ctx);
        }
        if hud.prompt_visible {
            draw_prompt(ctx);
        }
    })
}

fn draw_crosshair(ctx: &Context) {
    let painter = ctx.layer_painter(egui::LayerId::new(egui::Order::TOP, egui::Id::new("crosshair")));
    let center = ctx.available_rect().center();
    let size = 8.0;
    let stroke = egui::Stroke::new(1.5, egui::Color32::from_gray(40));
    painter.line_segment(
        [egui::Pos2::new(center.x - size, center.y), egui::Pos2::new(center.x + size, center.y)],
        stroke,
    );
    painter.line_segment(
        [egui::Pos2::new(center.x, center.y - size), egui::Pos2::new(center.x, center.y + size)],
        stroke,
    );
}

fn draw_instructions(ctx: &Context) {
    egui::Window::new("Workshop")
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            for line in INSTRUCTIONS {
                ui.label(*line);
            }
            ui.separator();
            ui.label(egui::RichText::new("Press Enter to start").strong());
        });
}

fn draw_prompt(ctx: &Context) {
    egui::Area::new(egui::Id::new("prompt"))
        .anchor(egui::Align2::CENTER_BOTTOM, [0.0, -48.0])
        .show(ctx, |ui| {
            egui::Frame::NONE
                .fill(egui::Color32::from_black_alpha(160))
                .inner_margin(8.0)
                .corner_radius(4.0)
                .show(ui, |ui| {
                    ui.label(egui::RichText::new("Press E to use the machine").color(egui::Color32::WHITE));
                });
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_input() -> egui::RawInput {
        egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(800.0, 600.0))),
            ..Default::default()
        }
    }

    #[test]
    fn overlay_builds_in_every_hud_state() {
        let ctx = Context::default();
        for (instructions_visible, prompt_visible) in [(true, false), (false, true), (false, false)] {
            let hud = HudState { instructions_visible, prompt_visible };
            let output = build_ui(&ctx, raw_input(), &hud);
            assert!(!output.shapes.is_empty());
        }
    }
}
