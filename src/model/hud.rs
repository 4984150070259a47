/// Visibility of the two overlay elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HudState {
    pub instructions_visible: bool,
    pub prompt_visible: bool,
}

impl Default for HudState {
    fn default() -> Self {
        Self { instructions_visible: true, prompt_visible: false }
    }
}

impl HudState {
    /// Hide the start-up instructions. Returns true if they were showing.
    pub fn dismiss_instructions(&mut self) -> bool {
        std::mem::replace(&mut self.instructions_visible, false)
    }

    pub fn set_prompt(&mut self, visible: bool) {
        if self.prompt_visible != visible {
            tracing::debug!(visible, "interaction prompt");
        }
        self.prompt_visible = visible;
    }
}
