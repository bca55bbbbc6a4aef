//! Keyboard-driven stand-in for the side panel.
//!
//! [`PanelState`] is the controlled state the compositor entry points are fed
//! from. Key presses either edit that state or produce a [`PanelAction`] for the
//! view to carry out.

use std::path::PathBuf;

use winit::keyboard::{Key, NamedKey};

use crate::design::{DEFAULT_GARMENT_COLOUR, Font, GARMENT_PALETTE, Placement, Side, TextRequest};

#[derive(Clone, Debug, PartialEq)]
pub enum PanelAction {
    ApplyText(TextRequest),
    UploadImage { side: Side, path: Option<PathBuf> },
    SetColour(&'static str),
    CaptureAndHandOff,
    BuyCustom,
    Quit,
}

#[derive(Clone, Debug, Default)]
pub struct PanelState {
    pub text: String,
    pub side: Side,
    pub font: Font,
    pub upload_path: Option<PathBuf>,
    palette_index: Option<usize>,
}

impl PanelState {
    pub fn new(upload_path: Option<PathBuf>) -> Self {
        Self {
            upload_path,
            ..Default::default()
        }
    }

    /// Handles one key press. `text` is the text the key produced, if any.
    pub fn handle_key(&mut self, key: &Key, text: Option<&str>) -> Option<PanelAction> {
        match key {
            Key::Named(NamedKey::Tab) => {
                self.side = self.side.other();
                log::info!("editing the {} side", self.side);
                None
            }
            Key::Named(NamedKey::F1) => {
                self.font = self.font.next();
                log::info!("font: {}", self.font);
                None
            }
            Key::Named(NamedKey::F2) => Some(self.text_action(Placement::Chest)),
            Key::Named(NamedKey::F3) => Some(self.text_action(Placement::Middle)),
            Key::Named(NamedKey::F4) => Some(self.text_action(Placement::Stomach)),
            Key::Named(NamedKey::F5) => Some(PanelAction::UploadImage {
                side: self.side,
                path: self.upload_path.clone(),
            }),
            Key::Named(NamedKey::F6) => {
                let next = self.palette_index.map_or(0, |i| (i + 1) % GARMENT_PALETTE.len());
                self.palette_index = Some(next);
                Some(PanelAction::SetColour(GARMENT_PALETTE[next]))
            }
            Key::Named(NamedKey::F7) => {
                self.palette_index = None;
                Some(PanelAction::SetColour(DEFAULT_GARMENT_COLOUR))
            }
            Key::Named(NamedKey::F8) => Some(PanelAction::BuyCustom),
            Key::Named(NamedKey::Enter) => Some(PanelAction::CaptureAndHandOff),
            Key::Named(NamedKey::Escape) => Some(PanelAction::Quit),
            Key::Named(NamedKey::Backspace) => {
                self.text.pop();
                None
            }
            _ => {
                if let Some(text) = text {
                    self.text.extend(text.chars().filter(|c| !c.is_control()));
                }
                None
            }
        }
    }

    fn text_action(&self, placement: Placement) -> PanelAction {
        PanelAction::ApplyText(TextRequest::new(self.text.clone(), self.side, self.font, placement))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(panel: &mut PanelState, key: Key) -> Option<PanelAction> {
        panel.handle_key(&key, None)
    }

    #[test]
    fn typing_then_placing_text() {
        let mut panel = PanelState::default();
        for c in ["H", "I", "!"] {
            panel.handle_key(&Key::Character(c.into()), Some(c));
        }
        press(&mut panel, Key::Named(NamedKey::Backspace));
        press(&mut panel, Key::Named(NamedKey::Tab));
        press(&mut panel, Key::Named(NamedKey::F1));

        let action = press(&mut panel, Key::Named(NamedKey::F4));
        let Some(PanelAction::ApplyText(request)) = action else {
            panic!("expected a text action, got {action:?}");
        };
        assert_eq!(request.text, "HI");
        assert_eq!(request.side, Side::Back);
        assert_eq!(request.font, Font::TimesNewRoman);
        assert_eq!(request.divisor, 1.5);
    }

    #[test]
    fn colour_keys_cycle_and_reset() {
        let mut panel = PanelState::default();
        assert_eq!(press(&mut panel, Key::Named(NamedKey::F6)), Some(PanelAction::SetColour("#ff0000")));
        assert_eq!(press(&mut panel, Key::Named(NamedKey::F6)), Some(PanelAction::SetColour("#964B00")));
        assert_eq!(press(&mut panel, Key::Named(NamedKey::F7)), Some(PanelAction::SetColour("#ffffff")));
        assert_eq!(press(&mut panel, Key::Named(NamedKey::F6)), Some(PanelAction::SetColour("#ff0000")));
    }

    #[test]
    fn finishing_keys() {
        let mut panel = PanelState::default();
        assert_eq!(press(&mut panel, Key::Named(NamedKey::Enter)), Some(PanelAction::CaptureAndHandOff));
        assert_eq!(press(&mut panel, Key::Named(NamedKey::F8)), Some(PanelAction::BuyCustom));
        assert_eq!(press(&mut panel, Key::Named(NamedKey::Escape)), Some(PanelAction::Quit));
    }

    #[test]
    fn upload_without_a_configured_file_carries_none() {
        let mut panel = PanelState::new(None);
        assert_eq!(
            press(&mut panel, Key::Named(NamedKey::F5)),
            Some(PanelAction::UploadImage { side: Side::Front, path: None })
        );
    }
}
