//! Per-side design state and the controlled inputs of the side panel.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StudioError};

/// Text colour used for every text application.
pub const TEXT_COLOUR: &str = "#000000";

/// Garment colours offered by the side panel.
pub const GARMENT_PALETTE: [&str; 5] = ["#ff0000", "#964B00", "#ADD8E6", "#ffff00", "#5f5f5f"];

/// Colour restored by "reset to default".
pub const DEFAULT_GARMENT_COLOUR: &str = "#ffffff";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Front,
    Back,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Front, Side::Back];

    /// Name of the material slot this side paints onto. Matching is exact and
    /// case-sensitive.
    pub fn slot_name(self) -> &'static str {
        match self {
            Side::Front => "Front",
            Side::Back => "Back",
        }
    }

    pub fn other(self) -> Side {
        match self {
            Side::Front => Side::Back,
            Side::Back => Side::Front,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Front => "front",
            Side::Back => "back",
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Font {
    #[default]
    Arial,
    #[serde(rename = "Times New Roman")]
    TimesNewRoman,
    #[serde(rename = "Courier New")]
    CourierNew,
    Georgia,
}

impl Font {
    pub const ALL: [Font; 4] = [Font::Arial, Font::TimesNewRoman, Font::CourierNew, Font::Georgia];

    pub fn family(self) -> &'static str {
        match self {
            Font::Arial => "Arial",
            Font::TimesNewRoman => "Times New Roman",
            Font::CourierNew => "Courier New",
            Font::Georgia => "Georgia",
        }
    }

    pub fn next(self) -> Font {
        let idx = Font::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Font::ALL[(idx + 1) % Font::ALL.len()]
    }
}

impl fmt::Display for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.family())
    }
}

/// Where text lands vertically on the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    Chest,
    Middle,
    Stomach,
}

impl Placement {
    pub const ALL: [Placement; 3] = [Placement::Chest, Placement::Middle, Placement::Stomach];

    /// The canvas height is divided by this to get the text's vertical anchor.
    pub fn divisor(self) -> f32 {
        match self {
            Placement::Chest => 3.0,
            Placement::Middle => 2.1,
            Placement::Stomach => 1.5,
        }
    }
}

/// An 8-bit sRGB colour parsed from `#rrggbb`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub fn parse(hex: &str) -> Result<Self> {
        let digits = hex
            .strip_prefix('#')
            .filter(|d| d.len() == 6 && d.is_ascii())
            .ok_or_else(|| StudioError::InvalidColour(hex.to_string()))?;
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| StudioError::InvalidColour(hex.to_string()))
        };
        Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
    }

    /// Linear-space RGBA for shader uniforms.
    pub fn to_linear(self) -> [f32; 4] {
        let lin = |c: u8| {
            let c = c as f32 / 255.0;
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        };
        [lin(self.0[0]), lin(self.0[1]), lin(self.0[2]), 1.0]
    }
}

/// Parameters of one "apply text" action, passed in from controlled state.
#[derive(Clone, Debug, PartialEq)]
pub struct TextRequest {
    pub text: String,
    pub side: Side,
    pub font: Font,
    pub colour: String,
    pub divisor: f32,
}

impl TextRequest {
    pub fn new(text: impl Into<String>, side: Side, font: Font, placement: Placement) -> Self {
        Self {
            text: text.into(),
            side,
            font,
            colour: TEXT_COLOUR.to_string(),
            divisor: placement.divisor(),
        }
    }
}

/// What is currently applied to one side of the garment.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideDesign {
    pub text: String,
    pub font: Option<Font>,
    pub color: String,
    #[serde(rename = "position", alias = "verticalOffsetDivisor")]
    pub vertical_offset_divisor: Option<f32>,
    /// Data URI of the uploaded image.
    pub image_source: Option<String>,
}

/// Both sides of the design, kept in sync with what is bound on the mesh.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignState {
    pub front: SideDesign,
    pub back: SideDesign,
}

impl DesignState {
    pub fn side(&self, side: Side) -> &SideDesign {
        match side {
            Side::Front => &self.front,
            Side::Back => &self.back,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut SideDesign {
        match side {
            Side::Front => &mut self.front,
            Side::Back => &mut self.back,
        }
    }

    pub(crate) fn record_text(&mut self, request: &TextRequest) {
        let design = self.side_mut(request.side);
        design.text = request.text.clone();
        design.font = Some(request.font);
        design.color = request.colour.clone();
        design.vertical_offset_divisor = Some(request.divisor);
    }

    pub(crate) fn record_image(&mut self, side: Side, data_uri: String) {
        self.side_mut(side).image_source = Some(data_uri);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colours() {
        assert_eq!(Rgb::parse("#964B00").unwrap(), Rgb([0x96, 0x4b, 0x00]));
        assert_eq!(Rgb::parse("#ffffff").unwrap().to_linear(), [1.0, 1.0, 1.0, 1.0]);
        assert!(Rgb::parse("ffffff").is_err());
        assert!(Rgb::parse("#fff").is_err());
        assert!(Rgb::parse("#gggggg").is_err());
    }

    #[test]
    fn slot_names_are_capitalised() {
        assert_eq!(Side::Front.slot_name(), "Front");
        assert_eq!(Side::Back.slot_name(), "Back");
        assert_eq!(Side::Front.to_string(), "front");
    }

    #[test]
    fn fonts_cycle_through_the_whole_set() {
        let mut font = Font::Arial;
        for _ in 0..Font::ALL.len() {
            font = font.next();
        }
        assert_eq!(font, Font::Arial);
    }

    #[test]
    fn serializes_like_the_order_api_expects() {
        let mut state = DesignState::default();
        state.record_text(&TextRequest::new("HELLO", Side::Front, Font::TimesNewRoman, Placement::Chest));
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["front"]["text"], "HELLO");
        assert_eq!(json["front"]["font"], "Times New Roman");
        assert_eq!(json["front"]["color"], "#000000");
        assert_eq!(json["front"]["position"], 3.0);
        assert!(json["back"]["imageSource"].is_null());
    }
}
