//! Marker-color classification rules.

use crate::{MockupError, MockupResult};

/// Inclusive `[lo, hi]` range over one 8-bit channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChannelRange(pub u8, pub u8);

impl ChannelRange {
    pub const ANY: Self = Self(0, 255);

    #[inline]
    fn contains(self, v: u8) -> bool {
        self.0 <= v && v <= self.1
    }
}

/// Range predicate over the raw RGB channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RgbRange {
    pub r: ChannelRange,
    pub g: ChannelRange,
    pub b: ChannelRange,
}

/// Range predicate in HSV space.
///
/// `hue` is in degrees; when `hue.0 > hue.1` the band wraps through 0°
/// (e.g. `(300, 30)` covers magenta through red to orange).
/// Saturation and value bounds are exclusive minimums and inclusive maximums,
/// both in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HsvRange {
    pub hue: (f32, f32),
    pub min_saturation: f32,
    #[serde(default = "one")]
    pub max_saturation: f32,
    pub min_value: f32,
    #[serde(default = "one")]
    pub max_value: f32,
}

fn one() -> f32 {
    1.0
}

/// One disjunct of a [`ColorClassRule`].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "space", rename_all = "lowercase")]
pub enum ColorPredicate {
    Rgb(RgbRange),
    Hsv(HsvRange),
}

impl ColorPredicate {
    #[inline]
    pub fn matches(&self, r: u8, g: u8, b: u8) -> bool {
        match self {
            Self::Rgb(range) => range.r.contains(r) && range.g.contains(g) && range.b.contains(b),
            Self::Hsv(range) => {
                let (h, s, v) = rgb_to_hsv(r, g, b);
                let hue_ok = if range.hue.0 <= range.hue.1 {
                    range.hue.0 <= h && h <= range.hue.1
                } else {
                    h >= range.hue.0 || h <= range.hue.1
                };
                hue_ok
                    && s > range.min_saturation
                    && s <= range.max_saturation
                    && v > range.min_value
                    && v <= range.max_value
            }
        }
    }
}

/// "Is this a marker pixel?" as a disjunction of channel-range predicates.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ColorClassRule {
    pub any_of: Vec<ColorPredicate>,
}

/// Named rule shorthands accepted in template manifests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RulePreset {
    Magenta,
    Pink,
}

impl Default for ColorClassRule {
    fn default() -> Self {
        Self::magenta()
    }
}

impl ColorClassRule {
    pub fn new(any_of: Vec<ColorPredicate>) -> MockupResult<Self> {
        let rule = Self { any_of };
        rule.validate()?;
        Ok(rule)
    }

    pub fn preset(preset: RulePreset) -> Self {
        match preset {
            RulePreset::Magenta => Self::magenta(),
            RulePreset::Pink => Self::pink(),
        }
    }

    /// Bright pink / hot pink / deep and pure magenta reference fills.
    pub fn magenta() -> Self {
        let rgb = |r: (u8, u8), g: (u8, u8), b: (u8, u8)| {
            ColorPredicate::Rgb(RgbRange {
                r: ChannelRange(r.0, r.1),
                g: ChannelRange(g.0, g.1),
                b: ChannelRange(b.0, b.1),
            })
        };
        Self {
            any_of: vec![
                rgb((200, 255), (100, 200), (150, 255)),
                rgb((180, 255), (50, 150), (120, 255)),
                rgb((220, 255), (20, 100), (147, 220)),
                rgb((255, 255), (0, 100), (255, 255)),
            ],
        }
    }

    /// Looser pink detection: an HSV hue band around magenta/red plus RGB ranges
    /// for saturated magenta and hot pink.
    pub fn pink() -> Self {
        Self {
            any_of: vec![
                ColorPredicate::Hsv(HsvRange {
                    hue: (300.0, 30.0),
                    min_saturation: 0.3,
                    max_saturation: 1.0,
                    min_value: 0.4,
                    max_value: 1.0,
                }),
                ColorPredicate::Rgb(RgbRange {
                    r: ChannelRange(201, 255),
                    g: ChannelRange(0, 149),
                    b: ChannelRange(151, 255),
                }),
                ColorPredicate::Rgb(RgbRange {
                    r: ChannelRange(221, 255),
                    g: ChannelRange(21, 119),
                    b: ChannelRange(151, 219),
                }),
            ],
        }
    }

    pub fn validate(&self) -> MockupResult<()> {
        if self.any_of.is_empty() {
            return Err(MockupError::validation(
                "color rule needs at least one predicate",
            ));
        }
        for p in &self.any_of {
            match p {
                ColorPredicate::Rgb(r) => {
                    for (name, c) in [("r", r.r), ("g", r.g), ("b", r.b)] {
                        if c.0 > c.1 {
                            return Err(MockupError::validation(format!(
                                "rgb range '{name}' has lo > hi ({} > {})",
                                c.0, c.1
                            )));
                        }
                    }
                }
                ColorPredicate::Hsv(h) => {
                    let finite = [
                        h.hue.0,
                        h.hue.1,
                        h.min_saturation,
                        h.max_saturation,
                        h.min_value,
                        h.max_value,
                    ]
                    .iter()
                    .all(|v| v.is_finite());
                    if !finite {
                        return Err(MockupError::validation("hsv range must be finite"));
                    }
                    if !(0.0..=360.0).contains(&h.hue.0) || !(0.0..=360.0).contains(&h.hue.1) {
                        return Err(MockupError::validation("hsv hue must be within 0..=360"));
                    }
                }
            }
        }
        Ok(())
    }

    #[inline]
    pub fn matches(&self, r: u8, g: u8, b: u8) -> bool {
        self.any_of.iter().any(|p| p.matches(r, g, b))
    }

    #[inline]
    pub fn matches_pixel(&self, px: [u8; 4]) -> bool {
        self.matches(px[0], px[1], px[2])
    }
}

/// Hue in degrees `[0, 360)`, saturation and value in `[0, 1]`.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = f32::from(r) / 255.0;
    let g = f32::from(g) / 255.0;
    let b = f32::from(b) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = max - min;

    let s = if max == 0.0 { 0.0 } else { diff / max };
    let v = max;
    if diff == 0.0 {
        return (0.0, s, v);
    }

    let h = if max == r {
        (g - b) / diff + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / diff + 2.0
    } else {
        (r - g) / diff + 4.0
    };
    ((h * 60.0) % 360.0, s, v)
}
