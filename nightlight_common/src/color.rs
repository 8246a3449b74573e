use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseColorError {
    #[error("Expected 6 hex digits, got {0:?}")]
    BadHex(String),
    #[error("Expected 3 comma separated channels, got {0}")]
    ChannelCount(usize),
    #[error("Channel {0:?} is not an integer in 0..=255")]
    BadChannel(String),
}

/// A color as requested by a client, one byte per channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn channels(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Saturates each value into `0..=255`, dropping any fractional part.
    /// NaN maps to 0.
    pub fn saturating_from(channels: [f64; 3]) -> Self {
        let [r, g, b] = channels;
        Self::new(clamp_channel(r), clamp_channel(g), clamp_channel(b))
    }
}

/// White, which is what a bare "turn it on" request means.
impl Default for Rgb {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }
}

impl From<Rgb> for [u8; 3] {
    fn from(color: Rgb) -> Self {
        color.channels()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Accepts `#rrggbb`, `rrggbb` or `r,g,b`.
impl FromStr for Rgb {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.contains(',') {
            let parts: Vec<&str> = s.split(',').map(str::trim).collect();
            if parts.len() != 3 {
                return Err(ParseColorError::ChannelCount(parts.len()));
            }

            let mut channels = [0u8; 3];
            for (channel, part) in channels.iter_mut().zip(parts) {
                *channel = part
                    .parse()
                    .map_err(|_| ParseColorError::BadChannel(part.to_owned()))?;
            }
            return Ok(channels.into());
        }

        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ParseColorError::BadHex(s.to_owned()));
        }
        let byte = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ParseColorError::BadHex(s.to_owned()))
        };

        Ok(Self::new(byte(0)?, byte(2)?, byte(4)?))
    }
}

fn clamp_channel(value: f64) -> u8 {
    if value.is_nan() {
        0
    } else {
        value.max(0.0).min(255.0) as u8
    }
}
