//! Mapping from requested colors to PWM duty cycles.
//!
//! The LED is common-anode: a channel is lit while its pin is low, so the
//! duty cycle is the share of the period spent *off*. 100 is dark, 0 is full
//! brightness.

use nightlight_common::Rgb;
use std::ops::{Index, IndexMut};

/// Duty cycle that turns a channel fully off.
pub const DUTY_OFF: f64 = 100.0;

/// Night mode keeps one third of each channel's intensity.
pub const NIGHT_DIVISOR: u8 = 3;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    pub fn name(self) -> &'static str {
        match self {
            Channel::Red => "red",
            Channel::Green => "green",
            Channel::Blue => "blue",
        }
    }
}

/// One duty cycle percentage per channel, always within `0.0..=100.0`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DutyCycles {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl DutyCycles {
    pub const OFF: DutyCycles = DutyCycles::uniform(DUTY_OFF);

    pub const fn uniform(duty: f64) -> Self {
        Self {
            red: duty,
            green: duty,
            blue: duty,
        }
    }

    pub fn from_color(color: Rgb) -> Self {
        Self {
            red: duty_for(color.r),
            green: duty_for(color.g),
            blue: duty_for(color.b),
        }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.red, self.green, self.blue]
    }
}

impl Index<Channel> for DutyCycles {
    type Output = f64;

    fn index(&self, channel: Channel) -> &f64 {
        match channel {
            Channel::Red => &self.red,
            Channel::Green => &self.green,
            Channel::Blue => &self.blue,
        }
    }
}

impl IndexMut<Channel> for DutyCycles {
    fn index_mut(&mut self, channel: Channel) -> &mut f64 {
        match channel {
            Channel::Red => &mut self.red,
            Channel::Green => &mut self.green,
            Channel::Blue => &mut self.blue,
        }
    }
}

/// Linear, inverted mapping of one channel intensity to a duty cycle.
pub fn duty_for(intensity: u8) -> f64 {
    DUTY_OFF - (intensity as f64 / 255.0 * 100.0)
}

pub fn night_attenuate(color: Rgb) -> Rgb {
    Rgb::new(
        color.r / NIGHT_DIVISOR,
        color.g / NIGHT_DIVISOR,
        color.b / NIGHT_DIVISOR,
    )
}

/// Duty cycles to emit for a request, given the current night mode.
pub fn compute(enabled: bool, night_mode: bool, color: Rgb) -> DutyCycles {
    if !enabled {
        return DutyCycles::OFF;
    }

    let color = if night_mode {
        night_attenuate(color)
    } else {
        color
    };
    DutyCycles::from_color(color)
}
