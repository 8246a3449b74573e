use anyhow::anyhow;
use std::{net::IpAddr, str::FromStr};
use structopt::StructOpt;

pub mod app;
pub mod controller;
pub mod duty;
pub mod led_controllers;
pub mod net;

#[derive(Copy, Clone, Debug, StructOpt)]
pub struct Opt {
    /// Address to listen on.
    #[structopt(short, long, default_value = "0.0.0.0", env = "NIGHTLIGHT_ADDRESS")]
    pub address: IpAddr,

    /// Port to use.
    #[structopt(short, long, default_value = "6000", env = "NIGHTLIGHT_PORT")]
    pub port: u16,

    /// Turn the LED off, release it and exit.
    #[structopt(short, long)]
    pub reset: bool,

    /// How the LED is driven, either gpio or memory.
    /// The memory type drives nothing and is meant for hosts without GPIO.
    #[structopt(short, long, default_value = "gpio", env = "NIGHTLIGHT_LED_TYPE")]
    pub led_type: LedType,

    /// BCM pin of the red channel.
    #[structopt(long, default_value = "17")]
    pub pin_red: u8,

    /// BCM pin of the green channel.
    #[structopt(long, default_value = "27")]
    pub pin_green: u8,

    /// BCM pin of the blue channel.
    #[structopt(long, default_value = "22")]
    pub pin_blue: u8,

    /// Software PWM frequency in Hz.
    #[structopt(long, default_value = "500.0")]
    pub pwm_freq: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LedType {
    Gpio,
    Memory,
}

impl FromStr for LedType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gpio" => Ok(Self::Gpio),
            "memory" => Ok(Self::Memory),
            _ => Err(anyhow!("Unknown led type !")),
        }
    }
}

pub mod errors {
    use std::io;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum SinkError {
        #[cfg(feature = "controller_gpio")]
        #[error(transparent)]
        Gpio(#[from] rppal::gpio::Error),
        #[error("Duty cycle {duty} is out of range for the {channel} channel")]
        OutOfRange { channel: &'static str, duty: f64 },
        #[error("LED output is stopped")]
        Stopped,
        #[error("The {0} channel rejected the write")]
        Rejected(&'static str),
    }

    #[derive(Debug, Error)]
    pub enum HttpError {
        #[error(transparent)]
        Io(#[from] io::Error),
        #[error("Connection closed before a full request was read")]
        Closed,
        #[error("Malformed request line {0:?}")]
        RequestLine(String),
        #[error("Malformed header {0:?}")]
        Header(String),
        #[error("Request head is larger than {0} bytes")]
        HeadTooLarge(usize),
        #[error("Request body of {0} bytes is too large")]
        BodyTooLarge(usize),
    }

    impl HttpError {
        /// Status to answer with, `None` when the peer can't be answered.
        pub fn status(&self) -> Option<u16> {
            match self {
                HttpError::Io(_) | HttpError::Closed => None,
                HttpError::RequestLine(_) | HttpError::Header(_) | HttpError::HeadTooLarge(_) => {
                    Some(400)
                }
                HttpError::BodyTooLarge(_) => Some(413),
            }
        }
    }
}
