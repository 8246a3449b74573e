use nightlight_common::Rgb;
use std::str::FromStr;
use structopt::StructOpt;

pub mod app;
pub mod net;

#[derive(Clone, Debug, StructOpt)]
pub struct Opt {
    /// Address of the nightlight server.
    #[structopt(short, long, default_value = "127.0.0.1:6000", env = "NIGHTLIGHT_REMOTE")]
    pub address: String,

    /// Give up on the server after this many seconds.
    #[structopt(long, default_value = "5")]
    pub timeout: u64,

    #[structopt(subcommand)]
    pub command: Command,
}

#[derive(Clone, Debug, PartialEq, Eq, StructOpt)]
pub enum Command {
    /// Light the LED with a color, either #rrggbb or r,g,b.
    Color { color: Rgb },
    /// Turn the LED off.
    Off,
    /// Switch night mode, takes effect with the next color.
    Night { state: Switch },
    /// Print what the LED is currently showing.
    Status,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Switch {
    On,
    Off,
}

impl From<Switch> for bool {
    fn from(switch: Switch) -> Self {
        switch == Switch::On
    }
}

impl FromStr for Switch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "on" | "true" | "1" => Ok(Self::On),
            "off" | "false" | "0" => Ok(Self::Off),
            other => Err(format!("Expected on or off, got {:?}", other)),
        }
    }
}

pub mod errors {
    use nightlight_common::serde_json;
    use thiserror::Error;

    pub type ResultNet<T> = std::result::Result<T, NetError>;

    #[derive(Debug, Error)]
    pub enum NetError {
        #[error(transparent)]
        Io(#[from] std::io::Error),
        #[error("Server did not answer within {0} seconds")]
        Timeout(u64),
        #[error("Malformed response from server")]
        MalformedResponse,
        #[error("Server replied with a non JSON body: {0}")]
        Json(#[from] serde_json::Error),
        #[error("Server replied {status}: {message}")]
        Status { status: u16, message: String },
    }
}
