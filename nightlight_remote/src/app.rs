use crate::{net::NetHandler, Command, Opt};
use anyhow::Result;
use log::info;
use nightlight_common::{
    packets::{Ack, LedRequest, LedStatus, NightRequest},
    serde_json, Rgb, PATH_LED, PATH_NIGHT,
};

pub struct App {
    net: NetHandler,
}

impl App {
    pub fn new(opt: &Opt) -> Self {
        Self {
            net: NetHandler::new(opt.address.clone(), opt.timeout),
        }
    }

    /// Runs one command and returns the line to show the user.
    pub async fn run(&self, command: &Command) -> Result<String> {
        match *command {
            Command::Color { color } => {
                self.send_led(LedRequest::color(color)).await?;
                Ok(format!("LED set to {}", color))
            }
            Command::Off => {
                self.send_led(LedRequest::off()).await?;
                Ok("LED off".into())
            }
            Command::Night { state } => {
                let request = NightRequest { night: state.into() };
                let body = self
                    .net
                    .post(PATH_NIGHT, &serde_json::to_value(request)?)
                    .await?;
                check_ack(&body)?;
                Ok(format!(
                    "Night mode {}, applies to the next color",
                    if request.night { "on" } else { "off" }
                ))
            }
            Command::Status => {
                let body = self.net.get(PATH_LED).await?;
                let status: LedStatus = serde_json::from_slice(&body)?;
                Ok(describe(&status))
            }
        }
    }

    async fn send_led(&self, request: LedRequest) -> Result<()> {
        info!("Sending {:?}", request);
        let body = self
            .net
            .post(PATH_LED, &serde_json::to_value(request)?)
            .await?;
        check_ack(&body)
    }
}

fn check_ack(body: &[u8]) -> Result<()> {
    let ack: Ack = serde_json::from_slice(body)?;
    anyhow::ensure!(ack.ok, "Server did not acknowledge the command");
    Ok(())
}

pub fn describe(status: &LedStatus) -> String {
    let color = status
        .color
        .map(|color: Rgb| color.to_string())
        .unwrap_or_else(|| "none yet".into());
    let [r, g, b] = status.duty;

    format!(
        "{}, night mode {}, color {}, duty r={:.1}% g={:.1}% b={:.1}%",
        if status.enabled { "enabled" } else { "disabled" },
        if status.night { "on" } else { "off" },
        color,
        r,
        g,
        b
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_status() {
        let status = LedStatus {
            enabled: true,
            night: true,
            color: Some(Rgb::new(0, 255, 0)),
            duty: [100.0, 66.666, 100.0],
        };
        assert_eq!(
            describe(&status),
            "enabled, night mode on, color #00ff00, duty r=100.0% g=66.7% b=100.0%"
        );
    }

    #[test]
    fn refused_ack_is_an_error() {
        assert!(check_ack(br#"{"ok":true}"#).is_ok());
        assert!(check_ack(br#"{"ok":false}"#).is_err());
        assert!(check_ack(b"nope").is_err());
    }
}
