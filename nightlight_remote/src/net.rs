use crate::errors::{NetError, ResultNet as Result};
use log::debug;
use nightlight_common::{
    packets::ErrorBody,
    serde_json::{self, Value},
};
use std::time::Duration;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

pub struct NetHandler {
    address: String,
    timeout: u64,
}

impl NetHandler {
    pub fn new(address: impl Into<String>, timeout: u64) -> Self {
        Self {
            address: address.into(),
            timeout,
        }
    }

    pub async fn get(&self, path: &str) -> Result<Vec<u8>> {
        self.request("GET", path, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Vec<u8>> {
        self.request("POST", path, Some(body)).await
    }

    /// Sends one request on a fresh connection and returns the body of a
    /// successful reply.
    pub async fn request(&self, method: &str, path: &str, body: Option<&Value>) -> Result<Vec<u8>> {
        let exchange = self.exchange(method, path, body);
        let raw = tokio::time::timeout(Duration::from_secs(self.timeout), exchange)
            .await
            .map_err(|_| NetError::Timeout(self.timeout))??;

        let (status, body) = parse_response(&raw)?;
        debug!("{} {} -> {}", method, path, status);

        if (200..300).contains(&status) {
            Ok(body.to_vec())
        } else {
            let message = serde_json::from_slice::<ErrorBody>(body)
                .map(|err| err.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned());
            Err(NetError::Status { status, message })
        }
    }

    async fn exchange(&self, method: &str, path: &str, body: Option<&Value>) -> Result<Vec<u8>> {
        let body = match body {
            Some(body) => serde_json::to_vec(body)?,
            None => Vec::new(),
        };

        let mut socket = TcpStream::connect(&self.address).await?;
        debug!("Connected to {}", socket.peer_addr()?);

        let head = format!(
            "{} {} HTTP/1.1\r\n\
             Host: {}\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n",
            method,
            path,
            self.address,
            body.len()
        );
        socket.write_all(head.as_bytes()).await?;
        socket.write_all(&body).await?;
        socket.flush().await?;

        // The server closes the connection after every reply
        let mut raw = Vec::new();
        socket.read_to_end(&mut raw).await?;
        Ok(raw)
    }
}

/// Splits a raw HTTP/1.1 response into its status and body.
pub fn parse_response(raw: &[u8]) -> Result<(u16, &[u8])> {
    let head_end = raw
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .ok_or(NetError::MalformedResponse)?;
    let head = std::str::from_utf8(&raw[..head_end]).map_err(|_| NetError::MalformedResponse)?;

    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|status| status.parse().ok())
        .ok_or(NetError::MalformedResponse)?;

    Ok((status, &raw[head_end + 4..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nightlight_common::serde_json::json;
    use tokio::net::TcpListener;

    #[test]
    fn parses_status_and_body() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 11\r\n\r\n{\"ok\":true}";
        let (status, body) = parse_response(raw).unwrap();
        assert_eq!(status, 200);
        assert_eq!(body, b"{\"ok\":true}");
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(parse_response(b"hello"), Err(NetError::MalformedResponse)));
        assert!(matches!(
            parse_response(b"HTTP/1.1 abc\r\n\r\n"),
            Err(NetError::MalformedResponse)
        ));
    }

    /// Accepts one connection, returns what was sent and answers with `reply`.
    async fn one_shot_server(reply: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0; 1024];
            let mut received = Vec::new();
            // Headers and body fit in one request, stop once the body is in
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                received.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&received).into_owned();
                if let Some((head, body)) = text.split_once("\r\n\r\n") {
                    let length: usize = head
                        .lines()
                        .find_map(|line| line.strip_prefix("Content-Length: "))
                        .and_then(|value| value.parse().ok())
                        .unwrap_or(0);
                    if body.len() >= length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            socket.write_all(reply.as_bytes()).await.unwrap();
            String::from_utf8(received).unwrap()
        });

        (address, handle)
    }

    #[tokio::test]
    async fn posts_json() {
        let (address, server) =
            one_shot_server("HTTP/1.1 200 OK\r\nContent-Length: 11\r\n\r\n{\"ok\":true}").await;

        let net = NetHandler::new(address, 5);
        let body = net.post("/night", &json!({ "night": true })).await.unwrap();
        assert_eq!(body, b"{\"ok\":true}");

        let sent = server.await.unwrap();
        assert!(sent.starts_with("POST /night HTTP/1.1\r\n"));
        assert!(sent.contains("Content-Length: 14\r\n"));
        assert!(sent.ends_with("\r\n\r\n{\"night\":true}"));
    }

    #[tokio::test]
    async fn error_status_carries_message() {
        let (address, _server) = one_shot_server(
            "HTTP/1.1 500 Internal Server Error\r\n\r\n{\"message\":\"LED output is stopped\"}",
        )
        .await;

        let net = NetHandler::new(address, 5);
        match net.get("/led").await {
            Err(NetError::Status { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "LED output is stopped");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
