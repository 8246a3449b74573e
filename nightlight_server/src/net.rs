use crate::{
    controller::ColorController,
    errors::{HttpError, SinkError},
    led_controllers::PwmSink,
};
use log::{debug, error, warn};
use nightlight_common::{
    packets::{Ack, ErrorBody, LedRequest, LedStatus, NightRequest},
    serde_json::{self, Value},
    PATH_LED, PATH_NIGHT,
};
use serde::Serialize;
use std::{
    io::{self, BufRead, BufReader, ErrorKind, Read, Write},
    net::{IpAddr, SocketAddr, TcpListener, TcpStream},
    time::Duration,
};

pub const MAX_HEAD_SIZE: usize = 8 * 1024;
pub const MAX_BODY_SIZE: usize = 64 * 1024;
const READ_TIMEOUT: Duration = Duration::from_secs(5);

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other(String),
}

impl From<&str> for Method {
    fn from(method: &str) -> Self {
        match method {
            "GET" => Method::Get,
            "POST" => Method::Post,
            other => Method::Other(other.to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    /// Path without the query string.
    pub path: String,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Reads one request: request line, headers, then `Content-Length` bytes
    /// of body. Chunked bodies are not supported.
    pub fn read_from<R: BufRead>(reader: &mut R) -> Result<Self, HttpError> {
        let mut line = String::new();
        let (method, path, content_length) = {
            let mut head = reader.by_ref().take(MAX_HEAD_SIZE as u64);

            if head.read_line(&mut line)? == 0 {
                return Err(HttpError::Closed);
            }
            let (method, path) = parse_request_line(&line)?;

            let mut content_length = 0;
            loop {
                line.clear();
                if head.read_line(&mut line)? == 0 {
                    return Err(if head.limit() == 0 {
                        HttpError::HeadTooLarge(MAX_HEAD_SIZE)
                    } else {
                        HttpError::Closed
                    });
                }

                let header = line.trim_end_matches(&['\r', '\n'][..]);
                if header.is_empty() {
                    break;
                }

                let (name, value) = header
                    .split_once(':')
                    .ok_or_else(|| HttpError::Header(header.to_owned()))?;
                if name.trim().eq_ignore_ascii_case("content-length") {
                    content_length = value
                        .trim()
                        .parse()
                        .map_err(|_| HttpError::Header(header.to_owned()))?;
                }
            }

            (method, path, content_length)
        };

        if content_length > MAX_BODY_SIZE {
            return Err(HttpError::BodyTooLarge(content_length));
        }
        let mut body = vec![0; content_length];
        reader.read_exact(&mut body)?;

        Ok(Self { method, path, body })
    }

    /// An empty body reads as JSON `null`, so every field takes its default.
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&self.body)
    }
}

fn parse_request_line(line: &str) -> Result<(Method, String), HttpError> {
    let malformed = || HttpError::RequestLine(line.trim_end().to_owned());

    let mut parts = line.split_whitespace();
    let method = parts.next().ok_or_else(malformed)?;
    let target = parts.next().ok_or_else(malformed)?;
    let version = parts.next().ok_or_else(malformed)?;
    if !version.starts_with("HTTP/1.") || parts.next().is_some() {
        return Err(malformed());
    }

    let path = target.split('?').next().unwrap_or(target);
    Ok((method.into(), path.to_owned()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self { status, body },
            Err(err) => {
                error!("Failed to serialize response: {}", err);
                Self {
                    status: 500,
                    body: b"{}".to_vec(),
                }
            }
        }
    }

    pub fn ok() -> Self {
        Self::json(200, &Ack::OK)
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(status, &ErrorBody::new(message))
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write!(
            writer,
            "HTTP/1.1 {} {}\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n",
            self.status,
            reason_phrase(self.status),
            self.body.len()
        )?;
        writer.write_all(&self.body)?;
        writer.flush()
    }
}

/// Turns a request into a controller call.
///
/// Only a failing sink is an error here, anything the client got wrong is
/// answered with a 4xx response.
pub fn dispatch<S: PwmSink>(
    controller: &ColorController<S>,
    request: &HttpRequest,
) -> Result<HttpResponse, SinkError> {
    let is_command = match (request.path.as_str(), &request.method) {
        (PATH_LED, Method::Get) => {
            let status = LedStatus::from(controller.snapshot());
            return Ok(HttpResponse::json(200, &status));
        }
        (PATH_LED, Method::Post) | (PATH_NIGHT, Method::Post) => true,
        (PATH_LED, _) | (PATH_NIGHT, _) => false,
        (path, _) => {
            return Ok(HttpResponse::error(404, format!("No route for {}", path)));
        }
    };
    if !is_command {
        return Ok(HttpResponse::error(405, "Method not allowed"));
    }

    let body = match request.json() {
        Ok(body) => body,
        Err(err) => {
            return Ok(HttpResponse::error(400, format!("Invalid JSON body: {}", err)));
        }
    };

    if request.path == PATH_LED {
        let led = LedRequest::from_json(&body);
        controller.apply(led.enabled, led.color)?;
    } else {
        let night = NightRequest::from_json(&body);
        controller.set_night(night.night);
    }

    Ok(HttpResponse::ok())
}

/// Serves a single request on `stream`, then closes it.
///
/// Returns the sink error if the LED could not be driven, the caller decides
/// what to do with the process.
pub fn handle_connection<S: PwmSink>(
    controller: &ColorController<S>,
    stream: TcpStream,
) -> Result<(), SinkError> {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown peer".into());
    if let Err(err) = stream.set_read_timeout(Some(READ_TIMEOUT)) {
        warn!("Failed to set read timeout for {}: {}", peer, err);
    }

    let mut reader = BufReader::new(&stream);
    let (response, failure) = match HttpRequest::read_from(&mut reader) {
        Ok(request) => {
            debug!("{:?} {} from {}", request.method, request.path, peer);
            match dispatch(controller, &request) {
                Ok(response) => (response, None),
                Err(err) => (HttpResponse::error(500, err.to_string()), Some(err)),
            }
        }
        Err(err) => match err.status() {
            Some(status) => {
                warn!("Bad request from {}: {}", peer, err);
                (HttpResponse::error(status, err.to_string()), None)
            }
            None => {
                debug!("Dropping connection from {}: {}", peer, err);
                return Ok(());
            }
        },
    };

    let mut writer = &stream;
    if let Err(err) = response.write_to(&mut writer) {
        warn!("Failed to answer {}: {}", peer, err);
    }

    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

// ENOMEM, ENFILE, EMFILE, ENOBUFS: out of descriptors or buffers until
// other connections close
#[cfg(target_os = "linux")]
const TRANSIENT_ACCEPT_ERRNOS: [i32; 4] = [12, 23, 24, 105];
#[cfg(not(target_os = "linux"))]
const TRANSIENT_ACCEPT_ERRNOS: [i32; 0] = [];

/// Whether a failed `accept` only lost one connection and the listener
/// itself is still usable.
pub fn is_transient_accept_error(err: &io::Error) -> bool {
    match err.kind() {
        ErrorKind::ConnectionAborted
        | ErrorKind::ConnectionReset
        | ErrorKind::Interrupted
        | ErrorKind::TimedOut => true,
        _ => err
            .raw_os_error()
            .map_or(false, |errno| TRANSIENT_ACCEPT_ERRNOS.contains(&errno)),
    }
}

pub struct NetHandler {
    listener: TcpListener,
}

impl NetHandler {
    pub fn new(address: IpAddr, port: u16) -> io::Result<Self> {
        let listener = TcpListener::bind(SocketAddr::new(address, port))?;
        // Polled so the app can notice shutdown requests
        listener.set_nonblocking(true)?;

        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// `Ok(None)` when nobody is waiting.
    pub fn try_accept(&self) -> io::Result<Option<TcpStream>> {
        match self.listener.accept() {
            Ok((stream, _)) => {
                stream.set_nonblocking(false)?;
                Ok(Some(stream))
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(err) => Err(err),
        }
    }
}
