//! Minimal STOMP 1.2 frame codec for text WebSocket messages.
//!
//! Only the commands a subscribing client sends or receives are modelled.
//! Header values are escaped on every frame except `CONNECT`/`CONNECTED`,
//! which STOMP 1.2 leaves raw.

use std::fmt;
use std::time::Duration;

const NUL: char = '\0';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Connected,
    Subscribe,
    Unsubscribe,
    Disconnect,
    Send,
    Message,
    Receipt,
    Error,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Connected => "CONNECTED",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Disconnect => "DISCONNECT",
            Command::Send => "SEND",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "CONNECT" | "STOMP" => Command::Connect,
            "CONNECTED" => Command::Connected,
            "SUBSCRIBE" => Command::Subscribe,
            "UNSUBSCRIBE" => Command::Unsubscribe,
            "DISCONNECT" => Command::Disconnect,
            "SEND" => Command::Send,
            "MESSAGE" => Command::Message,
            "RECEIPT" => Command::Receipt,
            "ERROR" => Command::Error,
            _ => return None,
        })
    }

    fn escapes_headers(self) -> bool {
        !matches!(self, Command::Connect | Command::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StompError {
    #[error("unknown STOMP command '{0}'")]
    UnknownCommand(String),
    #[error("malformed STOMP header line '{0}'")]
    MalformedHeader(String),
    #[error("STOMP frame is missing its NUL terminator")]
    Unterminated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value for `name`; repeated headers keep the first occurrence.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn connect(host: &str, heartbeat: Duration) -> Self {
        let beat = heartbeat.as_millis();
        Frame::new(Command::Connect)
            .header("accept-version", "1.2,1.1")
            .header("host", host)
            .header("heart-beat", format!("{beat},{beat}"))
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Frame::new(Command::Subscribe)
            .header("id", id)
            .header("destination", destination)
            .header("ack", "auto")
    }

    pub fn unsubscribe(id: &str) -> Self {
        Frame::new(Command::Unsubscribe).header("id", id)
    }

    pub fn disconnect() -> Self {
        Frame::new(Command::Disconnect)
    }

    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(name));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        if !self.body.is_empty() {
            out.push_str(&format!("content-length:{}\n", self.body.len()));
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push(NUL);
        out
    }

    /// Parses one frame. Returns `Ok(None)` for a heart-beat (only EOLs).
    pub fn parse(text: &str) -> Result<Option<Frame>, StompError> {
        let text = text.trim_start_matches(['\r', '\n']);
        if text.is_empty() {
            return Ok(None);
        }

        let (head, rest) = split_head(text).ok_or(StompError::Unterminated)?;
        let mut lines = head.lines();
        let raw_command = lines.next().unwrap_or_default();
        let command = Command::parse(raw_command)
            .ok_or_else(|| StompError::UnknownCommand(raw_command.to_string()))?;

        let mut headers = Vec::new();
        for line in lines {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| StompError::MalformedHeader(line.to_string()))?;
            if command.escapes_headers() {
                headers.push((unescape_header(name)?, unescape_header(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        let frame = Frame {
            command,
            headers,
            body: String::new(),
        };
        let body = match frame
            .get("content-length")
            .and_then(|len| len.trim().parse::<usize>().ok())
        {
            Some(len) if rest.len() > len && rest.is_char_boundary(len) => &rest[..len],
            _ => rest.split(NUL).next().filter(|_| rest.contains(NUL)).ok_or(StompError::Unterminated)?,
        };

        Ok(Some(Frame {
            body: body.to_string(),
            ..frame
        }))
    }
}

/// Negotiated interval at which we must send heart-beats, per STOMP 1.2:
/// `max(our cx, server sy)` unless either side declines with 0.
pub fn outgoing_heartbeat(ours: Duration, connected: &Frame) -> Option<Duration> {
    let (_, sy) = server_heartbeat(connected)?;
    negotiate(ours, sy)
}

/// Negotiated interval at which the broker promised to send something:
/// `max(our cy, server sx)` unless either side declines with 0.
pub fn incoming_heartbeat(ours: Duration, connected: &Frame) -> Option<Duration> {
    let (sx, _) = server_heartbeat(connected)?;
    negotiate(ours, sx)
}

fn server_heartbeat(connected: &Frame) -> Option<(u64, u64)> {
    let (sx, sy) = connected.get("heart-beat")?.split_once(',')?;
    Some((sx.trim().parse().ok()?, sy.trim().parse().ok()?))
}

fn negotiate(ours: Duration, theirs: u64) -> Option<Duration> {
    let ours = ours.as_millis() as u64;
    if ours == 0 || theirs == 0 {
        return None;
    }
    Some(Duration::from_millis(ours.max(theirs)))
}

/// Splits at the blank line ending the header block. Lines may end in
/// either `\n` or `\r\n`.
fn split_head(text: &str) -> Option<(&str, &str)> {
    let mut start = 0;
    while let Some(offset) = text[start..].find('\n') {
        let end = start + offset;
        if matches!(&text[start..end], "" | "\r") {
            return Some((&text[..start], &text[end + 1..]));
        }
        start = end + 1;
    }
    None
}

fn escape_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(raw: &str) -> Result<String, StompError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => return Err(StompError::MalformedHeader(raw.to_string())),
        }
    }
    Ok(out)
}
