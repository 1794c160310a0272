//! Classification of inbound server lines.

/// The parts of a server line the session cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerLine {
    /// Registration succeeded: a prefixed numeric reply `001` to `004`.
    RegistrationAck,
    /// Liveness check carrying the payload to echo back.
    Ping(String),
    /// Anything else.
    Other,
}

impl ServerLine {
    /// Classifies one line. Trailing CR/LF is ignored.
    ///
    /// A registration ack is `:<sender> 00N` with `N` in `1..=4`; the sender
    /// prefix is mandatory. A ping is `[:<sender> ]PING <payload>`; one leading
    /// `:` is stripped from the payload.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        let (sender, rest) = split_sender(line);

        if sender.is_some() && is_registration_numeric(rest) {
            return Self::RegistrationAck;
        }

        match rest.strip_prefix("PING ") {
            Some(payload) => Self::Ping(payload.strip_prefix(':').unwrap_or(payload).to_string()),
            None => Self::Other,
        }
    }

    /// The line to send back, if this line requires one.
    #[must_use]
    pub fn reply(&self) -> Option<String> {
        match self {
            Self::Ping(payload) => Some(format!("PONG {payload}")),
            Self::RegistrationAck | Self::Other => None,
        }
    }
}

/// Splits `:<sender> <rest>` into its parts. Lines without a well-formed
/// sender prefix come back whole.
fn split_sender(line: &str) -> (Option<&str>, &str) {
    let Some(tail) = line.strip_prefix(':') else {
        return (None, line);
    };
    match tail.split_once(' ') {
        Some((sender, rest))
            if !sender.is_empty() && !sender.chars().any(char::is_whitespace) =>
        {
            (Some(sender), rest)
        }
        _ => (None, line),
    }
}

fn is_registration_numeric(rest: &str) -> bool {
    matches!(rest.as_bytes(), [b'0', b'0', b'1'..=b'4', ..])
}
