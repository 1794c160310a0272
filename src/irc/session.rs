//! Chat session over one persistent socket.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::state::SharedState;
use super::{ServerLine, SessionError, SessionState};
use crate::config::IrcConfig;
use crate::diagnostics::Diagnostics;

type BoxedReader = BufReader<Box<dyn AsyncRead + Send + Unpin>>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Write side of the socket, shared by `message` and the keepalive responder.
///
/// The async mutex is held for a whole line, so two writers never interleave.
#[derive(Clone)]
struct LineWriter {
    inner: Arc<tokio::sync::Mutex<BoxedWriter>>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl LineWriter {
    async fn send_line(&self, line: &str) -> std::io::Result<()> {
        self.diagnostics.line_sent(line);
        let mut framed = String::with_capacity(line.len() + 2);
        framed.push_str(line);
        framed.push_str("\r\n");

        let mut writer = self.inner.lock().await;
        writer.write_all(framed.as_bytes()).await?;
        writer.flush().await
    }
}

/// Longest accepted inbound line: 8191 bytes of IRCv3 message tags plus the
/// 512-byte message itself, CRLF included.
pub const MAX_LINE_LEN: usize = 8191 + 512;

/// Reads one line, lossily decoded. Returns `None` at end of stream.
///
/// A line longer than [`MAX_LINE_LEN`] is an `InvalidData` error.
async fn read_line(
    reader: &mut BoxedReader,
    buf: &mut Vec<u8>,
    diagnostics: &dyn Diagnostics,
) -> std::io::Result<Option<String>> {
    buf.clear();
    let read = (&mut *reader)
        .take(MAX_LINE_LEN as u64)
        .read_until(b'\n', buf)
        .await?;
    if read == 0 {
        return Ok(None);
    }
    if read == MAX_LINE_LEN && !buf.ends_with(b"\n") {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("IRC line longer than {MAX_LINE_LEN} bytes"),
        ));
    }
    let line = String::from_utf8_lossy(buf)
        .trim_end_matches(['\r', '\n'])
        .to_string();
    diagnostics.line_received(&line);
    Ok(Some(line))
}

/// An IRC session joined to a single channel.
///
/// Created by [`ChatSession::connect`] (or [`ChatSession::handshake`] over an
/// existing stream), which returns once the channel is joined. The keepalive
/// responder is started separately with [`ChatSession::start_keepalive`];
/// [`ChatSession::message`] only works after that.
pub struct ChatSession {
    config: IrcConfig,
    writer: LineWriter,
    /// Owned by the handshake, then handed to the responder.
    reader: Mutex<Option<BoxedReader>>,
    state: SharedState,
    diagnostics: Arc<dyn Diagnostics>,
}

impl ChatSession {
    /// Opens a TCP connection to the configured server and joins the channel.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the socket cannot be opened or fails
    /// during the handshake, and [`SessionError::Connect`] if the server
    /// closes the connection before acknowledging registration.
    pub async fn connect(
        config: IrcConfig,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Result<Self, SessionError> {
        tracing::info!(server = %config.server, port = config.port, "Connecting to IRC");
        let stream = TcpStream::connect((config.server.as_str(), config.port)).await?;
        Self::handshake(stream, config, diagnostics).await
    }

    /// Registers and joins the channel over an already open stream.
    ///
    /// # Errors
    ///
    /// Same as [`ChatSession::connect`], minus socket creation.
    pub async fn handshake<S>(
        stream: S,
        config: IrcConfig,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Result<Self, SessionError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(read_half);
        let writer: BoxedWriter = Box::new(write_half);

        let session = Self {
            config,
            writer: LineWriter {
                inner: Arc::new(tokio::sync::Mutex::new(writer)),
                diagnostics: Arc::clone(&diagnostics),
            },
            reader: Mutex::new(None),
            state: SharedState::default(),
            diagnostics,
        };

        let mut reader = BufReader::new(reader);
        session.state.transition(SessionState::Connecting);
        if let Err(e) = session.register(&mut reader).await {
            session.state.fault();
            return Err(e);
        }
        if let Err(e) = session.join().await {
            session.state.fault();
            return Err(e);
        }
        *session.reader.lock().unwrap_or_else(PoisonError::into_inner) = Some(reader);

        Ok(session)
    }

    /// Announces the identity and waits for the server's welcome.
    async fn register(&self, reader: &mut BoxedReader) -> Result<(), SessionError> {
        let nick = &self.config.nick;
        self.writer.send_line(&format!("NICK {nick}")).await?;
        self.writer
            .send_line(&format!("USER {nick} 0 * : {}", self.config.real_name))
            .await?;

        let mut buf = Vec::new();
        loop {
            let Some(line) = read_line(reader, &mut buf, self.diagnostics.as_ref()).await? else {
                return Err(SessionError::Connect);
            };
            match ServerLine::parse(&line) {
                ServerLine::RegistrationAck => break,
                // Some servers hold registration until their ping is answered.
                ping @ ServerLine::Ping(_) => {
                    if let Some(reply) = ping.reply() {
                        self.writer.send_line(&reply).await?;
                    }
                }
                ServerLine::Other => {}
            }
        }

        tracing::info!(nick = %nick, "Connected to IRC");
        self.state.transition(SessionState::Registered);
        Ok(())
    }

    async fn join(&self) -> Result<(), SessionError> {
        let channel = &self.config.channel;
        let join = match self.config.channel_key() {
            Some(key) => format!("JOIN {channel} {key}"),
            None => format!("JOIN {channel}"),
        };
        self.writer.send_line(&join).await?;
        self.send_privmsg(&self.config.greeting).await?;

        tracing::info!(channel = %channel, "Joined IRC channel");
        self.state.transition(SessionState::Joined);
        Ok(())
    }

    /// Starts the keepalive responder and makes the session active.
    ///
    /// The responder runs on its own task, reading every further line from
    /// the socket and answering each `PING` with the matching `PONG` before
    /// reading on. It stops when the server closes the socket, on an I/O
    /// error, or when the returned handle is stopped or dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotJoined`] unless the session is `Joined`.
    pub fn start_keepalive(&self) -> Result<KeepaliveHandle, SessionError> {
        let state = self.state.get();
        if state != SessionState::Joined {
            return Err(SessionError::NotJoined(state));
        }
        let reader = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(SessionError::NotJoined(state))?;

        self.state.transition(SessionState::Active);

        let cancel = CancellationToken::new();
        let task = tokio::spawn(respond_to_pings(
            reader,
            self.writer.clone(),
            self.state.clone(),
            Arc::clone(&self.diagnostics),
            cancel.clone(),
        ));

        Ok(KeepaliveHandle {
            cancel,
            state: self.state.clone(),
            task: Some(task),
        })
    }

    /// Posts one line of text to the channel.
    ///
    /// Line breaks inside `text` are replaced with spaces so one call always
    /// produces exactly one protocol line. Returns once the line is written.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotActive`] if keepalive has not been started
    /// or the session has faulted, and [`SessionError::Send`] if the write
    /// fails (the session is then faulted).
    pub async fn message(&self, text: &str) -> Result<(), SessionError> {
        let state = self.state.get();
        if state != SessionState::Active {
            return Err(SessionError::NotActive(state));
        }
        if let Err(e) = self.send_privmsg(text).await {
            self.state.fault();
            return Err(SessionError::Send(e));
        }
        tracing::info!(text = %text, "Said on IRC");
        Ok(())
    }

    async fn send_privmsg(&self, text: &str) -> std::io::Result<()> {
        let text = text.replace(['\r', '\n'], " ");
        self.writer
            .send_line(&format!("PRIVMSG {} :{text}", self.config.channel))
            .await
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.get()
    }
}

/// Handle to a running keepalive responder.
///
/// Stopping or dropping the handle ends the responder and moves the session
/// to `Stopped`, after which [`ChatSession::message`] fails.
#[derive(Debug)]
pub struct KeepaliveHandle {
    cancel: CancellationToken,
    state: SharedState,
    task: Option<JoinHandle<Result<(), SessionError>>>,
}

impl KeepaliveHandle {
    /// Stops the responder at its next read.
    pub fn stop(&self) {
        self.state.stop();
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Waits for the responder to end and returns why it ended.
    ///
    /// Returns `Ok(())` once the responder was stopped, or if it was already
    /// waited on.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] or [`SessionError::Io`] when the
    /// connection died, and [`SessionError::Responder`] if the task panicked.
    pub async fn wait(&mut self) -> Result<(), SessionError> {
        let Some(task) = self.task.as_mut() else {
            return Ok(());
        };
        let result = match task.await {
            Ok(result) => result,
            Err(e) => Err(SessionError::Responder(e.to_string())),
        };
        self.task = None;
        result
    }
}

impl Drop for KeepaliveHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn respond_to_pings(
    mut reader: BoxedReader,
    writer: LineWriter,
    state: SharedState,
    diagnostics: Arc<dyn Diagnostics>,
    cancel: CancellationToken,
) -> Result<(), SessionError> {
    tracing::debug!("Keepalive responder started");
    let mut buf = Vec::new();

    loop {
        let read = tokio::select! {
            biased;

            () = cancel.cancelled() => {
                tracing::debug!("Keepalive responder stopped");
                state.stop();
                return Ok(());
            }

            read = read_line(&mut reader, &mut buf, diagnostics.as_ref()) => read,
        };

        let line = match read {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::warn!("IRC server closed the connection");
                state.fault();
                return Err(SessionError::Closed);
            }
            Err(e) => {
                tracing::warn!(error = %e, "IRC read failed");
                state.fault();
                return Err(SessionError::Io(e));
            }
        };

        if let Some(reply) = ServerLine::parse(&line).reply() {
            if let Err(e) = writer.send_line(&reply).await {
                tracing::warn!(error = %e, "Failed to answer server ping");
                state.fault();
                return Err(SessionError::Io(e));
            }
        }
    }
}
