//! Module `channel`
//!
//! Owns the control connection: resolves and connects to the server, writes
//! CRLF-terminated command lines and reads back exactly one (possibly
//! multi-line) reply per command.

use log::{debug, info, warn};
use std::io;
use std::net::{IpAddr, SocketAddr};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::error::{FtpClientError, FtpResult, ReplyError};
use crate::protocol::responses::{SERVICE_NOT_AVAILABLE, SERVICE_READY};
use crate::protocol::{Command, Reply, ReplyClass, ReplyLine};

/// Bounds applied while reading replies
#[derive(Debug, Clone, Copy)]
pub struct ReplyLimits {
    pub max_line: usize,
    pub max_lines: usize,
}

impl Default for ReplyLimits {
    fn default() -> Self {
        Self {
            max_line: 8192,
            max_lines: 128,
        }
    }
}

pub struct ControlChannel {
    reader: BufReader<TcpStream>,
    local_addr: SocketAddr,
    peer_addr: SocketAddr,
    limits: ReplyLimits,
    line: Vec<u8>,
}

/// Resolves `address` as a literal IP or through name resolution,
/// preferring IPv4 since PORT and PASV only carry IPv4 addresses.
pub async fn resolve(address: &str, port: u16) -> io::Result<SocketAddr> {
    if let Ok(ip) = address.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }

    let candidates: Vec<SocketAddr> = tokio::net::lookup_host((address, port)).await?.collect();
    candidates
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| candidates.first())
        .copied()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no address found for {}", address),
            )
        })
}

impl ControlChannel {
    /// Opens the control connection. The greeting is not consumed here, see
    /// [`ControlChannel::read_greeting`].
    pub async fn connect(address: &str, port: u16, limits: ReplyLimits) -> FtpResult<Self> {
        let server = resolve(address, port)
            .await
            .map_err(FtpClientError::control)?;
        info!("Connecting to FTP server {} ({})", address, server);

        let stream = TcpStream::connect(server)
            .await
            .map_err(FtpClientError::control)?;
        Self::from_stream(stream, limits)
    }

    pub fn from_stream(stream: TcpStream, limits: ReplyLimits) -> FtpResult<Self> {
        let local_addr = stream.local_addr().map_err(FtpClientError::control)?;
        let peer_addr = stream.peer_addr().map_err(FtpClientError::control)?;
        debug!("Control connection {} -> {}", local_addr, peer_addr);

        Ok(Self {
            reader: BufReader::new(stream),
            local_addr,
            peer_addr,
            limits,
            line: Vec::with_capacity(256),
        })
    }

    /// Client side IP of the control connection, used for PORT
    pub fn local_ip(&self) -> IpAddr {
        self.local_addr.ip()
    }

    pub fn peer_ip(&self) -> IpAddr {
        self.peer_addr.ip()
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Reads the server greeting, which must be 220.
    pub async fn read_greeting(&mut self) -> FtpResult<Reply> {
        let reply = self.read_reply().await?;
        match reply.classify(&[SERVICE_READY]) {
            ReplyClass::Success => {
                info!("Server ready: {}", reply.message());
                Ok(reply)
            }
            ReplyClass::Failure(_) => Err(FtpClientError::Protocol {
                command: "Greeting".into(),
                reply,
            }),
        }
    }

    /// Sends one command and returns its reply, whatever the code.
    pub async fn send_command(&mut self, command: &Command) -> FtpResult<Reply> {
        self.write_command(command).await?;
        self.read_reply().await
    }

    /// Sends one command and requires one of its expected reply codes.
    pub async fn execute(&mut self, command: &Command) -> FtpResult<Reply> {
        let reply = self.send_command(command).await?;
        check_reply(command.verb(), reply, command.expected_codes())
    }

    /// Reads one more reply (e.g. the 226 after a transfer) and requires one
    /// of `expected`.
    pub async fn expect_reply(&mut self, what: &str, expected: &[u16]) -> FtpResult<Reply> {
        let reply = self.read_reply().await?;
        check_reply(what, reply, expected)
    }

    pub async fn write_command(&mut self, command: &Command) -> FtpResult<()> {
        let mut line = command.to_line();
        if line.contains(['\r', '\n']) {
            return Err(FtpClientError::InvalidArgument(format!(
                "line break in {} argument",
                command.verb()
            )));
        }
        debug!(">> {}", command);
        line.push_str("\r\n");

        let stream = self.reader.get_mut();
        stream
            .write_all(line.as_bytes())
            .await
            .map_err(FtpClientError::control)?;
        stream.flush().await.map_err(FtpClientError::control)?;
        Ok(())
    }

    /// Reads a complete reply. Multi-line replies (`xyz-` ... `xyz `) are
    /// collected up to the configured line count. A 421 reply ends the
    /// session and is returned as [`FtpClientError::SessionTerminated`].
    ///
    /// Oversized lines and replies are rejected, but the rest of the reply is
    /// still consumed so the next command reads its own reply.
    pub async fn read_reply(&mut self) -> FtpResult<Reply> {
        let text = match self.read_line().await {
            Ok(text) => text,
            Err(FtpClientError::Reply(ReplyError::LineTooLong(max))) => {
                let head = String::from_utf8_lossy(&self.line[..self.line.len().min(4)]).into_owned();
                if let Ok(head) = ReplyLine::parse(&head) {
                    if !head.last {
                        self.skip_to_reply_end(head.code).await?;
                    }
                }
                return Err(ReplyError::LineTooLong(max).into());
            }
            Err(e) => return Err(e),
        };
        let first = ReplyLine::parse(&text)?;
        let code = first.code;
        let mut lines = vec![first.text];

        if !first.last {
            loop {
                if lines.len() >= self.limits.max_lines {
                    self.skip_to_reply_end(code).await?;
                    return Err(ReplyError::TooManyLines(self.limits.max_lines).into());
                }
                let text = match self.read_line().await {
                    Ok(text) => text,
                    Err(FtpClientError::Reply(e)) => {
                        self.skip_to_reply_end(code).await?;
                        return Err(e.into());
                    }
                    Err(e) => return Err(e),
                };
                match ReplyLine::parse(&text) {
                    Ok(line) if line.code == code && line.last => {
                        lines.push(line.text);
                        break;
                    }
                    Ok(line) if line.code == code => lines.push(line.text),
                    // RFC 959 allows free text lines inside a multi-line reply
                    _ => lines.push(text.trim_end_matches(['\r', '\n']).to_string()),
                }
            }
        }

        let reply = Reply::from_lines(code, lines);
        debug!("<< {}", reply);

        if reply.code() == SERVICE_NOT_AVAILABLE {
            warn!("Server is closing the control connection: {}", reply);
            return Err(FtpClientError::SessionTerminated(reply.to_string()));
        }
        Ok(reply)
    }

    /// Discards lines up to and including the `code ` line closing a
    /// multi-line reply.
    async fn skip_to_reply_end(&mut self, code: u16) -> FtpResult<()> {
        warn!("Discarding the rest of an oversized {} reply", code);
        loop {
            match self.read_line().await {
                Ok(text) => {
                    if let Ok(line) = ReplyLine::parse(&text) {
                        if line.code == code && line.last {
                            return Ok(());
                        }
                    }
                }
                // Already consumed up to its line end
                Err(FtpClientError::Reply(_)) => {}
                Err(e) => return Err(e),
            }
        }
    }

    /// Reads one CRLF-terminated line. A line over the limit is consumed up
    /// to its line end and reported as [`ReplyError::LineTooLong`], with its
    /// first bytes left in `self.line`.
    async fn read_line(&mut self) -> FtpResult<String> {
        self.line.clear();
        // CRLF on top of the line budget
        let limit = self.limits.max_line as u64 + 2;
        let n = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut self.line)
            .await
            .map_err(FtpClientError::control)?;

        if n == 0 {
            return Err(closed_mid_reply("server closed the control connection"));
        }
        if self.line.last() != Some(&b'\n') {
            if n as u64 == limit {
                self.discard_line().await?;
                return Err(ReplyError::LineTooLong(self.limits.max_line).into());
            }
            return Err(closed_mid_reply(
                "control connection closed in the middle of a reply",
            ));
        }

        String::from_utf8(self.line.clone()).map_err(|_| ReplyError::NotUtf8.into())
    }

    /// Consumes buffered input up to and including the next `\n`.
    async fn discard_line(&mut self) -> FtpResult<()> {
        loop {
            let (found, available) = {
                let buf = self
                    .reader
                    .fill_buf()
                    .await
                    .map_err(FtpClientError::control)?;
                (buf.iter().position(|b| *b == b'\n'), buf.len())
            };
            match found {
                Some(pos) => {
                    self.reader.consume(pos + 1);
                    return Ok(());
                }
                None if available == 0 => {
                    return Err(closed_mid_reply(
                        "control connection closed in the middle of a reply",
                    ));
                }
                None => self.reader.consume(available),
            }
        }
    }

    /// USER then PASS, expecting 331 then 230.
    pub async fn login(&mut self, user: &str, pass: &str) -> FtpResult<()> {
        let reply = self.send_command(&Command::User(user.to_string())).await?;
        if let ReplyClass::Failure(_) = reply.classify(Command::User(String::new()).expected_codes())
        {
            return Err(FtpClientError::Auth(reply));
        }

        let reply = self.send_command(&Command::Pass(pass.to_string())).await?;
        if let ReplyClass::Failure(_) = reply.classify(Command::Pass(String::new()).expected_codes())
        {
            return Err(FtpClientError::Auth(reply));
        }

        info!("Logged in as {}", user);
        Ok(())
    }

    /// Closes the control connection.
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.reader.get_mut().shutdown().await {
            debug!("Control connection shutdown: {}", e);
        }
    }
}

fn closed_mid_reply(message: &str) -> FtpClientError {
    FtpClientError::control(io::Error::new(io::ErrorKind::UnexpectedEof, message.to_string()))
}

fn check_reply(what: &str, reply: Reply, expected: &[u16]) -> FtpResult<Reply> {
    match reply.classify(expected) {
        ReplyClass::Success => Ok(reply),
        ReplyClass::Failure(_) => Err(FtpClientError::Protocol {
            command: what.to_string(),
            reply,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Control channel whose server side writes `script` and then waits.
    async fn scripted_channel(script: Vec<u8>, limits: ReplyLimits) -> ControlChannel {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream.write_all(&script).await.unwrap();
            let mut sink = Vec::new();
            let _ = stream.read_to_end(&mut sink).await;
        });
        let stream = TcpStream::connect(addr).await.unwrap();
        ControlChannel::from_stream(stream, limits).unwrap()
    }

    fn limits(max_line: usize, max_lines: usize) -> ReplyLimits {
        ReplyLimits {
            max_line,
            max_lines,
        }
    }

    #[tokio::test]
    async fn test_long_line_keeps_replies_in_step() {
        let mut script = format!("250 {}\r\n", "x".repeat(9000)).into_bytes();
        script.extend_from_slice(b"550 No such directory\r\n250 Directory changed\r\n");
        let mut channel = scripted_channel(script, ReplyLimits::default()).await;

        let err = channel.read_reply().await.unwrap_err();
        assert!(matches!(
            err,
            FtpClientError::Reply(ReplyError::LineTooLong(8192))
        ));
        assert_eq!(channel.read_reply().await.unwrap().code(), 550);
        assert_eq!(channel.read_reply().await.unwrap().code(), 250);
    }

    #[tokio::test]
    async fn test_too_many_lines_discards_whole_reply() {
        let script = b"211-a\r\n211-b\r\n211-c\r\n211-d\r\n211 end\r\n200 ok\r\n".to_vec();
        let mut channel = scripted_channel(script, limits(64, 3)).await;

        let err = channel.read_reply().await.unwrap_err();
        assert!(matches!(
            err,
            FtpClientError::Reply(ReplyError::TooManyLines(3))
        ));
        let next = channel.read_reply().await.unwrap();
        assert_eq!(next.code(), 200);
        assert_eq!(next.message(), "ok");
    }

    #[tokio::test]
    async fn test_long_first_line_of_multi_line_reply() {
        let mut script = format!("211-{}\r\n", "y".repeat(200)).into_bytes();
        script.extend_from_slice(b"211-more\r\n211 end\r\n200 ok\r\n");
        let mut channel = scripted_channel(script, limits(64, 16)).await;

        assert!(matches!(
            channel.read_reply().await,
            Err(FtpClientError::Reply(ReplyError::LineTooLong(64)))
        ));
        assert_eq!(channel.read_reply().await.unwrap().code(), 200);
    }

    #[tokio::test]
    async fn test_long_continuation_line() {
        let mut script = b"211-start\r\n".to_vec();
        script.extend_from_slice(format!("211-{}\r\n", "z".repeat(200)).as_bytes());
        script.extend_from_slice(b"211 end\r\n226 done\r\n");
        let mut channel = scripted_channel(script, limits(64, 16)).await;

        assert!(channel.read_reply().await.is_err());
        assert_eq!(channel.read_reply().await.unwrap().code(), 226);
    }

    #[tokio::test]
    async fn test_multi_line_reply_collected() {
        let script = b"220-Welcome\r\nfree text\r\n220 Ready\r\n".to_vec();
        let mut channel = scripted_channel(script, ReplyLimits::default()).await;

        let reply = channel.read_greeting().await.unwrap();
        assert_eq!(reply.code(), 220);
        assert_eq!(reply.message(), "Ready");
        assert_eq!(reply.lines(), ["Welcome", "free text", "Ready"]);
    }
}
