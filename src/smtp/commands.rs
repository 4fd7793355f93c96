//! Per-connection command state machine

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::smtp::address::{parse_recipient, parse_sender};
use crate::smtp::auth::{AuthExchange, AuthMechanism, AuthStep, Mechanism};
use crate::smtp::backend::Backend;
use crate::smtp::config::SmtpConfig;
use crate::smtp::error::SmtpError;
use crate::smtp::framer::LineFramer;
use crate::smtp::response::SmtpResponse;
use crate::smtp::session::SmtpSession;
use crate::smtp::sink::MessageSink;
use crate::smtp::tokenizer::tokenize;
use crate::smtp::transport::Transport;

const HELP_TEXT: &str = "HELO, EHLO, AUTH, MAIL FROM, RCPT TO, DATA, RSET, NOOP, HELP, QUIT";

/// Drives one SMTP connection.
///
/// Bytes received from the client are pushed in with [`SmtpHandler::feed`];
/// replies go out through the [`Transport`] and accepted messages through
/// the [`MessageSink`]. The handler never blocks and never reads on its own.
///
/// MAIL, RCPT and DATA are refused until an AUTH exchange succeeds.
pub struct SmtpHandler<T: Transport, S: MessageSink> {
    config: Arc<SmtpConfig>,
    backend: Backend,
    transport: T,
    sink: S,
    framer: LineFramer,
    session: SmtpSession,
    closed: bool,
}

impl<T: Transport, S: MessageSink> SmtpHandler<T, S> {
    /// Create a handler and send the 220 greeting
    pub fn new(
        config: Arc<SmtpConfig>,
        backend: Backend,
        transport: T,
        sink: S,
    ) -> Result<Self, SmtpError> {
        let framer = LineFramer::with_limit(config.line_limit);
        let mut handler = Self {
            config,
            backend,
            transport,
            sink,
            framer,
            session: SmtpSession::new(),
            closed: false,
        };

        info!(
            session = %handler.session.id,
            remote = %handler.transport.remote_address(),
            "Session opened"
        );
        let greeting = SmtpResponse::greeting(&handler.config.banner);
        handler.send(&greeting)?;
        Ok(handler)
    }

    pub fn id(&self) -> Uuid {
        self.session.id
    }

    pub fn session(&self) -> &SmtpSession {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Whether QUIT was processed or the transport was closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Process a chunk of bytes received from the client.
    ///
    /// Complete lines are handled in order; a partial line waits for the next
    /// chunk. An over-long line gets a 500 reply and the connection stays
    /// usable. Only transport failures are returned as errors, after being
    /// reported to the sink.
    pub fn feed(&mut self, data: &[u8]) -> Result<(), SmtpError> {
        if self.closed {
            return Err(SmtpError::ConnectionClosed);
        }

        let mut lines = Vec::new();
        let framed = self.framer.write(data, |line| {
            lines.push(String::from_utf8_lossy(line).into_owned())
        });

        let result = self.process(lines, framed);
        if let Err(ref e) = result {
            self.sink.on_error(e);
        }
        result
    }

    fn process(&mut self, lines: Vec<String>, framed: Result<(), SmtpError>) -> Result<(), SmtpError> {
        for line in lines {
            if self.closed {
                return Ok(());
            }
            self.handle_line(&line)?;
        }

        if let Err(e) = framed {
            if self.closed {
                return Ok(());
            }
            warn!(session = %self.session.id, error = %e, "Discarding over-long line");
            self.send(&e.to_response())?;
        }

        Ok(())
    }

    /// Handle one framed line, without its delimiter.
    ///
    /// Returns the code of the reply that was sent, or `None` for a line of
    /// message text, which gets no reply.
    pub fn handle_line(&mut self, line: &str) -> Result<Option<u16>, SmtpError> {
        if self.closed {
            return Err(SmtpError::ConnectionClosed);
        }

        if self.session.data_mode {
            return self.handle_data_line(line);
        }

        let args = tokenize(line, None);
        let command = args
            .first()
            .map(|arg| arg.to_ascii_lowercase())
            .unwrap_or_default();

        let result = match command.as_str() {
            "helo" => self.handle_helo(&args),
            "ehlo" => self.handle_ehlo(&args),
            "help" => Ok(SmtpResponse::new(250, HELP_TEXT)),
            "noop" => Ok(SmtpResponse::ok()),
            "rset" => self.handle_rset(),
            "auth" => self.handle_auth(&args),
            "mail" => self.handle_mail(&args),
            "rcpt" => self.handle_rcpt(&args),
            "data" => self.handle_data(),
            "quit" => return self.handle_quit(),
            _ if self.session.auth_in_progress() => self.handle_auth_response(line),
            _ => Err(SmtpError::CommandUnrecognized),
        };

        let response = match result {
            Ok(response) => response,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                debug!(session = %self.session.id, command = %command, error = %e, "Command refused");
                e.to_response()
            }
        };

        self.send(&response)?;
        Ok(Some(response.code))
    }

    /// Handle HELO command
    fn handle_helo(&mut self, args: &[String]) -> Result<SmtpResponse, SmtpError> {
        let domain = client_domain(args, "Invalid HELO argument")?;
        self.session.greet(domain);

        Ok(SmtpResponse::helo(
            &self.config.domain,
            domain,
            &self.transport.remote_address(),
        ))
    }

    /// Handle EHLO command
    fn handle_ehlo(&mut self, args: &[String]) -> Result<SmtpResponse, SmtpError> {
        let domain = client_domain(args, "Invalid EHLO argument")?;
        self.session.greet(domain);

        Ok(SmtpResponse::ehlo(
            &self.config.domain,
            domain,
            &self.transport.remote_address(),
            &[AuthMechanism::ADVERTISED, "HELP"],
        ))
    }

    /// Handle RSET command
    fn handle_rset(&mut self) -> Result<SmtpResponse, SmtpError> {
        self.session.reset();
        Ok(SmtpResponse::ok())
    }

    /// Handle AUTH command. Every AUTH starts a fresh exchange.
    fn handle_auth(&mut self, args: &[String]) -> Result<SmtpResponse, SmtpError> {
        let Some(name) = args.get(1) else {
            return Err(SmtpError::InvalidParameters);
        };

        let mechanism = AuthMechanism::from_name(name, &self.config.domain)
            .ok_or_else(|| SmtpError::UnsupportedMechanism(name.clone()))?;
        debug!(session = %self.session.id, mechanism = mechanism.name(), "AUTH started");

        let mut exchange = AuthExchange::new(mechanism);
        let initial_response = args.get(2).map(String::as_str);
        let step = exchange.start(initial_response, self.backend.passwords());
        self.session.auth = Some(exchange);

        self.apply_auth_step(step)
    }

    /// Handle a client line that continues the current AUTH exchange
    fn handle_auth_response(&mut self, line: &str) -> Result<SmtpResponse, SmtpError> {
        if line.trim().is_empty() {
            return Err(SmtpError::InvalidArgument("Invalid auth argument".to_owned()));
        }

        let passwords = self.backend.passwords();
        let step = self
            .session
            .auth
            .as_mut()
            .and_then(|exchange| exchange.respond(line, passwords))
            .ok_or(SmtpError::CommandUnrecognized)?;

        self.apply_auth_step(step)
    }

    fn apply_auth_step(&mut self, step: AuthStep) -> Result<SmtpResponse, SmtpError> {
        let (mechanism, user) = self
            .session
            .auth
            .as_ref()
            .map(|exchange| {
                let mechanism = exchange.mechanism();
                (mechanism.name(), mechanism.user().unwrap_or_default().to_owned())
            })
            .unwrap_or_default();

        match step {
            AuthStep::Challenge(challenge) => Ok(SmtpResponse::auth_challenge(challenge)),
            AuthStep::Success => {
                self.session.authenticated = true;
                info!(session = %self.session.id, mechanism, user = %user, "Authenticated");
                Ok(SmtpResponse::auth_success())
            }
            AuthStep::Failure => {
                warn!(session = %self.session.id, mechanism, user = %user, "Authentication failed");
                Err(SmtpError::AuthenticationFailed)
            }
        }
    }

    /// Handle MAIL command
    fn handle_mail(&mut self, args: &[String]) -> Result<SmtpResponse, SmtpError> {
        if !self.session.authenticated {
            return Err(SmtpError::CommandUnrecognized);
        }

        let email = parse_sender(&args[1..].join(" "))
            .ok_or_else(|| SmtpError::InvalidArgument("Invalid MAIL argument".to_owned()))?;
        if !self.backend.accepts_sender(&email) {
            return Err(SmtpError::Rejected(email));
        }

        self.session.set_sender(email);
        Ok(SmtpResponse::new(250, "MAIL OK"))
    }

    /// Handle RCPT command
    fn handle_rcpt(&mut self, args: &[String]) -> Result<SmtpResponse, SmtpError> {
        if !self.session.authenticated {
            return Err(SmtpError::CommandUnrecognized);
        }

        let (email, name) = parse_recipient(&args[1..].join(" "))
            .ok_or_else(|| SmtpError::InvalidArgument("Invalid RCPT TO argument".to_owned()))?;
        if !self.backend.accepts_recipient(&email) {
            return Err(SmtpError::Rejected(email));
        }

        self.session.add_recipient(email, name);
        Ok(SmtpResponse::new(250, "Accepted"))
    }

    /// Handle DATA command
    fn handle_data(&mut self) -> Result<SmtpResponse, SmtpError> {
        if !self.session.authenticated {
            return Err(SmtpError::CommandUnrecognized);
        }

        self.session.start_data_mode()?;
        Ok(SmtpResponse::data_start())
    }

    /// Handle QUIT command: reply and close
    fn handle_quit(&mut self) -> Result<Option<u16>, SmtpError> {
        let response = SmtpResponse::quit();
        self.closed = true;
        self.transport.end(response.format().as_bytes())?;
        info!(session = %self.session.id, "Session closed");
        Ok(Some(response.code))
    }

    /// Handle a line of message text during DATA
    fn handle_data_line(&mut self, line: &str) -> Result<Option<u16>, SmtpError> {
        if line != "." {
            self.session.add_data_line(line);
            return Ok(None);
        }

        let response = match self.session.finish_data_collection() {
            Ok(message) => {
                info!(
                    session = %self.session.id,
                    from = %message.from(),
                    recipients = message.recipients().len(),
                    size = message.body().len(),
                    "Message accepted"
                );
                self.sink.on_message(message);
                SmtpResponse::ok()
            }
            Err(e) => {
                self.sink.on_error(&e);
                self.session.reset();
                e.to_response()
            }
        };

        self.send(&response)?;
        Ok(Some(response.code))
    }

    /// Tell the client the connection is being dropped for inactivity
    pub fn idle_timeout(&mut self) -> Result<(), SmtpError> {
        if self.closed {
            return Ok(());
        }
        info!(session = %self.session.id, "Idle timeout");
        self.closed = true;
        let response = SmtpResponse::idle_timeout(&self.config.domain);
        self.transport.end(response.format().as_bytes())?;
        Ok(())
    }

    /// Send a reply to the client
    fn send(&mut self, response: &SmtpResponse) -> Result<(), SmtpError> {
        debug!(session = %self.session.id, code = response.code, "Reply");
        if let Err(e) = self.transport.write(response.format().as_bytes()) {
            self.closed = true;
            return Err(e.into());
        }
        Ok(())
    }
}

fn client_domain<'a>(args: &'a [String], error: &str) -> Result<&'a str, SmtpError> {
    args.get(1)
        .map(String::as_str)
        .filter(|domain| !domain.is_empty())
        .ok_or_else(|| SmtpError::InvalidArgument(error.to_owned()))
}
