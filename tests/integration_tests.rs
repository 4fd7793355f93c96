//! Integration tests for authentication, framing limits and full SMTP sessions

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use mailgate::{Backend, Message, SmtpConfig, SmtpServer};
use md5::Md5;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

fn start_test_server(backend: Backend) -> (String, mpsc::Receiver<Message>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let server = SmtpServer::new(SmtpConfig::new("test.local"), backend);
    let (tx, rx) = mpsc::channel::<Message>();

    // Start server in background thread
    thread::spawn(move || {
        if let Err(e) = server.start_with_listener(listener, tx) {
            eprintln!("Error starting server: {e}");
        }
    });

    (addr, rx)
}

fn default_backend() -> Backend {
    Backend::new(|user: &str| (user == "user").then(|| "password".to_owned()))
}

struct Client {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
}

impl Client {
    fn connect(addr: &str) -> Self {
        let stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let reader = BufReader::new(stream.try_clone().unwrap());
        let mut client = Self { stream, reader };

        let greeting = client.read_line();
        assert!(greeting.starts_with("220"), "unexpected greeting: {greeting}");
        client
    }

    fn read_line(&mut self) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).unwrap();
        line.trim_end_matches("\r\n").to_string()
    }

    /// Read a possibly multi-line reply
    fn read_reply(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line();
            let last = line.as_bytes().get(3) != Some(&b'-');
            lines.push(line);
            if last {
                return lines;
            }
        }
    }

    fn send(&mut self, line: &str) {
        write!(self.stream, "{line}\r\n").unwrap();
        self.stream.flush().unwrap();
    }

    fn command(&mut self, line: &str) -> String {
        self.send(line);
        self.read_line()
    }

    fn login_plain(&mut self) {
        let token = STANDARD.encode("\0user\0password");
        let response = self.command(&format!("AUTH PLAIN {token}"));
        assert_eq!(response, "235 2.7.0 Authentication successful");
    }
}

#[test]
fn test_authenticated_session_delivers_message() {
    let (addr, rx) = start_test_server(default_backend());
    let mut client = Client::connect(&addr);

    let reply = {
        client.send("EHLO client.local");
        client.read_reply()
    };
    assert_eq!(reply.len(), 3);
    assert!(reply[0].starts_with("250-test.local Hello client.local @ 127.0.0.1:"));
    assert_eq!(reply[1], "250-AUTH PLAIN LOGIN CRAM-MD5");
    assert_eq!(reply[2], "250 HELP");

    client.login_plain();
    assert_eq!(client.command("MAIL FROM:<a@b.com>"), "250 MAIL OK");
    assert_eq!(client.command("RCPT TO:<c@d.com>"), "250 Accepted");
    assert_eq!(
        client.command("DATA"),
        "354 Enter message, end with <CRLF>.<CRLF>"
    );
    client.send("hello");
    assert_eq!(client.command("."), "250 OK");
    assert_eq!(client.command("QUIT"), "221 Goodbye.");

    let message = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(message.from(), "a@b.com");
    assert_eq!(message.recipients().len(), 1);
    assert!(message.has_recipient("c@d.com"));
    assert_eq!(message.body(), "hello");
    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
}

#[test]
fn test_mail_requires_authentication() {
    let (addr, rx) = start_test_server(default_backend());
    let mut client = Client::connect(&addr);

    assert_eq!(
        client.command("MAIL FROM:<a@b.com>"),
        "500 Syntax error, command unrecognized"
    );
    assert!(client.command("RCPT TO:<c@d.com>").starts_with("500"));
    assert!(client.command("DATA").starts_with("500"));

    // A failed attempt does not unlock the transaction commands
    let token = STANDARD.encode("\0user\0wrong");
    assert!(client.command(&format!("AUTH PLAIN {token}")).starts_with("535"));
    assert!(client.command("MAIL FROM:<a@b.com>").starts_with("500"));

    client.command("QUIT");
    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
}

#[test]
fn test_auth_login() {
    let (addr, _rx) = start_test_server(default_backend());
    let mut client = Client::connect(&addr);

    assert_eq!(client.command("AUTH LOGIN"), "334 VXNlcm5hbWU6");
    assert_eq!(client.command(&STANDARD.encode("user")), "334 UGFzc3dvcmQ6");
    assert_eq!(
        client.command(&STANDARD.encode("password")),
        "235 2.7.0 Authentication successful"
    );
    assert!(client.command("MAIL FROM:<a@b.com>").starts_with("250"));
}

#[test]
fn test_auth_cram_md5() {
    let (addr, _rx) = start_test_server(default_backend());
    let mut client = Client::connect(&addr);

    let reply = client.command("AUTH CRAM-MD5");
    let challenge = STANDARD
        .decode(reply.strip_prefix("334 ").unwrap())
        .unwrap();
    let text = String::from_utf8(challenge.clone()).unwrap();
    assert!(text.starts_with('<'));
    assert!(text.ends_with("@test.local>"));
    // 32 random bytes, hex encoded
    assert_eq!(text.len(), 1 + 64 + "@test.local>".len());

    let mut mac = Hmac::<Md5>::new_from_slice(b"password").unwrap();
    mac.update(&challenge);
    let digest = hex::encode(mac.finalize().into_bytes());

    let response = STANDARD.encode(format!("user {digest}"));
    assert_eq!(
        client.command(&response),
        "235 2.7.0 Authentication successful"
    );
}

#[test]
fn test_auth_errors() {
    let (addr, _rx) = start_test_server(default_backend());
    let mut client = Client::connect(&addr);

    assert!(client.command("AUTH").starts_with("501"));
    assert_eq!(
        client.command("AUTH XOAUTH2"),
        "504 Unrecognized authentication type"
    );
    assert_eq!(client.command("AUTH PLAIN"), "334 ");
    assert_eq!(client.command(""), "500 Invalid auth argument");
    assert!(client.command(&STANDARD.encode("\0nobody\0password")).starts_with("535"));

    // The failed exchange is spent
    let token = STANDARD.encode("\0user\0password");
    assert!(client.command(&token).starts_with("500"));
}

#[test]
fn test_line_too_long_then_recovers() {
    let (addr, _rx) = start_test_server(default_backend());
    let mut client = Client::connect(&addr);

    let long_line = "NOOP ".to_string() + &"a".repeat(1200);
    assert_eq!(client.command(&long_line), "500 Line length limit exceeded");

    // If the long line was split across reads, its tail arrives as a bogus
    // command of its own
    client.send("NOOP");
    let mut reply = client.read_line();
    if reply.starts_with("500") {
        reply = client.read_line();
    }
    assert_eq!(reply, "250 OK");
}

#[test]
fn test_multiple_recipients_with_names() {
    let (addr, rx) = start_test_server(default_backend());
    let mut client = Client::connect(&addr);

    client.command("HELO client.local");
    client.login_plain();
    client.command("MAIL FROM:<sender@example.com>");
    client.command("RCPT TO:\"Foo Bar\" <foo@example.org>");
    client.command("RCPT TO:<bar@example.org>");
    client.command("DATA");

    client.send("Subject: Multiple Recipients");
    client.send("");
    client.send("Test message for multiple recipients");
    assert!(client.command(".").starts_with("250"));
    client.command("QUIT");

    let message = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    let recipients: Vec<&str> = message.recipients().keys().map(String::as_str).collect();
    assert_eq!(recipients, ["foo@example.org", "bar@example.org"]);
    assert_eq!(message.recipient_name("foo@example.org"), Some("Foo Bar"));
    assert_eq!(message.recipient_name("bar@example.org"), None);
    assert_eq!(message.subject(), Some("Multiple Recipients"));
}

#[test]
fn test_rset_command() {
    let (addr, rx) = start_test_server(default_backend());
    let mut client = Client::connect(&addr);

    client.login_plain();
    client.command("MAIL FROM:<sender@example.com>");
    client.command("RCPT TO:<recipient@example.com>");
    assert_eq!(client.command("RSET"), "250 OK");

    // Still authenticated, but DATA needs a new sender
    assert!(client.command("DATA").starts_with("503"));
    client.command("MAIL FROM:<newsender@example.com>");
    client.command("RCPT TO:<newrecipient@example.com>");
    client.command("DATA");
    client.send("This message came after RSET");
    assert!(client.command(".").starts_with("250"));
    client.command("QUIT");

    let message = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(message.from(), "newsender@example.com");
    assert!(message.has_recipient("newrecipient@example.com"));
    assert!(!message.has_recipient("recipient@example.com"));
    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
}

#[test]
fn test_data_lines_are_not_commands() {
    let (addr, rx) = start_test_server(default_backend());
    let mut client = Client::connect(&addr);

    client.login_plain();
    client.command("MAIL FROM:<a@b.com>");
    client.command("RCPT TO:<c@d.com>");
    client.command("DATA");
    client.send("QUIT");
    client.send("..leading dot");
    assert_eq!(client.command("."), "250 OK");

    let message = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(message.body(), "QUIT\r\n.leading dot");
    assert_eq!(client.command("NOOP"), "250 OK");
}

#[test]
fn test_address_filters() {
    let backend = default_backend()
        .with_sender_filter(|email| email.ends_with("@example.org"))
        .with_recipient_filter(|email| !email.starts_with("blocked@"));
    let (addr, _rx) = start_test_server(backend);
    let mut client = Client::connect(&addr);

    client.login_plain();
    assert_eq!(
        client.command("MAIL FROM:<a@example.com>"),
        "550 <a@example.com> rejected"
    );
    assert!(client.command("MAIL FROM:<a@example.org>").starts_with("250"));
    assert!(client.command("RCPT TO:<blocked@example.org>").starts_with("550"));
    assert!(client.command("RCPT TO:<ok@example.org>").starts_with("250"));
}

#[test]
fn test_quit_closes_connection() {
    let (addr, _rx) = start_test_server(default_backend());
    let mut client = Client::connect(&addr);

    assert_eq!(client.command("QUIT"), "221 Goodbye.");
    // EOF after QUIT
    assert_eq!(client.read_line(), "");
}

#[test]
fn test_utf8_body() {
    let (addr, rx) = start_test_server(default_backend());
    let mut client = Client::connect(&addr);

    client.login_plain();
    client.command("MAIL FROM:<a@b.com>");
    client.command("RCPT TO:<c@d.com>");
    client.command("DATA");
    client.send("Subject: 件名");
    client.send("");
    client.send("本文");
    assert!(client.command(".").starts_with("250"));

    let message = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(message.subject(), Some("件名"));
    assert!(message.body().ends_with("本文"));
}
