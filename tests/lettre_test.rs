use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::{SmtpTransport, Transport};
use mailgate::{Backend, SmtpConfig, SmtpServer};
use std::error::Error;
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

fn start_server() -> (u16, mpsc::Receiver<mailgate::Message>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let backend = Backend::new(|user: &str| (user == "hanako").then(|| "秘密".to_owned()));
    let server = SmtpServer::new(SmtpConfig::new("localhost"), backend);
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        server
            .start_with_listener(listener, tx)
            .expect("server start failed")
    });

    (port, rx)
}

fn send_with(mechanism: Mechanism, password: &str) -> Result<mailgate::Message, Box<dyn Error>> {
    let (port, rx) = start_server();

    let message = Message::builder()
        .from("花子 <hanako@example.com>".parse::<Mailbox>()?)
        .to("太郎 <tarou@example.com>".parse::<Mailbox>()?)
        .cc("次郎 <jirou@example.com>".parse::<Mailbox>()?)
        .subject("件名")
        .body("本文".to_owned())?;

    let mailer = SmtpTransport::builder_dangerous("127.0.0.1")
        .port(port)
        .credentials(Credentials::new("hanako".to_owned(), password.to_owned()))
        .authentication(vec![mechanism])
        .build();

    mailer.send(&message)?;

    Ok(rx.recv_timeout(Duration::from_secs(1))?)
}

#[test]
fn lettre_send_auth_plain() -> Result<(), Box<dyn Error>> {
    let message = send_with(Mechanism::Plain, "秘密")?;
    assert_eq!(message.from(), "hanako@example.com");

    let recipients: Vec<&str> = message.recipients().keys().map(String::as_str).collect();
    assert_eq!(recipients, ["tarou@example.com", "jirou@example.com"]);
    assert!(message.subject().is_some());

    Ok(())
}

#[test]
fn lettre_send_auth_login() -> Result<(), Box<dyn Error>> {
    let message = send_with(Mechanism::Login, "秘密")?;
    assert_eq!(message.from(), "hanako@example.com");
    assert!(message.has_recipient("tarou@example.com"));

    Ok(())
}

#[test]
fn lettre_rejects_wrong_password() {
    assert!(send_with(Mechanism::Plain, "wrong").is_err());
}
