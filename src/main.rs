use mailgate::{Backend, Message, SmtpConfig, SmtpServer};
use std::collections::HashMap;
use std::env;
use std::sync::mpsc;
use std::thread;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// `user:password` pairs separated by commas
const USERS_VAR: &str = "MAILGATE_USERS";

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailgate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = env::args().collect();
    let addr = args.get(1).map_or("127.0.0.1:2525", String::as_str);
    let domain = args.get(2).map_or("mailgate.local", String::as_str);

    let accounts = env::var(USERS_VAR)
        .map(|value| parse_accounts(&value))
        .unwrap_or_default();
    if accounts.is_empty() {
        warn!("{USERS_VAR} is not set, every AUTH attempt will fail");
    }

    info!(addr, domain, accounts = accounts.len(), "Starting Mailgate SMTP server");

    let (tx, rx) = mpsc::channel::<Message>();
    let server = SmtpServer::new(SmtpConfig::new(domain), Backend::new(accounts));

    thread::spawn(move || {
        let mut count = 0;
        while let Ok(message) = rx.recv() {
            count += 1;
            let recipients: Vec<&str> = message.recipients().keys().map(String::as_str).collect();
            info!(
                count,
                session = %message.session_id(),
                from = message.from(),
                to = ?recipients,
                subject = message.subject().unwrap_or_default(),
                "Received message"
            );
        }
    });

    if let Err(e) = server.start(addr, tx) {
        error!(error = %e, "Failed to start server");
        std::process::exit(1);
    }
}

fn parse_accounts(value: &str) -> HashMap<String, String> {
    value
        .split(',')
        .filter_map(|pair| pair.trim().split_once(':'))
        .filter(|(user, _)| !user.is_empty())
        .map(|(user, password)| (user.to_owned(), password.to_owned()))
        .collect()
}
