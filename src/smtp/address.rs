//! MAIL and RCPT argument patterns

use std::sync::LazyLock;

use regex::Regex;

static SENDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(?P<email>[^>]*)>").expect("sender pattern is valid"));

static RECIPIENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>.*?)\s*<(?P<email>[^>]*)>\s*$").expect("recipient pattern is valid")
});

/// Extract the address from a MAIL argument such as `FROM:<a@b.com> SIZE=100`.
///
/// Anything after the closing `>` is ignored.
pub fn parse_sender(argument: &str) -> Option<String> {
    SENDER
        .captures(argument)
        .map(|caps| caps["email"].to_owned())
}

/// Extract `(email, display name)` from a RCPT argument such as
/// `TO:"Jane Doe" <jane@example.org>`. The display name is optional and a
/// leading `TO:` is not part of it.
pub fn parse_recipient(argument: &str) -> Option<(String, String)> {
    let caps = RECIPIENT.captures(argument)?;
    let mut name = caps["name"].trim();
    if name.get(..3).is_some_and(|prefix| prefix.eq_ignore_ascii_case("to:")) {
        name = name[3..].trim();
    }
    let name = name.trim_matches('"');
    Some((caps["email"].to_owned(), name.to_owned()))
}
