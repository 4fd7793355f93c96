//! Quote-aware command line tokenizer

/// Split a command line into arguments.
///
/// Arguments are separated by spaces; runs of spaces never produce empty
/// arguments. An argument starting with `"` extends to the next `"` and may
/// contain spaces. When such an argument is well formed (it ends with `"` and
/// holds no other quote) the surrounding quotes are removed, otherwise it is
/// kept exactly as scanned.
///
/// With `max_args` set, scanning stops after that many arguments and the
/// rest of the line is dropped.
///
/// ```
/// use mailgate::smtp::tokenizer::tokenize;
///
/// assert_eq!(tokenize("RCPT \"A B\" <a@b.com>", None), ["RCPT", "A B", "<a@b.com>"]);
/// assert_eq!(tokenize("MAIL FROM:<a@b.com> SIZE=10", Some(2)), ["MAIL", "FROM:<a@b.com>"]);
/// ```
pub fn tokenize(line: &str, max_args: Option<usize>) -> Vec<String> {
    let line = line.trim();
    let mut args = Vec::new();
    let mut chars = line.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if max_args.is_some_and(|max| args.len() >= max) {
            break;
        }

        if c == ' ' {
            chars.next();
            continue;
        }

        let mut end = line.len();
        if c == '"' {
            chars.next();
            for (i, ch) in chars.by_ref() {
                if ch == '"' {
                    end = i + ch.len_utf8();
                    break;
                }
            }
        } else {
            while let Some(&(i, ch)) = chars.peek() {
                if ch == ' ' {
                    end = i;
                    break;
                }
                chars.next();
            }
        }

        args.push(unquote(&line[start..end]).to_owned());
    }

    args
}

/// Strip the quotes from a well-formed quoted argument
fn unquote(arg: &str) -> &str {
    match arg
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        Some(inner) if !inner.contains('"') => inner,
        _ => arg,
    }
}
