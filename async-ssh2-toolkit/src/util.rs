use std::{
    borrow::Cow,
    io::{Error as IoError, ErrorKind as IoErrorKind},
};

use ssh2::Error as Ssh2Error;

//
pub(crate) fn ssh2_error_is_would_block(err: &Ssh2Error) -> bool {
    IoError::from(Ssh2Error::from_errno(err.code())).kind() == IoErrorKind::WouldBlock
}

/// Quotes `arg` for a POSIX shell, leaving it untouched when it only holds
/// characters the shell never interprets.
pub(crate) fn shell_quote(arg: &str) -> Cow<'_, str> {
    let is_plain = |c: char| c.is_ascii_alphanumeric() || "/._+:@%=,-".contains(c);

    if !arg.is_empty() && arg.chars().all(is_plain) {
        return Cow::Borrowed(arg);
    }

    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('\'');
    for c in arg.chars() {
        if c == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(c);
        }
    }
    quoted.push('\'');
    Cow::Owned(quoted)
}
