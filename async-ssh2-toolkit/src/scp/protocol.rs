//! The SCP sink-mode subset needed to push a single regular file.
//!
//! ```text
//! C<permission> <length> <file name>\n
//! <length bytes of payload>
//! \0
//! ```

use crate::{error::Error, util::shell_quote};

//
pub const TERMINATOR: &[u8] = b"\0";

/// Where a file lands on the remote host and with which mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScpTarget {
    dir: String,
    file_name: String,
    permission: String,
}

impl ScpTarget {
    /// `permission` is the octal mode as written on the wire, e.g. `0644`.
    pub fn new(
        dir: impl Into<String>,
        file_name: impl Into<String>,
        permission: impl Into<String>,
    ) -> Result<Self, Error> {
        let target = Self {
            dir: dir.into(),
            file_name: file_name.into(),
            permission: permission.into(),
        };

        validate_dir(&target.dir)?;
        validate_file_name(&target.file_name)?;
        validate_permission(&target.permission)?;

        Ok(target)
    }

    pub fn dir(&self) -> &str {
        &self.dir
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn permission(&self) -> &str {
        &self.permission
    }

    /// The `C` control line announcing a regular file of `length` bytes.
    pub fn header(&self, length: u64) -> String {
        format!("C{} {} {}\n", self.permission, length, self.file_name)
    }
}

/// The receiving command, e.g. `/usr/bin/scp -qtr /tmp`.
pub fn sink_command(scp_path: &str, dir: &str) -> String {
    format!("{} -qtr {}", scp_path, shell_quote(dir))
}

fn validate_dir(dir: &str) -> Result<(), Error> {
    if dir.is_empty() {
        return Err(Error::invalid_argument("directory", "empty"));
    }
    reject_control_chars("directory", dir)
}

fn validate_file_name(file_name: &str) -> Result<(), Error> {
    match file_name {
        "" => return Err(Error::invalid_argument("file name", "empty")),
        "." | ".." => {
            return Err(Error::invalid_argument(
                "file name",
                format!("`{file_name}` is not a file"),
            ))
        }
        _ => {}
    }
    if file_name.contains('/') {
        return Err(Error::invalid_argument("file name", "contains `/`"));
    }
    reject_control_chars("file name", file_name)
}

fn validate_permission(permission: &str) -> Result<(), Error> {
    if !(3..=4).contains(&permission.len()) {
        return Err(Error::invalid_argument(
            "permission",
            format!("`{permission}` is not 3 or 4 octal digits"),
        ));
    }
    if !permission.bytes().all(|b| matches!(b, b'0'..=b'7')) {
        return Err(Error::invalid_argument(
            "permission",
            format!("`{permission}` is not octal"),
        ));
    }
    Ok(())
}

fn reject_control_chars(name: &'static str, value: &str) -> Result<(), Error> {
    match value.chars().find(|c| c.is_control()) {
        Some(c) => Err(Error::invalid_argument(
            name,
            format!("contains control character {c:?}"),
        )),
        None => Ok(()),
    }
}
