//! Command line construction.
//!
//! ```
//! use mpc_client::Command;
//!
//! let cmd = Command::new("find").arg("Artist").arg("Miles Davis");
//! assert_eq!(cmd.to_string(), r#"find Artist "Miles Davis""#);
//! ```

use std::fmt;

/// A command verb with its arguments.
///
/// Arguments are quoted when they are empty or contain whitespace, quotes or
/// backslashes; `"` and `\` inside quotes are escaped. Line feeds are kept
/// as-is and rejected at submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    verb: String,
    args: Vec<String>,
}

impl Command {
    pub fn new(verb: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument.
    pub fn arg(mut self, arg: impl ToString) -> Self {
        self.args.push(arg.to_string());
        self
    }

    /// Append several arguments.
    pub fn args<I>(mut self, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToString,
    {
        self.args.extend(args.into_iter().map(|a| a.to_string()));
        self
    }

    #[inline]
    pub fn verb(&self) -> &str {
        &self.verb
    }
}

fn needs_quoting(arg: &str) -> bool {
    arg.is_empty()
        || arg
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '\'' || c == '\\')
}

fn write_arg(f: &mut fmt::Formatter<'_>, arg: &str) -> fmt::Result {
    if !needs_quoting(arg) {
        return f.write_str(arg);
    }

    f.write_str("\"")?;
    for c in arg.chars() {
        if c == '"' || c == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{}", c)?;
    }
    f.write_str("\"")
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.verb)?;
        for arg in &self.args {
            f.write_str(" ")?;
            write_arg(f, arg)?;
        }
        Ok(())
    }
}

impl From<Command> for String {
    fn from(cmd: Command) -> Self {
        cmd.to_string()
    }
}

impl From<&Command> for String {
    fn from(cmd: &Command) -> Self {
        cmd.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_verb() {
        assert_eq!(Command::new("status").to_string(), "status");
    }

    #[test]
    fn test_plain_args_unquoted() {
        let cmd = Command::new("setvol").arg(50);
        assert_eq!(cmd.to_string(), "setvol 50");
        assert_eq!(cmd.verb(), "setvol");
    }

    #[test]
    fn test_quoting_and_escaping() {
        assert_eq!(
            Command::new("add").arg("My Album/01.flac").to_string(),
            r#"add "My Album/01.flac""#
        );
        assert_eq!(
            Command::new("find").arg("Title").arg(r#"say "hi""#).to_string(),
            r#"find Title "say \"hi\"""#
        );
        assert_eq!(
            Command::new("add").arg(r"a\b").to_string(),
            r#"add "a\\b""#
        );
        assert_eq!(Command::new("search").arg("").to_string(), r#"search """#);
    }

    #[test]
    fn test_args_and_into_string() {
        let line: String = Command::new("playlistinfo").args(["3:7"]).into();
        assert_eq!(line, "playlistinfo 3:7");
    }
}
