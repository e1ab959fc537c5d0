use crate::format::quote_astring;
use crate::types::SequenceRange;

/// A complete command line, without the trailing CRLF.
pub trait Command {
    fn name(&self) -> &'static str;
    fn as_string(&self) -> String;
}

pub struct CommandBuilder {
    tag: String,
}

impl CommandBuilder {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
        }
    }

    pub fn login(self) -> LoginCommandBuilder<NoUsername, NoPassword> {
        LoginCommandBuilder::new(&self.tag)
    }

    /// Read-only SELECT; this client never changes mailbox state.
    pub fn examine(self, mailbox: &str) -> ExamineCommand {
        ExamineCommand {
            tag: self.tag,
            mailbox: mailbox.to_string(),
        }
    }

    pub fn fetch(self, range: SequenceRange) -> FetchCommand {
        FetchCommand {
            tag: self.tag,
            range,
        }
    }

    pub fn logout(self) -> LogoutCommand {
        LogoutCommand { tag: self.tag }
    }
}

pub struct NoUsername;
pub struct HasUsername(String);
pub struct NoPassword;
pub struct HasPassword(String);

pub struct LoginCommandBuilder<U = NoUsername, P = NoPassword> {
    tag: String,
    username: U,
    password: P,
}

impl LoginCommandBuilder<NoUsername, NoPassword> {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            username: NoUsername,
            password: NoPassword,
        }
    }
}

impl<P> LoginCommandBuilder<NoUsername, P> {
    pub fn username(self, username: &str) -> LoginCommandBuilder<HasUsername, P> {
        LoginCommandBuilder {
            tag: self.tag,
            username: HasUsername(username.to_string()),
            password: self.password,
        }
    }
}

impl<U> LoginCommandBuilder<U, NoPassword> {
    pub fn password(self, password: &str) -> LoginCommandBuilder<U, HasPassword> {
        LoginCommandBuilder {
            tag: self.tag,
            username: self.username,
            password: HasPassword(password.to_string()),
        }
    }
}

impl Command for LoginCommandBuilder<HasUsername, HasPassword> {
    fn name(&self) -> &'static str {
        "LOGIN"
    }

    fn as_string(&self) -> String {
        format!(
            "{} LOGIN {} {}",
            self.tag,
            quote_astring(&self.username.0),
            quote_astring(&self.password.0)
        )
    }
}

pub struct ExamineCommand {
    tag: String,
    mailbox: String,
}

impl Command for ExamineCommand {
    fn name(&self) -> &'static str {
        "EXAMINE"
    }

    fn as_string(&self) -> String {
        format!("{} EXAMINE {}", self.tag, quote_astring(&self.mailbox))
    }
}

pub struct FetchCommand {
    tag: String,
    range: SequenceRange,
}

impl Command for FetchCommand {
    fn name(&self) -> &'static str {
        "FETCH"
    }

    fn as_string(&self) -> String {
        format!(
            "{} FETCH {} (RFC822.HEADER RFC822.SIZE UID)",
            self.tag, self.range
        )
    }
}

pub struct LogoutCommand {
    tag: String,
}

impl Command for LogoutCommand {
    fn name(&self) -> &'static str {
        "LOGOUT"
    }

    fn as_string(&self) -> String {
        format!("{} LOGOUT", self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_command() {
        let command = CommandBuilder::new("A0001")
            .login()
            .username("testuser")
            .password("testpass");

        assert_eq!(command.name(), "LOGIN");
        assert_eq!(command.as_string(), "A0001 LOGIN \"testuser\" \"testpass\"");
    }

    #[test]
    fn test_login_command_order_independence() {
        let command = CommandBuilder::new("A0001")
            .login()
            .password("pass")
            .username("user");

        assert_eq!(command.as_string(), "A0001 LOGIN \"user\" \"pass\"");
    }

    #[test]
    fn test_login_command_escapes_credentials() {
        let command = CommandBuilder::new("a001")
            .login()
            .username("me@example.com")
            .password("p\"a\\ss");

        assert_eq!(
            command.as_string(),
            "a001 LOGIN \"me@example.com\" \"p\\\"a\\\\ss\""
        );
    }

    #[test]
    fn test_examine_command() {
        let command = CommandBuilder::new("a002").examine("[Gmail]/All Mail");

        assert_eq!(command.name(), "EXAMINE");
        assert_eq!(command.as_string(), "a002 EXAMINE \"[Gmail]/All Mail\"");
    }

    #[test]
    fn test_fetch_command() {
        let range = SequenceRange::most_recent(7, 5).unwrap();
        let command = CommandBuilder::new("a003").fetch(range);

        assert_eq!(command.name(), "FETCH");
        assert_eq!(
            command.as_string(),
            "a003 FETCH 3:7 (RFC822.HEADER RFC822.SIZE UID)"
        );
    }

    #[test]
    fn test_logout_command() {
        assert_eq!(CommandBuilder::new("a004").logout().as_string(), "a004 LOGOUT");
    }
}
