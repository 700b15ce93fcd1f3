use easel_lib::models::NotificationId;
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  open            toggle the notification panel (marks all read when opening)
  close           close the panel
  mark            mark all notifications as read
  read <id>       mark one notification as read
  list            show the notification list
  refresh         poll the server now
  status          print the bell state as JSON
  login <token>   store a credential and start polling
  logout          clear the credential and stop polling
  help            show this message
  quit            exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BellCommand {
    Open,
    Close,
    MarkAll,
    Read(NotificationId),
    List,
    Refresh,
    Status,
    Login(String),
    Logout,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0} (try `help`)")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<BellCommand>, CommandError> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(None);
    };
    let arg = parts.next();

    let command = match verb.to_lowercase().as_str() {
        "open" | "bell" => BellCommand::Open,
        "close" => BellCommand::Close,
        "mark" | "mark-all" => BellCommand::MarkAll,
        "read" => BellCommand::Read(NotificationId::from(
            arg.ok_or(CommandError::MissingArgument("read"))?,
        )),
        "list" | "ls" => BellCommand::List,
        "refresh" => BellCommand::Refresh,
        "status" => BellCommand::Status,
        "login" => BellCommand::Login(arg.ok_or(CommandError::MissingArgument("login"))?.to_string()),
        "logout" => BellCommand::Logout,
        "help" | "?" => BellCommand::Help,
        "quit" | "exit" => BellCommand::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}
