//! Command line parsing for the wire protocol
//!
//! Each request is a single line: a case-insensitive command token,
//! optionally followed by one verbatim argument. Tokenization splits on
//! runs of spaces into at most two tokens.

use crate::CrawldError;

/// A parsed client command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Drop(Option<String>),
    Help,
    Init,
    Pause,
    Resume,
    Sanitize,
    Start(Option<String>),
    Stop,
    Threads,
    Use(Option<String>),
}

/// Parses a single request line into a [`Command`]
///
/// The command token is lowercased; the argument is preserved verbatim.
/// An empty argument is treated as absent.
///
/// # Errors
///
/// Returns [`CrawldError::UnknownCommand`] when the command token does not
/// name a supported command.
pub fn parse(line: &str) -> Result<Command, CrawldError> {
    let (command, arg) = split_line(line);
    let command = command.to_lowercase();

    match command.as_str() {
        "drop" => Ok(Command::Drop(arg)),
        "help" => Ok(Command::Help),
        "init" => Ok(Command::Init),
        "pause" => Ok(Command::Pause),
        "resume" => Ok(Command::Resume),
        "sanitize" => Ok(Command::Sanitize),
        "start" => Ok(Command::Start(arg)),
        "stop" => Ok(Command::Stop),
        "threads" => Ok(Command::Threads),
        "use" => Ok(Command::Use(arg)),
        _ => Err(CrawldError::UnknownCommand),
    }
}

/// Splits a line at the first run of spaces into command and argument
fn split_line(line: &str) -> (&str, Option<String>) {
    match line.find(' ') {
        Some(idx) => {
            let command = &line[..idx];
            let arg = line[idx..].trim_start_matches(' ');
            if arg.is_empty() {
                (command, None)
            } else {
                (command, Some(arg.to_string()))
            }
        }
        None => (line, None),
    }
}

/// Returns the help text listing all available commands
pub fn help_text(default_database: &str) -> String {
    format!(
        "\n> drop [db]\n\tDrops the specified database.\n\tIf none is specified, drops the '{default_database}' database.\
         \n> help\n\tThis text.\
         \n> init\n\tInitializes the 'seeds', 'sites', and 'state' tables.\
         \n> pause\n\tSame as the stop command, but the state of the crawler is saved.\
         \n> resume\n\tResumes the state saved by the pause command.\
         \n> sanitize\n\tRefreshes the database by removing any job postings that no longer exist.\
         \n> start [threads]\n\tStarts the web crawler with the given number of threads.\
         \n\tIf no thread number is specified, the crawler is started with one thread.\
         \n> stop\n\tStops all threads started by this client.\
         \n> threads\n\tPrints the number of threads currently running.\
         \n> use [db]\n\tSwitches to database db.\n\tIf none is specified, uses the '{default_database}' database.\
         \n\tIf the database doesn't exist, a new one is created to switch to.\n"
    )
}
