use std::fmt;

use thiserror::Error;

use crate::config::DEFAULT_IMPLICIT_MAX_TOKENS;

const COMMAND_PREFIX: char = '/';
const USERNAME_SEPARATOR: char = '@';

/// Exchanges with their own single-ticker quote command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Venue {
    /// CEX.IO ticker API.
    Cex,
    /// Jamaica Stock Exchange listing page.
    Jse,
}

impl Venue {
    pub fn command(self) -> &'static str {
        match self {
            Self::Cex => "cex",
            Self::Jse => "jse",
        }
    }
}

/// Closed set of handlers a message can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    Start,
    Help,
    Source,
    Quote,
    Convert,
    Exchange(Venue),
}

impl Handler {
    /// Map a case-normalized command name to its handler.
    pub fn from_name(name: &str) -> Option<Self> {
        let handler = match name {
            "start" | "welcome" => Self::Start,
            "help" => Self::Help,
            "source" | "about" => Self::Source,
            "quote" => Self::Quote,
            "convert" => Self::Convert,
            "cex" => Self::Exchange(Venue::Cex),
            "jse" => Self::Exchange(Venue::Jse),
            _ => return None,
        };
        Some(handler)
    }
}

impl fmt::Display for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::Help => f.write_str("help"),
            Self::Source => f.write_str("source"),
            Self::Quote => f.write_str("quote"),
            Self::Convert => f.write_str("convert"),
            Self::Exchange(venue) => f.write_str(venue.command()),
        }
    }
}

/// A routed message: which handler to run and with what arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub handler: Handler,
    pub arguments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("empty message")]
    Empty,

    #[error("implicit request has {0} tokens")]
    TooLong(usize),

    #[error("unknown command '{0}'")]
    UnknownCommand(String),
}

/// Turns inbound text into a [`Command`]. Holds only immutable settings.
#[derive(Debug, Clone)]
pub struct Router {
    implicit_max_tokens: usize,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(DEFAULT_IMPLICIT_MAX_TOKENS)
    }
}

impl Router {
    pub fn new(implicit_max_tokens: usize) -> Self {
        Self {
            implicit_max_tokens,
        }
    }

    /// Route `text`. `is_command` is the transport's view of whether the
    /// message is an explicit command (e.g. starts with `/`).
    pub fn route(&self, text: &str, is_command: bool) -> Result<Command, RouteError> {
        let mut tokens: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        if tokens.is_empty() {
            return Err(RouteError::Empty);
        }

        if !is_command {
            if tokens.len() > self.implicit_max_tokens {
                return Err(RouteError::TooLong(tokens.len()));
            }
            return Ok(Command {
                handler: Handler::Quote,
                arguments: tokens,
            });
        }

        let head = tokens.remove(0);
        let name = command_name(&head);
        match Handler::from_name(&name) {
            Some(handler) => Ok(Command {
                handler,
                arguments: tokens,
            }),
            None => Err(RouteError::UnknownCommand(name)),
        }
    }
}

/// `/Quote@some_bot` -> `quote`
fn command_name(token: &str) -> String {
    let token = token.strip_prefix(COMMAND_PREFIX).unwrap_or(token);
    let name = match token.split_once(USERNAME_SEPARATOR) {
        Some((name, _bot)) => name,
        None => token,
    };
    name.to_lowercase()
}
