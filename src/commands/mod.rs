pub mod executable;
pub mod expire;
pub mod get;
pub mod info;
pub mod persist;
pub mod pexpire;
pub mod pttl;
pub mod set;
pub mod ttl;

use std::{str, vec};

use bytes::Bytes;
use thiserror::Error as ThisError;

use crate::commands::executable::{Context, Executable};
use crate::frame::Frame;

use expire::Expire;
use get::Get;
use info::Info;
use persist::Persist;
use pexpire::Pexpire;
use pttl::Pttl;
use set::Set;
use ttl::Ttl;

#[derive(Debug, PartialEq)]
pub enum Command {
    Get(Get),
    Set(Set),
    Expire(Expire),
    Pexpire(Pexpire),
    Ttl(Ttl),
    Pttl(Pttl),
    Persist(Persist),
    Info(Info),
}

impl Command {
    /// Mutating commands have their original framed form appended to the
    /// durability log.
    pub fn should_replicate(&self) -> bool {
        matches!(
            self,
            Command::Set(_) | Command::Expire(_) | Command::Pexpire(_) | Command::Persist(_)
        )
    }

    fn name(&self) -> &'static str {
        match self {
            Command::Get(_) => Get::NAME,
            Command::Set(_) => Set::NAME,
            Command::Expire(_) => Expire::NAME,
            Command::Pexpire(_) => Pexpire::NAME,
            Command::Ttl(_) => Ttl::NAME,
            Command::Pttl(_) => Pttl::NAME,
            Command::Persist(_) => Persist::NAME,
            Command::Info(_) => Info::NAME,
        }
    }
}

impl Executable for Command {
    fn exec(self, ctx: Context) -> Result<Frame, crate::Error> {
        match self {
            Command::Get(cmd) => cmd.exec(ctx),
            Command::Set(cmd) => cmd.exec(ctx),
            Command::Expire(cmd) => cmd.exec(ctx),
            Command::Pexpire(cmd) => cmd.exec(ctx),
            Command::Ttl(cmd) => cmd.exec(ctx),
            Command::Pttl(cmd) => cmd.exec(ctx),
            Command::Persist(cmd) => cmd.exec(ctx),
            Command::Info(cmd) => cmd.exec(ctx),
        }
    }
}

impl TryFrom<Frame> for Command {
    type Error = CommandError;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        // Clients send commands to the server as arrays of bulk strings.
        let frames = match frame {
            Frame::Array(array) => array,
            frame => {
                return Err(CommandError::Parser(CommandParserError::InvalidFrame {
                    expected: "array".to_string(),
                    actual: frame,
                }))
            }
        };

        let parser = &mut CommandParser {
            parts: frames.into_iter(),
        };

        // Dispatch is case-insensitive; the received spelling is kept for
        // the unknown-command reply.
        let command_name = parser.parse_command_name()?;

        let command = match command_name.to_lowercase().as_str() {
            "get" => Get::try_from(&mut *parser).map(Command::Get),
            "set" => Set::try_from(&mut *parser).map(Command::Set),
            "expire" => Expire::try_from(&mut *parser).map(Command::Expire),
            "pexpire" => Pexpire::try_from(&mut *parser).map(Command::Pexpire),
            "ttl" => Ttl::try_from(&mut *parser).map(Command::Ttl),
            "pttl" => Pttl::try_from(&mut *parser).map(Command::Pttl),
            "persist" => Persist::try_from(&mut *parser).map(Command::Persist),
            "info" => Info::try_from(&mut *parser).map(Command::Info),
            _ => return Err(CommandError::UnknownCommand(command_name)),
        }?;

        if parser.remaining() != 0 {
            return Err(CommandError::WrongArity(command.name()));
        }

        Ok(command)
    }
}

pub(crate) struct CommandParser {
    parts: vec::IntoIter<Frame>,
}

impl CommandParser {
    fn parse_command_name(&mut self) -> Result<String, CommandParserError> {
        let command_name = self.parts.next().ok_or(CommandParserError::EndOfStream)?;

        match command_name {
            Frame::Simple(s) => Ok(s),
            Frame::Bulk(bytes) => str::from_utf8(&bytes[..])
                .map(|s| s.to_string())
                .map_err(CommandParserError::InvalidUTF8String),
            frame => Err(CommandParserError::InvalidFrame {
                expected: "simple or bulk string".to_string(),
                actual: frame,
            }),
        }
    }

    pub(crate) fn next_string(&mut self) -> Result<String, CommandParserError> {
        let frame = self.parts.next().ok_or(CommandParserError::EndOfStream)?;

        match frame {
            // Both `Simple` and `Bulk` representation may be strings.
            Frame::Simple(s) => Ok(s),
            Frame::Bulk(bytes) => str::from_utf8(&bytes[..])
                .map(|s| s.to_string())
                .map_err(CommandParserError::InvalidUTF8String),
            frame => Err(CommandParserError::InvalidFrame {
                expected: "simple or bulk string".to_string(),
                actual: frame,
            }),
        }
    }

    pub(crate) fn next_bytes(&mut self) -> Result<Bytes, CommandParserError> {
        let frame = self.parts.next().ok_or(CommandParserError::EndOfStream)?;

        match frame {
            Frame::Simple(s) => Ok(Bytes::from(s)),
            Frame::Bulk(bytes) => Ok(bytes),
            frame => Err(CommandParserError::InvalidFrame {
                expected: "simple or bulk string".to_string(),
                actual: frame,
            }),
        }
    }

    fn remaining(&self) -> usize {
        self.parts.len()
    }
}

/// Maps an exhausted-arguments parser error to the arity reply for the
/// named command, leaving other parser errors untouched.
pub(crate) fn wrong_arity(name: &'static str) -> impl Fn(CommandParserError) -> CommandError {
    move |err| match err {
        CommandParserError::EndOfStream => CommandError::WrongArity(name),
        other => CommandError::Parser(other),
    }
}

#[derive(Debug, ThisError, PartialEq)]
pub enum CommandError {
    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),
    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),
    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,
    #[error("ERR {0}")]
    Parser(#[from] CommandParserError),
}

#[derive(Debug, ThisError, PartialEq)]
pub enum CommandParserError {
    #[error("protocol error; invalid frame, expected {expected}, got {actual}")]
    InvalidFrame { expected: String, actual: Frame },
    #[error("protocol error; invalid UTF-8 string")]
    InvalidUTF8String(#[from] str::Utf8Error),
    #[error("protocol error; attempting to extract a value failed due to the frame being fully consumed")]
    EndOfStream,
}
