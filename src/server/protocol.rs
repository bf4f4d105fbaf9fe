//! # Line Protocol
//!
//! One command per line, fields separated by single spaces. The value field
//! is the remainder of the line, so values may themselves contain spaces.
//!
//! ```text
//! ADD <key> <value>      -> STORED | EXISTS | OUT_OF_SPACE
//! UPDATE <key> <value>   -> STORED | NOT_FOUND | OUT_OF_SPACE
//! GET <key>              -> VALUE <bytes> | NOT_FOUND
//! DELETE <key>           -> DELETED | NOT_FOUND
//! STATS                  -> STATS <counters>
//! FRAG                   -> FRAG <report>
//! RESET                  -> OK
//! QUIT                   -> (connection closes)
//! ```
//!
//! Anything unparseable gets an `ERROR <reason>` reply; protocol errors
//! never close the connection or crash the server.

use crate::error::{Error, Result};

/// A parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add { key: String, value: String },
    Update { key: String, value: String },
    Get { key: String },
    Delete { key: String },
    Stats,
    Frag,
    Reset,
    Quit,
}

/// Parses one protocol line. The method word is case-insensitive; keys and
/// values are taken verbatim.
pub fn parse(line: &str) -> Result<Command> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut parts = line.splitn(2, ' ');
    let method = parts
        .next()
        .filter(|m| !m.is_empty())
        .ok_or_else(|| Error::InvalidCommand("empty line".to_string()))?;
    let rest = parts.next().unwrap_or("");

    match method.to_ascii_uppercase().as_str() {
        "ADD" => {
            let (key, value) = split_key_value(rest)?;
            Ok(Command::Add { key, value })
        }
        "UPDATE" => {
            let (key, value) = split_key_value(rest)?;
            Ok(Command::Update { key, value })
        }
        "GET" => Ok(Command::Get { key: single_key(rest)? }),
        "DELETE" => Ok(Command::Delete { key: single_key(rest)? }),
        "STATS" => no_args(rest, Command::Stats),
        "FRAG" => no_args(rest, Command::Frag),
        "RESET" => no_args(rest, Command::Reset),
        "QUIT" => no_args(rest, Command::Quit),
        other => Err(Error::InvalidCommand(format!("unknown method '{other}'"))),
    }
}

fn split_key_value(rest: &str) -> Result<(String, String)> {
    let mut parts = rest.splitn(2, ' ');
    let key = parts
        .next()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| Error::InvalidCommand("missing key".to_string()))?;
    let value = parts
        .next()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::InvalidCommand("missing value".to_string()))?;
    Ok((key.to_string(), value.to_string()))
}

fn single_key(rest: &str) -> Result<String> {
    if rest.is_empty() {
        return Err(Error::InvalidCommand("missing key".to_string()));
    }
    if rest.contains(' ') {
        return Err(Error::InvalidCommand("unexpected argument after key".to_string()));
    }
    Ok(rest.to_string())
}

fn no_args(rest: &str, cmd: Command) -> Result<Command> {
    if !rest.is_empty() {
        return Err(Error::InvalidCommand("unexpected arguments".to_string()));
    }
    Ok(cmd)
}
