//! Turns parsed tokens into a validated [`Query`].

use crate::error::{Error, Result};
use crate::protocol::commands::{Command, Query};

/// Validates arity for the command word and produces a [`Query`].
#[derive(Debug, Default)]
pub struct Analyzer;

impl Analyzer {
    pub fn new() -> Self {
        Analyzer
    }

    pub fn analyze(&self, mut tokens: Vec<String>) -> Result<Query> {
        if tokens.is_empty() {
            return Err(Error::UnknownCommand(String::new()));
        }

        let command_word = tokens[0].to_uppercase();

        let command = match command_word.as_str() {
            "SET" => {
                if tokens.len() != 3 {
                    return Err(Error::InvalidSetArgs);
                }
                Command::Set
            }
            "GET" => {
                if tokens.len() != 2 {
                    return Err(Error::InvalidGetArgs);
                }
                Command::Get
            }
            "DEL" => {
                if tokens.len() != 2 {
                    return Err(Error::InvalidDelArgs);
                }
                Command::Del
            }
            other => return Err(Error::UnknownCommand(other.to_string())),
        };

        tokens.remove(0);
        Ok(Query {
            command,
            args: tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(tokens: &[&str]) -> Result<Query> {
        Analyzer::new().analyze(tokens.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn set_requires_three_tokens() {
        let q = analyze(&["set", "key", "value"]).unwrap();
        assert_eq!(q.command, Command::Set);
        assert_eq!(q.args, vec!["key".to_string(), "value".to_string()]);

        assert!(matches!(analyze(&["SET", "key"]), Err(Error::InvalidSetArgs)));
        assert!(matches!(
            analyze(&["SET", "key", "value", "extra"]),
            Err(Error::InvalidSetArgs)
        ));
    }

    #[test]
    fn get_requires_two_tokens() {
        let q = analyze(&["GET", "key"]).unwrap();
        assert_eq!(q.command, Command::Get);
        assert_eq!(q.args, vec!["key".to_string()]);

        assert!(matches!(analyze(&["GET"]), Err(Error::InvalidGetArgs)));
        assert!(matches!(
            analyze(&["GET", "key", "extra"]),
            Err(Error::InvalidGetArgs)
        ));
    }

    #[test]
    fn del_requires_two_tokens() {
        let q = analyze(&["DEL", "key"]).unwrap();
        assert_eq!(q.command, Command::Del);

        assert!(matches!(analyze(&["DEL"]), Err(Error::InvalidDelArgs)));
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(matches!(
            analyze(&["FROB", "key"]),
            Err(Error::UnknownCommand(ref c)) if c == "FROB"
        ));
    }

    #[test]
    fn empty_query_is_rejected() {
        assert!(matches!(analyze(&[]), Err(Error::UnknownCommand(_))));
    }
}
