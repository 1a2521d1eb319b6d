//! The three supported commands and the analyzed [`Query`] type.

/// A request's command word, validated and uppercased by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Set,
    Get,
    Del,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Set => "SET",
            Command::Get => "GET",
            Command::Del => "DEL",
        }
    }
}

/// An analyzed request: a validated command plus its arguments.
///
/// `SET key value` → `Query{command: Set, args: [key, value]}`
/// `GET key`       → `Query{command: Get, args: [key]}`
/// `DEL key`       → `Query{command: Del, args: [key]}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub command: Command,
    pub args: Vec<String>,
}
