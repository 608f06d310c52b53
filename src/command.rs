//! Text commands driving an [`AvlTree`] with integer keys and string values.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::error::{CommandError, TreeError};
use crate::tree::AvlTree;

/// Separator between slots of one row in `print <rows> rows` output.
const SLOT_SEPARATOR: &str = "    ";

/// Largest row count accepted by `print <rows> rows`.
pub const MAX_ROWS: usize = 32;

/// Traversal order accepted by `print <order>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    PreOrder,
    InOrder,
    PostOrder,
}

impl FromStr for Order {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pre-order" => Ok(Order::PreOrder),
            "in-order" => Ok(Order::InOrder),
            "post-order" => Ok(Order::PostOrder),
            _ => Err(CommandError::InvalidCommand(format!(
                "unknown traversal order `{s}`"
            ))),
        }
    }
}

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `find <key>`
    Find(i32),
    /// `insert <key> <value>`
    Insert(i32, String),
    /// `remove <key>`
    Remove(i32),
    /// `size`
    Size,
    /// `print pre-order|in-order|post-order`
    Print(Order),
    /// `print <rows> rows`
    PrintRows(usize),
}

impl Command {
    /// Parses one line of whitespace-separated tokens.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            ["find", key] => Ok(Command::Find(parse_key(key)?)),
            ["insert", key, value] => Ok(Command::Insert(parse_key(key)?, (*value).to_owned())),
            ["remove", key] => Ok(Command::Remove(parse_key(key)?)),
            ["size"] => Ok(Command::Size),
            ["print", order] => Ok(Command::Print(order.parse()?)),
            ["print", rows, "rows"] => match rows.parse::<usize>() {
                Ok(rows) if (1..=MAX_ROWS).contains(&rows) => Ok(Command::PrintRows(rows)),
                _ => Err(CommandError::InvalidCommand(format!(
                    "row count must be an integer from 1 to {MAX_ROWS}, got `{rows}`"
                ))),
            },
            _ => Err(CommandError::InvalidCommand(format!("`{}`", line.trim()))),
        }
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::parse(s)
    }
}

fn parse_key(token: &str) -> Result<i32, CommandError> {
    token
        .parse()
        .map_err(|_| CommandError::InvalidCommand(format!("key must be an integer, got `{token}`")))
}

/// Owns a tree and executes commands against it.
#[derive(Debug, Default)]
pub struct Shell {
    tree: AvlTree<i32, String>,
}

impl Shell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tree(&self) -> &AvlTree<i32, String> {
        &self.tree
    }

    /// Runs a command and returns the text it produces, if any.
    pub fn execute(&mut self, command: Command) -> Result<Option<String>, CommandError> {
        debug!(?command, "executing");
        match command {
            Command::Find(key) => Ok(Some(self.tree.search(&key)?.clone())),
            Command::Insert(key, value) => {
                self.tree.insert(key, value);
                Ok(None)
            }
            Command::Remove(key) => match self.tree.remove(&key) {
                Ok(_) => Ok(None),
                Err(TreeError::NotFound) => Err(CommandError::NothingToRemove(key)),
            },
            Command::Size => Ok(Some(self.tree.len().to_string())),
            Command::Print(order) => {
                let values = match order {
                    Order::PreOrder => self.tree.pre_order(),
                    Order::InOrder => self.tree.in_order(),
                    Order::PostOrder => self.tree.post_order(),
                };
                Ok(Some(join(values, ", ")))
            }
            Command::PrintRows(rows) => Ok(Some(self.render_rows(rows))),
        }
    }

    /// Parses and runs one input line.
    /// Failures are rendered as their message instead of being returned.
    pub fn run_line(&mut self, line: &str) -> Option<String> {
        match Command::parse(line).and_then(|command| self.execute(command)) {
            Ok(output) => output,
            Err(err) => {
                warn!(%err, line, "command failed");
                Some(err.to_string())
            }
        }
    }

    fn render_rows(&self, rows: usize) -> String {
        self.tree
            .level_view(rows)
            .into_iter()
            .map(|row| {
                let slots = row.into_iter().map(|slot| match slot {
                    Some((key, value)) => format!("{key}: {value}"),
                    None => String::from("null"),
                });
                join(slots, SLOT_SEPARATOR)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn join<I>(items: I, separator: &str) -> String
where
    I: IntoIterator,
    I::Item: fmt::Display,
{
    items
        .into_iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell_with(keys: &[i32]) -> Shell {
        let mut shell = Shell::new();
        for key in keys {
            shell.run_line(&format!("insert {key} v{key}"));
        }
        shell
    }

    #[test]
    fn test_parse() {
        assert_eq!(Command::parse("find 4"), Ok(Command::Find(4)));
        assert_eq!(
            Command::parse("insert -7 seven"),
            Ok(Command::Insert(-7, String::from("seven")))
        );
        assert_eq!(Command::parse("  remove 3 "), Ok(Command::Remove(3)));
        assert_eq!(Command::parse("size"), Ok(Command::Size));
        assert_eq!(
            Command::parse("print post-order"),
            Ok(Command::Print(Order::PostOrder))
        );
        assert_eq!(Command::parse("print 3 rows"), Ok(Command::PrintRows(3)));
        assert_eq!("print in-order".parse(), Ok(Command::Print(Order::InOrder)));
    }

    #[test]
    fn test_parse_invalid() {
        for line in [
            "",
            "find",
            "find x",
            "insert 1",
            "insert 1 a b",
            "delete 1",
            "print sideways",
            "print 0 rows",
            "print many rows",
            "size 2",
        ] {
            assert!(
                matches!(Command::parse(line), Err(CommandError::InvalidCommand(_))),
                "accepted `{line}`"
            );
        }
    }

    #[test]
    fn test_parse_row_bounds() {
        assert_eq!(Command::parse("print 1 rows"), Ok(Command::PrintRows(1)));
        assert_eq!(
            Command::parse(&format!("print {MAX_ROWS} rows")),
            Ok(Command::PrintRows(MAX_ROWS))
        );
        for line in [
            format!("print {} rows", MAX_ROWS + 1),
            String::from("print 64 rows"),
            format!("print {} rows", usize::MAX),
            String::from("print 18446744073709551616 rows"),
        ] {
            assert!(
                matches!(Command::parse(&line), Err(CommandError::InvalidCommand(_))),
                "accepted `{line}`"
            );
        }

        let mut shell = shell_with(&[1, 2, 3]);
        let output = shell.run_line("print 18446744073709551615 rows");
        assert!(output.is_some_and(|text| text.starts_with("incorrect command")));
        assert_eq!(shell.run_line("size"), Some(String::from("3")));
    }

    #[test]
    fn test_find_and_size() {
        let mut shell = shell_with(&[5, 3, 8]);
        assert_eq!(shell.run_line("size"), Some(String::from("3")));
        assert_eq!(shell.run_line("find 3"), Some(String::from("v3")));
        assert_eq!(shell.run_line("insert 3 three"), None);
        assert_eq!(shell.run_line("find 3"), Some(String::from("three")));
        assert_eq!(shell.run_line("size"), Some(String::from("3")));
    }

    #[test]
    fn test_missing_key() {
        let mut shell = shell_with(&[1]);
        assert_eq!(
            shell.execute(Command::Find(2)),
            Err(CommandError::Tree(TreeError::NotFound))
        );
        assert_eq!(
            shell.execute(Command::Remove(2)),
            Err(CommandError::NothingToRemove(2))
        );
        assert_eq!(
            shell.run_line("find 2"),
            Some(String::from("no element with such key found"))
        );
        assert_eq!(
            shell.run_line("remove 2"),
            Some(String::from("element with key 2 does not exist and can't be removed"))
        );
        assert_eq!(shell.run_line("remove 1"), None);
        assert_eq!(shell.run_line("size"), Some(String::from("0")));
    }

    #[test]
    fn test_print_orders() {
        let mut shell = shell_with(&[2, 1, 3]);
        assert_eq!(
            shell.run_line("print pre-order"),
            Some(String::from("v2, v1, v3"))
        );
        assert_eq!(
            shell.run_line("print in-order"),
            Some(String::from("v1, v2, v3"))
        );
        assert_eq!(
            shell.run_line("print post-order"),
            Some(String::from("v1, v3, v2"))
        );

        let mut empty = Shell::new();
        assert_eq!(empty.run_line("print in-order"), Some(String::new()));
    }

    #[test]
    fn test_print_rows() {
        let mut shell = shell_with(&[2, 1, 3, 4]);
        assert_eq!(
            shell.run_line("print 3 rows"),
            Some(String::from(
                "2: v2\n1: v1    3: v3\nnull    null    null    4: v4"
            ))
        );
        assert_eq!(shell.run_line("print 1 rows"), Some(String::from("2: v2")));

        let mut empty = Shell::new();
        assert_eq!(
            empty.run_line("print 2 rows"),
            Some(String::from("null\nnull    null"))
        );
    }

    #[test]
    fn test_invalid_line_reports_message() {
        let mut shell = Shell::new();
        let output = shell.run_line("jump 3");
        assert!(output.is_some_and(|text| text.starts_with("incorrect command")));
        assert!(shell.tree().is_empty());
    }
}
