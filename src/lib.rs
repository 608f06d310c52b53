//! An ordered key-value container implemented with an AVL tree.
//!
//! [`AvlTree`] is the container itself. [`Shell`] maps text commands such as
//! `insert 5 five` or `print in-order` onto it and renders the results.

mod command;
mod error;
mod tree;

pub use command::{Command, Order, Shell};
pub use error::{CommandError, TreeError};
pub use tree::AvlTree;

#[cfg(test)]
mod proptests;
