//! Command descriptors for external programs.
//!
//! Solver options are kept as a typed, ordered list of `{flag, values}`
//! entries ([`CommandSpec`]) from the moment they are parsed until they are
//! handed to an external process as a [`CommandLine`]. The [`ArityTable`]
//! tells the parser which options consume several tokens.

mod arity;
mod line;
mod spec;

pub use arity::{ArityTable, FlagSpec};
pub use line::CommandLine;
pub use spec::{CommandEntry, CommandError, CommandOption, CommandSpec};
