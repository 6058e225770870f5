pub mod commands;
pub mod prompt;

pub use commands::{Cli, Commands, FeedArgs, KeyCommands, PostArgs, ProfileArgs};
pub use prompt::Prompter;
