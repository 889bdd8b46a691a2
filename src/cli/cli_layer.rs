// CLI layer - the command-line client and its argument parsing.

pub mod code_prompt;
pub mod commands;
pub mod views;

pub use code_prompt::StdinCodeReceiver;
pub use commands::{Cli, ClientCommand, Command, LetterClient, ServeArgs};
