mod cli;

pub use cli::{ChannelsAction, Command, Config};
