//! Tracked channels: reference parsing and the channel list file.

mod list;
mod reference;

pub use list::ChannelList;
pub use reference::{parse_reference, EntityReference, ReferenceKind};
