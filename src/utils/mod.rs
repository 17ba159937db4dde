pub mod identity;
pub mod order;
pub mod term;
pub mod types;

pub use identity::dir_identity;
pub use order::order_entries;
pub use term::color_choice;
pub use types::{EntryKind, EntryMeta, Frame};
