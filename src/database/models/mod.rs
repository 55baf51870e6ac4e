pub mod broadcast;
pub mod inbox;
pub mod message;
pub mod target;

pub use broadcast::*;
pub use inbox::*;
pub use message::*;
pub use target::*;
