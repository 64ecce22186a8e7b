pub mod handler;
pub mod help;
pub mod interaction;
pub mod router;

pub use handler::handle_message;
pub use interaction::{handle_action, ActionReply};
pub use router::{route, Command};
