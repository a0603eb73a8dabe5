pub mod chat;
pub mod profile;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use chat::{MessageChannel, MessageFeed, SendOutcome, Subscription};
pub use profile::ProfileAccessor;
pub use session::{SessionHandle, SessionManager};
