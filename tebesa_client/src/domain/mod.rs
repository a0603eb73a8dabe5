pub mod entities;
pub mod errors;
pub mod ports;

// Re-export the domain boundary types and ports.
pub use entities::{
    CollectionSnapshot, ConversationKey, Document, Identity, IdentitySource, Message,
    OutgoingMessage, Profile, ProfilePatch, SessionState, StoredDocument, sort_for_display,
};
pub use errors::{ClientError, IdentityError, StoreError, ValidationFailure};
pub use ports::{Clock, DocumentStore, IdentityProvider, SnapshotStream};
