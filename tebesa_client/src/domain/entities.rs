use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// A stored document body: one JSON object.
pub type Document = Map<String, Value>;

// How the current identity was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentitySource {
    // The provider already held a signed-in user.
    Restored,
    BootstrapToken,
    Anonymous,
    // Every provider step failed; the id was generated locally.
    LocalFallback,
}

// Client-side view of who the current user is and whether that is settled yet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    pub user_id: Option<String>,
    pub authenticated: bool,
    pub ready: bool,
    pub source: Option<IdentitySource>,
}

impl SessionState {
    // Terminal state for an identity issued by the provider.
    pub fn authenticated(user_id: String, source: IdentitySource) -> Self {
        Self {
            user_id: Some(user_id),
            authenticated: true,
            ready: true,
            source: Some(source),
        }
    }

    // Terminal state for the local fallback: an id but no provider backing.
    pub fn degraded(user_id: String) -> Self {
        Self {
            user_id: Some(user_id),
            authenticated: false,
            ready: true,
            source: Some(IdentitySource::LocalFallback),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

// Identity answered by an identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Dating profile stored once per user.
///
/// Stored records may be partial. Every field decodes to its empty default when
/// missing, and `interests`/`photos` also treat an explicit `null` as empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub location: String,
    pub bio: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub interests: Vec<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub photos: Vec<String>,
}

impl Profile {
    // Starter profile shown before the user has edited anything.
    pub fn placeholder(user_id: impl Into<String>) -> Self {
        Self {
            id: user_id.into(),
            name: "Jane Doe".to_string(),
            age: 30,
            location: "Addis Ababa, Ethiopia".to_string(),
            bio: "Passionate about art, hiking, and exploring new cultures. Seeking a genuine connection."
                .to_string(),
            interests: ["Art", "Hiking", "Reading", "Cooking", "Travel"]
                .into_iter()
                .map(String::from)
                .collect(),
            photos: vec![
                "https://placehold.co/150x150/F0D4D4/FFFFFF?text=Profile+Pic+1".to_string(),
                "https://placehold.co/150x150/C2B9B0/FFFFFF?text=Profile+Pic+2".to_string(),
            ],
        }
    }
}

// Field-level profile edit; `None` leaves the stored value alone.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub interests: Option<Vec<String>>,
    pub photos: Option<Vec<String>>,
}

impl ProfilePatch {
    pub fn apply(self, profile: &mut Profile) {
        if let Some(name) = self.name {
            profile.name = name;
        }
        if let Some(age) = self.age {
            profile.age = age;
        }
        if let Some(location) = self.location {
            profile.location = location;
        }
        if let Some(bio) = self.bio {
            profile.bio = bio;
        }
        if let Some(interests) = self.interests {
            profile.interests = interests;
        }
        if let Some(photos) = self.photos {
            profile.photos = photos;
        }
    }
}

// One chat message. Never mutated once stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    // Assigned by the store; not part of the persisted body.
    #[serde(skip)]
    pub id: String,
    pub text: String,
    pub sender_id: String,
    #[serde(default)]
    pub receiver_id: String,
    // Epoch milliseconds; records without one sort first.
    #[serde(default)]
    pub timestamp: u64,
}

// Message as composed by the local user, before the channel stamps it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    pub receiver_id: String,
}

impl OutgoingMessage {
    pub fn new(text: impl Into<String>, receiver_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            receiver_id: receiver_id.into(),
        }
    }
}

// Stable sort by timestamp: equal timestamps keep their arrival order.
pub fn sort_for_display(messages: &mut [Message]) {
    messages.sort_by_key(|message| message.timestamp);
}

// Identifier grouping the messages of one chat thread.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConversationKey(String);

impl ConversationKey {
    // Returns `None` for keys that are empty after trimming.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return None;
        }
        Some(Self(raw))
    }

    // Same key regardless of which participant builds it.
    pub fn between(a: &str, b: &str) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{low}_{high}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// One entry of a collection snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub data: Document,
}

// Full contents of a collection, in arrival order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    pub docs: Vec<StoredDocument>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
