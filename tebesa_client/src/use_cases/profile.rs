use serde_json::Value;
use tracing::{debug, info};

use crate::domain::entities::{Document, Profile, ProfilePatch};
use crate::domain::errors::{ClientError, StoreError};
use crate::domain::ports::DocumentStore;
use crate::use_cases::session::SessionHandle;

// Profile documents for the users of one application id.
pub struct ProfileAccessor<S> {
    pub store: S,
    pub app_id: String,
    pub session: SessionHandle,
}

impl<S> ProfileAccessor<S>
where
    S: DocumentStore,
{
    pub fn collection(&self, user_id: &str) -> String {
        format!("artifacts/{}/users/{}/profiles", self.app_id, user_id)
    }

    // Returns the stored profile, or persists `default_profile` on a miss.
    #[tracing::instrument(name = "profile_fetch_or_create", skip_all, fields(user_id = %user_id))]
    pub async fn fetch_or_create(
        &self,
        user_id: &str,
        default_profile: Profile,
    ) -> Result<Profile, ClientError> {
        self.session.require_ready()?;
        let collection = self.collection(user_id);

        if let Some(document) = self.store.get(&collection, user_id).await? {
            debug!("profile found");
            return decode_profile(user_id, document).map_err(ClientError::from);
        }

        info!("no profile stored; creating the default one");
        // Stored and returned with the same id a later read reports.
        let profile = Profile {
            id: user_id.to_string(),
            ..default_profile
        };
        self.store
            .set(&collection, user_id, encode_profile(&profile)?)
            .await?;
        Ok(profile)
    }

    // Full replacement of the stored document. The id is forced to `user_id`.
    #[tracing::instrument(name = "profile_replace", skip_all, fields(user_id = %user_id))]
    pub async fn replace(&self, user_id: &str, profile: Profile) -> Result<Profile, ClientError> {
        self.session.require_ready()?;
        let profile = Profile {
            id: user_id.to_string(),
            ..profile
        };
        self.store
            .set(&self.collection(user_id), user_id, encode_profile(&profile)?)
            .await?;
        Ok(profile)
    }

    // Writes only the fields present in `patch` over the stored record.
    #[tracing::instrument(name = "profile_update", skip_all, fields(user_id = %user_id))]
    pub async fn update(&self, user_id: &str, patch: ProfilePatch) -> Result<Profile, ClientError> {
        self.session.require_ready()?;
        let collection = self.collection(user_id);

        let mut profile = match self.store.get(&collection, user_id).await? {
            Some(document) => decode_profile(user_id, document)?,
            None => Profile {
                id: user_id.to_string(),
                ..Profile::default()
            },
        };
        patch.apply(&mut profile);

        self.store
            .set(&collection, user_id, encode_profile(&profile)?)
            .await?;
        Ok(profile)
    }
}

fn decode_profile(user_id: &str, document: Document) -> Result<Profile, StoreError> {
    let mut profile: Profile = serde_json::from_value(Value::Object(document))?;
    profile.id = user_id.to_string();
    Ok(profile)
}

fn encode_profile(profile: &Profile) -> Result<Document, StoreError> {
    match serde_json::to_value(profile)? {
        Value::Object(document) => Ok(document),
        _ => Err(StoreError::Decode("profile did not encode to an object".to_string())),
    }
}
