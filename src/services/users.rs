//! User directory service
//!
//! Resolves collaboration handles (emails) to identity-provider user IDs
//! and backs the invite typeahead. Profiles themselves are written by the
//! signup flow; the core only needs lookup and the occasional upsert in
//! tests and tooling.

use crate::config::{MIN_SEARCH_PREFIX_LEN, USER_SEARCH_LIMIT};
use crate::error::{AppError, Result};
use crate::model::{Session, UserProfile};
use crate::store::{fields_of, DocumentStore, Predicate, USERS};

#[derive(Clone)]
pub struct UsersService<S> {
    store: S,
}

impl<S: DocumentStore> UsersService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create or replace the profile document for a provider user ID
    pub async fn upsert_profile(&self, user_id: &str, profile: &UserProfile) -> Result<()> {
        self.store.put(USERS, user_id, fields_of(profile)?).await?;
        tracing::debug!("Stored profile for {}", user_id);
        Ok(())
    }

    pub async fn get(&self, user_id: &str) -> Result<Option<UserProfile>> {
        match self.store.get(USERS, user_id).await? {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }

    /// Exact-match lookup by email, normalized to lowercase
    pub async fn find_by_email(&self, email: &str) -> Result<Option<(String, UserProfile)>> {
        let clean = email.trim().to_lowercase();
        let docs = self
            .store
            .query(USERS, &[Predicate::eq("email", clean)])
            .await?;

        match docs.first() {
            Some(doc) => Ok(Some((doc.id.clone(), doc.decode()?))),
            None => Ok(None),
        }
    }

    /// Exact-match lookup that treats a miss as an error
    pub async fn require_by_email(&self, email: &str) -> Result<(String, UserProfile)> {
        self.find_by_email(email)
            .await?
            .ok_or_else(|| AppError::UserNotFound(email.trim().to_lowercase()))
    }

    /// Typeahead search for the invite dialog: email prefix match, capped
    /// result count, the caller's own account filtered out. Prefixes
    /// shorter than the minimum return nothing rather than everything.
    pub async fn search(&self, session: &Session, text: &str) -> Result<Vec<(String, UserProfile)>> {
        let clean = text.trim().to_lowercase();
        if clean.len() < MIN_SEARCH_PREFIX_LEN {
            return Ok(Vec::new());
        }

        let own_email = session.email_lowercase();
        let docs = self
            .store
            .query(USERS, &[Predicate::prefix("email", clean)])
            .await?;

        let mut results = Vec::new();
        for doc in docs {
            let profile: UserProfile = doc.decode()?;
            if profile.email != own_email {
                results.push((doc.id, profile));
            }
            if results.len() == USER_SEARCH_LIMIT {
                break;
            }
        }
        Ok(results)
    }
}
