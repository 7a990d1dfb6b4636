//! Identity provider abstraction
//!
//! Accounts are email + password with a display name. The local provider keeps
//! salted SHA-256 password hashes in the `credentials` collection of a
//! [`DocumentStore`].

use crate::error::{AuthError, AuthResult};
use crate::store::{Document, DocumentStore};
use chrono::Utc;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const CREDENTIALS: &str = "credentials";
pub const MIN_PASSWORD_LEN: usize = 6;

/// The signed-in account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
    pub display_name: String,
}

/// Trait for identity providers
pub trait IdentityProvider: Send + Sync {
    /// Register a new account and sign it in
    fn create_account(&self, email: &str, password: &str, name: &str) -> AuthResult<AuthUser>;

    fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthUser>;

    fn sign_out(&self) -> AuthResult<()>;

    fn current_user(&self) -> Option<AuthUser>;

    /// Receive the current user now and after every sign-in or sign-out
    fn subscribe(&self) -> Receiver<Option<AuthUser>>;

    /// Rename the signed-in account
    fn update_display_name(&self, name: &str) -> AuthResult<AuthUser>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Credential {
    uid: String,
    email: String,
    display_name: String,
    salt: String,
    password_hash: String,
    created_at: chrono::DateTime<Utc>,
}

impl Credential {
    fn to_user(&self) -> AuthUser {
        AuthUser {
            uid: self.uid.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// Normalize an email for lookups
fn email_key(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Loose shape check: `local@domain.tld` without whitespace
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn new_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Identity provider backed by the document store
pub struct LocalAuth {
    store: Arc<dyn DocumentStore>,
    current: Mutex<Option<AuthUser>>,
    subscribers: Mutex<Vec<Sender<Option<AuthUser>>>>,
}

impl LocalAuth {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            current: Mutex::new(None),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    fn load_credential(&self, email: &str) -> AuthResult<Option<Credential>> {
        let Some(doc) = self.store.get_document(CREDENTIALS, &email_key(email))? else {
            return Ok(None);
        };
        match serde_json::from_value(serde_json::Value::Object(doc)) {
            Ok(credential) => Ok(Some(credential)),
            Err(e) => {
                warn!(error = %e, "unreadable credential record");
                Ok(None)
            }
        }
    }

    fn save_credential(&self, credential: &Credential) -> AuthResult<()> {
        let value = serde_json::to_value(credential).map_err(crate::error::StoreError::from)?;
        let doc: Document = match value {
            serde_json::Value::Object(map) => map,
            _ => Document::new(),
        };
        self.store
            .set_document(CREDENTIALS, &email_key(&credential.email), doc)?;
        Ok(())
    }

    fn set_current(&self, user: Option<AuthUser>) {
        *lock(&self.current) = user.clone();
        lock(&self.subscribers).retain(|tx| tx.send(user.clone()).is_ok());
    }
}

impl IdentityProvider for LocalAuth {
    fn create_account(&self, email: &str, password: &str, name: &str) -> AuthResult<AuthUser> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::MissingName);
        }
        if !is_valid_email(email) {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        if self.load_credential(email)?.is_some() {
            return Err(AuthError::EmailInUse);
        }

        let salt = new_salt();
        let credential = Credential {
            uid: Uuid::new_v4().to_string(),
            email: email.trim().to_string(),
            display_name: name.to_string(),
            password_hash: hash_password(&salt, password),
            salt,
            created_at: Utc::now(),
        };
        self.save_credential(&credential)?;
        info!(uid = %credential.uid, "account created");

        let user = credential.to_user();
        self.set_current(Some(user.clone()));
        Ok(user)
    }

    fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthUser> {
        let credential = self
            .load_credential(email)?
            .ok_or(AuthError::InvalidCredential)?;
        if hash_password(&credential.salt, password) != credential.password_hash {
            debug!("password mismatch");
            return Err(AuthError::InvalidCredential);
        }

        info!(uid = %credential.uid, "signed in");
        let user = credential.to_user();
        self.set_current(Some(user.clone()));
        Ok(user)
    }

    fn sign_out(&self) -> AuthResult<()> {
        if let Some(user) = self.current_user() {
            info!(uid = %user.uid, "signed out");
        }
        self.set_current(None);
        Ok(())
    }

    fn current_user(&self) -> Option<AuthUser> {
        lock(&self.current).clone()
    }

    fn subscribe(&self) -> Receiver<Option<AuthUser>> {
        let (tx, rx) = mpsc::channel();
        // A closed receiver is dropped from the list on the next change
        let _ = tx.send(self.current_user());
        lock(&self.subscribers).push(tx);
        rx
    }

    fn update_display_name(&self, name: &str) -> AuthResult<AuthUser> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::MissingName);
        }
        let user = self.current_user().ok_or(AuthError::NotSignedIn)?;
        let mut credential = self
            .load_credential(&user.email)?
            .ok_or(AuthError::NotSignedIn)?;

        credential.display_name = name.to_string();
        self.save_credential(&credential)?;

        let user = credential.to_user();
        self.set_current(Some(user.clone()));
        Ok(user)
    }
}
