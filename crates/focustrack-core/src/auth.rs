//! Local account book.
//!
//! Identity is only used to key the remote mirror, so accounts are a small
//! TOML file in the data dir: who is registered on this machine and who is
//! signed in. There are no passwords here.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::AuthError;
use crate::storage::data_dir;

/// Source of the signed-in user's id.
pub trait AuthProvider: Send + Sync {
    fn current_user_id(&self) -> Option<String>;
}

/// Nobody is signed in.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl AuthProvider for Anonymous {
    fn current_user_id(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: String,
    pub email: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AccountBook {
    #[serde(default)]
    current: Option<String>,
    #[serde(default)]
    accounts: Vec<Account>,
}

/// Accounts persisted at `<data dir>/accounts.toml`.
#[derive(Debug, Clone)]
pub struct LocalAccounts {
    path: PathBuf,
    book: AccountBook,
}

impl LocalAccounts {
    /// Open the default account book.
    ///
    /// # Errors
    /// Fails if the data dir is unavailable or the file cannot be parsed.
    pub fn open_default() -> Result<Self, AuthError> {
        let dir = data_dir().map_err(|e| AuthError::Book {
            path: PathBuf::from("accounts.toml"),
            message: e.to_string(),
        })?;
        Self::open(dir.join("accounts.toml"))
    }

    /// Open an account book; a missing file is an empty book.
    ///
    /// # Errors
    /// Fails if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AuthError> {
        let path = path.into();
        let book = match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| book_error(&path, e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => AccountBook::default(),
            Err(e) => return Err(book_error(&path, e)),
        };
        Ok(Self { path, book })
    }

    pub fn current(&self) -> Option<&Account> {
        let id = self.book.current.as_deref()?;
        self.book.accounts.iter().find(|a| a.user_id == id)
    }

    /// Register a new account and sign it in.
    ///
    /// # Errors
    /// Rejects malformed or already registered emails, and write failures.
    pub fn register(&mut self, email: &str, display_name: &str) -> Result<Account, AuthError> {
        let email = normalize_email(email)?;
        if self.find(&email).is_some() {
            return Err(AuthError::AlreadyRegistered(email));
        }

        let account = Account {
            user_id: Uuid::new_v4().to_string(),
            email,
            display_name: display_name.trim().to_string(),
            created_at: Utc::now(),
        };
        self.book.current = Some(account.user_id.clone());
        self.book.accounts.push(account.clone());
        self.save()?;
        info!(user_id = %account.user_id, "account registered");
        Ok(account)
    }

    /// Sign in an existing account.
    ///
    /// # Errors
    /// Fails for unknown emails and write failures.
    pub fn login(&mut self, email: &str) -> Result<Account, AuthError> {
        let email = normalize_email(email)?;
        let account = self
            .find(&email)
            .cloned()
            .ok_or(AuthError::NotRegistered(email))?;
        self.book.current = Some(account.user_id.clone());
        self.save()?;
        info!(user_id = %account.user_id, "signed in");
        Ok(account)
    }

    /// Sign out. Signing out while nobody is signed in is fine.
    ///
    /// # Errors
    /// Fails when the book cannot be written.
    pub fn logout(&mut self) -> Result<(), AuthError> {
        if self.book.current.take().is_some() {
            self.save()?;
            info!("signed out");
        }
        Ok(())
    }

    fn find(&self, email: &str) -> Option<&Account> {
        self.book.accounts.iter().find(|a| a.email == email)
    }

    fn save(&self) -> Result<(), AuthError> {
        let content = toml::to_string_pretty(&self.book).map_err(|e| book_error(&self.path, e))?;
        std::fs::write(&self.path, content).map_err(|e| book_error(&self.path, e))
    }
}

impl AuthProvider for LocalAccounts {
    fn current_user_id(&self) -> Option<String> {
        self.current().map(|a| a.user_id.clone())
    }
}

fn book_error(path: &Path, err: impl std::fmt::Display) -> AuthError {
    AuthError::Book {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((user, domain)) if !user.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AuthError::InvalidEmail(email)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> (tempfile::TempDir, LocalAccounts) {
        let dir = tempfile::tempdir().unwrap();
        let accounts = LocalAccounts::open(dir.path().join("accounts.toml")).unwrap();
        (dir, accounts)
    }

    #[test]
    fn missing_book_is_anonymous() {
        let (_dir, accounts) = book();
        assert!(accounts.current().is_none());
        assert!(accounts.current_user_id().is_none());
    }

    #[test]
    fn register_signs_in_and_persists() {
        let (dir, mut accounts) = book();
        let account = accounts.register("Ada@Example.com", "Ada").unwrap();
        assert_eq!(account.email, "ada@example.com");
        assert_eq!(accounts.current_user_id(), Some(account.user_id.clone()));

        let reopened = LocalAccounts::open(dir.path().join("accounts.toml")).unwrap();
        assert_eq!(reopened.current_user_id(), Some(account.user_id));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let (_dir, mut accounts) = book();
        accounts.register("ada@example.com", "Ada").unwrap();
        assert!(matches!(
            accounts.register("ADA@example.com", "Other"),
            Err(AuthError::AlreadyRegistered(_))
        ));
    }

    #[test]
    fn logout_then_login() {
        let (_dir, mut accounts) = book();
        let account = accounts.register("ada@example.com", "Ada").unwrap();
        accounts.logout().unwrap();
        assert!(accounts.current_user_id().is_none());
        accounts.logout().unwrap();

        let again = accounts.login("ada@example.com").unwrap();
        assert_eq!(again.user_id, account.user_id);
        assert!(matches!(
            accounts.login("bob@example.com"),
            Err(AuthError::NotRegistered(_))
        ));
    }

    #[test]
    fn malformed_emails_are_rejected() {
        let (_dir, mut accounts) = book();
        for bad in ["", "ada", "@example.com", "ada@localhost"] {
            assert!(matches!(
                accounts.register(bad, "x"),
                Err(AuthError::InvalidEmail(_))
            ));
        }
    }
}
