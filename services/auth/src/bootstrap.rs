//! First-run provisioning of the administrator account

use rand::distributions::{Alphanumeric, DistString};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    error::AuthResult,
    models::{NewUser, Role, User},
    repositories::UserStore,
};

/// Bootstrap administrator settings
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_email")]
    pub email: String,
    /// Initial password. A random one is generated when unset.
    #[serde(default)]
    pub password: Option<String>,
}

fn default_email() -> String {
    "admin@portfolio.com".to_string()
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            email: default_email(),
            password: None,
        }
    }
}

/// Create an active admin when the user table is empty.
///
/// Returns the created user, or `None` when users already exist.
pub async fn ensure_default_admin(
    store: &dyn UserStore,
    config: &AdminConfig,
) -> AuthResult<Option<User>> {
    if store.count().await? > 0 {
        return Ok(None);
    }

    let configured = config.password.clone().filter(|p| !p.is_empty());
    let generated = configured.is_none();
    let password =
        configured.unwrap_or_else(|| Alphanumeric.sample_string(&mut rand::thread_rng(), 24));

    let admin = store
        .create(&NewUser {
            email: config.email.clone(),
            password: password.clone(),
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
            role: Role::Admin,
        })
        .await?;

    info!(user_id = %admin.id, email = %admin.email, "Default admin user created");
    if generated {
        warn!(
            email = %admin.email,
            password = %password,
            "Generated initial admin password; change it after first login"
        );
    }

    Ok(Some(admin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{password::verify_password, repositories::InMemoryUserStore};

    #[tokio::test]
    async fn test_creates_admin_only_once() {
        let store = InMemoryUserStore::new();
        let config = AdminConfig {
            email: "owner@studio.com".to_string(),
            password: Some("Sup3r!secret".to_string()),
        };

        let admin = ensure_default_admin(&store, &config).await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(admin.is_active);
        assert!(verify_password("Sup3r!secret", &admin.password_hash));

        assert!(ensure_default_admin(&store, &config).await.unwrap().is_none());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_generates_password_when_unset() {
        let store = InMemoryUserStore::new();
        let admin = ensure_default_admin(&store, &AdminConfig::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.email, "admin@portfolio.com");
        assert!(admin.password_hash.starts_with("$argon2"));
    }
}
