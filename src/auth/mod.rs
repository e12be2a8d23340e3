//! Authentication: account registration, logins and JWT issue/verify.
//!
//! Two roles exist. `user` tokens carry a positive user id and gate the
//! favorites endpoints; `superuser` tokens are issued against the configured
//! admin credentials and gate the ingest endpoints. Tokens travel as
//! `Authorization: Token <jwt>`, HS256 only.

use std::sync::LazyLock;
use std::time::Duration;

use bcrypt::DEFAULT_COST;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::TelegramProfile;
use crate::repository::UserRepository;

pub const ROLE_USER: &str = "user";
pub const ROLE_SUPERUSER: &str = "superuser";

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("valid regex")
});

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    user_id: i64,
    role: String,
    iat: i64,
    exp: i64,
}

pub struct AuthService {
    users: UserRepository,
    secret: String,
    token_ttl: Duration,
    admin_user: String,
    admin_password: String,
}

impl AuthService {
    pub fn new(
        users: UserRepository,
        secret: &str,
        token_ttl: Duration,
        admin_user: &str,
        admin_password: &str,
    ) -> Result<Self> {
        if secret.is_empty() {
            return Err(Error::Internal("empty jwt secret".to_string()));
        }
        if token_ttl.is_zero() {
            return Err(Error::Internal("token ttl must be positive".to_string()));
        }
        Ok(Self {
            users,
            secret: secret.to_string(),
            token_ttl,
            admin_user: admin_user.to_string(),
            admin_password: admin_password.to_string(),
        })
    }

    /// Register an email/password account and return a fresh token.
    pub async fn register(&self, email: &str, password: &str) -> Result<String> {
        if email.is_empty() || password.is_empty() {
            return Err(Error::BadArguments);
        }
        if !EMAIL_RE.is_match(email) {
            return Err(Error::InvalidEmail);
        }

        let hash = bcrypt::hash(password, DEFAULT_COST)
            .map_err(|e| Error::Internal(format!("hash password: {e}")))?;
        let user = self.users.create(email, &hash).await?;
        self.issue(user.id, ROLE_USER)
    }

    /// Verify email/password and return a fresh token. Unknown accounts and
    /// wrong passwords are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        if email.is_empty() || password.is_empty() {
            return Err(Error::InvalidCredentials);
        }
        if !EMAIL_RE.is_match(email) {
            return Err(Error::InvalidEmail);
        }

        let Some((user, hash)) = self.users.get_by_email(email).await? else {
            return Err(Error::InvalidCredentials);
        };
        let ok = bcrypt::verify(password, &hash)
            .map_err(|e| Error::Internal(format!("verify password: {e}")))?;
        if !ok {
            return Err(Error::InvalidCredentials);
        }
        self.issue(user.id, ROLE_USER)
    }

    /// Upsert a telegram identity and return a token for it.
    pub async fn bot_login_telegram(&self, profile: &TelegramProfile) -> Result<String> {
        if profile.tg_id <= 0 {
            return Err(Error::BadArguments);
        }
        let user = self.users.upsert_telegram(profile).await?;
        self.issue(user.id, ROLE_USER)
    }

    /// Exchange configured admin credentials for a superuser token.
    pub fn admin_login(&self, name: &str, password: &str) -> Result<String> {
        if self.admin_password.is_empty()
            || name != self.admin_user
            || password != self.admin_password
        {
            return Err(Error::InvalidCredentials);
        }
        self.issue(0, ROLE_SUPERUSER)
    }

    /// Validate a user token and return its user id.
    pub fn verify_user(&self, token: &str) -> Result<i64> {
        let claims = self.decode(token)?;
        if claims.user_id <= 0 {
            return Err(Error::Unauthorized);
        }
        Ok(claims.user_id)
    }

    /// Validate that a token carries the superuser role.
    pub fn verify_superuser(&self, token: &str) -> Result<()> {
        let claims = self.decode(token)?;
        if claims.role != ROLE_SUPERUSER {
            return Err(Error::Unauthorized);
        }
        Ok(())
    }

    fn issue(&self, user_id: i64, role: &str) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            user_id,
            role: role.to_string(),
            iat: now,
            exp: now + self.token_ttl.as_secs() as i64,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| Error::Internal(format!("sign token: {e}")))
    }

    fn decode(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|_| Error::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::DbContext;
    use tempfile::tempdir;

    async fn service() -> (AuthService, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let ctx = DbContext::new(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let auth = AuthService::new(
            ctx.users(),
            "test-secret",
            Duration::from_secs(3600),
            "admin",
            "hunter2",
        )
        .unwrap();
        (auth, dir)
    }

    #[tokio::test]
    async fn register_then_login_round_trip() {
        let (auth, _dir) = service().await;

        let token = auth.register("a@example.com", "pw").await.unwrap();
        let user_id = auth.verify_user(&token).unwrap();
        assert!(user_id > 0);

        let token = auth.login("a@example.com", "pw").await.unwrap();
        assert_eq!(auth.verify_user(&token).unwrap(), user_id);
    }

    #[tokio::test]
    async fn login_failures() {
        let (auth, _dir) = service().await;
        auth.register("a@example.com", "pw").await.unwrap();

        assert!(matches!(
            auth.login("a@example.com", "wrong").await.unwrap_err(),
            Error::InvalidCredentials
        ));
        assert!(matches!(
            auth.login("missing@example.com", "pw").await.unwrap_err(),
            Error::InvalidCredentials
        ));
        assert!(matches!(
            auth.login("not-an-email", "pw").await.unwrap_err(),
            Error::InvalidEmail
        ));
    }

    #[tokio::test]
    async fn duplicate_registration_is_conflict() {
        let (auth, _dir) = service().await;
        auth.register("a@example.com", "pw").await.unwrap();
        assert!(matches!(
            auth.register("a@example.com", "pw2").await.unwrap_err(),
            Error::AlreadyExists
        ));
    }

    #[tokio::test]
    async fn invalid_email_is_rejected_on_register() {
        let (auth, _dir) = service().await;
        assert!(matches!(
            auth.register("nope", "pw").await.unwrap_err(),
            Error::InvalidEmail
        ));
        assert!(matches!(
            auth.register("", "pw").await.unwrap_err(),
            Error::BadArguments
        ));
    }

    #[tokio::test]
    async fn telegram_login_issues_stable_identity() {
        let (auth, _dir) = service().await;
        let profile = TelegramProfile {
            tg_id: 7,
            username: "randall".to_string(),
            ..Default::default()
        };
        let first = auth.bot_login_telegram(&profile).await.unwrap();
        let second = auth.bot_login_telegram(&profile).await.unwrap();
        assert_eq!(
            auth.verify_user(&first).unwrap(),
            auth.verify_user(&second).unwrap()
        );

        let bad = TelegramProfile::default();
        assert!(matches!(
            auth.bot_login_telegram(&bad).await.unwrap_err(),
            Error::BadArguments
        ));
    }

    #[tokio::test]
    async fn roles_are_enforced() {
        let (auth, _dir) = service().await;

        let admin_token = auth.admin_login("admin", "hunter2").unwrap();
        auth.verify_superuser(&admin_token).unwrap();
        // A superuser token carries no usable user id.
        assert!(matches!(
            auth.verify_user(&admin_token).unwrap_err(),
            Error::Unauthorized
        ));

        let user_token = auth.register("a@example.com", "pw").await.unwrap();
        assert!(matches!(
            auth.verify_superuser(&user_token).unwrap_err(),
            Error::Unauthorized
        ));

        assert!(matches!(
            auth.admin_login("admin", "wrong").unwrap_err(),
            Error::InvalidCredentials
        ));
        assert!(matches!(
            auth.verify_user("garbage").unwrap_err(),
            Error::Unauthorized
        ));
    }
}
