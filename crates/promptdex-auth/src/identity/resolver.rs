//! Identity resolution and account provisioning.
//!
//! The [`IdentityResolver`] unifies the three identity origins into one
//! [`Principal`]:
//!
//! 1. **Federated resolve** — look up by email, reusing an existing
//!    principal as-is; otherwise provision a new one with a
//!    guaranteed-unique username.
//! 2. **Local registration** — validate, reject duplicates, hash the
//!    password.
//! 3. **Local authentication** — verify credentials, collapsing every
//!    failure mode into one generic error.
//!
//! Provisioning is safe under concurrent identical registrations: the
//! username existence probe is advisory only, and a unique-constraint
//! violation raised by the store at insert time is handled as a retry
//! signal (next suffix), never as a fatal error.

use std::sync::Arc;

use rand::Rng;
use time::OffsetDateTime;

use crate::error::{AuthError, ConflictField};
use crate::password;
use crate::storage::{
    AuthProvider, Principal, PrincipalStore, StoreError, UniqueField,
};

use super::profile::ProviderProfile;

/// Maximum length of a username, including any collision suffix.
pub const USERNAME_MAX_LEN: usize = 50;

/// Reserved domain for placeholder emails synthesized for GitHub accounts
/// that withhold their address.
pub const GITHUB_NOREPLY_DOMAIN: &str = "users.noreply.github.com";

/// Sequential numeric suffixes probed before falling back to randomized
/// ones. Keeps a burst of identical-name registrations from looping.
const MAX_SEQUENTIAL_SUFFIXES: u32 = 10;

/// Hard cap on provisioning attempts, counting insert-time races.
const MAX_PROVISION_ATTEMPTS: u32 = 24;

impl From<UniqueField> for ConflictField {
    fn from(field: UniqueField) -> Self {
        match field {
            UniqueField::Username => Self::Username,
            UniqueField::Email => Self::Email,
        }
    }
}

/// Resolves provider profiles and local credentials into principals.
pub struct IdentityResolver {
    store: Arc<dyn PrincipalStore>,
}

impl IdentityResolver {
    /// Creates a resolver over the given principal store.
    #[must_use]
    pub fn new(store: Arc<dyn PrincipalStore>) -> Self {
        Self { store }
    }

    // -------------------------------------------------------------------------
    // Federated resolution
    // -------------------------------------------------------------------------

    /// Resolves a federated login into a principal, provisioning a new
    /// account on first sight of the email.
    ///
    /// Repeat logins reuse the stored principal as-is: provider-supplied
    /// attributes (display name, etc.) are deliberately not refreshed.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Processing`] when no email can be derived from
    /// the profile, and storage errors from the underlying store.
    pub async fn resolve_federated(
        &self,
        provider: AuthProvider,
        profile: &ProviderProfile,
    ) -> Result<Principal, AuthError> {
        let email = resolve_email(provider, profile)?;

        if let Some(existing) = self
            .store
            .find_by_email(&email)
            .await
            .map_err(storage_error)?
        {
            tracing::debug!(
                principal_id = %existing.id,
                provider = %provider,
                "Federated login matched existing principal"
            );
            return Ok(existing);
        }

        self.provision(provider, profile, email).await
    }

    /// Generates a username not currently present in the store.
    ///
    /// The result always matches `[a-z0-9_.-]+` and fits
    /// [`USERNAME_MAX_LEN`]. The existence probe is advisory: callers must
    /// still treat an insert-time uniqueness violation as a collision.
    ///
    /// # Errors
    ///
    /// Returns storage errors from the existence probe.
    pub async fn generate_unique_username(
        &self,
        profile: &ProviderProfile,
        email: &str,
    ) -> Result<String, AuthError> {
        let base = candidate_base(profile, email);

        for counter in 0..=MAX_SEQUENTIAL_SUFFIXES {
            let candidate = with_numeric_suffix(&base, counter);
            if !self
                .store
                .exists_username(&candidate)
                .await
                .map_err(storage_error)?
            {
                return Ok(candidate);
            }
        }

        // Dense collision neighborhood; stop scanning sequentially.
        Ok(with_random_suffix(&base))
    }

    async fn provision(
        &self,
        provider: AuthProvider,
        profile: &ProviderProfile,
        email: String,
    ) -> Result<Principal, AuthError> {
        for attempt in 0..MAX_PROVISION_ATTEMPTS {
            let username = self.generate_unique_username(profile, &email).await?;
            let principal = Principal::new(username, email.clone(), provider);

            match self.store.create(&principal).await {
                Ok(()) => {
                    tracing::info!(
                        principal_id = %principal.id,
                        username = %principal.username,
                        provider = %provider,
                        attempt,
                        "Provisioned federated principal"
                    );
                    return Ok(principal);
                }
                Err(StoreError::UniqueViolation(UniqueField::Username)) => {
                    // Lost a provisioning race; the probe will now see the
                    // winner and pick the next suffix.
                    tracing::debug!(
                        username = %principal.username,
                        attempt,
                        "Username taken at insert time, retrying"
                    );
                }
                Err(StoreError::UniqueViolation(UniqueField::Email)) => {
                    // A concurrent first login for the same email won the
                    // insert; reuse its principal.
                    return self
                        .store
                        .find_by_email(&email)
                        .await
                        .map_err(storage_error)?
                        .ok_or_else(|| {
                            AuthError::storage("email conflict reported but no principal stored")
                        });
                }
                Err(e) => return Err(storage_error(e)),
            }
        }

        Err(AuthError::internal(format!(
            "failed to provision a unique username after {MAX_PROVISION_ATTEMPTS} attempts"
        )))
    }

    // -------------------------------------------------------------------------
    // Local credentials
    // -------------------------------------------------------------------------

    /// Registers a new local-credential principal.
    ///
    /// The failure is idempotent: a duplicate username or email leaves the
    /// store unchanged and returns a conflict.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] for blank or malformed input and
    /// [`AuthError::RegistrationConflict`] for duplicates.
    pub async fn register_local(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Principal, AuthError> {
        validate_registration(username, email, password)?;

        if self
            .store
            .find_by_username(username)
            .await
            .map_err(storage_error)?
            .is_some()
        {
            return Err(AuthError::conflict(ConflictField::Username));
        }
        if self
            .store
            .find_by_email(email)
            .await
            .map_err(storage_error)?
            .is_some()
        {
            return Err(AuthError::conflict(ConflictField::Email));
        }

        let hash = password::hash_password(password)
            .map_err(|e| AuthError::internal(format!("password hashing failed: {e}")))?;
        let principal = Principal::builder(username, email, AuthProvider::Local)
            .password_hash(hash)
            .build();

        match self.store.create(&principal).await {
            Ok(()) => {
                tracing::info!(
                    principal_id = %principal.id,
                    username = %principal.username,
                    "Registered local principal"
                );
                Ok(principal)
            }
            // A registration that races past the lookups still fails as a
            // plain conflict.
            Err(StoreError::UniqueViolation(field)) => Err(AuthError::conflict(field.into())),
            Err(e) => Err(storage_error(e)),
        }
    }

    /// Authenticates a local credential pair.
    ///
    /// Accepts the username or the email in the first slot. Unknown
    /// account, federated account without a password, and wrong password
    /// all collapse into the same error.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for every authentication
    /// failure; storage errors are propagated as such.
    pub async fn authenticate_local(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Principal, AuthError> {
        let principal = match self
            .store
            .find_by_username(username)
            .await
            .map_err(storage_error)?
        {
            Some(p) => Some(p),
            None => self
                .store
                .find_by_email(username)
                .await
                .map_err(storage_error)?,
        };

        let Some(principal) = principal else {
            return Err(AuthError::InvalidCredentials);
        };
        let Some(hash) = principal.password_hash.as_deref() else {
            return Err(AuthError::InvalidCredentials);
        };

        match password::verify_password(password, hash) {
            Ok(true) => Ok(principal),
            Ok(false) => Err(AuthError::InvalidCredentials),
            Err(e) => {
                tracing::error!(
                    principal_id = %principal.id,
                    error = %e,
                    "Stored password hash is malformed"
                );
                Err(AuthError::InvalidCredentials)
            }
        }
    }
}

// =============================================================================
// Username derivation
// =============================================================================

/// Derives the email for a federated profile.
fn resolve_email(provider: AuthProvider, profile: &ProviderProfile) -> Result<String, AuthError> {
    if let Some(email) = &profile.email {
        return Ok(email.clone());
    }

    // GitHub withholds the email unless the user opts in; fall back to the
    // provider's own noreply addressing scheme.
    if provider == AuthProvider::Github
        && let Some(login) = &profile.login
    {
        return Ok(format!("{login}@{GITHUB_NOREPLY_DOMAIN}"));
    }

    Err(AuthError::processing(format!(
        "email not available from provider {provider}"
    )))
}

/// Picks and sanitizes the base username candidate.
///
/// Source priority: login handle, preferred display name, full name, the
/// local part of the email.
fn candidate_base(profile: &ProviderProfile, email: &str) -> String {
    let raw = profile
        .login
        .as_deref()
        .or(profile.preferred_username.as_deref())
        .or(profile.name.as_deref())
        .unwrap_or_else(|| email.split('@').next().unwrap_or(email));

    let mut base = sanitize(raw);
    if base.is_empty() {
        base = format!("user{}", OffsetDateTime::now_utc().unix_timestamp());
    }
    base.truncate(USERNAME_MAX_LEN);
    base
}

/// Lowercases and strips everything outside `[a-z0-9_.-]`.
fn sanitize(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-'))
        .collect()
}

/// Appends a numeric collision suffix, truncating the base so the result
/// still fits [`USERNAME_MAX_LEN`]. Suffix `0` is the bare base.
fn with_numeric_suffix(base: &str, counter: u32) -> String {
    if counter == 0 {
        return base.to_string();
    }
    let suffix = counter.to_string();
    let keep = USERNAME_MAX_LEN.saturating_sub(suffix.len());
    format!("{}{}", &base[..base.len().min(keep)], suffix)
}

/// Appends a randomized suffix for the pathological collision case.
fn with_random_suffix(base: &str) -> String {
    let bytes: [u8; 4] = rand::thread_rng().r#gen();
    let suffix = hex::encode(bytes);
    let keep = USERNAME_MAX_LEN.saturating_sub(suffix.len());
    format!("{}{}", &base[..base.len().min(keep)], suffix)
}

fn storage_error(e: StoreError) -> AuthError {
    AuthError::storage(e.to_string())
}

/// Validates local registration input.
fn validate_registration(username: &str, email: &str, password: &str) -> Result<(), AuthError> {
    if username.trim().is_empty() {
        return Err(AuthError::validation("username must not be blank"));
    }
    if username.len() > USERNAME_MAX_LEN {
        return Err(AuthError::validation(format!(
            "username must be at most {USERNAME_MAX_LEN} characters"
        )));
    }
    if password.trim().is_empty() {
        return Err(AuthError::validation("password must not be blank"));
    }
    let email = email.trim();
    let valid_email = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid_email {
        return Err(AuthError::validation("email must be a valid address"));
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryPrincipalStore, roles};

    fn resolver() -> (IdentityResolver, Arc<MemoryPrincipalStore>) {
        let store = Arc::new(MemoryPrincipalStore::new());
        (IdentityResolver::new(store.clone()), store)
    }

    fn github_profile(login: &str) -> ProviderProfile {
        ProviderProfile::default().with_login(login)
    }

    fn is_valid_username(username: &str) -> bool {
        !username.is_empty()
            && username.len() <= USERNAME_MAX_LEN
            && username
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-'))
    }

    #[test]
    fn test_sanitize_charset_and_case() {
        assert_eq!(sanitize("Octo Cat!"), "octocat");
        assert_eq!(sanitize("jane.d-42_x"), "jane.d-42_x");
        assert_eq!(sanitize("Ünï©ödé"), "nd");
        assert_eq!(sanitize("@#$%"), "");
    }

    #[test]
    fn test_candidate_base_priority() {
        let full = ProviderProfile::default()
            .with_login("LoginName")
            .with_preferred_username("preferred")
            .with_name("Full Name");
        assert_eq!(candidate_base(&full, "x@y.com"), "loginname");

        let no_login = ProviderProfile::default()
            .with_preferred_username("Preferred")
            .with_name("Full Name");
        assert_eq!(candidate_base(&no_login, "x@y.com"), "preferred");

        let name_only = ProviderProfile::default().with_name("Full Name");
        assert_eq!(candidate_base(&name_only, "x@y.com"), "fullname");

        let empty = ProviderProfile::default();
        assert_eq!(candidate_base(&empty, "local.part@y.com"), "local.part");
    }

    #[test]
    fn test_candidate_base_unusable_falls_back_to_timestamp() {
        let profile = ProviderProfile::default().with_login("@@@");
        let base = candidate_base(&profile, "!!!@y.com");

        assert!(base.starts_with("user"));
        assert!(is_valid_username(&base));
    }

    #[test]
    fn test_numeric_suffix_respects_max_len() {
        let base = "a".repeat(USERNAME_MAX_LEN);

        assert_eq!(with_numeric_suffix(&base, 0).len(), USERNAME_MAX_LEN);

        let suffixed = with_numeric_suffix(&base, 12);
        assert_eq!(suffixed.len(), USERNAME_MAX_LEN);
        assert!(suffixed.ends_with("12"));
    }

    #[test]
    fn test_random_suffix_respects_max_len() {
        let base = "b".repeat(USERNAME_MAX_LEN);
        let suffixed = with_random_suffix(&base);

        assert_eq!(suffixed.len(), USERNAME_MAX_LEN);
        assert!(is_valid_username(&suffixed));
        assert_ne!(with_random_suffix(&base), suffixed);
    }

    #[tokio::test]
    async fn test_github_placeholder_email() {
        let (resolver, _) = resolver();
        let principal = resolver
            .resolve_federated(AuthProvider::Github, &github_profile("octocat"))
            .await
            .unwrap();

        assert_eq!(principal.email, "octocat@users.noreply.github.com");
        assert_eq!(principal.username, "octocat");
        assert_eq!(principal.provider, AuthProvider::Github);
        assert_eq!(principal.roles, vec![roles::USER]);
        assert!(principal.password_hash.is_none());
    }

    #[tokio::test]
    async fn test_missing_email_without_synthesis_fails() {
        let (resolver, store) = resolver();
        let profile = ProviderProfile::default().with_name("No Email");

        let err = resolver
            .resolve_federated(AuthProvider::Google, &profile)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Processing { .. }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_collision_suffix_chain() {
        let (resolver, store) = resolver();
        store
            .create(&Principal::new(
                "octocat",
                "first@x.com",
                AuthProvider::Local,
            ))
            .await
            .unwrap();

        let second = resolver
            .resolve_federated(
                AuthProvider::Github,
                &github_profile("octocat").with_email("second@x.com"),
            )
            .await
            .unwrap();
        assert_eq!(second.username, "octocat1");

        let third = resolver
            .resolve_federated(
                AuthProvider::Github,
                &github_profile("octocat").with_email("third@x.com"),
            )
            .await
            .unwrap();
        assert_eq!(third.username, "octocat2");
    }

    #[tokio::test]
    async fn test_suffix_truncates_long_base() {
        let (resolver, store) = resolver();
        let long_login = "c".repeat(USERNAME_MAX_LEN + 10);
        let profile = github_profile(&long_login);

        let first = resolver
            .resolve_federated(AuthProvider::Github, &profile.clone().with_email("a@x.com"))
            .await
            .unwrap();
        assert_eq!(first.username.len(), USERNAME_MAX_LEN);

        let second = resolver
            .resolve_federated(AuthProvider::Github, &profile.with_email("b@x.com"))
            .await
            .unwrap();
        assert_eq!(second.username.len(), USERNAME_MAX_LEN);
        assert!(second.username.ends_with('1'));
        assert_ne!(first.username, second.username);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_dense_collisions_fall_back_to_random_suffix() {
        let (resolver, store) = resolver();
        for counter in 0..=MAX_SEQUENTIAL_SUFFIXES {
            store
                .create(&Principal::new(
                    with_numeric_suffix("octocat", counter),
                    format!("taken{counter}@x.com"),
                    AuthProvider::Local,
                ))
                .await
                .unwrap();
        }

        let principal = resolver
            .resolve_federated(
                AuthProvider::Github,
                &github_profile("octocat").with_email("fresh@x.com"),
            )
            .await
            .unwrap();

        assert!(is_valid_username(&principal.username));
        assert!(principal.username.starts_with("octocat"));
        assert_ne!(principal.username, "octocat");
    }

    #[tokio::test]
    async fn test_repeat_login_reuses_principal_without_refresh() {
        let (resolver, store) = resolver();
        let first = resolver
            .resolve_federated(
                AuthProvider::Github,
                &github_profile("octocat").with_email("cat@x.com"),
            )
            .await
            .unwrap();

        // Same email, different attributes on the repeat login.
        let again = resolver
            .resolve_federated(
                AuthProvider::Github,
                &github_profile("renamed-octocat").with_email("cat@x.com"),
            )
            .await
            .unwrap();

        assert_eq!(again.id, first.id);
        assert_eq!(again.username, "octocat");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_identical_profiles_get_unique_usernames() {
        let (resolver, store) = resolver();
        let resolver = Arc::new(resolver);

        let mut handles = Vec::new();
        for i in 0..6 {
            let resolver = Arc::clone(&resolver);
            handles.push(tokio::spawn(async move {
                resolver
                    .resolve_federated(
                        AuthProvider::Github,
                        &github_profile("octocat").with_email(format!("cat{i}@x.com")),
                    )
                    .await
            }));
        }

        let mut usernames = Vec::new();
        for handle in handles {
            let principal = handle.await.unwrap().unwrap();
            assert!(is_valid_username(&principal.username));
            usernames.push(principal.username);
        }

        usernames.sort();
        usernames.dedup();
        assert_eq!(usernames.len(), 6, "usernames must be unique");
        assert_eq!(store.len().await, 6);
    }

    #[tokio::test]
    async fn test_concurrent_same_email_resolves_to_one_principal() {
        let (resolver, store) = resolver();
        let resolver = Arc::new(resolver);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let resolver = Arc::clone(&resolver);
            handles.push(tokio::spawn(async move {
                resolver
                    .resolve_federated(
                        AuthProvider::Github,
                        &github_profile("octocat").with_email("cat@x.com"),
                    )
                    .await
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }

        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 1, "same email must resolve to one principal");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_register_local_and_authenticate() {
        let (resolver, _) = resolver();
        let registered = resolver
            .register_local("alice", "alice@x.com", "pw-longer-than-this")
            .await
            .unwrap();

        assert!(registered.is_local());
        assert!(registered.password_hash.is_some());

        let authenticated = resolver
            .authenticate_local("alice", "pw-longer-than-this")
            .await
            .unwrap();
        assert_eq!(authenticated.id, registered.id);

        // Email works in the username slot too.
        let via_email = resolver
            .authenticate_local("alice@x.com", "pw-longer-than-this")
            .await
            .unwrap();
        assert_eq!(via_email.id, registered.id);
    }

    #[tokio::test]
    async fn test_register_duplicates_are_idempotent_conflicts() {
        let (resolver, store) = resolver();
        resolver
            .register_local("alice", "alice@x.com", "pw")
            .await
            .unwrap();

        let err = resolver
            .register_local("alice", "fresh@x.com", "pw")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::RegistrationConflict {
                field: ConflictField::Username
            }
        ));

        let err = resolver
            .register_local("fresh", "alice@x.com", "pw")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::RegistrationConflict {
                field: ConflictField::Email
            }
        ));

        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_register_validation() {
        let (resolver, _) = resolver();

        for (username, email, password) in [
            ("", "a@x.com", "pw"),
            ("alice", "not-an-email", "pw"),
            ("alice", "a@nodot", "pw"),
            ("alice", "a@x.com", "   "),
        ] {
            let err = resolver
                .register_local(username, email, password)
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::Validation { .. }));
        }
    }

    #[tokio::test]
    async fn test_authenticate_failures_collapse() {
        let (resolver, store) = resolver();
        resolver
            .register_local("alice", "alice@x.com", "correct-password")
            .await
            .unwrap();
        store
            .create(&Principal::new(
                "octocat",
                "octocat@users.noreply.github.com",
                AuthProvider::Github,
            ))
            .await
            .unwrap();

        // Wrong password, unknown user, and federated (no hash) account
        // are indistinguishable to the caller.
        for (user, pw) in [
            ("alice", "wrong"),
            ("nobody", "whatever"),
            ("octocat", "whatever"),
        ] {
            let err = resolver.authenticate_local(user, pw).await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }
    }
}
