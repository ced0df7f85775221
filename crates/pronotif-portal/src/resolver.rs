//! Authentication variant (CAS) resolution.
//!
//! Portal instances delegate login to different backends. The resolver asks
//! the protocol client which variants a URL may use and, when several are
//! advertised, probes them all concurrently with the account's credentials.
//! Results are memoized per URL for the lifetime of the resolver.

use dashmap::DashMap;
use futures::StreamExt;
use futures::stream::FuturesUnordered;

use pronotif_entity::account::AuthVariant;

use crate::client::{CandidateVariants, PortalCredentials};
use crate::gateway::{AuthError, AuthErrorKind, SessionGateway, SessionGuard};

/// Outcome of a resolution.
#[derive(Debug)]
pub struct Resolution {
    /// Resolved variant (possibly the direct-login sentinel).
    pub variant: AuthVariant,
    /// Session opened while probing, so the caller can skip a second login.
    pub session: Option<SessionGuard>,
}

impl Resolution {
    fn cached(variant: AuthVariant) -> Self {
        Self {
            variant,
            session: None,
        }
    }
}

/// Resolves and caches the authentication variant of each portal URL.
#[derive(Debug)]
pub struct CasResolver {
    gateway: SessionGateway,
    cache: DashMap<String, AuthVariant>,
}

impl CasResolver {
    /// Creates a resolver with an empty cache.
    pub fn new(gateway: SessionGateway) -> Self {
        Self {
            gateway,
            cache: DashMap::new(),
        }
    }

    /// Returns the gateway used for probing.
    pub fn gateway(&self) -> &SessionGateway {
        &self.gateway
    }

    /// Returns the cached variant of a URL.
    pub fn cached(&self, url: &str) -> Option<AuthVariant> {
        self.cache.get(url).map(|v| v.value().clone())
    }

    /// Number of URLs with a cached variant.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Resolves the variant for an account's portal.
    ///
    /// Cached URLs return immediately without a session. When several
    /// candidates are probed and none succeeds, the whole set is probed once
    /// more before the failure is returned; nothing is cached in that case.
    pub async fn resolve(&self, credentials: &PortalCredentials) -> Result<Resolution, AuthError> {
        if let Some(variant) = self.cached(&credentials.url) {
            return Ok(Resolution::cached(variant));
        }

        let candidates = match self.gateway.client().auth_variants(&credentials.url).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(
                    url = %credentials.url,
                    error = %e,
                    "Auth variant discovery failed, assuming direct login"
                );
                CandidateVariants::None
            }
        };

        let resolution = match candidates {
            CandidateVariants::None => Resolution::cached(AuthVariant::none()),
            CandidateVariants::Single(variant) => Resolution::cached(variant),
            CandidateVariants::Multiple(variants) => {
                match self.probe(credentials, &variants).await {
                    Ok(resolution) => resolution,
                    Err(first) => {
                        tracing::info!(
                            url = %credentials.url,
                            error = %first,
                            "No auth variant accepted, probing once more"
                        );
                        self.probe(credentials, &variants).await?
                    }
                }
            }
        };

        tracing::info!(
            url = %credentials.url,
            variant = %resolution.variant,
            "Auth variant resolved"
        );
        self.cache
            .insert(credentials.url.clone(), resolution.variant.clone());
        Ok(resolution)
    }

    /// Logs in with every candidate concurrently.
    ///
    /// The lowest-index candidate that succeeds wins. The probe returns as soon
    /// as that candidate is known, dropping the attempts still in flight and
    /// closing any other session that did open.
    async fn probe(
        &self,
        credentials: &PortalCredentials,
        variants: &[AuthVariant],
    ) -> Result<Resolution, AuthError> {
        let mut pending: FuturesUnordered<_> = variants
            .iter()
            .enumerate()
            .map(|(index, variant)| async move {
                (index, self.gateway.login(credentials, variant).await)
            })
            .collect();

        let mut outcomes: Vec<Option<Result<SessionGuard, AuthError>>> =
            variants.iter().map(|_| None).collect();

        while let Some((index, outcome)) = pending.next().await {
            if let Err(e) = &outcome {
                tracing::debug!(
                    url = %credentials.url,
                    variant = %variants[index],
                    error = %e,
                    "Auth variant candidate rejected"
                );
            }
            outcomes[index] = Some(outcome);
            if let Some(winner) = settled_winner(&outcomes) {
                // Attempts still in `pending` are cancelled when it drops.
                return Ok(take_winner(outcomes, winner, variants));
            }
        }

        Err(exhausted(outcomes))
    }
}

/// Index of the winning candidate, once every lower-index attempt has failed.
fn settled_winner(outcomes: &[Option<Result<SessionGuard, AuthError>>]) -> Option<usize> {
    for (index, outcome) in outcomes.iter().enumerate() {
        match outcome {
            None => return None,
            Some(Ok(_)) => return Some(index),
            Some(Err(_)) => {}
        }
    }
    None
}

fn take_winner(
    outcomes: Vec<Option<Result<SessionGuard, AuthError>>>,
    winner: usize,
    variants: &[AuthVariant],
) -> Resolution {
    let mut session = None;
    for (index, outcome) in outcomes.into_iter().enumerate() {
        if let Some(Ok(guard)) = outcome {
            if index == winner {
                session = Some(guard);
            } else {
                // Dropping the guard logs the extra session out.
                drop(guard);
            }
        }
    }
    Resolution {
        variant: variants[winner].clone(),
        session,
    }
}

/// Picks the error to surface when no candidate succeeded.
fn exhausted(outcomes: Vec<Option<Result<SessionGuard, AuthError>>>) -> AuthError {
    let errors: Vec<AuthError> = outcomes
        .into_iter()
        .filter_map(|o| o.and_then(Result::err))
        .collect();
    errors
        .iter()
        .find(|e| e.is_wrong_credentials())
        .cloned()
        .or_else(|| errors.into_iter().next())
        .unwrap_or_else(|| AuthError::new(AuthErrorKind::Unknown, "no auth variant candidates"))
}
