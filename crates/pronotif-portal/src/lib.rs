//! # pronotif-portal
//!
//! Access to school portals: the protocol client interfaces, the HTTP bridge
//! client, the [`SessionGateway`] with its failure taxonomy, and the
//! [`CasResolver`] that discovers each portal's authentication variant.

pub mod client;
pub mod gateway;
pub mod http;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod resolver;

pub use client::{CandidateVariants, PortalClient, PortalCredentials, PortalError, PortalUser};
pub use gateway::{AuthError, AuthErrorKind, SessionGateway, SessionGuard};
pub use http::HttpPortalClient;
pub use resolver::{CasResolver, Resolution};
