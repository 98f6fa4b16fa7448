//! Profiles Domain
//!
//! User-profile and credential management: e-mail syntax validation, the
//! salted credential codec, and the profile lifecycle (create, update,
//! deactivate, confirm) over an abstract keyed document store.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │   Services   │  ← Lifecycle + authentication, multi-reason reports
//! └──────┬───────┘
//!        │
//! ┌──────▼───────┐
//! │  Repository  │  ← Document store (trait + implementations)
//! └──────┬───────┘
//!        │
//! ┌──────▼───────┐
//! │    Models    │  ← Profile entity, DTOs, filters
//! └──────────────┘
//! ```
//!
//! The e-mail validator and credential codec are dependency-free leaves
//! used by the services and the entity.
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_profiles::{
//!     credential::CredentialParams,
//!     repository::InMemoryProfileRepository,
//!     service::ProfileLifecycleService,
//! };
//!
//! let repository = InMemoryProfileRepository::new();
//! let service = ProfileLifecycleService::new(repository, CredentialParams::default());
//! ```
//!
//! Lifecycle operations return an [`OperationReport`] carrying *every*
//! failure reason that applied, in emission order, rather than the first
//! one encountered.

pub mod auth;
pub mod credential;
pub mod email;
pub mod error;
pub mod models;
pub mod outcome;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use auth::{AuthenticationService, IssuedToken, TokenIssuer};
pub use credential::{CredentialParams, CredentialRecord};
pub use error::{AuthError, CredentialError, StoreError, StoreResult};
pub use models::{
    LogOnInfo, NewProfile, Profile, ProfileChanges, ProfileFilter, ProfileView,
};
pub use outcome::{FailureReason, OperationReport};
pub use repository::{InMemoryProfileRepository, ProfileRepository};
pub use service::ProfileLifecycleService;
