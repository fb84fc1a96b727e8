//! Access to the membership backend.
//!
//! [`MembershipApi`] is the seam the admin workflows are written against;
//! [`Gateway`] is its HTTP implementation.

mod error;
mod gateway;

use async_trait::async_trait;

pub use error::ApiError;
pub use gateway::Gateway;

use crate::models::{Client, NewUser, PlanAssignment};

/// Admin operations on the member directory.
///
/// Only `list_clients` is safe to repeat. Mutations are sent once and never
/// retried behind the caller's back.
#[async_trait]
pub trait MembershipApi: Send + Sync {
    async fn list_clients(&self) -> Result<Vec<Client>, ApiError>;

    async fn assign_plan(&self, assignment: &PlanAssignment) -> Result<(), ApiError>;

    async fn create_user(&self, user: &NewUser) -> Result<(), ApiError>;

    async fn delete_user(&self, email: &str) -> Result<(), ApiError>;
}
