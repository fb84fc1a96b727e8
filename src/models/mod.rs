mod auth;
mod client;
mod plan;
mod user;

pub use auth::{AuthResponse, LoginRequest, RegisterRequest, Role};
pub use client::Client;
pub use plan::PlanName;
pub use user::{MemberPlan, NewUser, PlanAssignment};
