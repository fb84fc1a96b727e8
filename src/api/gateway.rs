use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{ApiError, MembershipApi};
use crate::models::{
    AuthResponse, Client, LoginRequest, MemberPlan, NewUser, PlanAssignment, RegisterRequest,
};
use crate::session::{Session, SessionStore};

const LIST_CLIENTS: &str = "/api/plan/all";
const ASSIGN_PLAN: &str = "/api/plan/assign";
const CREATE_USER: &str = "/api/plan/create-user";
const DELETE_USER: &str = "/api/plan/delete-user";
const MY_PLAN: &str = "/api/plan/myplan";
const LOGIN: &str = "/api/auth/login";
const REGISTER: &str = "/api/auth/register";

/// Body the backend sends back from mutations.
#[derive(Debug, Deserialize)]
struct MutationResponse {
    #[serde(default)]
    error: Value,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the membership backend.
///
/// Every call except login/register needs the bearer token held by the
/// session store. A 401 from the backend ends the session.
pub struct Gateway {
    base_url: String,
    http: reqwest::Client,
    session: RwLock<SessionStore>,
}

impl Gateway {
    pub fn new(base_url: impl Into<String>, session: SessionStore) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
            session: RwLock::new(session),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn session(&self) -> Session {
        self.session.read().await.session().clone()
    }

    pub async fn logout(&self) {
        if let Err(e) = self.session.write().await.clear() {
            warn!(error = %e, "failed to remove saved session");
        }
    }

    /// Sign in and keep the returned token for later calls.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = LoginRequest { email, password };
        self.authenticate(LOGIN, &body, "Login failed").await
    }

    /// Create a member account for oneself; signs in on success.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ApiError> {
        if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(ApiError::Validation(
                "name, email and password are required".to_string(),
            ));
        }
        let body = RegisterRequest {
            name,
            email,
            password,
        };
        self.authenticate(REGISTER, &body, "Registration failed").await
    }

    async fn authenticate<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> Result<AuthResponse, ApiError> {
        let url = self.url(path);
        debug!(%url, "authenticating");

        let response = self.http.post(&url).json(body).send().await?;
        if !response.status().is_success() {
            return Err(error_from(response, fallback).await);
        }

        let text = response.text().await?;
        let auth: AuthResponse =
            serde_json::from_str(&text).map_err(|e| ApiError::Format(e.to_string()))?;

        if let Err(e) = self.session.write().await.set(auth.token.clone(), auth.role) {
            warn!(error = %e, "signed in but could not save the session");
        }
        info!(email = %auth.email, role = %auth.role, "signed in");

        Ok(auth)
    }

    /// The signed-in member's own plan; `None` when no plan is assigned.
    ///
    /// A "no plan" body (`{}` or `{"plan": null}`) wins over the status
    /// code, and so does a 404.
    pub async fn my_plan(&self) -> Result<Option<MemberPlan>, ApiError> {
        let token = self.bearer().await?;
        let url = self.url(MY_PLAN);
        debug!(%url, "fetching own plan");

        let response = self.http.get(&url).bearer_auth(token).send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(self.reject_session(&response).await);
        }

        let text = response.text().await?;
        let body = serde_json::from_str::<Value>(&text).ok();
        if status == StatusCode::NOT_FOUND || body.as_ref().is_some_and(is_no_plan) {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(http_error(status, body.as_ref(), "Failed to fetch plan"));
        }

        let plan = match body {
            Some(Value::Object(mut map)) if map.contains_key("plan") => {
                map.remove("plan").unwrap_or_default()
            }
            Some(other) => other,
            None => return Err(ApiError::Format("plan response is not JSON".to_string())),
        };

        serde_json::from_value(plan)
            .map(Some)
            .map_err(|e| ApiError::Format(e.to_string()))
    }

    async fn bearer(&self) -> Result<String, ApiError> {
        self.session
            .read()
            .await
            .token()
            .map(str::to_string)
            .ok_or(ApiError::Auth)
    }

    /// Turn a non-2xx response into an error. A 401 also ends the session.
    async fn check(&self, response: Response, fallback: &str) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(self.reject_session(&response).await);
        }
        Err(error_from(response, fallback).await)
    }

    async fn reject_session(&self, response: &Response) -> ApiError {
        warn!(url = %response.url(), "backend rejected the session token");
        self.logout().await;
        ApiError::Auth
    }
}

/// Build an `Http` error, preferring the message the server sent.
async fn error_from(response: Response, fallback: &str) -> ApiError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<Value>(&text).ok();
    http_error(status, body.as_ref(), fallback)
}

fn http_error(status: StatusCode, body: Option<&Value>, fallback: &str) -> ApiError {
    let message = body
        .and_then(server_message)
        .unwrap_or_else(|| format!("{fallback} (HTTP error! status: {})", status.as_u16()));

    warn!(status = status.as_u16(), %message, "request failed");
    ApiError::Http {
        status: status.as_u16(),
        message,
    }
}

/// `{}`, `null` or `{"plan": null}`.
fn is_no_plan(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::Object(map) => map.is_empty() || map.get("plan").is_some_and(Value::is_null),
        _ => false,
    }
}

fn server_message(body: &Value) -> Option<String> {
    body.get("message")
        .or_else(|| body.get("error"))
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[async_trait]
impl MembershipApi for Gateway {
    async fn list_clients(&self) -> Result<Vec<Client>, ApiError> {
        let token = self.bearer().await?;
        let url = self.url(LIST_CLIENTS);
        debug!(%url, "listing clients");

        let response = self.http.get(&url).bearer_auth(token).send().await?;
        let response = self.check(response, "Failed to fetch clients").await?;

        let text = response.text().await?;
        let body: Value =
            serde_json::from_str(&text).map_err(|e| ApiError::Format(e.to_string()))?;
        if !body.is_array() {
            return Err(ApiError::Format("Invalid data format received".to_string()));
        }

        let clients: Vec<Client> =
            serde_json::from_value(body).map_err(|e| ApiError::Format(e.to_string()))?;
        info!(count = clients.len(), "roster fetched");
        Ok(clients)
    }

    async fn assign_plan(&self, assignment: &PlanAssignment) -> Result<(), ApiError> {
        let token = self.bearer().await?;
        let url = self.url(ASSIGN_PLAN);
        debug!(%url, email = %assignment.email, plan = %assignment.plan_name, "assigning plan");

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(assignment)
            .send()
            .await?;
        let response = self.check(response, "Plan update failed").await?;
        let status = response.status().as_u16();

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(());
        }
        let body: MutationResponse =
            serde_json::from_str(&text).map_err(|e| ApiError::Format(e.to_string()))?;
        if truthy(&body.error) {
            let message = body
                .message
                .or_else(|| body.error.as_str().map(str::to_string))
                .unwrap_or_else(|| "Plan update failed".to_string());
            return Err(ApiError::Http { status, message });
        }

        info!(email = %assignment.email, expiry = %assignment.expiry_date, "plan assigned");
        Ok(())
    }

    async fn create_user(&self, user: &NewUser) -> Result<(), ApiError> {
        let missing = user.missing_fields();
        if !missing.is_empty() {
            return Err(ApiError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        let token = self.bearer().await?;
        let url = self.url(CREATE_USER);
        debug!(%url, email = %user.email, "creating user");

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(user)
            .send()
            .await?;
        self.check(response, "Failed to create user").await?;

        info!(email = %user.email, "user created");
        Ok(())
    }

    async fn delete_user(&self, email: &str) -> Result<(), ApiError> {
        if email.trim().is_empty() {
            return Err(ApiError::Validation("email is required".to_string()));
        }

        let token = self.bearer().await?;
        let url = self.url(DELETE_USER);
        debug!(%url, email, "deleting user");

        let response = self
            .http
            .delete(&url)
            .bearer_auth(token)
            .json(&json!({ "email": email }))
            .send()
            .await?;
        self.check(response, "Failed to delete user").await?;

        info!(email, "user deleted");
        Ok(())
    }
}
