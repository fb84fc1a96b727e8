//! Admin dashboard state: the roster load cycle and the modal workflows
//! (assign plan, add user, delete user).
//!
//! Only one modal exists at a time. Each one moves
//! `Open -> Submitting -> Closed` on success, or back to `Open` with the
//! error shown and the form untouched on failure. Submission is split into
//! [`AdminDashboard::begin_submit`] and [`AdminDashboard::complete`] so the
//! screen can render the submitting state while the request is in flight.

use std::mem;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::api::{ApiError, MembershipApi};
use crate::expiry::{compute_expiry, parse_date};
use crate::models::{Client, NewUser, PlanAssignment, PlanName};
use crate::roster::RosterView;

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

/// Form behind the assign/modify plan modal.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanForm {
    pub email: String,
    pub client_name: String,
    /// Whether the client already had a plan when the modal was opened.
    pub modifying: bool,
    pub plan_name: PlanName,
    pub start_date: NaiveDate,
}

impl PlanForm {
    /// Seed from the client's current plan, or Monthly starting `today`.
    pub fn for_client(client: &Client, today: NaiveDate) -> Self {
        let start_date = match client.start_date.as_deref() {
            Some(raw) => parse_date(raw).unwrap_or_else(|e| {
                warn!(email = %client.email, error = %e, "stored start date unusable, using today");
                today
            }),
            None => today,
        };

        Self {
            email: client.email.clone(),
            client_name: client.name.clone(),
            modifying: client.plan_name.is_some(),
            plan_name: client.plan_name.unwrap_or(PlanName::Monthly),
            start_date,
        }
    }

    pub fn expiry_date(&self) -> NaiveDate {
        compute_expiry(self.start_date, self.plan_name)
    }

    pub fn to_assignment(&self) -> PlanAssignment {
        PlanAssignment {
            email: self.email.clone(),
            plan_name: self.plan_name,
            start_date: self.start_date,
            expiry_date: self.expiry_date(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteTarget {
    pub email: String,
    pub name: String,
}

/// Lifecycle of one modal's form.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage<F> {
    Open { form: F, error: Option<String> },
    Submitting { form: F },
}

impl<F> Stage<F> {
    fn open(form: F) -> Self {
        Stage::Open { form, error: None }
    }

    pub fn form(&self) -> &F {
        match self {
            Stage::Open { form, .. } | Stage::Submitting { form } => form,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Stage::Open { error, .. } => error.as_deref(),
            Stage::Submitting { .. } => None,
        }
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self, Stage::Submitting { .. })
    }

    /// Form access while editing; `None` once submitted.
    fn editable(&mut self) -> Option<&mut F> {
        match self {
            Stage::Open { form, error } => {
                *error = None;
                Some(form)
            }
            Stage::Submitting { .. } => None,
        }
    }

    fn submit(self) -> Result<(F, Self), Self>
    where
        F: Clone,
    {
        match self {
            Stage::Open { form, .. } => Ok((form.clone(), Stage::Submitting { form })),
            submitting => Err(submitting),
        }
    }

    fn reopen_with(self, message: String) -> Self {
        match self {
            Stage::Open { form, .. } | Stage::Submitting { form } => Stage::Open {
                form,
                error: Some(message),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Modal {
    #[default]
    Closed,
    AssignPlan(Stage<PlanForm>),
    AddUser(Stage<NewUser>),
    /// `Open` is the confirmation prompt.
    DeleteUser(Stage<DeleteTarget>),
}

impl Modal {
    pub fn is_open(&self) -> bool {
        !matches!(self, Modal::Closed)
    }

    pub fn is_submitting(&self) -> bool {
        match self {
            Modal::Closed => false,
            Modal::AssignPlan(stage) => stage.is_submitting(),
            Modal::AddUser(stage) => stage.is_submitting(),
            Modal::DeleteUser(stage) => stage.is_submitting(),
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Modal::Closed => None,
            Modal::AssignPlan(stage) => stage.error(),
            Modal::AddUser(stage) => stage.error(),
            Modal::DeleteUser(stage) => stage.error(),
        }
    }
}

/// A request produced by a submitted modal, waiting to be sent.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingRequest {
    AssignPlan(PlanAssignment),
    CreateUser(NewUser),
    DeleteUser { email: String },
}

impl PendingRequest {
    pub async fn send(&self, api: &dyn MembershipApi) -> Result<(), ApiError> {
        match self {
            PendingRequest::AssignPlan(assignment) => api.assign_plan(assignment).await,
            PendingRequest::CreateUser(user) => api.create_user(user).await,
            PendingRequest::DeleteUser { email } => api.delete_user(email).await,
        }
    }
}

/// What the caller should do after a request finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The modal closed; the roster is stale and must be refetched.
    Refetch,
    /// The modal stayed open with the error shown.
    Retained,
    /// The backend rejected the session; sign in again.
    SignedOut,
}

pub struct AdminDashboard {
    roster: RosterView,
    load: LoadState,
    modal: Modal,
}

impl Default for AdminDashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl AdminDashboard {
    pub fn new() -> Self {
        Self {
            roster: RosterView::default(),
            load: LoadState::Loading,
            modal: Modal::Closed,
        }
    }

    pub fn roster(&self) -> &RosterView {
        &self.roster
    }

    pub fn roster_mut(&mut self) -> &mut RosterView {
        &mut self.roster
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    /// Show the loading state ahead of a `refresh`.
    pub fn mark_loading(&mut self) {
        self.load = LoadState::Loading;
    }

    /// Fetch the roster and replace the local copy. Also the Retry action.
    pub async fn refresh(&mut self, api: &dyn MembershipApi) -> Result<(), ApiError> {
        self.load = LoadState::Loading;
        match api.list_clients().await {
            Ok(clients) => {
                self.roster.replace(clients);
                self.load = LoadState::Ready;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch clients");
                self.load = LoadState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    pub fn open_assign_plan(&mut self, email: &str, today: NaiveDate) -> bool {
        let Some(client) = self.roster.find(email) else {
            return false;
        };
        let form = PlanForm::for_client(client, today);
        debug!(email, plan = %form.plan_name, "opening plan modal");
        self.replace_modal(Modal::AssignPlan(Stage::open(form)))
    }

    pub fn open_add_user(&mut self) -> bool {
        self.replace_modal(Modal::AddUser(Stage::open(NewUser::default())))
    }

    pub fn open_delete_user(&mut self, email: &str) -> bool {
        let Some(client) = self.roster.find(email) else {
            return false;
        };
        let target = DeleteTarget {
            email: client.email.clone(),
            name: client.name.clone(),
        };
        self.replace_modal(Modal::DeleteUser(Stage::open(target)))
    }

    /// Last opened wins; a modal with a request in flight is never replaced.
    fn replace_modal(&mut self, modal: Modal) -> bool {
        if self.modal.is_submitting() {
            return false;
        }
        self.modal = modal;
        true
    }

    pub fn plan_form_mut(&mut self) -> Option<&mut PlanForm> {
        match &mut self.modal {
            Modal::AssignPlan(stage) => stage.editable(),
            _ => None,
        }
    }

    pub fn new_user_form_mut(&mut self) -> Option<&mut NewUser> {
        match &mut self.modal {
            Modal::AddUser(stage) => stage.editable(),
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        if !self.modal.is_submitting() {
            self.modal = Modal::Closed;
        }
    }

    /// Move the open modal to `Submitting` and hand back the request to send.
    /// For deletes this is the confirmation.
    pub fn begin_submit(&mut self) -> Option<PendingRequest> {
        let (modal, request) = match mem::take(&mut self.modal) {
            Modal::AssignPlan(stage) => match stage.submit() {
                Ok((form, stage)) => (
                    Modal::AssignPlan(stage),
                    Some(PendingRequest::AssignPlan(form.to_assignment())),
                ),
                Err(stage) => (Modal::AssignPlan(stage), None),
            },
            Modal::AddUser(stage) => match stage.submit() {
                Ok((user, stage)) => (
                    Modal::AddUser(stage),
                    Some(PendingRequest::CreateUser(user)),
                ),
                Err(stage) => (Modal::AddUser(stage), None),
            },
            Modal::DeleteUser(stage) => match stage.submit() {
                Ok((target, stage)) => (
                    Modal::DeleteUser(stage),
                    Some(PendingRequest::DeleteUser {
                        email: target.email,
                    }),
                ),
                Err(stage) => (Modal::DeleteUser(stage), None),
            },
            Modal::Closed => (Modal::Closed, None),
        };
        self.modal = modal;
        request
    }

    /// Apply the result of the request handed out by `begin_submit`.
    pub fn complete(&mut self, result: Result<(), ApiError>) -> Outcome {
        match result {
            Ok(()) => {
                info!("modal request succeeded");
                self.modal = Modal::Closed;
                Outcome::Refetch
            }
            Err(e) => {
                warn!(error = %e, "modal request failed");
                let signed_out = e.is_auth();
                let message = e.to_string();
                self.modal = match mem::take(&mut self.modal) {
                    Modal::AssignPlan(stage) => Modal::AssignPlan(stage.reopen_with(message)),
                    Modal::AddUser(stage) => Modal::AddUser(stage.reopen_with(message)),
                    Modal::DeleteUser(stage) => Modal::DeleteUser(stage.reopen_with(message)),
                    Modal::Closed => Modal::Closed,
                };
                if signed_out {
                    Outcome::SignedOut
                } else {
                    Outcome::Retained
                }
            }
        }
    }
}
