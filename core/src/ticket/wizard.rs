use tracing::{debug, info};

use crate::error::ApiError;
use crate::models::{Priority, SupportTicket};
use crate::store::TicketStore;
use crate::transport::{FilePart, MultipartForm, Transport};
use crate::validation::{check_attachment_size, require, Field, FieldErrors, ValidationError};

const PRIORITY_CHOICES: &str = "low, medium, high, critical";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WizardStep {
    IssueDetails,
    Description,
    Review,
    Submitted,
}

impl WizardStep {
    /// Steps shown in the step indicator.
    pub const FORM_STEPS: [WizardStep; 3] = [
        WizardStep::IssueDetails,
        WizardStep::Description,
        WizardStep::Review,
    ];

    pub fn index(&self) -> usize {
        match self {
            WizardStep::IssueDetails => 0,
            WizardStep::Description => 1,
            WizardStep::Review => 2,
            WizardStep::Submitted => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(WizardStep::IssueDetails),
            1 => Some(WizardStep::Description),
            2 => Some(WizardStep::Review),
            3 => Some(WizardStep::Submitted),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WizardStep::IssueDetails => "Issue details",
            WizardStep::Description => "Description",
            WizardStep::Review => "Review",
            WizardStep::Submitted => "Submitted",
        }
    }

    fn next(&self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    fn previous(&self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }
}

/// In-progress ticket form. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketDraft {
    pub issue_category: String,
    pub issue_title: String,
    pub priority: String,
    pub description: String,
    pub steps_to_reproduce: String,
    pub attachment: Option<FilePart>,
}

impl TicketDraft {
    /// Errors for the fields that belong to `step` only.
    pub fn validate_step(&self, step: WizardStep) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match step {
            WizardStep::IssueDetails => {
                require(&mut errors, Field::IssueCategory, &self.issue_category);
                require(&mut errors, Field::IssueTitle, &self.issue_title);
                require(&mut errors, Field::Priority, &self.priority);
                if !errors.contains(Field::Priority) && self.priority.parse::<Priority>().is_err() {
                    errors.insert(
                        Field::Priority,
                        ValidationError::Invalid {
                            field: Field::Priority,
                            expected: PRIORITY_CHOICES,
                        },
                    );
                }
            }
            WizardStep::Description => {
                require(&mut errors, Field::Description, &self.description);
            }
            WizardStep::Review | WizardStep::Submitted => {}
        }
        errors
    }

    /// Validates every step in order and builds the submission, or names the
    /// first failing step and its errors.
    pub fn submission(&self) -> Result<TicketSubmission, (WizardStep, FieldErrors)> {
        for step in [WizardStep::IssueDetails, WizardStep::Description] {
            let errors = self.validate_step(step);
            if !errors.is_empty() {
                return Err((step, errors));
            }
        }
        let priority = self.priority.parse::<Priority>().map_err(|_| {
            let mut errors = FieldErrors::new();
            errors.insert(
                Field::Priority,
                ValidationError::Invalid {
                    field: Field::Priority,
                    expected: PRIORITY_CHOICES,
                },
            );
            (WizardStep::IssueDetails, errors)
        })?;
        let steps = self.steps_to_reproduce.trim();
        Ok(TicketSubmission {
            issue_category: self.issue_category.trim().to_string(),
            issue_title: self.issue_title.trim().to_string(),
            description: self.description.trim().to_string(),
            steps_to_reproduce: (!steps.is_empty()).then(|| steps.to_string()),
            priority,
            attachment: self.attachment.clone(),
        })
    }
}

/// A draft that passed every step's validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketSubmission {
    pub issue_category: String,
    pub issue_title: String,
    pub description: String,
    pub steps_to_reproduce: Option<String>,
    pub priority: Priority,
    pub attachment: Option<FilePart>,
}

impl TicketSubmission {
    pub fn to_form(&self) -> MultipartForm {
        MultipartForm::new()
            .text(Field::IssueCategory.as_str(), self.issue_category.as_str())
            .text(Field::IssueTitle.as_str(), self.issue_title.as_str())
            .text(Field::Description.as_str(), self.description.as_str())
            .text(
                "stepsToReproduce",
                self.steps_to_reproduce.clone().unwrap_or_default(),
            )
            .text(Field::Priority.as_str(), self.priority.as_str())
            .maybe_file(Field::Attachment.as_str(), self.attachment.clone())
    }
}

/// Multi-step ticket form: details, description, review, submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketWizard {
    step: WizardStep,
    draft: TicketDraft,
    errors: FieldErrors,
    submitting: bool,
    ticket_number: Option<String>,
    max_attachment_bytes: usize,
}

impl TicketWizard {
    pub fn new(max_attachment_bytes: usize) -> Self {
        Self {
            step: WizardStep::IssueDetails,
            draft: TicketDraft::default(),
            errors: FieldErrors::new(),
            submitting: false,
            ticket_number: None,
            max_attachment_bytes,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn draft(&self) -> &TicketDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut TicketDraft {
        &mut self.draft
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn ticket_number(&self) -> Option<&str> {
        self.ticket_number.as_deref()
    }

    /// Rejects files over the limit and keeps whatever was attached before.
    pub fn set_attachment(&mut self, file: FilePart) -> Result<(), ValidationError> {
        if let Err(err) = check_attachment_size(file.size(), self.max_attachment_bytes) {
            self.errors.insert(Field::Attachment, err.clone());
            return Err(err);
        }
        self.errors.remove(Field::Attachment);
        self.draft.attachment = Some(file);
        Ok(())
    }

    pub fn clear_attachment(&mut self) {
        self.draft.attachment = None;
        self.errors.remove(Field::Attachment);
    }

    /// Moves forward if the current step's fields are valid.
    pub fn next(&mut self) -> bool {
        if self.step >= WizardStep::Review {
            return false;
        }
        let errors = self.draft.validate_step(self.step);
        if !errors.is_empty() {
            debug!(step = ?self.step, errors = errors.len(), "step validation failed");
            self.errors = errors;
            return false;
        }
        self.errors.clear();
        if let Some(next) = self.step.next() {
            self.step = next;
        }
        true
    }

    /// Always allowed; earlier steps are not re-validated.
    pub fn back(&mut self) -> bool {
        self.errors.clear();
        if self.step == WizardStep::Submitted {
            return false;
        }
        match self.step.previous() {
            Some(previous) => {
                self.step = previous;
                true
            }
            None => false,
        }
    }

    /// Step-indicator navigation: any earlier step, or exactly the next one
    /// (which validates like [`next`](Self::next)).
    pub fn jump_to(&mut self, target: WizardStep) -> bool {
        if self.step == WizardStep::Submitted || target == WizardStep::Submitted {
            return false;
        }
        if target < self.step {
            self.errors.clear();
            self.step = target;
            return true;
        }
        if target.index() == self.step.index() + 1 {
            return self.next();
        }
        false
    }

    /// Only allowed from the review step. Re-validates every step; on
    /// failure the wizard moves to the first failing step and nothing
    /// should be sent.
    pub fn begin_submit(&mut self) -> Option<TicketSubmission> {
        if self.submitting || self.step != WizardStep::Review {
            debug!(step = ?self.step, "submit ignored outside the review step");
            return None;
        }
        match self.draft.submission() {
            Ok(submission) => {
                self.errors.clear();
                self.submitting = true;
                Some(submission)
            }
            Err((step, errors)) => {
                debug!(?step, "submission blocked by validation");
                self.step = step;
                self.errors = errors;
                None
            }
        }
    }

    pub fn finish(&mut self, ticket_number: impl Into<String>) {
        let ticket_number = ticket_number.into();
        info!(%ticket_number, "ticket wizard completed");
        self.draft = TicketDraft::default();
        self.errors.clear();
        self.submitting = false;
        self.step = WizardStep::Submitted;
        self.ticket_number = Some(ticket_number);
    }

    /// Leaves the draft intact so the user can retry.
    pub fn fail_submit(&mut self) {
        self.submitting = false;
    }

    /// Validate, send and finish in one go. `Ok(None)` means validation
    /// stopped the submission before any request was made.
    pub async fn submit<T: Transport>(
        &mut self,
        store: &TicketStore<T>,
    ) -> Result<Option<SupportTicket>, ApiError> {
        let Some(submission) = self.begin_submit() else {
            return Ok(None);
        };
        match store.submit_ticket(&submission).await {
            Ok(ticket) => {
                self.finish(ticket.ticket_number.clone());
                Ok(Some(ticket))
            }
            Err(err) => {
                self.fail_submit();
                Err(err)
            }
        }
    }
}
