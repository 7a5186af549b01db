//! First-run setup: account, templates, toggles.

use reeltube_core::{has_placeholder, CoreError, Settings, Toggle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Account,
    Templates,
    Toggles,
}

impl WizardStep {
    pub fn number(&self) -> usize {
        match self {
            WizardStep::Account => 1,
            WizardStep::Templates => 2,
            WizardStep::Toggles => 3,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            WizardStep::Account => "Instagram Account",
            WizardStep::Templates => "YouTube Templates",
            WizardStep::Toggles => "Preferences",
        }
    }

    fn next(self) -> Option<Self> {
        match self {
            WizardStep::Account => Some(WizardStep::Templates),
            WizardStep::Templates => Some(WizardStep::Toggles),
            WizardStep::Toggles => None,
        }
    }

    fn previous(self) -> Option<Self> {
        match self {
            WizardStep::Account => None,
            WizardStep::Templates => Some(WizardStep::Account),
            WizardStep::Toggles => Some(WizardStep::Templates),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WizardOutcome {
    Advanced(WizardStep),
    Completed(Settings),
}

/// Strips surrounding whitespace and one leading `@`.
pub fn normalize_account(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_prefix('@').unwrap_or(trimmed).trim().to_string()
}

#[derive(Debug, Clone)]
pub struct SetupWizard {
    step: WizardStep,
    draft: Settings,
    error: Option<String>,
}

impl SetupWizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::Account,
            draft: Settings::default(),
            error: None,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn draft(&self) -> &Settings {
        &self.draft
    }

    /// Validation message for the current step, if the last `next` failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Templates that will never show the caption, for the hint on step 2.
    pub fn templates_without_caption(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !has_placeholder(&self.draft.title_template) {
            missing.push("title");
        }
        if !has_placeholder(&self.draft.description_template) {
            missing.push("description");
        }
        missing
    }

    pub fn set_account(&mut self, raw: impl Into<String>) {
        self.draft.monitored_account = raw.into();
        self.error = None;
    }

    pub fn set_title_template(&mut self, template: impl Into<String>) {
        self.draft.title_template = template.into();
    }

    pub fn set_description_template(&mut self, template: impl Into<String>) {
        self.draft.description_template = template.into();
    }

    pub fn set_toggle(&mut self, toggle: Toggle, enabled: bool) {
        self.draft = std::mem::take(&mut self.draft).with_toggle(toggle, enabled);
    }

    /// Validates the current step and moves forward. Leaving the last step
    /// yields the finished record.
    pub fn next(&mut self) -> Result<WizardOutcome, CoreError> {
        if self.step == WizardStep::Account {
            let account = normalize_account(&self.draft.monitored_account);
            if account.is_empty() {
                let message = "Please enter an Instagram username";
                self.error = Some(message.to_string());
                return Err(CoreError::validation("monitoredAccount", message));
            }
            self.draft.monitored_account = account;
        }

        self.error = None;
        match self.step.next() {
            Some(step) => {
                self.step = step;
                Ok(WizardOutcome::Advanced(step))
            }
            None => Ok(WizardOutcome::Completed(self.draft.clone())),
        }
    }

    /// Returns `false` on the first step.
    pub fn back(&mut self) -> bool {
        match self.step.previous() {
            Some(step) => {
                self.step = step;
                self.error = None;
                true
            }
            None => false,
        }
    }
}

impl Default for SetupWizard {
    fn default() -> Self {
        Self::new()
    }
}
