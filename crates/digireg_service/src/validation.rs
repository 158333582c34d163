//! Request parameter checks.

use crate::error::{ServiceError, ServiceResult};
use digireg_core::DigitizationState;

/// Collects parameter problems so they can be reported together.
#[derive(Debug, Default)]
pub(crate) struct Violations {
    messages: Vec<String>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn record_id(&mut self, record_id: i64) {
        if record_id < 0 {
            self.push(format!("Illegal 'recordId' parameter value '{record_id}'."));
        }
    }

    /// Checks a state to be written. The result is only writable when no
    /// violation was recorded.
    pub fn new_state(&mut self, state: Option<DigitizationState>) -> DigitizationState {
        match state {
            None => self.push("Missing 'state' parameter."),
            Some(DigitizationState::Undefined) => {
                self.push("Illegal 'state' parameter value 'UNDEFINED'.");
            }
            Some(_) => {}
        }
        state.unwrap_or(DigitizationState::Undefined)
    }

    pub fn non_empty(&mut self, param: &str, value: Option<&str>) {
        match value {
            None => self.push(format!("Missing '{param}' parameter.")),
            Some("") => self.push(format!("'{param}' parameter is empty.")),
            Some(_) => {}
        }
    }

    pub fn list_size(&mut self, param: &str, len: usize, min: usize, max: usize) {
        if len < min {
            self.push(format!("'{param}' parameter requires at least {min} item(s)."));
        }
        if len > max {
            self.push(format!(
                "'{param}' parameter accepts no more than {max} item(s)."
            ));
        }
    }

    /// Fails with all collected messages, one per line.
    pub fn finish(self) -> ServiceResult<()> {
        if self.messages.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::InvalidRequest(self.messages.join("\n")))
        }
    }
}
