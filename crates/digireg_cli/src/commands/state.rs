//! State commands.

use super::CommandResult;
use chrono::NaiveDate;
use digireg_core::{DigitizationState, RecordLocator};
use digireg_service::{Caller, RegistryService};

/// Prints the state of a record.
///
/// Records addressed by id go through the service checks; composite
/// addresses are read from the registry directly.
pub fn show(service: &RegistryService, locator: RecordLocator) -> CommandResult {
    let state = match locator {
        RecordLocator::Id(id) => service.record_state(id)?,
        composite => service.registry().record_state(composite)?,
    };
    match state {
        Some(state) => println!("{state}"),
        None => println!("no such record"),
    }
    Ok(())
}

/// Arguments of a state change.
#[derive(Debug)]
pub struct SetStateArgs {
    /// Record id.
    pub id: i64,
    /// Target state.
    pub new_state: DigitizationState,
    /// State the operator last saw.
    pub old_state: Option<DigitizationState>,
    /// Digitization operator.
    pub user: Option<String>,
    /// Event date.
    pub date: Option<NaiveDate>,
}

/// Applies a state change and reports whether it took effect.
pub fn set(service: &RegistryService, caller: &Caller, args: SetStateArgs) -> CommandResult {
    let updated = service.set_record_state(
        caller,
        args.id,
        Some(args.new_state),
        args.old_state,
        args.user.as_deref(),
        args.date,
    )?;
    if updated {
        println!("Record {} moved to {}", args.id, args.new_state);
    } else {
        println!("Record {} not updated (missing or state changed)", args.id);
    }
    Ok(())
}
