//! URN:NBN commands.

use super::CommandResult;
use chrono::NaiveDate;
use digireg_core::AllocationMode;
use digireg_service::{Caller, RegistryService};

/// Adds or replaces the identifiers of a record.
pub fn run(
    service: &RegistryService,
    caller: &Caller,
    mode: AllocationMode,
    id: i64,
    date: Option<NaiveDate>,
    urns: &[String],
) -> CommandResult {
    let updated = match mode {
        AllocationMode::Add => service.add_identifiers(caller, id, date, Some(urns))?,
        AllocationMode::Set => service.set_identifiers(caller, id, date, Some(urns))?,
    };
    if updated {
        println!("Record {id}: identifiers updated ({})", mode.as_str());
    } else {
        println!("Record {id} not found");
    }
    Ok(())
}
