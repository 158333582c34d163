//! Sequence command implementation.

use super::CommandResult;
use digireg_service::RegistryService;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SequenceReport<'a> {
    name: &'a str,
    value: Option<i64>,
}

/// Prints the identifier sequence counter.
pub fn run(service: &RegistryService, format: &str) -> CommandResult {
    let registry = service.registry();
    let report = SequenceReport {
        name: &registry.config().identifier_sequence,
        value: registry.sequence_value()?,
    };
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => match report.value {
            Some(value) => println!("{}: {}", report.name, value),
            None => println!("{}: not initialized", report.name),
        },
    }
    Ok(())
}
