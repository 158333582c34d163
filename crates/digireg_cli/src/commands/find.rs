//! Find command implementation.

use super::CommandResult;
use digireg_core::{Record, RecordFilter};
use digireg_service::{RecordFormat, RegistryService};

/// Runs a record search and prints the matches.
pub fn run(
    service: &RegistryService,
    filter: &RecordFilter,
    record_format: RecordFormat,
    limit: Option<i64>,
    format: &str,
) -> CommandResult {
    let records = service.find_records(Some(filter), Some(record_format), limit)?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&records)?),
        _ => print_text_output(&records),
    }
    Ok(())
}

fn print_text_output(records: &[Record]) {
    println!("Found {} record(s)", records.len());
    for record in records {
        println!();
        println!("Record {}", record.id);
        println!("  CCNB:       {}", record.ccnb.as_deref().unwrap_or("-"));
        println!("  Barcode:    {}", record.barcode.as_deref().unwrap_or("-"));
        println!("  State:      {}", record.state);
        match &record.descriptor {
            Some(descriptor) => println!("  Descriptor: {} bytes", descriptor.as_str().len()),
            None => println!("  Descriptor: -"),
        }
    }
}
