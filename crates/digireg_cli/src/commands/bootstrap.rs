//! Bootstrap command implementation.

use super::{CommandResult, open, CliConfig};
use digireg_core::schema;
use digireg_storage::{ConnectionSource, SqliteSource, SqliteSourceConfig};

/// Runs the bootstrap command.
///
/// With `install`, creates the database file and any missing tables first.
pub fn run(config: &CliConfig, storage: SqliteSourceConfig, install: bool) -> CommandResult {
    let storage = if install {
        let storage = storage.create_if_missing(true);
        let conn = SqliteSource::new(storage.clone())?.connect()?;
        schema::install(&conn)?;
        println!("Schema installed at {}", storage.path.display());
        storage
    } else {
        storage
    };

    let service = open(config, storage)?;
    service.start()?;
    match service.registry().sequence_value()? {
        Some(value) => println!("Identifier sequence ready at {value}"),
        None => println!("Identifier sequence missing"),
    }
    Ok(())
}
