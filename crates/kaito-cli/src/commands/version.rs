//! Version command implementation.

use std::io::Write;

use crate::cli::VersionArgs;
use crate::error::CliError;
use crate::output::{OutputFormat, VersionInfo};

/// Version command executor.
#[derive(Debug, Clone)]
pub struct VersionCommand {
    short: bool,
}

impl VersionCommand {
    /// Create a new version command.
    #[must_use]
    pub const fn new(args: &VersionArgs) -> Self {
        Self { short: args.short }
    }

    /// Execute the version command.
    ///
    /// # Errors
    ///
    /// Returns an error if output fails.
    pub fn execute<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let info = VersionInfo::current();
        if self.short {
            writeln!(writer, "{}", info.version)?;
            return Ok(());
        }
        OutputFormat::default().write(writer, &info)
    }
}
