use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::FlowdbgConfig;

/// JSON schema for `flowdbg.toml`.
///
/// Intended for editor tooling and CI validation of deployed configuration files.
#[must_use]
pub fn json_schema() -> RootSchema {
    schema_for!(FlowdbgConfig)
}
