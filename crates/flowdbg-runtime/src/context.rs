use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DebugError;

/// Line (or other location marker) inside a resource.
pub type Line = u32;

/// Raw method-entry record as delivered by the instrumentation agent.
///
/// Every field is optional on the wire; use [`ExecutionContext::try_from`] to validate it
/// before it reaches a session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodContext {
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub line: Option<Line>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub arguments: BTreeMap<String, Value>,
}

/// Immutable snapshot of an intercepted call site.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    resource: String,
    location: Line,
    method: Option<String>,
    locals: BTreeMap<String, Value>,
}

impl ExecutionContext {
    pub fn new(resource: impl Into<String>, location: Line) -> Self {
        Self {
            resource: resource.into(),
            location,
            method: None,
            locals: BTreeMap::new(),
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_local(mut self, name: impl Into<String>, value: Value) -> Self {
        self.locals.insert(name.into(), value);
        self
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn location(&self) -> Line {
        self.location
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn locals(&self) -> &BTreeMap<String, Value> {
        &self.locals
    }

    pub fn local(&self, name: &str) -> Option<&Value> {
        self.locals.get(name)
    }
}

impl TryFrom<MethodContext> for ExecutionContext {
    type Error = DebugError;

    fn try_from(raw: MethodContext) -> Result<Self, Self::Error> {
        let resource = raw
            .resource
            .filter(|resource| !resource.trim().is_empty())
            .ok_or(DebugError::MalformedSnapshot("missing resource"))?;
        let location = raw
            .line
            .ok_or(DebugError::MalformedSnapshot("missing location"))?;

        Ok(Self {
            resource,
            location,
            method: raw.method,
            locals: raw.arguments,
        })
    }
}
