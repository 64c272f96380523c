//! Named variables exposed to the debug client when execution stops.
//!
//! Each capturer owns exactly one well-known key. Values are opaque JSON payloads; their
//! shape is validated, if at all, by whoever produced them.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::context::ExecutionContext;

/// Variable name under which the authorization (redirect) response is exposed.
pub const AUTHZ_RESPONSE_KEY: &str = "authorization-response";

/// Variable name under which the token endpoint response is exposed.
pub const TOKEN_RESPONSE_KEY: &str = "token-response";

pub trait VariableCapture: Send {
    /// Well-known variable name this capturer writes.
    fn key(&self) -> &'static str;

    /// Store `value`, replacing anything captured before.
    fn capture(&mut self, value: Value);

    /// Copy of the captured variables.
    fn export(&self) -> BTreeMap<String, Value>;

    fn reset(&mut self);

    /// Capture the snapshot local named after [`key`](Self::key), if there is one.
    fn capture_from(&mut self, context: &ExecutionContext) -> bool {
        match context.local(self.key()) {
            Some(value) => {
                self.capture(value.clone());
                true
            }
            None => false,
        }
    }
}

/// Holds the authorization response produced by the authorize endpoint.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthzResponseVariable {
    holder: BTreeMap<String, Value>,
}

impl AuthzResponseVariable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VariableCapture for AuthzResponseVariable {
    fn key(&self) -> &'static str {
        AUTHZ_RESPONSE_KEY
    }

    fn capture(&mut self, value: Value) {
        self.holder.insert(AUTHZ_RESPONSE_KEY.to_string(), value);
    }

    fn export(&self) -> BTreeMap<String, Value> {
        self.holder.clone()
    }

    fn reset(&mut self) {
        self.holder.clear();
    }
}

/// Holds the response of the token endpoint.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TokenResponseVariable {
    holder: BTreeMap<String, Value>,
}

impl TokenResponseVariable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VariableCapture for TokenResponseVariable {
    fn key(&self) -> &'static str {
        TOKEN_RESPONSE_KEY
    }

    fn capture(&mut self, value: Value) {
        self.holder.insert(TOKEN_RESPONSE_KEY.to_string(), value);
    }

    fn export(&self) -> BTreeMap<String, Value> {
        self.holder.clone()
    }

    fn reset(&mut self) {
        self.holder.clear();
    }
}

/// The capturers registered on one debug session.
pub struct VariableCaptures {
    captures: Vec<Box<dyn VariableCapture>>,
}

impl VariableCaptures {
    pub fn empty() -> Self {
        Self {
            captures: Vec::new(),
        }
    }

    pub fn register(&mut self, capture: Box<dyn VariableCapture>) {
        self.captures.push(capture);
    }

    pub fn len(&self) -> usize {
        self.captures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }

    /// Drop the values of the previous stop and capture the ones carried by `context`.
    ///
    /// Returns the number of capturers that found a value.
    pub fn refresh(&mut self, context: &ExecutionContext) -> usize {
        let mut captured = 0;
        for capture in &mut self.captures {
            capture.reset();
            if capture.capture_from(context) {
                captured += 1;
            }
        }
        captured
    }

    /// Hand `value` to the capturer owning `key`.
    ///
    /// Returns `false` when no registered capturer owns that key.
    pub fn capture(&mut self, key: &str, value: Value) -> bool {
        match self.captures.iter_mut().find(|capture| capture.key() == key) {
            Some(capture) => {
                capture.capture(value);
                true
            }
            None => false,
        }
    }

    pub fn export(&self) -> BTreeMap<String, Value> {
        self.captures
            .iter()
            .flat_map(|capture| capture.export())
            .collect()
    }

    pub fn reset(&mut self) {
        for capture in &mut self.captures {
            capture.reset();
        }
    }

    pub(crate) fn clear(&mut self) {
        self.captures.clear();
    }
}

impl Default for VariableCaptures {
    /// One capturer per well-known response kind.
    fn default() -> Self {
        let mut captures = Self::empty();
        captures.register(Box::new(AuthzResponseVariable::new()));
        captures.register(Box::new(TokenResponseVariable::new()));
        captures
    }
}

impl std::fmt::Debug for VariableCaptures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.captures.iter().map(|capture| capture.key()))
            .finish()
    }
}
