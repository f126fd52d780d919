//! Boundary types of the execution front end
//!
//! The front end accepts `{query, operationName, variables}` and answers with
//! `{data, errors}`. Generated contracts return [`FieldResult`] so a failure of
//! one field, including a per-id load failure, lands in `errors` with that
//! field's path while sibling fields keep their data.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{self, Display};

use crate::descriptor::MethodKind;
use crate::runtime::{LoadError, RequestContext};

/// Incoming request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(default)]
    pub variables: Map<String, Value>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            operation_name: None,
            variables: Map::new(),
        }
    }

    pub fn operation(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    pub fn variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }
}

/// Error of a single field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<String>>,
}

impl FieldError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
        }
    }

    /// Wrap an error raised by a backing service call
    pub fn service<E: Display>(error: E) -> Self {
        Self::new(error.to_string())
    }

    pub fn at(mut self, path: Vec<String>) -> Self {
        self.path = Some(path);
        self
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} (at {})", self.message, path.join(".")),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for FieldError {}

impl From<LoadError> for FieldError {
    fn from(error: LoadError) -> Self {
        Self::new(error.to_string())
    }
}

pub type FieldResult<T> = Result<T, FieldError>;

/// One root field as wired by the generated engine module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootField {
    pub name: &'static str,
    pub entity: &'static str,
    pub kind: MethodKind,
}

impl RootField {
    pub fn is_mutation(&self) -> bool {
        self.kind.is_mutation()
    }
}

/// Outgoing response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl QueryResponse {
    /// Assemble a response from resolved root fields
    ///
    /// A failed field becomes `null` in `data` and an error whose path is the field name.
    pub fn from_fields<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (String, FieldResult<Value>)>,
    {
        let mut data = Map::new();
        let mut errors = Vec::new();
        for (name, result) in fields {
            match result {
                Ok(value) => {
                    data.insert(name, value);
                }
                Err(error) => {
                    let path = error.path.clone().unwrap_or_else(|| vec![name.clone()]);
                    errors.push(error.at(path));
                    data.insert(name, Value::Null);
                }
            }
        }
        Self {
            data: Value::Object(data),
            errors,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Front end that executes requests against the generated bindings
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, request: QueryRequest, ctx: RequestContext) -> QueryResponse;
}
