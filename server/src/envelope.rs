//! JSON response envelope.
//!
//! Successful responses look like `{"status":200,"data":...}` and failures
//! like `{"status":404,"error":"..."}`. The `status` field always repeats the
//! HTTP status code.

use axum::{
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::value::RawValue;

#[derive(Serialize)]
struct DataBody<'a, T: Serialize + ?Sized> {
    status: u16,
    data: &'a T,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    status: u16,
    error: &'a str,
}

/// A rendered envelope ready to be sent.
#[derive(Debug)]
pub struct Envelope {
    status: StatusCode,
    body: String,
}

impl Envelope {
    /// Wrap a serializable value.
    pub fn data<T: Serialize + ?Sized>(status: StatusCode, data: &T) -> serde_json::Result<Self> {
        let body = serde_json::to_string(&DataBody {
            status: status.as_u16(),
            data,
        })?;
        Ok(Self { status, body })
    }

    /// Wrap an already serialized JSON document without re-encoding it.
    pub fn raw(status: StatusCode, json: String) -> serde_json::Result<Self> {
        let raw = RawValue::from_string(json)?;
        Self::data(status, &*raw)
    }

    pub fn error(status: StatusCode, message: impl AsRef<str>) -> Self {
        let body = serde_json::to_string(&ErrorBody {
            status: status.as_u16(),
            error: message.as_ref(),
        })
        .unwrap_or_else(|_| format!(r#"{{"status":{}}}"#, status.as_u16()));
        Self { status, body }
    }

    #[cfg(test)]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[cfg(test)]
    pub fn body(&self) -> &str {
        &self.body
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (
            self.status,
            [(CONTENT_TYPE, "application/json")],
            self.body,
        )
            .into_response()
    }
}
