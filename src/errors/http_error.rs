use std::{borrow::Cow, fmt::Debug, ops::Deref};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use error_stack::{AttachmentKind, FrameKind, Report};
use serde::Serialize;
use tracing::{event, Level};

/// An error that can be returned from an HTTP endpoint
pub trait HttpError: ToString + std::fmt::Debug {
    /// Extra data sent along with the error
    type Detail: Serialize + Debug + Send + Sync + 'static;

    /// The status code that the error should return.
    fn status_code(&self) -> StatusCode;
    /// A stable identifier for the error, which clients can match on.
    fn error_kind(&self) -> &'static str;

    /// Extra detail about this error
    fn error_detail(&self) -> Self::Detail;

    /// The status code and data for this error. Most implementors of this trait will not
    /// need to override the default implementation.
    fn response_tuple(&self) -> (StatusCode, ErrorResponseData<Self::Detail>) {
        let status = self.status_code();
        (
            status,
            ErrorResponseData::new(status, self.error_kind(), self.to_string(), self.error_detail()),
        )
    }

    /// Convert the error into a [Response]. Most implementors of this trait will not
    /// need to override the default implementation.
    fn to_response(&self) -> Response {
        let (code, json) = self.response_tuple();
        (code, Json(json)).into_response()
    }
}

impl<T> HttpError for Report<T>
where
    T: HttpError + Send + Sync + 'static,
{
    type Detail = Option<Vec<String>>;

    fn status_code(&self) -> StatusCode {
        self.current_context().status_code()
    }

    fn error_kind(&self) -> &'static str {
        self.current_context().error_kind()
    }

    /// Client errors carry the printable attachments of the report. Server errors send nothing
    /// beyond the kind and message.
    fn error_detail(&self) -> Option<Vec<String>> {
        if !self.status_code().is_client_error() {
            return None;
        }

        let messages = self
            .frames()
            .filter_map(|frame| match frame.kind() {
                FrameKind::Attachment(AttachmentKind::Printable(p)) => Some(p.to_string()),
                _ => None,
            })
            .collect::<Vec<_>>();

        (!messages.is_empty()).then_some(messages)
    }

    fn to_response(&self) -> Response {
        if self.status_code().is_server_error() {
            event!(Level::ERROR, report = ?self, "Request failed");
        }

        let (code, json) = self.response_tuple();
        (code, Json(json)).into_response()
    }
}

/// A body to be returned in an error response
#[derive(Debug, Serialize)]
pub struct ErrorResponseData<T: Debug + Serialize> {
    error: ErrorDetails<T>,
}

/// An error code and additional details.
#[derive(Debug, Serialize)]
pub struct ErrorDetails<T: Debug + Serialize> {
    kind: Cow<'static, str>,
    message: Cow<'static, str>,
    details: T,
}

impl<T: Debug + Serialize> ErrorResponseData<T> {
    /// Create a new [ErrorResponseData] with the given error code and message.
    pub fn new(
        status: StatusCode,
        kind: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
        details: T,
    ) -> ErrorResponseData<T> {
        let ret = ErrorResponseData {
            error: ErrorDetails {
                kind: kind.into(),
                message: message.into(),
                details,
            },
        };

        if status.is_server_error() {
            event!(Level::ERROR, %status, kind=%ret.error.kind, message=%ret.error.message, details=?ret.error.details);
        } else {
            event!(Level::INFO, %status, kind=%ret.error.kind, message=%ret.error.message, details=?ret.error.details);
        }

        ret
    }
}

/// Wraps an error_stack::Report and implements IntoResponse, allowing easy return of a Report<T>
/// from an Axum endpoint.
#[derive(Debug)]
pub struct WrapReport<T: HttpError + Sync + Send + 'static>(pub Report<T>);

impl<T: HttpError + Sync + Send + 'static> IntoResponse for WrapReport<T> {
    fn into_response(self) -> Response {
        self.0.to_response()
    }
}

impl<T: HttpError + Sync + Send + 'static> From<Report<T>> for WrapReport<T> {
    fn from(value: Report<T>) -> Self {
        WrapReport(value)
    }
}

impl<T: HttpError + std::error::Error + Sync + Send + 'static> From<T> for WrapReport<T> {
    fn from(value: T) -> Self {
        WrapReport(Report::from(value))
    }
}

impl<T: HttpError + Sync + Send + 'static> Deref for WrapReport<T> {
    type Target = Report<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
