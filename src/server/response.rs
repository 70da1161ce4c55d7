//! Response envelopes and builders.

use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_DISPOSITION, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Serialize;

use super::router::RouterError;

/// `{ "success": true, "data": ... }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

/// `{ "success": false, "error": { "code", "message", "details" } }`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ApiError,
}

pub fn success_response<T: Serialize>(data: T) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        data,
    }
}

pub fn error_response(
    code: impl Into<String>,
    message: impl Into<String>,
    details: Option<String>,
) -> ErrorResponse {
    ErrorResponse {
        success: false,
        error: ApiError {
            code: code.into(),
            message: message.into(),
            details,
        },
    }
}

/// Serializes `data` into the success envelope.
pub fn json_ok<T: Serialize>(data: T) -> Result<Response<Bytes>, RouterError> {
    json_with_status(StatusCode::OK, &success_response(data))
}

pub fn json_with_status<T: Serialize>(
    status: StatusCode,
    body: &T,
) -> Result<Response<Bytes>, RouterError> {
    let json = serde_json::to_vec(body)
        .map_err(|e| RouterError::Internal(format!("Failed to serialize response: {}", e)))?;
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Bytes::from(json))
        .map_err(|e| RouterError::Internal(format!("Failed to build response: {}", e)))
}

/// A file download with both a plain and an RFC 5987 encoded filename.
pub fn attachment(
    bytes: Vec<u8>,
    content_type: &str,
    filename: &str,
) -> Result<Response<Bytes>, RouterError> {
    let ascii_name: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    let encoded = utf8_percent_encode(filename, NON_ALPHANUMERIC);
    let disposition = format!("attachment; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}");
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| RouterError::Internal(format!("Invalid filename header: {}", e)))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_DISPOSITION, disposition)
        .body(Bytes::from(bytes))
        .map_err(|e| RouterError::Internal(format!("Failed to build response: {}", e)))
}

pub fn empty(status: StatusCode) -> Result<Response<Bytes>, RouterError> {
    Response::builder()
        .status(status)
        .body(Bytes::new())
        .map_err(|e| RouterError::Internal(format!("Failed to build response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelopes() {
        let ok = serde_json::to_value(success_response(vec![1, 2])).unwrap();
        assert_eq!(ok, serde_json::json!({"success": true, "data": [1, 2]}));

        let err = serde_json::to_value(error_response("VALIDATION_ERROR", "bad", None)).unwrap();
        assert_eq!(
            err,
            serde_json::json!({
                "success": false,
                "error": {"code": "VALIDATION_ERROR", "message": "bad", "details": null}
            })
        );
    }

    #[test]
    fn test_attachment_headers() {
        let response = attachment(vec![1, 2, 3], "application/octet-stream", "订单_2024-01-01.xlsx").unwrap();
        let disposition = response.headers()[CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment; filename=\""));
        assert!(disposition.contains("filename*=UTF-8''%E8%AE%A2%E5%8D%95"));
        assert_eq!(response.body().len(), 3);
    }
}
