use axum::{
    body::Body,
    http::{Response as HttpResponse, StatusCode},
    response::Response,
};
use findcode_protocol::serialize_json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    pub status: &'static str,
    pub code: String,
    pub message: String,
    pub hint: Option<String>,
}

pub(crate) fn error_body(code: &str, message: String) -> ErrorBody {
    let hint = match code {
        "invalid_request" => Some(
            "Send an element descriptor as JSON with at least a \"tagName\" field.".to_string(),
        ),
        _ => None,
    };
    ErrorBody {
        status: "error",
        code: code.to_string(),
        message,
        hint,
    }
}

pub(crate) fn build_response<T: Serialize>(
    status: StatusCode,
    body: &T,
) -> Result<Response, StatusCode> {
    let bytes = serialize_json(body)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .into_bytes();

    Ok(HttpResponse::builder()
        .status(status)
        .header("content-type", "application/json")
        .header("access-control-allow-origin", "*")
        .body(Body::from(bytes))
        .expect("valid HTTP response"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_request_carries_a_hint() {
        let body = error_body("invalid_request", "bad json".to_string());
        assert!(body.hint.unwrap().contains("tagName"));
        assert!(error_body("other", String::new()).hint.is_none());
    }

    #[test]
    fn responses_are_json() {
        let response = build_response(StatusCode::BAD_REQUEST, &error_body("x", "y".into())).unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
    }
}
