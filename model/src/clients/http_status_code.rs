pub use http::StatusCode;
use kube::Error;

/// Lets callers branch on the HTTP status of a failed API call, e.g. to treat `404` as "already
/// gone" or `409` as "already exists".
pub trait HttpStatusCode {
    fn status_code(&self) -> Option<StatusCode>;

    fn is_status_code(&self, status_code: StatusCode) -> bool {
        self.status_code()
            .map(|some| some == status_code)
            .unwrap_or_default()
    }

    fn is_not_found(&self) -> bool {
        self.is_status_code(StatusCode::NOT_FOUND)
    }
}

impl HttpStatusCode for kube::Error {
    fn status_code(&self) -> Option<StatusCode> {
        if let Error::Api(error_response) = self {
            StatusCode::from_u16(error_response.code).ok()
        } else {
            None
        }
    }
}

impl<T, E> HttpStatusCode for std::result::Result<T, E>
where
    E: HttpStatusCode,
{
    fn status_code(&self) -> Option<StatusCode> {
        self.as_ref().err().and_then(|e| e.status_code())
    }
}

#[test]
fn api_error_exposes_status_code() {
    let err = kube::Error::Api(kube::core::ErrorResponse {
        status: "Failure".to_owned(),
        message: "configmaps \"x\" not found".to_owned(),
        reason: "NotFound".to_owned(),
        code: 404,
    });
    assert!(err.is_not_found());
    assert!(!err.is_status_code(StatusCode::CONFLICT));
    let ok: std::result::Result<(), kube::Error> = Ok(());
    assert_eq!(ok.status_code(), None);
}
