use {crate::domain::auction, axum::http::StatusCode, serde::Serialize};

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "PascalCase")]
enum Kind {
    InvalidRequest,
    UnknownAccount,
    Internal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Error {
    kind: Kind,
    description: String,
}

impl From<auction::Error> for (StatusCode, axum::Json<Error>) {
    fn from(value: auction::Error) -> Self {
        let (status, kind) = match &value {
            auction::Error::InvalidRequest(_) => (StatusCode::BAD_REQUEST, Kind::InvalidRequest),
            auction::Error::UnknownAccount(_) => (StatusCode::UNAUTHORIZED, Kind::UnknownAccount),
            auction::Error::Configuration(_) | auction::Error::Serialization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Kind::Internal)
            }
        };
        (
            status,
            axum::Json(Error {
                kind,
                description: value.to_string(),
            }),
        )
    }
}
