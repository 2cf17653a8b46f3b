use axum::http::StatusCode;

pub(in crate::infra::api) fn healthz(app: axum::Router<()>) -> axum::Router<()> {
    app.route("/healthz", axum::routing::get(route))
}

async fn route() -> StatusCode {
    StatusCode::OK
}
