use {
    crate::{
        domain::hooks::payload::EntrypointPayload,
        infra::{
            api::{State, error},
            observe,
        },
    },
    axum::{
        extract::RawQuery,
        http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
        response::{IntoResponse, Response},
    },
};

pub(in crate::infra::api) fn auction(router: axum::Router<State>) -> axum::Router<State> {
    router.route("/openrtb2/auction", axum::routing::post(route))
}

async fn route(
    state: axum::extract::State<State>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: String,
) -> Response {
    let request = EntrypointPayload {
        query_params: query
            .map(|query| {
                url::form_urlencoded::parse(query.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default(),
        headers: headers
            .iter()
            .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_owned())))
            .collect(),
        body,
    };

    match state.exchange().handle(request).await {
        Ok(response) => {
            observe::api_response(StatusCode::OK);
            let headers = response
                .headers
                .iter()
                .filter_map(|(name, value)| {
                    Some((
                        HeaderName::try_from(name.as_str()).ok()?,
                        HeaderValue::try_from(value.as_str()).ok()?,
                    ))
                })
                .collect::<HeaderMap>();
            (StatusCode::OK, headers, response.body).into_response()
        }
        Err(err) => {
            observe::request_failed(&err);
            let (status, body) = <(StatusCode, axum::Json<error::Error>)>::from(err);
            observe::api_response(status);
            (status, body).into_response()
        }
    }
}
