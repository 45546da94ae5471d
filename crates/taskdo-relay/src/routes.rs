use std::convert::Infallible;
use std::sync::Arc;

use warp::http::header::{HeaderValue, CONTENT_TYPE};
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::relay::{ExchangeRequest, RefreshRequest, TokenRelay};

const MAX_BODY: u64 = 16 * 1024;

/// `POST /exchange` and `POST /refresh`. Everything else is a 404.
pub fn routes(
    relay: Arc<TokenRelay>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let with_relay = warp::any().map(move || Arc::clone(&relay));

    let exchange = warp::post()
        .and(warp::path("exchange"))
        .and(warp::path::end())
        .and(warp::body::content_length_limit(MAX_BODY))
        .and(warp::body::json::<ExchangeRequest>())
        .and(with_relay.clone())
        .and_then(handle_exchange);

    let refresh = warp::post()
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(warp::body::content_length_limit(MAX_BODY))
        .and(warp::body::json::<RefreshRequest>())
        .and(with_relay)
        .and_then(handle_refresh);

    exchange
        .or(refresh)
        .recover(handle_rejection)
        .with(warp::trace::request())
}

async fn handle_exchange(
    request: ExchangeRequest,
    relay: Arc<TokenRelay>,
) -> Result<Response, Rejection> {
    Ok(match relay.exchange(&request).await {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(e) => {
            tracing::warn!("Code exchange could not reach the token endpoint: {}", e);
            upstream_unavailable()
        }
    })
}

async fn handle_refresh(
    request: RefreshRequest,
    relay: Arc<TokenRelay>,
) -> Result<Response, Rejection> {
    Ok(match relay.refresh(&request).await {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(e) => {
            tracing::warn!("Token refresh could not reach the token endpoint: {}", e);
            upstream_unavailable()
        }
    })
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if err.find::<warp::filters::body::BodyDeserializeError>().is_some()
        || err.find::<warp::reject::UnsupportedMediaType>().is_some()
    {
        return Ok(json_response(
            StatusCode::BAD_REQUEST,
            br#"{"error":"invalid_request"}"#.to_vec(),
        ));
    }
    if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        return Ok(json_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            br#"{"error":"invalid_request"}"#.to_vec(),
        ));
    }

    let mut response = Response::new(warp::hyper::Body::from("Not found"));
    *response.status_mut() = StatusCode::NOT_FOUND;
    Ok(response)
}

fn upstream_unavailable() -> Response {
    json_response(
        StatusCode::BAD_GATEWAY,
        br#"{"error":"upstream_unavailable","error_description":"Token endpoint unreachable"}"#
            .to_vec(),
    )
}

fn json_response(status: StatusCode, body: Vec<u8>) -> Response {
    let mut response = Response::new(warp::hyper::Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
