//! HTTP surface: the document API and the public verification route.

use crate::application::types::{
    document_to_json, record_from_json, CancelRequest, CopyRequest, ErrorResponse, SavedResponse,
};
use crate::application::{DocumentError, DocumentService, VerificationResolver, VerifyError};
use crate::config::AppConfig;
use crate::domain::{DocumentType, Record, Session};
use crate::infrastructure::database::SqliteStore;
use hyper::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use hyper::http::request::Parts;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use percent_encoding::percent_decode_str;
use serde::Serialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

pub const USER_HEADER: &str = "x-user-id";
pub const ORGANIZATION_HEADER: &str = "x-organization-id";

/// Bind the HTTP server and return the bound address with the serving future.
pub fn bind<F>(
    config: Arc<AppConfig>,
    shutdown: F,
) -> Result<(SocketAddr, impl Future<Output = hyper::Result<()>>), hyper::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.listen_addr;
    let make_svc = make_service_fn(move |_conn| {
        let config = config.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| handle_request(req, config.clone())))
        }
    });

    let server = Server::try_bind(&addr)?.serve(make_svc);
    let local_addr = server.local_addr();
    Ok((local_addr, server.with_graceful_shutdown(shutdown)))
}

pub async fn handle_request(
    req: Request<Body>,
    config: Arc<AppConfig>,
) -> Result<Response<Body>, Infallible> {
    let (parts, body) = req.into_parts();
    tracing::debug!(method = %parts.method, path = parts.uri.path(), "request received");

    let body = match hyper::body::to_bytes(body).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "failed to read request body");
            return Ok(json_response(
                StatusCode::BAD_REQUEST,
                &ErrorResponse::new("Could not read request body"),
            ));
        }
    };

    Ok(dispatch(&config, &parts, &body))
}

/// Get a store for one request.
pub fn open_store(config: &AppConfig) -> Result<SqliteStore, crate::infrastructure::database::StoreError> {
    SqliteStore::new(&config.db_path)
}

fn dispatch(config: &AppConfig, parts: &Parts, body: &[u8]) -> Response<Body> {
    let store = match open_store(config) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, path = %config.db_path.display(), "failed to open database");
            return json_response(
                StatusCode::SERVICE_UNAVAILABLE,
                &ErrorResponse::new("Storage is unavailable"),
            );
        }
    };

    let decoded = match path_segments(parts.uri.path()) {
        Some(decoded) => decoded,
        None => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &ErrorResponse::new("Path is not valid UTF-8"),
            )
        }
    };
    let segments: Vec<&str> = decoded.iter().map(String::as_str).collect();

    match (&parts.method, segments.as_slice()) {
        (&Method::GET, ["verify", doc_type]) => handle_verify(&store, doc_type, ""),
        (&Method::GET, ["verify", doc_type, token]) => handle_verify(&store, doc_type, token),
        (_, ["api", doc_type, rest @ ..]) => {
            let Some(doc_type) = DocumentType::from_collection(doc_type) else {
                return json_response(
                    StatusCode::NOT_FOUND,
                    &ErrorResponse::new(format!("Unknown document type: {}", doc_type)),
                );
            };
            let service = DocumentService::new(&store, doc_type.config());
            route_api(config, &service, parts, rest, body).unwrap_or_else(|e| error_response(&e))
        }
        _ => json_response(StatusCode::NOT_FOUND, &ErrorResponse::new("Not found")),
    }
}

fn handle_verify(store: &SqliteStore, doc_type: &str, token: &str) -> Response<Body> {
    match VerificationResolver::new(store).lookup(doc_type, token) {
        Ok(result) => json_response(StatusCode::OK, &result),
        Err(e) => {
            match &e {
                VerifyError::Persistence(_) => tracing::error!(doc_type, error = %e, "verification failed"),
                _ => tracing::info!(doc_type, error = %e, "verification refused"),
            }
            json_response(
                StatusCode::NOT_FOUND,
                &ErrorResponse::new(VerifyError::PUBLIC_MESSAGE),
            )
        }
    }
}

fn route_api(
    config: &AppConfig,
    service: &DocumentService<'_, SqliteStore>,
    parts: &Parts,
    rest: &[&str],
    body: &[u8],
) -> Result<Response<Body>, DocumentError> {
    let session = session_from(&parts.headers);
    let params = query_params(parts.uri.query());
    let organization_id = params
        .get("organizationId")
        .map(String::as_str)
        .or_else(|| header_str(&parts.headers, ORGANIZATION_HEADER));
    let date_fields = service.config().date_fields;

    match (&parts.method, rest) {
        (&Method::POST, []) => {
            let data = parse_record(body, date_fields)?;
            let id = service.save(&session, &data, organization_id)?;
            Ok(json_response(StatusCode::CREATED, &SavedResponse { id }))
        }
        (&Method::GET, []) => {
            let limit = params
                .get("limit")
                .and_then(|limit| limit.parse().ok())
                .unwrap_or(config.list_limit);
            let docs = service.get_all(&session, limit, organization_id)?;
            let body: Vec<_> = docs.iter().map(document_to_json).collect();
            Ok(json_response(StatusCode::OK, &body))
        }
        (&Method::GET, ["search"]) => {
            let number = params
                .get("number")
                .filter(|n| !n.trim().is_empty())
                .ok_or_else(|| DocumentError::InvalidRequest("'number' is required".into()))?;
            let docs = service.search_by_document_number(&session, number.trim(), organization_id)?;
            let body: Vec<_> = docs.iter().map(document_to_json).collect();
            Ok(json_response(StatusCode::OK, &body))
        }
        (&Method::GET, [id]) => {
            let doc = service
                .get(id)?
                .ok_or_else(|| DocumentError::NotFound(id.to_string()))?;
            Ok(json_response(StatusCode::OK, &document_to_json(&doc)))
        }
        (&Method::PATCH, [id]) => {
            let patch = parse_record(body, date_fields)?;
            service.update(&session, id, &patch)?;
            Ok(no_content())
        }
        (&Method::DELETE, [id]) => {
            service.delete(&session, id)?;
            Ok(no_content())
        }
        (&Method::POST, [id, "lock"]) => service.lock(&session, id).map(|_| no_content()),
        (&Method::POST, [id, "unlock"]) => service.unlock(&session, id).map(|_| no_content()),
        (&Method::POST, [id, "archive"]) => service.archive(&session, id).map(|_| no_content()),
        (&Method::POST, [id, "unarchive"]) => service.unarchive(&session, id).map(|_| no_content()),
        (&Method::POST, [id, "cancel"]) => {
            let request: CancelRequest = parse_body(body)?;
            service.cancel(&session, id, request.reason.as_deref())?;
            Ok(no_content())
        }
        (&Method::POST, [id, "copy"]) => {
            let request: CopyRequest = parse_body(body)?;
            let organization_id = request.organization_id.as_deref().or(organization_id);
            let copy_id = service.copy(&session, id, request.document_number.as_deref(), organization_id)?;
            Ok(json_response(StatusCode::CREATED, &SavedResponse { id: copy_id }))
        }
        _ => Ok(json_response(StatusCode::NOT_FOUND, &ErrorResponse::new("Not found"))),
    }
}

/// Split a request path into percent-decoded segments. Document IDs may
/// contain spaces or slashes, which clients send as `%20` and `%2F`.
fn path_segments(path: &str) -> Option<Vec<String>> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            percent_decode_str(segment)
                .decode_utf8()
                .ok()
                .map(|decoded| decoded.into_owned())
        })
        .collect()
}

fn session_from(headers: &HeaderMap) -> Session {
    match header_str(headers, USER_HEADER) {
        Some(uid) => Session::authenticated(uid),
        None => Session::anonymous(),
    }
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn query_params(query: Option<&str>) -> HashMap<String, String> {
    query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

fn parse_record(body: &[u8], date_fields: &[&str]) -> Result<Record, DocumentError> {
    let json: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| DocumentError::InvalidRequest(format!("Invalid JSON body: {}", e)))?;
    record_from_json(json, date_fields)
        .ok_or_else(|| DocumentError::InvalidRequest("Body must be a JSON object".into()))
}

/// Empty bodies read as the type's defaults.
fn parse_body<T: serde::de::DeserializeOwned + Default>(body: &[u8]) -> Result<T, DocumentError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| DocumentError::InvalidRequest(format!("Invalid JSON body: {}", e)))
}

fn error_response(error: &DocumentError) -> Response<Body> {
    let status = match error {
        DocumentError::Unauthenticated => StatusCode::UNAUTHORIZED,
        DocumentError::NotFound(_) => StatusCode::NOT_FOUND,
        DocumentError::Forbidden(_) => StatusCode::FORBIDDEN,
        DocumentError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        DocumentError::InvalidStatusTransition { .. } => StatusCode::CONFLICT,
        DocumentError::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    json_response(status, &ErrorResponse::new(error.to_string()))
}

fn json_response<T: Serialize + ?Sized>(status: StatusCode, payload: &T) -> Response<Body> {
    let (status, bytes) = match serde_json::to_vec(payload) {
        Ok(bytes) => (status, bytes),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize response");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                br#"{"error":"Internal error"}"#.to_vec(),
            )
        }
    };

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn no_content() -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}
