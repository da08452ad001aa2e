use super::helpers::TestServer;
use hyper::{Method, StatusCode};
use serde_json::json;

const NOT_VERIFIABLE: &str = "Document not found or cannot be verified";

#[tokio::test]
async fn test_create_read_and_list() {
    let server = TestServer::start().await;
    let id = server.create_delivery_note("alice", "DN-100").await;
    assert!(id.ends_with("_DN-100"));

    let (status, doc) = server
        .call(Method::GET, &format!("/api/deliveryNotes/{}", id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["id"], id.as_str());
    assert_eq!(doc["deliveryNoteNumber"], "DN-100");
    assert_eq!(doc["deliveryDate"], "2024-06-01T00:00:00Z");
    assert_eq!(doc["userId"], "alice");
    assert_eq!(doc["documentStatus"], "active");
    assert_eq!(doc["isDeleted"], false);

    server.create_delivery_note("alice", "101").await;
    server.create_delivery_note("bob", "102").await;

    let (status, list) = server
        .call(Method::GET, "/api/deliveryNotes", Some("alice"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["deliveryNoteNumber"], "101");

    let (_, limited) = server
        .call(Method::GET, "/api/deliveryNotes?limit=1", Some("alice"), None)
        .await;
    assert_eq!(limited.as_array().unwrap().len(), 1);

    let (status, found) = server
        .call(Method::GET, "/api/deliveryNotes/search?number=DN-100", Some("alice"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_session_and_bad_requests() {
    let server = TestServer::start().await;

    let (status, body) = server
        .call(Method::GET, "/api/deliveryNotes", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = server
        .call(Method::POST, "/api/deliveryNotes", Some("alice"), Some(json!({"companyName": "x"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .call(Method::GET, "/api/deliveryNotes/search", Some("alice"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .call(Method::GET, "/api/receipts", Some("alice"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server
        .call(Method::GET, "/api/deliveryNotes/nothing-here", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_and_delete() {
    let server = TestServer::start().await;
    let id = server.create_delivery_note("alice", "200").await;
    let path = format!("/api/deliveryNotes/{}", id);

    let (status, _) = server
        .call(Method::PATCH, &path, Some("alice"), Some(json!({"customerName": "Globex"})))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, doc) = server.call(Method::GET, &path, None, None).await;
    assert_eq!(doc["customerName"], "Globex");
    assert_eq!(doc["companyName"], "Nordlicht Logistik");

    let (status, _) = server.call(Method::DELETE, &path, Some("alice"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = server.call(Method::GET, &path, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server.call(Method::DELETE, &path, Some("alice"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_organization_documents_are_owner_only() {
    let server = TestServer::start().await;
    let (status, body) = server
        .call(
            Method::POST,
            "/api/invoices?organizationId=org-1",
            Some("alice"),
            Some(json!({"invoiceNumber": "7", "totalAmount": 99.5})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let path = format!("/api/invoices/{}", body["id"].as_str().unwrap());

    let (status, _) = server
        .call(Method::PATCH, &path, Some("bob"), Some(json!({"totalAmount": 1})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server
        .call(Method::POST, &format!("{}/lock", path), Some("bob"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server
        .call(Method::POST, &format!("{}/lock", path), Some("alice"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, doc) = server.call(Method::GET, &path, None, None).await;
    assert_eq!(doc["isLocked"], true);
    assert_eq!(doc["organizationId"], "org-1");
}

#[tokio::test]
async fn test_cancel_and_copy() {
    let server = TestServer::start().await;
    let id = server.create_delivery_note("alice", "300").await;
    let path = format!("/api/deliveryNotes/{}", id);

    let (status, _) = server
        .call(Method::POST, &format!("{}/cancel", path), Some("alice"), Some(json!({"reason": "duplicate"})))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = server
        .call(Method::POST, &format!("{}/cancel", path), Some("alice"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, doc) = server.call(Method::GET, &path, None, None).await;
    assert_eq!(doc["documentStatus"], "cancelled");
    assert_eq!(doc["cancellationReason"], "duplicate");
    assert!(doc["cancelledAt"].is_string());

    let (status, _) = server
        .call(Method::POST, &format!("{}/copy", path), Some("alice"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server
        .call(Method::POST, &format!("{}/copy", path), Some("alice"), Some(json!({"documentNumber": "301"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let copy_id = body["id"].as_str().unwrap();
    assert!(copy_id.ends_with("_DN-301"));

    let (_, copy) = server
        .call(Method::GET, &format!("/api/deliveryNotes/{}", copy_id), None, None)
        .await;
    assert_eq!(copy["documentStatus"], "active");
    assert_eq!(copy["customerName"], "Acme GmbH");
    assert_ne!(copy["verificationToken"], doc["verificationToken"]);
}

#[tokio::test]
async fn test_public_verification() {
    let server = TestServer::start().await;
    let id = server.create_delivery_note("alice", "400").await;
    let path = format!("/api/deliveryNotes/{}", id);
    let (_, doc) = server.call(Method::GET, &path, None, None).await;
    let token = doc["verificationToken"].as_str().unwrap().to_string();
    let verify_path = format!("/verify/deliveryNotes/{}", token);

    let (status, result) = server.call(Method::GET, &verify_path, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["documentType"], "Delivery Note");
    assert_eq!(result["documentNumber"], "400");
    assert_eq!(result["status"], "active");
    assert!(result.get("userId").is_none());

    server
        .call(Method::POST, &format!("{}/cancel", path), Some("alice"), None)
        .await;
    let (status, result) = server.call(Method::GET, &verify_path, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["status"], "cancelled");
    assert!(result["cancelledAt"].is_string());

    for bad_path in [
        format!("/verify/bogusType/{}", token),
        format!("/verify/invoices/{}", token),
        "/verify/deliveryNotes/no-such-token".to_string(),
        "/verify/deliveryNotes".to_string(),
    ] {
        let (status, body) = server.call(Method::GET, &bad_path, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", bad_path);
        assert_eq!(body["error"], NOT_VERIFIABLE);
    }

    server.call(Method::DELETE, &path, Some("alice"), None).await;
    let (status, body) = server.call(Method::GET, &verify_path, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], NOT_VERIFIABLE);
}

#[tokio::test]
async fn test_ids_with_reserved_characters_are_reachable() {
    let server = TestServer::start().await;

    for number in ["A 7", "2024/001"] {
        let id = server.create_delivery_note("alice", number).await;
        let encoded = id.replace(' ', "%20").replace('/', "%2F");
        let path = format!("/api/deliveryNotes/{}", encoded);

        let (status, doc) = server.call(Method::GET, &path, None, None).await;
        assert_eq!(status, StatusCode::OK, "{}", path);
        assert_eq!(doc["id"], id.as_str());

        let (status, _) = server
            .call(Method::POST, &format!("{}/lock", path), Some("alice"), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = server.call(Method::DELETE, &path, Some("alice"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
