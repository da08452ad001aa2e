use docdesk::application::{DocumentError, DocumentService};
use docdesk::domain::config::WARRANTY_CARD;
use docdesk::domain::{DocumentStatus, Record, Session, Value};
use docdesk::infrastructure::database::SqliteStore;

fn warranty_card(number: &str) -> Record {
    let mut data = Record::new();
    data.insert("warrantyNumber".into(), number.into());
    data.insert("companyName".into(), "Bergmann Elektro".into());
    data.insert("productName".into(), "Heat pump HP-9".into());
    data.insert("serialNumber".into(), "SN-000123".into());
    data
}

fn owner() -> Session {
    Session::authenticated("owner")
}

#[test]
fn test_lock_and_unlock() {
    let store = SqliteStore::new_in_memory().unwrap();
    let service = DocumentService::new(&store, &WARRANTY_CARD);
    let id = service.save(&owner(), &warranty_card("1"), None).unwrap();

    service.lock(&owner(), &id).unwrap();
    assert!(service.get(&id).unwrap().unwrap().is_locked);

    service.unlock(&owner(), &id).unwrap();
    assert!(!service.get(&id).unwrap().unwrap().is_locked);
}

#[test]
fn test_archive_is_independent_of_lock() {
    let store = SqliteStore::new_in_memory().unwrap();
    let service = DocumentService::new(&store, &WARRANTY_CARD);
    let id = service.save(&owner(), &warranty_card("1"), None).unwrap();

    service.lock(&owner(), &id).unwrap();
    service.archive(&owner(), &id).unwrap();
    let doc = service.get(&id).unwrap().unwrap();
    assert!(doc.is_archived);
    assert!(doc.is_locked);

    service.unarchive(&owner(), &id).unwrap();
    let doc = service.get(&id).unwrap().unwrap();
    assert!(!doc.is_archived);
    assert!(doc.is_locked);
}

#[test]
fn test_flags_follow_update_authorization() {
    let store = SqliteStore::new_in_memory().unwrap();
    let service = DocumentService::new(&store, &WARRANTY_CARD);
    let id = service.save(&owner(), &warranty_card("1"), Some("org-1")).unwrap();

    let stranger = Session::authenticated("stranger");
    assert!(matches!(service.lock(&stranger, &id), Err(DocumentError::Forbidden(_))));
    assert!(matches!(
        service.archive(&Session::anonymous(), &id),
        Err(DocumentError::Unauthenticated)
    ));
}

#[test]
fn test_management_ignores_deleted_documents() {
    let store = SqliteStore::new_in_memory().unwrap();
    let service = DocumentService::new(&store, &WARRANTY_CARD);
    let id = service.save(&owner(), &warranty_card("1"), None).unwrap();
    service.delete(&owner(), &id).unwrap();

    assert!(matches!(service.lock(&owner(), &id), Err(DocumentError::NotFound(_))));
    assert!(matches!(
        service.copy(&owner(), &id, Some("2"), None),
        Err(DocumentError::NotFound(_))
    ));
    assert!(matches!(
        service.cancel(&owner(), &id, None),
        Err(DocumentError::NotFound(_))
    ));
}

#[test]
fn test_cancel_is_one_way() {
    let store = SqliteStore::new_in_memory().unwrap();
    let service = DocumentService::new(&store, &WARRANTY_CARD);
    let id = service.save(&owner(), &warranty_card("1"), None).unwrap();

    service.cancel(&owner(), &id, Some("issued twice")).unwrap();

    let doc = service.get(&id).unwrap().unwrap();
    assert_eq!(doc.status, DocumentStatus::Cancelled);
    assert!(doc.cancelled_at.is_some());
    assert_eq!(doc.cancellation_reason.as_deref(), Some("issued twice"));
    assert!(!doc.is_deleted);

    let again = service.cancel(&owner(), &id, None);
    assert!(matches!(again, Err(DocumentError::InvalidStatusTransition { .. })));

    let mut revive = Record::new();
    revive.insert("documentStatus".into(), "active".into());
    let revived = service.update(&owner(), &id, &revive);
    assert!(matches!(revived, Err(DocumentError::InvalidStatusTransition { .. })));
    assert_eq!(
        service.get(&id).unwrap().unwrap().status,
        DocumentStatus::Cancelled
    );
}

#[test]
fn test_copy_gets_new_identity() {
    let store = SqliteStore::new_in_memory().unwrap();
    let service = DocumentService::new(&store, &WARRANTY_CARD);
    let source_id = service.save(&owner(), &warranty_card("10"), Some("org-1")).unwrap();
    service.lock(&owner(), &source_id).unwrap();
    service.cancel(&owner(), &source_id, None).unwrap();

    let copy_id = service.copy(&owner(), &source_id, Some("11"), None).unwrap();

    assert_ne!(copy_id, source_id);
    assert!(copy_id.ends_with("_WC-11"));

    let source = service.get(&source_id).unwrap().unwrap();
    let copy = service.get(&copy_id).unwrap().unwrap();

    assert_ne!(copy.verification_token, source.verification_token);
    assert_eq!(copy.status, DocumentStatus::Active);
    assert!(!copy.is_locked);
    assert!(copy.cancelled_at.is_none());
    assert_eq!(copy.organization_id.as_deref(), Some("org-1"));
    assert_eq!(copy.field("warrantyNumber"), Some(&Value::from("11")));
    assert_eq!(copy.field("serialNumber"), source.field("serialNumber"));
    assert_eq!(copy.field("productName"), source.field("productName"));
}

#[test]
fn test_copy_onto_itself_is_refused() {
    let store = SqliteStore::new_in_memory().unwrap();
    let service = DocumentService::new(&store, &WARRANTY_CARD);
    let source_id = service.save(&owner(), &warranty_card("10"), None).unwrap();

    let result = service.copy(&owner(), &source_id, None, None);
    assert!(matches!(result, Err(DocumentError::InvalidRequest(_))));

    let result = service.copy(&owner(), &source_id, Some("WC-10"), None);
    assert!(matches!(result, Err(DocumentError::InvalidRequest(_))));
}

#[test]
fn test_copy_by_another_user_belongs_to_them() {
    let store = SqliteStore::new_in_memory().unwrap();
    let service = DocumentService::new(&store, &WARRANTY_CARD);
    let source_id = service.save(&owner(), &warranty_card("10"), None).unwrap();

    let colleague = Session::authenticated("colleague");
    let copy_id = service.copy(&colleague, &source_id, Some("12"), Some("org-2")).unwrap();

    let copy = service.get(&copy_id).unwrap().unwrap();
    assert_eq!(copy.user_id, "colleague");
    assert_eq!(copy.organization_id.as_deref(), Some("org-2"));
}
