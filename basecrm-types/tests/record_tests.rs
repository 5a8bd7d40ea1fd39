use basecrm_types::entities::{Contact, Deal, Task};
use basecrm_types::{EventType, Queue, Record, RecordType, Session, SessionId};
use pretty_assertions::assert_eq;
use serde_json::json;

fn contact_item() -> serde_json::Value {
    json!({
        "data": {
            "id": 1,
            "name": "Mark Johnson",
            "first_name": "Mark",
            "last_name": "Johnson",
            "email": "mark@example.com",
            "tags": ["important"],
            "created_at": "2014-08-27T16:32:56Z"
        },
        "meta": {
            "type": "contact",
            "sync": {
                "event_type": "created",
                "ack_key": "Contact-1234-1",
                "revision": 1
            }
        }
    })
}

// ── RecordType ───────────────────────────────────────────────────

#[test]
fn record_type_known_tags() {
    for known in RecordType::SUPPORTED {
        let parsed: RecordType = known.as_str().parse().unwrap();
        assert_eq!(parsed, known);
        assert!(parsed.is_supported());
    }
}

#[test]
fn record_type_unknown_tag_is_preserved() {
    let parsed: RecordType = serde_json::from_str("\"visit_outcome\"").unwrap();
    assert_eq!(parsed, RecordType::Unsupported("visit_outcome".into()));
    assert!(!parsed.is_supported());
    assert_eq!(parsed.to_string(), "visit_outcome");
    assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"visit_outcome\"");
}

#[test]
fn record_type_wire_tags() {
    assert_eq!(RecordType::AssociatedContact.as_str(), "associated_contact");
    assert_eq!(RecordType::LossReason.to_string(), "loss_reason");
    assert_eq!(serde_json::to_string(&RecordType::Deal).unwrap(), "\"deal\"");
}

// ── Record ───────────────────────────────────────────────────────

#[test]
fn record_parses_wire_item() {
    let record: Record = serde_json::from_value(contact_item()).unwrap();
    assert_eq!(record.meta.record_type(), &RecordType::Contact);
    assert_eq!(record.meta.event_type(), EventType::Created);
    assert_eq!(record.meta.ack_key().as_str(), "Contact-1234-1");
    assert_eq!(record.meta.sync.revision, Some(1));
    assert_eq!(record.attributes["name"], json!("Mark Johnson"));
}

#[test]
fn record_unknown_event_type() {
    let mut item = contact_item();
    item["meta"]["sync"]["event_type"] = json!("merged");
    let record: Record = serde_json::from_value(item).unwrap();
    assert_eq!(record.meta.event_type(), EventType::Unknown);
}

#[test]
fn record_without_event_type_defaults_to_unknown() {
    let mut item = contact_item();
    item["meta"]["sync"]
        .as_object_mut()
        .unwrap()
        .remove("event_type");
    let record: Record = serde_json::from_value(item).unwrap();
    assert_eq!(record.meta.event_type(), EventType::Unknown);
    assert_eq!(record.meta.ack_key().as_str(), "Contact-1234-1");
}

#[test]
fn record_without_ack_key_is_rejected() {
    let item = json!({ "data": {}, "meta": { "type": "contact", "sync": { "event_type": "created" } } });
    assert!(serde_json::from_value::<Record>(item).is_err());
}

#[test]
fn record_decodes_typed_value() {
    let record: Record = serde_json::from_value(contact_item()).unwrap();
    let contact: Contact = record.decode().unwrap();
    assert_eq!(contact.id, 1);
    assert_eq!(contact.first_name.as_deref(), Some("Mark"));
    assert_eq!(contact.tags, vec!["important".to_string()]);
    assert!(!contact.is_organization);
    assert!(contact.created_at.is_some());
}

#[test]
fn record_decode_failure_is_an_error() {
    let mut item = contact_item();
    item["data"]["id"] = json!("not-a-number");
    let record: Record = serde_json::from_value(item).unwrap();
    assert!(record.decode::<Contact>().is_err());
}

#[test]
fn deleted_event_with_only_id_decodes() {
    let item = json!({
        "data": { "id": 42 },
        "meta": { "type": "deal", "sync": { "event_type": "deleted", "ack_key": "Deal-42-7" } }
    });
    let record: Record = serde_json::from_value(item).unwrap();
    let deal: Deal = record.decode().unwrap();
    assert_eq!(deal.id, 42);
    assert!(deal.name.is_none());
    assert!(deal.tags.is_empty());
}

#[test]
fn task_timestamps_decode() {
    let item = json!({
        "data": {
            "id": 7,
            "content": "Call back",
            "completed": true,
            "due_date": "2024-03-01T10:00:00Z"
        },
        "meta": { "type": "task", "sync": { "event_type": "updated", "ack_key": "Task-7-2" } }
    });
    let record: Record = serde_json::from_value(item).unwrap();
    let task: Task = record.decode().unwrap();
    assert!(task.completed);
    assert_eq!(task.due_date.unwrap().to_rfc3339(), "2024-03-01T10:00:00+00:00");
}

// ── Session / Queue ──────────────────────────────────────────────

#[test]
fn session_accessors() {
    let session = Session::new(
        SessionId::new("s-1").unwrap(),
        vec![Queue::new("main", 2, 150), Queue::new("secondary", 1, 5)],
    );
    assert_eq!(session.id().as_str(), "s-1");
    assert_eq!(session.queues().len(), 2);
    assert_eq!(session.queues()[0].name(), "main");
    assert_eq!(session.queue("main").unwrap().page_count(), 2);
    assert!(session.queue("missing").is_none());
    assert_eq!(session.total_record_count(), 155);
}

#[test]
fn session_total_saturates_on_huge_counts() {
    let session = Session::new(
        SessionId::new("s-1").unwrap(),
        vec![Queue::new("main", 1, u64::MAX), Queue::new("secondary", 1, 1)],
    );
    assert_eq!(session.total_record_count(), u64::MAX);
}
