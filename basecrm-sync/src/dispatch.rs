//! Record dispatch.
//!
//! Resolves each record's declared type to a caller-supplied consumer,
//! decodes the payload into that type and asks the consumer whether the
//! record was handled. Only a handled record is acknowledged; everything
//! else stays queued server-side for a later run or a newer client.

use basecrm_types::entities::{
    Account, AssociatedContact, Contact, Deal, DealSource, Lead, LeadSource, LossReason, Note,
    Pipeline, Source, Stage, Tag, Task, User,
};
use basecrm_types::{Attributes, Meta, Record, RecordType};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Consumer for one decoded record type. Returns whether the record was
/// consumed and may be acknowledged.
pub type Consumer<T> = Box<dyn FnMut(T) -> bool + Send>;

/// How a single record was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dispatch {
    /// The consumer took the record.
    Accepted,
    /// The consumer returned `false`.
    Declined,
    /// The declared type is newer than this client.
    UnsupportedType,
    /// No consumer is registered for the type.
    Unobserved,
    /// The payload did not decode into the registered type.
    DecodeFailed,
}

impl Dispatch {
    /// Whether the record's ack key should be sent back.
    pub fn should_ack(self) -> bool {
        self == Dispatch::Accepted
    }
}

/// Decides what happens to each fetched record.
pub trait RecordHandler: Send {
    fn handle(&mut self, record: &Record) -> Dispatch;
}

/// A record type that can be subscribed to on an [`ObserverRegistry`].
pub trait SyncEntity: DeserializeOwned + Send + 'static {
    /// The wire type this value decodes from.
    const RECORD_TYPE: RecordType;

    #[doc(hidden)]
    fn slot(registry: &mut ObserverRegistry) -> &mut Option<Consumer<Self>>;

    #[doc(hidden)]
    fn slot_ref(registry: &ObserverRegistry) -> &Option<Consumer<Self>>;
}

fn deliver<T: DeserializeOwned>(slot: &mut Option<Consumer<T>>, record: &Record) -> Dispatch {
    let Some(consumer) = slot.as_mut() else {
        return Dispatch::Unobserved;
    };

    match record.decode::<T>() {
        Ok(value) => {
            if consumer(value) {
                Dispatch::Accepted
            } else {
                Dispatch::Declined
            }
        }
        Err(e) => {
            debug!(
                record_type = %record.meta.record_type(),
                ack_key = %record.meta.ack_key(),
                error = %e,
                "Record payload did not decode, leaving it unacknowledged"
            );
            Dispatch::DecodeFailed
        }
    }
}

macro_rules! observer_registry {
    ($($variant:ident => $field:ident: $entity:ty),+ $(,)?) => {
        /// Typed consumers, one slot per supported record type.
        ///
        /// Built before a run and read-only while it is in progress.
        #[derive(Default)]
        pub struct ObserverRegistry {
            $($field: Option<Consumer<$entity>>,)+
        }

        $(
            impl SyncEntity for $entity {
                const RECORD_TYPE: RecordType = RecordType::$variant;

                fn slot(registry: &mut ObserverRegistry) -> &mut Option<Consumer<Self>> {
                    &mut registry.$field
                }

                fn slot_ref(registry: &ObserverRegistry) -> &Option<Consumer<Self>> {
                    &registry.$field
                }
            }
        )+

        impl ObserverRegistry {
            /// Returns true if no consumer has been registered.
            pub fn is_empty(&self) -> bool {
                true $(&& self.$field.is_none())+
            }

            /// Record types that currently have a consumer.
            pub fn subscribed(&self) -> Vec<RecordType> {
                let mut types = Vec::new();
                $(
                    if self.$field.is_some() {
                        types.push(RecordType::$variant);
                    }
                )+
                types
            }

            /// Routes one record to its consumer.
            pub fn dispatch(&mut self, record: &Record) -> Dispatch {
                match record.meta.record_type() {
                    $(RecordType::$variant => deliver(&mut self.$field, record),)+
                    RecordType::Unsupported(_) => Dispatch::UnsupportedType,
                }
            }
        }
    };
}

observer_registry! {
    Account => account: Account,
    AssociatedContact => associated_contact: AssociatedContact,
    Contact => contact: Contact,
    Deal => deal: Deal,
    DealSource => deal_source: DealSource,
    Lead => lead: Lead,
    LeadSource => lead_source: LeadSource,
    LossReason => loss_reason: LossReason,
    Note => note: Note,
    Pipeline => pipeline: Pipeline,
    Source => source: Source,
    Stage => stage: Stage,
    Tag => tag: Tag,
    Task => task: Task,
    User => user: User,
}

impl ObserverRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the consumer for `T`, replacing any earlier one.
    pub fn subscribe<T, F>(mut self, consumer: F) -> Self
    where
        T: SyncEntity,
        F: FnMut(T) -> bool + Send + 'static,
    {
        *T::slot(&mut self) = Some(Box::new(consumer));
        self
    }

    /// Whether a consumer is registered for `T`.
    pub fn is_subscribed<T: SyncEntity>(&self) -> bool {
        T::slot_ref(self).is_some()
    }
}

impl RecordHandler for ObserverRegistry {
    fn handle(&mut self, record: &Record) -> Dispatch {
        self.dispatch(record)
    }
}

/// Hands every record to a single predicate without decoding it.
pub struct RawHandler<F> {
    predicate: F,
}

impl<F> RawHandler<F>
where
    F: FnMut(&Meta, &Attributes) -> bool + Send,
{
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> RecordHandler for RawHandler<F>
where
    F: FnMut(&Meta, &Attributes) -> bool + Send,
{
    fn handle(&mut self, record: &Record) -> Dispatch {
        if (self.predicate)(&record.meta, &record.attributes) {
            Dispatch::Accepted
        } else {
            Dispatch::Declined
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basecrm_types::EventType;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn record(record_type: RecordType, ack_key: &str, data: serde_json::Value) -> Record {
        let attributes = match data {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        };
        Record::new(Meta::new(record_type, EventType::Created, ack_key), attributes)
    }

    #[test]
    fn accepted_record_is_acked() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut registry = ObserverRegistry::new().subscribe(move |c: Contact| {
            sink.lock().unwrap().push(c.id);
            true
        });

        let outcome = registry.dispatch(&record(RecordType::Contact, "c-1", json!({"id": 11})));
        assert_eq!(outcome, Dispatch::Accepted);
        assert!(outcome.should_ack());
        assert_eq!(*seen.lock().unwrap(), vec![11]);
    }

    #[test]
    fn declined_record_is_not_acked() {
        let mut registry = ObserverRegistry::new().subscribe(|_: Deal| false);
        let outcome = registry.dispatch(&record(RecordType::Deal, "d-1", json!({"id": 1})));
        assert_eq!(outcome, Dispatch::Declined);
        assert!(!outcome.should_ack());
    }

    #[test]
    fn unsupported_type_is_skipped() {
        let mut registry = ObserverRegistry::new().subscribe(|_: Contact| true);
        let outcome = registry.dispatch(&record(
            RecordType::Unsupported("visit".into()),
            "v-1",
            json!({"id": 1}),
        ));
        assert_eq!(outcome, Dispatch::UnsupportedType);
    }

    #[test]
    fn unobserved_type_is_skipped() {
        let mut registry = ObserverRegistry::new().subscribe(|_: Contact| true);
        let outcome = registry.dispatch(&record(RecordType::Lead, "l-1", json!({"id": 1})));
        assert_eq!(outcome, Dispatch::Unobserved);
    }

    #[test]
    fn malformed_payload_is_skipped_without_calling_consumer() {
        let called = Arc::new(Mutex::new(false));
        let flag = called.clone();
        let mut registry = ObserverRegistry::new().subscribe(move |_: Note| {
            *flag.lock().unwrap() = true;
            true
        });

        let outcome = registry.dispatch(&record(RecordType::Note, "n-1", json!({"id": "x"})));
        assert_eq!(outcome, Dispatch::DecodeFailed);
        assert!(!*called.lock().unwrap());
    }

    #[test]
    fn resubscribe_replaces_consumer() {
        let mut registry = ObserverRegistry::new()
            .subscribe(|_: Tag| false)
            .subscribe(|_: Tag| true);
        let outcome = registry.dispatch(&record(RecordType::Tag, "t-1", json!({"id": 3})));
        assert_eq!(outcome, Dispatch::Accepted);
        assert_eq!(registry.subscribed(), vec![RecordType::Tag]);
    }

    #[test]
    fn registry_emptiness() {
        let mut registry = ObserverRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.is_subscribed::<User>());

        registry = registry.subscribe(|_: User| true);
        assert!(!registry.is_empty());
        assert!(registry.is_subscribed::<User>());
        assert_eq!(<User as SyncEntity>::RECORD_TYPE, RecordType::User);
    }

    #[test]
    fn subscription_query_through_shared_reference() {
        fn subscribed_to_users(registry: &ObserverRegistry) -> bool {
            registry.is_subscribed::<User>()
        }

        let registry = ObserverRegistry::new().subscribe(|_: User| true);
        assert!(subscribed_to_users(&registry));
        assert!(!registry.is_subscribed::<Tag>());
    }

    #[test]
    fn raw_handler_sees_every_record() {
        let mut tags = Vec::new();
        {
            let mut handler = RawHandler::new(|meta: &Meta, attrs: &Attributes| {
                tags.push(meta.record_type().to_string());
                attrs.contains_key("id")
            });
            assert_eq!(
                handler.handle(&record(RecordType::Unsupported("visit".into()), "v", json!({"id": 1}))),
                Dispatch::Accepted
            );
            assert_eq!(
                handler.handle(&record(RecordType::Contact, "c", json!({}))),
                Dispatch::Declined
            );
        }
        assert_eq!(tags, vec!["visit".to_string(), "contact".to_string()]);
    }
}
