//! Testing utilities for the onboarding workspace
//!
//! Shared payload fixtures, store seeding and service builders.

#![allow(missing_docs)]

use chrono::{TimeZone, Utc};
use onboard_core::{OnboardingConfig, OnboardingService, SubmitStage};
use onboard_model::{ActorId, FixedClock, OnboardingRecord, RecordId, Stage};
use onboard_schema::RawPayload;
use onboard_store::{Intent, MemoryStore, OnboardingStore, StageSubmission, StageWriter};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn raw(value: Value) -> RawPayload {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture payloads are objects, got {other}"),
    }
}

pub fn actor() -> ActorId {
    ActorId::new("agent-7")
}

/// A payload that passes final-submit validation, written with a mix of
/// canonical names and aliases
pub fn complete_payload(stage: Stage) -> RawPayload {
    raw(match stage {
        Stage::Property => json!({
            "propertyName": "Casa do Rio",
            "type": "villa",
            "address": "Rua das Flores 12",
            "city": "Porto",
            "country": "PT",
            "bedrooms": 3,
            "bathroomCount": "2.5",
            "maxGuests": 6
        }),
        Stage::Owner => json!({
            "firstName": "Marta",
            "lastName": "Lopes",
            "email": "Marta@Example.com",
            "phone": "+351 912 345 678",
            "taxId": "PT123456789"
        }),
        Stage::Contract => json!({
            "startDate": "2024-07-01",
            "commission": "18.5",
            "feeType": "percentage",
            "cancellationPolicy": "moderate"
        }),
        Stage::Banking => json!({
            "accountHolderName": "Marta Lopes",
            "bank": "Caixa Geral",
            "accountNumber": "0035 0001 2345 6789",
            "accountType": "checking"
        }),
        Stage::Credentials => json!({"credentials": [credential("airbnb")]}),
        Stage::Documents => json!({"documents": [document("deed", "deed.pdf")]}),
        Stage::Staff => json!({"staff": [staff_member("Ana Souza", Some("ana@example.com"), "cleaner")]}),
        Stage::Amenities => json!({"amenities": [amenity("Kitchen", "Oven", true)]}),
        Stage::Photos => json!({"photos": [photo("https://cdn.example.com/cover.jpg")]}),
        Stage::Review => json!({"acknowledged": true, "agreedToTerms": "yes"}),
    })
}

pub fn credential(platform: &str) -> Value {
    json!({
        "platform": platform,
        "username": "host@example.com",
        "password": "s3cret-pass",
        "listingUrl": format!("https://{platform}.example.com/rooms/1")
    })
}

pub fn document(kind: &str, file_name: &str) -> Value {
    json!({"documentType": kind, "fileName": file_name, "storageKey": format!("docs/{file_name}")})
}

pub fn staff_member(name: &str, email: Option<&str>, role: &str) -> Value {
    let mut member = json!({"name": name, "role": role});
    if let Some(email) = email {
        member["email"] = json!(email);
    }
    member
}

pub fn amenity(category: &str, item: &str, available: bool) -> Value {
    json!({"category": category, "itemName": item, "available": available})
}

pub fn photo(url: &str) -> Value {
    json!({"url": url})
}

pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()))
}

pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

pub async fn seed_record(store: &MemoryStore) -> RecordId {
    let record = OnboardingRecord::new(RecordId::new(), actor(), Utc::now());
    let id = record.id;
    store.insert_record(record).await.unwrap();
    id
}

pub fn writer(store: Arc<MemoryStore>) -> StageWriter {
    StageWriter::new(store, fixed_clock())
}

pub fn submission(
    record_id: RecordId,
    stage: Stage,
    payload: RawPayload,
    intent: Intent,
    version: Option<u64>,
) -> StageSubmission {
    StageSubmission {
        record_id,
        stage,
        payload,
        intent,
        version,
        actor: actor(),
    }
}

pub fn service() -> (OnboardingService, Arc<MemoryStore>) {
    service_with(OnboardingConfig::default())
}

pub fn service_with(config: OnboardingConfig) -> (OnboardingService, Arc<MemoryStore>) {
    let store = memory_store();
    let service = OnboardingService::new(store.clone(), config).with_clock(fixed_clock());
    (service, store)
}

pub fn auto_save(record_id: RecordId, stage: Stage, payload: RawPayload, version: u64) -> SubmitStage {
    SubmitStage::new(record_id, stage.ordinal().into(), payload)
        .auto_save(version)
        .by(actor())
}

pub fn final_submit(record_id: RecordId, stage: Stage, payload: RawPayload) -> SubmitStage {
    SubmitStage::new(record_id, stage.ordinal().into(), payload)
        .completed()
        .by(actor())
}
