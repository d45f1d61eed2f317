use onboard_core::{ErrorKind, OnboardingConfig, OnboardingError, SubmitStage};
use onboard_model::{FieldStatus, FieldValue, Stage, StageStatus};
use onboard_store::OnboardingStore;
use onboard_test_utils::{
    actor, auto_save, complete_payload, credential, final_submit, photo, raw, service, service_with,
    staff_member,
};
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn end_to_end_completion_and_flag_sync() {
    let (service, store) = service();
    let id = service.create_record(actor()).await.unwrap();

    let first = service
        .submit_stage(final_submit(id, Stage::Property, complete_payload(Stage::Property)))
        .await
        .unwrap();
    assert!(first.aggregate.stage(Stage::Property).is_complete);
    assert_eq!(first.aggregate.overall_percent, 10);
    assert_eq!(first.progress.status, StageStatus::Completed);
    assert_eq!(first.aggregate.current_stage, Stage::Owner);

    let second = service
        .submit_stage(auto_save(id, Stage::Credentials, raw(json!({"credentials": [credential("vrbo")]})), 0))
        .await
        .unwrap();
    assert_eq!(second.version, 1);
    assert!(second.aggregate.stage(Stage::Credentials).is_complete);
    assert_eq!(second.aggregate.overall_percent, 20);

    let read = service.aggregate_progress(id, Some(actor())).await.unwrap();
    assert_eq!(
        read.flags.set_stages().collect::<Vec<_>>(),
        vec![Stage::Property, Stage::Credentials]
    );
    let stored = store.snapshot(id).await.unwrap().flags;
    assert_eq!(stored, read.flags);
}

#[tokio::test]
async fn auto_save_versions_are_monotonic() {
    let (service, store) = service();
    let id = service.create_record(actor()).await.unwrap();

    for n in 0..4u64 {
        let outcome = service
            .submit_stage(auto_save(id, Stage::Contract, raw(json!({"minimumStay": n + 1})), n))
            .await
            .unwrap();
        assert_eq!(outcome.version, n + 1);
        assert_eq!(outcome.aggregate.version(Stage::Contract), n + 1);
    }

    let err = service
        .submit_stage(auto_save(id, Stage::Contract, raw(json!({"minimumStay": 9})), 1))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(
        err,
        OnboardingError::VersionConflict {
            record: id,
            stage: Stage::Contract,
            supplied: 1,
            current: 4,
        }
    );

    let snapshot = store.snapshot(id).await.unwrap();
    assert_eq!(snapshot.version(Stage::Contract), 4);
    assert_eq!(
        snapshot.value(Stage::Contract, "minimum_stay_nights"),
        Some(&FieldValue::Integer(4))
    );
}

#[tokio::test]
async fn scalar_submissions_preserve_omitted_fields() {
    let (service, store) = service();
    let id = service.create_record(actor()).await.unwrap();

    service
        .submit_stage(auto_save(id, Stage::Property, raw(json!({"city": "A", "country": "B"})), 0))
        .await
        .unwrap();
    service
        .submit_stage(auto_save(id, Stage::Property, raw(json!({"town": "X"})), 1))
        .await
        .unwrap();

    let section = store.snapshot(id).await.unwrap().section(Stage::Property).cloned().unwrap();
    assert_eq!(section.get("city"), Some(&FieldValue::Text("X".into())));
    assert_eq!(section.get("country"), Some(&FieldValue::Text("B".into())));
}

#[tokio::test]
async fn staff_batches_replace_by_natural_key() {
    let (service, store) = service();
    let id = service.create_record(actor()).await.unwrap();

    service
        .submit_stage(SubmitStage::new(
            id,
            7,
            raw(json!({"staff": [
                staff_member("A", Some("a@x.io"), "cleaner"),
                staff_member("B", Some("b@x.io"), "manager")
            ]})),
        ))
        .await
        .unwrap();
    let outcome = service
        .submit_stage(SubmitStage::new(
            id,
            7,
            raw(json!({"team": [
                staff_member("A", Some("A@X.io"), "manager"),
                staff_member("C", None, "security")
            ]})),
        ))
        .await
        .unwrap();

    let batch = outcome.report.batch().unwrap();
    assert_eq!((batch.created, batch.updated, batch.deactivated), (1, 1, 1));

    let snapshot = store.snapshot(id).await.unwrap();
    let mut active: Vec<_> = snapshot
        .active_entities(Stage::Staff)
        .map(|row| row.natural_key.clone())
        .collect();
    active.sort();
    assert_eq!(active, vec!["a@x.io".to_string(), "c".to_string()]);
}

#[tokio::test]
async fn completion_ignores_flags_set_by_hand() {
    let (service, store) = service();
    let id = service.create_record(actor()).await.unwrap();
    store.write_legacy_flag(id, Stage::Photos, true).await.unwrap();

    let before = service.aggregate_progress(id, None).await.unwrap();
    assert!(!before.stage(Stage::Photos).is_complete);
    assert_eq!(before.overall_percent, 0);

    let after = service
        .submit_stage(SubmitStage::new(id, 9, raw(json!({"photos": [photo("https://cdn.x.io/a.jpg")]}))))
        .await
        .unwrap();
    assert!(after.aggregate.stage(Stage::Photos).is_complete);
    assert_eq!(after.aggregate.overall_percent, 10);
}

#[tokio::test]
async fn flags_ratchet_when_data_is_removed() {
    let (service, _store) = service();
    let id = service.create_record(actor()).await.unwrap();

    let added = service
        .submit_stage(SubmitStage::new(id, 5, complete_payload(Stage::Credentials)))
        .await
        .unwrap();
    assert!(added.aggregate.flags.get(Stage::Credentials));

    let removed = service
        .submit_stage(SubmitStage::new(id, 5, raw(json!({"credentials": []}))))
        .await
        .unwrap();
    assert_eq!(removed.report.batch().unwrap().deactivated, 1);
    assert!(!removed.aggregate.stage(Stage::Credentials).is_complete);
    assert!(removed.aggregate.flags.get(Stage::Credentials));
}

#[tokio::test]
async fn flag_write_failure_does_not_fail_the_read() {
    let (service, store) = service();
    let id = service.create_record(actor()).await.unwrap();
    store.fail_flag_writes(true);

    let outcome = service
        .submit_stage(final_submit(id, Stage::Review, complete_payload(Stage::Review)))
        .await
        .unwrap();
    assert!(outcome.aggregate.stage(Stage::Review).is_complete);
    assert!(!outcome.aggregate.flags.get(Stage::Review));

    store.fail_flag_writes(false);
    let read = service.aggregate_progress(id, None).await.unwrap();
    assert!(read.flags.get(Stage::Review));
}

#[tokio::test]
async fn disabled_sync_reports_stored_flags() {
    let (service, store) = service_with(OnboardingConfig::new().with_flag_sync(false));
    let id = service.create_record(actor()).await.unwrap();

    let outcome = service
        .submit_stage(final_submit(id, Stage::Review, complete_payload(Stage::Review)))
        .await
        .unwrap();
    assert!(outcome.aggregate.stage(Stage::Review).is_complete);
    assert!(!outcome.aggregate.flags.get(Stage::Review));
    assert!(!store.snapshot(id).await.unwrap().flags.get(Stage::Review));
}

#[tokio::test]
async fn invalid_entities_do_not_block_valid_siblings() {
    let (service, store) = service();
    let id = service.create_record(actor()).await.unwrap();

    let outcome = service
        .submit_stage(SubmitStage::new(
            id,
            8,
            raw(json!({"amenities": [
                {"category": "Kitchen", "itemName": "Oven"},
                {"category": "Kitchen"},
                {"category": "Outdoor", "itemName": "Grill", "quantity": 2}
            ]})),
        ))
        .await
        .unwrap();

    let batch = outcome.report.batch().unwrap();
    assert_eq!((batch.created, batch.failed), (2, 1));
    assert_eq!(batch.errors[0].field, "amenities[1].item_name");
    assert_eq!(store.snapshot(id).await.unwrap().active_entities(Stage::Amenities).count(), 2);
    assert!(outcome.aggregate.stage(Stage::Amenities).is_complete);
}

#[tokio::test]
async fn failed_final_submit_keeps_typed_values_for_restoration() {
    let (service, store) = service();
    let id = service.create_record(actor()).await.unwrap();

    let err = service
        .submit_stage(final_submit(
            id,
            Stage::Owner,
            raw(json!({"firstName": "Marta", "email": "not-an-email", "taxId": "PT123456789"})),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let fields: Vec<_> = err.validation().unwrap().fields().map(str::to_string).collect();
    assert!(fields.contains(&"email".to_string()));
    assert!(fields.contains(&"last_name".to_string()));

    let snapshot = store.snapshot(id).await.unwrap();
    assert!(snapshot.section(Stage::Owner).is_none());
    assert_eq!(snapshot.version(Stage::Owner), 0);

    let restored = service.stage_fields(id, 2).await.unwrap();
    assert_eq!(restored.version, 0);
    let by_name = |name: &str| restored.fields.iter().find(|f| f.field == name).cloned().unwrap();
    assert_eq!(by_name("email").value, Some(json!("not-an-email")));
    assert_eq!(by_name("first_name").status, FieldStatus::Completed);
    assert_eq!(by_name("tax_id").value, Some(json!("••••6789")));
    assert_eq!(by_name("phone").status, FieldStatus::NotStarted);
}

#[tokio::test]
async fn skipped_stages_are_passed_over() {
    let (service, _store) = service();
    let id = service.create_record(actor()).await.unwrap();

    let outcome = service
        .submit_stage(SubmitStage::new(id, 1, raw(json!({"city": "Faro"}))).skipped().by(actor()))
        .await
        .unwrap();
    assert_eq!(outcome.progress.status, StageStatus::Skipped);
    assert!(outcome.aggregate.stage(Stage::Property).skipped);
    assert!(!outcome.aggregate.stage(Stage::Property).is_complete);
    assert_eq!(outcome.aggregate.current_stage, Stage::Owner);
    assert_eq!(
        outcome.aggregate.field(Stage::Property, "city").map(|f| f.status),
        Some(FieldStatus::Skipped)
    );
}

#[tokio::test]
async fn unknown_and_unavailable_records_are_typed() {
    let (service, store) = service();
    let missing = onboard_model::RecordId::new();
    let err = service.aggregate_progress(missing, None).await.unwrap_err();
    assert_eq!(err, OnboardingError::NotFound(missing));

    let id = service.create_record(actor()).await.unwrap();
    store.set_unavailable(true);
    let err = service
        .submit_stage(auto_save(id, Stage::Owner, raw(json!({"firstName": "X"})), 0))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn final_submit_without_a_valid_entity_does_not_complete() {
    let (service, store) = service();
    let id = service.create_record(actor()).await.unwrap();

    let err = service
        .submit_stage(final_submit(
            id,
            Stage::Staff,
            raw(json!({"staff": [staff_member("Ana", None, "pilot")]})),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(
        err.validation().unwrap().fields().collect::<Vec<_>>(),
        vec!["staff", "staff[0].role"]
    );

    let snapshot = store.snapshot(id).await.unwrap();
    assert!(snapshot.entities(Stage::Staff).is_empty());
    assert_ne!(
        snapshot.progress(Stage::Staff).map(|p| p.status),
        Some(StageStatus::Completed)
    );
}

#[tokio::test]
async fn auto_save_without_version_is_written() {
    let (service, _store) = service();
    let id = service.create_record(actor()).await.unwrap();

    for version in 0..3 {
        service
            .submit_stage(auto_save(id, Stage::Owner, raw(json!({"firstName": "Marta"})), version))
            .await
            .unwrap();
    }

    let mut unversioned = SubmitStage::new(id, 2, raw(json!({"lastName": "Lopes"}))).by(actor());
    unversioned.is_auto_save = true;
    let outcome = service.submit_stage(unversioned).await.unwrap();
    assert_eq!(outcome.version, 4);
}

#[tokio::test]
async fn commit_stands_when_the_aggregate_read_fails() {
    let (service, store) = service();
    let id = service.create_record(actor()).await.unwrap();

    store.fail_snapshots(true);
    let err = service
        .submit_stage(auto_save(id, Stage::Owner, raw(json!({"firstName": "Marta"})), 0))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Persistence);
    store.fail_snapshots(false);

    let fields = service.stage_fields(id, 2).await.unwrap();
    assert_eq!(fields.version, 1);

    let retry = service
        .submit_stage(auto_save(id, Stage::Owner, raw(json!({"lastName": "Lopes"})), fields.version))
        .await
        .unwrap();
    assert_eq!(retry.version, 2);
}
