//! Integration tests for the directory core.

use std::sync::Arc;

use async_trait::async_trait;
use directory_core::{
    Code, DirectoryConfig, DirectoryEndpoint, DirectoryQueryService, IngestionPipeline,
    MemoryChannel, MemoryRecorder, MemoryStore, Store, StoreError, UsageEvent, UsageRecorder,
};
use directory_schema::{App, DeviceAttributes};
use directory_schema::api::{
    AppListingView, CompatibilityLevel, GetAppDownloadInfoRequest, GetAppListingRequest,
    GetUpdateInfoRequest, ListAppListingsRequest,
};
use directory_schema::events::{InboundEvent, OutboundEvent};
use serde_json::Value;

const APP_ID: &str = "app.accrescent.client";
const BASE_URL: &str = "https://artifacts.example.com";

fn publication() -> Value {
    serde_json::from_str(include_str!("data/accrescent_publication.json")).unwrap()
}

fn publication_for(app_id: &str) -> Value {
    let mut event = publication();
    event["app"]["app_id"] = Value::String(app_id.to_string());
    event
}

fn pixel_emulator() -> DeviceAttributes {
    DeviceAttributes {
        supported_abis: vec!["x86_64".into(), "arm64-v8a".into()],
        supported_locales: vec!["en-US".into()],
        device_features: vec!["android.hardware.camera".into(), "reqGlEsVersion=0x30002".into()],
        screen_density: Some(420),
        sdk_version: Some(35),
        codename: Some("REL".into()),
        ..DeviceAttributes::default()
    }
}

fn armv7_phone() -> DeviceAttributes {
    DeviceAttributes {
        supported_abis: vec!["armeabi-v7a".into()],
        ..pixel_emulator()
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    channel: Arc<MemoryChannel>,
    recorder: Arc<MemoryRecorder>,
    pipeline: IngestionPipeline<MemoryStore, MemoryChannel>,
    service: DirectoryQueryService<MemoryStore>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let channel = Arc::new(MemoryChannel::new(4));
    let recorder = Arc::new(MemoryRecorder::new());
    let config = DirectoryConfig {
        artifacts_base_url: format!("{BASE_URL}/"),
        ..DirectoryConfig::default()
    };
    Harness {
        pipeline: IngestionPipeline::new(store.clone(), channel.clone()),
        service: DirectoryQueryService::new(store.clone(), recorder.clone(), config),
        store,
        channel,
        recorder,
    }
}

impl Harness {
    async fn ingest(&self, events: &[Value]) {
        for event in events {
            self.channel.push_raw(serde_json::to_vec(event).unwrap()).unwrap();
        }
        self.pipeline.run().await.unwrap();
    }

    /// Rewrites the stored app behind the pipeline's back.
    async fn tamper(&self, edit: impl FnOnce(&mut App)) {
        let mut app = self
            .store
            .read(|txn| txn.get_app(APP_ID))
            .await
            .unwrap()
            .expect("app is stored");
        edit(&mut app);
        self.store.replace_app(&app).await.unwrap();
    }

    async fn listing_error(&self, device: Option<DeviceAttributes>) -> directory_core::Status {
        self.service
            .get_app_listing(GetAppListingRequest {
                app_id: Some(APP_ID.into()),
                device_attributes: device,
                ..GetAppListingRequest::default()
            })
            .await
            .unwrap_err()
    }

    async fn download_error(&self) -> directory_core::Status {
        self.service
            .get_app_download_info(GetAppDownloadInfoRequest {
                app_id: Some(APP_ID.into()),
                device_attributes: Some(pixel_emulator()),
                ..GetAppDownloadInfoRequest::default()
            })
            .await
            .unwrap_err()
    }
}

#[tokio::test]
async fn test_listing_for_compatible_device() {
    let h = harness();
    h.ingest(&[publication()]).await;

    let listing = h
        .service
        .get_app_listing(GetAppListingRequest {
            app_id: Some(APP_ID.into()),
            device_attributes: Some(pixel_emulator()),
            country_code: Some("US".into()),
            ..GetAppListingRequest::default()
        })
        .await
        .unwrap()
        .listing;

    assert_eq!(listing.language, "en");
    assert_eq!(listing.name, "Accrescent");
    assert_eq!(
        listing.icon.url,
        "https://artifacts.example.com/57297a7-6f2c-4a04-9656-497af21bf6b2"
    );
    assert_eq!(listing.version_name.as_deref(), Some("0.25.0"));
    assert_eq!(
        listing.compatibility.map(|c| c.level),
        Some(CompatibilityLevel::Compatible)
    );
    assert_eq!(listing.download_size.map(|s| s.uncompressed_total), Some(4_648_720));

    let events = h.recorder.events();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        UsageEvent::ListingView { language, device_sdk_version: Some(35), .. } if language == "en"
    ));
}

#[tokio::test]
async fn test_listing_language_follows_preferences() {
    let h = harness();
    h.ingest(&[publication()]).await;

    let request = |preferred: &[&str]| GetAppListingRequest {
        app_id: Some(APP_ID.into()),
        preferred_languages: preferred.iter().map(ToString::to_string).collect(),
        ..GetAppListingRequest::default()
    };

    let german = h.service.get_app_listing(request(&["fr", "de"])).await.unwrap().listing;
    assert_eq!(german.language, "de");
    assert!(german.compatibility.is_none());
    assert!(german.download_size.is_none());

    let fallback = h.service.get_app_listing(request(&["de-AT"])).await.unwrap().listing;
    assert_eq!(fallback.language, "en");
}

#[tokio::test]
async fn test_listing_for_incompatible_device() {
    let h = harness();
    h.ingest(&[publication()]).await;

    let listing = h
        .service
        .get_app_listing(GetAppListingRequest {
            app_id: Some(APP_ID.into()),
            device_attributes: Some(armv7_phone()),
            ..GetAppListingRequest::default()
        })
        .await
        .unwrap()
        .listing;
    assert_eq!(
        listing.compatibility.map(|c| c.level),
        Some(CompatibilityLevel::Incompatible)
    );
    assert!(listing.download_size.is_none());
}

#[tokio::test]
async fn test_unknown_app_listing_is_not_found() {
    let h = harness();
    let err = h
        .service
        .get_app_listing(GetAppListingRequest {
            app_id: Some("com.example.missing".into()),
            ..GetAppListingRequest::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.code, Code::NotFound);
    assert_eq!(err.message, "app with ID com.example.missing not found");

    let err = h
        .service
        .get_app_listing(GetAppListingRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.code, Code::InvalidArgument);
}

#[tokio::test]
async fn test_download_info_for_emulator() {
    let h = harness();
    h.ingest(&[publication()]).await;

    let info = h
        .service
        .get_app_download_info(GetAppDownloadInfoRequest {
            app_id: Some(APP_ID.into()),
            device_attributes: Some(pixel_emulator()),
            ..GetAppDownloadInfoRequest::default()
        })
        .await
        .unwrap()
        .app_download_info;

    assert_eq!(info.download_size, 4_648_720);
    let mut splits: Vec<(u64, &str)> = info
        .split_download_info
        .iter()
        .map(|split| (split.download_size, split.url.as_str()))
        .collect();
    splits.sort();
    assert_eq!(splits, vec![
        (
            44_897,
            "https://artifacts.example.com/a4f60d94-e402-475d-9e6e-f4585ef13da2"
        ),
        (
            45_514,
            "https://artifacts.example.com/d24e0b69-a011-42ed-835e-17d1557fd10a"
        ),
        (
            4_558_309,
            "https://artifacts.example.com/38119a8c-1163-4c7d-89c6-cc5c902a6ca1"
        ),
    ]);

    assert!(matches!(
        h.recorder.events().as_slice(),
        [UsageEvent::Download { version_code: 49, download_kind, .. }]
            if download_kind.as_str() == "initial"
    ));
}

#[tokio::test]
async fn test_download_info_errors() {
    let h = harness();
    h.ingest(&[publication()]).await;

    let missing_device = h
        .service
        .get_app_download_info(GetAppDownloadInfoRequest {
            app_id: Some(APP_ID.into()),
            ..GetAppDownloadInfoRequest::default()
        })
        .await
        .unwrap_err();
    assert_eq!(missing_device.code, Code::InvalidArgument);
    assert_eq!(missing_device.message, "device attributes are missing but required");

    let unknown = h
        .service
        .get_app_download_info(GetAppDownloadInfoRequest {
            app_id: Some("com.example.missing".into()),
            device_attributes: Some(pixel_emulator()),
            ..GetAppDownloadInfoRequest::default()
        })
        .await
        .unwrap_err();
    assert_eq!(unknown.code, Code::NotFound);

    let incompatible = h
        .service
        .get_app_download_info(GetAppDownloadInfoRequest {
            app_id: Some(APP_ID.into()),
            device_attributes: Some(armv7_phone()),
            base_version_code: Some(40),
            ..GetAppDownloadInfoRequest::default()
        })
        .await
        .unwrap_err();
    assert_eq!(incompatible.code, Code::NotFound);
    assert_eq!(
        incompatible.message,
        "no download information matches the provided device attributes"
    );
    assert!(h.recorder.events().is_empty());
}

#[tokio::test]
async fn test_update_info() {
    let h = harness();
    h.ingest(&[publication()]).await;

    let check = |base: Option<u32>, device: Option<DeviceAttributes>| GetUpdateInfoRequest {
        app_id: Some(APP_ID.into()),
        base_version_code: base,
        device_attributes: device,
        ..GetUpdateInfoRequest::default()
    };

    let older = h.service.get_update_info(check(Some(48), Some(pixel_emulator()))).await.unwrap();
    let update = older.update_info.unwrap();
    assert_eq!(
        update.compatibility.map(|c| c.level),
        Some(CompatibilityLevel::Compatible)
    );

    let without_device = h.service.get_update_info(check(Some(48), None)).await.unwrap();
    assert!(without_device.update_info.unwrap().compatibility.is_none());

    let current = h.service.get_update_info(check(Some(49), Some(pixel_emulator()))).await.unwrap();
    assert!(current.update_info.is_none());

    let missing = h.service.get_update_info(check(None, None)).await.unwrap_err();
    assert_eq!(missing.code, Code::InvalidArgument);

    assert_eq!(h.recorder.events().len(), 3);
    assert!(h.recorder.events().iter().all(|event| matches!(
        event,
        UsageEvent::UpdateCheck { release_channel, .. } if release_channel == "well_known_stable"
    )));
}

#[tokio::test]
async fn test_pagination_visits_every_app_once() {
    let h = harness();
    let ids: Vec<String> = (0..7).map(|i| format!("com.example.app{i}")).collect();
    let events: Vec<Value> = ids.iter().rev().map(|id| publication_for(id)).collect();
    h.ingest(&events).await;

    let mut seen = Vec::new();
    let mut token = None;
    loop {
        let page = h
            .service
            .list_app_listings(ListAppListingsRequest {
                page_size: Some(3),
                page_token: token.take(),
                ..ListAppListingsRequest::default()
            })
            .await
            .unwrap();
        assert!(page.listings.len() <= 3);
        seen.extend(page.listings.into_iter().map(|listing| listing.app_id));
        match page.next_page_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }
    assert_eq!(seen, ids);
}

#[tokio::test]
async fn test_listing_page_views_and_filtering() {
    let h = harness();
    h.ingest(&[publication(), publication_for("com.example.other")]).await;

    let basic = h
        .service
        .list_app_listings(ListAppListingsRequest {
            device_attributes: Some(pixel_emulator()),
            ..ListAppListingsRequest::default()
        })
        .await
        .unwrap();
    assert_eq!(basic.listings.len(), 2);
    assert!(basic.listings.iter().all(|l| l.version_name.is_none() && l.download_size.is_none()));

    let full = h
        .service
        .list_app_listings(ListAppListingsRequest {
            device_attributes: Some(pixel_emulator()),
            view: Some(AppListingView::Full),
            skip: Some(1),
            ..ListAppListingsRequest::default()
        })
        .await
        .unwrap();
    assert_eq!(full.listings.len(), 1);
    assert_eq!(full.listings[0].app_id, "com.example.other");
    assert_eq!(full.listings[0].version_name.as_deref(), Some("0.25.0"));
    assert_eq!(
        full.listings[0].download_size.map(|s| s.uncompressed_total),
        Some(4_648_720)
    );

    let filtered = h
        .service
        .list_app_listings(ListAppListingsRequest {
            device_attributes: Some(armv7_phone()),
            ..ListAppListingsRequest::default()
        })
        .await
        .unwrap();
    assert!(filtered.listings.is_empty());
    assert!(filtered.next_page_token.is_some());
}

#[tokio::test]
async fn test_invalid_page_token() {
    let h = harness();
    let err = h
        .service
        .list_app_listings(ListAppListingsRequest {
            page_token: Some("%%%".into()),
            ..ListAppListingsRequest::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.code, Code::InvalidArgument);
    assert_eq!(err.message, "provided page token is invalid");
}

#[tokio::test]
async fn test_republishing_is_idempotent() {
    let h = harness();
    h.ingest(&[publication()]).await;
    let first = h.store.read(|txn| txn.get_app(APP_ID)).await.unwrap();
    h.ingest(&[publication()]).await;
    let second = h.store.read(|txn| txn.get_app(APP_ID)).await.unwrap();

    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(h.store.len(), 1);
    let published = h.channel.published();
    assert_eq!(published.len(), 2);
    assert_eq!(published[0], published[1]);
}

#[tokio::test]
async fn test_bad_messages_are_dead_lettered() {
    let h = harness();
    let mut no_stable = publication();
    no_stable["app"]["package_metadata"] = Value::Array(vec![]);
    let mut no_name = publication();
    no_name["app"]["listings"][1]["name"] = Value::Null;

    h.channel.push_raw("{\"type\":\"app_deleted\"}").unwrap();
    h.channel.push_raw(serde_json::to_vec(&no_stable).unwrap()).unwrap();
    h.channel.push_raw(serde_json::to_vec(&publication()).unwrap()).unwrap();
    h.channel.push_raw(serde_json::to_vec(&no_name).unwrap()).unwrap();
    h.channel.push_raw("not json").unwrap();

    let report = h.pipeline.run().await.unwrap();
    assert_eq!(report.published, 1);
    assert_eq!(report.rejected, 4);

    let reasons: Vec<String> = h.channel.dead_letters().into_iter().map(|(_, r)| r).collect();
    assert!(reasons[0].starts_with("malformed event"));
    assert_eq!(reasons[1], "stable channel metadata must be provided");
    assert_eq!(reasons[2], "all listings must specify a name");
    assert!(reasons[3].starts_with("malformed event"));

    let mut acked = h.channel.acked();
    acked.sort_unstable();
    assert_eq!(acked, vec![0, 1, 2, 3, 4]);

    match h.channel.published().as_slice() {
        [OutboundEvent::AppPublished(published)] => {
            assert_eq!(published.app.app_id.as_deref(), Some(APP_ID));
            assert_eq!(published.app.listings.len(), 2);
        }
        other => panic!("unexpected confirmations: {other:?}"),
    }
}

#[tokio::test]
async fn test_edit_publication_is_confirmed_with_its_id() {
    let h = harness();
    let edit = serde_json::json!({
        "type": "app_edit_publication_requested",
        "edit": { "id": "edit-1", "app": publication()["app"].clone() }
    });
    let event: InboundEvent = serde_json::from_value(edit).unwrap();
    let confirmation = h.pipeline.publish(&event).await.unwrap();
    match confirmation {
        OutboundEvent::AppEditPublished(published) => {
            assert_eq!(published.edit.id.as_deref(), Some("edit-1"));
        }
        OutboundEvent::AppPublished(_) => panic!("expected an edit confirmation"),
    }
    assert_eq!(h.store.len(), 1);
}

struct FailingRecorder;

#[async_trait]
impl UsageRecorder for FailingRecorder {
    async fn record(&self, _event: UsageEvent) -> Result<(), StoreError> {
        Err(StoreError::Closed)
    }
}

#[tokio::test]
async fn test_usage_failure_does_not_fail_queries() {
    let h = harness();
    h.ingest(&[publication()]).await;
    let service = DirectoryQueryService::new(
        h.store.clone(),
        Arc::new(FailingRecorder),
        DirectoryConfig::default(),
    );
    let response = service
        .get_update_info(GetUpdateInfoRequest {
            app_id: Some(APP_ID.into()),
            base_version_code: Some(1),
            ..GetUpdateInfoRequest::default()
        })
        .await
        .unwrap();
    assert!(response.update_info.is_some());
}

#[tokio::test]
async fn test_undecodable_manifest_is_internal() {
    let h = harness();
    h.ingest(&[publication()]).await;
    h.tamper(|app| app.release_channels[0].manifest = vec![0xff; 8]).await;

    assert_eq!(h.listing_error(Some(pixel_emulator())).await.code, Code::Internal);
    assert_eq!(h.download_error().await.code, Code::Internal);
    let update = h
        .service
        .get_update_info(GetUpdateInfoRequest {
            app_id: Some(APP_ID.into()),
            base_version_code: Some(1),
            device_attributes: Some(pixel_emulator()),
            ..GetUpdateInfoRequest::default()
        })
        .await
        .unwrap_err();
    assert_eq!(update.code, Code::Internal);

    // Without a device the manifest is never read.
    assert!(
        h.service
            .get_app_listing(GetAppListingRequest {
                app_id: Some(APP_ID.into()),
                ..GetAppListingRequest::default()
            })
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_selected_split_without_artifact_is_internal() {
    let h = harness();
    h.ingest(&[publication()]).await;
    h.tamper(|app| {
        app.release_channels[0]
            .artifacts
            .retain(|artifact| artifact.id != "d24e0b69-a011-42ed-835e-17d1557fd10a");
    })
    .await;

    let err = h.download_error().await;
    assert_eq!(err.code, Code::Internal);
    assert!(err.message.contains("d24e0b69-a011-42ed-835e-17d1557fd10a"));
    assert_eq!(h.listing_error(Some(pixel_emulator())).await.code, Code::Internal);
    assert!(h.recorder.events().is_empty());
}

#[tokio::test]
async fn test_missing_stable_channel_is_internal() {
    let h = harness();
    h.ingest(&[publication()]).await;
    h.tamper(|app| app.release_channels.clear()).await;

    let err = h.listing_error(None).await;
    assert_eq!(err.code, Code::Internal);
    assert_eq!(err.message, format!("app with ID {APP_ID} has no release channels"));

    let page = h
        .service
        .list_app_listings(ListAppListingsRequest::default())
        .await
        .unwrap_err();
    assert_eq!(page.code, Code::Internal);
}

#[tokio::test]
async fn test_missing_default_listing_is_internal() {
    let h = harness();
    h.ingest(&[publication()]).await;
    h.tamper(|app| app.default_listing_language = "fr".into()).await;

    let err = h.listing_error(None).await;
    assert_eq!(err.code, Code::Internal);
    assert_eq!(
        err.message,
        format!("app with ID {APP_ID} has no listing in its default language")
    );
}
