use serde_json::json;

use crate::common::{TestApp, routes};

const HELLO_MD5: &str = "5eb63bbbe01eeed093cb22bb8f5acdc3";
const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

mod registration {
    use super::*;

    #[tokio::test]
    async fn register_creates_pending_record() {
        let app = TestApp::spawn().await;

        let res = app
            .post(
                routes::RECORDS,
                &json!({
                    "owner_id": 7,
                    "stored_path": "/archive/notes.txt",
                    "original_name": "notes.txt",
                    "location_kind": "local",
                    "notes": "first copy",
                }),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["status"], "pending");
        assert_eq!(res.body["owner_id"], 7);
        assert_eq!(res.body["size_bytes"], 0);
        assert_eq!(res.body["size_display"], "0 B");
        assert_eq!(res.body["mime_type"], "text/plain");
        assert_eq!(res.body["location_display"], "Local Disk");
        assert!(res.body["checksum_sha256"].is_null());
        assert!(res.body["last_verified_at"].is_null());
    }

    #[tokio::test]
    async fn blank_path_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post(
                routes::RECORDS,
                &json!({
                    "owner_id": 1,
                    "stored_path": "   ",
                    "original_name": "a.bin",
                    "location_kind": "local",
                }),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn malformed_body_is_a_validation_error() {
        let app = TestApp::spawn().await;

        let res = app.post_raw(routes::RECORDS, "{\"owner_id\": ").await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");

        let res = app
            .post(
                routes::RECORDS,
                &json!({
                    "owner_id": 1,
                    "stored_path": "/a",
                    "original_name": "a",
                    "location_kind": "floppy",
                }),
            )
            .await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn unknown_record_is_not_found() {
        let app = TestApp::spawn().await;
        let res = app
            .get(&routes::record("0190b3a0-0000-7000-8000-000000000000"))
            .await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod checksum {
    use super::*;

    #[tokio::test]
    async fn checksum_moves_record_to_stored() {
        let app = TestApp::spawn().await;
        app.write_blob("hello.txt", b"hello world");
        let id = app.register(1, "hello.txt").await;

        let res = app.post(&routes::checksum(&id), &json!({})).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "stored");
        assert_eq!(res.body["checksum_md5"], HELLO_MD5);
        assert_eq!(res.body["checksum_sha256"], HELLO_SHA256);
        assert_eq!(res.body["size_bytes"], 11);
        assert!(res.body["last_verified_at"].is_null());
    }

    #[tokio::test]
    async fn unreadable_blob_leaves_record_pending() {
        let app = TestApp::spawn().await;
        let id = app.register(1, "never-written.bin").await;

        let res = app.post(&routes::checksum(&id), &json!({})).await;
        assert_eq!(res.status, 422);
        assert_eq!(res.body["code"], "SOURCE_UNREADABLE");

        let res = app.get(&routes::record(&id)).await;
        assert_eq!(res.body["status"], "pending");
        assert!(res.body["checksum_md5"].is_null());
    }
}

mod verification {
    use super::*;

    #[tokio::test]
    async fn unchanged_blob_verifies() {
        let app = TestApp::spawn().await;
        let id = app.stored(1, "hello.txt", b"hello world").await;

        for kind in ["sha256", "md5"] {
            let res = app
                .post(&routes::verify(&id), &json!({ "checksum_type": kind }))
                .await;
            assert_eq!(res.status, 200, "{}", res.text);
            assert_eq!(res.body["outcome"], "verified");
            assert_eq!(res.body["checksum_kind"], kind);
            assert!(res.body["error"].is_null());
        }

        let res = app.get(&routes::record(&id)).await;
        assert_eq!(res.body["status"], "verified");
        assert_eq!(res.body["last_verification_method"], "md5");
        assert!(!res.body["last_verified_at"].is_null());
    }

    #[tokio::test]
    async fn modified_blob_is_corrupted() {
        let app = TestApp::spawn().await;
        let id = app.stored(1, "hello.txt", b"hello world").await;
        app.write_blob("hello.txt", b"hello World");

        let res = app.post(&routes::verify(&id), &json!({})).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["outcome"], "corrupted");
        let error = res.body["error"].as_str().unwrap();
        assert!(
            error.starts_with(&format!("sha256 mismatch: expected {HELLO_SHA256}, got ")),
            "{error}"
        );

        let res = app.get(&routes::record(&id)).await;
        assert_eq!(res.body["status"], "corrupted");
        assert_eq!(res.body["checksum_sha256"], HELLO_SHA256);
        assert_eq!(res.body["size_bytes"], 11);
    }

    #[tokio::test]
    async fn deleted_blob_is_missing() {
        let app = TestApp::spawn().await;
        let id = app.stored(1, "hello.txt", b"hello world").await;
        app.remove_blob("hello.txt");

        let res = app.post(&routes::verify(&id), &json!({})).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["outcome"], "missing");
        assert_eq!(res.body["status"], "missing");

        let res = app.get(&routes::record(&id)).await;
        assert_eq!(res.body["checksum_md5"], HELLO_MD5);
        assert!(!res.body["verification_error"].is_null());
    }

    #[tokio::test]
    async fn restored_blob_verifies_again() {
        let app = TestApp::spawn().await;
        let id = app.stored(1, "hello.txt", b"hello world").await;
        app.remove_blob("hello.txt");
        app.post(&routes::verify(&id), &json!({})).await;

        app.write_blob("hello.txt", b"hello world");
        let res = app.post(&routes::verify(&id), &json!({})).await;
        assert_eq!(res.body["outcome"], "verified");

        let res = app.get(&routes::record(&id)).await;
        assert!(res.body["verification_error"].is_null());
    }

    #[tokio::test]
    async fn readable_blob_without_checksums_conflicts() {
        let app = TestApp::spawn().await;
        app.write_blob("raw.bin", b"raw");
        let id = app.register(1, "raw.bin").await;

        let res = app.post(&routes::verify(&id), &json!({})).await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CHECKSUM_NOT_COMPUTED");
    }

    #[tokio::test]
    async fn mark_verified_records_asserted_method() {
        let app = TestApp::spawn().await;
        let raw = app.register(1, "raw.bin").await;
        let res = app.post(&routes::mark_verified(&raw), &json!({})).await;
        assert_eq!(res.status, 409);

        let id = app.stored(1, "hello.txt", b"hello world").await;
        app.remove_blob("hello.txt");
        let res = app.post(&routes::mark_verified(&id), &json!({})).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "verified");
        assert_eq!(res.body["last_verification_method"], "asserted");
    }
}

mod batch {
    use super::*;

    #[tokio::test]
    async fn batch_reports_every_outcome() {
        let app = TestApp::spawn().await;
        let good = app.stored(1, "good.bin", b"good").await;
        let bad = app.stored(1, "bad.bin", b"bad").await;
        let gone = app.stored(1, "gone.bin", b"gone").await;
        app.write_blob("bad.bin", b"BAD");
        app.remove_blob("gone.bin");

        let res = app
            .post(
                routes::VERIFY_BATCH,
                &json!({ "ids": [good, bad, gone], "concurrency": 2 }),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["total"], 3);
        assert_eq!(res.body["verified"], 1);
        assert_eq!(res.body["corrupted"], 1);
        assert_eq!(res.body["missing"], 1);
        assert_eq!(res.body["skipped"], 0);

        let details = res.body["details"].as_array().unwrap();
        assert_eq!(details[0]["record_id"], good.as_str());
        assert_eq!(details[1]["outcome"], "corrupted");
        assert_eq!(details[2]["outcome"], "missing");
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let app = TestApp::spawn().await;
        let res = app.post(routes::VERIFY_BATCH, &json!({ "ids": [] })).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unknown_id_fails_whole_batch() {
        let app = TestApp::spawn().await;
        let id = app.stored(1, "a.bin", b"a").await;

        let res = app
            .post(
                routes::VERIFY_BATCH,
                &json!({ "ids": [id, "0190b3a0-0000-7000-8000-000000000000"] }),
            )
            .await;
        assert_eq!(res.status, 404);

        let res = app.get(&routes::record(&id)).await;
        assert_eq!(res.body["status"], "stored");
    }
}

mod queries {
    use super::*;

    #[tokio::test]
    async fn list_filters_and_paginates() {
        let app = TestApp::spawn().await;
        app.stored(1, "photos.tar", b"photos").await;
        app.stored(1, "videos.tar", b"videos").await;
        app.register(2, "later.tar").await;

        let res = app.get(routes::RECORDS).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["pagination"]["total"], 3);
        assert_eq!(res.body["data"][0]["original_name"], "later.tar");

        let res = app.get(&format!("{}?status=stored", routes::RECORDS)).await;
        assert_eq!(res.body["pagination"]["total"], 2);

        let res = app.get(&format!("{}?owner_id=2", routes::RECORDS)).await;
        assert_eq!(res.body["pagination"]["total"], 1);

        let res = app.get(&format!("{}?search=photo", routes::RECORDS)).await;
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["original_name"], "photos.tar");

        let res = app
            .get(&format!("{}?page=2&per_page=2", routes::RECORDS))
            .await;
        assert_eq!(res.body["data"].as_array().unwrap().len(), 1);
        assert_eq!(res.body["pagination"]["total_pages"], 2);
    }

    #[tokio::test]
    async fn search_matches_sha256() {
        let app = TestApp::spawn().await;
        app.stored(1, "hello.txt", b"hello world").await;
        app.stored(1, "other.txt", b"other").await;

        let res = app
            .get(&format!("{}?search={}", routes::RECORDS, &HELLO_SHA256[..16]))
            .await;
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["original_name"], "hello.txt");
    }

    #[tokio::test]
    async fn oversized_page_is_rejected() {
        let app = TestApp::spawn().await;
        app.register(1, "a.bin").await;

        for query in [
            "page=18446744073709551615",
            "page=200000000000000000&per_page=100",
        ] {
            let res = app.get(&format!("{}?{query}", routes::RECORDS)).await;
            assert_eq!(res.status, 400, "{query}: {}", res.text);
            assert_eq!(res.body["code"], "VALIDATION_ERROR");
        }

        let res = app.get(&format!("{}?page=1000", routes::RECORDS)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 0);
        assert_eq!(res.body["pagination"]["total"], 1);
    }

    #[tokio::test]
    async fn invalid_status_filter_is_rejected() {
        let app = TestApp::spawn().await;
        let res = app.get(&format!("{}?status=lost", routes::RECORDS)).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn stats_list_every_status() {
        let app = TestApp::spawn().await;
        app.stored(1, "a.bin", b"a").await;
        app.register(1, "b.bin").await;

        let res = app.get(routes::STATS).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["total"], 2);

        let by_status = res.body["by_status"].as_array().unwrap();
        assert_eq!(by_status.len(), 6);
        assert_eq!(by_status[0]["status"], "pending");
        assert_eq!(by_status[0]["count"], 1);
        assert_eq!(by_status[2]["status"], "stored");
        assert_eq!(by_status[2]["count"], 1);
        assert_eq!(by_status[3]["count"], 0);
    }

    #[tokio::test]
    async fn deleting_owner_removes_its_records() {
        let app = TestApp::spawn().await;
        let kept = app.register(1, "keep.bin").await;
        app.register(2, "drop-a.bin").await;
        app.register(2, "drop-b.bin").await;

        let res = app.delete(&routes::owner_records(2)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["deleted"], 2);

        let res = app.get(routes::RECORDS).await;
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["id"], kept.as_str());
    }
}

mod persistence {
    use coldstore_server::entity::integrity_record;
    use coldstore_server::store::DbRecordStore;
    use common::integrity::{RecordFilter, RecordOrder, RecordStore};
    use sea_orm::{ActiveModelTrait, EntityTrait, Set};
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn least_recently_verified_lists_unverified_first() {
        let app = TestApp::spawn().await;
        let checked = app.stored(1, "checked.bin", b"checked").await;
        let unchecked = app.stored(1, "unchecked.bin", b"unchecked").await;
        app.post(&routes::verify(&checked), &json!({})).await;

        let store = DbRecordStore::new(app.db.clone());
        let listed = store
            .list(&RecordFilter {
                order: RecordOrder::LeastRecentlyVerified,
                ..Default::default()
            })
            .await
            .unwrap();
        let ids: Vec<_> = listed.iter().map(|r| r.id.to_string()).collect();
        assert_eq!(ids, [unchecked, checked]);
    }

    #[tokio::test]
    async fn inconsistent_row_is_an_internal_error() {
        let app = TestApp::spawn().await;
        let id = app.stored(1, "a.bin", b"a").await;
        let uuid: Uuid = id.parse().unwrap();

        let row = integrity_record::Entity::find_by_id(uuid)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        let mut active: integrity_record::ActiveModel = row.into();
        active.checksum_md5 = Set(None);
        active.update(&app.db).await.unwrap();

        let res = app.get(&routes::record(&id)).await;
        assert_eq!(res.status, 500);
        assert_eq!(res.body["code"], "INTERNAL_ERROR");
    }
}
