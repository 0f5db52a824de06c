// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/mosaic-core

//! Handler pipeline flows against an in-memory relay.
//!
//! Covers the orchestration contract end to end: state progression,
//! progress percentages, archive keying, per-page failure containment,
//! the zero-page boundary and cancellation.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use mosaic_core::chapter::{
    Catalog, ChapterError, ChapterHandler, ExecuteOptions, Platform, Relay, RelayResponse,
};
use mosaic_core::descramble::shuffle;
use mosaic_core::raster::{codec, Raster};

/// In-memory relay: exact target URL → canned response. Unrouted URLs
/// answer 404 through the normal error path.
#[derive(Default)]
struct MockRelay {
    routes: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl MockRelay {
    fn route(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.routes.insert(url.to_string(), body.into());
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn lookup(&self, url: &str) -> Result<RelayResponse, ChapterError> {
        self.requests.lock().unwrap().push(url.to_string());
        match self.routes.get(url) {
            Some(body) => Ok(RelayResponse::ok(body.clone())),
            None => Err(ChapterError::Network {
                url: url.to_string(),
                status: Some(404),
                detail: "no such route".into(),
            }),
        }
    }
}

impl Relay for MockRelay {
    async fn get(
        &self,
        url: &str,
        _headers: &[(String, String)],
    ) -> Result<RelayResponse, ChapterError> {
        self.lookup(url)
    }

    async fn post(
        &self,
        url: &str,
        _headers: &[(String, String)],
        _body: Vec<u8>,
    ) -> Result<RelayResponse, ChapterError> {
        self.lookup(url)
    }
}

fn catalog() -> Catalog {
    let mut c = Catalog::new();
    c.insert("days.test", Platform::Direct);
    c.insert("books.test", Platform::TileManifest);
    c.insert("fuz.test", Platform::SealedPages);
    c.insert("viewer.seed.test", Platform::SeedViewer);
    c
}

fn small_jpeg(rgba: [u8; 4]) -> Vec<u8> {
    let mut r = Raster::new(16, 16);
    r.fill_rect(0, 0, 16, 16, rgba).unwrap();
    codec::encode_jpeg(&r).unwrap()
}

// ---------------------------------------------------------------------------
// Direct platform: plain downloads, structured join, zero-page boundary
// ---------------------------------------------------------------------------

#[tokio::test]
async fn direct_chapter_archives_main_pages_in_order() {
    let doc = r#"{"readableProduct":{"pageStructure":{"pages":[
        {"type":"cover"},
        {"type":"main","src":"https://days.test/img/1"},
        {"type":"main","src":"https://days.test/img/2"},
        {"type":"backMatter"}
    ]}}}"#;
    let relay = MockRelay::default()
        .route("https://days.test/episode/55.json", doc)
        .route("https://days.test/img/1", vec![1u8, 1])
        .route("https://days.test/img/2", vec![2u8, 2]);

    let handler = ChapterHandler::from_url(&catalog(), "https://days.test/episode/55").unwrap();
    let progress = handler.progress();
    let output = handler.execute(&relay).await.unwrap();

    assert!(output.failures.is_empty());
    assert_eq!(output.archive.len(), 2);
    let names: Vec<_> = output.archive.entries().map(|(n, _)| n.to_string()).collect();
    assert_eq!(names, vec!["001.jpg", "002.jpg"]);
    assert_eq!(output.archive.page(0), Some(&[1u8, 1][..]));
    assert_eq!(output.archive.page(1), Some(&[2u8, 2][..]));
    assert_eq!(progress.snapshot(), vec![("metadata", 1.0), ("download", 1.0)]);
}

#[tokio::test]
async fn zero_page_chapter_completes_immediately() {
    let doc = r#"{"readableProduct":{"pageStructure":{"pages":[{"type":"cover"}]}}}"#;
    let relay = MockRelay::default().route("https://days.test/episode/9.json", doc);

    let handler = ChapterHandler::from_url(&catalog(), "https://days.test/episode/9").unwrap();
    let progress = handler.progress();
    let output = handler.execute(&relay).await.unwrap();

    assert!(output.archive.is_empty());
    assert!(output.failures.is_empty());
    assert_eq!(progress.snapshot(), vec![("metadata", 1.0), ("download", 1.0)]);
}

#[tokio::test]
async fn metadata_schema_mismatch_aborts_run() {
    let relay = MockRelay::default().route("https://days.test/episode/9.json", r#"{"odd":true}"#);
    let handler = ChapterHandler::from_url(&catalog(), "https://days.test/episode/9").unwrap();
    assert!(matches!(
        handler.execute(&relay).await,
        Err(ChapterError::SchemaValidation(_))
    ));
}

#[tokio::test]
async fn bounded_concurrency_matches_unbounded_results() {
    let doc = r#"{"readableProduct":{"pageStructure":{"pages":[
        {"type":"main","src":"https://days.test/img/1"},
        {"type":"main","src":"https://days.test/img/2"},
        {"type":"main","src":"https://days.test/img/3"}
    ]}}}"#;
    let relay = MockRelay::default()
        .route("https://days.test/episode/7.json", doc)
        .route("https://days.test/img/1", vec![1u8])
        .route("https://days.test/img/2", vec![2u8])
        .route("https://days.test/img/3", vec![3u8]);

    let handler = ChapterHandler::from_url(&catalog(), "https://days.test/episode/7").unwrap();
    let options = ExecuteOptions { concurrency: Some(NonZeroUsize::new(1).unwrap()) };
    let output = handler.execute_with(&relay, options).await.unwrap();
    assert_eq!(output.archive.len(), 3);
    assert!(output.failures.is_empty());
}

// ---------------------------------------------------------------------------
// Per-page failure containment (manifest family)
// ---------------------------------------------------------------------------

fn manifest_json(src: &str) -> String {
    format!(
        r#"{{"ptimg-version":1,"resources":{{"i":{{"src":"{src}"}}}},
            "views":[{{"width":16,"height":16,"coords":["i:0,0+16,16>0,0"]}}]}}"#
    )
}

#[tokio::test]
async fn one_failing_page_does_not_abort_siblings() {
    let html = r#"<html><body>
        <div data-ptimg="m/1.json"></div>
        <div data-ptimg="m/2.json"></div>
        <div data-ptimg="m/3.json"></div>
        <div data-ptimg="m/4.json"></div>
        <div data-ptimg="m/5.json"></div>
    </body></html>"#;

    let jpeg = small_jpeg([90, 60, 30, 255]);
    let base = "https://books.test/title/ch01";
    let mut relay = MockRelay::default().route(base, html);
    for n in [1, 2, 4, 5] {
        relay = relay
            .route(&format!("{base}/m/{n}.json"), manifest_json(&format!("p{n}.jpg")))
            .route(&format!("{base}/data/p{n}.jpg"), jpeg.clone());
    }
    // Page 3's manifest names no source image.
    let broken = r#"{"ptimg-version":1,"resources":{"i":{}},
        "views":[{"width":16,"height":16,"coords":["i:0,0+16,16>0,0"]}]}"#;
    let relay = relay.route(&format!("{base}/m/3.json"), broken);

    let handler = ChapterHandler::from_url(&catalog(), base).unwrap();
    let progress = handler.progress();
    let output = handler.execute(&relay).await.unwrap();

    // Four pages archived, the fifth reported by index with its error.
    assert_eq!(output.archive.len(), 4);
    assert_eq!(output.failures.len(), 1);
    assert_eq!(output.failures[0].index, 2);
    assert!(matches!(output.failures[0].error, ChapterError::MissingField(_)));
    assert!(output.archive.page(2).is_none());

    // Every page settled, so the run still reached 100%.
    assert_eq!(progress.download_percentage(), 1.0);
}

#[tokio::test]
async fn page_fetch_404_is_a_page_failure_not_a_run_failure() {
    let doc = r#"{"readableProduct":{"pageStructure":{"pages":[
        {"type":"main","src":"https://days.test/img/1"},
        {"type":"main","src":"https://days.test/img/missing"}
    ]}}}"#;
    let relay = MockRelay::default()
        .route("https://days.test/episode/3.json", doc)
        .route("https://days.test/img/1", vec![1u8]);

    let handler = ChapterHandler::from_url(&catalog(), "https://days.test/episode/3").unwrap();
    let progress = handler.progress();
    let output = handler.execute(&relay).await.unwrap();

    assert_eq!(output.archive.len(), 1);
    assert_eq!(output.failures.len(), 1);
    assert_eq!(output.failures[0].index, 1);
    assert!(matches!(
        output.failures[0].error,
        ChapterError::Network { status: Some(404), .. }
    ));
    assert_eq!(progress.download_percentage(), 1.0);
}

// ---------------------------------------------------------------------------
// Sealed pages: AES-CBC unseal end to end
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sealed_pages_are_unsealed_bytewise() {
    use aes::cipher::block_padding::Pkcs7;
    use aes::cipher::{BlockEncryptMut, KeyIvInit};
    type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;

    let key_hex = "000102030405060708090a0b0c0d0e0f";
    let iv_hex = "00000000000000000000000000000000";
    let plain = small_jpeg([200, 10, 10, 255]);
    let sealed = Aes128CbcEnc::new_from_slices(
        &hex::decode(key_hex).unwrap(),
        &hex::decode(iv_hex).unwrap(),
    )
    .unwrap()
    .encrypt_padded_vec_mut::<Pkcs7>(&plain);

    let doc = format!(
        r#"{{"viewerData":{{"pages":[
            {{"image":{{"imageUrl":"/c/1.jpg","encryptionKey":"{key_hex}","iv":"{iv_hex}"}}}},
            {{"image":{{"imageUrl":"/c/2.jpg"}}}},
            {{"image":{{"imageUrl":"/c/x.jpg","isExtraPage":true}}}},
            {{}}
        ]}}}}"#
    );
    let relay = MockRelay::default()
        .route("https://api.fuz.test/v1/web_viewer", doc)
        .route("https://img.fuz.test/c/1.jpg", sealed)
        .route("https://img.fuz.test/c/2.jpg", vec![7u8, 7]);

    let handler =
        ChapterHandler::from_url(&catalog(), "https://fuz.test/series/viewer/4410").unwrap();
    let output = handler.execute(&relay).await.unwrap();

    assert!(output.failures.is_empty());
    // Extra page and non-image entries are not part of the chapter.
    assert_eq!(output.archive.len(), 2);
    // The sealed page decrypts back to the exact original bytes.
    assert_eq!(output.archive.page(0), Some(&plain[..]));
    assert_eq!(output.archive.page(1), Some(&[7u8, 7][..]));
}

// ---------------------------------------------------------------------------
// Seed viewer: full scramble → descramble flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn seed_shuffled_page_is_reassembled() {
    // Build a scrambled source the way the platform does: original cell d
    // is stored at cell perm[d] of the delivered image; the rightmost 4 px
    // strip stays in place.
    let seed = 777u32;
    let perm = shuffle::permutation(seed, 16);

    let cell_color = |d: usize| [(d * 16) as u8, 128, (255 - d * 16) as u8, 255];
    let mut scrambled = Raster::new(68, 64);
    for (d, &s) in perm.iter().enumerate() {
        let (sx, sy) = ((s % 4) as u32 * 16, (s / 4) as u32 * 16);
        scrambled.fill_rect(sx, sy, 16, 16, cell_color(d)).unwrap();
    }
    scrambled.fill_rect(64, 0, 4, 64, [0, 255, 0, 255]).unwrap();

    let api = format!(
        r#"{{"status":"ok","scramble_seed":{seed},"page_list":["https://viewer.seed.test/pages/1.jpg"]}}"#
    );
    let relay = MockRelay::default()
        .route(
            "https://api.seed.test/web/episode/viewer?version=6.0.0&platform=3&episode_id=9",
            api,
        )
        .route("https://viewer.seed.test/pages/1.jpg", codec::encode_jpeg(&scrambled).unwrap());

    let handler =
        ChapterHandler::from_url(&catalog(), "https://viewer.seed.test/episode/9").unwrap();
    let output = handler.execute(&relay).await.unwrap();
    assert!(output.failures.is_empty(), "failures: {:?}", output.failures);

    let rebuilt = codec::decode(output.archive.page(0).unwrap()).unwrap();
    assert_eq!((rebuilt.width(), rebuilt.height()), (68, 64));

    // Cell centers must match the original layout within JPEG tolerance.
    let close = |a: u8, b: u8| (i16::from(a) - i16::from(b)).unsigned_abs() <= 12;
    for d in 0..16u32 {
        let want = cell_color(d as usize);
        let got = rebuilt.pixel((d % 4) * 16 + 8, (d / 4) * 16 + 8);
        assert!(
            close(got[0], want[0]) && close(got[2], want[2]),
            "cell {d}: got {got:?}, want {want:?}"
        );
    }
    // Preserved strip.
    let strip = rebuilt.pixel(66, 32);
    assert!(close(strip[1], 255) && close(strip[0], 0));
}

// ---------------------------------------------------------------------------
// Cancellation and construction failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn prefired_cancel_token_stops_before_any_fetch() {
    let relay = MockRelay::default();
    let handler = ChapterHandler::from_url(&catalog(), "https://days.test/episode/1").unwrap();
    handler.cancel_token().cancel();

    assert!(matches!(handler.execute(&relay).await, Err(ChapterError::Cancelled)));
    assert!(relay.requested().is_empty(), "cancelled run must not touch the relay");
}

#[test]
fn unknown_host_is_rejected_at_construction() {
    assert!(matches!(
        ChapterHandler::from_url(&catalog(), "https://unknown.test/episode/1"),
        Err(ChapterError::UnsupportedHost(_))
    ));
}

#[test]
fn malformed_url_is_rejected_at_construction() {
    assert!(matches!(
        ChapterHandler::from_url(&catalog(), "not a url at all"),
        Err(ChapterError::MalformedUrl(_))
    ));
    // Right host, missing identifier pattern.
    assert!(matches!(
        ChapterHandler::from_url(&catalog(), "https://fuz.test/series/latest"),
        Err(ChapterError::MalformedUrl(_))
    ));
}
