use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use reqwest::StatusCode;
use subcap_engine::{
    CaptureConfig, CaptureError, CaptureSession, CollectingObserver, StopReason, Transport,
};
use url::Url;

const MASTER_URL: &str = "https://tv.example.com/live/master.m3u8";

/// Serves fixed bodies by URL; anything else is a 404.
#[derive(Default)]
struct StaticTransport {
    bodies: HashMap<String, String>,
    fetched: Mutex<Vec<String>>,
}

impl StaticTransport {
    fn with(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_owned(), body.to_owned());
        self
    }

    fn fetch_count(&self, url: &str) -> usize {
        self.fetched.lock().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Transport for StaticTransport {
    async fn fetch_text(&self, url: &Url, operation: &'static str) -> subcap_engine::Result<String> {
        self.fetched.lock().push(url.to_string());
        self.bodies
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| CaptureError::http_status(StatusCode::NOT_FOUND, url.as_str(), operation))
    }
}

const MASTER: &str = r#"#EXTM3U
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID="subs",NAME="Suomi",LANGUAGE="fin",URI="subs/fin.m3u8"
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID="subs",NAME="Svenska",LANGUAGE="swe",URI="subs/swe.m3u8"
#EXT-X-STREAM-INF:BANDWIDTH=800000,SUBTITLES="subs"
video.m3u8
"#;

const FINNISH_PLAYLIST: &str = "#EXTM3U
#EXT-X-TARGETDURATION:10
#EXT-X-MEDIA-SEQUENCE:0
#EXT-X-PROGRAM-DATE-TIME:2024-01-01T00:10:00.000Z
#EXTINF:10.000,
0.vtt
#EXTINF:10.000,
1.vtt
#EXTINF:10.000,
2.vtt
#EXT-X-ENDLIST
";

fn segment(first: &str, second: &str, local_start_secs: u32) -> String {
    let a = local_start_secs;
    let b = local_start_secs + 4;
    format!(
        "WEBVTT\nX-TIMESTAMP-MAP=MPEGTS:900000,LOCAL:00:00:00.000\n\n\
00:00:0{a}.000 --> 00:00:0{}.000\n{first}\n\n\
00:00:0{b}.000 --> 00:00:0{}.000\n{second}\n",
        a + 1,
        b + 1
    )
}

fn finnish_transport() -> StaticTransport {
    StaticTransport::default()
        .with(MASTER_URL, MASTER)
        .with("https://tv.example.com/live/subs/fin.m3u8", FINNISH_PLAYLIST)
        .with("https://tv.example.com/live/subs/0.vtt", &segment("a1", "a2", 1))
        .with("https://tv.example.com/live/subs/1.vtt", &segment("b1", "b2", 2))
        .with("https://tv.example.com/live/subs/2.vtt", &segment("c1", "c2", 3))
}

#[tokio::test(start_paused = true)]
async fn cues_are_shifted_onto_the_capture_timeline() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(finnish_transport());
    let observer = Arc::new(CollectingObserver::new());
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 10, 4).unwrap();
    let config = CaptureConfig::new(start, dir.path().join("news"));

    let session = CaptureSession::new(transport.clone(), config).with_observer(observer.clone());
    let results = session.run(&Url::parse(MASTER_URL).unwrap()).await.unwrap();

    assert_eq!(results.len(), 2);
    let finnish = &results[0];
    assert_eq!(finnish.track.name, "Suomi");
    let summary = finnish.outcome.as_ref().unwrap();
    assert_eq!(summary.stop, StopReason::EndList);
    assert_eq!(summary.segments_merged, 3);

    let path = finnish.output_path.as_ref().unwrap();
    assert_eq!(path, &dir.path().join("news-fi.vtt"));
    assert_eq!(
        std::fs::read_to_string(path).unwrap(),
        "WEBVTT\n\n\
00:00:01.000 --> 00:00:02.000\na2\n\n\
00:00:08.000 --> 00:00:09.000\nb1\n\n\
00:00:12.000 --> 00:00:13.000\nb2\n\n\
00:00:19.000 --> 00:00:20.000\nc1\n\n\
00:00:23.000 --> 00:00:24.000\nc2\n"
    );
    assert!(observer.reload_delays("Suomi").is_empty());
    assert_eq!(
        transport.fetch_count("https://tv.example.com/live/subs/fin.m3u8"),
        1
    );

    // The Swedish playlist is missing; that track fails on its own.
    let swedish = &results[1];
    assert!(!swedish.is_success());
    assert!(matches!(
        swedish.outcome,
        Err(CaptureError::HttpStatus { status, .. }) if status == StatusCode::NOT_FOUND
    ));
    assert!(finnish.is_success());
}

#[tokio::test(start_paused = true)]
async fn cue_straddling_the_capture_start_is_clamped() {
    let straddling = "WEBVTT\nX-TIMESTAMP-MAP=MPEGTS:900000,LOCAL:00:00:00.000\n\n\
gone\n00:00:01.000 --> 00:00:03.000\nbefore start\n\n\
00:00:02.000 --> 00:00:06.000 align:start\nstraddle\n\n\
00:00:08.000 --> 00:00:09.000\nlater\n";
    let transport = Arc::new(
        finnish_transport()
            .with("https://tv.example.com/live/subs/1.vtt", straddling)
            .with(
                "https://tv.example.com/live/subs/2.vtt",
                "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nlast\n",
            ),
    );
    let dir = tempfile::tempdir().unwrap();
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 10, 14).unwrap();
    let config = CaptureConfig::new(start, dir.path().join("edge"));

    let session = CaptureSession::new(transport.clone(), config);
    let results = session.run(&Url::parse(MASTER_URL).unwrap()).await.unwrap();

    let finnish = &results[0];
    assert_eq!(finnish.outcome.as_ref().unwrap().segments_merged, 2);
    // Segment 0 ends before the capture start and is never downloaded.
    assert_eq!(transport.fetch_count("https://tv.example.com/live/subs/0.vtt"), 0);
    assert_eq!(
        std::fs::read_to_string(finnish.output_path.as_ref().unwrap()).unwrap(),
        "WEBVTT\n\n\
00:00:00.000 --> 00:00:02.000 align:start\nstraddle\n\n\
00:00:04.000 --> 00:00:05.000\nlater\n\n\
00:00:07.000 --> 00:00:08.000\nlast\n"
    );
}

#[tokio::test(start_paused = true)]
async fn existing_output_is_kept_and_a_numbered_file_is_used() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("news-fi.vtt"), "old capture").unwrap();
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 10, 0).unwrap();
    let config = CaptureConfig::new(start, dir.path().join("news"));

    let session = CaptureSession::new(Arc::new(finnish_transport()), config);
    let results = session.run(&Url::parse(MASTER_URL).unwrap()).await.unwrap();

    assert_eq!(
        results[0].output_path.as_deref(),
        Some(dir.path().join("news-fi-1.vtt").as_path())
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("news-fi.vtt")).unwrap(),
        "old capture"
    );
}

#[tokio::test(start_paused = true)]
async fn cancelling_a_live_capture_leaves_valid_files() {
    let live = FINNISH_PLAYLIST.replace("#EXT-X-ENDLIST\n", "");
    let transport = finnish_transport().with("https://tv.example.com/live/subs/fin.m3u8", &live);
    let dir = tempfile::tempdir().unwrap();
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 10, 0).unwrap();
    let config = CaptureConfig::new(start, dir.path().join("live"));
    let observer = Arc::new(CollectingObserver::new());

    let session = CaptureSession::new(Arc::new(transport), config).with_observer(observer.clone());
    let token = session.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(22)).await;
        token.cancel();
    });
    let results = session.run(&Url::parse(MASTER_URL).unwrap()).await.unwrap();

    let finnish = &results[0];
    assert_eq!(finnish.outcome.as_ref().unwrap().stop, StopReason::Cancelled);
    // Loaded at 0, 10, 15 and 20 s, then cancelled while waiting.
    assert_eq!(
        observer.reload_delays("Suomi"),
        vec![
            Duration::from_secs(10),
            Duration::from_secs(5),
            Duration::from_secs(5),
            Duration::from_secs(5),
        ]
    );
    let text = std::fs::read_to_string(finnish.output_path.as_ref().unwrap()).unwrap();
    assert!(text.starts_with("WEBVTT\n\n"));
    assert_eq!(text.matches(" --> ").count(), 6);
}
