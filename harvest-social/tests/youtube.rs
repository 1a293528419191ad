use harvest_config::HarvestConfigLoader;
use harvest_pipeline::{ExpandOptions, NameCount, RunOptions, VideoSchema, run_pipeline};
use harvest_social::youtube::{YoutubeApi, YoutubeComments, YoutubeSearch};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api(server: &MockServer) -> YoutubeApi {
    let yaml = format!(
        r#"
reddit:
  client_id: unused
  client_secret: unused
youtube:
  api_key: k-123
  api_url: "{uri}/youtube/v3/"
"#,
        uri = server.uri()
    );
    let cfg = HarvestConfigLoader::new()
        .with_yaml_str(&yaml)
        .load()
        .unwrap();
    YoutubeApi::new(&cfg.youtube, &cfg.http).unwrap()
}

fn video(id: &str, title: &str) -> Value {
    json!({
        "kind": "youtube#searchResult",
        "id": {"kind": "youtube#video", "videoId": id},
        "snippet": {"title": title, "channelTitle": "InkJournal", "publishedAt": "2023-05-01T10:20:30Z"}
    })
}

fn thread(id: &str, video_id: &str, text: &str, likes: i64) -> Value {
    json!({
        "kind": "youtube#commentThread",
        "id": id,
        "snippet": {
            "videoId": video_id,
            "topLevelComment": {
                "id": id,
                "snippet": {
                    "authorDisplayName": "@scribbler",
                    "textDisplay": text,
                    "likeCount": likes,
                    "publishedAt": "2023-05-02T08:00:00Z"
                }
            }
        }
    })
}

#[tokio::test]
async fn quota_error_on_one_video_skips_it_and_names_file_by_rows() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/youtube/v3/search"))
        .and(query_param("key", "k-123"))
        .and(query_param("q", "sailor pro gear"))
        .and(query_param("type", "video"))
        .and(query_param("maxResults", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                video("v1", "Pro Gear Slim"),
                {"id": {"kind": "youtube#channel", "channelId": "UC1"}, "snippet": {"title": "a channel"}},
                video("v2", "Pro Gear King of Pen")
            ],
            "nextPageToken": "S2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/youtube/v3/commentThreads"))
        .and(query_param("videoId", "v1"))
        .and(query_param("maxResults", "3"))
        .and(query_param("textFormat", "plainText"))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [thread("t1", "v1", "lovely nib", 5), thread("t2", "v1", "too\nexpensive", 0)],
            "nextPageToken": "P2"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/youtube/v3/commentThreads"))
        .and(query_param("videoId", "v1"))
        .and(query_param("maxResults", "1"))
        .and(query_param("pageToken", "P2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [thread("t3", "v1", "wet writer", 1)],
            "nextPageToken": "P3"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/youtube/v3/commentThreads"))
        .and(query_param("videoId", "v2"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": 403, "message": "The request cannot be completed because you have exceeded your quota."}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let api = api(&server);
    let opts = RunOptions {
        pipeline: "youtube",
        query: "sailor pro gear".into(),
        ceiling: 2,
        expand: ExpandOptions::default(),
        output_root: tmp.path().to_path_buf(),
        name_count: NameCount::Rows,
    };

    let report = run_pipeline::<_, _, VideoSchema>(
        YoutubeSearch::new(&api, "sailor pro gear"),
        &YoutubeComments::new(&api, 3),
        &opts,
    )
    .await
    .unwrap();

    assert_eq!(report.parents, 2);
    assert_eq!(report.rows, 3);
    assert_eq!(report.skipped, vec!["v2".to_string()]);
    assert_eq!(
        report.path,
        tmp.path().join("youtube/youtube_comments_sailor_pro_gear_3.csv")
    );

    let text = std::fs::read_to_string(&report.path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "id,video_id,author,text,published_at,like_count",
            "1,v1,@scribbler,lovely nib,2023-05-02T08:00:00Z,5",
            "2,v1,@scribbler,too expensive,2023-05-02T08:00:00Z,0",
            "3,v1,@scribbler,wet writer,2023-05-02T08:00:00Z,1",
        ]
    );
}

#[tokio::test]
async fn empty_search_writes_header_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/youtube/v3/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let api = api(&server);
    let opts = RunOptions {
        pipeline: "youtube",
        query: "nothing matches".into(),
        ceiling: 1000,
        expand: ExpandOptions::default(),
        output_root: tmp.path().to_path_buf(),
        name_count: NameCount::Rows,
    };

    let report = run_pipeline::<_, _, VideoSchema>(
        YoutubeSearch::new(&api, "nothing matches"),
        &YoutubeComments::new(&api, 100),
        &opts,
    )
    .await
    .unwrap();

    assert_eq!(report.rows, 0);
    assert!(report.path.ends_with("youtube/youtube_comments_nothing_matches_0.csv"));
    let text = std::fs::read_to_string(&report.path).unwrap();
    assert_eq!(text.trim_end(), "id,video_id,author,text,published_at,like_count");
}
