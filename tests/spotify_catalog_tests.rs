use catalog_playlist_sync::api::spotify::SpotifyCatalog;
use catalog_playlist_sync::api::CatalogClient;
use catalog_playlist_sync::error::Error;
use catalog_playlist_sync::paginate::PageCollector;
use mockito::{Matcher, Server};
use serde_json::json;

fn track(id: &str, isrc: &str, name: &str, playable: bool) -> serde_json::Value {
    json!({
        "id": id,
        "uri": format!("spotify:track:{}", id),
        "name": name,
        "artists": [{ "name": "Band" }],
        "album": { "name": "Record" },
        "external_ids": { "isrc": isrc },
        "is_playable": playable,
        "is_local": false
    })
}

#[test]
fn playlists_follow_absolute_next_links() {
    let mut server = Server::new();
    let base = server.url();

    let _p1 = server
        .mock("GET", "/me/playlists")
        .match_query(Matcher::Exact("limit=50".into()))
        .match_header("authorization", "Bearer tok")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "items": [{ "id": "pl1", "name": "One" }, { "id": "pl2", "name": "Two" }],
                "next": format!("{}/me/playlists?offset=2&limit=50", base)
            })
            .to_string(),
        )
        .create();
    let _p2 = server
        .mock("GET", "/me/playlists")
        .match_query(Matcher::UrlEncoded("offset".into(), "2".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "items": [{ "id": "pl3", "name": "Three" }], "next": null }).to_string())
        .create();

    let client = SpotifyCatalog::new(base.clone(), "tok", "from_token");
    let rt = tokio::runtime::Runtime::new().unwrap();
    let all = rt.block_on(PageCollector::default().all_playlists(&client)).unwrap();
    let ids: Vec<&str> = all.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["pl1", "pl2", "pl3"]);
}

#[test]
fn playlist_tracks_mark_local_and_blocked_entries_unplayable() {
    let mut server = Server::new();
    let base = server.url();

    let _m = server
        .mock("GET", "/playlists/pl1/tracks")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("limit".into(), "50".into()),
            Matcher::UrlEncoded("market".into(), "SE".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "items": [
                    { "track": track("t1", "SEAAA0000001", "First", true) },
                    { "track": { "id": null, "uri": "spotify:local:x", "name": "Demo", "is_local": true } },
                    { "track": track("t3", "SEAAA0000003", "Third", false) },
                    { "track": null }
                ],
                "next": null
            })
            .to_string(),
        )
        .create();

    let client = SpotifyCatalog::new(base, "tok", "SE");
    let rt = tokio::runtime::Runtime::new().unwrap();
    let page = rt.block_on(client.list_playlist_tracks("pl1", None)).unwrap();

    assert_eq!(page.next, None);
    assert_eq!(page.items.len(), 3);
    assert_eq!(page.items[0].catalog_id.as_deref(), Some("t1"));
    assert_eq!(page.items[1].catalog_id, None);
    assert_eq!(page.items[2].catalog_id, None);
}

#[test]
fn isrc_lookup_issues_one_search_per_code() {
    let mut server = Server::new();
    let base = server.url();

    let m1 = server
        .mock("GET", "/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "isrc:USAAA0000001".into()),
            Matcher::UrlEncoded("type".into(), "track".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "tracks": { "items": [track("a1", "USAAA0000001", "A", true)] } }).to_string())
        .expect(1)
        .create();
    let m2 = server
        .mock("GET", "/search")
        .match_query(Matcher::UrlEncoded("q".into(), "isrc:USAAA0000002".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "tracks": { "items": [] } }).to_string())
        .expect(1)
        .create();

    let client = SpotifyCatalog::new(base, "tok", "from_token");
    let rt = tokio::runtime::Runtime::new().unwrap();
    let songs = rt
        .block_on(client.fetch_tracks_by_isrc(&["USAAA0000001".into(), "USAAA0000002".into()]))
        .unwrap();

    assert_eq!(songs.len(), 1);
    assert_eq!(songs[0].native_id, "a1");
    assert!(songs[0].playable);
    m1.assert();
    m2.assert();
}

#[test]
fn create_and_add_use_track_uris() {
    let mut server = Server::new();
    let base = server.url();

    let create = server
        .mock("POST", "/me/playlists")
        .match_body(Matcher::PartialJson(json!({ "name": "Summer" })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(json!({ "id": "newpl" }).to_string())
        .create();
    let add = server
        .mock("POST", "/playlists/newpl/tracks")
        .match_body(Matcher::Json(json!({ "uris": ["spotify:track:a", "spotify:track:b"] })))
        .with_status(201)
        .with_body(json!({ "snapshot_id": "s" }).to_string())
        .create();

    let client = SpotifyCatalog::new(base, "tok", "from_token");
    let rt = tokio::runtime::Runtime::new().unwrap();
    let id = rt.block_on(client.create_playlist("Summer")).unwrap();
    assert_eq!(id.as_deref(), Some("newpl"));
    rt.block_on(client.add_tracks("newpl", &["a".into(), "b".into()])).unwrap();
    create.assert();
    add.assert();
}

#[test]
fn rate_limit_surfaces_as_remote_fetch_error() {
    let mut server = Server::new();
    let base = server.url();

    let _m = server
        .mock("GET", "/me/playlists")
        .match_query(Matcher::Any)
        .with_status(429)
        .with_header("retry-after", "7")
        .create();

    let client = SpotifyCatalog::new(base, "tok", "from_token");
    let rt = tokio::runtime::Runtime::new().unwrap();
    let err = rt.block_on(PageCollector::default().all_playlists(&client)).unwrap_err();
    match err {
        Error::RemoteFetch { operation, source } => {
            assert_eq!(operation, "list_playlists");
            assert!(source.to_string().contains("retry_after=Some(7)"));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn equivalents_are_not_supported() {
    let client = SpotifyCatalog::new("http://127.0.0.1:9", "tok", "from_token");
    let rt = tokio::runtime::Runtime::new().unwrap();
    assert!(rt.block_on(client.fetch_equivalent_tracks("t1")).unwrap().is_empty());
}
