use catalog_playlist_sync::api::mock::MockCatalog;
use catalog_playlist_sync::api::CatalogLimits;
use catalog_playlist_sync::differ::PlaylistDiffer;
use catalog_playlist_sync::error::Error;
use catalog_playlist_sync::models::{CatalogSong, CatalogTag, Playlist, RemoteTrack};

fn catalog_song(id: &str) -> CatalogSong {
    CatalogSong {
        native_id: id.into(),
        isrc: Some(format!("ISRC-{}", id)),
        name: format!("Title {}", id),
        artist: "Artist".into(),
        album: "Album".into(),
        playable: true,
    }
}

fn entry(id: &str) -> RemoteTrack {
    RemoteTrack { entry_id: format!("i.{}", id), catalog_id: Some(id.into()), name: format!("Title {}", id) }
}

fn unplayable_entry(id: &str) -> RemoteTrack {
    RemoteTrack { entry_id: format!("i.{}", id), catalog_id: None, name: format!("Title {}", id) }
}

fn empty_playlist() -> Playlist {
    Playlist { id: "p.1".into(), name: "Mix".into(), catalog: CatalogTag::AppleMusic, songs: Vec::new() }
}

fn catalog_with(ids: &[&str]) -> MockCatalog {
    MockCatalog::new(CatalogTag::AppleMusic).with_songs(ids.iter().map(|id| catalog_song(id)).collect())
}

#[tokio::test]
async fn first_sync_fetches_everything_second_is_a_noop() {
    let client = catalog_with(&["a", "b", "c"]);
    let fresh = vec![entry("a"), entry("b"), entry("c")];
    let differ = PlaylistDiffer::new();

    let updated = differ.sync(&empty_playlist(), &fresh, &client).await.unwrap().expect("changed");
    let ids: Vec<&str> = updated.songs.iter().map(|s| s.native_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(client.fetch_by_id_batches(), vec![vec!["a".to_string(), "b".into(), "c".into()]]);

    client.clear_calls();
    let again = differ.sync(&updated, &fresh, &client).await.unwrap();
    assert!(again.is_none());
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn one_removed_one_added_costs_one_fetch() {
    let client = catalog_with(&["a", "b", "c", "d"]);
    let mut cached = empty_playlist();
    cached.songs = vec![catalog_song("a"), catalog_song("b"), catalog_song("c")];

    let fresh = vec![entry("a"), entry("d"), entry("c")];
    let updated = PlaylistDiffer::new().sync(&cached, &fresh, &client).await.unwrap().expect("changed");

    assert_eq!(updated.songs.len(), cached.songs.len());
    assert!(!updated.songs.iter().any(|s| s.native_id == "b"));
    let d = updated.songs.iter().find(|s| s.native_id == "d").expect("d present");
    assert_eq!(d.name, "Title d");
    assert_eq!(d.isrc.as_deref(), Some("ISRC-d"));
    assert_eq!(client.fetch_by_id_batches(), vec![vec!["d".to_string()]]);
    // Cached survivors keep their order; newcomers are appended.
    let ids: Vec<&str> = updated.songs.iter().map(|s| s.native_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c", "d"]);
}

#[tokio::test]
async fn only_unseen_ids_are_fetched() {
    let client = catalog_with(&["a", "b", "c", "d", "e"]);
    let mut cached = empty_playlist();
    cached.songs = vec![catalog_song("a"), catalog_song("b")];

    let fresh = vec![entry("e"), entry("a"), entry("b"), entry("d"), entry("e")];
    PlaylistDiffer::new().sync(&cached, &fresh, &client).await.unwrap();

    let fetched: Vec<String> = client.fetch_by_id_batches().concat();
    assert_eq!(fetched, vec!["e".to_string(), "d".into()]);
}

#[tokio::test]
async fn unplayable_entries_do_not_count_as_members() {
    let client = catalog_with(&["a", "b"]);
    let mut cached = empty_playlist();
    cached.songs = vec![catalog_song("a"), catalog_song("b")];

    // "b" is still listed but no longer carries a playable id.
    let fresh = vec![entry("a"), unplayable_entry("b"), unplayable_entry("x")];
    let updated = PlaylistDiffer::new().sync(&cached, &fresh, &client).await.unwrap().expect("changed");

    let ids: Vec<&str> = updated.songs.iter().map(|s| s.native_id.as_str()).collect();
    assert_eq!(ids, vec!["a"]);
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn metadata_is_fetched_in_endpoint_sized_batches() {
    let ids = ["a", "b", "c", "d", "e", "f", "g"];
    let client = catalog_with(&ids).with_limits(CatalogLimits { isrc_batch: 25, id_batch: 3, add_batch: 100 });
    let fresh: Vec<RemoteTrack> = ids.iter().map(|id| entry(id)).collect();

    let updated = PlaylistDiffer::new().sync(&empty_playlist(), &fresh, &client).await.unwrap().expect("changed");
    assert_eq!(updated.songs.len(), 7);
    let sizes: Vec<usize> = client.fetch_by_id_batches().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![3, 3, 1]);
}

#[tokio::test]
async fn metadata_fetch_failure_aborts_the_sync() {
    let client = catalog_with(&["a"]);
    client.fail_on("fetch_tracks_by_id");

    let err = PlaylistDiffer::new().sync(&empty_playlist(), &[entry("a")], &client).await.unwrap_err();
    assert!(matches!(err, Error::RemoteFetch { operation: "fetch_tracks_by_id", .. }));
}

#[tokio::test]
async fn emptied_playlist_is_a_change() {
    let client = catalog_with(&[]);
    let mut cached = empty_playlist();
    cached.songs = vec![catalog_song("a")];

    let updated = PlaylistDiffer::new().sync(&cached, &[], &client).await.unwrap().expect("changed");
    assert!(updated.songs.is_empty());
    assert!(PlaylistDiffer::new().sync(&updated, &[], &client).await.unwrap().is_none());
}
