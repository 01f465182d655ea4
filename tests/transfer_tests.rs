use catalog_playlist_sync::api::mock::{MockCall, MockCatalog};
use catalog_playlist_sync::api::CatalogLimits;
use catalog_playlist_sync::error::Error;
use catalog_playlist_sync::models::{CatalogSong, CatalogTag, Playlist};
use catalog_playlist_sync::transfer::TransferPlanner;

fn song(id: &str, isrc: &str, name: &str, playable: bool) -> CatalogSong {
    CatalogSong {
        native_id: id.into(),
        isrc: Some(isrc.into()),
        name: name.into(),
        artist: "Band".into(),
        album: "Record".into(),
        playable,
    }
}

fn source_playlist(n: usize) -> Playlist {
    Playlist {
        id: "sp-list".into(),
        name: "Summer".into(),
        catalog: CatalogTag::Spotify,
        songs: (1..=n).map(|i| song(&format!("sp-{}", i), &format!("ISRC{}", i), &format!("Track {}", i), true)).collect(),
    }
}

/// Target knows the first `known` source ISRCs.
fn target(known: usize) -> MockCatalog {
    MockCatalog::new(CatalogTag::AppleMusic)
        .with_songs((1..=known).map(|i| song(&format!("am-{}", i), &format!("ISRC{}", i), &format!("Track {}", i), true)).collect())
        .with_limits(CatalogLimits { isrc_batch: 25, id_batch: 300, add_batch: 2 })
}

#[tokio::test]
async fn copy_creates_same_named_playlist_and_adds_matches_in_batches() {
    let source = source_playlist(6);
    let target = target(5);

    let report = TransferPlanner::default().copy(&source, &target).await.unwrap();

    assert_eq!(report.added, 5);
    assert_eq!(report.unavailable.len(), 1);
    assert_eq!(report.unavailable[0].name, "Track 6");

    let created = target.playlist_summaries().into_iter().find(|p| p.id == report.playlist_id).expect("created");
    assert_eq!(created.name, "Summer");

    let added: Vec<String> = target
        .playlist_tracks(&report.playlist_id)
        .unwrap()
        .into_iter()
        .filter_map(|t| t.catalog_id)
        .collect();
    assert_eq!(added, vec!["am-1", "am-2", "am-3", "am-4", "am-5"]);

    let add_calls: Vec<usize> = target
        .calls()
        .iter()
        .filter_map(|c| match c {
            MockCall::AddTracks { track_ids, .. } => Some(track_ids.len()),
            _ => None,
        })
        .collect();
    assert_eq!(add_calls, vec![2, 2, 1]);
}

#[tokio::test]
async fn missing_playlist_id_is_a_creation_error() {
    let target = target(3).creating_without_id();

    let err = TransferPlanner::default().copy(&source_playlist(3), &target).await.unwrap_err();
    assert!(matches!(err, Error::PlaylistCreation { ref name, .. } if name == "Summer"));
    assert!(!target.calls().iter().any(|c| matches!(c, MockCall::AddTracks { .. })));
}

#[tokio::test]
async fn add_failure_is_surfaced() {
    let target = target(3);
    target.fail_on("add_tracks");

    let err = TransferPlanner::default().copy(&source_playlist(3), &target).await.unwrap_err();
    assert!(matches!(err, Error::RemoteFetch { operation: "add_tracks", .. }));
}

#[tokio::test]
async fn match_failure_means_no_playlist_is_created() {
    let target = target(3);
    target.fail_on("fetch_tracks_by_isrc");

    assert!(TransferPlanner::default().copy(&source_playlist(3), &target).await.is_err());
    assert!(!target.calls().iter().any(|c| matches!(c, MockCall::CreatePlaylist(_))));
}

#[tokio::test]
async fn nothing_matched_still_creates_the_playlist() {
    let target = target(0);

    let report = TransferPlanner::default().copy(&source_playlist(2), &target).await.unwrap();
    assert_eq!(report.added, 0);
    assert_eq!(report.unavailable.len(), 2);
    assert!(target.calls().contains(&MockCall::CreatePlaylist("Summer".into())));
    assert!(!target.calls().iter().any(|c| matches!(c, MockCall::AddTracks { .. })));
}
