use chrono::Utc;
use diesel::prelude::*;
use f1w_core::model::EventType;
use f1w_store::{CachedSearchRepo, EventRepo, RoundRepo, ScheduledSearchRepo, SeasonRepo, Store};
use serial_test::serial;

fn temp_store() -> (Store, tempfile::TempPath) {
    let file = tempfile::NamedTempFile::new().unwrap();
    let path = file.into_temp_path();
    let store = Store::connect(path.to_str().unwrap()).unwrap();
    (store, path)
}

#[tokio::test]
#[serial]
async fn season_round_event_round_trip() {
    let (store, _path) = temp_store();
    let season_repo = SeasonRepo::new(&store);
    let round_repo = RoundRepo::new(&store);
    let event_repo = EventRepo::new(&store);

    let season = season_repo.upsert(2025).await.unwrap();
    let round = round_repo
        .upsert(season.id, 3, "Bahrain Grand Prix", "Bahrain International Circuit", "Bahrain", None)
        .await
        .unwrap();
    let event = event_repo
        .upsert(round.id, EventType::Qualifying, Some(Utc::now()), None)
        .await
        .unwrap();

    assert_eq!(event.round_id, round.id);
    assert_eq!(round.season_id, season.id);

    let fetched_round = round_repo.get(round.id).unwrap();
    assert_eq!(fetched_round.name, "Bahrain Grand Prix");
}

#[tokio::test]
#[serial]
async fn deleting_season_cascades_to_round_and_event() {
    let (store, _path) = temp_store();
    let season_repo = SeasonRepo::new(&store);
    let round_repo = RoundRepo::new(&store);
    let event_repo = EventRepo::new(&store);

    let season = season_repo.upsert(2025).await.unwrap();
    let round = round_repo
        .upsert(season.id, 1, "Bahrain Grand Prix", "Bahrain International Circuit", "Bahrain", None)
        .await
        .unwrap();
    event_repo
        .upsert(round.id, EventType::Race, None, None)
        .await
        .unwrap();

    {
        let mut conn = store.writer().await;
        diesel::delete(
            f1w_store::schema::seasons::table.filter(f1w_store::schema::seasons::id.eq(season.id)),
        )
        .execute(&mut *conn)
        .unwrap();
    }

    assert!(round_repo.get(round.id).is_err());
}

#[tokio::test]
#[serial]
async fn scheduled_search_lifecycle() {
    let (store, _path) = temp_store();
    let season_repo = SeasonRepo::new(&store);
    let round_repo = RoundRepo::new(&store);
    let search_repo = ScheduledSearchRepo::new(&store);

    let season = season_repo.upsert(2025).await.unwrap();
    let round = round_repo
        .upsert(season.id, 1, "Bahrain Grand Prix", "Bahrain International Circuit", "Bahrain", None)
        .await
        .unwrap();

    let search = search_repo
        .create(round.id, EventType::Qualifying, None)
        .await
        .unwrap();

    let due = search_repo.list_due(Utc::now()).unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, search.id);

    search_repo.pause(search.id).await.unwrap();
    let due_after_pause = search_repo.list_due(Utc::now()).unwrap();
    assert!(due_after_pause.is_empty());

    search_repo.resume(search.id).await.unwrap();
    let due_after_resume = search_repo.list_due(Utc::now()).unwrap();
    assert_eq!(due_after_resume.len(), 1);
}

#[tokio::test]
#[serial]
async fn round_search_cache_respects_ttl() {
    let (store, _path) = temp_store();
    let cache_repo = CachedSearchRepo::new(&store);

    let now = Utc::now();
    cache_repo.put(1, "qualifying,race", "[]", 24, now).await.unwrap();

    match cache_repo.get(1, "qualifying,race", now).unwrap() {
        f1w_store::CacheLookup::Hit(_) => {}
        f1w_store::CacheLookup::Miss => panic!("expected cache hit immediately after write"),
    }

    let past_ttl = now + chrono::Duration::hours(25);
    match cache_repo.get(1, "qualifying,race", past_ttl).unwrap() {
        f1w_store::CacheLookup::Hit(_) => panic!("expected cache miss after TTL elapsed"),
        f1w_store::CacheLookup::Miss => {}
    }
}
