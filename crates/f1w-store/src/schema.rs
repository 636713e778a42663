//! Diesel table definitions. Enums (`EventType`, `ScheduledSearchStatus`,
//! ...) are stored as `Text`; conversion to/from the `f1w-core::model` types
//! happens in [`crate::convert`], not via custom `ToSql`/`FromSql` impls —
//! keeps the schema legible at the cost of one mapping step per row.

diesel::table! {
    seasons (id) {
        id -> BigInt,
        year -> Integer,
        last_refreshed -> Nullable<Timestamp>,
        is_hidden -> Bool,
    }
}

diesel::table! {
    rounds (id) {
        id -> BigInt,
        season_id -> BigInt,
        round_number -> Integer,
        name -> Text,
        circuit -> Text,
        country -> Text,
        circuit_tz -> Nullable<Text>,
    }
}

diesel::table! {
    events (id) {
        id -> BigInt,
        round_id -> BigInt,
        event_type -> Text,
        start_time_utc -> Nullable<Timestamp>,
        end_time_utc -> Nullable<Timestamp>,
    }
}

diesel::table! {
    indexers (id) {
        id -> BigInt,
        name -> Text,
        kind -> Text,
        base_url -> Text,
        api_key -> Text,
        category_ids -> Text,
        priority -> Integer,
        enabled -> Bool,
        last_error -> Nullable<Text>,
    }
}

diesel::table! {
    downloaders (id) {
        id -> BigInt,
        name -> Text,
        kind -> Text,
        base_url -> Text,
        api_key -> Text,
        category -> Text,
        priority -> Integer,
        enabled -> Bool,
        last_error -> Nullable<Text>,
    }
}

diesel::table! {
    scheduled_searches (id) {
        id -> BigInt,
        round_id -> BigInt,
        event_type -> Text,
        status -> Text,
        downloader_id -> Nullable<BigInt>,
        quality_overrides_json -> Nullable<Text>,
        added_at -> Timestamp,
        last_searched_at -> Nullable<Timestamp>,
        next_run_at -> Nullable<Timestamp>,
        last_error -> Nullable<Text>,
        attempts -> Integer,
        chosen_nzb -> Nullable<Text>,
        dispatch_token -> Nullable<Text>,
    }
}

diesel::table! {
    download_history (id) {
        id -> BigInt,
        event_id -> BigInt,
        indexer_id -> BigInt,
        downloader_id -> BigInt,
        nzb_title -> Text,
        nzb_url -> Text,
        score -> Integer,
        status -> Text,
        last_polled_at -> Nullable<Timestamp>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
        acquisition_id -> Nullable<Text>,
    }
}

diesel::table! {
    notification_targets (id) {
        id -> BigInt,
        kind -> Text,
        url -> Text,
        name -> Text,
        event_mask -> Text,
        webhook_secret -> Nullable<Text>,
    }
}

diesel::table! {
    cached_round_searches (round_id, allowlist_fingerprint) {
        round_id -> BigInt,
        allowlist_fingerprint -> Text,
        created_at -> Timestamp,
        ttl_hours -> BigInt,
        results_json -> Text,
    }
}

diesel::table! {
    settings (id) {
        id -> Integer,
        min_resolution -> Integer,
        max_resolution -> Integer,
        allow_hdr -> Bool,
        preferred_codecs -> Text,
        preferred_groups -> Text,
        auto_download_threshold -> Integer,
        default_downloader_id -> Nullable<BigInt>,
        event_allowlist -> Text,
        log_level -> Text,
        scheduler_tick_seconds -> BigInt,
        maxage_pre_days -> BigInt,
        maxage_post_days -> BigInt,
        aggressive_window_h -> BigInt,
        decay_interval_h -> BigInt,
        stop_after_days -> BigInt,
        jitter_seconds -> BigInt,
        per_indexer_concurrency -> BigInt,
        global_concurrency -> BigInt,
    }
}

diesel::joinable!(rounds -> seasons (season_id));
diesel::joinable!(events -> rounds (round_id));
diesel::joinable!(scheduled_searches -> rounds (round_id));
diesel::joinable!(download_history -> events (event_id));
diesel::joinable!(download_history -> indexers (indexer_id));
diesel::joinable!(download_history -> downloaders (downloader_id));

diesel::allow_tables_to_appear_in_same_query!(
    seasons,
    rounds,
    events,
    indexers,
    downloaders,
    scheduled_searches,
    download_history,
    notification_targets,
    cached_round_searches,
    settings,
);
