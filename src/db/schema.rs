//! Database schema definitions for Diesel.

diesel::table! {
    users (id) {
        id -> Integer,
        google_id -> Text,
        email -> Nullable<Text>,
        nickname -> Nullable<Text>,
        is_admin -> Bool,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    sessions (id) {
        id -> Text,
        user_id -> Integer,
        csrf_token -> Text,
        created_at -> Timestamp,
        expires_at -> Timestamp,
    }
}

diesel::table! {
    artists (id) {
        id -> Integer,
        name -> Text,
        deezer_id -> Nullable<Text>,
        itunes_id -> Nullable<Text>,
        yandex_id -> Nullable<Text>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    releases (id) {
        id -> Integer,
        title -> Text,
        artist_id -> Integer,
        release_date -> Nullable<Date>,
        release_type -> Text,
        cover_url -> Nullable<Text>,
        yandex_music_url -> Nullable<Text>,
        apple_music_url -> Nullable<Text>,
        spotify_url -> Nullable<Text>,
        deezer_url -> Nullable<Text>,
        is_test_data -> Bool,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    ratings (id) {
        id -> Integer,
        user_id -> Integer,
        release_id -> Integer,
        score -> Integer,
        text -> Nullable<Text>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    comment_reactions (rating_id, user_id) {
        rating_id -> Integer,
        user_id -> Integer,
        kind -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    reports (id) {
        id -> Integer,
        rating_id -> Integer,
        reporter_id -> Integer,
        reason -> Text,
        status -> Text,
        resolution -> Nullable<Text>,
        resolved_by -> Nullable<Integer>,
        created_at -> Timestamp,
        resolved_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    collections (id) {
        id -> Integer,
        title -> Text,
        description -> Nullable<Text>,
        is_active -> Bool,
        position -> Integer,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    collection_releases (collection_id, release_id) {
        collection_id -> Integer,
        release_id -> Integer,
        position -> Integer,
    }
}

// Define foreign key relationships
diesel::joinable!(sessions -> users (user_id));
diesel::joinable!(releases -> artists (artist_id));
diesel::joinable!(ratings -> releases (release_id));
diesel::joinable!(ratings -> users (user_id));
diesel::joinable!(comment_reactions -> ratings (rating_id));
diesel::joinable!(reports -> ratings (rating_id));
diesel::joinable!(collection_releases -> collections (collection_id));
diesel::joinable!(collection_releases -> releases (release_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    sessions,
    artists,
    releases,
    ratings,
    comment_reactions,
    reports,
    collections,
    collection_releases,
);
