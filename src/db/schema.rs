table! {
    article_tags (article_id, tag_id) {
        article_id -> Integer,
        tag_id -> Integer,
    }
}

table! {
    articles (id) {
        id -> Integer,
        author_id -> Integer,
        title -> Text,
        content -> Text,
        image -> Text,
        times_read -> BigInt,
        pub_date -> Date,
    }
}

table! {
    comments (id) {
        id -> Integer,
        article_id -> Integer,
        user_id -> Integer,
        body -> Text,
        is_author -> Bool,
        created_at -> Timestamp,
    }
}

table! {
    favorites (id) {
        id -> Integer,
        user_id -> Integer,
        article_id -> Integer,
    }
}

table! {
    reactions (id) {
        id -> Integer,
        user_id -> Integer,
        article_id -> Integer,
        value -> Integer,
    }
}

table! {
    social_media (id) {
        id -> Integer,
        user_id -> Integer,
        platform -> Text,
        link -> Text,
    }
}

table! {
    subscriptions (id) {
        id -> Integer,
        subscriber_id -> Integer,
        author_id -> Integer,
    }
}

table! {
    tags (id) {
        id -> Integer,
        name -> Text,
    }
}

table! {
    user_readings (id) {
        id -> Integer,
        user_id -> Integer,
        article_id -> Integer,
        times_read -> BigInt,
        date_read -> Timestamp,
    }
}

table! {
    users (id) {
        id -> Integer,
        username -> Text,
        email -> Text,
        password_hash -> Text,
        image -> Nullable<Text>,
    }
}

joinable!(article_tags -> articles (article_id));
joinable!(article_tags -> tags (tag_id));
joinable!(articles -> users (author_id));
joinable!(comments -> articles (article_id));
joinable!(comments -> users (user_id));
joinable!(favorites -> articles (article_id));
joinable!(reactions -> articles (article_id));
joinable!(social_media -> users (user_id));
joinable!(user_readings -> articles (article_id));

allow_tables_to_appear_in_same_query!(
    article_tags,
    articles,
    comments,
    favorites,
    reactions,
    social_media,
    subscriptions,
    tags,
    user_readings,
    users,
);
