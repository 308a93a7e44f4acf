use articlee::config::AppConfig;
use rocket::http::{ContentType, Header, Status};
use rocket::local::blocking::{Client, LocalResponse};
use rocket::serde::json::{json, Value};
use tempfile::TempDir;

struct TestApp {
    client: Client,
    _dir: TempDir,
}

fn app_with(popular_min_reads: i64) -> TestApp {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = AppConfig {
        database_url: dir.path().join("articlee.db").to_string_lossy().into_owned(),
        pool_size: 4,
        jwt_secret: "integration-secret".to_string(),
        token_ttl_hours: 1,
        bcrypt_cost: 4,
        popular_min_reads,
    };
    let rocket = articlee::rocket(config).expect("rocket");
    TestApp {
        client: Client::tracked(rocket).expect("valid rocket instance"),
        _dir: dir,
    }
}

fn app() -> TestApp {
    app_with(50)
}

fn auth(token: &str) -> Header<'static> {
    Header::new("Authorization", format!("Token {}", token))
}

fn json_of(response: LocalResponse<'_>) -> Value {
    response.into_json::<Value>().expect("json body")
}

fn location(response: &LocalResponse<'_>) -> String {
    response
        .headers()
        .get_one("Location")
        .expect("location header")
        .to_string()
}

impl TestApp {
    fn register(&self, name: &str) -> String {
        self.register_with(json!({
            "username": name,
            "email": format!("{}@example.org", name),
            "password": "correct horse",
        }))
    }

    fn register_with(&self, user: Value) -> String {
        let response = self
            .client
            .post("/api/users")
            .header(ContentType::JSON)
            .body(json!({ "user": user }).to_string())
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
        json_of(response)["user"]["token"]
            .as_str()
            .expect("token")
            .to_string()
    }

    fn publish(&self, token: &str, title: &str, tags: &[&str]) -> i64 {
        let response = self
            .client
            .post("/api/personal/articles")
            .header(ContentType::JSON)
            .header(auth(token))
            .body(
                json!({ "article": {
                    "title": title,
                    "content": format!("Everything about {}", title),
                    "image": "cover.png",
                    "tags": tags,
                }})
                .to_string(),
            )
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
        json_of(response)["article"]["id"].as_i64().expect("id")
    }

    fn page(&self, token: Option<&str>, article: i64) -> Value {
        let mut request = self.client.get(format!("/api/public/articles/{}", article));
        if let Some(token) = token {
            request = request.header(auth(token));
        }
        let response = request.dispatch();
        assert_eq!(response.status(), Status::Ok);
        json_of(response)
    }

    fn bounce(&self, token: Option<&str>, uri: String) -> String {
        let mut request = self.client.post(uri);
        if let Some(token) = token {
            request = request.header(auth(token));
        }
        let response = request.dispatch();
        assert_eq!(response.status(), Status::SeeOther);
        location(&response)
    }
}

#[test]
fn views_count_for_signed_in_readers_only() {
    let app = app();
    let author = app.register("author");
    let reader = app.register("reader");
    let article = app.publish(&author, "Counting reads", &[]);

    assert_eq!(app.page(None, article)["article"]["times_read"], 0);
    assert_eq!(app.page(Some(&reader), article)["article"]["times_read"], 1);
    assert_eq!(app.page(Some(&reader), article)["article"]["times_read"], 2);
    assert_eq!(app.page(Some(&author), article)["article"]["times_read"], 3);
}

#[test]
fn unknown_article_is_not_found() {
    let app = app();
    let response = app.client.get("/api/public/articles/999").dispatch();
    assert_eq!(response.status(), Status::NotFound);
    assert_eq!(json_of(response)["errors"][0], "article does not exist");
}

#[test]
fn liking_without_reading_bounces_with_a_warning() {
    let app = app();
    let author = app.register("author");
    let reader = app.register("reader");
    let article = app.publish(&author, "Unread", &[]);

    let back = app.bounce(Some(&reader), format!("/api/public/articles/{}/like", article));
    assert_eq!(back, format!("/api/public/articles/{}", article));

    let page = app.page(Some(&reader), article);
    assert_eq!(page["flash"]["kind"], "warning");
    assert_eq!(
        page["flash"]["text"],
        "Do not try to leave like without reading an article"
    );
    assert_eq!(page["likes"], 0);
    assert_eq!(page["user_reaction_message"], Value::Null);
}

#[test]
fn anonymous_reactions_ask_to_sign_in() {
    let app = app();
    let author = app.register("author");
    let article = app.publish(&author, "Anonymous", &[]);

    app.bounce(None, format!("/api/public/articles/{}/dislike", article));
    let page = app.page(None, article);
    assert_eq!(page["flash"]["kind"], "info");
    assert_eq!(
        page["flash"]["text"],
        "To leave a reaction, please, become an authenticated user"
    );
}

#[test]
fn following_a_reaction_redirect_does_not_count_as_a_read() {
    let app = app();
    let author = app.register("author");
    let reader = app.register("reader");
    let article = app.publish(&author, "Likeable", &[]);

    assert_eq!(app.page(Some(&reader), article)["article"]["times_read"], 1);
    let back = app.bounce(Some(&reader), format!("/api/public/articles/{}/like", article));
    let response = app.client.get(back).header(auth(&reader)).dispatch();
    let page = json_of(response);

    assert_eq!(page["article"]["times_read"], 1);
    assert_eq!(page["likes"], 1);
    assert_eq!(page["dislikes"], 0);
    assert_eq!(page["user_reaction_message"], "You liked this article");
    assert_eq!(page["flash"]["kind"], "success");

    app.bounce(Some(&reader), format!("/api/public/articles/{}/dislike", article));
    let page = app.page(Some(&reader), article);
    assert_eq!(page["article"]["times_read"], 1);
    assert_eq!(page["likes"], 0);
    assert_eq!(page["dislikes"], 1);
    assert_eq!(page["user_reaction_message"], "You disliked this article");
}

#[test]
fn comments_are_validated_and_flag_the_author() {
    let app = app();
    let author = app.register("author");
    let reader = app.register("reader");
    let article = app.publish(&author, "Discussion", &[]);
    let comment = |token: &str, body: &str| {
        app.client
            .post(format!("/api/public/articles/{}/comment", article))
            .header(ContentType::JSON)
            .header(auth(token))
            .body(json!({ "comment": { "body": body } }).to_string())
            .dispatch()
    };

    let missing = app
        .client
        .post("/api/public/articles/999/comment")
        .header(ContentType::JSON)
        .header(auth(&reader))
        .body(json!({ "comment": { "body": "" } }).to_string())
        .dispatch();
    assert_eq!(missing.status(), Status::NotFound);

    // an unread article bounces before the body is looked at
    assert_eq!(comment(&reader, "   ").status(), Status::SeeOther);
    let page = app.page(Some(&reader), article);
    assert_eq!(
        page["flash"]["text"],
        "Do not try to leave comment without reading an article"
    );

    let response = comment(&reader, "   ");
    assert_eq!(response.status(), Status::UnprocessableEntity);
    assert!(json_of(response)["errors"]["body"].is_array());

    assert_eq!(comment(&reader, "great read").status(), Status::SeeOther);
    app.page(Some(&author), article);
    assert_eq!(comment(&author, "thank you").status(), Status::SeeOther);

    let page = app.page(None, article);
    let comments = page["comments"].as_array().expect("comments");
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["body"], "great read");
    assert_eq!(comments[0]["is_author"], false);
    assert_eq!(comments[1]["author"]["username"], "author");
    assert_eq!(comments[1]["is_author"], true);
    // both reads were taken back by the comment redirects
    assert_eq!(page["article"]["times_read"], 0);
}

#[test]
fn subscriptions_toggle_and_refuse_yourself() {
    let app = app();
    let author = app.register("author");
    let reader = app.register("reader");
    app.publish(&author, "Worth following", &[]);
    let subscribe = "/api/public/authors/author/subscribe".to_string();

    let back = app.bounce(Some(&reader), subscribe.clone());
    assert_eq!(back, "/api/public/authors/author");
    let page = json_of(app.client.get(back.clone()).header(auth(&reader)).dispatch());
    assert_eq!(page["subscribed"], true);
    assert_eq!(page["subscribers"], 1);
    assert_eq!(page["flash"]["text"], "You successfully subscribed to this author");

    let listed = json_of(
        app.client
            .get("/api/personal/subscriptions")
            .header(auth(&reader))
            .dispatch(),
    );
    assert_eq!(listed["authors"][0]["username"], "author");

    app.bounce(Some(&reader), subscribe.clone());
    let page = json_of(app.client.get(back.clone()).header(auth(&reader)).dispatch());
    assert_eq!(page["subscribed"], false);
    assert_eq!(page["subscribers"], 0);

    app.bounce(Some(&author), subscribe);
    let page = json_of(app.client.get(back).header(auth(&author)).dispatch());
    assert_eq!(page["flash"]["kind"], "info");
    assert_eq!(page["flash"]["text"], "You cannot subscribe to yourself");
    assert_eq!(page["is_owner"], true);
    assert_eq!(page["subscribers"], 0);
}

#[test]
fn subscribing_to_an_unknown_author_is_not_found() {
    let app = app();
    let reader = app.register("reader");
    let response = app
        .client
        .post("/api/public/authors/nobody/subscribe")
        .header(auth(&reader))
        .dispatch();
    assert_eq!(response.status(), Status::NotFound);
}

#[test]
fn favorites_toggle_without_inflating_reads() {
    let app = app();
    let author = app.register("author");
    let reader = app.register("reader");
    let article = app.publish(&author, "Keeper", &[]);
    app.page(Some(&reader), article);

    let toggle = format!("/api/personal/articles/favorites/{}", article);
    app.bounce(Some(&reader), toggle.clone());
    let page = app.page(Some(&reader), article);
    assert_eq!(page["in_favorites"], true);
    assert_eq!(page["article"]["times_read"], 1);

    let favorites = json_of(
        app.client
            .get("/api/personal/articles/favorites")
            .header(auth(&reader))
            .dispatch(),
    );
    assert_eq!(favorites["message"], "You have 1 favorite article");

    app.bounce(Some(&reader), toggle);
    let page = app.page(Some(&reader), article);
    assert_eq!(page["in_favorites"], false);
    assert_eq!(
        page["flash"]["text"],
        "You successfully deleted this article from your \"Favorites\""
    );
}

#[test]
fn search_matches_titles_and_authors_and_jumps_to_tags() {
    let app = app();
    let author = app.register("rustacean");
    app.publish(&author, "Borrowing explained", &["rust"]);
    app.publish(&author, "Lifetimes", &["rust"]);
    let search = |text: &str| {
        app.client
            .post("/api/public/search")
            .header(ContentType::JSON)
            .body(json!({ "search_string": text }).to_string())
            .dispatch()
    };

    let found = json_of(search("BORROW"));
    assert_eq!(
        found["message"],
        "1 article was found that contains ---BORROW--- in author's name or title"
    );
    let found = json_of(search("rustacean"));
    assert_eq!(found["articles"].as_array().map(Vec::len), Some(2));
    let found = json_of(search("macros"));
    assert_eq!(
        found["message"],
        "No articles were found that contain ---macros--- in author's name or title"
    );

    let response = search("#rust");
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), "/api/public/tags/rust");

    assert_eq!(search("#").status(), Status::NotFound);
    assert_eq!(search("").status(), Status::NotFound);
}

#[test]
fn tag_listing_counts_its_articles() {
    let app = app();
    let author = app.register("author");
    app.publish(&author, "One", &["#solo", "shared"]);
    app.publish(&author, "Two", &["shared"]);

    let solo = json_of(app.client.get("/api/public/tags/solo").dispatch());
    assert_eq!(solo["message"], "One article was found with this tag #solo");
    let shared = json_of(app.client.get("/api/public/tags/shared").dispatch());
    assert_eq!(shared["message"], "2 articles were found with this tag #shared");
    assert_eq!(
        app.client.get("/api/public/tags/missing").dispatch().status(),
        Status::NotFound
    );
}

#[test]
fn clearing_history_gives_back_the_reads() {
    let app = app();
    let author = app.register("author");
    let reader = app.register("reader");
    let other = app.register("other");
    let first = app.publish(&author, "First", &[]);
    let second = app.publish(&author, "Second", &[]);
    app.page(Some(&reader), first);
    app.page(Some(&reader), first);
    app.page(Some(&reader), second);
    app.page(Some(&other), first);

    let history = json_of(
        app.client
            .get("/api/personal/reading_history")
            .header(auth(&reader))
            .dispatch(),
    );
    assert_eq!(history["message"], "This is your reading history");
    assert_eq!(history["readings"][0]["article"]["title"], "Second");
    assert_eq!(history["readings"][1]["times_read"], 2);

    let clear = || {
        json_of(
            app.client
                .post("/api/personal/reading_history/clear")
                .header(auth(&reader))
                .dispatch(),
        )
    };
    assert_eq!(clear()["message"], "You successfully cleared your reading history");
    assert_eq!(clear()["message"], "Your reading history is already empty");

    assert_eq!(app.page(None, first)["article"]["times_read"], 1);
    assert_eq!(app.page(None, second)["article"]["times_read"], 0);
}

#[test]
fn deleting_a_reading_needs_one_to_exist() {
    let app = app();
    let author = app.register("author");
    let reader = app.register("reader");
    let article = app.publish(&author, "Once", &[]);
    let delete = || {
        app.client
            .delete(format!("/api/personal/reading_history/{}", article))
            .header(auth(&reader))
            .dispatch()
    };

    assert_eq!(delete().status(), Status::NotFound);
    app.page(Some(&reader), article);
    assert_eq!(
        json_of(delete())["message"],
        "Article was deleted from your reading history"
    );
    assert_eq!(app.page(None, article)["article"]["times_read"], 0);
}

#[test]
fn only_the_author_may_change_an_article() {
    let app = app();
    let author = app.register("author");
    let intruder = app.register("intruder");
    let article = app.publish(&author, "Mine", &["original"]);
    let uri = format!("/api/personal/articles/{}", article);

    let response = app
        .client
        .put(uri.clone())
        .header(ContentType::JSON)
        .header(auth(&intruder))
        .body(json!({ "article": { "title": "Yours now" } }).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::Forbidden);
    let response = app.client.delete(uri.clone()).header(auth(&intruder)).dispatch();
    assert_eq!(response.status(), Status::Forbidden);
    assert_eq!(app.page(None, article)["article"]["title"], "Mine");

    let response = app
        .client
        .put(uri.clone())
        .header(ContentType::JSON)
        .header(auth(&author))
        .body(json!({ "article": { "title": "Still mine", "tags": ["edited"] } }).to_string())
        .dispatch();
    let updated = json_of(response);
    assert_eq!(updated["article"]["title"], "Still mine");
    assert_eq!(updated["article"]["tags"], json!(["edited"]));

    let response = app.client.delete(uri).header(auth(&author)).dispatch();
    assert_eq!(json_of(response)["message"], "Your article was successfully deleted");
    assert_eq!(
        app.client
            .get(format!("/api/public/articles/{}", article))
            .dispatch()
            .status(),
        Status::NotFound
    );
}

#[test]
fn personal_pages_need_a_token() {
    let app = app();
    let response = app.client.get("/api/personal").dispatch();
    assert_eq!(response.status(), Status::Unauthorized);
    let response = app
        .client
        .get("/api/public/articles/recommended")
        .header(auth("not-a-token"))
        .dispatch();
    assert_eq!(response.status(), Status::Unauthorized);
}

#[test]
fn popular_and_recommended_listings() {
    let app = app_with(1);
    let author = app.register("author");
    let reader = app.register("reader");
    let hot = app.publish(&author, "Hot", &["news"]);
    let cold = app.publish(&author, "Cold", &["news"]);
    app.page(Some(&reader), hot);
    app.page(Some(&reader), hot);
    app.page(Some(&reader), cold);

    let popular = json_of(app.client.get("/api/public/articles/popular").dispatch());
    assert_eq!(
        popular["message"],
        "You are seeing the most popular articles in recent time"
    );
    assert_eq!(popular["articles"].as_array().map(Vec::len), Some(1));
    assert_eq!(popular["articles"][0]["title"], "Hot");

    let recommended = |token: &str| {
        json_of(
            app.client
                .get("/api/public/articles/recommended")
                .header(auth(token))
                .dispatch(),
        )
    };
    assert_eq!(recommended(&reader)["articles"], json!([]));
    app.bounce(Some(&reader), "/api/public/authors/author/subscribe".to_string());
    let listed = recommended(&reader);
    assert_eq!(listed["message"], "Here are the articles recommended for you");
    assert_eq!(listed["articles"].as_array().map(Vec::len), Some(2));
}

#[test]
fn registration_and_login_round_trip() {
    let app = app();
    app.register("member");

    let response = app
        .client
        .post("/api/users")
        .header(ContentType::JSON)
        .body(json!({ "user": { "username": "member", "email": "x@example.org", "password": "long enough" } }).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::UnprocessableEntity);

    let login = |password: &str| {
        app.client
            .post("/api/users/login")
            .header(ContentType::JSON)
            .body(json!({ "user": { "username": "member", "password": password } }).to_string())
            .dispatch()
    };
    assert_eq!(login("wrong password").status(), Status::UnprocessableEntity);
    let token = json_of(login("correct horse"))["user"]["token"]
        .as_str()
        .expect("token")
        .to_string();

    let me = json_of(app.client.get("/api/user").header(auth(&token)).dispatch());
    assert_eq!(me["user"]["email"], "member@example.org");
}

#[test]
fn clearing_the_image_is_saved() {
    let app = app();
    let token = app.register_with(json!({
        "username": "pictured",
        "email": "pictured@example.org",
        "password": "correct horse",
        "image": "me.png",
    }));
    let me = |token: &str| json_of(app.client.get("/api/user").header(auth(token)).dispatch());
    assert_eq!(me(&token)["user"]["image"], "me.png");

    let response = app
        .client
        .put("/api/user")
        .header(ContentType::JSON)
        .header(auth(&token))
        .body(json!({ "user": { "image": "" } }).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    assert!(json_of(response)["user"]["image"].is_null());

    assert!(me(&token)["user"]["image"].is_null());
}

#[test]
fn subscribing_to_an_author_with_a_non_ascii_name() {
    let app = app();
    let author = app.register_with(json!({
        "username": "José",
        "email": "jose@example.org",
        "password": "correct horse",
    }));
    let reader = app.register("reader");
    app.publish(&author, "Hola", &[]);

    let back = app.bounce(
        Some(&reader),
        "/api/public/authors/Jos%C3%A9/subscribe".to_string(),
    );
    assert_eq!(back, "/api/public/authors/Jos%C3%A9");

    let page = json_of(app.client.get(back).header(auth(&reader)).dispatch());
    assert_eq!(page["author"]["username"], "José");
    assert_eq!(page["subscribed"], true);
    assert_eq!(page["subscribers"], 1);
}
