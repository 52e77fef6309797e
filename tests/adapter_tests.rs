//! Site adapters driven page by page against mock servers.

mod common;

use common::{settings_for, Harness};
use sourcewalk::classify::SiteType;
use sourcewalk::error::ScrapeError;
use sourcewalk::prelude::*;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn posts(urls: &[&str]) -> serde_json::Value {
    serde_json::Value::Array(urls.iter().map(|u| serde_json::json!({"file_url": u})).collect())
}

#[tokio::test]
async fn danbooru_pages_until_short_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/post.json"))
        .and(query_param("tags", "cat"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(posts(&["/data/a.jpg", "https://cdn/b.png"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/post.json"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(posts(&["https://cdn/c.gif"])))
        .mount(&server)
        .await;

    let mut settings = settings_for(&server);
    settings.scrape.booru_limit = 2;
    let h = Harness::new(settings);
    let source = format!("{}/post?tags=cat", server.uri());
    let mut token = ContinuationToken::new();

    let first = h.page(SiteType::Danbooru, &source, &mut token).await.unwrap();
    assert_eq!(first.urls, vec![format!("{}/data/a.jpg", server.uri()), "https://cdn/b.png".to_string()]);
    assert_eq!(token.next, Cursor::page(2));

    let second = h.page(SiteType::Danbooru, &source, &mut token).await.unwrap();
    assert_eq!(second.urls, vec!["https://cdn/c.gif".to_string()]);
    assert!(token.is_exhausted());
}

#[tokio::test]
async fn gelbooru2_accepts_wrapped_and_empty_payloads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .and(query_param("page", "dapi"))
        .and(query_param("pid", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "@attributes": {"count": 2}, "post": [{"file_url": "https://img/a.jpg"}, {"file_url": "https://img/b.webm"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .and(query_param("pid", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;

    let mut settings = settings_for(&server);
    settings.scrape.booru_limit = 2;
    let h = Harness::new(settings);
    let source = format!("{}/index.php?page=post&s=list&tags=dog", server.uri());
    let mut token = ContinuationToken::new();

    assert_eq!(h.page(SiteType::Gelbooru2, &source, &mut token).await.unwrap().urls.len(), 2);
    assert_eq!(token.next, Cursor::page(1));
    assert!(h.page(SiteType::Gelbooru2, &source, &mut token).await.unwrap().urls.is_empty());
    assert!(token.is_exhausted());
}

#[tokio::test]
async fn gelbooru1_follows_post_pages() {
    let server = MockServer::start().await;
    let list = r#"<div><span class="thumb"><a href="/index.php?page=post&amp;s=view&amp;id=1">1</a></span>
        <span class="thumb"><a href="/index.php?page=post&amp;s=view&amp;id=2">2</a></span></div>"#;
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .and(query_param("s", "list"))
        .and(query_param("pid", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(list))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .and(query_param("s", "view"))
        .and(query_param("id", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"<img id="image" src="https://img.booru.org/1.jpg">"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .and(query_param("s", "view"))
        .and(query_param("id", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>deleted</p>"))
        .mount(&server)
        .await;

    let h = Harness::new(settings_for(&server));
    let mut token = ContinuationToken::new();
    let page = h.page(SiteType::Gelbooru1, &format!("{}/index.php?page=post&s=list&tags=x", server.uri()), &mut token).await.unwrap();
    assert_eq!(page.urls, vec!["https://img.booru.org/1.jpg".to_string()]);
    assert_eq!(page.warnings.len(), 1);
    assert_eq!(token.next, Cursor::page(1));
}

#[tokio::test]
async fn e621_pool_search_walks_nested_cursor() {
    let server = MockServer::start().await;
    let file = |u: &str| serde_json::json!({"file": {"url": u}});
    Mock::given(method("GET"))
        .and(path("/pools.json"))
        .and(query_param("search[name_matches]", "comic"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{"id": 10}, {"id": 20}])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pools.json"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/posts.json"))
        .and(query_param("tags", "pool:10"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"posts": [file("https://s/1.jpg"), file("https://s/2.jpg")]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/posts.json"))
        .and(query_param("tags", "pool:10"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"posts": [file("https://s/3.jpg")]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/posts.json"))
        .and(query_param("tags", "pool:20"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"posts": [
            file("https://s/4.jpg"), {"file": {"url": null}}
        ]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/posts.json"))
        .and(query_param("tags", "pool:20"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"posts": []})))
        .mount(&server)
        .await;

    let mut settings = settings_for(&server);
    settings.scrape.e621_limit = 2;
    let h = Harness::new(settings);
    let source = format!("{}/pools?search%5Bname_matches%5D=comic", server.uri());
    let mut token = ContinuationToken::new();

    let mut seen = Vec::new();
    let mut cursors = Vec::new();
    for _ in 0..10 {
        let page = h.page(SiteType::E621, &source, &mut token).await.unwrap();
        seen.extend(page.urls);
        cursors.push(token.next.clone());
        if token.is_exhausted() { break; }
    }
    assert_eq!(cursors, vec![
        Cursor::nested(1, 0, 1),
        Cursor::nested(1, 1, 0),
        // pool 20's page was full (one null file), so its next page is tried
        Cursor::nested(1, 1, 1),
        Cursor::nested(2, 0, 0),
        Cursor::Exhausted,
    ]);
    assert_eq!(seen, vec!["https://s/1.jpg", "https://s/2.jpg", "https://s/3.jpg", "https://s/4.jpg"]);
}

#[tokio::test]
async fn imagefap_captcha_freezes_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gallery.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><form id=\"captcha\">prove it</form></html>"))
        .mount(&server)
        .await;

    let h = Harness::new(settings_for(&server));
    let mut token = ContinuationToken::new();
    let err = h.page(SiteType::ImageFap, &format!("{}/pictures/123/name", server.uri()), &mut token).await.unwrap_err();
    assert!(matches!(err, ScrapeError::Captcha { site: SiteType::ImageFap, .. }));
    assert_eq!(token.next, Cursor::Start);
}

#[tokio::test]
async fn imagefap_gallery_resolves_photo_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gallery.php"))
        .and(query_param("page", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"<a href="/photo/1/?gid=5">1</a><a href="/photo/2/?gid=5">2</a>"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gallery.php"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>end</p>"))
        .mount(&server)
        .await;
    for n in ["1", "2"] {
        Mock::given(method("GET"))
            .and(path(format!("/photo/{n}/")))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(r#"<img id="mainPhoto" src="https://cdn/{n}.jpg">"#)))
            .mount(&server)
            .await;
    }

    let h = Harness::new(settings_for(&server));
    let source = format!("{}/gallery.php?gid=5", server.uri());
    let mut token = ContinuationToken::new();
    let page = h.page(SiteType::ImageFap, &source, &mut token).await.unwrap();
    assert_eq!(page.urls, vec!["https://cdn/1.jpg".to_string(), "https://cdn/2.jpg".to_string()]);
    assert_eq!(token.next, Cursor::page(1));
    assert!(h.page(SiteType::ImageFap, &source, &mut token).await.unwrap().urls.is_empty());
    assert!(token.is_exhausted());
}

#[tokio::test]
async fn ehentai_stops_at_last_pager_page() {
    let server = MockServer::start().await;
    let gallery = |n: u32| {
        format!(
            r#"<table class="ptt"><tr><td><a href="?p=0">1</a></td><td><a href="?p=1">2</a></td></tr></table>
            <div id="gdt"><a href="/s/x/1-{n}">t</a></div>"#
        )
    };
    Mock::given(method("GET"))
        .and(path("/g/1/abc/"))
        .and(query_param("p", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(gallery(1)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/g/1/abc/"))
        .and(query_param("p", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(gallery(2)))
        .mount(&server)
        .await;
    for n in [1, 2] {
        Mock::given(method("GET"))
            .and(path(format!("/s/x/1-{n}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(r#"<img id="img" src="https://h/{n}.jpg">"#)))
            .mount(&server)
            .await;
    }

    let h = Harness::new(settings_for(&server));
    let source = format!("{}/g/1/abc/", server.uri());
    let mut token = ContinuationToken::new();
    assert_eq!(h.page(SiteType::EHentai, &source, &mut token).await.unwrap().urls, vec!["https://h/1.jpg".to_string()]);
    assert_eq!(token.next, Cursor::page(1));
    assert_eq!(h.page(SiteType::EHentai, &source, &mut token).await.unwrap().urls, vec!["https://h/2.jpg".to_string()]);
    assert!(token.is_exhausted());
}

#[tokio::test]
async fn ehentai_interstitial_is_a_captcha() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/g/9/zz/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<title>Just a moment...</title>"))
        .mount(&server)
        .await;

    let h = Harness::new(settings_for(&server));
    let mut token = ContinuationToken::new();
    let err = h.page(SiteType::EHentai, &format!("{}/g/9/zz/", server.uri()), &mut token).await.unwrap_err();
    assert!(matches!(err, ScrapeError::Captcha { .. }));
    assert_eq!(token.next, Cursor::Start);
}

#[tokio::test]
async fn bdsmlr_rss_pages() {
    let server = MockServer::start().await;
    let rss = r#"<?xml version="1.0"?><rss><channel>
        <item><description><![CDATA[<p><img src="https://cdn/a.jpg"></p>]]></description></item>
        </channel></rss>"#;
    Mock::given(method("GET"))
        .and(path("/rss"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rss"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<rss><channel></channel></rss>"))
        .mount(&server)
        .await;

    let h = Harness::new(settings_for(&server));
    let mut token = ContinuationToken::new();
    assert_eq!(h.page(SiteType::Bdsmlr, &server.uri(), &mut token).await.unwrap().urls, vec!["https://cdn/a.jpg".to_string()]);
    assert!(h.page(SiteType::Bdsmlr, &server.uri(), &mut token).await.unwrap().urls.is_empty());
    assert!(token.is_exhausted());
}

#[tokio::test]
async fn luscious_graphql_pages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql/nobatch/"))
        .and(body_string_contains("\"page\":1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": {"picture": {"list": {
            "info": {"has_next_page": true},
            "items": [{"url_to_original": "https://l/a.jpg"}]
        }}}})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graphql/nobatch/"))
        .and(body_string_contains("\"page\":2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": {"picture": {"list": {
            "info": {"has_next_page": false},
            "items": [{"url_to_original": "https://l/b.gif", "url_to_video": "https://l/b.mp4"}]
        }}}})))
        .mount(&server)
        .await;

    let h = Harness::new(settings_for(&server));
    let source = "https://www.luscious.net/albums/some-album_4242/";
    let mut token = ContinuationToken::new();
    assert_eq!(h.page(SiteType::Luscious, source, &mut token).await.unwrap().urls, vec!["https://l/a.jpg".to_string()]);
    assert_eq!(h.page(SiteType::Luscious, source, &mut token).await.unwrap().urls, vec!["https://l/b.mp4".to_string()]);
    assert!(token.is_exhausted());
}

fn luscious_list(kind: &str, has_next: bool, items: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": {kind: {"list": {
        "info": {"has_next_page": has_next},
        "items": items
    }}}}))
}

#[tokio::test]
async fn luscious_listing_walks_albums_depth_first() {
    let server = MockServer::start().await;
    let albums = |page: &str| {
        Mock::given(method("POST"))
            .and(path("/graphql/nobatch/"))
            .and(body_string_contains("\"operationName\":\"AlbumList\""))
            .and(body_string_contains(format!("\"page\":{page}")))
    };
    albums("1")
        .and(body_string_contains("\"value\":\"cats\""))
        .respond_with(luscious_list("album", true, serde_json::json!([{"id": "11"}, {"id": 12}])))
        .mount(&server)
        .await;
    albums("2").respond_with(luscious_list("album", false, serde_json::json!([]))).mount(&server).await;

    let pictures = |album: &str, page: &str| {
        Mock::given(method("POST"))
            .and(path("/graphql/nobatch/"))
            .and(body_string_contains("\"operationName\":\"PictureListInsideAlbum\""))
            .and(body_string_contains(format!("\"value\":\"{album}\"")))
            .and(body_string_contains(format!("\"page\":{page}")))
    };
    pictures("11", "1")
        .respond_with(luscious_list("picture", true, serde_json::json!([{"url_to_original": "https://l/a.jpg"}])))
        .mount(&server)
        .await;
    pictures("11", "2")
        .respond_with(luscious_list("picture", false, serde_json::json!([{"url_to_original": "https://l/b.jpg"}])))
        .mount(&server)
        .await;
    pictures("12", "1")
        .respond_with(luscious_list("picture", false, serde_json::json!([{"url_to_original": "https://l/c.jpg"}])))
        .mount(&server)
        .await;

    let h = Harness::new(settings_for(&server));
    let source = "https://www.luscious.net/albums/list/?tagged=cats";
    let mut token = ContinuationToken::new();
    let mut seen = Vec::new();
    let mut cursors = Vec::new();
    for _ in 0..10 {
        seen.extend(h.page(SiteType::Luscious, source, &mut token).await.unwrap().urls);
        cursors.push(token.next.clone());
        if token.is_exhausted() { break; }
    }
    assert_eq!(cursors, vec![Cursor::nested(1, 0, 1), Cursor::nested(1, 1, 0), Cursor::nested(2, 0, 0), Cursor::Exhausted]);
    assert_eq!(seen, vec!["https://l/a.jpg", "https://l/b.jpg", "https://l/c.jpg"]);
}

async fn mount_html(server: &MockServer, at: &str, query: Option<(&str, &str)>, body: &str) {
    let mut mock = Mock::given(method("GET")).and(path(at));
    if let Some((k, v)) = query {
        mock = mock.and(query_param(k, v));
    }
    mock.respond_with(ResponseTemplate::new(200).set_body_string(body)).mount(server).await;
}

#[tokio::test]
async fn imagefap_organizer_walks_galleries_depth_first() {
    let server = MockServer::start().await;
    mount_html(&server, "/organizer/77/", Some(("page", "0")), r#"<a href="/gallery/101">a</a><a href="/pictures/102/b">b</a>"#).await;
    mount_html(&server, "/organizer/77/", Some(("page", "1")), "<p>no more galleries</p>").await;
    for (gid, photo) in [("101", "1"), ("102", "2")] {
        Mock::given(method("GET"))
            .and(path("/gallery.php"))
            .and(query_param("gid", gid))
            .and(query_param("page", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(r#"<a href="/photo/{photo}/?gid={gid}">p</a>"#)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gallery.php"))
            .and(query_param("gid", gid))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>end</p>"))
            .mount(&server)
            .await;
        mount_html(&server, &format!("/photo/{photo}/"), None, &format!(r#"<img id="mainPhoto" src="https://cdn/{photo}.jpg">"#)).await;
    }

    let h = Harness::new(settings_for(&server));
    let source = format!("{}/organizer/77/favs", server.uri());
    let mut token = ContinuationToken::new();
    let mut seen = Vec::new();
    let mut cursors = Vec::new();
    for _ in 0..10 {
        seen.extend(h.page(SiteType::ImageFap, &source, &mut token).await.unwrap().urls);
        cursors.push(token.next.clone());
        if token.is_exhausted() { break; }
    }
    assert_eq!(cursors, vec![
        Cursor::nested(0, 0, 1),
        Cursor::nested(0, 1, 0),
        Cursor::nested(0, 1, 1),
        Cursor::nested(1, 0, 0),
        Cursor::Exhausted,
    ]);
    assert_eq!(seen, vec!["https://cdn/1.jpg", "https://cdn/2.jpg"]);
}

#[tokio::test]
async fn imagefap_organizer_captcha_keeps_cursor() {
    let server = MockServer::start().await;
    mount_html(&server, "/organizer/77/", Some(("page", "0")), r#"<a href="/gallery/101">a</a>"#).await;
    mount_html(&server, "/gallery.php", Some(("gid", "101")), r#"<a href="/photo/9/?gid=101">p</a>"#).await;
    mount_html(&server, "/photo/9/", None, "<div class=\"captcha\">are you human?</div>").await;

    let h = Harness::new(settings_for(&server));
    let mut token = ContinuationToken::new();
    token.next = Cursor::nested(0, 0, 0);
    let page = h.page(SiteType::ImageFap, &format!("{}/organizer/77/favs", server.uri()), &mut token).await.unwrap();
    assert!(page.captcha.is_some());
    assert!(page.urls.is_empty());
    assert_eq!(token.next, Cursor::nested(0, 0, 0));
}

#[tokio::test]
async fn twitter_timeline_steps_below_oldest_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"token_type": "bearer", "access_token": "tw"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/1.1/statuses/user_timeline.json"))
        .and(query_param("screen_name", "someone"))
        .and(header("authorization", "Bearer tw"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id_str": "200", "extended_entities": {"media": [{"type": "photo", "media_url_https": "https://pbs/a.jpg"}]}},
            {"id_str": "150"}
        ])))
        .mount(&server)
        .await;

    let mut settings = settings_for(&server);
    settings.remote.twitter_consumer_key = Some("ck".into());
    settings.remote.twitter_consumer_secret = Some("cs".into());
    let h = Harness::new(settings);
    let mut token = ContinuationToken::new();
    let page = h.page(SiteType::Twitter, "https://x.com/someone", &mut token).await.unwrap();
    assert_eq!(page.urls, vec!["https://pbs/a.jpg".to_string()]);
    assert_eq!(token.next, Cursor::token("149"));
}

#[tokio::test]
async fn instagram_checkpoint_is_a_captcha() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/login/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "message": "checkpoint_required", "checkpoint_url": "https://www.instagram.com/challenge/xyz/", "status": "fail"
        })))
        .mount(&server)
        .await;

    let mut settings = settings_for(&server);
    settings.remote.instagram_username = Some("me".into());
    settings.remote.instagram_password = Some("pw".into());
    let scraper = Scraper::new(settings).unwrap();
    let r = scraper.fetch_page(PageRequest::new(LibrarySource::new("https://www.instagram.com/someone/"))).await;
    assert_eq!(r.captcha.as_deref(), Some("https://www.instagram.com/challenge/xyz/"));
    assert!(r.warning.is_some());
    assert_eq!(r.helpers.next, Cursor::Start);
}

#[tokio::test]
async fn redgifs_user_search_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/auth/temporary"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": "rg"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/users/someone/search"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "page": 1, "pages": 1, "gifs": [{"urls": {"sd": "https://m/a-mobile.mp4", "hd": "https://m/a.mp4"}}]
        })))
        .mount(&server)
        .await;

    let h = Harness::new(settings_for(&server));
    let mut token = ContinuationToken::new();
    let page = h.page(SiteType::RedGifs, "https://www.redgifs.com/users/someone", &mut token).await.unwrap();
    assert_eq!(page.urls, vec!["https://m/a.mp4".to_string()]);
    assert!(token.is_exhausted());
}

#[tokio::test]
async fn playlist_entries_join_against_playlist_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media/list.m3u"))
        .respond_with(ResponseTemplate::new(200).set_body_string("#EXTM3U\nclip1.mp4\nhttps://other/clip2.webm\n"))
        .mount(&server)
        .await;

    let scraper = Scraper::new(settings_for(&server)).unwrap();
    let source = format!("{}/media/list.m3u", server.uri());
    assert_eq!(classify(&source), SiteType::Playlist);
    let r = scraper.fetch_page(PageRequest::new(LibrarySource::new(source))).await;
    assert_eq!(r.data, vec![format!("{}/media/clip1.mp4", server.uri()), "https://other/clip2.webm".to_string()]);
}

#[tokio::test]
async fn local_directory_through_scraper() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.png"), b"x").unwrap();
    std::fs::write(dir.path().join("b.mkv"), b"x").unwrap();
    std::fs::write(dir.path().join("readme.md"), b"x").unwrap();

    let scraper = Scraper::new(Settings::default()).unwrap();
    let source = dir.path().to_string_lossy().into_owned();
    assert_eq!(classify(&source), SiteType::Local);
    let mut req = PageRequest::new(LibrarySource::new(source));
    req.filter = Some(Category::Videos);
    let r = scraper.fetch_page(req).await;
    assert_eq!(r.data.len(), 1);
    assert!(r.data[0].ends_with("b.mkv"));
    assert!(r.helpers.is_exhausted());
}
