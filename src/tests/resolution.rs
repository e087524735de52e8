use axum::http::Method;
use axum::http::StatusCode;

use crate::config::Config;
use crate::storage::Memory;
use crate::tests::helper;

#[tokio::test]
async fn test_miss_passes_through() {
    let (app, _storage) = helper::setup_test_app();

    let visit = helper::get(&app, "/content/7?page=2", helper::HTML).await;
    assert_eq!(StatusCode::OK, visit.status_code);

    let echo = visit.echo.unwrap();
    assert!(echo.matched);
    assert_eq!("/content/7", echo.path);
    assert_eq!(Some("page=2".to_string()), echo.query);
    assert_eq!(Some("/content/7".to_string()), echo.path_before_alias);
    assert_eq!(None, echo.current_url);
}

#[tokio::test]
async fn test_alias_continues_as_target() {
    let (app, storage) = helper::setup_test_app();
    helper::seed(&storage, "/about-us", "/content/42").await;

    for accept in [helper::HTML, helper::JSON] {
        let visit = helper::get(&app, "/about-us?page=2", accept).await;
        assert_eq!(StatusCode::OK, visit.status_code);
        assert_eq!(None, visit.location);

        // routing only saw the target
        let echo = visit.echo.unwrap();
        assert!(echo.matched);
        assert_eq!("/content/42", echo.path);
        assert_eq!(Some("page=2".to_string()), echo.query);
        assert_eq!(Some("/about-us".to_string()), echo.path_before_alias);
        assert_eq!(Some("/about-us".to_string()), echo.current_url);
    }
}

#[tokio::test]
async fn test_target_redirects_to_alias_for_html() {
    let (app, storage) = helper::setup_test_app();
    helper::seed(&storage, "/about-us", "/content/42").await;

    let visit = helper::get(&app, "/content/42?ref=x", helper::HTML).await;
    assert_eq!(StatusCode::FOUND, visit.status_code);
    assert_eq!(Some("/about-us?ref=x".to_string()), visit.location);

    let visit = helper::get(&app, "/content/42", helper::HTML).await;
    assert_eq!(StatusCode::FOUND, visit.status_code);
    assert_eq!(Some("/about-us".to_string()), visit.location);
}

#[tokio::test]
async fn test_target_continues_for_other_responses() {
    let (app, storage) = helper::setup_test_app();
    helper::seed(&storage, "/about-us", "/content/42").await;

    let visit = helper::get(&app, "/content/42?ref=x", helper::JSON).await;
    assert_eq!(StatusCode::OK, visit.status_code);
    assert_eq!(None, visit.location);

    let echo = visit.echo.unwrap();
    assert_eq!("/content/42", echo.path);
    assert_eq!(Some("ref=x".to_string()), echo.query);
    assert_eq!(Some("/content/42".to_string()), echo.path_before_alias);

    // no `Accept` at all is not HTML either
    let visit = helper::visit(&app, Method::GET, "/content/42", None).await;
    assert_eq!(StatusCode::OK, visit.status_code);
}

#[tokio::test]
async fn test_eligible_methods() {
    let (app, storage) = helper::setup_test_app();
    helper::seed(&storage, "/about-us", "/content/42").await;

    for method in [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
    ] {
        let visit = helper::visit(&app, method.clone(), "/about-us", None).await;
        assert_eq!(StatusCode::OK, visit.status_code, "{method}");

        let echo = visit.echo.unwrap();
        assert_eq!("/content/42", echo.path, "{method}");
        assert!(echo.matched, "{method}");
    }

    for method in [Method::OPTIONS, Method::TRACE] {
        let visit = helper::visit(&app, method.clone(), "/about-us", None).await;
        assert_eq!(StatusCode::OK, visit.status_code, "{method}");

        let echo = visit.echo.unwrap();
        assert_eq!("/about-us", echo.path, "{method}");
        assert!(!echo.matched, "{method}");
        assert_eq!(None, echo.current_url, "{method}");
    }
}

#[tokio::test]
async fn test_disabled() {
    let storage = helper::ProbeStorage::default();
    helper::seed(&storage, "/about-us", "/content/42").await;

    let config = Config {
        enabled: false,
        ..helper::config()
    };
    let app = helper::setup_test_app_with(config, storage.clone());

    let visit = helper::get(&app, "/about-us", helper::HTML).await;
    assert_eq!(StatusCode::OK, visit.status_code);
    let echo = visit.echo.unwrap();
    assert_eq!("/about-us", echo.path);
    assert!(!echo.matched);
    assert_eq!(None, echo.current_url);

    let visit = helper::get(&app, "/content/42", helper::HTML).await;
    assert_eq!(StatusCode::OK, visit.status_code);
    assert_eq!(None, visit.location);

    assert_eq!(0, storage.lookups());
}

#[tokio::test]
async fn test_public_prefixes_skip_lookup() {
    let storage = helper::ProbeStorage::default();
    helper::seed(&storage, "/public/logo.png", "/content/42").await;

    let app = helper::setup_test_app_with(helper::config(), storage.clone());

    let visit = helper::get(&app, "/public/logo.png", helper::HTML).await;
    assert_eq!(StatusCode::OK, visit.status_code);
    let echo = visit.echo.unwrap();
    assert_eq!("/public/logo.png", echo.path);
    assert_eq!(Some("/public/logo.png".to_string()), echo.path_before_alias);

    let visit = helper::get(&app, "/health", helper::HTML).await;
    assert_eq!(StatusCode::OK, visit.status_code);
    assert_eq!("ok", visit.body);

    assert_eq!(0, storage.lookups());

    // everything else is looked up exactly once
    helper::get(&app, "/about-us", helper::HTML).await;
    assert_eq!(1, storage.lookups());
}

#[tokio::test]
async fn test_failing_lookup_passes_through() {
    let storage = helper::ProbeStorage::default();
    helper::seed(&storage, "/about-us", "/content/42").await;
    storage.fail_lookups();

    let app = helper::setup_test_app_with(helper::config(), storage.clone());

    let visit = helper::get(&app, "/about-us", helper::HTML).await;
    assert_eq!(StatusCode::OK, visit.status_code);

    let echo = visit.echo.unwrap();
    assert_eq!("/about-us", echo.path);
    assert_eq!(Some("/about-us".to_string()), echo.path_before_alias);
    assert_eq!(None, echo.current_url);

    assert_eq!(1, storage.lookups());
}

#[tokio::test]
async fn test_invalid_path() {
    let (app, _storage) = helper::setup_test_app();

    let visit = helper::get(&app, "/%c0", helper::HTML).await;
    assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, visit.status_code);
    assert_eq!("Error on parse url", visit.body);

    // a disabled resolver does not look at the path at all
    let app = helper::setup_test_app_with(Config::default(), Memory::new());

    let visit = helper::get(&app, "/%c0", helper::HTML).await;
    assert_eq!(StatusCode::OK, visit.status_code);
}

#[tokio::test]
async fn test_encoded_paths() {
    let (app, storage) = helper::setup_test_app();
    helper::seed(&storage, "/sobre-n\u{f3}s", "/content/conte\u{fa}do 1").await;

    let visit = helper::get(&app, "/sobre-n%C3%B3s", helper::JSON).await;
    assert_eq!(StatusCode::OK, visit.status_code);

    let echo = visit.echo.unwrap();
    assert!(echo.matched);
    assert_eq!("/content/conte%C3%BAdo%201", echo.path);
    assert_eq!(Some("/sobre-n\u{f3}s".to_string()), echo.current_url);

    let visit = helper::get(&app, "/content/conte%C3%BAdo%201", helper::HTML).await;
    assert_eq!(StatusCode::FOUND, visit.status_code);
    assert_eq!(Some("/sobre-n%C3%B3s".to_string()), visit.location);
}

#[tokio::test]
async fn test_newest_alias_wins() {
    let (app, storage) = helper::setup_test_app();
    helper::seed(&storage, "/about-us", "/content/42").await;
    helper::seed(&storage, "/who-we-are", "/content/42").await;

    let visit = helper::get(&app, "/content/42", helper::HTML).await;
    assert_eq!(StatusCode::FOUND, visit.status_code);
    assert_eq!(Some("/who-we-are".to_string()), visit.location);

    // the older alias still continues as the target
    let visit = helper::get(&app, "/about-us", helper::HTML).await;
    assert_eq!(StatusCode::OK, visit.status_code);
    assert_eq!("/content/42", visit.echo.unwrap().path);
}

#[tokio::test]
async fn test_alias_created_through_api_resolves() {
    let (app, _storage) = helper::setup_test_app();

    let url_alias = helper::create_url_alias(&app, "/about-us", "/url-alias/1").await;
    assert_eq!(1, url_alias.id);

    // aliases can point anywhere, even to paths nothing claims
    let visit = helper::get(&app, "/about-us", helper::JSON).await;
    assert_eq!(StatusCode::OK, visit.status_code);
    let echo = visit.echo.unwrap();
    assert_eq!("/url-alias/1", echo.path);
    assert!(!echo.matched);
}

#[tokio::test]
async fn test_alias_resolves_as_submitted() {
    let (app, _storage) = helper::setup_test_app();

    helper::create_url_alias(&app, "/about-us/", "/content/42").await;
    helper::create_url_alias(&app, "/cafe\u{301}", "/content/43").await;

    let visit = helper::get(&app, "/about-us/", helper::JSON).await;
    assert_eq!(StatusCode::OK, visit.status_code);
    let echo = visit.echo.unwrap();
    assert!(echo.matched);
    assert_eq!("/content/42", echo.path);
    assert_eq!(Some("/about-us/".to_string()), echo.current_url);

    // decomposed and composed forms are the same alias
    for uri in ["/cafe%CC%81", "/caf%C3%A9"] {
        let visit = helper::get(&app, uri, helper::JSON).await;
        assert_eq!(StatusCode::OK, visit.status_code, "{uri}");
        assert_eq!("/content/43", visit.echo.unwrap().path, "{uri}");
    }

    // the target with a trailing slash still redirects to the stored alias
    let visit = helper::get(&app, "/content/42/", helper::HTML).await;
    assert_eq!(StatusCode::FOUND, visit.status_code);
    assert_eq!(Some("/about-us".to_string()), visit.location);
}

#[tokio::test]
async fn test_path_before_alias_is_decoded() {
    let (app, _storage) = helper::setup_test_app();

    // ineligible method
    let visit = helper::visit(&app, Method::OPTIONS, "/sobre-n%C3%B3s", None).await;
    let echo = visit.echo.unwrap();
    assert_eq!(Some("/sobre-n\u{f3}s".to_string()), echo.path_before_alias);

    // disabled resolver
    let config = Config {
        enabled: false,
        ..helper::config()
    };
    let app = helper::setup_test_app_with(config, Memory::new());

    let visit = helper::get(&app, "/sobre-n%C3%B3s", helper::JSON).await;
    let echo = visit.echo.unwrap();
    assert_eq!("/sobre-n%C3%B3s", echo.path);
    assert_eq!(Some("/sobre-n\u{f3}s".to_string()), echo.path_before_alias);
}
