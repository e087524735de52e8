use axum::http::StatusCode;

use crate::tests::helper;

#[tokio::test]
async fn test_invalid_json() {
    let (app, _storage) = helper::setup_test_app();

    let access_token = helper::admin_token();

    // missing wrapper
    let body = r#"{"alias":"/about-us","target":"/content/42"}"#;
    let (status_code, _, error) =
        helper::maybe_create_url_alias_with_raw_body(&app, &access_token, body, true).await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    let error = error.unwrap();
    assert_eq!("Data error".to_string(), error.error);
    assert!(
        error
            .description
            .unwrap()
            .starts_with("Failed to deserialize the JSON body into the target type")
    );

    // missing data
    let body = r#"{"url-alia":{"alias":"/about-us"}}"#;
    let (status_code, _, error) =
        helper::maybe_create_url_alias_with_raw_body(&app, &access_token, body, true).await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!("Data error".to_string(), error.unwrap().error);

    // syntax error
    let body = r#"{"}"#;
    let (status_code, _, error) =
        helper::maybe_create_url_alias_with_raw_body(&app, &access_token, body, true).await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    let error = error.unwrap();
    assert_eq!("JSON syntax error".to_string(), error.error);
    assert_eq!(
        Some("EOF while parsing a string at line 1 column 3".to_string()),
        error.description
    );

    // missing content type
    let body = r#"{"url-alia":{"alias":"/about-us","target":"/content/42"}}"#;
    let (status_code, _, error) =
        helper::maybe_create_url_alias_with_raw_body(&app, &access_token, body, false).await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!(
        "Missing `application/json` content type".to_string(),
        error.unwrap().error
    );

    // nothing was created
    let (_, url_aliases, _) = helper::list_url_aliases(&app, "").await;
    assert_eq!(0, url_aliases.unwrap().1);
}
