mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};

use common::{TestApp, ADMIN, EDITOR, OWNER, STRANGER};
use featuredesk::config::AppConfig;
use featuredesk::database::models::FeatureEntry;

fn form(pairs: &[(&str, &str)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

#[tokio::test]
async fn www_host_is_redirected() -> Result<()> {
    let app = TestApp::new();

    let request = Request::builder()
        .uri("/features?q=css")
        .header(header::HOST, "www.example.org")
        .body(Body::empty())?;
    let response = app.send(request).await?;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(
        response.header("location"),
        Some("http://example.org/features?q=css")
    );
    Ok(())
}

#[tokio::test]
async fn root_and_change_password_redirect() -> Result<()> {
    let app = TestApp::new();

    let response = app.get("/", None).await?;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.header("location"), Some("/roadmap"));

    let response = app.get("/.well-known/change-password", None).await?;
    assert_eq!(response.header("location"), Some("/settings"));
    Ok(())
}

#[tokio::test]
async fn spa_shell_embeds_page_data() -> Result<()> {
    let app = TestApp::new();

    let response = app.get("/settings", Some(OWNER)).await?;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.header("content-type").map_or(false, |ct| ct.starts_with("text/html")));
    assert!(response.body.contains("<title>Feature Desk</title>"));
    assert!(response.body.contains("\"xsrf_token\":\""));
    assert!(response.body.contains(OWNER));
    assert_eq!(response.header("x-frame-options"), Some("DENY"));
    Ok(())
}

#[tokio::test]
async fn signin_gate_redirects_once() -> Result<()> {
    let app = TestApp::new();

    let response = app.get("/settings", None).await?;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.header("location"), Some("/?loginStatus=False"));

    let response = app.get("/settings?loginStatus=False", None).await?;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("\"user\":null"));
    Ok(())
}

#[tokio::test]
async fn permission_gated_pages() -> Result<()> {
    let app = TestApp::with_sample_feature();

    assert_eq!(app.get("/admin/users/new", Some(OWNER)).await?.status, StatusCode::FORBIDDEN);
    assert_eq!(app.get("/admin/users/new", Some(ADMIN)).await?.status, StatusCode::OK);

    assert_eq!(app.get("/enterprise", Some(STRANGER)).await?.status, StatusCode::FORBIDDEN);
    assert_eq!(app.get("/enterprise", Some(ADMIN)).await?.status, StatusCode::OK);

    assert_eq!(app.get("/guide/new", Some(STRANGER)).await?.status, StatusCode::FORBIDDEN);
    assert_eq!(app.get("/guide/new", Some(EDITOR)).await?.status, StatusCode::OK);

    assert_eq!(app.get("/guide/edit/1", Some(STRANGER)).await?.status, StatusCode::FORBIDDEN);
    assert_eq!(app.get("/guide/edit/1", Some(OWNER)).await?.status, StatusCode::OK);
    assert_eq!(app.get("/guide/edit/1", None).await?.status, StatusCode::FOUND);
    assert_eq!(app.get("/guide/edit/404", Some(ADMIN)).await?.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get("/guide/edit/abc", Some(ADMIN)).await?.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn guide_edit_form_updates_feature() -> Result<()> {
    let app = TestApp::with_sample_feature();
    let token = app.xsrf_for(OWNER);

    let body = form(&[
        ("token", token.as_str()),
        ("summary", "  A clearer summary  "),
        ("owner_emails", "owner@other.org, second@other.org"),
        ("doc_links", "https://docs.example.org/a\nnot a link\ndocs.example.org/b"),
        ("category", "3"),
    ]);
    let response = app.form_post("/guide/edit/1", OWNER, &body).await?;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.header("location"), Some("/feature/1"));

    let feature = app.feature(1);
    assert_eq!(feature.summary, "A clearer summary");
    assert_eq!(feature.owner_emails, vec!["owner@other.org", "second@other.org"]);
    assert_eq!(
        feature.doc_links,
        vec!["https://docs.example.org/a", "http://docs.example.org/b"]
    );
    assert_eq!(feature.category, Some(3));
    assert_eq!(feature.blink_components, vec!["Blink>DOM"]);
    assert_eq!(app.store.persist_count(), 1);
    Ok(())
}

#[tokio::test]
async fn guide_edit_post_needs_token() -> Result<()> {
    let app = TestApp::with_sample_feature();

    let response = app
        .form_post("/guide/edit/1", OWNER, &form(&[("summary", "x")]))
        .await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.feature(1).summary, "");
    Ok(())
}

#[tokio::test]
async fn guide_edit_rejects_bad_category() -> Result<()> {
    let app = TestApp::with_sample_feature();
    let token = app.xsrf_for(OWNER);

    let response = app
        .form_post("/guide/edit/1", OWNER, &form(&[("token", token.as_str()), ("category", "many")]))
        .await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.store.persist_count(), 0);
    Ok(())
}

#[tokio::test]
async fn pages_refuse_other_verbs() -> Result<()> {
    let app = TestApp::new();

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/roadmap")
        .body(Body::empty())?;
    let response = app.send(request).await?;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.header("allow"), Some("GET"));
    Ok(())
}

#[tokio::test]
async fn opensearch_description_is_rendered_as_xml() -> Result<()> {
    let app = TestApp::new();

    let response = app.get("/opensearch.xml", None).await?;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.starts_with("<?xml"));
    assert!(response.body.contains("opensearch.xml"));
    Ok(())
}

#[tokio::test]
async fn guide_edit_advertises_post() -> Result<()> {
    let app = TestApp::with_sample_feature();

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/guide/edit/1")
        .body(Body::empty())?;
    let response = app.send(request).await?;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.header("allow"), Some("GET, POST"));
    Ok(())
}

#[tokio::test]
async fn guide_edit_post_rejects_tampered_token() -> Result<()> {
    let app = TestApp::with_sample_feature();
    let mut token = app.xsrf_for(OWNER);
    let last = if token.ends_with('A') { "B" } else { "A" };
    token.replace_range(token.len() - 1.., last);

    let response = app
        .form_post("/guide/edit/1", OWNER, &form(&[("token", token.as_str()), ("summary", "x")]))
        .await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_str(&response.body)?;
    assert_eq!(body["message"], "Invalid XSRF token");
    assert_eq!(app.store.persist_count(), 0);
    Ok(())
}

#[tokio::test]
async fn unit_test_mode_skips_page_token_check() -> Result<()> {
    let mut config = AppConfig::development();
    config.app.unit_test_mode = true;
    let app = TestApp::with_config(config);
    let mut feature = FeatureEntry::new(1, "Sample feature");
    feature.owner_emails = vec![OWNER.to_string()];
    app.store.insert(feature)?;

    let response = app
        .form_post("/guide/edit/1", OWNER, &form(&[("summary", "No token needed")]))
        .await?;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(app.feature(1).summary, "No token needed");
    Ok(())
}

#[tokio::test]
async fn const_page_sets_cache_control() -> Result<()> {
    let app = TestApp::new();

    let response = app.get("/opensearch.xml", None).await?;
    let max_age = app.state.config.server.default_cache_time_secs;
    assert_eq!(
        response.header("cache-control"),
        Some(format!("public, max-age={}", max_age).as_str())
    );

    let response = app.get("/roadmap", None).await?;
    assert!(response.header("cache-control").is_none());
    Ok(())
}
