use std::time::Duration;

use httpmock::MockServer;
use prepwise::{
    application::source::{ContentSource, FetchPolicy, SourceError},
    domain::articles::{ArticleLevel, ArticleSlug},
    infra::graphql::GraphqlContentSource,
};
use reqwest::Url;

const READY_BODY: &str = r#"{
  "data": {
    "articleBySlug": {
      "id": 12,
      "title": "Two Sum",
      "slug": "two-sum",
      "level": "Basic",
      "taxonomy": "algorithms",
      "category": "arrays",
      "tags": ["hash-map", "array"],
      "content": "Given an array...",
      "excerpt": "Find two numbers that add up to a target.",
      "isGenerated": true,
      "wordCount": 420,
      "updatedAt": "2026-01-05T10:00:00Z",
      "relatedArticles": [
        {
          "id": 13,
          "title": "Three Sum",
          "slug": "three-sum",
          "excerpt": null,
          "taxonomy": "algorithms",
          "category": "arrays"
        }
      ]
    }
  }
}"#;

fn source(server: &MockServer) -> GraphqlContentSource {
    let endpoint = Url::parse(&server.url("/api/graphql")).expect("endpoint");
    GraphqlContentSource::new(endpoint, Duration::from_secs(5)).expect("client")
}

fn slug(value: &str) -> ArticleSlug {
    ArticleSlug::parse(value).unwrap()
}

#[tokio::test]
async fn ready_article_is_decoded() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method("POST").path("/api/graphql");
            then.status(200)
                .header("content-type", "application/json")
                .body(READY_BODY);
        })
        .await;

    let record = source(&server)
        .fetch(&slug("two-sum"), FetchPolicy::CacheFirst)
        .await
        .expect("fetch")
        .expect("article exists");

    assert!(record.is_generated);
    assert_eq!(record.level, Some(ArticleLevel::Basic));
    assert_eq!(record.final_content(), Some("Given an array..."));
    assert_eq!(record.related_articles.len(), 1);
    assert_eq!(record.related_articles[0].slug.as_str(), "three-sum");
    mock.assert_async().await;
}

#[tokio::test]
async fn null_article_is_not_found() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("POST").path("/api/graphql");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"data":{"articleBySlug":null}}"#);
        })
        .await;

    let result = source(&server)
        .fetch(&slug("ghost"), FetchPolicy::NetworkOnly)
        .await
        .expect("fetch");

    assert!(result.is_none());
}

#[tokio::test]
async fn graphql_errors_surface_verbatim() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("POST").path("/api/graphql");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"data":null,"errors":[{"message":"rate limited"}]}"#);
        })
        .await;

    let err = source(&server)
        .fetch(&slug("two-sum"), FetchPolicy::NetworkOnly)
        .await
        .expect_err("graphql error");

    assert_eq!(err, SourceError::Graphql("rate limited".to_string()));
    assert_eq!(err.to_string(), "rate limited");
}

#[tokio::test]
async fn non_success_status_is_a_transport_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("POST").path("/api/graphql");
            then.status(502).body("bad gateway");
        })
        .await;

    let err = source(&server)
        .fetch(&slug("two-sum"), FetchPolicy::NetworkOnly)
        .await
        .expect_err("transport error");

    match err {
        SourceError::Transport(message) => {
            assert!(message.contains("502"));
            assert!(message.contains("bad gateway"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("POST").path("/api/graphql");
            then.status(200)
                .header("content-type", "application/json")
                .body("{not json");
        })
        .await;

    let err = source(&server)
        .fetch(&slug("two-sum"), FetchPolicy::NetworkOnly)
        .await
        .expect_err("decode error");

    assert!(matches!(err, SourceError::Decode(_)));
}
