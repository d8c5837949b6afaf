use std::sync::Arc;

use graphql_query_diff::Diagnostic;
use indoc::indoc;
use serde_json::{Value, json};

use crate::{Cache, feed, story};

fn feed_query(arguments: &str) -> String {
    format!("{{ viewer {{ newsFeed({arguments}) {{ edges {{ cursor node {{ id message {{ text }} }} }} }} }} }}")
}

fn story_with_id(id: Value) -> impl Fn(usize) -> Value {
    move |index| {
        let mut story = story(index);
        story["id"] = id.clone();
        story
    }
}

#[test]
fn unfetched_connection_returns_the_original_root() {
    let mut cache = Cache::new();

    let query = cache.query(&feed_query("first: 3"));
    let diff = cache.diff_root(&query);

    assert_eq!(diff.roots.len(), 1);
    assert!(Arc::ptr_eq(diff.roots[0].field(), query.field()));
    assert!(diff.diagnostics.is_empty());
}

#[test]
fn unfetched_connection_on_a_fetched_record() {
    let mut cache = Cache::new();
    cache.fetch("{ viewer { actor { id name } } }");

    let diff = cache.diff(indoc! {"
        {
          viewer {
            actor { name }
            newsFeed(first: 3) { edges { cursor } }
          }
        }
    "});

    insta::assert_snapshot!(diff.printed(), @r"
    query {
      viewer {
        newsFeed(first: 3) {
          edges {
            cursor
          }
        }
      }
    }
    ");
}

#[test]
fn fully_fetched_connection() {
    let mut cache = Cache::new();
    cache.fetch(&feed_query("first: 3"));

    let diff = cache.diff(&feed_query("first: 3"));
    assert!(diff.roots.is_empty());

    let diff = cache.diff(&feed_query("first: 2"));
    assert!(diff.roots.is_empty());
}

#[test]
fn partially_fetched_connection_is_extended() {
    let mut cache = Cache::new();
    cache.fetch(&feed_query("first: 3"));

    let diff = cache.diff(&feed_query("first: 5"));
    insta::assert_snapshot!(diff.printed(), @r#"
    query {
      viewer {
        newsFeed(after: "c3", first: 2) {
          edges {
            cursor
            node {
              __typename
              id
              message {
                text
              }
            }
          }
        }
      }
    }
    "#);

    cache.fetch_roots(&diff.roots);
    assert!(cache.diff(&feed_query("first: 5")).roots.is_empty());
}

#[test]
fn extension_roots_select_what_normalization_needs() {
    let mut cache = Cache::new();
    cache.fetch("{ viewer { newsFeed(first: 3) { edges { node { id } } } } }");

    let diff = cache.diff("{ viewer { newsFeed(first: 5) { edges { node { id } } } } }");
    insta::assert_snapshot!(diff.printed(), @r#"
    query {
      viewer {
        newsFeed(after: "c3", first: 2) {
          edges {
            cursor
            node {
              __typename
              id
            }
          }
        }
      }
    }
    "#);

    cache.fetch_roots(&diff.roots);
    assert!(cache.diff("{ viewer { newsFeed(first: 5) { edges { node { id } } } } }").roots.is_empty());

    let diff = cache.diff("{ viewer { newsFeed(first: 5) { edges { node { id feedback { id } } } } } }");
    assert!(diff.diagnostics.is_empty());
    assert_eq!(
        diff.roots
            .iter()
            .map(|root| root.identifying_argument().unwrap_or_default())
            .collect::<Vec<_>>(),
        ["s1", "s2", "s3", "s4", "s5"]
    );
}

#[test]
fn backward_windows_are_extended_before_their_head() {
    let mut cache = Cache::new();
    cache.fetch(&feed_query("last: 2"));

    let diff = cache.diff(&feed_query("last: 3"));
    insta::assert_snapshot!(diff.printed(), @r#"
    query {
      viewer {
        newsFeed(before: "c4", last: 1) {
          edges {
            cursor
            node {
              __typename
              id
              message {
                text
              }
            }
          }
        }
      }
    }
    "#);

    cache.fetch_roots(&diff.roots);
    assert!(cache.diff(&feed_query("last: 3")).roots.is_empty());
}

#[test]
fn end_of_connection_satisfies_larger_windows() {
    let mut cache = Cache::new();
    cache.fetch("{ viewer { newsFeed(first: 10) { edges { cursor node { id } } pageInfo { hasNextPage } } } }");

    let diff = cache.diff("{ viewer { newsFeed(first: 20) { edges { cursor node { id } } pageInfo { hasNextPage } } } }");
    assert!(diff.roots.is_empty());
}

#[test]
fn extension_of_a_connection_under_an_identified_record() {
    let mut cache = Cache::new();
    cache.fetch(
        r#"{ node(id: "f1") { ... on Feedback { comments(first: 1) { edges { cursor node { id } } pageInfo { hasNextPage } } } } }"#,
    );

    let query = r#"{ node(id: "f1") { ... on Feedback { comments(first: 3) { edges { cursor node { id } } pageInfo { hasNextPage } } } } }"#;
    let diff = cache.diff(query);

    insta::assert_snapshot!(diff.printed(), @r#"
    query {
      node(id: "f1") {
        id
        __typename
        ... on Feedback {
          comments(after: "cc1", first: 2) {
            edges {
              cursor
              node {
                id
              }
            }
            pageInfo {
              hasNextPage
            }
          }
        }
      }
    }
    "#);

    cache.fetch_roots(&diff.roots);
    assert!(cache.diff(query).roots.is_empty());
}

#[test]
fn missing_node_data_is_fetched_by_identifier() {
    let mut cache = Cache::new();
    cache.fetch("{ viewer { newsFeed(first: 3) { edges { cursor node { id } } } } }");

    let diff = cache.diff("{ viewer { newsFeed(first: 3) { edges { cursor node { id feedback { id } } } } } }");

    assert!(diff.diagnostics.is_empty());
    insta::assert_snapshot!(diff.printed(), @r#"
    query {
      node(id: "s1") {
        id
        __typename
        ... on FeedUnit {
          feedback {
            id
          }
        }
      }
    }
    query {
      node(id: "s2") {
        id
        __typename
        ... on FeedUnit {
          feedback {
            id
          }
        }
      }
    }
    query {
      node(id: "s3") {
        id
        __typename
        ... on FeedUnit {
          feedback {
            id
          }
        }
      }
    }
    "#);

    cache.fetch_roots(&diff.roots);

    assert!(
        cache
            .diff("{ viewer { newsFeed(first: 3) { edges { cursor node { id feedback { id } } } } } }")
            .roots
            .is_empty()
    );
}

#[test]
fn missing_edge_data_is_fetched_through_find() {
    let mut cache = Cache::new();
    cache.fetch("{ viewer { newsFeed(first: 2) { edges { cursor node { id __typename } } } } }");

    let query = "{ viewer { newsFeed(first: 2) { edges { cursor node { id __typename feedback { id } } sortKey } } } }";
    let diff = cache.diff(query);

    assert!(diff.diagnostics.is_empty());
    insta::assert_snapshot!(diff.printed(), @r#"
    query {
      node(id: "s1") {
        id
        __typename
        ... on FeedUnit {
          feedback {
            id
          }
        }
      }
    }
    query {
      viewer {
        newsFeed(find: "s1") {
          edges {
            cursor
            node {
              id
              __typename
            }
            sortKey
          }
        }
      }
    }
    query {
      node(id: "s2") {
        id
        __typename
        ... on FeedUnit {
          feedback {
            id
          }
        }
      }
    }
    query {
      viewer {
        newsFeed(find: "s2") {
          edges {
            cursor
            node {
              id
              __typename
            }
            sortKey
          }
        }
      }
    }
    "#);

    cache.fetch_roots(&diff.roots[..2]);

    let diff = cache.diff("{ viewer { newsFeed(first: 2) { edges { cursor sortKey } } } }");
    insta::assert_snapshot!(diff.printed(), @r#"
    query {
      viewer {
        newsFeed(find: "s2") {
          edges {
            cursor
            node {
              id
              __typename
            }
            sortKey
          }
        }
      }
    }
    "#);

    cache.fetch_roots(&diff.roots);
    assert!(cache.diff(query).roots.is_empty());
}

#[test]
fn missing_edge_data_of_a_connection_without_find() {
    let mut cache = Cache::new();
    cache.fetch("{ viewer { notificationStories(first: 3) { edges { cursor node { id } } } } }");

    let diff = cache.diff("{ viewer { notificationStories(first: 3) { edges { cursor showBeeper node { id message { text } } } } } }");

    assert_eq!(diff.roots.len(), 3);
    assert!(
        diff.roots
            .iter()
            .all(|root| root.identifying_argument().is_some())
    );

    let expected = Diagnostic::ConnectionNotFindable {
        connection: "notificationStories".into(),
    };
    assert_eq!(diff.diagnostics, vec![expected.clone(), expected.clone(), expected]);
    insta::assert_snapshot!(diff.diagnostics[0], @"connection `edges{*}` fields can only be refetched if the connection supports the `find` call. Cannot refetch data for field `notificationStories`.");
}

const NODES_WITHOUT_ID: &str = "{ viewer { newsFeed(first: 3) { edges { cursor node { message { text } } } } } }";

fn nodes_without_id() -> Cache {
    let mut cache = Cache::with_server(feed(story_with_id(Value::Null)));
    cache.fetch(NODES_WITHOUT_ID);
    cache
}

#[test]
fn missing_data_on_nodes_without_id_is_reported() {
    let mut cache = nodes_without_id();

    let diff = cache.diff("{ viewer { newsFeed(first: 3) { edges { cursor node { message { text } feedback { id } } } } } }");

    assert!(diff.roots.is_empty());
    assert_eq!(diff.diagnostics.len(), 3);
    insta::assert_snapshot!(diff.diagnostics[0], @"Field `node` on connection `newsFeed` cannot be retrieved if it does not have an `id` field. If you expect fields to be retrieved on this field, add an `id` field in the schema. If you choose to ignore this warning, you can silence it by adding `@relay(isConnectionWithoutNodeID: true)` to the connection field.");
}

#[test]
fn missing_data_on_nodes_without_id_can_be_silenced() {
    let mut cache = nodes_without_id();

    let diff = cache.diff(
        "{ viewer { newsFeed(first: 3) @relay(isConnectionWithoutNodeID: true) { edges { cursor node { message { text } feedback { id } } } } } }",
    );

    assert!(diff.roots.is_empty());
    assert!(diff.diagnostics.is_empty());
}

#[test]
fn nodes_without_id_and_nothing_missing() {
    let mut cache = nodes_without_id();

    let diff = cache.diff(NODES_WITHOUT_ID);

    assert!(diff.roots.is_empty());
    assert!(diff.diagnostics.is_empty());
}

#[test]
fn empty_identifiers_are_not_refetchable() {
    let mut cache = Cache::with_server(feed(story_with_id(json!(""))));
    cache.fetch(&feed_query("first: 3"));

    let diff = cache.diff("{ viewer { newsFeed(first: 3) { edges { cursor node { id message { text } feedback { id } } } } } }");

    assert!(diff.roots.is_empty());
    assert_eq!(
        diff.diagnostics,
        vec![
            Diagnostic::ConnectionNodeWithoutId {
                connection: "newsFeed".into()
            };
            3
        ]
    );
}

#[test]
fn split_queries_under_nodes_without_id() {
    let mut cache = Cache::with_server(feed(story_with_id(Value::Null)));
    cache.fetch(
        "{ viewer { newsFeed(first: 1) { edges { cursor node { feedback { id comments(first: 1) { edges { cursor node { id } } } } } } } } }",
    );

    let query = "{ viewer { newsFeed(first: 1) { edges { cursor node { feedback { id comments(first: 1) { edges { cursor node { id body { text } } } } } } } } } }";
    let diff = cache.diff(query);

    assert!(diff.diagnostics.is_empty());
    insta::assert_snapshot!(diff.printed(), @r#"
    query {
      node(id: "comment1-1") {
        id
        __typename
        ... on Comment {
          body {
            text
          }
        }
      }
    }
    "#);

    cache.fetch_roots(&diff.roots);
    assert!(cache.diff(query).roots.is_empty());
}

#[test]
fn unsupported_pagination_refetches_the_connection() {
    let mut cache = Cache::new();
    cache.fetch(&feed_query("first: 3"));

    let diff = cache.diff(&feed_query("first: 3, last: 3"));
    insta::assert_snapshot!(diff.printed(), @r"
    query {
      viewer {
        newsFeed(first: 3, last: 3) {
          edges {
            cursor
            node {
              __typename
              id
              message {
                text
              }
            }
          }
        }
      }
    }
    ");
}
