#![allow(unused_crate_dependencies)]

mod connections;
mod server;

use std::sync::Arc;

use graphql_query_diff::{Diagnostic, QueryRoot, QueryTracker, RecordStore, Schema, diff_query};
use itertools::Itertools;
use serde_json::{Value, json};
use server::Server;

#[ctor::ctor]
fn setup_logging() {
    let filter = tracing_subscriber::filter::EnvFilter::builder()
        .parse(std::env::var("RUST_LOG").unwrap_or("graphql_query_diff=debug".to_string()))
        .unwrap();
    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .without_time()
        .init();
}

const SCHEMA: &str = r#"
    type Query {
        viewer: Viewer
        node(id: ID!): Node
    }

    interface Node {
        id: ID!
    }

    interface FeedUnit {
        id: ID!
        feedback: Feedback
        message: Text
    }

    type Viewer {
        actor: User
        friends: [User]
        newsFeed(first: Int, after: String, last: Int, before: String, find: ID): NewsFeedConnection
        notificationStories(first: Int, after: String): NewsFeedConnection
    }

    type NewsFeedConnection {
        count: Int
        edges: [NewsFeedEdge]
        pageInfo: PageInfo
    }

    type NewsFeedEdge {
        cursor: String!
        node: FeedUnit
        showBeeper: Boolean
        sortKey: String
    }

    type PageInfo {
        hasNextPage: Boolean!
        hasPreviousPage: Boolean!
    }

    type Story implements FeedUnit & Node {
        id: ID!
        feedback: Feedback
        message: Text
    }

    type Feedback implements Node {
        id: ID!
        likers: Int
        comments(first: Int, after: String, last: Int, before: String): CommentsConnection
    }

    type CommentsConnection {
        edges: [CommentEdge]
        pageInfo: PageInfo
    }

    type CommentEdge {
        cursor: String!
        node: Comment
    }

    type Comment implements Node {
        id: ID!
        body: Text
    }

    type Text {
        text: String
    }

    type User implements Node {
        id: ID!
        name: String
    }
"#;

struct Cache {
    schema: Arc<Schema>,
    server: Server,
    store: RecordStore,
    tracker: QueryTracker,
}

struct Diff {
    roots: Vec<QueryRoot>,
    diagnostics: Vec<Diagnostic>,
}

impl Diff {
    fn printed(&self) -> String {
        self.roots.iter().join("\n")
    }
}

impl Cache {
    /// A cache in front of the five stories of `feed(story)`.
    fn new() -> Self {
        Cache::with_server(feed(story))
    }

    fn with_server(data: Value) -> Self {
        Cache {
            schema: Arc::new(Schema::from_sdl(SCHEMA).unwrap()),
            server: Server::new(data),
            store: RecordStore::new(),
            tracker: QueryTracker::new(),
        }
    }

    fn query(&self, query: &str) -> QueryRoot {
        QueryRoot::parse(&self.schema, query, &Default::default())
            .unwrap()
            .remove(0)
    }

    /// Sends `query` to the server and writes its response.
    fn fetch(&mut self, query: &str) -> &mut Self {
        let root = self.query(query);
        self.fetch_roots(&[root])
    }

    fn fetch_roots(&mut self, roots: &[QueryRoot]) -> &mut Self {
        for root in roots {
            let response = self.server.respond(root);
            self.store.writer().write_payload(root, &response).unwrap();
        }
        self
    }

    fn diff(&mut self, query: &str) -> Diff {
        let root = self.query(query);
        self.diff_root(&root)
    }

    fn diff_root(&mut self, root: &QueryRoot) -> Diff {
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let roots = diff_query(root, &self.store, &mut self.tracker, &mut diagnostics).unwrap();
        Diff { roots, diagnostics }
    }
}

/// Server data: a viewer `u1` whose news feed and notifications hold the five stories built by
/// `story`, under cursors `c1` to `c5`.
fn feed(story: impl Fn(usize) -> Value) -> Value {
    let actor = json!({ "__typename": "User", "id": "u1", "name": "Ada" });
    let edges = (1..=5)
        .map(|index| {
            json!({
                "cursor": format!("c{index}"),
                "showBeeper": index == 1,
                "sortKey": format!("k{index}"),
                "node": story(index),
            })
        })
        .collect::<Vec<_>>();

    json!({
        "viewer": {
            "actor": actor.clone(),
            "friends": [actor, { "__typename": "User", "id": null, "name": "Anonymous" }, null],
            "newsFeed": { "count": 5, "edges": edges.clone() },
            "notificationStories": { "count": 5, "edges": edges },
        }
    })
}

/// Story `s<index>` with feedback `f<index>` and three comments.
fn story(index: usize) -> Value {
    json!({
        "__typename": "Story",
        "id": format!("s{index}"),
        "message": { "text": format!("story {index}") },
        "feedback": {
            "__typename": "Feedback",
            "id": format!("f{index}"),
            "likers": index,
            "comments": {
                "edges": (1..=3)
                    .map(|comment| {
                        json!({
                            "cursor": format!("cc{comment}"),
                            "node": {
                                "__typename": "Comment",
                                "id": format!("comment{index}-{comment}"),
                                "body": { "text": "nice" },
                            },
                        })
                    })
                    .collect::<Vec<_>>(),
            },
        },
    })
}
