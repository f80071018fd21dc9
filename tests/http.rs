//! End-to-end check over a real socket.

use std::sync::Arc;

use movies::cors::CorsPolicy;
use movies::schema::SchemaRules;
use movies::server::MovieServer;
use movies::MovieDb;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

#[tokio::test]
async fn serves_crud_over_http() {
    let db = Arc::new(MovieDb::with_bundled_seed(SchemaRules::default()).unwrap());
    let seeded = db.len();
    let server = MovieServer::new(db.clone(), CorsPolicy::default());

    let (stop, stopped) = oneshot::channel::<()>();
    let (addr, serve) = server
    .bind(([127, 0, 0, 1], 0).into(), async {
        let _ = stopped.await;
    })
    .unwrap();
    let handle = tokio::spawn(serve);

    let base = format!("http://{}", addr);
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/movies", base)).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    let listed: Vec<Value> = res.json().await.unwrap();
    assert_eq!(listed.len(), seeded);

    let res = client
    .post(format!("{}/movies", base))
    .json(&json!({
        "title": "Alien",
        "year": 1979,
        "director": "Ridley Scott",
        "duration": 117,
        "poster": "https://example.com/alien.jpg",
        "genre": ["horror", "sci-fi"]
    }))
    .send()
    .await
    .unwrap();
    assert_eq!(res.status(), 201);
    let created: Value = res.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    let res = client
    .patch(format!("{}/movies/{}", base, id))
    .json(&json!({ "rate": 8.5 }))
    .send()
    .await
    .unwrap();
    assert_eq!(res.status(), 200);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["rate"], json!(8.5));
    assert_eq!(updated["title"], "Alien");

    let res = client
    .get(format!("{}/movies?genre=HORROR", base))
    .send()
    .await
    .unwrap();
    let horror: Vec<Value> = res.json().await.unwrap();
    assert!(horror.iter().any(|m| m["id"] == json!(id)));

    let res = client.delete(format!("{}/movies/{}", base, id)).send().await.unwrap();
    assert_eq!(res.status(), 204);
    assert_eq!(db.len(), seeded);

    let res = client.get(format!("{}/movies/{}", base, id)).send().await.unwrap();
    assert_eq!(res.status(), 404);

    let _ = stop.send(());
    handle.await.unwrap();
}

#[tokio::test]
async fn accepts_chunked_request_bodies() {
    let db = Arc::new(MovieDb::with_bundled_seed(SchemaRules::default()).unwrap());
    let id = db.list(None).unwrap()[0].id.clone();
    let server = MovieServer::new(db.clone(), CorsPolicy::default());

    let (stop, stopped) = oneshot::channel::<()>();
    let (addr, serve) = server
    .bind(([127, 0, 0, 1], 0).into(), async {
        let _ = stopped.await;
    })
    .unwrap();
    let handle = tokio::spawn(serve);

    let body = r#"{"rate":9.1}"#;
    let request = format!(
        "PATCH /movies/{} HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n{:x}\r\n{}\r\n0\r\n\r\n",
        id,
        addr,
        body.len(),
        body
    );

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
    assert_eq!(db.get(&id).unwrap().rate, 9.1);

    let _ = stop.send(());
    handle.await.unwrap();
}
