//! Live requests against the API stub.

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use crate::{TestServer, http_client};

    #[tokio::test]
    async fn test_should_return_fixed_messages() {
        let server = TestServer::start().await.expect("start server");
        let client = http_client();

        for (path, expected) in [
            ("/api/v1/", json!({ "message": "hello world" })),
            ("/api/v1/hello", json!({ "message": "helloooo" })),
        ] {
            let resp = client.get(server.url(path)).send().await.expect("send");
            assert_eq!(resp.status(), 200);
            assert_eq!(
                resp.headers()["content-type"],
                "application/json; charset=utf-8"
            );
            let body: Value = resp.json().await.expect("json body");
            assert_eq!(body, expected);
        }

        server.stop().await.expect("stop server");
    }

    #[tokio::test]
    async fn test_should_redirect_trailing_slash_variants() {
        let server = TestServer::start().await.expect("start server");
        let client = http_client();

        for (path, location) in [("/api/v1", "/api/v1/"), ("/api/v1/hello/", "/api/v1/hello")] {
            let resp = client.get(server.url(path)).send().await.expect("send");
            assert_eq!(resp.status(), 301);
            assert_eq!(resp.headers()["location"], location);
        }

        server.stop().await.expect("stop server");
    }

    #[tokio::test]
    async fn test_should_return_plain_404_for_unknown_requests() {
        let server = TestServer::start().await.expect("start server");
        let client = http_client();

        let resp = client.get(server.url("/api/v1/missing")).send().await.expect("send");
        assert_eq!(resp.status(), 404);
        assert_eq!(resp.headers()["content-type"], "text/plain");
        assert_eq!(resp.text().await.expect("text"), "404 page not found");

        let resp = client.post(server.url("/api/v1/hello")).send().await.expect("send");
        assert_eq!(resp.status(), 404);

        server.stop().await.expect("stop server");
    }
}
