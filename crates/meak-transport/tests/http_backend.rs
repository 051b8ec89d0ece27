//! Integration tests for the HTTP backend.
//!
//! These tests spin up a throwaway HTTP responder on a local port and
//! point a real `HttpBackend` at it, so requests go through `reqwest`
//! end to end. Each accepted connection gets the next canned response
//! and is closed afterwards.

#[cfg(feature = "http")]
mod http {
    use std::sync::Arc;
    use std::time::Duration;

    use meak_protocol::{AuthEvent, UserMetadata};
    use meak_transport::{
        AuthBackend, BackendConfig, HttpBackend, MemoryTokenStore, TableBackend, TableQuery,
        TokenStore, TransportError,
    };
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc;

    /// One request as the fake server saw it.
    #[derive(Debug)]
    struct Recorded {
        method: String,
        target: String,
        headers: Vec<(String, String)>,
        body: String,
    }

    impl Recorded {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        }
    }

    /// Far enough in the future that no test ever refreshes.
    const FAR_EXPIRY: i64 = 4_102_444_800;

    fn session_json() -> String {
        format!(
            r#"{{"access_token":"at-1","token_type":"bearer","expires_in":3600,"expires_at":{FAR_EXPIRY},"refresh_token":"rt-1","user":{{"id":"u-1","email":"a@b.com","user_metadata":{{"full_name":"Amina"}}}}}}"#
        )
    }

    /// A persisted session whose access token has already expired, so the
    /// next `get_session` must refresh it.
    fn expired_session_json() -> String {
        r#"{"access_token":"at-old","token_type":"bearer","expires_in":3600,"expires_at":1,"refresh_token":"rt-old","user":{"id":"u-1","email":"a@b.com"}}"#
            .to_string()
    }

    fn expired_store() -> Arc<MemoryTokenStore> {
        let store = Arc::new(MemoryTokenStore::new());
        store
            .set_item("meak-auth-token", &expired_session_json())
            .unwrap();
        store
    }

    fn backend_with_store(url: &str, store: Arc<MemoryTokenStore>) -> HttpBackend {
        HttpBackend::new(
            BackendConfig {
                url: url.to_string(),
                anon_key: "anon".into(),
                ..BackendConfig::default()
            },
            store,
        )
        .expect("backend should build")
    }

    /// Starts the responder. Returns the base URL and a receiver of the
    /// requests, in order.
    async fn serve(responses: Vec<(u16, String)>) -> (String, mpsc::UnboundedReceiver<Recorded>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().await.unwrap();
                let recorded = read_request(&mut stream).await;
                let _ = tx.send(recorded);
                let response = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.ok();
            }
        });

        (format!("http://{addr}"), rx)
    }

    async fn read_request(stream: &mut TcpStream) -> Recorded {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let header_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let mut lines = head.split("\r\n");
        let mut request_line = lines.next().unwrap().split(' ');
        let method = request_line.next().unwrap().to_string();
        let target = request_line.next().unwrap().to_string();
        let headers: Vec<(String, String)> = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .collect();

        let len = headers
            .iter()
            .find(|(k, _)| k == "content-length")
            .map(|(_, v)| v.parse::<usize>().unwrap())
            .unwrap_or(0);
        while buf.len() < header_end + len {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending body");
            buf.extend_from_slice(&chunk[..n]);
        }
        let body = String::from_utf8_lossy(&buf[header_end..header_end + len]).to_string();

        Recorded { method, target, headers, body }
    }

    fn backend(url: &str) -> HttpBackend {
        HttpBackend::new(
            BackendConfig {
                url: url.to_string(),
                anon_key: "anon".into(),
                ..BackendConfig::default()
            },
            MemoryTokenStore::new(),
        )
        .expect("backend should build")
    }

    #[tokio::test]
    async fn test_sign_in_stores_session_and_notifies() {
        let (url, mut requests) = serve(vec![(200, session_json())]).await;
        let backend = backend(&url);
        let mut events = backend.subscribe();

        let session = backend
            .sign_in_with_password("a@b.com", "secret")
            .await
            .expect("sign-in should succeed");

        assert_eq!(session.user.id.as_str(), "u-1");

        let req = requests.recv().await.unwrap();
        assert_eq!(req.method, "POST");
        assert_eq!(req.target, "/auth/v1/token?grant_type=password");
        assert_eq!(req.header("apikey"), Some("anon"));
        assert_eq!(req.header("authorization"), Some("Bearer anon"));
        assert!(req.body.contains("\"email\":\"a@b.com\""));

        let change = events.recv().await.unwrap();
        assert_eq!(change.event, AuthEvent::SignedIn);
        assert_eq!(change.user().unwrap().id.as_str(), "u-1");

        // The session is now what get_session reports, without a request.
        let current = backend.get_session().await.unwrap().unwrap();
        assert_eq!(current.access_token, "at-1");
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password_surfaces_provider_message() {
        let (url, _requests) = serve(vec![(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#.into(),
        )])
        .await;
        let backend = backend(&url);

        let err = backend
            .sign_in_with_password("a@b.com", "wrong")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Invalid login credentials");
        assert_eq!(err.status(), Some(400));
        assert!(backend.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_up_pending_confirmation_has_no_session() {
        let (url, mut requests) = serve(vec![(
            200,
            r#"{"id":"u-2","email":"new@b.com","confirmation_sent_at":"2025-03-09T10:00:00Z"}"#
                .into(),
        )])
        .await;
        let backend = backend(&url);
        let metadata = UserMetadata {
            full_name: Some("Name".into()),
            ..Default::default()
        };

        let response = backend
            .sign_up("new@b.com", "pw1234", &metadata)
            .await
            .unwrap();

        assert!(response.session.is_none());
        assert_eq!(response.user.unwrap().id.as_str(), "u-2");
        assert!(backend.get_session().await.unwrap().is_none());

        let req = requests.recv().await.unwrap();
        assert_eq!(req.target, "/auth/v1/signup");
        assert!(req.body.contains("\"data\":{\"full_name\":\"Name\"}"));
    }

    #[tokio::test]
    async fn test_sign_out_clears_session_even_when_remote_fails() {
        let (url, mut requests) = serve(vec![
            (200, session_json()),
            (500, r#"{"message":"internal error"}"#.into()),
        ])
        .await;
        let backend = backend(&url);
        backend.sign_in_with_password("a@b.com", "pw").await.unwrap();
        let mut events = backend.subscribe();

        let result = backend.sign_out().await;

        assert!(matches!(result, Err(TransportError::Api { status: 500, .. })));
        assert!(backend.get_session().await.unwrap().is_none());
        assert_eq!(events.recv().await.unwrap().event, AuthEvent::SignedOut);

        let _sign_in = requests.recv().await.unwrap();
        let logout = requests.recv().await.unwrap();
        assert_eq!(logout.target, "/auth/v1/logout");
        assert_eq!(logout.header("authorization"), Some("Bearer at-1"));
    }

    #[tokio::test]
    async fn test_sign_out_with_expired_token_counts_as_success() {
        let (url, _requests) = serve(vec![
            (200, session_json()),
            (401, r#"{"msg":"invalid JWT"}"#.into()),
        ])
        .await;
        let backend = backend(&url);
        backend.sign_in_with_password("a@b.com", "pw").await.unwrap();

        backend.sign_out().await.expect("401 on logout is not an error");
        assert!(backend.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_user_requires_session() {
        let backend = backend("http://127.0.0.1:9");
        let result = backend.update_user(&UserMetadata::default()).await;
        assert!(matches!(result, Err(TransportError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_persisted_session_is_restored_without_requests() {
        let store = Arc::new(MemoryTokenStore::new());
        store.set_item("meak-auth-token", &session_json()).unwrap();

        let backend = HttpBackend::new(
            BackendConfig {
                url: "http://127.0.0.1:9".into(),
                ..BackendConfig::default()
            },
            store,
        )
        .unwrap();

        let session = backend.get_session().await.unwrap().expect("restored");
        assert_eq!(session.user.metadata.full_name.as_deref(), Some("Amina"));
    }

    #[tokio::test]
    async fn test_get_session_refreshes_expired_token() {
        let (url, mut requests) = serve(vec![(200, session_json())]).await;
        let store = expired_store();
        let backend = backend_with_store(&url, store.clone());
        let mut events = backend.subscribe();

        let session = backend
            .get_session()
            .await
            .unwrap()
            .expect("refreshed session");

        assert_eq!(session.access_token, "at-1");

        let req = requests.recv().await.unwrap();
        assert_eq!(req.method, "POST");
        assert_eq!(req.target, "/auth/v1/token?grant_type=refresh_token");
        assert!(req.body.contains("\"refresh_token\":\"rt-old\""));

        let persisted = store.get_item("meak-auth-token").unwrap().unwrap();
        assert!(persisted.contains("\"access_token\":\"at-1\""));

        let change = events.recv().await.unwrap();
        assert_eq!(change.event, AuthEvent::TokenRefreshed);
        assert_eq!(change.session.unwrap().refresh_token, "rt-1");
    }

    #[tokio::test]
    async fn test_get_session_rejected_refresh_drops_session() {
        let (url, _requests) = serve(vec![(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid Refresh Token: Already Used"}"#
                .into(),
        )])
        .await;
        let store = expired_store();
        let backend = backend_with_store(&url, store.clone());
        let mut events = backend.subscribe();

        let err = backend.get_session().await.unwrap_err();

        assert!(matches!(err, TransportError::Api { status: 400, .. }));
        assert_eq!(store.get_item("meak-auth-token").unwrap(), None);

        let change = events.recv().await.unwrap();
        assert_eq!(change.event, AuthEvent::SignedOut);
        assert!(change.session.is_none());

        // Nothing left to refresh, so no further request is made.
        assert!(backend.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_auto_refresh_renews_expiring_session() {
        let (url, mut requests) = serve(vec![(200, session_json())]).await;
        let backend = Arc::new(backend_with_store(&url, expired_store()));
        let mut events = backend.subscribe();

        let task = backend.start_auto_refresh();

        let change = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("first tick refreshes right away")
            .unwrap();
        assert_eq!(change.event, AuthEvent::TokenRefreshed);
        assert_eq!(change.session.unwrap().access_token, "at-1");

        let req = requests.recv().await.unwrap();
        assert_eq!(req.target, "/auth/v1/token?grant_type=refresh_token");
        task.abort();
    }

    #[tokio::test]
    async fn test_auto_refresh_leaves_fresh_session_alone() {
        let (url, mut requests) = serve(vec![(200, session_json())]).await;
        let store = Arc::new(MemoryTokenStore::new());
        store.set_item("meak-auth-token", &session_json()).unwrap();
        let backend = Arc::new(backend_with_store(&url, store));
        let mut events = backend.subscribe();

        let task = backend.start_auto_refresh();
        let result = tokio::time::timeout(Duration::from_millis(100), events.recv()).await;

        assert!(result.is_err(), "no refresh for a token far from expiry");
        assert!(requests.try_recv().is_err());
        task.abort();
    }

    #[tokio::test]
    async fn test_refresh_session_without_session_is_not_authenticated() {
        let backend = backend("http://127.0.0.1:9");
        let result = backend.refresh_session().await;
        assert!(matches!(result, Err(TransportError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_select_sends_filters_and_parses_rows() {
        let (url, mut requests) = serve(vec![(
            200,
            r#"[{"id":"p1","first_name":"Youssef"},{"id":"p2","first_name":"Youssef"}]"#.into(),
        )])
        .await;
        let backend = backend(&url);

        let rows = backend
            .select(
                &TableQuery::from("profiles")
                    .eq("postal_code", "20000")
                    .order("created_at", false),
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        let req = requests.recv().await.unwrap();
        assert_eq!(req.method, "GET");
        assert!(req.target.starts_with("/rest/v1/profiles?"));
        assert!(req.target.contains("postal_code=eq.20000"));
        assert!(req.target.contains("order=created_at.desc"));
    }

    #[tokio::test]
    async fn test_insert_returns_stored_row() {
        let (url, mut requests) =
            serve(vec![(201, r#"[{"id":"t1","title":"Mount TV"}]"#.into())]).await;
        let backend = backend(&url);

        let row = backend
            .insert("tasks", &serde_json::json!({ "title": "Mount TV" }))
            .await
            .unwrap();

        assert_eq!(row["id"], "t1");
        let req = requests.recv().await.unwrap();
        assert_eq!(req.header("prefer"), Some("return=representation"));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = backend(&format!("http://{addr}"));
        let result = backend.sign_in_with_password("a@b.com", "pw").await;

        assert!(matches!(result, Err(TransportError::Network(_))));
    }
}
