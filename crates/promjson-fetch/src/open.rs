use std::path::Path;

use futures::TryStreamExt;
use reqwest::Url;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use tracing::{debug, instrument};

use crate::{FetchConfig, FetchError, FetchResult, Input, accept_header};

/// An opened input: the body stream and, for HTTP, the response `Content-Type`.
pub struct Fetched {
    pub content_type: Option<String>,
    pub body: Box<dyn AsyncRead + Send + Unpin>,
}

impl std::fmt::Debug for Fetched {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetched")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Open `input` for reading.
///
/// Stdin and files carry no content type and are read as text format.
#[instrument(level = "debug", skip_all, fields(input = %input))]
pub async fn open(input: &Input, cfg: &FetchConfig) -> FetchResult<Fetched> {
    match input {
        Input::Stdin => Ok(Fetched {
            content_type: None,
            body: Box::new(tokio::io::stdin()),
        }),
        Input::File(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|source| FetchError::Open {
                    path: path.clone(),
                    source,
                })?;
            Ok(Fetched {
                content_type: None,
                body: Box::new(file),
            })
        }
        Input::Url(url) => fetch(url, cfg).await,
    }
}

/// GET `url` with content negotiation and return the streaming body.
///
/// Only the wait for response headers is bounded by `cfg.header_timeout_secs`; a non-2xx
/// status is an error.
pub async fn fetch(url: &Url, cfg: &FetchConfig) -> FetchResult<Fetched> {
    cfg.validate()?;
    let client = build_client(cfg).await?;
    let request = client
        .get(url.clone())
        .header(ACCEPT, accept_header(cfg.escaping));

    let resp = match tokio::time::timeout(cfg.header_timeout(), request.send()).await {
        Ok(sent) => sent.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?,
        Err(_) => {
            return Err(FetchError::HeaderTimeout {
                url: url.to_string(),
                after: cfg.header_timeout(),
            });
        }
    };

    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status,
        });
    }

    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    debug!(
        %url,
        %status,
        content_type = content_type.as_deref().unwrap_or(""),
        "response headers received"
    );

    let stream = Box::pin(resp.bytes_stream().map_err(std::io::Error::other));
    Ok(Fetched {
        content_type,
        body: Box::new(StreamReader::new(stream)),
    })
}

async fn build_client(cfg: &FetchConfig) -> FetchResult<reqwest::Client> {
    // Single request per run: keep no idle connections around.
    let mut builder = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .danger_accept_invalid_certs(cfg.accept_invalid_cert);

    if let (Some(cert), Some(key)) = (&cfg.cert, &cfg.key) {
        builder = builder.identity(load_identity(cert, key).await?);
    }
    builder.build().map_err(FetchError::Client)
}

/// Client identity from a PEM certificate chain and a PEM private key.
async fn load_identity(cert: &Path, key: &Path) -> FetchResult<reqwest::Identity> {
    let mut pem = read_pem(cert).await?;
    pem.push(b'\n');
    pem.extend(read_pem(key).await?);
    reqwest::Identity::from_pem(&pem).map_err(|e| FetchError::Identity(e.to_string()))
}

async fn read_pem(path: &Path) -> FetchResult<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|source| FetchError::Open {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    use super::*;

    /// Serves one connection with `response` and reports the raw request head.
    async fn serve_once(response: &'static str) -> (Url, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            let _ = tx.send(String::from_utf8_lossy(&head).into_owned());
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        let url = Url::parse(&format!("http://{addr}/metrics")).unwrap();
        (url, rx)
    }

    async fn read_body(mut fetched: Fetched) -> String {
        let mut body = String::new();
        fetched.body.read_to_string(&mut body).await.unwrap();
        body
    }

    #[tokio::test]
    async fn fetches_body_and_content_type() {
        let (url, request) = serve_once(
            "HTTP/1.1 200 OK\r\n\
             Content-Type: text/plain; version=0.0.4\r\n\
             Content-Length: 5\r\n\
             Connection: close\r\n\r\n\
             up 1\n",
        )
        .await;

        let fetched = fetch(&url, &FetchConfig::default()).await.unwrap();
        assert_eq!(
            fetched.content_type.as_deref(),
            Some("text/plain; version=0.0.4")
        );
        assert_eq!(read_body(fetched).await, "up 1\n");

        let head = request.await.unwrap().to_ascii_lowercase();
        assert!(head.starts_with("get /metrics "), "{head}");
        assert!(
            head.contains(&format!("accept: {}", accept_header(None).to_ascii_lowercase())),
            "{head}"
        );
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (url, _request) = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;

        let err = fetch(&url, &FetchConfig::default()).await.unwrap_err();
        match err {
            FetchError::Status { status, .. } => assert_eq!(status.as_u16(), 404),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn silent_server_hits_header_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let cfg = FetchConfig {
            header_timeout_secs: 1,
            ..Default::default()
        };
        let url = Url::parse(&format!("http://{addr}/metrics")).unwrap();
        let err = fetch(&url, &cfg).await.unwrap_err();
        assert!(matches!(err, FetchError::HeaderTimeout { .. }), "{err:?}");
        server.abort();
    }

    #[tokio::test]
    async fn lone_certificate_is_rejected_before_connecting() {
        let cfg = FetchConfig {
            cert: Some("client.pem".into()),
            ..Default::default()
        };
        let url = Url::parse("http://127.0.0.1:9/metrics").unwrap();
        let err = fetch(&url, &cfg).await.unwrap_err();
        assert!(matches!(err, FetchError::CertKeyMismatch), "{err:?}");
    }

    #[tokio::test]
    async fn missing_identity_files_name_the_path() {
        let cfg = FetchConfig {
            cert: Some("/nonexistent/promjson/client.pem".into()),
            key: Some("/nonexistent/promjson/client.key".into()),
            ..Default::default()
        };
        let url = Url::parse("http://127.0.0.1:9/metrics").unwrap();
        let err = fetch(&url, &cfg).await.unwrap_err();
        assert!(matches!(err, FetchError::Open { .. }), "{err:?}");
        assert!(err.to_string().contains("client.pem"));
    }

    #[tokio::test]
    async fn opens_files_without_content_type() {
        let path = std::env::temp_dir().join(format!("promjson-open-{}.txt", std::process::id()));
        tokio::fs::write(&path, "up 1\n").await.unwrap();

        let fetched = open(&Input::File(path.clone()), &FetchConfig::default())
            .await
            .unwrap();
        assert!(fetched.content_type.is_none());
        assert_eq!(read_body(fetched).await, "up 1\n");

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn missing_file_is_an_open_error() {
        let input = Input::File("/nonexistent/promjson/metrics.txt".into());
        let err = open(&input, &FetchConfig::default()).await.unwrap_err();
        assert!(matches!(err, FetchError::Open { .. }), "{err:?}");
        assert!(err.to_string().starts_with("error opening file"));
    }
}
