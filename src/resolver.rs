//! Transport configuration resolver.
//!
//! Decides which traversal servers a new session gets: the static STUN list
//! for direct mode, or relay servers with short-lived credentials fetched
//! over HTTPS for relay mode.

use crate::config::EngineConfig;
use crate::error::ResolveError;
use crate::peer::types::TransportMode;
use crate::utils::add_ice_url_scheme;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// One traversal or relay server
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IceServer {
    pub urls: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}

/// Connection configuration handed to the transport factory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceConfig {
    pub mode: TransportMode,
    pub servers: Vec<IceServer>,
}

/// Payload of the credential endpoint; every field is required
#[derive(Deserialize, Debug)]
struct RelayCredentials {
    urls: Vec<String>,
    username: String,
    credential: String,
}

#[async_trait]
pub trait IceConfigResolver: Send + Sync {
    /// Traversal-assist servers only.
    fn resolve_direct(&self) -> Result<IceConfig, ResolveError>;

    /// Relay servers with freshly fetched credentials. Never partially filled.
    async fn resolve_relay(&self) -> Result<IceConfig, ResolveError>;
}

pub struct TransportResolver {
    stun_urls: Vec<String>,
    credential_url: Option<String>,
    http: reqwest::Client,
}

impl TransportResolver {
    pub fn new(cfg: &EngineConfig) -> Result<Self, ResolveError> {
        let http = reqwest::Client::builder()
            .timeout(cfg.credential_timeout)
            .build()?;
        Ok(Self {
            stun_urls: cfg.stun_urls.clone(),
            credential_url: cfg.credential_url.clone(),
            http,
        })
    }
}

#[async_trait]
impl IceConfigResolver for TransportResolver {
    fn resolve_direct(&self) -> Result<IceConfig, ResolveError> {
        if self.stun_urls.is_empty() {
            return Err(ResolveError::ConfigUnavailable);
        }
        Ok(IceConfig {
            mode: TransportMode::Direct,
            servers: vec![IceServer {
                urls: self
                    .stun_urls
                    .iter()
                    .map(|u| add_ice_url_scheme(u, false))
                    .collect(),
                username: None,
                credential: None,
            }],
        })
    }

    async fn resolve_relay(&self) -> Result<IceConfig, ResolveError> {
        let url = self
            .credential_url
            .as_deref()
            .ok_or(ResolveError::NoCredentialEndpoint)?;

        debug!(url, "fetching relay credentials");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(url, %status, "credential endpoint rejected request");
            return Err(ResolveError::Status(status));
        }

        let body = response.bytes().await?;
        let config = relay_config_from_payload(&body)?;
        info!(servers = config.servers[0].urls.len(), "relay credentials fetched");
        Ok(config)
    }
}

fn relay_config_from_payload(body: &[u8]) -> Result<IceConfig, ResolveError> {
    let creds: RelayCredentials =
        serde_json::from_slice(body).map_err(|e| ResolveError::Malformed(e.to_string()))?;

    let urls: Vec<String> = creds
        .urls
        .iter()
        .map(|u| u.trim())
        .filter(|u| !u.is_empty())
        .map(|u| add_ice_url_scheme(u, true))
        .collect();
    if urls.is_empty() {
        return Err(ResolveError::Malformed("empty relay url list".into()));
    }
    if creds.username.is_empty() || creds.credential.is_empty() {
        return Err(ResolveError::Malformed("empty username or credential".into()));
    }

    Ok(IceConfig {
        mode: TransportMode::Relayed,
        servers: vec![IceServer {
            urls,
            username: Some(creds.username),
            credential: Some(creds.credential),
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn resolver(stun: &[&str], credential_url: Option<String>) -> TransportResolver {
        let cfg = EngineConfig {
            stun_urls: stun.iter().map(|s| s.to_string()).collect(),
            credential_url,
            ..Default::default()
        };
        TransportResolver::new(&cfg).unwrap()
    }

    /// Serves exactly one HTTP response and returns the URL to hit.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = sock.read(&mut buf).await;
            let resp = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = sock.write_all(resp.as_bytes()).await;
        });
        format!("http://{addr}/turn-credentials")
    }

    #[test]
    fn direct_config_contains_only_stun() {
        let cfg = resolver(&["stun.example:3478", "stun:b.example:19302"], None)
            .resolve_direct()
            .unwrap();
        assert_eq!(cfg.mode, TransportMode::Direct);
        assert_eq!(
            cfg.servers[0].urls,
            vec!["stun:stun.example:3478", "stun:b.example:19302"]
        );
        assert!(cfg.servers[0].username.is_none());
    }

    #[test]
    fn direct_without_servers_is_unavailable() {
        let err = resolver(&[], None).resolve_direct().unwrap_err();
        assert!(matches!(err, ResolveError::ConfigUnavailable));
    }

    #[test]
    fn payload_missing_credential_is_malformed() {
        let err = relay_config_from_payload(br#"{"urls":["turn:t.example:3478"],"username":"u"}"#)
            .unwrap_err();
        assert!(matches!(err, ResolveError::Malformed(_)));

        let err = relay_config_from_payload(br#"{"urls":[],"username":"u","credential":"c"}"#)
            .unwrap_err();
        assert!(matches!(err, ResolveError::Malformed(_)));
    }

    #[test]
    fn payload_builds_relay_config() {
        let cfg = relay_config_from_payload(
            br#"{"urls":["t.example:3478","turns:t.example:443"],"username":"1700000000:alice","credential":"c2VjcmV0"}"#,
        )
        .unwrap();
        assert_eq!(cfg.mode, TransportMode::Relayed);
        assert_eq!(
            cfg.servers[0].urls,
            vec!["turn:t.example:3478", "turns:t.example:443"]
        );
        assert_eq!(cfg.servers[0].username.as_deref(), Some("1700000000:alice"));
    }

    #[tokio::test]
    async fn relay_fetch_over_http() {
        let url = serve_once(
            "200 OK",
            r#"{"urls":["turn:t.example:3478"],"username":"u","credential":"c"}"#,
        )
        .await;
        let cfg = resolver(&["stun:s.example"], Some(url)).resolve_relay().await.unwrap();
        assert_eq!(cfg.servers[0].credential.as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn relay_fetch_rejects_error_status() {
        let url = serve_once("503 Service Unavailable", "{}").await;
        let err = resolver(&["stun:s.example"], Some(url))
            .resolve_relay()
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Status(s) if s.as_u16() == 503));
    }

    #[tokio::test]
    async fn relay_without_endpoint_fails() {
        let err = resolver(&["stun:s.example"], None)
            .resolve_relay()
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NoCredentialEndpoint));
    }
}
