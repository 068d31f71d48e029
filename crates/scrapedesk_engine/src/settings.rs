use std::time::Duration;

use url::Url;

use crate::protocol::ProtocolError;

const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Base address of the scrape server, `http` or `https`.
    pub server_url: Url,
    pub socket_path: String,
    pub upload_path: String,
    /// Bound on the WebSocket handshake plus the namespace connect.
    pub connect_timeout: Duration,
    /// Bound on a whole upload request.
    pub request_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            server_url: Url::parse(DEFAULT_SERVER).expect("default server url is valid"),
            socket_path: "/socket.io/".to_string(),
            upload_path: "/scrape_pdf".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl EngineSettings {
    pub fn with_server(server_url: Url) -> Self {
        Self {
            server_url,
            ..Self::default()
        }
    }

    /// `ws(s)://host[:port]/socket.io/?EIO=4&transport=websocket`
    pub fn socket_url(&self) -> Result<Url, ProtocolError> {
        let mut url = self.server_url.clone();
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(ProtocolError::UnsupportedScheme(other.to_string())),
        };
        url.set_scheme(scheme)
            .map_err(|()| ProtocolError::UnsupportedScheme(scheme.to_string()))?;
        url.set_path(&self.socket_path);
        url.set_query(Some("EIO=4&transport=websocket"));
        url.set_fragment(None);
        Ok(url)
    }

    pub fn upload_url(&self) -> Result<Url, url::ParseError> {
        self.server_url.join(&self.upload_path)
    }
}
