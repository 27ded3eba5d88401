//! HTTP(S)/file GET over libcurl.

use std::time::Duration;
use url::Url;

use super::error::TransportError;
use super::remote::Credentials;
use crate::control::CancelToken;
use crate::retry::classify_curl_error;

/// Fetches the full body of one URL. Implementations must return promptly
/// once `cancel` fires.
pub trait Transport: Send + Sync {
    fn get(
        &self,
        url: &Url,
        credentials: Option<&Credentials>,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, TransportError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    pub connect_timeout: Duration,
    /// Whole-request limit, including body transfer.
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(300),
            user_agent: format!("jarfetch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// One curl Easy handle per request; safe to share across worker threads.
#[derive(Debug, Clone, Default)]
pub struct CurlTransport {
    options: TransportOptions,
}

impl CurlTransport {
    pub fn new(options: TransportOptions) -> Self {
        Self { options }
    }

    fn perform(
        &self,
        easy: &mut curl::easy::Easy,
        url: &Url,
        credentials: Option<&Credentials>,
        body: &mut Vec<u8>,
        cancel: &CancelToken,
    ) -> Result<(), curl::Error> {
        easy.url(url.as_str())?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(self.options.connect_timeout)?;
        easy.low_speed_limit(1024)?;
        easy.low_speed_time(Duration::from_secs(60))?;
        easy.timeout(self.options.request_timeout)?;
        easy.useragent(&self.options.user_agent)?;
        if let Some(creds) = credentials {
            let mut auth = curl::easy::Auth::new();
            auth.basic(true);
            easy.http_auth(&auth)?;
            easy.username(&creds.username)?;
            easy.password(&creds.password)?;
        }

        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            if cancel.is_cancelled() {
                return Ok(0); // abort transfer
            }
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()
    }
}

impl Transport for CurlTransport {
    fn get(
        &self,
        url: &Url,
        credentials: Option<&Credentials>,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, TransportError> {
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        let mut easy = curl::easy::Easy::new();
        let mut body = Vec::new();
        if let Err(e) = self.perform(&mut easy, url, credentials, &mut body, cancel) {
            if cancel.is_cancelled() {
                return Err(TransportError::Cancelled);
            }
            if e.is_file_couldnt_read_file() {
                return Err(TransportError::NotFound);
            }
            return Err(TransportError::Network {
                kind: classify_curl_error(&e),
                message: e.to_string(),
            });
        }
        if url.scheme() == "file" {
            return Ok(body);
        }
        let code = easy.response_code().map_err(|e| TransportError::Network {
            kind: classify_curl_error(&e),
            message: e.to_string(),
        })?;
        match code {
            200..=299 => Ok(body),
            404 | 410 => Err(TransportError::NotFound),
            c => Err(TransportError::Status(c)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_file_urls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pom");
        std::fs::write(&path, b"<project/>").unwrap();
        let url = Url::from_file_path(&path).unwrap();
        let t = CurlTransport::default();
        assert_eq!(t.get(&url, None, &CancelToken::new()).unwrap(), b"<project/>");

        let missing = Url::from_file_path(dir.path().join("missing.pom")).unwrap();
        assert_eq!(
            t.get(&missing, None, &CancelToken::new()),
            Err(TransportError::NotFound)
        );
    }

    #[test]
    fn cancelled_before_start() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let url = Url::parse("http://127.0.0.1:9/never").unwrap();
        assert_eq!(
            CurlTransport::default().get(&url, None, &cancel),
            Err(TransportError::Cancelled)
        );
    }

    #[test]
    fn default_user_agent_names_the_tool() {
        assert!(TransportOptions::default().user_agent.starts_with("jarfetch/"));
    }
}
