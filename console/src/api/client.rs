//! REST client for the container-management backend

use std::sync::{Arc, RwLock};

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use crate::api::socket::{SocketConnection, SocketConnector};
use crate::api::wire::{
    ContainerDto, ErrorBody, SignInRequest, SignInResponse, VerifyTokenRequest,
};
use crate::config::Config;
use crate::domain::container::{ContainerAction, ContainerInfo};
use crate::domain::user::{redact, Credential};
use crate::error::{Error, Result};
use crate::infra::credentials::CredentialCell;

/// Base URLs the client talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub rest_base: String,
    pub socket_base: String,
}

/// Backend API client
///
/// Attaches the stored credential to every request and clears it when the
/// backend rejects it. Endpoints can be repointed at runtime.
pub struct ApiClient {
    http: Client,
    endpoints: RwLock<Endpoints>,
    credentials: Arc<CredentialCell>,
    connector: Arc<dyn SocketConnector>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(
        config: &Config,
        credentials: Arc<CredentialCell>,
        connector: Arc<dyn SocketConnector>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoints: RwLock::new(Endpoints {
                rest_base: config.base_url.clone(),
                socket_base: config.base_ws_url.clone(),
            }),
            credentials,
            connector,
        })
    }

    pub fn endpoints(&self) -> Endpoints {
        match self.endpoints.read() {
            Ok(endpoints) => endpoints.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Repoint the client without reconstructing it
    pub fn set_endpoints(&self, rest_base: &str, socket_base: &str) {
        let mut endpoints = match self.endpoints.write() {
            Ok(endpoints) => endpoints,
            Err(poisoned) => poisoned.into_inner(),
        };
        if endpoints.rest_base != rest_base || endpoints.socket_base != socket_base {
            info!("API endpoints set to {} / {}", rest_base, socket_base);
            endpoints.rest_base = rest_base.to_string();
            endpoints.socket_base = socket_base.to_string();
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialCell> {
        &self.credentials
    }

    /// List all containers
    pub async fn list_containers(&self) -> Result<Vec<ContainerInfo>> {
        let containers: Vec<ContainerDto> = self
            .json(self.request(Method::GET, "/containers")?)
            .await?;
        Ok(containers.into_iter().map(ContainerInfo::from).collect())
    }

    /// Get a single container
    pub async fn get_container(&self, id: &str) -> Result<ContainerInfo> {
        let path = format!("/containers/{}", id);
        match self.json::<ContainerDto>(self.request(Method::GET, &path)?).await {
            Ok(dto) => Ok(dto.into()),
            Err(Error::Backend { status: 404, .. }) => Err(Error::ContainerNotFound(id.to_string())),
            Err(e) => Err(e),
        }
    }

    pub async fn start_container(&self, id: &str) -> Result<()> {
        self.container_action(id, ContainerAction::Start).await
    }

    pub async fn stop_container(&self, id: &str) -> Result<()> {
        self.container_action(id, ContainerAction::Stop).await
    }

    pub async fn restart_container(&self, id: &str) -> Result<()> {
        self.container_action(id, ContainerAction::Restart).await
    }

    /// Issue a mutating action
    pub async fn container_action(&self, id: &str, action: ContainerAction) -> Result<()> {
        let path = format!("/containers/{}/{}", id, action.as_str());
        info!("Requesting {} of container {}", action, id);
        match self.send(self.request(Method::POST, &path)?).await {
            Ok(_) => Ok(()),
            Err(Error::Backend { status: 404, .. }) => Err(Error::ContainerNotFound(id.to_string())),
            Err(e) => Err(e),
        }
    }

    /// Exchange an OAuth authorization code for a credential
    pub async fn sign_in_with_code(&self, code: &str) -> Result<Credential> {
        self.sign_in(SignInRequest::Code {
            code: code.to_string(),
        })
        .await
    }

    /// Exchange a Google ID token for a credential
    pub async fn sign_in_with_id_token(&self, token: &str) -> Result<Credential> {
        self.sign_in(SignInRequest::IdToken {
            token: token.to_string(),
        })
        .await
    }

    async fn sign_in(&self, body: SignInRequest) -> Result<Credential> {
        let request = self.request(Method::POST, "/auth/google-signin")?.json(&body);
        let response: SignInResponse = match self.json(request).await {
            Ok(response) => response,
            Err(Error::Backend { status, message }) => {
                return Err(Error::SignInFailed(format!("{} {}", status, message).trim().to_string()))
            }
            Err(e) => return Err(e),
        };

        match (response.token, response.user) {
            (Some(token), Some(user)) if !token.is_empty() => Ok(Credential::new(token, user)),
            _ => {
                error!("Sign-in response missing token or user");
                Err(Error::InvalidAuthResponse)
            }
        }
    }

    /// Verify a token with the backend. Any non-success status is an error.
    pub async fn verify_token(&self, token: &str) -> Result<()> {
        let request = self
            .request(Method::POST, "/auth/verify-token")?
            .json(&VerifyTokenRequest { token });
        self.send(request).await?;
        debug!("Token {} verified", redact(token));
        Ok(())
    }

    /// Socket URL of a container's log stream, when a credential is present
    pub fn log_stream_url(&self, container_id: &str) -> Result<Option<String>> {
        let Some(token) = self.credentials.token() else {
            return Ok(None);
        };
        let base = self.endpoints().socket_base;
        let mut url = Url::parse(&format!("{}/logs", base.trim_end_matches('/')))
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", base, e)))?;
        url.query_pairs_mut()
            .append_pair("containerId", container_id)
            .append_pair("token", &token);
        Ok(Some(url.to_string()))
    }

    /// Open the log/exec stream of a container
    ///
    /// Returns `None` without touching the network when no credential is stored.
    pub async fn open_log_stream(&self, container_id: &str) -> Result<Option<SocketConnection>> {
        let Some(url) = self.log_stream_url(container_id)? else {
            warn!("No credential available, not opening log stream for {}", container_id);
            return Ok(None);
        };
        info!("Opening log stream for container {}", container_id);
        let connection = self.connector.connect(&url).await?;
        Ok(Some(connection))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let base = self.endpoints().rest_base;
        let url = Url::parse(&format!("{}{}", base.trim_end_matches('/'), path))
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", base, e)))?;
        Ok(self.http.request(method, url))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = match self.credentials.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(|e| {
            warn!("Request failed before a response: {}", e);
            Error::from(e)
        })?;
        let status = response.status();
        debug!("{} {}", status.as_u16(), response.url().path());

        if status == StatusCode::UNAUTHORIZED {
            if self.credentials.clear() {
                warn!("Backend rejected the credential, cleared it");
            }
            return Err(Error::Unauthorized);
        }

        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&raw)
                .map(|body| body.message)
                .unwrap_or(raw);
            return Err(Error::Backend {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }
}
