use async_trait::async_trait;
use tracing::debug;

use super::requests_for;
use super::ActuatorCommand;
use super::ActuatorGateway;
use super::GatewayError;
use super::GatewayRequest;
use crate::config::GatewayConfig;

/// Actuator gateway reached over plain HTTP with form-encoded bodies.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    #[tracing::instrument(skip(self, request), fields(endpoint = request.endpoint))]
    async fn post(&self, request: &GatewayRequest) -> Result<(), GatewayError> {
        let url = format!("{}{}", self.base_url, request.endpoint);
        debug!("POST {} {:?}", url, request.form);

        let response = self
            .client
            .post(&url)
            .form(&request.form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout(request.endpoint.to_string())
                } else {
                    GatewayError::Transport(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                endpoint: request.endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl ActuatorGateway for HttpGateway {
    async fn apply(&self, command: &ActuatorCommand) -> Result<(), GatewayError> {
        for request in requests_for(command) {
            self.post(&request).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let gateway = HttpGateway::new(&GatewayConfig {
            base_url: "http://10.194.240.42:3000/".to_string(),
            timeout_secs: 3,
            room: "home".to_string(),
        })
        .unwrap();
        assert_eq!(gateway.base_url, "http://10.194.240.42:3000");
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_error() {
        // Port 9 (discard) on localhost is closed in test environments
        let gateway = HttpGateway::new(&GatewayConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            room: "home".to_string(),
        })
        .unwrap();

        let result = gateway.apply(&ActuatorCommand::AllLights { on: true }).await;
        assert!(result.is_err());
    }
}
