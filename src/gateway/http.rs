use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::config::GatewayConfig;
use crate::gateway::{BoletoArtifact, BoletoRequest, GatewayError, ProviderGateway};

/// provider gateway over HTTPS with a bounded timeout
#[derive(Debug, Clone)]
pub struct HttpProviderGateway {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpProviderGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

impl ProviderGateway for HttpProviderGateway {
    fn create_boleto(&self, request: &BoletoRequest) -> Result<BoletoArtifact, GatewayError> {
        debug!(payment_id = %request.payment_id, "requesting boleto from provider");

        let response = self
            .client
            .post(format!("{}/boletos", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "external_reference": request.payment_id.to_string(),
                "contract_reference": request.contract_id.to_string(),
                "amount": request.amount.to_fixed(),
                "due_date": request.due_date.to_string(),
                "description": request.description,
            }))
            .send()
            .map_err(|e| {
                error!(error = %e, payment_id = %request.payment_id, "provider request failed");
                if e.is_timeout() {
                    GatewayError::Timeout
                } else {
                    GatewayError::Transport(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response.text().map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout
            } else {
                GatewayError::Transport(e.to_string())
            }
        })?;

        parse_boleto_response(status, &body)
    }
}

#[derive(Debug, Deserialize)]
struct BoletoResponse {
    id: String,
    boleto_url: String,
    #[serde(default)]
    pix_code: Option<String>,
}

/// interpret a provider response; pure so it can be tested without a server
pub fn parse_boleto_response(status: u16, body: &str) -> Result<BoletoArtifact, GatewayError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| "unknown provider error".to_string());
        return Err(GatewayError::Rejected { status, message });
    }

    let parsed: BoletoResponse =
        serde_json::from_str(body).map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

    if parsed.id.is_empty() || parsed.boleto_url.is_empty() {
        return Err(GatewayError::InvalidResponse(
            "missing provider payment id or boleto url".to_string(),
        ));
    }

    Ok(BoletoArtifact {
        boleto_url: parsed.boleto_url,
        pix_code: parsed.pix_code.filter(|c| !c.is_empty()),
        provider_payment_id: parsed.id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success() {
        let body = r#"{"id":"pp_9","boleto_url":"https://pay.example.com/b/9","pix_code":"0002pix"}"#;
        let artifact = parse_boleto_response(201, body).unwrap();

        assert_eq!(artifact.provider_payment_id, "pp_9");
        assert_eq!(artifact.boleto_url, "https://pay.example.com/b/9");
        assert_eq!(artifact.pix_code.as_deref(), Some("0002pix"));
    }

    #[test]
    fn test_parse_without_pix() {
        let body = r#"{"id":"pp_9","boleto_url":"https://pay.example.com/b/9"}"#;
        assert_eq!(parse_boleto_response(200, body).unwrap().pix_code, None);
    }

    #[test]
    fn test_parse_rejection_keeps_provider_message() {
        let err = parse_boleto_response(422, r#"{"message":"due date in the past"}"#).unwrap_err();
        assert_eq!(
            err,
            GatewayError::Rejected {
                status: 422,
                message: "due date in the past".to_string()
            }
        );

        let err = parse_boleto_response(502, "<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, GatewayError::Rejected { status: 502, .. }));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_boleto_response(200, "not json"),
            Err(GatewayError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_boleto_response(200, r#"{"id":"","boleto_url":""}"#),
            Err(GatewayError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_client_builds_from_config() {
        let config = GatewayConfig::new("https://pay.example.com/", "key");
        let gateway = HttpProviderGateway::new(&config).unwrap();
        assert_eq!(gateway.base_url, "https://pay.example.com");
    }
}
