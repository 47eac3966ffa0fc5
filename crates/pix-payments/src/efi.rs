//! Efí Pix API Client
//!
//! Real charge generation against the Efí (Gerencianet) Pix API:
//! OAuth client-credentials token, `cob` creation, then the rendered QR
//! code of the charge location. Requests go over mTLS with the account's
//! PKCS#12 certificate. No retries: failures surface to the caller.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::{Client, Identity, StatusCode};
use serde::{Deserialize, Serialize};

use checkout_core::config::PixSettings;
use checkout_core::error::{CheckoutError, Result};

use crate::brcode;
use crate::provider::{ChargeProvider, ChargeRequest, ChargeResult};

/// Tax id sent as the payer's CPF; payers are not asked for one
pub const PLACEHOLDER_CPF: &str = "12345678909";

/// Text shown to the payer in their banking app
pub const PAYMENT_DESCRIPTION: &str = "Pagamento do pedido";

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Serialize)]
struct Calendario {
    expiracao: u32,
}

#[derive(Serialize)]
struct Devedor<'a> {
    cpf: &'a str,
    nome: &'a str,
}

#[derive(Serialize)]
struct Valor {
    original: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CobRequest<'a> {
    calendario: Calendario,
    devedor: Devedor<'a>,
    valor: Valor,
    chave: &'a str,
    solicitacao_pagador: &'a str,
}

#[derive(Deserialize)]
struct Loc {
    id: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CobResponse {
    txid: Option<String>,
    loc: Option<Loc>,
    pix_copia_e_cola: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QrCodeResponse {
    qrcode: Option<String>,
    imagem_qrcode: Option<String>,
}

/// Efí Pix API client
pub struct EfiPixClient {
    http: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    pix_key: String,
}

impl EfiPixClient {
    /// Build from settings, loading the client certificate
    pub fn from_settings(settings: &PixSettings) -> Result<Self> {
        let path = settings.certificate.as_ref().ok_or_else(|| {
            CheckoutError::Configuration("PIX_CERTIFICATE is required for the Pix API".into())
        })?;
        let der = std::fs::read(path).map_err(|e| {
            CheckoutError::Configuration(format!("cannot read certificate {}: {e}", path.display()))
        })?;
        let identity = Identity::from_pkcs12_der(&der, &settings.certificate_password)
            .map_err(|e| CheckoutError::Configuration(format!("invalid certificate: {e}")))?;

        Self::build(settings, settings.base_url(), Some(identity))
    }

    /// Build against an explicit base URL without a client certificate
    pub fn with_base_url(settings: &PixSettings, base_url: impl Into<String>) -> Result<Self> {
        Self::build(settings, base_url, None)
    }

    fn build(settings: &PixSettings, base_url: impl Into<String>, identity: Option<Identity>) -> Result<Self> {
        let mut builder = Client::builder().timeout(settings.timeout);
        if let Some(identity) = identity {
            builder = builder.identity(identity);
        }
        let http = builder
            .build()
            .map_err(|e| CheckoutError::Configuration(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            pix_key: settings.pix_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exchange client credentials for a bearer token
    async fn access_token(&self) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/oauth/token", self.base_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .json(&TokenRequest { grant_type: "client_credentials" })
            .send()
            .await
            .map_err(|e| CheckoutError::Authentication(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body = %body, "Pix token exchange rejected");
            return Err(CheckoutError::Authentication(format!("token endpoint returned {status}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| CheckoutError::Authentication(format!("invalid token response: {e}")))?;

        token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CheckoutError::Authentication("no access_token in response".into()))
    }

    async fn create_cob(&self, token: &str, request: &ChargeRequest) -> Result<CobResponse> {
        let body = CobRequest {
            calendario: Calendario { expiracao: request.expires_in_secs },
            devedor: Devedor { cpf: PLACEHOLDER_CPF, nome: &request.payer_name },
            valor: Valor { original: brcode::format_amount(request.amount) },
            chave: &self.pix_key,
            solicitacao_pagador: PAYMENT_DESCRIPTION,
        };

        let response = self
            .http
            .post(format!("{}/v2/cob", self.base_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| CheckoutError::ChargeCreation(e.to_string()))?;

        Self::decode(response, "cob").await
    }

    async fn qr_code(&self, token: &str, loc_id: u64) -> Result<QrCodeResponse> {
        let response = self
            .http
            .get(format!("{}/v2/loc/{loc_id}/qrcode", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| CheckoutError::ChargeCreation(e.to_string()))?;

        Self::decode(response, "qrcode").await
    }

    async fn decode<T: for<'de> Deserialize<'de>>(response: reqwest::Response, what: &str) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, endpoint = what, body = %body, "Pix API request rejected");
            return Err(CheckoutError::ChargeCreation(rejection_message(what, status)));
        }
        response
            .json()
            .await
            .map_err(|e| CheckoutError::ChargeCreation(format!("invalid {what} response: {e}")))
    }
}

fn rejection_message(what: &str, status: StatusCode) -> String {
    format!("{what} request returned {status}")
}

#[async_trait]
impl ChargeProvider for EfiPixClient {
    async fn create_charge(&self, request: &ChargeRequest) -> Result<ChargeResult> {
        request.validate()?;

        let token = self.access_token().await?;
        let cob = self.create_cob(&token, request).await?;

        let transaction_id = cob
            .txid
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CheckoutError::ChargeCreation("provider returned no txid".into()))?;
        let loc = cob
            .loc
            .ok_or_else(|| CheckoutError::ChargeCreation("provider returned no location".into()))?;

        let qr = self.qr_code(&token, loc.id).await?;
        let copy_paste = qr
            .qrcode
            .or(cob.pix_copia_e_cola)
            .ok_or_else(|| CheckoutError::ChargeCreation("provider returned no copy-paste payload".into()))?;
        let qr_code = qr
            .imagem_qrcode
            .filter(|image| !image.is_empty())
            .ok_or_else(|| CheckoutError::ChargeCreation("provider returned no QR image".into()))?;

        tracing::info!(
            txid = %transaction_id,
            loc_id = loc.id,
            amount = %brcode::format_amount(request.amount),
            payer = %request.payer_email,
            "Created Pix charge"
        );

        Ok(ChargeResult {
            transaction_id,
            copy_paste,
            qr_code,
            expires_at: Utc::now() + Duration::seconds(i64::from(request.expires_in_secs)),
        })
    }

    fn name(&self) -> &str {
        "EfiPix"
    }
}
