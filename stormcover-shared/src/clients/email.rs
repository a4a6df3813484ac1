use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

/// Outbound email seam. Dispatch is fire-and-forget from the caller's
/// perspective; a failed send is reported per recipient and never stops
/// the rest of a batch.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), String>;
}

#[derive(Clone)]
pub struct EmailClient {
    client: Client,
    api_key: String,
    from_email: String,
    from_name: String,
}

#[derive(Debug, Serialize)]
struct SendRequest {
    from: String,
    to: Vec<String>,
    subject: String,
    html: String,
}

impl EmailClient {
    pub fn new(api_key: &str, from_email: &str, from_name: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            from_email: from_email.to_string(),
            from_name: from_name.to_string(),
        }
    }
}

#[async_trait]
impl EmailSender for EmailClient {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), String> {
        let request = SendRequest {
            from: format!("{} <{}>", self.from_name, self.from_email),
            to: vec![to.to_string()],
            subject: subject.to_string(),
            html: html.to_string(),
        };

        let response = self.client
            .post("https://api.resend.com/emails")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("email send failed: {e}"))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("email API error: {body}"));
        }

        tracing::debug!(to = %to, subject = %subject, "email sent");
        Ok(())
    }
}

/// Used when no email API key is configured: logs the would-be send and
/// reports success so the rest of the batch pipeline still runs.
pub struct SimulatedSender;

#[async_trait]
impl EmailSender for SimulatedSender {
    async fn send_email(&self, to: &str, subject: &str, _html: &str) -> Result<(), String> {
        tracing::warn!(to = %to, subject = %subject, "email simulation: no API key configured");
        Ok(())
    }
}
