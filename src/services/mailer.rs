//! Outbound email
//!
//! Sends account confirmation and password reset emails over SMTP.
//! When SMTP is not configured the mailer logs the message instead of
//! sending it, so local development works without a mail server.

use crate::config::SmtpConfig;
use anyhow::{anyhow, Result};
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

/// Mailer for account lifecycle emails
pub struct Mailer {
    smtp: SmtpConfig,
    public_url: String,
}

impl Mailer {
    /// Create a new mailer
    pub fn new(smtp: SmtpConfig, public_url: String) -> Self {
        Self { smtp, public_url }
    }

    /// Send the account confirmation email
    ///
    /// The link carries the confirmation token; following it enables
    /// the account.
    pub async fn send_confirmation(&self, to_email: &str, username: &str, token: &str) -> Result<()> {
        let link = format!("{}/api/v1/auth/confirm/{}", self.public_url, token);
        let subject = format!("[{}] Confirm your account", self.smtp.from_name);
        let body = format!(
            "Hello {},\n\n\
             Welcome! Please confirm your account by opening this link:\n\n\
             {}\n\n\
             If you did not register, you can ignore this email.\n\n\
             The {} team",
            username, link, self.smtp.from_name
        );

        self.send(to_email, &subject, &body).await
    }

    /// Send the password reset email
    pub async fn send_password_reset(&self, to_email: &str, username: &str, token: &str) -> Result<()> {
        let link = format!("{}/reset-password?token={}", self.public_url, token);
        let subject = format!("[{}] Reset your password", self.smtp.from_name);
        let body = format!(
            "Hello {},\n\n\
             A password reset was requested for your account. Open this link to\n\
             choose a new password:\n\n\
             {}\n\n\
             If you did not request a reset, you can ignore this email and your\n\
             password will stay unchanged.\n\n\
             The {} team",
            username, link, self.smtp.from_name
        );

        self.send(to_email, &subject, &body).await
    }

    async fn send(&self, to_email: &str, subject: &str, body: &str) -> Result<()> {
        if !self.smtp.is_enabled() {
            tracing::info!(
                to = %to_email,
                subject = %subject,
                "SMTP not configured, skipping email delivery"
            );
            tracing::debug!(body = %body, "Undelivered email body");
            return Ok(());
        }

        let from = format!("{} <{}>", self.smtp.from_name, self.smtp.from_address);

        let email = Message::builder()
            .from(from.parse().map_err(|e| anyhow!("Invalid from address: {}", e))?)
            .to(to_email.parse().map_err(|e| anyhow!("Invalid to address: {}", e))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| anyhow!("Failed to build email: {}", e))?;

        let creds = Credentials::new(self.smtp.username.clone(), self.smtp.password.clone());

        let transport: AsyncSmtpTransport<Tokio1Executor> =
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.smtp.host)
                .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
                .credentials(creds)
                .port(self.smtp.port)
                .build();

        transport
            .send(email)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;

        Ok(())
    }
}
