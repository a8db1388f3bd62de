//! Outbound email. Sending is best-effort: failures are logged and never
//! bubble into the request that triggered them.

use std::sync::Arc;

use anyhow::Context;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct Mailer {
    inner: Option<Arc<SmtpConfig>>,
}

struct SmtpConfig {
    server: String,
    port: u16,
    credentials: Credentials,
    from: Mailbox,
    reset_base_url: String,
}

impl SmtpConfig {
    /// One transport per message; nothing is pooled between sends.
    fn transport(&self) -> Result<SmtpTransport, lettre::transport::smtp::Error> {
        Ok(SmtpTransport::relay(&self.server)?
            .port(self.port)
            .credentials(self.credentials.clone())
            .build())
    }
}

impl Mailer {
    /// Reads the PANTRY_SMTP_* variables. Without PANTRY_SMTP_HOST the mailer
    /// runs disabled and every message is dropped with a log line.
    pub fn from_env() -> anyhow::Result<Self> {
        let Ok(server) = std::env::var("PANTRY_SMTP_HOST") else {
            info!("PANTRY_SMTP_HOST not set, email notifications disabled");
            return Ok(Self::disabled());
        };
        let port = match std::env::var("PANTRY_SMTP_PORT") {
            Ok(raw) => raw
                .parse()
                .context("PANTRY_SMTP_PORT must be a port number")?,
            Err(_) => 587,
        };
        let user = std::env::var("PANTRY_SMTP_USER")
            .context("PANTRY_SMTP_USER is required when PANTRY_SMTP_HOST is set")?;
        let pass = std::env::var("PANTRY_SMTP_PASS")
            .context("PANTRY_SMTP_PASS is required when PANTRY_SMTP_HOST is set")?;
        let from = std::env::var("PANTRY_SMTP_FROM")
            .unwrap_or_else(|_| user.clone())
            .parse()
            .context("PANTRY_SMTP_FROM is not a valid mailbox")?;
        let reset_base_url = std::env::var("PANTRY_RESET_URL_BASE")
            .unwrap_or_else(|_| "http://localhost:3000/reset-password".into());

        Ok(Self {
            inner: Some(Arc::new(SmtpConfig {
                server,
                port,
                credentials: Credentials::new(user, pass),
                from,
                reset_base_url,
            })),
        })
    }

    /// A mailer that drops everything. Used in tests and when SMTP is not
    /// configured.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// Tells the event creator someone claimed part of their posting.
    pub async fn send_reservation_notice(
        &self,
        to: &str,
        creator_name: &str,
        event_name: &str,
        food_name: &str,
        quantity: i64,
        reserved_by: &str,
        pickup_time: &str,
    ) {
        let subject = format!("New reservation for {event_name}");
        let body = format!(
            "Hi {creator_name},\n\n\
             {reserved_by} reserved {quantity} x {food_name} from {event_name}.\n\
             Pickup time: {pickup_time}\n"
        );
        self.deliver(to, &subject, body).await;
    }

    /// Emails a password reset link. The token only works on the reset
    /// endpoint and expires after 30 minutes.
    pub async fn send_password_reset(&self, to: &str, token: &str) {
        let Some(config) = &self.inner else {
            debug!("Email disabled, dropping password reset for {to}");
            return;
        };
        let link = format!("{}?token={token}", config.reset_base_url);
        let body = format!(
            "A password reset was requested for this address.\n\n\
             Reset your password here: {link}\n\n\
             The link expires in 30 minutes. If you did not request it, you can\n\
             ignore this email and your password will stay unchanged.\n"
        );
        self.deliver(to, "Reset your password", body).await;
    }

    async fn deliver(&self, to: &str, subject: &str, body: String) {
        let Some(config) = &self.inner else {
            debug!("Email disabled, dropping message to {to}");
            return;
        };

        let recipient: Mailbox = match to.parse() {
            Ok(mailbox) => mailbox,
            Err(e) => {
                warn!("Skipping email to invalid address {to}: {e}");
                return;
            }
        };
        let message = match Message::builder()
            .from(config.from.clone())
            .to(recipient)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
        {
            Ok(message) => message,
            Err(e) => {
                warn!("Failed to build email to {to}: {e}");
                return;
            }
        };
        let transport = match config.transport() {
            Ok(transport) => transport,
            Err(e) => {
                warn!("SMTP transport setup failed: {e}");
                return;
            }
        };

        let to = to.to_owned();
        match tokio::task::spawn_blocking(move || transport.send(&message)).await {
            Ok(Ok(_)) => debug!("Email sent to {to}"),
            Ok(Err(e)) => warn!("Failed to send email to {to}: {e}"),
            Err(e) => warn!("Email task failed: {e}"),
        }
    }
}
