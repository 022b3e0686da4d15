//! Outbound email delivery.
//!
//! The only transactional mail this backend sends is the email
//! verification code. Delivery goes through SMTP via lettre; tests and
//! SMTP-less deployments use the in-memory and no-op mailers.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};

/// Errors that can occur when sending email.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build the email message.
    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("invalid email address: {0}")]
    InvalidAddress(String),
}

/// SMTP connection settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

/// Sends transactional mail. Sends are best-effort from the caller's
/// point of view; a failure must never fail the surrounding request.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification_code(
        &self,
        to: &str,
        first_name: Option<&str>,
        code: &str,
    ) -> Result<(), MailError>;
}

/// SMTP mailer delivering over a STARTTLS relay.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// Creates a mailer from SMTP settings.
    pub fn new(config: &SmtpConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_verification_code(
        &self,
        to: &str,
        first_name: Option<&str>,
        code: &str,
    ) -> Result<(), MailError> {
        let greeting = match first_name {
            Some(name) => format!("Bonjour {name},"),
            None => "Bonjour,".to_string(),
        };
        let text = format!(
            "{greeting}\n\n\
             Votre code de vérification est : {code}\n\n\
             Il expire dans 15 minutes.\n\n\
             La Librairie"
        );
        let html = format!(
            "<p>{greeting}</p>\
             <p>Votre code de vérification est : <strong>{code}</strong></p>\
             <p>Il expire dans 15 minutes.</p>\
             <p>La Librairie</p>"
        );

        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| MailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| MailError::InvalidAddress(to.to_string()))?)
            .subject("Votre code de vérification")
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html),
                    ),
            )?;

        self.transport.send(email).await?;

        tracing::info!(to = %to, "verification email sent");
        Ok(())
    }
}

/// Records sends instead of delivering. For tests.
#[derive(Clone, Default)]
pub struct InMemoryMailer {
    sent: std::sync::Arc<std::sync::Mutex<Vec<SentMail>>>,
}

/// A recorded send.
#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub code: String,
}

impl InMemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded sends.
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Returns the code from the most recent send to `to`, if any.
    pub fn last_code_for(&self, to: &str) -> Option<String> {
        self.sent()
            .iter()
            .rev()
            .find(|m| m.to == to)
            .map(|m| m.code.clone())
    }
}

#[async_trait]
impl Mailer for InMemoryMailer {
    async fn send_verification_code(
        &self,
        to: &str,
        _first_name: Option<&str>,
        code: &str,
    ) -> Result<(), MailError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentMail {
                to: to.to_string(),
                code: code.to_string(),
            });
        }
        Ok(())
    }
}

/// Logs the code instead of delivering. Used when SMTP is not configured.
#[derive(Clone, Default)]
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send_verification_code(
        &self,
        to: &str,
        _first_name: Option<&str>,
        code: &str,
    ) -> Result<(), MailError> {
        tracing::info!(to = %to, code = %code, "SMTP not configured, verification code not delivered");
        Ok(())
    }
}

/// Generates a 6-digit verification code.
pub fn generate_verification_code() -> String {
    use rand::Rng;
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}
