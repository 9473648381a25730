//! Outbound email: SMTP transport behind a trait so tests can record sends
//! instead of talking to a mail server.

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use std::time::Duration;

/// One fully-rendered outbound message.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub plain_body: String,
    pub html_body: String,
}

#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), anyhow::Error>;
}

#[derive(Clone)]
pub struct SmtpEmailTransport {
    mailer: SmtpTransport,
    from_address: String,
}

impl SmtpEmailTransport {
    pub fn new(config: &crate::config::SmtpConfig) -> Result<Self, anyhow::Error> {
        let mut builder = SmtpTransport::relay(&config.host)
            .map_err(|e| anyhow::anyhow!("SMTP relay setup failed: {}", e))?
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)));

        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        tracing::info!(host = %config.host, port = config.port, "Email transport initialized");

        Ok(Self {
            mailer: builder.build(),
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl EmailTransport for SmtpEmailTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), anyhow::Error> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|e: lettre::address::AddressError| anyhow::Error::new(e))?,
            )
            .to(message
                .to
                .parse()
                .map_err(|e: lettre::address::AddressError| anyhow::Error::new(e))?)
            .subject(&message.subject)
            .multipart(
                lettre::message::MultiPart::alternative()
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(message.plain_body.clone()),
                    )
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(message.html_body.clone()),
                    ),
            )?;

        // SMTP I/O is blocking; keep it off the async runtime.
        let mailer = self.mailer.clone();
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await??;

        tracing::info!(to = %message.to, subject = %message.subject, "Email sent");
        Ok(())
    }
}

/// Builds the account-verification message for a signed link.
pub fn verification_message(to: &str, link: &str) -> EmailMessage {
    let html_body = format!(
        r###"<html>
    <body style="font-family: Arial, sans-serif;">
        <h2>Welcome! Please verify your email</h2>
        <p>Thank you for registering. Please click the link below to verify your email address:</p>
        <p>
            <a href="{link}" style="background-color: #4CAF50; color: white; padding: 14px 20px; text-decoration: none; border-radius: 4px;">
                Verify Email
            </a>
        </p>
        <p style="color: #666; font-size: 12px;">
            If you didn't request this, please ignore this email.
        </p>
    </body>
</html>
"###
    );

    let plain_body = format!(
        "Welcome! Please verify your email\n\n\
         Thank you for registering. Please visit the following link to verify your email address:\n\n\
         {link}\n\n\
         If you didn't request this, please ignore this email."
    );

    EmailMessage {
        to: to.to_string(),
        subject: "Verify Your Email Address".to_string(),
        plain_body,
        html_body,
    }
}

/// Builds the password-reset message for a signed link.
pub fn password_reset_message(to: &str, link: &str) -> EmailMessage {
    let html_body = format!(
        r###"<html>
    <body style="font-family: Arial, sans-serif;">
        <h2>Password Reset Request</h2>
        <p>We received a request to reset your password. Click the link below to set a new password:</p>
        <p>
            <a href="{link}" style="background-color: #2196F3; color: white; padding: 14px 20px; text-decoration: none; border-radius: 4px;">
                Reset Password
            </a>
        </p>
        <p style="color: #666; font-size: 12px;">
            This link will expire in 1 hour. If you didn't request this, please ignore this email.
        </p>
    </body>
</html>
"###
    );

    let plain_body = format!(
        "Password Reset Request\n\n\
         We received a request to reset your password. Please visit the following link to set a new password:\n\n\
         {link}\n\n\
         This link will expire in 1 hour. If you didn't request this, please ignore this email."
    );

    EmailMessage {
        to: to.to_string(),
        subject: "Reset Your Password".to_string(),
        plain_body,
        html_body,
    }
}

/// Transport that records messages instead of sending them.
#[derive(Default)]
pub struct MockEmailTransport {
    pub sent: std::sync::Mutex<Vec<EmailMessage>>,
}

impl MockEmailTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EmailTransport for MockEmailTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), anyhow::Error> {
        self.sent
            .lock()
            .map_err(|e| anyhow::anyhow!("Mock transport mutex poisoned: {}", e))?
            .push(message.clone());
        Ok(())
    }
}
