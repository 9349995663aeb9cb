use crate::config::MailConfig;
use crate::error::AppError;
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// Outbound-mail seam. Handlers compose nothing and transmit nothing; they
/// hand (name, reply-to, message) across this boundary and report the
/// outcome.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_contact(&self, name: &str, reply_to: &str, message: &str)
        -> Result<(), AppError>;
}

/// SMTP implementation. Credentials are checked on every send, so a
/// misconfigured deployment answers the contact form with a configuration
/// error instead of swallowing messages.
pub struct SmtpMailer {
    config: MailConfig,
}

impl SmtpMailer {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_contact(
        &self,
        name: &str,
        reply_to: &str,
        message: &str,
    ) -> Result<(), AppError> {
        let (user, pass) = self.config.credentials()?;
        let from = parse_configured_mailbox(user, "SMTP_USER")?;
        let to = parse_configured_mailbox(self.config.recipient()?, "TO_EMAIL")?;
        let reply_to_mailbox = reply_to
            .parse::<Mailbox>()
            .map_err(|_| AppError::Validation("please enter a valid email address".into()))?;

        let email = Message::builder()
            .from(from)
            .reply_to(reply_to_mailbox)
            .to(to)
            .subject(format!("Portfolio Contact: {name}"))
            .body(contact_body(name, reply_to, message))
            .map_err(|err| AppError::Mail(Box::new(err)))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(
            &self.config.smtp_host,
        )
        .map_err(|err| {
            AppError::Configuration(format!(
                "invalid SMTP relay {}: {err}",
                self.config.smtp_host
            ))
        })?
        .port(self.config.smtp_port)
        .credentials(Credentials::new(user.to_string(), pass.to_string()))
        .build();

        transport
            .send(email)
            .await
            .map_err(|err| AppError::Mail(Box::new(err)))?;
        Ok(())
    }
}

fn parse_configured_mailbox(address: &str, variable: &str) -> Result<Mailbox, AppError> {
    address
        .parse::<Mailbox>()
        .map_err(|err| AppError::Configuration(format!("invalid {variable} address: {err}")))
}

fn contact_body(name: &str, email: &str, message: &str) -> String {
    format!(
        "New contact form submission from the portfolio:\n\n\
         Name: {name}\n\
         Email: {email}\n\
         Message:\n{message}\n\n\
         ---\n\
         Sent from the portfolio contact form\n"
    )
}
