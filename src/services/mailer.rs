//! Delivery of contact-form messages to the site mailbox.

use lettre::{
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use thiserror::Error;
use tracing::info;
use validator::ValidateEmail;

use crate::config::{MailConfig, MailTransportConfig};

const SENDER_NAME: &str = "Tool Website";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail transport misconfigured: {0}")]
    Transport(String),

    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Failed to send message: {0}")]
    Send(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContactValidationError {
    #[error("Please provide name, email, subject and message.")]
    MissingField,

    #[error("Please provide a valid email address.")]
    InvalidEmail,
}

#[derive(Debug, Clone)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactMessage {
    pub fn new(
        name: Option<String>,
        email: Option<String>,
        subject: Option<String>,
        message: Option<String>,
    ) -> Result<Self, ContactValidationError> {
        let required = |v: Option<String>| {
            v.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .ok_or(ContactValidationError::MissingField)
        };
        let name = required(name)?;
        let email = required(email)?;
        let subject = required(subject)?;
        // Keep the message body's own line breaks; only reject blank input.
        let message = message
            .filter(|m| !m.trim().is_empty())
            .ok_or(ContactValidationError::MissingField)?;

        if !email.validate_email() {
            return Err(ContactValidationError::InvalidEmail);
        }

        Ok(Self {
            name,
            email,
            subject,
            message,
        })
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_body(contact: &ContactMessage) -> String {
    let message = escape_html(&contact.message)
        .replace("\r\n", "\n")
        .replace('\n', "<br>");
    format!(
        r#"
        <h2>New message from Tool Website</h2>
        <p><strong>Name:</strong> {name}</p>
        <p><strong>Email:</strong> {email}</p>
        <p><strong>Subject:</strong> {subject}</p>
        <p><strong>Message:</strong></p>
        <p>{message}</p>
      "#,
        name = escape_html(&contact.name),
        email = escape_html(&contact.email),
        subject = escape_html(&contact.subject),
    )
}

enum MailTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

pub struct Mailer {
    transport: MailTransport,
    account: String,
}

impl Mailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let transport = match &config.transport {
            MailTransportConfig::Smtp {
                host,
                port,
                username,
                password,
            } => {
                let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                    .map_err(|e| MailError::Transport(e.to_string()))?
                    .port(*port)
                    .credentials(Credentials::new(username.clone(), password.clone()))
                    .build();
                MailTransport::Smtp(transport)
            }
            MailTransportConfig::File { path } => {
                std::fs::create_dir_all(path).map_err(|e| {
                    MailError::Transport(format!("create mail directory: {}", e))
                })?;
                MailTransport::File(AsyncFileTransport::<Tokio1Executor>::new(path))
            }
        };

        Ok(Self {
            transport,
            account: config.account.clone(),
        })
    }

    /// Sends the message to the site mailbox with Reply-To set to the sender.
    pub async fn send_contact(&self, contact: &ContactMessage) -> Result<(), MailError> {
        let from = format!("\"{}\" <{}>", SENDER_NAME, self.account)
            .parse::<Mailbox>()
            .map_err(|e| MailError::Address(format!("site account: {}", e)))?;
        let to = self
            .account
            .parse::<Mailbox>()
            .map_err(|e| MailError::Address(format!("site account: {}", e)))?;
        let reply_to = contact
            .email
            .parse::<Mailbox>()
            .map_err(|e| MailError::Address(format!("sender: {}", e)))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .reply_to(reply_to)
            .subject(format!("Tool Website Contact: {}", contact.subject))
            .header(ContentType::TEXT_HTML)
            .body(render_body(contact))
            .map_err(|e| MailError::Build(e.to_string()))?;

        match &self.transport {
            MailTransport::Smtp(smtp) => {
                smtp.send(message)
                    .await
                    .map_err(|e| MailError::Send(e.to_string()))?;
            }
            MailTransport::File(file) => {
                file.send(message)
                    .await
                    .map_err(|e| MailError::Send(e.to_string()))?;
            }
        }

        info!("Contact message from {} delivered", contact.email);
        Ok(())
    }
}
