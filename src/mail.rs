//! Mail delivery. The batch driver only sees the [`MailTransport`] trait;
//! the SMTP implementation builds a multipart HTML message with the
//! certificate attached and hands it to a STARTTLS relay.

use crate::config::{EmailConfig, SmtpConfig};
use crate::error::{Error, Result};
use crate::recipient::RecipientRow;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use std::fs;
use std::path::Path;
use tracing::info;

pub trait MailTransport {
    fn send_certificate(&self, recipient: &RecipientRow, artifact: &Path) -> Result<()>;
}

pub struct SmtpMailer {
    template: EmailConfig,
    sender: String,
    transport: SmtpTransport,
}

impl SmtpMailer {
    pub fn new(smtp: SmtpConfig, template: EmailConfig) -> Result<Self> {
        let credentials = Credentials::new(smtp.email_sender.clone(), smtp.email_password.clone());
        let transport = SmtpTransport::starttls_relay(&smtp.smtp_server)
            .map_err(|err| {
                Error::Transport(format!(
                    "cannot configure SMTP relay {}: {err}",
                    smtp.smtp_server
                ))
            })?
            .port(smtp.smtp_port)
            .credentials(credentials)
            .build();
        Ok(Self {
            template,
            sender: smtp.email_sender,
            transport,
        })
    }

    fn build_message(&self, recipient: &RecipientRow, artifact: &Path) -> Result<Message> {
        let from: Mailbox = self.sender.parse().map_err(|err| {
            Error::Transport(format!("invalid sender address {}: {err}", self.sender))
        })?;
        let to: Mailbox = recipient.email.parse().map_err(|err| {
            Error::Transport(format!(
                "invalid recipient address {}: {err}",
                recipient.email
            ))
        })?;

        let body = self.template.body_for(&recipient.name.given);
        let bytes = fs::read(artifact).map_err(|err| {
            Error::Transport(format!("cannot read artifact {}: {err}", artifact.display()))
        })?;
        let filename = artifact
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "certificate.pdf".to_string());

        Message::builder()
            .from(from)
            .to(to)
            .subject(self.template.subject.clone())
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::html(body))
                    .singlepart(
                        Attachment::new(filename).body(bytes, attachment_content_type(artifact)),
                    ),
            )
            .map_err(|err| Error::Transport(format!("cannot build message: {err}")))
    }
}

impl MailTransport for SmtpMailer {
    fn send_certificate(&self, recipient: &RecipientRow, artifact: &Path) -> Result<()> {
        let message = self.build_message(recipient, artifact)?;
        self.transport
            .send(&message)
            .map_err(|err| Error::Transport(format!("send to {} failed: {err}", recipient.email)))?;
        info!(email = %recipient.email, "certificate e-mailed");
        Ok(())
    }
}

fn attachment_content_type(artifact: &Path) -> ContentType {
    let parsed = match artifact.extension().and_then(|ext| ext.to_str()) {
        Some("png") => ContentType::parse("image/png"),
        _ => ContentType::parse("application/pdf"),
    };
    parsed.unwrap_or(ContentType::TEXT_PLAIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipient::RecipientName;

    fn mailer() -> SmtpMailer {
        SmtpMailer::new(
            SmtpConfig {
                smtp_server: "smtp.example.org".into(),
                smtp_port: 587,
                email_sender: "certs@example.org".into(),
                email_password: "hunter2".into(),
            },
            EmailConfig {
                subject: "Your certificate".into(),
                body: "<p>Congratulations, {name}!</p>".into(),
                throttle_per_minute: 0,
            },
        )
        .unwrap()
    }

    #[test]
    fn message_carries_personalized_body_and_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("Ada_Lovelace.pdf");
        fs::write(&artifact, b"%PDF-1.7 fake").unwrap();

        let recipient = RecipientRow {
            name: RecipientName::new("Ada", "Lovelace"),
            email: "ada@example.org".into(),
        };
        let message = mailer().build_message(&recipient, &artifact).unwrap();
        let formatted = String::from_utf8_lossy(&message.formatted()).into_owned();
        assert!(formatted.contains("Subject: Your certificate"));
        assert!(formatted.contains("Congratulations, Ada!"));
        assert!(formatted.contains("Ada_Lovelace.pdf"));
    }

    #[test]
    fn bad_recipient_address_is_a_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("x.pdf");
        fs::write(&artifact, b"x").unwrap();

        let recipient = RecipientRow {
            name: RecipientName::new("No", "Address"),
            email: "not an address".into(),
        };
        let err = mailer().build_message(&recipient, &artifact).unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[test]
    fn attachment_content_type_follows_the_extension() {
        assert_eq!(
            attachment_content_type(Path::new("a.png")),
            ContentType::parse("image/png").unwrap()
        );
        assert_eq!(
            attachment_content_type(Path::new("a.pdf")),
            ContentType::parse("application/pdf").unwrap()
        );
    }
}
