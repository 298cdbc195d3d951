// src/notifiers/email.rs

//! SMTP email notifier.
//!
//! Port 465 connects with implicit TLS, every other port upgrades with
//! STARTTLS. Each digest goes out as a plain-text + HTML alternative.

use std::fmt::Write as _;

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::error::{AppError, Result};
use crate::models::{Digest, EmailConfig};
use crate::notifiers::Notifier;

const IMPLICIT_TLS_PORT: u16 = 465;

pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    recipients: Vec<Mailbox>,
}

impl EmailNotifier {
    /// Validate addresses and prepare the transport. No connection is made.
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let sender: Mailbox = config
            .sender_email
            .trim()
            .parse()
            .map_err(|e| AppError::config(format!("invalid sender_email: {e}")))?;

        let recipients = config
            .recipients()
            .iter()
            .map(|r| {
                r.parse::<Mailbox>()
                    .map_err(|e| AppError::config(format!("invalid recipient '{r}': {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        if recipients.is_empty() {
            return Err(AppError::config("email.recipient_emails is empty"));
        }

        let builder = if config.smtp_port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
        }
        .map_err(AppError::email)?;

        let transport = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            sender,
            recipients,
        })
    }

    fn build_message(&self, digest: &Digest) -> Result<Message> {
        let mut builder = Message::builder()
            .from(self.sender.clone())
            .subject(digest.title.clone());
        for recipient in &self.recipients {
            builder = builder.to(recipient.clone());
        }

        builder
            .multipart(MultiPart::alternative_plain_html(
                render_text(digest),
                render_html(digest),
            ))
            .map_err(AppError::email)
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, digest: &Digest) -> Result<()> {
        let message = self.build_message(digest)?;
        self.transport.send(message).await.map_err(AppError::email)?;
        log::info!(
            "Sent '{}' to {} recipients",
            digest.title,
            self.recipients.len()
        );
        Ok(())
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// HTML body: overall summary first, then the numbered articles.
pub fn render_html(digest: &Digest) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<html><body style=\"font-family: sans-serif; line-height: 1.5;\">\
         <h1>{}</h1>",
        escape_html(&digest.title)
    );

    if let Some(overall) = &digest.overall_summary {
        let _ = write!(
            html,
            "<div style=\"background: #f4f6f8; padding: 12px; margin-bottom: 16px;\">\
             <h2>Overall Summary</h2><p>{}</p></div>",
            escape_html(overall)
        );
    }

    for (i, processed) in digest.articles.iter().enumerate() {
        let article = &processed.original_article;
        let _ = write!(
            html,
            "<div style=\"margin-bottom: 20px;\"><h3>{}. {}</h3><p>{}</p>",
            i + 1,
            escape_html(&article.title),
            escape_html(&processed.summary)
        );

        if !processed.key_points.is_empty() {
            html.push_str("<ul>");
            for point in &processed.key_points {
                let _ = write!(html, "<li>{}</li>", escape_html(point));
            }
            html.push_str("</ul>");
        }

        if !processed.tags.is_empty() {
            let _ = write!(
                html,
                "<p><em>Tags: {}</em></p>",
                escape_html(&processed.tags.join(", "))
            );
        }

        let _ = write!(
            html,
            "<p><a href=\"{url}\">{url}</a> ({source})</p></div>",
            url = escape_html(&article.url),
            source = escape_html(&article.source)
        );
    }

    html.push_str("</body></html>");
    html
}

/// Plain-text alternative of [`render_html`].
pub fn render_text(digest: &Digest) -> String {
    let mut text = format!("{}\n\n", digest.title);

    if let Some(overall) = &digest.overall_summary {
        let _ = write!(text, "Overall Summary\n{overall}\n\n");
    }

    for (i, processed) in digest.articles.iter().enumerate() {
        let article = &processed.original_article;
        let _ = writeln!(text, "{}. {}", i + 1, article.title);
        let _ = writeln!(text, "{}", processed.summary);
        for point in &processed.key_points {
            let _ = writeln!(text, "  - {point}");
        }
        if !processed.tags.is_empty() {
            let _ = writeln!(text, "Tags: {}", processed.tags.join(", "));
        }
        let _ = writeln!(text, "{}\n", article.url);
    }

    text
}
