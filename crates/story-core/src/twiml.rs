//! Reply-document formatting for the messaging provider.
//!
//! The webhook must answer with a TwiML `MessagingResponse` carrying exactly
//! one `<Message>` body; the provider relays that body back to the sender
//! as an SMS.

/// MIME type the provider expects on the webhook response.
pub const CONTENT_TYPE: &str = "text/xml";

/// A reply document with a single message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagingResponse {
    body: String,
}

impl MessagingResponse {
    pub fn with_message<S: Into<String>>(body: S) -> Self {
        Self { body: body.into() }
    }

    /// Render the full reply document.
    pub fn to_xml(&self) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
            escape_xml(&self.body)
        )
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
