//! Email bodies.
//!
//! Every value taken from a lead is escaped before it goes into HTML.

use crate::domain::email::OutboundEmail;
use crm_types::{Lead, StaffMember, Urgency};
use std::borrow::Cow;
use std::fmt::Write;
use url::Url;

/// Escape text for an HTML body or attribute.
pub fn escape_html(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len() + 16);
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

/// `(label, value)` rows describing a lead.
fn lead_rows<'a>(lead: &'a Lead, service_name: Option<&'a str>) -> Vec<(&'static str, Cow<'a, str>)> {
    vec![
        ("Name", Cow::Borrowed(lead.name.as_str())),
        ("Email", Cow::Borrowed(or_dash(lead.email.as_deref()))),
        ("Phone", Cow::Borrowed(or_dash(lead.phone.as_deref()))),
        ("Location", Cow::Borrowed(or_dash(lead.location.as_deref()))),
        ("Service", Cow::Borrowed(or_dash(service_name))),
        ("Urgency", Cow::Owned(lead.urgency.to_string())),
        ("Preferred contact", Cow::Owned(lead.preferred_contact.to_string())),
        ("Source", Cow::Owned(lead.source.to_string())),
    ]
}

fn rows_text(rows: &[(&'static str, Cow<'_, str>)]) -> String {
    let mut out = String::new();
    for (label, value) in rows {
        let _ = writeln!(out, "{}: {}", label, value);
    }
    out
}

fn rows_html(rows: &[(&'static str, Cow<'_, str>)]) -> String {
    let mut out = String::from("<table>");
    for (label, value) in rows {
        let _ = write!(
            out,
            "<tr><th align=\"left\">{}</th><td>{}</td></tr>",
            label,
            escape_html(value)
        );
    }
    out.push_str("</table>");
    out
}

fn paragraphs_html(text: &str) -> String {
    escape_html(text).replace('\n', "<br>")
}

/// Internal alert for a new lead.
pub fn admin_alert(
    to: &str,
    lead: &Lead,
    image_count: usize,
    service_name: Option<&str>,
    link: &Url,
) -> OutboundEmail {
    let prefix = if lead.urgency == Urgency::Urgent {
        "[URGENT] "
    } else {
        ""
    };
    let subject = format!("{}New contact: {}", prefix, lead.name);
    let rows = lead_rows(lead, service_name);

    let text = format!(
        "A new lead was received.\n\n{}Attachments: {}\n\nMessage:\n{}\n\nOpen: {}\n",
        rows_text(&rows),
        image_count,
        lead.message,
        link
    );
    let html = format!(
        "<p>A new lead was received.</p>{}<p>Attachments: {}</p><p><strong>Message</strong><br>{}</p>\
         <p><a href=\"{}\">Open lead #{}</a></p>",
        rows_html(&rows),
        image_count,
        paragraphs_html(&lead.message),
        escape_html(link.as_str()),
        lead.id
    );

    OutboundEmail::new(to, subject, text)
        .with_html(html)
        .with_reply_to(lead.email.clone())
}

/// Acknowledgment to the customer. `None` when the lead has no email.
pub fn customer_ack(lead: &Lead, business_name: &str) -> Option<OutboundEmail> {
    let to = lead.email.as_deref()?;
    let subject = format!("We received your request - {}", business_name);
    let text = format!(
        "Hello {},\n\nThank you for contacting {}. We have received your request and \
         will get back to you as soon as possible.\n\nYour message:\n{}\n\n{}\n",
        lead.name, business_name, lead.message, business_name
    );
    let html = format!(
        "<p>Hello {},</p><p>Thank you for contacting {}. We have received your request and \
         will get back to you as soon as possible.</p><blockquote>{}</blockquote><p>{}</p>",
        escape_html(&lead.name),
        escape_html(business_name),
        paragraphs_html(&lead.message),
        escape_html(business_name)
    );
    Some(OutboundEmail::new(to, subject, text).with_html(html))
}

/// Tell a staff member a lead is now theirs. `None` without an email.
pub fn assignment(
    lead: &Lead,
    assignee: &StaffMember,
    by: &StaffMember,
    link: &Url,
) -> Option<OutboundEmail> {
    let to = assignee.email.as_deref()?;
    let subject = format!("Lead assigned to you: {}", lead.name);
    let rows = lead_rows(lead, None);
    let text = format!(
        "Hello {},\n\n{} assigned you a lead.\n\n{}\nMessage:\n{}\n\nOpen: {}\n",
        assignee.display_name(),
        by.display_name(),
        rows_text(&rows),
        lead.message,
        link
    );
    let html = format!(
        "<p>Hello {},</p><p>{} assigned you a lead.</p>{}<p>{}</p><p><a href=\"{}\">Open lead #{}</a></p>",
        escape_html(assignee.display_name()),
        escape_html(by.display_name()),
        rows_html(&rows),
        paragraphs_html(&lead.message),
        escape_html(link.as_str()),
        lead.id
    );
    Some(OutboundEmail::new(to, subject, text).with_html(html))
}

/// Tell the admin address about a new note.
pub fn note_added(to: &str, lead: &Lead, note: &str, by: &StaffMember, link: &Url) -> OutboundEmail {
    let subject = format!("New note on lead: {}", lead.name);
    let text = format!(
        "{} added a note to lead #{} ({}):\n\n{}\n\nOpen: {}\n",
        by.display_name(),
        lead.id,
        lead.name,
        note,
        link
    );
    let html = format!(
        "<p>{} added a note to lead #{} ({}):</p><blockquote>{}</blockquote><p><a href=\"{}\">Open lead</a></p>",
        escape_html(by.display_name()),
        lead.id,
        escape_html(&lead.name),
        paragraphs_html(note),
        escape_html(link.as_str())
    );
    OutboundEmail::new(to, subject, text).with_html(html)
}
