//! HTML email templates.
//!
//! Every value that came from a customer is HTML-escaped before it is
//! interpolated. Mass-mail bodies are admin-authored HTML and go in as is.

use std::fmt::Write as _;

use palmport_core::{Channel, DeliveryStatus, Order, OrderItem};

use super::OutboundEmail;

/// Format an amount as naira with thousands separators, e.g. `₦15,500`.
#[must_use]
pub fn format_naira(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if amount < 0 {
        format!("-₦{grouped}")
    } else {
        format!("₦{grouped}")
    }
}

/// `wa.me` chat link for a Nigerian phone number.
///
/// Non-digits are dropped and a leading trunk `0` becomes the `234` country code.
#[must_use]
pub fn whatsapp_link(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    let international = match digits.strip_prefix('0') {
        Some(rest) => format!("234{rest}"),
        None => digits,
    };
    format!("https://wa.me/{international}")
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
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

fn layout(heading: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: 'Segoe UI', Arial, sans-serif; line-height: 1.6; color: #333;">
<div style="max-width: 600px; margin: 0 auto; padding: 20px;">
<div style="background: #2f7a32; color: #fff; padding: 20px; border-radius: 10px 10px 0 0;"><h1>{heading}</h1></div>
<div style="background: #f9f9f9; padding: 20px; border-radius: 0 0 10px 10px;">
{body}
</div>
</div>
</body>
</html>"#
    )
}

fn items_table(items: &[OrderItem]) -> String {
    let mut rows = String::new();
    for item in items {
        let _ = write!(
            rows,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&item.name),
            escape(&item.size),
            item.quantity,
            format_naira(item.total)
        );
    }
    format!(
        "<table style=\"width: 100%; border-collapse: collapse;\">\
<thead><tr><th>Product</th><th>Size</th><th>Quantity</th><th>Price</th></tr></thead>\
<tbody>{rows}</tbody></table>"
    )
}

fn customer_block(order: &Order) -> String {
    let c = &order.customer;
    format!(
        "<h2>Customer Information</h2>\
<p><strong>Name:</strong> {}</p>\
<p><strong>Email:</strong> {}</p>\
<p><strong>Phone:</strong> {}</p>\
<p><strong>Address:</strong> {}, {}, {}</p>",
        escape(&c.customer_name),
        escape(&c.email),
        escape(&c.phone),
        escape(&c.address),
        escape(&c.city),
        escape(&c.state),
    )
}

fn totals_block(order: &Order) -> String {
    let a = &order.amounts;
    format!(
        "<p><strong>Subtotal:</strong> {}</p>\
<p><strong>Shipping:</strong> {}</p>\
<p><strong>Total:</strong> {}</p>",
        format_naira(a.subtotal),
        format_naira(a.shipping),
        format_naira(a.total)
    )
}

/// Status label shown to the admin for a freshly placed order.
const fn initial_status_label(channel: Channel) -> &'static str {
    match channel {
        Channel::Online => "Pending Payment",
        Channel::Assisted => "Awaiting Contact",
    }
}

const fn admin_action(channel: Channel) -> &'static str {
    match channel {
        Channel::Online => "This order is awaiting payment confirmation via Paystack.",
        Channel::Assisted => {
            "Please contact the customer via WhatsApp to confirm order details and arrange delivery."
        }
    }
}

/// Alert the admin that an order was placed.
#[must_use]
pub fn admin_new_order(to: &str, order: &Order, app_base_url: &str) -> OutboundEmail {
    let channel = order.order_type;
    let mut body = format!(
        "<p><strong>Order Number:</strong> {}</p>\
<p><strong>Order Type:</strong> {}</p>\
<p><strong>Status:</strong> {}</p>\
<p><strong>Placed:</strong> {}</p>",
        order.order_number,
        channel.label(),
        initial_status_label(channel),
        order.created_at.format("%d %b %Y, %H:%M UTC"),
    );
    body.push_str(&customer_block(order));
    body.push_str("<h2>Order Items</h2>");
    body.push_str(&items_table(&order.items));
    body.push_str(&totals_block(order));
    if !order.notes.trim().is_empty() {
        let _ = write!(body, "<p><strong>Notes:</strong> {}</p>", escape(&order.notes));
    }
    let _ = write!(body, "<p>{}</p>", admin_action(channel));
    if channel == Channel::Assisted {
        let _ = write!(
            body,
            "<p><a href=\"{}\">Chat with the customer on WhatsApp</a></p>",
            whatsapp_link(&order.customer.phone)
        );
    }
    let _ = write!(
        body,
        "<p><a href=\"{}/admin/orders\">View in dashboard</a></p>",
        app_base_url.trim_end_matches('/')
    );

    OutboundEmail {
        to: to.to_string(),
        subject: format!(
            "New {} - {} - {}",
            channel.label(),
            order.order_number,
            order.customer.customer_name
        ),
        html: layout(&format!("New {}", channel.label()), &body),
    }
}

/// Tell the admin a payment was confirmed by the gateway.
#[must_use]
pub fn admin_payment_received(to: &str, order: &Order, app_base_url: &str) -> OutboundEmail {
    let mut body = format!(
        "<p>Payment for order <strong>{}</strong> has been confirmed.</p>\
<p><strong>Reference:</strong> {}</p>",
        order.order_number,
        escape(order.payment_reference.as_deref().unwrap_or_default()),
    );
    body.push_str(&customer_block(order));
    body.push_str("<h2>Order Items</h2>");
    body.push_str(&items_table(&order.items));
    body.push_str(&totals_block(order));
    let _ = write!(
        body,
        "<p><a href=\"{}/admin/orders\">View in dashboard</a></p>",
        app_base_url.trim_end_matches('/')
    );

    OutboundEmail {
        to: to.to_string(),
        subject: format!(
            "Payment Received - {} - {}",
            order.order_number,
            format_naira(order.amounts.total)
        ),
        html: layout("Payment Received", &body),
    }
}

/// Tell the customer their delivery status changed.
#[must_use]
pub fn order_status_update(
    order: &Order,
    from: DeliveryStatus,
    to: DeliveryStatus,
) -> OutboundEmail {
    let c = &order.customer;
    let mut body = format!(
        "<p>Your order status has been updated from <strong>{}</strong> to <strong>{}</strong>.</p>\
<p>{}</p>\
<h2>Order Information</h2>\
<p><strong>Order Number:</strong> #{}</p>\
<p><strong>Customer Name:</strong> {}</p>\
<p><strong>Order Date:</strong> {}</p>\
<p><strong>Total Amount:</strong> {}</p>\
<h2>Order Items</h2>",
        from.label(),
        to.label(),
        to.description(),
        order.order_number,
        escape(&c.customer_name),
        order.created_at.format("%d %b %Y"),
        format_naira(order.amounts.total),
    );
    body.push_str(&items_table(&order.items));
    let _ = write!(
        body,
        "<h2>Delivery Information</h2>\
<p>{}</p><p>{}, {}</p><p>{}</p>",
        escape(&c.address),
        escape(&c.city),
        escape(&c.state),
        escape(&c.phone),
    );

    OutboundEmail {
        to: c.email.clone(),
        subject: format!(
            "Order Status Update - #{} - {}",
            order.order_number,
            to.label()
        ),
        html: layout("Order Status Update", &body),
    }
}

/// Welcome a customer enrolled automatically at checkout.
#[must_use]
pub fn welcome_subscriber(to: &str) -> OutboundEmail {
    OutboundEmail {
        to: to.to_string(),
        subject: "Welcome to PalmPort Updates!".into(),
        html: layout(
            "Welcome to PalmPort",
            "<p>Thank you for your order! You have been added to our mailing list \
and will hear about new batches, offers and updates.</p>",
        ),
    }
}

/// Confirm a newsletter sign-up.
#[must_use]
pub fn subscription_confirmation(to: &str) -> OutboundEmail {
    OutboundEmail {
        to: to.to_string(),
        subject: "Welcome to PalmPort Updates".into(),
        html: layout(
            "Thank you for subscribing!",
            "<p>You'll be the first to know about fresh palm oil batches, \
traceability reports and special offers.</p>",
        ),
    }
}

/// Tell the admin someone subscribed.
#[must_use]
pub fn admin_new_subscriber(to: &str, subscriber: &str) -> OutboundEmail {
    OutboundEmail {
        to: to.to_string(),
        subject: format!("New Subscriber: {subscriber}"),
        html: layout(
            "New Subscriber",
            &format!(
                "<p><strong>{}</strong> just subscribed to PalmPort updates.</p>",
                escape(subscriber)
            ),
        ),
    }
}

/// Admin broadcast to one subscriber.
#[must_use]
pub fn mass_mail(to: &str, subject: &str, message: &str) -> OutboundEmail {
    OutboundEmail {
        to: to.to_string(),
        subject: subject.to_string(),
        html: format!(
            "<div style=\"font-family: Arial, sans-serif;\">{message}\
<hr><p style=\"font-size: 12px; color: #888;\">You received this from PalmPort.</p></div>"
        ),
    }
}
