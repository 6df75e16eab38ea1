// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email bodies for domain events.
//!
//! [`compose`] loads the rows an event refers to and renders one
//! [`Notification`] per recipient. Rows that vanished since the event was
//! written yield no notification.

use rusqlite::Connection;
use tracing::warn;

use tutorlane_core::{
    Booking, DomainEvent, Notification, PaymentTarget, PayoutStatus, User,
};
use tutorlane_storage::queries::{bookings, bundles, payments, payouts, slots, users};

fn escape(text: &str) -> String {
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

fn to(user: &User, subject: &str, html_body: String) -> Notification {
    Notification {
        recipient_name: user.name.clone(),
        recipient_email: user.email.clone(),
        subject: subject.to_string(),
        html_body,
    }
}

/// A booking with both parties loaded.
struct Parties {
    booking: Booking,
    student: User,
    teacher: User,
}

fn parties(conn: &Connection, booking_id: uuid::Uuid) -> rusqlite::Result<Option<Parties>> {
    let Some(booking) = bookings::get_booking(conn, booking_id)? else {
        return Ok(None);
    };
    let student = users::get_user(conn, booking.student_id)?;
    let teacher = users::get_user(conn, booking.teacher_id)?;
    Ok(student.zip(teacher).map(|(student, teacher)| Parties {
        booking,
        student,
        teacher,
    }))
}

/// Render the notifications for `event`.
pub fn compose(conn: &Connection, event: &DomainEvent) -> rusqlite::Result<Vec<Notification>> {
    let notes = match *event {
        DomainEvent::BookingConfirmed { booking_id } => {
            let Some(p) = parties(conn, booking_id)? else {
                return Ok(missing(event));
            };
            let when = slots::get_slot(conn, p.booking.slot_id)?
                .map(|s| format!(" on {}", s.start_time.format("%A %e %B at %H:%M UTC")))
                .unwrap_or_default();
            vec![
                to(
                    &p.student,
                    "Your Booking is Confirmed!",
                    format!(
                        "<h1>Booking Confirmed</h1><p>Hello {},</p><p>Your class with {}{when} is confirmed. You will receive the meeting link shortly.</p>",
                        escape(&p.student.name),
                        escape(&p.teacher.name),
                    ),
                ),
                to(
                    &p.teacher,
                    "You Have a New Booking!",
                    format!(
                        "<h1>New Booking</h1><p>{} has booked a session with you{when}. Please prepare for the class.</p>",
                        escape(&p.student.name),
                    ),
                ),
            ]
        }
        DomainEvent::BundleActivated { student_bundle_id } => {
            let Some(sb) = bundles::get_student_bundle(conn, student_bundle_id)? else {
                return Ok(missing(event));
            };
            let Some(student) = users::get_user(conn, sb.student_id)? else {
                return Ok(missing(event));
            };
            let name = bundles::get_bundle(conn, sb.bundle_id)?
                .map(|b| b.name)
                .unwrap_or_else(|| "class bundle".to_string());
            vec![to(
                &student,
                "Bundle Purchase Confirmed!",
                format!(
                    "<h1>Success!</h1><p>Your {} purchase is complete. You have {} class credits to book sessions with.</p>",
                    escape(&name),
                    sb.remaining_classes,
                ),
            )]
        }
        DomainEvent::RefundApproved { payment_id } | DomainEvent::RefundRejected { payment_id } => {
            let Some(payment) = payments::get_payment(conn, payment_id)? else {
                return Ok(missing(event));
            };
            let PaymentTarget::Booking(booking_id) = payment.target else {
                return Ok(Vec::new());
            };
            let Some(p) = parties(conn, booking_id)? else {
                return Ok(missing(event));
            };
            if matches!(event, DomainEvent::RefundApproved { .. }) {
                vec![to(
                    &p.student,
                    "Your Refund has been Processed",
                    format!(
                        "<h1>Refund Processed</h1><p>Your refund of {} {:.2} has been approved and processed by our team.</p>",
                        escape(&payment.currency),
                        payment.amount,
                    ),
                )]
            } else {
                vec![to(
                    &p.student,
                    "Update on Your Refund Request",
                    "<h1>Refund Request Update</h1><p>Your refund request has been reviewed and was not approved.</p>".to_string(),
                )]
            }
        }
        DomainEvent::RescheduleRequested { booking_id } => {
            let Some(p) = parties(conn, booking_id)? else {
                return Ok(missing(event));
            };
            vec![to(
                &p.teacher,
                "Reschedule Request",
                format!(
                    "<h1>Reschedule Request</h1><p>{} has asked to move a class. Please log in to your dashboard to approve or deny the request.</p>",
                    escape(&p.student.name),
                ),
            )]
        }
        DomainEvent::RescheduleProcessed {
            booking_id,
            approved,
        } => {
            let Some(p) = parties(conn, booking_id)? else {
                return Ok(missing(event));
            };
            let (subject, body) = if approved {
                (
                    "Reschedule Approved",
                    "Your request to reschedule the class has been approved by the teacher.",
                )
            } else {
                (
                    "Reschedule Rejected",
                    "Your request to reschedule the class was not approved by the teacher. The original time still stands.",
                )
            };
            vec![to(&p.student, subject, format!("<h1>{subject}</h1><p>{body}</p>"))]
        }
        DomainEvent::BookingCompleted { booking_id } => {
            let Some(p) = parties(conn, booking_id)? else {
                return Ok(missing(event));
            };
            vec![to(
                &p.student,
                "Thanks for attending your class",
                format!(
                    "<h1>Class Completed</h1><p>{} has marked your class as completed. We hope you enjoyed it!</p>",
                    escape(&p.teacher.name),
                ),
            )]
        }
        DomainEvent::PayoutProcessed { request_id } => {
            let Some(request) = payouts::get_payout(conn, request_id)? else {
                return Ok(missing(event));
            };
            let Some(teacher) = users::get_user(conn, request.teacher_id)? else {
                return Ok(missing(event));
            };
            match request.status {
                PayoutStatus::Completed => vec![to(
                    &teacher,
                    "Your Payout Has Been Processed",
                    format!(
                        "<h1>Payout Processed</h1><p>Hello {},</p><p>Your payout request for the amount of ${:.2} has been processed and sent by our team.</p>",
                        escape(&teacher.name),
                        request.amount,
                    ),
                )],
                PayoutStatus::Rejected => vec![to(
                    &teacher,
                    "Update on Your Payout Request",
                    format!(
                        "<h1>Payout Request Update</h1><p>Hello {},</p><p>Your payout request for the amount of ${:.2} was rejected. The funds have been returned to your account balance.</p><p><b>Admin Notes:</b> {}</p>",
                        escape(&teacher.name),
                        request.amount,
                        escape(request.admin_notes.as_deref().unwrap_or("none")),
                    ),
                )],
                PayoutStatus::Pending => Vec::new(),
            }
        }
        DomainEvent::ReferralCheck { .. } => Vec::new(),
    };
    Ok(notes)
}

fn missing(event: &DomainEvent) -> Vec<Notification> {
    warn!(kind = event.kind(), ?event, "event refers to rows that no longer exist");
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }
}
