// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for this crate's tests and downstream crates'
//! `test-support` consumers.

use crate::event::Event;
use crate::message::IncomingMessage;
use crate::offer::{LineItem, Offer};
use crate::requirements::{requirements_hash, Requirements, TimeWindow};

/// Requirements for the canonical "30 guests, 14:00-16:00, Room A" fixture.
pub fn sample_requirements() -> Requirements {
    Requirements {
        number_of_participants: Some(30),
        duration: Some(TimeWindow { start: "14:00".into(), end: "16:00".into() }),
        seating_layout: None,
        special_requirements: None,
        preferred_room: Some("Room A".into()),
    }
}

/// An event mid-flow at the offer step with a locked room and consistent
/// hashes.
pub fn event_at_offer_step() -> Event {
    let requirements = sample_requirements();
    let hash = requirements_hash(&requirements);
    let mut event = Event::new("client@example.com", "thread-1", 1_000);
    event.current_step = 4;
    event.chosen_date = Some("15.04.2026".into());
    event.date_confirmed = true;
    event.locked_room_id = Some("Room A".into());
    event.requirements = requirements;
    event.requirements_hash = Some(hash.clone());
    event.room_eval_hash = Some(hash);
    event
}

/// A priced offer attached to [`event_at_offer_step`]-style fixtures.
pub fn sample_offer(id: &str) -> Offer {
    let items = vec![
        LineItem::per_event("Room A rental", 1200.0),
        LineItem::per_person("Business lunch", 30, 45.0),
    ];
    Offer {
        offer_id: id.to_string(),
        total_amount: Offer::total_of(&items),
        line_items: items,
        created_at: "2026-01-01T00:00:00Z".to_string(),
    }
}

/// A plain inbound message with the given id and body.
pub fn message(msg_id: &str, body: &str) -> IncomingMessage {
    IncomingMessage {
        msg_id: msg_id.to_string(),
        from_name: "Anna Client".to_string(),
        from_email: "client@example.com".to_string(),
        subject: "Re: booking".to_string(),
        body: body.to_string(),
        ts: "2026-01-01T00:00:00Z".to_string(),
        thread_id: Some("thread-1".to_string()),
        session_id: None,
        is_continuation: false,
        deposit_just_paid: false,
    }
}
