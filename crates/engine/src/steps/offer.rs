// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step 4 — offer composition.
//!
//! Builds the priced offer from room, requirements, and selected products,
//! persists it with a monotonically ordered id, and produces two drafts:
//! client prose (verbalized) and the manager-panel summary.

use crate::error::EngineError;
use crate::propagate::resolve_detour;
use crate::state::{GroupResult, StepContext};
use serde_json::json;
use vd_adapters::llm::VerbalizeFacts;
use vd_core::dates::format_chf;
use vd_core::offer::{next_offer_id, offer_hash, LineItem, Offer};
use vd_core::{Draft, EventStatus, TableBlock, ThreadState};
use vd_storage::{update_event_metadata, EventPatch};

pub fn process(ctx: &mut StepContext<'_>) -> Result<GroupResult, EngineError> {
    let Some(event) = ctx.event() else {
        return Ok(GroupResult::halt("offer_missing_event"));
    };
    let (Some(room_name), Some(date)) = (event.locked_room_id.clone(), event.chosen_date.clone())
    else {
        let draft = Draft::new(
            4,
            "offer_prerequisites_missing",
            "Before I can put an offer together I need a confirmed date and room - let's settle those first.",
        )
        .with_workflow_footer("Confirm date and room", "Awaiting Client");
        ctx.state.add_draft(draft);
        return Ok(GroupResult::halt("offer_prerequisites_missing"));
    };
    let participants = event.requirements.number_of_participants.unwrap_or(0);
    let selected_products = event.selected_products.clone();
    let selected_catering = event.selected_catering.clone();
    let caller_step = event.caller_step;

    let mut items: Vec<LineItem> = Vec::new();
    if let Some(room) = ctx.catalog.room_by_name(&room_name) {
        items.push(LineItem::per_event(format!("{} rental", room.name), room.base_price));
    }
    for name in selected_products.iter().chain(selected_catering.iter()) {
        let Some(product) = ctx.catalog.product_by_name(name) else {
            tracing::warn!(product = %name, "product missing from catalog, skipped");
            continue;
        };
        if product.unit == "per person" && participants > 0 {
            items.push(LineItem::per_person(product.name, participants, product.price));
        } else {
            items.push(LineItem::per_event(product.name, product.price));
        }
    }

    let total = Offer::total_of(&items);
    let hash = offer_hash(&items);
    let now_ms = ctx.state.now_ms;

    let offer_id = {
        let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) else {
            return Ok(GroupResult::halt("offer_missing_event"));
        };
        let offer_id = next_offer_id(&event.offers);
        event.offers.push(Offer {
            offer_id: offer_id.clone(),
            total_amount: total,
            line_items: items.clone(),
            created_at: ctx.state.message.ts.clone(),
        });
        event.current_offer_id = Some(offer_id.clone());
        event.offer_hash = Some(hash);
        event.offer_status = Some("Sent".into());
        update_event_metadata(
            event,
            EventPatch::new()
                .status(EventStatus::OfferSent)
                .thread_state(ThreadState::AwaitingClient),
            now_ms,
        );
        event.log_activity("offer_created", format!("{offer_id} at {}", format_chf(total)), now_ms);
        offer_id
    };
    ctx.state.extras.persist = true;
    tracing::info!(offer_id = %offer_id, total, "offer composed");

    let facts = VerbalizeFacts {
        date: Some(date.clone()),
        room: Some(room_name.clone()),
        participants: (participants > 0).then_some(participants),
        amount: Some(total),
        line_items: items
            .iter()
            .map(|i| (format!("{} ({})", i.description, i.unit), i.total))
            .collect(),
        deposit: None,
        billing: None,
    };
    let client_draft = Draft::new(4, "offer_sent", template_placeholder(&facts))
        .with_workflow_footer("Review the offer", "Awaiting Client");
    ctx.state.add_verbalized_draft(client_draft, facts);

    let table = TableBlock {
        header: vec![
            "Item".to_string(),
            "Qty".to_string(),
            "Unit".to_string(),
            "Total".to_string(),
        ],
        rows: items
            .iter()
            .map(|i| {
                vec![
                    i.description.clone(),
                    i.quantity.to_string(),
                    i.unit.clone(),
                    format_chf(i.total),
                ]
            })
            .collect(),
    };
    let markdown = items
        .iter()
        .map(|i| format!("- {}: {}", i.description, format_chf(i.total)))
        .chain(std::iter::once(format!("- **Total: {}**", format_chf(total))))
        .collect::<Vec<_>>()
        .join("\n");
    let manager_draft = Draft::new(
        4,
        "offer_manager_summary",
        format!("Offer {offer_id} for {room_name} on {date}: {}", format_chf(total)),
    )
    .body_markdown(markdown)
    .table_blocks(vec![table]);
    ctx.state.add_draft(manager_draft);

    if caller_step.is_some() {
        // Revised offer closes the detour (e.g. a product change from
        // confirmation).
        if let Some(event) = ctx.state.event_idx.and_then(|i| ctx.db.events.get_mut(i)) {
            resolve_detour(event, now_ms);
        }
    }

    Ok(GroupResult::halt("offer_sent").with_payload(json!({
        "offer_id": offer_id,
        "total_amount": total,
    })))
}

/// Deterministic body used until the verbalizer rewrites it.
fn template_placeholder(facts: &VerbalizeFacts) -> String {
    crate::verbalize::template_fallback(facts)
}

#[cfg(test)]
#[path = "offer_tests.rs"]
mod tests;
