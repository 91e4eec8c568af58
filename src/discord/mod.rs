//! Discord HTTP interactions endpoint.

pub mod commands;
pub mod interaction;
pub mod signature;

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use log::{debug, error, info, warn};

use crate::channels::MessagePayload;
use crate::config::TicketSettings;
use crate::shared::state::AppState;
use crate::tickets::{ui, Actor, CloseRequest, TicketAction, TicketError};
use interaction::{InboundEvent, Interaction, InteractionResponse};
use signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER};

pub use signature::SignatureVerifier;

pub fn configure() -> Router<Arc<AppState>> {
    Router::new().route("/api/discord/interactions", post(handle_interaction))
}

pub async fn handle_interaction(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let (Some(signature), Some(timestamp)) = (header(SIGNATURE_HEADER), header(TIMESTAMP_HEADER))
    else {
        warn!("Interaction request without signature headers rejected");
        return (StatusCode::UNAUTHORIZED, "missing request signature").into_response();
    };

    if !state.verifier.verify(timestamp, &body, signature) {
        warn!("Interaction request with invalid signature rejected");
        return (StatusCode::UNAUTHORIZED, "invalid request signature").into_response();
    }

    if !signature::is_fresh(timestamp, Utc::now().timestamp()) {
        warn!("Interaction request with stale timestamp {} rejected", timestamp);
        return (StatusCode::UNAUTHORIZED, "stale request timestamp").into_response();
    }

    let interaction: Interaction = match serde_json::from_slice(&body) {
        Ok(interaction) => interaction,
        Err(e) => {
            warn!("Undecodable interaction payload: {}", e);
            return (StatusCode::BAD_REQUEST, "invalid interaction payload").into_response();
        }
    };

    Json(dispatch(state, interaction).await).into_response()
}

pub async fn dispatch(state: Arc<AppState>, interaction: Interaction) -> InteractionResponse {
    match interaction.classify() {
        InboundEvent::Ping => InteractionResponse::pong(),
        InboundEvent::Ticket(action) => handle_ticket_action(state, &interaction, action).await,
        InboundEvent::Command(command) => commands::handle(&state, &interaction, command).await,
        InboundEvent::Unsupported => {
            debug!(
                "Ignoring interaction {} of type {}",
                interaction.id, interaction.kind
            );
            InteractionResponse::ephemeral("That action is not supported.")
        }
    }
}

async fn handle_ticket_action(
    state: Arc<AppState>,
    interaction: &Interaction,
    action: TicketAction,
) -> InteractionResponse {
    let (Some(actor), Some(guild_id), Some(channel_id)) = (
        interaction.actor(),
        interaction.guild_id.clone(),
        interaction.channel_id.clone(),
    ) else {
        return InteractionResponse::ephemeral("Tickets can only be used inside a server.");
    };

    let settings = state.settings.snapshot().await;
    let token = interaction.token.clone();

    match action {
        TicketAction::SelectCategory(category) => {
            tokio::spawn(async move {
                let reply = match state
                    .controller
                    .create(&guild_id, &actor, category, &settings)
                    .await
                {
                    Ok(created) => format!("✅ Ticket created: <#{}>", created.channel_id),
                    Err(e) => rejection_text(&actor.user_id, &channel_id, e),
                };
                let edited = state
                    .platform
                    .edit_interaction_response(&token, &MessagePayload::text(reply))
                    .await;
                if let Err(e) = edited {
                    warn!("Could not answer ticket selection by {}: {}", actor.user_id, e);
                }
            });
            InteractionResponse::deferred_ephemeral()
        }
        TicketAction::Lock => {
            tokio::spawn(finish_staff_action(
                state,
                settings,
                token,
                channel_id,
                actor,
                StaffAction::Lock,
            ));
            InteractionResponse::deferred_update()
        }
        TicketAction::Unlock => {
            tokio::spawn(finish_staff_action(
                state,
                settings,
                token,
                channel_id,
                actor,
                StaffAction::Unlock,
            ));
            InteractionResponse::deferred_update()
        }
        TicketAction::Claim => {
            tokio::spawn(finish_staff_action(
                state,
                settings,
                token,
                channel_id,
                actor,
                StaffAction::Claim,
            ));
            InteractionResponse::deferred_update()
        }
        TicketAction::RequestClose { with_transcript } => match state
            .controller
            .authorize_close(&channel_id, &actor, &settings)
            .await
        {
            Ok(_) => InteractionResponse::modal(ui::close_modal(with_transcript)),
            Err(e) => rejection(&actor.user_id, &channel_id, e),
        },
        TicketAction::SubmitClose {
            with_transcript,
            reason,
        } => match state
            .controller
            .begin_close(&channel_id, &actor, &settings)
            .await
        {
            Ok(_) => {
                let request = CloseRequest {
                    channel_id,
                    actor,
                    with_transcript,
                    reason,
                };
                let controller = Arc::clone(&state.controller);
                tokio::spawn(async move {
                    match controller.close(&request, &settings).await {
                        Ok(report) => debug!("Close report for {}: {:?}", request.channel_id, report),
                        Err(e) => warn!("Close of {} did not run: {}", request.channel_id, e),
                    }
                });
                InteractionResponse::ephemeral("Closing ticket... processing.")
            }
            Err(e) => rejection(&actor.user_id, &channel_id, e),
        },
    }
}

#[derive(Debug, Clone, Copy)]
enum StaffAction {
    Lock,
    Unlock,
    Claim,
}

/// Runs a staff button after its deferred acknowledgement. Success redraws
/// the buttons on the ticket header; a rejection goes to the actor alone.
async fn finish_staff_action(
    state: Arc<AppState>,
    settings: Arc<TicketSettings>,
    token: String,
    channel_id: String,
    actor: Actor,
    action: StaffAction,
) {
    let controller = &state.controller;
    let result = match action {
        StaffAction::Lock => controller.lock(&channel_id, &actor, &settings).await,
        StaffAction::Unlock => controller.unlock(&channel_id, &actor, &settings).await,
        StaffAction::Claim => controller.claim(&channel_id, &actor, &settings).await,
    };

    let delivered = match result {
        Ok(ticket) => {
            let buttons = ui::ticket_buttons(ticket.locked, ticket.is_claimed());
            let redraw = MessagePayload::default().with_components(buttons);
            state
                .platform
                .edit_interaction_response(&token, &redraw)
                .await
        }
        Err(e) => {
            let reply = MessagePayload::ephemeral(rejection_text(&actor.user_id, &channel_id, e));
            state.platform.send_interaction_followup(&token, &reply).await
        }
    };
    if let Err(e) = delivered {
        warn!("Could not report {:?} in {} to {}: {}", action, channel_id, actor.user_id, e);
    }
}

fn rejection_text(user_id: &str, channel_id: &str, error: TicketError) -> String {
    match &error {
        TicketError::ExternalCallFailed { .. } | TicketError::CategoryUnavailable => {
            error!("Ticket action by {} in {} failed: {}", user_id, channel_id, error)
        }
        _ => info!("Ticket action by {} in {} rejected: {}", user_id, channel_id, error),
    }
    error.user_message()
}

fn rejection(user_id: &str, channel_id: &str, error: TicketError) -> InteractionResponse {
    InteractionResponse::ephemeral(rejection_text(user_id, channel_id, error))
}
