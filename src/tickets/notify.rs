use std::sync::Arc;

use log::warn;

use crate::channels::ChatPlatform;
use crate::tickets::controller::StepStatus;
use crate::tickets::events::LifecycleEvent;
use crate::tickets::ui;

/// Turns lifecycle events into messages. Never touches ticket state.
#[derive(Clone)]
pub struct NotificationEmitter {
    platform: Arc<dyn ChatPlatform>,
}

impl NotificationEmitter {
    pub fn new(platform: Arc<dyn ChatPlatform>) -> Self {
        Self { platform }
    }

    pub async fn emit(&self, event: &LifecycleEvent) -> StepStatus {
        let result = match event {
            LifecycleEvent::Created {
                channel_id,
                channel_name,
                opener_id,
                category,
                staff_role_id,
            } => {
                let header =
                    ui::header_message(channel_name, opener_id, *category, staff_role_id.as_deref());
                self.platform.send_message(channel_id, &header).await
            }
            LifecycleEvent::Locked {
                channel_id,
                actor_id,
            } => {
                self.platform
                    .send_message(channel_id, &ui::locked_notice(actor_id))
                    .await
            }
            LifecycleEvent::Unlocked {
                channel_id,
                actor_id,
            } => {
                self.platform
                    .send_message(channel_id, &ui::unlocked_notice(actor_id))
                    .await
            }
            LifecycleEvent::Claimed {
                channel_id,
                actor_id,
            } => {
                self.platform
                    .send_message(channel_id, &ui::claimed_notice(actor_id))
                    .await
            }
            LifecycleEvent::Closing {
                channel_id,
                actor_id,
            } => {
                self.platform
                    .send_message(channel_id, &ui::closing_notice(actor_id))
                    .await
            }
            LifecycleEvent::Closed(summary) => {
                // The opener may have left the guild or blocked the bot.
                if let Err(e) = self.platform.fetch_user(&summary.opener_id).await {
                    warn!(
                        "Could not resolve opener {} of ticket {}: {}",
                        summary.opener_id, summary.ticket_number, e
                    );
                    return StepStatus::Failed(e.to_string());
                }
                let guild = self.platform.guild(&summary.guild_id).await.ok();
                let message = ui::closed_dm(summary, guild.as_ref());
                self.platform
                    .send_direct_message(&summary.opener_id, &message)
                    .await
            }
        };

        match result {
            Ok(_) => StepStatus::Done,
            Err(e) => {
                warn!("Failed to deliver {} notification: {}", event.name(), e);
                StepStatus::Failed(e.to_string())
            }
        }
    }
}
