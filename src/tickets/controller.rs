use std::sync::Arc;

use log::{error, info, warn};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::channels::{ChannelError, ChannelId, ChatPlatform, CreateChannel, FileUpload};
use crate::config::TicketSettings;
use crate::tickets::events::{ClosureSummary, LifecycleEvent};
use crate::tickets::notify::NotificationEmitter;
use crate::tickets::registry::TicketRegistry;
use crate::tickets::transcript::{self, TranscriptRenderer};
use crate::tickets::{permissions, ui, Actor, TicketCategory, TicketError, TicketRecord};

pub const DEFAULT_CATEGORY_NAME: &str = "Tickets";

/// Outcome of a side effect whose failure must not abort the transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StepStatus {
    Done,
    Skipped,
    Failed(String),
}

impl StepStatus {
    fn logged<T>(step: &str, channel_id: &str, result: Result<T, ChannelError>) -> Self {
        match result {
            Ok(_) => Self::Done,
            Err(e) => {
                warn!("{} for ticket channel {} failed: {}", step, channel_id, e);
                Self::Failed(e.to_string())
            }
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketCreated {
    pub channel_id: ChannelId,
    pub channel_name: String,
    pub ticket_number: u64,
    pub header: StepStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseRequest {
    pub channel_id: ChannelId,
    pub actor: Actor,
    pub with_transcript: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloseReport {
    pub ticket_number: u64,
    pub transcript: StepStatus,
    pub transcript_url: Option<String>,
    pub opener_notified: StepStatus,
    pub announced: StepStatus,
    pub teardown: StepStatus,
}

pub struct TicketController {
    registry: Mutex<TicketRegistry>,
    platform: Arc<dyn ChatPlatform>,
    notifier: NotificationEmitter,
    renderer: TranscriptRenderer,
}

impl TicketController {
    pub fn new(platform: Arc<dyn ChatPlatform>) -> Self {
        Self::with_renderer(platform, TranscriptRenderer::local())
    }

    pub fn with_renderer(platform: Arc<dyn ChatPlatform>, renderer: TranscriptRenderer) -> Self {
        Self {
            registry: Mutex::new(TicketRegistry::new()),
            notifier: NotificationEmitter::new(platform.clone()),
            platform,
            renderer,
        }
    }

    pub async fn lookup(&self, channel_id: &str) -> Option<TicketRecord> {
        self.registry.lock().await.lookup_by_channel(channel_id).cloned()
    }

    pub async fn lookup_by_opener(&self, opener_id: &str) -> Option<(ChannelId, TicketRecord)> {
        self.registry
            .lock()
            .await
            .lookup_by_opener(opener_id)
            .map(|(channel, record)| (channel.clone(), record.clone()))
    }

    pub async fn open_tickets(&self) -> usize {
        self.registry.lock().await.len()
    }

    fn authorize(
        actor: &Actor,
        settings: &TicketSettings,
        action: &'static str,
    ) -> Result<(), TicketError> {
        if actor.is_staff(settings) {
            Ok(())
        } else {
            Err(TicketError::Forbidden { action })
        }
    }

    pub async fn create(
        &self,
        guild_id: &str,
        opener: &Actor,
        category: TicketCategory,
        settings: &TicketSettings,
    ) -> Result<TicketCreated, TicketError> {
        self.registry
            .lock()
            .await
            .reserve_opener(&opener.user_id)?;

        let result = self.create_reserved(guild_id, opener, category, settings).await;
        if result.is_err() {
            self.registry.lock().await.release_opener(&opener.user_id);
        }
        result
    }

    async fn create_reserved(
        &self,
        guild_id: &str,
        opener: &Actor,
        category: TicketCategory,
        settings: &TicketSettings,
    ) -> Result<TicketCreated, TicketError> {
        let parent_id = self.ensure_parent_category(guild_id, settings).await?;
        let ticket_number = self.registry.lock().await.next_ticket_number();
        let record = TicketRecord::new(&opener.user_id, guild_id, category, ticket_number);

        // The everyone role shares the guild's id.
        let overwrites =
            permissions::initial_plan(guild_id, &opener.user_id, settings.staff_role_id.as_ref());
        let request = CreateChannel::text(&record.channel_name)
            .with_parent(parent_id)
            .with_overwrites(overwrites)
            .with_topic(format!(
                "Ticket for {} ({}) • Category: {}",
                opener.name,
                opener.user_id,
                category.label()
            ));

        let channel = self
            .platform
            .create_channel(guild_id, &request)
            .await
            .map_err(TicketError::external("create ticket channel"))?;

        let inserted = self
            .registry
            .lock()
            .await
            .insert(channel.id.clone(), record.clone());
        if let Err(e) = inserted {
            error!(
                "Ticket channel {} created but not registered: {}",
                channel.id, e
            );
            let cleanup = self.platform.delete_channel(&channel.id).await;
            StepStatus::logged("orphan cleanup", &channel.id, cleanup);
            return Err(e);
        }

        info!(
            "Ticket #{} opened by {} in channel {} ({})",
            ticket_number,
            opener.user_id,
            channel.id,
            category.label()
        );

        let header = self
            .notifier
            .emit(&LifecycleEvent::Created {
                channel_id: channel.id.clone(),
                channel_name: record.channel_name.clone(),
                opener_id: opener.user_id.clone(),
                category,
                staff_role_id: settings.staff_role_id.clone(),
            })
            .await;

        Ok(TicketCreated {
            channel_id: channel.id,
            channel_name: record.channel_name,
            ticket_number,
            header,
        })
    }

    /// Configured category if it still exists, else any category with
    /// "ticket" in its name, else a freshly created one. Nothing is created
    /// when the guild's channels cannot be listed.
    async fn ensure_parent_category(
        &self,
        guild_id: &str,
        settings: &TicketSettings,
    ) -> Result<ChannelId, TicketError> {
        let channels = match self.platform.guild_channels(guild_id).await {
            Ok(channels) => channels,
            Err(e) => {
                warn!("Could not list channels of guild {}: {}", guild_id, e);
                // An unlisted guild may still hold a tickets category.
                return match &settings.ticket_category_id {
                    Some(configured) => Ok(configured.clone()),
                    None => Err(TicketError::CategoryUnavailable),
                };
            }
        };

        if let Some(configured) = &settings.ticket_category_id {
            if channels
                .iter()
                .any(|c| &c.id == configured && c.is_category())
            {
                return Ok(configured.clone());
            }
            warn!(
                "Configured ticket category {} is gone from guild {}",
                configured, guild_id
            );
        }

        if let Some(existing) = channels
            .iter()
            .find(|c| c.is_category() && c.name.to_lowercase().contains("ticket"))
        {
            return Ok(existing.id.clone());
        }

        match self
            .platform
            .create_channel(guild_id, &CreateChannel::category(DEFAULT_CATEGORY_NAME))
            .await
        {
            Ok(created) => {
                info!(
                    "Created ticket category {} in guild {}",
                    created.id, guild_id
                );
                Ok(created.id)
            }
            Err(e) => {
                error!("Failed to create Tickets category in guild {}: {}", guild_id, e);
                Err(TicketError::CategoryUnavailable)
            }
        }
    }

    pub async fn lock(
        &self,
        channel_id: &str,
        actor: &Actor,
        settings: &TicketSettings,
    ) -> Result<TicketRecord, TicketError> {
        self.set_locked(channel_id, actor, settings, true).await
    }

    pub async fn unlock(
        &self,
        channel_id: &str,
        actor: &Actor,
        settings: &TicketSettings,
    ) -> Result<TicketRecord, TicketError> {
        self.set_locked(channel_id, actor, settings, false).await
    }

    async fn set_locked(
        &self,
        channel_id: &str,
        actor: &Actor,
        settings: &TicketSettings,
        locked: bool,
    ) -> Result<TicketRecord, TicketError> {
        Self::authorize(actor, settings, if locked { "lock" } else { "unlock" })?;

        let record = self.registry.lock().await.mutate(channel_id, |ticket| {
            if ticket.closing {
                return Err(TicketError::NoOp("Ticket is being closed.".to_string()));
            }
            if ticket.locked == locked {
                let reason = if locked {
                    "Ticket already locked."
                } else {
                    "Ticket is not locked."
                };
                return Err(TicketError::NoOp(reason.to_string()));
            }
            ticket.locked = locked;
            Ok(ticket.clone())
        })?;

        let overwrite = if locked {
            permissions::lock_delta(&record.opener_id)
        } else {
            permissions::unlock_delta(&record.opener_id)
        };
        let applied = self.platform.edit_overwrite(channel_id, &overwrite).await;
        StepStatus::logged("opener overwrite update", channel_id, applied);

        let event = if locked {
            LifecycleEvent::Locked {
                channel_id: channel_id.to_string(),
                actor_id: actor.user_id.clone(),
            }
        } else {
            LifecycleEvent::Unlocked {
                channel_id: channel_id.to_string(),
                actor_id: actor.user_id.clone(),
            }
        };
        self.notifier.emit(&event).await;

        info!(
            "Ticket #{} {} by {}",
            record.ticket_number,
            event.name(),
            actor.user_id
        );
        Ok(record)
    }

    pub async fn claim(
        &self,
        channel_id: &str,
        actor: &Actor,
        settings: &TicketSettings,
    ) -> Result<TicketRecord, TicketError> {
        Self::authorize(actor, settings, "claim")?;

        let mut record = self.registry.lock().await.mutate(channel_id, |ticket| {
            if ticket.closing {
                return Err(TicketError::NoOp("Ticket is being closed.".to_string()));
            }
            if let Some(claimant) = &ticket.claimed_by {
                return Err(TicketError::AlreadyClaimed {
                    claimant: claimant.clone(),
                });
            }
            ticket.claimed_by = Some(actor.user_id.clone());
            Ok(ticket.clone())
        })?;

        if let Some(name) = ui::claimed_channel_name(&record.channel_name) {
            let renamed = self.platform.rename_channel(channel_id, &name).await;
            if StepStatus::logged("claim rename", channel_id, renamed).is_done() {
                let tracked = self.registry.lock().await.mutate(channel_id, |ticket| {
                    ticket.channel_name = name.clone();
                    Ok(())
                });
                if let Err(e) = tracked {
                    warn!("Renamed ticket channel {} is no longer registered: {}", channel_id, e);
                }
                record.channel_name = name;
            }
        }

        self.notifier
            .emit(&LifecycleEvent::Claimed {
                channel_id: channel_id.to_string(),
                actor_id: actor.user_id.clone(),
            })
            .await;

        info!("Ticket #{} claimed by {}", record.ticket_number, actor.user_id);
        Ok(record)
    }

    /// Checks a close button press. Nothing changes yet; the reason modal comes next.
    pub async fn authorize_close(
        &self,
        channel_id: &str,
        actor: &Actor,
        settings: &TicketSettings,
    ) -> Result<TicketRecord, TicketError> {
        Self::authorize(actor, settings, "close/delete")?;
        let record = self.lookup(channel_id).await.ok_or(TicketError::NotATicket)?;
        if record.closing {
            return Err(TicketError::NoOp("Ticket is already being closed.".to_string()));
        }
        Ok(record)
    }

    /// Accepts a close and moves the ticket into the closing state. Must run
    /// before the interaction is acknowledged.
    pub async fn begin_close(
        &self,
        channel_id: &str,
        actor: &Actor,
        settings: &TicketSettings,
    ) -> Result<TicketRecord, TicketError> {
        Self::authorize(actor, settings, "close/delete")?;
        self.registry.lock().await.mutate(channel_id, |ticket| {
            if ticket.closing {
                return Err(TicketError::NoOp("Ticket is already being closed.".to_string()));
            }
            ticket.closing = true;
            Ok(ticket.clone())
        })
    }

    /// Runs the close after acknowledgement. Only a missing ticket is an
    /// error; every side effect is best-effort and reported.
    pub async fn close(
        &self,
        request: &CloseRequest,
        settings: &TicketSettings,
    ) -> Result<CloseReport, TicketError> {
        let channel_id = request.channel_id.as_str();
        let record = self.lookup(channel_id).await.ok_or(TicketError::NotATicket)?;

        let (transcript, transcript_url) =
            match (request.with_transcript, &settings.transcripts_channel_id) {
                (true, Some(destination)) => {
                    self.deliver_transcript(channel_id, &record, destination).await
                }
                (true, None) => {
                    info!(
                        "Transcript requested for ticket #{} but no transcripts channel is set",
                        record.ticket_number
                    );
                    (StepStatus::Skipped, None)
                }
                (false, _) => (StepStatus::Skipped, None),
            };

        let summary = ClosureSummary {
            ticket_number: record.ticket_number,
            guild_id: record.guild_id.clone(),
            opener_id: record.opener_id.clone(),
            closed_by: request.actor.user_id.clone(),
            claimed_by: record.claimed_by.clone(),
            opened_at: record.opened_at,
            reason: request
                .reason
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
            transcript_url: transcript_url.clone(),
        };
        let opener_notified = self.notifier.emit(&LifecycleEvent::Closed(summary)).await;

        let announced = self
            .notifier
            .emit(&LifecycleEvent::Closing {
                channel_id: channel_id.to_string(),
                actor_id: request.actor.user_id.clone(),
            })
            .await;

        self.registry.lock().await.remove(channel_id);

        let deleted = self.platform.delete_channel(channel_id).await;
        let teardown = StepStatus::logged("channel teardown", channel_id, deleted);

        info!(
            "Ticket #{} closed by {} (transcript: {:?}, opener notified: {:?}, teardown: {:?})",
            record.ticket_number, request.actor.user_id, transcript, opener_notified, teardown
        );

        Ok(CloseReport {
            ticket_number: record.ticket_number,
            transcript,
            transcript_url,
            opener_notified,
            announced,
            teardown,
        })
    }

    async fn deliver_transcript(
        &self,
        channel_id: &str,
        record: &TicketRecord,
        destination: &str,
    ) -> (StepStatus, Option<String>) {
        let messages = transcript::capture_history(self.platform.as_ref(), channel_id).await;

        let guild_name = match self.platform.guild(&record.guild_id).await {
            Ok(guild) => guild.name,
            Err(_) => "Support".to_string(),
        };
        let title = format!("{} • {}", guild_name, record.channel_name);
        let file = FileUpload::html(
            transcript::transcript_filename(&record.channel_name),
            self.renderer.render(&title, &messages),
        );
        let message = ui::transcript_upload_message(channel_id, &record.opener_id);

        match self.platform.send_file(destination, &message, &file).await {
            Ok(sent) => {
                let url = sent.attachments.first().map(|a| a.url.clone());
                info!(
                    "Transcript of ticket #{} ({} messages) delivered to {}",
                    record.ticket_number,
                    messages.len(),
                    destination
                );
                (StepStatus::Done, url)
            }
            Err(e) => {
                warn!(
                    "Transcript delivery for ticket #{} failed: {}",
                    record.ticket_number, e
                );
                (StepStatus::Failed(e.to_string()), None)
            }
        }
    }
}
