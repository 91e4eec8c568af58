use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use crate::channels::{ChannelId, UserId};
use crate::tickets::{TicketError, TicketRecord};

/// Open tickets keyed by channel, plus openers whose channel is still being
/// created.
///
/// Numbers start at 1 and are never handed out twice, whether or not the
/// creation they were allocated for succeeds.
#[derive(Debug)]
pub struct TicketRegistry {
    tickets: HashMap<ChannelId, TicketRecord>,
    pending_openers: HashSet<UserId>,
    next_number: u64,
}

impl Default for TicketRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TicketRegistry {
    pub fn new() -> Self {
        Self {
            tickets: HashMap::new(),
            pending_openers: HashSet::new(),
            next_number: 1,
        }
    }

    pub fn next_ticket_number(&mut self) -> u64 {
        let number = self.next_number;
        self.next_number += 1;
        number
    }

    pub fn lookup_by_channel(&self, channel_id: &str) -> Option<&TicketRecord> {
        self.tickets.get(channel_id)
    }

    pub fn lookup_by_opener(&self, opener_id: &str) -> Option<(&ChannelId, &TicketRecord)> {
        self.tickets.iter().find(|(_, t)| t.opener_id == opener_id)
    }

    pub fn reserve_opener(&mut self, opener_id: &str) -> Result<(), TicketError> {
        if let Some((channel_id, _)) = self.lookup_by_opener(opener_id) {
            return Err(TicketError::AlreadyHasTicket {
                channel_id: Some(channel_id.clone()),
            });
        }
        if !self.pending_openers.insert(opener_id.to_string()) {
            return Err(TicketError::AlreadyHasTicket { channel_id: None });
        }
        Ok(())
    }

    pub fn release_opener(&mut self, opener_id: &str) {
        self.pending_openers.remove(opener_id);
    }

    pub fn insert(&mut self, channel_id: ChannelId, record: TicketRecord) -> Result<(), TicketError> {
        if self.lookup_by_opener(&record.opener_id).is_some() {
            return Err(TicketError::DuplicateTicket {
                opener_id: record.opener_id,
            });
        }

        match self.tickets.entry(channel_id) {
            Entry::Occupied(_) => Err(TicketError::DuplicateTicket {
                opener_id: record.opener_id,
            }),
            Entry::Vacant(slot) => {
                self.pending_openers.remove(&record.opener_id);
                slot.insert(record);
                Ok(())
            }
        }
    }

    pub fn mutate<T>(
        &mut self,
        channel_id: &str,
        transition: impl FnOnce(&mut TicketRecord) -> Result<T, TicketError>,
    ) -> Result<T, TicketError> {
        let record = self
            .tickets
            .get_mut(channel_id)
            .ok_or(TicketError::NotATicket)?;
        transition(record)
    }

    pub fn remove(&mut self, channel_id: &str) -> Option<TicketRecord> {
        self.tickets.remove(channel_id)
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tickets::TicketCategory;

    fn record(opener: &str, number: u64) -> TicketRecord {
        TicketRecord::new(opener, "g1", TicketCategory::Support, number)
    }

    #[test]
    fn test_numbers_are_monotonic() {
        let mut registry = TicketRegistry::new();
        assert_eq!(registry.next_ticket_number(), 1);
        assert_eq!(registry.next_ticket_number(), 2);
        registry.insert("c3".to_string(), record("u1", 3)).unwrap();
        registry.remove("c3");
        assert_eq!(registry.next_ticket_number(), 3);
    }

    #[test]
    fn test_insert_rejects_second_ticket_for_opener() {
        let mut registry = TicketRegistry::new();
        registry.insert("c1".to_string(), record("u1", 1)).unwrap();

        let err = registry.insert("c2".to_string(), record("u1", 2)).unwrap_err();
        assert!(matches!(err, TicketError::DuplicateTicket { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reservation_blocks_concurrent_creation() {
        let mut registry = TicketRegistry::new();
        registry.reserve_opener("u1").unwrap();

        let err = registry.reserve_opener("u1").unwrap_err();
        assert!(matches!(err, TicketError::AlreadyHasTicket { channel_id: None }));

        registry.insert("c1".to_string(), record("u1", 1)).unwrap();
        let err = registry.reserve_opener("u1").unwrap_err();
        assert!(matches!(
            err,
            TicketError::AlreadyHasTicket { channel_id: Some(ref c) } if c == "c1"
        ));

        registry.remove("c1");
        registry.reserve_opener("u1").unwrap();
        registry.release_opener("u1");
        registry.reserve_opener("u1").unwrap();
    }

    #[test]
    fn test_mutate_missing_channel() {
        let mut registry = TicketRegistry::new();
        let err = registry.mutate("nope", |_| Ok(())).unwrap_err();
        assert!(matches!(err, TicketError::NotATicket));
    }

    #[test]
    fn test_mutate_applies_transition() {
        let mut registry = TicketRegistry::new();
        registry.insert("c1".to_string(), record("u1", 1)).unwrap();

        let locked = registry
            .mutate("c1", |t| {
                t.locked = true;
                Ok(t.locked)
            })
            .unwrap();
        assert!(locked);
        assert!(registry.lookup_by_channel("c1").unwrap().locked);
        assert_eq!(registry.lookup_by_opener("u1").unwrap().0, "c1");
    }
}
