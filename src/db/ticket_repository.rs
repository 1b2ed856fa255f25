use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use support_core::models::{SupportTicket, TICKET_NUMBER_PREFIX};
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::AppError;
use crate::models::TicketRecord;

const FIRST_TICKET_NUMBER: u64 = 1001;

#[derive(Clone)]
pub struct TicketRepository {
    tickets: Arc<RwLock<HashMap<String, TicketRecord>>>,
    counter: Arc<AtomicU64>,
}

impl Default for TicketRepository {
    fn default() -> Self {
        Self {
            tickets: Arc::default(),
            counter: Arc::new(AtomicU64::new(FIRST_TICKET_NUMBER)),
        }
    }
}

impl TicketRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// `TKT-1001`, `TKT-1002`, ...
    pub fn next_ticket_number(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{TICKET_NUMBER_PREFIX}{n}")
    }

    pub async fn find_by_number(&self, ticket_number: &str) -> Option<TicketRecord> {
        self.tickets.read().await.get(ticket_number).cloned()
    }

    pub async fn save(&self, record: &TicketRecord) -> SupportTicket {
        debug!("Saving ticket {}", record.ticket.ticket_number);
        self.tickets
            .write()
            .await
            .insert(record.ticket.ticket_number.clone(), record.clone());
        record.ticket.clone()
    }

    pub async fn update<F>(&self, ticket_number: &str, change: F) -> Result<SupportTicket, AppError>
    where
        F: FnOnce(&mut SupportTicket) -> Result<(), AppError>,
    {
        let mut tickets = self.tickets.write().await;
        let record = tickets
            .get_mut(ticket_number)
            .ok_or_else(|| AppError::TicketNotFound {
                ticket_number: ticket_number.to_string(),
            })?;
        change(&mut record.ticket)?;
        Ok(record.ticket.clone())
    }
}
