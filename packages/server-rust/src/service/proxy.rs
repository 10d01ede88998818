//! Caller-side proxy for the page store.
//!
//! Turns typed method calls into action-tagged envelopes on the bus and
//! decodes the replies, so callers use [`PageStoreApi`] without knowing the
//! envelope format.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use wiki_core::{
    Action, CreatePagePayload, Envelope, FailureCode, Page, PageIdPayload, PageList, PageLookup,
    PageNamePayload, PageSummary, ReplyFailure, SavePagePayload,
};

use super::bus::BusClient;
use crate::traits::PageStoreApi;

/// [`PageStoreApi`] over the message bus.
#[derive(Clone)]
pub struct PageStoreProxy {
    client: BusClient,
    address: String,
}

impl PageStoreProxy {
    /// Proxy for the store bound at `address`.
    #[must_use]
    pub fn new(client: BusClient, address: impl Into<String>) -> Self {
        Self {
            client,
            address: address.into(),
        }
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    async fn send(&self, action: Action, body: Value) -> Result<Value, ReplyFailure> {
        let envelope = Envelope::new(self.address.clone(), body).with_action(action);
        self.client.request(envelope).await
    }

    async fn send_payload<P: Serialize>(
        &self,
        action: Action,
        payload: &P,
    ) -> Result<Value, ReplyFailure> {
        let body = serde_json::to_value(payload).map_err(|e| {
            ReplyFailure::new(
                FailureCode::InvalidPayload,
                format!("cannot encode {action} payload: {e}"),
            )
        })?;
        self.send(action, body).await
    }
}

fn decode_reply<T: DeserializeOwned>(action: Action, body: Value) -> Result<T, ReplyFailure> {
    serde_json::from_value(body).map_err(|e| {
        ReplyFailure::new(
            FailureCode::InvalidReply,
            format!("unexpected {action} reply: {e}"),
        )
    })
}

#[async_trait]
impl PageStoreApi for PageStoreProxy {
    async fn list_pages(&self) -> Result<Vec<PageSummary>, ReplyFailure> {
        let body = self.send(Action::ListPages, Value::Null).await?;
        let list: PageList = decode_reply(Action::ListPages, body)?;
        Ok(list.pages)
    }

    async fn get_page_by_id(&self, id: &str) -> Result<Option<Page>, ReplyFailure> {
        let payload = PageIdPayload { id: id.to_string() };
        let body = self.send_payload(Action::GetPageById, &payload).await?;
        let lookup: PageLookup = decode_reply(Action::GetPageById, body)?;
        Ok(lookup.into_page())
    }

    async fn get_page_by_name(&self, name: &str) -> Result<Option<Page>, ReplyFailure> {
        let payload = PageNamePayload {
            name: name.to_string(),
        };
        let body = self.send_payload(Action::GetPageByName, &payload).await?;
        let lookup: PageLookup = decode_reply(Action::GetPageByName, body)?;
        Ok(lookup.into_page())
    }

    async fn create_page(
        &self,
        id: &str,
        name: &str,
        creation_date: DateTime<Utc>,
    ) -> Result<(), ReplyFailure> {
        let payload = CreatePagePayload {
            id: id.to_string(),
            name: name.to_string(),
            creation_date,
        };
        self.send_payload(Action::CreatePage, &payload).await?;
        Ok(())
    }

    async fn save_page(
        &self,
        id: &str,
        content: &str,
        update_date: DateTime<Utc>,
    ) -> Result<(), ReplyFailure> {
        let payload = SavePagePayload {
            id: id.to_string(),
            content: content.to_string(),
            update_date,
        };
        self.send_payload(Action::SavePage, &payload).await?;
        Ok(())
    }

    async fn delete_page(&self, id: &str) -> Result<(), ReplyFailure> {
        let payload = PageIdPayload { id: id.to_string() };
        self.send_payload(Action::DeletePage, &payload).await?;
        Ok(())
    }
}
