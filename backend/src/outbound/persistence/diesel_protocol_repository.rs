//! PostgreSQL-backed `ProtocolRepository`.
//!
//! The plan is stored as JSONB and re-validated against the stored duration
//! on every read.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{ProtocolRepository, RepositoryError};
use crate::domain::{
    Page, PageKey, PageRequest, Protocol, ProtocolContent, ProtocolId, UserId,
};

use super::diesel_helpers::{corrupt_row, day_from_db, day_to_db, fetch_limit, map_diesel_error, touched};
use super::json_serializers::{json_to_plan, plan_to_json};
use super::models::ProtocolRow;
use super::pool::DbPool;
use super::schema::protocols;

/// Diesel implementation of [`ProtocolRepository`].
#[derive(Clone)]
pub struct DieselProtocolRepository {
    pool: DbPool,
}

impl DieselProtocolRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn protocol_to_row(protocol: &Protocol) -> Result<ProtocolRow, RepositoryError> {
    Ok(ProtocolRow {
        id: *protocol.id.as_uuid(),
        doctor_id: *protocol.doctor_id.as_uuid(),
        title: protocol.content.title.clone(),
        description: protocol.content.description.clone(),
        duration_days: day_to_db(protocol.content.duration_days),
        plan: plan_to_json(&protocol.content.plan)?,
        created_at: protocol.created_at,
        updated_at: protocol.updated_at,
    })
}

fn row_to_protocol(row: ProtocolRow) -> Result<Protocol, RepositoryError> {
    let duration_days = day_from_db("protocol duration", row.duration_days)?;
    let plan = json_to_plan(row.plan, duration_days)?;
    if row.title.trim().is_empty() {
        return Err(corrupt_row("protocol title", "empty"));
    }
    Ok(Protocol {
        id: ProtocolId::from_uuid(row.id),
        doctor_id: UserId::from_uuid(row.doctor_id),
        content: ProtocolContent {
            title: row.title,
            description: row.description,
            duration_days,
            plan,
        },
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[async_trait]
impl ProtocolRepository for DieselProtocolRepository {
    async fn save(&self, protocol: &Protocol) -> Result<(), RepositoryError> {
        let row = protocol_to_row(protocol)?;
        let mut conn = self.pool.get().await?;
        diesel::insert_into(protocols::table)
            .values(&row)
            .on_conflict(protocols::id)
            .do_update()
            .set((
                protocols::title.eq(excluded(protocols::title)),
                protocols::description.eq(excluded(protocols::description)),
                protocols::duration_days.eq(excluded(protocols::duration_days)),
                protocols::plan.eq(excluded(protocols::plan)),
                protocols::updated_at.eq(excluded(protocols::updated_at)),
            ))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find(&self, id: ProtocolId) -> Result<Option<Protocol>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let row = protocols::table
            .filter(protocols::id.eq(id.as_uuid()))
            .select(ProtocolRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_protocol).transpose()
    }

    async fn delete(&self, id: ProtocolId) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await?;
        diesel::delete(protocols::table.filter(protocols::id.eq(id.as_uuid())))
            .execute(&mut conn)
            .await
            .map(touched)
            .map_err(map_diesel_error)
    }

    async fn list_for_doctor(
        &self,
        doctor_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Protocol>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let mut query = protocols::table
            .filter(protocols::doctor_id.eq(doctor_id.as_uuid()))
            .select(ProtocolRow::as_select())
            .order((protocols::created_at.desc(), protocols::id.desc()))
            .limit(fetch_limit(&page))
            .into_boxed();
        if let Some(after) = page.after {
            query = query.filter(
                protocols::created_at.lt(after.created_at).or(protocols::created_at
                    .eq(after.created_at)
                    .and(protocols::id.lt(after.id))),
            );
        }
        let rows = query.load(&mut conn).await.map_err(map_diesel_error)?;
        let items = rows
            .into_iter()
            .map(row_to_protocol)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::from_overfetch(items, &page, |protocol| {
            PageKey::new(protocol.created_at, *protocol.id.as_uuid())
        }))
    }
}
