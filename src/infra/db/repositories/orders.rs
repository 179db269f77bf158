use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        entities::orders::OrderEntity,
        repositories::orders::OrderRepository,
        value_objects::{
            enums::{
                order_statuses::{OrderStatus, OrderTimestamp},
                payment_statuses::PaymentStatus,
            },
            orders::PaidOrderUpdate,
        },
    },
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::orders},
};

pub struct OrderPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl OrderPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl OrderRepository for OrderPostgres {
    async fn find_by_order_number(
        &self,
        tenant_id: Uuid,
        order_number: &str,
    ) -> Result<Option<OrderEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let order = orders::table
            .filter(orders::tenant_id.eq(tenant_id))
            .filter(orders::order_number.eq(order_number))
            .select(OrderEntity::as_select())
            .first::<OrderEntity>(&mut conn)
            .optional()?;

        Ok(order)
    }

    async fn find_by_id(&self, tenant_id: Uuid, order_id: Uuid) -> Result<Option<OrderEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let order = orders::table
            .filter(orders::tenant_id.eq(tenant_id))
            .filter(orders::id.eq(order_id))
            .select(OrderEntity::as_select())
            .first::<OrderEntity>(&mut conn)
            .optional()?;

        Ok(order)
    }

    async fn mark_paid(
        &self,
        tenant_id: Uuid,
        order_id: Uuid,
        update: PaidOrderUpdate,
    ) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = diesel::update(orders::table)
            .filter(orders::id.eq(order_id))
            .filter(orders::tenant_id.eq(tenant_id))
            .filter(orders::status.eq(OrderStatus::Pending.as_str()))
            .filter(orders::paid_at.is_null())
            .set((
                orders::status.eq(OrderStatus::Paid.as_str()),
                orders::payment_status.eq(PaymentStatus::Paid.as_str()),
                orders::paid_at.eq(Some(update.paid_at)),
                orders::payment_info.eq(Some(update.payment_info)),
                orders::updated_at.eq(update.paid_at),
            ))
            .execute(&mut conn)?;

        Ok(updated == 1)
    }

    async fn record_payment_failure(
        &self,
        tenant_id: Uuid,
        order_id: Uuid,
        payment_info: serde_json::Value,
    ) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = diesel::update(orders::table)
            .filter(orders::id.eq(order_id))
            .filter(orders::tenant_id.eq(tenant_id))
            .filter(orders::status.eq(OrderStatus::Pending.as_str()))
            .filter(orders::paid_at.is_null())
            .set((
                orders::payment_status.eq(PaymentStatus::Failed.as_str()),
                orders::payment_info.eq(Some(payment_info)),
                orders::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(updated == 1)
    }

    async fn transition_status(
        &self,
        tenant_id: Uuid,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let guarded = diesel::update(orders::table)
            .filter(orders::id.eq(order_id))
            .filter(orders::tenant_id.eq(tenant_id))
            .filter(orders::status.eq(from.as_str()));

        let updated = match to.stamped_timestamp() {
            Some(OrderTimestamp::PaidAt) => guarded
                .filter(orders::paid_at.is_null())
                .set((
                    orders::status.eq(to.as_str()),
                    orders::payment_status.eq(PaymentStatus::Paid.as_str()),
                    orders::paid_at.eq(Some(at)),
                    orders::updated_at.eq(at),
                ))
                .execute(&mut conn)?,
            Some(OrderTimestamp::ShippedAt) => guarded
                .filter(orders::shipped_at.is_null())
                .set((
                    orders::status.eq(to.as_str()),
                    orders::shipped_at.eq(Some(at)),
                    orders::updated_at.eq(at),
                ))
                .execute(&mut conn)?,
            Some(OrderTimestamp::CompletedAt) => guarded
                .filter(orders::completed_at.is_null())
                .set((
                    orders::status.eq(to.as_str()),
                    orders::completed_at.eq(Some(at)),
                    orders::updated_at.eq(at),
                ))
                .execute(&mut conn)?,
            Some(OrderTimestamp::CancelledAt) => guarded
                .filter(orders::cancelled_at.is_null())
                .set((
                    orders::status.eq(to.as_str()),
                    orders::cancelled_at.eq(Some(at)),
                    orders::updated_at.eq(at),
                ))
                .execute(&mut conn)?,
            None => guarded
                .set((orders::status.eq(to.as_str()), orders::updated_at.eq(at)))
                .execute(&mut conn)?,
        };

        Ok(updated == 1)
    }
}
