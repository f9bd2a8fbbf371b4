// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Pricing plans

use crate::codec::{json, new_id, to_json};
use crate::{Error, Result};
use chrono::Utc;
use folio_api_contract::{PricingPlan, PricingPlanInput};
use rusqlite::{params, Connection, OptionalExtension, Row};

const PLAN_COLUMNS: &str = "id, name, price_cents, currency, duration, description, features, \
     delivery_time, revisions, sort_order, created_at, updated_at";

fn plan_from_row(row: &Row<'_>) -> rusqlite::Result<PricingPlan> {
    Ok(PricingPlan {
        id: row.get(0)?,
        name: row.get(1)?,
        price_cents: row.get(2)?,
        currency: row.get(3)?,
        duration: row.get(4)?,
        description: row.get(5)?,
        features: json(row, 6)?,
        delivery_time: row.get(7)?,
        revisions: row.get(8)?,
        sort_order: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

pub struct PricingStore<'a> {
    conn: &'a Connection,
}

impl<'a> PricingStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn create(&self, input: &PricingPlanInput) -> Result<PricingPlan> {
        let id = new_id();
        self.conn.execute(
            "INSERT INTO pricing_plans (id, name, price_cents, currency, duration, description,
                 features, delivery_time, revisions, sort_order, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
            params![
                id,
                input.name,
                input.price_cents,
                input.currency.to_ascii_uppercase(),
                input.duration,
                input.description,
                to_json(&input.features)?,
                input.delivery_time,
                input.revisions,
                input.sort_order,
                Utc::now(),
            ],
        )?;
        self.get(&id)
    }

    pub fn restore(&self, plan: &PricingPlan) -> Result<()> {
        self.conn.execute(
            "INSERT INTO pricing_plans (id, name, price_cents, currency, duration, description,
                 features, delivery_time, revisions, sort_order, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                plan.id,
                plan.name,
                plan.price_cents,
                plan.currency,
                plan.duration,
                plan.description,
                to_json(&plan.features)?,
                plan.delivery_time,
                plan.revisions,
                plan.sort_order,
                plan.created_at,
                plan.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<PricingPlan> {
        self.conn
            .query_row(
                &format!("SELECT {PLAN_COLUMNS} FROM pricing_plans WHERE id = ?1"),
                params![id],
                plan_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("pricing plan", id))
    }

    /// Ordered by `sort_order`, then creation time
    pub fn list(&self) -> Result<Vec<PricingPlan>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PLAN_COLUMNS} FROM pricing_plans ORDER BY sort_order, created_at, rowid"
        ))?;
        let rows = stmt
            .query_map([], plan_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn update(&self, id: &str, input: &PricingPlanInput) -> Result<PricingPlan> {
        let changed = self.conn.execute(
            "UPDATE pricing_plans SET name = ?2, price_cents = ?3, currency = ?4, duration = ?5,
                 description = ?6, features = ?7, delivery_time = ?8, revisions = ?9,
                 sort_order = ?10, updated_at = ?11
             WHERE id = ?1",
            params![
                id,
                input.name,
                input.price_cents,
                input.currency.to_ascii_uppercase(),
                input.duration,
                input.description,
                to_json(&input.features)?,
                input.delivery_time,
                input.revisions,
                input.sort_order,
                Utc::now(),
            ],
        )?;
        if changed == 0 {
            return Err(Error::not_found("pricing plan", id));
        }
        self.get(id)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM pricing_plans WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(Error::not_found("pricing plan", id));
        }
        Ok(())
    }

    pub fn delete_all(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM pricing_plans", [])?)
    }
}
