// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Portfolio projects

use crate::codec::{json, like_pattern, new_id, text_enum, to_json};
use crate::{Error, Result};
use chrono::Utc;
use folio_api_contract::{
    BulkAction, CategoryCount, CategoryViews, NamedValue, PortfolioInput, PortfolioItem,
    PortfolioStatus,
};
use rusqlite::types::ToSql;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const PORTFOLIO_SELECT: &str = "SELECT p.id, p.title, p.category, p.description, p.image, \
     p.client, p.date, p.services, p.budget, p.likes, p.views, p.status, p.link, p.author_id, \
     u.name, p.created_at, p.updated_at FROM portfolio p LEFT JOIN users u ON u.id = p.author_id";

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<PortfolioItem> {
    Ok(PortfolioItem {
        id: row.get(0)?,
        title: row.get(1)?,
        category: row.get(2)?,
        description: row.get(3)?,
        image: row.get(4)?,
        client: row.get(5)?,
        date: row.get(6)?,
        services: json(row, 7)?,
        budget: row.get(8)?,
        likes: row.get(9)?,
        views: row.get(10)?,
        status: text_enum(row, 11)?,
        link: row.get(12)?,
        author_id: row.get(13)?,
        author_name: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

/// `?1, ?2, …, ?n`
fn placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ")
}

pub struct PortfolioStore<'a> {
    conn: &'a Connection,
}

impl<'a> PortfolioStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn query(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<PortfolioItem>> {
        let mut stmt = self.conn.prepare(sql)?;
        let items = stmt
            .query_map(params, item_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    pub fn create(&self, input: &PortfolioInput, author_id: Option<&str>) -> Result<PortfolioItem> {
        let id = new_id();
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO portfolio (id, title, category, description, image, client, date,
                 services, budget, likes, views, status, link, author_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, 0, ?10, ?11, ?12, ?13, ?13)",
            params![
                id,
                input.title,
                input.category,
                input.description,
                input.image,
                input.client,
                input.date,
                to_json(&input.services)?,
                input.budget,
                input.status.as_str(),
                input.link,
                author_id,
                now,
            ],
        )?;
        self.get(&id)
    }

    pub fn restore(&self, item: &PortfolioItem) -> Result<()> {
        self.conn.execute(
            "INSERT INTO portfolio (id, title, category, description, image, client, date,
                 services, budget, likes, views, status, link, author_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                 (SELECT id FROM users WHERE id = ?14), ?15, ?16)",
            params![
                item.id,
                item.title,
                item.category,
                item.description,
                item.image,
                item.client,
                item.date,
                to_json(&item.services)?,
                item.budget,
                item.likes,
                item.views,
                item.status.as_str(),
                item.link,
                item.author_id,
                item.created_at,
                item.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<PortfolioItem> {
        self.conn
            .query_row(
                &format!("{PORTFOLIO_SELECT} WHERE p.id = ?1"),
                params![id],
                item_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("portfolio item", id))
    }

    /// Newest first, optionally restricted to one status
    pub fn list(&self, status: Option<PortfolioStatus>) -> Result<Vec<PortfolioItem>> {
        match status {
            Some(status) => self.query(
                &format!(
                    "{PORTFOLIO_SELECT} WHERE p.status = ?1 \
                     ORDER BY p.created_at DESC, p.rowid DESC"
                ),
                params![status.as_str()],
            ),
            None => self.query(
                &format!("{PORTFOLIO_SELECT} ORDER BY p.created_at DESC, p.rowid DESC"),
                [],
            ),
        }
    }

    pub fn recent(&self, limit: u32) -> Result<Vec<PortfolioItem>> {
        self.query(
            &format!("{PORTFOLIO_SELECT} ORDER BY p.created_at DESC, p.rowid DESC LIMIT ?1"),
            params![limit],
        )
    }

    /// Items with the given ids, newest first; unknown ids are skipped
    pub fn by_ids(&self, ids: &[String]) -> Result<Vec<PortfolioItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.query(
            &format!(
                "{PORTFOLIO_SELECT} WHERE p.id IN ({}) ORDER BY p.created_at DESC, p.rowid DESC",
                placeholders(ids.len())
            ),
            params_from_iter(ids.iter()),
        )
    }

    pub fn search(&self, term: &str, limit: u32) -> Result<Vec<PortfolioItem>> {
        self.query(
            &format!(
                "{PORTFOLIO_SELECT} WHERE p.title LIKE ?1 ESCAPE '\\' OR p.description LIKE ?1 ESCAPE '\\'
                 ORDER BY p.created_at DESC, p.rowid DESC LIMIT ?2"
            ),
            params![like_pattern(term), limit],
        )
    }

    pub fn update(&self, id: &str, input: &PortfolioInput) -> Result<PortfolioItem> {
        let changed = self.conn.execute(
            "UPDATE portfolio SET title = ?2, category = ?3, description = ?4, image = ?5,
                 client = ?6, date = ?7, services = ?8, budget = ?9, status = ?10, link = ?11,
                 updated_at = ?12
             WHERE id = ?1",
            params![
                id,
                input.title,
                input.category,
                input.description,
                input.image,
                input.client,
                input.date,
                to_json(&input.services)?,
                input.budget,
                input.status.as_str(),
                input.link,
                Utc::now(),
            ],
        )?;
        if changed == 0 {
            return Err(Error::not_found("portfolio item", id));
        }
        self.get(id)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM portfolio WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(Error::not_found("portfolio item", id));
        }
        Ok(())
    }

    pub fn delete_all(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM portfolio", [])?)
    }

    pub fn like(&self, id: &str) -> Result<PortfolioItem> {
        let changed = self
            .conn
            .execute("UPDATE portfolio SET likes = likes + 1 WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(Error::not_found("portfolio item", id));
        }
        self.get(id)
    }

    /// Apply a bulk action and return the number of rows touched
    pub fn bulk(&self, ids: &[String], action: BulkAction) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let list = placeholders(ids.len());
        let status_idx = ids.len() + 1;
        let changed = match action {
            BulkAction::Delete => self.conn.execute(
                &format!("DELETE FROM portfolio WHERE id IN ({list})"),
                params_from_iter(ids.iter()),
            )?,
            BulkAction::Publish | BulkAction::Archive => {
                let status = if action == BulkAction::Publish {
                    PortfolioStatus::Published
                } else {
                    PortfolioStatus::Archived
                };
                let status = status.as_str();
                let now = Utc::now();
                let mut values: Vec<&dyn ToSql> = ids.iter().map(|id| id as &dyn ToSql).collect();
                values.push(&status);
                values.push(&now);
                self.conn.execute(
                    &format!(
                        "UPDATE portfolio SET status = ?{status_idx}, updated_at = ?{}
                         WHERE id IN ({list})",
                        status_idx + 1
                    ),
                    params_from_iter(values.iter()),
                )?
            }
        };
        Ok(changed as u64)
    }

    pub fn count(&self) -> Result<u64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM portfolio", [], |row| row.get(0))?)
    }

    /// `(projects, views, likes)`
    pub fn totals(&self) -> Result<(u64, u64, u64)> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(views), 0), COALESCE(SUM(likes), 0) FROM portfolio",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?)
    }

    /// Projects per category, most populated first
    pub fn category_counts(&self, limit: Option<u32>) -> Result<Vec<CategoryCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT category, COUNT(*) AS n FROM portfolio GROUP BY category
             ORDER BY n DESC, category LIMIT ?1",
        )?;
        let limit = limit.map(i64::from).unwrap_or(-1);
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(CategoryCount {
                    category: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Distinct categories in first-seen order
    pub fn categories(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT category FROM portfolio GROUP BY category ORDER BY MIN(rowid)")?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn views_by_category(&self) -> Result<Vec<CategoryViews>> {
        let mut stmt = self.conn.prepare(
            "SELECT category, COALESCE(SUM(views), 0) AS v FROM portfolio GROUP BY category
             ORDER BY v DESC, category",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(CategoryViews {
                    name: row.get(0)?,
                    views: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn count_by_status(&self) -> Result<Vec<NamedValue>> {
        let mut stmt = self.conn.prepare(
            "SELECT status, COUNT(*) FROM portfolio GROUP BY status ORDER BY status",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(NamedValue {
                    name: row.get(0)?,
                    value: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    fn input(title: &str, category: &str) -> PortfolioInput {
        PortfolioInput {
            title: title.into(),
            category: category.into(),
            description: format!("{title} description"),
            image: "https://cdn.example.com/img.png".into(),
            services: vec!["Design".into(), "Build".into()],
            ..Default::default()
        }
    }

    #[test]
    fn stats_and_categories() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let store = PortfolioStore::new(conn);
            let a = store.create(&input("A", "Branding"), None)?;
            store.create(&input("B", "Web Development"), None)?;
            store.create(&input("C", "Web Development"), None)?;
            store.like(&a.id)?;

            let (projects, views, likes) = store.totals()?;
            assert_eq!((projects, views, likes), (3, 0, 1));

            let top = store.category_counts(Some(1))?;
            assert_eq!(top[0].category, "Web Development");
            assert_eq!(top[0].count, 2);
            assert_eq!(store.categories()?, vec!["Branding", "Web Development"]);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn bulk_archive_and_delete() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let store = PortfolioStore::new(conn);
            let a = store.create(&input("A", "Other"), None)?;
            let b = store.create(&input("B", "Other"), None)?;
            let ids = vec![a.id.clone(), b.id.clone(), "missing".to_string()];

            assert_eq!(store.bulk(&ids, BulkAction::Archive)?, 2);
            assert_eq!(store.get(&a.id)?.status, PortfolioStatus::Archived);
            assert_eq!(store.list(Some(PortfolioStatus::Archived))?.len(), 2);

            assert_eq!(store.bulk(&ids[..1], BulkAction::Delete)?, 1);
            assert_eq!(store.count()?, 1);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn by_ids_keeps_services() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let store = PortfolioStore::new(conn);
            let a = store.create(&input("A", "Other"), None)?;
            let items = store.by_ids(&[a.id.clone()])?;
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].services, vec!["Design", "Build"]);
            Ok(())
        })
        .unwrap();
    }
}
