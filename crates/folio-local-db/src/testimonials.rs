// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Client testimonials

use crate::codec::new_id;
use crate::{Error, Result};
use chrono::Utc;
use folio_api_contract::{Testimonial, TestimonialInput};
use rusqlite::{params, Connection, OptionalExtension, Row};

const TESTIMONIAL_COLUMNS: &str = "id, name, position, company, image, rating, review, \
     project_type, date, author_id, created_at, updated_at";

fn testimonial_from_row(row: &Row<'_>) -> rusqlite::Result<Testimonial> {
    Ok(Testimonial {
        id: row.get(0)?,
        name: row.get(1)?,
        position: row.get(2)?,
        company: row.get(3)?,
        image: row.get(4)?,
        rating: row.get(5)?,
        review: row.get(6)?,
        project_type: row.get(7)?,
        date: row.get(8)?,
        author_id: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

pub struct TestimonialStore<'a> {
    conn: &'a Connection,
}

impl<'a> TestimonialStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn create(&self, input: &TestimonialInput, author_id: Option<&str>) -> Result<Testimonial> {
        let id = new_id();
        self.conn.execute(
            "INSERT INTO testimonials (id, name, position, company, image, rating, review,
                 project_type, date, author_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
            params![
                id,
                input.name,
                input.position,
                input.company,
                input.image,
                input.rating,
                input.review,
                input.project_type,
                input.date,
                author_id,
                Utc::now(),
            ],
        )?;
        self.get(&id)
    }

    pub fn restore(&self, t: &Testimonial) -> Result<()> {
        self.conn.execute(
            "INSERT INTO testimonials (id, name, position, company, image, rating, review,
                 project_type, date, author_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9,
                 (SELECT id FROM users WHERE id = ?10), ?11, ?12)",
            params![
                t.id,
                t.name,
                t.position,
                t.company,
                t.image,
                t.rating,
                t.review,
                t.project_type,
                t.date,
                t.author_id,
                t.created_at,
                t.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Testimonial> {
        self.conn
            .query_row(
                &format!("SELECT {TESTIMONIAL_COLUMNS} FROM testimonials WHERE id = ?1"),
                params![id],
                testimonial_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("testimonial", id))
    }

    /// Newest first
    pub fn list(&self) -> Result<Vec<Testimonial>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TESTIMONIAL_COLUMNS} FROM testimonials ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
            .query_map([], testimonial_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn update(&self, id: &str, input: &TestimonialInput) -> Result<Testimonial> {
        let changed = self.conn.execute(
            "UPDATE testimonials SET name = ?2, position = ?3, company = ?4, image = ?5,
                 rating = ?6, review = ?7, project_type = ?8, date = ?9, updated_at = ?10
             WHERE id = ?1",
            params![
                id,
                input.name,
                input.position,
                input.company,
                input.image,
                input.rating,
                input.review,
                input.project_type,
                input.date,
                Utc::now(),
            ],
        )?;
        if changed == 0 {
            return Err(Error::not_found("testimonial", id));
        }
        self.get(id)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM testimonials WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(Error::not_found("testimonial", id));
        }
        Ok(())
    }

    pub fn delete_all(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM testimonials", [])?)
    }

    pub fn count(&self) -> Result<u64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM testimonials", [], |row| row.get(0))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[test]
    fn crud_round() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let store = TestimonialStore::new(conn);
            let mut input = TestimonialInput {
                name: "Michael Chen".into(),
                company: "TechStart".into(),
                rating: 4,
                review: "Great collaboration".into(),
                ..Default::default()
            };
            let created = store.create(&input, None)?;
            assert_eq!(created.rating, 4);

            input.rating = 5;
            let updated = store.update(&created.id, &input)?;
            assert_eq!(updated.rating, 5);
            assert_eq!(store.list()?.len(), 1);

            store.delete(&created.id)?;
            assert!(matches!(store.get(&created.id), Err(Error::NotFound { .. })));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn rating_out_of_range_is_rejected_by_schema() {
        let db = Database::open_in_memory().unwrap();
        let input = TestimonialInput {
            name: "X".into(),
            rating: 9,
            review: "r".into(),
            ..Default::default()
        };
        let result = db.with_conn(|conn| TestimonialStore::new(conn).create(&input, None));
        assert!(matches!(result, Err(Error::Sqlite(_))));
    }
}
