// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Blog posts

use crate::codec::{conflict_on_unique, json, like_pattern, new_id, text_enum, to_json, Filter};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use folio_api_contract::{DailyCount, Post, PostFilter, PostInput, PostStatus};
use rusqlite::{params, Connection, OptionalExtension, Row};

const POST_SELECT: &str = "SELECT p.id, p.title, p.slug, p.content, p.excerpt, p.cover_image, \
     p.category, p.read_time, p.status, p.tags, p.views, p.author_id, u.name, p.created_at, \
     p.updated_at FROM posts p LEFT JOIN users u ON u.id = p.author_id";

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        content: row.get(3)?,
        excerpt: row.get(4)?,
        cover_image: row.get(5)?,
        category: row.get(6)?,
        read_time: row.get(7)?,
        status: text_enum(row, 8)?,
        tags: json(row, 9)?,
        views: row.get(10)?,
        author_id: row.get(11)?,
        author_name: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

pub struct PostStore<'a> {
    conn: &'a Connection,
}

impl<'a> PostStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn query(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Post>> {
        let mut stmt = self.conn.prepare(sql)?;
        let posts = stmt
            .query_map(params, post_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(posts)
    }

    /// Insert a post; `slug` must already be resolved
    pub fn create(&self, input: &PostInput, slug: &str, author_id: Option<&str>) -> Result<Post> {
        let id = new_id();
        let now = Utc::now();
        self.conn
            .execute(
                "INSERT INTO posts (id, title, slug, content, excerpt, cover_image, category,
                     read_time, status, tags, views, author_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11, ?12, ?12)",
                params![
                    id,
                    input.title,
                    slug,
                    input.content,
                    input.excerpt,
                    input.cover_image,
                    input.category,
                    input.read_time,
                    input.status.as_str(),
                    to_json(&input.tags)?,
                    author_id,
                    now,
                ],
            )
            .map_err(|e| conflict_on_unique(e, || format!("slug {slug} is already in use")))?;
        self.get(&id)
    }

    /// Re-insert a post from a snapshot; unknown authors are dropped
    pub fn restore(&self, post: &Post) -> Result<()> {
        self.conn.execute(
            "INSERT INTO posts (id, title, slug, content, excerpt, cover_image, category,
                 read_time, status, tags, views, author_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                 (SELECT id FROM users WHERE id = ?12), ?13, ?14)",
            params![
                post.id,
                post.title,
                post.slug,
                post.content,
                post.excerpt,
                post.cover_image,
                post.category,
                post.read_time,
                post.status.as_str(),
                to_json(&post.tags)?,
                post.views,
                post.author_id,
                post.created_at,
                post.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Post> {
        self.conn
            .query_row(&format!("{POST_SELECT} WHERE p.id = ?1"), params![id], post_from_row)
            .optional()?
            .ok_or_else(|| Error::not_found("post", id))
    }

    pub fn find_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        Ok(self
            .conn
            .query_row(
                &format!("{POST_SELECT} WHERE p.slug = ?1"),
                params![slug],
                post_from_row,
            )
            .optional()?)
    }

    /// Whether `slug` is taken by a post other than `except_id`
    pub fn slug_taken(&self, slug: &str, except_id: Option<&str>) -> Result<bool> {
        Ok(self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM posts WHERE slug = ?1 AND id IS NOT ?2)",
            params![slug, except_id],
            |row| row.get(0),
        )?)
    }

    /// Newest first
    pub fn list(&self, filter: &PostFilter, limit: Option<u32>) -> Result<Vec<Post>> {
        let mut where_ = Filter::default();
        if let Some(status) = filter.status {
            where_.push("p.status = ?", status.as_str());
        }
        if let Some(category) = filter.category.clone() {
            where_.push("p.category = ?", category);
        }
        if let Some(tag) = filter.tag.clone() {
            where_.push("EXISTS (SELECT 1 FROM json_each(p.tags) WHERE json_each.value = ?)", tag);
        }
        if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            where_.push_repeated(
                "(p.title LIKE {} ESCAPE '\\' OR p.content LIKE {} ESCAPE '\\')",
                like_pattern(q),
            );
        }
        let where_sql = where_.where_sql();
        let limit_sql = where_.limit_sql(limit);
        let sql = format!(
            "{POST_SELECT}{where_sql} ORDER BY p.created_at DESC, p.rowid DESC{limit_sql}"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let posts = stmt
            .query_map(where_.params(), post_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(posts)
    }

    pub fn all(&self) -> Result<Vec<Post>> {
        self.list(&PostFilter::default(), None)
    }

    pub fn search(&self, term: &str, limit: u32) -> Result<Vec<Post>> {
        self.list(
            &PostFilter {
                q: Some(term.to_string()),
                ..Default::default()
            },
            Some(limit),
        )
    }

    pub fn update(&self, id: &str, input: &PostInput, slug: &str) -> Result<Post> {
        let changed = self
            .conn
            .execute(
                "UPDATE posts SET title = ?2, slug = ?3, content = ?4, excerpt = ?5,
                     cover_image = ?6, category = ?7, read_time = ?8, status = ?9, tags = ?10,
                     updated_at = ?11
                 WHERE id = ?1",
                params![
                    id,
                    input.title,
                    slug,
                    input.content,
                    input.excerpt,
                    input.cover_image,
                    input.category,
                    input.read_time,
                    input.status.as_str(),
                    to_json(&input.tags)?,
                    Utc::now(),
                ],
            )
            .map_err(|e| conflict_on_unique(e, || format!("slug {slug} is already in use")))?;
        if changed == 0 {
            return Err(Error::not_found("post", id));
        }
        self.get(id)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM posts WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(Error::not_found("post", id));
        }
        Ok(())
    }

    pub fn delete_all(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM posts", [])?)
    }

    pub fn increment_views(&self, id: &str) -> Result<()> {
        self.conn
            .execute("UPDATE posts SET views = views + 1 WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn count(&self) -> Result<u64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?)
    }

    pub fn count_by_status(&self, status: PostStatus) -> Result<u64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?)
    }

    pub fn count_created_since(&self, since: DateTime<Utc>) -> Result<u64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE created_at >= ?1",
            params![since],
            |row| row.get(0),
        )?)
    }

    pub fn total_views(&self) -> Result<u64> {
        Ok(self
            .conn
            .query_row("SELECT COALESCE(SUM(views), 0) FROM posts", [], |row| row.get(0))?)
    }

    /// Sum of views of posts created in `[since, until)`
    pub fn views_of_posts_created_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<u64> {
        Ok(self.conn.query_row(
            "SELECT COALESCE(SUM(views), 0) FROM posts WHERE created_at >= ?1 AND created_at < ?2",
            params![since, until],
            |row| row.get(0),
        )?)
    }

    /// Views summed per creation day for posts created since `since`
    pub fn daily_views_since(&self, since: DateTime<Utc>) -> Result<Vec<DailyCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT substr(created_at, 1, 10) AS day, COALESCE(SUM(views), 0) FROM posts
             WHERE created_at >= ?1 GROUP BY day ORDER BY day",
        )?;
        let rows = stmt
            .query_map(params![since], |row| {
                Ok(DailyCount {
                    date: row.get(0)?,
                    views: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Most viewed first
    pub fn popular(&self, limit: u32) -> Result<Vec<Post>> {
        self.query(
            &format!("{POST_SELECT} ORDER BY p.views DESC, p.created_at DESC LIMIT ?1"),
            params![limit],
        )
    }

    pub fn recent(&self, limit: u32) -> Result<Vec<Post>> {
        self.list(&PostFilter::default(), Some(limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    fn input(title: &str, status: PostStatus, tags: &[&str]) -> PostInput {
        PostInput {
            title: title.into(),
            content: format!("{title} body"),
            status,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn slug_collision_is_a_conflict() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let posts = PostStore::new(conn);
            posts.create(&input("Hello", PostStatus::Draft, &[]), "hello", None)?;
            let err = posts
                .create(&input("Hello again", PostStatus::Draft, &[]), "hello", None)
                .unwrap_err();
            assert!(matches!(err, Error::Conflict(_)));
            assert!(posts.slug_taken("hello", None)?);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn list_filters_by_status_and_tag() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let posts = PostStore::new(conn);
            posts.create(&input("Rust", PostStatus::Published, &["rust", "axum"]), "rust", None)?;
            posts.create(&input("Draft", PostStatus::Draft, &["rust"]), "draft", None)?;
            posts.create(&input("Other", PostStatus::Published, &["design"]), "other", None)?;

            let published = posts.list(
                &PostFilter {
                    status: Some(PostStatus::Published),
                    ..Default::default()
                },
                None,
            )?;
            assert_eq!(published.len(), 2);

            let rust = posts.list(
                &PostFilter {
                    tag: Some("rust".into()),
                    ..Default::default()
                },
                None,
            )?;
            assert_eq!(rust.len(), 2);

            let found = posts.search("OTHER", 5)?;
            assert_eq!(found.len(), 1);
            assert_eq!(posts.count_by_status(PostStatus::Draft)?, 1);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn views_accumulate() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let posts = PostStore::new(conn);
            let post = posts.create(&input("Viewed", PostStatus::Published, &[]), "viewed", None)?;
            posts.increment_views(&post.id)?;
            posts.increment_views(&post.id)?;
            assert_eq!(posts.get(&post.id)?.views, 2);
            assert_eq!(posts.total_views()?, 2);
            assert_eq!(posts.popular(1)?[0].id, post.id);
            let daily = posts.daily_views_since(Utc::now() - chrono::Duration::days(1))?;
            assert_eq!(daily.len(), 1);
            assert_eq!(daily[0].views, 2);
            Ok(())
        })
        .unwrap();
    }
}
