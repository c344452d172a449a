//! Testimonials, e-books, newsletter and contact messages.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use joestar_core::{ContactMessageId, EbookId, Email, SubscriberId, TestimonialId, UserId};

use super::PgStore;
use crate::db::{
    ContactStore, EbookStore, NewsletterStore, RepositoryError, TestimonialStore,
};
use crate::models::{
    ContactMessage, Ebook, NewContactMessage, NewTestimonial, NewsletterSubscriber,
    SubscribeOutcome, Testimonial,
};

const TESTIMONIAL_COLUMNS: &str =
    "id, user_id, name, location, rating, text, product, verified, created_at";
const EBOOK_COLUMNS: &str = "id, title, description, pages, language, download_url, preview_url, \
     thumbnail, category, tags, downloads, featured, created_at";
const SUBSCRIBER_COLUMNS: &str = "id, email, name, active, subscribed_at, unsubscribed_at";

#[derive(sqlx::FromRow)]
struct TestimonialRow {
    id: TestimonialId,
    user_id: Option<UserId>,
    name: String,
    location: String,
    rating: i16,
    text: String,
    product: String,
    verified: bool,
    created_at: DateTime<Utc>,
}

impl From<TestimonialRow> for Testimonial {
    fn from(row: TestimonialRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            location: row.location,
            rating: row.rating,
            text: row.text,
            product: row.product,
            verified: row.verified,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct EbookRow {
    id: EbookId,
    title: String,
    description: String,
    pages: Option<i32>,
    language: String,
    download_url: Option<String>,
    preview_url: Option<String>,
    thumbnail: Option<String>,
    category: Option<String>,
    tags: Vec<String>,
    downloads: i32,
    featured: bool,
    created_at: DateTime<Utc>,
}

impl From<EbookRow> for Ebook {
    fn from(row: EbookRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            pages: row.pages,
            language: row.language,
            download_url: row.download_url,
            preview_url: row.preview_url,
            thumbnail: row.thumbnail,
            category: row.category,
            tags: row.tags,
            downloads: row.downloads,
            featured: row.featured,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SubscriberRow {
    id: SubscriberId,
    email: Email,
    name: Option<String>,
    active: bool,
    subscribed_at: DateTime<Utc>,
    unsubscribed_at: Option<DateTime<Utc>>,
}

impl From<SubscriberRow> for NewsletterSubscriber {
    fn from(row: SubscriberRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            name: row.name,
            active: row.active,
            subscribed_at: row.subscribed_at,
            unsubscribed_at: row.unsubscribed_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ContactRow {
    id: ContactMessageId,
    name: String,
    email: Email,
    subject: String,
    message: String,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl TestimonialStore for PgStore {
    async fn list_testimonials(&self) -> Result<Vec<Testimonial>, RepositoryError> {
        let rows: Vec<TestimonialRow> = sqlx::query_as(&format!(
            "SELECT {TESTIMONIAL_COLUMNS} FROM shop.testimonials ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Testimonial::from).collect())
    }

    async fn create_testimonial(
        &self,
        testimonial: NewTestimonial,
    ) -> Result<Testimonial, RepositoryError> {
        let row: TestimonialRow = sqlx::query_as(&format!(
            r"
            INSERT INTO shop.testimonials (user_id, name, location, rating, text, product, verified)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {TESTIMONIAL_COLUMNS}
            "
        ))
        .bind(testimonial.user_id)
        .bind(&testimonial.name)
        .bind(&testimonial.location)
        .bind(testimonial.rating)
        .bind(&testimonial.text)
        .bind(&testimonial.product)
        .bind(testimonial.verified)
        .fetch_one(self.pool())
        .await?;

        Ok(row.into())
    }

    async fn count_testimonials(&self) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM shop.testimonials")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl EbookStore for PgStore {
    async fn list_ebooks(
        &self,
        category: Option<&str>,
        featured: Option<bool>,
    ) -> Result<Vec<Ebook>, RepositoryError> {
        let rows: Vec<EbookRow> = sqlx::query_as(&format!(
            r"
            SELECT {EBOOK_COLUMNS}
            FROM shop.ebooks
            WHERE ($1::text IS NULL OR LOWER(category) = LOWER($1))
              AND ($2::boolean IS NULL OR featured = $2)
            ORDER BY created_at DESC, id
            "
        ))
        .bind(category)
        .bind(featured)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Ebook::from).collect())
    }

    async fn get_ebook(&self, id: &EbookId) -> Result<Option<Ebook>, RepositoryError> {
        let row: Option<EbookRow> = sqlx::query_as(&format!(
            "SELECT {EBOOK_COLUMNS} FROM shop.ebooks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Ebook::from))
    }

    async fn record_download(&self, id: &EbookId) -> Result<Option<Ebook>, RepositoryError> {
        let row: Option<EbookRow> = sqlx::query_as(&format!(
            r"
            UPDATE shop.ebooks
            SET downloads = downloads + 1
            WHERE id = $1
            RETURNING {EBOOK_COLUMNS}
            "
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Ebook::from))
    }

    async fn upsert_ebook(&self, ebook: &Ebook) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO shop.ebooks
                (id, title, description, pages, language, download_url, preview_url,
                 thumbnail, category, tags, featured, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                pages = EXCLUDED.pages,
                language = EXCLUDED.language,
                download_url = EXCLUDED.download_url,
                preview_url = EXCLUDED.preview_url,
                thumbnail = EXCLUDED.thumbnail,
                category = EXCLUDED.category,
                tags = EXCLUDED.tags,
                featured = EXCLUDED.featured
            ",
        )
        .bind(&ebook.id)
        .bind(&ebook.title)
        .bind(&ebook.description)
        .bind(ebook.pages)
        .bind(&ebook.language)
        .bind(&ebook.download_url)
        .bind(&ebook.preview_url)
        .bind(&ebook.thumbnail)
        .bind(&ebook.category)
        .bind(&ebook.tags)
        .bind(ebook.featured)
        .bind(ebook.created_at)
        .execute(self.pool())
        .await?;

        Ok(())
    }
}

#[async_trait]
impl NewsletterStore for PgStore {
    async fn subscribe(
        &self,
        email: &Email,
        name: Option<&str>,
    ) -> Result<SubscribeOutcome, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        let existing: Option<SubscriberRow> = sqlx::query_as(&format!(
            r"
            SELECT {SUBSCRIBER_COLUMNS}
            FROM shop.newsletter_subscribers
            WHERE email = $1
            FOR UPDATE
            "
        ))
        .bind(email)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match existing {
            Some(row) if row.active => SubscribeOutcome::AlreadyActive,
            Some(row) => {
                let updated: SubscriberRow = sqlx::query_as(&format!(
                    r"
                    UPDATE shop.newsletter_subscribers
                    SET active = TRUE,
                        unsubscribed_at = NULL,
                        subscribed_at = NOW(),
                        name = COALESCE($2, name)
                    WHERE id = $1
                    RETURNING {SUBSCRIBER_COLUMNS}
                    "
                ))
                .bind(row.id)
                .bind(name)
                .fetch_one(&mut *tx)
                .await?;
                SubscribeOutcome::Reactivated(updated.into())
            }
            None => {
                // ON CONFLICT covers a concurrent first subscription.
                let inserted: Option<SubscriberRow> = sqlx::query_as(&format!(
                    r"
                    INSERT INTO shop.newsletter_subscribers (email, name)
                    VALUES ($1, $2)
                    ON CONFLICT (email) DO NOTHING
                    RETURNING {SUBSCRIBER_COLUMNS}
                    "
                ))
                .bind(email)
                .bind(name)
                .fetch_optional(&mut *tx)
                .await?;
                inserted.map_or(SubscribeOutcome::AlreadyActive, |row| {
                    SubscribeOutcome::Created(row.into())
                })
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn unsubscribe(&self, email: &Email) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.newsletter_subscribers
            SET active = FALSE, unsubscribed_at = NOW()
            WHERE email = $1 AND active
            ",
        )
        .bind(email)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ContactStore for PgStore {
    async fn create_contact_message(
        &self,
        message: NewContactMessage,
    ) -> Result<ContactMessage, RepositoryError> {
        let row: ContactRow = sqlx::query_as(
            r"
            INSERT INTO shop.contact_messages (name, email, subject, message)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, subject, message, created_at
            ",
        )
        .bind(&message.name)
        .bind(&message.email)
        .bind(&message.subject)
        .bind(&message.message)
        .fetch_one(self.pool())
        .await?;

        Ok(ContactMessage {
            id: row.id,
            name: row.name,
            email: row.email,
            subject: row.subject,
            message: row.message,
            created_at: row.created_at,
        })
    }
}
