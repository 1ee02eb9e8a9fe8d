use sqlx::PgPool;
use tracing::info;

use crate::auth::middleware::AuthUser;
use crate::notification::model::{NewNotification, Notification, NotificationType};
use crate::notification::service::{self as notifications, should_notify};
use crate::post::model::{FeedPost, LikeOutcome, Post, PostError, FEED_PAGE_SIZE};
use crate::realtime::EventBus;
use crate::uploads::StoredFile;

#[derive(Debug, Clone)]
pub struct PostService {
    pool: PgPool,
    bus: Option<EventBus>,
}

impl PostService {
    pub fn new(pool: PgPool, bus: Option<EventBus>) -> Self {
        Self { pool, bus }
    }

    pub async fn create(
        &self,
        user_id: i64,
        content: &str,
        media: Option<&StoredFile>,
    ) -> Result<Post, PostError> {
        let (media_type, media_url) = match media {
            Some(file) => (file.kind.as_str(), Some(file.relative_path.as_str())),
            None => ("none", None),
        };

        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO forge.posts (user_id, content, media_type, media_url)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(content)
        .bind(media_type)
        .bind(media_url)
        .fetch_one(&self.pool)
        .await?;

        info!("User {} created post {}", user_id, post.id);
        Ok(post)
    }

    /// Newest first; `liked_by_viewer` is false for anonymous viewers
    pub async fn feed(&self, viewer_id: Option<i64>, page: i64) -> Result<Vec<FeedPost>, PostError> {
        let offset = (page.max(1) - 1) * FEED_PAGE_SIZE;

        let posts = sqlx::query_as::<_, FeedPost>(
            r#"
            SELECT p.id, p.user_id, p.content, p.media_type, p.media_url,
                   p.likes_count, p.comments_count, p.created_at,
                   u.name AS author_name,
                   u.username AS author_username,
                   u.initials AS author_initials,
                   u.avatar_color AS author_avatar_color,
                   u.profile_picture AS author_profile_picture,
                   EXISTS(
                       SELECT 1 FROM forge.post_likes l
                       WHERE l.post_id = p.id AND l.user_id = $1
                   ) AS liked_by_viewer
            FROM forge.posts p
            JOIN forge.users u ON u.id = p.user_id
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(viewer_id)
        .bind(FEED_PAGE_SIZE)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    pub async fn find(&self, post_id: i64) -> Result<Post, PostError> {
        sqlx::query_as::<_, Post>("SELECT * FROM forge.posts WHERE id = $1")
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(PostError::NotFound)
    }

    /// Like if absent, unlike if present. The pair insert decides which, so two
    /// racing toggles can never both count as a like.
    pub async fn toggle_like(&self, user_id: i64, post_id: i64) -> Result<LikeOutcome, PostError> {
        let mut tx = self.pool.begin().await?;

        let owner_id: i64 =
            sqlx::query_scalar("SELECT user_id FROM forge.posts WHERE id = $1 FOR UPDATE")
                .bind(post_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(PostError::NotFound)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO forge.post_likes (post_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (post_id, user_id) DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        let mut notification: Option<Notification> = None;

        let likes_count: i64 = if inserted {
            let count = sqlx::query_scalar(
                "UPDATE forge.posts SET likes_count = likes_count + 1 WHERE id = $1 RETURNING likes_count",
            )
            .bind(post_id)
            .fetch_one(&mut *tx)
            .await?;

            if should_notify(user_id, owner_id) {
                let liker: String =
                    sqlx::query_scalar("SELECT name FROM forge.users WHERE id = $1")
                        .bind(user_id)
                        .fetch_one(&mut *tx)
                        .await?;
                let created = notifications::insert(
                    &mut *tx,
                    &NewNotification {
                        user_id: owner_id,
                        notification_type: NotificationType::Like,
                        title: "New like".to_string(),
                        message: format!("{} liked your post", liker),
                        related_id: Some(post_id),
                    },
                )
                .await?;
                notification = Some(created);
            }
            count
        } else {
            sqlx::query("DELETE FROM forge.post_likes WHERE post_id = $1 AND user_id = $2")
                .bind(post_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;

            sqlx::query_scalar(
                "UPDATE forge.posts SET likes_count = GREATEST(likes_count - 1, 0) WHERE id = $1 RETURNING likes_count",
            )
            .bind(post_id)
            .fetch_one(&mut *tx)
            .await?
        };

        tx.commit().await?;

        if let Some(notification) = &notification {
            notifications::publish(self.bus.as_ref(), notification).await;
        }

        info!(
            "User {} {} post {} ({} likes)",
            user_id,
            if inserted { "liked" } else { "unliked" },
            post_id,
            likes_count
        );
        Ok(LikeOutcome {
            liked: inserted,
            likes_count,
        })
    }

    /// Returns the stored media path so the caller can remove the file
    pub async fn delete(&self, user: &AuthUser, post_id: i64) -> Result<Option<String>, PostError> {
        let post = self.find(post_id).await?;
        if !user.can_modify(post.user_id) {
            return Err(PostError::Forbidden);
        }

        sqlx::query("DELETE FROM forge.posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        info!("User {} deleted post {}", user.user_id, post_id);
        Ok(post.media_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::Role;
    use crate::db::test_support::insert_user;

    #[sqlx::test(migrations = false)]
    #[ignore = "requires DATABASE_URL"]
    async fn test_double_like_nets_one_and_never_negative(pool: PgPool) {
        crate::db::init_db(&pool).await.unwrap();
        let author = insert_user(&pool, "author").await;
        let fan = insert_user(&pool, "fan").await;

        let service = PostService::new(pool.clone(), None);
        let post = service.create(author, "Sourdough day", None).await.unwrap();

        let first = service.toggle_like(fan, post.id).await.unwrap();
        assert_eq!(first, LikeOutcome { liked: true, likes_count: 1 });

        let second = service.toggle_like(fan, post.id).await.unwrap();
        assert_eq!(second, LikeOutcome { liked: false, likes_count: 0 });

        for _ in 0..5 {
            service.toggle_like(fan, post.id).await.unwrap();
        }
        let after = service.find(post.id).await.unwrap();
        assert_eq!(after.likes_count, 1);

        let notified: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM forge.notifications WHERE user_id = $1 AND type = 'like'",
        )
        .bind(author)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(notified >= 1);
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires DATABASE_URL"]
    async fn test_self_like_does_not_notify(pool: PgPool) {
        crate::db::init_db(&pool).await.unwrap();
        let author = insert_user(&pool, "solo").await;
        let service = PostService::new(pool.clone(), None);
        let post = service.create(author, "My pie", None).await.unwrap();

        service.toggle_like(author, post.id).await.unwrap();

        let notified: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM forge.notifications WHERE user_id = $1")
                .bind(author)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(notified, 0);

        let other = AuthUser {
            user_id: insert_user(&pool, "other").await,
            role: Role::User,
        };
        assert!(matches!(
            service.delete(&other, post.id).await,
            Err(PostError::Forbidden)
        ));
    }
}
