use sqlx::{PgConnection, PgPool};
use tracing::info;

use crate::auth::middleware::AuthUser;
use crate::recipe::model::{
    stored_image, Ingredient, Recipe, RecipeCard, RecipeDetail, RecipeError, ValidRecipe,
};
use crate::recipe::query::{Pagination, RecipeFilter};

/// One page of the listing plus what the empty state needs to know
#[derive(Debug, Clone)]
pub struct RecipePage {
    pub recipes: Vec<RecipeCard>,
    pub pagination: Pagination,
    pub filters_active: bool,
}

#[derive(Debug, Clone)]
pub struct RecipeService {
    pool: PgPool,
}

impl RecipeService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Count first so an out-of-range page clamps to the last real one
    pub async fn list(
        &self,
        filter: &RecipeFilter,
        requested_page: i64,
    ) -> Result<RecipePage, RecipeError> {
        let total: i64 = filter
            .count_query()
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let pagination = Pagination::new(requested_page, total);

        let recipes = if total == 0 {
            Vec::new()
        } else {
            filter
                .page_query(&pagination)
                .build_query_as::<RecipeCard>()
                .fetch_all(&self.pool)
                .await?
        };

        Ok(RecipePage {
            recipes,
            pagination,
            filters_active: filter.is_active(),
        })
    }

    pub async fn find(&self, recipe_id: i64) -> Result<Recipe, RecipeError> {
        sqlx::query_as::<_, Recipe>("SELECT * FROM forge.recipes WHERE id = $1")
            .bind(recipe_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RecipeError::NotFound)
    }

    pub async fn get(&self, recipe_id: i64) -> Result<RecipeDetail, RecipeError> {
        let recipe = self.find(recipe_id).await?;

        let creator_name: String =
            sqlx::query_scalar("SELECT name FROM forge.users WHERE id = $1")
                .bind(recipe.created_by)
                .fetch_one(&self.pool)
                .await?;

        let ingredients = sqlx::query_as::<_, Ingredient>(
            "SELECT ingredient_name, quantity FROM forge.ingredients WHERE recipe_id = $1 ORDER BY id",
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(RecipeDetail {
            recipe,
            creator_name,
            ingredients,
        })
    }

    pub async fn create(&self, user: &AuthUser, recipe: &ValidRecipe) -> Result<Recipe, RecipeError> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Recipe>(
            r#"
            INSERT INTO forge.recipes
                (title, instructions, image_url, video_url, cooking_time, servings, difficulty, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&recipe.title)
        .bind(&recipe.instructions)
        .bind(&recipe.image_url)
        .bind(&recipe.video_url)
        .bind(&recipe.cooking_time)
        .bind(&recipe.servings)
        .bind(recipe.difficulty.as_str())
        .bind(user.user_id)
        .fetch_one(&mut *tx)
        .await?;

        insert_ingredients(&mut *tx, created.id, &recipe.ingredients).await?;
        tx.commit().await?;

        info!("User {} created recipe {}", user.user_id, created.id);
        Ok(created)
    }

    /// Ingredients are replaced wholesale in the same transaction as the row.
    /// Also returns the uploaded image the edit left unreferenced, if any.
    pub async fn update(
        &self,
        user: &AuthUser,
        recipe_id: i64,
        recipe: &ValidRecipe,
    ) -> Result<(Recipe, Option<String>), RecipeError> {
        let existing = self.find(recipe_id).await?;
        if !user.can_modify(existing.created_by) {
            return Err(RecipeError::Forbidden);
        }

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Recipe>(
            r#"
            UPDATE forge.recipes
            SET title = $1, instructions = $2, image_url = $3, video_url = $4,
                cooking_time = $5, servings = $6, difficulty = $7
            WHERE id = $8
            RETURNING *
            "#,
        )
        .bind(&recipe.title)
        .bind(&recipe.instructions)
        .bind(&recipe.image_url)
        .bind(&recipe.video_url)
        .bind(&recipe.cooking_time)
        .bind(&recipe.servings)
        .bind(recipe.difficulty.as_str())
        .bind(recipe_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RecipeError::NotFound)?;

        sqlx::query("DELETE FROM forge.ingredients WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(&mut *tx)
            .await?;
        insert_ingredients(&mut *tx, recipe_id, &recipe.ingredients).await?;

        tx.commit().await?;

        info!("User {} updated recipe {}", user.user_id, recipe_id);

        let replaced = stored_image(existing.image_url.as_deref())
            .filter(|old| Some(*old) != updated.image_url.as_deref());
        let orphaned = self.orphaned(replaced).await?;
        Ok((updated, orphaned))
    }

    /// Returns the uploaded image nothing else points at any more
    pub async fn delete(&self, user: &AuthUser, recipe_id: i64) -> Result<Option<String>, RecipeError> {
        let existing = self.find(recipe_id).await?;
        if !user.can_modify(existing.created_by) {
            return Err(RecipeError::Forbidden);
        }

        sqlx::query("DELETE FROM forge.recipes WHERE id = $1")
            .bind(recipe_id)
            .execute(&self.pool)
            .await?;

        info!("User {} deleted recipe {}", user.user_id, recipe_id);
        self.orphaned(stored_image(existing.image_url.as_deref())).await
    }

    async fn orphaned(&self, path: Option<&str>) -> Result<Option<String>, RecipeError> {
        let Some(path) = path else {
            return Ok(None);
        };
        let referenced: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM forge.recipes WHERE image_url = $1)")
                .bind(path)
                .fetch_one(&self.pool)
                .await?;
        Ok((!referenced).then(|| path.to_string()))
    }
}

async fn insert_ingredients(
    conn: &mut PgConnection,
    recipe_id: i64,
    ingredients: &[(String, String)],
) -> Result<(), sqlx::Error> {
    for (name, quantity) in ingredients {
        sqlx::query(
            "INSERT INTO forge.ingredients (recipe_id, ingredient_name, quantity) VALUES ($1, $2, $3)",
        )
        .bind(recipe_id)
        .bind(name)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::Role;
    use crate::db::test_support::insert_user;
    use crate::recipe::query::{Difficulty, RecipeListParams, SortOrder};

    fn recipe(title: &str, difficulty: Difficulty) -> ValidRecipe {
        ValidRecipe {
            title: title.to_string(),
            instructions: "Bake it".to_string(),
            image_url: None,
            video_url: None,
            cooking_time: "30 min".to_string(),
            servings: "4".to_string(),
            difficulty,
            ingredients: vec![("Sugar".to_string(), "100g".to_string())],
        }
    }

    fn params(difficulty: &str, search: &str) -> RecipeListParams {
        RecipeListParams {
            difficulty: Some(difficulty.to_string()),
            search: Some(search.to_string()),
            ..Default::default()
        }
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires DATABASE_URL"]
    async fn test_difficulty_and_search_intersect(pool: PgPool) {
        crate::db::init_db(&pool).await.unwrap();
        let cook = AuthUser {
            user_id: insert_user(&pool, "baker").await,
            role: Role::User,
        };
        let service = RecipeService::new(pool.clone());
        service
            .create(&cook, &recipe("Chocolate Cake", Difficulty::Hard))
            .await
            .unwrap();
        service
            .create(&cook, &recipe("Vanilla Cake", Difficulty::Easy))
            .await
            .unwrap();

        let filter = RecipeFilter::from_params(&params("Hard", "choc"));
        let page = service.list(&filter, 1).await.unwrap();
        let titles: Vec<&str> = page.recipes.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Chocolate Cake"]);
        assert!(page.filters_active);

        let all = service.list(&RecipeFilter::default(), 1).await.unwrap();
        assert_eq!(all.pagination.total, 2);
        assert_eq!(all.recipes[0].title, "Vanilla Cake");

        let by_title = RecipeFilter {
            sort: SortOrder::Title,
            ..Default::default()
        };
        let sorted = service.list(&by_title, 7).await.unwrap();
        assert_eq!(sorted.pagination.page, 1);
        assert_eq!(sorted.recipes[0].title, "Chocolate Cake");
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires DATABASE_URL"]
    async fn test_update_replaces_ingredients_and_checks_owner(pool: PgPool) {
        crate::db::init_db(&pool).await.unwrap();
        let owner = AuthUser {
            user_id: insert_user(&pool, "owner").await,
            role: Role::User,
        };
        let stranger = AuthUser {
            user_id: insert_user(&pool, "stranger").await,
            role: Role::User,
        };
        let service = RecipeService::new(pool.clone());
        let created = service
            .create(&owner, &recipe("Soup", Difficulty::Easy))
            .await
            .unwrap();

        let mut changed = recipe("Tomato Soup", Difficulty::Medium);
        changed.ingredients = vec![
            ("Tomato".to_string(), "4".to_string()),
            ("Salt".to_string(), "1 tsp".to_string()),
        ];

        assert!(matches!(
            service.update(&stranger, created.id, &changed).await,
            Err(RecipeError::Forbidden)
        ));

        service.update(&owner, created.id, &changed).await.unwrap();
        let detail = service.get(created.id).await.unwrap();
        assert_eq!(detail.recipe.title, "Tomato Soup");
        assert_eq!(detail.ingredients.len(), 2);
        assert_eq!(detail.ingredients[0].ingredient_name, "Tomato");

        service.delete(&owner, created.id).await.unwrap();
        assert!(matches!(
            service.get(created.id).await,
            Err(RecipeError::NotFound)
        ));
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires DATABASE_URL"]
    async fn test_replaced_and_deleted_images_are_reported(pool: PgPool) {
        crate::db::init_db(&pool).await.unwrap();
        let owner = AuthUser {
            user_id: insert_user(&pool, "owner").await,
            role: Role::User,
        };
        let service = RecipeService::new(pool.clone());

        let mut first = recipe("Pie", Difficulty::Easy);
        first.image_url = Some("recipes/recipe_old.png".to_string());
        let created = service.create(&owner, &first).await.unwrap();

        let (_, unchanged) = service.update(&owner, created.id, &first).await.unwrap();
        assert_eq!(unchanged, None);

        let mut second = recipe("Pie", Difficulty::Easy);
        second.image_url = Some("recipes/recipe_new.png".to_string());
        let (_, replaced) = service.update(&owner, created.id, &second).await.unwrap();
        assert_eq!(replaced.as_deref(), Some("recipes/recipe_old.png"));

        // another recipe still showing the image keeps the file alive
        service.create(&owner, &second).await.unwrap();
        assert_eq!(service.delete(&owner, created.id).await.unwrap(), None);
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires DATABASE_URL"]
    async fn test_title_sort_ignores_case(pool: PgPool) {
        crate::db::init_db(&pool).await.unwrap();
        let cook = AuthUser {
            user_id: insert_user(&pool, "cook").await,
            role: Role::User,
        };
        let service = RecipeService::new(pool.clone());
        for title in ["Zebra Cake", "apple pie", "Banana Bread"] {
            service
                .create(&cook, &recipe(title, Difficulty::Easy))
                .await
                .unwrap();
        }

        let by_title = RecipeFilter {
            sort: SortOrder::Title,
            ..Default::default()
        };
        let page = service.list(&by_title, 1).await.unwrap();
        let titles: Vec<&str> = page.recipes.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["apple pie", "Banana Bread", "Zebra Cake"]);
    }
}
