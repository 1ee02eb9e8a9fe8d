use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use utoipa::ToSchema;

use crate::recipe::query::Difficulty;
use crate::uploads::UploadFolder;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Recipe {
    pub id: i64,
    pub title: String,
    pub instructions: String,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub cooking_time: String,
    pub servings: String,
    pub difficulty: String,
    pub created_by: i64,
    #[schema(value_type = DateTimeWrapper)]
    pub created_at: DateTime<Utc>,
}

/// Listing row: a recipe joined with its creator's identity fields
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct RecipeCard {
    pub id: i64,
    pub title: String,
    pub image_url: Option<String>,
    pub cooking_time: String,
    pub servings: String,
    pub difficulty: String,
    pub created_by: i64,
    #[schema(value_type = DateTimeWrapper)]
    pub created_at: DateTime<Utc>,
    pub creator_name: String,
    pub creator_initials: String,
    pub creator_avatar_color: String,
    pub creator_profile_picture: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Ingredient {
    pub ingredient_name: String,
    pub quantity: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeDetail {
    pub recipe: Recipe,
    pub creator_name: String,
    pub ingredients: Vec<Ingredient>,
}

/// Create/update payload. `time` and `servings` are free-form labels.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecipeRequest {
    pub title: String,
    pub instructions: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub servings: String,
    pub difficulty: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
}

/// A request that passed validation, ready to write
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRecipe {
    pub title: String,
    pub instructions: String,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub cooking_time: String,
    pub servings: String,
    pub difficulty: Difficulty,
    pub ingredients: Vec<(String, String)>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Path under the recipe upload folder, as opposed to a remote URL
pub fn stored_image(value: Option<&str>) -> Option<&str> {
    value.filter(|v| {
        v.strip_prefix(UploadFolder::Recipes.dir_name())
            .map_or(false, |rest| rest.starts_with('/') && rest.len() > 1)
    })
}

fn is_web_address(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

impl RecipeRequest {
    pub fn validate(&self) -> Result<ValidRecipe, RecipeError> {
        let title = self.title.trim();
        let instructions = self.instructions.trim();
        if title.is_empty() || instructions.is_empty() {
            return Err(RecipeError::Validation(
                "Title and instructions are required".to_string(),
            ));
        }

        let difficulty = Difficulty::parse_strict(&self.difficulty).ok_or_else(|| {
            RecipeError::Validation("Difficulty must be Easy, Medium or Hard".to_string())
        })?;

        let ingredients: Vec<(String, String)> = self
            .ingredients
            .iter()
            .filter(|i| !i.ingredient_name.trim().is_empty())
            .map(|i| {
                (
                    i.ingredient_name.trim().to_string(),
                    i.quantity.trim().to_string(),
                )
            })
            .collect();

        if ingredients.is_empty() {
            return Err(RecipeError::Validation(
                "At least one ingredient is required".to_string(),
            ));
        }

        let image_url = non_blank(&self.image_url);
        if let Some(image) = image_url.as_deref() {
            if !is_web_address(image) && stored_image(Some(image)).is_none() {
                return Err(RecipeError::Validation(
                    "Image must be a web address or an uploaded recipe image".to_string(),
                ));
            }
        }

        Ok(ValidRecipe {
            title: title.to_string(),
            instructions: instructions.to_string(),
            image_url,
            video_url: non_blank(&self.video_url),
            cooking_time: self.time.trim().to_string(),
            servings: self.servings.trim().to_string(),
            difficulty,
            ingredients,
        })
    }
}

#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Recipe not found")]
    NotFound,

    #[error("You do not have permission to modify this recipe")]
    Forbidden,

    #[error("{0}")]
    Validation(String),
}
