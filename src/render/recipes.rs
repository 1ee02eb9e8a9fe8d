use super::layout::{avatar, esc};
use crate::recipe::model::{RecipeCard, RecipeDetail};
use crate::recipe::query::{Difficulty, Pagination, RecipeFilter};
use crate::recipe::service::RecipePage;
use crate::uploads::{public_url, UploadStore};

/// Remote URLs pass through; stored paths render only while the file exists
pub fn media_src(uploads: &UploadStore, value: Option<&str>) -> Option<String> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    if value.starts_with("http://") || value.starts_with("https://") {
        Some(value.to_string())
    } else if uploads.exists(value) {
        Some(public_url(value))
    } else {
        None
    }
}

fn filter_form(filter: &RecipeFilter) -> String {
    let mut html = String::from(
        r#"<form class="card filters" method="get" action="/recipes"><select name="difficulty"><option value="all">All difficulties</option>"#,
    );
    for level in Difficulty::ALL {
        let selected = if filter.difficulty == Some(level) {
            " selected"
        } else {
            ""
        };
        html.push_str(&format!(
            r#"<option value="{0}"{1}>{0}</option>"#,
            level.as_str(),
            selected
        ));
    }
    html.push_str("</select>");

    html.push_str(&format!(
        r#"<input type="search" name="search" placeholder="Search recipes" value="{}">"#,
        esc(filter.search.as_deref().unwrap_or_default())
    ));

    html.push_str(r#"<select name="sort">"#);
    for (value, label) in [
        ("newest", "Newest first"),
        ("oldest", "Oldest first"),
        ("title", "Title A-Z"),
    ] {
        let selected = if filter.sort.as_str() == value {
            " selected"
        } else {
            ""
        };
        html.push_str(&format!(r#"<option value="{}"{}>{}</option>"#, value, selected, label));
    }
    html.push_str(r#"</select><button type="submit">Apply</button></form>"#);
    html
}

/// Query string that keeps the active filters while changing page
fn page_href(filter: &RecipeFilter, page: i64) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    if let Some(level) = filter.difficulty {
        query.append_pair("difficulty", level.as_str());
    }
    if let Some(search) = &filter.search {
        query.append_pair("search", search);
    }
    query.append_pair("sort", filter.sort.as_str());
    query.append_pair("page", &page.to_string());
    format!("/recipes?{}", query.finish())
}

pub fn pagination_control(filter: &RecipeFilter, pagination: &Pagination) -> String {
    if pagination.total_pages <= 1 {
        return String::new();
    }

    let mut html = String::from(r#"<nav class="pagination">"#);
    if pagination.has_previous() {
        html.push_str(&format!(
            r#"<a href="{}">&laquo; Prev</a>"#,
            esc(&page_href(filter, pagination.page - 1))
        ));
    }
    for page in pagination.window() {
        if page == pagination.page {
            html.push_str(&format!(r#"<span class="current">{}</span>"#, page));
        } else {
            html.push_str(&format!(
                r#"<a href="{}">{}</a>"#,
                esc(&page_href(filter, page)),
                page
            ));
        }
    }
    if pagination.has_next() {
        html.push_str(&format!(
            r#"<a href="{}">Next &raquo;</a>"#,
            esc(&page_href(filter, pagination.page + 1))
        ));
    }
    html.push_str("</nav>");
    html
}

fn card(uploads: &UploadStore, recipe: &RecipeCard) -> String {
    let image = match media_src(uploads, recipe.image_url.as_deref()) {
        Some(src) => format!(r#"<img src="{}" alt="{}">"#, esc(&src), esc(&recipe.title)),
        None => r#"<div class="placeholder"></div>"#.to_string(),
    };
    format!(
        r#"<article class="card recipe-card">
<a href="/recipes/{id}">{image}<h3>{title}</h3></a>
<p class="meta">{difficulty} · {time} · serves {servings}</p>
<p class="creator">{avatar} {creator}</p>
</article>"#,
        id = recipe.id,
        image = image,
        title = esc(&recipe.title),
        difficulty = esc(&recipe.difficulty),
        time = esc(&recipe.cooking_time),
        servings = esc(&recipe.servings),
        avatar = avatar(
            uploads,
            &recipe.creator_initials,
            &recipe.creator_avatar_color,
            recipe.creator_profile_picture.as_deref(),
            "small"
        ),
        creator = esc(&recipe.creator_name),
    )
}

const EDITOR_SCRIPT: &str = r#"
function ingredientRow(name, quantity) {
  const row = document.createElement('div');
  row.className = 'ingredient-row';
  row.innerHTML = '<input placeholder="Ingredient"><input placeholder="Quantity"><button type="button" onclick="this.parentElement.remove()">&times;</button>';
  row.children[0].value = name || '';
  row.children[1].value = quantity || '';
  document.getElementById('ingredient-rows').appendChild(row);
}
function openRecipeEditor(recipe, ingredients) {
  const form = document.getElementById('recipe-editor');
  const e = form.elements;
  form.reset();
  form.dataset.recipeId = recipe ? recipe.id : '';
  form.querySelector('h2').textContent = recipe ? 'Edit recipe' : 'New recipe';
  if (recipe) {
    e.title.value = recipe.title;
    e.instructions.value = recipe.instructions;
    e.time.value = recipe.time;
    e.servings.value = recipe.servings;
    e.difficulty.value = recipe.difficulty;
    e.image_url.value = recipe.image_url || '';
    e.video_url.value = recipe.video_url || '';
  }
  document.getElementById('ingredient-rows').innerHTML = '';
  (ingredients && ingredients.length ? ingredients : [{}]).forEach(i => ingredientRow(i.ingredient_name, i.quantity));
  form.classList.remove('hidden');
  form.scrollIntoView();
}
async function editRecipe(id) {
  const res = await fetch('/get_recipe.php?id=' + id);
  const data = await res.json();
  if (data.success) { openRecipeEditor(data.recipe, data.ingredients); } else { alert(data.message); }
}
async function saveRecipe(event) {
  event.preventDefault();
  const form = event.target;
  const e = form.elements;
  const photo = e.image_file.files[0];
  if (photo) {
    const upload = new FormData();
    upload.append('image', photo);
    const stored = await (await fetch('/api/recipe_images', { method: 'POST', body: upload })).json();
    if (!stored.success) { alert(stored.message); return false; }
    e.image_url.value = stored.image_url;
  }
  const ingredients = Array.from(document.querySelectorAll('#ingredient-rows .ingredient-row')).map(row => ({
    ingredient_name: row.children[0].value,
    quantity: row.children[1].value
  }));
  const id = form.dataset.recipeId;
  const res = await fetch(id ? '/api/recipes/' + id : '/api/recipes', {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify({
      title: e.title.value,
      instructions: e.instructions.value,
      image_url: e.image_url.value,
      video_url: e.video_url.value,
      time: e.time.value,
      servings: e.servings.value,
      difficulty: e.difficulty.value,
      ingredients
    })
  });
  const data = await res.json();
  if (data.success) { window.location.href = '/recipes/' + data.recipe_id; } else { alert(data.message); }
  return false;
}
"#;

/// Create/edit form, hidden until `openRecipeEditor` or `editRecipe` shows it
fn editor() -> String {
    let mut options = String::new();
    for level in Difficulty::ALL {
        options.push_str(&format!(r#"<option value="{0}">{0}</option>"#, level.as_str()));
    }
    format!(
        r#"<form id="recipe-editor" class="card hidden" onsubmit="return saveRecipe(event)">
<h2>New recipe</h2>
<label>Title <input name="title" required></label>
<label>Difficulty <select name="difficulty">{options}</select></label>
<label>Time <input name="time" placeholder="45 min"></label>
<label>Servings <input name="servings" placeholder="4"></label>
<fieldset><legend>Ingredients</legend><div id="ingredient-rows"></div>
<button type="button" onclick="ingredientRow()">Add ingredient</button></fieldset>
<label>Instructions <textarea name="instructions" rows="8" required></textarea></label>
<label>Photo <input type="file" name="image_file" accept=".jpg,.jpeg,.png,.gif,.webp"></label>
<label>or image URL <input name="image_url" placeholder="https://"></label>
<label>Video URL <input name="video_url" placeholder="https://"></label>
<button type="submit">Save recipe</button>
<button type="button" onclick="document.getElementById('recipe-editor').classList.add('hidden')">Cancel</button>
</form><script>{script}</script>"#,
        options = options,
        script = EDITOR_SCRIPT,
    )
}

/// Grid body of `/recipes`; signed-in visitors also get the create form
pub fn listing(
    uploads: &UploadStore,
    filter: &RecipeFilter,
    page: &RecipePage,
    can_create: bool,
) -> String {
    let mut html = String::new();
    if can_create {
        html.push_str(
            r#"<button type="button" onclick="openRecipeEditor()">Add recipe</button>"#,
        );
        html.push_str(&editor());
    }
    html.push_str(&filter_form(filter));

    if page.recipes.is_empty() {
        let message = if page.filters_active {
            "No recipes match your filters. Try a different search or difficulty."
        } else {
            "No recipes yet. Be the first to share one!"
        };
        html.push_str(&format!(r#"<div class="card empty-state">{}</div>"#, message));
        return html;
    }

    html.push_str(&format!(
        r#"<p class="meta">{} recipes</p><div class="grid">"#,
        page.pagination.total
    ));
    for recipe in &page.recipes {
        html.push_str(&card(uploads, recipe));
    }
    html.push_str("</div>");
    html.push_str(&pagination_control(filter, &page.pagination));
    html
}

/// Body of `/recipes/:id`; owners and admins get edit and delete controls
pub fn detail(uploads: &UploadStore, detail: &RecipeDetail, can_modify: bool) -> String {
    let recipe = &detail.recipe;
    let mut html = String::from(r#"<article class="card recipe-detail">"#);

    html.push_str(&format!(
        r#"<h1>{}</h1><p class="meta">By {} · {} · {} · serves {}</p>"#,
        esc(&recipe.title),
        esc(&detail.creator_name),
        esc(&recipe.difficulty),
        esc(&recipe.cooking_time),
        esc(&recipe.servings)
    ));

    if let Some(src) = media_src(uploads, recipe.image_url.as_deref()) {
        html.push_str(&format!(r#"<img src="{}" alt="{}">"#, esc(&src), esc(&recipe.title)));
    }
    if let Some(src) = media_src(uploads, recipe.video_url.as_deref()) {
        html.push_str(&format!(r#"<video controls src="{}"></video>"#, esc(&src)));
    }

    html.push_str("<h2>Ingredients</h2><ul>");
    for ingredient in &detail.ingredients {
        html.push_str(&format!(
            "<li>{} <span class=\"meta\">{}</span></li>",
            esc(&ingredient.ingredient_name),
            esc(&ingredient.quantity)
        ));
    }
    html.push_str("</ul><h2>Instructions</h2>");

    for paragraph in recipe.instructions.lines().filter(|l| !l.trim().is_empty()) {
        html.push_str(&format!("<p>{}</p>", esc(paragraph)));
    }

    if can_modify {
        html.push_str(&format!(
            r#"<button type="button" onclick="editRecipe({0})">Edit recipe</button><form method="post" action="/recipes/{0}/delete" onsubmit="return confirm('Delete this recipe?')"><button type="submit">Delete recipe</button></form>"#,
            recipe.id
        ));
    }
    html.push_str("</article>");
    if can_modify {
        html.push_str(&editor());
    }
    html
}
