use super::layout::{avatar, esc};
use crate::uploads::UploadStore;
use crate::user::model::User;

pub fn login_form() -> String {
    r#"<form class="card auth-form" method="post" action="/login">
<h1>Log in</h1>
<label>Email <input type="email" name="email" required></label>
<label>Password <input type="password" name="password" required></label>
<button type="submit">Log in</button>
<p class="meta">No account yet? <a href="/register">Sign up</a></p>
</form>"#
        .to_string()
}

pub fn register_form() -> String {
    r#"<form class="card auth-form" method="post" action="/register">
<h1>Create your account</h1>
<label>Full name <input name="name" required></label>
<label>Username <input name="username" required></label>
<label>Email <input type="email" name="email" required></label>
<label>Password <input type="password" name="password" minlength="6" required></label>
<label>Confirm password <input type="password" name="confirm_password" minlength="6" required></label>
<button type="submit">Sign up</button>
<p class="meta">Already registered? <a href="/login">Log in</a></p>
</form>"#
        .to_string()
}

const PROFILE_SCRIPT: &str = r#"
async function saveProfile(event) {
  event.preventDefault();
  const form = event.target;
  const res = await fetch('/api/profile', {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify({ name: form.elements.name.value, email: form.elements.email.value })
  });
  const data = await res.json();
  if (data.success) { window.location.reload(); } else { alert(data.message); }
  return false;
}
async function uploadPicture(event) {
  event.preventDefault();
  const res = await fetch('/api/profile/picture', { method: 'POST', body: new FormData(event.target) });
  const data = await res.json();
  if (data.success) { window.location.reload(); } else { alert(data.message); }
  return false;
}
"#;

/// Body of `/profile`
pub fn profile(uploads: &UploadStore, user: &User) -> String {
    format!(
        r#"<div class="card profile">
<header>{avatar} <h1>{name}</h1> <span class="meta">@{username} · {role} · member since {since}</span></header>
<form onsubmit="return saveProfile(event)">
<label>Full name <input name="name" value="{name}" required></label>
<label>Email <input type="email" name="email" value="{email}" required></label>
<button type="submit">Save</button>
</form>
<form enctype="multipart/form-data" onsubmit="return uploadPicture(event)">
<label>Profile picture <input type="file" name="picture" accept=".jpg,.jpeg,.png,.gif" required></label>
<button type="submit">Upload</button>
</form>
</div><script>{script}</script>"#,
        avatar = avatar(
            uploads,
            &user.initials,
            &user.avatar_color,
            user.profile_picture.as_deref(),
            ""
        ),
        name = esc(&user.name),
        username = esc(&user.username),
        role = esc(&user.role),
        since = user.created_at.format("%B %Y"),
        email = esc(&user.email),
        script = PROFILE_SCRIPT,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_register_form_posts_confirmation() {
        let html = register_form();
        assert!(html.contains(r#"action="/register""#));
        assert!(html.contains(r#"name="confirm_password""#));
    }

    #[test]
    fn test_profile_prefills_escaped_values() {
        let user = User {
            id: 1,
            username: "ana".to_string(),
            email: "ana@forge.test".to_string(),
            name: r#"Ana "the baker""#.to_string(),
            password_hash: "x".to_string(),
            profile_picture: None,
            initials: "AT".to_string(),
            avatar_color: "#059669".to_string(),
            role: "user".to_string(),
            status: "online".to_string(),
            created_at: Utc::now(),
        };
        let uploads = UploadStore::new(std::env::temp_dir().join("forge-render-users"));
        let html = profile(&uploads, &user);
        assert!(html.contains("value=\"Ana &quot;the baker&quot;\""));
        assert!(html.contains(r#"value="ana@forge.test""#));
    }
}
