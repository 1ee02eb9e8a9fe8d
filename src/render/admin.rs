use super::layout::esc;
use crate::admin::model::{DashboardStats, ManagedUser};
use crate::notification::model::NotificationType;

fn stat(label: &str, value: i64) -> String {
    format!(
        r#"<div class="card stat"><span class="meta">{}</span><strong>{}</strong></div>"#,
        label, value
    )
}

const ADMIN_SCRIPT: &str = r#"
async function adminPost(url, body) {
  const res = await fetch(url, { method: 'POST', headers: { 'Content-Type': 'application/json' }, body: JSON.stringify(body || {}) });
  return res.json();
}
async function updateUser(id, field, value) {
  const data = await adminPost('/api/admin/users/' + id, { [field]: value });
  if (!data.success) { alert(data.message); }
}
async function deleteUser(id) {
  if (!confirm('Delete this user and all of their content?')) return;
  const data = await adminPost('/api/admin/users/' + id + '/delete');
  if (data.success) { document.getElementById('user-row-' + id).remove(); } else { alert(data.message); }
}
function toggleAllRecipients(source) {
  document.querySelectorAll('input[name="recipients"]').forEach(box => { box.checked = source.checked; });
}
async function sendBroadcast(event) {
  event.preventDefault();
  const form = event.target;
  const recipients = Array.from(form.querySelectorAll('input[name="recipients"]:checked')).map(box => box.value);
  const data = await adminPost('/send_notification.php', {
    title: form.elements.title.value,
    message: form.elements.message.value,
    type: form.elements.type.value,
    recipients
  });
  alert(data.message);
  if (data.success) { form.reset(); }
  return false;
}
"#;

fn select(field: &str, user_id: i64, current: &str, options: &[&str]) -> String {
    let mut html = format!(
        r#"<select onchange="updateUser({}, '{}', this.value)">"#,
        user_id, field
    );
    for option in options {
        let selected = if *option == current { " selected" } else { "" };
        html.push_str(&format!(r#"<option value="{0}"{1}>{0}</option>"#, option, selected));
    }
    html.push_str("</select>");
    html
}

/// Body of `/admin`
pub fn dashboard(stats: &DashboardStats, users: &[ManagedUser], viewer_id: i64) -> String {
    let mut html = String::from(r#"<h1>Admin dashboard</h1><div class="grid">"#);
    html.push_str(&stat("Users", stats.total_users));
    html.push_str(&stat("New users this week", stats.new_users_week));
    html.push_str(&stat("Recipes", stats.total_recipes));
    html.push_str(&stat("Posts", stats.total_posts));
    html.push_str(&stat("Comments", stats.total_comments));
    html.push_str(&stat("Messages", stats.total_messages));
    html.push_str("</div>");

    html.push_str(r#"<div class="card"><h2>Recipes by difficulty</h2><ul>"#);
    for row in &stats.recipes_by_difficulty {
        html.push_str(&format!("<li>{}: {}</li>", esc(&row.difficulty), row.count));
    }
    html.push_str("</ul></div>");

    html.push_str(
        r#"<div class="card"><h2>Users</h2><table><thead><tr><th>Name</th><th>Email</th><th>Role</th><th>Status</th><th>Recipes</th><th>Posts</th><th></th></tr></thead><tbody>"#,
    );
    for user in users {
        let delete = if user.id == viewer_id {
            String::new()
        } else {
            format!(
                r#"<button type="button" onclick="deleteUser({})">Delete</button>"#,
                user.id
            )
        };
        html.push_str(&format!(
            r#"<tr id="user-row-{id}"><td>{name} <span class="meta">@{username}</span></td><td>{email}</td><td>{role}</td><td>{status}</td><td>{recipes}</td><td>{posts}</td><td>{delete}</td></tr>"#,
            id = user.id,
            name = esc(&user.name),
            username = esc(&user.username),
            email = esc(&user.email),
            role = select("role", user.id, &user.role, &["user", "admin"]),
            status = select("status", user.id, &user.status, &["online", "away", "offline"]),
            recipes = user.recipe_count,
            posts = user.post_count,
            delete = delete,
        ));
    }
    html.push_str("</tbody></table></div>");

    html.push_str(
        r#"<form class="card" onsubmit="return sendBroadcast(event)"><h2>Send notification</h2>
<input name="title" placeholder="Title" required>
<textarea name="message" placeholder="Message" required></textarea>
<select name="type">"#,
    );
    for kind in NotificationType::ALL {
        html.push_str(&format!(r#"<option value="{0}">{0}</option>"#, kind.as_str()));
    }
    html.push_str(
        r#"</select><fieldset><legend>Recipients</legend><label><input type="checkbox" onchange="toggleAllRecipients(this)"> Everyone</label>"#,
    );
    for user in users.iter().filter(|u| u.id != viewer_id) {
        html.push_str(&format!(
            r#"<label><input type="checkbox" name="recipients" value="{}"> {}</label>"#,
            user.id,
            esc(&user.name)
        ));
    }
    html.push_str(&format!(
        r#"</fieldset><button type="submit">Send</button></form><script>{}</script>"#,
        ADMIN_SCRIPT
    ));
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: i64, name: &str, role: &str) -> ManagedUser {
        ManagedUser {
            id,
            username: name.to_lowercase(),
            email: format!("{}@forge.test", name.to_lowercase()),
            name: name.to_string(),
            role: role.to_string(),
            status: "offline".to_string(),
            created_at: Utc::now(),
            recipe_count: 2,
            post_count: 1,
        }
    }

    fn stats() -> DashboardStats {
        DashboardStats {
            total_users: 2,
            total_recipes: 4,
            total_posts: 1,
            total_comments: 0,
            total_messages: 7,
            new_users_week: 1,
            recipes_by_difficulty: Vec::new(),
        }
    }

    #[test]
    fn test_admin_cannot_target_self() {
        let html = dashboard(&stats(), &[user(1, "Root", "admin"), user(2, "Ana", "user")], 1);
        assert!(!html.contains("deleteUser(1)"));
        assert!(html.contains("deleteUser(2)"));
        assert!(!html.contains(r#"name="recipients" value="1""#));
        assert!(html.contains(r#"name="recipients" value="2""#));
    }

    #[test]
    fn test_current_role_selected() {
        let html = dashboard(&stats(), &[user(2, "Ana", "admin")], 1);
        assert!(html.contains(r#"<option value="admin" selected>admin</option>"#));
        assert!(html.contains(r#"<option value="message">message</option>"#));
    }
}
