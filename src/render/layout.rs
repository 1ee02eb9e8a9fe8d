use crate::flash::{Flash, FlashKind};
use crate::uploads::{public_url, UploadStore};

/// Escape user text for element bodies and quoted attributes
pub fn esc(raw: &str) -> String {
    html_escape::encode_safe(raw).into_owned()
}

/// Signed-in user as the navigation bar shows them
#[derive(Debug, Clone)]
pub struct NavUser {
    pub name: String,
    pub initials: String,
    pub avatar_color: String,
    pub profile_picture: Option<String>,
    pub is_admin: bool,
    pub unread_notifications: i64,
    pub unread_messages: i64,
}

#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub viewer: Option<NavUser>,
    pub flash: Option<Flash>,
}

/// Circle with the picture when its file is still on disk, else the initials
pub fn avatar(
    uploads: &UploadStore,
    initials: &str,
    color: &str,
    picture: Option<&str>,
    size_class: &str,
) -> String {
    match picture.filter(|p| uploads.exists(p)) {
        Some(path) => format!(
            r#"<img class="avatar {}" src="{}" alt="{}">"#,
            size_class,
            esc(&public_url(path)),
            esc(initials)
        ),
        None => format!(
            r#"<span class="avatar {}" style="background:{}">{}</span>"#,
            size_class,
            esc(color),
            esc(initials)
        ),
    }
}

fn badge(count: i64, id: &str) -> String {
    let hidden = if count > 0 { "" } else { " hidden" };
    format!(r#"<span class="badge{}" id="{}">{}</span>"#, hidden, id, count)
}

fn nav(ctx: &PageContext, uploads: &UploadStore) -> String {
    let mut html = String::from(
        r#"<nav class="topbar"><a class="brand" href="/recipes">Flavor Forge</a><div class="links">"#,
    );
    html.push_str(r#"<a href="/recipes">Recipes</a><a href="/feed">Feed</a>"#);

    match &ctx.viewer {
        Some(viewer) => {
            html.push_str(&format!(
                r#"<a href="/chat">Messages {}</a><a href="/notifications">Notifications {}</a>"#,
                badge(viewer.unread_messages, "message-badge"),
                badge(viewer.unread_notifications, "notification-badge"),
            ));
            if viewer.is_admin {
                html.push_str(r#"<a href="/admin">Admin</a>"#);
            }
            html.push_str(&format!(
                r#"<div class="dropdown"><button type="button" class="dropdown-toggle" onclick="toggleMenu()">{} {}</button>
<div class="dropdown-menu" id="user-menu">
<a href="/profile">Profile</a>
<button type="button" onclick="toggleTheme()">Toggle dark mode</button>
<form method="post" action="/logout"><button type="submit">Log out</button></form>
</div></div>"#,
                avatar(
                    uploads,
                    &viewer.initials,
                    &viewer.avatar_color,
                    viewer.profile_picture.as_deref(),
                    "small"
                ),
                esc(&viewer.name)
            ));
        }
        None => {
            html.push_str(r#"<a href="/login">Log in</a><a href="/register">Sign up</a>"#);
            html.push_str(r#"<button type="button" onclick="toggleTheme()">Dark mode</button>"#);
        }
    }

    html.push_str("</div></nav>");
    html
}

fn flash_banner(flash: &Flash) -> String {
    let class = match flash.kind {
        FlashKind::Success => "flash success",
        FlashKind::Error => "flash error",
    };
    format!(r#"<div class="{}">{}</div>"#, class, esc(&flash.message))
}

const STYLE: &str = r#"
:root { --bg:#f8fafc; --fg:#0f172a; --card:#fff; --muted:#64748b; --accent:#ea580c; }
body.dark { --bg:#0f172a; --fg:#e2e8f0; --card:#1e293b; --muted:#94a3b8; }
body { margin:0; font-family:system-ui,sans-serif; background:var(--bg); color:var(--fg); }
.topbar { display:flex; justify-content:space-between; align-items:center; padding:.75rem 1.5rem; background:var(--card); }
.topbar a { margin-right:1rem; color:inherit; text-decoration:none; }
.brand { font-weight:700; color:var(--accent) !important; }
main { max-width:1100px; margin:1.5rem auto; padding:0 1rem; }
.card { background:var(--card); border-radius:10px; padding:1rem; margin-bottom:1rem; }
.grid { display:grid; grid-template-columns:repeat(auto-fill,minmax(240px,1fr)); gap:1rem; }
.avatar { display:inline-flex; align-items:center; justify-content:center; border-radius:50%; color:#fff; width:40px; height:40px; object-fit:cover; }
.avatar.small { width:28px; height:28px; font-size:.75rem; }
.badge { background:var(--accent); color:#fff; border-radius:999px; padding:0 .4rem; font-size:.75rem; }
.hidden { display:none; }
.flash { padding:.75rem 1rem; border-radius:8px; margin-bottom:1rem; }
.flash.success { background:#dcfce7; color:#166534; }
.flash.error { background:#fee2e2; color:#991b1b; }
.dropdown { position:relative; display:inline-block; }
.dropdown-menu { display:none; position:absolute; right:0; background:var(--card); padding:.5rem; border-radius:8px; }
.dropdown-menu.open { display:block; }
.pagination a, .pagination span { margin:0 .25rem; }
.placeholder { background:var(--muted); height:160px; border-radius:8px; }
.ingredient-row { display:flex; gap:.5rem; margin-bottom:.5rem; }
.messages { height:420px; overflow-y:auto; }
.message.mine { text-align:right; }
"#;

const SCRIPT: &str = r#"
function toggleTheme() {
  const dark = !document.body.classList.contains('dark');
  document.body.classList.toggle('dark', dark);
  localStorage.setItem('forge-theme', dark ? 'dark' : 'light');
}
function toggleMenu() {
  const menu = document.getElementById('user-menu');
  if (menu) { menu.classList.toggle('open'); }
}
if (localStorage.getItem('forge-theme') === 'dark') { document.body.classList.add('dark'); }
"#;

/// Full document around a page body
pub fn page(title: &str, ctx: &PageContext, uploads: &UploadStore, body: &str) -> String {
    let flash = ctx.flash.as_ref().map(flash_banner).unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{} · Flavor Forge</title>
<style>{}</style>
</head>
<body>
{}
<main>
{}
{}
</main>
<script>{}</script>
</body>
</html>"#,
        esc(title),
        STYLE,
        nav(ctx, uploads),
        flash,
        body,
        SCRIPT
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> UploadStore {
        UploadStore::new(std::env::temp_dir().join("forge-render-missing"))
    }

    #[test]
    fn test_esc_neutralizes_markup() {
        let escaped = esc(r#"<script>alert("x")</script>"#);
        assert!(escaped.starts_with("&lt;script&gt;"));
        assert!(!escaped.contains('<'));
        assert!(!escaped.contains('"'));
    }

    #[test]
    fn test_missing_picture_falls_back_to_initials() {
        let html = avatar(&store(), "JC", "#4f46e5", Some("profile_picture/gone.png"), "small");
        assert!(html.starts_with("<span"));
        assert!(html.contains(">JC<"));
    }

    #[test]
    fn test_page_shows_flash_and_login_links_for_anonymous() {
        let ctx = PageContext {
            viewer: None,
            flash: Some(Flash::error("Recipe not found")),
        };
        let html = page("Recipes", &ctx, &store(), "<p>body</p>");
        assert!(html.contains(r#"<div class="flash error">Recipe not found</div>"#));
        assert!(html.contains(r#"href="/login""#));
        assert!(html.contains("forge-theme"));
    }

    #[test]
    fn test_admin_link_only_for_admins() {
        let mut viewer = NavUser {
            name: "Ana <b>".to_string(),
            initials: "A".to_string(),
            avatar_color: "#059669".to_string(),
            profile_picture: None,
            is_admin: false,
            unread_notifications: 2,
            unread_messages: 0,
        };
        let ctx = PageContext {
            viewer: Some(viewer.clone()),
            flash: None,
        };
        let html = page("Feed", &ctx, &store(), "");
        assert!(!html.contains(r#"href="/admin""#));
        assert!(html.contains("Ana &lt;b&gt;"));

        viewer.is_admin = true;
        let ctx = PageContext {
            viewer: Some(viewer),
            flash: None,
        };
        assert!(page("Feed", &ctx, &store(), "").contains(r#"href="/admin""#));
    }
}
