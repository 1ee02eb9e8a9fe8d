use super::layout::{avatar, esc};
use crate::notification::model::Notification;
use crate::post::model::FeedPost;
use crate::uploads::{public_url, UploadStore};

fn post_media(uploads: &UploadStore, post: &FeedPost) -> String {
    let Some(path) = post.media_url.as_deref() else {
        return String::new();
    };
    if !uploads.exists(path) {
        return r#"<div class="placeholder" title="Media unavailable"></div>"#.to_string();
    }
    let src = esc(&public_url(path));
    match post.media_type.as_str() {
        "video" => format!(r#"<video controls src="{}"></video>"#, src),
        _ => format!(r#"<img src="{}" alt="Post image">"#, src),
    }
}

fn post_card(uploads: &UploadStore, post: &FeedPost, viewer_id: Option<i64>, viewer_is_admin: bool) -> String {
    let can_delete = viewer_id == Some(post.user_id) || viewer_is_admin;
    let delete = if can_delete {
        format!(
            r#"<button type="button" onclick="deletePost({})">Delete</button>"#,
            post.id
        )
    } else {
        String::new()
    };
    let liked = if post.liked_by_viewer { " liked" } else { "" };

    format!(
        r#"<article class="card post" id="post-{id}">
<header>{avatar} <strong>{author}</strong> <span class="meta">@{username} · {when}</span></header>
<p>{content}</p>
{media}
<footer>
<button type="button" class="like{liked}" onclick="toggleLike({id})">Like <span id="likes-{id}">{likes}</span></button>
<button type="button" onclick="toggleComments({id})">Comments <span id="comments-count-{id}">{comments}</span></button>
{delete}
</footer>
<section class="comments hidden" id="comments-{id}">
<div class="comment-list"></div>
<form onsubmit="return addComment(event, {id})"><input name="content" placeholder="Write a comment"><button type="submit">Send</button></form>
</section>
</article>"#,
        id = post.id,
        avatar = avatar(
            uploads,
            &post.author_initials,
            &post.author_avatar_color,
            post.author_profile_picture.as_deref(),
            ""
        ),
        author = esc(&post.author_name),
        username = esc(&post.author_username),
        when = post.created_at.format("%b %d, %Y %I:%M %p"),
        content = esc(&post.content),
        media = post_media(uploads, post),
        liked = liked,
        likes = post.likes_count,
        comments = post.comments_count,
        delete = delete,
    )
}

const FEED_SCRIPT: &str = r#"
async function postJson(url, body) {
  const res = await fetch(url, { method: 'POST', headers: { 'Content-Type': 'application/json' }, body: body ? JSON.stringify(body) : undefined });
  return res.json();
}
async function toggleLike(id) {
  const data = await postJson('/api/posts/' + id + '/like');
  if (data.success) { document.getElementById('likes-' + id).textContent = data.likes_count; }
}
async function deletePost(id) {
  if (!confirm('Delete this post?')) return;
  const data = await postJson('/api/posts/' + id + '/delete');
  if (data.success) { document.getElementById('post-' + id).remove(); } else { alert(data.error); }
}
async function loadComments(id) {
  const res = await fetch('/api/posts/' + id + '/comments');
  const data = await res.json();
  const list = document.querySelector('#comments-' + id + ' .comment-list');
  list.innerHTML = '';
  (data.comments || []).forEach(c => {
    const p = document.createElement('p');
    const b = document.createElement('strong');
    b.textContent = c.author_name + ': ';
    p.appendChild(b);
    p.appendChild(document.createTextNode(c.content));
    list.appendChild(p);
  });
}
function toggleComments(id) {
  const section = document.getElementById('comments-' + id);
  section.classList.toggle('hidden');
  if (!section.classList.contains('hidden')) { loadComments(id); }
}
async function addComment(event, id) {
  event.preventDefault();
  const input = event.target.elements.content;
  const data = await postJson('/api/posts/' + id + '/comments', { content: input.value });
  if (data.success) {
    input.value = '';
    const counter = document.getElementById('comments-count-' + id);
    counter.textContent = parseInt(counter.textContent, 10) + 1;
    loadComments(id);
  } else { alert(data.error); }
  return false;
}
async function createPost(event) {
  event.preventDefault();
  const res = await fetch('/api/posts', { method: 'POST', body: new FormData(event.target) });
  const data = await res.json();
  if (data.success) { window.location.reload(); } else { alert(data.error); }
  return false;
}
"#;

/// Body of `/feed`
pub fn feed(
    uploads: &UploadStore,
    posts: &[FeedPost],
    page: i64,
    viewer_id: Option<i64>,
    viewer_is_admin: bool,
) -> String {
    let mut html = String::new();

    if viewer_id.is_some() {
        html.push_str(
            r#"<form class="card" enctype="multipart/form-data" onsubmit="return createPost(event)">
<textarea name="content" placeholder="What are you cooking?"></textarea>
<input type="file" name="media" accept="image/*,video/*">
<button type="submit">Post</button>
</form>"#,
        );
    }

    if posts.is_empty() {
        html.push_str(r#"<div class="card empty-state">No posts yet.</div>"#);
    }
    for post in posts {
        html.push_str(&post_card(uploads, post, viewer_id, viewer_is_admin));
    }

    html.push_str(r#"<nav class="pagination">"#);
    if page > 1 {
        html.push_str(&format!(r#"<a href="/feed?page={}">Newer</a>"#, page - 1));
    }
    if !posts.is_empty() {
        html.push_str(&format!(r#"<a href="/feed?page={}">Older</a>"#, page + 1));
    }
    html.push_str(&format!("</nav><script>{}</script>", FEED_SCRIPT));
    html
}

const NOTIFICATIONS_SCRIPT: &str = r#"
let lastNotificationId = parseInt(document.getElementById('notifications').dataset.lastId, 10) || 0;
async function pollNotifications() {
  try {
    const res = await fetch('/check_notifications.php?last_id=' + lastNotificationId);
    const data = await res.json();
    if (!data.success) return;
    const list = document.getElementById('notifications');
    data.notifications.forEach(n => {
      lastNotificationId = Math.max(lastNotificationId, n.id);
      const item = document.createElement('li');
      item.className = 'card unread';
      const title = document.createElement('strong');
      title.textContent = n.title;
      item.appendChild(title);
      item.appendChild(document.createTextNode(' ' + n.message + ' · ' + n.time));
      list.prepend(item);
    });
    const badge = document.getElementById('notification-badge');
    if (badge) { badge.textContent = data.unread_count; badge.classList.toggle('hidden', data.unread_count === 0); }
  } catch (e) { console.error(e); }
}
async function markAllRead() {
  await fetch('/api/notifications/read_all', { method: 'POST' });
  document.querySelectorAll('#notifications .unread').forEach(el => el.classList.remove('unread'));
  const badge = document.getElementById('notification-badge');
  if (badge) { badge.classList.add('hidden'); }
}
setInterval(pollNotifications, 5000);
"#;

/// Body of `/notifications`, newest first, polling for more
pub fn notifications(items: &[Notification]) -> String {
    let last_id = items.iter().map(|n| n.id).max().unwrap_or(0);
    let mut html = format!(
        r#"<div class="card"><h1>Notifications</h1><button type="button" onclick="markAllRead()">Mark all as read</button></div><ul id="notifications" data-last-id="{}">"#,
        last_id
    );

    if items.is_empty() {
        html.push_str(r#"<li class="card empty-state">You have no notifications.</li>"#);
    }
    for item in items {
        let class = if item.is_read { "card" } else { "card unread" };
        html.push_str(&format!(
            r#"<li class="{}" data-type="{}"><strong>{}</strong> {} · <span class="meta">{}</span></li>"#,
            class,
            esc(&item.notification_type),
            esc(&item.title),
            esc(&item.message),
            item.created_at.format("%b %d, %Y %I:%M %p")
        ));
    }
    html.push_str(&format!("</ul><script>{}</script>", NOTIFICATIONS_SCRIPT));
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn store() -> UploadStore {
        UploadStore::new(std::env::temp_dir().join("forge-render-social"))
    }

    fn post(user_id: i64, media: Option<&str>) -> FeedPost {
        FeedPost {
            id: 9,
            user_id,
            content: "<b>Bread</b>".to_string(),
            media_type: if media.is_some() { "image" } else { "none" }.to_string(),
            media_url: media.map(str::to_string),
            likes_count: 3,
            comments_count: 1,
            created_at: Utc::now(),
            author_name: "Ana".to_string(),
            author_username: "ana".to_string(),
            author_initials: "A".to_string(),
            author_avatar_color: "#059669".to_string(),
            author_profile_picture: None,
            liked_by_viewer: true,
        }
    }

    #[test]
    fn test_feed_escapes_and_marks_likes() {
        let html = feed(&store(), &[post(1, None)], 1, Some(2), false);
        assert!(html.contains("&lt;b&gt;Bread"));
        assert!(html.contains(r#"class="like liked""#));
        assert!(!html.contains("deletePost(9)"));
    }

    #[test]
    fn test_owner_and_admin_see_delete() {
        assert!(feed(&store(), &[post(1, None)], 1, Some(1), false).contains("deletePost(9)"));
        assert!(feed(&store(), &[post(1, None)], 1, Some(5), true).contains("deletePost(9)"));
    }

    #[test]
    fn test_missing_media_renders_placeholder() {
        let html = feed(&store(), &[post(1, Some("posts/post_gone.png"))], 1, None, false);
        assert!(html.contains("Media unavailable"));
        assert!(!html.contains("<img src"));
    }

    #[test]
    fn test_anonymous_feed_has_no_composer() {
        assert!(!feed(&store(), &[], 1, None, false).contains("createPost(event)\""));
    }
}
