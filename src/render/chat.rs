use super::layout::{avatar, esc};
use crate::chat::model::{ConversationSummary, MessageView};
use crate::chat::service::POLL_INTERVAL_MS;
use crate::uploads::UploadStore;
use crate::user::model::PublicUser;

/// Body of `/chat`: existing conversations plus everyone else to start one with
pub fn inbox(
    uploads: &UploadStore,
    conversations: &[ConversationSummary],
    people: &[PublicUser],
) -> String {
    let mut html = String::from(r#"<div class="card"><h1>Messages</h1>"#);

    if conversations.is_empty() {
        html.push_str(r#"<p class="empty-state">No conversations yet. Pick someone below to say hi.</p>"#);
    }
    html.push_str("<ul>");
    for convo in conversations {
        let unread = if convo.unread_count > 0 {
            format!(r#" <span class="badge">{}</span>"#, convo.unread_count)
        } else {
            String::new()
        };
        html.push_str(&format!(
            r#"<li><a href="/chat/{}">{} <strong>{}</strong>{}</a> <span class="meta">{} · {}</span></li>"#,
            convo.counterpart_id,
            avatar(
                uploads,
                &convo.initials,
                &convo.avatar_color,
                convo.profile_picture.as_deref(),
                "small"
            ),
            esc(&convo.counterpart_name),
            unread,
            esc(&convo.last_message),
            convo.last_message_at.format("%b %d %I:%M %p")
        ));
    }
    html.push_str("</ul></div>");

    html.push_str(r#"<div class="card"><h2>People</h2><ul>"#);
    for person in people {
        html.push_str(&format!(
            r#"<li><a href="/chat/{}">{} {}</a> <span class="meta">{}</span></li>"#,
            person.id,
            avatar(
                uploads,
                &person.initials,
                &person.avatar_color,
                person.profile_picture.as_deref(),
                "small"
            ),
            esc(&person.name),
            esc(&person.status)
        ));
    }
    html.push_str("</ul></div>");
    html
}

fn conversation_script(viewer_id: i64, counterpart_id: i64, last_id: i64) -> String {
    format!(
        r#"
const viewerId = {viewer};
const counterpartId = {counterpart};
let lastMessageId = {last_id};
const box = document.getElementById('messages');

function chatRequest(fields) {{
  const body = new URLSearchParams(fields);
  return fetch('/api/chat.php', {{ method: 'POST', body }}).then(res => res.json());
}}
function appendMessage(m) {{
  if (m.id <= lastMessageId) return;
  lastMessageId = m.id;
  const item = document.createElement('div');
  item.className = m.sender_id === viewerId ? 'message mine' : 'message';
  const text = document.createElement('p');
  text.textContent = m.message;
  const meta = document.createElement('span');
  meta.className = 'meta';
  meta.textContent = m.time;
  item.appendChild(text);
  item.appendChild(meta);
  box.appendChild(item);
  box.scrollTop = box.scrollHeight;
}}
async function poll() {{
  try {{
    const data = await chatRequest({{ action: 'get_messages', receiver_id: counterpartId, last_id: lastMessageId }});
    const incoming = (data.messages || []).filter(m => m.sender_id === counterpartId && m.id > lastMessageId);
    (data.messages || []).forEach(appendMessage);
    if (incoming.length > 0) {{ chatRequest({{ action: 'mark_read', receiver_id: counterpartId }}); }}
  }} catch (e) {{ console.error(e); }}
}}
async function sendMessage(event) {{
  event.preventDefault();
  const input = event.target.elements.message;
  const text = input.value.trim();
  if (!text) return false;
  const data = await chatRequest({{ action: 'send_message', receiver_id: counterpartId, message: text }});
  if (data.success) {{ input.value = ''; poll(); }} else {{ alert(data.error); }}
  return false;
}}
box.scrollTop = box.scrollHeight;
chatRequest({{ action: 'mark_read', receiver_id: counterpartId }});
setInterval(poll, {interval});
"#,
        viewer = viewer_id,
        counterpart = counterpart_id,
        last_id = last_id,
        interval = POLL_INTERVAL_MS,
    )
}

/// Body of `/chat/:user_id`; history is rendered server side, the script polls from its last id
pub fn conversation(
    uploads: &UploadStore,
    viewer_id: i64,
    counterpart: &PublicUser,
    history: &[MessageView],
) -> String {
    let last_id = history.iter().map(|m| m.id).max().unwrap_or(0);

    let mut html = format!(
        r#"<div class="card"><header>{} <strong>{}</strong> <span class="meta">{}</span> <a href="/chat">Back</a></header><div class="messages" id="messages">"#,
        avatar(
            uploads,
            &counterpart.initials,
            &counterpart.avatar_color,
            counterpart.profile_picture.as_deref(),
            ""
        ),
        esc(&counterpart.name),
        esc(&counterpart.status)
    );

    for message in history {
        let class = if message.sender_id == viewer_id {
            "message mine"
        } else {
            "message"
        };
        html.push_str(&format!(
            r#"<div class="{}"><p>{}</p><span class="meta">{}</span></div>"#,
            class,
            esc(&message.message),
            esc(&message.time)
        ));
    }

    html.push_str(&format!(
        r#"</div><form onsubmit="return sendMessage(event)"><input name="message" autocomplete="off" placeholder="Type a message"><button type="submit">Send</button></form></div><script>{}</script>"#,
        conversation_script(viewer_id, counterpart.id, last_id)
    ));
    html
}
