//! Outbound message templates (Telegram HTML)

use teloxide::utils::html::escape;

use crate::entity::{Status, user};

pub const ASK_NAME: &str = "✏️ Enter your name:";
pub const ASK_WHATSAPP: &str = "📱 Enter your WhatsApp number:";
pub const REGISTERED: &str = "✅ Thank you for your time! Your profile will be \
  verified soon. Once verified, we will notify you.";
pub const RENEW_DENIED: &str = "❌ You do not have an active membership to \
  renew. Please contact support.";
pub const HELP: &str = "Use /start to create your account and /renew to \
  extend a verified membership.";

pub const ADMIN_HELP: &str = "\
<b>📋 Admin Commands</b>

<b>Members:</b>
/users - List all registered users
/pending - List users waiting for verification
/info &lt;whatsapp&gt; - Show records for a number
/verify &lt;whatsapp&gt; - Mark as verified and notify
/reject &lt;whatsapp&gt; - Mark as rejected and notify

<b>Link:</b>
/link - Show the link sent to verified users
/setlink [url] - Set (or clear) that link

<b>System:</b>
/stats - Show counts and active sessions
/backup - Send the data file
/help - Show this message";

pub fn welcome(first_name: &str) -> String {
  format!("👋 Hi {}, please create your account.", escape(first_name))
}

/// Reply for a record that already has a settled status.
pub fn status(user: &user::Model) -> String {
  let name = escape(&user.name);
  if user.status == Status::Verified {
    format!("🎉 Dear {name}, your profile is already verified successfully.")
  } else {
    format!(
      "❌ Dear {name}, your profile is already rejected. \
      Please try again with a different WhatsApp number."
    )
  }
}

pub fn renewed(user: &user::Model) -> String {
  format!(
    "🌟 <b>Membership Renewed!</b>\n\n\
    A big thank-you for your renewal! 💖\n\
    Your total days: 🗓️ {} days\n\
    Your journey with us continues, make it amazing! 🚀",
    user.remaining_days
  )
}

/// Sent to the member's chat after an out-of-band status change.
pub fn status_changed(user: &user::Model, link: Option<&str>) -> String {
  let name = escape(&user.name);
  match user.status {
    Status::Verified => {
      let mut text =
        format!("🎉 Dear {name}, your profile has been verified successfully!");
      if let Some(link) = link {
        text.push_str(&format!("\n\n🔗 {}", escape(link)));
      }
      text
    }
    Status::Rejected => format!(
      "❌ Dear {name}, your profile has been rejected. \
      Please try again with a different WhatsApp number."
    ),
    Status::Pending => {
      format!("⏳ Dear {name}, your profile is waiting for verification again.")
    }
    Status::Other(ref status) => {
      format!("ℹ️ Dear {name}, your profile status is now {}.", escape(status))
    }
  }
}

pub fn new_registration(user: &user::Model) -> String {
  format!(
    "🆕 <b>New registration</b>\n\
    Name: {}\n\
    WhatsApp: <code>{}</code>\n\
    Chat: <code>{}</code>\n\n\
    /verify {} or /reject {}",
    escape(&user.name),
    escape(&user.whatsapp),
    chat(user),
    escape(&user.whatsapp),
    escape(&user.whatsapp),
  )
}

pub fn user_line(user: &user::Model) -> String {
  format!(
    "{} {} | <code>{}</code> | {}d",
    user.status.icon(),
    escape(&user.name),
    escape(&user.whatsapp),
    user.remaining_days
  )
}

pub fn user_list(title: &str, users: &[user::Model]) -> String {
  if users.is_empty() {
    return format!("<b>{title}</b>\n\nNo users.");
  }

  let mut text = format!("<b>{title} ({})</b>\n\n", users.len());
  for user in users {
    text.push_str(&user_line(user));
    text.push('\n');
  }
  text
}

pub fn user_info(user: &user::Model) -> String {
  format!(
    "👤 <b>User Info</b>\n\
    Name: {}\n\
    WhatsApp: <code>{}</code>\n\
    Chat: <code>{}</code>\n\
    Status: {} {}\n\
    Remaining: {} days\n\
    Registered: {}",
    escape(&user.name),
    escape(&user.whatsapp),
    chat(user),
    user.status.icon(),
    escape(user.status.as_str()),
    user.remaining_days,
    user.last_verified.map_or("-".into(), crate::utils::format_date),
  )
}

fn chat(user: &user::Model) -> String {
  user.chat_id.map_or("-".into(), |id| id.to_string())
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;

  fn user(name: &str, status: Status, days: u32) -> user::Model {
    user::Model {
      name: name.into(),
      whatsapp: "+100".into(),
      chat_id: Some(1),
      status,
      remaining_days: days,
      last_verified: NaiveDate::from_ymd_opt(2024, 3, 1),
      extra: json::Map::new(),
    }
  }

  #[test]
  fn test_renewed_contains_total() {
    assert!(renewed(&user("Alice", Status::Verified, 35)).contains("35 days"));
  }

  #[test]
  fn test_status_messages() {
    let verified = status(&user("Alice", Status::Verified, 0));
    assert!(verified.contains("Dear Alice"));
    assert!(verified.contains("verified"));

    let rejected = status(&user("Bob", Status::Rejected, 0));
    assert!(rejected.contains("different WhatsApp number"));
  }

  #[test]
  fn test_names_are_escaped() {
    let text = status(&user("<b>x</b>", Status::Verified, 0));
    assert!(text.contains("&lt;b&gt;x&lt;/b&gt;"));
    assert!(welcome("A&B").contains("A&amp;B"));
  }

  #[test]
  fn test_verified_notice_carries_link() {
    let member = user("Alice", Status::Verified, 0);
    let notice = status_changed(&member, Some("https://x.y/z"));
    assert!(notice.contains("https://x.y/z"));
    assert!(!status_changed(&member, None).contains("🔗"));
  }

  #[test]
  fn test_user_list() {
    let users = vec![
      user("Alice", Status::Verified, 30),
      user("Bob", Status::Pending, 0),
    ];
    let text = user_list("Users", &users);

    assert!(text.starts_with("<b>Users (2)</b>"));
    assert!(text.contains("✅ Alice | <code>+100</code> | 30d"));
    assert!(text.contains("⏳ Bob"));
    assert!(user_list("Users", &[]).contains("No users."));
  }

  #[test]
  fn test_user_info_date() {
    let info = user_info(&user("Alice", Status::Pending, 0));
    assert!(info.contains("01.03.2024"));
  }

  #[test]
  fn test_user_info_hand_edited_record() {
    let mut member = user("Alice", Status::Other("<vip>".into()), 0);
    member.chat_id = None;
    member.last_verified = None;

    let info = user_info(&member);
    assert!(info.contains("Chat: <code>-</code>"));
    assert!(info.contains("❔ &lt;vip&gt;"));
    assert!(info.contains("Registered: -"));
  }
}
