//! Rendering of resolved profiles
//!
//! Turns a cached row into the JSON payload, the userpic redirect target or
//! the info page served to callers.

use serde::Serialize;

use crate::data::CachedProfile;
use crate::identity::Service;

/// Text shown by the info view when nothing can be displayed
pub const UNAVAILABLE: &str = "Unavailable.";

#[derive(Debug, Serialize)]
struct JsonProfile<'a> {
    username: &'a str,
    name: &'a str,
    image: &'a str,
    refreshdate: i64,
}

/// Rows that can be shown: present, not blocked, and not completely empty
fn displayable(profile: Option<&CachedProfile>) -> Option<&CachedProfile> {
    profile.filter(|p| !p.blocked && !p.is_empty())
}

/// JSON payload for a profile, or `null` when absent, blocked or empty.
///
/// With a callback name the payload is wrapped as `callback(...)`. The name
/// is inserted verbatim.
pub fn json_payload(profile: Option<&CachedProfile>, callback: Option<&str>) -> String {
    let body = match displayable(profile) {
        Some(p) => serde_json::to_string(&JsonProfile {
            username: &p.identity,
            name: &p.display_name,
            image: &p.image_url,
            refreshdate: p.refreshed_at,
        })
        .unwrap_or_else(|_| "null".to_string()),
        None => "null".to_string(),
    };

    match callback {
        Some(name) if !name.is_empty() => format!("{name}({body})"),
        _ => body,
    }
}

/// Where to redirect for a userpic: the cached image, or `default` when the
/// profile is absent, blocked or has no image.
pub fn image_target<'a>(profile: Option<&'a CachedProfile>, default: &'a str) -> &'a str {
    match profile {
        Some(p) if !p.blocked && !p.image_url.is_empty() => p.image_url.as_str(),
        _ => default,
    }
}

/// Everything shown on a user's info page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub username: String,
    pub name: String,
    pub image: String,
    pub userlink: String,
    pub profilelink: String,
}

/// Info page data; `None` when the profile is absent, blocked or has no image.
pub fn user_info(profile: Option<&CachedProfile>, service: &Service) -> Option<UserInfo> {
    let p = profile.filter(|p| !p.blocked && !p.image_url.is_empty())?;
    Some(UserInfo {
        username: p.identity.clone(),
        name: p.display_name.clone(),
        image: p.image_url.clone(),
        userlink: service.userlink(&p.identity),
        profilelink: service.profilelink(&p.identity),
    })
}

/// Minimal HTML fragment for an info page.
pub fn render_info_html(info: &UserInfo) -> String {
    let username = escape_html(&info.username);
    let name = escape_html(&info.name);
    format!(
        concat!(
            "<div class=\"ljuser\">\n",
            "  <img src=\"{image}\" alt=\"{username}\"/>\n",
            "  <a href=\"{userlink}\">{username}</a>\n",
            "  <span class=\"name\">{name}</span>\n",
            "  <a href=\"{profilelink}\">profile</a>\n",
            "</div>\n",
        ),
        image = escape_html(&info.image),
        username = username,
        userlink = escape_html(&info.userlink),
        name = name,
        profilelink = escape_html(&info.profilelink),
    )
}

/// Summary line for the index view.
pub fn index_summary(count: u64) -> String {
    match count {
        1 => "1 user cached.".to_string(),
        n => format!("{n} users cached."),
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jace() -> CachedProfile {
        CachedProfile {
            identity: "jace".to_string(),
            display_name: "Jace \"J\" Example".to_string(),
            image_url: "http://userpic.livejournal.com/1/2".to_string(),
            blocked: false,
            refreshed_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_json_payload_shape() {
        let json = json_payload(Some(&jace()), None);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["username"], "jace");
        assert_eq!(value["name"], "Jace \"J\" Example");
        assert_eq!(value["image"], "http://userpic.livejournal.com/1/2");
        assert_eq!(value["refreshdate"], 1_700_000_000);
        assert!(json.starts_with("{\"username\":"));
    }

    #[test]
    fn test_json_payload_null_cases() {
        let blocked = CachedProfile {
            blocked: true,
            ..jace()
        };
        let empty = CachedProfile::empty("gone", 1);

        assert_eq!(json_payload(None, None), "null");
        assert_eq!(json_payload(Some(&blocked), None), "null");
        assert_eq!(json_payload(Some(&empty), None), "null");
    }

    #[test]
    fn test_json_payload_with_only_name_is_shown() {
        let named = CachedProfile {
            image_url: String::new(),
            ..jace()
        };
        assert_ne!(json_payload(Some(&named), None), "null");
    }

    #[test]
    fn test_json_payload_callback_wrapping() {
        assert_eq!(json_payload(None, Some("cb")), "cb(null)");

        let wrapped = json_payload(Some(&jace()), Some("handle"));
        assert!(wrapped.starts_with("handle({"));
        assert!(wrapped.ends_with("})"));

        assert_eq!(json_payload(None, Some("")), "null");
    }

    #[test]
    fn test_image_target() {
        let default = "http://default/user.gif";
        let profile = jace();
        let blocked = CachedProfile {
            blocked: true,
            ..jace()
        };
        let no_image = CachedProfile {
            image_url: String::new(),
            ..jace()
        };

        assert_eq!(image_target(Some(&profile), default), "http://userpic.livejournal.com/1/2");
        assert_eq!(image_target(Some(&blocked), default), default);
        assert_eq!(image_target(Some(&no_image), default), default);
        assert_eq!(image_target(None, default), default);
    }

    #[test]
    fn test_user_info() {
        let service = Service::default();
        let info = user_info(Some(&jace()), &service).unwrap();

        assert_eq!(info.userlink, "http://jace.livejournal.com/");
        assert_eq!(info.profilelink, "http://jace.livejournal.com/profile");

        let no_image = CachedProfile {
            image_url: String::new(),
            ..jace()
        };
        assert!(user_info(Some(&no_image), &service).is_none());
        assert!(user_info(None, &service).is_none());
    }

    #[test]
    fn test_render_info_html_escapes() {
        let info = user_info(Some(&jace()), &Service::default()).unwrap();
        let html = render_info_html(&info);

        assert!(html.contains("Jace &quot;J&quot; Example"));
        assert!(html.contains("href=\"http://jace.livejournal.com/profile\""));
        assert!(!html.contains("\"J\""));
    }

    #[test]
    fn test_index_summary() {
        assert_eq!(index_summary(0), "0 users cached.");
        assert_eq!(index_summary(1), "1 user cached.");
        assert_eq!(index_summary(42), "42 users cached.");
    }
}
