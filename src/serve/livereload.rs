// src/serve/livereload.rs

//! Live-reload messages and their fan-out to connected browsers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub const LIVERELOAD_PATH: &str = "/__assetpipe/livereload";
pub const CLIENT_SCRIPT_PATH: &str = "/__assetpipe/client.js";

/// Message pushed over the live-reload WebSocket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ReloadMessage {
    /// Swap a stylesheet in place. `path` is the URL path under the output
    /// root, e.g. `/styles/main.css`.
    Inject { path: String },
    /// Full page reload.
    Reload { path: String },
    /// Sent once when a client connects.
    Connected,
}

impl ReloadMessage {
    /// Message for a changed file, given its path relative to the output
    /// root. Source maps never trigger anything.
    pub fn for_changed_output(rel: &str) -> Option<Self> {
        let rel = rel.trim_start_matches('/');
        if rel.is_empty() || rel.ends_with(".map") {
            return None;
        }
        let path = format!("/{rel}");
        if rel.ends_with(".css") {
            Some(ReloadMessage::Inject { path })
        } else {
            Some(ReloadMessage::Reload { path })
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            ReloadMessage::Inject { path } | ReloadMessage::Reload { path } => Some(path),
            ReloadMessage::Connected => None,
        }
    }
}

/// Broadcasts reload messages to every connected client.
#[derive(Debug, Clone)]
pub struct LiveReloadHub {
    tx: broadcast::Sender<ReloadMessage>,
}

impl LiveReloadHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(100);
        Self { tx }
    }

    /// Returns how many clients received the message.
    pub fn push(&self, message: ReloadMessage) -> usize {
        self.tx.send(message).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for LiveReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Browser side of the live-reload channel.
pub fn client_script() -> String {
    format!(
        r#"(function () {{
  var scheme = location.protocol === "https:" ? "wss://" : "ws://";
  var socket = new WebSocket(scheme + location.host + "{LIVERELOAD_PATH}");
  function swap(path) {{
    var links = document.querySelectorAll('link[rel="stylesheet"]');
    var matched = false;
    links.forEach(function (link) {{
      var url = new URL(link.href, location.href);
      if (url.pathname.endsWith(path)) {{
        matched = true;
        url.searchParams.set("assetpipe", Date.now());
        link.href = url.toString();
      }}
    }});
    if (!matched) {{
      location.reload();
    }}
  }}
  socket.onmessage = function (event) {{
    var message = JSON.parse(event.data);
    if (message.type === "inject") {{
      swap(message.path);
    }} else if (message.type === "reload") {{
      location.reload();
    }}
  }};
}})();
"#
    )
}

/// Insert the client `<script>` tag before `</body>`, or append it when the
/// document has no body close tag.
pub fn inject_client_tag(html: &str) -> String {
    let tag = format!(r#"<script src="{CLIENT_SCRIPT_PATH}"></script>"#);
    match html.rfind("</body>").or_else(|| html.rfind("</BODY>")) {
        Some(index) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..index]);
            out.push_str(&tag);
            out.push_str(&html[index..]);
            out
        }
        None => format!("{html}{tag}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_is_injected_everything_else_reloads() {
        assert_eq!(
            ReloadMessage::for_changed_output("styles/main.css"),
            Some(ReloadMessage::Inject { path: "/styles/main.css".into() })
        );
        assert_eq!(
            ReloadMessage::for_changed_output("scripts/main.js"),
            Some(ReloadMessage::Reload { path: "/scripts/main.js".into() })
        );
        assert_eq!(ReloadMessage::for_changed_output("styles/main.css.map"), None);
    }

    #[test]
    fn messages_serialize_with_a_type_tag() {
        let json = serde_json::to_string(&ReloadMessage::Inject { path: "/a.css".into() })
            .expect("serialize");
        assert_eq!(json, r#"{"type":"inject","path":"/a.css"}"#);
        let json = serde_json::to_string(&ReloadMessage::Connected).expect("serialize");
        assert_eq!(json, r#"{"type":"connected"}"#);
    }

    #[test]
    fn client_tag_lands_before_body_close() {
        let html = "<html><body><p>hi</p></body></html>";
        let out = inject_client_tag(html);
        assert_eq!(
            out,
            r#"<html><body><p>hi</p><script src="/__assetpipe/client.js"></script></body></html>"#
        );
        assert!(inject_client_tag("<p>fragment</p>").ends_with("</script>"));
    }

    #[test]
    fn hub_counts_subscribers() {
        let hub = LiveReloadHub::new();
        assert_eq!(hub.push(ReloadMessage::Connected), 0);
        let mut rx = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(hub.push(ReloadMessage::Connected), 1);
        assert_eq!(rx.try_recv().expect("delivered"), ReloadMessage::Connected);
    }
}
