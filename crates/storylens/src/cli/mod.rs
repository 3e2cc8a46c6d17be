//! Command implementations.

pub mod config;
pub mod models;
pub mod story;

/// Port Ollama listens on when an address does not name one.
pub const DEFAULT_OLLAMA_PORT: u16 = 11434;

/// Accept `OLLAMA_HOST`-style addresses such as `localhost`, `0.0.0.0` or
/// `127.0.0.1:11434`: the scheme defaults to http and the port to 11434.
///
/// Text that does not parse as a URL is returned with its scheme added, for
/// config validation to reject.
pub fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim();
    let with_scheme = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{endpoint}")
    };

    let Ok(mut url) = reqwest::Url::parse(&with_scheme) else {
        return with_scheme;
    };
    // `Url::port` is `None` for a scheme's default port, so look at the text.
    if !has_explicit_port(&with_scheme) && url.set_port(Some(DEFAULT_OLLAMA_PORT)).is_err() {
        return with_scheme;
    }
    url.as_str().trim_end_matches('/').to_string()
}

fn has_explicit_port(url: &str) -> bool {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, host_port)| host_port);
    match host_port.rsplit_once(']') {
        Some((_, after)) => after.starts_with(':'),
        None => host_port.contains(':'),
    }
}

/// Create a spinner shown on stderr while waiting on the server.
pub fn create_spinner(message: &str) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    pb
}
