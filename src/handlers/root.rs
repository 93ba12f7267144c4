//! Root endpoint handler for the landing page.

use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use tracing::{debug, instrument};

use crate::state::SharedState;

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");

    let version = env!("CARGO_PKG_VERSION");

    let uptime_secs = state.start_time.elapsed().as_secs();
    let hours = uptime_secs / 3600;
    let minutes = (uptime_secs % 3600) / 60;
    let seconds = uptime_secs % 60;
    let uptime_str = format!("{}h {}m {}s", hours, minutes, seconds);

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Slurm REST Exporter</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            margin: 0;
            padding: 20px;
            background: #f5f5f5;
            line-height: 1.6;
        }}
        .container {{
            max-width: 900px;
            margin: 0 auto;
            background: white;
            padding: 40px;
            border-radius: 8px;
            box-shadow: 0 2px 8px rgba(0,0,0,0.1);
        }}
        h1 {{
            color: #333;
            border-bottom: 3px solid #2e7d32;
            padding-bottom: 15px;
        }}
        .info {{
            background: #e9ecef;
            padding: 15px;
            border-radius: 4px;
            margin: 20px 0;
        }}
        .endpoint-list {{
            list-style: none;
            padding: 0;
        }}
        .endpoint-list li {{
            margin: 15px 0;
            padding: 12px;
            background: #f8f9fa;
            border-left: 4px solid #2e7d32;
        }}
        .endpoint-list a {{
            color: #2e7d32;
            font-weight: 600;
            text-decoration: none;
        }}
        code {{
            background: #e9ecef;
            padding: 2px 6px;
            border-radius: 3px;
        }}
    </style>
</head>
<body>
<div class="container">
    <h1>Slurm REST Exporter</h1>
    <div class="info">
        Version <code>{version}</code> | Uptime <code>{uptime}</code> |
        slurmrestd API <code>{api_version}</code> (Slurm {release})
    </div>

    <h2>Available Endpoints</h2>
    <ul class="endpoint-list">
        <li>
            <a href="/metrics">/metrics</a>
            <div>Prometheus metrics, scraped live from slurmrestd</div>
        </li>
        <li>
            <a href="/health">/health</a>
            <div>Exporter health and scrape statistics (text)</div>
        </li>
        <li>
            <a href="/config">/config</a>
            <div>Active runtime configuration (read-only, token redacted)</div>
        </li>
    </ul>
</div>
</body>
</html>"#,
        version = version,
        uptime = uptime_str,
        api_version = state.scrape_options.api_version,
        release = state.scrape_options.api_version.slurm_release(),
    );

    Html(html)
}
