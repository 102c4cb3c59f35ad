// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal-transition message template.

use chrono::Utc;
use tf_core::{last_n_lines, TaskStatus};

/// Lines of log tail embedded in the message body.
const LOG_TAIL_LINES: usize = 10;

/// A rendered notification ready for an adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct NotifyMessage {
    pub title: String,
    pub content: String,
}

fn status_style(status: TaskStatus) -> (&'static str, &'static str, &'static str) {
    match status {
        TaskStatus::Completed => ("✅", "Task completed", "#22c55e"),
        TaskStatus::Failed => ("❌", "Task failed", "#ef4444"),
        TaskStatus::Stopped => ("⏹️", "Task stopped", "#f59e0b"),
        _ => ("❓", "Status unknown", "#6b7280"),
    }
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn format_duration(duration_secs: Option<i64>) -> String {
    match duration_secs {
        Some(secs) if secs >= 0 => {
            let hours = secs / 3600;
            let minutes = (secs % 3600) / 60;
            if hours > 0 {
                format!("{hours}h {minutes}m")
            } else {
                format!("{minutes}m")
            }
        }
        _ => "unknown".to_string(),
    }
}

/// Render the push message for a terminal task transition.
///
/// `log_tail_raw` is the unfiltered tail of the task's log file; the last
/// ten sanitised lines end up in the body.
pub fn task_message(
    task_name: &str,
    status: TaskStatus,
    duration_secs: Option<i64>,
    error_message: Option<&str>,
    log_tail_raw: &str,
) -> NotifyMessage {
    let (icon, status_text, color) = status_style(status);
    let title = format!("{icon} {task_name} - {status_text}");

    let cleaned = tf_core::collapse_progress_lines(log_tail_raw);
    let log_tail = if cleaned.trim().is_empty() {
        "(log unavailable)".to_string()
    } else {
        last_n_lines(cleaned.trim_end(), LOG_TAIL_LINES)
    };
    let log_tail_escaped = html_escape(&log_tail);

    let error_html = match error_message {
        Some(error) => format!(
            "<div style='border: 2px solid #ef4444; padding: 12px; border-radius: 4px; \
             margin-bottom: 16px;'><strong style='color: #ef4444;'>❌ Error:</strong><br>\
             <pre style='margin: 8px 0 0 0; white-space: pre-wrap; color: #b91c1c;'>{}</pre></div>",
            html_escape(error)
        ),
        None => String::new(),
    };

    let finished_at = Utc::now().format("%Y-%m-%d %H:%M:%S");
    let duration = format_duration(duration_secs);

    let content = format!(
        r#"<div style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; padding: 16px; max-width: 800px;">
    <div style="border-left: 4px solid {color}; padding: 12px; margin-bottom: 16px; border-radius: 4px; border: 1px solid {color};">
        <h2 style="margin: 0; color: {color};">{icon} {status_text}</h2>
        <p style="margin: 8px 0 0 0;"><strong style="color: {color};">{name}</strong></p>
    </div>

    <table style="width: 100%; border-collapse: collapse; margin-bottom: 16px;">
        <tr>
            <td style="padding: 8px 0; color: #6b7280;">⏱ Duration</td>
            <td style="padding: 8px 0;"><strong>{duration}</strong></td>
        </tr>
        <tr>
            <td style="padding: 8px 0; color: #6b7280;">🕐 Finished</td>
            <td style="padding: 8px 0;"><strong>{finished_at}</strong></td>
        </tr>
    </table>

    {error_html}

    <div style="margin-top: 16px;">
        <h3 style="margin: 0 0 8px 0;">📄 Log tail (last {tail_lines} lines)</h3>
        <div style="background: #1e293b; border-radius: 4px; overflow-x: auto; max-width: 100%;">
            <pre style="color: #e2e8f0; padding: 12px; margin: 0; font-family: 'Consolas', 'Monaco', 'Courier New', monospace; font-size: 12px; line-height: 1.6; white-space: pre; overflow-x: auto;">{log_tail}</pre>
        </div>
    </div>

    <p style="color: #9ca3af; font-size: 12px; margin-top: 16px;">
        sent by taskflow
    </p>
</div>"#,
        color = color,
        icon = icon,
        status_text = status_text,
        name = html_escape(task_name),
        duration = duration,
        finished_at = finished_at,
        error_html = error_html,
        tail_lines = LOG_TAIL_LINES,
        log_tail = log_tail_escaped,
    );

    NotifyMessage { title, content }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
