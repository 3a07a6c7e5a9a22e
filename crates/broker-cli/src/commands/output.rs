//! 작업 결과 출력.

use broker_service::{HealthReport, Outcome, StatusReport};
use serde::Serialize;

/// 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn new(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Text
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

fn mark(ok: bool) -> &'static str {
    if ok {
        "✅"
    } else {
        "❌"
    }
}

/// 작업 결과를 문자열로 렌더링합니다.
pub fn render_outcome(outcome: &Outcome, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return to_json(outcome);
    }

    let mut lines = vec![format!("{} {}", mark(outcome.ok), outcome.message)];
    for error in &outcome.errors {
        lines.push(format!("  - {error}"));
    }
    if let Some(url) = &outcome.redirect_url {
        lines.push(format!("  브라우저에서 로그인하세요: {url}"));
    }
    if outcome.auth_error {
        lines.push("  재연결이 필요합니다: broker connect <broker> -u <user>".to_string());
    }
    if let Some(data) = &outcome.data {
        lines.push(to_json(data));
    }
    lines.join("\n")
}

/// 연결 상태를 문자열로 렌더링합니다.
pub fn render_status(report: &StatusReport, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return to_json(report);
    }

    let mut lines = vec![format!("{} {}", mark(report.connected), report.message)];
    if let Some(session) = &report.session {
        lines.push(format!("  세션 ID: {}", session.session_id));
        lines.push(format!("  생성: {}", session.created_at));
        lines.push(format!("  최근 활동: {}", session.last_activity));
        lines.push(format!("  만료: {}", session.expires_at));
    }
    lines.join("\n")
}

/// 상태 점검 결과를 문자열로 렌더링합니다.
pub fn render_health(report: &HealthReport, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return to_json(report);
    }

    let s = &report.sessions;
    [
        format!("저장된 계정: {}", report.credentials_count),
        format!(
            "세션: 전체 {} / 활성 {} / 만료 {} / 무효화 {}",
            s.total, s.active, s.expired, s.invalidated
        ),
        format!("점검 시각: {}", report.timestamp),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_outcome_lists_field_errors() {
        let mut outcome = Outcome::failure("validation", "Validation failed: a. b.");
        outcome.errors = vec!["a.".to_string(), "b.".to_string()];

        let text = render_outcome(&outcome, OutputFormat::Text);
        assert!(text.starts_with("❌ Validation failed"));
        assert!(text.contains("  - a."));
        assert!(text.contains("  - b."));
    }

    #[test]
    fn test_redirect_is_printed() {
        let outcome = Outcome::success("Open the login page")
            .with_redirect("https://kite.zerodha.com/connect/login?api_key=k&v=3");
        let text = render_outcome(&outcome, OutputFormat::Text);
        assert!(text.contains("api_key=k&v=3"));
    }

    #[test]
    fn test_json_outcome_is_parseable() {
        let outcome = Outcome::auth_failure("expired");
        let json: serde_json::Value =
            serde_json::from_str(&render_outcome(&outcome, OutputFormat::Json)).unwrap();
        assert_eq!(json["auth_error"], true);
        assert_eq!(json["ok"], false);
    }
}
