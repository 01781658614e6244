use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use tollgate_core::{AdmissionDecision, LimitType, QuotaDecision};

/// The advisory limit header for the granularity that produced a decision.
fn limit_header_name(limit_type: LimitType) -> &'static str {
    match limit_type {
        LimitType::Minute => "X-RateLimit-Limit-Minute",
        LimitType::Hour => "X-RateLimit-Limit-Hour",
        LimitType::Day => "X-RateLimit-Limit-Day",
        LimitType::Quota => "X-RateLimit-Limit-Quota",
    }
}

/// Add advisory rate-limit headers to a successful response.
///
/// Exempt and fail-open decisions advertise no limits, so the response
/// passes through untouched.
pub fn annotate_response(response: Response, decision: &AdmissionDecision) -> Response {
    if !decision.is_advisory() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    parts
        .headers
        .insert(limit_header_name(decision.limit_type), decision.limit.into());
    parts
        .headers
        .insert("X-RateLimit-Remaining", decision.remaining.into());
    parts.headers.insert(
        "X-RateLimit-Tier",
        HeaderValue::from_static(decision.tier.as_str()),
    );
    Response::from_parts(parts, body)
}

/// Build the 429 response for a window-limit denial.
pub fn too_many_requests(decision: &AdmissionDecision) -> Response {
    let retry_after = decision.retry_after.unwrap_or(1).max(1);
    let body = serde_json::json!({
        "error": "rate_limited",
        "message": format!(
            "{} request limit exceeded for tier {}",
            decision.limit_type, decision.tier
        ),
        "retry_after": retry_after,
        "limit_type": decision.limit_type.as_str(),
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, axum::Json(body)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::RETRY_AFTER, retry_after.into());
    headers.insert(limit_header_name(decision.limit_type), decision.limit.into());
    headers.insert("X-RateLimit-Remaining", 0u32.into());
    headers.insert(
        "X-RateLimit-Tier",
        HeaderValue::from_static(decision.tier.as_str()),
    );
    response
}

/// Build the 429 response for an exhausted feature quota.
pub fn quota_exhausted(feature: &str, decision: &QuotaDecision) -> Response {
    let retry_after = u64::try_from((decision.reset_at - Utc::now()).num_seconds())
        .unwrap_or(1)
        .max(1);
    let body = serde_json::json!({
        "error": "quota_exhausted",
        "message": format!("daily quota for {feature} exhausted"),
        "retry_after": retry_after,
        "limit_type": LimitType::Quota.as_str(),
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, axum::Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, retry_after.into());
    response
}

#[cfg(test)]
mod tests {
    use tollgate_core::Tier;

    use super::*;

    fn denial() -> AdmissionDecision {
        AdmissionDecision {
            allowed: false,
            limit: 10,
            remaining: 0,
            reset_at: Utc::now(),
            retry_after: Some(60),
            limit_type: LimitType::Minute,
            tier: Tier::Free,
        }
    }

    #[test]
    fn denial_response_carries_retry_after_and_headers() {
        let response = too_many_requests(&denial());
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let headers = response.headers();
        assert_eq!(headers.get(header::RETRY_AFTER).unwrap(), "60");
        assert_eq!(headers.get("X-RateLimit-Limit-Minute").unwrap(), "10");
        assert_eq!(headers.get("X-RateLimit-Remaining").unwrap(), "0");
        assert_eq!(headers.get("X-RateLimit-Tier").unwrap(), "free");
    }

    #[test]
    fn unlimited_decisions_annotate_nothing() {
        let response = annotate_response(
            Response::new(axum::body::Body::empty()),
            &AdmissionDecision::unlimited(Tier::Free),
        );
        assert!(response.headers().get("X-RateLimit-Remaining").is_none());
        assert!(response.headers().get("X-RateLimit-Tier").is_none());
    }

    #[test]
    fn advisory_decisions_annotate_limit_and_tier() {
        let decision = AdmissionDecision {
            allowed: true,
            limit: 100,
            remaining: 97,
            reset_at: Utc::now(),
            retry_after: None,
            limit_type: LimitType::Hour,
            tier: Tier::Top,
        };
        let response = annotate_response(Response::new(axum::body::Body::empty()), &decision);
        let headers = response.headers();
        assert_eq!(headers.get("X-RateLimit-Limit-Hour").unwrap(), "100");
        assert_eq!(headers.get("X-RateLimit-Remaining").unwrap(), "97");
        assert_eq!(headers.get("X-RateLimit-Tier").unwrap(), "top");
    }

    #[test]
    fn quota_denial_reports_time_to_fresh_bucket() {
        let decision = QuotaDecision {
            allowed: false,
            used: 6,
            remaining: 0,
            reset_at: Utc::now() + chrono::Duration::hours(2),
        };
        let response = quota_exhausted("summarize", &decision);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry: u64 = response
            .headers()
            .get(header::RETRY_AFTER)
            .unwrap()
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!(retry > 7_000 && retry <= 7_200);
    }
}
