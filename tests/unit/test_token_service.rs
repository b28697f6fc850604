//! Unit tests for the preview token codec (public API surface).

use chrono::Utc;
use report_preview_api::models::controller::PreviewControllerConfig;
use report_preview_api::models::preview::PreviewEntry;
use report_preview_api::services::token_service::PreviewTokenService;
use serde_json::{json, Map};

fn sample_entry() -> PreviewEntry {
    let mut model_data = Map::new();
    model_data.insert(
        "items".to_string(),
        json!([
            {"OrderID": "SO-001000", "Quantity": 5},
            {"OrderID": "SO-001001", "Quantity": 20},
        ]),
    );
    model_data.insert(
        "__previewColumns".to_string(),
        json!([{"key": "OrderID", "label": "Order", "type": "string"}]),
    );
    PreviewEntry {
        id: "11111111-2222-3333-4444-555555555555".to_string(),
        name: "Sales Report".to_string(),
        view_xml: "<mvc:View xmlns:mvc=\"sap.ui.core.mvc\" />".to_string(),
        controller: PreviewControllerConfig::default(),
        model_data,
        created_at: "2026-08-24T10:00:00.000Z".to_string(),
    }
}

#[test]
fn test_round_trip_preserves_payload() {
    let service = PreviewTokenService::new("round-trip-secret");
    let entry = sample_entry();

    let token = service.create_token(&entry).unwrap();
    let claims = service.parse_token(&token).unwrap();

    assert_eq!(claims.name, entry.name);
    assert_eq!(claims.view_xml, entry.view_xml);
    assert_eq!(claims.controller, entry.controller);
    assert_eq!(claims.model_data, entry.model_data);
    assert_eq!(claims.created_at, entry.created_at);
    assert!(claims.exp > Utc::now().timestamp());
}

#[test]
fn test_token_is_url_safe() {
    let service = PreviewTokenService::new("url-safe-secret");
    let token = service.create_token(&sample_entry()).unwrap();

    assert_eq!(token.matches('.').count(), 1);
    assert!(token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')));
}

#[test]
fn test_expired_token_is_not_found() {
    let service = PreviewTokenService::new("expiry-secret");
    let token = service
        .create_token_with_ttl(&sample_entry(), -10)
        .unwrap();
    assert!(service.parse_token(&token).is_none());
}

#[test]
fn test_wrong_secret_is_not_found() {
    let signer = PreviewTokenService::new("secret-a");
    let verifier = PreviewTokenService::new("secret-b");
    let token = signer.create_token(&sample_entry()).unwrap();
    assert!(verifier.parse_token(&token).is_none());
}

/// Flipping any single character of the token, payload or signature, must
/// make parsing fail.
#[test]
fn test_every_single_character_flip_is_rejected() {
    let service = PreviewTokenService::new("tamper-secret");
    let token = service.create_token(&sample_entry()).unwrap();

    for index in 0..token.len() {
        let mut chars: Vec<char> = token.chars().collect();
        chars[index] = if chars[index] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.into_iter().collect();
        assert!(
            service.parse_token(&tampered).is_none(),
            "flip at index {} was accepted",
            index
        );
    }
}

#[test]
fn test_swapped_segments_rejected() {
    let service = PreviewTokenService::new("swap-secret");
    let token = service.create_token(&sample_entry()).unwrap();
    let (payload, signature) = token.split_once('.').unwrap();
    assert!(service
        .parse_token(&format!("{}.{}", signature, payload))
        .is_none());
}

#[test]
fn test_malformed_shapes_rejected() {
    let service = PreviewTokenService::new("shape-secret");
    for token in ["", ".", "no-dot-at-all", "abc.", ".def", "a.b.c"] {
        assert!(service.parse_token(token).is_none(), "accepted {:?}", token);
    }
}

#[test]
fn test_tokens_for_same_entry_verify_independently() {
    let service = PreviewTokenService::new("multi-secret");
    let entry = sample_entry();
    let first = service.create_token_with_ttl(&entry, 60).unwrap();
    let second = service.create_token_with_ttl(&entry, 120).unwrap();

    // Different expiries sign differently, but both decode to the same payload.
    assert_ne!(first, second);
    let first_claims = service.parse_token(&first).unwrap();
    let second_claims = service.parse_token(&second).unwrap();
    assert_eq!(first_claims.model_data, second_claims.model_data);
    assert!(first_claims.exp < second_claims.exp);
}
