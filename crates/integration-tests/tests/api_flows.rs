//! HTTP-level tests for the JSON API.
//!
//! Each test builds its own router over a fresh memory store, so they run in
//! parallel without a database.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use rust_decimal::Decimal;
use serde_json::json;

use joestar_api::db::{CatalogStore, DiscountStore};
use joestar_integration_tests::{TEST_PASSWORD, TestApp, decimal, discount_code, product};

// ============================================================================
// Health & plumbing
// ============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();

    let health = app.get("/api/health", None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["status"], "OK");
    assert_eq!(health.body["message"], "JOESTAR PEPTIDE API is running");

    let ready = app.get("/api/health/ready", None).await;
    assert_eq!(ready.status, StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_echoed_and_unknown_route_is_json() {
    let app = TestApp::new();

    let request = Request::builder()
        .uri("/api/nope")
        .header("x-request-id", "trace-abc-123")
        .body(Body::empty())
        .unwrap();
    let response = app.send_request(request).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.message(), "Route not found");
    assert_eq!(response.headers["x-request-id"], "trace-abc-123");
    assert_eq!(response.headers["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = TestApp::new();

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.send_request(request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.message().starts_with("Invalid request body"));
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn test_register_login_and_profile() {
    let app = TestApp::new();
    let user = app.register("Rina", None).await;
    assert!(user.redeem_code.starts_with("JOESTAR"));

    let login = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": user.email.to_uppercase(), "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.message(), "Login successful");

    let profile = app.get("/api/auth/profile", Some(&user.token)).await;
    assert_eq!(profile.status, StatusCode::OK);
    assert_eq!(profile.body["user"]["email"], user.email.as_str());

    let wrong = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": user.email, "password": "not-the-password" }),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_registration_rejected() {
    let app = TestApp::new();
    let user = app.register("Rina", None).await;

    let again = app
        .post(
            "/api/auth/register",
            None,
            json!({ "name": "Rina", "email": user.email, "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_protected_routes_require_valid_token() {
    let app = TestApp::new();

    let missing = app.get("/api/auth/profile", None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.message(), "Access token required");

    let bogus = app.get("/api/wishlist", Some("not.a.token")).await;
    assert_eq!(bogus.status, StatusCode::FORBIDDEN);
    assert_eq!(bogus.message(), "Invalid or expired token");

    let user = app.register("Rina", None).await;
    let tampered = format!("{}x", user.token);
    let response = app.get("/api/orders", Some(&tampered)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_change_password() {
    let app = TestApp::new();
    let user = app.register("Rina", None).await;

    let changed = app
        .put(
            "/api/auth/change-password",
            Some(&user.token),
            json!({ "currentPassword": TEST_PASSWORD, "newPassword": "brand-new-secret" }),
        )
        .await;
    assert_eq!(changed.status, StatusCode::OK);

    let old = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": user.email, "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);

    let new = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": user.email, "password": "brand-new-secret" }),
        )
        .await;
    assert_eq!(new.status, StatusCode::OK);
}

// ============================================================================
// Affiliate
// ============================================================================

#[tokio::test]
async fn test_affiliate_referral_scenario() {
    let app = TestApp::new();
    let alice = app.register("Alice", None).await;
    let bob = app.register("Bob", Some(&alice.redeem_code)).await;

    let tracked = app
        .post(
            "/api/affiliate/track",
            Some(&bob.token),
            json!({ "affiliateCode": alice.redeem_code, "orderAmount": 1_000_000 }),
        )
        .await;
    assert_eq!(tracked.status, StatusCode::OK, "{:?}", tracked.body);
    assert_eq!(decimal(&tracked.body["commission"]), Decimal::from(40_000));
    assert_eq!(tracked.body["tier"], "Bronze");
    assert_eq!(tracked.body["tierUpgraded"], false);

    // 60,000 more commission takes lifetime earnings to the Silver threshold
    let upgraded = app
        .post(
            "/api/affiliate/track",
            None,
            json!({ "affiliateCode": alice.redeem_code, "orderAmount": 1_500_000 }),
        )
        .await;
    assert_eq!(upgraded.status, StatusCode::OK);
    assert_eq!(upgraded.body["tier"], "Silver");
    assert_eq!(upgraded.body["tierUpgraded"], true);

    let dashboard = app.get("/api/affiliate/dashboard", Some(&alice.token)).await;
    assert_eq!(dashboard.status, StatusCode::OK);
    assert_eq!(dashboard.body["totalReferrals"], 2);
    assert_eq!(
        decimal(&dashboard.body["affiliate"]["totalEarned"]),
        Decimal::from(100_000)
    );
    assert_eq!(dashboard.body["nextTier"]["nextTier"], "Gold");
    assert_eq!(
        decimal(&dashboard.body["nextTier"]["remaining"]),
        Decimal::from(400_000)
    );
}

#[tokio::test]
async fn test_affiliate_track_rejections() {
    let app = TestApp::new();
    let alice = app.register("Alice", None).await;

    let own = app
        .post(
            "/api/affiliate/track",
            Some(&alice.token),
            json!({ "affiliateCode": alice.redeem_code, "orderAmount": 100_000 }),
        )
        .await;
    assert_eq!(own.status, StatusCode::BAD_REQUEST);

    let unknown = app
        .post(
            "/api/affiliate/track",
            None,
            json!({ "affiliateCode": "JOESTAR0000", "orderAmount": 100_000 }),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let zero = app
        .post(
            "/api/affiliate/track",
            None,
            json!({ "affiliateCode": alice.redeem_code, "orderAmount": 0 }),
        )
        .await;
    assert_eq!(zero.status, StatusCode::BAD_REQUEST);

    let missing = app
        .post(
            "/api/affiliate/track",
            None,
            json!({ "affiliateCode": alice.redeem_code }),
        )
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let oversized = app
        .post(
            "/api/affiliate/track",
            None,
            json!({
                "affiliateCode": alice.redeem_code,
                "orderAmount": "79228162514264337593543950335",
            }),
        )
        .await;
    assert_eq!(oversized.status, StatusCode::BAD_REQUEST);
    assert_eq!(oversized.message(), "Order amount is too large");
}

#[tokio::test]
async fn test_generate_code_is_stable() {
    let app = TestApp::new();
    let alice = app.register("Alice", None).await;

    let generated = app
        .post("/api/affiliate/generate-code", Some(&alice.token), json!({}))
        .await;
    assert_eq!(generated.status, StatusCode::OK);
    assert_eq!(generated.body["redeemCode"], alice.redeem_code.as_str());
}

// ============================================================================
// Discounts
// ============================================================================

#[tokio::test]
async fn test_discount_validate_and_apply_until_exhausted() {
    let app = TestApp::new();
    app.store()
        .insert_discount(&discount_code("TRIO", "percentage", 10, 3))
        .await
        .unwrap();

    let quote = app
        .post(
            "/api/discount/validate",
            None,
            json!({ "code": "trio", "amount": 500_000 }),
        )
        .await;
    assert_eq!(quote.status, StatusCode::OK);
    assert_eq!(quote.body["valid"], true);
    assert_eq!(decimal(&quote.body["discountAmount"]), Decimal::from(50_000));
    assert_eq!(decimal(&quote.body["finalAmount"]), Decimal::from(450_000));

    for _ in 0..3 {
        let applied = app
            .post(
                "/api/discount/apply",
                None,
                json!({ "code": "TRIO", "amount": 500_000 }),
            )
            .await;
        assert_eq!(applied.status, StatusCode::OK);
        assert_eq!(applied.message(), "Discount applied successfully");
    }

    let exhausted = app
        .post(
            "/api/discount/apply",
            None,
            json!({ "code": "TRIO", "amount": 500_000 }),
        )
        .await;
    assert_eq!(exhausted.status, StatusCode::BAD_REQUEST);
    assert_eq!(exhausted.message(), "Discount code usage limit reached");
}

#[tokio::test]
async fn test_fixed_discount_never_goes_negative() {
    let app = TestApp::new();
    app.store()
        .insert_discount(&discount_code("BIG", "fixed", 100_000, 10))
        .await
        .unwrap();

    let quote = app
        .post(
            "/api/discount/validate",
            None,
            json!({ "code": "BIG", "amount": 60_000 }),
        )
        .await;
    assert_eq!(quote.status, StatusCode::OK);
    assert_eq!(decimal(&quote.body["discountAmount"]), Decimal::from(60_000));
    assert_eq!(decimal(&quote.body["finalAmount"]), Decimal::ZERO);

    let unknown = app
        .post(
            "/api/discount/validate",
            None,
            json!({ "code": "NOPE", "amount": 60_000 }),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.message(), "Invalid discount code");
}

#[tokio::test]
async fn test_discount_rejects_amount_past_decimal_range() {
    let app = TestApp::new();
    app.store()
        .insert_discount(&discount_code("TENOFF", "percentage", 10, 10))
        .await
        .unwrap();

    for path in ["/api/discount/validate", "/api/discount/apply"] {
        let response = app
            .post(
                path,
                None,
                json!({ "code": "TENOFF", "amount": "79228162514264337593543950335" }),
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(response.message(), "Amount must be a non-negative number");
    }

    let stored = app.store().find_discount("TENOFF").await.unwrap().unwrap();
    assert_eq!(stored.used_count, 0);
}

// ============================================================================
// Catalog, wishlist, orders
// ============================================================================

#[tokio::test]
async fn test_product_listing_and_detail() {
    let app = TestApp::seeded().await;

    let all = app.get("/api/products", None).await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body["total"], 5);

    let recovery = app.get("/api/products?category=recovery", None).await;
    assert_eq!(recovery.body["total"], 2);

    let by_price = app.get("/api/products?sort=price-low", None).await;
    assert_eq!(by_price.body["products"][0]["id"], "ghk-cu");

    let bad_sort = app.get("/api/products?sort=sideways", None).await;
    assert_eq!(bad_sort.status, StatusCode::BAD_REQUEST);

    let detail = app.get("/api/products/bpc-157", None).await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.body["product"]["name"], "BPC-157");

    let missing = app.get("/api/products/unobtainium", None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.message(), "Product not found");
}

#[tokio::test]
async fn test_wishlist_add_then_remove_restores_state() {
    let app = TestApp::seeded().await;
    let user = app.register("Rina", None).await;
    let token = Some(user.token.as_str());

    let before = app.get("/api/wishlist", token).await;
    assert_eq!(before.body["wishlist"], json!([]));

    let added = app
        .post("/api/wishlist", token, json!({ "productId": "tb-500" }))
        .await;
    assert_eq!(added.status, StatusCode::OK);
    assert_eq!(added.body["wishlist"], json!(["tb-500"]));
    assert_eq!(added.body["products"][0]["name"], "TB-500");

    let duplicate = app
        .post("/api/wishlist", token, json!({ "productId": "tb-500" }))
        .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.message(), "Product already in wishlist");

    let unknown = app
        .post("/api/wishlist", token, json!({ "productId": "unobtainium" }))
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let removed = app.delete("/api/wishlist/tb-500", token).await;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(removed.body["wishlist"], before.body["wishlist"]);

    let again = app.delete("/api/wishlist/tb-500", token).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_order_with_discount_and_affiliate() {
    let app = TestApp::new();
    let store = app.store();
    store
        .upsert_product(&product("bpc-157", "BPC-157", 750_000, true))
        .await
        .unwrap();
    store
        .upsert_product(&product("cjc-1295", "CJC-1295", 700_000, false))
        .await
        .unwrap();
    store
        .insert_discount(&discount_code("SAVE10", "percentage", 10, 5))
        .await
        .unwrap();

    let alice = app.register("Alice", None).await;
    let bob = app.register("Bob", None).await;

    let placed = app
        .post(
            "/api/orders",
            Some(&bob.token),
            json!({
                "customer": { "name": "Bob", "email": bob.email, "address": "Jl. Sudirman 1" },
                "items": [{ "productId": "bpc-157", "quantity": 2 }],
                "discountCode": "save10",
                "affiliateCode": alice.redeem_code,
            }),
        )
        .await;
    assert_eq!(placed.status, StatusCode::CREATED, "{:?}", placed.body);
    let order = &placed.body["order"];
    assert_eq!(decimal(&order["subtotal"]), Decimal::from(1_500_000));
    assert_eq!(decimal(&order["discountAmount"]), Decimal::from(150_000));
    assert_eq!(decimal(&order["total"]), Decimal::from(1_350_000));
    assert_eq!(order["items"][0]["productName"], "BPC-157");
    assert_eq!(placed.body["affiliateCredited"], true);

    let dashboard = app.get("/api/affiliate/dashboard", Some(&alice.token)).await;
    assert_eq!(
        decimal(&dashboard.body["affiliate"]["commission"]),
        Decimal::from(54_000)
    );

    let out_of_stock = app
        .post(
            "/api/orders",
            Some(&bob.token),
            json!({
                "customer": { "name": "Bob", "email": bob.email },
                "items": [{ "productId": "cjc-1295", "quantity": 1 }],
            }),
        )
        .await;
    assert_eq!(out_of_stock.status, StatusCode::BAD_REQUEST);
    assert_eq!(out_of_stock.message(), "CJC-1295 is out of stock");

    let history = app.get("/api/orders", Some(&bob.token)).await;
    assert_eq!(history.status, StatusCode::OK);
    assert_eq!(history.body["orders"].as_array().map(Vec::len), Some(1));
}

// ============================================================================
// Engagement & content
// ============================================================================

#[tokio::test]
async fn test_testimonials_verified_only_when_logged_in() {
    let app = TestApp::seeded().await;
    let user = app.register("Rina", None).await;
    let body = json!({ "name": "Rina", "rating": 5, "text": "Great", "product": "GHK-Cu" });

    let anonymous = app.post("/api/testimonials", None, body.clone()).await;
    assert_eq!(anonymous.status, StatusCode::CREATED);
    assert_eq!(anonymous.body["testimonial"]["verified"], false);
    assert_eq!(anonymous.body["testimonial"]["location"], "Indonesia");

    let member = app.post("/api/testimonials", Some(&user.token), body).await;
    assert_eq!(member.body["testimonial"]["verified"], true);

    let bad_rating = app
        .post(
            "/api/testimonials",
            None,
            json!({ "name": "Rina", "rating": 9, "text": "Great", "product": "GHK-Cu" }),
        )
        .await;
    assert_eq!(bad_rating.status, StatusCode::BAD_REQUEST);

    let list = app.get("/api/testimonials", None).await;
    assert_eq!(list.body["testimonials"].as_array().map(Vec::len), Some(5));
}

#[tokio::test]
async fn test_ebook_download_counts() {
    let app = TestApp::seeded().await;

    let featured = app.get("/api/ebooks?featured=true", None).await;
    assert_eq!(featured.body["ebooks"].as_array().map(Vec::len), Some(1));

    let first = app
        .post("/api/ebooks/peptide-basics/download", None, json!({}))
        .await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["downloadUrl"], "/downloads/peptide-basics.pdf");
    assert_eq!(first.body["downloads"], 1);

    let second = app
        .post("/api/ebooks/peptide-basics/download", None, json!({}))
        .await;
    assert_eq!(second.body["downloads"], 2);

    let missing = app.post("/api/ebooks/nope/download", None, json!({})).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_newsletter_lifecycle() {
    let app = TestApp::new();
    let email = json!({ "email": "fan@example.com" });

    let created = app.post("/api/newsletter/subscribe", None, email.clone()).await;
    assert_eq!(created.status, StatusCode::CREATED);

    let duplicate = app.post("/api/newsletter/subscribe", None, email.clone()).await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.message(), "Email already subscribed");

    let gone = app.post("/api/newsletter/unsubscribe", None, email.clone()).await;
    assert_eq!(gone.status, StatusCode::OK);

    let again = app.post("/api/newsletter/unsubscribe", None, email.clone()).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);

    let back = app.post("/api/newsletter/subscribe", None, email).await;
    assert_eq!(back.status, StatusCode::OK);
    assert_eq!(back.message(), "Subscription reactivated");
}

#[tokio::test]
async fn test_contact_form() {
    let app = TestApp::new();

    let sent = app
        .post(
            "/api/contact",
            None,
            json!({
                "name": "Rina",
                "email": "rina@example.com",
                "subject": "Stock",
                "message": "When is CJC-1295 back?",
            }),
        )
        .await;
    assert_eq!(sent.status, StatusCode::CREATED);

    let incomplete = app
        .post("/api/contact", None, json!({ "name": "Rina" }))
        .await;
    assert_eq!(incomplete.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_blog_hides_drafts() {
    let app = TestApp::seeded().await;

    let list = app.get("/api/blog", None).await;
    assert_eq!(list.status, StatusCode::OK);
    assert_eq!(list.body["total"], 2);
    assert_eq!(list.body["posts"][0]["slug"], "reading-a-coa");

    let featured = app.get("/api/blog?featured=true", None).await;
    assert_eq!(featured.body["total"], 1);

    let post = app.get("/api/blog/storing-peptides", None).await;
    assert_eq!(post.status, StatusCode::OK);
    assert!(
        post.body["post"]["contentHtml"]
            .as_str()
            .unwrap()
            .contains("<table>")
    );

    let draft = app.get("/api/blog/affiliate-program", None).await;
    assert_eq!(draft.status, StatusCode::NOT_FOUND);
}
